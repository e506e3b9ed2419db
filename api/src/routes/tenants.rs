//! Tenant administration endpoints
//!
//! The whole surface is platform-operator territory: every route here is
//! policy-exempt from the subdomain rules but requires admin
//! permissions, so tenant staff never reach it.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use consentry_tenant::catalog::LimitsPatch;
use consentry_tenant::{GlobalStats, NewTenant, Tenant, TenantUpdate, UsageReport};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{ApiResponse, ChangePlanRequest};
use crate::ApiState;

/// List all live tenants
#[utoipa::path(
    get,
    path = "/api/v1/tenants",
    responses(
        (status = 200, description = "All live tenants", body = [Tenant])
    ),
    tag = "tenants"
)]
pub async fn list_tenants(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ApiResponse<Vec<Tenant>>>, ApiError> {
    let tenants = state.registry.list().await?;
    Ok(Json(ApiResponse::success(tenants)))
}

/// Provision a new tenant
#[utoipa::path(
    post,
    path = "/api/v1/tenants",
    request_body = NewTenant,
    responses(
        (status = 201, description = "Tenant provisioned", body = Tenant),
        (status = 400, description = "Unusable slug or unknown plan"),
        (status = 409, description = "Slug or name already taken")
    ),
    tag = "tenants"
)]
pub async fn create_tenant(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<NewTenant>,
) -> Result<(StatusCode, Json<ApiResponse<Tenant>>), ApiError> {
    let tenant = state.registry.provision(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(tenant))))
}

/// Get one tenant
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{id}",
    params(("id" = Uuid, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "Tenant details", body = Tenant),
        (status = 404, description = "Tenant not found")
    ),
    tag = "tenants"
)]
pub async fn get_tenant(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Tenant>>, ApiError> {
    let tenant = state.registry.find(id).await?;
    Ok(Json(ApiResponse::success(tenant)))
}

/// Edit a tenant's own fields
#[utoipa::path(
    put,
    path = "/api/v1/tenants/{id}",
    params(("id" = Uuid, Path, description = "Tenant id")),
    request_body = TenantUpdate,
    responses(
        (status = 200, description = "Updated tenant", body = Tenant),
        (status = 404, description = "Tenant not found"),
        (status = 409, description = "Name already taken")
    ),
    tag = "tenants"
)]
pub async fn update_tenant(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<TenantUpdate>,
) -> Result<Json<ApiResponse<Tenant>>, ApiError> {
    let tenant = state.registry.update(id, update).await?;
    Ok(Json(ApiResponse::success(tenant)))
}

/// Soft-delete a tenant
#[utoipa::path(
    delete,
    path = "/api/v1/tenants/{id}",
    params(("id" = Uuid, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "Tenant deleted"),
        (status = 404, description = "Tenant not found")
    ),
    tag = "tenants"
)]
pub async fn delete_tenant(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.registry.soft_delete(id).await?;
    Ok(Json(ApiResponse::success(())))
}

/// Suspend a tenant
///
/// Takes effect on the tenant's very next request; there is no cached
/// status to wait out.
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{id}/suspend",
    params(("id" = Uuid, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "Suspended tenant", body = Tenant),
        (status = 404, description = "Tenant not found")
    ),
    tag = "tenants"
)]
pub async fn suspend_tenant(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Tenant>>, ApiError> {
    let tenant = state.registry.suspend(id).await?;
    Ok(Json(ApiResponse::success(tenant)))
}

/// Reactivate a suspended or expired tenant
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{id}/activate",
    params(("id" = Uuid, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "Reactivated tenant", body = Tenant),
        (status = 404, description = "Tenant not found")
    ),
    tag = "tenants"
)]
pub async fn activate_tenant(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Tenant>>, ApiError> {
    let tenant = state.registry.activate(id).await?;
    Ok(Json(ApiResponse::success(tenant)))
}

/// Move a tenant to another plan
///
/// The tenant copies the plan's current limits, features and price;
/// later catalog edits will not touch it.
#[utoipa::path(
    put,
    path = "/api/v1/tenants/{id}/plan",
    params(("id" = Uuid, Path, description = "Tenant id")),
    request_body = ChangePlanRequest,
    responses(
        (status = 200, description = "Tenant on the new plan", body = Tenant),
        (status = 400, description = "Unknown plan"),
        (status = 404, description = "Tenant not found")
    ),
    tag = "tenants"
)]
pub async fn change_plan(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangePlanRequest>,
) -> Result<Json<ApiResponse<Tenant>>, ApiError> {
    let tenant = state
        .registry
        .change_plan(id, &req.plan, req.billing_cycle)
        .await?;
    Ok(Json(ApiResponse::success(tenant)))
}

/// Override individual resource ceilings for one tenant
#[utoipa::path(
    put,
    path = "/api/v1/tenants/{id}/limits",
    params(("id" = Uuid, Path, description = "Tenant id")),
    request_body = LimitsPatch,
    responses(
        (status = 200, description = "Tenant with overridden limits", body = Tenant),
        (status = 404, description = "Tenant not found")
    ),
    tag = "tenants"
)]
pub async fn override_limits(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<LimitsPatch>,
) -> Result<Json<ApiResponse<Tenant>>, ApiError> {
    let tenant = state.registry.override_limits(id, patch).await?;
    Ok(Json(ApiResponse::success(tenant)))
}

/// Usage report for one tenant, counted fresh
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{id}/usage",
    params(("id" = Uuid, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "Per-resource usage with alert levels", body = UsageReport),
        (status = 404, description = "Tenant not found")
    ),
    tag = "tenants"
)]
pub async fn tenant_usage(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UsageReport>>, ApiError> {
    let tenant = state.registry.find(id).await?;
    let report = state.quota.report(&tenant).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Platform-wide dashboard numbers
#[utoipa::path(
    get,
    path = "/api/v1/tenants/stats/global",
    responses(
        (status = 200, description = "Totals across all live tenants", body = GlobalStats)
    ),
    tag = "tenants"
)]
pub async fn global_stats(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ApiResponse<GlobalStats>>, ApiError> {
    let tenants = state.registry.list().await?;
    let stats = state.quota.global_stats(&tenants).await?;
    Ok(Json(ApiResponse::success(stats)))
}
