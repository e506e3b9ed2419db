//! Branch endpoints
//!
//! Branches are the clearest quota-bearing resource: small plans allow
//! one or two, and the create path is the reference shape for every
//! other countable resource.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use consentry_access::TenantScope;
use consentry_tenant::directory::DirectoryError;
use consentry_tenant::{QuotaError, ResourceKind, ResourceRow};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{require_tenant, CurrentTenant};
use crate::models::{ApiResponse, CreateRowRequest};
use crate::ApiState;

/// List the tenant's branches
#[utoipa::path(
    get,
    path = "/api/v1/branches",
    responses(
        (status = 200, description = "Live branches", body = [ResourceRow])
    ),
    tag = "branches"
)]
pub async fn list_branches(
    State(state): State<Arc<ApiState>>,
    Extension(scope): Extension<TenantScope>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
) -> Result<Json<ApiResponse<Vec<ResourceRow>>>, ApiError> {
    let tenant = require_tenant(&scope, tenant)?;
    let rows = state.quota.rows(&tenant, ResourceKind::Branches).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// Create a branch
///
/// Refused with 403 and the current counts when the tenant's plan has no
/// room left. The insert itself re-checks the ceiling atomically, so two
/// racing creates cannot both land on the last slot.
#[utoipa::path(
    post,
    path = "/api/v1/branches",
    request_body = CreateRowRequest,
    responses(
        (status = 201, description = "Branch created", body = ResourceRow),
        (status = 403, description = "Plan limit reached")
    ),
    tag = "branches"
)]
pub async fn create_branch(
    State(state): State<Arc<ApiState>>,
    Extension(scope): Extension<TenantScope>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
    Json(req): Json<CreateRowRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ResourceRow>>), ApiError> {
    let tenant = require_tenant(&scope, tenant)?;
    let row = state
        .quota
        .create_row(&tenant, ResourceKind::Branches, &req.name)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(row))))
}

/// Delete a branch
#[utoipa::path(
    delete,
    path = "/api/v1/branches/{id}",
    params(("id" = Uuid, Path, description = "Branch id")),
    responses(
        (status = 200, description = "Branch deleted"),
        (status = 404, description = "Branch not found")
    ),
    tag = "branches"
)]
pub async fn delete_branch(
    State(state): State<Arc<ApiState>>,
    Extension(scope): Extension<TenantScope>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let tenant = require_tenant(&scope, tenant)?;
    state
        .quota
        .delete_row(&tenant, ResourceKind::Branches, id)
        .await
        .map_err(|err| match err {
            QuotaError::Directory(DirectoryError::NotFound) => ApiError::NotFound("branch"),
            other => other.into(),
        })?;
    Ok(Json(ApiResponse::success(())))
}
