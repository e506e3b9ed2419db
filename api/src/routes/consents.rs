//! Consent record endpoints
//!
//! Consents feed two ceilings at once: their own count and the derived
//! storage estimate, which grows one megabyte for every two records.

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

/// List the tenant's consent records
#[utoipa::path(
    get,
    path = "/api/v1/consents",
    responses(
        (status = 200, description = "Live consent records", body = [ResourceRow])
    ),
    tag = "consents"
)]
pub async fn list_consents(
    State(state): State<Arc<ApiState>>,
    Extension(scope): Extension<TenantScope>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
) -> Result<Json<ApiResponse<Vec<ResourceRow>>>, ApiError> {
    let tenant = require_tenant(&scope, tenant)?;
    let rows = state.quota.rows(&tenant, ResourceKind::Consents).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// Create a consent record
#[utoipa::path(
    post,
    path = "/api/v1/consents",
    request_body = CreateRowRequest,
    responses(
        (status = 201, description = "Consent record created", body = ResourceRow),
        (status = 403, description = "Plan limit reached")
    ),
    tag = "consents"
)]
pub async fn create_consent(
    State(state): State<Arc<ApiState>>,
    Extension(scope): Extension<TenantScope>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
    Json(req): Json<CreateRowRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ResourceRow>>), ApiError> {
    let tenant = require_tenant(&scope, tenant)?;
    let row = state
        .quota
        .create_row(&tenant, ResourceKind::Consents, &req.name)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(row))))
}

/// Delete a consent record
///
/// Soft delete; the slot it occupied is freed immediately.
#[utoipa::path(
    delete,
    path = "/api/v1/consents/{id}",
    params(("id" = Uuid, Path, description = "Consent record id")),
    responses(
        (status = 200, description = "Consent record deleted"),
        (status = 404, description = "Consent record not found")
    ),
    tag = "consents"
)]
pub async fn delete_consent(
    State(state): State<Arc<ApiState>>,
    Extension(scope): Extension<TenantScope>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let tenant = require_tenant(&scope, tenant)?;
    state
        .quota
        .delete_row(&tenant, ResourceKind::Consents, id)
        .await
        .map_err(|err| match err {
            QuotaError::Directory(DirectoryError::NotFound) => ApiError::NotFound("consent"),
            other => other.into(),
        })?;
    Ok(Json(ApiResponse::success(())))
}
