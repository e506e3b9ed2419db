//! Tenant self-service usage endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::{Extension, Json};
use consentry_access::TenantScope;
use consentry_tenant::UsageReport;

use crate::error::ApiError;
use crate::middleware::{require_tenant, CurrentTenant};
use crate::models::ApiResponse;
use crate::ApiState;

/// Usage report for the calling tenant
///
/// Counts are live, never cached, so the numbers here always match what
/// the create endpoints will enforce.
#[utoipa::path(
    get,
    path = "/api/v1/usage",
    responses(
        (status = 200, description = "Per-resource usage with alert levels", body = UsageReport),
        (status = 403, description = "Wrong surface or missing permission")
    ),
    tag = "usage"
)]
pub async fn own_usage(
    State(state): State<Arc<ApiState>>,
    Extension(scope): Extension<TenantScope>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
) -> Result<Json<ApiResponse<UsageReport>>, ApiError> {
    let tenant = require_tenant(&scope, tenant)?;
    let report = state.quota.report(&tenant).await?;
    Ok(Json(ApiResponse::success(report)))
}
