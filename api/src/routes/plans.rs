//! Plan catalog endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use consentry_tenant::catalog::PlanPatch;
use consentry_tenant::Plan;

use crate::error::ApiError;
use crate::models::{ApiResponse, CatalogView, UpdatePlanRequest};
use crate::ApiState;

/// List the plan catalog
#[utoipa::path(
    get,
    path = "/api/v1/plans",
    responses(
        (status = 200, description = "All plans plus the catalog version", body = CatalogView)
    ),
    tag = "plans"
)]
pub async fn list_plans(State(state): State<Arc<ApiState>>) -> Json<ApiResponse<CatalogView>> {
    let snapshot = state.catalog.snapshot();
    Json(ApiResponse::success(CatalogView {
        version: snapshot.version,
        plans: snapshot.plans.clone(),
    }))
}

/// Get one plan
#[utoipa::path(
    get,
    path = "/api/v1/plans/{id}",
    params(("id" = String, Path, description = "Plan id")),
    responses(
        (status = 200, description = "Plan details", body = Plan),
        (status = 404, description = "Plan not found")
    ),
    tag = "plans"
)]
pub async fn get_plan(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Plan>>, ApiError> {
    let plan = state.catalog.plan(&id).ok_or(ApiError::NotFound("plan"))?;
    Ok(Json(ApiResponse::success(plan)))
}

/// Edit one plan
///
/// The edit names the catalog version it was prepared against and is
/// refused with 409 when someone else edited the catalog in between.
/// Tenants already on the plan keep the values they copied at
/// assignment time.
#[utoipa::path(
    put,
    path = "/api/v1/plans/{id}",
    params(("id" = String, Path, description = "Plan id")),
    request_body = UpdatePlanRequest,
    responses(
        (status = 200, description = "Updated plan", body = Plan),
        (status = 404, description = "Plan not found"),
        (status = 409, description = "Catalog version conflict")
    ),
    tag = "plans"
)]
pub async fn update_plan(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePlanRequest>,
) -> Result<Json<ApiResponse<Plan>>, ApiError> {
    let patch = PlanPatch {
        name: req.name,
        description: req.description,
        price_monthly: req.price_monthly,
        price_annual: req.price_annual,
        popular: req.popular,
        limits: req.limits,
        features: req.features,
    };
    let plan = state
        .catalog
        .update_plan(&id, &patch, req.expected_version)
        .await?;
    Ok(Json(ApiResponse::success(plan)))
}
