//! Consentry API
//!
//! HTTP surface over the tenant registry, the plan catalog and the
//! access guard. Every request runs the same pipeline before its
//! handler:
//!
//! ```text
//! request
//!    │ resolve_scope   Host / X-Tenant-Slug  ->  TenantScope
//!    │ authenticate    Bearer JWT            ->  Caller
//!    │ enforce_policy  PolicyTable + TenantGuard + quota precheck
//!    ▼
//! handler              reads CurrentTenant from extensions
//! ```
//!
//! Routes the table does not declare are refused, so a forgotten policy
//! line fails closed instead of open.

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;
use consentry_access::{PolicyTable, ScopeResolver, TenantGuard};
use consentry_tenant::catalog::{BackupCadence, CatalogError, FeaturesPatch, LimitsPatch};
use consentry_tenant::usage::{PlanSummary, StatusBreakdown, UsageAlert};
use consentry_tenant::{
    BillingCycle, GlobalStats, Limit, MemoryDirectory, MemoryPlanStore, NewTenant, Plan,
    PlanCatalog, PlanFeatures, QuotaEnforcer, ResourceKind, ResourceRow, ResourceUsage, Tenant,
    TenantLimits, TenantRegistry, TenantStatus, TenantUpdate, UsageLevel, UsageReport,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::ApiConfig;
pub use error::ApiError;
pub use models::*;

/// Shared server state.
pub struct ApiState {
    /// Server configuration.
    pub config: ApiConfig,
    /// Tenant lifecycle operations.
    pub registry: TenantRegistry,
    /// Quota enforcement and usage reporting.
    pub quota: QuotaEnforcer,
    /// The live plan catalog.
    pub catalog: Arc<PlanCatalog>,
    /// Scope and permission decisions.
    pub guard: TenantGuard,
    /// Host header to tenant scope.
    pub resolver: ScopeResolver,
    /// Access policy per route.
    pub policies: PolicyTable,
}

/// Wire the state up over in-memory backends.
pub async fn build_state(config: ApiConfig) -> Result<Arc<ApiState>, CatalogError> {
    let directory = Arc::new(MemoryDirectory::new());
    let catalog = Arc::new(PlanCatalog::open(Arc::new(MemoryPlanStore::new())).await?);

    let registry = TenantRegistry::new(directory.clone(), catalog.clone());
    let quota = QuotaEnforcer::new(directory.clone(), catalog.clone());
    let guard = TenantGuard::new(directory);
    let resolver = ScopeResolver::new(config.base_domain.clone());

    Ok(Arc::new(ApiState {
        registry,
        quota,
        catalog,
        guard,
        resolver,
        policies: routes::policies(),
        config,
    }))
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Consentry API",
        version = "1.0.0",
        description = "Multi-tenant isolation and plan quota enforcement for the Consentry platform",
        license(name = "Apache-2.0")
    ),
    paths(
        routes::health::health_check,
        routes::plans::list_plans,
        routes::plans::get_plan,
        routes::plans::update_plan,
        routes::permissions::list_permissions,
        routes::tenants::list_tenants,
        routes::tenants::create_tenant,
        routes::tenants::get_tenant,
        routes::tenants::update_tenant,
        routes::tenants::delete_tenant,
        routes::tenants::suspend_tenant,
        routes::tenants::activate_tenant,
        routes::tenants::change_plan,
        routes::tenants::override_limits,
        routes::tenants::tenant_usage,
        routes::tenants::global_stats,
        routes::usage::own_usage,
        routes::branches::list_branches,
        routes::branches::create_branch,
        routes::branches::delete_branch,
        routes::consents::list_consents,
        routes::consents::create_consent,
        routes::consents::delete_consent,
    ),
    components(
        schemas(
            ErrorResponse, CatalogView, UpdatePlanRequest, ChangePlanRequest,
            CreateRowRequest, PermissionCatalog, PermissionGroup, PermissionInfo,
            RoleDefaults, routes::health::HealthResponse,
            Tenant, TenantStatus, BillingCycle, TenantLimits, Limit, ResourceKind,
            Plan, PlanFeatures, BackupCadence, LimitsPatch, FeaturesPatch,
            NewTenant, TenantUpdate, ResourceRow,
            UsageReport, ResourceUsage, UsageLevel, PlanSummary, UsageAlert,
            GlobalStats, StatusBreakdown
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "plans", description = "Plan catalog"),
        (name = "permissions", description = "Permission vocabulary"),
        (name = "tenants", description = "Tenant administration"),
        (name = "usage", description = "Tenant self-service usage"),
        (name = "branches", description = "Branch management"),
        (name = "consents", description = "Consent records")
    )
)]
pub struct ApiDoc;

/// Build the API router
///
/// The Swagger UI is merged before the guard layers, so the layers wrap
/// the documentation and the fallback as well as every declared route.
/// The docs surface is declared public in the policy table; anything
/// the table does not know is refused by the wrapped fallback.
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        // Plan catalog
        .route("/api/v1/plans", get(routes::plans::list_plans))
        .route(
            "/api/v1/plans/:id",
            get(routes::plans::get_plan).put(routes::plans::update_plan),
        )
        // Permission vocabulary
        .route(
            "/api/v1/permissions",
            get(routes::permissions::list_permissions),
        )
        // Tenant administration
        .route(
            "/api/v1/tenants",
            get(routes::tenants::list_tenants).post(routes::tenants::create_tenant),
        )
        .route(
            "/api/v1/tenants/stats/global",
            get(routes::tenants::global_stats),
        )
        .route(
            "/api/v1/tenants/:id",
            get(routes::tenants::get_tenant)
                .put(routes::tenants::update_tenant)
                .delete(routes::tenants::delete_tenant),
        )
        .route(
            "/api/v1/tenants/:id/suspend",
            post(routes::tenants::suspend_tenant),
        )
        .route(
            "/api/v1/tenants/:id/activate",
            post(routes::tenants::activate_tenant),
        )
        .route("/api/v1/tenants/:id/plan", put(routes::tenants::change_plan))
        .route(
            "/api/v1/tenants/:id/limits",
            put(routes::tenants::override_limits),
        )
        .route("/api/v1/tenants/:id/usage", get(routes::tenants::tenant_usage))
        // Tenant-scoped surface
        .route("/api/v1/usage", get(routes::usage::own_usage))
        .route(
            "/api/v1/branches",
            get(routes::branches::list_branches).post(routes::branches::create_branch),
        )
        .route("/api/v1/branches/:id", delete(routes::branches::delete_branch))
        .route(
            "/api/v1/consents",
            get(routes::consents::list_consents).post(routes::consents::create_consent),
        )
        .route("/api/v1/consents/:id", delete(routes::consents::delete_consent))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::enforce::enforce_policy,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::tenant::resolve_scope,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
