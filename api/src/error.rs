//! API error type and its HTTP mapping.
//!
//! Every handler and middleware funnels failures through [`ApiError`] so
//! the wire always carries the same envelope: a stable machine code, a
//! human message, and (for quota refusals) the counts that triggered it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use consentry_access::DenyReason;
use consentry_tenant::catalog::CatalogError;
use consentry_tenant::directory::DirectoryError;
use consentry_tenant::{LifecycleError, QuotaError, ResourceKind};
use serde_json::json;
use thiserror::Error;

use crate::models::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    AuthRequired,

    #[error("invalid or expired token")]
    InvalidToken,

    /// Admission refused by the tenant guard.
    #[error("{message}")]
    Denied { code: &'static str, message: String },

    /// Plan ceiling hit. The message keeps the `(current/max)` form that
    /// operator tooling greps for.
    #[error("limit reached for {resource} ({current}/{max})")]
    QuotaExceeded {
        resource: ResourceKind,
        current: u64,
        max: u64,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    #[error("this endpoint must be called on a tenant subdomain")]
    TenantScopeRequired,

    #[error("tenant directory unavailable: {0}")]
    TenantUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Wraps a guard refusal, rendering the message for the deployment's
    /// base domain.
    pub fn denied(reason: &DenyReason, base_domain: &str) -> Self {
        Self::Denied {
            code: reason.code(),
            message: reason.message(base_domain),
        }
    }
}

impl From<QuotaError> for ApiError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::LimitReached {
                resource,
                current,
                max,
            } => Self::QuotaExceeded {
                resource,
                current,
                max,
            },
            QuotaError::Directory(e) => e.into(),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound => Self::NotFound("tenant"),
            DirectoryError::SlugInUse(slug) => Self::Conflict {
                code: "slugInUse",
                message: format!("subdomain \"{slug}\" is already taken"),
            },
            DirectoryError::NameInUse(name) => Self::Conflict {
                code: "nameInUse",
                message: format!("organization name \"{name}\" is already taken"),
            },
            DirectoryError::QuotaExceeded {
                resource,
                current,
                max,
            } => Self::QuotaExceeded {
                resource,
                current,
                max,
            },
            DirectoryError::Unavailable(detail) => Self::TenantUnavailable(detail),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound => Self::NotFound("tenant"),
            LifecycleError::InvalidSlug(slug) => Self::BadRequest {
                code: "invalidSlug",
                message: format!("\"{slug}\" is not a usable subdomain slug"),
            },
            LifecycleError::UnknownPlan(plan) => Self::BadRequest {
                code: "unknownPlan",
                message: format!("plan \"{plan}\" does not exist"),
            },
            LifecycleError::Directory(e) => e.into(),
            LifecycleError::Catalog(e) => e.into(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownPlan(_) => Self::NotFound("plan"),
            CatalogError::VersionConflict { expected, current } => Self::Conflict {
                code: "versionConflict",
                message: format!(
                    "catalog changed since it was read (expected version {expected}, current {current})"
                ),
            },
            CatalogError::Store(detail) => Self::Internal(detail),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::AuthRequired => (StatusCode::UNAUTHORIZED, "authRequired"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "invalidToken"),
            Self::Denied { code, .. } => (StatusCode::FORBIDDEN, *code),
            Self::QuotaExceeded { .. } => (StatusCode::FORBIDDEN, "RESOURCE_LIMIT_REACHED"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "notFound"),
            Self::Conflict { code, .. } => (StatusCode::CONFLICT, *code),
            Self::BadRequest { code, .. } => (StatusCode::BAD_REQUEST, *code),
            Self::TenantScopeRequired => (StatusCode::BAD_REQUEST, "tenantScopeRequired"),
            Self::TenantUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "tenantUnavailable"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        }

        let message = self.to_string();
        let body = match &self {
            Self::QuotaExceeded {
                resource,
                current,
                max,
            } => ApiResponse::<()>::error_with_details(
                code,
                &message,
                json!({
                    "resourceType": resource.wire_name(),
                    "current": current,
                    "max": max,
                }),
            ),
            _ => ApiResponse::<()>::error(code, &message),
        };

        (status, Json(body)).into_response()
    }
}
