//! API request and response models.
//!
//! Domain types from the core crates serialize straight onto the wire;
//! this module adds the response envelope and the request shapes that
//! only exist at the HTTP boundary.

use consentry_tenant::catalog::{FeaturesPatch, LimitsPatch};
use consentry_tenant::{BillingCycle, Plan};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standard API response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
                details: None,
            }),
        }
    }

    pub fn error_with_details(code: &str, message: &str, details: serde_json::Value) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
                details: Some(details),
            }),
        }
    }
}

/// Error payload.
///
/// `code` is the stable machine-readable reason; `message` is for
/// humans. Quota refusals also carry the counts under `details`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<serde_json::Value>,
}

// ============ Plan catalog ============

/// The catalog with the version its next update must name.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogView {
    pub version: u64,
    pub plans: Vec<Plan>,
}

/// Partial plan edit guarded by the catalog version the editor saw.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanRequest {
    /// Catalog version this edit was prepared against.
    pub expected_version: u64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_monthly: Option<u64>,
    pub price_annual: Option<u64>,
    pub popular: Option<bool>,
    pub limits: Option<LimitsPatch>,
    pub features: Option<FeaturesPatch>,
}

// ============ Tenants ============

/// Plan reassignment for one tenant.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePlanRequest {
    /// Target plan id.
    pub plan: String,
    /// New billing cycle; keeps the current one when absent.
    pub billing_cycle: Option<BillingCycle>,
}

// ============ Scoped resources ============

/// Creation request for a countable resource row.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRowRequest {
    pub name: String,
}

// ============ Permissions ============

/// One permission token with its UI description.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissionInfo {
    pub token: String,
    pub description: String,
}

/// A UI grouping of permission tokens.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissionGroup {
    pub key: String,
    pub name: String,
    pub permissions: Vec<PermissionInfo>,
}

/// The whole permission vocabulary plus each role's default grant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCatalog {
    pub categories: Vec<PermissionGroup>,
    pub role_defaults: Vec<RoleDefaults>,
}

/// Default permission tokens granted to one built-in role.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleDefaults {
    pub role: String,
    pub permissions: Vec<String>,
}
