//! Permission vocabulary endpoint

use axum::Json;
use consentry_access::{categories, Role};

use crate::models::{ApiResponse, PermissionCatalog, PermissionGroup, PermissionInfo, RoleDefaults};

/// List the permission vocabulary
///
/// Feeds role editors: every token grouped for display, plus the default
/// grant of each built-in role.
#[utoipa::path(
    get,
    path = "/api/v1/permissions",
    responses(
        (status = 200, description = "Grouped permission tokens and role defaults", body = PermissionCatalog)
    ),
    tag = "permissions"
)]
pub async fn list_permissions() -> Json<ApiResponse<PermissionCatalog>> {
    let categories = categories()
        .iter()
        .map(|cat| PermissionGroup {
            key: cat.key.to_string(),
            name: cat.name.to_string(),
            permissions: cat
                .permissions
                .iter()
                .map(|p| PermissionInfo {
                    token: p.as_str().to_string(),
                    description: p.description().to_string(),
                })
                .collect(),
        })
        .collect();

    let role_defaults = [
        Role::SuperAdmin,
        Role::GeneralAdmin,
        Role::BranchAdmin,
        Role::Operator,
    ]
    .into_iter()
    .map(|role| RoleDefaults {
        role: role.as_str().to_string(),
        permissions: role
            .default_permissions()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect(),
    })
    .collect();

    Json(ApiResponse::success(PermissionCatalog {
        categories,
        role_defaults,
    }))
}
