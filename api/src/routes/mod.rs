//! API routes and their access policies.

pub mod branches;
pub mod consents;
pub mod health;
pub mod permissions;
pub mod plans;
pub mod tenants;
pub mod usage;

use consentry_access::{Permission, PermissionSet, PolicyTable, RoutePolicy};
use consentry_tenant::ResourceKind;

fn need(permission: Permission) -> PermissionSet {
    PermissionSet::from_iter([permission])
}

/// The access policy for every route the router serves.
///
/// Route strings here must match the router templates exactly. The
/// enforcement layer looks the matched template up in this table and
/// refuses anything undeclared, so adding a route without a line here
/// makes it unreachable rather than unguarded.
pub fn policies() -> PolicyTable {
    let mut table = PolicyTable::new();

    // Public surface
    table.declare("GET", "/health", RoutePolicy::public());
    table.declare("GET", "/api/v1/plans", RoutePolicy::public());
    table.declare("GET", "/api/v1/plans/:id", RoutePolicy::public());

    // Swagger UI templates, as utoipa-swagger-ui registers them
    table.declare("GET", "/docs", RoutePolicy::public());
    table.declare("GET", "/docs/", RoutePolicy::public());
    table.declare("GET", "/docs/*rest", RoutePolicy::public());
    table.declare("GET", "/api-docs/openapi.json", RoutePolicy::public());

    // Platform administration, reachable from the admin domain
    table.declare(
        "PUT",
        "/api/v1/plans/:id",
        RoutePolicy::exempt(need(Permission::ManageTenants)),
    );
    table.declare(
        "GET",
        "/api/v1/permissions",
        RoutePolicy::exempt(need(Permission::ViewRoles)),
    );
    table.declare(
        "GET",
        "/api/v1/tenants",
        RoutePolicy::exempt(need(Permission::ManageTenants)),
    );
    table.declare(
        "POST",
        "/api/v1/tenants",
        RoutePolicy::exempt(need(Permission::ManageTenants)),
    );
    table.declare(
        "GET",
        "/api/v1/tenants/stats/global",
        RoutePolicy::exempt(need(Permission::ViewGlobalStats)),
    );
    table.declare(
        "GET",
        "/api/v1/tenants/:id",
        RoutePolicy::exempt(need(Permission::ManageTenants)),
    );
    table.declare(
        "PUT",
        "/api/v1/tenants/:id",
        RoutePolicy::exempt(need(Permission::ManageTenants)),
    );
    table.declare(
        "DELETE",
        "/api/v1/tenants/:id",
        RoutePolicy::exempt(need(Permission::ManageTenants)),
    );
    table.declare(
        "POST",
        "/api/v1/tenants/:id/suspend",
        RoutePolicy::exempt(need(Permission::ManageTenants)),
    );
    table.declare(
        "POST",
        "/api/v1/tenants/:id/activate",
        RoutePolicy::exempt(need(Permission::ManageTenants)),
    );
    table.declare(
        "PUT",
        "/api/v1/tenants/:id/plan",
        RoutePolicy::exempt(need(Permission::ManageTenants)),
    );
    table.declare(
        "PUT",
        "/api/v1/tenants/:id/limits",
        RoutePolicy::exempt(need(Permission::ManageTenants)),
    );
    table.declare(
        "GET",
        "/api/v1/tenants/:id/usage",
        RoutePolicy::exempt(need(Permission::ManageTenants)),
    );

    // Tenant-scoped surface, subdomain required
    table.declare(
        "GET",
        "/api/v1/usage",
        RoutePolicy::scoped(need(Permission::ViewDashboard)),
    );
    table.declare(
        "GET",
        "/api/v1/branches",
        RoutePolicy::scoped(need(Permission::ViewBranches)),
    );
    table.declare(
        "POST",
        "/api/v1/branches",
        RoutePolicy::scoped(need(Permission::CreateBranches)).with_quota(ResourceKind::Branches),
    );
    table.declare(
        "DELETE",
        "/api/v1/branches/:id",
        RoutePolicy::scoped(need(Permission::DeleteBranches)),
    );
    table.declare(
        "GET",
        "/api/v1/consents",
        RoutePolicy::scoped(need(Permission::ViewConsents)),
    );
    table.declare(
        "POST",
        "/api/v1/consents",
        RoutePolicy::scoped(need(Permission::CreateConsents)).with_quota(ResourceKind::Consents),
    );
    table.declare(
        "DELETE",
        "/api/v1/consents/:id",
        RoutePolicy::scoped(need(Permission::DeleteConsents)),
    );

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_quota_route_is_a_create() {
        let table = policies();
        assert!(table
            .lookup("POST", "/api/v1/branches")
            .is_some_and(|p| p.quota == Some(ResourceKind::Branches)));
        assert!(table
            .lookup("POST", "/api/v1/consents")
            .is_some_and(|p| p.quota == Some(ResourceKind::Consents)));
    }

    #[test]
    fn test_admin_routes_are_exempt_not_public() {
        let table = policies();
        let create = table.lookup("POST", "/api/v1/tenants").unwrap();
        assert!(create.exempt && !create.public);
        assert!(create.required.contains(Permission::ManageTenants));
    }
}
