//! Route access policies.
//!
//! Every route the API serves is declared here with its access rules.
//! Undeclared routes are denied outright, so forgetting to declare a new
//! route fails closed instead of open.

use consentry_tenant::ResourceKind;
use std::collections::HashMap;

use crate::permissions::PermissionSet;

/// Access rules for one route.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    /// No authentication at all, e.g. health and sign-in.
    pub public: bool,
    /// Skip the tenant-scope decision table. Platform admin surface.
    pub exempt: bool,
    /// Permissions the caller must hold, all of them.
    pub required: PermissionSet,
    /// Resource kind whose quota is pre-checked before a create.
    pub quota: Option<ResourceKind>,
}

impl RoutePolicy {
    /// Open to anyone, no caller needed.
    pub fn public() -> Self {
        Self {
            public: true,
            exempt: true,
            required: PermissionSet::EMPTY,
            quota: None,
        }
    }

    /// Tenant-scoped route requiring every listed permission.
    pub fn scoped(required: PermissionSet) -> Self {
        Self {
            public: false,
            exempt: false,
            required,
            quota: None,
        }
    }

    /// Route outside the tenant-scope rules, still requiring every
    /// listed permission. Used by the platform admin surface.
    pub fn exempt(required: PermissionSet) -> Self {
        Self {
            public: false,
            exempt: true,
            required,
            quota: None,
        }
    }

    /// Pre-check the quota for `kind` before the handler runs.
    pub fn with_quota(mut self, kind: ResourceKind) -> Self {
        self.quota = Some(kind);
        self
    }
}

/// Declared access policies keyed by method and route pattern.
///
/// The pattern is the router's template, `/api/v1/tenants/:id`, not the
/// concrete path.
#[derive(Debug, Default)]
pub struct PolicyTable {
    routes: HashMap<(String, String), RoutePolicy>,
}

impl PolicyTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare one route's policy.
    pub fn declare(&mut self, method: &str, pattern: &str, policy: RoutePolicy) {
        self.routes
            .insert((method.to_ascii_uppercase(), pattern.to_string()), policy);
    }

    /// Policy for one route, if declared.
    pub fn lookup(&self, method: &str, pattern: &str) -> Option<&RoutePolicy> {
        self.routes
            .get(&(method.to_ascii_uppercase(), pattern.to_string()))
    }

    /// Number of declared routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True when nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
