//! Authenticated principals.

use consentry_tenant::TenantId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::permissions::{PermissionSet, Role};

/// The authenticated principal behind a request.
///
/// Platform operators and tenant staff are different things, so they are
/// different variants. There is no way to build a caller who is somehow
/// both, and tenant fields cannot be absent on a tenant user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Caller {
    /// Platform operator. Works the whole platform from the admin
    /// domain and never belongs to a tenant.
    #[serde(rename_all = "camelCase")]
    SuperAdmin {
        /// Account id.
        user_id: Uuid,
        /// Granted permissions.
        permissions: PermissionSet,
    },
    /// Staff member of exactly one tenant.
    #[serde(rename_all = "camelCase")]
    TenantUser {
        /// Account id.
        user_id: Uuid,
        /// Owning tenant.
        tenant_id: TenantId,
        /// Owning tenant's subdomain slug.
        tenant_slug: String,
        /// Staff role.
        role: Role,
        /// Granted permissions.
        permissions: PermissionSet,
    },
}

impl Caller {
    /// Build a platform operator with the role's default permissions.
    pub fn super_admin(user_id: Uuid) -> Self {
        Self::SuperAdmin {
            user_id,
            permissions: Role::SuperAdmin.default_permissions(),
        }
    }

    /// Build a tenant staff member with the role's default permissions.
    pub fn tenant_user(user_id: Uuid, tenant_id: TenantId, slug: impl Into<String>, role: Role) -> Self {
        Self::TenantUser {
            user_id,
            tenant_id,
            tenant_slug: slug.into(),
            role,
            permissions: role.default_permissions(),
        }
    }

    /// Account id.
    pub fn user_id(&self) -> Uuid {
        match self {
            Self::SuperAdmin { user_id, .. } | Self::TenantUser { user_id, .. } => *user_id,
        }
    }

    /// Granted permissions.
    pub fn permissions(&self) -> &PermissionSet {
        match self {
            Self::SuperAdmin { permissions, .. } | Self::TenantUser { permissions, .. } => {
                permissions
            }
        }
    }

    /// Replace the granted permissions, e.g. with a tenant-customized role.
    pub fn with_permissions(mut self, set: PermissionSet) -> Self {
        match &mut self {
            Self::SuperAdmin { permissions, .. } | Self::TenantUser { permissions, .. } => {
                *permissions = set;
            }
        }
        self
    }

    /// True for platform operators.
    pub fn is_super_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin { .. })
    }

    /// The owning tenant's slug, for tenant staff.
    pub fn tenant_slug(&self) -> Option<&str> {
        match self {
            Self::SuperAdmin { .. } => None,
            Self::TenantUser { tenant_slug, .. } => Some(tenant_slug),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Permission;

    #[test]
    fn test_variants() {
        let operator = Caller::super_admin(Uuid::new_v4());
        assert!(operator.is_super_admin());
        assert!(operator.tenant_slug().is_none());
        assert!(operator.permissions().contains(Permission::ManageTenants));

        let staff = Caller::tenant_user(Uuid::new_v4(), Uuid::new_v4(), "clinic", Role::Operator);
        assert!(!staff.is_super_admin());
        assert_eq!(staff.tenant_slug(), Some("clinic"));
        assert!(!staff.permissions().contains(Permission::ManageTenants));
    }

    #[test]
    fn test_with_permissions_override() {
        let custom = PermissionSet::from_iter([Permission::ViewConsents]);
        let staff = Caller::tenant_user(Uuid::new_v4(), Uuid::new_v4(), "clinic", Role::Operator)
            .with_permissions(custom);
        assert_eq!(staff.permissions().len(), 1);
    }

    #[test]
    fn test_serde_tagging() {
        let staff = Caller::tenant_user(Uuid::new_v4(), Uuid::new_v4(), "clinic", Role::BranchAdmin);
        let json = serde_json::to_value(&staff).unwrap();
        assert_eq!(json["kind"], "tenantUser");
        assert_eq!(json["tenantSlug"], "clinic");
        assert_eq!(json["role"], "branch_admin");

        let parsed: Caller = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.tenant_slug(), Some("clinic"));
    }
}
