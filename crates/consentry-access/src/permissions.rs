//! Permission tokens, sets and role defaults.
//!
//! Every permission the platform knows is declared here once. Routes
//! require permissions by value, roles grant them by value, and the
//! typo can no longer exist.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One grantable permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Permission {
    // Dashboard
    ViewDashboard,
    ViewGlobalStats,
    // Consents
    ViewConsents,
    CreateConsents,
    EditConsents,
    DeleteConsents,
    SignConsents,
    ResendConsentEmail,
    // Users
    ViewUsers,
    CreateUsers,
    EditUsers,
    DeleteUsers,
    ChangePasswords,
    // Roles
    ViewRoles,
    EditRoles,
    // Branches
    ViewBranches,
    CreateBranches,
    EditBranches,
    DeleteBranches,
    // Services
    ViewServices,
    CreateServices,
    EditServices,
    DeleteServices,
    // Questions
    ViewQuestions,
    CreateQuestions,
    EditQuestions,
    DeleteQuestions,
    // Clients
    ViewClients,
    CreateClients,
    EditClients,
    DeleteClients,
    // Consent templates
    ViewTemplates,
    CreateTemplates,
    EditTemplates,
    DeleteTemplates,
    // Settings
    ViewSettings,
    EditSettings,
    ConfigureEmail,
    // Billing, tenant side
    ViewInvoices,
    PayInvoices,
    // Platform operators only
    ManageTenants,
}

impl Permission {
    /// Every permission, in declaration order. Order fixes each
    /// permission's bit in [`PermissionSet`].
    pub const ALL: [Permission; 41] = [
        Permission::ViewDashboard,
        Permission::ViewGlobalStats,
        Permission::ViewConsents,
        Permission::CreateConsents,
        Permission::EditConsents,
        Permission::DeleteConsents,
        Permission::SignConsents,
        Permission::ResendConsentEmail,
        Permission::ViewUsers,
        Permission::CreateUsers,
        Permission::EditUsers,
        Permission::DeleteUsers,
        Permission::ChangePasswords,
        Permission::ViewRoles,
        Permission::EditRoles,
        Permission::ViewBranches,
        Permission::CreateBranches,
        Permission::EditBranches,
        Permission::DeleteBranches,
        Permission::ViewServices,
        Permission::CreateServices,
        Permission::EditServices,
        Permission::DeleteServices,
        Permission::ViewQuestions,
        Permission::CreateQuestions,
        Permission::EditQuestions,
        Permission::DeleteQuestions,
        Permission::ViewClients,
        Permission::CreateClients,
        Permission::EditClients,
        Permission::DeleteClients,
        Permission::ViewTemplates,
        Permission::CreateTemplates,
        Permission::EditTemplates,
        Permission::DeleteTemplates,
        Permission::ViewSettings,
        Permission::EditSettings,
        Permission::ConfigureEmail,
        Permission::ViewInvoices,
        Permission::PayInvoices,
        Permission::ManageTenants,
    ];

    /// Wire token, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewDashboard => "view_dashboard",
            Self::ViewGlobalStats => "view_global_stats",
            Self::ViewConsents => "view_consents",
            Self::CreateConsents => "create_consents",
            Self::EditConsents => "edit_consents",
            Self::DeleteConsents => "delete_consents",
            Self::SignConsents => "sign_consents",
            Self::ResendConsentEmail => "resend_consent_email",
            Self::ViewUsers => "view_users",
            Self::CreateUsers => "create_users",
            Self::EditUsers => "edit_users",
            Self::DeleteUsers => "delete_users",
            Self::ChangePasswords => "change_passwords",
            Self::ViewRoles => "view_roles",
            Self::EditRoles => "edit_roles",
            Self::ViewBranches => "view_branches",
            Self::CreateBranches => "create_branches",
            Self::EditBranches => "edit_branches",
            Self::DeleteBranches => "delete_branches",
            Self::ViewServices => "view_services",
            Self::CreateServices => "create_services",
            Self::EditServices => "edit_services",
            Self::DeleteServices => "delete_services",
            Self::ViewQuestions => "view_questions",
            Self::CreateQuestions => "create_questions",
            Self::EditQuestions => "edit_questions",
            Self::DeleteQuestions => "delete_questions",
            Self::ViewClients => "view_clients",
            Self::CreateClients => "create_clients",
            Self::EditClients => "edit_clients",
            Self::DeleteClients => "delete_clients",
            Self::ViewTemplates => "view_templates",
            Self::CreateTemplates => "create_templates",
            Self::EditTemplates => "edit_templates",
            Self::DeleteTemplates => "delete_templates",
            Self::ViewSettings => "view_settings",
            Self::EditSettings => "edit_settings",
            Self::ConfigureEmail => "configure_email",
            Self::ViewInvoices => "view_invoices",
            Self::PayInvoices => "pay_invoices",
            Self::ManageTenants => "manage_tenants",
        }
    }

    /// Short description for role-editing UIs.
    pub fn description(&self) -> &'static str {
        match self {
            Self::ViewDashboard => "View dashboard and statistics",
            Self::ViewGlobalStats => "View platform-wide statistics",
            Self::ViewConsents => "View consents",
            Self::CreateConsents => "Create consents",
            Self::EditConsents => "Edit consents",
            Self::DeleteConsents => "Delete consents",
            Self::SignConsents => "Sign consents",
            Self::ResendConsentEmail => "Resend consent emails",
            Self::ViewUsers => "View users",
            Self::CreateUsers => "Create users",
            Self::EditUsers => "Edit users",
            Self::DeleteUsers => "Delete users",
            Self::ChangePasswords => "Change user passwords",
            Self::ViewRoles => "View roles",
            Self::EditRoles => "Edit role permissions",
            Self::ViewBranches => "View branches",
            Self::CreateBranches => "Create branches",
            Self::EditBranches => "Edit branches",
            Self::DeleteBranches => "Delete branches",
            Self::ViewServices => "View services",
            Self::CreateServices => "Create services",
            Self::EditServices => "Edit services",
            Self::DeleteServices => "Delete services",
            Self::ViewQuestions => "View questions",
            Self::CreateQuestions => "Create questions",
            Self::EditQuestions => "Edit questions",
            Self::DeleteQuestions => "Delete questions",
            Self::ViewClients => "View clients",
            Self::CreateClients => "Create clients",
            Self::EditClients => "Edit clients",
            Self::DeleteClients => "Delete clients",
            Self::ViewTemplates => "View consent templates",
            Self::CreateTemplates => "Create consent templates",
            Self::EditTemplates => "Edit consent templates",
            Self::DeleteTemplates => "Delete consent templates",
            Self::ViewSettings => "View settings",
            Self::EditSettings => "Edit settings",
            Self::ConfigureEmail => "Configure outgoing email",
            Self::ViewInvoices => "View invoices",
            Self::PayInvoices => "Record invoice payments",
            Self::ManageTenants => "Manage tenants (platform operators only)",
        }
    }

    fn bit(&self) -> u64 {
        1u64 << (*self as u64)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A permission token nobody declared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown permission: {0}")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .find(|p| p.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

/// A set of permissions, one bit per token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionSet(u64);

impl PermissionSet {
    /// The empty set.
    pub const EMPTY: PermissionSet = PermissionSet(0);

    /// Every declared permission.
    pub fn all() -> Self {
        Permission::ALL.iter().copied().collect()
    }

    /// Empty set.
    pub fn new() -> Self {
        Self::EMPTY
    }

    /// Grant one permission.
    pub fn insert(&mut self, permission: Permission) {
        self.0 |= permission.bit();
    }

    /// Revoke one permission.
    pub fn remove(&mut self, permission: Permission) {
        self.0 &= !permission.bit();
    }

    /// Membership test.
    pub fn contains(&self, permission: Permission) -> bool {
        self.0 & permission.bit() != 0
    }

    /// True when every permission in `required` is present.
    pub fn contains_all(&self, required: &PermissionSet) -> bool {
        self.0 & required.0 == required.0
    }

    /// First permission in `required` missing from this set.
    pub fn first_missing(&self, required: &PermissionSet) -> Option<Permission> {
        required.iter().find(|p| !self.contains(*p))
    }

    /// Union of both sets.
    pub fn union(&self, other: &PermissionSet) -> PermissionSet {
        PermissionSet(self.0 | other.0)
    }

    /// Number of granted permissions.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// True when nothing is granted.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Granted permissions, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL.iter().copied().filter(|p| self.contains(*p))
    }

    /// Parse the comma-joined storage form, e.g. "view_users,edit_users".
    ///
    /// Older rows stored a JSON array of tokens; brackets and quotes are
    /// tolerated on read and never written back.
    pub fn from_csv(csv: &str) -> Result<Self, UnknownPermission> {
        let csv = csv.trim();
        let csv = csv
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(csv);
        let mut set = Self::EMPTY;
        for token in csv.split(',') {
            let token = token.trim().trim_matches('"');
            if token.is_empty() {
                continue;
            }
            set.insert(token.parse()?);
        }
        Ok(set)
    }

    /// Comma-joined storage form.
    pub fn to_csv(&self) -> String {
        self.iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for p in iter {
            set.insert(p);
        }
        set
    }
}

impl From<&[Permission]> for PermissionSet {
    fn from(perms: &[Permission]) -> Self {
        perms.iter().copied().collect()
    }
}

impl Serialize for PermissionSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let perms = Vec::<Permission>::deserialize(deserializer)?;
        Ok(perms.into_iter().collect())
    }
}

/// Built-in staff roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform operator. Lives on the admin domain, never inside a tenant.
    SuperAdmin,
    /// Runs a whole tenant.
    GeneralAdmin,
    /// Runs one branch of a tenant.
    BranchAdmin,
    /// Front-desk operator.
    Operator,
}

impl Role {
    /// Wire form, matching the serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::GeneralAdmin => "general_admin",
            Self::BranchAdmin => "branch_admin",
            Self::Operator => "operator",
        }
    }

    /// Permissions granted to the role out of the box. Tenants may
    /// adjust their own roles later; these are the starting sets.
    pub fn default_permissions(&self) -> PermissionSet {
        use Permission::*;
        match self {
            // Everything except tenant-side billing and email setup.
            Role::SuperAdmin => {
                let mut set = PermissionSet::all();
                set.remove(ConfigureEmail);
                set.remove(ViewInvoices);
                set.remove(PayInvoices);
                set
            }
            // Everything inside the tenant, nothing platform-wide.
            Role::GeneralAdmin => {
                let mut set = PermissionSet::all();
                set.remove(ViewGlobalStats);
                set.remove(ManageTenants);
                set
            }
            Role::BranchAdmin => PermissionSet::from_iter([
                ViewDashboard,
                ViewConsents,
                CreateConsents,
                EditConsents,
                DeleteConsents,
                SignConsents,
                ResendConsentEmail,
                ViewUsers,
                CreateUsers,
                EditUsers,
                ViewBranches,
                ViewServices,
                ViewQuestions,
                ViewClients,
                CreateClients,
                EditClients,
                ViewSettings,
            ]),
            Role::Operator => PermissionSet::from_iter([
                ViewDashboard,
                ViewConsents,
                CreateConsents,
                SignConsents,
                ResendConsentEmail,
                ViewServices,
                ViewBranches,
                ViewClients,
                CreateClients,
            ]),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UI grouping of permissions.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PermissionCategory {
    /// Stable key.
    pub key: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Permissions in the group.
    pub permissions: &'static [Permission],
}

/// All permission categories, in UI order.
pub fn categories() -> &'static [PermissionCategory] {
    use Permission::*;
    &[
        PermissionCategory {
            key: "dashboard",
            name: "Dashboard",
            permissions: &[ViewDashboard, ViewGlobalStats],
        },
        PermissionCategory {
            key: "consents",
            name: "Consents",
            permissions: &[
                ViewConsents,
                CreateConsents,
                EditConsents,
                DeleteConsents,
                SignConsents,
                ResendConsentEmail,
            ],
        },
        PermissionCategory {
            key: "users",
            name: "Users",
            permissions: &[ViewUsers, CreateUsers, EditUsers, DeleteUsers, ChangePasswords],
        },
        PermissionCategory {
            key: "roles",
            name: "Roles",
            permissions: &[ViewRoles, EditRoles],
        },
        PermissionCategory {
            key: "branches",
            name: "Branches",
            permissions: &[ViewBranches, CreateBranches, EditBranches, DeleteBranches],
        },
        PermissionCategory {
            key: "services",
            name: "Services",
            permissions: &[ViewServices, CreateServices, EditServices, DeleteServices],
        },
        PermissionCategory {
            key: "questions",
            name: "Questions",
            permissions: &[ViewQuestions, CreateQuestions, EditQuestions, DeleteQuestions],
        },
        PermissionCategory {
            key: "clients",
            name: "Clients",
            permissions: &[ViewClients, CreateClients, EditClients, DeleteClients],
        },
        PermissionCategory {
            key: "templates",
            name: "Consent Templates",
            permissions: &[ViewTemplates, CreateTemplates, EditTemplates, DeleteTemplates],
        },
        PermissionCategory {
            key: "settings",
            name: "Settings",
            permissions: &[ViewSettings, EditSettings, ConfigureEmail],
        },
        PermissionCategory {
            key: "invoices",
            name: "Billing",
            permissions: &[ViewInvoices, PayInvoices],
        },
        PermissionCategory {
            key: "tenants",
            name: "Tenants",
            permissions: &[ManageTenants],
        },
    ]
}
