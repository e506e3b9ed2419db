//! The tenant guard.
//!
//! One decision table rules every request: which surface it arrived on,
//! who the caller is, and whether they may be there. Scope rules run
//! first, permission checks second, and the first failing rule wins.
//!
//! The tenant status check deliberately fails open: when the directory
//! is unreachable or the record is gone mid-request, the request is
//! admitted with a warning rather than taking every tenant down with
//! the lookup. Slug matching itself never fails open; a caller on the
//! wrong subdomain is refused before any lookup happens.

use consentry_tenant::{Tenant, TenantDirectory, TenantStatus};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::caller::Caller;
use crate::permissions::Permission;
use crate::policy::RoutePolicy;
use crate::resolver::TenantScope;

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// A tenant user called the base or admin domain.
    MustUseOwnSubdomain {
        /// The caller's own subdomain slug.
        slug: String,
    },
    /// A platform operator called a tenant subdomain.
    SuperAdminMustUseAdminDomain,
    /// A tenant user called another tenant's subdomain.
    WrongTenant,
    /// The tenant is suspended.
    TenantSuspended,
    /// The tenant's subscription has expired.
    TenantExpired,
    /// The caller lacks a required permission.
    MissingPermission(Permission),
    /// The route declares no access policy. Fails closed.
    UndeclaredRoute,
}

impl DenyReason {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MustUseOwnSubdomain { .. } => "mustUseOwnSubdomain",
            Self::SuperAdminMustUseAdminDomain => "superAdminMustUseAdminDomain",
            Self::WrongTenant => "wrongTenant",
            Self::TenantSuspended => "suspended",
            Self::TenantExpired => "expired",
            Self::MissingPermission(_) => "missingPermission",
            Self::UndeclaredRoute => "missingPermission",
        }
    }

    /// Human-readable message. `base_domain` feeds the redirect hints.
    pub fn message(&self, base_domain: &str) -> String {
        match self {
            Self::MustUseOwnSubdomain { slug } => format!(
                "Tenant users must sign in on their own subdomain: https://{slug}.{base_domain}"
            ),
            Self::SuperAdminMustUseAdminDomain => format!(
                "Platform operators must use the admin domain: https://admin.{base_domain}"
            ),
            Self::WrongTenant => "You do not have access to this tenant".to_string(),
            Self::TenantSuspended => {
                "This account is suspended. Contact support to restore access.".to_string()
            }
            Self::TenantExpired => {
                "This subscription has expired. Renew it to restore access.".to_string()
            }
            Self::MissingPermission(p) => format!("Missing permission: {p}"),
            Self::UndeclaredRoute => {
                "You do not have permission to access this resource".to_string()
            }
        }
    }
}

/// Outcome of the access decision.
#[derive(Debug)]
pub enum AccessDecision {
    /// Request may proceed. When it ran inside a tenant subdomain and
    /// the status lookup succeeded, the resolved record rides along.
    Admit {
        /// The tenant the request runs in, when known.
        tenant: Option<Tenant>,
    },
    /// Request is refused.
    Deny(DenyReason),
}

impl AccessDecision {
    /// True when the request may proceed.
    pub fn is_admit(&self) -> bool {
        matches!(self, Self::Admit { .. })
    }
}

/// Applies the scope decision table and route permission requirements.
pub struct TenantGuard {
    directory: Arc<dyn TenantDirectory>,
}

impl TenantGuard {
    /// Build over the tenant directory used for status checks.
    pub fn new(directory: Arc<dyn TenantDirectory>) -> Self {
        Self { directory }
    }

    /// Decide one request.
    ///
    /// Authentication happens before this guard; `caller` is `None` only
    /// on routes the authentication layer lets through unauthenticated.
    pub async fn authorize(
        &self,
        scope: &TenantScope,
        caller: Option<&Caller>,
        policy: &RoutePolicy,
    ) -> AccessDecision {
        if policy.public {
            return AccessDecision::Admit { tenant: None };
        }

        let tenant = if policy.exempt {
            None
        } else {
            match self.check_scope(scope, caller).await {
                Ok(tenant) => tenant,
                Err(reason) => {
                    warn!(code = reason.code(), %scope, "scope check refused request");
                    return AccessDecision::Deny(reason);
                }
            }
        };

        if let Some(caller) = caller {
            if let Some(missing) = caller.permissions().first_missing(&policy.required) {
                warn!(permission = %missing, "permission check refused request");
                return AccessDecision::Deny(DenyReason::MissingPermission(missing));
            }
        }

        debug!(%scope, "request admitted");
        AccessDecision::Admit { tenant }
    }

    /// The scope decision table. Rules apply top to bottom; the first
    /// match wins:
    ///
    /// 1. no caller: admit, authentication owns that refusal
    /// 2. base scope, tenant user: refuse toward their subdomain
    /// 3. base scope, platform operator: admit
    /// 4. tenant scope, platform operator: refuse toward the admin domain
    /// 5. tenant scope, other tenant's user: refuse
    /// 6. tenant scope, own user: admit unless suspended or expired
    async fn check_scope(
        &self,
        scope: &TenantScope,
        caller: Option<&Caller>,
    ) -> Result<Option<Tenant>, DenyReason> {
        let caller = match caller {
            None => return Ok(None),
            Some(caller) => caller,
        };

        match (scope, caller) {
            (TenantScope::Base, Caller::TenantUser { tenant_slug, .. }) => {
                Err(DenyReason::MustUseOwnSubdomain {
                    slug: tenant_slug.clone(),
                })
            }
            (TenantScope::Base, Caller::SuperAdmin { .. }) => Ok(None),
            (TenantScope::Tenant(_), Caller::SuperAdmin { .. }) => {
                Err(DenyReason::SuperAdminMustUseAdminDomain)
            }
            (TenantScope::Tenant(slug), Caller::TenantUser { tenant_slug, .. }) => {
                if !slug.eq_ignore_ascii_case(tenant_slug) {
                    return Err(DenyReason::WrongTenant);
                }

                match self.directory.find_by_slug(slug).await {
                    Err(err) => {
                        warn!(%slug, error = %err, "tenant status check failed, admitting");
                        Ok(None)
                    }
                    Ok(None) => {
                        warn!(%slug, "tenant record missing during status check, admitting");
                        Ok(None)
                    }
                    Ok(Some(tenant)) => match tenant.status {
                        TenantStatus::Suspended => Err(DenyReason::TenantSuspended),
                        TenantStatus::Expired => Err(DenyReason::TenantExpired),
                        _ => Ok(Some(tenant)),
                    },
                }
            }
        }
    }
}
