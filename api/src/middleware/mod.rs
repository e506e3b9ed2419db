//! Request middleware.
//!
//! Three layers run in order on every API route: scope resolution,
//! authentication, then policy enforcement. Each one hands its result to
//! the next through request extensions, and handlers read the final
//! verdict from [`CurrentTenant`].

pub mod auth;
pub mod enforce;
pub mod tenant;

use consentry_access::TenantScope;
use consentry_tenant::Tenant;

use crate::error::ApiError;

/// The tenant this request was admitted into, inserted by the policy
/// enforcement layer.
///
/// `None` means the guard admitted the request without a tenant record:
/// base-domain traffic, an exempt route, or a subdomain whose status
/// lookup failed and was let through on the last known state.
#[derive(Clone)]
pub struct CurrentTenant(pub Option<Tenant>);

/// Unwraps the admitted tenant for handlers that cannot run without one.
///
/// On the base domain there is no tenant to operate on, so the caller is
/// told to use a subdomain. Inside a subdomain a missing record means
/// the directory could not produce it right now.
pub fn require_tenant(scope: &TenantScope, tenant: Option<Tenant>) -> Result<Tenant, ApiError> {
    match tenant {
        Some(tenant) => Ok(tenant),
        None if scope.is_base() => Err(ApiError::TenantScopeRequired),
        None => Err(ApiError::TenantUnavailable(
            "tenant record not available for this subdomain".to_string(),
        )),
    }
}
