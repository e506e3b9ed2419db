//! Tenant scope resolution from the request host.
//!
//! Every request is either on the base/admin surface or inside exactly
//! one tenant's subdomain. The `X-Tenant-Slug` header wins over the
//! host, which keeps local frontends talking to `localhost:8080` honest
//! about which tenant they mean.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which surface a request arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "scope", content = "slug")]
pub enum TenantScope {
    /// The base or admin domain. Platform operator territory.
    Base,
    /// One tenant's subdomain, by slug.
    Tenant(String),
}

impl TenantScope {
    /// True on the base or admin domain.
    pub fn is_base(&self) -> bool {
        matches!(self, Self::Base)
    }

    /// The tenant slug, when inside a tenant.
    pub fn slug(&self) -> Option<&str> {
        match self {
            Self::Base => None,
            Self::Tenant(slug) => Some(slug),
        }
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => f.write_str("base"),
            Self::Tenant(slug) => write!(f, "tenant:{slug}"),
        }
    }
}

/// Subdomain labels that never name a tenant.
const RESERVED_LABELS: [&str; 6] = ["www", "api", "app", "mail", "ftp", "cdn"];

/// Resolves the tenant scope of a request.
pub struct ScopeResolver {
    /// The platform's own domain, e.g. "consentry.io".
    base_domain: String,
}

impl ScopeResolver {
    /// Build for one base domain. The domain is matched case-insensitively.
    pub fn new(base_domain: impl Into<String>) -> Self {
        Self {
            base_domain: base_domain.into().to_ascii_lowercase(),
        }
    }

    /// The configured base domain.
    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// Resolve a request's scope from its Host header and the optional
    /// `X-Tenant-Slug` override.
    pub fn resolve(&self, host: Option<&str>, slug_header: Option<&str>) -> TenantScope {
        if let Some(header) = slug_header {
            let slug = header.trim().to_ascii_lowercase();
            if !slug.is_empty() {
                return TenantScope::Tenant(slug);
            }
        }

        match host {
            Some(host) => self.resolve_host(host),
            None => TenantScope::Base,
        }
    }

    fn resolve_host(&self, host: &str) -> TenantScope {
        let hostname = strip_port(host).to_ascii_lowercase();
        if hostname.is_empty() || hostname.starts_with('[') {
            // No host or an IPv6 literal; nothing to carve a slug from.
            return TenantScope::Base;
        }

        // Hosts under our own domain get the exact treatment.
        if hostname == self.base_domain {
            return TenantScope::Base;
        }
        if let Some(prefix) = hostname.strip_suffix(&format!(".{}", self.base_domain)) {
            return self.classify_label(first_label(prefix));
        }

        // Anything else falls back to generic label rules, which keep
        // development hosts like demo.localhost working.
        if is_local_host(&hostname) {
            return TenantScope::Base;
        }

        let labels: Vec<&str> = hostname.split('.').collect();
        if labels.len() >= 2 {
            let first = labels[0];
            if labels.len() == 2 && labels[1] != "localhost" {
                // A bare two-label domain is somebody's apex, not a tenant.
                return TenantScope::Base;
            }
            return self.classify_label(first);
        }

        TenantScope::Base
    }

    fn classify_label(&self, label: &str) -> TenantScope {
        if label.is_empty() || label == "admin" || RESERVED_LABELS.contains(&label) {
            TenantScope::Base
        } else {
            TenantScope::Tenant(label.to_string())
        }
    }
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 keeps its colons; only a bare trailing port is cut.
    if host.starts_with('[') {
        match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        }
    } else {
        host.split(':').next().unwrap_or(host)
    }
}

fn first_label(prefix: &str) -> &str {
    prefix.split('.').next().unwrap_or(prefix)
}

fn is_local_host(hostname: &str) -> bool {
    hostname == "localhost"
        || hostname == "127.0.0.1"
        || hostname.starts_with("192.168.")
        || hostname.starts_with("10.")
        || hostname.starts_with("172.")
}
