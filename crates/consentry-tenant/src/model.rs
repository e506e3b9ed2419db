//! Tenant records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::catalog::PlanFeatures;
use crate::limits::TenantLimits;

/// Unique tenant identifier.
pub type TenantId = Uuid;

/// Tenant account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    /// Evaluating, not yet paying.
    Trial,
    /// Paying and in good standing.
    Active,
    /// Turned off by an operator, usually for non-payment.
    Suspended,
    /// Subscription lapsed.
    Expired,
}

impl TenantStatus {
    /// Wire form, matching the serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Expired => "expired",
        }
    }

    /// True when tenant-scoped requests must be refused.
    pub fn blocks_access(&self) -> bool {
        matches!(self, Self::Suspended | Self::Expired)
    }
}

impl std::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription billing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Annual,
}

impl Default for BillingCycle {
    fn default() -> Self {
        Self::Monthly
    }
}

/// One clinic, practice or hospital on the platform.
///
/// Limits and features are copies made when the plan was assigned, not
/// references into the catalog. Later plan edits leave them untouched.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    /// Unique identifier.
    pub id: TenantId,
    /// Display name, unique among live tenants.
    pub name: String,
    /// Subdomain label, unique among live tenants.
    pub slug: String,
    /// Logo URL, if uploaded.
    pub logo: Option<String>,
    /// Account status.
    pub status: TenantStatus,
    /// Id of the plan assigned at provisioning or the last plan change.
    pub plan: String,
    /// Price locked in at assignment, in COP minor units per cycle.
    pub plan_price: u64,
    /// Billing cycle.
    pub billing_cycle: BillingCycle,
    /// When the current plan took effect.
    pub plan_started_at: Option<DateTime<Utc>>,
    /// When the current plan period ends.
    pub plan_expires_at: Option<DateTime<Utc>>,
    /// Day of month invoices are cut, capped at 28.
    pub billing_day: u8,
    /// Renew automatically at period end.
    pub auto_renew: bool,
    /// Billing contact name.
    pub contact_name: Option<String>,
    /// Billing contact email.
    pub contact_email: Option<String>,
    /// Billing contact phone.
    pub contact_phone: Option<String>,
    /// Resource ceilings, copied from the plan then editable per tenant.
    pub limits: TenantLimits,
    /// Feature flags, copied from the plan.
    pub features: PlanFeatures,
    /// End of the trial window, when status is trial.
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// End of the paid subscription, when one exists.
    pub subscription_ends_at: Option<DateTime<Utc>>,
    /// Free-form tenant settings.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub settings: HashMap<String, serde_json::Value>,
    /// Free-form operator notes.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker. Deleted tenants are invisible to lookups.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Tenant {
    /// Create a bare trial tenant. Provisioning normally goes through
    /// `TenantRegistry`, which also applies a plan; this is the raw record.
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: slug.into(),
            logo: None,
            status: TenantStatus::Trial,
            plan: "free".to_string(),
            plan_price: 0,
            billing_cycle: BillingCycle::Monthly,
            plan_started_at: None,
            plan_expires_at: None,
            billing_day: now_billing_day(now),
            auto_renew: true,
            contact_name: None,
            contact_email: None,
            contact_phone: None,
            limits: TenantLimits::default(),
            features: PlanFeatures::default(),
            trial_ends_at: None,
            subscription_ends_at: None,
            settings: HashMap::new(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// True until soft-deleted.
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Bump the modification time.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Invoice day for a signup date. Clamped to 28 so every month has one.
pub fn now_billing_day(when: DateTime<Utc>) -> u8 {
    use chrono::Datelike;
    when.day().min(28) as u8
}

/// Derive a subdomain slug from a display name.
///
/// Lowercases, folds common accented letters to ASCII, turns every other
/// run of characters into a single `-` and trims the ends. "Clínica São
/// João" becomes "clinica-sao-joao".
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        match fold_ascii(c) {
            Some(c) => slug.push(c),
            None => {
                if !slug.is_empty() && !slug.ends_with('-') {
                    slug.push('-');
                }
            }
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// True for a slug `slugify` would leave unchanged.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn fold_ascii(c: char) -> Option<char> {
    match c {
        'a'..='z' | '0'..='9' => Some(c),
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => Some('a'),
        'é' | 'è' | 'ë' | 'ê' => Some('e'),
        'í' | 'ì' | 'ï' | 'î' => Some('i'),
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => Some('o'),
        'ú' | 'ù' | 'ü' | 'û' => Some('u'),
        'ñ' => Some('n'),
        'ç' => Some('c'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Clínica São João"), "clinica-sao-joao");
        assert_eq!(slugify("  Dental  Care  "), "dental-care");
        assert_eq!(slugify("--Foo!!Bar--"), "foo-bar");
        assert_eq!(slugify("Niño & Cía. 24/7"), "nino-cia-24-7");
        assert_eq!(slugify("ALREADY-OK"), "already-ok");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn test_valid_slug() {
        assert!(is_valid_slug("clinica-sao-joao"));
        assert!(is_valid_slug("a1"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Foo"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("trailing-"));
        assert!(!is_valid_slug("double--dash"));
        assert!(!is_valid_slug("under_score"));
    }

    #[test]
    fn test_slugify_output_is_valid() {
        for name in ["Clínica São João", "A B C", "X", "Née 9"] {
            assert!(is_valid_slug(&slugify(name)), "bad slug for {name:?}");
        }
    }

    #[test]
    fn test_status_blocks_access() {
        assert!(!TenantStatus::Trial.blocks_access());
        assert!(!TenantStatus::Active.blocks_access());
        assert!(TenantStatus::Suspended.blocks_access());
        assert!(TenantStatus::Expired.blocks_access());
    }

    #[test]
    fn test_status_wire_form() {
        let json = serde_json::to_string(&TenantStatus::Suspended).unwrap();
        assert_eq!(json, "\"suspended\"");
        let parsed: TenantStatus = serde_json::from_str("\"trial\"").unwrap();
        assert_eq!(parsed, TenantStatus::Trial);
    }

    #[test]
    fn test_billing_day_clamped() {
        let jan_31 = Utc.with_ymd_and_hms(2025, 1, 31, 10, 0, 0).unwrap();
        assert_eq!(now_billing_day(jan_31), 28);
        let jan_5 = Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap();
        assert_eq!(now_billing_day(jan_5), 5);
    }

    #[test]
    fn test_new_tenant_defaults() {
        let tenant = Tenant::new("Dental Care", "dental-care");
        assert_eq!(tenant.status, TenantStatus::Trial);
        assert_eq!(tenant.plan, "free");
        assert!(tenant.is_live());
        assert!(tenant.auto_renew);
        assert!(tenant.billing_day >= 1 && tenant.billing_day <= 28);
    }
}
