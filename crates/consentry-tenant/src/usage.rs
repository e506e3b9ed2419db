//! Usage classification and reporting.
//!
//! Levels are derived from the live count against the tenant's own
//! ceiling. Counts are always taken fresh; nothing here caches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::limits::{Limit, ResourceKind};
use crate::model::{Tenant, TenantStatus};

/// How close a tenant is to one of its ceilings.
///
/// `warning` starts at 70% of the ceiling, `critical` at 90%, `blocked`
/// at 100%. A ceiling of zero is always `blocked`; unlimited is always
/// `ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UsageLevel {
    Ok,
    Warning,
    Critical,
    Blocked,
}

/// Classify a live count against a ceiling.
pub fn classify(current: u64, limit: Limit) -> UsageLevel {
    match limit.max() {
        None => UsageLevel::Ok,
        Some(0) => UsageLevel::Blocked,
        Some(max) => {
            if current >= max {
                UsageLevel::Blocked
            } else if current as u128 * 10 >= max as u128 * 9 {
                UsageLevel::Critical
            } else if current as u128 * 10 >= max as u128 * 7 {
                UsageLevel::Warning
            } else {
                UsageLevel::Ok
            }
        }
    }
}

/// Integer percentage of the ceiling used, rounded, clamped to 100.
/// Unlimited reports 0; a zero ceiling reports 100.
pub fn percentage(current: u64, limit: Limit) -> u32 {
    match limit.max() {
        None => 0,
        Some(0) => 100,
        Some(max) => {
            let pct = (current as f64 / max as f64) * 100.0;
            pct.round().min(100.0) as u32
        }
    }
}

/// Estimated file storage in megabytes for a number of live consents.
/// Flat half-megabyte per consent, rounded up on the half.
pub fn estimated_storage_mb(live_consents: u64) -> u64 {
    (live_consents + 1) / 2
}

/// Usage of one resource kind.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    /// Which resource.
    #[serde(rename = "resourceType")]
    pub resource: ResourceKind,
    /// Live count.
    pub current: u64,
    /// The tenant's ceiling; `-1` means unlimited.
    pub max: Limit,
    /// Rounded percentage of the ceiling used.
    pub percentage: u32,
    /// Classification of `current` against `max`.
    pub level: UsageLevel,
}

impl ResourceUsage {
    /// Build from a fresh count and the tenant's ceiling.
    pub fn compute(resource: ResourceKind, current: u64, max: Limit) -> Self {
        Self {
            resource,
            current,
            max,
            percentage: percentage(current, max),
            level: classify(current, max),
        }
    }

    /// True when one more item would still fit.
    pub fn has_room(&self) -> bool {
        self.level != UsageLevel::Blocked
    }
}

/// Plan line of a usage report.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    /// Plan id the tenant is on.
    pub id: String,
    /// Plan display name, falling back to the id for retired plans.
    pub name: String,
    /// Tenant account status.
    pub status: TenantStatus,
    /// Billing cycle.
    pub billing_cycle: crate::model::BillingCycle,
    /// Locked-in price for the cycle, in COP minor units.
    pub price: u64,
    /// Trial end, when on trial.
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// Subscription end, when subscribed.
    pub subscription_ends_at: Option<DateTime<Utc>>,
}

/// One actionable warning in a usage report.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageAlert {
    /// Severity.
    pub level: UsageLevel,
    /// What the alert is about; a resource wire name or "trial".
    pub resource: String,
    /// Human-readable message carrying "(current/max)" where counts apply.
    pub message: String,
}

/// Full usage report for one tenant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    /// Plan and subscription summary.
    pub plan: PlanSummary,
    /// Per-resource usage, in report order.
    pub resources: Vec<ResourceUsage>,
    /// Alerts for anything at warning or above, plus trial expiry.
    pub alerts: Vec<UsageAlert>,
}

impl UsageReport {
    /// Usage entry for one kind.
    pub fn resource(&self, kind: ResourceKind) -> Option<&ResourceUsage> {
        self.resources.iter().find(|r| r.resource == kind)
    }

    /// Worst level across all resources.
    pub fn worst_level(&self) -> UsageLevel {
        self.resources
            .iter()
            .map(|r| r.level)
            .max()
            .unwrap_or(UsageLevel::Ok)
    }
}

/// Alerts for a report: every resource at warning or above, then trial
/// expiry when it is near or past.
pub fn build_alerts(
    resources: &[ResourceUsage],
    tenant: &Tenant,
    now: DateTime<Utc>,
) -> Vec<UsageAlert> {
    let mut alerts = Vec::new();

    for usage in resources {
        let max = usage.max;
        match usage.level {
            UsageLevel::Ok => {}
            UsageLevel::Warning | UsageLevel::Critical => alerts.push(UsageAlert {
                level: usage.level,
                resource: usage.resource.wire_name().to_string(),
                message: format!(
                    "Approaching the {} limit ({}/{})",
                    usage.resource, usage.current, max
                ),
            }),
            UsageLevel::Blocked => alerts.push(UsageAlert {
                level: UsageLevel::Blocked,
                resource: usage.resource.wire_name().to_string(),
                message: format!(
                    "Limit reached for {} ({}/{})",
                    usage.resource, usage.current, max
                ),
            }),
        }
    }

    if tenant.status == TenantStatus::Trial {
        if let Some(ends) = tenant.trial_ends_at {
            let days_left = (ends - now).num_days();
            if ends <= now {
                alerts.push(UsageAlert {
                    level: UsageLevel::Critical,
                    resource: "trial".to_string(),
                    message: "Trial period has expired".to_string(),
                });
            } else if days_left <= 7 {
                alerts.push(UsageAlert {
                    level: UsageLevel::Warning,
                    resource: "trial".to_string(),
                    message: format!("Trial period ends in {} days", days_left.max(1)),
                });
            }
        }
    }

    alerts
}

/// Tenant counts grouped by status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub trial: u64,
    pub active: u64,
    pub suspended: u64,
    pub expired: u64,
}

impl StatusBreakdown {
    /// Count one tenant.
    pub fn record(&mut self, status: TenantStatus) {
        match status {
            TenantStatus::Trial => self.trial += 1,
            TenantStatus::Active => self.active += 1,
            TenantStatus::Suspended => self.suspended += 1,
            TenantStatus::Expired => self.expired += 1,
        }
    }
}

/// Platform-wide dashboard numbers across all live tenants.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    /// Live tenants.
    pub total_tenants: u64,
    /// Live tenants by status.
    pub by_status: StatusBreakdown,
    /// Live tenants by plan id.
    pub by_plan: BTreeMap<String, u64>,
    /// Live staff accounts across all tenants.
    pub total_users: u64,
    /// Live branches across all tenants.
    pub total_branches: u64,
    /// Live consents across all tenants.
    pub total_consents: u64,
    /// Tenants with any resource at warning or critical.
    pub tenants_near_limit: u64,
    /// Tenants with any resource blocked.
    pub tenants_at_limit: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_boundaries() {
        let ten = Limit::capped(10);
        assert_eq!(classify(0, ten), UsageLevel::Ok);
        assert_eq!(classify(6, ten), UsageLevel::Ok);
        assert_eq!(classify(7, ten), UsageLevel::Warning);
        assert_eq!(classify(8, ten), UsageLevel::Warning);
        assert_eq!(classify(9, ten), UsageLevel::Critical);
        assert_eq!(classify(10, ten), UsageLevel::Blocked);
        assert_eq!(classify(11, ten), UsageLevel::Blocked);
    }

    #[test]
    fn test_classify_small_ceiling() {
        let five = Limit::capped(5);
        // 4/5 is 80%, inside the warning band but not critical.
        assert_eq!(classify(4, five), UsageLevel::Warning);
        assert_eq!(classify(5, five), UsageLevel::Blocked);
    }

    #[test]
    fn test_classify_edge_ceilings() {
        assert_eq!(classify(0, Limit::capped(0)), UsageLevel::Blocked);
        assert_eq!(classify(u64::MAX, Limit::UNLIMITED), UsageLevel::Ok);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, Limit::capped(10)), 0);
        assert_eq!(percentage(3, Limit::capped(10)), 30);
        assert_eq!(percentage(1, Limit::capped(3)), 33);
        assert_eq!(percentage(2, Limit::capped(3)), 67);
        assert_eq!(percentage(12, Limit::capped(10)), 100);
        assert_eq!(percentage(50, Limit::UNLIMITED), 0);
        assert_eq!(percentage(0, Limit::capped(0)), 100);
    }

    #[test]
    fn test_storage_estimate_rounds_half_up() {
        assert_eq!(estimated_storage_mb(0), 0);
        assert_eq!(estimated_storage_mb(1), 1);
        assert_eq!(estimated_storage_mb(2), 1);
        assert_eq!(estimated_storage_mb(3), 2);
        assert_eq!(estimated_storage_mb(10), 5);
    }

    #[test]
    fn test_resource_usage_compute() {
        let usage = ResourceUsage::compute(ResourceKind::Branches, 5, Limit::capped(5));
        assert_eq!(usage.percentage, 100);
        assert_eq!(usage.level, UsageLevel::Blocked);
        assert!(!usage.has_room());

        let json = serde_json::to_value(&usage).unwrap();
        assert_eq!(json["resourceType"], "branches");
        assert_eq!(json["max"], 5);
    }

    #[test]
    fn test_alert_messages_carry_counts() {
        let resources = vec![
            ResourceUsage::compute(ResourceKind::Branches, 5, Limit::capped(5)),
            ResourceUsage::compute(ResourceKind::Users, 8, Limit::capped(10)),
            ResourceUsage::compute(ResourceKind::Consents, 1, Limit::capped(100)),
        ];
        let tenant = Tenant::new("Clinic", "clinic");
        let alerts = build_alerts(&resources, &tenant, Utc::now());

        assert_eq!(alerts.len(), 2);
        assert!(alerts[0].message.contains("(5/5)"));
        assert_eq!(alerts[0].level, UsageLevel::Blocked);
        assert!(alerts[1].message.contains("(8/10)"));
        assert_eq!(alerts[1].level, UsageLevel::Warning);
    }

    #[test]
    fn test_trial_alerts() {
        let now = Utc::now();
        let mut tenant = Tenant::new("Clinic", "clinic");

        tenant.trial_ends_at = Some(now + chrono::Duration::days(3));
        let alerts = build_alerts(&[], &tenant, now);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].resource, "trial");
        assert_eq!(alerts[0].level, UsageLevel::Warning);

        tenant.trial_ends_at = Some(now - chrono::Duration::days(1));
        let alerts = build_alerts(&[], &tenant, now);
        assert_eq!(alerts[0].level, UsageLevel::Critical);

        // Far-off trials and non-trial tenants stay quiet.
        tenant.trial_ends_at = Some(now + chrono::Duration::days(20));
        assert!(build_alerts(&[], &tenant, now).is_empty());
        tenant.status = TenantStatus::Suspended;
        tenant.trial_ends_at = Some(now - chrono::Duration::days(1));
        assert!(build_alerts(&[], &tenant, now).is_empty());
    }

    proptest! {
        #[test]
        fn prop_blocked_iff_at_or_over_ceiling(current in 0u64..10_000, max in 1u64..10_000) {
            let level = classify(current, Limit::capped(max));
            prop_assert_eq!(level == UsageLevel::Blocked, current >= max);
        }

        #[test]
        fn prop_level_monotone_in_current(current in 0u64..9_999, max in 1u64..10_000) {
            let limit = Limit::capped(max);
            prop_assert!(classify(current, limit) <= classify(current + 1, limit));
        }

        #[test]
        fn prop_unlimited_never_alerts(current in 0u64..u64::MAX) {
            prop_assert_eq!(classify(current, Limit::UNLIMITED), UsageLevel::Ok);
            prop_assert_eq!(percentage(current, Limit::UNLIMITED), 0);
        }
    }
}
