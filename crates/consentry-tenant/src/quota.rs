//! Quota enforcement.
//!
//! Every decision is made against a fresh live count from the ledger and
//! the tenant's own ceilings. The admitting step is the ledger's atomic
//! insert; `ensure_capacity` exists for early, friendly rejections and
//! must not be trusted as the only gate.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::catalog::PlanCatalog;
use crate::directory::{DirectoryError, ResourceLedger, ResourceRow};
use crate::limits::ResourceKind;
use crate::model::Tenant;
use crate::usage::{
    build_alerts, estimated_storage_mb, GlobalStats, PlanSummary, ResourceUsage, UsageLevel,
    UsageReport,
};

/// Quota failures.
#[derive(Debug, Error)]
pub enum QuotaError {
    /// The tenant is at its ceiling for this resource.
    #[error("limit reached for {resource} ({current}/{max})")]
    LimitReached {
        /// Which resource hit its ceiling.
        resource: ResourceKind,
        /// Live count at the time of the attempt.
        current: u64,
        /// The tenant's ceiling.
        max: u64,
    },

    /// The ledger or directory failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Fold the ledger's quota refusal into the quota error so callers see
/// one shape regardless of which gate fired.
fn lift(err: DirectoryError) -> QuotaError {
    match err {
        DirectoryError::QuotaExceeded {
            resource,
            current,
            max,
        } => QuotaError::LimitReached {
            resource,
            current,
            max,
        },
        other => QuotaError::Directory(other),
    }
}

/// Enforces per-tenant resource ceilings and builds usage reports.
#[derive(Clone)]
pub struct QuotaEnforcer {
    ledger: Arc<dyn ResourceLedger>,
    catalog: Arc<PlanCatalog>,
}

impl QuotaEnforcer {
    /// Build over a ledger and the plan catalog.
    pub fn new(ledger: Arc<dyn ResourceLedger>, catalog: Arc<PlanCatalog>) -> Self {
        Self { ledger, catalog }
    }

    /// Fresh live count for one kind. Storage is derived from the number
    /// of live consents rather than counted directly.
    pub async fn current_count(
        &self,
        tenant: &Tenant,
        kind: ResourceKind,
    ) -> Result<u64, QuotaError> {
        let count = match kind {
            ResourceKind::StorageMb => {
                let consents = self
                    .ledger
                    .live_count(tenant.id, ResourceKind::Consents)
                    .await?;
                estimated_storage_mb(consents)
            }
            counted => self.ledger.live_count(tenant.id, counted).await?,
        };
        Ok(count)
    }

    /// Usage of one kind, classified against the tenant's ceiling.
    pub async fn usage_of(
        &self,
        tenant: &Tenant,
        kind: ResourceKind,
    ) -> Result<ResourceUsage, QuotaError> {
        let current = self.current_count(tenant, kind).await?;
        Ok(ResourceUsage::compute(kind, current, tenant.limits.get(kind)))
    }

    /// Refuse early when the tenant has no room for one more item.
    ///
    /// Advisory only. The create path still goes through the ledger's
    /// atomic insert, which is what holds under races.
    pub async fn ensure_capacity(
        &self,
        tenant: &Tenant,
        kind: ResourceKind,
    ) -> Result<ResourceUsage, QuotaError> {
        let usage = self.usage_of(tenant, kind).await?;
        if usage.has_room() {
            Ok(usage)
        } else {
            Err(QuotaError::LimitReached {
                resource: kind,
                current: usage.current,
                max: usage.max.max().unwrap_or(0),
            })
        }
    }

    /// Create one resource row, admitting only under the ceiling.
    pub async fn create_row(
        &self,
        tenant: &Tenant,
        kind: ResourceKind,
        name: &str,
    ) -> Result<ResourceRow, QuotaError> {
        let row = self
            .ledger
            .insert_row(tenant, kind, name)
            .await
            .map_err(lift)?;
        debug!(tenant = %tenant.slug, kind = %kind, row = %row.id, "resource row created");
        Ok(row)
    }

    /// Soft-delete one resource row, freeing a slot.
    pub async fn delete_row(
        &self,
        tenant: &Tenant,
        kind: ResourceKind,
        row: uuid::Uuid,
    ) -> Result<(), QuotaError> {
        self.ledger
            .soft_delete_row(tenant.id, kind, row)
            .await
            .map_err(lift)?;
        Ok(())
    }

    /// Live rows of one kind.
    pub async fn rows(
        &self,
        tenant: &Tenant,
        kind: ResourceKind,
    ) -> Result<Vec<ResourceRow>, QuotaError> {
        Ok(self.ledger.list_rows(tenant.id, kind).await?)
    }

    /// Full usage report for one tenant, counted fresh.
    pub async fn report(&self, tenant: &Tenant) -> Result<UsageReport, QuotaError> {
        let mut resources = Vec::with_capacity(ResourceKind::ALL.len());
        for kind in ResourceKind::ALL {
            resources.push(self.usage_of(tenant, kind).await?);
        }

        // Retired plan ids still render, falling back to the raw id.
        let plan_name = self
            .catalog
            .plan(&tenant.plan)
            .map(|p| p.name)
            .unwrap_or_else(|| tenant.plan.clone());

        let alerts = build_alerts(&resources, tenant, chrono::Utc::now());

        Ok(UsageReport {
            plan: PlanSummary {
                id: tenant.plan.clone(),
                name: plan_name,
                status: tenant.status,
                billing_cycle: tenant.billing_cycle,
                price: tenant.plan_price,
                trial_ends_at: tenant.trial_ends_at,
                subscription_ends_at: tenant.subscription_ends_at,
            },
            resources,
            alerts,
        })
    }

    /// Platform-wide dashboard numbers across the given live tenants.
    ///
    /// A tenant counts as near-limit when any resource sits at warning
    /// or critical, and as at-limit when any resource is blocked; the
    /// two counters are independent.
    pub async fn global_stats(&self, tenants: &[Tenant]) -> Result<GlobalStats, QuotaError> {
        let mut stats = GlobalStats::default();

        for tenant in tenants {
            stats.total_tenants += 1;
            stats.by_status.record(tenant.status);
            *stats.by_plan.entry(tenant.plan.clone()).or_insert(0) += 1;

            stats.total_users += self.current_count(tenant, ResourceKind::Users).await?;
            stats.total_branches += self.current_count(tenant, ResourceKind::Branches).await?;
            stats.total_consents += self.current_count(tenant, ResourceKind::Consents).await?;

            let mut near = false;
            let mut at = false;
            for kind in ResourceKind::ALL {
                let usage = self.usage_of(tenant, kind).await?;
                match usage.level {
                    UsageLevel::Warning | UsageLevel::Critical => near = true,
                    UsageLevel::Blocked => at = true,
                    UsageLevel::Ok => {}
                }
            }
            if near {
                stats.tenants_near_limit += 1;
            }
            if at {
                stats.tenants_at_limit += 1;
            }
        }

        Ok(stats)
    }
}
