//! Tenant lifecycle management.
//!
//! Provisioning copies the chosen plan's limits, features and price onto
//! the tenant record. From then on the record stands alone; catalog
//! edits reach a tenant only through an explicit plan change.

use chrono::{DateTime, Duration, Months, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use utoipa::ToSchema;

use crate::catalog::{CatalogError, LimitsPatch, PlanCatalog};
use crate::directory::{DirectoryError, TenantDirectory};
use crate::model::{
    is_valid_slug, now_billing_day, slugify, BillingCycle, Tenant, TenantId, TenantStatus,
};

/// Days of trial granted at signup when no explicit end is given.
pub const TRIAL_DAYS: i64 = 30;

/// Lifecycle failures.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// No live tenant matched.
    #[error("tenant not found")]
    NotFound,

    /// The name yields no usable subdomain slug.
    #[error("cannot derive a slug from {0:?}")]
    InvalidSlug(String),

    /// The requested plan does not exist in the catalog.
    #[error("unknown plan: {0}")]
    UnknownPlan(String),

    /// The directory refused the operation.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The catalog failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Provisioning request.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTenant {
    /// Display name. Required; everything else has defaults.
    pub name: String,
    /// Subdomain slug; derived from the name when absent.
    pub slug: Option<String>,
    /// Plan id; "free" when absent.
    pub plan: Option<String>,
    /// Billing cycle; monthly when absent.
    pub billing_cycle: Option<BillingCycle>,
    /// Initial status; trial when absent.
    pub status: Option<TenantStatus>,
    /// Billing contact name.
    pub contact_name: Option<String>,
    /// Billing contact email.
    pub contact_email: Option<String>,
    /// Billing contact phone.
    pub contact_phone: Option<String>,
    /// Per-tenant ceiling overrides applied on top of the plan's.
    pub limits: Option<LimitsPatch>,
    /// Explicit trial end, overriding the default window.
    pub trial_ends_at: Option<DateTime<Utc>>,
}

/// Partial edit of a tenant's own record. Absent fields are unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantUpdate {
    pub name: Option<String>,
    pub logo: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub auto_renew: Option<bool>,
    /// Settings entries to merge in.
    #[schema(value_type = Object)]
    pub settings: Option<HashMap<String, serde_json::Value>>,
}

/// Provisioning, plan assignment and status transitions for tenants.
pub struct TenantRegistry {
    directory: Arc<dyn TenantDirectory>,
    catalog: Arc<PlanCatalog>,
}

impl TenantRegistry {
    /// Build over a directory and the plan catalog.
    pub fn new(directory: Arc<dyn TenantDirectory>, catalog: Arc<PlanCatalog>) -> Self {
        Self { directory, catalog }
    }

    /// Provision a new tenant.
    pub async fn provision(&self, req: NewTenant) -> Result<Tenant, LifecycleError> {
        let slug = match &req.slug {
            Some(given) => slugify(given),
            None => slugify(&req.name),
        };
        if !is_valid_slug(&slug) {
            return Err(LifecycleError::InvalidSlug(
                req.slug.unwrap_or(req.name),
            ));
        }

        let plan_id = req.plan.unwrap_or_else(|| "free".to_string());
        let plan = self
            .catalog
            .plan(&plan_id)
            .ok_or_else(|| LifecycleError::UnknownPlan(plan_id.clone()))?;

        let now = Utc::now();
        let cycle = req.billing_cycle.unwrap_or_default();
        let status = req.status.unwrap_or(TenantStatus::Trial);

        let mut tenant = Tenant::new(req.name, slug);
        tenant.status = status;
        tenant.plan = plan.id.clone();
        tenant.plan_price = plan.price_for(cycle);
        tenant.billing_cycle = cycle;
        tenant.plan_started_at = Some(now);
        tenant.plan_expires_at = plan_period_end(now, cycle);
        tenant.billing_day = now_billing_day(now);
        tenant.contact_name = req.contact_name;
        tenant.contact_email = req.contact_email;
        tenant.contact_phone = req.contact_phone;

        // Plan values are copied, then per-tenant overrides layered on.
        tenant.limits = plan.limits.clone();
        tenant.features = plan.features.clone();
        if let Some(overrides) = &req.limits {
            overrides.apply_to(&mut tenant.limits);
        }

        if status == TenantStatus::Trial {
            tenant.trial_ends_at = req
                .trial_ends_at
                .or_else(|| Some(now + Duration::days(TRIAL_DAYS)));
        }
        if tenant.plan_price > 0 && status == TenantStatus::Active {
            tenant.subscription_ends_at = tenant.plan_expires_at;
        }

        let tenant = self.directory.insert(tenant).await?;
        info!(tenant = %tenant.slug, plan = %tenant.plan, status = %tenant.status, "tenant provisioned");
        Ok(tenant)
    }

    /// One live tenant by id.
    pub async fn find(&self, id: TenantId) -> Result<Tenant, LifecycleError> {
        self.directory
            .find_by_id(id)
            .await?
            .ok_or(LifecycleError::NotFound)
    }

    /// One live tenant by slug.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Tenant, LifecycleError> {
        self.directory
            .find_by_slug(slug)
            .await?
            .ok_or(LifecycleError::NotFound)
    }

    /// All live tenants.
    pub async fn list(&self) -> Result<Vec<Tenant>, LifecycleError> {
        Ok(self.directory.list().await?)
    }

    /// Edit a tenant's own fields.
    pub async fn update(&self, id: TenantId, update: TenantUpdate) -> Result<Tenant, LifecycleError> {
        let mut tenant = self.find(id).await?;

        if let Some(name) = update.name {
            if !name.eq_ignore_ascii_case(&tenant.name) {
                let taken = self
                    .directory
                    .list()
                    .await?
                    .iter()
                    .any(|t| t.id != id && t.name.eq_ignore_ascii_case(&name));
                if taken {
                    return Err(DirectoryError::NameInUse(name).into());
                }
            }
            tenant.name = name;
        }
        if let Some(logo) = update.logo {
            tenant.logo = Some(logo);
        }
        if let Some(v) = update.contact_name {
            tenant.contact_name = Some(v);
        }
        if let Some(v) = update.contact_email {
            tenant.contact_email = Some(v);
        }
        if let Some(v) = update.contact_phone {
            tenant.contact_phone = Some(v);
        }
        if let Some(v) = update.auto_renew {
            tenant.auto_renew = v;
        }
        if let Some(settings) = update.settings {
            tenant.settings.extend(settings);
        }

        Ok(self.directory.save(tenant).await?)
    }

    /// Override individual ceilings for one tenant.
    pub async fn override_limits(
        &self,
        id: TenantId,
        patch: LimitsPatch,
    ) -> Result<Tenant, LifecycleError> {
        let mut tenant = self.find(id).await?;
        patch.apply_to(&mut tenant.limits);
        let tenant = self.directory.save(tenant).await?;
        info!(tenant = %tenant.slug, "tenant limits overridden");
        Ok(tenant)
    }

    /// Move a tenant to another plan, copying that plan's current
    /// values. The only way catalog numbers ever reach a tenant.
    pub async fn change_plan(
        &self,
        id: TenantId,
        plan_id: &str,
        cycle: Option<BillingCycle>,
    ) -> Result<Tenant, LifecycleError> {
        let plan = self
            .catalog
            .plan(plan_id)
            .ok_or_else(|| LifecycleError::UnknownPlan(plan_id.to_string()))?;

        let mut tenant = self.find(id).await?;
        let now = Utc::now();
        let cycle = cycle.unwrap_or(tenant.billing_cycle);

        tenant.plan = plan.id.clone();
        tenant.plan_price = plan.price_for(cycle);
        tenant.billing_cycle = cycle;
        tenant.plan_started_at = Some(now);
        tenant.plan_expires_at = plan_period_end(now, cycle);
        tenant.limits = plan.limits.clone();
        tenant.features = plan.features.clone();
        if tenant.plan_price > 0 {
            tenant.subscription_ends_at = tenant.plan_expires_at;
        }

        let tenant = self.directory.save(tenant).await?;
        info!(tenant = %tenant.slug, plan = %tenant.plan, "tenant plan changed");
        Ok(tenant)
    }

    /// Suspend a tenant. Tenant-scoped requests start failing at once.
    pub async fn suspend(&self, id: TenantId) -> Result<Tenant, LifecycleError> {
        self.set_status(id, TenantStatus::Suspended).await
    }

    /// Reactivate a suspended or expired tenant.
    pub async fn activate(&self, id: TenantId) -> Result<Tenant, LifecycleError> {
        self.set_status(id, TenantStatus::Active).await
    }

    async fn set_status(
        &self,
        id: TenantId,
        status: TenantStatus,
    ) -> Result<Tenant, LifecycleError> {
        let mut tenant = self.find(id).await?;
        let previous = tenant.status;
        tenant.status = status;
        let tenant = self.directory.save(tenant).await?;
        info!(tenant = %tenant.slug, from = %previous, to = %status, "tenant status changed");
        Ok(tenant)
    }

    /// Soft-delete a tenant, freeing its slug and name for reuse.
    pub async fn soft_delete(&self, id: TenantId) -> Result<(), LifecycleError> {
        let tenant = self.find(id).await?;
        self.directory.soft_delete(id).await?;
        info!(tenant = %tenant.slug, "tenant soft-deleted");
        Ok(())
    }
}

/// End of one plan period from its start.
fn plan_period_end(start: DateTime<Utc>, cycle: BillingCycle) -> Option<DateTime<Utc>> {
    let months = match cycle {
        BillingCycle::Monthly => Months::new(1),
        BillingCycle::Annual => Months::new(12),
    };
    start.checked_add_months(months)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryPlanStore;
    use crate::directory::MemoryDirectory;
    use crate::limits::{Limit, ResourceKind};

    async fn registry() -> (Arc<PlanCatalog>, TenantRegistry) {
        let catalog = Arc::new(
            PlanCatalog::open(Arc::new(MemoryPlanStore::new()))
                .await
                .unwrap(),
        );
        let registry = TenantRegistry::new(Arc::new(MemoryDirectory::new()), catalog.clone());
        (catalog, registry)
    }

    fn request(name: &str) -> NewTenant {
        NewTenant {
            name: name.to_string(),
            ..NewTenant::default()
        }
    }

    #[tokio::test]
    async fn test_provision_defaults() {
        let (_, registry) = registry().await;
        let tenant = registry
            .provision(request("Clínica São João"))
            .await
            .unwrap();

        assert_eq!(tenant.slug, "clinica-sao-joao");
        assert_eq!(tenant.plan, "free");
        assert_eq!(tenant.status, TenantStatus::Trial);
        assert_eq!(tenant.plan_price, 0);
        assert_eq!(tenant.limits.users, Limit::capped(1));

        let ends = tenant.trial_ends_at.unwrap();
        let days = (ends - Utc::now()).num_days();
        assert!((29..=30).contains(&days));
        assert!(tenant.billing_day >= 1 && tenant.billing_day <= 28);
    }

    #[tokio::test]
    async fn test_provision_copies_plan_values() {
        let (_, registry) = registry().await;
        let tenant = registry
            .provision(NewTenant {
                name: "Big Hospital".to_string(),
                plan: Some("professional".to_string()),
                billing_cycle: Some(BillingCycle::Annual),
                status: Some(TenantStatus::Active),
                ..NewTenant::default()
            })
            .await
            .unwrap();

        assert_eq!(tenant.plan_price, 1_194_202);
        assert_eq!(tenant.limits.users, Limit::capped(5));
        assert_eq!(tenant.limits.branches, Limit::capped(3));
        assert!(tenant.features.advanced_reports);
        assert!(tenant.trial_ends_at.is_none());
        assert_eq!(tenant.subscription_ends_at, tenant.plan_expires_at);

        let expires = tenant.plan_expires_at.unwrap();
        let started = tenant.plan_started_at.unwrap();
        assert!((360..=370).contains(&(expires - started).num_days()));
    }

    #[tokio::test]
    async fn test_provision_limit_overrides() {
        let (_, registry) = registry().await;
        let tenant = registry
            .provision(NewTenant {
                name: "Clinic".to_string(),
                plan: Some("basic".to_string()),
                limits: Some(LimitsPatch {
                    branches: Some(Limit::capped(4)),
                    ..LimitsPatch::default()
                }),
                ..NewTenant::default()
            })
            .await
            .unwrap();

        assert_eq!(tenant.limits.branches, Limit::capped(4));
        // The rest stays on plan values.
        assert_eq!(tenant.limits.users, Limit::capped(2));
    }

    #[tokio::test]
    async fn test_provision_rejects_bad_input() {
        let (_, registry) = registry().await;

        let err = registry.provision(request("???")).await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidSlug(_)));

        let err = registry
            .provision(NewTenant {
                name: "Clinic".to_string(),
                plan: Some("gold".to_string()),
                ..NewTenant::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::UnknownPlan(p) if p == "gold"));

        registry.provision(request("Clinic")).await.unwrap();
        let err = registry
            .provision(NewTenant {
                name: "Other Name".to_string(),
                slug: Some("clinic".to_string()),
                ..NewTenant::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Directory(DirectoryError::SlugInUse(_))
        ));
    }

    #[tokio::test]
    async fn test_suspend_and_activate() {
        let (_, registry) = registry().await;
        let tenant = registry.provision(request("Clinic")).await.unwrap();

        let suspended = registry.suspend(tenant.id).await.unwrap();
        assert_eq!(suspended.status, TenantStatus::Suspended);
        assert!(suspended.status.blocks_access());

        let active = registry.activate(tenant.id).await.unwrap();
        assert_eq!(active.status, TenantStatus::Active);
        assert!(active.updated_at >= tenant.updated_at);
    }

    #[tokio::test]
    async fn test_change_plan_copies_current_catalog_values() {
        let (_, registry) = registry().await;
        let tenant = registry.provision(request("Clinic")).await.unwrap();

        let upgraded = registry
            .change_plan(tenant.id, "enterprise", Some(BillingCycle::Monthly))
            .await
            .unwrap();

        assert_eq!(upgraded.plan, "enterprise");
        assert_eq!(upgraded.plan_price, 149_900);
        assert_eq!(upgraded.limits.branches, Limit::capped(5));
        assert!(upgraded.features.custom_domain);
    }

    #[tokio::test]
    async fn test_plan_edits_are_not_retroactive() {
        let (catalog, registry) = registry().await;

        let before = registry
            .provision(NewTenant {
                name: "Early Adopter".to_string(),
                plan: Some("basic".to_string()),
                ..NewTenant::default()
            })
            .await
            .unwrap();
        assert_eq!(before.limits.users, Limit::capped(2));

        let patch = crate::catalog::PlanPatch {
            limits: Some(LimitsPatch {
                users: Some(Limit::capped(99)),
                ..LimitsPatch::default()
            }),
            ..crate::catalog::PlanPatch::default()
        };
        catalog.update_plan("basic", &patch, 1).await.unwrap();

        // The existing tenant keeps the values it signed up with.
        let unchanged = registry.find(before.id).await.unwrap();
        assert_eq!(unchanged.limits.users, Limit::capped(2));

        // New signups and explicit plan changes see the new numbers.
        let after = registry
            .provision(NewTenant {
                name: "Late Adopter".to_string(),
                plan: Some("basic".to_string()),
                ..NewTenant::default()
            })
            .await
            .unwrap();
        assert_eq!(after.limits.users, Limit::capped(99));

        let rejoined = registry
            .change_plan(before.id, "basic", None)
            .await
            .unwrap();
        assert_eq!(rejoined.limits.users, Limit::capped(99));
    }

    #[tokio::test]
    async fn test_update_fields_and_name_collision() {
        let (_, registry) = registry().await;
        let a = registry.provision(request("Clinic A")).await.unwrap();
        registry.provision(request("Clinic B")).await.unwrap();

        let updated = registry
            .update(
                a.id,
                TenantUpdate {
                    contact_email: Some("billing@clinic-a.test".to_string()),
                    auto_renew: Some(false),
                    ..TenantUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            updated.contact_email.as_deref(),
            Some("billing@clinic-a.test")
        );
        assert!(!updated.auto_renew);

        let err = registry
            .update(
                a.id,
                TenantUpdate {
                    name: Some("clinic b".to_string()),
                    ..TenantUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Directory(DirectoryError::NameInUse(_))
        ));
    }

    #[tokio::test]
    async fn test_soft_delete() {
        let (_, registry) = registry().await;
        let tenant = registry.provision(request("Clinic")).await.unwrap();

        registry.soft_delete(tenant.id).await.unwrap();
        assert!(matches!(
            registry.find(tenant.id).await.unwrap_err(),
            LifecycleError::NotFound
        ));

        // Slug freed for reuse.
        registry.provision(request("Clinic")).await.unwrap();
    }
}
