//! Plan catalog with hot-swapping.
//!
//! Readers see an immutable snapshot and never block. Edits clone the
//! snapshot, persist it, then swap it in atomically, so a half-written
//! catalog is never observable. Tenants copy plan values at assignment
//! time; editing a plan here changes nothing for tenants already on it.

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use utoipa::ToSchema;

use crate::limits::{Limit, TenantLimits};
use crate::model::BillingCycle;

/// Automated backup cadence included in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BackupCadence {
    None,
    Weekly,
    Daily,
}

/// Feature flags bundled with a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanFeatures {
    /// Branding and form customization.
    pub customization: bool,
    /// Advanced reporting dashboards.
    pub advanced_reports: bool,
    /// Priority support queue.
    pub priority_support: bool,
    /// Custom domain instead of a subdomain.
    pub custom_domain: bool,
    /// White-label mode (no vendor branding).
    pub white_label: bool,
    /// Programmatic API access.
    pub api_access: bool,
    /// Automated backup cadence.
    pub backup: BackupCadence,
    /// Advertised support response time, e.g. "24h".
    pub support_response_time: String,
}

impl Default for PlanFeatures {
    fn default() -> Self {
        Self {
            customization: false,
            advanced_reports: false,
            priority_support: false,
            custom_domain: false,
            white_label: false,
            api_access: false,
            backup: BackupCadence::None,
            support_response_time: "48h".to_string(),
        }
    }
}

/// A subscription plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Stable identifier, e.g. "basic".
    pub id: String,
    /// Display name.
    pub name: String,
    /// One-line pitch.
    pub description: String,
    /// Price per month, in COP minor units.
    pub price_monthly: u64,
    /// Price per year, in COP minor units.
    pub price_annual: u64,
    /// Resource ceilings granted by this plan.
    pub limits: TenantLimits,
    /// Feature flags granted by this plan.
    pub features: PlanFeatures,
    /// Highlighted on the pricing page.
    #[serde(default)]
    pub popular: bool,
}

impl Plan {
    /// Price for one billing cycle.
    pub fn price_for(&self, cycle: BillingCycle) -> u64 {
        match cycle {
            BillingCycle::Monthly => self.price_monthly,
            BillingCycle::Annual => self.price_annual,
        }
    }
}

/// The built-in plan table, used to seed an empty store.
pub fn builtin_plans() -> Vec<Plan> {
    vec![
        Plan {
            id: "free".to_string(),
            name: "Free".to_string(),
            description: "Try it free for 30 days".to_string(),
            price_monthly: 0,
            price_annual: 0,
            limits: TenantLimits {
                users: Limit::capped(1),
                branches: Limit::capped(1),
                consents: Limit::capped(20),
                medical_records: Limit::capped(5),
                record_templates: Limit::capped(2),
                consent_templates: Limit::capped(3),
                services: Limit::capped(3),
                questions: Limit::capped(6),
                storage_mb: Limit::capped(200),
            },
            features: PlanFeatures::default(),
            popular: false,
        },
        Plan {
            id: "basic".to_string(),
            name: "Basic".to_string(),
            description: "For small clinics, practices and spas".to_string(),
            price_monthly: 89_900,
            price_annual: 895_404,
            limits: TenantLimits {
                users: Limit::capped(2),
                branches: Limit::capped(1),
                consents: Limit::capped(100),
                medical_records: Limit::capped(30),
                record_templates: Limit::capped(5),
                consent_templates: Limit::capped(10),
                services: Limit::capped(5),
                questions: Limit::capped(10),
                storage_mb: Limit::capped(500),
            },
            features: PlanFeatures {
                customization: true,
                support_response_time: "24h".to_string(),
                ..PlanFeatures::default()
            },
            popular: false,
        },
        Plan {
            id: "professional".to_string(),
            name: "Professional".to_string(),
            description: "For mid-size clinics and medical centers".to_string(),
            price_monthly: 119_900,
            price_annual: 1_194_202,
            limits: TenantLimits {
                users: Limit::capped(5),
                branches: Limit::capped(3),
                consents: Limit::capped(300),
                medical_records: Limit::capped(100),
                record_templates: Limit::capped(10),
                consent_templates: Limit::capped(20),
                services: Limit::capped(15),
                questions: Limit::capped(30),
                storage_mb: Limit::capped(2000),
            },
            features: PlanFeatures {
                customization: true,
                advanced_reports: true,
                priority_support: true,
                backup: BackupCadence::Weekly,
                support_response_time: "12h".to_string(),
                ..PlanFeatures::default()
            },
            popular: true,
        },
        Plan {
            id: "enterprise".to_string(),
            name: "Enterprise".to_string(),
            description: "For large clinics and hospitals".to_string(),
            price_monthly: 149_900,
            price_annual: 1_493_004,
            limits: TenantLimits {
                users: Limit::capped(10),
                branches: Limit::capped(5),
                consents: Limit::capped(500),
                medical_records: Limit::capped(300),
                record_templates: Limit::capped(20),
                consent_templates: Limit::capped(30),
                services: Limit::capped(30),
                questions: Limit::capped(50),
                storage_mb: Limit::capped(5000),
            },
            features: PlanFeatures {
                customization: true,
                advanced_reports: true,
                priority_support: true,
                custom_domain: true,
                backup: BackupCadence::Daily,
                support_response_time: "4h".to_string(),
                ..PlanFeatures::default()
            },
            popular: false,
        },
        Plan {
            id: "custom".to_string(),
            name: "Custom".to_string(),
            description: "Tailored for large organizations".to_string(),
            price_monthly: 189_900,
            price_annual: 1_891_404,
            limits: TenantLimits {
                users: Limit::UNLIMITED,
                branches: Limit::UNLIMITED,
                consents: Limit::UNLIMITED,
                medical_records: Limit::UNLIMITED,
                record_templates: Limit::UNLIMITED,
                consent_templates: Limit::UNLIMITED,
                services: Limit::UNLIMITED,
                questions: Limit::UNLIMITED,
                storage_mb: Limit::capped(10_000),
            },
            features: PlanFeatures {
                customization: true,
                advanced_reports: true,
                priority_support: true,
                custom_domain: true,
                white_label: true,
                api_access: true,
                backup: BackupCadence::Daily,
                support_response_time: "24/7".to_string(),
            },
            popular: false,
        },
    ]
}

/// One immutable catalog version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Monotonic version, bumped on every accepted edit.
    pub version: u64,
    /// Plans in pricing-page order.
    pub plans: Vec<Plan>,
}

impl CatalogSnapshot {
    /// Find a plan by id.
    pub fn plan(&self, id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == id)
    }
}

/// Catalog failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No plan with the given id.
    #[error("unknown plan: {0}")]
    UnknownPlan(String),

    /// The catalog changed since the caller read it.
    #[error("catalog version conflict: expected {expected}, current {current}")]
    VersionConflict {
        /// Version the caller based the edit on.
        expected: u64,
        /// Version actually live.
        current: u64,
    },

    /// The backing store failed.
    #[error("plan store error: {0}")]
    Store(String),
}

/// Durable backing for the catalog.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Load the last persisted snapshot, if any.
    async fn load(&self) -> Result<Option<CatalogSnapshot>, CatalogError>;

    /// Persist a snapshot, replacing the previous one whole.
    async fn persist(&self, snapshot: &CatalogSnapshot) -> Result<(), CatalogError>;
}

/// In-memory store for tests and single-node deployments.
#[derive(Default)]
pub struct MemoryPlanStore {
    slot: parking_lot::Mutex<Option<CatalogSnapshot>>,
}

impl MemoryPlanStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn load(&self) -> Result<Option<CatalogSnapshot>, CatalogError> {
        Ok(self.slot.lock().clone())
    }

    async fn persist(&self, snapshot: &CatalogSnapshot) -> Result<(), CatalogError> {
        *self.slot.lock() = Some(snapshot.clone());
        Ok(())
    }
}

/// Partial edit of a plan's limits. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LimitsPatch {
    pub users: Option<Limit>,
    pub branches: Option<Limit>,
    pub consents: Option<Limit>,
    pub medical_records: Option<Limit>,
    pub record_templates: Option<Limit>,
    pub consent_templates: Option<Limit>,
    pub services: Option<Limit>,
    pub questions: Option<Limit>,
    pub storage_mb: Option<Limit>,
}

impl LimitsPatch {
    /// Apply to a limit set in place.
    pub fn apply_to(&self, limits: &mut TenantLimits) {
        if let Some(v) = self.users {
            limits.users = v;
        }
        if let Some(v) = self.branches {
            limits.branches = v;
        }
        if let Some(v) = self.consents {
            limits.consents = v;
        }
        if let Some(v) = self.medical_records {
            limits.medical_records = v;
        }
        if let Some(v) = self.record_templates {
            limits.record_templates = v;
        }
        if let Some(v) = self.consent_templates {
            limits.consent_templates = v;
        }
        if let Some(v) = self.services {
            limits.services = v;
        }
        if let Some(v) = self.questions {
            limits.questions = v;
        }
        if let Some(v) = self.storage_mb {
            limits.storage_mb = v;
        }
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.users.is_none()
            && self.branches.is_none()
            && self.consents.is_none()
            && self.medical_records.is_none()
            && self.record_templates.is_none()
            && self.consent_templates.is_none()
            && self.services.is_none()
            && self.questions.is_none()
            && self.storage_mb.is_none()
    }
}

/// Partial edit of a plan's features. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeaturesPatch {
    pub customization: Option<bool>,
    pub advanced_reports: Option<bool>,
    pub priority_support: Option<bool>,
    pub custom_domain: Option<bool>,
    pub white_label: Option<bool>,
    pub api_access: Option<bool>,
    pub backup: Option<BackupCadence>,
    pub support_response_time: Option<String>,
}

impl FeaturesPatch {
    /// Apply to a feature set in place.
    pub fn apply_to(&self, features: &mut PlanFeatures) {
        if let Some(v) = self.customization {
            features.customization = v;
        }
        if let Some(v) = self.advanced_reports {
            features.advanced_reports = v;
        }
        if let Some(v) = self.priority_support {
            features.priority_support = v;
        }
        if let Some(v) = self.custom_domain {
            features.custom_domain = v;
        }
        if let Some(v) = self.white_label {
            features.white_label = v;
        }
        if let Some(v) = self.api_access {
            features.api_access = v;
        }
        if let Some(v) = self.backup {
            features.backup = v;
        }
        if let Some(v) = &self.support_response_time {
            features.support_response_time = v.clone();
        }
    }
}

/// Partial edit of a plan. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_monthly: Option<u64>,
    pub price_annual: Option<u64>,
    pub popular: Option<bool>,
    pub limits: Option<LimitsPatch>,
    pub features: Option<FeaturesPatch>,
}

impl PlanPatch {
    fn apply_to(&self, plan: &mut Plan) {
        if let Some(v) = &self.name {
            plan.name = v.clone();
        }
        if let Some(v) = &self.description {
            plan.description = v.clone();
        }
        if let Some(v) = self.price_monthly {
            plan.price_monthly = v;
        }
        if let Some(v) = self.price_annual {
            plan.price_annual = v;
        }
        if let Some(v) = self.popular {
            plan.popular = v;
        }
        if let Some(patch) = &self.limits {
            patch.apply_to(&mut plan.limits);
        }
        if let Some(patch) = &self.features {
            patch.apply_to(&mut plan.features);
        }
    }
}

/// Lock-free plan catalog with atomic, versioned updates.
pub struct PlanCatalog {
    /// Current snapshot (atomically swappable).
    current: ArcSwap<CatalogSnapshot>,
    /// Durable backing; written before the swap.
    store: Arc<dyn PlanStore>,
    /// Serializes writers. Readers never touch it.
    write_lock: tokio::sync::Mutex<()>,
}

impl PlanCatalog {
    /// Open the catalog, seeding the store with the built-in plan table
    /// when it is empty.
    pub async fn open(store: Arc<dyn PlanStore>) -> Result<Self, CatalogError> {
        let snapshot = match store.load().await? {
            Some(snapshot) => snapshot,
            None => {
                let seed = CatalogSnapshot {
                    version: 1,
                    plans: builtin_plans(),
                };
                store.persist(&seed).await?;
                info!(version = seed.version, plans = seed.plans.len(), "seeded plan catalog");
                seed
            }
        };

        Ok(Self {
            current: ArcSwap::from_pointee(snapshot),
            store,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current.load_full()
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    /// Look up one plan by id.
    pub fn plan(&self, id: &str) -> Option<Plan> {
        self.current.load().plan(id).cloned()
    }

    /// All plans, in pricing-page order.
    pub fn plans(&self) -> Vec<Plan> {
        self.current.load().plans.clone()
    }

    /// Edit one plan.
    ///
    /// `expected_version` must equal the live version or the edit is
    /// rejected, so concurrent editors cannot silently overwrite each
    /// other. The new snapshot is persisted before it becomes visible.
    pub async fn update_plan(
        &self,
        id: &str,
        patch: &PlanPatch,
        expected_version: u64,
    ) -> Result<Plan, CatalogError> {
        let _writer = self.write_lock.lock().await;

        let live = self.current.load_full();
        if live.version != expected_version {
            return Err(CatalogError::VersionConflict {
                expected: expected_version,
                current: live.version,
            });
        }

        let mut next = (*live).clone();
        let plan = next
            .plans
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CatalogError::UnknownPlan(id.to_string()))?;
        patch.apply_to(plan);
        let updated = plan.clone();
        next.version += 1;

        self.store.persist(&next).await?;
        info!(plan = id, version = next.version, "plan catalog updated");
        self.current.store(Arc::new(next));

        Ok(updated)
    }
}
