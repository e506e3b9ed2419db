//! Consentry Tenancy Core
//!
//! Tenant records, the plan catalog and plan-based resource quotas for
//! a multi-tenant consent platform.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        TENANCY CORE                               │
//! │                                                                   │
//! │  ┌──────────────────┐            ┌─────────────────────────────┐  │
//! │  │  TENANT REGISTRY │  assigns   │        PLAN CATALOG         │  │
//! │  │  provision       │◄───────────│  versioned, hot-swapped     │  │
//! │  │  suspend/restore │   copies   │  free .. custom             │  │
//! │  │  plan changes    │            └─────────────────────────────┘  │
//! │  └────────┬─────────┘                                             │
//! │           │                                                       │
//! │  ┌────────▼─────────┐            ┌─────────────────────────────┐  │
//! │  │ TENANT DIRECTORY │            │       QUOTA ENFORCER        │  │
//! │  │ records, lookup  │◄───────────│  fresh counts vs ceilings   │  │
//! │  │ soft deletes     │            │  ok/warning/critical/blocked│  │
//! │  └──────────────────┘            └──────────────┬──────────────┘  │
//! │                                                 │                 │
//! │  ┌──────────────────────────────────────────────▼──────────────┐  │
//! │  │                     RESOURCE LEDGER                         │  │
//! │  │   count + insert as one atomic step per tenant and kind     │  │
//! │  └─────────────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod catalog;
pub mod directory;
pub mod lifecycle;
pub mod limits;
pub mod model;
pub mod quota;
pub mod usage;

pub use catalog::{
    CatalogError, LimitsPatch, MemoryPlanStore, Plan, PlanCatalog, PlanFeatures, PlanPatch,
    PlanStore,
};
pub use directory::{
    DirectoryError, MemoryDirectory, ResourceLedger, ResourceRow, TenantDirectory,
};
pub use lifecycle::{LifecycleError, NewTenant, TenantRegistry, TenantUpdate};
pub use limits::{Limit, ResourceKind, TenantLimits};
pub use model::{slugify, BillingCycle, Tenant, TenantId, TenantStatus};
pub use quota::{QuotaEnforcer, QuotaError};
pub use usage::{GlobalStats, ResourceUsage, UsageLevel, UsageReport};
