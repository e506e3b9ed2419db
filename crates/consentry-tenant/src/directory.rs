//! Tenant directory and resource ledger storage seams.
//!
//! The in-memory implementations back tests and single-node deployments.
//! A database-backed implementation must honor the same contracts,
//! `insert_row` above all: the live count and the insert happen as one
//! atomic step per tenant and kind, e.g. inside a transaction holding an
//! advisory lock keyed by `(tenant, kind)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::limits::ResourceKind;
use crate::model::{Tenant, TenantId};

/// One stored row of a countable resource.
///
/// The platform's real entities (users, branches, consents and so on)
/// carry far more data; the ledger only tracks what quota enforcement
/// needs, which is existence and the soft-delete marker.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRow {
    /// Row id.
    pub id: Uuid,
    /// Display label.
    pub name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker. Deleted rows stop counting against limits.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ResourceRow {
    /// Build a fresh live row.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    /// True until soft-deleted.
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Storage failures.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No live record matched.
    #[error("not found")]
    NotFound,

    /// Another live tenant already owns the slug.
    #[error("slug already in use: {0}")]
    SlugInUse(String),

    /// Another live tenant already owns the name.
    #[error("name already in use: {0}")]
    NameInUse(String),

    /// The insert would push the tenant past its ceiling.
    #[error("quota exceeded for {resource} ({current}/{max})")]
    QuotaExceeded {
        /// Which resource hit its ceiling.
        resource: ResourceKind,
        /// Live count at the time of the attempt.
        current: u64,
        /// The tenant's ceiling.
        max: u64,
    },

    /// The backing store failed or is unreachable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Lookup and persistence of tenant records.
///
/// Every method sees only live tenants; soft-deleted ones are invisible,
/// and their slug and name become reusable.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Find one tenant by id.
    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>, DirectoryError>;

    /// Find one tenant by slug. The slug is matched case-insensitively.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, DirectoryError>;

    /// All live tenants.
    async fn list(&self) -> Result<Vec<Tenant>, DirectoryError>;

    /// Insert a new tenant, enforcing slug and name uniqueness.
    async fn insert(&self, tenant: Tenant) -> Result<Tenant, DirectoryError>;

    /// Replace an existing tenant record.
    async fn save(&self, tenant: Tenant) -> Result<Tenant, DirectoryError>;

    /// Soft-delete a tenant.
    async fn soft_delete(&self, id: TenantId) -> Result<(), DirectoryError>;
}

/// Countable resource rows per tenant.
#[async_trait]
pub trait ResourceLedger: Send + Sync {
    /// Live rows of one kind for one tenant.
    async fn live_count(
        &self,
        tenant: TenantId,
        kind: ResourceKind,
    ) -> Result<u64, DirectoryError>;

    /// Insert a row only if the tenant is still under its ceiling.
    ///
    /// Count check and insert are one atomic step per `(tenant, kind)`;
    /// two racing calls with one slot left admit exactly one row. At the
    /// ceiling the call fails with [`DirectoryError::QuotaExceeded`].
    async fn insert_row(
        &self,
        tenant: &Tenant,
        kind: ResourceKind,
        name: &str,
    ) -> Result<ResourceRow, DirectoryError>;

    /// Soft-delete one row, freeing a slot under the ceiling.
    async fn soft_delete_row(
        &self,
        tenant: TenantId,
        kind: ResourceKind,
        row: Uuid,
    ) -> Result<(), DirectoryError>;

    /// Live rows of one kind, newest last.
    async fn list_rows(
        &self,
        tenant: TenantId,
        kind: ResourceKind,
    ) -> Result<Vec<ResourceRow>, DirectoryError>;
}

/// In-memory directory and ledger.
pub struct MemoryDirectory {
    /// Tenants by id.
    tenants: DashMap<TenantId, Tenant>,
    /// Resource rows by tenant and kind. The entry guard doubles as the
    /// per-key lock that makes `insert_row` atomic.
    rows: DashMap<(TenantId, ResourceKind), Vec<ResourceRow>>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            tenants: DashMap::new(),
            rows: DashMap::new(),
        }
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TenantDirectory for MemoryDirectory {
    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>, DirectoryError> {
        Ok(self
            .tenants
            .get(&id)
            .filter(|t| t.is_live())
            .map(|t| t.clone()))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, DirectoryError> {
        let slug = slug.to_ascii_lowercase();
        Ok(self
            .tenants
            .iter()
            .find(|t| t.is_live() && t.slug.eq_ignore_ascii_case(&slug))
            .map(|t| t.clone()))
    }

    async fn list(&self) -> Result<Vec<Tenant>, DirectoryError> {
        let mut tenants: Vec<Tenant> = self
            .tenants
            .iter()
            .filter(|t| t.is_live())
            .map(|t| t.clone())
            .collect();
        tenants.sort_by_key(|t| t.created_at);
        Ok(tenants)
    }

    async fn insert(&self, tenant: Tenant) -> Result<Tenant, DirectoryError> {
        for existing in self.tenants.iter().filter(|t| t.is_live()) {
            if existing.slug.eq_ignore_ascii_case(&tenant.slug) {
                return Err(DirectoryError::SlugInUse(tenant.slug));
            }
            if existing.name.eq_ignore_ascii_case(&tenant.name) {
                return Err(DirectoryError::NameInUse(tenant.name));
            }
        }
        self.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn save(&self, mut tenant: Tenant) -> Result<Tenant, DirectoryError> {
        match self.tenants.get(&tenant.id) {
            Some(existing) if existing.is_live() => {}
            _ => return Err(DirectoryError::NotFound),
        }
        tenant.touch();
        self.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn soft_delete(&self, id: TenantId) -> Result<(), DirectoryError> {
        match self.tenants.get_mut(&id) {
            Some(mut tenant) if tenant.is_live() => {
                tenant.deleted_at = Some(Utc::now());
                tenant.touch();
                Ok(())
            }
            _ => Err(DirectoryError::NotFound),
        }
    }
}

fn count_live(rows: &[ResourceRow]) -> u64 {
    rows.iter().filter(|r| r.is_live()).count() as u64
}

#[async_trait]
impl ResourceLedger for MemoryDirectory {
    async fn live_count(
        &self,
        tenant: TenantId,
        kind: ResourceKind,
    ) -> Result<u64, DirectoryError> {
        Ok(self
            .rows
            .get(&(tenant, kind))
            .map(|rows| count_live(&rows))
            .unwrap_or(0))
    }

    async fn insert_row(
        &self,
        tenant: &Tenant,
        kind: ResourceKind,
        name: &str,
    ) -> Result<ResourceRow, DirectoryError> {
        let limit = tenant.limits.get(kind);

        // The entry guard serializes every insert for this tenant and
        // kind, so the count cannot go stale between check and push.
        let mut rows = self.rows.entry((tenant.id, kind)).or_default();
        let current = count_live(&rows);
        if !limit.allows(current) {
            return Err(DirectoryError::QuotaExceeded {
                resource: kind,
                current,
                // allows() only refuses bounded ceilings
                max: limit.max().unwrap_or(0),
            });
        }

        let row = ResourceRow::new(name);
        rows.push(row.clone());
        Ok(row)
    }

    async fn soft_delete_row(
        &self,
        tenant: TenantId,
        kind: ResourceKind,
        row: Uuid,
    ) -> Result<(), DirectoryError> {
        let mut rows = self
            .rows
            .get_mut(&(tenant, kind))
            .ok_or(DirectoryError::NotFound)?;
        match rows.iter_mut().find(|r| r.id == row && r.is_live()) {
            Some(row) => {
                row.deleted_at = Some(Utc::now());
                Ok(())
            }
            None => Err(DirectoryError::NotFound),
        }
    }

    async fn list_rows(
        &self,
        tenant: TenantId,
        kind: ResourceKind,
    ) -> Result<Vec<ResourceRow>, DirectoryError> {
        Ok(self
            .rows
            .get(&(tenant, kind))
            .map(|rows| rows.iter().filter(|r| r.is_live()).cloned().collect())
            .unwrap_or_default())
    }
}
