//! Resource kinds and per-tenant ceilings.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Resource kinds subject to plan limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    /// Staff accounts.
    Users,
    /// Clinic branches (sedes).
    Branches,
    /// Signed consent documents.
    Consents,
    /// Medical record files.
    MedicalRecords,
    /// Medical record templates.
    RecordTemplates,
    /// Consent form templates.
    ConsentTemplates,
    /// Offered medical services.
    Services,
    /// Custom questionnaire items.
    Questions,
    /// Uploaded file storage, in megabytes.
    StorageMb,
}

impl ResourceKind {
    /// Every kind, in report order.
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Users,
        ResourceKind::Branches,
        ResourceKind::Consents,
        ResourceKind::MedicalRecords,
        ResourceKind::RecordTemplates,
        ResourceKind::ConsentTemplates,
        ResourceKind::Services,
        ResourceKind::Questions,
        ResourceKind::StorageMb,
    ];

    /// Kinds counted as stored rows. Storage is derived, not counted.
    pub const COUNTABLE: [ResourceKind; 8] = [
        ResourceKind::Users,
        ResourceKind::Branches,
        ResourceKind::Consents,
        ResourceKind::MedicalRecords,
        ResourceKind::RecordTemplates,
        ResourceKind::ConsentTemplates,
        ResourceKind::Services,
        ResourceKind::Questions,
    ];

    /// Wire name, matching the serialized form.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Branches => "branches",
            Self::Consents => "consents",
            Self::MedicalRecords => "medicalRecords",
            Self::RecordTemplates => "recordTemplates",
            Self::ConsentTemplates => "consentTemplates",
            Self::Services => "services",
            Self::Questions => "questions",
            Self::StorageMb => "storageMb",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A single resource ceiling.
///
/// `-1` on the wire means unlimited; any other negative value read from
/// storage is treated the same way. Everything else is a plain count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Limit(i64);

impl Limit {
    /// The unlimited sentinel.
    pub const UNLIMITED: Limit = Limit(-1);

    /// A bounded ceiling.
    pub fn capped(max: u64) -> Self {
        Self(max as i64)
    }

    /// Build from the raw wire value.
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Self::UNLIMITED
        } else {
            Self(raw)
        }
    }

    /// Raw wire value.
    pub fn raw(&self) -> i64 {
        self.0
    }

    /// True when no ceiling applies.
    pub fn is_unlimited(&self) -> bool {
        self.0 < 0
    }

    /// The ceiling, or `None` when unlimited.
    pub fn max(&self) -> Option<u64> {
        if self.0 < 0 {
            None
        } else {
            Some(self.0 as u64)
        }
    }

    /// Whether one more item fits under this ceiling.
    pub fn allows(&self, current: u64) -> bool {
        match self.max() {
            None => true,
            Some(max) => current < max,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max() {
            None => f.write_str("unlimited"),
            Some(max) => write!(f, "{max}"),
        }
    }
}

/// Per-tenant resource ceilings.
///
/// Copied from the plan at assignment time and independent afterwards;
/// administrators may edit any field directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantLimits {
    pub users: Limit,
    pub branches: Limit,
    pub consents: Limit,
    pub medical_records: Limit,
    pub record_templates: Limit,
    pub consent_templates: Limit,
    pub services: Limit,
    pub questions: Limit,
    pub storage_mb: Limit,
}

impl TenantLimits {
    /// Ceiling for one kind.
    pub fn get(&self, kind: ResourceKind) -> Limit {
        match kind {
            ResourceKind::Users => self.users,
            ResourceKind::Branches => self.branches,
            ResourceKind::Consents => self.consents,
            ResourceKind::MedicalRecords => self.medical_records,
            ResourceKind::RecordTemplates => self.record_templates,
            ResourceKind::ConsentTemplates => self.consent_templates,
            ResourceKind::Services => self.services,
            ResourceKind::Questions => self.questions,
            ResourceKind::StorageMb => self.storage_mb,
        }
    }

    /// Replace the ceiling for one kind.
    pub fn set(&mut self, kind: ResourceKind, limit: Limit) {
        match kind {
            ResourceKind::Users => self.users = limit,
            ResourceKind::Branches => self.branches = limit,
            ResourceKind::Consents => self.consents = limit,
            ResourceKind::MedicalRecords => self.medical_records = limit,
            ResourceKind::RecordTemplates => self.record_templates = limit,
            ResourceKind::ConsentTemplates => self.consent_templates = limit,
            ResourceKind::Services => self.services = limit,
            ResourceKind::Questions => self.questions = limit,
            ResourceKind::StorageMb => self.storage_mb = limit,
        }
    }

    /// Iterate kinds with their ceilings, in report order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, Limit)> + '_ {
        ResourceKind::ALL.iter().map(move |&k| (k, self.get(k)))
    }
}

impl Default for TenantLimits {
    fn default() -> Self {
        Self {
            users: Limit::capped(2),
            branches: Limit::capped(1),
            consents: Limit::capped(50),
            medical_records: Limit::capped(5),
            record_templates: Limit::capped(2),
            consent_templates: Limit::capped(3),
            services: Limit::capped(3),
            questions: Limit::capped(5),
            storage_mb: Limit::capped(100),
        }
    }
}
