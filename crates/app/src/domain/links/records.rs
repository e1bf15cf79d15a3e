//! Link Records

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    identifiers::{GroupId, ResourceId, TenantId},
    templates::records::TemplateUuid,
};

/// Ownership verification state of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    VerificationFailed,
}

impl VerificationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::VerificationFailed => "verification_failed",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "verification_failed" => Ok(Self::VerificationFailed),
            other => Err(format!("unknown verification status `{other}`")),
        }
    }
}

/// Per-tenant tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTunables {
    /// Request rate-limit window length in seconds.
    pub rate_limit_window_seconds: u32,

    /// Requests allowed per window and (tenant, resource) key.
    pub rate_limit_max_requests: u32,

    /// Whether approved decisions enqueue synchronization automatically.
    pub auto_sync: bool,
}

impl Default for LinkTunables {
    fn default() -> Self {
        Self {
            rate_limit_window_seconds: 60,
            rate_limit_max_requests: 60,
            auto_sync: true,
        }
    }
}

/// Cumulative synchronization counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncCounters {
    pub total_syncs: u64,
    pub failed_syncs: u64,
    pub last_sync_at: Option<Timestamp>,
}

/// Public credential metadata. The hash itself never leaves the credentials module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialMetadata {
    pub key_id: Uuid,
    pub issued_at: Timestamp,
    pub last_used_at: Option<Timestamp>,
}

/// Link Record
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRecord {
    pub tenant_id: TenantId,
    pub group_id: GroupId,
    pub resource_ids: Vec<ResourceId>,
    pub credential: Option<CredentialMetadata>,
    pub verification_status: VerificationStatus,
    pub verified_at: Option<Timestamp>,
    pub enabled_templates: Vec<TemplateUuid>,
    pub tunables: LinkTunables,
    pub counters: SyncCounters,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl LinkRecord {
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }

    #[must_use]
    pub fn authorizes_resource(&self, resource: ResourceId) -> bool {
        self.resource_ids.contains(&resource)
    }

    #[must_use]
    pub fn template_enabled(&self, template: TemplateUuid) -> bool {
        self.enabled_templates.contains(&template)
    }
}

/// Credential material as stored: salt and salted digest.
#[derive(Debug, Clone)]
pub(crate) struct StoredCredential {
    pub key_id: Uuid,
    pub salt: String,
    pub hash: String,
}
