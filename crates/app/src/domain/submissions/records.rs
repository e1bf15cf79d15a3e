//! Submission Records

use std::{collections::BTreeMap, fmt, str::FromStr};

use jiff::Timestamp;
use serde::Serialize;

use crate::{
    domain::{
        identifiers::{ResourceId, SubjectId, TenantId},
        sync::records::SyncJobUuid,
        templates::records::TemplateUuid,
    },
    uuids::TypedUuid,
};

/// Submission UUID
pub type SubmissionUuid = TypedUuid<Submission>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Denied,
}

impl SubmissionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "denied" => Ok(Self::Denied),
            other => Err(format!("unknown submission status `{other}`")),
        }
    }
}

/// Submission Record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub uuid: SubmissionUuid,
    pub tenant_id: TenantId,
    pub template_uuid: TemplateUuid,
    pub resource_id: ResourceId,
    pub subject_id: SubjectId,
    pub subject_name: String,

    /// Answers keyed by question text.
    pub answers: BTreeMap<String, String>,

    pub status: SubmissionStatus,
    pub reviewer: Option<String>,
    pub reason: Option<String>,
    pub decided_at: Option<Timestamp>,
    pub sync_job_uuid: Option<SyncJobUuid>,
    pub created_at: Timestamp,
}
