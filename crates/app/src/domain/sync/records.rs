//! Sync Job Records

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde::Serialize;

use crate::{
    domain::identifiers::{Rank, SubjectId, TenantId},
    uuids::TypedUuid,
};

/// Sync Job UUID
pub type SyncJobUuid = TypedUuid<SyncJob>;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Retrying,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [Self; 6] = [
        Self::Queued,
        Self::InProgress,
        Self::Retrying,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Retrying => "retrying",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal jobs never change state again, short of an operator requeue.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| format!("unknown job status `{value}`"))
    }
}

/// What requested the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginKind {
    Submission,
    Manual,
    Retry,
}

impl OriginKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submission => "submission",
            Self::Manual => "manual",
            Self::Retry => "retry",
        }
    }
}

impl FromStr for OriginKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "submission" => Ok(Self::Submission),
            "manual" => Ok(Self::Manual),
            "retry" => Ok(Self::Retry),
            other => Err(format!("unknown job origin `{other}`")),
        }
    }
}

/// Origin metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOrigin {
    pub kind: OriginKind,
    pub reference: Option<String>,
}

impl JobOrigin {
    #[must_use]
    pub fn manual(reference: impl Into<String>) -> Self {
        Self {
            kind: OriginKind::Manual,
            reference: Some(reference.into()),
        }
    }

    #[must_use]
    pub fn submission(reference: impl Into<String>) -> Self {
        Self {
            kind: OriginKind::Submission,
            reference: Some(reference.into()),
        }
    }
}

/// Sync Job Record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncJob {
    pub uuid: SyncJobUuid,
    pub tenant_id: TenantId,
    pub subject_id: SubjectId,
    pub target_rank: Rank,
    pub priority: i32,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub errors: Vec<String>,
    pub next_retry_at: Option<Timestamp>,

    /// Set while `in_progress`; past it, the claim may be taken back.
    pub lease_expires_at: Option<Timestamp>,
    pub origin: JobOrigin,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl SyncJob {
    /// Most recent recorded failure message.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.errors.last().map(String::as_str)
    }
}

/// Per-status job counts for one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct QueueStats {
    pub queued: u64,
    pub in_progress: u64,
    pub retrying: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl QueueStats {
    pub(crate) fn add(&mut self, status: JobStatus, count: u64) {
        let slot = match status {
            JobStatus::Queued => &mut self.queued,
            JobStatus::InProgress => &mut self.in_progress,
            JobStatus::Retrying => &mut self.retrying,
            JobStatus::Completed => &mut self.completed,
            JobStatus::Failed => &mut self.failed,
            JobStatus::Cancelled => &mut self.cancelled,
        };

        *slot += count;
    }
}
