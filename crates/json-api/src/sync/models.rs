//! Sync Models

use std::string::ToString;

use ranksync_app::{
    directory::DirectoryRole,
    domain::sync::records::{QueueStats, SyncJob},
};
use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sync Job Response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub(crate) struct JobResponse {
    pub id: Uuid,
    pub subject_id: u64,
    pub target_rank: u8,
    pub priority: i32,

    /// queued, in_progress, retrying, completed, failed or cancelled
    pub status: String,

    pub attempts: u32,
    pub max_attempts: u32,

    /// Most recent failure reason
    pub last_error: Option<String>,

    pub next_retry_at: Option<String>,

    /// submission, manual or retry
    pub origin: String,

    pub created_at: String,
    pub completed_at: Option<String>,
}

impl From<SyncJob> for JobResponse {
    fn from(job: SyncJob) -> Self {
        Self {
            id: job.uuid.into_uuid(),
            subject_id: job.subject_id.0,
            target_rank: job.target_rank.0,
            priority: job.priority,
            status: job.status.to_string(),
            attempts: job.attempts,
            max_attempts: job.max_attempts,
            last_error: job.last_error().map(ToOwned::to_owned),
            next_retry_at: job.next_retry_at.as_ref().map(ToString::to_string),
            origin: job.origin.kind.as_str().to_owned(),
            created_at: job.created_at.to_string(),
            completed_at: job.completed_at.as_ref().map(ToString::to_string),
        }
    }
}

/// Job counts by status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub(crate) struct QueueStatsResponse {
    pub queued: u64,
    pub in_progress: u64,
    pub retrying: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl From<QueueStats> for QueueStatsResponse {
    fn from(stats: QueueStats) -> Self {
        Self {
            queued: stats.queued,
            in_progress: stats.in_progress,
            retrying: stats.retrying,
            completed: stats.completed,
            failed: stats.failed,
            cancelled: stats.cancelled,
        }
    }
}

/// Directory Role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub(crate) struct RoleResponse {
    pub id: u64,
    pub name: String,
    pub rank: u8,
}

impl From<DirectoryRole> for RoleResponse {
    fn from(role: DirectoryRole) -> Self {
        Self {
            id: role.id.0,
            name: role.name,
            rank: role.rank.0,
        }
    }
}
