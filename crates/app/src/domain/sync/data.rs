//! Sync Job Data

use jiff::Timestamp;

use crate::domain::{
    identifiers::{Rank, SubjectId, TenantId},
    sync::records::JobOrigin,
};

/// New Sync Job Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSyncJob {
    pub tenant_id: TenantId,
    pub subject_id: SubjectId,
    pub target_rank: Rank,
    pub priority: i32,
    pub origin: JobOrigin,
}

/// State a job moved to after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    /// Eligible again once `next_retry_at` has passed.
    Retrying { next_retry_at: Timestamp },

    /// Permanently failed.
    Failed,
}
