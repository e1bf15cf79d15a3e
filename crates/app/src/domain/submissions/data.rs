//! Submission Data

use std::collections::BTreeMap;

use crate::domain::{
    identifiers::{ResourceId, SubjectId},
    submissions::records::{Submission, SubmissionUuid},
    sync::records::{SyncJob, SyncJobUuid},
    templates::records::TemplateUuid,
};

/// New Submission Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub uuid: SubmissionUuid,
    pub template_uuid: TemplateUuid,
    pub resource_id: ResourceId,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub answers: BTreeMap<String, String>,
}

/// Reviewer verdict on a pending submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub approve: bool,
    pub reviewer: String,
    pub reason: Option<String>,
}

/// Whether a decision requested a rank change.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncRequest {
    /// A new job was queued for the subject.
    Enqueued(SyncJob),

    /// The subject already had a pending job; no new job was queued.
    AlreadyPending { job: SyncJobUuid },

    /// Denied, no approval rank, auto sync off, or template not enabled.
    NotRequested,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    pub submission: Submission,
    pub sync: SyncRequest,
}
