//! Errors

use ranksync_app::{directory::DirectoryError, domain::sync::SyncQueueError};
use salvo::http::StatusCode;
use tracing::warn;

use crate::envelope::ApiError;

pub(crate) fn queue_error(error: SyncQueueError) -> ApiError {
    match error {
        SyncQueueError::DuplicatePending { job } => ApiError::new(
            StatusCode::CONFLICT,
            "DUPLICATE_PENDING",
            "a sync job is already pending for this subject",
        )
        .with("job_id", job.to_string()),
        SyncQueueError::NotFound => ApiError::not_found("sync job"),
        SyncQueueError::InvalidData => {
            ApiError::validation(vec!["sync job data is invalid".to_owned()])
        }
        SyncQueueError::NotClaimable
        | SyncQueueError::InvalidState { .. }
        | SyncQueueError::Sql(_)
        | SyncQueueError::Schedule(_)
        | SyncQueueError::InvalidValue(_) => ApiError::internal("sync queue request failed", &error),
    }
}

pub(crate) fn directory_error(error: &DirectoryError) -> ApiError {
    if matches!(error, DirectoryError::NotMember) {
        return ApiError::not_found("group member");
    }

    warn!(error = %error, "directory request failed");

    ApiError::directory_unavailable()
}
