//! Sync queue errors.

use std::num::TryFromIntError;

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::sync::records::{JobStatus, SyncJobUuid};

#[derive(Debug, Error)]
pub enum SyncQueueError {
    #[error("a sync job is already pending for this subject")]
    DuplicatePending { job: SyncJobUuid },

    #[error("sync job not found")]
    NotFound,

    #[error("sync job is not ready to be claimed")]
    NotClaimable,

    #[error("sync job is {status}")]
    InvalidState { status: JobStatus },

    #[error("invalid sync job data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),

    #[error("retry time out of range")]
    Schedule(#[from] jiff::Error),

    #[error("invalid numeric value")]
    InvalidValue(#[from] TryFromIntError),
}

impl From<Error> for SyncQueueError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::CheckViolation | ErrorKind::NotNullViolation) => Self::InvalidData,
            Some(ErrorKind::UniqueViolation | ErrorKind::ForeignKeyViolation | ErrorKind::Other | _)
            | None => Self::Sql(error),
        }
    }
}
