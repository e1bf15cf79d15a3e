//! Submissions service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::sync::SyncQueueError;

#[derive(Debug, Error)]
pub enum SubmissionsServiceError {
    #[error("submission not found")]
    NotFound,

    #[error("link not found")]
    LinkNotFound,

    #[error("template not found")]
    TemplateNotFound,

    #[error("template is not accepting submissions")]
    TemplateDisabled,

    #[error("submission is invalid")]
    Validation(Vec<String>),

    #[error("submission cooldown active for {remaining_minutes} more minute(s)")]
    CooldownActive { remaining_minutes: u32 },

    #[error("submission has already been decided")]
    AlreadyDecided,

    #[error("submission already exists")]
    AlreadyExists,

    #[error("invalid submission data")]
    InvalidData,

    #[error("failed to request synchronization")]
    Queue(#[from] SyncQueueError),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for SubmissionsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::TemplateNotFound,
            Some(ErrorKind::CheckViolation | ErrorKind::NotNullViolation) => Self::InvalidData,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}
