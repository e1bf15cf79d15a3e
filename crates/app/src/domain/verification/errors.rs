//! Verification errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::directory::DirectoryError;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("no link exists for this tenant")]
    LinkNotFound,

    #[error("no verification in progress")]
    NoVerification,

    #[error("a verification is already pending")]
    AlreadyPending,

    #[error("the link is already verified")]
    AlreadyVerified,

    #[error("the group is not the one linked to this tenant")]
    GroupMismatch,

    #[error("the verification is no longer pending")]
    NotPending,

    #[error("extension must be between 1 and {max} minutes")]
    InvalidExtension { max: u32 },

    #[error("directory lookup failed")]
    Directory(#[from] DirectoryError),

    #[error("challenge time out of range")]
    Schedule(#[from] jiff::Error),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for VerificationError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::LinkNotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyPending,
            Some(ErrorKind::ForeignKeyViolation) => Self::LinkNotFound,
            Some(ErrorKind::CheckViolation | ErrorKind::NotNullViolation | ErrorKind::Other | _)
            | None => Self::Sql(error),
        }
    }
}
