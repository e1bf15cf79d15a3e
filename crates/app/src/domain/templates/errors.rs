//! Templates service errors.

use std::num::TryFromIntError;

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplatesServiceError {
    #[error("template already exists")]
    AlreadyExists,

    #[error("template not found")]
    NotFound,

    #[error("invalid template data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),

    #[error("invalid cooldown value")]
    InvalidCooldown(#[from] TryFromIntError),
}

impl From<Error> for TemplatesServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::CheckViolation | ErrorKind::NotNullViolation) => Self::InvalidData,
            Some(ErrorKind::ForeignKeyViolation | ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}
