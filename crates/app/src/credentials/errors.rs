//! Credential store errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("no link exists for this tenant")]
    LinkNotFound,

    #[error("a credential was already issued; regenerate it instead")]
    AlreadyIssued,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for CredentialStoreError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::LinkNotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyIssued,
            Some(
                ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation
                | ErrorKind::Other
                | _,
            )
            | None => Self::Sql(error),
        }
    }
}
