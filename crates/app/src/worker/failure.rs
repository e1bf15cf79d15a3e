//! Reasons a sync attempt fails.

use thiserror::Error;

use crate::{directory::DirectoryError, domain::identifiers::Rank};

#[derive(Debug, Error)]
pub enum SyncFailure {
    #[error("link not found")]
    LinkNotFound,

    #[error("group ownership has not been verified")]
    NotVerified,

    #[error("subject is not a member of the group")]
    NotMember,

    #[error("no role in the group carries rank {0}")]
    RoleNotFound(Rank),

    #[error("directory request failed: {0}")]
    Directory(#[source] DirectoryError),

    #[error("link lookup failed: {0}")]
    Storage(String),
}

impl SyncFailure {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::LinkNotFound => "LINK_NOT_FOUND",
            Self::NotVerified => "NOT_VERIFIED",
            Self::NotMember => "NOT_MEMBER",
            Self::RoleNotFound(_) => "ROLE_NOT_FOUND",
            Self::Directory(_) => "DIRECTORY_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Transient failures are rescheduled; the rest fail the job on the spot.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Directory(error) => error.is_retryable(),
            Self::Storage(_) => true,
            Self::LinkNotFound | Self::NotVerified | Self::NotMember | Self::RoleNotFound(_) => {
                false
            }
        }
    }

    /// Message recorded on the job.
    #[must_use]
    pub fn record(&self) -> String {
        format!("{}: {self}", self.code())
    }
}

impl From<DirectoryError> for SyncFailure {
    fn from(error: DirectoryError) -> Self {
        match error {
            DirectoryError::NotMember => Self::NotMember,
            other => Self::Directory(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_failures_are_terminal() {
        assert!(!SyncFailure::LinkNotFound.is_retryable());
        assert!(!SyncFailure::NotVerified.is_retryable());
        assert!(!SyncFailure::RoleNotFound(Rank(4)).is_retryable());
        assert!(!SyncFailure::from(DirectoryError::NotMember).is_retryable());
    }

    #[test]
    fn transient_directory_failures_are_retried() {
        assert!(SyncFailure::from(DirectoryError::Timeout).is_retryable());
        assert!(
            SyncFailure::from(DirectoryError::Status {
                status: 502,
                body: String::new()
            })
            .is_retryable()
        );
        assert!(
            !SyncFailure::from(DirectoryError::Status {
                status: 400,
                body: String::new()
            })
            .is_retryable()
        );
    }

    #[test]
    fn recorded_message_leads_with_code() {
        assert_eq!(
            SyncFailure::RoleNotFound(Rank(4)).record(),
            "ROLE_NOT_FOUND: no role in the group carries rank 4"
        );
    }
}
