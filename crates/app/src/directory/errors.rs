//! Directory errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory request timed out")]
    Timeout,

    #[error("directory transport error")]
    Transport(#[source] reqwest::Error),

    #[error("directory rate limited the request")]
    RateLimited,

    #[error("subject is not a member of the group")]
    NotMember,

    #[error("directory responded with status {status}")]
    Status { status: u16, body: String },

    #[error("unexpected directory response")]
    Decode(#[source] reqwest::Error),
}

impl DirectoryError {
    /// Transient failures are worth another attempt; definitive rejections are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) | Self::RateLimited => true,
            Self::Status { status, .. } => *status >= 500,
            Self::NotMember | Self::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for DirectoryError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_decode() {
            Self::Decode(error)
        } else {
            Self::Transport(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_throttling_are_retryable() {
        assert!(DirectoryError::Timeout.is_retryable());
        assert!(DirectoryError::RateLimited.is_retryable());
        assert!(
            DirectoryError::Status {
                status: 503,
                body: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!DirectoryError::NotMember.is_retryable());
        assert!(
            !DirectoryError::Status {
                status: 403,
                body: "missing permission".to_string()
            }
            .is_retryable()
        );
    }
}
