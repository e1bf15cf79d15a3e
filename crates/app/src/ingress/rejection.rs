//! Gateway rejections.

use jiff::Timestamp;
use thiserror::Error;

use crate::{credentials::CredentialStoreError, domain::identifiers::ResourceId};

/// Why a request was turned away. Each variant has a stable wire code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayRejection {
    #[error("missing or malformed credential")]
    NoCredential,

    #[error("credential is not valid")]
    InvalidCredential,

    #[error("group ownership has not been verified")]
    NotVerified,

    #[error("required parameter `{0}` is missing")]
    MissingParams(&'static str),

    #[error("request timestamp is outside the accepted window")]
    StaleOrFutureTimestamp,

    #[error("request signature is missing or invalid")]
    BadSignature,

    #[error("resource {0} is not authorized for this credential")]
    ResourceNotAuthorized(ResourceId),

    #[error("rate limit exceeded")]
    RateLimited { reset_at: Timestamp },
}

impl GatewayRejection {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoCredential => "NO_CREDENTIAL",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::NotVerified => "NOT_VERIFIED",
            Self::MissingParams(_) => "MISSING_PARAMS",
            Self::StaleOrFutureTimestamp => "STALE_OR_FUTURE_TIMESTAMP",
            Self::BadSignature => "BAD_SIGNATURE",
            Self::ResourceNotAuthorized(_) => "RESOURCE_NOT_AUTHORIZED",
            Self::RateLimited { .. } => "RATE_LIMITED",
        }
    }

    /// Human-readable explanation, safe to return to callers.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Rejected(#[from] GatewayRejection),

    #[error("credential store unavailable")]
    Store(#[from] CredentialStoreError),
}
