//! Verification Challenge Records

use jiff::Timestamp;
use serde::Serialize;

use crate::domain::identifiers::{GroupId, TenantId};

/// Pending ownership challenge of a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationChallenge {
    pub tenant_id: TenantId,
    pub group_id: GroupId,
    pub code: String,
    pub initiator: String,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub attempts: u32,
    pub max_attempts: u32,
    pub verified: bool,
}

impl VerificationChallenge {
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    #[must_use]
    pub fn attempts_remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }
}
