//! Verification Data

use jiff::SignedDuration;

use crate::domain::verification::records::VerificationChallenge;

/// Challenge lifetime and attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengePolicy {
    pub lifetime: SignedDuration,
    pub max_attempts: u32,
    pub max_extension_minutes: u32,
}

impl Default for ChallengePolicy {
    fn default() -> Self {
        Self {
            lifetime: SignedDuration::from_mins(10),
            max_attempts: 5,
            max_extension_minutes: 30,
        }
    }
}

/// A freshly issued challenge together with what the initiator has to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedChallenge {
    pub challenge: VerificationChallenge,
    pub instructions: String,
}

/// Result of checking the group description for the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Code found; the link is now verified.
    Verified,

    /// Code absent; the check may be repeated.
    CodeNotFound { attempts_remaining: u32 },

    /// The challenge ran out before the code was found.
    Expired,

    /// Every attempt was used without finding the code.
    MaxAttempts,
}

impl CheckOutcome {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Verified => "VERIFIED",
            Self::CodeNotFound { .. } => "CODE_NOT_FOUND",
            Self::Expired => "EXPIRED",
            Self::MaxAttempts => "MAX_ATTEMPTS",
        }
    }
}
