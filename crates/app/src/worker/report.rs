//! Tick reports.

use serde::Serialize;

/// Per-job tallies of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TickSummary {
    /// Jobs this worker claimed.
    pub claimed: u32,

    /// Jobs whose role was changed.
    pub completed: u32,

    /// Jobs whose subject already held the target role.
    pub unchanged: u32,

    pub retrying: u32,
    pub failed: u32,

    /// Ready jobs another worker claimed first, or whose outcome could not be stored.
    pub skipped: u32,

    /// Stale claims taken back from workers that never reported.
    pub released: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TickReport {
    /// A previous tick was still running.
    Skipped,

    Ran(TickSummary),
}

impl TickReport {
    #[must_use]
    pub fn summary(&self) -> Option<&TickSummary> {
        match self {
            Self::Skipped => None,
            Self::Ran(summary) => Some(summary),
        }
    }
}
