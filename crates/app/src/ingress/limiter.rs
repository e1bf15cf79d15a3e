//! Fixed-window rate limiting.

use std::sync::{Mutex, PoisonError};

use jiff::{SignedDuration, Timestamp};
use rustc_hash::FxHashMap;

/// Windows are swept of expired entries once this many checks have run.
const PRUNE_EVERY: u64 = 1024;

/// Ceiling for one limiter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: SignedDuration,
}

impl RateLimit {
    #[must_use]
    pub fn new(max_requests: u32, window_seconds: u32) -> Self {
        Self {
            max_requests,
            window: SignedDuration::from_secs(i64::from(window_seconds)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32, reset_at: Timestamp },
    Limited { reset_at: Timestamp },
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    reset_at: Timestamp,
}

#[derive(Debug, Default)]
struct Windows {
    entries: FxHashMap<String, RateWindow>,
    checks: u64,
}

/// In-memory fixed-window counter keyed by an arbitrary string.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<Windows>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request against `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the window end is not a representable timestamp.
    pub fn check(
        &self,
        key: &str,
        limit: RateLimit,
        now: Timestamp,
    ) -> Result<RateDecision, jiff::Error> {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        windows.checks = windows.checks.wrapping_add(1);

        if windows.checks % PRUNE_EVERY == 0 {
            windows.entries.retain(|_key, window| window.reset_at > now);
        }

        let fresh = RateWindow {
            count: 0,
            reset_at: now.checked_add(limit.window)?,
        };

        let window = windows
            .entries
            .entry(key.to_string())
            .and_modify(|window| {
                if window.reset_at <= now {
                    *window = fresh;
                }
            })
            .or_insert(fresh);

        if window.count >= limit.max_requests {
            return Ok(RateDecision::Limited {
                reset_at: window.reset_at,
            });
        }

        window.count += 1;

        Ok(RateDecision::Allowed {
            remaining: limit.max_requests - window.count,
            reset_at: window.reset_at,
        })
    }

    /// Number of tracked keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
