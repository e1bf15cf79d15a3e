//! Outbound call pacing.

use std::time::Duration;

use tokio::{
    sync::Mutex,
    time::{Instant, sleep},
};

/// Token bucket that makes callers wait for capacity instead of failing.
#[derive(Debug)]
pub(crate) struct TokenBucket {
    capacity: u32,
    refill_every: Duration,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

impl TokenBucket {
    /// A bucket allowing `calls_per_minute` calls, starting full.
    pub(crate) fn per_minute(calls_per_minute: u32) -> Self {
        let capacity = calls_per_minute.max(1);

        Self {
            capacity,
            refill_every: Duration::from_secs(60) / capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one token, sleeping until one is available.
    pub(crate) async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                self.refill(&mut state);

                if state.tokens > 0 {
                    state.tokens -= 1;
                    return;
                }

                self.refill_every
                    .saturating_sub(state.last_refill.elapsed())
                    .max(Duration::from_millis(1))
            };

            sleep(wait).await;
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let elapsed = state.last_refill.elapsed();
        let earned = elapsed.as_nanos() / self.refill_every.as_nanos().max(1);

        if earned == 0 {
            return;
        }

        let earned = u32::try_from(earned).unwrap_or(u32::MAX);

        state.tokens = state.tokens.saturating_add(earned).min(self.capacity);
        state.last_refill = if state.tokens == self.capacity {
            Instant::now()
        } else {
            state.last_refill + self.refill_every * earned
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn full_bucket_does_not_wait() {
        let bucket = TokenBucket::per_minute(3);
        let started = Instant::now();

        for _ in 0..3 {
            bucket.acquire().await;
        }

        assert_eq!(started.elapsed(), Duration::ZERO, "tokens were available");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_bucket_waits_for_refill() {
        let bucket = TokenBucket::per_minute(2);
        let started = Instant::now();

        bucket.acquire().await;
        bucket.acquire().await;
        bucket.acquire().await;

        assert!(
            started.elapsed() >= Duration::from_secs(30),
            "third call should wait one refill interval"
        );
        assert!(
            started.elapsed() < Duration::from_secs(31),
            "third call should not wait longer than needed"
        );
    }
}
