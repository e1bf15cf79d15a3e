//! Sync Worker Config

use clap::Args;

/// Role sync worker and retry settings.
#[derive(Debug, Args)]
pub struct WorkerSettings {
    /// Run the sync worker inside this process
    #[arg(
        long,
        env = "SYNC_WORKER_ENABLED",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub sync_worker_enabled: bool,

    /// Seconds between queue polls
    #[arg(long, env = "SYNC_POLL_INTERVAL_SECONDS", default_value_t = 30)]
    pub sync_poll_interval_seconds: u64,

    /// Jobs considered per poll
    #[arg(long, env = "SYNC_BATCH_SIZE", default_value_t = 25)]
    pub sync_batch_size: u32,

    /// Attempts before a job fails permanently
    #[arg(long, env = "SYNC_MAX_ATTEMPTS", default_value_t = 5)]
    pub sync_max_attempts: u32,

    /// First retry delay in minutes
    #[arg(long, env = "SYNC_BACKOFF_BASE_MINUTES", default_value_t = 5)]
    pub sync_backoff_base_minutes: u32,

    /// Longest retry delay in minutes
    #[arg(long, env = "SYNC_BACKOFF_CAP_MINUTES", default_value_t = 30)]
    pub sync_backoff_cap_minutes: u32,

    /// Minutes a claimed job may run before it is taken back
    #[arg(long, env = "SYNC_CLAIM_LEASE_MINUTES", default_value_t = 10)]
    pub sync_claim_lease_minutes: u32,

    /// Days finished jobs are kept
    #[arg(long, env = "SYNC_RETENTION_DAYS", default_value_t = 30)]
    pub sync_retention_days: u32,
}
