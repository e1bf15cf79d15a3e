//! Worker loop.

use std::{fmt, sync::Arc, time::Duration};

use jiff::{SignedDuration, Timestamp};
use tokio::{
    sync::{Mutex, watch},
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, error, info, warn};

use crate::{
    directory::{DirectoryService, Freshness, models::resolve_rank},
    domain::{
        links::{LinksService, LinksServiceError, data::SyncOutcome},
        sync::{
            SyncQueue, SyncQueueError,
            data::NextState,
            records::SyncJob,
        },
    },
    worker::{
        failure::SyncFailure,
        report::{TickReport, TickSummary},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    pub poll_interval: Duration,

    /// Jobs considered per tick.
    pub batch_size: u32,

    /// Terminal jobs older than this are purged.
    pub retention: SignedDuration,

    /// Run retention cleanup once every this many ticks.
    pub purge_every_ticks: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            batch_size: 25,
            retention: SignedDuration::from_hours(24 * 30),
            purge_every_ticks: 120,
        }
    }
}

/// What the directory call achieved for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    Changed,
    Unchanged,
}

/// Where a single job ended up after this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
    Completed(Applied),
    Retrying,
    Failed,
    Skipped,
}

pub struct RoleSyncWorker {
    queue: Arc<dyn SyncQueue>,
    links: Arc<dyn LinksService>,
    directory: Arc<dyn DirectoryService>,
    config: WorkerConfig,
    running: Mutex<()>,
}

impl fmt::Debug for RoleSyncWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleSyncWorker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RoleSyncWorker {
    #[must_use]
    pub fn new(
        queue: Arc<dyn SyncQueue>,
        links: Arc<dyn LinksService>,
        directory: Arc<dyn DirectoryService>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            links,
            directory,
            config,
            running: Mutex::new(()),
        }
    }

    /// Process one batch of ready jobs. Overlapping calls return [`TickReport::Skipped`].
    pub async fn tick(&self, now: Timestamp) -> TickReport {
        let Ok(_running) = self.running.try_lock() else {
            debug!("sync tick already running");
            return TickReport::Skipped;
        };

        let mut summary = TickSummary::default();

        match self.queue.release_expired_claims(now).await {
            Ok(released) => summary.released = released,
            Err(error) => error!(error = %error, "failed to release expired sync claims"),
        }

        let jobs = match self.queue.dequeue_ready(self.config.batch_size, now).await {
            Ok(jobs) => jobs,
            Err(error) => {
                error!(error = %error, "failed to read ready sync jobs");
                return TickReport::Ran(summary);
            }
        };

        for job in jobs {
            match self.process(job, now).await {
                JobOutcome::Completed(Applied::Changed) => {
                    summary.claimed += 1;
                    summary.completed += 1;
                }
                JobOutcome::Completed(Applied::Unchanged) => {
                    summary.claimed += 1;
                    summary.unchanged += 1;
                }
                JobOutcome::Retrying => {
                    summary.claimed += 1;
                    summary.retrying += 1;
                }
                JobOutcome::Failed => {
                    summary.claimed += 1;
                    summary.failed += 1;
                }
                JobOutcome::Skipped => summary.skipped += 1,
            }
        }

        if summary != TickSummary::default() {
            info!(
                claimed = summary.claimed,
                completed = summary.completed,
                unchanged = summary.unchanged,
                retrying = summary.retrying,
                failed = summary.failed,
                skipped = summary.skipped,
                released = summary.released,
                "sync tick finished"
            );
        }

        TickReport::Ran(summary)
    }

    /// Poll until `shutdown` flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ticks: u32 = 0;

        info!(
            poll_interval = ?self.config.poll_interval,
            batch_size = self.config.batch_size,
            "sync worker started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }

                    continue;
                }
            }

            let now = Timestamp::now();

            self.tick(now).await;

            ticks = ticks.wrapping_add(1);

            if self.config.purge_every_ticks > 0 && ticks % self.config.purge_every_ticks == 0 {
                self.purge(now).await;
            }
        }

        info!("sync worker stopped");
    }

    /// Delete terminal jobs past retention.
    pub async fn purge(&self, now: Timestamp) -> u64 {
        let Ok(cutoff) = now.checked_sub(self.config.retention) else {
            warn!("retention period out of range; skipping purge");
            return 0;
        };

        match self.queue.purge_terminal_before(cutoff).await {
            Ok(purged) => purged,
            Err(error) => {
                error!(error = %error, "failed to purge terminal sync jobs");
                0
            }
        }
    }

    async fn process(&self, job: SyncJob, now: Timestamp) -> JobOutcome {
        let job = match self.queue.mark_in_progress(job.uuid, now).await {
            Ok(job) => job,
            Err(SyncQueueError::NotClaimable) => {
                debug!(job = %job.uuid, "sync job claimed elsewhere");
                return JobOutcome::Skipped;
            }
            Err(error) => {
                error!(job = %job.uuid, error = %error, "failed to claim sync job");
                return JobOutcome::Skipped;
            }
        };

        match self.apply(&job).await {
            Ok(applied) => self.report_success(&job, applied, now).await,
            Err(failure) => self.report_failure(&job, &failure, now).await,
        }
    }

    async fn apply(&self, job: &SyncJob) -> Result<Applied, SyncFailure> {
        let link = match self.links.get_link(&job.tenant_id).await {
            Ok(link) => link,
            Err(LinksServiceError::NotFound) => return Err(SyncFailure::LinkNotFound),
            Err(error) => return Err(SyncFailure::Storage(error.to_string())),
        };

        if !link.is_verified() {
            return Err(SyncFailure::NotVerified);
        }

        let current = self
            .directory
            .get_user_role(link.group_id, job.subject_id)
            .await?;

        let roles = self
            .directory
            .list_roles(link.group_id, Freshness::Cached)
            .await?;

        let target =
            resolve_rank(&roles, job.target_rank).ok_or(SyncFailure::RoleNotFound(job.target_rank))?;

        if current.id == target.id {
            return Ok(Applied::Unchanged);
        }

        self.directory
            .set_user_role(link.group_id, job.subject_id, target.id)
            .await?;

        info!(
            tenant = %job.tenant_id,
            job = %job.uuid,
            subject = %job.subject_id,
            from = %current.name,
            to = %target.name,
            "subject role updated"
        );

        Ok(Applied::Changed)
    }

    async fn report_success(&self, job: &SyncJob, applied: Applied, now: Timestamp) -> JobOutcome {
        if let Err(error) = self.queue.mark_completed(job.uuid, now).await {
            error!(job = %job.uuid, error = %error, "failed to mark sync job completed");
            return JobOutcome::Skipped;
        }

        if let Err(error) = self
            .links
            .record_sync_outcome(&job.tenant_id, SyncOutcome::Succeeded, now)
            .await
        {
            warn!(tenant = %job.tenant_id, error = %error, "failed to record sync success");
        }

        JobOutcome::Completed(applied)
    }

    async fn report_failure(
        &self,
        job: &SyncJob,
        failure: &SyncFailure,
        now: Timestamp,
    ) -> JobOutcome {
        let next = match self
            .queue
            .mark_failed(job.uuid, failure.record(), failure.is_retryable(), now)
            .await
        {
            Ok(next) => next,
            Err(error) => {
                error!(job = %job.uuid, error = %error, "failed to record sync failure");
                return JobOutcome::Skipped;
            }
        };

        if !matches!(failure, SyncFailure::LinkNotFound)
            && let Err(error) = self
                .links
                .record_sync_outcome(&job.tenant_id, SyncOutcome::Failed, now)
                .await
        {
            warn!(tenant = %job.tenant_id, error = %error, "failed to record sync failure");
        }

        match next {
            NextState::Retrying { .. } => JobOutcome::Retrying,
            NextState::Failed => JobOutcome::Failed,
        }
    }
}
