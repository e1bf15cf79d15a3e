//! Sync queue service.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::{debug, info, warn};

use crate::{
    database::Db,
    domain::{
        identifiers::{SubjectId, TenantId},
        sync::{
            backoff::RetryPolicy,
            data::{NewSyncJob, NextState},
            errors::SyncQueueError,
            records::{JobStatus, QueueStats, SyncJob, SyncJobUuid},
            repository::{FailureUpdate, PgSyncJobsRepository},
        },
    },
};

#[derive(Debug, Clone)]
pub struct PgSyncQueue {
    db: Db,
    repository: PgSyncJobsRepository,
    policy: RetryPolicy,
}

impl PgSyncQueue {
    #[must_use]
    pub fn new(db: Db, policy: RetryPolicy) -> Self {
        Self {
            db,
            repository: PgSyncJobsRepository::new(),
            policy,
        }
    }
}

#[async_trait]
impl SyncQueue for PgSyncQueue {
    async fn enqueue(&self, job: NewSyncJob, now: Timestamp) -> Result<SyncJob, SyncQueueError> {
        let mut tx = self.db.begin().await?;

        let created = enqueue_in(&self.repository, &mut tx, &job, self.policy, now).await?;

        tx.commit().await?;

        info!(
            tenant = %created.tenant_id,
            subject = %created.subject_id,
            job = %created.uuid,
            rank = %created.target_rank,
            origin = created.origin.kind.as_str(),
            "sync job enqueued"
        );

        Ok(created)
    }

    async fn dequeue_ready(
        &self,
        limit: u32,
        now: Timestamp,
    ) -> Result<Vec<SyncJob>, SyncQueueError> {
        let mut tx = self.db.begin().await?;

        let jobs = self
            .repository
            .dequeue_ready(&mut tx, i64::from(limit), now)
            .await?;

        tx.commit().await?;

        Ok(jobs)
    }

    async fn mark_in_progress(
        &self,
        job: SyncJobUuid,
        now: Timestamp,
    ) -> Result<SyncJob, SyncQueueError> {
        let mut tx = self.db.begin().await?;

        let lease_expires_at = now.checked_add(self.policy.lease())?;

        let claimed = self
            .repository
            .claim_job(&mut tx, job, now, lease_expires_at)
            .await?
            .ok_or(SyncQueueError::NotClaimable)?;

        tx.commit().await?;

        Ok(claimed)
    }

    async fn mark_completed(
        &self,
        job: SyncJobUuid,
        now: Timestamp,
    ) -> Result<SyncJob, SyncQueueError> {
        let mut tx = self.db.begin().await?;

        let current = self.repository.lock_job(&mut tx, job).await?;

        if current.status != JobStatus::InProgress {
            return Err(SyncQueueError::InvalidState {
                status: current.status,
            });
        }

        let completed = self.repository.complete_job(&mut tx, job, now).await?;

        tx.commit().await?;

        Ok(completed)
    }

    async fn mark_failed(
        &self,
        job: SyncJobUuid,
        error: String,
        allow_retry: bool,
        now: Timestamp,
    ) -> Result<NextState, SyncQueueError> {
        let mut tx = self.db.begin().await?;

        let current = self.repository.lock_job(&mut tx, job).await?;

        if current.status != JobStatus::InProgress {
            return Err(SyncQueueError::InvalidState {
                status: current.status,
            });
        }

        let (next, update) = failure_update(self.policy, &current, &error, allow_retry, now)?;

        let updated = self
            .repository
            .record_failure(&mut tx, job, update, now)
            .await?;

        tx.commit().await?;

        match next {
            NextState::Retrying { next_retry_at } => warn!(
                tenant = %updated.tenant_id,
                job = %updated.uuid,
                attempts = updated.attempts,
                %next_retry_at,
                error = %error,
                "sync job will be retried"
            ),
            NextState::Failed => warn!(
                tenant = %updated.tenant_id,
                job = %updated.uuid,
                attempts = updated.attempts,
                error = %error,
                "sync job failed permanently"
            ),
        }

        Ok(next)
    }

    async fn release_expired_claims(&self, now: Timestamp) -> Result<u64, SyncQueueError> {
        let mut tx = self.db.begin().await?;

        let expired = self.repository.lock_expired_claims(&mut tx, now).await?;
        let mut released = 0;

        for job in expired {
            let (next, update) =
                failure_update(self.policy, &job, CLAIM_EXPIRED_ERROR, true, now)?;

            self.repository
                .record_failure(&mut tx, job.uuid, update, now)
                .await?;

            warn!(
                tenant = %job.tenant_id,
                job = %job.uuid,
                attempts = job.attempts,
                next = ?next,
                "sync job claim expired"
            );

            released += 1;
        }

        tx.commit().await?;

        Ok(released)
    }

    async fn cancel_pending_for(
        &self,
        tenant: &TenantId,
        subject: SubjectId,
        now: Timestamp,
    ) -> Result<u64, SyncQueueError> {
        let mut tx = self.db.begin().await?;

        self.repository.lock_subject(&mut tx, tenant, subject).await?;

        let cancelled = self
            .repository
            .cancel_pending(&mut tx, tenant, subject, now)
            .await?;

        tx.commit().await?;

        if cancelled > 0 {
            info!(tenant = %tenant, subject = %subject, cancelled, "sync jobs cancelled");
        }

        Ok(cancelled)
    }

    async fn get_job(&self, job: SyncJobUuid) -> Result<SyncJob, SyncQueueError> {
        let mut tx = self.db.begin().await?;

        let job = self.repository.get_job(&mut tx, job).await?;

        tx.commit().await?;

        Ok(job)
    }

    async fn active_job_for(
        &self,
        tenant: &TenantId,
        subject: SubjectId,
    ) -> Result<Option<SyncJob>, SyncQueueError> {
        let mut tx = self.db.begin().await?;

        let job = self
            .repository
            .find_active_job(&mut tx, tenant, subject)
            .await?;

        tx.commit().await?;

        Ok(job)
    }

    async fn history_for(
        &self,
        tenant: &TenantId,
        subject: SubjectId,
        limit: u32,
    ) -> Result<Vec<SyncJob>, SyncQueueError> {
        let mut tx = self.db.begin().await?;

        let jobs = self
            .repository
            .history_for(&mut tx, tenant, subject, i64::from(limit))
            .await?;

        tx.commit().await?;

        Ok(jobs)
    }

    async fn list_active(&self, tenant: &TenantId) -> Result<Vec<SyncJob>, SyncQueueError> {
        let mut tx = self.db.begin().await?;

        let jobs = self.repository.list_active(&mut tx, tenant).await?;

        tx.commit().await?;

        Ok(jobs)
    }

    async fn queue_stats(&self, tenant: &TenantId) -> Result<QueueStats, SyncQueueError> {
        let mut tx = self.db.begin().await?;

        let stats = self.repository.queue_stats(&mut tx, tenant).await?;

        tx.commit().await?;

        Ok(stats)
    }

    async fn requeue_failed(
        &self,
        tenant: &TenantId,
        subject: Option<SubjectId>,
        now: Timestamp,
    ) -> Result<u64, SyncQueueError> {
        let mut tx = self.db.begin().await?;

        let subjects = self
            .repository
            .failed_subjects(&mut tx, tenant, subject)
            .await?;

        let mut requeued = 0;

        for subject in subjects {
            self.repository.lock_subject(&mut tx, tenant, subject).await?;

            if self
                .repository
                .find_active_job(&mut tx, tenant, subject)
                .await?
                .is_some()
            {
                continue;
            }

            requeued += self
                .repository
                .requeue_latest_failed(&mut tx, tenant, subject, now)
                .await?;
        }

        tx.commit().await?;

        info!(tenant = %tenant, requeued, "failed sync jobs requeued");

        Ok(requeued)
    }

    async fn purge_terminal_before(&self, cutoff: Timestamp) -> Result<u64, SyncQueueError> {
        let mut tx = self.db.begin().await?;

        let purged = self
            .repository
            .purge_terminal_before(&mut tx, cutoff)
            .await?;

        tx.commit().await?;

        if purged > 0 {
            info!(purged, %cutoff, "terminal sync jobs purged");
        }

        Ok(purged)
    }
}

/// Recorded on a job whose worker never reported back.
const CLAIM_EXPIRED_ERROR: &str = "CLAIM_EXPIRED: no report before the claim lease ran out";

/// Next state of an in-progress job after a failed attempt, with the row update that records it.
fn failure_update<'a>(
    policy: RetryPolicy,
    job: &SyncJob,
    error: &'a str,
    allow_retry: bool,
    now: Timestamp,
) -> Result<(NextState, FailureUpdate<'a>), SyncQueueError> {
    if allow_retry && job.attempts < job.max_attempts {
        let next_retry_at = now.checked_add(policy.delay(job.attempts))?;

        return Ok((
            NextState::Retrying { next_retry_at },
            FailureUpdate {
                status: JobStatus::Retrying,
                error,
                next_retry_at: Some(next_retry_at),
                completed_at: None,
            },
        ));
    }

    Ok((
        NextState::Failed,
        FailureUpdate {
            status: JobStatus::Failed,
            error,
            next_retry_at: None,
            completed_at: Some(now),
        },
    ))
}

/// Insert a job inside the caller's transaction, holding the subject lock until it ends.
pub(crate) async fn enqueue_in(
    repository: &PgSyncJobsRepository,
    tx: &mut Transaction<'_, Postgres>,
    job: &NewSyncJob,
    policy: RetryPolicy,
    now: Timestamp,
) -> Result<SyncJob, SyncQueueError> {
    let max_attempts = i32::try_from(policy.max_attempts)?;

    repository
        .lock_subject(tx, &job.tenant_id, job.subject_id)
        .await?;

    if let Some(existing) = repository
        .find_active_job(tx, &job.tenant_id, job.subject_id)
        .await?
    {
        debug!(
            tenant = %job.tenant_id,
            subject = %job.subject_id,
            job = %existing.uuid,
            "sync job already pending"
        );

        return Err(SyncQueueError::DuplicatePending { job: existing.uuid });
    }

    let created = repository
        .insert_job(tx, SyncJobUuid::new(), job, max_attempts, now)
        .await?;

    Ok(created)
}

#[automock]
#[async_trait]
pub trait SyncQueue: Send + Sync {
    /// Queue a job, unless one is already pending for the same tenant and subject.
    async fn enqueue(&self, job: NewSyncJob, now: Timestamp) -> Result<SyncJob, SyncQueueError>;

    /// Jobs eligible to run at `now`, highest priority first, then oldest first.
    async fn dequeue_ready(&self, limit: u32, now: Timestamp)
    -> Result<Vec<SyncJob>, SyncQueueError>;

    /// Claim a ready job for this worker. Losing the race yields `NotClaimable`.
    async fn mark_in_progress(
        &self,
        job: SyncJobUuid,
        now: Timestamp,
    ) -> Result<SyncJob, SyncQueueError>;

    async fn mark_completed(
        &self,
        job: SyncJobUuid,
        now: Timestamp,
    ) -> Result<SyncJob, SyncQueueError>;

    /// Record a failed attempt and schedule the retry, if any remain.
    async fn mark_failed(
        &self,
        job: SyncJobUuid,
        error: String,
        allow_retry: bool,
        now: Timestamp,
    ) -> Result<NextState, SyncQueueError>;

    /// Take back claims whose lease ran out: each counts as a failed, retryable
    /// attempt, so the job retries with backoff or fails once attempts are spent.
    async fn release_expired_claims(&self, now: Timestamp) -> Result<u64, SyncQueueError>;

    /// Cancel queued and retrying jobs of the subject. In-progress jobs are left alone.
    async fn cancel_pending_for(
        &self,
        tenant: &TenantId,
        subject: SubjectId,
        now: Timestamp,
    ) -> Result<u64, SyncQueueError>;

    async fn get_job(&self, job: SyncJobUuid) -> Result<SyncJob, SyncQueueError>;

    async fn active_job_for(
        &self,
        tenant: &TenantId,
        subject: SubjectId,
    ) -> Result<Option<SyncJob>, SyncQueueError>;

    /// Most recent jobs of the subject, newest first.
    async fn history_for(
        &self,
        tenant: &TenantId,
        subject: SubjectId,
        limit: u32,
    ) -> Result<Vec<SyncJob>, SyncQueueError>;

    async fn list_active(&self, tenant: &TenantId) -> Result<Vec<SyncJob>, SyncQueueError>;

    async fn queue_stats(&self, tenant: &TenantId) -> Result<QueueStats, SyncQueueError>;

    /// Put the latest job of each subject back in the queue with a fresh attempt
    /// budget, when that job failed. A newer completed or cancelled job wins.
    async fn requeue_failed(
        &self,
        tenant: &TenantId,
        subject: Option<SubjectId>,
        now: Timestamp,
    ) -> Result<u64, SyncQueueError>;

    /// Delete terminal jobs that finished before `cutoff`.
    async fn purge_terminal_before(&self, cutoff: Timestamp) -> Result<u64, SyncQueueError>;
}
