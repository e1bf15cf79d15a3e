//! Sync Jobs Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};

use crate::domain::{
    identifiers::{Rank, SubjectId, TenantId, decode_error},
    sync::{
        data::NewSyncJob,
        records::{JobOrigin, JobStatus, QueueStats, SyncJob, SyncJobUuid},
    },
};

const LOCK_SUBJECT_SQL: &str = include_str!("sql/lock_subject.sql");
const FIND_ACTIVE_JOB_SQL: &str = include_str!("sql/find_active_job.sql");
const INSERT_JOB_SQL: &str = include_str!("sql/insert_job.sql");
const DEQUEUE_READY_SQL: &str = include_str!("sql/dequeue_ready.sql");
const CLAIM_JOB_SQL: &str = include_str!("sql/claim_job.sql");
const EXPIRED_CLAIMS_SQL: &str = include_str!("sql/expired_claims.sql");
const COMPLETE_JOB_SQL: &str = include_str!("sql/complete_job.sql");
const LOCK_JOB_SQL: &str = include_str!("sql/lock_job.sql");
const FAIL_JOB_SQL: &str = include_str!("sql/fail_job.sql");
const CANCEL_PENDING_SQL: &str = include_str!("sql/cancel_pending.sql");
const GET_JOB_SQL: &str = include_str!("sql/get_job.sql");
const HISTORY_FOR_SQL: &str = include_str!("sql/history_for.sql");
const LIST_ACTIVE_SQL: &str = include_str!("sql/list_active.sql");
const QUEUE_STATS_SQL: &str = include_str!("sql/queue_stats.sql");
const FAILED_SUBJECTS_SQL: &str = include_str!("sql/failed_subjects.sql");
const REQUEUE_FAILED_SQL: &str = include_str!("sql/requeue_failed.sql");
const PURGE_TERMINAL_BEFORE_SQL: &str = include_str!("sql/purge_terminal_before.sql");

/// Fields written when a failed attempt is recorded.
#[derive(Debug)]
pub(crate) struct FailureUpdate<'a> {
    pub status: JobStatus,
    pub error: &'a str,
    pub next_retry_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgSyncJobsRepository;

impl PgSyncJobsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Serialize writers for one (tenant, subject) pair until the transaction ends.
    pub(crate) async fn lock_subject(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        subject: SubjectId,
    ) -> Result<(), sqlx::Error> {
        query(LOCK_SUBJECT_SQL)
            .bind(tenant.as_str())
            .bind(subject_param(subject)?)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn find_active_job(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        subject: SubjectId,
    ) -> Result<Option<SyncJob>, sqlx::Error> {
        query_as::<Postgres, SyncJob>(FIND_ACTIVE_JOB_SQL)
            .bind(tenant.as_str())
            .bind(subject_param(subject)?)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn insert_job(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        uuid: SyncJobUuid,
        job: &NewSyncJob,
        max_attempts: i32,
        now: Timestamp,
    ) -> Result<SyncJob, sqlx::Error> {
        query_as::<Postgres, SyncJob>(INSERT_JOB_SQL)
            .bind(uuid.into_uuid())
            .bind(job.tenant_id.as_str())
            .bind(subject_param(job.subject_id)?)
            .bind(job.target_rank.to_i16())
            .bind(job.priority)
            .bind(max_attempts)
            .bind(job.origin.kind.as_str())
            .bind(job.origin.reference.as_deref())
            .bind(SqlxTimestamp::from(now))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn dequeue_ready(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        limit: i64,
        now: Timestamp,
    ) -> Result<Vec<SyncJob>, sqlx::Error> {
        query_as::<Postgres, SyncJob>(DEQUEUE_READY_SQL)
            .bind(SqlxTimestamp::from(now))
            .bind(limit)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn claim_job(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job: SyncJobUuid,
        now: Timestamp,
        lease_expires_at: Timestamp,
    ) -> Result<Option<SyncJob>, sqlx::Error> {
        query_as::<Postgres, SyncJob>(CLAIM_JOB_SQL)
            .bind(job.into_uuid())
            .bind(SqlxTimestamp::from(now))
            .bind(SqlxTimestamp::from(lease_expires_at))
            .fetch_optional(&mut **tx)
            .await
    }

    /// Lock in-progress jobs whose lease ran out, skipping rows another
    /// transaction already holds.
    pub(crate) async fn lock_expired_claims(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        now: Timestamp,
    ) -> Result<Vec<SyncJob>, sqlx::Error> {
        query_as::<Postgres, SyncJob>(EXPIRED_CLAIMS_SQL)
            .bind(SqlxTimestamp::from(now))
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn complete_job(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job: SyncJobUuid,
        now: Timestamp,
    ) -> Result<SyncJob, sqlx::Error> {
        query_as::<Postgres, SyncJob>(COMPLETE_JOB_SQL)
            .bind(job.into_uuid())
            .bind(SqlxTimestamp::from(now))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn lock_job(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job: SyncJobUuid,
    ) -> Result<SyncJob, sqlx::Error> {
        query_as::<Postgres, SyncJob>(LOCK_JOB_SQL)
            .bind(job.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn record_failure(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job: SyncJobUuid,
        update: FailureUpdate<'_>,
        now: Timestamp,
    ) -> Result<SyncJob, sqlx::Error> {
        query_as::<Postgres, SyncJob>(FAIL_JOB_SQL)
            .bind(job.into_uuid())
            .bind(update.status.as_str())
            .bind(update.error)
            .bind(update.next_retry_at.map(SqlxTimestamp::from))
            .bind(update.completed_at.map(SqlxTimestamp::from))
            .bind(SqlxTimestamp::from(now))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn cancel_pending(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        subject: SubjectId,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(CANCEL_PENDING_SQL)
            .bind(tenant.as_str())
            .bind(subject_param(subject)?)
            .bind(SqlxTimestamp::from(now))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn get_job(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job: SyncJobUuid,
    ) -> Result<SyncJob, sqlx::Error> {
        query_as::<Postgres, SyncJob>(GET_JOB_SQL)
            .bind(job.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn history_for(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        subject: SubjectId,
        limit: i64,
    ) -> Result<Vec<SyncJob>, sqlx::Error> {
        query_as::<Postgres, SyncJob>(HISTORY_FOR_SQL)
            .bind(tenant.as_str())
            .bind(subject_param(subject)?)
            .bind(limit)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn list_active(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
    ) -> Result<Vec<SyncJob>, sqlx::Error> {
        query_as::<Postgres, SyncJob>(LIST_ACTIVE_SQL)
            .bind(tenant.as_str())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn queue_stats(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
    ) -> Result<QueueStats, sqlx::Error> {
        let rows = query(QUEUE_STATS_SQL)
            .bind(tenant.as_str())
            .fetch_all(&mut **tx)
            .await?;

        let mut stats = QueueStats::default();

        for row in rows {
            let status = decode_status(&row)?;
            let count: i64 = row.try_get("count")?;

            stats.add(
                status,
                u64::try_from(count).map_err(|e| decode_error("count", e))?,
            );
        }

        Ok(stats)
    }

    pub(crate) async fn failed_subjects(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        subject: Option<SubjectId>,
    ) -> Result<Vec<SubjectId>, sqlx::Error> {
        let subject = subject.map(subject_param).transpose()?;

        let ids: Vec<i64> = query_scalar(FAILED_SUBJECTS_SQL)
            .bind(tenant.as_str())
            .bind(subject)
            .fetch_all(&mut **tx)
            .await?;

        ids.into_iter()
            .map(|id| SubjectId::from_i64(id).map_err(|e| decode_error("subject_id", e)))
            .collect()
    }

    pub(crate) async fn requeue_latest_failed(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        subject: SubjectId,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(REQUEUE_FAILED_SQL)
            .bind(tenant.as_str())
            .bind(subject_param(subject)?)
            .bind(SqlxTimestamp::from(now))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn purge_terminal_before(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(PURGE_TERMINAL_BEFORE_SQL)
            .bind(SqlxTimestamp::from(cutoff))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

fn subject_param(subject: SubjectId) -> Result<i64, sqlx::Error> {
    subject
        .to_i64()
        .map_err(|source| decode_error("subject_id", source))
}

fn decode_status(row: &PgRow) -> sqlx::Result<JobStatus> {
    let status: String = row.try_get("status")?;

    status
        .parse::<JobStatus>()
        .map_err(|message| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: message.into(),
        })
}

fn decode_count(row: &PgRow, column: &str) -> sqlx::Result<u32> {
    let value: i32 = row.try_get(column)?;

    u32::try_from(value).map_err(|source| decode_error(column, source))
}

impl<'r> FromRow<'r, PgRow> for SyncJob {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let origin_kind: String = row.try_get("origin_kind")?;

        let origin = JobOrigin {
            kind: origin_kind
                .parse()
                .map_err(|message: String| sqlx::Error::ColumnDecode {
                    index: "origin_kind".to_string(),
                    source: message.into(),
                })?,
            reference: row.try_get("origin_reference")?,
        };

        Ok(Self {
            uuid: SyncJobUuid::from_uuid(row.try_get("uuid")?),
            tenant_id: TenantId::new(row.try_get::<String, _>("tenant_id")?),
            subject_id: SubjectId::from_i64(row.try_get("subject_id")?)
                .map_err(|e| decode_error("subject_id", e))?,
            target_rank: Rank::from_i16(row.try_get("target_rank")?)
                .map_err(|e| decode_error("target_rank", e))?,
            priority: row.try_get("priority")?,
            status: decode_status(row)?,
            attempts: decode_count(row, "attempts")?,
            max_attempts: decode_count(row, "max_attempts")?,
            errors: row.try_get("errors")?,
            next_retry_at: row
                .try_get::<Option<SqlxTimestamp>, _>("next_retry_at")?
                .map(SqlxTimestamp::to_jiff),
            lease_expires_at: row
                .try_get::<Option<SqlxTimestamp>, _>("lease_expires_at")?
                .map(SqlxTimestamp::to_jiff),
            origin,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
            completed_at: row
                .try_get::<Option<SqlxTimestamp>, _>("completed_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}
