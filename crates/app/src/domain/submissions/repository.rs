//! Submissions Repository

use std::collections::BTreeMap;

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, types::Json};

use crate::domain::{
    identifiers::{ResourceId, SubjectId, TenantId, decode_error},
    submissions::{
        data::NewSubmission,
        records::{Submission, SubmissionStatus, SubmissionUuid},
    },
    sync::records::SyncJobUuid,
    templates::records::TemplateUuid,
};

const CREATE_SUBMISSION_SQL: &str = include_str!("sql/create_submission.sql");
const GET_SUBMISSION_SQL: &str = include_str!("sql/get_submission.sql");
const LOCK_SUBMISSION_SQL: &str = include_str!("sql/lock_submission.sql");
const LOCK_SUBJECT_TEMPLATE_SQL: &str = include_str!("sql/lock_subject_template.sql");
const LATEST_FOR_SUBJECT_SQL: &str = include_str!("sql/latest_for_subject.sql");
const PENDING_FOR_SUBJECT_SQL: &str = include_str!("sql/pending_for_subject.sql");
const RECORD_DECISION_SQL: &str = include_str!("sql/record_decision.sql");
const LIST_FOR_SUBJECT_SQL: &str = include_str!("sql/list_for_subject.sql");

/// Decision columns written when a reviewer closes a submission.
#[derive(Debug)]
pub(crate) struct DecisionUpdate<'a> {
    pub status: SubmissionStatus,
    pub reviewer: &'a str,
    pub reason: Option<&'a str>,
    pub decided_at: Timestamp,
    pub sync_job: Option<SyncJobUuid>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgSubmissionsRepository;

impl PgSubmissionsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_submission(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        submission: &NewSubmission,
        now: Timestamp,
    ) -> Result<Submission, sqlx::Error> {
        query_as::<Postgres, Submission>(CREATE_SUBMISSION_SQL)
            .bind(submission.uuid.into_uuid())
            .bind(tenant.as_str())
            .bind(submission.template_uuid.into_uuid())
            .bind(
                submission
                    .resource_id
                    .to_i64()
                    .map_err(|source| decode_error("resource_id", source))?,
            )
            .bind(subject_param(submission.subject_id)?)
            .bind(&submission.subject_name)
            .bind(Json(&submission.answers))
            .bind(SqlxTimestamp::from(now))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_submission(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        submission: SubmissionUuid,
    ) -> Result<Submission, sqlx::Error> {
        query_as::<Postgres, Submission>(GET_SUBMISSION_SQL)
            .bind(tenant.as_str())
            .bind(submission.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn lock_submission(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        submission: SubmissionUuid,
    ) -> Result<Submission, sqlx::Error> {
        query_as::<Postgres, Submission>(LOCK_SUBMISSION_SQL)
            .bind(tenant.as_str())
            .bind(submission.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Serialize submissions of one subject to one template until the transaction ends.
    pub(crate) async fn lock_subject_template(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        template: TemplateUuid,
        subject: SubjectId,
    ) -> Result<(), sqlx::Error> {
        query(LOCK_SUBJECT_TEMPLATE_SQL)
            .bind(tenant.as_str())
            .bind(template.into_uuid())
            .bind(subject_param(subject)?)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn latest_for_subject(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        template: TemplateUuid,
        subject: SubjectId,
    ) -> Result<Option<Submission>, sqlx::Error> {
        query_as::<Postgres, Submission>(LATEST_FOR_SUBJECT_SQL)
            .bind(tenant.as_str())
            .bind(template.into_uuid())
            .bind(subject_param(subject)?)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn pending_for_subject(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        template: TemplateUuid,
        subject: SubjectId,
    ) -> Result<Option<Submission>, sqlx::Error> {
        query_as::<Postgres, Submission>(PENDING_FOR_SUBJECT_SQL)
            .bind(tenant.as_str())
            .bind(template.into_uuid())
            .bind(subject_param(subject)?)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn record_decision(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        submission: SubmissionUuid,
        update: DecisionUpdate<'_>,
    ) -> Result<Submission, sqlx::Error> {
        query_as::<Postgres, Submission>(RECORD_DECISION_SQL)
            .bind(tenant.as_str())
            .bind(submission.into_uuid())
            .bind(update.status.as_str())
            .bind(update.reviewer)
            .bind(update.reason)
            .bind(SqlxTimestamp::from(update.decided_at))
            .bind(update.sync_job.map(SyncJobUuid::into_uuid))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_for_subject(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        subject: SubjectId,
        limit: i64,
    ) -> Result<Vec<Submission>, sqlx::Error> {
        query_as::<Postgres, Submission>(LIST_FOR_SUBJECT_SQL)
            .bind(tenant.as_str())
            .bind(subject_param(subject)?)
            .bind(limit)
            .fetch_all(&mut **tx)
            .await
    }
}

fn subject_param(subject: SubjectId) -> Result<i64, sqlx::Error> {
    subject
        .to_i64()
        .map_err(|source| decode_error("subject_id", source))
}

impl<'r> FromRow<'r, PgRow> for Submission {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let status: String = row.try_get("status")?;
        let Json(answers) = row.try_get::<Json<BTreeMap<String, String>>, _>("answers")?;

        Ok(Self {
            uuid: SubmissionUuid::from_uuid(row.try_get("uuid")?),
            tenant_id: TenantId::new(row.try_get::<String, _>("tenant_id")?),
            template_uuid: TemplateUuid::from_uuid(row.try_get("template_uuid")?),
            resource_id: ResourceId::from_i64(row.try_get("resource_id")?)
                .map_err(|source| decode_error("resource_id", source))?,
            subject_id: SubjectId::from_i64(row.try_get("subject_id")?)
                .map_err(|source| decode_error("subject_id", source))?,
            subject_name: row.try_get("subject_name")?,
            answers,
            status: status
                .parse()
                .map_err(|message: String| sqlx::Error::ColumnDecode {
                    index: "status".to_string(),
                    source: message.into(),
                })?,
            reviewer: row.try_get("reviewer")?,
            reason: row.try_get("reason")?,
            decided_at: row
                .try_get::<Option<SqlxTimestamp>, _>("decided_at")?
                .map(SqlxTimestamp::to_jiff),
            sync_job_uuid: row
                .try_get::<Option<uuid::Uuid>, _>("sync_job_uuid")?
                .map(SyncJobUuid::from_uuid),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
