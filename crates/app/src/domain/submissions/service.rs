//! Submissions service.

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use mockall::automock;
use tracing::info;

use crate::{
    database::Db,
    domain::{
        identifiers::{SubjectId, TenantId},
        links::repository::PgLinksRepository,
        submissions::{
            data::{Decision, DecisionOutcome, NewSubmission, SyncRequest},
            errors::SubmissionsServiceError,
            records::{Submission, SubmissionStatus, SubmissionUuid},
            repository::{DecisionUpdate, PgSubmissionsRepository},
        },
        sync::{
            SyncQueueError, backoff::RetryPolicy, data::NewSyncJob, records::JobOrigin,
            repository::PgSyncJobsRepository, service::enqueue_in,
        },
        templates::{records::DecisionTemplate, repository::PgTemplatesRepository},
    },
};

/// Priority of jobs requested by an approved submission.
const SUBMISSION_PRIORITY: i32 = 0;

#[derive(Debug, Clone)]
pub struct PgSubmissionsService {
    db: Db,
    repository: PgSubmissionsRepository,
    links: PgLinksRepository,
    templates: PgTemplatesRepository,
    jobs: PgSyncJobsRepository,
    policy: RetryPolicy,
}

impl PgSubmissionsService {
    #[must_use]
    pub fn new(db: Db, policy: RetryPolicy) -> Self {
        Self {
            db,
            repository: PgSubmissionsRepository::new(),
            links: PgLinksRepository::new(),
            templates: PgTemplatesRepository::new(),
            jobs: PgSyncJobsRepository::new(),
            policy,
        }
    }
}

#[async_trait]
impl SubmissionsService for PgSubmissionsService {
    async fn submit(
        &self,
        tenant: &TenantId,
        submission: NewSubmission,
        now: Timestamp,
    ) -> Result<Submission, SubmissionsServiceError> {
        let mut tx = self.db.begin().await?;

        let link = self
            .links
            .lock_link(&mut tx, tenant)
            .await?
            .ok_or(SubmissionsServiceError::LinkNotFound)?;

        let template = self
            .templates
            .find_template(&mut tx, tenant, submission.template_uuid)
            .await?
            .ok_or(SubmissionsServiceError::TemplateNotFound)?;

        if !template.active || !link.template_enabled(template.uuid) {
            return Err(SubmissionsServiceError::TemplateDisabled);
        }

        let problems = missing_answers(&template, &submission);

        if !problems.is_empty() {
            return Err(SubmissionsServiceError::Validation(problems));
        }

        self.repository
            .lock_subject_template(&mut tx, tenant, template.uuid, submission.subject_id)
            .await?;

        let cooldown = SignedDuration::from_mins(i64::from(template.cooldown_minutes));

        if let Some(pending) = self
            .repository
            .pending_for_subject(&mut tx, tenant, template.uuid, submission.subject_id)
            .await?
        {
            return Err(SubmissionsServiceError::CooldownActive {
                remaining_minutes: remaining_minutes(pending.created_at, cooldown, now).max(1),
            });
        }

        if let Some(latest) = self
            .repository
            .latest_for_subject(&mut tx, tenant, template.uuid, submission.subject_id)
            .await?
        {
            let remaining = remaining_minutes(latest.created_at, cooldown, now);

            if remaining > 0 {
                return Err(SubmissionsServiceError::CooldownActive {
                    remaining_minutes: remaining,
                });
            }
        }

        let created = self
            .repository
            .create_submission(&mut tx, tenant, &submission, now)
            .await?;

        tx.commit().await?;

        info!(
            tenant = %tenant,
            submission = %created.uuid,
            template = %created.template_uuid,
            subject = %created.subject_id,
            "submission received"
        );

        Ok(created)
    }

    async fn decide(
        &self,
        tenant: &TenantId,
        submission: SubmissionUuid,
        decision: Decision,
        now: Timestamp,
    ) -> Result<DecisionOutcome, SubmissionsServiceError> {
        let mut tx = self.db.begin().await?;

        let current = self
            .repository
            .lock_submission(&mut tx, tenant, submission)
            .await?;

        if current.status != SubmissionStatus::Pending {
            return Err(SubmissionsServiceError::AlreadyDecided);
        }

        let link = self
            .links
            .lock_link(&mut tx, tenant)
            .await?
            .ok_or(SubmissionsServiceError::LinkNotFound)?;

        let template = self
            .templates
            .find_template(&mut tx, tenant, current.template_uuid)
            .await?
            .ok_or(SubmissionsServiceError::TemplateNotFound)?;

        let requested_rank = template.approval_rank.filter(|_rank| {
            decision.approve && link.tunables.auto_sync && link.template_enabled(template.uuid)
        });

        let sync = match requested_rank {
            None => SyncRequest::NotRequested,
            Some(rank) => {
                let job = NewSyncJob {
                    tenant_id: tenant.clone(),
                    subject_id: current.subject_id,
                    target_rank: rank,
                    priority: SUBMISSION_PRIORITY,
                    origin: JobOrigin::submission(submission.to_string()),
                };

                match enqueue_in(&self.jobs, &mut tx, &job, self.policy, now).await {
                    Ok(created) => SyncRequest::Enqueued(created),
                    Err(SyncQueueError::DuplicatePending { job }) => {
                        SyncRequest::AlreadyPending { job }
                    }
                    Err(error) => return Err(error.into()),
                }
            }
        };

        let sync_job = match &sync {
            SyncRequest::Enqueued(job) => Some(job.uuid),
            SyncRequest::AlreadyPending { .. } | SyncRequest::NotRequested => None,
        };

        let status = if decision.approve {
            SubmissionStatus::Approved
        } else {
            SubmissionStatus::Denied
        };

        let decided = self
            .repository
            .record_decision(
                &mut tx,
                tenant,
                submission,
                DecisionUpdate {
                    status,
                    reviewer: &decision.reviewer,
                    reason: decision.reason.as_deref(),
                    decided_at: now,
                    sync_job,
                },
            )
            .await?;

        tx.commit().await?;

        info!(
            tenant = %tenant,
            submission = %decided.uuid,
            status = %decided.status,
            reviewer = %decision.reviewer,
            sync_job = ?sync_job,
            "submission decided"
        );

        Ok(DecisionOutcome {
            submission: decided,
            sync,
        })
    }

    async fn get_submission(
        &self,
        tenant: &TenantId,
        submission: SubmissionUuid,
    ) -> Result<Submission, SubmissionsServiceError> {
        let mut tx = self.db.begin().await?;

        let submission = self
            .repository
            .get_submission(&mut tx, tenant, submission)
            .await?;

        tx.commit().await?;

        Ok(submission)
    }

    async fn list_for_subject(
        &self,
        tenant: &TenantId,
        subject: SubjectId,
        limit: u32,
    ) -> Result<Vec<Submission>, SubmissionsServiceError> {
        let mut tx = self.db.begin().await?;

        let submissions = self
            .repository
            .list_for_subject(&mut tx, tenant, subject, i64::from(limit))
            .await?;

        tx.commit().await?;

        Ok(submissions)
    }
}

/// One message per template question left unanswered.
fn missing_answers(template: &DecisionTemplate, submission: &NewSubmission) -> Vec<String> {
    let mut problems: Vec<String> = template
        .questions
        .iter()
        .filter(|question| {
            submission
                .answers
                .get(question.as_str())
                .is_none_or(|answer| answer.trim().is_empty())
        })
        .map(|question| format!("an answer is required for \"{question}\""))
        .collect();

    if submission.subject_name.trim().is_empty() {
        problems.push("subject name is required".to_string());
    }

    problems
}

/// Whole minutes, rounded up, until `since + cooldown` is reached.
fn remaining_minutes(since: Timestamp, cooldown: SignedDuration, now: Timestamp) -> u32 {
    let left = cooldown.saturating_sub(now.duration_since(since));

    if left <= SignedDuration::ZERO {
        return 0;
    }

    let minutes = left.as_secs().saturating_add(59) / 60;

    u32::try_from(minutes).unwrap_or(u32::MAX)
}

#[automock]
#[async_trait]
pub trait SubmissionsService: Send + Sync {
    /// Record a new submission after template, answer and cooldown checks.
    async fn submit(
        &self,
        tenant: &TenantId,
        submission: NewSubmission,
        now: Timestamp,
    ) -> Result<Submission, SubmissionsServiceError>;

    /// Approve or deny a pending submission, requesting a rank change when applicable.
    async fn decide(
        &self,
        tenant: &TenantId,
        submission: SubmissionUuid,
        decision: Decision,
        now: Timestamp,
    ) -> Result<DecisionOutcome, SubmissionsServiceError>;

    async fn get_submission(
        &self,
        tenant: &TenantId,
        submission: SubmissionUuid,
    ) -> Result<Submission, SubmissionsServiceError>;

    /// Submissions of the subject, newest first.
    async fn list_for_subject(
        &self,
        tenant: &TenantId,
        subject: SubjectId,
        limit: u32,
    ) -> Result<Vec<Submission>, SubmissionsServiceError>;
}
