//! Create Submission Handler

use std::{collections::BTreeMap, sync::Arc};

use jiff::Timestamp;
use ranksync_app::{
    domain::{
        identifiers::SubjectId,
        submissions::{
            data::NewSubmission,
            records::{Submission, SubmissionUuid},
        },
        templates::records::TemplateUuid,
    },
    ingress::RateDecision,
};
use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    envelope::{ApiError, Success},
    extensions::*,
    state::State,
    submissions::errors::{into_api_error, template_disabled},
};

/// Create Submission Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct SubmitRequest {
    /// Unix seconds when the request was sent
    pub timestamp: i64,

    /// Resource the submission comes from
    pub resource_id: u64,

    pub template_id: Uuid,
    pub subject_id: u64,
    pub subject_name: String,

    /// Answers keyed by question text
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
}

/// Recorded Submission
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct SubmissionResponse {
    pub id: Uuid,
    pub template_id: Uuid,
    pub subject_id: u64,

    /// Always `pending` for a new submission
    pub status: String,

    pub created_at: String,
}

impl From<Submission> for SubmissionResponse {
    fn from(submission: Submission) -> Self {
        Self {
            id: submission.uuid.into_uuid(),
            template_id: submission.template_uuid.into_uuid(),
            subject_id: submission.subject_id.0,
            status: submission.status.to_string(),
            created_at: submission.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct SubmissionCreatedResponse {
    #[serde(flatten)]
    pub status: Success,

    pub submission: SubmissionResponse,
}

/// Create Submission Handler
///
/// Records a submission for review. Submissions are rate limited per tenant,
/// resource and subject before any template checks run.
#[endpoint(
    tags("submissions"),
    summary = "Create Submission",
    security(("bearer_auth" = [])),
    responses(
        (status_code = 201, description = "Submission recorded"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<SubmitRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<SubmissionCreatedResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let context = depot.authorized_or_401()?;
    let request = json.into_inner();
    let now = Timestamp::now();

    let resource = context
        .resource
        .ok_or_else(|| ApiError::missing_param("resource_id"))?;

    let subject = SubjectId(request.subject_id);
    let key = format!("{}:{resource}:{subject}", context.tenant_id());

    if let RateDecision::Limited { reset_at } = state
        .submit_limiter
        .check(&key, state.policy.submit_limit, now)
        .or_500("failed to evaluate submission rate limit")?
    {
        return Err(ApiError::rate_limited(reset_at));
    }

    let template = TemplateUuid::from_uuid(request.template_id);

    if !context.link.template_enabled(template) {
        return Err(template_disabled());
    }

    let submission = state
        .app
        .submissions
        .submit(
            context.tenant_id(),
            NewSubmission {
                uuid: SubmissionUuid::new(),
                template_uuid: template,
                resource_id: resource,
                subject_id: subject,
                subject_name: request.subject_name,
                answers: request.answers,
            },
            now,
        )
        .await
        .map_err(into_api_error)?;

    info!(
        tenant = %context.tenant_id(),
        submission = %submission.uuid,
        subject = %subject,
        "submission recorded"
    );

    res.status_code(StatusCode::CREATED);

    Ok(Json(SubmissionCreatedResponse {
        status: Success::ok(),
        submission: submission.into(),
    }))
}

#[cfg(test)]
mod tests {
    use ranksync_app::domain::{
        identifiers::ResourceId,
        submissions::{SubmissionsServiceError, records::SubmissionStatus},
    };
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::{Value, json};
    use testresult::TestResult;

    use crate::test_helpers::{Mocks, authorized, link, service, tenant};

    use super::*;

    fn body(template: TemplateUuid, subject: u64) -> Value {
        json!({
            "timestamp": Timestamp::now().as_second(),
            "resource_id": 1,
            "template_id": template.into_uuid(),
            "subject_id": subject,
            "subject_name": "Ada",
            "answers": { "Why?": "Ready", "How long?": "Two years" },
        })
    }

    fn recorded(template: TemplateUuid, subject: u64) -> Submission {
        Submission {
            uuid: SubmissionUuid::new(),
            tenant_id: tenant(),
            template_uuid: template,
            resource_id: ResourceId(1),
            subject_id: SubjectId(subject),
            subject_name: "Ada".to_owned(),
            answers: BTreeMap::new(),
            status: SubmissionStatus::Pending,
            reviewer: None,
            reason: None,
            decided_at: None,
            sync_job_uuid: None,
            created_at: Timestamp::UNIX_EPOCH,
        }
    }

    fn make_service(mocks: Mocks, template: TemplateUuid) -> Service {
        let mut link = link();
        link.enabled_templates = vec![template];

        service(
            mocks,
            authorized(link, Some(1)),
            Router::with_path("submit").post(handler),
        )
    }

    #[tokio::test]
    async fn records_a_submission_and_returns_201() -> TestResult {
        let template = TemplateUuid::new();
        let submission = recorded(template, 9);

        let mut mocks = Mocks::default();
        mocks
            .submissions
            .expect_submit()
            .once()
            .withf(move |tenant_id, new, _| {
                *tenant_id == tenant()
                    && new.template_uuid == template
                    && new.subject_id == SubjectId(9)
                    && new.resource_id == ResourceId(1)
                    && new.answers.len() == 2
            })
            .return_once(move |_, _, _| Ok(submission));

        let mut res = TestClient::post("http://example.com/submit")
            .json(&body(template, 9))
            .send(&make_service(mocks, template))
            .await;

        let response: SubmissionCreatedResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::CREATED));
        assert_eq!(response.submission.status, "pending");
        assert_eq!(response.submission.subject_id, 9);

        Ok(())
    }

    #[tokio::test]
    async fn templates_not_enabled_for_the_tenant_are_refused() -> TestResult {
        let mut mocks = Mocks::default();
        mocks.submissions.expect_submit().never();

        let mut res = TestClient::post("http://example.com/submit")
            .json(&body(TemplateUuid::new(), 9))
            .send(&make_service(mocks, TemplateUuid::new()))
            .await;

        let body: Value = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));
        assert_eq!(body.get("code"), Some(&json!("TEMPLATE_DISABLED")));

        Ok(())
    }

    #[tokio::test]
    async fn active_cooldown_reports_remaining_minutes() -> TestResult {
        let template = TemplateUuid::new();

        let mut mocks = Mocks::default();
        mocks
            .submissions
            .expect_submit()
            .once()
            .return_once(|_, _, _| {
                Err(SubmissionsServiceError::CooldownActive {
                    remaining_minutes: 42,
                })
            });

        let mut res = TestClient::post("http://example.com/submit")
            .json(&body(template, 9))
            .send(&make_service(mocks, template))
            .await;

        let body: Value = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::TOO_MANY_REQUESTS));
        assert_eq!(body.get("code"), Some(&json!("COOLDOWN_ACTIVE")));
        assert_eq!(body.get("remaining_minutes"), Some(&json!(42)));

        Ok(())
    }

    #[tokio::test]
    async fn validation_errors_are_itemized() -> TestResult {
        let template = TemplateUuid::new();

        let mut mocks = Mocks::default();
        mocks
            .submissions
            .expect_submit()
            .once()
            .return_once(|_, _, _| {
                Err(SubmissionsServiceError::Validation(vec![
                    "answer to `Why?` is required".to_owned(),
                ]))
            });

        let mut res = TestClient::post("http://example.com/submit")
            .json(&body(template, 9))
            .send(&make_service(mocks, template))
            .await;

        let body: Value = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
        assert_eq!(body.get("errors"), Some(&json!(["answer to `Why?` is required"])));

        Ok(())
    }

    #[tokio::test]
    async fn fourth_submission_in_the_window_is_rate_limited() -> TestResult {
        let template = TemplateUuid::new();

        let mut mocks = Mocks::default();
        mocks
            .submissions
            .expect_submit()
            .times(3)
            .returning(move |_, _, _| Ok(recorded(template, 9)));

        let service = make_service(mocks, template);

        for _ in 0..3 {
            let res = TestClient::post("http://example.com/submit")
                .json(&body(template, 9))
                .send(&service)
                .await;

            assert_eq!(res.status_code, Some(StatusCode::CREATED));
        }

        let mut res = TestClient::post("http://example.com/submit")
            .json(&body(template, 9))
            .send(&service)
            .await;

        let limited: Value = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::TOO_MANY_REQUESTS));
        assert_eq!(limited.get("code"), Some(&json!("RATE_LIMITED")));

        Ok(())
    }
}
