//! Gateway middleware.
//!
//! Authorizes every integration request, then counts it against the tenant's
//! per-resource rate limit. Authorized requests carry an
//! [`AuthorizedContext`] in the depot.

use std::sync::Arc;

use jiff::Timestamp;
use ranksync_app::{
    domain::identifiers::ResourceId,
    ingress::{AuthorizedContext, GatewayError, InboundRequest, RateDecision},
};
use salvo::{
    http::{Method, header::AUTHORIZATION},
    prelude::*,
};
use serde::Deserialize;
use tracing::warn;

use crate::{envelope::ApiError, extensions::*, observability::observe_rejection, state::State};

/// Header carrying the hex HMAC of the request.
pub(crate) const SIGNATURE_HEADER: &str = "x-request-signature";

/// Fields the gateway reads from a JSON body.
#[derive(Debug, Default, Deserialize)]
struct SignedFields {
    #[serde(default)]
    timestamp: Option<i64>,

    #[serde(default)]
    resource_id: Option<u64>,
}

#[salvo::handler]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let outcome = match depot.obtain_or_500::<Arc<State>>() {
        Ok(state) => authorize(req, state, Timestamp::now()).await,
        Err(error) => Err(error),
    };

    match outcome {
        Ok(context) => {
            depot.inject(context);
            ctrl.call_next(req, depot, res).await;
        }
        Err(error) => {
            res.render(error);
            ctrl.skip_rest();
        }
    }
}

async fn authorize(
    req: &mut Request,
    state: &State,
    now: Timestamp,
) -> Result<AuthorizedContext, ApiError> {
    let method = req.method().as_str().to_owned();
    let path = req.uri().path().to_owned();
    let token = bearer_token(req).map(str::to_owned);
    let signature = req.header::<String>(SIGNATURE_HEADER);

    let require_signature = state.policy.require_signed_mutations
        && req.method() != Method::GET
        && path.starts_with("/sync/");

    let query_timestamp = req.query::<i64>("timestamp");
    let query_resource = req.query::<u64>("resource_id");

    let body = req
        .payload()
        .await
        .cloned()
        .map_err(|_unreadable| ApiError::validation(vec!["request body could not be read".to_owned()]))?;

    let fields = if body.is_empty() {
        SignedFields::default()
    } else {
        serde_json::from_slice(&body).unwrap_or_default()
    };

    let inbound = InboundRequest {
        method: &method,
        path: &path,
        body: &body,
        token: token.as_deref(),
        signature: signature.as_deref(),
        timestamp: fields.timestamp.or(query_timestamp),
        resource: fields.resource_id.or(query_resource).map(ResourceId),
        require_signature,
    };

    let context = match state.app.gateway.authorize(&inbound, now).await {
        Ok(context) => context,
        Err(GatewayError::Rejected(rejection)) => {
            observe_rejection(rejection.code());

            return Err(rejection.into());
        }
        Err(GatewayError::Store(source)) => {
            return Err(ApiError::internal("failed to look up credential", &source));
        }
    };

    match state
        .limiter
        .check(&context.bucket_key(), context.rate_limit(), now)
        .or_500("failed to evaluate rate limit")?
    {
        RateDecision::Allowed { .. } => Ok(context),
        RateDecision::Limited { reset_at } => {
            observe_rejection("RATE_LIMITED");

            warn!(
                tenant = %context.tenant_id(),
                bucket = %context.bucket_key(),
                reset_at = %reset_at,
                "request rate limited"
            );

            Err(ApiError::rate_limited(reset_at))
        }
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }

    Some(token)
}

#[cfg(test)]
mod tests {
    use ranksync_app::{
        credentials::CredentialStoreError,
        domain::links::records::{LinkTunables, VerificationStatus},
        ingress::sign_request,
    };
    use salvo::{
        affix_state::inject,
        test::{ResponseExt, TestClient},
    };
    use serde_json::{Value, json};
    use testresult::TestResult;

    use crate::{
        state::RequestPolicy,
        test_helpers::{Mocks, TOKEN, link},
    };

    use super::*;

    #[salvo::handler]
    async fn echo_context(depot: &mut Depot, res: &mut Response) {
        let rendered = depot.authorized_or_401().map_or_else(
            |_missing| "missing".to_owned(),
            |context| format!("{}:{:?}", context.tenant_id(), context.resource),
        );

        res.render(rendered);
    }

    fn credentials_returning(
        link: Option<ranksync_app::domain::links::records::LinkRecord>,
    ) -> Mocks {
        let mut mocks = Mocks::default();

        mocks
            .credentials
            .expect_validate()
            .withf(|token| token == TOKEN)
            .returning(move |_token| Ok(link.clone()));
        mocks
            .credentials
            .expect_touch_last_used()
            .returning(|_, _| Ok(()));

        mocks
    }

    fn make_service(mocks: Mocks) -> Service {
        let router = Router::new()
            .hoop(inject(mocks.into_state(RequestPolicy::default())))
            .hoop(handler)
            .push(Router::with_path("validate").post(echo_context))
            .push(Router::with_path("sync/queue").get(echo_context))
            .push(Router::with_path("sync/manual").post(echo_context));

        Service::new(router)
    }

    async fn error_code(res: &mut salvo::Response) -> TestResult<String> {
        let body: Value = res.take_json().await?;

        Ok(body
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned())
    }

    #[tokio::test]
    async fn missing_authorization_header_returns_401() -> TestResult {
        let mut mocks = Mocks::default();
        mocks.credentials.expect_validate().never();

        let mut res = TestClient::post("http://example.com/validate")
            .json(&json!({ "timestamp": Timestamp::now().as_second(), "resource_id": 1 }))
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));
        assert_eq!(error_code(&mut res).await?, "NO_CREDENTIAL");

        Ok(())
    }

    #[tokio::test]
    async fn non_bearer_authorization_header_returns_401() -> TestResult {
        let mut mocks = Mocks::default();
        mocks.credentials.expect_validate().never();

        let res = TestClient::post("http://example.com/validate")
            .add_header(AUTHORIZATION, format!("Basic {TOKEN}"), true)
            .json(&json!({ "timestamp": Timestamp::now().as_second() }))
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        Ok(())
    }

    #[tokio::test]
    async fn authorized_requests_reach_the_handler_with_context() -> TestResult {
        let mut res = TestClient::post("http://example.com/validate")
            .add_header(AUTHORIZATION, format!("Bearer {TOKEN}"), true)
            .json(&json!({ "timestamp": Timestamp::now().as_second(), "resource_id": 2 }))
            .send(&make_service(credentials_returning(Some(link()))))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(res.take_string().await?, "guild-1:Some(ResourceId(2))");

        Ok(())
    }

    #[tokio::test]
    async fn query_parameters_are_accepted_on_reads() -> TestResult {
        let now = Timestamp::now().as_second();

        let mut res = TestClient::get(format!(
            "http://example.com/sync/queue?timestamp={now}&resource_id=1"
        ))
        .add_header(AUTHORIZATION, format!("Bearer {TOKEN}"), true)
        .send(&make_service(credentials_returning(Some(link()))))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(res.take_string().await?, "guild-1:Some(ResourceId(1))");

        Ok(())
    }

    #[tokio::test]
    async fn unknown_credentials_and_unverified_links_are_rejected() -> TestResult {
        let now = Timestamp::now().as_second();

        let mut unknown = TestClient::post("http://example.com/validate")
            .add_header(AUTHORIZATION, format!("Bearer {TOKEN}"), true)
            .json(&json!({ "timestamp": now }))
            .send(&make_service(credentials_returning(None)))
            .await;

        assert_eq!(unknown.status_code, Some(StatusCode::UNAUTHORIZED));
        assert_eq!(error_code(&mut unknown).await?, "INVALID_CREDENTIAL");

        let mut pending = link();
        pending.verification_status = VerificationStatus::Pending;

        let mut unverified = TestClient::post("http://example.com/validate")
            .add_header(AUTHORIZATION, format!("Bearer {TOKEN}"), true)
            .json(&json!({ "timestamp": now }))
            .send(&make_service(credentials_returning(Some(pending))))
            .await;

        assert_eq!(unverified.status_code, Some(StatusCode::FORBIDDEN));
        assert_eq!(error_code(&mut unverified).await?, "NOT_VERIFIED");

        Ok(())
    }

    #[tokio::test]
    async fn missing_timestamp_and_foreign_resource_are_rejected() -> TestResult {
        let mut missing = TestClient::post("http://example.com/validate")
            .add_header(AUTHORIZATION, format!("Bearer {TOKEN}"), true)
            .json(&json!({ "resource_id": 1 }))
            .send(&make_service(credentials_returning(Some(link()))))
            .await;

        assert_eq!(missing.status_code, Some(StatusCode::BAD_REQUEST));
        assert_eq!(error_code(&mut missing).await?, "MISSING_PARAMS");

        let mut foreign = TestClient::post("http://example.com/validate")
            .add_header(AUTHORIZATION, format!("Bearer {TOKEN}"), true)
            .json(&json!({ "timestamp": Timestamp::now().as_second(), "resource_id": 3 }))
            .send(&make_service(credentials_returning(Some(link()))))
            .await;

        assert_eq!(foreign.status_code, Some(StatusCode::FORBIDDEN));
        assert_eq!(error_code(&mut foreign).await?, "RESOURCE_NOT_AUTHORIZED");

        Ok(())
    }

    #[tokio::test]
    async fn mutating_sync_requests_must_be_signed() -> TestResult {
        let now = Timestamp::now().as_second();
        let body = serde_json::to_vec(&json!({ "timestamp": now, "subject_id": 9 }))?;
        let signature = sign_request(TOKEN, "POST", "/sync/manual", &body, now)?;

        let mut unsigned = TestClient::post("http://example.com/sync/manual")
            .add_header(AUTHORIZATION, format!("Bearer {TOKEN}"), true)
            .raw_json(String::from_utf8(body.clone())?)
            .send(&make_service(credentials_returning(Some(link()))))
            .await;

        assert_eq!(unsigned.status_code, Some(StatusCode::UNAUTHORIZED));
        assert_eq!(error_code(&mut unsigned).await?, "BAD_SIGNATURE");

        let signed = TestClient::post("http://example.com/sync/manual")
            .add_header(AUTHORIZATION, format!("Bearer {TOKEN}"), true)
            .add_header(SIGNATURE_HEADER, signature, true)
            .raw_json(String::from_utf8(body)?)
            .send(&make_service(credentials_returning(Some(link()))))
            .await;

        assert_eq!(signed.status_code, Some(StatusCode::OK));

        Ok(())
    }

    #[tokio::test]
    async fn requests_over_the_tenant_limit_are_rate_limited() -> TestResult {
        let mut limited = link();
        limited.tunables = LinkTunables {
            rate_limit_max_requests: 2,
            ..LinkTunables::default()
        };

        let service = make_service(credentials_returning(Some(limited)));
        let now = Timestamp::now().as_second();

        for _ in 0..2 {
            let res = TestClient::post("http://example.com/validate")
                .add_header(AUTHORIZATION, format!("Bearer {TOKEN}"), true)
                .json(&json!({ "timestamp": now, "resource_id": 1 }))
                .send(&service)
                .await;

            assert_eq!(res.status_code, Some(StatusCode::OK));
        }

        let mut res = TestClient::post("http://example.com/validate")
            .add_header(AUTHORIZATION, format!("Bearer {TOKEN}"), true)
            .json(&json!({ "timestamp": now, "resource_id": 1 }))
            .send(&service)
            .await;

        let body: Value = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::TOO_MANY_REQUESTS));
        assert_eq!(body.get("code"), Some(&json!("RATE_LIMITED")));
        assert!(body.get("reset_at").is_some(), "limited responses carry the reset time");

        Ok(())
    }

    #[tokio::test]
    async fn credential_store_failures_return_500() -> TestResult {
        let mut mocks = Mocks::default();
        mocks
            .credentials
            .expect_validate()
            .once()
            .returning(|_token| Err(CredentialStoreError::LinkNotFound));

        let mut res = TestClient::post("http://example.com/validate")
            .add_header(AUTHORIZATION, format!("Bearer {TOKEN}"), true)
            .json(&json!({ "timestamp": Timestamp::now().as_second() }))
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(error_code(&mut res).await?, "INTERNAL_ERROR");

        Ok(())
    }
}
