//! App Router

use salvo::Router;

use crate::{gateway, submissions, sync, templates, validate};

/// Integration routes, every one behind the ingress gateway.
pub(crate) fn app_router() -> Router {
    Router::new()
        .hoop(gateway::middleware::handler)
        .push(Router::with_path("validate").post(validate::handler))
        .push(
            Router::with_path("templates")
                .get(templates::index::handler)
                .push(Router::with_path("{id}").get(templates::get::handler)),
        )
        .push(Router::with_path("submit").post(submissions::create::handler))
        .push(
            Router::with_path("sync")
                .push(Router::with_path("status/{identity}").get(sync::status::handler))
                .push(Router::with_path("queue").get(sync::queue::handler))
                .push(Router::with_path("history/{identity}").get(sync::history::handler))
                .push(Router::with_path("mappings").get(sync::mappings::handler))
                .push(Router::with_path("ranks").get(sync::ranks::handler))
                .push(Router::with_path("test").post(sync::connectivity::handler))
                .push(Router::with_path("preview").post(sync::preview::handler))
                .push(Router::with_path("manual").post(sync::manual::handler))
                .push(Router::with_path("retry-failed").post(sync::retry_failed::handler))
                .push(Router::with_path("cancel/{identity}").delete(sync::cancel::handler)),
        )
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use salvo::{
        affix_state::inject,
        http::header::AUTHORIZATION,
        prelude::*,
        test::{ResponseExt, TestClient},
    };
    use serde_json::{Value, json};
    use testresult::TestResult;

    use crate::{
        state::RequestPolicy,
        sync::models::fixtures::role,
        test_helpers::{Mocks, TOKEN, link},
    };

    use super::*;

    #[tokio::test]
    async fn gateway_guards_every_route() -> TestResult {
        let mut mocks = Mocks::default();
        mocks.credentials.expect_validate().never();

        let service = Service::new(
            Router::new()
                .hoop(inject(mocks.into_state(RequestPolicy::default())))
                .push(app_router()),
        );

        for (method, path) in [
            ("GET", "/templates"),
            ("POST", "/submit"),
            ("GET", "/sync/queue"),
            ("DELETE", "/sync/cancel/9"),
        ] {
            let request = match method {
                "GET" => TestClient::get(format!("http://example.com{path}")),
                "POST" => TestClient::post(format!("http://example.com{path}")),
                _ => TestClient::delete(format!("http://example.com{path}")),
            };

            let res = request.send(&service).await;

            assert_eq!(
                res.status_code,
                Some(StatusCode::UNAUTHORIZED),
                "{method} {path} should require a credential"
            );
        }

        Ok(())
    }

    #[tokio::test]
    async fn authorized_reads_reach_their_handler() -> TestResult {
        let mut mocks = Mocks::default();
        mocks
            .credentials
            .expect_validate()
            .returning(|_token| Ok(Some(link())));
        mocks
            .credentials
            .expect_touch_last_used()
            .returning(|_, _| Ok(()));
        mocks
            .directory
            .expect_list_roles()
            .once()
            .return_once(|_, _| Ok(vec![role(10, 1)]));

        let service = Service::new(
            Router::new()
                .hoop(inject(mocks.into_state(RequestPolicy::default())))
                .push(app_router()),
        );

        let mut res = TestClient::get(format!(
            "http://example.com/sync/ranks?timestamp={}",
            Timestamp::now().as_second()
        ))
        .add_header(AUTHORIZATION, format!("Bearer {TOKEN}"), true)
        .send(&service)
        .await;

        let body: Value = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(body.get("success"), Some(&json!(true)));
        assert_eq!(body.get("code"), Some(&json!("OK")));

        Ok(())
    }
}
