//! Get Template Handler

use std::sync::Arc;

use ranksync_app::domain::templates::records::TemplateUuid;
use salvo::{
    oapi::{ToSchema, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    envelope::{ApiError, Success},
    extensions::*,
    state::State,
    templates::{errors::into_api_error, models::TemplateResponse},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct TemplateEnvelope {
    #[serde(flatten)]
    pub status: Success,

    pub template: TemplateResponse,
}

/// Get Template Handler
///
/// Returns a template, provided it is active and enabled for the tenant.
#[endpoint(
    tags("templates"),
    summary = "Get Template",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(
    id: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<TemplateEnvelope>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let link = &depot.authorized_or_401()?.link;
    let id = TemplateUuid::from_uuid(id.into_inner());

    if !link.template_enabled(id) {
        return Err(ApiError::not_found("template"));
    }

    let template = state
        .app
        .templates
        .get_template(&link.tenant_id, id)
        .await
        .map_err(into_api_error)?;

    if !template.active {
        return Err(ApiError::not_found("template"));
    }

    Ok(Json(TemplateEnvelope {
        status: Success::ok(),
        template: template.into(),
    }))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use crate::{
        templates::models::fixtures::template,
        test_helpers::{Mocks, authorized, link, service},
    };

    use super::*;

    fn route() -> Router {
        Router::with_path("templates/{id}").get(handler)
    }

    #[tokio::test]
    async fn returns_an_enabled_template() -> TestResult {
        let promotion = template("Promotion", Some(20));
        let id = promotion.uuid;
        let mut link = link();
        link.enabled_templates = vec![id];

        let mut mocks = Mocks::default();
        mocks
            .templates
            .expect_get_template()
            .once()
            .withf(move |_, template| *template == id)
            .return_once(move |_, _| Ok(promotion));

        let response: TemplateEnvelope = TestClient::get(format!("http://example.com/templates/{id}"))
            .send(&service(mocks, authorized(link, Some(1)), route()))
            .await
            .take_json()
            .await?;

        assert_eq!(response.template.id, id.into_uuid());
        assert_eq!(response.template.approval_rank, Some(20));

        Ok(())
    }

    #[tokio::test]
    async fn templates_not_enabled_are_not_found() -> TestResult {
        let mut mocks = Mocks::default();
        mocks.templates.expect_get_template().never();

        let res = TestClient::get(format!("http://example.com/templates/{}", Uuid::now_v7()))
            .send(&service(mocks, authorized(link(), Some(1)), route()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }

    #[tokio::test]
    async fn inactive_templates_are_not_found() -> TestResult {
        let mut retired = template("Retired", None);
        retired.active = false;
        let id = retired.uuid;
        let mut link = link();
        link.enabled_templates = vec![id];

        let mut mocks = Mocks::default();
        mocks
            .templates
            .expect_get_template()
            .once()
            .return_once(move |_, _| Ok(retired));

        let res = TestClient::get(format!("http://example.com/templates/{id}"))
            .send(&service(mocks, authorized(link, Some(1)), route()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }
}
