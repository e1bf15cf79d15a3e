//! Template Index Handler

use std::sync::Arc;

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    envelope::{ApiError, Success},
    extensions::*,
    state::State,
    templates::{errors::into_api_error, models::TemplateResponse},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct TemplatesResponse {
    #[serde(flatten)]
    pub status: Success,

    /// Active templates enabled for the tenant
    pub templates: Vec<TemplateResponse>,
}

/// Template Index Handler
///
/// Returns the active templates enabled for the tenant.
#[endpoint(
    tags("templates"),
    summary = "List Templates",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<TemplatesResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let link = &depot.authorized_or_401()?.link;

    let templates = state
        .app
        .templates
        .list_enabled_templates(&link.tenant_id, link.enabled_templates.clone())
        .await
        .map_err(into_api_error)?;

    Ok(Json(TemplatesResponse {
        status: Success::ok(),
        templates: templates.into_iter().map(Into::into).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use ranksync_app::domain::templates::TemplatesServiceError;
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use crate::{
        templates::models::fixtures::template,
        test_helpers::{Mocks, authorized, link, service, tenant},
    };

    use super::*;

    #[tokio::test]
    async fn lists_enabled_templates() -> TestResult {
        let promotion = template("Promotion", Some(20));
        let enabled = vec![promotion.uuid];
        let mut link = link();
        link.enabled_templates.clone_from(&enabled);

        let mut mocks = Mocks::default();
        mocks
            .templates
            .expect_list_enabled_templates()
            .once()
            .withf(move |tenant_id, ids| *tenant_id == tenant() && *ids == enabled)
            .return_once(move |_, _| Ok(vec![promotion]));

        let response: TemplatesResponse = TestClient::get("http://example.com/templates")
            .send(&service(
                mocks,
                authorized(link, Some(1)),
                Router::with_path("templates").get(handler),
            ))
            .await
            .take_json()
            .await?;

        assert_eq!(response.templates.len(), 1, "expected one template");
        assert_eq!(
            response.templates.first().map(|template| template.name.as_str()),
            Some("Promotion")
        );

        Ok(())
    }

    #[tokio::test]
    async fn storage_errors_return_500() -> TestResult {
        let mut mocks = Mocks::default();
        mocks
            .templates
            .expect_list_enabled_templates()
            .once()
            .return_once(|_, _| Err(TemplatesServiceError::InvalidData));

        let res = TestClient::get("http://example.com/templates")
            .send(&service(
                mocks,
                authorized(link(), Some(1)),
                Router::with_path("templates").get(handler),
            ))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));

        Ok(())
    }
}
