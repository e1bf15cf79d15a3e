//! Errors

use ranksync_app::domain::templates::TemplatesServiceError;

use crate::envelope::ApiError;

pub(crate) fn into_api_error(error: TemplatesServiceError) -> ApiError {
    match error {
        TemplatesServiceError::NotFound => ApiError::not_found("template"),
        TemplatesServiceError::AlreadyExists
        | TemplatesServiceError::InvalidData
        | TemplatesServiceError::InvalidCooldown(_)
        | TemplatesServiceError::Sql(_) => ApiError::internal("failed to load templates", &error),
    }
}
