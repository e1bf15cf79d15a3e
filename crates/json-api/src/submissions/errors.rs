//! Errors

use ranksync_app::domain::submissions::SubmissionsServiceError;
use salvo::http::StatusCode;

use crate::envelope::ApiError;

pub(crate) fn into_api_error(error: SubmissionsServiceError) -> ApiError {
    match error {
        SubmissionsServiceError::NotFound | SubmissionsServiceError::TemplateNotFound => {
            ApiError::not_found("template")
        }
        SubmissionsServiceError::LinkNotFound => ApiError::not_found("link"),
        SubmissionsServiceError::TemplateDisabled => template_disabled(),
        SubmissionsServiceError::Validation(errors) => ApiError::validation(errors),
        SubmissionsServiceError::InvalidData => {
            ApiError::validation(vec!["submission data is invalid".to_owned()])
        }
        SubmissionsServiceError::CooldownActive { remaining_minutes } => ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "COOLDOWN_ACTIVE",
            format!("please wait {remaining_minutes} more minute(s) before submitting again"),
        )
        .with("remaining_minutes", remaining_minutes),
        SubmissionsServiceError::AlreadyDecided
        | SubmissionsServiceError::AlreadyExists
        | SubmissionsServiceError::Queue(_)
        | SubmissionsServiceError::Sql(_) => {
            ApiError::internal("failed to record submission", &error)
        }
    }
}

pub(crate) fn template_disabled() -> ApiError {
    ApiError::new(
        StatusCode::FORBIDDEN,
        "TEMPLATE_DISABLED",
        "template is not accepting submissions",
    )
}
