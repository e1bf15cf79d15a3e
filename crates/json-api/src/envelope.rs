//! Response Envelope
//!
//! Every response carries `success` and a stable `code`. Successful payloads
//! are flattened next to them; failures add a human-readable `error` and any
//! extra fields the caller needs to react (reset time, remaining cooldown,
//! itemized validation errors).

use jiff::Timestamp;
use ranksync_app::ingress::GatewayRejection;
use salvo::{
    oapi::{self, Components, EndpointOutRegister, Operation, ToSchema},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::error;

/// Success marker flattened into every successful response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub(crate) struct Success {
    /// Always `true`
    pub success: bool,

    /// Always `OK`
    pub code: String,
}

impl Success {
    pub(crate) fn ok() -> Self {
        Self {
            success: true,
            code: "OK".to_owned(),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ErrorBody {
    /// Always `false`
    pub success: bool,

    /// Stable machine-readable code
    pub code: String,

    /// Human-readable explanation
    pub error: String,
}

/// A failed request, rendered as the error envelope.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub extra: Map<String, Value>,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            extra: Map::new(),
        }
    }

    /// Attach an extra field to the error body.
    #[must_use]
    pub(crate) fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_owned(), value.into());
        self
    }

    pub(crate) fn missing_param(name: &'static str) -> Self {
        GatewayRejection::MissingParams(name).into()
    }

    pub(crate) fn rate_limited(reset_at: Timestamp) -> Self {
        GatewayRejection::RateLimited { reset_at }.into()
    }

    pub(crate) fn validation(errors: Vec<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "request failed validation",
        )
        .with("errors", errors)
    }

    pub(crate) fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{what} not found"))
    }

    pub(crate) fn directory_unavailable() -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            "DIRECTORY_UNAVAILABLE",
            "the directory service could not be reached",
        )
    }

    /// Log `source` with `context` and hide both from the caller.
    pub(crate) fn internal(context: &str, source: &dyn std::fmt::Display) -> Self {
        error!("{context}: {source}");

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "internal server error",
        )
    }

    fn body(self) -> Value {
        let mut body = Map::new();

        body.insert("success".to_owned(), Value::Bool(false));
        body.insert("code".to_owned(), Value::from(self.code));
        body.insert("error".to_owned(), Value::from(self.message));
        body.extend(self.extra);

        Value::Object(body)
    }
}

impl From<GatewayRejection> for ApiError {
    fn from(rejection: GatewayRejection) -> Self {
        let status = match rejection {
            GatewayRejection::NoCredential
            | GatewayRejection::InvalidCredential
            | GatewayRejection::StaleOrFutureTimestamp
            | GatewayRejection::BadSignature => StatusCode::UNAUTHORIZED,
            GatewayRejection::NotVerified | GatewayRejection::ResourceNotAuthorized(_) => {
                StatusCode::FORBIDDEN
            }
            GatewayRejection::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayRejection::MissingParams(_) => StatusCode::BAD_REQUEST,
        };

        let error = Self::new(status, rejection.code(), rejection.message());

        match rejection {
            GatewayRejection::RateLimited { reset_at } => {
                error.with("reset_at", reset_at.to_string())
            }
            _ => error,
        }
    }
}

impl Scribe for ApiError {
    fn render(self, res: &mut Response) {
        res.status_code(self.status);
        res.render(Json(self.body()));
    }
}

impl EndpointOutRegister for ApiError {
    fn register(components: &mut Components, operation: &mut Operation) {
        for (status, description) in [
            ("400", "Missing parameters or invalid payload"),
            ("401", "Missing, invalid or unsigned credential"),
            ("403", "Tenant not verified or resource not authorized"),
            ("404", "Not found"),
            ("429", "Rate limit or cooldown active"),
            ("500", "Internal server error"),
        ] {
            operation.responses.insert(
                status,
                oapi::Response::new(description).add_content(
                    "application/json",
                    oapi::Content::new(ErrorBody::to_schema(components)),
                ),
            );
        }
    }
}
