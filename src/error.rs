use std::collections::BTreeMap;

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Per-field validation messages, keyed by request attribute.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("request data failed validation")]
    Validation(FieldErrors),

    #[error("user not found")]
    NotFound,

    #[error("current password invalid")]
    InvalidCurrentPassword,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl UserError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Self::Validation(errors)
    }

    /// Attaches the operation-specific message used for 500 responses.
    pub fn during(self, failure: &'static str) -> ApiError {
        ApiError {
            failure,
            kind: self,
        }
    }
}

/// HTTP-facing error. `failure` is the message returned when the
/// underlying problem is an unexpected fault.
#[derive(Debug)]
pub struct ApiError {
    failure: &'static str,
    kind: UserError,
}

impl From<UserError> for ApiError {
    fn from(kind: UserError) -> Self {
        kind.during("An unexpected error occurred")
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        UserError::invalid("query", rejection.body_text()).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.kind {
            UserError::Validation(errors) => {
                warn!(?errors, "validation failed");
                let status = StatusCode::BAD_REQUEST;
                let body = json!({
                    "message": "Error processing request data.",
                    "errors": errors,
                    "status": status.as_u16(),
                });
                (status, Json(body)).into_response()
            }
            UserError::NotFound => {
                warn!("user not found");
                let status = StatusCode::NOT_FOUND;
                let body = json!({ "message": "User not found", "status": status.as_u16() });
                (status, Json(body)).into_response()
            }
            UserError::InvalidCurrentPassword => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Current password invalid" })),
            )
                .into_response(),
            UserError::Store(err) => {
                error!(error = ?err, failure = self.failure, "request failed");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = json!({
                    "message": self.failure,
                    "error": format!("{err:#}"),
                    "status": status.as_u16(),
                });
                (status, Json(body)).into_response()
            }
        }
    }
}
