use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use studyhall_core::error::CoreError;
use uuid::Uuid;

/// HTTP-facing wrapper for pipeline errors. Client-caused failures carry
/// their message through; internal failures are logged in full and answered
/// with an opaque reference id only.
pub struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference: Option<Uuid>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            CoreError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    message: message.clone(),
                    error: Some("validation"),
                    reference: None,
                },
            ),
            CoreError::Conflict(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    message: message.clone(),
                    error: Some("conflict"),
                    reference: None,
                },
            ),
            CoreError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    message: format!("{what} not found"),
                    error: Some("not_found"),
                    reference: None,
                },
            ),
            CoreError::InvalidLibrary => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    message: self.0.to_string(),
                    error: Some("invalid_library"),
                    reference: None,
                },
            ),
            CoreError::Timezone(_) | CoreError::Database(_) | CoreError::Json(_) => {
                let reference = Uuid::new_v4();
                tracing::error!(reference = %reference, error = %self.0, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        message: "internal server error".to_string(),
                        error: None,
                        reference: Some(reference),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
