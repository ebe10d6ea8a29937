//! API error handling
//!
//! Client mistakes are reported verbatim with status 400. Upstream
//! failures (embedding, vector index, LLM, speech, mail) are logged with
//! their cause and answered with a generic 500 message.
//!
//! Author: hephaex@gmail.com

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use folio_core::FolioError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Always false
    pub success: bool,
    /// Human-readable message
    #[schema(example = "Query text is required")]
    pub error: String,
    /// Error code
    #[schema(example = "BAD_REQUEST")]
    pub code: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: code.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Invalid request; the message is shown to the client
    BadRequest(String),
    /// Failure with a client-facing message; the cause is only logged
    Failed { message: String, cause: String },
    /// Any other failure
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
            AppError::Failed { message, cause } => {
                tracing::error!("{}: {}", message, cause);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("INTERNAL_ERROR", message),
                )
            }
            AppError::Internal(cause) => {
                tracing::error!("Request failed: {}", cause);
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal_error())
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<FolioError> for AppError {
    fn from(err: FolioError) -> Self {
        match err {
            FolioError::Validation(msg) => AppError::BadRequest(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err: AppError = FolioError::Validation("Query text is required".to_string()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_errors_are_internal() {
        for err in [
            FolioError::Llm("quota exceeded for key abc".to_string()),
            FolioError::DimensionMismatch {
                expected: 384,
                actual: 768,
            },
            FolioError::VectorStore("timeout".to_string()),
        ] {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_error_body_shape() {
        let json = serde_json::to_value(ApiError::bad_request("Please fill in all required fields."))
            .unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Please fill in all required fields.");
        assert_eq!(json["code"], "BAD_REQUEST");
    }
}
