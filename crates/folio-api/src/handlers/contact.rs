//! Contact form handler
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::mail::ContactMessage;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use folio_core::FolioError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Contact form body
#[derive(Debug, Deserialize, ToSchema)]
pub struct ContactRequest {
    #[schema(example = "Ada")]
    pub name: Option<String>,
    #[schema(example = "ada@example.com")]
    pub email: Option<String>,
    pub subject: Option<String>,
    #[schema(example = "Loved the FixMyIoT demo!")]
    pub message: Option<String>,
}

impl ContactRequest {
    /// Required fields present and non-blank
    fn into_message(self) -> Result<ContactMessage, AppError> {
        fn required(value: Option<String>) -> Option<String> {
            value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        }

        match (
            required(self.name),
            required(self.email),
            required(self.message),
        ) {
            (Some(name), Some(email), Some(message)) => Ok(ContactMessage {
                name,
                email,
                subject: self.subject,
                message,
            }),
            _ => Err(AppError::BadRequest(
                "Please fill in all required fields.".to_string(),
            )),
        }
    }
}

/// Contact form response
#[derive(Debug, Serialize, ToSchema)]
pub struct ContactResponse {
    pub success: bool,
    #[schema(example = "Message sent successfully")]
    pub message: String,
}

/// Send a contact form message to the site owner
#[utoipa::path(
    post,
    path = "/api/contact/send",
    tag = "contact",
    request_body = ContactRequest,
    responses(
        (status = 200, description = "Message sent", body = ContactResponse),
        (status = 400, description = "Missing required fields", body = crate::error::ApiError),
        (status = 500, description = "Delivery failed", body = crate::error::ApiError)
    )
)]
pub async fn send_contact(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let message = req.into_message()?;

    match state.mailer.send(&message).await {
        Ok(()) => Ok(Json(ContactResponse {
            success: true,
            message: "Message sent successfully".to_string(),
        })),
        Err(FolioError::Validation(msg)) => Err(AppError::BadRequest(msg)),
        Err(e) => Err(AppError::Failed {
            message: "Failed to send message".to_string(),
            cause: e.to_string(),
        }),
    }
}
