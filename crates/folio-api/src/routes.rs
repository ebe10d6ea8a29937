//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::handlers::{contact, query};
use crate::state::AppState;
use axum::{routing::post, Router};
use std::sync::Arc;

/// Routes mounted under `/api`
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/query", post(query::query_handler))
        .route("/chat", post(query::chat_handler))
        .route("/contact/send", post(contact::send_contact))
}
