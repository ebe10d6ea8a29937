//! Question handlers: retrieval only, and the full avatar reply
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Question request body
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Visitor's question
    #[schema(example = "What languages does he know?")]
    pub query: Option<String>,

    /// Number of résumé chunks to retrieve
    #[schema(example = 5, default = 5, minimum = 1)]
    pub top_k: Option<usize>,
}

impl QueryRequest {
    fn question(&self) -> Result<&str, AppError> {
        match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => Ok(q),
            _ => Err(AppError::BadRequest("Query text is required".to_string())),
        }
    }
}

/// One retrieved chunk
#[derive(Debug, Serialize, ToSchema)]
pub struct QueryResult {
    #[schema(example = "chunk-1")]
    pub id: String,

    /// Similarity score reported by the index
    #[schema(example = 0.83)]
    pub score: f32,

    /// Chunk text, or "No text available"
    #[schema(example = "Skilled in React and Node")]
    pub text: String,
}

/// Retrieval response body
#[derive(Debug, Serialize, ToSchema)]
pub struct QueryResponse {
    pub success: bool,
    pub query: String,
    pub results: Vec<QueryResult>,
}

/// Avatar reply body
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub success: bool,

    /// Generated reply
    #[schema(example = "I mostly work in React and Node, with a soft spot for Rust.")]
    pub text: String,

    /// Spoken reply, base64-encoded
    pub audio_base64: String,

    /// MIME type of the decoded audio
    #[schema(example = "audio/mpeg")]
    pub audio_mime_type: String,

    /// Time spent producing the reply
    pub processing_time_ms: u64,
}

/// Retrieve the résumé chunks closest to a question
#[utoipa::path(
    post,
    path = "/api/query",
    tag = "query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Query successful", body = QueryResponse),
        (status = 400, description = "Invalid request", body = crate::error::ApiError),
        (status = 500, description = "Internal error", body = crate::error::ApiError)
    )
)]
pub async fn query_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<QueryRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let question = req.question()?;
    let results = state.pipeline.retrieve(question, req.top_k).await?;

    Ok(Json(QueryResponse {
        success: true,
        query: question.to_string(),
        results: results
            .into_iter()
            .map(|r| QueryResult {
                id: r.id,
                score: r.score,
                text: r.text,
            })
            .collect(),
    }))
}

/// Answer a question in the avatar's voice
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Reply generated", body = ChatResponse),
        (status = 400, description = "Invalid request", body = crate::error::ApiError),
        (status = 500, description = "Internal error", body = crate::error::ApiError)
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<QueryRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let question = req.question()?;
    let reply = state.pipeline.chat(question, req.top_k).await?;

    Ok(Json(ChatResponse {
        success: true,
        text: reply.text,
        audio_base64: base64::engine::general_purpose::STANDARD.encode(&reply.audio.bytes),
        audio_mime_type: reply.audio.mime_type,
        processing_time_ms: reply.processing_time_ms,
    }))
}
