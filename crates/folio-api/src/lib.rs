//! Folio API - HTTP server for the portfolio avatar
//!
//! Endpoints:
//! - `POST /api/query`: retrieval only
//! - `POST /api/chat`: text and spoken reply
//! - `POST /api/contact/send`: contact form
//! - `GET /health`
//!
//! OpenAPI JSON is served at `/api-docs/openapi.json` with Swagger UI at
//! `/swagger-ui`.
//!
//! Author: hephaex@gmail.com

pub mod error;
pub mod extract;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use state::AppState;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Folio API",
        description = "Résumé-grounded avatar: retrieval, spoken replies and contact form"
    ),
    paths(
        handlers::health::health_check,
        handlers::query::query_handler,
        handlers::query::chat_handler,
        handlers::contact::send_contact,
    ),
    components(schemas(
        handlers::health::HealthResponse,
        handlers::query::QueryRequest,
        handlers::query::QueryResult,
        handlers::query::QueryResponse,
        handlers::query::ChatResponse,
        handlers::contact::ContactRequest,
        handlers::contact::ContactResponse,
        error::ApiError,
    )),
    tags(
        (name = "health", description = "Liveness"),
        (name = "query", description = "Questions about the résumé"),
        (name = "contact", description = "Contact form"),
    )
)]
pub struct ApiDoc;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    let body_limit = state.config.server.max_body_size;

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api", routes::api_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for the portfolio front end; no configured origins means any
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}
