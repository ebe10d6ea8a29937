//! Folio API Server
//!
//! Serves the avatar and contact endpoints for the portfolio website.
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use folio_api::{create_router, mail::SmtpMailer, state::AppState};
use folio_core::{AppConfig, Section};
use folio_rag::AvatarPipeline;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::var("FOLIO_CONFIG").ok().map(PathBuf::from);
    let config = AppConfig::load(config_path).context("Failed to load configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        format!("folio_api={level},folio_rag={level},folio_vector={level},tower_http=debug").into()
    });
    if config.logging.json_format {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Missing configuration is fatal
    config
        .require(&[
            Section::VectorIndex,
            Section::Embedding,
            Section::Llm,
            Section::Speech,
            Section::Mail,
        ])
        .context("Invalid configuration")?;

    // Build services once, before accepting requests
    let pipeline = AvatarPipeline::from_config(&config)
        .await
        .context("Failed to initialize avatar pipeline")?;
    let mailer = SmtpMailer::from_config(&config.mail).context("Failed to initialize mailer")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(
        config,
        Arc::new(pipeline),
        Arc::new(mailer),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Folio API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
