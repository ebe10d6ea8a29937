//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::mail::Mailer;
use folio_core::AppConfig;
use folio_rag::AvatarPipeline;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
///
/// Every service is constructed before the server starts listening.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Question answering pipeline
    pub pipeline: Arc<AvatarPipeline>,
    /// Contact form delivery
    pub mailer: Arc<dyn Mailer>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
}

impl AppState {
    /// Create new application state
    pub fn new(config: AppConfig, pipeline: Arc<AvatarPipeline>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            config,
            pipeline,
            mailer,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
