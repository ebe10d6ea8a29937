//! Embedding cache
//!
//! Visitors tend to ask the same handful of questions, and embedding a
//! question is the most expensive step before the LLM call. Embeddings are
//! cached by text with moka, which is thread-safe, async-compatible and
//! evicts by capacity and TTL.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use folio_core::Result;
use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::embedding::Embedder;

// ============================================================================
// Cached Embedder
// ============================================================================

/// Embedder wrapper that caches vectors by input text
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Cache<u64, Vec<f32>>,
    stats: Arc<CacheStats>,
}

impl CachedEmbedder {
    /// Wrap `inner` with a cache of at most `capacity` entries living `ttl_secs`
    pub fn new(inner: Arc<dyn Embedder>, capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            inner,
            cache,
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Number of cached vectors
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    async fn lookup(&self, text: &str) -> Option<Vec<f32>> {
        let result = self.cache.get(&hash_text(text)).await;
        if result.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        result
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self.lookup(text).await {
            return Ok(vector);
        }

        let vector = self.inner.embed(text).await?;
        self.cache.insert(hash_text(text), vector.clone()).await;
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut missing = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let cached = self.lookup(text).await;
            if cached.is_none() {
                missing.push(i);
            }
            results.push(cached);
        }

        if !missing.is_empty() {
            let to_embed: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let fresh = self.inner.embed_batch(&to_embed).await?;

            for (&i, vector) in missing.iter().zip(fresh) {
                self.cache.insert(hash_text(&texts[i]), vector.clone()).await;
                results[i] = Some(vector);
            }
        }

        // A backend returning fewer vectors than asked leaves gaps; drop them
        // so the caller's length check reports the shortfall.
        Ok(results.into_iter().flatten().collect())
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Hash text for use as cache key
fn hash_text(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

// ============================================================================
// Cache Statistics
// ============================================================================

/// Hit and miss counters
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total hits
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get total misses
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Hit rate as a fraction (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }
}
