//! Rate limiting between model calls.
//!
//! The pipeline only knows the `RateLimiter` trait, so an adaptive limiter can
//! replace the fixed pause without touching generation code.

use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Called after a model call, before the next one starts.
    async fn pause(&self);
}

/// Sleeps for a fixed duration after every call. Not adaptive: 429s are
/// retried inside the LLM client, not here.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

#[async_trait]
impl RateLimiter for FixedDelay {
    async fn pause(&self) {
        tokio::time::sleep(self.0).await;
    }
}

/// No pause at all. Used when the configured pause is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl RateLimiter for NoDelay {
    async fn pause(&self) {}
}
