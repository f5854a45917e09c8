use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ModelProvider;
use crate::outreach::jobs::BatchJobs;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Every batch started since boot, keyed by batch id.
    pub jobs: BatchJobs,
    /// Builds the model client for each batch. Default: AnthropicProvider.
    pub models: Arc<dyn ModelProvider>,
}
