use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::TextGenerator;
use crate::store::InsightStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InsightStore>,
    /// Gemini in production, a scripted model in tests.
    pub model: Arc<dyn TextGenerator>,
    pub config: Config,
}
