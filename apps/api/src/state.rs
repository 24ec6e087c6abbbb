use std::sync::Arc;

use crate::collaborators::extraction::ContextExtractor;
use crate::collaborators::publish::Publisher;
use crate::llm_client::ModelInvoker;
use crate::pipeline::PipelineSettings;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    /// Pluggable text-generation backend. Default: AnthropicInvoker.
    pub llm: Arc<dyn ModelInvoker>,
    pub extractor: Arc<dyn ContextExtractor>,
    /// DisabledPublisher unless PUBLISH_WEBHOOK_URL is set.
    pub publisher: Arc<dyn Publisher>,
    pub pipeline: Arc<PipelineSettings>,
}
