//! Fail-open abstract summarization.

use async_trait::async_trait;
use papertrail_common::SUMMARY_UNAVAILABLE;
use tracing::{debug, warn};

use crate::backend::LlmBackend;

const PROMPT_PREFIX: &str =
    "Summarize or explain this research paper abstract in about two sentences: ";

/// Turns a paper abstract into a short summary.
///
/// Never fails: implementations return [`SUMMARY_UNAVAILABLE`] instead.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> String;

    /// Whether `summarize` calls out to a remote service. Callers only
    /// rate-limit summarizers that do.
    fn sends_requests(&self) -> bool {
        true
    }
}

/// Summarizer backed by a remote LLM. Without a backend every call yields
/// the unavailable sentinel and no request is made.
pub struct RemoteSummarizer {
    backend: Option<Box<dyn LlmBackend>>,
}

impl RemoteSummarizer {
    pub fn new(backend: Box<dyn LlmBackend>) -> Self {
        Self { backend: Some(backend) }
    }

    pub fn disabled() -> Self {
        Self { backend: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }
}

#[async_trait]
impl Summarizer for RemoteSummarizer {
    async fn summarize(&self, text: &str) -> String {
        let Some(backend) = &self.backend else {
            debug!("Summarizer disabled, using placeholder summary");
            return SUMMARY_UNAVAILABLE.to_string();
        };

        let prompt = format!("{PROMPT_PREFIX}{text}");
        match backend.complete(&prompt).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                warn!(model = backend.model_id(), "Summarizer returned empty text");
                SUMMARY_UNAVAILABLE.to_string()
            }
            Err(e) => {
                warn!(model = backend.model_id(), error = %e, "Error getting summary");
                SUMMARY_UNAVAILABLE.to_string()
            }
        }
    }

    fn sends_requests(&self) -> bool {
        self.is_enabled()
    }
}
