//! Language-model collaborator
//!
//! Narrow interface to the external chat-completion service: the full
//! ordered turn sequence goes in together with a directive, plain text
//! comes back. No streaming, no tool use.

mod error;
mod openai;

pub use error::{LlmError, LlmErrorKind};
pub use openai::OpenAiCompatService;

use crate::db::Turn;
use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for the chat-completion model
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Send the ordered turn sequence plus a trailing user directive and
    /// return the model's plain-text reply.
    async fn generate(&self, turns: &[Turn], directive: &str) -> Result<String, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Configuration for the model client
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GROQ_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok()),
            base_url: std::env::var("GREENROOM_LLM_BASE_URL").ok(),
            model: std::env::var("GREENROOM_LLM_MODEL").ok(),
        }
    }
}

/// Logging wrapper for model services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn generate(&self, turns: &[Turn], directive: &str) -> Result<String, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate(turns, directive).await;
        let duration = start.elapsed();

        match &result {
            Ok(text) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    turns = turns.len(),
                    reply_chars = text.len(),
                    "Model request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Model request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
