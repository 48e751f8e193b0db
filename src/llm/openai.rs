//! OpenAI-compatible chat-completions client
//!
//! Speaks the `chat/completions` wire format, so it works against any
//! compatible host. The default base URL points at Groq.

use super::{LlmError, LlmService};
use crate::db::Turn;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "gemma2-9b-it";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const TEMPERATURE: f32 = 0.7;

/// Chat-completions client for OpenAI-compatible hosts
pub struct OpenAiCompatService {
    client: Client,
    api_key: String,
    chat_url: String,
    model: String,
}

impl OpenAiCompatService {
    pub fn new(api_key: String, base_url: Option<&str>, model: Option<&str>) -> Self {
        let base = base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');
        let chat_url = format!("{base}/chat/completions");

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            chat_url,
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
        }
    }

    fn translate_request(&self, turns: &[Turn], directive: &str) -> ChatRequest {
        let mut messages: Vec<ChatMessage> = turns
            .iter()
            .map(|t| ChatMessage {
                role: t.role.as_str().to_string(),
                content: t.content.clone(),
            })
            .collect();

        // The directive rides as a trailing user message; it is never
        // part of the persisted context.
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: directive.to_string(),
        });

        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: TEMPERATURE,
        }
    }

    fn classify_error(&self, status: reqwest::StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => LlmError::auth(format!("Authentication failed: {body}")),
            429 => LlmError::rate_limit(format!("Rate limited: {body}")),
            400 => LlmError::invalid_request(format!("Invalid request: {body}")),
            500..=599 => LlmError::server_error(format!("Server error: {body}")),
            _ => LlmError::unknown(format!("HTTP {status}: {body}")),
        }
    }
}

#[async_trait]
impl LlmService for OpenAiCompatService {
    async fn generate(&self, turns: &[Turn], directive: &str) -> Result<String, LlmError> {
        let request = self.translate_request(turns, directive);

        let response = self
            .client
            .post(&self.chat_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(self.classify_error(status, &body));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::unknown(format!("Failed to parse response: {e} - body: {body}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::unknown("Model returned an empty reply"));
        }

        Ok(text)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}
