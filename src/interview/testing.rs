//! Mock model collaborator for tests

use crate::db::Turn;
use crate::llm::{LlmError, LlmService};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Mock model that returns queued replies and records every call
pub struct MockModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    /// `(turn count seen, directive)` per call, in order.
    calls: Mutex<Vec<(usize, String)>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn queue(&self, text: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
    }

    /// Queue an error reply
    pub fn queue_error(&self, error: LlmError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded calls
    pub fn calls(&self) -> Vec<(usize, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockModel {
    async fn generate(&self, turns: &[Turn], directive: &str) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((turns.len(), directive.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("no mock reply queued")))
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}
