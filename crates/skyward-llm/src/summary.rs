//! Tracking-log summaries.

use std::sync::Arc;

use crate::client::{ChatBackend, ChatOptions};
use crate::error::LlmError;

pub const SUMMARY_SYSTEM_PROMPT: &str = "You analyze drone target-tracking logs. \
Each line has a timestamp, the distance to the target, where the target sits relative \
to the drone and the drone speed. Summarize in a few sentences how the target moved, \
how well the drone kept its distance and anything unusual. Reply in plain text.";

pub const SUMMARY_OPTIONS: ChatOptions = ChatOptions {
    temperature: 0.1,
    num_predict: 300,
};

#[derive(Clone)]
pub struct Summarizer {
    backend: Arc<dyn ChatBackend>,
}

impl Summarizer {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    pub async fn summarize(&self, log_text: &str) -> Result<String, LlmError> {
        if log_text.trim().is_empty() {
            return Err(LlmError::EmptyInput);
        }
        let user = format!("Summarize this tracking log:\n\n{}", log_text);
        let reply = self
            .backend
            .chat(SUMMARY_SYSTEM_PROMPT, &user, SUMMARY_OPTIONS)
            .await?;
        Ok(reply.trim().to_string())
    }
}
