//! Retry wrapper: exponential back-off over transient `LlmAdapter`
//! failures. Authentication failures are never retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::LlmAdapter;
use crate::error::AgentError;
use crate::message::{AssistantMessage, Message};
use crate::tools::ToolSpec;

pub struct RetryingAdapter {
    inner: Arc<dyn LlmAdapter>,
    max_retries: u32,
}

impl RetryingAdapter {
    pub fn new(inner: Arc<dyn LlmAdapter>, max_retries: u32) -> Self {
        Self { inner, max_retries }
    }

    fn is_auth_error(message: &str) -> bool {
        let lower = message.to_lowercase();
        lower.contains("401") || lower.contains("403") || lower.contains("unauthorized") || lower.contains("invalid api key")
    }

    fn is_rate_limited(message: &str) -> bool {
        let lower = message.to_lowercase();
        lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests")
    }

    fn backoff(attempt: u32, rate_limited: bool) -> Duration {
        let base = if rate_limited { 5 } else { 1 };
        Duration::from_secs(std::cmp::min(base << attempt, 60))
    }
}

#[async_trait]
impl LlmAdapter for RetryingAdapter {
    async fn call_tools(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<AssistantMessage, AgentError> {
        let mut last_err = String::new();
        for attempt in 0..=self.max_retries {
            match self.inner.call_tools(messages, tools).await {
                Ok(response) => return Ok(response),
                Err(AgentError::LlmProtocol(msg)) if Self::is_auth_error(&msg) => {
                    tracing::error!(error = %msg, "LLM auth error — not retrying");
                    return Err(AgentError::LlmProtocol(msg));
                }
                Err(AgentError::LlmProtocol(msg)) => {
                    last_err = msg.clone();
                    if attempt < self.max_retries {
                        let wait = Self::backoff(attempt, Self::is_rate_limited(&msg));
                        tracing::warn!(attempt = attempt + 1, max = self.max_retries, wait_s = wait.as_secs(), error = %msg, "LLM transient error — retrying");
                        tokio::time::sleep(wait).await;
                    }
                }
                Err(other) => return Err(other),
            }
        }
        Err(AgentError::LlmProtocol(format!("LLM failed after {} retries — last error: {last_err}", self.max_retries)))
    }
}
