//! `createAgent(llm, browserContext, options) -> Agent` equivalent: a
//! fluent builder over the provider-convenience constructors an LLM
//! adapter ships with, plus the run options every `Agent` carries.

use std::sync::Arc;
use std::time::Duration;

use crate::agent::Agent;
use crate::browser::BrowserPort;
use crate::error::AgentError;
use crate::llm::{AnthropicAdapter, LlmAdapter, OpenAiAdapter, RetryingAdapter};
use crate::types::AgentOptions;

/// Builds an `Agent` from an LLM provider, a browser page, and run options.
///
/// ```no_run
/// # use webtask_agent::AgentBuilder;
/// # use std::sync::Arc;
/// # async fn build(page: Arc<dyn webtask_agent::BrowserPort>) {
/// let agent = AgentBuilder::new(page)
///     .anthropic("", "claude-sonnet-4-6")
///     .max_steps(30)
///     .build()
///     .unwrap();
/// # }
/// ```
pub struct AgentBuilder {
    page: Arc<dyn BrowserPort>,
    llm: Option<Arc<dyn LlmAdapter>>,
    retry_count: Option<u32>,
    options: AgentOptions,
}

impl AgentBuilder {
    pub fn new(page: Arc<dyn BrowserPort>) -> Self {
        Self { page, llm: None, retry_count: None, options: AgentOptions::default() }
    }

    // ── LLM provider setters ────────────────────────────────────────────

    /// Set the LLM adapter explicitly — the escape hatch for any provider
    /// not covered by the convenience methods below.
    pub fn llm(mut self, llm: Arc<dyn LlmAdapter>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Use the standard OpenAI API. Reads `OPENAI_API_KEY` from the
    /// environment when `api_key` is empty.
    pub fn openai(mut self, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let key = api_key.into();
        let adapter = if key.is_empty() {
            OpenAiAdapter::new(model)
        } else {
            OpenAiAdapter::with_base_url("https://api.openai.com/v1", key, model)
        };
        self.llm = Some(Arc::new(adapter));
        self
    }

    /// Groq's OpenAI-compatible inference API.
    pub fn groq(mut self, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let adapter = OpenAiAdapter::with_base_url("https://api.groq.com/openai/v1", api_key, model);
        self.llm = Some(Arc::new(adapter));
        self
    }

    /// A local Ollama instance. `base_url` defaults to
    /// `http://localhost:11434/v1` when empty.
    pub fn ollama(mut self, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let url = {
            let s = base_url.into();
            if s.is_empty() { "http://localhost:11434/v1".to_string() } else { s }
        };
        let adapter = OpenAiAdapter::with_base_url(url, "ollama", model);
        self.llm = Some(Arc::new(adapter));
        self
    }

    /// Anthropic's Messages API. Reads `ANTHROPIC_API_KEY` from the
    /// environment when `api_key` is empty.
    pub fn anthropic(mut self, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let key = api_key.into();
        let resolved = if key.is_empty() {
            std::env::var("ANTHROPIC_API_KEY").unwrap_or_default()
        } else {
            key
        };
        self.llm = Some(Arc::new(AnthropicAdapter::new(resolved, model)));
        self
    }

    // ── Retry policy ─────────────────────────────────────────────────────

    /// Wraps the current adapter with exponential back-off retry on
    /// transient failures. Must be called after a provider method.
    pub fn retry_on_error(mut self, max_retries: u32) -> Self {
        self.retry_count = Some(max_retries);
        self
    }

    // ── Run options ──────────────────────────────────────────────────────

    pub fn max_steps(mut self, n: usize) -> Self {
        self.options.max_steps = n;
        self
    }

    pub fn wait_after_action(mut self, wait: Duration) -> Self {
        self.options.wait_after_action = wait;
        self
    }

    pub fn use_screenshot(mut self, enabled: bool) -> Self {
        self.options.use_screenshot = enabled;
        self
    }

    pub fn use_accessibility_tree(mut self, enabled: bool) -> Self {
        self.options.use_accessibility_tree = enabled;
        self
    }

    /// Paths the `upload` tool's `file_indexes` resolve against, in order.
    pub fn files(mut self, files: Vec<String>) -> Self {
        self.options.files = files;
        self
    }

    pub fn options(mut self, options: AgentOptions) -> Self {
        self.options = options;
        self
    }

    // ── Build ────────────────────────────────────────────────────────────

    pub fn build(self) -> Result<Agent, AgentError> {
        let mut llm = self.llm.ok_or_else(|| {
            AgentError::Build("LLM adapter is required. Use .openai(), .groq(), .ollama(), .anthropic(), or .llm()".to_string())
        })?;

        if let Some(n) = self.retry_count {
            llm = Arc::new(RetryingAdapter::new(llm, n));
        }

        Ok(Agent::new(llm, self.page, self.options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockBrowser;

    #[test]
    fn build_fails_without_an_llm_adapter() {
        let err = AgentBuilder::new(Arc::new(MockBrowser::new())).build().unwrap_err();
        assert!(matches!(err, AgentError::Build(_)));
    }

    #[test]
    fn build_succeeds_once_a_provider_is_set() {
        let agent = AgentBuilder::new(Arc::new(MockBrowser::new()))
            .anthropic("test-key", "claude-sonnet-4-6")
            .max_steps(10)
            .build();
        assert!(agent.is_ok());
    }

    #[test]
    fn retry_on_error_wraps_the_adapter_without_failing_the_build() {
        let agent = AgentBuilder::new(Arc::new(MockBrowser::new()))
            .openai("test-key", "gpt-4o")
            .retry_on_error(3)
            .build();
        assert!(agent.is_ok());
    }
}
