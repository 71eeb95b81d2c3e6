//! Step Loop / Worker: the per-step state machine that turns one task into
//! a bounded sequence of observations, model calls, and tool executions.
//!
//! ```text
//! S0 READY -> S1 OBSERVING -> S2 PROMPTING -> S3 EXECUTING -> S4 RECORDING
//!   -> (S0 again, or S5 TERMINAL)
//! ```
//!
//! A step is one full round-trip. `Worker` owns none of the message log —
//! it borrows it mutably for the duration of `run`, appending to it in
//! place so a caller can inspect partial history after a cancelled or
//! aborted run.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::browser::BrowserPort;
use crate::cancel::CancellationToken;
use crate::dom::parse_cdp;
use crate::error::AgentError;
use crate::filters::{filter_accessibility, filter_dom, FilterConfig};
use crate::indexer::ElementIndex;
use crate::llm::LlmAdapter;
use crate::message::{Message, MessageKind, TerminalOutcome};
use crate::observation::{build_observation_with_ax, OBSERVATION_TAG};
use crate::purge::{purge_by_lifespan, purge_by_tag, PurgeParams};
use crate::tools::{dispatch_calls, FileManager, ToolDeps, ToolRegistry};
use crate::trace::{Trace, TraceEntry};
use crate::types::{Run, RunStatus};

const PURGE_KEEP_LAST: usize = 2;

/// One `Worker`'s fixed configuration for a run. The message log and step
/// count are threaded through `run` rather than stored here, so the same
/// `Worker` could in principle drive several runs sequentially.
pub struct Worker {
    pub browser: Arc<dyn BrowserPort>,
    pub llm: Arc<dyn LlmAdapter>,
    pub registry: ToolRegistry,
    pub files: Arc<FileManager>,
    pub filter_config: FilterConfig,
    pub wait_after_action: Duration,
    pub max_steps: usize,
    pub use_screenshot: bool,
    pub use_accessibility_tree: bool,
    pub cancel: CancellationToken,
}

impl Worker {
    /// Drives `messages` forward until a terminal tool fires, the step
    /// budget is exhausted, or the run is cancelled / the LLM adapter
    /// fails. Appends every message it produces to `messages` in place.
    pub async fn run(&self, messages: &mut Vec<Message>) -> Run {
        let mut trace = Trace::new();
        let mut step_count = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                return finish(RunStatus::Aborted, "cancelled".to_string(), None, step_count, messages);
            }

            // S1 OBSERVING
            let element_index = match self.observe_and_append(messages).await {
                Ok(index) => index,
                Err(err) => {
                    tracing::error!(step = step_count, error = %err, "observation failed, aborting run");
                    return finish(RunStatus::Aborted, err.to_string(), None, step_count, messages);
                }
            };
            trace.record(TraceEntry {
                step: step_count,
                state: "OBSERVING".to_string(),
                event: "observation appended".to_string(),
                data: String::new(),
                timestamp: Utc::now(),
            });

            self.purge(messages);

            if self.cancel.is_cancelled() {
                return finish(RunStatus::Aborted, "cancelled".to_string(), None, step_count, messages);
            }

            // S2 PROMPTING
            let tool_specs = self.registry.specs();
            let assistant = match self.llm.call_tools(messages, &tool_specs).await {
                Ok(assistant) => assistant,
                Err(err) => {
                    tracing::error!(step = step_count, error = %err, "LLM adapter error, aborting run");
                    return finish(RunStatus::Aborted, err.to_string(), None, step_count, messages);
                }
            };
            trace.record(TraceEntry {
                step: step_count,
                state: "PROMPTING".to_string(),
                event: format!("{} tool call(s) proposed", assistant.tool_calls.len()),
                data: String::new(),
                timestamp: Utc::now(),
            });

            let tool_calls = assistant.tool_calls.clone();
            messages.push(Message::from(assistant));

            // S3 EXECUTING
            let deps = ToolDeps { browser: self.browser.clone(), element_index, files: self.files.clone() };
            let results = dispatch_calls(&self.registry, &tool_calls, &deps, self.wait_after_action).await;
            trace.record(TraceEntry {
                step: step_count,
                state: "EXECUTING".to_string(),
                event: format!("{} result(s)", results.len()),
                data: String::new(),
                timestamp: Utc::now(),
            });

            // S4 RECORDING
            let terminal = results.iter().find_map(|r| r.terminal.clone());
            messages.push(Message::tool_results(results));
            step_count += 1;

            if let Some(outcome) = terminal {
                return match outcome {
                    TerminalOutcome::Completed { feedback, output } => {
                        tracing::info!(step = step_count, "run completed");
                        finish(RunStatus::Completed, feedback, output, step_count, messages)
                    }
                    TerminalOutcome::Aborted { reason } => {
                        tracing::warn!(step = step_count, reason = %reason, "run aborted by task");
                        finish(RunStatus::Aborted, reason, None, step_count, messages)
                    }
                };
            }

            if step_count >= self.max_steps {
                tracing::warn!(step = step_count, "step budget exhausted");
                return finish(RunStatus::Exhausted, "step budget exhausted".to_string(), None, step_count, messages);
            }
        }
    }

    /// Builds one step's observation from a fresh DOM/AX snapshot, appends
    /// it to the log, and returns the `ElementIndex` it was built against
    /// so the dispatcher can resolve `element_id`s tool calls reference.
    async fn observe_and_append(&self, messages: &mut Vec<Message>) -> Result<ElementIndex, AgentError> {
        let snapshot = self.browser.dom_snapshot().await?;
        let dom_tree = filter_dom(&parse_cdp(&snapshot), &self.filter_config);

        let ax_tree = if self.use_accessibility_tree {
            match self.browser.ax_snapshot().await {
                Ok(raw) => Some(filter_accessibility(&raw)),
                Err(err) => {
                    tracing::debug!(error = %err, "no accessibility snapshot available this step");
                    None
                }
            }
        } else {
            None
        };

        let screenshot = if self.use_screenshot {
            Some(self.browser.screenshot(false).await?.bytes)
        } else {
            None
        };

        let observation = build_observation_with_ax(&dom_tree, ax_tree.as_ref(), screenshot.as_deref());
        let mut content = vec![observation.text];
        if let Some(image) = observation.image {
            content.push(image);
        }
        messages.push(Message::user(content));
        Ok(observation.element_index)
    }

    fn purge(&self, messages: &mut [Message]) {
        let mut tags = HashSet::new();
        tags.insert(OBSERVATION_TAG);
        let mut types = HashSet::new();
        types.insert(MessageKind::User);
        types.insert(MessageKind::ToolResult);

        purge_by_tag(messages, &PurgeParams { tags, message_types: types.clone(), keep_last: PURGE_KEEP_LAST });
        purge_by_lifespan(messages, &types);
    }
}

fn finish(status: RunStatus, feedback: String, output: Option<serde_json::Value>, step_count: usize, messages: &[Message]) -> Run {
    Run { status, feedback, output, step_count, messages: messages.to_vec() }
}
