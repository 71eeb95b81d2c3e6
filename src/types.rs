//! Crate-level run/output types: the `Run` a Task Runner produces, the
//! `Verdict` a Verifier produces, and the options knobs a caller tunes when
//! building an `Agent`.

use serde_json::Value;

use crate::message::Message;

/// Terminal status of one `Worker` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Aborted,
    Exhausted,
}

/// The outcome of one task run: how it ended, the feedback text the model
/// (or the step budget) supplied, any schema-validated structured output,
/// how many steps it took, and the full message history for inspection.
#[derive(Debug, Clone)]
pub struct Run {
    pub status: RunStatus,
    pub feedback: String,
    pub output: Option<Value>,
    pub step_count: usize,
    pub messages: Vec<Message>,
}

impl Run {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// `(passed, feedback)`, boolean-coercible — the result of `Agent::verify`.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub passed: bool,
    pub feedback: String,
}

impl From<Verdict> for bool {
    fn from(verdict: Verdict) -> bool {
        verdict.passed
    }
}

/// Tunable knobs for one `Agent`, mirrored from the builder into a plain
/// struct so the Worker/Verifier/Runner can be constructed without holding
/// onto the builder itself.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub wait_after_action: std::time::Duration,
    pub max_steps: usize,
    pub use_screenshot: bool,
    pub use_accessibility_tree: bool,
    pub files: Vec<String>,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            wait_after_action: std::time::Duration::ZERO,
            max_steps: 50,
            use_screenshot: true,
            use_accessibility_tree: true,
            files: Vec::new(),
        }
    }
}
