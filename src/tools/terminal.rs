//! Terminal tools: the only tools that end a step loop. They never execute
//! against the browser — they just stamp a `TerminalOutcome` onto their own
//! result for the dispatcher to surface.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{Tool, ToolDeps, ToolOutcome};
use crate::message::TerminalOutcome;

/// `complete_work(feedback, output?)` for a task run. `output_schema` is
/// wired in by the Task Runner at construction time — when present it is
/// advertised as the shape of `output` but not deep-validated here; only the
/// dispatcher's strict key check applies.
pub struct CompleteWork {
    output_schema: Option<Value>,
}

impl CompleteWork {
    pub fn new(output_schema: Option<Value>) -> Self {
        Self { output_schema }
    }
}

#[async_trait]
impl Tool for CompleteWork {
    fn name(&self) -> &str {
        "complete_work"
    }
    fn description(&self) -> &str {
        "Signal that the task is complete, with a feedback summary and optional structured output."
    }
    fn params_schema(&self) -> Value {
        let output_property = self.output_schema.clone().unwrap_or_else(|| serde_json::json!({}));
        serde_json::json!({
            "type": "object",
            "properties": {"feedback": {"type": "string"}, "output": output_property},
            "required": ["feedback"],
        })
    }
    async fn execute(&self, params: Map<String, Value>, _deps: &ToolDeps) -> ToolOutcome {
        let Some(feedback) = params.get("feedback").and_then(Value::as_str) else {
            return ToolOutcome::error("missing 'feedback'");
        };
        let output = params.get("output").cloned();
        ToolOutcome::Terminal(TerminalOutcome::Completed { feedback: feedback.to_string(), output })
    }
}

/// `abort_work(reason)` — ends the run with status ABORTED.
pub struct AbortWork;

#[async_trait]
impl Tool for AbortWork {
    fn name(&self) -> &str {
        "abort_work"
    }
    fn description(&self) -> &str {
        "Signal that the task cannot be completed, with a reason."
    }
    fn params_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"reason": {"type": "string"}},
            "required": ["reason"],
        })
    }
    async fn execute(&self, params: Map<String, Value>, _deps: &ToolDeps) -> ToolOutcome {
        let Some(reason) = params.get("reason").and_then(Value::as_str) else {
            return ToolOutcome::error("missing 'reason'");
        };
        ToolOutcome::Terminal(TerminalOutcome::Aborted { reason: reason.to_string() })
    }
}

/// `complete_work(verified, feedback)` — the Verifier's own terminal tool,
/// distinct from the Task Runner's: its outcome carries a boolean verdict
/// rather than a free-form output payload.
pub struct VerifyComplete;

#[async_trait]
impl Tool for VerifyComplete {
    fn name(&self) -> &str {
        "complete_work"
    }
    fn description(&self) -> &str {
        "Report whether the condition holds, with supporting feedback."
    }
    fn params_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"verified": {"type": "boolean"}, "feedback": {"type": "string"}},
            "required": ["verified", "feedback"],
        })
    }
    async fn execute(&self, params: Map<String, Value>, _deps: &ToolDeps) -> ToolOutcome {
        let Some(verified) = params.get("verified").and_then(Value::as_bool) else {
            return ToolOutcome::error("missing boolean 'verified'");
        };
        let Some(feedback) = params.get("feedback").and_then(Value::as_str) else {
            return ToolOutcome::error("missing 'feedback'");
        };
        ToolOutcome::Terminal(TerminalOutcome::Completed {
            feedback: feedback.to_string(),
            output: Some(Value::Bool(verified)),
        })
    }
}
