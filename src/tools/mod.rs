//! Tool Registry & Dispatcher: typed tools, strict JSON-Schema
//! argument validation, stop-on-first-error dispatch against a shared
//! `ToolDeps` bundle.

pub mod document;
pub mod element;
pub mod pixel;
pub mod terminal;
pub mod upload;
pub mod utility;

pub use upload::FileManager;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::browser::BrowserPort;
use crate::indexer::ElementIndex;
use crate::message::{Content, ToolCall, ToolResult, ToolStatus};

/// What a `Tool::execute` call hands back before the dispatcher stamps on
/// the `tool_call_id`/`name` that turn it into a full `ToolResult`.
pub enum ToolOutcome {
    Success(String),
    SuccessWithObservation(String, Vec<Content>),
    Error(String),
    Terminal(crate::message::TerminalOutcome),
}

impl ToolOutcome {
    pub fn success(desc: impl Into<String>) -> Self {
        ToolOutcome::Success(desc.into())
    }

    pub fn error(desc: impl Into<String>) -> Self {
        ToolOutcome::Error(desc.into())
    }
}

/// Dependencies injected into every tool invocation. Rebuilt (element
/// index) or shared (browser, files) per step by the Worker.
pub struct ToolDeps {
    pub browser: Arc<dyn BrowserPort>,
    pub element_index: ElementIndex,
    pub files: Arc<FileManager>,
}

/// `{name, description, paramsSchema, execute}` — the unified tool
/// interface. There is exactly one `Tool` trait in this crate; the upstream
/// ambiguity between an untyped agent-side base and a typed LLM-side base
/// is resolved by never having the untyped one.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// JSON-Schema-shaped `{type: "object", properties, required}`. Tools
    /// built on the strict-params convention (the default) are rejected by
    /// the dispatcher if the caller's arguments carry a key absent from
    /// `properties`.
    fn params_schema(&self) -> Value;

    /// Whether unknown top-level argument keys should be rejected. True by
    /// default for every tool in this crate's registry.
    fn strict(&self) -> bool {
        true
    }

    async fn execute(&self, params: Map<String, Value>, deps: &ToolDeps) -> ToolOutcome;
}

/// Name/description/schema triple handed to the LLM Adapter — the
/// provider-neutral shape a `Tool` is reduced to for prompting.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new(), order: Vec::new() }
    }

    /// Registers a tool. Panics on a duplicate name — a registry is built
    /// once, at startup, from a fixed list; a name collision is a
    /// programming error, not a runtime condition to recover from.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        assert!(!self.tools.contains_key(&name), "duplicate tool name: {name}");
        self.order.push(name.clone());
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .map(|name| {
                let tool = &self.tools[name];
                ToolSpec { name: tool.name().to_string(), description: tool.description().to_string(), schema: tool.params_schema() }
            })
            .collect()
    }
}

/// Rejects a call's arguments if the tool's schema is strict and the call
/// carries a key not named in `properties`. Returns the offending key.
fn validate_strict(schema: &Value, args: &Map<String, Value>) -> Result<(), String> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for key in args.keys() {
        if !properties.contains_key(key) {
            return Err(format!("unknown field '{key}'"));
        }
    }
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for req in required {
            if let Some(req_name) = req.as_str() {
                if !args.contains_key(req_name) {
                    return Err(format!("missing required field '{req_name}'"));
                }
            }
        }
    }
    Ok(())
}

/// Dispatches one assistant message's tool calls in order. On the first
/// `ToolNotFound`/validation/execution error, every remaining call in the
/// batch is short-circuited to a `"Skipped: prior error"` result — this
/// preserves the 1:1 correspondence between `ToolCall`s and `ToolResult`s
/// that providers require.
pub async fn dispatch_calls(
    registry: &ToolRegistry,
    calls: &[ToolCall],
    deps: &ToolDeps,
    wait_after_action: Duration,
) -> Vec<ToolResult> {
    let mut results = Vec::with_capacity(calls.len());
    let mut stopped = false;

    for call in calls {
        if stopped {
            results.push(ToolResult::error(call.id.clone(), call.name.clone(), "Skipped: prior error"));
            continue;
        }

        let Some(tool) = registry.get(&call.name) else {
            results.push(ToolResult::error(call.id.clone(), call.name.clone(), format!("Tool '{}' not found in registry", call.name)));
            stopped = true;
            continue;
        };

        if tool.strict() {
            if let Err(reason) = validate_strict(&tool.params_schema(), &call.arguments) {
                results.push(ToolResult::error(call.id.clone(), call.name.clone(), format!("parameter validation failed: {reason}")));
                stopped = true;
                continue;
            }
        }

        let outcome = tool.execute(call.arguments.clone(), deps).await;
        let is_terminal = matches!(outcome, ToolOutcome::Terminal(_));
        let result = match outcome {
            ToolOutcome::Success(desc) => ToolResult::success(call.id.clone(), call.name.clone(), desc),
            ToolOutcome::SuccessWithObservation(desc, obs) => {
                ToolResult::success(call.id.clone(), call.name.clone(), desc).with_observation(obs)
            }
            ToolOutcome::Error(desc) => ToolResult::error(call.id.clone(), call.name.clone(), desc),
            ToolOutcome::Terminal(outcome) => {
                let (status, description) = match &outcome {
                    crate::message::TerminalOutcome::Completed { feedback, .. } => (ToolStatus::Success, feedback.clone()),
                    crate::message::TerminalOutcome::Aborted { reason } => (ToolStatus::Error, reason.clone()),
                };
                ToolResult {
                    tool_call_id: call.id.clone(),
                    name: call.name.clone(),
                    status,
                    description,
                    error: None,
                    observation: Vec::new(),
                    terminal: Some(outcome),
                }
            }
        };

        if matches!(result.status, ToolStatus::Error) && !is_terminal {
            stopped = true;
        }
        results.push(result);

        if !stopped && !is_terminal && !wait_after_action.is_zero() {
            tokio::time::sleep(wait_after_action).await;
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockBrowser;

    struct DummyTool;

    #[async_trait]
    impl Tool for DummyTool {
        fn name(&self) -> &str {
            "dummy"
        }
        fn description(&self) -> &str {
            "accepts {value}"
        }
        fn params_schema(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {"value": {"type": "string"}}, "required": []})
        }
        async fn execute(&self, params: Map<String, Value>, _deps: &ToolDeps) -> ToolOutcome {
            ToolOutcome::success(format!("ok:{:?}", params.get("value")))
        }
    }

    fn deps() -> ToolDeps {
        ToolDeps {
            browser: Arc::new(MockBrowser::new()),
            element_index: ElementIndex::default(),
            files: Arc::new(FileManager::new(vec![])),
        }
    }

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall { id: id.to_string(), name: name.to_string(), arguments: Map::new() }
    }

    #[tokio::test]
    async fn tool_not_found_is_reported_and_stops_batch() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool));

        let calls = vec![call("1", "scroll")];
        let results = dispatch_calls(&registry, &calls, &deps(), Duration::ZERO).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ToolStatus::Error);
        assert!(results[0].error.as_deref().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn stop_on_first_error_chain() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool));

        let mut ok_call = call("2", "dummy");
        ok_call.arguments.insert("value".into(), Value::String("ok".into()));
        let calls = vec![call("1", "nonexistent"), ok_call];

        let results = dispatch_calls(&registry, &calls, &deps(), Duration::ZERO).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, ToolStatus::Error);
        assert!(results[0].error.as_deref().unwrap().contains("not found"));
        assert_eq!(results[1].status, ToolStatus::Error);
        assert!(results[1].error.as_deref().unwrap().contains("Skipped"));
    }

    #[tokio::test]
    async fn strict_schema_rejects_unknown_field() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool));

        let mut bad_call = call("1", "dummy");
        bad_call.arguments.insert("surprise".into(), Value::Bool(true));

        let results = dispatch_calls(&registry, &[bad_call], &deps(), Duration::ZERO).await;
        assert_eq!(results[0].status, ToolStatus::Error);
        assert!(results[0].error.as_deref().unwrap().contains("surprise"));
    }
}
