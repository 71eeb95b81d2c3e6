//! Meta tools: never touch the browser, always succeed once their
//! arguments validate.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{Tool, ToolDeps, ToolOutcome};

const MIN_WAIT_SECONDS: f64 = 0.1;
const MAX_WAIT_SECONDS: f64 = 10.0;

pub struct Wait;

#[async_trait]
impl Tool for Wait {
    fn name(&self) -> &str {
        "wait"
    }
    fn description(&self) -> &str {
        "Pause for the given number of seconds before continuing."
    }
    fn params_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"seconds": {"type": "number"}},
            "required": ["seconds"],
        })
    }
    async fn execute(&self, params: Map<String, Value>, _deps: &ToolDeps) -> ToolOutcome {
        let Some(seconds) = params.get("seconds").and_then(Value::as_f64) else {
            return ToolOutcome::error("missing numeric 'seconds'");
        };
        if !(MIN_WAIT_SECONDS..=MAX_WAIT_SECONDS).contains(&seconds) {
            return ToolOutcome::error(format!(
                "'seconds' must be between {MIN_WAIT_SECONDS} and {MAX_WAIT_SECONDS}, got {seconds}"
            ));
        }
        tokio::time::sleep(std::time::Duration::from_secs_f64(seconds)).await;
        ToolOutcome::success(format!("waited {seconds}s"))
    }
}

pub struct Observe;

#[async_trait]
impl Tool for Observe {
    fn name(&self) -> &str {
        "observe"
    }
    fn description(&self) -> &str {
        "Request a fresh observation of the current page without taking any action."
    }
    fn params_schema(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}, "required": []})
    }
    async fn execute(&self, _params: Map<String, Value>, _deps: &ToolDeps) -> ToolOutcome {
        ToolOutcome::success("observation requested")
    }
}

pub struct Think;

#[async_trait]
impl Tool for Think {
    fn name(&self) -> &str {
        "think"
    }
    fn description(&self) -> &str {
        "Record a private reasoning note; has no effect on the page."
    }
    fn params_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"thought": {"type": "string"}},
            "required": ["thought"],
        })
    }
    async fn execute(&self, params: Map<String, Value>, _deps: &ToolDeps) -> ToolOutcome {
        let thought = params.get("thought").and_then(Value::as_str).unwrap_or("");
        ToolOutcome::success(format!("noted: {thought}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockBrowser;
    use crate::tools::FileManager;
    use std::sync::Arc;

    fn deps() -> ToolDeps {
        ToolDeps { browser: Arc::new(MockBrowser::new()), element_index: Default::default(), files: Arc::new(FileManager::new(vec![])) }
    }

    #[tokio::test]
    async fn wait_rejects_below_minimum() {
        let mut params = Map::new();
        params.insert("seconds".into(), Value::from(0.01));
        let outcome = Wait.execute(params, &deps()).await;
        assert!(matches!(outcome, ToolOutcome::Error(_)));
    }

    #[tokio::test]
    async fn wait_rejects_above_maximum() {
        let mut params = Map::new();
        params.insert("seconds".into(), Value::from(20.0));
        let outcome = Wait.execute(params, &deps()).await;
        assert!(matches!(outcome, ToolOutcome::Error(_)));
    }

    #[tokio::test]
    async fn wait_accepts_in_range_value() {
        let mut params = Map::new();
        params.insert("seconds".into(), Value::from(0.1));
        let outcome = Wait.execute(params, &deps()).await;
        assert!(matches!(outcome, ToolOutcome::Success(_)));
    }

    #[tokio::test]
    async fn think_always_succeeds() {
        let mut params = Map::new();
        params.insert("thought".into(), Value::String("the button is likely disabled".into()));
        let outcome = Think.execute(params, &deps()).await;
        assert!(matches!(outcome, ToolOutcome::Success(_)));
    }
}
