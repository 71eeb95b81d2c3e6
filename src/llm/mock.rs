//! A scripted `LlmAdapter` for tests: returns one pre-programmed
//! `AssistantMessage` per call, in order, and records what it was called
//! with.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::LlmAdapter;
use crate::error::AgentError;
use crate::message::{AssistantMessage, Content, Message, ToolCall};
use crate::tools::ToolSpec;

/// One programmed assistant turn. `tool` is the common case; `text` models
/// a tool-free final answer for adapters under test that allow it.
pub enum ScriptedTurn {
    ToolCall { id: &'static str, name: &'static str, arguments: Map<String, Value> },
    ToolCalls(Vec<(&'static str, &'static str, Map<String, Value>)>),
    Text(&'static str),
}

impl ScriptedTurn {
    pub fn tool(id: &'static str, name: &'static str, arguments: Map<String, Value>) -> Self {
        ScriptedTurn::ToolCall { id, name, arguments }
    }

    fn into_assistant_message(self) -> AssistantMessage {
        match self {
            ScriptedTurn::ToolCall { id, name, arguments } => AssistantMessage {
                content: Vec::new(),
                tool_calls: vec![ToolCall { id: id.to_string(), name: name.to_string(), arguments }],
                usage: None,
            },
            ScriptedTurn::ToolCalls(calls) => AssistantMessage {
                content: Vec::new(),
                tool_calls: calls
                    .into_iter()
                    .map(|(id, name, arguments)| ToolCall { id: id.to_string(), name: name.to_string(), arguments })
                    .collect(),
                usage: None,
            },
            ScriptedTurn::Text(text) => {
                AssistantMessage { content: vec![Content::text(text)], tool_calls: Vec::new(), usage: None }
            }
        }
    }
}

pub struct MockAdapter {
    script: Mutex<Vec<AssistantMessage>>,
    calls: Mutex<Vec<(usize, usize)>>, // (message count, tool count) at call time
}

impl MockAdapter {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            script: Mutex::new(turns.into_iter().map(ScriptedTurn::into_assistant_message).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmAdapter for MockAdapter {
    async fn call_tools(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<AssistantMessage, AgentError> {
        self.calls.lock().unwrap().push((messages.len(), tools.len()));
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            return Err(AgentError::LlmProtocol("MockAdapter: no more programmed turns".to_string()));
        }
        Ok(script.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plays_back_turns_in_order_and_errors_once_exhausted() {
        let mut args = Map::new();
        args.insert("feedback".into(), Value::String("done".into()));
        let adapter = MockAdapter::new(vec![ScriptedTurn::tool("1", "complete_work", args)]);

        let result = adapter.call_tools(&[], &[]).await.unwrap();
        assert_eq!(result.tool_calls[0].name, "complete_work");
        assert_eq!(adapter.call_count(), 1);

        let err = adapter.call_tools(&[], &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::LlmProtocol(_)));
    }
}
