//! LLM Adapter Contract: the single provider-neutral boundary between
//! the Worker and a language model.
//!
//! `call_tools(messages, tools) -> AssistantMessage` is the entire
//! contract. An adapter must inline every `$ref` in a tool's schema before
//! sending it, must force the model to return at least one tool call
//! whenever `tools` is non-empty, and must preserve tool-call order. Token
//! accounting is optional and must never change the returned value.

mod anthropic;
mod mock;
mod openai;
mod retry;
mod schema;

pub use anthropic::AnthropicAdapter;
pub use mock::{MockAdapter, ScriptedTurn};
pub use openai::OpenAiAdapter;
pub use retry::RetryingAdapter;
pub use schema::inline_refs;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AgentError;
use crate::message::{AssistantMessage, Message};
use crate::tools::ToolSpec;

#[async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn call_tools(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<AssistantMessage, AgentError>;
}

/// Recursively normalizes provider-returned tool arguments into plain
/// JSON. Some provider SDKs (notably Google's `google-generativeai`) hand
/// back `MapComposite`/`RepeatedComposite` wrapper types instead of plain
/// dict/list; ported to this crate's own recurring shape — an index-keyed
/// object standing in for an array, e.g. `{"0": x, "1": y}` — which a
/// provider's JSON transcoding can produce when a repeated field round-trips
/// through a map representation. Idempotent: already-plain JSON passes
/// through unchanged.
pub fn coerce_tool_arguments(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let is_index_keyed = !map.is_empty()
                && map.keys().enumerate().all(|(i, k)| k == &i.to_string());
            if is_index_keyed {
                let mut items: Vec<(usize, Value)> = map
                    .into_iter()
                    .map(|(k, v)| (k.parse::<usize>().unwrap_or(0), coerce_tool_arguments(v)))
                    .collect();
                items.sort_by_key(|(i, _)| *i);
                Value::Array(items.into_iter().map(|(_, v)| v).collect())
            } else {
                Value::Object(map.into_iter().map(|(k, v)| (k, coerce_tool_arguments(v))).collect())
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(coerce_tool_arguments).collect()),
        other => other,
    }
}
