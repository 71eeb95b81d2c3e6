//! OpenAI (and OpenAI-compatible: Groq, Together, Ollama, Fireworks, …)
//! adapter. Built on `async-openai`; messages are assembled as plain JSON
//! and round-tripped through `serde_json` into the typed request shape —
//! `ChatCompletionRequestMessage`'s `Deserialize` impl already understands
//! the wire format, which keeps this conversion declarative.

use std::collections::HashMap;

use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestMessage, ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionObject},
    Client,
};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{coerce_tool_arguments, inline_refs, LlmAdapter};
use crate::error::AgentError;
use crate::message::{AssistantMessage, Content, Message, ToolCall, ToolResult};
use crate::tools::ToolSpec;

pub struct OpenAiAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiAdapter {
    /// Standard OpenAI client, reading `OPENAI_API_KEY` from the environment.
    pub fn new(model: impl Into<String>) -> Self {
        Self { client: Client::new(), model: model.into() }
    }

    /// Custom base URL — Groq, Together, a local Ollama, etc.
    pub fn with_base_url(api_base: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_base(api_base).with_api_key(api_key);
        Self { client: Client::with_config(config), model: model.into() }
    }

    fn build_tools(tools: &[ToolSpec]) -> Vec<ChatCompletionTool> {
        tools
            .iter()
            .map(|spec| ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: FunctionObject {
                    name: spec.name.clone(),
                    description: Some(spec.description.clone()),
                    parameters: Some(inline_refs(&spec.schema)),
                    strict: None,
                },
            })
            .collect()
    }

    fn content_to_part(content: &Content) -> Value {
        match content {
            Content::Text { text, .. } => json!({"type": "text", "text": text}),
            Content::Image { data, mime, .. } => json!({
                "type": "image_url",
                "image_url": {"url": format!("data:{};base64,{}", mime.as_str(), data)},
            }),
        }
    }

    fn to_provider_messages(messages: &[Message]) -> Vec<Value> {
        let mut out = Vec::new();
        for message in messages {
            match message {
                Message::System { content } => {
                    out.push(json!({"role": "system", "content": render_text(content)}));
                }
                Message::User { content } => {
                    out.push(json!({"role": "user", "content": content.iter().map(Self::content_to_part).collect::<Vec<_>>()}));
                }
                Message::Assistant { content, tool_calls, .. } => {
                    let text = render_text(content);
                    let oai_calls: Vec<Value> = tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {"name": call.name, "arguments": serde_json::to_string(&call.arguments).unwrap_or_default()},
                            })
                        })
                        .collect();
                    let mut entry = json!({"role": "assistant", "content": if text.is_empty() { Value::Null } else { Value::String(text) }});
                    if !oai_calls.is_empty() {
                        entry["tool_calls"] = Value::Array(oai_calls);
                    }
                    out.push(entry);
                }
                Message::ToolResult { results } => {
                    push_tool_result_messages(&mut out, results, Self::content_to_part);
                }
            }
        }
        out
    }
}

fn render_text(content: &[Content]) -> String {
    content
        .iter()
        .filter_map(|c| match c {
            Content::Text { text, .. } => Some(text.clone()),
            Content::Image { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One `tool` message per result (string content, as OpenAI requires), then
/// a trailing `user` message carrying any attached observation content —
/// the `tool` role cannot itself hold image parts.
fn push_tool_result_messages(out: &mut Vec<Value>, results: &[ToolResult], part: impl Fn(&Content) -> Value) {
    let mut observation_parts = Vec::new();
    for result in results {
        let text = result.error.clone().unwrap_or_else(|| result.description.clone());
        out.push(json!({"role": "tool", "tool_call_id": result.tool_call_id, "content": text}));
        observation_parts.extend(result.observation.iter().map(&part));
    }
    if !observation_parts.is_empty() {
        out.push(json!({"role": "user", "content": observation_parts}));
    }
}

fn parse_tool_call(raw: &async_openai::types::ChatCompletionMessageToolCall) -> Result<ToolCall, AgentError> {
    let args: HashMap<String, Value> = serde_json::from_str(&raw.function.arguments)
        .map_err(|e| AgentError::LlmProtocol(format!("failed to parse tool arguments: {e}")))?;
    let coerced = coerce_tool_arguments(Value::Object(args.into_iter().collect()));
    let arguments = match coerced {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    Ok(ToolCall { id: raw.id.clone(), name: raw.function.name.clone(), arguments })
}

#[async_trait]
impl LlmAdapter for OpenAiAdapter {
    async fn call_tools(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<AssistantMessage, AgentError> {
        let provider_messages = Self::to_provider_messages(messages);
        let typed_messages: Vec<ChatCompletionRequestMessage> = serde_json::from_value(Value::Array(provider_messages))
            .map_err(|e| AgentError::LlmProtocol(format!("failed to build OpenAI messages: {e}")))?;

        let mut request = CreateChatCompletionRequestArgs::default();
        request.model(&self.model).messages(typed_messages);

        let oai_tools = Self::build_tools(tools);
        if !oai_tools.is_empty() {
            request.tools(oai_tools).tool_choice(ChatCompletionToolChoiceOption::Required);
        }

        let request = request.build().map_err(|e| AgentError::LlmProtocol(format!("failed to build request: {e}")))?;
        let response = self.client.chat().create(request).await.map_err(|e| AgentError::LlmProtocol(format!("OpenAI API error: {e}")))?;

        let usage = response.usage.as_ref().map(|u| crate::budget::TokenUsage::new(u.prompt_tokens, u.completion_tokens));
        let choice = response.choices.into_iter().next().ok_or_else(|| AgentError::LlmProtocol("empty response from OpenAI".to_string()))?;
        let message = choice.message;

        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .iter()
            .map(parse_tool_call)
            .collect::<Result<Vec<_>, _>>()?;

        if !tools.is_empty() && tool_calls.is_empty() {
            return Err(AgentError::LlmProtocol("forced tool-calling was requested but the model returned none".to_string()));
        }

        let content = message.content.map(Content::text).into_iter().collect();
        Ok(AssistantMessage { content, tool_calls, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolStatus;

    #[test]
    fn tool_results_become_one_tool_message_each_plus_trailing_observation() {
        let results = vec![
            ToolResult { tool_call_id: "1".into(), name: "click".into(), status: ToolStatus::Success, description: "clicked".into(), error: None, observation: vec![], terminal: None },
            ToolResult {
                tool_call_id: "2".into(),
                name: "observe".into(),
                status: ToolStatus::Success,
                description: "observed".into(),
                error: None,
                observation: vec![Content::text("page text")],
                terminal: None,
            },
        ];
        let mut out = Vec::new();
        push_tool_result_messages(&mut out, &results, OpenAiAdapter::content_to_part);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0]["role"], "tool");
        assert_eq!(out[1]["role"], "tool");
        assert_eq!(out[2]["role"], "user");
    }
}
