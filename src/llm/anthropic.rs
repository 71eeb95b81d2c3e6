//! Anthropic's Messages API has no official Rust SDK, so this adapter talks
//! to it directly over `reqwest`: hand-rolled request/response types for the
//! slice of the wire format this crate needs (tool use, tool results,
//! images), kept intentionally narrow rather than chasing full API parity.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{coerce_tool_arguments, inline_refs, LlmAdapter};
use crate::error::AgentError;
use crate::message::{AssistantMessage, Content, ImageMime, Message, ToolCall};
use crate::tools::ToolSpec;

const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicAdapter {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicAdapter {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".to_string(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn content_block(content: &Content) -> Value {
        match content {
            Content::Text { text, .. } => json!({"type": "text", "text": text}),
            Content::Image { data, mime, .. } => json!({
                "type": "image",
                "source": {"type": "base64", "media_type": mime.as_str(), "data": data},
            }),
        }
    }

    fn build_messages(messages: &[Message]) -> (Option<String>, Vec<Value>) {
        let mut system = None;
        let mut out = Vec::new();
        for message in messages {
            match message {
                Message::System { content } => {
                    let text = content
                        .iter()
                        .filter_map(|c| match c {
                            Content::Text { text, .. } => Some(text.clone()),
                            Content::Image { .. } => None,
                        })
                        .collect::<Vec<_>>()
                        .join("\n");
                    system = Some(match system {
                        Some(existing) => format!("{existing}\n{text}"),
                        None => text,
                    });
                }
                Message::User { content } => {
                    out.push(json!({"role": "user", "content": content.iter().map(Self::content_block).collect::<Vec<_>>()}));
                }
                Message::Assistant { content, tool_calls, .. } => {
                    let mut blocks: Vec<Value> = content.iter().map(Self::content_block).collect();
                    for call in tool_calls {
                        blocks.push(json!({"type": "tool_use", "id": call.id, "name": call.name, "input": Value::Object(call.arguments.clone())}));
                    }
                    out.push(json!({"role": "assistant", "content": blocks}));
                }
                Message::ToolResult { results } => {
                    let blocks: Vec<Value> = results
                        .iter()
                        .map(|result| {
                            let mut inner: Vec<Value> = vec![json!({"type": "text", "text": result.error.clone().unwrap_or_else(|| result.description.clone())})];
                            inner.extend(result.observation.iter().map(Self::content_block));
                            json!({
                                "type": "tool_result",
                                "tool_use_id": result.tool_call_id,
                                "is_error": !result.is_success(),
                                "content": inner,
                            })
                        })
                        .collect();
                    out.push(json!({"role": "user", "content": blocks}));
                }
            }
        }
        (system, out)
    }

    fn build_tools(tools: &[ToolSpec]) -> Vec<Value> {
        tools
            .iter()
            .map(|spec| json!({"name": spec.name, "description": spec.description, "input_schema": inline_refs(&spec.schema)}))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
    #[serde(default)]
    error: Option<AnthropicErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Map<String, Value> },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

#[async_trait]
impl LlmAdapter for AnthropicAdapter {
    async fn call_tools(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<AssistantMessage, AgentError> {
        let (system, provider_messages) = Self::build_messages(messages);
        let anthropic_tools = Self::build_tools(tools);

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": provider_messages,
        });
        if let Some(system) = system {
            body["system"] = Value::String(system);
        }
        if !anthropic_tools.is_empty() {
            body["tools"] = Value::Array(anthropic_tools);
            body["tool_choice"] = json!({"type": "any"});
        }

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .timeout(Duration::from_secs(120))
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::LlmProtocol(format!("Anthropic request failed: {e}")))?;

        let status = response.status();
        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AgentError::LlmProtocol(format!("failed to parse Anthropic response: {e}")))?;

        if !status.is_success() {
            let detail = parsed.error.map(|e| e.message).unwrap_or_else(|| format!("HTTP {status}"));
            return Err(AgentError::LlmProtocol(format!("Anthropic API error: {detail}")));
        }

        let mut content = Vec::new();
        let mut tool_calls = Vec::new();
        for block in parsed.content {
            match block {
                AnthropicResponseBlock::Text { text } => content.push(Content::text(text)),
                AnthropicResponseBlock::ToolUse { id, name, input } => {
                    let coerced = coerce_tool_arguments(Value::Object(input));
                    let arguments = match coerced {
                        Value::Object(map) => map,
                        _ => Map::new(),
                    };
                    tool_calls.push(ToolCall { id, name, arguments });
                }
                AnthropicResponseBlock::Other => {}
            }
        }

        if !tools.is_empty() && tool_calls.is_empty() {
            return Err(AgentError::LlmProtocol("forced tool-calling was requested but the model returned none".to_string()));
        }

        let usage = parsed.usage.map(|u| crate::budget::TokenUsage::new(u.input_tokens, u.output_tokens));
        Ok(AssistantMessage { content, tool_calls, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolResult;

    #[test]
    fn tool_result_becomes_a_user_message_with_tool_result_blocks() {
        let results = vec![ToolResult::success("1", "click", "clicked button")];
        let (_, messages) = AnthropicAdapter::build_messages(&[Message::tool_results(results)]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"][0]["type"], "tool_result");
        assert_eq!(messages[0]["content"][0]["tool_use_id"], "1");
    }

    #[test]
    fn tool_result_with_observation_image_embeds_it_in_the_same_block() {
        let mut result = ToolResult::success("2", "observe", "observed page");
        result.observation = vec![Content::image("abc123", ImageMime::Png)];
        let (_, messages) = AnthropicAdapter::build_messages(&[Message::tool_results(vec![result])]);
        let inner = messages[0]["content"][0]["content"].as_array().unwrap();
        assert_eq!(inner.len(), 2);
        assert_eq!(inner[1]["type"], "image");
    }

    #[test]
    fn system_messages_are_concatenated_and_excluded_from_the_turn_list() {
        let messages = vec![Message::system("be careful"), Message::user(vec![Content::text("go")])];
        let (system, turns) = AnthropicAdapter::build_messages(&messages);
        assert_eq!(system.as_deref(), Some("be careful"));
        assert_eq!(turns.len(), 1);
    }

    #[test]
    fn error_result_marks_its_tool_result_block_as_error() {
        let error = ToolResult::error("3", "click", "element not found");
        let (_, messages) = AnthropicAdapter::build_messages(&[Message::tool_results(vec![error])]);
        assert_eq!(messages[0]["content"][0]["is_error"], true);
    }
}
