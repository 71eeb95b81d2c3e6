//! Conversation data model (part of the message log): content items,
//! messages, tool calls and tool results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// MIME type of an image content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMime {
    Png,
    Jpeg,
    Webp,
    Gif,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Webp => "image/webp",
            ImageMime::Gif => "image/gif",
        }
    }
}

/// One piece of message content: text or a base64-encoded image, with
/// optional purger metadata.
///
/// `tag` drives the coarse, type-based purge window (`crate::purge`);
/// `lifespan` drives the fine-grained per-item purge. Both can be set on
/// the same item — see `crate::purge` for how conflicts resolve.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text { text: String, tag: Option<String>, lifespan: Option<u32> },
    Image { data: String, mime: ImageMime, tag: Option<String>, lifespan: Option<u32> },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into(), tag: None, lifespan: None }
    }

    pub fn image(data: impl Into<String>, mime: ImageMime) -> Self {
        Content::Image { data: data.into(), mime, tag: None, lifespan: None }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.set_tag(Some(tag.into()));
        self
    }

    pub fn with_lifespan(mut self, lifespan: u32) -> Self {
        self.set_lifespan(Some(lifespan));
        self
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Content::Text { tag, .. } | Content::Image { tag, .. } => tag.as_deref(),
        }
    }

    pub fn lifespan(&self) -> Option<u32> {
        match self {
            Content::Text { lifespan, .. } | Content::Image { lifespan, .. } => *lifespan,
        }
    }

    fn set_tag(&mut self, new_tag: Option<String>) {
        match self {
            Content::Text { tag, .. } | Content::Image { tag, .. } => *tag = new_tag,
        }
    }

    fn set_lifespan(&mut self, new_lifespan: Option<u32>) {
        match self {
            Content::Text { lifespan, .. } | Content::Image { lifespan, .. } => *lifespan = new_lifespan,
        }
    }
}

/// A single proposed invocation from an `AssistantMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolStatus {
    Success,
    Error,
}

/// Side-channel signal a terminal tool (`complete_work`/`abort_work`)
/// attaches to its own `ToolResult` to end the step loop — termination is
/// never signalled via an exception/error, only via this field.
#[derive(Debug, Clone)]
pub enum TerminalOutcome {
    Completed { feedback: String, output: Option<Value> },
    Aborted { reason: String },
}

/// The dispatcher's verdict on one executed (or skipped) tool call.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub name: String,
    pub status: ToolStatus,
    pub description: String,
    pub error: Option<String>,
    /// Observation content attached by tools that themselves produce a
    /// fresh observation (e.g. `observe`), distinct from the worker's own
    /// per-step Observation Builder output.
    pub observation: Vec<Content>,
    pub terminal: Option<TerminalOutcome>,
}

impl ToolResult {
    pub fn success(tool_call_id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            status: ToolStatus::Success,
            description: description.into(),
            error: None,
            observation: Vec::new(),
            terminal: None,
        }
    }

    pub fn error(tool_call_id: impl Into<String>, name: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            status: ToolStatus::Error,
            description: error.clone(),
            error: Some(error),
            observation: Vec::new(),
            terminal: None,
        }
    }

    pub fn with_observation(mut self, content: Vec<Content>) -> Self {
        self.observation = content;
        self
    }

    pub fn with_terminal(mut self, outcome: TerminalOutcome) -> Self {
        self.terminal = Some(outcome);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }
}

pub use crate::budget::TokenUsage;

/// One turn of the conversation.
#[derive(Debug, Clone)]
pub enum Message {
    System { content: Vec<Content> },
    User { content: Vec<Content> },
    Assistant { content: Vec<Content>, tool_calls: Vec<ToolCall>, usage: Option<TokenUsage> },
    ToolResult { results: Vec<ToolResult> },
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Message::System { content: vec![Content::text(text)] }
    }

    pub fn user(content: Vec<Content>) -> Self {
        Message::User { content }
    }

    pub fn assistant(content: Vec<Content>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant { content, tool_calls, usage: None }
    }

    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Message::ToolResult { results }
    }

    /// Content items of this message, if it carries any (tool-result
    /// messages expose their attached observation content, if any).
    pub fn content(&self) -> Vec<&Content> {
        match self {
            Message::System { content } | Message::User { content } => content.iter().collect(),
            Message::Assistant { content, .. } => content.iter().collect(),
            Message::ToolResult { results } => results.iter().flat_map(|r| r.observation.iter()).collect(),
        }
    }

    pub fn content_mut(&mut self) -> Vec<&mut Content> {
        match self {
            Message::System { content } | Message::User { content } => content.iter_mut().collect(),
            Message::Assistant { content, .. } => content.iter_mut().collect(),
            Message::ToolResult { results } => results.iter_mut().flat_map(|r| r.observation.iter_mut()).collect(),
        }
    }

    /// Drops every content item for which `keep` returns `false` from this
    /// message's content vector(s) — used by the purger, which must remove
    /// stripped items rather than merely blank them out so that
    /// `content().iter().any(|c| c.tag() == ...)` reports them gone.
    pub fn retain_content(&mut self, mut keep: impl FnMut(&Content) -> bool) {
        match self {
            Message::System { content } | Message::User { content } => content.retain(|c| keep(c)),
            Message::Assistant { content, .. } => content.retain(|c| keep(c)),
            Message::ToolResult { results } => {
                for result in results.iter_mut() {
                    result.observation.retain(|c| keep(c));
                }
            }
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::System { .. } => MessageKind::System,
            Message::User { .. } => MessageKind::User,
            Message::Assistant { .. } => MessageKind::Assistant,
            Message::ToolResult { .. } => MessageKind::ToolResult,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    System,
    User,
    Assistant,
    ToolResult,
}

/// A normalized assistant turn returned by an `LlmAdapter`.
#[derive(Debug, Clone)]
pub struct AssistantMessage {
    pub content: Vec<Content>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<TokenUsage>,
}

impl From<AssistantMessage> for Message {
    fn from(am: AssistantMessage) -> Self {
        Message::Assistant { content: am.content, tool_calls: am.tool_calls, usage: am.usage }
    }
}
