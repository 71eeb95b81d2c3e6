use thiserror::Error;

/// Unified error type for the agent crate.
///
/// Tool-dispatch failures are recoverable (they become `ToolResult`s, never
/// this type); this enum is reserved for failures that abort a run or fail
/// a build step.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("tool '{0}' not found in registry")]
    ToolNotFound(String),

    #[error("parameter validation failed for '{tool}': {reason}")]
    ParamValidation { tool: String, reason: String },

    #[error("tool execution failed: {0}")]
    ToolExecution(String),

    #[error("LLM protocol error: {0}")]
    LlmProtocol(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("task aborted: {0}")]
    TaskAborted(String),

    #[error("verification aborted: {0}")]
    VerificationAborted(String),

    #[error("extraction aborted: {0}")]
    ExtractionAborted(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("snapshot parsing error: {0}")]
    SnapshotParse(String),

    #[error("build error: {0}")]
    Build(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
