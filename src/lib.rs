pub mod agent;
pub mod ax;
pub mod browser;
pub mod budget;
pub mod builder;
pub mod cancel;
pub mod dom;
pub mod error;
pub mod filters;
pub mod indexer;
pub mod llm;
pub mod message;
pub mod observation;
pub mod prompt;
pub mod purge;
pub mod runner;
pub mod tools;
pub mod trace;
pub mod types;
pub mod verifier;
pub mod worker;

// Convenience re-exports at crate root
pub use agent::{Agent, ElementHandle};
pub use browser::BrowserPort;
pub use builder::AgentBuilder;
pub use cancel::CancellationToken;
pub use error::{AgentError, AgentResult};
pub use llm::LlmAdapter;
pub use message::{Content, Message, MessageKind, ToolCall, ToolResult, ToolStatus};
pub use runner::RunConfig;
pub use tools::{Tool, ToolRegistry};
pub use types::{AgentOptions, Run, RunStatus, Verdict};
pub use worker::Worker;
