//! Task Runner: the outer driver for `agent.do(task)`. Builds the initial
//! message log, registers the full toolset, and drives a `Worker` to a
//! terminal `Run`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::browser::BrowserPort;
use crate::cancel::CancellationToken;
use crate::filters::FilterConfig;
use crate::llm::LlmAdapter;
use crate::message::Message;
use crate::prompt::build_system_prompt;
use crate::tools::document::ScrollDocument;
use crate::tools::element::{Click, Fill, TypeText, Upload};
use crate::tools::pixel::{ClickAt, DragAndDrop, HoverAt, ScrollAt};
use crate::tools::terminal::{AbortWork, CompleteWork};
use crate::tools::utility::{Observe, Think, Wait};
use crate::tools::{FileManager, ToolRegistry};
use crate::types::Run;
use crate::worker::Worker;

fn full_registry(output_schema: Option<Value>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(Observe));
    registry.register(Arc::new(Think));
    registry.register(Arc::new(Wait));
    registry.register(Arc::new(ScrollDocument));
    registry.register(Arc::new(Click));
    registry.register(Arc::new(Fill));
    registry.register(Arc::new(TypeText));
    registry.register(Arc::new(Upload));
    registry.register(Arc::new(ClickAt));
    registry.register(Arc::new(HoverAt));
    registry.register(Arc::new(ScrollAt));
    registry.register(Arc::new(DragAndDrop));
    registry.register(Arc::new(CompleteWork::new(output_schema)));
    registry.register(Arc::new(AbortWork));
    registry
}

/// One call to `agent.do`'s worth of configuration — everything the Worker
/// needs that isn't already fixed on the `Agent` itself.
pub struct RunConfig {
    pub task_description: String,
    pub max_steps: usize,
    pub output_schema: Option<Value>,
    pub wait_after_action: Duration,
    pub use_screenshot: bool,
    pub use_accessibility_tree: bool,
}

#[allow(clippy::too_many_arguments)]
pub async fn run_task(
    browser: Arc<dyn BrowserPort>,
    llm: Arc<dyn LlmAdapter>,
    files: Arc<FileManager>,
    filter_config: FilterConfig,
    config: RunConfig,
    cancel: CancellationToken,
) -> Run {
    let system = build_system_prompt(&config.task_description, &files.format_context());
    let mut messages = vec![
        Message::system(system),
        Message::user(vec![crate::message::Content::text(config.task_description.clone())]),
    ];

    let worker = Worker {
        browser,
        llm,
        registry: full_registry(config.output_schema),
        files,
        filter_config,
        wait_after_action: config.wait_after_action,
        max_steps: config.max_steps,
        use_screenshot: config.use_screenshot,
        use_accessibility_tree: config.use_accessibility_tree,
        cancel,
    };

    worker.run(&mut messages).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockBrowser;
    use crate::llm::{MockAdapter, ScriptedTurn};
    use crate::types::RunStatus;
    use serde_json::{json, Map};

    #[tokio::test]
    async fn a_completed_run_carries_the_schema_matched_output() {
        let mut args = Map::new();
        args.insert("feedback".into(), json!("added the item"));
        args.insert("output".into(), json!({"count": 3}));
        let llm = Arc::new(MockAdapter::new(vec![ScriptedTurn::tool("1", "complete_work", args)]));

        let config = RunConfig {
            task_description: "add three widgets to the cart".to_string(),
            max_steps: 5,
            output_schema: Some(json!({"type": "object", "properties": {"count": {"type": "integer"}}})),
            wait_after_action: Duration::ZERO,
            use_screenshot: false,
            use_accessibility_tree: false,
        };

        let run = run_task(
            Arc::new(MockBrowser::new()),
            llm,
            Arc::new(FileManager::new(Vec::new())),
            FilterConfig::default(),
            config,
            CancellationToken::new(),
        )
        .await;

        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.output, Some(json!({"count": 3})));
    }

    #[tokio::test]
    async fn the_system_prompt_carries_the_task_description() {
        let mut args = Map::new();
        args.insert("feedback".into(), json!("done"));
        let llm = Arc::new(MockAdapter::new(vec![ScriptedTurn::tool("1", "complete_work", args)]));

        let config = RunConfig {
            task_description: "log in as an administrator".to_string(),
            max_steps: 5,
            output_schema: None,
            wait_after_action: Duration::ZERO,
            use_screenshot: false,
            use_accessibility_tree: false,
        };

        let run = run_task(
            Arc::new(MockBrowser::new()),
            llm,
            Arc::new(FileManager::new(Vec::new())),
            FilterConfig::default(),
            config,
            CancellationToken::new(),
        )
        .await;

        let system = run.messages.iter().find_map(|m| match m {
            Message::System { content } => content.first().cloned(),
            _ => None,
        });
        let Some(crate::message::Content::Text { text, .. }) = system else { panic!("expected a system message") };
        assert!(text.contains("log in as an administrator"));
    }
}
