//! Verifier: a restricted `Worker` used for `agent.verify(condition)`. Its
//! toolset only permits read-only observation (`observe`, `think`, `wait`)
//! plus its own terminal tool, so a verification run can look at the page
//! but never change it.

use std::sync::Arc;
use std::time::Duration;

use crate::browser::BrowserPort;
use crate::cancel::CancellationToken;
use crate::filters::FilterConfig;
use crate::llm::LlmAdapter;
use crate::message::Message;
use crate::tools::terminal::VerifyComplete;
use crate::tools::utility::{Observe, Think, Wait};
use crate::tools::{FileManager, ToolRegistry};
use crate::types::Run;
use crate::worker::Worker;

fn restricted_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(Observe));
    registry.register(Arc::new(Think));
    registry.register(Arc::new(Wait));
    registry.register(Arc::new(VerifyComplete));
    registry
}

/// Drives a condition check using the same step state machine as a task
/// run, over a toolset with no side-effecting actions. Returns the raw
/// `Run` so the caller can distinguish an aborted run (which must surface
/// as `AgentError::VerificationAborted`, not as a false verdict) from a
/// completed one.
pub async fn verify(
    browser: Arc<dyn BrowserPort>,
    llm: Arc<dyn LlmAdapter>,
    condition: &str,
    max_steps: usize,
    filter_config: FilterConfig,
    cancel: CancellationToken,
) -> Run {
    let system = crate::prompt::build_system_prompt(
        "Determine whether the following condition currently holds on the page, \
         then call `complete_work` with your verdict and feedback explaining it.",
        "",
    );
    let mut messages = vec![Message::system(system), Message::user(vec![crate::message::Content::text(condition)])];

    let worker = Worker {
        browser,
        llm,
        registry: restricted_registry(),
        files: Arc::new(FileManager::new(Vec::new())),
        filter_config,
        wait_after_action: Duration::ZERO,
        max_steps,
        use_screenshot: true,
        use_accessibility_tree: true,
        cancel,
    };

    worker.run(&mut messages).await
}

/// Reduces a completed/exhausted `Run` to a `Verdict`. Callers must check
/// `run.status` for `Aborted` themselves before calling this — an aborted
/// run has no verdict to reduce to.
pub fn verdict_from_run(run: &Run) -> crate::types::Verdict {
    let passed = match (run.is_completed(), &run.output) {
        (true, Some(serde_json::Value::Bool(verified))) => *verified,
        _ => false,
    };
    crate::types::Verdict { passed, feedback: run.feedback.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockBrowser;
    use crate::llm::{MockAdapter, ScriptedTurn};
    use serde_json::{json, Map};

    #[tokio::test]
    async fn a_passing_verdict_surfaces_the_boolean_output_and_feedback() {
        let mut args = Map::new();
        args.insert("verified".into(), json!(true));
        args.insert("feedback".into(), json!("the banner is visible"));
        let llm = Arc::new(MockAdapter::new(vec![ScriptedTurn::tool("1", "complete_work", args)]));

        let run = verify(Arc::new(MockBrowser::new()), llm, "a banner is visible", 5, FilterConfig::default(), CancellationToken::new()).await;
        let verdict = verdict_from_run(&run);

        assert!(verdict.passed);
        assert_eq!(verdict.feedback, "the banner is visible");
    }

    #[tokio::test]
    async fn a_failing_verdict_is_not_passed() {
        let mut args = Map::new();
        args.insert("verified".into(), json!(false));
        args.insert("feedback".into(), json!("no banner found"));
        let llm = Arc::new(MockAdapter::new(vec![ScriptedTurn::tool("1", "complete_work", args)]));

        let run = verify(Arc::new(MockBrowser::new()), llm, "a banner is visible", 5, FilterConfig::default(), CancellationToken::new()).await;

        assert!(!verdict_from_run(&run).passed);
    }

    #[tokio::test]
    async fn an_aborted_run_is_not_completed() {
        let mut args = Map::new();
        args.insert("reason".into(), json!("page crashed"));
        let llm = Arc::new(MockAdapter::new(vec![ScriptedTurn::tool("1", "abort_work", args)]));

        // abort_work isn't in the restricted registry, so the dispatcher
        // reports a tool-not-found error that never clears, and the run
        // exhausts its step budget instead of completing.
        let run = verify(Arc::new(MockBrowser::new()), llm, "anything", 1, FilterConfig::default(), CancellationToken::new()).await;

        assert!(!run.is_completed());
        assert!(!verdict_from_run(&run).passed);
    }

    #[tokio::test]
    async fn a_genuinely_aborted_run_reports_aborted_status() {
        // An empty script means the very first LLM call has nothing
        // programmed to return, which MockAdapter surfaces as an
        // LlmProtocol error — the Worker maps that to an aborted run.
        let llm: Arc<dyn LlmAdapter> = Arc::new(MockAdapter::new(vec![]));

        let run = verify(Arc::new(MockBrowser::new()), llm, "anything", 5, FilterConfig::default(), CancellationToken::new()).await;

        assert_eq!(run.status, crate::types::RunStatus::Aborted);
    }
}
