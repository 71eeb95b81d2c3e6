//! Public `Agent` API: the caller-facing surface built on top of the
//! Worker/Verifier/Task Runner. One `Agent` owns one browser page and one
//! LLM adapter for its whole lifetime; everything else is per-call.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::browser::BrowserPort;
use crate::cancel::CancellationToken;
use crate::error::AgentError;
use crate::filters::FilterConfig;
use crate::llm::LlmAdapter;
use crate::runner::{run_task, RunConfig};
use crate::tools::FileManager;
use crate::types::{AgentOptions, Run, RunStatus, Verdict};
use crate::verifier::{verdict_from_run, verify};

/// A handle to an element resolved by `Agent::select`. Carries the
/// driver-side handle a `BrowserPort` implementation understands, not the
/// observation-time `tag-N` id (which is only valid for one snapshot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub handle: String,
}

/// One logical agent: a page, an LLM adapter, and the options that shape
/// every run it drives.
///
/// Multi-page window management (opening/closing tabs, following popups) is
/// a caller policy and out of scope here; `Agent` only tracks *which* page
/// is currently active and the set the caller has registered with it. Page
/// state (ElementIndex, in-flight tool calls) is always scoped to whichever
/// page was current when a run started — `set_page` is disallowed mid-step
/// by virtue of the Worker holding its own `Arc<dyn BrowserPort>` clone for
/// the duration of a run.
pub struct Agent {
    page: Mutex<Arc<dyn BrowserPort>>,
    pages: Mutex<Vec<Arc<dyn BrowserPort>>>,
    llm: Arc<dyn LlmAdapter>,
    options: AgentOptions,
    files: Arc<FileManager>,
    filter_config: FilterConfig,
    cancel: CancellationToken,
}

impl Agent {
    pub fn new(llm: Arc<dyn LlmAdapter>, page: Arc<dyn BrowserPort>, options: AgentOptions) -> Self {
        let files = Arc::new(FileManager::new(options.files.clone()));
        Self {
            pages: Mutex::new(vec![page.clone()]),
            page: Mutex::new(page),
            llm,
            options,
            files,
            filter_config: FilterConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Cancels the run currently in flight, if any. Cooperative: takes
    /// effect at the next suspension point the Worker polls.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn current_page(&self) -> Arc<dyn BrowserPort> {
        self.page.lock().expect("page lock poisoned").clone()
    }

    /// Swaps the active page. The new page is added to `get_pages()` if not
    /// already tracked. Takes effect for the *next* run; a run already in
    /// flight keeps the page it started with.
    pub fn set_page(&self, page: Arc<dyn BrowserPort>) {
        let mut pages = self.pages.lock().expect("pages lock poisoned");
        if !pages.iter().any(|p| Arc::ptr_eq(p, &page)) {
            pages.push(page.clone());
        }
        *self.page.lock().expect("page lock poisoned") = page;
    }

    /// All pages this agent has ever been pointed at, in registration order.
    pub fn get_pages(&self) -> Vec<Arc<dyn BrowserPort>> {
        self.pages.lock().expect("pages lock poisoned").clone()
    }

    pub fn page_count(&self) -> usize {
        self.pages.lock().expect("pages lock poisoned").len()
    }

    /// Navigates to `url`, prepending `https://` when no scheme is given.
    pub async fn goto(&self, url: &str) -> Result<(), AgentError> {
        self.current_page().goto(&normalize_url(url)).await
    }

    /// Drives a task to completion. Returns the `Run` on success; on an
    /// aborted run, returns `Err(AgentError::TaskAborted(feedback))`.
    pub async fn do_task(&self, task: &str, max_steps: Option<usize>, output_schema: Option<Value>) -> Result<Run, AgentError> {
        let config = RunConfig {
            task_description: task.to_string(),
            max_steps: max_steps.unwrap_or(self.options.max_steps),
            output_schema,
            wait_after_action: self.options.wait_after_action,
            use_screenshot: self.options.use_screenshot,
            use_accessibility_tree: self.options.use_accessibility_tree,
        };

        let run = run_task(self.current_page(), self.llm.clone(), self.files.clone(), self.filter_config.clone(), config, self.cancel.clone()).await;

        match run.status {
            RunStatus::Aborted => Err(AgentError::TaskAborted(run.feedback)),
            RunStatus::Completed | RunStatus::Exhausted => Ok(run),
        }
    }

    /// Checks whether `condition` currently holds on the page. An aborted
    /// verification run (LLM failure, cancellation, explicit abort) is
    /// surfaced as `Err(AgentError::VerificationAborted)`, symmetric with
    /// `do_task`/`extract` — it is never collapsed into `Verdict { passed:
    /// false }`, which would conflate "condition is false" with "could not
    /// be checked".
    pub async fn verify(&self, condition: &str) -> Result<Verdict, AgentError> {
        let run = verify(self.current_page(), self.llm.clone(), condition, self.options.max_steps, self.filter_config.clone(), self.cancel.clone()).await;

        match run.status {
            RunStatus::Aborted => Err(AgentError::VerificationAborted(run.feedback)),
            RunStatus::Completed | RunStatus::Exhausted => Ok(verdict_from_run(&run)),
        }
    }

    /// Extracts free-form text (no `schema`) or a schema-validated JSON
    /// value from the page by running a restricted, read-only task whose
    /// `complete_work` output is the extracted value.
    pub async fn extract(&self, query: &str, schema: Option<Value>) -> Result<Value, AgentError> {
        let task = format!(
            "Extract the following from the current page, then call `complete_work` with the \
             extracted value as `output`: {query}"
        );
        let config = RunConfig {
            task_description: task,
            max_steps: self.options.max_steps,
            output_schema: schema,
            wait_after_action: self.options.wait_after_action,
            use_screenshot: self.options.use_screenshot,
            use_accessibility_tree: self.options.use_accessibility_tree,
        };

        let run = run_task(self.current_page(), self.llm.clone(), self.files.clone(), self.filter_config.clone(), config, self.cancel.clone()).await;

        match run.status {
            RunStatus::Aborted => Err(AgentError::ExtractionAborted(run.feedback)),
            RunStatus::Completed | RunStatus::Exhausted => Ok(run.output.unwrap_or(Value::Null)),
        }
    }

    pub async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, AgentError> {
        Ok(self.current_page().screenshot(full_page).await?.bytes)
    }

    pub async fn wait(&self, seconds: f64) {
        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
    }

    pub async fn select(&self, description: &str) -> Result<ElementHandle, AgentError> {
        Ok(ElementHandle { handle: self.current_page().select(description).await? })
    }
}

fn normalize_url(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockBrowser;
    use crate::llm::{MockAdapter, ScriptedTurn};
    use serde_json::{json, Map};

    fn agent(llm: Arc<dyn LlmAdapter>) -> Agent {
        Agent::new(llm, Arc::new(MockBrowser::new()), AgentOptions { use_screenshot: false, use_accessibility_tree: false, ..Default::default() })
    }

    #[test]
    fn goto_adds_a_scheme_when_none_is_present() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
    }

    #[tokio::test]
    async fn do_task_returns_the_run_on_completion() {
        let mut args = Map::new();
        args.insert("feedback".into(), json!("done"));
        let llm = Arc::new(MockAdapter::new(vec![ScriptedTurn::tool("1", "complete_work", args)]));

        let run = agent(llm).do_task("add an item to the cart", None, None).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn do_task_surfaces_an_abort_as_a_task_aborted_error() {
        let mut args = Map::new();
        args.insert("reason".into(), json!("out of stock"));
        let llm = Arc::new(MockAdapter::new(vec![ScriptedTurn::tool("1", "abort_work", args)]));

        let err = agent(llm).do_task("buy the item", None, None).await.unwrap_err();
        assert!(matches!(err, AgentError::TaskAborted(reason) if reason == "out of stock"));
    }

    #[tokio::test]
    async fn verify_returns_a_verdict() {
        let mut args = Map::new();
        args.insert("verified".into(), json!(true));
        args.insert("feedback".into(), json!("yes"));
        let llm = Arc::new(MockAdapter::new(vec![ScriptedTurn::tool("1", "complete_work", args)]));

        let verdict = agent(llm).verify("the cart has one item").await.unwrap();
        assert!(verdict.passed);
    }

    #[tokio::test]
    async fn verify_surfaces_an_aborted_run_as_a_verification_aborted_error_not_a_false_verdict() {
        // An empty script means the LLM call itself fails (no programmed
        // turn), which is a run-abort, not a "condition is false" result.
        let llm: Arc<dyn LlmAdapter> = Arc::new(MockAdapter::new(vec![]));

        let err = agent(llm).verify("the cart has one item").await.unwrap_err();
        assert!(matches!(err, AgentError::VerificationAborted(_)));
    }

    #[tokio::test]
    async fn extract_returns_the_schema_matched_output() {
        let mut args = Map::new();
        args.insert("feedback".into(), json!("extracted"));
        args.insert("output".into(), json!("Wireless Mouse"));
        let llm = Arc::new(MockAdapter::new(vec![ScriptedTurn::tool("1", "complete_work", args)]));

        let value = agent(llm).extract("the product title", None).await.unwrap();
        assert_eq!(value, json!("Wireless Mouse"));
    }

    #[test]
    fn set_page_tracks_new_pages_and_switches_the_active_one() {
        let llm: Arc<dyn LlmAdapter> = Arc::new(MockAdapter::new(vec![]));
        let a = agent(llm);
        assert_eq!(a.page_count(), 1);

        let second = Arc::new(MockBrowser::new());
        a.set_page(second.clone());
        assert_eq!(a.page_count(), 2);
        assert!(Arc::ptr_eq(&a.current_page(), &(second.clone() as Arc<dyn BrowserPort>)));

        // Re-setting an already-tracked page does not duplicate it.
        a.set_page(second);
        assert_eq!(a.page_count(), 2);
    }
}
