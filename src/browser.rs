//! Browser port: the minimal interface the core consumes from a real
//! browser driver. Out of scope per the design brief — this module only
//! defines the trait and a handful of supporting value types; no concrete
//! CDP/WebDriver client ships here.

use async_trait::async_trait;

use crate::ax::AxTree;
use crate::dom::{CdpSnapshot, DomTree};
use crate::error::AgentError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
    /// CSS-pixel-to-device-pixel ratio, used by pixel-action tools to scale
    /// LLM-frame coordinates into the browser's device-pixel frame.
    pub scale_factor: f64,
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self { width: 1280.0, height: 800.0, scale_factor: 1.0 }
    }
}

/// A page screenshot. `bytes` is raw PNG data — callers base64-encode it
/// when attaching it as observation content.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub bytes: Vec<u8>,
}

/// The page object the agent drives. Implementations own a real browser
/// tab/page; the core never constructs one itself.
#[async_trait]
pub trait BrowserPort: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), AgentError>;
    fn url(&self) -> String;
    fn viewport_size(&self) -> ViewportSize;

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, AgentError>;
    async fn screenshot(&self, full_page: bool) -> Result<Screenshot, AgentError>;

    async fn mouse_click(&self, x: f64, y: f64) -> Result<(), AgentError>;
    async fn mouse_move(&self, x: f64, y: f64) -> Result<(), AgentError>;
    async fn mouse_wheel(&self, x: f64, y: f64, dx: f64, dy: f64) -> Result<(), AgentError>;
    async fn mouse_drag(&self, from_x: f64, from_y: f64, to_x: f64, to_y: f64) -> Result<(), AgentError>;

    async fn dom_snapshot(&self) -> Result<CdpSnapshot, AgentError>;
    async fn ax_snapshot(&self) -> Result<AxTree, AgentError>;

    /// Resolves a free-form description to an element handle's id, used by
    /// `agent.select`. Backed by the driver's own locator strategy.
    async fn select(&self, description: &str) -> Result<String, AgentError>;

    /// Element-scoped actions; `element_id` is the browser-side handle the
    /// driver resolved, not the observation-time `tag-N` id.
    async fn fill(&self, element_id: &str, value: &str) -> Result<(), AgentError>;
    async fn type_text(&self, element_id: &str, text: &str) -> Result<(), AgentError>;
    async fn click_element(&self, element_id: &str) -> Result<(), AgentError>;
    async fn upload_single(&self, element_id: &str, path: &str) -> Result<(), AgentError>;
    async fn upload_multiple(&self, element_id: &str, paths: &[String]) -> Result<(), AgentError>;

    fn dom_node_handle(&self, node_id: Option<i64>) -> Option<String>;
}

/// Scales a coordinate from the LLM's viewport frame into the browser's
/// device-pixel frame using the session's scale factor.
pub fn scale_coordinates(x: f64, y: f64, viewport: &ViewportSize) -> (f64, f64) {
    (x * viewport.scale_factor, y * viewport.scale_factor)
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// In-memory `BrowserPort` used by unit/integration tests — records
    /// every call it receives rather than driving a real page.
    #[derive(Default)]
    pub struct MockBrowser {
        pub current_url: Mutex<String>,
        pub viewport: ViewportSize,
        pub calls: Mutex<Vec<String>>,
        pub dom: Mutex<Option<CdpSnapshot>>,
        pub ax: Mutex<Option<AxTree>>,
    }

    impl MockBrowser {
        pub fn new() -> Self {
            Self {
                current_url: Mutex::new(String::new()),
                viewport: ViewportSize::default(),
                calls: Mutex::new(Vec::new()),
                dom: Mutex::new(None),
                ax: Mutex::new(None),
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BrowserPort for MockBrowser {
        async fn goto(&self, url: &str) -> Result<(), AgentError> {
            *self.current_url.lock().unwrap() = url.to_string();
            self.calls.lock().unwrap().push(format!("goto({url})"));
            Ok(())
        }

        fn url(&self) -> String {
            self.current_url.lock().unwrap().clone()
        }

        fn viewport_size(&self) -> ViewportSize {
            self.viewport
        }

        async fn evaluate(&self, script: &str) -> Result<serde_json::Value, AgentError> {
            self.calls.lock().unwrap().push(format!("evaluate({script})"));
            Ok(serde_json::Value::Null)
        }

        async fn screenshot(&self, _full_page: bool) -> Result<Screenshot, AgentError> {
            self.calls.lock().unwrap().push("screenshot".to_string());
            Ok(Screenshot { bytes: vec![0x89, b'P', b'N', b'G'] })
        }

        async fn mouse_click(&self, x: f64, y: f64) -> Result<(), AgentError> {
            self.calls.lock().unwrap().push(format!("click({x},{y})"));
            Ok(())
        }

        async fn mouse_move(&self, x: f64, y: f64) -> Result<(), AgentError> {
            self.calls.lock().unwrap().push(format!("move({x},{y})"));
            Ok(())
        }

        async fn mouse_wheel(&self, x: f64, y: f64, dx: f64, dy: f64) -> Result<(), AgentError> {
            self.calls.lock().unwrap().push(format!("wheel({x},{y},{dx},{dy})"));
            Ok(())
        }

        async fn mouse_drag(&self, from_x: f64, from_y: f64, to_x: f64, to_y: f64) -> Result<(), AgentError> {
            self.calls.lock().unwrap().push(format!("drag({from_x},{from_y}->{to_x},{to_y})"));
            Ok(())
        }

        async fn dom_snapshot(&self) -> Result<CdpSnapshot, AgentError> {
            Ok(self.dom.lock().unwrap().clone().unwrap_or_default())
        }

        async fn ax_snapshot(&self) -> Result<AxTree, AgentError> {
            self.ax
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| AgentError::Browser("no ax snapshot configured".into()))
        }

        async fn select(&self, description: &str) -> Result<String, AgentError> {
            Ok(format!("handle-for:{description}"))
        }

        async fn fill(&self, element_id: &str, value: &str) -> Result<(), AgentError> {
            self.calls.lock().unwrap().push(format!("fill({element_id},{value})"));
            Ok(())
        }

        async fn type_text(&self, element_id: &str, text: &str) -> Result<(), AgentError> {
            self.calls.lock().unwrap().push(format!("type({element_id},{text})"));
            Ok(())
        }

        async fn click_element(&self, element_id: &str) -> Result<(), AgentError> {
            self.calls.lock().unwrap().push(format!("click_element({element_id})"));
            Ok(())
        }

        async fn upload_single(&self, element_id: &str, path: &str) -> Result<(), AgentError> {
            self.calls.lock().unwrap().push(format!("upload({element_id},[{path}])"));
            Ok(())
        }

        async fn upload_multiple(&self, element_id: &str, paths: &[String]) -> Result<(), AgentError> {
            self.calls.lock().unwrap().push(format!("upload({element_id},{paths:?})"));
            Ok(())
        }

        fn dom_node_handle(&self, node_id: Option<i64>) -> Option<String> {
            node_id.map(|id| format!("node-{id}"))
        }
    }
}
