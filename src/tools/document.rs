//! Whole-document tools: actions that operate on the page rather than on a
//! specific element or screen coordinate.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{Tool, ToolDeps, ToolOutcome};

/// Scrolls half a viewport extent per call. Half, not a full page, so the
/// element that was at the bottom edge is still visible at the top of the
/// next observation instead of being skipped over.
const SCROLL_FRACTION: f64 = 0.5;

pub struct ScrollDocument;

#[async_trait]
impl Tool for ScrollDocument {
    fn name(&self) -> &str {
        "scroll_document"
    }
    fn description(&self) -> &str {
        "Scroll the whole page up, down, left, or right by half a viewport."
    }
    fn params_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"direction": {"type": "string", "enum": ["up", "down", "left", "right"]}},
            "required": ["direction"],
        })
    }
    async fn execute(&self, params: Map<String, Value>, deps: &ToolDeps) -> ToolOutcome {
        let Some(direction) = params.get("direction").and_then(Value::as_str) else {
            return ToolOutcome::error("missing 'direction'");
        };
        let viewport = deps.browser.viewport_size();
        let (dx, dy) = match direction {
            "up" => (0.0, -viewport.height * SCROLL_FRACTION),
            "down" => (0.0, viewport.height * SCROLL_FRACTION),
            "left" => (-viewport.width * SCROLL_FRACTION, 0.0),
            "right" => (viewport.width * SCROLL_FRACTION, 0.0),
            other => return ToolOutcome::error(format!("invalid direction '{other}'")),
        };
        let center_x = viewport.width / 2.0;
        let center_y = viewport.height / 2.0;
        match deps.browser.mouse_wheel(center_x, center_y, dx, dy).await {
            Ok(()) => ToolOutcome::success(format!("scrolled document {direction}")),
            Err(e) => ToolOutcome::error(e.to_string()),
        }
    }
}
