//! Pixel-action tools: coordinate-based actions scaled from the LLM's
//! viewport frame into the browser's device-pixel frame before dispatch.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::browser::scale_coordinates;
use crate::error::AgentError;

use super::{Tool, ToolDeps, ToolOutcome};

fn xy(params: &Map<String, Value>) -> Result<(f64, f64), String> {
    let x = params.get("x").and_then(Value::as_f64).ok_or("missing numeric 'x'")?;
    let y = params.get("y").and_then(Value::as_f64).ok_or("missing numeric 'y'")?;
    Ok((x, y))
}

fn xy_result(r: Result<(f64, f64), String>) -> Result<(f64, f64), ToolOutcome> {
    r.map_err(ToolOutcome::error)
}

pub struct ClickAt;

#[async_trait]
impl Tool for ClickAt {
    fn name(&self) -> &str {
        "click_at"
    }
    fn description(&self) -> &str {
        "Click at the given screen coordinates."
    }
    fn params_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"x": {"type": "number"}, "y": {"type": "number"}},
            "required": ["x", "y"],
        })
    }
    async fn execute(&self, params: Map<String, Value>, deps: &ToolDeps) -> ToolOutcome {
        let (x, y) = match xy_result(xy(&params)) {
            Ok(v) => v,
            Err(e) => return e,
        };
        let (sx, sy) = scale_coordinates(x, y, &deps.browser.viewport_size());
        match deps.browser.mouse_click(sx, sy).await {
            Ok(()) => ToolOutcome::success(format!("clicked at ({x}, {y})")),
            Err(AgentError::Browser(msg)) => ToolOutcome::error(msg),
            Err(e) => ToolOutcome::error(e.to_string()),
        }
    }
}

pub struct HoverAt;

#[async_trait]
impl Tool for HoverAt {
    fn name(&self) -> &str {
        "hover_at"
    }
    fn description(&self) -> &str {
        "Move the mouse over the given screen coordinates without clicking."
    }
    fn params_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"x": {"type": "number"}, "y": {"type": "number"}},
            "required": ["x", "y"],
        })
    }
    async fn execute(&self, params: Map<String, Value>, deps: &ToolDeps) -> ToolOutcome {
        let (x, y) = match xy_result(xy(&params)) {
            Ok(v) => v,
            Err(e) => return e,
        };
        let (sx, sy) = scale_coordinates(x, y, &deps.browser.viewport_size());
        match deps.browser.mouse_move(sx, sy).await {
            Ok(()) => ToolOutcome::success(format!("hovering at ({x}, {y})")),
            Err(e) => ToolOutcome::error(e.to_string()),
        }
    }
}

pub struct ScrollAt;

#[async_trait]
impl Tool for ScrollAt {
    fn name(&self) -> &str {
        "scroll_at"
    }
    fn description(&self) -> &str {
        "Scroll the page from the given screen coordinates in a direction."
    }
    fn params_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "x": {"type": "number"},
                "y": {"type": "number"},
                "direction": {"type": "string", "enum": ["up", "down", "left", "right"]},
                "magnitude": {"type": "number"},
            },
            "required": ["x", "y", "direction"],
        })
    }
    async fn execute(&self, params: Map<String, Value>, deps: &ToolDeps) -> ToolOutcome {
        let (x, y) = match xy_result(xy(&params)) {
            Ok(v) => v,
            Err(e) => return e,
        };
        let Some(direction) = params.get("direction").and_then(Value::as_str) else {
            return ToolOutcome::error("missing 'direction'");
        };
        let magnitude = params.get("magnitude").and_then(Value::as_f64).unwrap_or(800.0);
        let (dx, dy) = match direction {
            "up" => (0.0, -magnitude),
            "down" => (0.0, magnitude),
            "left" => (-magnitude, 0.0),
            "right" => (magnitude, 0.0),
            other => return ToolOutcome::error(format!("invalid direction '{other}'")),
        };
        let (sx, sy) = scale_coordinates(x, y, &deps.browser.viewport_size());
        match deps.browser.mouse_wheel(sx, sy, dx, dy).await {
            Ok(()) => ToolOutcome::success(format!("scrolled {direction} from ({x}, {y})")),
            Err(e) => ToolOutcome::error(e.to_string()),
        }
    }
}

pub struct DragAndDrop;

#[async_trait]
impl Tool for DragAndDrop {
    fn name(&self) -> &str {
        "drag_and_drop"
    }
    fn description(&self) -> &str {
        "Drag from one point on screen and drop at another."
    }
    fn params_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "from_x": {"type": "number"}, "from_y": {"type": "number"},
                "to_x": {"type": "number"}, "to_y": {"type": "number"},
            },
            "required": ["from_x", "from_y", "to_x", "to_y"],
        })
    }
    async fn execute(&self, params: Map<String, Value>, deps: &ToolDeps) -> ToolOutcome {
        let get = |k: &str| params.get(k).and_then(Value::as_f64).ok_or_else(|| format!("missing numeric '{k}'"));
        let (from_x, from_y, to_x, to_y) = match (get("from_x"), get("from_y"), get("to_x"), get("to_y")) {
            (Ok(a), Ok(b), Ok(c), Ok(d)) => (a, b, c, d),
            (a, b, c, d) => return ToolOutcome::error([a, b, c, d].into_iter().filter_map(Result::err).next().unwrap()),
        };
        let viewport = deps.browser.viewport_size();
        let (sfx, sfy) = scale_coordinates(from_x, from_y, &viewport);
        let (stx, sty) = scale_coordinates(to_x, to_y, &viewport);
        match deps.browser.mouse_drag(sfx, sfy, stx, sty).await {
            Ok(()) => ToolOutcome::success(format!("dragged ({from_x}, {from_y}) -> ({to_x}, {to_y})")),
            Err(e) => ToolOutcome::error(e.to_string()),
        }
    }
}
