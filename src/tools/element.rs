//! Element-scoped tools: actions resolved through the current step's
//! `ElementIndex` rather than raw screen coordinates.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{Tool, ToolDeps, ToolOutcome};

/// Resolves an observation-time `tag-N` id to the browser driver's own
/// element handle. The arena `NodeId` doubles as the handle key the mock
/// driver expects; a real driver would map it through the backend DOM node
/// id captured at snapshot time instead.
fn resolve_handle(element_id: &str, deps: &ToolDeps) -> Result<String, String> {
    let entry = deps.element_index.get(element_id).ok_or_else(|| format!("unknown element id '{element_id}'"))?;
    deps.browser
        .dom_node_handle(Some(entry.node_id as i64))
        .ok_or_else(|| format!("element '{element_id}' has no live handle"))
}

fn get_str<'a>(params: &'a Map<String, Value>, key: &str) -> Result<&'a str, String> {
    params.get(key).and_then(Value::as_str).ok_or_else(|| format!("missing '{key}'"))
}

pub struct Click;

#[async_trait]
impl Tool for Click {
    fn name(&self) -> &str {
        "click"
    }
    fn description(&self) -> &str {
        "Click the element with the given id."
    }
    fn params_schema(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {"element_id": {"type": "string"}}, "required": ["element_id"]})
    }
    async fn execute(&self, params: Map<String, Value>, deps: &ToolDeps) -> ToolOutcome {
        let element_id = match get_str(&params, "element_id") {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let handle = match resolve_handle(element_id, deps) {
            Ok(h) => h,
            Err(e) => return ToolOutcome::error(e),
        };
        match deps.browser.click_element(&handle).await {
            Ok(()) => ToolOutcome::success(format!("clicked {element_id}")),
            Err(e) => ToolOutcome::error(e.to_string()),
        }
    }
}

pub struct Fill;

#[async_trait]
impl Tool for Fill {
    fn name(&self) -> &str {
        "fill"
    }
    fn description(&self) -> &str {
        "Set the value of a form field, replacing any existing content."
    }
    fn params_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"element_id": {"type": "string"}, "value": {"type": "string"}},
            "required": ["element_id", "value"],
        })
    }
    async fn execute(&self, params: Map<String, Value>, deps: &ToolDeps) -> ToolOutcome {
        let element_id = match get_str(&params, "element_id") {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let value = match get_str(&params, "value") {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let handle = match resolve_handle(element_id, deps) {
            Ok(h) => h,
            Err(e) => return ToolOutcome::error(e),
        };
        match deps.browser.fill(&handle, value).await {
            Ok(()) => ToolOutcome::success(format!("filled {element_id}")),
            Err(e) => ToolOutcome::error(e.to_string()),
        }
    }
}

pub struct TypeText;

#[async_trait]
impl Tool for TypeText {
    fn name(&self) -> &str {
        "type"
    }
    fn description(&self) -> &str {
        "Type text into the element with the given id, appending to any existing content."
    }
    fn params_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"element_id": {"type": "string"}, "text": {"type": "string"}},
            "required": ["element_id", "text"],
        })
    }
    async fn execute(&self, params: Map<String, Value>, deps: &ToolDeps) -> ToolOutcome {
        let element_id = match get_str(&params, "element_id") {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let text = match get_str(&params, "text") {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let handle = match resolve_handle(element_id, deps) {
            Ok(h) => h,
            Err(e) => return ToolOutcome::error(e),
        };
        match deps.browser.type_text(&handle, text).await {
            Ok(()) => ToolOutcome::success(format!("typed into {element_id}")),
            Err(e) => ToolOutcome::error(e.to_string()),
        }
    }
}

pub struct Upload;

#[async_trait]
impl Tool for Upload {
    fn name(&self) -> &str {
        "upload"
    }
    fn description(&self) -> &str {
        "Upload one or more of the task's available files to the element with the given id."
    }
    fn params_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "element_id": {"type": "string"},
                "file_indexes": {"type": "array", "items": {"type": "integer"}},
            },
            "required": ["element_id", "file_indexes"],
        })
    }
    async fn execute(&self, params: Map<String, Value>, deps: &ToolDeps) -> ToolOutcome {
        let element_id = match get_str(&params, "element_id") {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let Some(indexes) = params.get("file_indexes").and_then(Value::as_array) else {
            return ToolOutcome::error("missing 'file_indexes'");
        };
        let indexes: Result<Vec<i64>, String> =
            indexes.iter().map(|v| v.as_i64().ok_or_else(|| "file_indexes must be integers".to_string())).collect();
        let indexes = match indexes {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };

        let paths = match deps.files.get_paths(&indexes) {
            Ok(p) => p,
            Err(e) => return ToolOutcome::error(e),
        };
        let handle = match resolve_handle(element_id, deps) {
            Ok(h) => h,
            Err(e) => return ToolOutcome::error(e),
        };

        let result = match paths.as_slice() {
            [single] => deps.browser.upload_single(&handle, single).await,
            many => deps.browser.upload_multiple(&handle, many).await,
        };
        match result {
            Ok(()) => ToolOutcome::success(format!("uploaded {} file(s) to {element_id}", paths.len())),
            Err(e) => ToolOutcome::error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockBrowser;
    use crate::dom::{BoundingBox, DomChild, DomNode, DomTree};
    use crate::indexer::build_element_index;
    use crate::tools::FileManager;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn indexed_deps(files: Vec<String>) -> ToolDeps {
        let node = DomNode {
            tag: "button".into(),
            attributes: HashMap::new(),
            styles: HashMap::new(),
            bounds: Some(BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
            children: vec![DomChild::Text("Go".into())],
            parent: None,
            metadata: HashMap::new(),
            backend_dom_node_id: None,
        };
        let tree = DomTree::new(vec![node], 0);
        let element_index = build_element_index(&tree);
        ToolDeps { browser: Arc::new(MockBrowser::new()), element_index, files: Arc::new(FileManager::new(files)) }
    }

    #[tokio::test]
    async fn click_unknown_element_id_is_an_error() {
        let deps = indexed_deps(vec![]);
        let mut params = Map::new();
        params.insert("element_id".into(), Value::String("button-9".into()));
        let outcome = Click.execute(params, &deps).await;
        assert!(matches!(outcome, ToolOutcome::Error(_)));
    }

    #[tokio::test]
    async fn click_known_element_succeeds() {
        let deps = indexed_deps(vec![]);
        let mut params = Map::new();
        params.insert("element_id".into(), Value::String("button-0".into()));
        let outcome = Click.execute(params, &deps).await;
        assert!(matches!(outcome, ToolOutcome::Success(_)));
    }

    #[tokio::test]
    async fn upload_out_of_range_index_is_an_error() {
        let deps = indexed_deps(vec!["a.png".into()]);
        let mut params = Map::new();
        params.insert("element_id".into(), Value::String("button-0".into()));
        params.insert("file_indexes".into(), Value::Array(vec![Value::from(5)]));
        let outcome = Upload.execute(params, &deps).await;
        match outcome {
            ToolOutcome::Error(msg) => assert!(msg.contains("out of range")),
            _ => panic!("expected error"),
        }
    }

    #[tokio::test]
    async fn upload_single_file_uses_single_path_call() {
        let deps = indexed_deps(vec!["a.png".into()]);
        let mut params = Map::new();
        params.insert("element_id".into(), Value::String("button-0".into()));
        params.insert("file_indexes".into(), Value::Array(vec![Value::from(0)]));
        let outcome = Upload.execute(params, &deps).await;
        assert!(matches!(outcome, ToolOutcome::Success(_)));
    }
}
