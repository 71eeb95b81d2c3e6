//! Accessibility tree: role/name/property view of the page, built from
//! the browser's CDP accessibility snapshot via the same two-pass shape
//! used for the DOM tree (`crate::dom`).

use std::collections::HashMap;

use serde::Deserialize;

pub type AxNodeId = usize;

/// `(type, value, sources)` — the `sources` field is kept as opaque JSON
/// since its shape varies by property and is never interpreted by the
/// filter pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AxValue {
    pub value_type: String,
    pub value: String,
    pub sources: Vec<serde_json::Value>,
}

impl AxValue {
    pub fn new(value_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self { value_type: value_type.into(), value: value.into(), sources: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxProperty {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxNode {
    pub node_id: String,
    pub backend_dom_node_id: Option<i64>,
    pub role: AxValue,
    pub chrome_role: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub value: Option<String>,
    pub properties: Vec<AxProperty>,
    pub ignored: bool,
    pub ignored_reasons: Vec<String>,
    pub frame_id: Option<String>,
    pub children: Vec<AxNodeId>,
    pub parent: Option<AxNodeId>,
}

impl AxNode {
    fn unknown(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            backend_dom_node_id: None,
            role: AxValue::new("role", "unknown"),
            chrome_role: None,
            name: None,
            description: None,
            value: None,
            properties: Vec::new(),
            ignored: false,
            ignored_reasons: Vec::new(),
            frame_id: None,
            children: Vec::new(),
            parent: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AxTree {
    nodes: Vec<AxNode>,
    root: AxNodeId,
}

impl AxTree {
    pub fn new(nodes: Vec<AxNode>, root: AxNodeId) -> Self {
        Self { nodes, root }
    }

    pub fn root_id(&self) -> AxNodeId {
        self.root
    }

    pub fn get(&self, id: AxNodeId) -> &AxNode {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: AxNodeId) -> &mut AxNode {
        &mut self.nodes[id]
    }

    pub fn root(&self) -> &AxNode {
        &self.nodes[self.root]
    }

    pub fn push(&mut self, node: AxNode) -> AxNodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn set_root(&mut self, root: AxNodeId) {
        self.root = root;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nearest ancestor carrying a non-empty `name`, used by the
    /// duplicate-name accessibility filter.
    pub fn nearest_named_ancestor(&self, id: AxNodeId) -> Option<&AxNode> {
        let mut current = self.get(id).parent;
        while let Some(parent_id) = current {
            let parent = self.get(parent_id);
            if parent.name.as_deref().is_some_and(|n| !n.is_empty()) {
                return Some(parent);
            }
            current = parent.parent;
        }
        None
    }
}

// --- CDP accessibility wire shapes -------------------------------------------

#[derive(Debug, Deserialize, Default)]
pub struct CdpAxValue {
    #[serde(rename = "type")]
    pub value_type: Option<String>,
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CdpAxProperty {
    pub name: Option<String>,
    pub value: Option<CdpAxValue>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CdpAxNode {
    pub node_id: String,
    pub backend_dom_node_id: Option<i64>,
    #[serde(default)]
    pub ignored: bool,
    #[serde(default)]
    pub ignored_reasons: Vec<serde_json::Value>,
    pub role: Option<CdpAxValue>,
    pub chrome_role: Option<CdpAxValue>,
    pub name: Option<CdpAxValue>,
    pub description: Option<CdpAxValue>,
    pub value: Option<CdpAxValue>,
    #[serde(default)]
    pub properties: Vec<CdpAxProperty>,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub child_ids: Vec<String>,
    pub frame_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CdpAxSnapshot {
    #[serde(default)]
    pub nodes: Vec<CdpAxNode>,
}

fn ax_value_to_string(v: &Option<CdpAxValue>) -> Option<String> {
    v.as_ref().and_then(|v| v.value.as_ref()).map(|val| match val {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Parses a raw CDP accessibility snapshot into an `AxTree`.
///
/// Pass 1 builds every `AxNode` (role defaults to `"unknown"` when missing
/// or empty). Pass 2 wires `child_ids` into `children`/`parent` and picks
/// the root: the first node whose `parent_id` is absent or unresolvable;
/// falling back to the first node in the snapshot, or a synthetic root if
/// the snapshot is empty.
pub fn parse_cdp_accessibility(snapshot: &CdpAxSnapshot) -> AxTree {
    if snapshot.nodes.is_empty() {
        return AxTree::new(vec![AxNode::unknown("root")], 0);
    }

    let mut arena: Vec<AxNode> = Vec::with_capacity(snapshot.nodes.len());
    let mut id_by_node_id: HashMap<String, AxNodeId> = HashMap::new();

    for raw in &snapshot.nodes {
        let role_str = ax_value_to_string(&raw.role).filter(|s| !s.is_empty()).unwrap_or_else(|| "unknown".to_string());
        let node = AxNode {
            node_id: raw.node_id.clone(),
            backend_dom_node_id: raw.backend_dom_node_id,
            role: AxValue::new("role", role_str),
            chrome_role: ax_value_to_string(&raw.chrome_role),
            name: ax_value_to_string(&raw.name),
            description: ax_value_to_string(&raw.description),
            value: ax_value_to_string(&raw.value),
            properties: raw
                .properties
                .iter()
                .filter_map(|p| {
                    let name = p.name.clone()?;
                    let value = ax_value_to_string(&p.value).unwrap_or_default();
                    Some(AxProperty { name, value })
                })
                .collect(),
            ignored: raw.ignored,
            ignored_reasons: raw
                .ignored_reasons
                .iter()
                .map(|r| match r {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            frame_id: raw.frame_id.clone(),
            children: Vec::new(),
            parent: None,
        };
        let id = arena.len();
        arena.push(node);
        id_by_node_id.insert(raw.node_id.clone(), id);
    }

    let mut root: Option<AxNodeId> = None;

    for (i, raw) in snapshot.nodes.iter().enumerate() {
        let id = id_by_node_id[&raw.node_id];
        let has_valid_parent = raw
            .parent_id
            .as_ref()
            .is_some_and(|p| id_by_node_id.contains_key(p));

        if !has_valid_parent && root.is_none() {
            root = Some(id);
        }

        for child_node_id in &raw.child_ids {
            if let Some(&child_id) = id_by_node_id.get(child_node_id) {
                arena[id].children.push(child_id);
                arena[child_id].parent = Some(id);
            }
        }
        let _ = i;
    }

    let root = root.unwrap_or(0);
    AxTree::new(arena, root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CdpAxSnapshot {
        CdpAxSnapshot {
            nodes: vec![
                CdpAxNode {
                    node_id: "1".into(),
                    role: Some(CdpAxValue { value_type: Some("role".into()), value: Some("WebArea".into()) }),
                    child_ids: vec!["2".into()],
                    ..Default::default()
                },
                CdpAxNode {
                    node_id: "2".into(),
                    role: Some(CdpAxValue { value_type: Some("role".into()), value: Some("button".into()) }),
                    name: Some(CdpAxValue { value_type: Some("computedString".into()), value: Some("Submit".into()) }),
                    parent_id: Some("1".into()),
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn wires_parent_child_and_finds_root() {
        let tree = parse_cdp_accessibility(&sample());
        assert_eq!(tree.root().role.value, "WebArea");
        assert_eq!(tree.root().children.len(), 1);
        let child = tree.get(tree.root().children[0]);
        assert_eq!(child.name.as_deref(), Some("Submit"));
        assert_eq!(child.parent, Some(tree.root_id()));
    }

    #[test]
    fn missing_role_defaults_to_unknown() {
        let snapshot = CdpAxSnapshot { nodes: vec![CdpAxNode { node_id: "1".into(), ..Default::default() }] };
        let tree = parse_cdp_accessibility(&snapshot);
        assert_eq!(tree.root().role.value, "unknown");
    }

    #[test]
    fn empty_snapshot_yields_synthetic_root() {
        let tree = parse_cdp_accessibility(&CdpAxSnapshot::default());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().role.value, "unknown");
    }
}
