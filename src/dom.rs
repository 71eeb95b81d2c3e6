//! In-memory DOM tree: an arena of nodes built from a browser CDP
//! snapshot, plus the two-pass parser that constructs it.
//!
//! Trees are never mutated in place once built — the filter pipeline
//! (`crate::filters`) always produces a fresh `DomTree` from an existing
//! one, which sidesteps the cyclic-ownership problem of parent
//! back-references without reference counting.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

pub type NodeId = usize;

/// A node's bounding box in CSS pixels, as reported by the layout snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Screen-space center point, used by the Element Indexer for pixel actions.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// An ordered child of a `DomNode`: either another element or a text leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum DomChild {
    Element(NodeId),
    Text(String),
}

/// One element node in the DOM tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DomNode {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    /// Only `display`, `visibility`, `opacity` are guaranteed present.
    pub styles: HashMap<String, String>,
    pub bounds: Option<BoundingBox>,
    pub children: Vec<DomChild>,
    pub parent: Option<NodeId>,
    pub metadata: HashMap<String, Value>,
    pub backend_dom_node_id: Option<i64>,
}

impl DomNode {
    fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: HashMap::new(),
            styles: HashMap::new(),
            bounds: None,
            children: Vec::new(),
            parent: None,
            metadata: HashMap::new(),
            backend_dom_node_id: None,
        }
    }

    pub fn cdp_index(&self) -> Option<usize> {
        self.metadata.get("cdp_index").and_then(|v| v.as_u64()).map(|v| v as usize)
    }

    /// Text content if this node has exactly one `Text` child and no element
    /// children — used by the Observation Builder for inline rendering.
    pub fn inline_text(&self) -> Option<&str> {
        if self.children.len() == 1 {
            if let DomChild::Text(t) = &self.children[0] {
                return Some(t);
            }
        }
        None
    }

    pub fn has_meaningful_text(&self) -> bool {
        self.children.iter().any(|c| matches!(c, DomChild::Text(t) if !t.trim().is_empty()))
    }
}

/// Arena-backed DOM tree. `root` indexes into `nodes`.
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<DomNode>,
    root: NodeId,
}

impl DomTree {
    pub fn new(nodes: Vec<DomNode>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> &DomNode {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut DomNode {
        &mut self.nodes[id]
    }

    pub fn root(&self) -> &DomNode {
        &self.nodes[self.root]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Push a node, returning its freshly-assigned id.
    pub fn push(&mut self, node: DomNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    /// Depth-first preorder visit starting at `id`, element nodes only.
    pub fn walk_preorder(&self, id: NodeId, visit: &mut impl FnMut(NodeId, &DomNode)) {
        let node = self.get(id);
        visit(id, node);
        for child in node.children.clone() {
            if let DomChild::Element(child_id) = child {
                self.walk_preorder(child_id, visit);
            }
        }
    }
}

// --- CDP snapshot wire shapes -------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CdpNodes {
    #[serde(default)]
    pub node_type: Vec<i64>,
    #[serde(default)]
    pub node_name: Vec<i64>,
    #[serde(default)]
    pub node_value: Vec<i64>,
    #[serde(default)]
    pub parent_index: Vec<i64>,
    #[serde(default)]
    pub attributes: Vec<Vec<i64>>,
    #[serde(default)]
    pub backend_node_id: Vec<i64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CdpLayout {
    #[serde(default)]
    pub node_index: Vec<i64>,
    #[serde(default)]
    pub bounds: Vec<Vec<f64>>,
    /// Each entry is a list of string-table indices: `[display, visibility, opacity]`.
    #[serde(default)]
    pub styles: Vec<Vec<i64>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CdpDocument {
    #[serde(default)]
    pub nodes: CdpNodes,
    pub layout: Option<CdpLayout>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CdpSnapshot {
    #[serde(default)]
    pub documents: Vec<CdpDocument>,
    #[serde(default)]
    pub strings: Vec<String>,
}

const STYLE_KEYS: [&str; 3] = ["display", "visibility", "opacity"];

/// Resolves string-table indices; out-of-range or negative indices resolve
/// to the empty string rather than panicking.
fn make_resolver(strings: &[String]) -> impl Fn(i64) -> String + '_ {
    move |idx: i64| {
        if idx < 0 {
            return String::new();
        }
        strings.get(idx as usize).cloned().unwrap_or_default()
    }
}

fn parse_layout_data(
    layout: &CdpLayout,
    resolve: &impl Fn(i64) -> String,
) -> HashMap<usize, (Option<BoundingBox>, HashMap<String, String>)> {
    let mut out = HashMap::new();
    for (i, &node_index) in layout.node_index.iter().enumerate() {
        let bounds = layout
            .bounds
            .get(i)
            .filter(|b| b.len() >= 4)
            .map(|b| BoundingBox::new(b[0], b[1], b[2], b[3]));

        let mut styles = HashMap::new();
        if let Some(style_indices) = layout.styles.get(i) {
            for (key, &idx) in STYLE_KEYS.iter().zip(style_indices.iter()) {
                styles.insert((*key).to_string(), resolve(idx));
            }
        }
        out.insert(node_index as usize, (bounds, styles));
    }
    out
}

/// Pass 1: materialize one `DomNode` per element (`nodeType==1`) entry.
/// Non-element entries keep their slot as `None` so indices still line up
/// with the raw CDP arrays for the wiring pass.
fn create_element_nodes(
    nodes: &CdpNodes,
    layout_map: &HashMap<usize, (Option<BoundingBox>, HashMap<String, String>)>,
    resolve: &impl Fn(i64) -> String,
) -> Vec<Option<DomNode>> {
    let count = nodes.node_type.len();
    let mut out = Vec::with_capacity(count);

    for i in 0..count {
        if nodes.node_type[i] != 1 {
            out.push(None);
            continue;
        }

        let tag = resolve(*nodes.node_name.get(i).unwrap_or(&-1)).to_lowercase();
        let mut node = DomNode::new(tag);

        if let Some(pairs) = nodes.attributes.get(i) {
            let mut it = pairs.iter();
            while let (Some(&k), Some(&v)) = (it.next(), it.next()) {
                node.attributes.insert(resolve(k), resolve(v));
            }
        }

        if let Some((bounds, styles)) = layout_map.get(&i) {
            node.bounds = *bounds;
            node.styles = styles.clone();
        }

        node.metadata.insert("cdp_index".to_string(), Value::from(i as u64));
        node.backend_dom_node_id = nodes.backend_node_id.get(i).copied().filter(|v| *v >= 0);

        out.push(Some(node));
    }

    out
}

/// Pass 1b: attach non-whitespace text nodes (`nodeType==3`) to their parent
/// element's children. Invalid/missing parents are silently skipped.
fn add_text_nodes(nodes: &CdpNodes, element_nodes: &mut [Option<DomNode>], resolve: &impl Fn(i64) -> String) {
    for i in 0..nodes.node_type.len() {
        if nodes.node_type[i] != 3 {
            continue;
        }
        let text = resolve(*nodes.node_value.get(i).unwrap_or(&-1));
        if text.trim().is_empty() {
            continue;
        }
        let Some(&parent_idx) = nodes.parent_index.get(i) else { continue };
        if parent_idx < 0 {
            continue;
        }
        if let Some(Some(parent)) = element_nodes.get_mut(parent_idx as usize) {
            parent.children.push(DomChild::Text(text));
        }
    }
}

/// Pass 2: wire parent/child relationships, determine the root, and hand
/// back a populated `DomTree`. The root is the first node whose
/// `parentIndex` is absent or out of range; if none qualifies, the first
/// element node is used as a fallback.
fn build_tree(nodes: &CdpNodes, element_nodes: Vec<Option<DomNode>>) -> DomTree {
    let mut arena: Vec<DomNode> = Vec::new();
    // old cdp-index -> new arena id
    let mut id_map: HashMap<usize, NodeId> = HashMap::new();

    for (i, maybe_node) in element_nodes.into_iter().enumerate() {
        if let Some(node) = maybe_node {
            let id = arena.len();
            arena.push(node);
            id_map.insert(i, id);
        }
    }

    let mut root: Option<NodeId> = None;
    // Fallback root: the first element node in original CDP order.
    let fallback = id_map.values().copied().min_by_key(|id| arena[*id].cdp_index().unwrap_or(usize::MAX));

    for (old_idx, &new_id) in &id_map {
        let parent_idx = nodes.parent_index.get(*old_idx).copied().unwrap_or(-1);
        let has_valid_parent = parent_idx >= 0 && id_map.contains_key(&(parent_idx as usize));

        if !has_valid_parent && root.is_none() {
            root = Some(new_id);
        }

        if let Some(&parent_id) = id_map.get(&(parent_idx as usize)) {
            if has_valid_parent {
                arena[parent_id].children.push(DomChild::Element(new_id));
                arena[new_id].parent = Some(parent_id);
            }
        }
    }

    // children order must follow original cdp_index order (arrays were processed
    // in order, so pushes above are already ascending; text nodes were appended
    // to the same Vec in a separate earlier pass and interleave is acceptable
    // since both passes only append).

    let root = root.or(fallback).unwrap_or(0);
    DomTree::new(arena, root)
}

/// Parses a CDP DOM snapshot into a `DomTree`. Never panics: malformed or
/// empty snapshots degrade to a minimal default tree.
pub fn parse_cdp(snapshot: &CdpSnapshot) -> DomTree {
    let Some(document) = snapshot.documents.first() else {
        let mut root = DomNode::new("html");
        root.metadata.insert("cdp_index".to_string(), Value::from(0u64));
        return DomTree::new(vec![root], 0);
    };

    let resolve = make_resolver(&snapshot.strings);
    let layout_map = document
        .layout
        .as_ref()
        .map(|l| parse_layout_data(l, &resolve))
        .unwrap_or_default();

    let mut element_nodes = create_element_nodes(&document.nodes, &layout_map, &resolve);
    add_text_nodes(&document.nodes, &mut element_nodes, &resolve);
    build_tree(&document.nodes, element_nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> CdpSnapshot {
        // html(0) > div#container(1) > "Hello"(text)
        //        > button(2) > "Click"(text)
        CdpSnapshot {
            strings: vec![
                "html".into(),    // 0
                "div".into(),     // 1
                "id".into(),      // 2
                "container".into(), // 3
                "button".into(), // 4
                "Hello".into(),  // 5
                "Click".into(),  // 6
                "block".into(),  // 7
                "visible".into(), // 8
                "1".into(),      // 9
            ],
            documents: vec![CdpDocument {
                nodes: CdpNodes {
                    node_type: vec![1, 1, 3, 1, 3],
                    node_name: vec![0, 1, -1, 4, -1],
                    node_value: vec![-1, -1, 5, -1, 6],
                    parent_index: vec![-1, 0, 1, 0, 3],
                    attributes: vec![vec![], vec![2, 3], vec![], vec![], vec![]],
                    backend_node_id: vec![],
                },
                layout: Some(CdpLayout {
                    node_index: vec![0, 1, 3],
                    bounds: vec![vec![0.0, 0.0, 1024.0, 768.0], vec![10.0, 10.0, 200.0, 50.0], vec![10.0, 70.0, 100.0, 30.0]],
                    styles: vec![vec![7, 8, 9], vec![7, 8, 9], vec![7, 8, 9]],
                }),
            }],
        }
    }

    #[test]
    fn parses_complete_snapshot() {
        let tree = parse_cdp(&sample_snapshot());
        let root = tree.root();
        assert_eq!(root.tag, "html");
        assert_eq!(root.children.len(), 2);

        let div_id = match root.children[0] {
            DomChild::Element(id) => id,
            _ => panic!("expected element"),
        };
        let div = tree.get(div_id);
        assert_eq!(div.tag, "div");
        assert_eq!(div.attributes.get("id"), Some(&"container".to_string()));
        assert_eq!(div.inline_text(), Some("Hello"));
    }

    #[test]
    fn attaches_layout_information() {
        let tree = parse_cdp(&sample_snapshot());
        assert_eq!(tree.root().bounds, Some(BoundingBox::new(0.0, 0.0, 1024.0, 768.0)));
    }

    #[test]
    fn empty_snapshot_returns_default_root() {
        let tree = parse_cdp(&CdpSnapshot::default());
        assert_eq!(tree.root().tag, "html");
        assert_eq!(tree.root().cdp_index(), Some(0));
    }

    #[test]
    fn out_of_range_string_index_resolves_empty() {
        let resolve = make_resolver(&["a".to_string()]);
        assert_eq!(resolve(-1), "");
        assert_eq!(resolve(5), "");
        assert_eq!(resolve(0), "a");
    }
}
