//! Observation Builder: turns a filtered DOM tree + its `ElementIndex`
//! into the text-plus-screenshot bundle appended to the conversation each
//! step.

use base64::Engine;

use crate::ax::AxTree;
use crate::dom::{DomChild, DomNode, DomTree};
use crate::indexer::{build_element_index, ElementIndex};
use crate::message::{Content, ImageMime};

pub const OBSERVATION_TAG: &str = "observation";
pub const OBSERVATION_LIFESPAN: u32 = 2;

/// One step's observation: the serialized tree, the element index it was
/// built against, and the paired screenshot.
pub struct Observation {
    pub text: Content,
    pub image: Option<Content>,
    pub element_index: ElementIndex,
}

/// Serializes `tree` into the indented `[id] <tag attrs…> text` form and
/// builds the `ElementIndex` alongside it in one preorder walk so ids stay
/// consistent between the two.
pub fn serialize_tree(tree: &DomTree) -> (String, ElementIndex) {
    let index = build_element_index(tree);
    let mut out = String::new();
    render_node(tree, tree.root_id(), 0, &index, &mut out);
    (out, index)
}

fn render_node(tree: &DomTree, id: crate::dom::NodeId, depth: usize, index: &ElementIndex, out: &mut String) {
    let node = tree.get(id);
    let indent = "  ".repeat(depth);
    let id_prefix = element_id_for(id, index).map(|eid| format!("[{eid}] ")).unwrap_or_default();
    let attrs = format_attrs(node);

    out.push_str(&indent);
    out.push_str(&id_prefix);
    out.push('<');
    out.push_str(&node.tag);
    if !attrs.is_empty() {
        out.push(' ');
        out.push_str(&attrs);
    }
    out.push('>');

    if let Some(text) = node.inline_text() {
        out.push(' ');
        out.push_str(text.trim());
        out.push('\n');
        return;
    }
    out.push('\n');

    for child in &node.children {
        match child {
            DomChild::Element(cid) => render_node(tree, *cid, depth + 1, index, out),
            DomChild::Text(text) => {
                if !text.trim().is_empty() {
                    out.push_str(&"  ".repeat(depth + 1));
                    out.push_str(text.trim());
                    out.push('\n');
                }
            }
        }
    }
}

/// Finds this node's assigned short id, if any, by matching on its
/// `NodeId` against the index. Matching on center point instead would
/// conflate two co-located interactive elements (a link wrapping a
/// button, a label wrapping an input) that share a bounding box center.
fn element_id_for(id: crate::dom::NodeId, index: &ElementIndex) -> Option<String> {
    index.iter().find(|(_, entry)| entry.node_id == id).map(|(eid, _)| eid.clone())
}

fn format_attrs(node: &DomNode) -> String {
    let mut keys: Vec<&String> = node.attributes.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|k| format!("{k}=\"{}\"", node.attributes[k]))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds the full per-step `Observation`: the serialized text content and
/// (if requested) the screenshot image content, both tagged `"observation"`
/// with `lifespan=2` so the purger keeps only the last two.
pub fn build_observation(tree: &DomTree, screenshot_png: Option<&[u8]>) -> Observation {
    let (text, element_index) = serialize_tree(tree);
    let text_content = Content::text(text).with_tag(OBSERVATION_TAG).with_lifespan(OBSERVATION_LIFESPAN);
    let image = screenshot_png.map(|bytes| {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Content::image(encoded, ImageMime::Png).with_tag(OBSERVATION_TAG).with_lifespan(OBSERVATION_LIFESPAN)
    });
    Observation { text: text_content, image, element_index }
}

/// One-line accessibility summary prepended to the serialized tree: counts
/// named, interactive-surfaced roles so the model gets a cheap sanity check
/// against the DOM-only view without the cost of rendering the whole AX
/// tree every step.
pub fn ax_summary_line(ax_tree: &AxTree) -> String {
    let mut named = 0usize;
    let mut ignored = 0usize;
    for id in 0..ax_tree.len() {
        let node = ax_tree.get(id);
        if node.ignored {
            ignored += 1;
        } else if node.name.as_deref().is_some_and(|n| !n.is_empty()) {
            named += 1;
        }
    }
    format!("accessibility: {named} named node(s), {ignored} ignored")
}

/// Same as `build_observation`, additionally prepending an accessibility
/// summary line to the serialized tree when an `AxTree` is available.
pub fn build_observation_with_ax(tree: &DomTree, ax_tree: Option<&AxTree>, screenshot_png: Option<&[u8]>) -> Observation {
    let (mut text, element_index) = serialize_tree(tree);
    if let Some(ax_tree) = ax_tree {
        text = format!("{}\n{text}", ax_summary_line(ax_tree));
    }
    let text_content = Content::text(text).with_tag(OBSERVATION_TAG).with_lifespan(OBSERVATION_LIFESPAN);
    let image = screenshot_png.map(|bytes| {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Content::image(encoded, ImageMime::Png).with_tag(OBSERVATION_TAG).with_lifespan(OBSERVATION_LIFESPAN)
    });
    Observation { text: text_content, image, element_index }
}
