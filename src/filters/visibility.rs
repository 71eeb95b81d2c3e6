//! Visibility pipeline: drops DOM subtrees that never render on screen.
//!
//! Every stage here rebuilds a fresh arena bottom-up; a dropped node takes
//! its whole subtree with it (no promotion — unlike the semantic pipeline's
//! wrapper collapse or the accessibility filters).

use crate::dom::{DomChild, DomNode, DomTree, NodeId};

fn fix_parents(arena: &mut [DomNode]) {
    for i in 0..arena.len() {
        let children = arena[i].children.clone();
        for child in children {
            if let DomChild::Element(cid) = child {
                arena[cid].parent = Some(i);
            }
        }
    }
}

/// Rebuilds `tree`, dropping any node (and its subtree) for which
/// `should_drop` returns true. `should_drop` only ever inspects the node
/// itself, not its (already-filtered) children.
fn cascade(tree: &DomTree, should_drop: &impl Fn(&DomNode) -> bool) -> DomTree {
    let mut arena = Vec::new();
    let root = rebuild(tree, tree.root_id(), &mut arena, should_drop);
    let mut arena = arena;
    let root_id = root.unwrap_or_else(|| {
        // The root itself should essentially never be dropped by these
        // predicates (it's an <html> element with no disqualifying tag or
        // style), but guard against a pathological config regardless.
        let mut fallback = tree.root().clone();
        fallback.children.clear();
        fallback.parent = None;
        arena.push(fallback);
        arena.len() - 1
    });
    fix_parents(&mut arena);
    DomTree::new(arena, root_id)
}

fn rebuild(tree: &DomTree, old_id: NodeId, arena: &mut Vec<DomNode>, should_drop: &impl Fn(&DomNode) -> bool) -> Option<NodeId> {
    let orig = tree.get(old_id);
    if should_drop(orig) {
        return None;
    }

    let mut children = Vec::with_capacity(orig.children.len());
    for child in &orig.children {
        match child {
            DomChild::Text(t) => children.push(DomChild::Text(t.clone())),
            DomChild::Element(cid) => {
                if let Some(new_cid) = rebuild(tree, *cid, arena, should_drop) {
                    children.push(DomChild::Element(new_cid));
                }
            }
        }
    }

    let mut node = orig.clone();
    node.children = children;
    node.parent = None;
    let id = arena.len();
    arena.push(node);
    Some(id)
}

/// Default set of tags that never contribute user-visible content.
pub fn default_non_visible_tags() -> Vec<String> {
    ["script", "style", "meta", "link", "noscript", "head", "title", "base"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn drop_non_visible_tags(tree: &DomTree, tags: &[String]) -> DomTree {
    cascade(tree, &|node| tags.iter().any(|t| t == &node.tag))
}

fn opacity_is_zero(styles: &std::collections::HashMap<String, String>) -> bool {
    styles.get("opacity").and_then(|v| v.trim().parse::<f64>().ok()).is_some_and(|v| v == 0.0)
}

pub fn drop_css_hidden(tree: &DomTree) -> DomTree {
    cascade(tree, &|node| {
        let display_none = node.styles.get("display").is_some_and(|v| v.eq_ignore_ascii_case("none"));
        let visibility_hidden = node.styles.get("visibility").is_some_and(|v| v.eq_ignore_ascii_case("hidden"));
        let hidden_attr = node.attributes.contains_key("hidden");
        let hidden_input = node.tag == "input" && node.attributes.get("type").is_some_and(|v| v.eq_ignore_ascii_case("hidden"));
        display_none || visibility_hidden || opacity_is_zero(&node.styles) || hidden_attr || hidden_input
    })
}

pub fn drop_no_layout(tree: &DomTree) -> DomTree {
    cascade(tree, &|node| node.bounds.is_none() && node.styles.is_empty())
}

/// Drops nodes whose own bounds are zero-area, *unless* some element
/// descendant ends up with non-zero bounds after this same pass — a
/// zero-size wrapper around a visible child must survive so the child
/// keeps a path to the root.
pub fn drop_zero_dimensions(tree: &DomTree) -> DomTree {
    let mut arena = Vec::new();
    let root = rebuild_zero_dim(tree, tree.root_id(), &mut arena);
    let mut arena = arena;
    let root_id = match root {
        Some((id, _)) => id,
        None => {
            let mut fallback = tree.root().clone();
            fallback.children.clear();
            fallback.parent = None;
            arena.push(fallback);
            arena.len() - 1
        }
    };
    fix_parents(&mut arena);
    DomTree::new(arena, root_id)
}

fn is_zero_area(node: &DomNode) -> bool {
    node.bounds.is_some_and(|b| b.width == 0.0 || b.height == 0.0)
}

/// Returns `(new_id, subtree_has_nonzero_bounds)` for the kept node, or
/// `None` if the whole subtree was dropped.
fn rebuild_zero_dim(tree: &DomTree, old_id: NodeId, arena: &mut Vec<DomNode>) -> Option<(NodeId, bool)> {
    let orig = tree.get(old_id);

    let mut children = Vec::with_capacity(orig.children.len());
    let mut subtree_nonzero = false;
    for child in &orig.children {
        match child {
            DomChild::Text(t) => children.push(DomChild::Text(t.clone())),
            DomChild::Element(cid) => {
                if let Some((new_cid, child_nonzero)) = rebuild_zero_dim(tree, *cid, arena) {
                    if child_nonzero {
                        subtree_nonzero = true;
                    }
                    children.push(DomChild::Element(new_cid));
                }
            }
        }
    }

    if is_zero_area(orig) && !subtree_nonzero {
        return None;
    }

    let keeps_nonzero = subtree_nonzero || !is_zero_area(orig);
    let mut node = orig.clone();
    node.children = children;
    node.parent = None;
    let id = arena.len();
    arena.push(node);
    Some((id, keeps_nonzero))
}

/// Runs the four visibility stages in a fixed order: tags, CSS-hidden, no
/// layout, zero dimensions.
#[derive(Debug, Clone)]
pub struct VisibilityConfig {
    pub skip_non_visible_tags: bool,
    pub skip_css_hidden: bool,
    pub skip_no_layout: bool,
    pub skip_zero_dimensions: bool,
    pub non_visible_tags: Vec<String>,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            skip_non_visible_tags: false,
            skip_css_hidden: false,
            skip_no_layout: false,
            skip_zero_dimensions: false,
            non_visible_tags: default_non_visible_tags(),
        }
    }
}

pub fn run_visibility_pipeline(tree: &DomTree, config: &VisibilityConfig) -> DomTree {
    let mut current = tree.clone();
    if !config.skip_non_visible_tags {
        current = drop_non_visible_tags(&current, &config.non_visible_tags);
    }
    if !config.skip_css_hidden {
        current = drop_css_hidden(&current);
    }
    if !config.skip_no_layout {
        current = drop_no_layout(&current);
    }
    if !config.skip_zero_dimensions {
        current = drop_zero_dimensions(&current);
    }
    current
}
