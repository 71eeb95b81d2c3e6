//! Semantic pipeline: strips non-semantic noise from an already
//! visibility-filtered DOM tree and collapses structural wrappers.

use std::collections::HashSet;

use crate::dom::{DomChild, DomNode, DomTree, NodeId};
use crate::indexer::INTERACTIVE_TAGS;

/// Attributes kept verbatim by the attribute filter. Anything starting with
/// `aria-` is kept regardless of whether it's individually listed here.
pub const SEMANTIC_ATTRIBUTES: &[&str] = &[
    "role",
    "aria-label",
    "aria-labelledby",
    "aria-describedby",
    "aria-checked",
    "aria-selected",
    "aria-expanded",
    "aria-hidden",
    "aria-disabled",
    "aria-haspopup",
    "type",
    "name",
    "placeholder",
    "value",
    "accept",
    "alt",
    "title",
    "disabled",
    "checked",
    "selected",
    "tabindex",
    "onclick",
];

pub fn is_semantic_attribute(name: &str) -> bool {
    name.starts_with("aria-") || SEMANTIC_ATTRIBUTES.contains(&name)
}

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

fn map_nodes(tree: &DomTree, transform: &impl Fn(&DomNode) -> DomNode) -> DomTree {
    let mut arena: Vec<DomNode> = (0..tree.len()).map(|id| transform(tree.get(id))).collect();
    fix_parents(&mut arena);
    DomTree::new(arena, tree.root_id())
}

/// Retain only whitelisted attributes on every node.
pub fn filter_attributes(tree: &DomTree) -> DomTree {
    map_nodes(tree, &|node| {
        let mut new_node = node.clone();
        new_node.attributes.retain(|k, _| is_semantic_attribute(k));
        new_node
    })
}

/// Delete a presentational `role` (`"none"`/`"presentation"`, case-insensitive).
pub fn strip_presentational_roles(tree: &DomTree) -> DomTree {
    map_nodes(tree, &|node| {
        let mut new_node = node.clone();
        if let Some(role) = new_node.attributes.get("role") {
            if role.eq_ignore_ascii_case("none") || role.eq_ignore_ascii_case("presentation") {
                new_node.attributes.remove("role");
            }
        }
        new_node
    })
}

/// Drops nodes that, after recursing into children, have no children, no
/// attributes, and a tag outside the interactive-tag set.
pub fn drop_empty_elements(tree: &DomTree) -> DomTree {
    let interactive: HashSet<&str> = INTERACTIVE_TAGS.iter().copied().collect();
    let mut arena = Vec::new();
    let root = rebuild_empty(tree, tree.root_id(), &mut arena, &interactive);
    let mut arena = arena;
    let root_id = root.unwrap_or_else(|| {
        let mut fallback = tree.root().clone();
        fallback.children.clear();
        fallback.parent = None;
        arena.push(fallback);
        arena.len() - 1
    });
    fix_parents(&mut arena);
    DomTree::new(arena, root_id)
}

fn rebuild_empty(tree: &DomTree, old_id: NodeId, arena: &mut Vec<DomNode>, interactive: &HashSet<&str>) -> Option<NodeId> {
    let orig = tree.get(old_id);
    let mut children = Vec::with_capacity(orig.children.len());
    for child in &orig.children {
        match child {
            DomChild::Text(t) => children.push(DomChild::Text(t.clone())),
            DomChild::Element(cid) => {
                if let Some(new_cid) = rebuild_empty(tree, *cid, arena, interactive) {
                    children.push(DomChild::Element(new_cid));
                }
            }
        }
    }

    let no_children = children.is_empty();
    let no_attrs = orig.attributes.is_empty();
    if no_children && no_attrs && !interactive.contains(orig.tag.as_str()) {
        return None;
    }

    let mut node = orig.clone();
    node.children = children;
    node.parent = None;
    let id = arena.len();
    arena.push(node);
    Some(id)
}

/// Replaces a no-attribute, no-meaningful-text node with its single element
/// child, recursively — `div(no-attrs) > section(no-attrs) > span#leaf`
/// collapses all the way down to `span#leaf`.
pub fn collapse_wrappers(tree: &DomTree) -> DomTree {
    let mut arena = Vec::new();
    let root = rebuild_collapse(tree, tree.root_id(), &mut arena);
    let mut arena = arena;
    let root_id = match root {
        Some(id) => id,
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

fn rebuild_collapse(tree: &DomTree, old_id: NodeId, arena: &mut Vec<DomNode>) -> Option<NodeId> {
    let orig = tree.get(old_id);
    let mut children = Vec::with_capacity(orig.children.len());
    for child in &orig.children {
        match child {
            DomChild::Text(t) => children.push(DomChild::Text(t.clone())),
            DomChild::Element(cid) => {
                if let Some(new_cid) = rebuild_collapse(tree, *cid, arena) {
                    children.push(DomChild::Element(new_cid));
                }
            }
        }
    }

    let element_children: Vec<NodeId> = children
        .iter()
        .filter_map(|c| if let DomChild::Element(id) = c { Some(*id) } else { None })
        .collect();
    let has_meaningful_text = children.iter().any(|c| matches!(c, DomChild::Text(t) if !t.trim().is_empty()));

    if orig.attributes.is_empty() && !has_meaningful_text && element_children.len() == 1 {
        return Some(element_children[0]);
    }

    let mut node = orig.clone();
    node.children = children;
    node.parent = None;
    let id = arena.len();
    arena.push(node);
    Some(id)
}

#[derive(Debug, Clone)]
pub struct SemanticConfig {
    pub skip_attribute_filter: bool,
    pub skip_presentational_roles: bool,
    pub skip_empty_elements: bool,
    pub skip_wrapper_collapse: bool,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            skip_attribute_filter: false,
            skip_presentational_roles: false,
            skip_empty_elements: false,
            skip_wrapper_collapse: false,
        }
    }
}

pub fn run_semantic_pipeline(tree: &DomTree, config: &SemanticConfig) -> DomTree {
    let mut current = tree.clone();
    if !config.skip_attribute_filter {
        current = filter_attributes(&current);
    }
    if !config.skip_presentational_roles {
        current = strip_presentational_roles(&current);
    }
    if !config.skip_empty_elements {
        current = drop_empty_elements(&current);
    }
    if !config.skip_wrapper_collapse {
        current = collapse_wrappers(&current);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn leaf(tag: &str) -> DomNode {
        DomNode {
            tag: tag.to_string(),
            attributes: HashMap::new(),
            styles: HashMap::new(),
            bounds: None,
            children: Vec::new(),
            parent: None,
            metadata: HashMap::new(),
            backend_dom_node_id: None,
        }
    }

    #[test]
    fn wrapper_collapse_across_depth_three() {
        // div(no-attrs) > section(no-attrs) > span#leaf
        let div = leaf("div");
        let section = leaf("section");
        let mut span = leaf("span");
        span.attributes.insert("id".into(), "leaf".into()); // non-semantic, stripped earlier normally

        let arena = vec![div, section, span];
        let mut tree = DomTree::new(arena, 0);
        tree.get_mut(0).children.push(DomChild::Element(1));
        tree.get_mut(1).parent = Some(0);
        tree.get_mut(1).children.push(DomChild::Element(2));
        tree.get_mut(2).parent = Some(1);

        let collapsed = collapse_wrappers(&tree);
        assert_eq!(collapsed.root().tag, "span");
        assert_eq!(collapsed.len(), 1); // div and section were promoted away entirely
    }

    #[test]
    fn wrapper_with_attributes_is_never_collapsed() {
        let mut div = leaf("div");
        div.attributes.insert("role".into(), "button".into());
        let span = leaf("span");

        let arena = vec![div, span];
        let mut tree = DomTree::new(arena, 0);
        tree.get_mut(0).children.push(DomChild::Element(1));
        tree.get_mut(1).parent = Some(0);

        let collapsed = collapse_wrappers(&tree);
        assert_eq!(collapsed.root().tag, "div");
        assert_eq!(collapsed.root().children.len(), 1);
    }

    #[test]
    fn attribute_filter_retains_whitelist_only() {
        let mut node = leaf("div");
        node.attributes.insert("role".into(), "button".into());
        node.attributes.insert("data-test-id".into(), "foo".into());
        node.attributes.insert("aria-hidden".into(), "true".into());

        let tree = DomTree::new(vec![node], 0);
        let filtered = filter_attributes(&tree);
        assert!(filtered.root().attributes.contains_key("role"));
        assert!(filtered.root().attributes.contains_key("aria-hidden"));
        assert!(!filtered.root().attributes.contains_key("data-test-id"));
    }
}
