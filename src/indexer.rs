//! Element Indexer: assigns stable, per-snapshot `tag-N` ids to
//! interactive DOM elements and records their screen-space centers.

use std::collections::HashMap;

use crate::dom::{DomChild, DomTree, NodeId};

pub const INTERACTIVE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea", "label"];

pub const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "link",
    "checkbox",
    "radio",
    "switch",
    "tab",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "option",
    "textbox",
    "searchbox",
    "combobox",
    "slider",
    "spinbutton",
];

/// One entry of an `ElementIndex`: the DOM node it refers to, plus the
/// screen-space point a pixel-action tool should click/hover.
#[derive(Debug, Clone, Copy)]
pub struct IndexedElement {
    pub node_id: NodeId,
    pub center_x: f64,
    pub center_y: f64,
}

/// Per-observation assignment of short ids to interactive elements.
/// Rebuilt wholesale every step — never cached across snapshots.
#[derive(Debug, Clone, Default)]
pub struct ElementIndex {
    entries: HashMap<String, IndexedElement>,
}

impl ElementIndex {
    pub fn get(&self, id: &str) -> Option<&IndexedElement> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexedElement)> {
        self.entries.iter()
    }
}

pub fn is_interactive_tag(tag: &str) -> bool {
    INTERACTIVE_TAGS.contains(&tag)
}

fn is_interactive_role(role: &str) -> bool {
    INTERACTIVE_ROLES.contains(&role.to_lowercase().as_str())
}

/// An element is interactive if its tag is one of the standard interactive
/// HTML tags, its ARIA role is one of the standard interactive roles, or it
/// carries `tabindex`/`aria-haspopup`/`onclick`.
pub fn is_interactive(attributes: &HashMap<String, String>, tag: &str) -> bool {
    if is_interactive_tag(tag) {
        return true;
    }
    if let Some(role) = attributes.get("role") {
        if is_interactive_role(role) {
            return true;
        }
    }
    attributes.contains_key("tabindex") || attributes.contains_key("aria-haspopup") || attributes.contains_key("onclick")
}

/// Walks `tree` in depth-first preorder, assigning `tag-N` ids (N monotonic
/// per tag, starting at 0) to every interactive node it finds.
pub fn build_element_index(tree: &DomTree) -> ElementIndex {
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut entries = HashMap::new();

    let mut stack = vec![tree.root_id()];
    // Explicit stack rather than recursion keeps the traversal order
    // identical to a preorder DFS while avoiding deep recursion on large
    // pages; children are pushed in reverse so they pop in document order.
    while let Some(id) = stack.pop() {
        let node = tree.get(id);
        if is_interactive(&node.attributes, &node.tag) {
            let counter = counters.entry(node.tag.clone()).or_insert(0);
            let element_id = format!("{}-{}", node.tag, counter);
            *counter += 1;

            let (center_x, center_y) = node.bounds.map(|b| b.center()).unwrap_or((0.0, 0.0));
            entries.insert(element_id, IndexedElement { node_id: id, center_x, center_y });
        }

        for child in node.children.iter().rev() {
            if let DomChild::Element(cid) = child {
                stack.push(*cid);
            }
        }
    }

    ElementIndex { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{BoundingBox, DomNode};
    use std::collections::HashMap as Map;

    fn leaf(tag: &str, bounds: BoundingBox) -> DomNode {
        DomNode {
            tag: tag.to_string(),
            attributes: Map::new(),
            styles: Map::new(),
            bounds: Some(bounds),
            children: Vec::new(),
            parent: None,
            metadata: Map::new(),
            backend_dom_node_id: None,
        }
    }

    #[test]
    fn assigns_stable_sequential_ids_per_tag() {
        let b1 = leaf("button", BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        let b2 = leaf("button", BoundingBox::new(20.0, 0.0, 10.0, 10.0));
        let div = DomNode {
            children: vec![DomChild::Element(1), DomChild::Element(2)],
            ..leaf("div", BoundingBox::new(0.0, 0.0, 100.0, 100.0))
        };

        let arena = vec![div, b1, b2];
        let mut tree = DomTree::new(arena, 0);
        tree.get_mut(1).parent = Some(0);
        tree.get_mut(2).parent = Some(0);

        let index = build_element_index(&tree);
        assert_eq!(index.len(), 2);
        assert!(index.get("button-0").is_some());
        assert!(index.get("button-1").is_some());
    }

    #[test]
    fn repeated_indexing_of_same_tree_is_stable() {
        let button = leaf("button", BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        let tree = DomTree::new(vec![button], 0);

        let a = build_element_index(&tree);
        let b = build_element_index(&tree);
        assert_eq!(a.get("button-0").unwrap().node_id, b.get("button-0").unwrap().node_id);
    }

    #[test]
    fn tabindex_marks_otherwise_plain_div_interactive() {
        let mut div = leaf("div", BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        div.attributes.insert("tabindex".into(), "0".into());
        let tree = DomTree::new(vec![div], 0);
        let index = build_element_index(&tree);
        assert_eq!(index.len(), 1);
    }
}
