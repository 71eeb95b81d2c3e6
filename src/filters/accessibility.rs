//! Bottom-up predicate filter for the accessibility tree: generic
//! promote/delete/wrap mechanics shared by all four concrete AX filters.

use crate::ax::{AxNode, AxNodeId, AxTree};

fn fix_parents(arena: &mut [AxNode]) {
    for i in 0..arena.len() {
        let children = arena[i].children.clone();
        for cid in children {
            arena[cid].parent = Some(i);
        }
    }
}

/// Removes nodes matching `should_remove`, promoting an only child in its
/// place and preserving multi-child nodes as wrappers. If the predicate
/// would remove the entire tree, falls back to a childless copy of the
/// original root — an AX tree always has a root.
pub fn filter_by_predicate(tree: &AxTree, should_remove: impl Fn(&AxTree, AxNodeId) -> bool) -> AxTree {
    let mut arena = Vec::new();
    let root = rebuild(tree, tree.root_id(), &mut arena, &should_remove);
    let mut arena = arena;
    let root_id = root.unwrap_or_else(|| {
        let mut fallback = tree.root().clone();
        fallback.children.clear();
        fallback.parent = None;
        arena.push(fallback);
        arena.len() - 1
    });
    fix_parents(&mut arena);
    AxTree::new(arena, root_id)
}

fn rebuild(tree: &AxTree, old_id: AxNodeId, arena: &mut Vec<AxNode>, should_remove: &impl Fn(&AxTree, AxNodeId) -> bool) -> Option<AxNodeId> {
    let orig = tree.get(old_id);

    let mut new_children = Vec::with_capacity(orig.children.len());
    for &cid in &orig.children {
        if let Some(new_cid) = rebuild(tree, cid, arena, should_remove) {
            new_children.push(new_cid);
        }
    }

    if should_remove(tree, old_id) {
        return match new_children.len() {
            0 => None,
            1 => Some(new_children[0]),
            _ => Some(push_wrapper(orig, new_children, arena)),
        };
    }

    let mut node = orig.clone();
    node.children = new_children;
    node.parent = None;
    let id = arena.len();
    arena.push(node);
    Some(id)
}

fn push_wrapper(orig: &AxNode, children: Vec<AxNodeId>, arena: &mut Vec<AxNode>) -> AxNodeId {
    let mut node = orig.clone();
    node.children = children;
    node.parent = None;
    let id = arena.len();
    arena.push(node);
    id
}

pub fn filter_ignored(tree: &AxTree) -> AxTree {
    filter_by_predicate(tree, |t, id| t.get(id).ignored)
}

pub fn filter_generic(tree: &AxTree) -> AxTree {
    filter_by_predicate(tree, |t, id| t.get(id).role.value == "generic")
}

pub fn filter_none(tree: &AxTree) -> AxTree {
    filter_by_predicate(tree, |t, id| t.get(id).role.value == "none")
}

/// A node is a "duplicate name" if its own accessible name is a (non-empty)
/// substring of the nearest ancestor's name — e.g. an icon button inside a
/// labeled toolbar repeating the toolbar's own label.
fn has_duplicate_name(tree: &AxTree, id: AxNodeId) -> bool {
    let node = tree.get(id);
    let Some(name) = node.name.as_deref().filter(|n| !n.is_empty()) else {
        return false;
    };
    tree.nearest_named_ancestor(id)
        .and_then(|ancestor| ancestor.name.as_deref())
        .is_some_and(|ancestor_name| ancestor_name.contains(name))
}

pub fn filter_duplicate_names(tree: &AxTree) -> AxTree {
    filter_by_predicate(tree, has_duplicate_name)
}

/// Runs all four concrete filters in sequence: ignored, generic, none,
/// duplicate-name.
pub fn run_accessibility_pipeline(tree: &AxTree) -> AxTree {
    let tree = filter_ignored(tree);
    let tree = filter_generic(&tree);
    let tree = filter_none(&tree);
    filter_duplicate_names(&tree)
}
