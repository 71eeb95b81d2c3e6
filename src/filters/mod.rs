//! Filter Pipeline: pure tree-to-tree transforms applied after the DOM
//! and accessibility trees are parsed, before the Element Indexer runs.

pub mod accessibility;
pub mod semantic;
pub mod visibility;

pub use accessibility::run_accessibility_pipeline;
pub use semantic::{run_semantic_pipeline, SemanticConfig};
pub use visibility::{run_visibility_pipeline, VisibilityConfig};

use crate::ax::AxTree;
use crate::dom::DomTree;

/// Full filter configuration for one observation. Each stage is
/// individually skippable.
#[derive(Debug, Default, Clone)]
pub struct FilterConfig {
    pub visibility: VisibilityConfig,
    pub semantic: SemanticConfig,
}

/// Runs the visibility pipeline followed by the semantic pipeline over a
/// freshly-parsed DOM tree.
pub fn filter_dom(tree: &DomTree, config: &FilterConfig) -> DomTree {
    let visible = run_visibility_pipeline(tree, &config.visibility);
    run_semantic_pipeline(&visible, &config.semantic)
}

/// Runs the accessibility bottom-up predicate filters over a freshly-parsed
/// AX tree.
pub fn filter_accessibility(tree: &AxTree) -> AxTree {
    run_accessibility_pipeline(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{BoundingBox, DomChild, DomNode};
    use std::collections::HashMap;

    #[test]
    fn pipeline_runs_end_to_end_without_mutating_input() {
        let mut script = DomNode {
            tag: "script".to_string(),
            attributes: HashMap::new(),
            styles: HashMap::new(),
            bounds: None,
            children: Vec::new(),
            parent: None,
            metadata: HashMap::new(),
            backend_dom_node_id: None,
        };
        script.attributes.insert("src".into(), "x.js".into());

        let mut button = script.clone();
        button.tag = "button".to_string();
        button.bounds = Some(BoundingBox::new(0.0, 0.0, 80.0, 30.0));
        button.styles.insert("display".into(), "block".into());
        button.attributes.clear();
        button.attributes.insert("role".into(), "button".into());

        let arena = vec![script, button];
        let mut tree = DomTree::new(arena, 0);
        // root is actually the button in this fixture; wire a synthetic html root instead
        let mut html = DomNode {
            tag: "html".to_string(),
            attributes: HashMap::new(),
            styles: HashMap::new(),
            bounds: Some(BoundingBox::new(0.0, 0.0, 100.0, 100.0)),
            children: vec![DomChild::Element(0), DomChild::Element(1)],
            parent: None,
            metadata: HashMap::new(),
            backend_dom_node_id: None,
        };
        html.styles.insert("display".into(), "block".into());
        let root_id = tree.push(html);
        tree.set_root(root_id);
        tree.get_mut(0).parent = Some(root_id);
        tree.get_mut(1).parent = Some(root_id);

        let before_len = tree.len();
        let filtered = filter_dom(&tree, &FilterConfig::default());

        assert_eq!(tree.len(), before_len, "input tree must be untouched");
        // script subtree is gone, button survives
        assert!(filtered.root().children.iter().any(|c| matches!(c, DomChild::Element(_))));
    }
}
