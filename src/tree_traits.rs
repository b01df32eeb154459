//! Text rendering of a document tree.

use termtree::Tree;
use tracing::instrument;

use crate::domain::{Document, NodeId};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeNodeConvert for Document {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        subtree_to_tree_string(self, self.root())
    }
}

/// Renders one subtree; folded nodes get `[+]`, nodes with attached clones
/// elsewhere get `(clone)`. Children of inaccessible nodes are not shown.
pub fn subtree_to_tree_string(doc: &Document, node: NodeId) -> Tree<String> {
    let mut tree = Tree::new(label(doc, node));
    if doc.child_count(node).unwrap_or(0) == 0 {
        return tree;
    }
    if let Ok(children) = doc.children(node) {
        for &child in children {
            tree.push(subtree_to_tree_string(doc, child));
        }
    }
    tree
}

fn label(doc: &Document, node: NodeId) -> String {
    let mut label = doc.plain_text(node).unwrap_or_default();
    if doc.attached_clone_count(node).unwrap_or(0) > 1 {
        label.push_str(" (clone)");
    }
    if doc.is_folded(node).unwrap_or(false) {
        label.push_str(" [+]");
    }
    label
}
