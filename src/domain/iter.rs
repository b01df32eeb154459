use tracing::instrument;

use crate::domain::{Document, NodeId};

/// Pre-order walk over a subtree, children in display order.
pub struct SubtreeIterator<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> SubtreeIterator<'a> {
    #[instrument(level = "trace", skip(doc))]
    pub(crate) fn new(doc: &'a Document, start: NodeId) -> Self {
        let mut stack = Vec::new();
        if doc.node(start).is_some() {
            stack.push(start);
        }
        Self { doc, stack }
    }
}

impl Iterator for SubtreeIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        if let Some(node) = self.doc.node(current) {
            // Push children in reverse order for left-to-right traversal
            for &child in node.children.iter().rev() {
                self.stack.push(child);
            }
        }
        Some(current)
    }
}

/// Post-order walk: every node after all of its descendants.
pub struct PostOrderIterator<'a> {
    doc: &'a Document,
    stack: Vec<(NodeId, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    #[instrument(level = "trace", skip(doc))]
    pub(crate) fn new(doc: &'a Document, start: NodeId) -> Self {
        let mut stack = Vec::new();
        if doc.node(start).is_some() {
            stack.push((start, false));
        }
        Self { doc, stack }
    }
}

impl Iterator for PostOrderIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if visited {
                return Some(current);
            }
            if let Some(node) = self.doc.node(current) {
                self.stack.push((current, true));
                for &child in node.children.iter().rev() {
                    self.stack.push((child, false));
                }
            }
        }
        None
    }
}
