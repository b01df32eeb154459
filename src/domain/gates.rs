//! Capabilities queried from collaborators (encryption, filters, connectors).

use crate::domain::{Document, NodeId};

/// Node classification supplied from outside the core.
///
/// The document never decides these itself; it asks before structural
/// mutation, when reporting child counts and fold state, and when
/// navigation skips hidden ancestors.
pub trait NodeCapabilities {
    /// False while the node is locked (e.g. encrypted).
    fn is_accessible(&self, _doc: &Document, _node: NodeId) -> bool {
        true
    }

    /// False if the active filter hides the node.
    fn is_visible(&self, _doc: &Document, _node: NodeId) -> bool {
        true
    }

    /// True for nodes that may never be folded (e.g. connector nodes).
    fn is_always_unfolded(&self, _doc: &Document, _node: NodeId) -> bool {
        false
    }
}

/// Everything accessible, visible and foldable.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenGate;

impl NodeCapabilities for OpenGate {}
