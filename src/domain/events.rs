//! Change events and the observer traits views implement.

use crate::domain::content::{MindIcon, UserObject};
use crate::domain::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeProperty {
    Folding,
    Text,
    XmlText,
    UserObject,
    Icon,
    Extension,
    History,
    /// The clone set of the node gained or lost an attached member.
    Clones,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeValue {
    Bool(bool),
    Text(String),
    UserObject(UserObject),
    Icon(MindIcon),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeChangeEvent {
    node: NodeId,
    property: NodeProperty,
    old_value: Option<ChangeValue>,
    new_value: Option<ChangeValue>,
}

impl NodeChangeEvent {
    pub fn new(
        node: NodeId,
        property: NodeProperty,
        old_value: Option<ChangeValue>,
        new_value: Option<ChangeValue>,
    ) -> Self {
        Self {
            node,
            property,
            old_value,
            new_value,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn property(&self) -> NodeProperty {
        self.property
    }

    pub fn old_value(&self) -> Option<&ChangeValue> {
        self.old_value.as_ref()
    }

    pub fn new_value(&self) -> Option<&ChangeValue> {
        self.new_value.as_ref()
    }

    /// Same change, rebound to another clone.
    pub fn for_node(&self, node: NodeId) -> Self {
        Self {
            node,
            ..self.clone()
        }
    }
}

/// Observer registered on a single node, typically its view.
///
/// Callbacks receive no access to the document, so they cannot mutate the
/// node whose observer list is being walked.
pub trait NodeView {
    fn node_changed(&self, event: &NodeChangeEvent);

    fn on_node_inserted(&self, _parent: NodeId, _child: NodeId, _index: usize) {}

    fn on_node_deleted(&self, _parent: NodeId, _child: NodeId, _index: usize) {}
}

/// Document-wide listener, invoked before the node's own views.
pub trait NodeChangeListener {
    fn node_changed(&self, event: &NodeChangeEvent);
}
