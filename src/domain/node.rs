//! Per-position node state.

use std::fmt;
use std::rc::Rc;

use crate::domain::events::NodeView;
use crate::domain::{CloneSetId, NodeId};

/// Side of the root a node is laid out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodePosition {
    Left,
    Right,
    #[default]
    Unknown,
}

impl NodePosition {
    pub fn from_left(is_left: bool) -> Self {
        if is_left {
            NodePosition::Left
        } else {
            NodePosition::Right
        }
    }
}

/// Cached result of the last filter run over this position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterInfo {
    flags: u8,
}

impl FilterInfo {
    pub const MATCHED: u8 = 1;
    pub const ANCESTOR: u8 = 1 << 1;
    pub const DESCENDANT: u8 = 1 << 2;

    pub fn reset(&mut self) {
        self.flags = 0;
    }

    pub fn add(&mut self, flag: u8) {
        self.flags |= flag;
    }

    pub fn is_matched(&self) -> bool {
        self.flags & Self::MATCHED != 0
    }

    pub fn is_ancestor(&self) -> bool {
        self.flags & Self::ANCESTOR != 0
    }

    pub fn is_descendant(&self) -> bool {
        self.flags & Self::DESCENDANT != 0
    }

    pub fn is_empty(&self) -> bool {
        self.flags == 0
    }
}

/// Tree node in the document arena. Content lives in the node's clone set.
pub struct Node {
    pub(crate) id: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) folded: bool,
    pub(crate) position: NodePosition,
    pub(crate) preferred_child: Option<NodeId>,
    pub(crate) filter_info: FilterInfo,
    pub(crate) views: Vec<Rc<dyn NodeView>>,
    pub(crate) clone_set: CloneSetId,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("folded", &self.folded)
            .field("position", &self.position)
            .field("views", &self.views.len())
            .finish()
    }
}

impl Node {
    pub(crate) fn new(clone_set: CloneSetId) -> Self {
        Self {
            id: None,
            parent: None,
            children: Vec::new(),
            folded: false,
            position: NodePosition::Unknown,
            preferred_child: None,
            filter_info: FilterInfo::default(),
            views: Vec::new(),
            clone_set,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn position(&self) -> NodePosition {
        self.position
    }

    pub fn filter_info(&self) -> &FilterInfo {
        &self.filter_info
    }

    pub fn clone_set(&self) -> CloneSetId {
        self.clone_set
    }
}
