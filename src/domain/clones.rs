//! Clone sets: the nodes sharing one [`SharedContent`].

use crate::domain::content::SharedContent;
use crate::domain::NodeId;

/// All positions sharing one content payload.
///
/// `members` holds every node referencing the content, `attached` the subset
/// currently reachable from a document root. The content lives as long as
/// the set has members.
#[derive(Debug)]
pub struct CloneSet {
    content: SharedContent,
    members: Vec<NodeId>,
    attached: Vec<NodeId>,
}

impl CloneSet {
    pub(crate) fn new(content: SharedContent) -> Self {
        Self {
            content,
            members: Vec::new(),
            attached: Vec::new(),
        }
    }

    pub fn content(&self) -> &SharedContent {
        &self.content
    }

    pub(crate) fn content_mut(&mut self) -> &mut SharedContent {
        &mut self.content
    }

    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    pub fn attached(&self) -> &[NodeId] {
        &self.attached
    }

    /// Number of attached members.
    pub fn size(&self) -> usize {
        self.attached.len()
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.attached.contains(&node)
    }

    pub(crate) fn join(&mut self, node: NodeId) {
        if !self.members.contains(&node) {
            self.members.push(node);
        }
    }

    /// Removes the node entirely; returns true when no member is left.
    pub(crate) fn leave(&mut self, node: NodeId) -> bool {
        self.members.retain(|&m| m != node);
        self.attached.retain(|&m| m != node);
        self.members.is_empty()
    }

    /// Returns false if the node was already attached.
    pub(crate) fn attach(&mut self, node: NodeId) -> bool {
        if self.is_attached(node) {
            return false;
        }
        self.join(node);
        self.attached.push(node);
        true
    }

    /// Returns false if the node was not attached.
    pub(crate) fn detach(&mut self, node: NodeId) -> bool {
        let before = self.attached.len();
        self.attached.retain(|&m| m != node);
        before != self.attached.len()
    }
}
