//! The document: node arena, clone sets and the registries that make a
//! subtree live.
//!
//! Nodes are addressed by [`NodeId`] handles. A node stores its parent as a
//! handle and owns the ordered list of its children's handles. Content is
//! held once per clone set, so a change made through any member is visible
//! through all of them.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use generational_arena::Arena;
use itertools::Itertools;
use tracing::{debug, instrument, trace};

use crate::config::{NewChildSide, Settings};
use crate::domain::clones::CloneSet;
use crate::domain::content::{HistoryInformation, MindIcon, SharedContent, UserObject};
use crate::domain::events::{
    ChangeValue, NodeChangeEvent, NodeChangeListener, NodeProperty, NodeView,
};
use crate::domain::gates::{NodeCapabilities, OpenGate};
use crate::domain::iter::{PostOrderIterator, SubtreeIterator};
use crate::domain::node::{FilterInfo, Node, NodePosition};
use crate::domain::registry::{IconRegistry, IdRegistry};
use crate::domain::{CloneSetId, NodeId};
use crate::errors::{MapError, MapResult};

pub struct Document {
    nodes: Arena<Node>,
    clone_sets: Arena<CloneSet>,
    root: NodeId,
    ids: IdRegistry,
    icons: IconRegistry,
    gate: Rc<dyn NodeCapabilities>,
    listeners: Vec<Rc<dyn NodeChangeListener>>,
    settings: Settings,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .field("clone_sets", &self.clone_sets.len())
            .field("ids", &self.ids.len())
            .field("icons", &self.icons.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Document {
    /// Opens a document with an empty, attached root.
    pub fn new(settings: Settings) -> Self {
        let mut nodes = Arena::new();
        let mut clone_sets = Arena::new();
        let set = CloneSetId(clone_sets.insert(CloneSet::new(SharedContent::default())));
        let root = NodeId(nodes.insert(Node::new(set)));
        if let Some(clone_set) = clone_sets.get_mut(set.0) {
            clone_set.attach(root);
        }
        debug!(%root, "opened document");
        Self {
            nodes,
            clone_sets,
            root,
            ids: IdRegistry::new(settings.id_prefix.clone()),
            icons: IconRegistry::default(),
            gate: Rc::new(OpenGate),
            listeners: Vec::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_capabilities(&mut self, gate: Rc<dyn NodeCapabilities>) {
        self.gate = gate;
    }

    /// Clears the id and icon registries and drops document listeners.
    pub fn close(&mut self) {
        debug!(nodes = self.nodes.len(), "closing document");
        for (_, node) in self.nodes.iter_mut() {
            node.id = None;
        }
        self.ids.clear();
        self.icons.clear();
        self.listeners.clear();
    }

    // ------------------------------------------------------------------
    // arena access
    // ------------------------------------------------------------------

    pub fn node(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node.0)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(node.0)
    }

    /// Number of nodes alive in the arena, linked or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct content payloads alive.
    pub fn clone_set_count(&self) -> usize {
        self.clone_sets.len()
    }

    fn get(&self, node: NodeId) -> MapResult<&Node> {
        self.nodes.get(node.0).ok_or(MapError::UnknownNode(node))
    }

    fn get_mut(&mut self, node: NodeId) -> MapResult<&mut Node> {
        self.nodes.get_mut(node.0).ok_or(MapError::UnknownNode(node))
    }

    fn set_of(&self, node: NodeId) -> MapResult<&CloneSet> {
        let set = self.get(node)?.clone_set;
        self.clone_sets
            .get(set.0)
            .ok_or(MapError::UnknownNode(node))
    }

    fn set_of_mut(&mut self, node: NodeId) -> MapResult<&mut CloneSet> {
        let set = self.get(node)?.clone_set;
        self.clone_sets
            .get_mut(set.0)
            .ok_or(MapError::UnknownNode(node))
    }

    pub fn content(&self, node: NodeId) -> MapResult<&SharedContent> {
        Ok(self.set_of(node)?.content())
    }

    fn content_mut(&mut self, node: NodeId) -> MapResult<&mut SharedContent> {
        Ok(self.set_of_mut(node)?.content_mut())
    }

    // ------------------------------------------------------------------
    // capabilities
    // ------------------------------------------------------------------

    pub fn is_accessible(&self, node: NodeId) -> bool {
        self.gate.is_accessible(self, node)
    }

    pub fn is_visible(&self, node: NodeId) -> bool {
        self.gate.is_visible(self, node)
    }

    fn is_always_unfolded(&self, node: NodeId) -> bool {
        self.gate.is_always_unfolded(self, node)
    }

    // ------------------------------------------------------------------
    // creation and disposal
    // ------------------------------------------------------------------

    /// Creates an unlinked node with its own content.
    pub fn create_node(&mut self, text: impl Into<String>) -> NodeId {
        let set = CloneSetId(
            self.clone_sets
                .insert(CloneSet::new(SharedContent::with_text(text.into()))),
        );
        let node = NodeId(self.nodes.insert(Node::new(set)));
        if let Some(clone_set) = self.clone_sets.get_mut(set.0) {
            clone_set.join(node);
        }
        trace!(%node, "created node");
        node
    }

    /// Frees an unlinked subtree. Content is dropped with its last clone.
    #[instrument(level = "debug", skip(self))]
    pub fn dispose(&mut self, node: NodeId) -> MapResult<usize> {
        if node == self.root {
            return Err(MapError::precondition(node, "the root cannot be disposed"));
        }
        if self.get(node)?.parent.is_some() {
            return Err(MapError::precondition(node, "node is still linked to a parent"));
        }
        let doomed: Vec<NodeId> = self.iter_postorder(node).collect();
        for &n in &doomed {
            let Some(removed) = self.nodes.remove(n.0) else {
                continue;
            };
            if let Some(id) = removed.id {
                self.ids.unregister(&id);
            }
            let emptied = self
                .clone_sets
                .get_mut(removed.clone_set.0)
                .is_some_and(|set| set.leave(n));
            if emptied {
                self.clone_sets.remove(removed.clone_set.0);
                trace!(node = %n, "content released");
            }
        }
        debug!(count = doomed.len(), "disposed subtree");
        Ok(doomed.len())
    }

    /// Replaces the root with an unlinked node and its subtree.
    #[instrument(level = "debug", skip(self))]
    pub fn set_root(&mut self, new_root: NodeId) -> MapResult<()> {
        if self.get(new_root)?.parent.is_some() {
            return Err(MapError::precondition(new_root, "the new root has a parent"));
        }
        if new_root == self.root {
            return Ok(());
        }
        let old_root = self.root;
        self.detach(old_root)?;
        self.root = new_root;
        self.attach(new_root)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // navigation
    // ------------------------------------------------------------------

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_root(&self, node: NodeId) -> bool {
        node == self.root
    }

    pub fn parent(&self, node: NodeId) -> MapResult<Option<NodeId>> {
        Ok(self.get(node)?.parent)
    }

    /// All children in display order, regardless of accessibility.
    pub fn children(&self, node: NodeId) -> MapResult<&[NodeId]> {
        Ok(&self.get(node)?.children)
    }

    /// Zero for inaccessible nodes: locked children are structurally hidden.
    pub fn child_count(&self, node: NodeId) -> MapResult<usize> {
        let n = self.get(node)?;
        if !self.is_accessible(node) {
            return Ok(0);
        }
        Ok(n.children.len())
    }

    pub fn child_at(&self, node: NodeId, index: usize) -> MapResult<NodeId> {
        let children = &self.get(node)?.children;
        children
            .get(index)
            .copied()
            .ok_or(MapError::IndexOutOfRange {
                index,
                len: children.len(),
            })
    }

    pub fn child_position(&self, parent: NodeId, child: NodeId) -> MapResult<Option<usize>> {
        Ok(self.get(parent)?.children.iter().position(|&c| c == child))
    }

    /// Position of `node` among its parent's children; `None` for unlinked nodes.
    pub fn index_of(&self, node: NodeId) -> MapResult<Option<usize>> {
        match self.get(node)?.parent {
            Some(parent) => self.child_position(parent, node),
            None => Ok(None),
        }
    }

    pub fn is_leaf(&self, node: NodeId) -> MapResult<bool> {
        Ok(self.child_count(node)? == 0)
    }

    pub fn has_children(&self, node: NodeId) -> MapResult<bool> {
        Ok(self.child_count(node)? != 0)
    }

    /// Navigation hint: the child most recently inserted at an explicit index.
    pub fn preferred_child(&self, node: NodeId) -> MapResult<Option<NodeId>> {
        Ok(self.get(node)?.preferred_child)
    }

    /// Length of the parent chain; the root has depth 0.
    pub fn depth(&self, node: NodeId) -> MapResult<usize> {
        match self.get(node)?.parent {
            None => Ok(0),
            Some(parent) => Ok(self.depth(parent)? + 1),
        }
    }

    /// Ancestors from the topmost one down to the node itself.
    pub fn path_to_root(&self, node: NodeId) -> MapResult<Vec<NodeId>> {
        let mut path = vec![node];
        let mut current = self.get(node)?.parent;
        while let Some(n) = current {
            path.push(n);
            current = self.get(n)?.parent;
        }
        path.reverse();
        Ok(path)
    }

    /// True if `ancestor` is a (transitive) parent of `node`.
    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> MapResult<bool> {
        let mut current = self.get(node)?.parent;
        while let Some(n) = current {
            if n == ancestor {
                return Ok(true);
            }
            current = self.get(n)?.parent;
        }
        Ok(false)
    }

    /// Number of ancestors, optionally skipping those hidden by the filter.
    pub fn node_level(&self, node: NodeId, count_hidden: bool) -> MapResult<usize> {
        let mut level = 0;
        let mut current = self.get(node)?.parent;
        while let Some(n) = current {
            if count_hidden || self.is_visible(n) {
                level += 1;
            }
            current = self.get(n)?.parent;
        }
        Ok(level)
    }

    /// Nearest visible node on the path to the root, or the topmost ancestor.
    pub fn visible_ancestor_or_self(&self, node: NodeId) -> MapResult<NodeId> {
        let mut current = node;
        while !self.is_visible(current) {
            match self.get(current)?.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(current)
    }

    pub fn iter_subtree(&self, node: NodeId) -> SubtreeIterator<'_> {
        SubtreeIterator::new(self, node)
    }

    pub fn iter_postorder(&self, node: NodeId) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self, node)
    }

    // ------------------------------------------------------------------
    // structural mutation
    // ------------------------------------------------------------------

    /// Inserts `child` under `parent`; `None` appends.
    ///
    /// An explicit index also makes the child the preferred child.
    #[instrument(level = "debug", skip(self))]
    pub fn insert(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) -> MapResult<()> {
        self.get(parent)?;
        if !self.is_accessible(parent) {
            return Err(MapError::precondition(
                parent,
                "cannot insert into an inaccessible node",
            ));
        }
        self.check_linkable(parent, child)?;

        let parent_node = self.get_mut(parent)?;
        let len = parent_node.children.len();
        let at = match index {
            None => len,
            Some(i) if i > len => return Err(MapError::IndexOutOfRange { index: i, len }),
            Some(i) => {
                parent_node.preferred_child = Some(child);
                i
            }
        };
        parent_node.children.insert(at, child);

        self.rebind_parent(child, Some(parent))?;
        self.fire_node_inserted(parent, child, at)?;
        Ok(())
    }

    /// Inserts at the end, as an explicit index.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> MapResult<()> {
        let at = self.child_count(parent)?;
        self.insert(parent, child, Some(at))
    }

    /// Unlinks and returns the child at `index`.
    #[instrument(level = "debug", skip(self))]
    pub fn remove(&mut self, parent: NodeId, index: usize) -> MapResult<NodeId> {
        let parent_node = self.get_mut(parent)?;
        let len = parent_node.children.len();
        if index >= len {
            return Err(MapError::IndexOutOfRange { index, len });
        }
        let child = parent_node.children[index];
        if parent_node.preferred_child == Some(child) {
            let next = parent_node.children.get(index + 1).copied();
            let previous = index
                .checked_sub(1)
                .and_then(|i| parent_node.children.get(i).copied());
            parent_node.preferred_child = next.or(previous);
        }

        self.rebind_parent(child, None)?;
        self.get_mut(parent)?.children.remove(index);
        self.fire_node_removed(parent, child, index)?;
        Ok(child)
    }

    /// Moves `node` under `new_parent` (appended), or unlinks it for `None`.
    #[instrument(level = "debug", skip(self))]
    pub fn set_parent(&mut self, node: NodeId, new_parent: Option<NodeId>) -> MapResult<()> {
        let old_parent = self.get(node)?.parent;
        if old_parent == new_parent {
            return Ok(());
        }
        if let Some(parent) = new_parent {
            self.get(parent)?;
            if !self.is_accessible(parent) {
                return Err(MapError::precondition(
                    parent,
                    "cannot insert into an inaccessible node",
                ));
            }
            if node == self.root {
                return Err(MapError::precondition(node, "the root cannot become a child"));
            }
            if parent == node || self.is_descendant_of(parent, node)? {
                return Err(MapError::CycleDetected(node));
            }
        }
        if let Some(old) = old_parent {
            let index = self
                .child_position(old, node)?
                .ok_or(MapError::UnknownNode(node))?;
            self.remove(old, index)?;
        }
        if let Some(parent) = new_parent {
            self.insert(parent, node, None)?;
        }
        Ok(())
    }

    fn check_linkable(&self, parent: NodeId, child: NodeId) -> MapResult<()> {
        if self.get(child)?.parent.is_some() {
            return Err(MapError::precondition(child, "node already has a parent"));
        }
        if child == self.root {
            return Err(MapError::precondition(child, "the root cannot become a child"));
        }
        if child == parent || self.is_descendant_of(parent, child)? {
            return Err(MapError::CycleDetected(child));
        }
        Ok(())
    }

    /// Rebinds the parent pointer; the only place attachment changes.
    fn rebind_parent(&mut self, node: NodeId, new_parent: Option<NodeId>) -> MapResult<()> {
        let old_parent = self.get(node)?.parent;
        let old_attached = match old_parent {
            Some(p) => self.is_attached(p)?,
            None => false,
        };
        let new_attached = match new_parent {
            Some(p) => self.is_attached(p)?,
            None => false,
        };
        if old_parent.is_none() && new_parent.is_some() && new_attached {
            self.attach(node)?;
        } else if old_parent.is_some() && old_attached && !new_attached {
            self.detach(node)?;
        }
        self.get_mut(node)?.parent = new_parent;
        Ok(())
    }

    fn attach(&mut self, node: NodeId) -> MapResult<()> {
        let subtree: Vec<NodeId> = self.iter_subtree(node).collect();
        for &n in &subtree {
            let clone_set = self.set_of_mut(n)?;
            if clone_set.attach(n) && clone_set.size() > 1 {
                let targets = clone_set.attached().to_vec();
                self.fire_clones_changed(&targets)?;
            }
        }
        debug!(%node, count = subtree.len(), "attached subtree");
        Ok(())
    }

    fn detach(&mut self, node: NodeId) -> MapResult<()> {
        let subtree: Vec<NodeId> = self.iter_subtree(node).collect();
        for &n in &subtree {
            let clone_set = self.set_of_mut(n)?;
            if clone_set.detach(n) && clone_set.size() > 0 {
                let mut targets = clone_set.attached().to_vec();
                targets.push(n);
                self.fire_clones_changed(&targets)?;
            }
        }
        debug!(%node, count = subtree.len(), "detached subtree");
        Ok(())
    }

    // ------------------------------------------------------------------
    // presentation state
    // ------------------------------------------------------------------

    /// True when folded, and always for inaccessible nodes.
    pub fn is_folded(&self, node: NodeId) -> MapResult<bool> {
        let folded = self.get(node)?.folded;
        Ok(folded || !self.is_accessible(node))
    }

    /// Folds or unfolds after applying the lock and always-unfolded overrides.
    #[instrument(level = "trace", skip(self))]
    pub fn set_folded(&mut self, node: NodeId, folded: bool) -> MapResult<()> {
        let mut folded = folded;
        if !folded && !self.is_accessible(node) {
            folded = true;
        } else if self.is_always_unfolded(node) {
            folded = false;
        }
        let n = self.get_mut(node)?;
        if n.folded == folded {
            return Ok(());
        }
        n.folded = folded;
        self.fire_views_changed(&NodeChangeEvent::new(
            node,
            NodeProperty::Folding,
            Some(ChangeValue::Bool(!folded)),
            Some(ChangeValue::Bool(folded)),
        ))
    }

    /// Side of the node; an unknown side follows the nearest ancestor.
    pub fn is_left(&self, node: NodeId) -> MapResult<bool> {
        let mut current = Some(node);
        while let Some(n) = current {
            let data = self.get(n)?;
            match data.position {
                NodePosition::Left => return Ok(true),
                NodePosition::Right => return Ok(false),
                NodePosition::Unknown => current = data.parent,
            }
        }
        Ok(false)
    }

    /// Sets the side and carries it into the descendants still on the old side.
    #[instrument(level = "trace", skip(self))]
    pub fn set_left(&mut self, node: NodeId, is_left: bool) -> MapResult<()> {
        let mut targets = vec![node];
        if !self.is_root(node) {
            let was_left = self.is_left(node)?;
            self.collect_side_followers(node, was_left, &mut targets)?;
        }
        trace!(followers = %targets.iter().skip(1).join(", "), "moving side");
        let position = NodePosition::from_left(is_left);
        for target in targets {
            self.get_mut(target)?.position = position;
        }
        Ok(())
    }

    fn collect_side_followers(
        &self,
        node: NodeId,
        was_left: bool,
        out: &mut Vec<NodeId>,
    ) -> MapResult<()> {
        if !self.is_accessible(node) {
            return Ok(());
        }
        for &child in &self.get(node)?.children {
            if self.is_left(child)? == was_left {
                out.push(child);
                self.collect_side_followers(child, was_left, out)?;
            }
        }
        Ok(())
    }

    /// Side a new child of `node` should be placed on.
    ///
    /// Below the root a child follows its parent. At the root the configured
    /// side wins; in auto mode new children go left once more than half of
    /// the existing children are on the right.
    pub fn is_new_child_left(&self, node: NodeId) -> MapResult<bool> {
        if !self.is_root(node) {
            return self.is_left(node);
        }
        match self.settings.new_child_side {
            NewChildSide::Left => Ok(true),
            NewChildSide::Right => Ok(false),
            NewChildSide::Auto => {
                let count = self.child_count(node)?;
                let mut right = 0;
                for &child in self.get(node)?.children.iter().take(count) {
                    if !self.is_left(child)? {
                        right += 1;
                    }
                }
                Ok(right > count / 2)
            }
        }
    }

    pub fn filter_info(&self, node: NodeId) -> MapResult<FilterInfo> {
        Ok(self.get(node)?.filter_info)
    }

    pub fn filter_info_mut(&mut self, node: NodeId) -> MapResult<&mut FilterInfo> {
        Ok(&mut self.get_mut(node)?.filter_info)
    }

    // ------------------------------------------------------------------
    // clones
    // ------------------------------------------------------------------

    /// A node sharing content with `source`, with no children.
    #[instrument(level = "trace", skip(self))]
    pub fn clone_node(&mut self, source: NodeId) -> MapResult<NodeId> {
        let set = self.get(source)?.clone_set;
        let copy = NodeId(self.nodes.insert(Node::new(set)));
        self.set_of_mut(copy)?.join(copy);
        Ok(copy)
    }

    /// Mirrors the subtree; each copy shares content with its source.
    #[instrument(level = "debug", skip(self))]
    pub fn clone_tree(&mut self, source: NodeId) -> MapResult<NodeId> {
        let copy = self.clone_node(source)?;
        let children = self.get(source)?.children.clone();
        for child in children {
            let child_copy = self.clone_tree(child)?;
            self.get_mut(copy)?.children.push(child_copy);
            self.rebind_parent(child_copy, Some(copy))?;
        }
        Ok(copy)
    }

    /// Makes `node` share `target`'s content. Attachment state is kept.
    #[instrument(level = "debug", skip(self))]
    pub fn convert_to_clone(&mut self, node: NodeId, target: NodeId) -> MapResult<()> {
        let old_set = self.get(node)?.clone_set;
        let new_set = self.get(target)?.clone_set;
        if old_set == new_set {
            return Ok(());
        }
        let was_attached = self.is_attached(node)?;

        if let Some(set) = self.clone_sets.get_mut(old_set.0) {
            if set.leave(node) {
                self.clone_sets.remove(old_set.0);
                trace!(%node, "previous content released");
            } else if was_attached && set.size() > 0 {
                let mut targets = set.attached().to_vec();
                targets.push(node);
                self.fire_clones_changed(&targets)?;
            }
        }

        self.get_mut(node)?.clone_set = new_set;
        let set = self.set_of_mut(node)?;
        set.join(node);
        if was_attached {
            set.attach(node);
            let targets = set.attached().to_vec();
            if targets.len() > 1 {
                self.fire_clones_changed(&targets)?;
            }
        }
        Ok(())
    }

    /// Whether this position is reachable from a document root.
    pub fn is_attached(&self, node: NodeId) -> MapResult<bool> {
        Ok(self.set_of(node)?.is_attached(node))
    }

    /// Attached members of the node's clone set as seen from the node:
    /// zero while the node itself is unattached.
    pub fn attached_clone_count(&self, node: NodeId) -> MapResult<usize> {
        let set = self.set_of(node)?;
        Ok(if set.is_attached(node) { set.size() } else { 0 })
    }

    /// The clones notifications fan out to; only the node while unattached.
    pub fn attached_clones(&self, node: NodeId) -> MapResult<Vec<NodeId>> {
        let set = self.set_of(node)?;
        if set.is_attached(node) {
            Ok(set.attached().to_vec())
        } else {
            Ok(vec![node])
        }
    }

    /// Every node sharing this node's content, attached or not.
    pub fn clone_set_members(&self, node: NodeId) -> MapResult<&[NodeId]> {
        Ok(self.set_of(node)?.members())
    }

    pub fn is_clone_of(&self, node: NodeId, other: NodeId) -> MapResult<bool> {
        Ok(self.get(node)?.clone_set == self.get(other)?.clone_set)
    }

    /// True if any node of this subtree shares content with `other`.
    pub fn subtree_contains_clone_of(&self, node: NodeId, other: NodeId) -> MapResult<bool> {
        let target = self.get(other)?.clone_set;
        self.get(node)?;
        Ok(self
            .iter_subtree(node)
            .any(|n| self.node(n).is_some_and(|data| data.clone_set == target)))
    }

    /// True where a clone relationship starts: no parent, or a parent with
    /// fewer attached clones than this node.
    pub fn is_subtree_root(&self, node: NodeId) -> MapResult<bool> {
        match self.get(node)?.parent {
            None => Ok(true),
            Some(parent) => {
                Ok(self.attached_clone_count(parent)? < self.attached_clone_count(node)?)
            }
        }
    }

    pub fn subtree_root(&self, node: NodeId) -> MapResult<NodeId> {
        let mut current = node;
        while !self.is_subtree_root(current)? {
            match self.get(current)?.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(current)
    }

    // ------------------------------------------------------------------
    // shared content
    // ------------------------------------------------------------------

    pub fn text(&self, node: NodeId) -> MapResult<String> {
        Ok(self.content(node)?.text())
    }

    pub fn xml_text(&self, node: NodeId) -> MapResult<Option<&str>> {
        Ok(self.content(node)?.xml_text())
    }

    pub fn plain_text(&self, node: NodeId) -> MapResult<String> {
        Ok(self.content(node)?.plain_text())
    }

    pub fn user_object(&self, node: NodeId) -> MapResult<&UserObject> {
        Ok(self.content(node)?.user_object())
    }

    pub fn history_information(&self, node: NodeId) -> MapResult<&HistoryInformation> {
        Ok(self.content(node)?.history())
    }

    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) -> MapResult<()> {
        let text = text.into();
        let content = self.content_mut(node)?;
        let old = content.text();
        if old == text {
            return Ok(());
        }
        content.set_text(text.clone());
        self.fire_node_changed(NodeChangeEvent::new(
            node,
            NodeProperty::Text,
            Some(ChangeValue::Text(old)),
            Some(ChangeValue::Text(text)),
        ))
    }

    pub fn set_xml_text(&mut self, node: NodeId, markup: impl Into<String>) -> MapResult<()> {
        let markup = markup.into();
        let content = self.content_mut(node)?;
        let old = content.xml_text().map(str::to_string);
        if old.as_deref() == Some(markup.as_str()) {
            return Ok(());
        }
        content.set_xml_text(markup.clone());
        self.fire_node_changed(NodeChangeEvent::new(
            node,
            NodeProperty::XmlText,
            old.map(ChangeValue::Text),
            Some(ChangeValue::Text(markup)),
        ))
    }

    pub fn set_user_object(&mut self, node: NodeId, object: UserObject) -> MapResult<()> {
        let content = self.content_mut(node)?;
        if content.user_object() == &object {
            return Ok(());
        }
        let old = content.user_object().clone();
        content.set_user_object(object.clone());
        self.fire_node_changed(NodeChangeEvent::new(
            node,
            NodeProperty::UserObject,
            Some(ChangeValue::UserObject(old)),
            Some(ChangeValue::UserObject(object)),
        ))
    }

    pub fn set_history_information(
        &mut self,
        node: NodeId,
        history: HistoryInformation,
    ) -> MapResult<()> {
        self.content_mut(node)?.set_history(history);
        self.fire_node_changed(NodeChangeEvent::new(node, NodeProperty::History, None, None))
    }

    pub fn icons(&self, node: NodeId) -> MapResult<&[MindIcon]> {
        Ok(self.content(node)?.icons())
    }

    pub fn icon(&self, node: NodeId, position: usize) -> MapResult<Option<&MindIcon>> {
        Ok(self.content(node)?.icons().get(position))
    }

    pub fn icon_registry(&self) -> &IconRegistry {
        &self.icons
    }

    pub fn add_icon(&mut self, node: NodeId, icon: &MindIcon) -> MapResult<()> {
        let len = self.content(node)?.icons().len();
        self.add_icon_at(node, icon, len)
    }

    pub fn add_icon_at(&mut self, node: NodeId, icon: &MindIcon, position: usize) -> MapResult<()> {
        let len = self.content(node)?.icons().len();
        if position > len {
            return Err(MapError::IndexOutOfRange {
                index: position,
                len,
            });
        }
        let icon = self.icons.add_icon(icon);
        self.content_mut(node)?
            .icons_mut()
            .insert(position, icon.clone());
        self.fire_node_changed(NodeChangeEvent::new(
            node,
            NodeProperty::Icon,
            None,
            Some(ChangeValue::Icon(icon)),
        ))
    }

    /// Removes the last icon; returns the number of icons left.
    pub fn remove_icon(&mut self, node: NodeId) -> MapResult<usize> {
        let len = self.content(node)?.icons().len();
        if len == 0 {
            return Ok(0);
        }
        self.remove_icon_at(node, len - 1)
    }

    /// Removes the icon at `position`; returns the number of icons left.
    pub fn remove_icon_at(&mut self, node: NodeId, position: usize) -> MapResult<usize> {
        let icons = self.content_mut(node)?.icons_mut();
        if position >= icons.len() {
            return Err(MapError::IndexOutOfRange {
                index: position,
                len: icons.len(),
            });
        }
        let removed = icons.remove(position);
        let remaining = icons.len();
        self.fire_node_changed(NodeChangeEvent::new(
            node,
            NodeProperty::Icon,
            Some(ChangeValue::Icon(removed)),
            None,
        ))?;
        Ok(remaining)
    }

    pub fn extension<T: Any>(&self, node: NodeId) -> MapResult<Option<&T>> {
        Ok(self.content(node)?.extensions().get::<T>())
    }

    pub fn contains_extension<T: Any>(&self, node: NodeId) -> MapResult<bool> {
        Ok(self.content(node)?.extensions().contains::<T>())
    }

    pub fn add_extension<T: Any>(&mut self, node: NodeId, value: T) -> MapResult<()> {
        self.content_mut(node)?.extensions_mut().add(value)?;
        self.fire_node_changed(NodeChangeEvent::new(node, NodeProperty::Extension, None, None))
    }

    pub fn put_extension<T: Any>(&mut self, node: NodeId, value: T) -> MapResult<Option<T>> {
        let old = self.content_mut(node)?.extensions_mut().put(value);
        self.fire_node_changed(NodeChangeEvent::new(node, NodeProperty::Extension, None, None))?;
        Ok(old)
    }

    pub fn remove_extension<T: Any>(&mut self, node: NodeId) -> MapResult<Option<T>> {
        let old = self.content_mut(node)?.extensions_mut().remove::<T>();
        if old.is_some() {
            self.fire_node_changed(NodeChangeEvent::new(
                node,
                NodeProperty::Extension,
                None,
                None,
            ))?;
        }
        Ok(old)
    }

    // ------------------------------------------------------------------
    // ids
    // ------------------------------------------------------------------

    pub fn id(&self, node: NodeId) -> MapResult<Option<&str>> {
        Ok(self.get(node)?.id())
    }

    /// Returns the node's id, assigning a fresh one on first request.
    pub fn create_id(&mut self, node: NodeId) -> MapResult<String> {
        if let Some(id) = &self.get(node)?.id {
            return Ok(id.clone());
        }
        let id = self.ids.generate(node);
        self.get_mut(node)?.id = Some(id.clone());
        Ok(id)
    }

    pub fn set_id(&mut self, node: NodeId, id: &str) -> MapResult<()> {
        self.get(node)?;
        self.ids.register(id, node)?;
        let old = self.get_mut(node)?.id.replace(id.to_string());
        if let Some(old) = old.filter(|old| old != id) {
            self.ids.unregister(&old);
        }
        Ok(())
    }

    pub fn node_by_id(&self, id: &str) -> Option<NodeId> {
        self.ids.lookup(id)
    }

    // ------------------------------------------------------------------
    // observers
    // ------------------------------------------------------------------

    pub fn add_view(&mut self, node: NodeId, view: Rc<dyn NodeView>) -> MapResult<()> {
        self.get_mut(node)?.views.push(view);
        Ok(())
    }

    pub fn remove_view(&mut self, node: NodeId, view: &Rc<dyn NodeView>) -> MapResult<bool> {
        let views = &mut self.get_mut(node)?.views;
        let before = views.len();
        views.retain(|v| !Rc::ptr_eq(v, view));
        Ok(views.len() != before)
    }

    pub fn has_views(&self, node: NodeId) -> MapResult<bool> {
        Ok(!self.get(node)?.views.is_empty())
    }

    pub fn add_node_change_listener(&mut self, listener: Rc<dyn NodeChangeListener>) {
        self.listeners.push(listener);
    }

    pub fn remove_node_change_listener(&mut self, listener: &Rc<dyn NodeChangeListener>) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !Rc::ptr_eq(l, listener));
        self.listeners.len() != before
    }

    /// Dispatches a content change to document listeners and views, once
    /// per attached clone with the event rebound to that clone. The changed
    /// node is notified even while unattached.
    pub fn fire_node_changed(&self, event: NodeChangeEvent) -> MapResult<()> {
        let targets = self.content_change_targets(event.node())?;
        let listeners = self.listeners.clone();
        if targets.len() == 1 {
            return self.fire_single_node_changed(&listeners, &event);
        }
        for clone in targets {
            self.fire_single_node_changed(&listeners, &event.for_node(clone))?;
        }
        Ok(())
    }

    /// Attached members of the node's clone set plus the node itself.
    fn content_change_targets(&self, node: NodeId) -> MapResult<Vec<NodeId>> {
        let mut targets = self.set_of(node)?.attached().to_vec();
        if !targets.contains(&node) {
            targets.push(node);
        }
        Ok(targets)
    }

    fn fire_single_node_changed(
        &self,
        listeners: &[Rc<dyn NodeChangeListener>],
        event: &NodeChangeEvent,
    ) -> MapResult<()> {
        for listener in listeners {
            listener.node_changed(event);
        }
        self.fire_views_changed(event)
    }

    fn fire_views_changed(&self, event: &NodeChangeEvent) -> MapResult<()> {
        let views = self.get(event.node())?.views.clone();
        for view in views {
            view.node_changed(event);
        }
        Ok(())
    }

    fn fire_clones_changed(&self, targets: &[NodeId]) -> MapResult<()> {
        for &target in targets {
            self.fire_views_changed(&NodeChangeEvent::new(
                target,
                NodeProperty::Clones,
                None,
                None,
            ))?;
        }
        Ok(())
    }

    fn fire_node_inserted(&self, parent: NodeId, child: NodeId, index: usize) -> MapResult<()> {
        let views = self.get(parent)?.views.clone();
        for view in views {
            view.on_node_inserted(parent, child, index);
        }
        Ok(())
    }

    fn fire_node_removed(&self, parent: NodeId, child: NodeId, index: usize) -> MapResult<()> {
        let views = self.get(parent)?.views.clone();
        for view in views {
            view.on_node_deleted(parent, child, index);
        }
        Ok(())
    }
}
