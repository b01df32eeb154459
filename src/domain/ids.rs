//! Arena handles for nodes and clone sets.

use std::fmt;

use generational_arena::Index;

/// Handle of a tree position inside a [`Document`](crate::domain::Document).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "n{}v{}", slot, generation)
    }
}

/// Handle of a clone set, which also owns the shared content of its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloneSetId(pub(crate) Index);
