use thiserror::Error;

use crate::domain::NodeId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("precondition violated on node {node}: {reason}")]
    PreconditionViolation { node: NodeId, reason: String },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("cycle detected: node {0} would become its own ancestor")]
    CycleDetected(NodeId),

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("id already registered for another node: {id}")]
    DuplicateId { id: String },

    #[error("extension already present: {0}")]
    ExtensionAlreadyPresent(&'static str),

    #[error("config error: {message}")]
    Config { message: String },
}

impl MapError {
    pub fn precondition(node: NodeId, reason: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            node,
            reason: reason.into(),
        }
    }
}

pub type MapResult<T> = Result<T, MapError>;
