//! Domain layer: the clone-aware node tree
//!
//! This layer is independent of external concerns (no I/O, no rendering, no persistence).

pub mod clones;
pub mod content;
pub mod document;
pub mod events;
pub mod gates;
pub mod ids;
pub mod iter;
pub mod node;
pub mod registry;

pub use clones::CloneSet;
pub use content::{Extensions, HistoryInformation, MindIcon, SharedContent, UserObject};
pub use document::Document;
pub use events::{ChangeValue, NodeChangeEvent, NodeChangeListener, NodeProperty, NodeView};
pub use gates::{NodeCapabilities, OpenGate};
pub use ids::{CloneSetId, NodeId};
pub use node::{FilterInfo, Node, NodePosition};
pub use registry::{IconRegistry, IdRegistry};
