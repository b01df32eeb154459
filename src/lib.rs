//! Clone-aware hierarchical document model for mind-map editors.
//!
//! A [`Document`] owns a tree of nodes in an arena. Any set of positions may
//! be clones of one another: they share one content payload (text, icons,
//! extensions, history) while keeping their own fold state, side and views.

pub mod config;
pub mod domain;
pub mod errors;
pub mod tree_traits;
pub mod util;

pub use config::{ChoiceProperty, NewChildSide, Settings};
pub use domain::{Document, NodeId};
pub use errors::{MapError, MapResult};
