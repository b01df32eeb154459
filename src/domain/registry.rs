//! Document-owned registries for node ids and icons.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};
use uuid::Uuid;

use crate::domain::content::MindIcon;
use crate::domain::NodeId;
use crate::errors::{MapError, MapResult};

/// Unique string ids, assigned lazily.
#[derive(Debug)]
pub struct IdRegistry {
    prefix: String,
    ids: HashMap<String, NodeId>,
}

impl IdRegistry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ids: HashMap::new(),
        }
    }

    /// Generates a fresh id and reserves it for `node`.
    pub fn generate(&mut self, node: NodeId) -> String {
        loop {
            let number = (Uuid::new_v4().as_u128() & 0x7fff_ffff) as u32;
            let candidate = format!("{}{}", self.prefix, number);
            if !self.ids.contains_key(&candidate) {
                trace!(id = %candidate, %node, "generated id");
                self.ids.insert(candidate.clone(), node);
                return candidate;
            }
        }
    }

    pub fn register(&mut self, id: &str, node: NodeId) -> MapResult<()> {
        match self.ids.get(id) {
            Some(&owner) if owner != node => Err(MapError::DuplicateId { id: id.to_string() }),
            _ => {
                self.ids.insert(id.to_string(), node);
                Ok(())
            }
        }
    }

    pub fn unregister(&mut self, id: &str) -> Option<NodeId> {
        self.ids.remove(id)
    }

    pub fn lookup(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        debug!(count = self.ids.len(), "clearing id registry");
        self.ids.clear();
    }
}

/// Icons used anywhere in the document, interned by name.
#[derive(Debug, Default)]
pub struct IconRegistry {
    icons: BTreeMap<String, MindIcon>,
}

impl IconRegistry {
    /// Returns the document's instance for this icon name.
    pub fn add_icon(&mut self, icon: &MindIcon) -> MindIcon {
        self.icons
            .entry(icon.name().to_string())
            .or_insert_with(|| icon.clone())
            .clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.icons.contains_key(name)
    }

    pub fn icons(&self) -> impl Iterator<Item = &MindIcon> {
        self.icons.values()
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    pub fn clear(&mut self) {
        self.icons.clear();
    }
}
