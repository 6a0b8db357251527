//! Instance id to label entry lookup cache.
//!
//! Backs the O(1) path from a rendered instance id to its configured label
//! entry. The cache is kept current by the registry's generator mechanism
//! (it updates on label-state changes, not every frame) and can be frozen
//! into an independent snapshot for use inside multi-frame-latent
//! operations such as GPU readbacks, during which the live cache may mutate.

use super::label_config::{LabelConfig, LabelEntry};
use super::labeled_object::LabeledObject;
use super::registry::GroundTruthGenerator;
use std::any::Any;
use std::sync::Arc;

/// Slot value for "no entry". Label entry indices must stay below this,
/// which bounds a config to at most 65535 distinct entries.
const UNSET: u16 = u16::MAX;

const STARTING_CAPACITY: usize = 1 << 8;

/// Growable lookup from instance id to label entry index.
///
/// Activate the cache on an [`InstanceRegistry`](super::InstanceRegistry) to
/// keep it updated; a detached cache (a [`snapshot`](Self::snapshot) or a
/// deactivated cache) is frozen and never changes again.
#[derive(Clone)]
pub struct LabelMatchCache {
    lookup: Vec<u16>,
    config: Arc<LabelConfig>,
}

impl LabelMatchCache {
    pub fn new(config: Arc<LabelConfig>) -> Self {
        Self {
            lookup: Vec::with_capacity(STARTING_CAPACITY),
            config,
        }
    }

    /// Retrieves the label entry for the given instance id.
    ///
    /// Returns `None` for ids that are out of the cache's current bounds or
    /// have no matching entry.
    pub fn try_get_label_entry(&self, instance_id: u32) -> Option<(&LabelEntry, usize)> {
        let slot = *self.lookup.get(instance_id as usize)?;
        if slot == UNSET {
            return None;
        }
        let index = slot as usize;
        Some((&self.config.entries[index], index))
    }

    /// Produces an independent frozen copy reflecting exactly the current
    /// contents. Mutating the live cache afterwards never affects the
    /// snapshot.
    pub fn snapshot(&self) -> LabelMatchCache {
        self.clone()
    }

    pub fn config(&self) -> &Arc<LabelConfig> {
        &self.config
    }

    fn set(&mut self, instance_id: u32, index: usize) {
        assert!(
            index < UNSET as usize,
            "too many entries in the label config"
        );
        let slot = instance_id as usize;
        if self.lookup.len() <= slot {
            // Gaps belong to ids this cache has never seen; they read as unset.
            self.lookup.resize(slot + 1, UNSET);
        }
        self.lookup[slot] = index as u16;
    }

    fn clear(&mut self, instance_id: u32) {
        if let Some(slot) = self.lookup.get_mut(instance_id as usize) {
            *slot = UNSET;
        }
    }
}

impl GroundTruthGenerator for LabelMatchCache {
    fn setup_object(&mut self, object: &LabeledObject) {
        match self.config.try_match(&object.labels) {
            Some((_, index)) => self.set(object.instance_id(), index),
            None => self.clear(object.instance_id()),
        }
    }

    fn clear_object(&mut self, object: &LabeledObject) {
        self.clear(object.instance_id());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
