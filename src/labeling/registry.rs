//! Instance identity registry.
//!
//! Assigns stable instance ids to labeled objects and produces the per-frame
//! instance-index and segmentation-color snapshots consumed by the renderer.
//!
//! ## Identity model
//!
//! - Instance ids start at 1 and increase monotonically. Id 0 always means
//!   "no object". An id is never reused, even after its object is
//!   unregistered.
//! - The *instance index* (an object's slot in the per-frame snapshot) is
//!   recomputed every frame from the registered set's current iteration
//!   order and is **not** stable across frames. Only the instance id is.
//! - Segmentation colors are assigned per slot, append-only: once a slot
//!   has a color it never changes, so color-coded renders stay temporally
//!   consistent.
//!
//! ## Lifecycle
//!
//! Newly created objects sit in a pending set until [`register_pending`]
//! flushes them, once per logical tick. Flushing replays each object through
//! every active [`GroundTruthGenerator`] so auxiliary per-object state (like
//! the label match cache) stays in sync with label configuration.
//!
//! The registry is a single-writer structure: it is mutated only by the
//! update thread that owns it. Consumers entering multi-frame-latent
//! operations must snapshot the arrays they need at dispatch time.
//!
//! [`register_pending`]: InstanceRegistry::register_pending

use super::color_mapping::{color_for_instance_index, Color32};
use super::labeled_object::LabeledObject;
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Receives per-object callbacks whenever labeled objects are registered or
/// their label state changes. Used to push or clear auxiliary per-object
/// state without coupling the registry to its consumers.
pub trait GroundTruthGenerator: Any {
    /// Called for each enabled labeled object when it is registered, and
    /// replayed for all registered objects when this generator is activated.
    fn setup_object(&mut self, object: &LabeledObject);

    /// Called instead of [`setup_object`](Self::setup_object) for disabled
    /// objects.
    fn clear_object(&mut self, object: &LabeledObject);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Registry of labeled objects and their stable instance identities.
pub struct InstanceRegistry {
    next_instance_id: u32,
    /// Ids queued for registration, in insertion order.
    pending: Vec<u32>,
    /// Registered ids, in insertion order. Iteration order defines the
    /// per-frame slot assignment.
    registered: Vec<u32>,
    objects: HashMap<u32, LabeledObject>,
    generators: Vec<Box<dyn GroundTruthGenerator>>,
    last_snapshot_frame: Option<u64>,
    /// Per-frame instance id by slot. Slot 0 is reserved for "no object".
    frame_instance_ids: Vec<u32>,
    /// Segmentation color by slot, parallel to `frame_instance_ids` but
    /// append-only: it never shrinks and assigned colors never change.
    segmentation_colors: Vec<Color32>,
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self {
            next_instance_id: 1,
            pending: Vec::new(),
            registered: Vec::new(),
            objects: HashMap::new(),
            generators: Vec::new(),
            last_snapshot_frame: None,
            frame_instance_ids: vec![0],
            segmentation_colors: vec![Color32::BLACK],
        }
    }

    /// Creates a labeled object, assigns it the next instance id, and queues
    /// it for registration.
    pub fn create_labeled(&mut self, labels: Vec<String>) -> u32 {
        let instance_id = self.next_instance_id();
        self.objects
            .insert(instance_id, LabeledObject::new(instance_id, labels));
        self.pending.push(instance_id);
        instance_id
    }

    /// Queues an existing object for (re-)registration. Queuing an already
    /// pending or registered id is a logged no-op.
    pub fn register(&mut self, instance_id: u32) {
        if !self.objects.contains_key(&instance_id) {
            log::warn!("Cannot register unknown instance id {instance_id}");
            return;
        }
        if self.pending.contains(&instance_id) || self.registered.contains(&instance_id) {
            log::info!("Instance id {instance_id} is already registered, ignoring");
            return;
        }
        self.pending.push(instance_id);
    }

    /// Flushes the pending set into the registered set, replaying each
    /// flushed object through all active generators. Idempotent; intended to
    /// run once per logical tick, not per frame.
    pub fn register_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for instance_id in pending {
            if self.registered.contains(&instance_id) {
                continue;
            }
            // Destroyed while pending: plain removal, nothing to replay.
            let Some(object) = self.objects.get(&instance_id) else {
                continue;
            };
            for generator in &mut self.generators {
                if object.enabled {
                    generator.setup_object(object);
                } else {
                    generator.clear_object(object);
                }
            }
            self.registered.push(instance_id);
        }
    }

    /// Removes an object from both the pending and registered sets and
    /// resets its current frame slot to "no object". Its instance id is
    /// never reclaimed. Unknown ids are a plain no-op.
    pub fn unregister(&mut self, instance_id: u32) {
        self.pending.retain(|&id| id != instance_id);
        self.registered.retain(|&id| id != instance_id);
        self.objects.remove(&instance_id);
        for slot in self.frame_instance_ids.iter_mut().skip(1) {
            if *slot == instance_id {
                *slot = 0;
            }
        }
    }

    /// Moves a registered object back to the pending set so generators run
    /// again on the next flush. Required after its labels change.
    pub fn refresh(&mut self, instance_id: u32) {
        self.registered.retain(|&id| id != instance_id);
        if self.objects.contains_key(&instance_id) && !self.pending.contains(&instance_id) {
            self.pending.push(instance_id);
        }
    }

    /// Replaces an object's labels and queues it for generator replay.
    pub fn set_labels(&mut self, instance_id: u32, labels: Vec<String>) {
        if let Some(object) = self.objects.get_mut(&instance_id) {
            object.labels = labels;
            self.refresh(instance_id);
        }
    }

    /// Toggles an object's enabled flag and queues it for generator replay.
    pub fn set_enabled(&mut self, instance_id: u32, enabled: bool) {
        if let Some(object) = self.objects.get_mut(&instance_id) {
            object.enabled = enabled;
            self.refresh(instance_id);
        }
    }

    pub fn labeled_object(&self, instance_id: u32) -> Option<&LabeledObject> {
        self.objects.get(&instance_id)
    }

    /// Registered instance ids in their current iteration order.
    pub fn registered_ids(&self) -> &[u32] {
        &self.registered
    }

    /// Activates a ground truth generator. All currently registered objects
    /// are replayed through the new generator exactly once. Activating a
    /// second generator of the same concrete type is a no-op.
    pub fn activate_generator(&mut self, mut generator: Box<dyn GroundTruthGenerator>) {
        let type_id = generator.as_any().type_id();
        if self
            .generators
            .iter()
            .any(|active| active.as_any().type_id() == type_id)
        {
            log::info!("Generator of this type is already active, ignoring");
            return;
        }
        for instance_id in &self.registered {
            let object = &self.objects[instance_id];
            if object.enabled {
                generator.setup_object(object);
            } else {
                generator.clear_object(object);
            }
        }
        self.generators.push(generator);
    }

    /// Deactivates the generator of the given type and returns it. No
    /// automatic cleanup pass is performed: state the generator pushed for
    /// registered objects stays as-is.
    pub fn deactivate_generator<T: GroundTruthGenerator>(
        &mut self,
    ) -> Option<Box<dyn GroundTruthGenerator>> {
        let type_id = TypeId::of::<T>();
        let position = self
            .generators
            .iter()
            .position(|active| active.as_any().type_id() == type_id)?;
        Some(self.generators.remove(position))
    }

    /// Typed access to an active generator.
    pub fn generator<T: GroundTruthGenerator>(&self) -> Option<&T> {
        self.generators
            .iter()
            .find_map(|active| active.as_any().downcast_ref::<T>())
    }

    /// Typed mutable access to an active generator.
    pub fn generator_mut<T: GroundTruthGenerator>(&mut self) -> Option<&mut T> {
        self.generators
            .iter_mut()
            .find_map(|active| active.as_any_mut().downcast_mut::<T>())
    }

    /// Recomputes the per-frame snapshot for the given frame index. Calling
    /// it again with the same frame index is a no-op.
    ///
    /// The instance id array is rebuilt from the registered set's current
    /// iteration order, with slot 0 reserved for "no object". The color
    /// array grows to cover every slot, assigning each fresh slot a
    /// deterministic collision-resistant color; previously assigned colors
    /// are never altered.
    pub fn begin_frame_snapshot(&mut self, frame: u64) {
        if self.last_snapshot_frame == Some(frame) {
            return;
        }
        self.last_snapshot_frame = Some(frame);

        self.frame_instance_ids.clear();
        self.frame_instance_ids.push(0);
        self.frame_instance_ids.extend_from_slice(&self.registered);

        while self.segmentation_colors.len() < self.frame_instance_ids.len() {
            let slot = self.segmentation_colors.len() as u32;
            self.segmentation_colors.push(color_for_instance_index(slot));
        }
    }

    /// The instance id for each slot of the current frame snapshot.
    pub fn frame_instance_ids(&self) -> &[u32] {
        &self.frame_instance_ids
    }

    /// The segmentation color for each slot. Append-only; may be longer than
    /// the current frame's instance id array.
    pub fn segmentation_colors(&self) -> &[Color32] {
        &self.segmentation_colors
    }

    /// Returns the next instance id. Single-writer: the registry must not be
    /// shared between concurrently allocating callers. Counter overflow is a
    /// fatal condition.
    fn next_instance_id(&mut self) -> u32 {
        let instance_id = self.next_instance_id;
        self.next_instance_id = self
            .next_instance_id
            .checked_add(1)
            .expect("instance id counter overflow");
        instance_id
    }
}
