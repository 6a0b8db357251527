//! Per-frame hierarchy snapshot store.
//!
//! Readbacks complete an arbitrary number of frames after dispatch, so each
//! frame's hierarchy snapshot must stay alive until every consumer that
//! dispatched against it has been served. The store tracks a subscriber
//! count per frame and tears the snapshot down exactly when it reaches zero.

use super::index::SceneHierarchyIndex;
use std::collections::HashMap;

struct StoredHierarchy {
    index: SceneHierarchyIndex,
    subscribers: u32,
}

/// Maps frame numbers to hierarchy snapshots with subscriber counting.
#[derive(Default)]
pub struct HierarchyFrameStore {
    frames: HashMap<u64, StoredHierarchy>,
}

impl HierarchyFrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the snapshot for a frame. `subscribers` is the number of
    /// consumers that will dispatch against this frame and later release it.
    pub fn insert(&mut self, frame: u64, index: SceneHierarchyIndex, subscribers: u32) {
        if subscribers == 0 {
            log::warn!("Hierarchy snapshot for frame {frame} stored with no subscribers");
        }
        self.frames
            .insert(frame, StoredHierarchy { index, subscribers });
    }

    /// The snapshot valid for the given frame.
    ///
    /// A missing snapshot is a broken invariant (a consumer dispatched
    /// without storing one), not a recoverable error.
    pub fn get(&self, frame: u64) -> &SceneHierarchyIndex {
        match self.frames.get(&frame) {
            Some(stored) => &stored.index,
            None => panic!("no hierarchy snapshot stored for frame {frame}"),
        }
    }

    pub fn contains_frame(&self, frame: u64) -> bool {
        self.frames.contains_key(&frame)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Releases one subscription for the given frame; the snapshot is
    /// destroyed when the last subscriber releases it. Releasing a frame
    /// with no remaining subscribers is a caller bug.
    pub fn release(&mut self, frame: u64) {
        let stored = self
            .frames
            .get_mut(&frame)
            .unwrap_or_else(|| panic!("released hierarchy snapshot for frame {frame} more than once"));
        assert!(
            stored.subscribers > 0,
            "hierarchy snapshot subscriber count underflow for frame {frame}"
        );
        stored.subscribers -= 1;
        if stored.subscribers == 0 {
            self.frames.remove(&frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_survives_until_last_subscriber_releases() {
        let mut store = HierarchyFrameStore::new();
        store.insert(3, SceneHierarchyIndex::new(), 2);

        store.release(3);
        assert!(store.contains_frame(3));

        store.release(3);
        assert!(!store.contains_frame(3));
    }

    #[test]
    #[should_panic(expected = "more than once")]
    fn over_releasing_panics() {
        let mut store = HierarchyFrameStore::new();
        store.insert(0, SceneHierarchyIndex::new(), 1);
        store.release(0);
        store.release(0);
    }

    #[test]
    #[should_panic(expected = "no hierarchy snapshot stored for frame")]
    fn missing_snapshot_is_fatal() {
        let store = HierarchyFrameStore::new();
        let _ = store.get(42);
    }
}
