//! # Groundtruth: Instance Identity and Visibility Extraction
//!
//! Groundtruth assigns stable identity to labeled objects in a rendered
//! scene and converts rendered instance-segmentation buffers into
//! structured, perspective-corrected visibility data for dataset
//! generation.
//!
//! ## Architecture Overview
//!
//! The crate is organized into three subsystems:
//!
//! ### 1. Labeling ([`labeling`])
//!
//! Identity management and label configuration:
//! - [`labeling::InstanceRegistry`] - assigns stable instance ids, produces
//!   the per-frame instance-index and segmentation-color snapshots
//! - [`labeling::LabelMatchCache`] - O(1) instance id to label entry lookup,
//!   kept current through the registry's generator mechanism
//! - [`labeling::LabelConfig`] - label-to-dataset-id configuration with YAML
//!   persistence
//! - [`labeling::color_mapping`] - deterministic collision-resistant
//!   segmentation colors
//!
//! **Key Design**: identities and colors are temporally consistent. An
//! instance id is never reused and a slot's color never changes, so objects
//! stay recognizable across every frame of a dataset.
//!
//! ### 2. Hierarchy ([`hierarchy`])
//!
//! Per-frame snapshots of the labeled scene tree:
//! - [`hierarchy::build_hierarchy`] - breadth-first walk over an external
//!   [`hierarchy::SceneGraph`], treating unlabeled nodes as transparent
//! - [`hierarchy::SceneHierarchyIndex`] - the snapshot itself, filterable to
//!   on-screen objects
//! - [`hierarchy::HierarchyFrameStore`] - keeps each frame's snapshot alive
//!   until every async consumer has been served
//!
//! ### 3. Visibility ([`visibility`])
//!
//! Converts rendered instance-index images into per-object statistics:
//! - [`visibility::BoundingBoxReducer`] - GPU clear/scan reduction into
//!   per-instance bounding boxes and pixel counts, with non-blocking
//!   multi-frame readback
//! - [`visibility::PixelWeights`] - closed-form solid-angle weight per
//!   pixel, correcting perspective projection bias
//! - [`visibility::weighted_pixel_counts`] - parallel run-length-encoded
//!   aggregation of weighted visibility per instance
//!
//! ## Data Flow
//!
//! 1. The registry assigns identities and builds the frame snapshot.
//! 2. The external renderer paints an instance-index image from that
//!    snapshot.
//! 3. The caller builds the frame's hierarchy snapshot and stores it in the
//!    frame store with one subscription per dispatched reducer.
//! 4. [`visibility::BoundingBoxReducer::dispatch`] records the reduction and
//!    returns immediately; [`visibility::BoundingBoxReducer::poll`] fires
//!    the callback on a later tick with the results paired to that exact
//!    frame's hierarchy snapshot.
//!
//! ## Concurrency Model
//!
//! A single update/render thread drives dispatch. GPU readback is observed
//! only through fire-once callbacks that may arrive frames later; consumers
//! snapshot everything they need at dispatch time. CPU aggregation is
//! fork-join data parallelism via rayon.

pub mod hierarchy;
pub mod labeling;
pub mod visibility;

pub use hierarchy::{build_hierarchy, HierarchyFrameStore, SceneHierarchyIndex, SceneHierarchyNode};
pub use labeling::{
    Color32, InstanceRegistry, LabelConfig, LabelEntry, LabelMatchCache, LabeledObject,
};
pub use visibility::{BoundingBoxReducer, PixelWeights, RenderedObjectInfo};
