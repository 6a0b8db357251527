pub mod builder;
pub mod frame_store;
pub mod index;

pub use builder::{build_hierarchy, SceneGraph};
pub use frame_store::HierarchyFrameStore;
pub use index::{SceneHierarchyIndex, SceneHierarchyNode};
