pub mod color_mapping;
pub mod label_config;
pub mod labeled_object;
pub mod match_cache;
pub mod registry;

pub use color_mapping::{color_for_instance_index, Color32, MAX_INSTANCE_INDEX};
pub use label_config::{LabelConfig, LabelConfigLoadError, LabelConfigSaveError, LabelEntry};
pub use labeled_object::LabeledObject;
pub use match_cache::LabelMatchCache;
pub use registry::{GroundTruthGenerator, InstanceRegistry};
