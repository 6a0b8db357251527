pub mod bounding_boxes;
pub mod object_info;
pub mod pixel_weights;
pub mod weighted_counts;

pub use bounding_boxes::{BoundingBoxReducer, ObjectInfoCallback};
pub use object_info::{collect_object_infos, BoundingBox, InstanceBounds, RenderedObjectInfo};
pub use pixel_weights::PixelWeights;
pub use weighted_counts::weighted_pixel_counts;
