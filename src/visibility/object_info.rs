//! Per-object visibility results and the GPU accumulator layout.

use crate::labeling::Color32;
use std::collections::HashSet;

/// Per-slot bounding box accumulator, matching the WGSL `InstanceBounds`
/// struct in `shaders/bounding_boxes.wgsl`.
///
/// Rows follow the renderer's bottom-up convention: `min_y` is the lowest
/// covered row and `max_y` the highest. [`rect`](Self::rect) converts to a
/// top-left origin.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceBounds {
    pub min_y: u32,
    pub max_y: u32,
    pub min_x: u32,
    pub max_x: u32,
    pub pixel_count: u32,
}

impl InstanceBounds {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Converts the raw extrema into a top-left-origin pixel rect.
    pub fn rect(&self, image_height: u32) -> BoundingBox {
        BoundingBox {
            x: self.min_x,
            y: image_height - self.max_y - 1,
            width: self.width(),
            height: self.height(),
        }
    }
}

/// An axis-aligned pixel rect with a top-left origin.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Visibility statistics for one labeled object in one rendered frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedObjectInfo {
    /// The object's transient slot in this frame's snapshot.
    pub instance_index: u32,
    /// The object's stable instance id.
    pub instance_id: u32,
    pub bounding_box: BoundingBox,
    pub pixel_count: u32,
    pub instance_color: Color32,
}

/// Converts raw per-slot accumulators into [`RenderedObjectInfo`] entries,
/// using the instance id and color snapshots taken at dispatch time.
///
/// Slot 0 ("no object") and slots with no covered pixels are skipped. Also
/// returns the set of visible instance ids, used to filter the frame's
/// hierarchy snapshot down to on-screen objects.
pub fn collect_object_infos(
    bounds: &[InstanceBounds],
    instance_ids: &[u32],
    colors: &[Color32],
    image_height: u32,
) -> (Vec<RenderedObjectInfo>, HashSet<u32>) {
    let mut infos = Vec::with_capacity(instance_ids.len().saturating_sub(1));
    let mut visible_ids = HashSet::new();

    for instance_index in 1..instance_ids.len().min(bounds.len()) {
        let instance_bounds = &bounds[instance_index];
        if instance_bounds.pixel_count == 0 {
            continue;
        }

        let instance_id = instance_ids[instance_index];
        visible_ids.insert(instance_id);
        infos.push(RenderedObjectInfo {
            instance_index: instance_index as u32,
            instance_id,
            bounding_box: instance_bounds.rect(image_height),
            pixel_count: instance_bounds.pixel_count,
            instance_color: colors[instance_index],
        });
    }

    (infos, visible_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeling::color_for_instance_index;

    const EMPTY: InstanceBounds = InstanceBounds {
        min_y: u32::MAX,
        max_y: 0,
        min_x: u32::MAX,
        max_x: 0,
        pixel_count: 0,
    };

    #[test]
    fn rect_inverts_vertical_origin() {
        // Rows 2..=5 of a 10-row image (bottom-up) become y=4 top-down.
        let bounds = InstanceBounds {
            min_y: 2,
            max_y: 5,
            min_x: 3,
            max_x: 7,
            pixel_count: 20,
        };
        assert_eq!(
            bounds.rect(10),
            BoundingBox {
                x: 3,
                y: 4,
                width: 5,
                height: 4,
            }
        );
    }

    #[test]
    fn single_pixel_bounds_have_unit_extent() {
        let bounds = InstanceBounds {
            min_y: 0,
            max_y: 0,
            min_x: 9,
            max_x: 9,
            pixel_count: 1,
        };
        let rect = bounds.rect(4);
        assert_eq!((rect.width, rect.height), (1, 1));
        assert_eq!(rect.y, 3);
    }

    #[test]
    fn collect_skips_slot_zero_and_empty_slots() {
        let covered = InstanceBounds {
            min_y: 0,
            max_y: 1,
            min_x: 0,
            max_x: 1,
            pixel_count: 4,
        };
        let bounds = [covered, EMPTY, covered, EMPTY];
        let instance_ids = [0u32, 11, 12, 13];
        let colors: Vec<_> = (0..4).map(color_for_instance_index).collect();

        let (infos, visible) = collect_object_infos(&bounds, &instance_ids, &colors, 8);

        // Slot 0 is covered but reserved; slots 1 and 3 are empty.
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].instance_index, 2);
        assert_eq!(infos[0].instance_id, 12);
        assert_eq!(infos[0].pixel_count, 4);
        assert_eq!(infos[0].instance_color, colors[2]);
        assert_eq!(visible, [12].into_iter().collect());
    }
}
