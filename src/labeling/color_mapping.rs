//! Deterministic segmentation color assignment.
//!
//! Maps an instance index to a unique RGBA color for color-coded instance
//! segmentation rendering. The mapping is deterministic: the same index
//! always produces the same color. Index 0 is reserved for "no object" and
//! maps to opaque black.
//!
//! The first 64 indices are spread across the HSV spectrum with a
//! golden-ratio walk so that neighboring indices get visually contrasting
//! colors; all of them carry alpha 255. Indices beyond 64 enumerate the raw
//! RGB cube across descending alpha values 254..1, supporting over four
//! billion distinct colors.

/// An 8-bit RGBA color, laid out to match GPU texel data.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color32 {
    pub const BLACK: Color32 = Color32 {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

const HSV_COUNT: u32 = 64;
const COLORS_PER_ALPHA: u32 = 256 * 256 * 256;
const HUES_PER_VALUE: u32 = 30;
const GOLDEN_RATIO: f32 = 1.618_034;

/// The largest instance index this mapping can represent. Alpha 0 and the
/// colors reserved for the HSV range are excluded from the RGB cube walk.
pub const MAX_INSTANCE_INDEX: u32 = u32::MAX - 2 * COLORS_PER_ALPHA + HSV_COUNT;

/// Returns the segmentation color for the given instance index.
///
/// Index 0 maps to opaque black ("no object"). Exceeding
/// [`MAX_INSTANCE_INDEX`] is a fatal condition.
pub fn color_for_instance_index(index: u32) -> Color32 {
    assert!(
        index <= MAX_INSTANCE_INDEX,
        "instance index {index} exceeds the maximum representable segmentation color"
    );

    if index == 0 {
        return Color32::BLACK;
    }

    if index <= HSV_COUNT {
        return hsv_color_for_index(index);
    }

    let shifted = index - HSV_COUNT;
    let rgb = shifted % COLORS_PER_ALPHA;
    let alpha = 254 - shifted / COLORS_PER_ALPHA;
    Color32::new(
        (rgb >> 16) as u8,
        (rgb >> 8) as u8,
        rgb as u8,
        alpha as u8,
    )
}

fn hsv_color_for_index(index: u32) -> Color32 {
    let count = index - 1;

    let ratio = count as f32 * GOLDEN_RATIO;
    let hue = ratio.fract();

    let ratio = (count / HUES_PER_VALUE) as f32 * GOLDEN_RATIO;
    let value = 1.0 - ratio.fract();

    hsv_to_rgb(hue, 1.0, value)
}

/// Converts HSV (all components in [0, 1]) to an opaque RGBA color.
fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Color32 {
    let h = hue.fract() * 6.0;
    let sector = h.floor();
    let f = h - sector;

    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));

    let (r, g, b) = match sector as u32 {
        0 => (value, t, p),
        1 => (q, value, p),
        2 => (p, value, t),
        3 => (p, q, value),
        4 => (t, p, value),
        _ => (value, p, q),
    };

    Color32::new(
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
        255,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn index_zero_is_black() {
        assert_eq!(color_for_instance_index(0), Color32::BLACK);
    }

    #[test]
    fn colors_are_deterministic() {
        for index in [1, 7, 64, 65, 5000, 1_000_000] {
            assert_eq!(
                color_for_instance_index(index),
                color_for_instance_index(index)
            );
        }
    }

    #[test]
    fn hsv_range_colors_are_opaque_and_distinct() {
        let mut seen = HashSet::new();
        for index in 1..=64 {
            let color = color_for_instance_index(index);
            assert_eq!(color.a, 255, "index {index} should be in the HSV range");
            assert!(seen.insert(color), "index {index} collides");
        }
    }

    #[test]
    fn extended_range_never_collides_with_hsv_range() {
        // Everything past the HSV range uses alpha 254 or lower, so it can
        // never collide with the alpha-255 HSV colors or with black.
        for index in [65u32, 66, 1000, 2_000_000] {
            let color = color_for_instance_index(index);
            assert!(color.a < 255);
            assert_ne!(color, Color32::BLACK);
        }
    }

    #[test]
    fn extended_range_is_injective_within_alpha() {
        let a = color_for_instance_index(65);
        let b = color_for_instance_index(66);
        assert_ne!(a, b);
    }
}
