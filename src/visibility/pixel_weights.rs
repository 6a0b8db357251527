//! Perspective-corrected pixel weights.
//!
//! Raw pixel counts are biased by perspective projection: pixels near the
//! center of the field of view capture less observable space than pixels
//! near the edges capture more. Weighting each pixel by the solid angle it
//! subtends removes that bias, so an object's weighted count measures its
//! actual observable surface area regardless of where it sits in the frame.
//!
//! The weight of a pixel is computed in closed form. Each pixel corner maps
//! to parametric tangent-plane coordinates (t, s) at unit distance from the
//! camera; the integral
//!
//! ```text
//! F(t, s) = atan(t * s / sqrt(1 + t^2 + s^2))
//! ```
//!
//! gives the solid angle of the axis-aligned tangent-plane rectangle from
//! the origin to (t, s), and inclusion-exclusion over the four corners
//! isolates the exact solid angle of the pixel.
//!
//! The total observable space around a camera is the surface of the unit
//! sphere (4π), and a square 90° field of view covers exactly one cubemap
//! face, so the weights of such an image sum to 4π/6. That identity is used
//! as a correctness check in the tests.

use rayon::prelude::*;

/// A per-pixel weight table for one (resolution, fov) configuration.
///
/// Computed once, immutable afterwards, and reused across frames.
pub struct PixelWeights {
    width: u32,
    height: u32,
    weights: Vec<f32>,
}

impl PixelWeights {
    /// Computes the weight table for an image of the given resolution
    /// rendered with the given vertical field of view (degrees). The
    /// horizontal field of view follows from the aspect ratio.
    pub fn new(width: u32, height: u32, vertical_fov_degrees: f32) -> Self {
        assert!(width > 0 && height > 0, "pixel weight table must not be empty");

        let aspect = width as f32 / height as f32;
        let v_fov = vertical_fov_degrees.to_radians();
        let h_fov = 2.0 * ((v_fov / 2.0).tan() * aspect).atan();

        // Extent of the parametric fov surface at unit distance, and the
        // extent of one pixel on it.
        let x_max = (h_fov / 2.0).tan();
        let y_max = (v_fov / 2.0).tan();
        let pixel_width = x_max / (width as f32 / 2.0);
        let pixel_height = y_max / (height as f32 / 2.0);

        let w = width as f32;
        let h = height as f32;

        let mut weights = vec![0.0f32; (width * height) as usize];
        weights
            .par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(pixel_y, row)| {
                let s = y_max * ((2.0 * pixel_y as f32 - (h - 1.0)).abs() - 1.0) / h;
                for (pixel_x, weight) in row.iter_mut().enumerate() {
                    let t = x_max * ((2.0 * pixel_x as f32 - (w - 1.0)).abs() - 1.0) / w;

                    let bottom_left = solid_angle_integral(t, s);
                    let top_left = solid_angle_integral(t, s + pixel_height);
                    let bottom_right = solid_angle_integral(t + pixel_width, s);
                    let top_right = solid_angle_integral(t + pixel_width, s + pixel_height);

                    *weight = top_right - top_left - bottom_right + bottom_left;
                }
            });

        Self {
            width,
            height,
            weights,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major weights, one per pixel.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

/// Observable solid angle of the tangent-plane rectangle spanning the origin
/// to (t, s) at unit distance from the camera.
fn solid_angle_integral(t: f32, s: f32) -> f32 {
    (t * s / (1.0 + t * t + s * s).sqrt()).atan()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn total_weight(weights: &PixelWeights) -> f64 {
        weights.weights().iter().map(|&w| w as f64).sum()
    }

    #[test]
    fn ninety_degree_square_image_covers_one_cubemap_face() {
        for resolution in [32, 128] {
            let weights = PixelWeights::new(resolution, resolution, 90.0);
            let total = total_weight(&weights);
            let expected = 4.0 * PI / 6.0;
            let relative_error = (total - expected).abs() / expected;
            assert!(
                relative_error < 1e-3,
                "resolution {resolution}: total {total} expected {expected}"
            );
        }
    }

    #[test]
    fn weights_are_positive_and_center_heavy() {
        let weights = PixelWeights::new(64, 64, 90.0);
        assert!(weights.weights().iter().all(|&w| w > 0.0));

        // Perspective bias: a center pixel subtends more solid angle than a
        // corner pixel.
        let center = weights.weights()[32 * 64 + 32];
        let corner = weights.weights()[0];
        assert!(center > corner);
    }

    #[test]
    fn weights_are_symmetric() {
        let width = 48;
        let weights = PixelWeights::new(width, 48, 70.0);
        let w = weights.weights();
        for y in 0..48usize {
            for x in 0..width as usize / 2 {
                let mirrored = width as usize - 1 - x;
                let a = w[y * width as usize + x];
                let b = w[y * width as usize + mirrored];
                assert!((a - b).abs() < 1e-6, "asymmetry at row {y}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn table_is_reused_unchanged() {
        let weights = PixelWeights::new(16, 16, 60.0);
        let snapshot = weights.weights().to_vec();
        assert_eq!(weights.weights(), snapshot.as_slice());
        assert_eq!(weights.width(), 16);
        assert_eq!(weights.height(), 16);
    }
}
