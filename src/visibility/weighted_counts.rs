//! Weighted per-instance pixel aggregation.
//!
//! Counts the weighted sum of pixels covered by each instance id in a
//! segmentation image. The image is split into contiguous partitions, each
//! run-length-encoded in parallel, and the per-partition pairs are folded
//! into one accumulator. A run that straddles a partition boundary is
//! encoded by both neighboring workers; the merge sums weights per id, so
//! the final totals are unaffected.

use rayon::prelude::*;
use std::ops::Range;

/// One run of identical instance ids and its accumulated weight.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RunLengthIdCount {
    id: u32,
    weight: f32,
}

/// Computes the weighted pixel count for each instance id present in
/// `instance_ids`, indexed by `id - 1`. Id 0 ("no object") is dropped.
///
/// `instance_ids` and `pixel_weights` are parallel per-pixel arrays;
/// `object_count` must be at least the largest instance id present.
pub fn weighted_pixel_counts(
    instance_ids: &[u32],
    pixel_weights: &[f32],
    object_count: usize,
) -> Vec<f32> {
    assert_eq!(
        instance_ids.len(),
        pixel_weights.len(),
        "instance id and weight arrays must be the same length"
    );

    let worker_count = rayon::current_num_threads().max(1);
    let partitions: Vec<Vec<RunLengthIdCount>> =
        partition_ranges(instance_ids.len(), worker_count)
            .into_par_iter()
            .map(|range| run_length_encode(&instance_ids[range.clone()], &pixel_weights[range]))
            .collect();

    let mut counts = vec![0.0f32; object_count];
    for partition in partitions {
        for run in partition {
            counts[(run.id - 1) as usize] += run.weight;
        }
    }
    counts
}

/// Splits `len` elements into `worker_count` contiguous ranges. The last
/// range absorbs any rounding remainder.
fn partition_ranges(len: usize, worker_count: usize) -> Vec<Range<usize>> {
    let slice_length = len as f64 / worker_count as f64;
    (0..worker_count)
        .map(|i| {
            let start = (slice_length * i as f64) as usize;
            let end = if i == worker_count - 1 {
                len
            } else {
                (slice_length * (i + 1) as f64) as usize
            };
            start..end
        })
        .collect()
}

/// Compresses a pixel slice into (id, summed weight) pairs for consecutive
/// runs of equal ids, dropping runs of id 0.
fn run_length_encode(instance_ids: &[u32], pixel_weights: &[f32]) -> Vec<RunLengthIdCount> {
    let mut runs = Vec::new();
    let mut current = RunLengthIdCount { id: 0, weight: 0.0 };

    for (&id, &weight) in instance_ids.iter().zip(pixel_weights) {
        if id == current.id {
            current.weight += weight;
        } else {
            if current.id != 0 {
                runs.push(current);
            }
            current = RunLengthIdCount { id, weight };
        }
    }
    if current.id != 0 {
        runs.push(current);
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_drops_background_runs() {
        let ids = [0, 0, 0, 0, 7, 7, 4];
        let weights = [1.0f32; 7];
        let runs = run_length_encode(&ids, &weights);
        assert_eq!(
            runs,
            vec![
                RunLengthIdCount { id: 7, weight: 2.0 },
                RunLengthIdCount { id: 4, weight: 1.0 },
            ]
        );
    }

    #[test]
    fn full_coverage_counts_every_pixel() {
        // A single instance covering M pixels of weight 1.0 aggregates to M.
        let pixel_count = 4096;
        let ids = vec![1u32; pixel_count];
        let weights = vec![1.0f32; pixel_count];
        let counts = weighted_pixel_counts(&ids, &weights, 1);
        assert_eq!(counts, vec![pixel_count as f32]);
    }

    #[test]
    fn weights_accumulate_per_instance() {
        let ids = [1, 1, 2, 0, 2, 3];
        let weights = [0.5, 0.25, 1.0, 9.0, 1.0, 2.0];
        let counts = weighted_pixel_counts(&ids, &weights, 3);
        assert_eq!(counts, vec![0.75, 2.0, 2.0]);
    }

    #[test]
    fn runs_straddling_partition_boundaries_keep_their_totals() {
        // One long run of the same id crosses every partition boundary.
        // Adjacent workers each encode their piece separately, and the merge
        // must still produce the exact total.
        let ids = vec![1u32; 1000];
        let weights = vec![0.5f32; 1000];
        let counts = weighted_pixel_counts(&ids, &weights, 1);
        assert!((counts[0] - 500.0).abs() < 1e-3);
    }

    #[test]
    fn partition_ranges_cover_everything_exactly_once() {
        for (len, workers) in [(10, 3), (1000, 24), (7, 8), (0, 4)] {
            let ranges = partition_ranges(len, workers);
            assert_eq!(ranges.len(), workers);
            let mut next = 0;
            for range in &ranges {
                assert_eq!(range.start, next);
                next = range.end;
            }
            assert_eq!(next, len);
        }
    }
}
