//! Neighbourhood sampling around a headline.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Binary presence masks, one row per sample.
///
/// Row 0 is the unperturbed headline (all ones). Every other row removes
/// between 1 and `num_words` distinct words chosen uniformly at random.
pub fn sample_masks(num_words: usize, num_samples: usize, seed: u64) -> Array2<f64> {
    let rows = num_samples.max(1);
    let mut masks = Array2::<f64>::ones((rows, num_words));
    if num_words == 0 {
        return masks;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    for mut row in masks.rows_mut().into_iter().skip(1) {
        let removed = rng.random_range(1..=num_words);
        for idx in rand::seq::index::sample(&mut rng, num_words, removed).into_iter() {
            row[idx] = 0.0;
        }
    }
    masks
}

/// Cosine distance of every mask to the all-ones row, times 100.
///
/// For a binary mask with `m` present words out of `d` the cosine similarity
/// is `sqrt(m / d)`. An empty mask has similarity 0 (distance 100).
pub fn distances(masks: &Array2<f64>) -> Array1<f64> {
    let d = masks.ncols() as f64;
    masks
        .rows()
        .into_iter()
        .map(|row| {
            let present = row.sum();
            let similarity = if present > 0.0 && d > 0.0 {
                (present / d).sqrt()
            } else {
                0.0
            };
            (1.0 - similarity) * 100.0
        })
        .collect()
}

/// Exponential kernel `sqrt(exp(-d^2 / width^2))`.
pub fn kernel_weights(distances: &Array1<f64>, kernel_width: f64) -> Array1<f64> {
    let w2 = kernel_width * kernel_width;
    distances.mapv(|d| (-(d * d) / w2).exp().sqrt())
}

/// Turn a mask row into per-word presence flags.
pub fn presence(row: ndarray::ArrayView1<'_, f64>) -> Vec<bool> {
    row.iter().map(|v| *v > 0.5).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_row_is_original() {
        let masks = sample_masks(6, 50, 7);
        assert_eq!(masks.nrows(), 50);
        assert!(masks.row(0).iter().all(|v| *v == 1.0));
    }

    #[test]
    fn test_every_perturbation_removes_at_least_one_word() {
        let masks = sample_masks(5, 200, 1);
        for row in masks.rows().into_iter().skip(1) {
            let present = row.sum();
            assert!(present <= 4.0, "row keeps all words: {:?}", row);
        }
    }

    #[test]
    fn test_same_seed_same_masks() {
        assert_eq!(sample_masks(8, 100, 42), sample_masks(8, 100, 42));
        assert_ne!(sample_masks(8, 100, 42), sample_masks(8, 100, 43));
    }

    #[test]
    fn test_distance_and_kernel() {
        let masks = ndarray::array![[1.0, 1.0, 1.0, 1.0], [1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 0.0]];
        let dist = distances(&masks);
        assert!(dist[0].abs() < 1e-9);
        assert!((dist[1] - 50.0).abs() < 1e-9);
        assert!((dist[2] - 100.0).abs() < 1e-9);

        let weights = kernel_weights(&dist, 25.0);
        assert!((weights[0] - 1.0).abs() < 1e-12);
        // exp(-4)^0.5 = exp(-2)
        assert!((weights[1] - (-2.0f64).exp()).abs() < 1e-12);
        assert!(weights[2] < weights[1]);
    }
}
