//! Weighted linear surrogate fitted on the perturbation neighbourhood.

use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Regularisation used to rank features for `highest_weights` selection.
pub const SELECTION_ALPHA: f64 = 0.01;

/// Regularisation of the final surrogate.
pub const SURROGATE_ALPHA: f64 = 1.0;

const PIVOT_EPS: f64 = 1e-14;

#[derive(Debug, Clone, PartialEq)]
pub struct RidgeFit {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl RidgeFit {
    pub fn predict(&self, x: &ArrayView2<'_, f64>) -> Array1<f64> {
        x.dot(&self.coefficients) + self.intercept
    }

    /// Weighted coefficient of determination on `(x, y)`.
    ///
    /// A constant target gives 1.0 for a perfect fit and 0.0 otherwise.
    pub fn score(&self, x: &ArrayView2<'_, f64>, y: &Array1<f64>, weights: &Array1<f64>) -> f64 {
        let predicted = self.predict(x);
        let total = weights.sum();
        if total <= 0.0 {
            return 0.0;
        }
        let y_mean = weights.dot(y) / total;

        let residual: f64 = (y - &predicted).mapv(|r| r * r).dot(weights);
        let spread: f64 = y.mapv(|v| (v - y_mean).powi(2)).dot(weights);

        if spread <= f64::EPSILON {
            return if residual <= f64::EPSILON { 1.0 } else { 0.0 };
        }
        1.0 - residual / spread
    }
}

/// Weighted ridge regression with an unpenalised intercept.
///
/// Centres `x` and `y` on their weighted means and solves
/// `(Xc' W Xc + alpha I) b = Xc' W yc`.
pub fn fit_weighted_ridge(
    x: &ArrayView2<'_, f64>,
    y: &Array1<f64>,
    weights: &Array1<f64>,
    alpha: f64,
) -> RidgeFit {
    let n_features = x.ncols();
    let total = weights.sum();
    if n_features == 0 || total <= 0.0 {
        let intercept = if total > 0.0 { weights.dot(y) / total } else { 0.0 };
        return RidgeFit {
            coefficients: Array1::zeros(n_features),
            intercept,
        };
    }

    let x_mean = x.t().dot(weights) / total;
    let y_mean = weights.dot(y) / total;

    let sqrt_w = weights.mapv(f64::sqrt).insert_axis(Axis(1));
    let xw = (x - &x_mean) * &sqrt_w;
    let yw = (y - y_mean) * &sqrt_w.column(0);

    let mut gram = xw.t().dot(&xw);
    // Pure least squares still needs a tiny ridge for collinear columns.
    let alpha = if alpha > 0.0 { alpha } else { 1e-10 };
    for i in 0..n_features {
        gram[[i, i]] += alpha;
    }
    let rhs = xw.t().dot(&yw);

    let coefficients = solve(gram, rhs).unwrap_or_else(|| Array1::zeros(n_features));
    let intercept = y_mean - x_mean.dot(&coefficients);

    RidgeFit {
        coefficients,
        intercept,
    }
}

/// Gaussian elimination with partial pivoting. `None` when singular.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot, col]].abs() < PIVOT_EPS {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            b.swap(pivot, col);
        }
        for row in (col + 1)..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut out = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[[row, k]] * out[k]).sum();
        out[row] = (b[row] - tail) / a[[row, row]];
    }
    Some(out)
}

/// Forward stepwise selection maximising weighted R² of an unregularised fit.
pub fn forward_selection(
    x: &Array2<f64>,
    y: &Array1<f64>,
    weights: &Array1<f64>,
    num_features: usize,
) -> Vec<usize> {
    let mut used: Vec<usize> = Vec::new();
    for _ in 0..num_features.min(x.ncols()) {
        let mut best: Option<(usize, f64)> = None;
        for candidate in (0..x.ncols()).filter(|f| !used.contains(f)) {
            let mut columns = used.clone();
            columns.push(candidate);
            let sub = x.select(Axis(1), &columns);
            let fit = fit_weighted_ridge(&sub.view(), y, weights, 0.0);
            let score = fit.score(&sub.view(), y, weights);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((candidate, score));
            }
        }
        match best {
            Some((feature, _)) => used.push(feature),
            None => break,
        }
    }
    used
}

/// Features with the largest absolute coefficient in a lightly regularised
/// fit over all features. Ties keep the lower index first.
pub fn highest_weights(
    x: &Array2<f64>,
    y: &Array1<f64>,
    weights: &Array1<f64>,
    num_features: usize,
) -> Vec<usize> {
    let fit = fit_weighted_ridge(&x.view(), y, weights, SELECTION_ALPHA);
    let mut order: Vec<usize> = (0..x.ncols()).collect();
    order.sort_by(|&a, &b| {
        fit.coefficients[b]
            .abs()
            .total_cmp(&fit.coefficients[a].abs())
    });
    order.truncate(num_features);
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_unweighted_exact_linear_fit() {
        // y = 2 + 3 a - b
        let x = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 1.0]];
        let y = array![2.0, 5.0, 1.0, 4.0, 7.0];
        let w = Array1::ones(5);

        let fit = fit_weighted_ridge(&x.view(), &y, &w, 0.0);
        assert!((fit.coefficients[0] - 3.0).abs() < 1e-6);
        assert!((fit.coefficients[1] + 1.0).abs() < 1e-6);
        assert!((fit.intercept - 2.0).abs() < 1e-6);
        assert!((fit.score(&x.view(), &y, &w) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ridge_shrinks_coefficients() {
        let x = array![[0.0], [1.0], [0.0], [1.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];
        let w = Array1::ones(4);

        let plain = fit_weighted_ridge(&x.view(), &y, &w, 0.0);
        let shrunk = fit_weighted_ridge(&x.view(), &y, &w, 1.0);
        // Xc'Xc = 1, so b = 1 / (1 + alpha)
        assert!((plain.coefficients[0] - 1.0).abs() < 1e-6);
        assert!((shrunk.coefficients[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_weight_rows_are_ignored() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0, 2.0, 100.0];
        let w = array![1.0, 1.0, 1.0, 0.0];

        let fit = fit_weighted_ridge(&x.view(), &y, &w, 0.0);
        assert!((fit.coefficients[0] - 1.0).abs() < 1e-6);
        assert!(fit.intercept.abs() < 1e-6);
    }

    #[test]
    fn test_constant_column_gets_zero_coefficient() {
        let x = array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0]];
        let y = array![1.0, 2.0, 3.0];
        let w = Array1::ones(3);

        let fit = fit_weighted_ridge(&x.view(), &y, &w, 0.0);
        assert!(fit.coefficients[0].abs() < 1e-6);
        assert!((fit.coefficients[1] - 1.0).abs() < 1e-6);
    }

    fn two_signal_problem() -> (Array2<f64>, Array1<f64>, Array1<f64>) {
        // y depends strongly on column 2, weakly on column 0, not on column 1.
        let x = array![
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
        ];
        let y = x.column(0).mapv(|v| 0.5 * v) + x.column(2).mapv(|v| 4.0 * v);
        (x, y, Array1::ones(8))
    }

    #[test]
    fn test_forward_selection_picks_strongest_first() {
        let (x, y, w) = two_signal_problem();
        assert_eq!(forward_selection(&x, &y, &w, 1), vec![2]);
        assert_eq!(forward_selection(&x, &y, &w, 2), vec![2, 0]);
        assert_eq!(forward_selection(&x, &y, &w, 10).len(), 3);
    }

    #[test]
    fn test_highest_weights_orders_by_magnitude() {
        let (x, y, w) = two_signal_problem();
        assert_eq!(highest_weights(&x, &y, &w, 2), vec![2, 0]);
    }

    #[test]
    fn test_score_of_constant_target() {
        let x = array![[0.0], [1.0]];
        let y = array![3.0, 3.0];
        let w = Array1::ones(2);
        let fit = fit_weighted_ridge(&x.view(), &y, &w, 1.0);
        assert_eq!(fit.score(&x.view(), &y, &w), 1.0);
    }
}
