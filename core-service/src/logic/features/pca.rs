//! Principal component reduction of the encoded feature matrix
//!
//! Covariance is decomposed with cyclic Jacobi rotations. Encoded widths are
//! in the low hundreds at most, so the O(d^3) sweep cost is negligible next
//! to training.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Rotation sweeps before giving up on further convergence
const MAX_SWEEPS: usize = 100;

/// Off-diagonal mass below which the matrix counts as diagonal
const CONVERGENCE_EPS: f64 = 1e-12;

// ============================================================================
// FITTED PCA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pca {
    /// Column means of the encoded training matrix
    mean: Array1<f64>,
    /// Retained axes, one per row (n_components x encoded_width)
    components: Array2<f64>,
    /// Eigenvalue of each retained axis
    variances: Array1<f64>,
    /// Share of total variance per retained axis
    variance_ratio: Array1<f64>,
}

impl Pca {
    /// Fit `n_components` axes on an (n_rows x d) matrix. Caller guarantees
    /// `n_rows >= 1` and `n_components <= d`.
    pub fn fit(data: ArrayView2<f64>, n_components: usize) -> Self {
        let n = data.nrows();
        let d = data.ncols();

        let mean = data
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(d));
        let centered = &data - &mean.view().insert_axis(Axis(0));

        let divisor = if n > 1 { (n - 1) as f64 } else { 1.0 };
        let covariance = centered.t().dot(&centered) / divisor;

        let (eigenvalues, eigenvectors) = jacobi_eigen(covariance);

        let mut order: Vec<usize> = (0..d).collect();
        order.sort_by(|&a, &b| {
            eigenvalues[b]
                .partial_cmp(&eigenvalues[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total: f64 = eigenvalues.iter().map(|v| v.max(0.0)).sum();

        let mut components = Array2::zeros((n_components, d));
        let mut variances = Array1::zeros(n_components);
        let mut variance_ratio = Array1::zeros(n_components);

        for (k, &idx) in order.iter().take(n_components).enumerate() {
            let mut axis = eigenvectors.column(idx).to_owned();
            orient(&mut axis);
            components.row_mut(k).assign(&axis);

            let lambda = eigenvalues[idx].max(0.0);
            variances[k] = lambda;
            variance_ratio[k] = if total > 0.0 { lambda / total } else { 0.0 };
        }

        Self {
            mean,
            components,
            variances,
            variance_ratio,
        }
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    pub fn input_width(&self) -> usize {
        self.mean.len()
    }

    pub fn components(&self) -> ArrayView2<f64> {
        self.components.view()
    }

    pub fn explained_variance(&self) -> ArrayView1<f64> {
        self.variances.view()
    }

    pub fn explained_variance_ratio(&self) -> ArrayView1<f64> {
        self.variance_ratio.view()
    }

    /// Project one encoded row
    pub fn project(&self, row: ArrayView1<f64>) -> Vec<f64> {
        let centered = &row - &self.mean;
        self.components.dot(&centered).to_vec()
    }
}

/// Flip so the largest-magnitude loading is positive
fn orient(axis: &mut Array1<f64>) {
    let mut pivot = 0.0f64;
    for &v in axis.iter() {
        if v.abs() > pivot.abs() {
            pivot = v;
        }
    }
    if pivot < 0.0 {
        axis.mapv_inplace(|v| -v);
    }
}

// ============================================================================
// JACOBI EIGEN-DECOMPOSITION
// ============================================================================

/// Eigenvalues and column eigenvectors of a symmetric matrix
pub fn jacobi_eigen(mut a: Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let d = a.nrows();
    let mut v = Array2::<f64>::eye(d);

    for _ in 0..MAX_SWEEPS {
        let off: f64 = (0..d)
            .flat_map(|p| ((p + 1)..d).map(move |q| (p, q)))
            .map(|(p, q)| a[[p, q]] * a[[p, q]])
            .sum();
        if off < CONVERGENCE_EPS {
            break;
        }

        for p in 0..d {
            for q in (p + 1)..d {
                let apq = a[[p, q]];
                if apq.abs() < f64::MIN_POSITIVE {
                    continue;
                }

                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                let t = sign / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                a[[p, p]] -= t * apq;
                a[[q, q]] += t * apq;
                a[[p, q]] = 0.0;
                a[[q, p]] = 0.0;

                for r in 0..d {
                    if r != p && r != q {
                        let arp = a[[r, p]];
                        let arq = a[[r, q]];
                        a[[r, p]] = c * arp - s * arq;
                        a[[p, r]] = a[[r, p]];
                        a[[r, q]] = c * arq + s * arp;
                        a[[q, r]] = a[[r, q]];
                    }
                }

                for r in 0..d {
                    let vrp = v[[r, p]];
                    let vrq = v[[r, q]];
                    v[[r, p]] = c * vrp - s * vrq;
                    v[[r, q]] = s * vrp + c * vrq;
                }
            }
        }
    }

    let eigenvalues = (0..d).map(|i| a[[i, i]]).collect();
    (eigenvalues, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_jacobi_diagonal_input() {
        let (vals, vecs) = jacobi_eigen(array![[3.0, 0.0], [0.0, 1.0]]);
        assert_eq!(vals, vec![3.0, 1.0]);
        assert_eq!(vecs, Array2::<f64>::eye(2));
    }

    #[test]
    fn test_jacobi_symmetric_2x2() {
        let (mut vals, _) = jacobi_eigen(array![[2.0, 1.0], [1.0, 2.0]]);
        vals.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((vals[0] - 1.0).abs() < 1e-10);
        assert!((vals[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_first_axis_follows_correlated_columns() {
        let data = array![
            [1.0, 1.1, 0.0],
            [2.0, 1.9, 0.1],
            [3.0, 3.2, -0.1],
            [4.0, 3.9, 0.0],
            [5.0, 5.1, 0.05],
        ];
        let pca = Pca::fit(data.view(), 2);

        let first = pca.components().row(0).to_owned();
        assert!(first[0] > 0.6 && first[1] > 0.6);
        assert!(first[2].abs() < 0.1);

        let ratio = pca.explained_variance_ratio();
        assert!(ratio[0] > 0.95);
        assert!(ratio[0] >= ratio[1]);
    }

    #[test]
    fn test_projection_of_mean_is_zero() {
        let data = array![[1.0, 2.0], [3.0, 6.0], [5.0, 1.0]];
        let pca = Pca::fit(data.view(), 2);
        let z = pca.project(array![3.0, 3.0].view());
        assert!(z.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_single_row_and_constant_data() {
        let data = array![[1.0, 2.0, 3.0]];
        let pca = Pca::fit(data.view(), 2);
        assert_eq!(pca.n_components(), 2);
        assert!(pca.explained_variance_ratio().iter().all(|r| *r == 0.0));
        assert_eq!(pca.project(array![1.0, 2.0, 3.0].view()), vec![0.0, 0.0]);
    }
}
