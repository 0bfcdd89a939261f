use ndarray::{s, Array1, Array2};

use super::error::ConfoundError;
use super::model::ConfoundTable;
use super::select::MotionReduction;

// ---------------------------------------------------------------------------
// Column standardization
// ---------------------------------------------------------------------------

/// Z-score every column (zero mean, unit variance over time).
///
/// Zero-variance columns are centered and left at zero rather than divided.
pub fn zscore(data: &Array2<f64>) -> Array2<f64> {
    let n = data.nrows() as f64;
    let mut out = data.clone();
    if data.nrows() == 0 {
        return out;
    }
    for mut col in out.columns_mut() {
        let mean = col.sum() / n;
        col.mapv_inplace(|v| v - mean);
        let std = (col.mapv(|v| v * v).sum() / n).sqrt();
        if std > 0.0 {
            col.mapv_inplace(|v| v / std);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Eigendecomposition – power iteration with deflation
// ---------------------------------------------------------------------------

/// Eigenvalues (descending) and matching eigenvectors (as columns) of a
/// symmetric matrix, via power iteration with deflation. The confound
/// covariance matrices here are tiny (at most 24x24), so the simple
/// iterative scheme is plenty.
struct Eigen {
    values: Array1<f64>,
    vectors: Array2<f64>,
}

fn eigen_symmetric(matrix: &Array2<f64>) -> Eigen {
    let n = matrix.nrows();
    let mut values = Array1::zeros(n);
    let mut vectors = Array2::zeros((n, n));
    let mut deflated = matrix.clone();

    for i in 0..n {
        let (value, vector) = power_iteration(&deflated, 1000, 1e-12);
        values[i] = value;
        vectors.column_mut(i).assign(&vector);

        // Deflate: A <- A - lambda * v * v^T
        let outer = outer_product(&vector, &vector);
        deflated = deflated - outer * value;
    }

    // Deflation already yields a roughly descending order; sort to be exact.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let sorted_values = Array1::from_iter(order.iter().map(|&i| values[i]));
    let mut sorted_vectors = Array2::zeros((n, n));
    for (new_idx, &old_idx) in order.iter().enumerate() {
        sorted_vectors
            .column_mut(new_idx)
            .assign(&vectors.column(old_idx));
    }

    Eigen {
        values: sorted_values,
        vectors: sorted_vectors,
    }
}

fn power_iteration(matrix: &Array2<f64>, max_iter: usize, tol: f64) -> (f64, Array1<f64>) {
    let n = matrix.nrows();
    let mut v = Array1::from_elem(n, 1.0 / (n as f64).sqrt());
    let mut value = 0.0;

    for _ in 0..max_iter {
        let next = matrix.dot(&v);
        let next_value = v.dot(&next);
        let norm = next.dot(&next).sqrt();
        let next = if norm > 1e-12 { next / norm } else { next };

        if (next_value - value).abs() < tol {
            return (next_value, next);
        }
        value = next_value;
        v = next;
    }
    (value, v)
}

fn outer_product(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    let n = a.len();
    let m = b.len();
    Array2::from_shape_fn((n, m), |(i, j)| a[i] * b[j])
}

/// Sample covariance of column-centered data.
fn covariance(centered: &Array2<f64>) -> Array2<f64> {
    let n = centered.nrows() as f64;
    centered.t().dot(centered) / (n - 1.0).max(1.0)
}

// ---------------------------------------------------------------------------
// Motion PCA
// ---------------------------------------------------------------------------

/// Replace a motion-parameter block by its leading principal components.
///
/// The block is z-scored first so rotations and translations weigh equally.
/// The component count is either fixed or the smallest number explaining
/// the requested fraction of variance. Output columns are named
/// `motion_pca_1..=k`.
pub fn motion_pca(
    block: &ConfoundTable,
    reduction: &MotionReduction,
) -> Result<ConfoundTable, ConfoundError> {
    let available = block.n_cols();
    let standardized = zscore(&block.data);
    let eigen = eigen_symmetric(&covariance(&standardized));

    let k = match reduction {
        MotionReduction::Off => return Ok(block.clone()),
        MotionReduction::Components(k) => {
            if *k > available {
                return Err(ConfoundError::TooManyComponents {
                    requested: *k,
                    available,
                });
            }
            *k
        }
        MotionReduction::VarianceRatio(target) => {
            let total: f64 = eigen.values.iter().filter(|v| **v > 0.0).sum();
            let mut cumulative = 0.0;
            let mut k = available;
            for (i, value) in eigen.values.iter().enumerate() {
                cumulative += value.max(0.0);
                if total > 0.0 && cumulative / total >= *target {
                    k = i + 1;
                    break;
                }
            }
            k
        }
    };

    let components = eigen.vectors.slice(s![.., ..k]).to_owned();
    let scores = standardized.dot(&components);
    let columns = (1..=k).map(|i| format!("motion_pca_{i}")).collect();
    ConfoundTable::new(columns, scores)
}
