//! Gaussian distributions over policy parameters
//!
//! All three implement [`trellis_core::Distribution`]. Weighted fits use the
//! unbiased weighted variance normalizer `Z = ΣD - ΣD² / ΣD`; a degenerate
//! sample set (a single effective sample, all-zero weights) yields NaN or
//! infinite moments unless a `min_std` floor is configured.

pub mod contextual;
pub mod gaussian_cholesky;
pub mod gaussian_diag;

pub use contextual::LinearContextualGaussian;
pub use gaussian_cholesky::GaussianCholesky;
pub use gaussian_diag::GaussianDiagonal;

use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::RngCore;
use rand_distr::{Distribution as _, StandardNormal};
use trellis_core::RLError;

/// `ln(2π)`
pub(crate) const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Vector of independent standard normal draws
pub(crate) fn standard_normal(rng: &mut dyn RngCore, n: usize) -> Array1<f64> {
    (0..n)
        .map(|_| {
            let z: f64 = StandardNormal.sample(&mut *rng);
            z
        })
        .collect()
}

/// Validate a sample batch and resolve its weights.
///
/// Returns the weights (uniform when absent) together with `ΣD` and the
/// variance normalizer `Z`.
pub(crate) fn sample_weights(
    theta: ArrayView2<'_, f64>,
    weights: Option<ArrayView1<'_, f64>>,
    dim: usize,
) -> trellis_core::Result<(Array1<f64>, f64, f64)> {
    if theta.nrows() == 0 {
        return Err(RLError::InvalidParameter(
            "cannot fit a distribution to zero samples".to_string(),
        ));
    }
    if theta.ncols() != dim {
        return Err(RLError::DimensionMismatch {
            expected: dim,
            actual: theta.ncols(),
        });
    }
    let weights = match weights {
        Some(w) if w.len() != theta.nrows() => {
            return Err(RLError::DimensionMismatch {
                expected: theta.nrows(),
                actual: w.len(),
            })
        }
        Some(w) => w.to_owned(),
        None => Array1::ones(theta.nrows()),
    };
    let sum_d = weights.sum();
    let sum_d2 = weights.mapv(|d| d * d).sum();
    Ok((weights, sum_d, sum_d - sum_d2 / sum_d))
}

/// Weighted mean of the rows of `theta`
pub(crate) fn weighted_mean(
    theta: ArrayView2<'_, f64>,
    weights: &Array1<f64>,
    sum_d: f64,
) -> Array1<f64> {
    weights.dot(&theta) / sum_d
}

pub(crate) fn check_len(expected: usize, actual: usize) -> trellis_core::Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(RLError::DimensionMismatch { expected, actual })
    }
}

pub(crate) fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_row_iterator(a.nrows(), a.ncols(), a.iter().copied())
}

pub(crate) fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}
