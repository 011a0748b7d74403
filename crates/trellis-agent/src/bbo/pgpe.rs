//! Policy gradients with parameter-based exploration

use ndarray::{Array1, Array2, Axis, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;
use trellis_core::{Distribution, RLError};

use super::{DistributionUpdate, UpdateBatch};

/// Gradient-ascent step on the distribution parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Optimizer {
    /// `rho + learning_rate * g`
    Sgd {
        /// Step size
        learning_rate: f64,
    },
    /// Step of fixed Euclidean length `sqrt(eps)` along `g`
    Adaptive {
        /// Squared step length
        eps: f64,
    },
}

impl Optimizer {
    /// Apply one ascent step to `params`
    #[must_use]
    pub fn step(&self, params: &Array1<f64>, gradient: &Array1<f64>) -> Array1<f64> {
        match *self {
            Self::Sgd { learning_rate } => params + &(gradient * learning_rate),
            Self::Adaptive { eps } => {
                let norm2 = gradient.dot(gradient);
                if norm2 > 0.0 {
                    params + &(gradient * (eps / norm2).sqrt())
                } else {
                    params.clone()
                }
            }
        }
    }
}

/// PGPE: likelihood-ratio gradient of the expected return with respect to
/// the distribution parameters, using the per-component variance-optimal
/// baseline `b = Σ J ∇log p² / Σ ∇log p²`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pgpe {
    /// Step rule
    pub optimizer: Optimizer,
}

impl Pgpe {
    /// Create the update with the given step rule
    #[must_use]
    pub fn new(optimizer: Optimizer) -> Self {
        Self { optimizer }
    }

    /// Estimate of the return gradient for one batch
    #[allow(clippy::cast_precision_loss)]
    pub fn gradient<D: Distribution>(
        distribution: &D,
        batch: &UpdateBatch,
    ) -> trellis_core::Result<Array1<f64>> {
        if batch.is_empty() {
            return Err(RLError::InvalidParameter(
                "PGPE needs at least one episode".to_string(),
            ));
        }
        let contexts = batch.contexts();
        let mut diff_logs = Array2::zeros((batch.len(), distribution.parameters_size()));
        for (i, (mut row, theta)) in diff_logs
            .rows_mut()
            .into_iter()
            .zip(batch.theta.rows())
            .enumerate()
        {
            let context = contexts.as_ref().map(|c| c.row(i));
            row.assign(&distribution.diff_log(theta, context)?);
        }

        let squared = diff_logs.mapv(|g| g * g);
        let numerator = batch.returns.dot(&squared);
        let denominator = squared.sum_axis(Axis(0));
        let mut baseline = Array1::zeros(numerator.len());
        Zip::from(&mut baseline)
            .and(&numerator)
            .and(&denominator)
            .for_each(|b, &num, &den| {
                if den > 0.0 {
                    *b = num / den;
                }
            });

        let centered = &batch.returns.view().insert_axis(Axis(1)) - &baseline;
        Ok((centered * diff_logs).sum_axis(Axis(0)) / batch.len() as f64)
    }
}

impl<D: Distribution> DistributionUpdate<D> for Pgpe {
    fn update(&mut self, distribution: &mut D, batch: &UpdateBatch) -> trellis_core::Result<()> {
        let gradient = Self::gradient(distribution, batch)?;
        let params = self.optimizer.step(&distribution.parameters(), &gradient);
        debug!(gradient_norm = gradient.dot(&gradient).sqrt(), "PGPE update");
        distribution.set_parameters(params.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::GaussianDiagonal;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_sgd_and_adaptive_steps() {
        let params = arr1(&[1.0, 1.0]);
        let grad = arr1(&[3.0, 4.0]);
        let sgd = Optimizer::Sgd { learning_rate: 0.1 }.step(&params, &grad);
        assert_relative_eq!(sgd[0], 1.3, epsilon = 1e-12);
        assert_relative_eq!(sgd[1], 1.4, epsilon = 1e-12);

        let adaptive = Optimizer::Adaptive { eps: 0.25 }.step(&params, &grad);
        let delta = &adaptive - &params;
        assert_relative_eq!(delta.dot(&delta).sqrt(), 0.5, epsilon = 1e-12);
        assert_eq!(
            Optimizer::Adaptive { eps: 1.0 }.step(&params, &arr1(&[0.0, 0.0])),
            params
        );
    }

    #[test]
    fn test_gradient_points_towards_better_parameters() {
        let dist = GaussianDiagonal::new(arr1(&[0.0]), arr1(&[1.0])).unwrap();
        // Returns grow with theta, so the mean gradient must be positive
        let batch = UpdateBatch {
            returns: arr1(&[-1.0, 0.0, 1.0, 2.0]),
            theta: arr2(&[[-1.0], [0.0], [1.0], [2.0]]),
            context: None,
        };
        let grad = Pgpe::gradient(&dist, &batch).unwrap();
        assert_eq!(grad.len(), 2);
        assert!(grad[0] > 0.0);
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let dist = GaussianDiagonal::new(arr1(&[0.0]), arr1(&[1.0])).unwrap();
        let batch = UpdateBatch {
            returns: Array1::zeros(0),
            theta: Array2::zeros((0, 1)),
            context: None,
        };
        assert!(Pgpe::gradient(&dist, &batch).is_err());
    }
}
