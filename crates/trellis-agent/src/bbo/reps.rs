//! Relative entropy policy search

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;
use trellis_core::{Distribution, RLError};

use super::{advantages, DistributionUpdate, UpdateBatch};

const ETA_MIN: f64 = 1e-8;
const ETA_MAX: f64 = 1e12;
const BISECTION_STEPS: usize = 100;

/// Episodic REPS.
///
/// Finds the temperature `eta` minimizing the dual
/// `g(eta) = eta * eps + max J + eta * ln(mean(exp((J - max J) / eta)))`,
/// which bounds the KL divergence between consecutive sample weightings by
/// `eps`, then fits the distribution with weights `exp((J - max J) / eta)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reps {
    eps: f64,
}

impl Reps {
    /// Create the update with KL bound `eps > 0`
    pub fn new(eps: f64) -> trellis_core::Result<Self> {
        if eps <= 0.0 {
            return Err(RLError::InvalidParameter(format!(
                "REPS KL bound must be positive, got {eps}"
            )));
        }
        Ok(Self { eps })
    }

    /// KL bound
    #[must_use]
    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// `g'(eta)` for returns already shifted so their maximum is zero
    #[allow(clippy::cast_precision_loss)]
    fn dual_derivative(&self, eta: f64, advantages: &Array1<f64>) -> f64 {
        let w = advantages.mapv(|a| (a / eta).exp());
        let sum_w = w.sum();
        self.eps + (sum_w / advantages.len() as f64).ln() - w.dot(advantages) / (eta * sum_w)
    }

    /// Minimizer of the convex dual, located by bisection on its derivative
    /// in log space
    pub(crate) fn solve_eta(&self, advantages: &Array1<f64>) -> f64 {
        let mut lo = ETA_MIN;
        if self.dual_derivative(lo, advantages) >= 0.0 {
            return lo;
        }
        let mut hi = 1.0;
        while self.dual_derivative(hi, advantages) < 0.0 && hi < ETA_MAX {
            lo = hi;
            hi *= 10.0;
        }
        for _ in 0..BISECTION_STEPS {
            let mid = (lo * hi).sqrt();
            if self.dual_derivative(mid, advantages) < 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        hi
    }
}

impl<D: Distribution> DistributionUpdate<D> for Reps {
    fn update(&mut self, distribution: &mut D, batch: &UpdateBatch) -> trellis_core::Result<()> {
        let advantages = advantages(&batch.returns);
        let eta = self.solve_eta(&advantages);
        let weights = advantages.mapv(|a| (a / eta).exp());
        debug!(eta, eps = self.eps, "REPS update");
        distribution.mle(batch.theta.view(), Some(weights.view()), batch.contexts())
    }
}
