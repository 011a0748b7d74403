//! Reward-weighted regression

use serde::{Deserialize, Serialize};
use tracing::debug;
use trellis_core::Distribution;

use super::{advantages, DistributionUpdate, UpdateBatch};

/// Weighted maximum likelihood with weights `exp(beta * (J - max J))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rwr {
    /// Inverse temperature of the return weighting
    pub beta: f64,
}

impl Rwr {
    /// Create the update with inverse temperature `beta`
    #[must_use]
    pub fn new(beta: f64) -> Self {
        Self { beta }
    }
}

impl<D: Distribution> DistributionUpdate<D> for Rwr {
    fn update(&mut self, distribution: &mut D, batch: &UpdateBatch) -> trellis_core::Result<()> {
        let weights = advantages(&batch.returns).mapv(|a| (self.beta * a).exp());
        debug!(beta = self.beta, weight_sum = weights.sum(), "RWR update");
        distribution.mle(batch.theta.view(), Some(weights.view()), batch.contexts())
    }
}
