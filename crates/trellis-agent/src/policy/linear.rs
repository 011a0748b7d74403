//! Deterministic linear policy over state features

use ndarray::{Array1, Array2, ArrayView1};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use trellis_core::{MdpInfo, ParametricPolicy, Policy, PolicyState, RLError, State};

/// `a = W · features(s)` with `W` of shape `(action_dim, state_dim)`.
///
/// The flat weight vector is `W` in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPolicy {
    weights: Array2<f64>,
}

impl LinearPolicy {
    /// Zero-initialized policy
    #[must_use]
    pub fn new(state_dim: usize, action_dim: usize) -> Self {
        Self {
            weights: Array2::zeros((action_dim, state_dim)),
        }
    }

    /// Policy sized for an MDP with vector states and actions
    #[must_use]
    pub fn for_mdp(info: &MdpInfo) -> Self {
        Self::new(info.state_space.dim(), info.action_space.dim())
    }

    /// Input dimension
    #[must_use]
    pub fn state_dim(&self) -> usize {
        self.weights.ncols()
    }

    /// Output dimension
    #[must_use]
    pub fn action_dim(&self) -> usize {
        self.weights.nrows()
    }
}

impl Policy for LinearPolicy {
    type State = Array1<f64>;
    type Action = Array1<f64>;

    fn draw_action(
        &mut self,
        state: &Array1<f64>,
        _policy_state: &PolicyState,
        _rng: &mut dyn RngCore,
    ) -> trellis_core::Result<(Array1<f64>, PolicyState)> {
        let features = state.features();
        if features.len() != self.state_dim() {
            return Err(RLError::DimensionMismatch {
                expected: self.state_dim(),
                actual: features.len(),
            });
        }
        Ok((self.weights.dot(&features), None))
    }
}

impl ParametricPolicy for LinearPolicy {
    fn weights_size(&self) -> usize {
        self.weights.len()
    }

    fn weights(&self) -> Array1<f64> {
        self.weights.iter().copied().collect()
    }

    fn set_weights(&mut self, weights: ArrayView1<'_, f64>) -> trellis_core::Result<()> {
        if weights.len() != self.weights.len() {
            return Err(RLError::DimensionMismatch {
                expected: self.weights.len(),
                actual: weights.len(),
            });
        }
        let shape = self.weights.dim();
        self.weights = Array2::from_shape_vec(shape, weights.to_vec())?;
        Ok(())
    }
}
