//! Exploration policies acting on a state-action table

use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use rand_distr::{Distribution as _, WeightedIndex};
use trellis_core::{RLError, Table};

use crate::parameter::{ConstantSchedule, Schedule};

/// Action selection driven by the current table values
pub trait QPolicy: Send {
    /// Pick an action for `state`
    fn draw_action(
        &mut self,
        q: &Table,
        state: usize,
        rng: &mut dyn RngCore,
    ) -> trellis_core::Result<usize>;

    /// Probability of every action in `state`
    fn probabilities(&self, q: &Table, state: usize) -> Array1<f64>;
}

/// Greedy with probability `1 - epsilon`, uniform otherwise.
///
/// Epsilon follows a schedule over the number of drawn actions.
pub struct EpsGreedy {
    epsilon: Box<dyn Schedule>,
    steps: usize,
}

impl EpsGreedy {
    /// Fixed exploration rate
    #[must_use]
    pub fn new(epsilon: f64) -> Self {
        Self::with_schedule(Box::new(ConstantSchedule(epsilon)))
    }

    /// Exploration rate following `schedule`
    #[must_use]
    pub fn with_schedule(schedule: Box<dyn Schedule>) -> Self {
        Self {
            epsilon: schedule,
            steps: 0,
        }
    }

    /// Current exploration rate
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon.value(self.steps).clamp(0.0, 1.0)
    }
}

impl std::fmt::Debug for EpsGreedy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpsGreedy")
            .field("epsilon", &self.epsilon())
            .field("steps", &self.steps)
            .finish()
    }
}

impl QPolicy for EpsGreedy {
    fn draw_action(
        &mut self,
        q: &Table,
        state: usize,
        rng: &mut dyn RngCore,
    ) -> trellis_core::Result<usize> {
        let epsilon = self.epsilon();
        self.steps += 1;

        if rng.gen::<f64>() < epsilon {
            return Ok(rng.gen_range(0..q.n_actions()));
        }
        q.argmax(state)
            .choose(rng)
            .copied()
            .ok_or_else(|| RLError::Policy(format!("state {state} has no greedy action")))
    }

    #[allow(clippy::cast_precision_loss)]
    fn probabilities(&self, q: &Table, state: usize) -> Array1<f64> {
        let n_actions = q.n_actions();
        let epsilon = self.epsilon();
        let greedy = q.argmax(state);
        let mut probs = Array1::from_elem(n_actions, epsilon / n_actions as f64);
        for &a in &greedy {
            probs[a] += (1.0 - epsilon) / greedy.len() as f64;
        }
        probs
    }
}

/// Softmax over action values with temperature `beta`
#[derive(Debug, Clone)]
pub struct Boltzmann {
    beta: f64,
}

impl Boltzmann {
    /// Create a softmax policy; larger `beta` explores more
    pub fn new(beta: f64) -> trellis_core::Result<Self> {
        if beta <= 0.0 {
            return Err(RLError::InvalidParameter(format!(
                "Boltzmann temperature must be positive, got {beta}"
            )));
        }
        Ok(Self { beta })
    }
}

impl QPolicy for Boltzmann {
    fn draw_action(
        &mut self,
        q: &Table,
        state: usize,
        rng: &mut dyn RngCore,
    ) -> trellis_core::Result<usize> {
        let probs = self.probabilities(q, state);
        let dist = WeightedIndex::new(probs.iter())
            .map_err(|e| RLError::Computation(format!("softmax weights: {e}")))?;
        Ok(dist.sample(rng))
    }

    fn probabilities(&self, q: &Table, state: usize) -> Array1<f64> {
        let row = q.row(state);
        let max = q.max(state);
        let exp = row.mapv(|v| ((v - max) / self.beta).exp());
        let total = exp.sum();
        exp / total
    }
}
