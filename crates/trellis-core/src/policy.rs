//! Policy abstractions and their vectorized container

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::RngCore;
use tracing::{debug, warn};

use crate::{Action, State};

/// Internal state carried by a policy between steps (`None` for stateless
/// policies)
pub type PolicyState = Option<Array1<f64>>;

/// Core policy trait for selecting actions
pub trait Policy: Send {
    /// State type
    type State: State;
    /// Action type
    type Action: Action;

    /// Select an action, returning it together with the next policy state
    fn draw_action(
        &mut self,
        state: &Self::State,
        policy_state: &PolicyState,
        rng: &mut dyn RngCore,
    ) -> crate::Result<(Self::Action, PolicyState)>;

    /// Initial policy state for a new episode
    fn reset(&mut self) -> PolicyState {
        None
    }
}

/// Policy fully described by a flat weight vector
pub trait ParametricPolicy: Policy {
    /// Length of the weight vector
    fn weights_size(&self) -> usize;

    /// Current weights
    fn weights(&self) -> Array1<f64>;

    /// Overwrite the weights
    fn set_weights(&mut self, weights: ArrayView1<'_, f64>) -> crate::Result<()>;
}

/// One independent policy copy per environment slot
#[derive(Debug, Clone)]
pub struct VectorPolicy<P> {
    slots: Vec<P>,
}

impl<P> VectorPolicy<P>
where
    P: ParametricPolicy + Clone,
{
    /// Replicate `policy` into `n_envs` slots
    #[must_use]
    pub fn new(policy: P, n_envs: usize) -> Self {
        let mut slots = Vec::with_capacity(n_envs);
        slots.resize(n_envs.max(1), policy);
        Self { slots }
    }

    /// Number of slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false: a vector policy keeps at least one slot
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Change the number of slots.
    ///
    /// Shrinking drops the trailing slots; growing clones slot 0. Only call
    /// this when no surviving slot is mid-episode.
    pub fn set_n(&mut self, n_envs: usize) {
        let n_envs = n_envs.max(1);
        if n_envs != self.slots.len() {
            debug!(from = self.slots.len(), to = n_envs, "resizing vector policy");
            let template = self.slots[0].clone();
            self.slots.resize(n_envs, template);
        }
    }

    /// Weight length of every slot
    #[must_use]
    pub fn weights_size(&self) -> usize {
        self.slots[0].weights_size()
    }

    /// Batch of weights, one row per slot
    #[must_use]
    pub fn weights(&self) -> Array2<f64> {
        let mut batch = Array2::zeros((self.slots.len(), self.weights_size()));
        for (mut row, slot) in batch.rows_mut().into_iter().zip(&self.slots) {
            row.assign(&slot.weights());
        }
        batch
    }

    /// Overwrite every slot's weights from an `[n, dim]` batch
    pub fn set_weights(&mut self, weights: ArrayView2<'_, f64>) -> crate::Result<()> {
        if weights.nrows() != self.slots.len() {
            return Err(crate::RLError::DimensionMismatch {
                expected: self.slots.len(),
                actual: weights.nrows(),
            });
        }
        for (slot, row) in self.slots.iter_mut().zip(weights.rows()) {
            slot.set_weights(row)?;
        }
        Ok(())
    }

    /// Initial policy state of every slot
    pub fn reset(&mut self) -> Vec<PolicyState> {
        self.slots.iter_mut().map(Policy::reset).collect()
    }

    /// Let every slot act on its own state
    pub fn draw_actions(
        &mut self,
        states: &[P::State],
        policy_states: &[PolicyState],
        rng: &mut dyn RngCore,
    ) -> crate::Result<(Vec<P::Action>, Vec<PolicyState>)> {
        if states.len() != self.slots.len() || policy_states.len() != self.slots.len() {
            return Err(crate::RLError::DimensionMismatch {
                expected: self.slots.len(),
                actual: states.len().min(policy_states.len()),
            });
        }
        let mut actions = Vec::with_capacity(self.slots.len());
        let mut next_states = Vec::with_capacity(self.slots.len());
        for ((slot, state), policy_state) in self.slots.iter_mut().zip(states).zip(policy_states) {
            let (action, next) = slot.draw_action(state, policy_state, rng)?;
            actions.push(action);
            next_states.push(next);
        }
        Ok((actions, next_states))
    }

    /// Policy of one slot
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&P> {
        self.slots.get(index)
    }

    /// Slot 0, the policy a single-episode run continues with
    #[must_use]
    pub fn flat_policy(&self) -> &P {
        &self.slots[0]
    }

    /// Narrow to slot 0, discarding the others
    #[must_use]
    pub fn into_flat_policy(mut self) -> P {
        self.slots.swap_remove(0)
    }
}

/// The agent's current policy: one scalar policy or a vectorized batch
#[derive(Debug, Clone)]
pub enum PolicyHandle<P> {
    /// Single-episode execution
    Scalar(P),
    /// Lock-stepped execution over several slots
    Vectorized(VectorPolicy<P>),
}

impl<P> PolicyHandle<P>
where
    P: ParametricPolicy + Clone,
{
    /// Whether the handle currently holds a vector policy
    #[must_use]
    pub fn is_vectorized(&self) -> bool {
        matches!(self, Self::Vectorized(_))
    }

    /// Number of slots (1 for a scalar policy)
    #[must_use]
    pub fn n_slots(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Vectorized(vector) => vector.len(),
        }
    }

    /// Make sure the handle is scalar and return it.
    ///
    /// A vector policy with more than one slot loses all slots but the first.
    pub fn demote(&mut self) -> &mut P {
        if let Self::Vectorized(vector) = self {
            if vector.len() > 1 {
                warn!(discarded = vector.len() - 1, "collapsing vector policy to slot 0");
            }
            let flat = vector.flat_policy().clone();
            *self = Self::Scalar(flat);
        }
        match self {
            Self::Scalar(policy) => policy,
            Self::Vectorized(_) => unreachable!("handle was just demoted"),
        }
    }

    /// Make sure the handle is a vector policy with `n_envs` slots and
    /// return it.
    pub fn promote(&mut self, n_envs: usize) -> &mut VectorPolicy<P> {
        match self {
            Self::Scalar(policy) => {
                debug!(n_envs, "promoting policy to vector policy");
                *self = Self::Vectorized(VectorPolicy::new(policy.clone(), n_envs));
            }
            Self::Vectorized(vector) => vector.set_n(n_envs),
        }
        match self {
            Self::Vectorized(vector) => vector,
            Self::Scalar(_) => unreachable!("handle was just promoted"),
        }
    }

    /// Scalar policy, if that is the current mode
    #[must_use]
    pub fn as_scalar(&self) -> Option<&P> {
        match self {
            Self::Scalar(policy) => Some(policy),
            Self::Vectorized(_) => None,
        }
    }

    /// Vector policy, if that is the current mode
    #[must_use]
    pub fn as_vectorized(&self) -> Option<&VectorPolicy<P>> {
        match self {
            Self::Scalar(_) => None,
            Self::Vectorized(vector) => Some(vector),
        }
    }

    /// Vector policy, mutably, if that is the current mode
    pub fn as_vectorized_mut(&mut self) -> Option<&mut VectorPolicy<P>> {
        match self {
            Self::Scalar(_) => None,
            Self::Vectorized(vector) => Some(vector),
        }
    }

    /// Narrow to the scalar policy the handle would continue with
    #[must_use]
    pub fn into_policy(self) -> P {
        match self {
            Self::Scalar(policy) => policy,
            Self::Vectorized(vector) => vector.into_flat_policy(),
        }
    }
}
