//! Black-box policy search over a distribution of policy parameters
//!
//! [`BlackBoxOptimization`] samples a fresh parameter vector for every
//! episode, freezes it in the policy for the whole episode and, on `fit`,
//! hands the returns and the sampled parameters to a [`DistributionUpdate`]
//! strategy. In vectorized execution each slot keeps its own parameters
//! until that slot restarts.

pub mod pgpe;
pub mod reps;
pub mod rwr;

pub use pgpe::{Optimizer, Pgpe};
pub use reps::Reps;
pub use rwr::Rwr;

use ndarray::{Array1, Array2, ArrayView2};
use rand::rngs::StdRng;
use tracing::debug;
use trellis_core::{
    require_context, Agent, ArrayBackend, Dataset, Distribution, EpisodeInfo, EpisodeStart,
    ParametricPolicy, Policy, PolicyHandle, PolicyState, RLError, State, VectorEpisodeStart,
};

use crate::config::BlackBoxConfig;
use crate::td::seeded_rng;

/// Per-episode context handed to updates of contextual distributions
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeContext {
    /// Initial-state features, one row per episode
    pub initial_states: Array2<f64>,
    /// Metadata of every episode, merged
    pub episode_info: EpisodeInfo,
}

/// Everything a distribution update learns from
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateBatch {
    /// Discounted return of every episode
    pub returns: Array1<f64>,
    /// Sampled parameters, one row per episode
    pub theta: Array2<f64>,
    /// Present only for contextual distributions
    pub context: Option<EpisodeContext>,
}

impl UpdateBatch {
    /// Context rows, if any
    #[must_use]
    pub fn contexts(&self) -> Option<ArrayView2<'_, f64>> {
        self.context.as_ref().map(|c| c.initial_states.view())
    }

    /// Number of episodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    /// Whether the batch holds no episodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }
}

/// Rule that moves a distribution towards better-performing parameters
pub trait DistributionUpdate<D: Distribution>: Send {
    /// Update `distribution` in place from one batch of episodes
    fn update(&mut self, distribution: &mut D, batch: &UpdateBatch) -> trellis_core::Result<()>;
}

/// Episodic agent that searches directly in policy-parameter space
pub struct BlackBoxOptimization<D, P, U> {
    distribution: D,
    policy: PolicyHandle<P>,
    update: U,
    backend: ArrayBackend,
    rng: StdRng,
}

impl<D, P, U> BlackBoxOptimization<D, P, U>
where
    D: Distribution,
    P: ParametricPolicy + Clone,
    U: DistributionUpdate<D>,
{
    /// Create an agent; the distribution must sample vectors of the policy's
    /// weight size
    pub fn new(distribution: D, policy: P, update: U) -> trellis_core::Result<Self> {
        if distribution.dim() != policy.weights_size() {
            return Err(RLError::DimensionMismatch {
                expected: policy.weights_size(),
                actual: distribution.dim(),
            });
        }
        Ok(Self {
            distribution,
            policy: PolicyHandle::Scalar(policy),
            update,
            backend: ArrayBackend::default(),
            rng: seeded_rng(None),
        })
    }

    /// Apply backend and seed from a configuration
    #[must_use]
    pub fn with_config(mut self, config: &BlackBoxConfig) -> Self {
        self.backend = config.backend;
        if let Some(seed) = config.seed {
            self.rng = seeded_rng(Some(seed));
        }
        self
    }

    /// Reseed parameter sampling
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = seeded_rng(Some(seed));
        self
    }

    /// Parameter distribution
    pub fn distribution(&self) -> &D {
        &self.distribution
    }

    /// Current policy, scalar or vectorized
    pub fn policy(&self) -> &PolicyHandle<P> {
        &self.policy
    }

    /// Update strategy
    pub fn update_strategy(&self) -> &U {
        &self.update
    }

    /// Array backend for stacked parameters
    pub fn backend(&self) -> ArrayBackend {
        self.backend
    }

    fn sample_for(&mut self, initial_state: &P::State) -> trellis_core::Result<Array1<f64>> {
        let features = initial_state.features();
        let context = require_context(&self.distribution, Some(features.view()))?;
        let theta = self.distribution.sample(&mut self.rng, context)?;
        if theta.len() != self.distribution.dim() {
            return Err(RLError::DimensionMismatch {
                expected: self.distribution.dim(),
                actual: theta.len(),
            });
        }
        Ok(theta)
    }
}

impl<D, P, U> Agent for BlackBoxOptimization<D, P, U>
where
    D: Distribution,
    P: ParametricPolicy + Clone,
    U: DistributionUpdate<D>,
{
    type State = P::State;
    type Action = P::Action;

    fn episode_start(
        &mut self,
        initial_state: &P::State,
        _info: &EpisodeInfo,
    ) -> trellis_core::Result<EpisodeStart> {
        let theta = self.sample_for(initial_state)?;
        let policy = self.policy.demote();
        policy.set_weights(theta.view())?;
        let policy_state = policy.reset();
        Ok(EpisodeStart {
            policy_state,
            theta: Some(theta),
        })
    }

    fn episode_start_vectorized(
        &mut self,
        initial_states: &[P::State],
        _infos: &[EpisodeInfo],
        start_mask: &[bool],
    ) -> trellis_core::Result<VectorEpisodeStart> {
        let n_envs = start_mask.len();
        if n_envs == 0 {
            return Err(RLError::InvalidParameter(
                "start mask must cover at least one slot".to_string(),
            ));
        }
        if initial_states.len() != n_envs {
            return Err(RLError::DimensionMismatch {
                expected: n_envs,
                actual: initial_states.len(),
            });
        }

        let mut theta = self.policy.promote(n_envs).weights();
        let mut restarted = 0;
        for (slot, state) in initial_states.iter().enumerate() {
            if start_mask[slot] {
                let sample = self.sample_for(state)?;
                theta.row_mut(slot).assign(&sample);
                restarted += 1;
            }
        }

        let vector = self.policy.promote(n_envs);
        vector.set_weights(theta.view())?;
        let policy_states = vector.reset();
        debug!(n_envs, restarted, "vectorized episode start");

        Ok(VectorEpisodeStart {
            policy_states,
            theta: Some(theta),
        })
    }

    fn draw_action(
        &mut self,
        state: &P::State,
        policy_state: &PolicyState,
    ) -> trellis_core::Result<(P::Action, PolicyState)> {
        match &mut self.policy {
            PolicyHandle::Scalar(policy) => policy.draw_action(state, policy_state, &mut self.rng),
            PolicyHandle::Vectorized(_) => Err(RLError::Agent(
                "single-episode action requested from a vectorized policy".to_string(),
            )),
        }
    }

    fn draw_actions_vectorized(
        &mut self,
        states: &[P::State],
        policy_states: &[PolicyState],
    ) -> trellis_core::Result<(Vec<P::Action>, Vec<PolicyState>)> {
        match &mut self.policy {
            PolicyHandle::Vectorized(vector) => {
                vector.draw_actions(states, policy_states, &mut self.rng)
            }
            PolicyHandle::Scalar(_) => Err(RLError::Agent(
                "vectorized actions requested before a vectorized episode start".to_string(),
            )),
        }
    }

    fn fit(&mut self, dataset: &Dataset<P::State, P::Action>) -> trellis_core::Result<()> {
        let returns = dataset.discounted_return();
        let theta = dataset.theta_matrix(self.backend, self.distribution.dim())?;
        let context = if self.distribution.is_contextual() {
            Some(EpisodeContext {
                initial_states: dataset.initial_state_features(self.backend)?,
                episode_info: dataset.episode_info(),
            })
        } else {
            None
        };

        debug!(
            episodes = returns.len(),
            mean_return = returns.mean().unwrap_or(f64::NAN),
            "fitting parameter distribution"
        );
        let batch = UpdateBatch {
            returns,
            theta,
            context,
        };
        self.update.update(&mut self.distribution, &batch)
    }

    fn is_episodic(&self) -> bool {
        true
    }
}

/// Shift returns so the best one is zero
pub(crate) fn advantages(returns: &Array1<f64>) -> Array1<f64> {
    let max = returns.fold(f64::NEG_INFINITY, |m, &j| m.max(j));
    returns.mapv(|j| j - max)
}
