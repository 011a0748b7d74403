//! Q(λ) with a greedy bootstrap and uncut traces

use rand::rngs::StdRng;
use tracing::debug;
use trellis_core::{
    Agent, Dataset, EpisodeInfo, EpisodeStart, MdpInfo, PolicyState, Table, TraceKind,
};

use super::{from_config, seeded_rng, TraceCore};
use crate::config::QLambdaConfig;
use crate::parameter::LearningRate;
use crate::policy::QPolicy;

/// Off-policy Q-learning with eligibility traces.
///
/// The target bootstraps on `max_a' Q[s', a']`, or zero when `s'` is
/// absorbing. With `lambda_coef = 0` every update touches only the visited
/// pair, which is plain one-step Q-learning.
pub struct QLearningLambda {
    core: TraceCore,
    policy: Box<dyn QPolicy>,
    rng: StdRng,
}

impl QLearningLambda {
    /// Create an agent with a zero table sized from `info`
    pub fn new(
        info: &MdpInfo,
        policy: Box<dyn QPolicy>,
        learning_rate: Box<dyn LearningRate>,
        lambda_coef: f64,
        trace: TraceKind,
    ) -> trellis_core::Result<Self> {
        Ok(Self {
            core: TraceCore::new(info, learning_rate, lambda_coef, trace)?,
            policy,
            rng: seeded_rng(None),
        })
    }

    /// Create an epsilon-greedy agent from a configuration
    pub fn from_config(info: &MdpInfo, config: &QLambdaConfig) -> trellis_core::Result<Self> {
        let (core, policy, rng) = from_config(info, config)?;
        Ok(Self { core, policy, rng })
    }

    /// Reseed the exploration RNG
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = seeded_rng(Some(seed));
        self
    }

    /// Apply one transition.
    ///
    /// Returns the TD error. The episode ends after an absorbing transition.
    pub fn step(
        &mut self,
        state: usize,
        action: usize,
        reward: f64,
        next_state: usize,
        absorbing: bool,
    ) -> trellis_core::Result<f64> {
        self.update(state, action, reward, next_state, absorbing, absorbing)
    }

    fn update(
        &mut self,
        state: usize,
        action: usize,
        reward: f64,
        next_state: usize,
        absorbing: bool,
        last: bool,
    ) -> trellis_core::Result<f64> {
        let q_next = if absorbing {
            0.0
        } else {
            self.core.q().max(next_state)
        };
        self.core.update(state, action, reward, q_next, absorbing || last)
    }

    /// Learned action values
    #[must_use]
    pub fn q_table(&self) -> &Table {
        self.core.q()
    }

    /// Shared table and trace state
    #[must_use]
    pub fn core(&self) -> &TraceCore {
        &self.core
    }
}

impl Agent for QLearningLambda {
    type State = usize;
    type Action = usize;

    fn episode_start(
        &mut self,
        _initial_state: &usize,
        _info: &EpisodeInfo,
    ) -> trellis_core::Result<EpisodeStart> {
        self.core.start();
        Ok(EpisodeStart {
            policy_state: None,
            theta: None,
        })
    }

    fn draw_action(
        &mut self,
        state: &usize,
        _policy_state: &PolicyState,
    ) -> trellis_core::Result<(usize, PolicyState)> {
        let action = self.policy.draw_action(self.core.q(), *state, &mut self.rng)?;
        Ok((action, None))
    }

    fn fit(&mut self, dataset: &Dataset<usize, usize>) -> trellis_core::Result<()> {
        debug!(transitions = dataset.len(), "fitting Q(lambda)");
        // Later episodes in the batch were started by the driver before any
        // of them were replayed.
        for (index, episode) in dataset.episodes().iter().enumerate() {
            if index > 0 {
                self.core.start();
            }
            for t in &episode.transitions {
                self.update(t.state, t.action, t.reward, t.next_state, t.absorbing, t.last)?;
            }
        }
        Ok(())
    }
}
