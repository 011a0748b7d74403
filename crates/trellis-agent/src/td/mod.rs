//! Temporal-difference control with eligibility traces
//!
//! Both agents share [`TraceCore`], which owns the table and its trace and
//! applies the trace-weighted update for a TD target supplied by the caller:
//!
//! 1. mark `(s, a)` in the trace
//! 2. `Q += alpha(s, a) * delta * E`
//! 3. `E *= gamma * lambda_coef`
//!
//! The two agents differ only in how they bootstrap the target.

pub mod q_lambda;
pub mod sarsa_lambda;

pub use q_lambda::QLearningLambda;
pub use sarsa_lambda::SarsaLambda;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::trace;
use trellis_core::{EligibilityTrace, MdpInfo, RLError, Table, TraceKind};

use crate::config::QLambdaConfig;
use crate::parameter::LearningRate;
use crate::policy::{EpsGreedy, QPolicy};

/// Table, trace and step-size state shared by the trace-based agents.
///
/// Tracks whether an episode is in progress: [`TraceCore::start`] opens one,
/// a transition flagged `absorbing` or `last` closes it, and updating while
/// closed fails with [`RLError::EpisodeNotStarted`].
pub struct TraceCore {
    q: Table,
    trace: EligibilityTrace,
    learning_rate: Box<dyn LearningRate>,
    gamma: f64,
    lambda_coef: f64,
    in_episode: bool,
}

impl TraceCore {
    /// Zero table sized from a discrete MDP.
    ///
    /// `lambda_coef` is expected in `[0, 1]` and is not validated.
    pub fn new(
        info: &MdpInfo,
        learning_rate: Box<dyn LearningRate>,
        lambda_coef: f64,
        kind: TraceKind,
    ) -> trellis_core::Result<Self> {
        let q = Table::from_mdp(info)?;
        let trace = EligibilityTrace::for_table(&q, kind);
        Ok(Self {
            q,
            trace,
            learning_rate,
            gamma: info.gamma,
            lambda_coef,
            in_episode: false,
        })
    }

    /// Override the discount copied from the MDP
    #[must_use]
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Zero the trace and open an episode
    pub fn start(&mut self) {
        self.trace.reset();
        self.in_episode = true;
    }

    /// Whether an episode is in progress
    #[must_use]
    pub fn in_episode(&self) -> bool {
        self.in_episode
    }

    /// Apply one update towards `reward + gamma * q_next`, returning the TD
    /// error
    pub fn update(
        &mut self,
        state: usize,
        action: usize,
        reward: f64,
        q_next: f64,
        ends_episode: bool,
    ) -> trellis_core::Result<f64> {
        if !self.in_episode {
            return Err(RLError::EpisodeNotStarted);
        }

        let q_current = self.q.get(state, action);
        let delta = reward + self.gamma * q_next - q_current;

        self.trace.update(state, action);
        let alpha = self.learning_rate.value(state, action);
        self.q.scaled_add(alpha * delta, &self.trace.values());
        self.trace.scale(self.gamma * self.lambda_coef);

        trace!(state, action, reward, delta, alpha, "td update");

        if ends_episode {
            self.in_episode = false;
        }
        Ok(delta)
    }

    /// Action-value table
    #[must_use]
    pub fn q(&self) -> &Table {
        &self.q
    }

    /// Eligibility trace
    #[must_use]
    pub fn trace(&self) -> &EligibilityTrace {
        &self.trace
    }

    /// Discount factor
    #[must_use]
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Trace decay coefficient
    #[must_use]
    pub fn lambda_coef(&self) -> f64 {
        self.lambda_coef
    }
}

impl std::fmt::Debug for TraceCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceCore")
            .field("shape", &self.q.shape())
            .field("trace", &self.trace.kind())
            .field("gamma", &self.gamma)
            .field("lambda_coef", &self.lambda_coef)
            .field("in_episode", &self.in_episode)
            .finish_non_exhaustive()
    }
}

/// Build the core, exploration policy and RNG a config describes
pub(crate) fn from_config(
    info: &MdpInfo,
    config: &QLambdaConfig,
) -> trellis_core::Result<(TraceCore, Box<dyn QPolicy>, StdRng)> {
    let (n_states, n_actions) = info.table_shape()?;
    let learning_rate = config.learning_rate.build(n_states, n_actions);
    let mut core = TraceCore::new(info, learning_rate, config.lambda_coef, config.trace)?;
    if let Some(gamma) = config.gamma {
        core = core.with_gamma(gamma);
    }
    let policy: Box<dyn QPolicy> = Box::new(EpsGreedy::with_schedule(config.epsilon.build()));
    Ok((core, policy, seeded_rng(config.seed)))
}

pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}
