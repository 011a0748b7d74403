//! On-policy SARSA(λ)

use rand::rngs::StdRng;
use tracing::debug;
use trellis_core::{
    Agent, Dataset, EpisodeInfo, EpisodeStart, MdpInfo, PolicyState, Table, TraceKind,
};

use super::{from_config, seeded_rng, TraceCore};
use crate::config::QLambdaConfig;
use crate::parameter::LearningRate;
use crate::policy::QPolicy;

/// SARSA with eligibility traces.
///
/// The target bootstraps on `Q[s', a']` where `a'` is the action the
/// exploration policy takes in `s'`. When that action is not already known
/// it is drawn during the update and returned by the next
/// [`Agent::draw_action`], so the agent acts on the action it learned from.
pub struct SarsaLambda {
    core: TraceCore,
    policy: Box<dyn QPolicy>,
    rng: StdRng,
    next_action: Option<usize>,
}

impl SarsaLambda {
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
            next_action: None,
        })
    }

    /// Create an epsilon-greedy agent from a configuration
    pub fn from_config(info: &MdpInfo, config: &QLambdaConfig) -> trellis_core::Result<Self> {
        let (core, policy, rng) = from_config(info, config)?;
        Ok(Self {
            core,
            policy,
            rng,
            next_action: None,
        })
    }

    /// Reseed the exploration RNG
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = seeded_rng(Some(seed));
        self
    }

    /// Apply one transition, drawing the bootstrap action from the policy
    pub fn step(
        &mut self,
        state: usize,
        action: usize,
        reward: f64,
        next_state: usize,
        absorbing: bool,
    ) -> trellis_core::Result<f64> {
        self.update(state, action, reward, next_state, absorbing, absorbing, None)
    }

    #[allow(clippy::too_many_arguments)]
    fn update(
        &mut self,
        state: usize,
        action: usize,
        reward: f64,
        next_state: usize,
        absorbing: bool,
        last: bool,
        known_next: Option<usize>,
    ) -> trellis_core::Result<f64> {
        let ends_episode = absorbing || last;
        self.next_action = None;

        let q_next = if absorbing {
            0.0
        } else {
            let next_action = match known_next {
                Some(a) => a,
                None => {
                    let a = self
                        .policy
                        .draw_action(self.core.q(), next_state, &mut self.rng)?;
                    if !ends_episode {
                        self.next_action = Some(a);
                    }
                    a
                }
            };
            self.core.q().get(next_state, next_action)
        };
        self.core.update(state, action, reward, q_next, ends_episode)
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

impl Agent for SarsaLambda {
    type State = usize;
    type Action = usize;

    fn episode_start(
        &mut self,
        _initial_state: &usize,
        _info: &EpisodeInfo,
    ) -> trellis_core::Result<EpisodeStart> {
        self.core.start();
        self.next_action = None;
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
        let action = match self.next_action.take() {
            Some(a) => a,
            None => self.policy.draw_action(self.core.q(), *state, &mut self.rng)?,
        };
        Ok((action, None))
    }

    fn fit(&mut self, dataset: &Dataset<usize, usize>) -> trellis_core::Result<()> {
        debug!(transitions = dataset.len(), "fitting SARSA(lambda)");
        for (index, episode) in dataset.episodes().iter().enumerate() {
            if index > 0 {
                self.core.start();
            }
            let mut transitions = episode.transitions.iter().peekable();
            while let Some(t) = transitions.next() {
                let known_next = transitions.peek().map(|next| next.action);
                self.update(
                    t.state,
                    t.action,
                    t.reward,
                    t.next_state,
                    t.absorbing,
                    t.last,
                    known_next,
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::ConstantRate;
    use crate::policy::EpsGreedy;
    use approx::assert_relative_eq;

    fn agent() -> SarsaLambda {
        let info = MdpInfo::discrete(2, 2, 0.9, 10);
        SarsaLambda::new(
            &info,
            Box::new(EpsGreedy::new(0.0)),
            Box::new(ConstantRate(0.5)),
            0.0,
            TraceKind::Replacing,
        )
        .unwrap()
        .with_seed(7)
    }

    #[test]
    fn test_drawn_bootstrap_action_is_replayed() {
        let mut agent = agent();
        agent.episode_start(&0, &EpisodeInfo::new()).unwrap();
        agent.step(0, 1, 1.0, 1, false).unwrap();
        let cached = agent.next_action.expect("bootstrap action cached");
        let (action, _) = agent.draw_action(&1, &None).unwrap();
        assert_eq!(action, cached);
        assert!(agent.next_action.is_none());
    }

    #[test]
    fn test_absorbing_step_clears_cache() {
        let mut agent = agent();
        agent.episode_start(&0, &EpisodeInfo::new()).unwrap();
        agent.step(0, 1, 1.0, 1, true).unwrap();
        assert!(agent.next_action.is_none());
        assert_relative_eq!(agent.q_table().get(0, 1), 0.5);
        assert!(agent.step(1, 0, 0.0, 0, false).is_err());
    }

    #[test]
    fn test_fit_bootstraps_on_recorded_action() {
        use trellis_core::{Episode, Transition};

        let mut agent = agent();
        agent.episode_start(&0, &EpisodeInfo::new()).unwrap();

        let mut episode = Episode::new(0usize, EpisodeInfo::new(), None);
        for (state, action, reward, next_state, absorbing) in
            [(0, 0, 0.0, 1, false), (1, 1, 2.0, 0, true)]
        {
            episode.push(Transition {
                state,
                action,
                reward,
                next_state,
                absorbing,
                last: absorbing,
            });
        }
        let mut dataset = Dataset::new(0.9);
        dataset.push_episode(episode);
        agent.fit(&dataset).unwrap();

        assert_relative_eq!(agent.q_table().get(0, 0), 0.0);
        assert_relative_eq!(agent.q_table().get(1, 1), 1.0);
        assert!(!agent.core().in_episode());
    }
}
