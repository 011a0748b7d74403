//! Drivers that move an agent through environments
//!
//! [`Runner`] plays one environment episode after episode; [`VectorRunner`]
//! lock-steps several environments and restarts each slot as soon as its
//! episode ends, feeding the agent the per-slot start mask.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{Agent, Dataset, Environment, Episode, EpisodeInfo, PolicyState, Transition};

/// When a learning run calls `fit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitCondition {
    /// After every `n` transitions and at the end of every episode.
    /// Rejected for episodic agents.
    Steps(usize),
    /// After every `n` completed episodes
    Episodes(usize),
}

/// Single-environment driver
pub struct Runner<A, E> {
    agent: A,
    env: E,
}

impl<A, E> Runner<A, E>
where
    A: Agent,
    E: Environment<State = A::State, Action = A::Action>,
{
    /// Create a new runner
    pub fn new(agent: A, env: E) -> Self {
        Self { agent, env }
    }

    /// The agent
    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// The agent, mutably
    pub fn agent_mut(&mut self) -> &mut A {
        &mut self.agent
    }

    /// The environment
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Split the runner back into its parts
    pub fn into_parts(self) -> (A, E) {
        (self.agent, self.env)
    }

    /// Play `n_episodes` episodes, fitting whenever `condition` is met
    pub async fn learn(&mut self, condition: FitCondition, n_episodes: usize) -> crate::Result<()> {
        let condition_size = match condition {
            FitCondition::Steps(n) | FitCondition::Episodes(n) => n,
        };
        if condition_size == 0 {
            return Err(crate::RLError::InvalidParameter(
                "fit condition must be at least 1".to_string(),
            ));
        }
        if matches!(condition, FitCondition::Steps(_)) && self.agent.is_episodic() {
            return Err(crate::RLError::InvalidParameter(
                "episodic agents fit on whole episodes, not steps".to_string(),
            ));
        }
        self.run(n_episodes, Some(condition)).await?;
        Ok(())
    }

    /// Play `n_episodes` episodes without fitting and return them
    pub async fn evaluate(
        &mut self,
        n_episodes: usize,
    ) -> crate::Result<Dataset<A::State, A::Action>> {
        self.run(n_episodes, None).await
    }

    async fn run(
        &mut self,
        n_episodes: usize,
        condition: Option<FitCondition>,
    ) -> crate::Result<Dataset<A::State, A::Action>> {
        let gamma = self.env.info().gamma;
        let horizon = self.env.info().horizon;
        let mut pending = Dataset::new(gamma);
        let mut steps_since_fit = 0;
        let mut episodes_since_fit = 0;

        for index in 0..n_episodes {
            let (mut state, info) = self.env.reset().await?;
            let start = self.agent.episode_start(&state, &info)?;
            let mut policy_state = start.policy_state;
            let mut episode = Episode::new(state.clone(), info, start.theta);
            let mut t = 0;

            loop {
                let (action, next_policy_state) = self.agent.draw_action(&state, &policy_state)?;
                let step = self.env.step(&action).await?;
                t += 1;
                let last = step.absorbing || t >= horizon;
                trace!(t, reward = step.reward, absorbing = step.absorbing, "environment step");

                episode.push(Transition {
                    state,
                    action,
                    reward: step.reward,
                    next_state: step.state.clone(),
                    absorbing: step.absorbing,
                    last,
                });
                state = step.state;
                policy_state = next_policy_state;

                if let Some(FitCondition::Steps(n)) = condition {
                    steps_since_fit += 1;
                    if steps_since_fit == n {
                        pending.push_episode(split_off(&mut episode));
                        self.agent.fit(&pending)?;
                        pending.clear();
                        steps_since_fit = 0;
                    }
                }

                if last {
                    break;
                }
            }

            debug!(episode = index, steps = t, "episode finished");
            if !episode.is_empty() {
                pending.push_episode(episode);
            }
            match condition {
                // The tail is fitted before the next episode_start resets the agent
                Some(FitCondition::Steps(_)) if !pending.is_empty() => {
                    self.agent.fit(&pending)?;
                    pending.clear();
                    steps_since_fit = 0;
                }
                Some(FitCondition::Episodes(n)) => {
                    episodes_since_fit += 1;
                    if episodes_since_fit == n {
                        self.agent.fit(&pending)?;
                        pending.clear();
                        episodes_since_fit = 0;
                    }
                }
                _ => {}
            }
        }

        self.agent.stop();
        Ok(pending)
    }
}

/// Move the transitions collected so far into a new episode record sharing
/// the same context
fn split_off<S: Clone, A>(episode: &mut Episode<S, A>) -> Episode<S, A> {
    Episode {
        initial_state: episode.initial_state.clone(),
        info: episode.info.clone(),
        theta: episode.theta.clone(),
        transitions: std::mem::take(&mut episode.transitions),
    }
}

/// Lock-step driver over several environments
pub struct VectorRunner<A, E> {
    agent: A,
    envs: Vec<E>,
}

impl<A, E> VectorRunner<A, E>
where
    A: Agent,
    E: Environment<State = A::State, Action = A::Action>,
{
    /// Create a new vectorized runner
    pub fn new(agent: A, envs: Vec<E>) -> crate::Result<Self> {
        if envs.is_empty() {
            return Err(crate::RLError::InvalidParameter(
                "vector runner needs at least one environment".to_string(),
            ));
        }
        Ok(Self { agent, envs })
    }

    /// The agent
    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// The agent, mutably
    pub fn agent_mut(&mut self) -> &mut A {
        &mut self.agent
    }

    /// Number of environments
    pub fn n_envs(&self) -> usize {
        self.envs.len()
    }

    /// Split the runner back into its parts
    pub fn into_parts(self) -> (A, Vec<E>) {
        (self.agent, self.envs)
    }

    /// Play `n_episodes` episodes in total, fitting after every
    /// `n_episodes_per_fit` completed episodes
    pub async fn learn(
        &mut self,
        n_episodes: usize,
        n_episodes_per_fit: usize,
    ) -> crate::Result<()> {
        if n_episodes_per_fit == 0 {
            return Err(crate::RLError::InvalidParameter(
                "n_episodes_per_fit must be at least 1".to_string(),
            ));
        }
        self.run(n_episodes, Some(n_episodes_per_fit)).await?;
        Ok(())
    }

    /// Play `n_episodes` episodes without fitting and return them
    pub async fn evaluate(
        &mut self,
        n_episodes: usize,
    ) -> crate::Result<Dataset<A::State, A::Action>> {
        self.run(n_episodes, None).await
    }

    async fn run(
        &mut self,
        n_episodes: usize,
        fit_every: Option<usize>,
    ) -> crate::Result<Dataset<A::State, A::Action>> {
        let gamma = self.envs[0].info().gamma;
        let horizon = self.envs[0].info().horizon;
        let n_envs = self.envs.len().min(n_episodes);
        let mut finished = Dataset::new(gamma);
        if n_envs == 0 {
            return Ok(finished);
        }

        let mut states = Vec::with_capacity(n_envs);
        let mut infos = Vec::with_capacity(n_envs);
        for env in &mut self.envs[..n_envs] {
            let (state, info) = env.reset().await?;
            states.push(state);
            infos.push(info);
        }

        let mut start_mask = vec![true; n_envs];
        let mut active = vec![true; n_envs];
        let mut started = n_envs;
        let mut steps = vec![0usize; n_envs];
        let mut policy_states: Vec<PolicyState> = vec![None; n_envs];
        let mut episodes: Vec<Option<Episode<A::State, A::Action>>> =
            (0..n_envs).map(|_| None).collect();
        let mut episodes_since_fit = 0;

        while active.iter().any(|&a| a) {
            if start_mask.iter().any(|&m| m) {
                let start = self
                    .agent
                    .episode_start_vectorized(&states, &infos, &start_mask)?;
                for slot in (0..n_envs).filter(|&i| start_mask[i]) {
                    policy_states[slot] = start.policy_states[slot].clone();
                    let theta = start.theta.as_ref().map(|t| t.row(slot).to_owned());
                    episodes[slot] = Some(Episode::new(
                        states[slot].clone(),
                        std::mem::take(&mut infos[slot]),
                        theta,
                    ));
                }
                start_mask.fill(false);
            }

            let (actions, next_policy_states) = self
                .agent
                .draw_actions_vectorized(&states, &policy_states)?;

            for (slot, (action, next_policy_state)) in
                actions.into_iter().zip(next_policy_states).enumerate()
            {
                if !active[slot] {
                    continue;
                }
                let step = self.envs[slot].step(&action).await?;
                steps[slot] += 1;
                let last = step.absorbing || steps[slot] >= horizon;

                let transition = Transition {
                    state: states[slot].clone(),
                    action,
                    reward: step.reward,
                    next_state: step.state.clone(),
                    absorbing: step.absorbing,
                    last,
                };
                if let Some(episode) = episodes[slot].as_mut() {
                    episode.push(transition);
                }
                states[slot] = step.state;
                policy_states[slot] = next_policy_state;

                if !last {
                    continue;
                }

                debug!(slot, steps = steps[slot], "slot episode finished");
                if let Some(episode) = episodes[slot].take() {
                    finished.push_episode(episode);
                    episodes_since_fit += 1;
                }
                if let Some(n) = fit_every {
                    if episodes_since_fit == n {
                        self.agent.fit(&finished)?;
                        finished.clear();
                        episodes_since_fit = 0;
                    }
                }

                if started < n_episodes {
                    let (state, info) = self.envs[slot].reset().await?;
                    states[slot] = state;
                    infos[slot] = info;
                    steps[slot] = 0;
                    start_mask[slot] = true;
                    started += 1;
                } else {
                    active[slot] = false;
                    infos[slot] = EpisodeInfo::new();
                }
            }
        }

        self.agent.stop();
        Ok(finished)
    }
}
