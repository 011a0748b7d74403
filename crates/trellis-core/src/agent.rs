//! Agent trait and episode-start results

use ndarray::{Array1, Array2};

use crate::{Action, Dataset, EpisodeInfo, PolicyState, State};

/// Result of starting a single episode
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeStart {
    /// Initial policy state
    pub policy_state: PolicyState,
    /// Parameters sampled for this episode (black-box agents only)
    pub theta: Option<Array1<f64>>,
}

/// Result of a vectorized episode start
#[derive(Debug, Clone, PartialEq)]
pub struct VectorEpisodeStart {
    /// Policy state of every slot
    pub policy_states: Vec<PolicyState>,
    /// Parameters of every slot, `[n_envs, dim]` (black-box agents only)
    pub theta: Option<Array2<f64>>,
}

/// Core agent trait.
///
/// Every method runs synchronously to completion; a driver never interleaves
/// calls on the same agent.
pub trait Agent {
    /// State type
    type State: State;
    /// Action type
    type Action: Action;

    /// Prepare for a new episode
    fn episode_start(
        &mut self,
        initial_state: &Self::State,
        info: &EpisodeInfo,
    ) -> crate::Result<EpisodeStart>;

    /// Prepare the slots flagged in `start_mask` for a new episode, keeping
    /// every other slot untouched
    fn episode_start_vectorized(
        &mut self,
        _initial_states: &[Self::State],
        _infos: &[EpisodeInfo],
        _start_mask: &[bool],
    ) -> crate::Result<VectorEpisodeStart> {
        Err(crate::RLError::Unsupported(
            "this agent does not support vectorized execution".to_string(),
        ))
    }

    /// Select an action
    fn draw_action(
        &mut self,
        state: &Self::State,
        policy_state: &PolicyState,
    ) -> crate::Result<(Self::Action, PolicyState)>;

    /// Select one action per slot
    fn draw_actions_vectorized(
        &mut self,
        _states: &[Self::State],
        _policy_states: &[PolicyState],
    ) -> crate::Result<(Vec<Self::Action>, Vec<PolicyState>)> {
        Err(crate::RLError::Unsupported(
            "this agent does not support vectorized execution".to_string(),
        ))
    }

    /// Learn from collected experience
    fn fit(&mut self, dataset: &Dataset<Self::State, Self::Action>) -> crate::Result<()>;

    /// Whether `fit` expects whole episodes rather than single steps
    fn is_episodic(&self) -> bool {
        false
    }

    /// Hook called by drivers when a learning or evaluation run ends
    fn stop(&mut self) {}
}
