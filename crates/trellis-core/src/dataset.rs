//! Transitions, episodes and the datasets agents are fitted on

use indexmap::IndexMap;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::{ArrayBackend, State};

/// Single transition of an episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<S, A> {
    /// State the action was taken in
    pub state: S,
    /// Action taken
    pub action: A,
    /// Reward received
    pub reward: f64,
    /// Resulting state
    pub next_state: S,
    /// The next state is absorbing (zero continuation value)
    pub absorbing: bool,
    /// Last transition of the episode, by absorption or horizon
    pub last: bool,
}

/// Named scalar metadata attached to episodes.
///
/// Each key maps to one value per episode; merging datasets concatenates the
/// per-key lists in episode order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeInfo {
    #[serde(flatten)]
    fields: IndexMap<String, Vec<f64>>,
}

impl EpisodeInfo {
    /// Create empty metadata
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `key`
    pub fn push(&mut self, key: impl Into<String>, value: f64) {
        self.fields.entry(key.into()).or_default().push(value);
    }

    /// Builder-style [`EpisodeInfo::push`]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.push(key, value);
        self
    }

    /// Values stored under `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.fields.get(key).map(Vec::as_slice)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no key is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Concatenate the per-key value lists of several infos
    #[must_use]
    pub fn concat<'a>(infos: impl IntoIterator<Item = &'a EpisodeInfo>) -> Self {
        let mut merged = Self::new();
        for info in infos {
            for (key, values) in &info.fields {
                merged
                    .fields
                    .entry(key.clone())
                    .or_default()
                    .extend_from_slice(values);
            }
        }
        merged
    }
}

/// One episode: its context, sampled parameters and transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode<S, A> {
    /// State the episode started from
    pub initial_state: S,
    /// Metadata returned by the environment reset
    pub info: EpisodeInfo,
    /// Parameters the policy ran with, for black-box agents
    pub theta: Option<Array1<f64>>,
    /// Transitions in order
    pub transitions: Vec<Transition<S, A>>,
}

impl<S, A> Episode<S, A> {
    /// Create an empty episode
    pub fn new(initial_state: S, info: EpisodeInfo, theta: Option<Array1<f64>>) -> Self {
        Self {
            initial_state,
            info,
            theta,
            transitions: Vec::new(),
        }
    }

    /// Append a transition
    pub fn push(&mut self, transition: Transition<S, A>) {
        self.transitions.push(transition);
    }

    /// Whether the last transition closed the episode
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.transitions.last().is_some_and(|t| t.last)
    }

    /// Number of transitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Whether the episode has no transitions yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// `sum_t gamma^t r_t`
    #[must_use]
    pub fn discounted_return(&self, gamma: f64) -> f64 {
        self.transitions
            .iter()
            .rev()
            .fold(0.0, |acc, t| t.reward + gamma * acc)
    }
}

/// Summary statistics of episode returns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnSummary {
    /// Smallest return
    pub min: f64,
    /// Largest return
    pub max: f64,
    /// Mean return
    pub mean: f64,
    /// Number of episodes
    pub episodes: usize,
}

/// Collection of episodes together with the discount used for returns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset<S, A> {
    gamma: f64,
    episodes: Vec<Episode<S, A>>,
}

impl<S, A> Dataset<S, A> {
    /// Create an empty dataset
    #[must_use]
    pub fn new(gamma: f64) -> Self {
        Self {
            gamma,
            episodes: Vec::new(),
        }
    }

    /// Discount factor
    #[must_use]
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Append an episode
    pub fn push_episode(&mut self, episode: Episode<S, A>) {
        self.episodes.push(episode);
    }

    /// Episodes in insertion order
    #[must_use]
    pub fn episodes(&self) -> &[Episode<S, A>] {
        &self.episodes
    }

    /// Number of episodes
    #[must_use]
    pub fn n_episodes(&self) -> usize {
        self.episodes.len()
    }

    /// Total number of transitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.episodes.iter().map(Episode::len).sum()
    }

    /// Whether no transition has been stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every episode
    pub fn clear(&mut self) {
        self.episodes.clear();
    }

    /// All transitions, episode after episode
    pub fn transitions(&self) -> impl Iterator<Item = &Transition<S, A>> {
        self.episodes.iter().flat_map(|e| e.transitions.iter())
    }

    /// Discounted return of every episode
    #[must_use]
    pub fn discounted_return(&self) -> Array1<f64> {
        self.episodes
            .iter()
            .map(|e| e.discounted_return(self.gamma))
            .collect()
    }

    /// Undiscounted return of every episode
    #[must_use]
    pub fn undiscounted_return(&self) -> Array1<f64> {
        self.episodes
            .iter()
            .map(|e| e.discounted_return(1.0))
            .collect()
    }

    /// Min, max and mean of the discounted returns, `None` when empty
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn returns_summary(&self) -> Option<ReturnSummary> {
        let returns = self.discounted_return();
        if returns.is_empty() {
            return None;
        }
        Some(ReturnSummary {
            min: returns.fold(f64::INFINITY, |acc, &j| acc.min(j)),
            max: returns.fold(f64::NEG_INFINITY, |acc, &j| acc.max(j)),
            mean: returns.sum() / returns.len() as f64,
            episodes: returns.len(),
        })
    }

    /// Sampled parameters of every episode
    pub fn theta_list(&self) -> crate::Result<Vec<Array1<f64>>> {
        self.episodes
            .iter()
            .enumerate()
            .map(|(episode, e)| {
                e.theta
                    .clone()
                    .ok_or(crate::RLError::MissingTheta { episode })
            })
            .collect()
    }

    /// Sampled parameters stacked into an `[episodes, dim]` matrix
    pub fn theta_matrix(&self, backend: ArrayBackend, dim: usize) -> crate::Result<Array2<f64>> {
        backend.from_rows(&self.theta_list()?, dim)
    }

    /// Merged metadata of every episode
    #[must_use]
    pub fn episode_info(&self) -> EpisodeInfo {
        EpisodeInfo::concat(self.episodes.iter().map(|e| &e.info))
    }
}

impl<S: State, A> Dataset<S, A> {
    /// Initial states of every episode
    #[must_use]
    pub fn initial_states(&self) -> Vec<S> {
        self.episodes.iter().map(|e| e.initial_state.clone()).collect()
    }

    /// Features of every initial state, one row per episode
    pub fn initial_state_features(&self, backend: ArrayBackend) -> crate::Result<Array2<f64>> {
        let rows: Vec<Array1<f64>> = self
            .episodes
            .iter()
            .map(|e| e.initial_state.features())
            .collect();
        let dim = rows.first().map_or(0, Array1::len);
        backend.from_rows(&rows, dim)
    }
}
