//! Environment contract consumed by the drivers

use async_trait::async_trait;

use crate::{Action, EpisodeInfo, MdpInfo, State};

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct Step<S> {
    /// Resulting state
    pub state: S,
    /// Reward signal
    pub reward: f64,
    /// Whether the resulting state is absorbing
    pub absorbing: bool,
}

/// Core environment trait
#[async_trait]
pub trait Environment: Send {
    /// State type
    type State: State;
    /// Action type
    type Action: Action;

    /// Static description (spaces, discount, horizon)
    fn info(&self) -> &MdpInfo;

    /// Start a new episode
    async fn reset(&mut self) -> crate::Result<(Self::State, EpisodeInfo)>;

    /// Take a step in the environment
    async fn step(&mut self, action: &Self::Action) -> crate::Result<Step<Self::State>>;
}
