//! Core reinforcement learning types and contracts for Trellis
//!
//! This crate provides the storage and contracts shared by every algorithm:
//! dense state-action tables and their eligibility traces, the parameter
//! distribution and policy traits, the vectorized policy container, the
//! agent and environment traits, datasets of episodes and the drivers that
//! tie them together.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod backend;
pub mod dataset;
pub mod distribution;
pub mod environment;
pub mod error;
pub mod policy;
pub mod runner;
pub mod space;
pub mod table;
pub mod trace;

// Re-export core traits and types
pub use agent::{Agent, EpisodeStart, VectorEpisodeStart};
pub use backend::ArrayBackend;
pub use dataset::{Dataset, Episode, EpisodeInfo, ReturnSummary, Transition};
pub use distribution::{require_context, Distribution};
pub use environment::{Environment, Step};
pub use error::{RLError, Result};
pub use policy::{ParametricPolicy, Policy, PolicyHandle, PolicyState, VectorPolicy};
pub use runner::{FitCondition, Runner, VectorRunner};
pub use space::{Action, BoxSpace, DiscreteSpace, MdpInfo, Space, State};
pub use table::Table;
pub use trace::{EligibilityTrace, TraceKind};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Agent, Dataset, Distribution, Environment, EpisodeInfo, MdpInfo, ParametricPolicy,
        Policy, PolicyState, Result, Table, Transition,
    };
}
