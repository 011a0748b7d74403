//! Learning agents for Trellis
//!
//! This crate provides the algorithms built on `trellis-core`:
//! - Q(λ) and SARSA(λ) over tabular action values with eligibility traces
//! - Black-box policy search (RWR, REPS, PGPE) over Gaussian parameter
//!   distributions, with vectorized episode starts
//! - Learning-rate and exploration schedules, tabular and linear policies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bbo;
pub mod config;
pub mod distribution;
pub mod parameter;
pub mod policy;
pub mod td;

// Re-export agents
pub use bbo::{
    BlackBoxOptimization, DistributionUpdate, EpisodeContext, Optimizer, Pgpe, Reps, Rwr,
    UpdateBatch,
};
pub use td::{QLearningLambda, SarsaLambda, TraceCore};

// Re-export building blocks
pub use config::{BlackBoxConfig, QLambdaConfig};
pub use distribution::{GaussianCholesky, GaussianDiagonal, LinearContextualGaussian};
pub use parameter::{
    ConstantRate, ConstantSchedule, ExponentialSchedule, LearningRate, LearningRateConfig,
    LinearSchedule, Schedule, ScheduleConfig, VisitDecayRate,
};
pub use policy::{Boltzmann, EpsGreedy, LinearPolicy, QPolicy};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        BlackBoxOptimization, DistributionUpdate, EpsGreedy, GaussianDiagonal, LinearPolicy,
        QLambdaConfig, QLearningLambda, Reps, Rwr, SarsaLambda,
    };
    pub use trellis_core::prelude::*;
}
