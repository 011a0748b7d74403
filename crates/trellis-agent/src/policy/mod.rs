//! Policies used by the agents

pub mod linear;
pub mod td;

pub use linear::LinearPolicy;
pub use td::{Boltzmann, EpsGreedy, QPolicy};
