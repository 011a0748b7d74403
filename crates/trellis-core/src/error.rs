//! Error types for the Trellis core library

use thiserror::Error;

/// Core error type for RL operations
#[derive(Error, Debug)]
pub enum RLError {
    /// Environment-related errors
    #[error("Environment error: {0}")]
    Environment(String),

    /// Agent-related errors
    #[error("Agent error: {0}")]
    Agent(String),

    /// Policy-related errors
    #[error("Policy error: {0}")]
    Policy(String),

    /// Invalid constructor or configuration value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Array shape error surfaced by ndarray
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// A TD step arrived outside of an episode
    #[error("Episode not started: call episode_start before stepping")]
    EpisodeNotStarted,

    /// A contextual distribution was sampled or fitted without a context
    #[error("Contextual distribution requires a context")]
    MissingContext,

    /// An episode in a dataset carries no sampled parameter vector
    #[error("Episode {episode} has no sampled parameters")]
    MissingTheta { episode: usize },

    /// The operation is not available for this agent or policy
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for RL operations
pub type Result<T> = std::result::Result<T, RLError>;
