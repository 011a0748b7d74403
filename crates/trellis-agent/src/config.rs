//! Serializable agent configuration

use serde::{Deserialize, Serialize};
use trellis_core::{ArrayBackend, TraceKind};

use crate::parameter::{LearningRateConfig, ScheduleConfig};

/// Configuration for the trace-based TD agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLambdaConfig {
    /// Discount factor, overriding the MDP's when set
    pub gamma: Option<f64>,
    /// Trace decay coefficient in `[0, 1]`
    pub lambda_coef: f64,
    /// Trace update rule
    pub trace: TraceKind,
    /// Per-pair step size
    pub learning_rate: LearningRateConfig,
    /// Epsilon-greedy exploration rate
    pub epsilon: ScheduleConfig,
    /// Seed for the exploration RNG
    pub seed: Option<u64>,
}

impl Default for QLambdaConfig {
    fn default() -> Self {
        Self {
            gamma: None,
            lambda_coef: 0.9,
            trace: TraceKind::Replacing,
            learning_rate: LearningRateConfig::default(),
            epsilon: ScheduleConfig::default(),
            seed: None,
        }
    }
}

impl QLambdaConfig {
    /// Parse from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> trellis_core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Configuration for black-box optimization agents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackBoxConfig {
    /// Array representation for stacked parameter batches
    pub backend: ArrayBackend,
    /// Seed for parameter sampling
    pub seed: Option<u64>,
}

impl BlackBoxConfig {
    /// Parse from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> trellis_core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_q_lambda_config_defaults() {
        let config = QLambdaConfig::from_json(r#"{"lambda_coef": 0.5, "trace": "accumulating"}"#)
            .unwrap();
        assert_eq!(config.lambda_coef, 0.5);
        assert_eq!(config.trace, TraceKind::Accumulating);
        assert_eq!(config.learning_rate, LearningRateConfig::Constant { value: 0.1 });
        assert!(config.gamma.is_none());
    }

    #[test]
    fn test_unknown_trace_is_rejected() {
        assert!(QLambdaConfig::from_json(r#"{"trace": "dutch"}"#).is_err());
    }

    #[test]
    fn test_black_box_config() {
        let config = BlackBoxConfig::from_json(r#"{"seed": 3}"#).unwrap();
        assert_eq!(config.backend, ArrayBackend::Dense);
        assert_eq!(config.seed, Some(3));
        assert_eq!(BlackBoxConfig::default().seed, None);
    }
}
