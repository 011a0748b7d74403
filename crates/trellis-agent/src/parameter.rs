//! Learning-rate and exploration schedules

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Per-`(state, action)` learning rate.
///
/// Called exactly once per TD update, so stateful implementations may count
/// visits.
pub trait LearningRate: Send {
    /// Step size for the update of `(state, action)`
    fn value(&mut self, state: usize, action: usize) -> f64;
}

impl<F> LearningRate for F
where
    F: FnMut(usize, usize) -> f64 + Send,
{
    fn value(&mut self, state: usize, action: usize) -> f64 {
        self(state, action)
    }
}

/// Same step size everywhere
#[derive(Debug, Clone, Copy)]
pub struct ConstantRate(pub f64);

impl LearningRate for ConstantRate {
    fn value(&mut self, _state: usize, _action: usize) -> f64 {
        self.0
    }
}

/// `initial / n(s, a)^exp`, floored at `min_value`, where `n` counts the
/// updates of each pair including the current one
#[derive(Debug, Clone)]
pub struct VisitDecayRate {
    initial: f64,
    exp: f64,
    min_value: f64,
    visits: Array2<u64>,
}

impl VisitDecayRate {
    /// Create a schedule for an `n_states x n_actions` table
    #[must_use]
    pub fn new(initial: f64, exp: f64, min_value: f64, n_states: usize, n_actions: usize) -> Self {
        Self {
            initial,
            exp,
            min_value,
            visits: Array2::zeros((n_states, n_actions)),
        }
    }

    /// Number of updates seen for `(state, action)`
    #[must_use]
    pub fn visits(&self, state: usize, action: usize) -> u64 {
        self.visits[[state, action]]
    }
}

impl LearningRate for VisitDecayRate {
    #[allow(clippy::cast_precision_loss)]
    fn value(&mut self, state: usize, action: usize) -> f64 {
        let n = &mut self.visits[[state, action]];
        *n += 1;
        (self.initial / (*n as f64).powf(self.exp)).max(self.min_value)
    }
}

/// Serializable description of a learning rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LearningRateConfig {
    /// See [`ConstantRate`]
    Constant {
        /// Step size
        value: f64,
    },
    /// See [`VisitDecayRate`]
    VisitDecay {
        /// Step size of the first visit
        initial: f64,
        /// Decay exponent
        exp: f64,
        /// Floor
        #[serde(default)]
        min_value: f64,
    },
}

impl Default for LearningRateConfig {
    fn default() -> Self {
        Self::Constant { value: 0.1 }
    }
}

impl LearningRateConfig {
    /// Build the schedule for a table of the given shape
    #[must_use]
    pub fn build(self, n_states: usize, n_actions: usize) -> Box<dyn LearningRate> {
        match self {
            Self::Constant { value } => Box::new(ConstantRate(value)),
            Self::VisitDecay {
                initial,
                exp,
                min_value,
            } => Box::new(VisitDecayRate::new(initial, exp, min_value, n_states, n_actions)),
        }
    }
}

/// Trait for schedules over a step counter (e.g., for epsilon decay)
pub trait Schedule: Send {
    /// Get value at step t
    fn value(&self, t: usize) -> f64;
}

/// Linear schedule that decays from start to end over steps
#[derive(Debug, Clone)]
pub struct LinearSchedule {
    /// Starting value
    pub start: f64,
    /// Ending value
    pub end: f64,
    /// Number of steps for decay
    pub steps: usize,
}

impl Schedule for LinearSchedule {
    #[allow(clippy::cast_precision_loss)]
    fn value(&self, t: usize) -> f64 {
        if t >= self.steps {
            self.end
        } else {
            let progress = t as f64 / self.steps as f64;
            self.start + (self.end - self.start) * progress
        }
    }
}

/// Exponential decay schedule
#[derive(Debug, Clone)]
pub struct ExponentialSchedule {
    /// Starting value
    pub start: f64,
    /// Minimum value
    pub min_value: f64,
    /// Decay rate
    pub decay_rate: f64,
}

impl Schedule for ExponentialSchedule {
    #[allow(clippy::cast_precision_loss)]
    fn value(&self, t: usize) -> f64 {
        let value = self.start * self.decay_rate.powf(t as f64);
        value.max(self.min_value)
    }
}

/// Constant schedule
#[derive(Debug, Clone)]
pub struct ConstantSchedule(pub f64);

impl Schedule for ConstantSchedule {
    fn value(&self, _t: usize) -> f64 {
        self.0
    }
}

/// Serializable description of a schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleConfig {
    /// See [`ConstantSchedule`]
    Constant {
        /// Value
        value: f64,
    },
    /// See [`LinearSchedule`]
    Linear {
        /// Starting value
        start: f64,
        /// Ending value
        end: f64,
        /// Number of steps for decay
        steps: usize,
    },
    /// See [`ExponentialSchedule`]
    Exponential {
        /// Starting value
        start: f64,
        /// Minimum value
        min_value: f64,
        /// Decay rate
        decay_rate: f64,
    },
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self::Constant { value: 0.1 }
    }
}

impl ScheduleConfig {
    /// Build the schedule
    #[must_use]
    pub fn build(self) -> Box<dyn Schedule> {
        match self {
            Self::Constant { value } => Box::new(ConstantSchedule(value)),
            Self::Linear { start, end, steps } => Box::new(LinearSchedule { start, end, steps }),
            Self::Exponential {
                start,
                min_value,
                decay_rate,
            } => Box::new(ExponentialSchedule {
                start,
                min_value,
                decay_rate,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_visit_decay_counts_each_pair() {
        let mut rate = VisitDecayRate::new(1.0, 1.0, 0.0, 2, 2);
        assert_relative_eq!(rate.value(0, 0), 1.0);
        assert_relative_eq!(rate.value(0, 0), 0.5);
        assert_relative_eq!(rate.value(1, 1), 1.0);
        assert_eq!(rate.visits(0, 0), 2);
    }

    #[test]
    fn test_visit_decay_floor() {
        let mut rate = VisitDecayRate::new(1.0, 1.0, 0.3, 1, 1);
        for _ in 0..10 {
            rate.value(0, 0);
        }
        assert_relative_eq!(rate.value(0, 0), 0.3);
    }

    #[test]
    fn test_closure_learning_rate() {
        let mut rate = |s: usize, _a: usize| if s == 0 { 0.5 } else { 0.1 };
        assert_relative_eq!(LearningRate::value(&mut rate, 0, 3), 0.5);
        assert_relative_eq!(LearningRate::value(&mut rate, 1, 3), 0.1);
    }

    #[test]
    fn test_linear_schedule() {
        let schedule = LinearSchedule {
            start: 1.0,
            end: 0.0,
            steps: 10,
        };
        assert_relative_eq!(schedule.value(0), 1.0);
        assert_relative_eq!(schedule.value(5), 0.5);
        assert_relative_eq!(schedule.value(20), 0.0);
    }

    #[test]
    fn test_exponential_schedule_floor() {
        let schedule = ExponentialSchedule {
            start: 1.0,
            min_value: 0.05,
            decay_rate: 0.5,
        };
        assert_relative_eq!(schedule.value(1), 0.5);
        assert_relative_eq!(schedule.value(10), 0.05);
    }

    #[test]
    fn test_configs_from_json() {
        let rate: LearningRateConfig =
            serde_json::from_str(r#"{"type": "visit_decay", "initial": 1.0, "exp": 0.5}"#).unwrap();
        assert_eq!(
            rate,
            LearningRateConfig::VisitDecay {
                initial: 1.0,
                exp: 0.5,
                min_value: 0.0
            }
        );

        let schedule: ScheduleConfig =
            serde_json::from_str(r#"{"type": "linear", "start": 1.0, "end": 0.1, "steps": 100}"#)
                .unwrap();
        assert_relative_eq!(schedule.build().value(100), 0.1);
    }
}
