//! Eligibility traces over a state-action table

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Table;

/// How a visit changes the visited entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    /// The visited entry is set to 1.0
    #[default]
    Replacing,
    /// The visited entry grows by 1.0, without saturation
    Accumulating,
}

impl FromStr for TraceKind {
    type Err = crate::RLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replacing" => Ok(Self::Replacing),
            "accumulating" => Ok(Self::Accumulating),
            other => Err(crate::RLError::InvalidParameter(format!(
                "unknown trace type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replacing => f.write_str("replacing"),
            Self::Accumulating => f.write_str("accumulating"),
        }
    }
}

/// Decaying visitation record with the shape of a [`Table`].
///
/// The trace never decays on its own: the owner multiplies it by
/// `gamma * lambda` through [`EligibilityTrace::scale`] after every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityTrace {
    kind: TraceKind,
    values: Array2<f64>,
}

impl EligibilityTrace {
    /// Create a zeroed trace
    #[must_use]
    pub fn new(n_states: usize, n_actions: usize, kind: TraceKind) -> Self {
        Self {
            kind,
            values: Array2::zeros((n_states, n_actions)),
        }
    }

    /// Create a zeroed trace matching a table
    #[must_use]
    pub fn for_table(table: &Table, kind: TraceKind) -> Self {
        let (n_states, n_actions) = table.shape();
        Self::new(n_states, n_actions, kind)
    }

    /// Trace variant
    #[must_use]
    pub fn kind(&self) -> TraceKind {
        self.kind
    }

    /// Record a visit of `(state, action)`
    pub fn update(&mut self, state: usize, action: usize) {
        let entry = &mut self.values[[state, action]];
        match self.kind {
            TraceKind::Replacing => *entry = 1.0,
            TraceKind::Accumulating => *entry += 1.0,
        }
    }

    /// Zero every entry
    pub fn reset(&mut self) {
        self.values.fill(0.0);
    }

    /// Multiply every entry by `factor`
    pub fn scale(&mut self, factor: f64) {
        self.values *= factor;
    }

    /// Entry at `(state, action)`
    #[must_use]
    pub fn get(&self, state: usize, action: usize) -> f64 {
        self.values[[state, action]]
    }

    /// Read-only view of the backing array
    #[must_use]
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }
}
