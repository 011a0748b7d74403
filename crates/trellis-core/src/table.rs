//! Dense state-action value storage

use ndarray::{Array2, ArrayView1, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

use crate::MdpInfo;

/// Dense table indexed by `(state, action)`.
///
/// The shape is fixed at construction. Indexing outside of it panics; state
/// and action discretization is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    values: Array2<f64>,
}

impl Table {
    /// Create a zero-filled table
    #[must_use]
    pub fn new(n_states: usize, n_actions: usize) -> Self {
        Self::with_initial_value(n_states, n_actions, 0.0)
    }

    /// Create a table filled with `value`
    #[must_use]
    pub fn with_initial_value(n_states: usize, n_actions: usize, value: f64) -> Self {
        Self {
            values: Array2::from_elem((n_states, n_actions), value),
        }
    }

    /// Create a zero-filled table sized for a finite MDP
    pub fn from_mdp(info: &MdpInfo) -> crate::Result<Self> {
        let (n_states, n_actions) = info.table_shape()?;
        Ok(Self::new(n_states, n_actions))
    }

    /// `(n_states, n_actions)`
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Number of states
    #[must_use]
    pub fn n_states(&self) -> usize {
        self.values.nrows()
    }

    /// Number of actions
    #[must_use]
    pub fn n_actions(&self) -> usize {
        self.values.ncols()
    }

    /// Value stored at `(state, action)`
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    #[must_use]
    pub fn get(&self, state: usize, action: usize) -> f64 {
        self.values[[state, action]]
    }

    /// Overwrite the value at `(state, action)`
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn set(&mut self, state: usize, action: usize, value: f64) {
        self.values[[state, action]] = value;
    }

    /// All action values of one state
    #[must_use]
    pub fn row(&self, state: usize) -> ArrayView1<'_, f64> {
        self.values.row(state)
    }

    /// Largest action value of a state
    #[must_use]
    pub fn max(&self, state: usize) -> f64 {
        self.row(state).fold(f64::NEG_INFINITY, |acc, &v| acc.max(v))
    }

    /// Every action attaining the largest value of a state
    #[must_use]
    pub fn argmax(&self, state: usize) -> Vec<usize> {
        let best = self.max(state);
        self.row(state)
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == best)
            .map(|(a, _)| a)
            .collect()
    }

    /// `self += alpha * other`, element-wise over the whole table
    ///
    /// # Panics
    ///
    /// Panics if `other` does not have the table's shape.
    pub fn scaled_add(&mut self, alpha: f64, other: &ArrayView2<'_, f64>) {
        Zip::from(&mut self.values)
            .and(other)
            .for_each(|q, &e| *q += alpha * e);
    }

    /// Read-only view of the backing array
    #[must_use]
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Mutable access to the backing array
    pub fn values_mut(&mut self) -> &mut Array2<f64> {
        &mut self.values
    }
}
