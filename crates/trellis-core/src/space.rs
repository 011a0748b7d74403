//! State and action representations and their spaces

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for states an agent can observe
pub trait State: Clone + Debug + Send + Sync {
    /// Get a feature representation of the state
    ///
    /// Contextual distributions use these features as their context vector.
    fn features(&self) -> Array1<f64>;
}

/// Trait for actions an agent can emit
pub trait Action: Clone + Debug + Send + Sync {
    /// Convert action to a vector representation
    fn to_vec(&self) -> Vec<f64>;
}

/// Discretized states are plain indices.
impl State for usize {
    #[allow(clippy::cast_precision_loss)]
    fn features(&self) -> Array1<f64> {
        Array1::from_elem(1, *self as f64)
    }
}

impl State for Array1<f64> {
    fn features(&self) -> Array1<f64> {
        self.clone()
    }
}

impl Action for usize {
    #[allow(clippy::cast_precision_loss)]
    fn to_vec(&self) -> Vec<f64> {
        vec![*self as f64]
    }
}

impl Action for Array1<f64> {
    fn to_vec(&self) -> Vec<f64> {
        self.to_vec()
    }
}

/// Finite space of `n` indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscreteSpace {
    /// Number of elements
    pub n: usize,
}

impl DiscreteSpace {
    /// Create a new discrete space
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// Check if an index lies in this space
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        index < self.n
    }
}

/// Continuous bounded space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    /// Lower bounds for each dimension
    pub low: Vec<f64>,
    /// Upper bounds for each dimension
    pub high: Vec<f64>,
}

impl BoxSpace {
    /// Create a new box space
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> crate::Result<Self> {
        if low.len() != high.len() {
            return Err(crate::RLError::DimensionMismatch {
                expected: low.len(),
                actual: high.len(),
            });
        }
        Ok(Self { low, high })
    }

    /// Dimensionality of the space
    #[must_use]
    pub fn dim(&self) -> usize {
        self.low.len()
    }

    /// Check if a vector lies within the bounds
    #[must_use]
    pub fn contains(&self, x: &Array1<f64>) -> bool {
        x.len() == self.low.len()
            && x.iter()
                .zip(&self.low)
                .zip(&self.high)
                .all(|((x, l), h)| x >= l && x <= h)
    }
}

/// Either kind of space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Space {
    /// Finite index space
    Discrete(DiscreteSpace),
    /// Continuous box
    Box(BoxSpace),
}

impl Space {
    /// Cardinality of a discrete space, `None` for a box
    #[must_use]
    pub fn size(&self) -> Option<usize> {
        match self {
            Self::Discrete(space) => Some(space.n),
            Self::Box(_) => None,
        }
    }

    /// Length of the vectors living in this space
    #[must_use]
    pub fn dim(&self) -> usize {
        match self {
            Self::Discrete(_) => 1,
            Self::Box(space) => space.dim(),
        }
    }
}

/// Static description of a decision process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MdpInfo {
    /// State space
    pub state_space: Space,
    /// Action space
    pub action_space: Space,
    /// Discount factor
    pub gamma: f64,
    /// Maximum number of steps per episode
    pub horizon: usize,
}

impl MdpInfo {
    /// Create a new description
    #[must_use]
    pub fn new(state_space: Space, action_space: Space, gamma: f64, horizon: usize) -> Self {
        Self {
            state_space,
            action_space,
            gamma,
            horizon,
        }
    }

    /// Shorthand for a finite MDP
    #[must_use]
    pub fn discrete(n_states: usize, n_actions: usize, gamma: f64, horizon: usize) -> Self {
        Self::new(
            Space::Discrete(DiscreteSpace::new(n_states)),
            Space::Discrete(DiscreteSpace::new(n_actions)),
            gamma,
            horizon,
        )
    }

    /// `(n_states, n_actions)` when both spaces are finite
    pub fn table_shape(&self) -> crate::Result<(usize, usize)> {
        match (self.state_space.size(), self.action_space.size()) {
            (Some(n_states), Some(n_actions)) => Ok((n_states, n_actions)),
            _ => Err(crate::RLError::InvalidParameter(
                "tabular storage needs discrete state and action spaces".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_box_space_bounds() {
        let space = BoxSpace::new(vec![-1.0, 0.0], vec![1.0, 2.0]).unwrap();
        assert!(space.contains(&arr1(&[0.5, 1.5])));
        assert!(!space.contains(&arr1(&[0.5, 2.5])));
        assert!(!space.contains(&arr1(&[0.5])));
        assert!(BoxSpace::new(vec![0.0], vec![]).is_err());
    }

    #[test]
    fn test_table_shape_requires_discrete_spaces() {
        let info = MdpInfo::discrete(5, 3, 0.9, 100);
        assert_eq!(info.table_shape().unwrap(), (5, 3));

        let continuous = MdpInfo::new(
            Space::Box(BoxSpace::new(vec![0.0], vec![1.0]).unwrap()),
            Space::Discrete(DiscreteSpace::new(2)),
            0.99,
            10,
        );
        assert!(continuous.table_shape().is_err());
    }
}
