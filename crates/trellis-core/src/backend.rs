//! Array representation used for batches of parameter vectors

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Execution backend for parameter batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ArrayBackend {
    /// Contiguous row-major `ndarray` matrices
    #[default]
    Dense,
}

impl ArrayBackend {
    /// Stack equally long vectors into an `[rows, dim]` matrix
    pub fn from_rows(self, rows: &[Array1<f64>], dim: usize) -> crate::Result<Array2<f64>> {
        match self {
            Self::Dense => {
                let mut flat = Vec::with_capacity(rows.len() * dim);
                for row in rows {
                    if row.len() != dim {
                        return Err(crate::RLError::DimensionMismatch {
                            expected: dim,
                            actual: row.len(),
                        });
                    }
                    flat.extend(row.iter().copied());
                }
                Ok(Array2::from_shape_vec((rows.len(), dim), flat)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_from_rows() {
        let rows = vec![arr1(&[1.0, 2.0]), arr1(&[3.0, 4.0])];
        let batch = ArrayBackend::Dense.from_rows(&rows, 2).unwrap();
        assert_eq!(batch, arr2(&[[1.0, 2.0], [3.0, 4.0]]));
    }

    #[test]
    fn test_from_rows_empty_keeps_width() {
        let batch = ArrayBackend::default().from_rows(&[], 3).unwrap();
        assert_eq!(batch.dim(), (0, 3));
    }

    #[test]
    fn test_from_rows_ragged() {
        let rows = vec![arr1(&[1.0, 2.0]), arr1(&[3.0])];
        assert!(ArrayBackend::Dense.from_rows(&rows, 2).is_err());
    }
}
