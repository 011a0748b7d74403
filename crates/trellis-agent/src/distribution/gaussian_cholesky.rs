//! Full-covariance Gaussian parameterized by its Cholesky factor

use nalgebra::{Cholesky, DMatrix, DVector};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use trellis_core::{Distribution, RLError};

use super::{
    check_len, from_dmatrix, sample_weights, standard_normal, to_dmatrix, weighted_mean, LN_2PI,
};

/// `N(mu, L Lᵀ)` with `L` lower triangular.
///
/// The flat parameters are `mu` followed by the lower triangle of `L` read
/// row by row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianCholesky {
    mu: Array1<f64>,
    chol: Array2<f64>,
}

impl GaussianCholesky {
    /// Create from a mean and a covariance matrix
    pub fn new(mu: Array1<f64>, sigma: &Array2<f64>) -> trellis_core::Result<Self> {
        check_len(mu.len(), sigma.nrows())?;
        check_len(mu.len(), sigma.ncols())?;
        let chol = cholesky(&to_dmatrix(sigma))?;
        Ok(Self { mu, chol })
    }

    /// Lower-triangular factor `L`
    #[must_use]
    pub fn chol(&self) -> &Array2<f64> {
        &self.chol
    }

    /// Covariance `L Lᵀ`
    #[must_use]
    pub fn covariance(&self) -> Array2<f64> {
        self.chol.dot(&self.chol.t())
    }

    /// `L⁻¹ (theta - mu)`
    fn whiten(&self, theta: ArrayView1<'_, f64>) -> trellis_core::Result<DVector<f64>> {
        let delta =
            DVector::from_iterator(self.dim(), theta.iter().zip(&self.mu).map(|(t, m)| t - m));
        to_dmatrix(&self.chol)
            .solve_lower_triangular(&delta)
            .ok_or_else(|| RLError::Computation("Cholesky factor is singular".to_string()))
    }
}

fn cholesky(sigma: &DMatrix<f64>) -> trellis_core::Result<Array2<f64>> {
    Cholesky::new(sigma.clone())
        .map(|c| from_dmatrix(&c.l()))
        .ok_or_else(|| {
            RLError::Computation("covariance is not positive definite".to_string())
        })
}

fn tril_len(n: usize) -> usize {
    n * (n + 1) / 2
}

impl Distribution for GaussianCholesky {
    fn dim(&self) -> usize {
        self.mu.len()
    }

    fn sample(
        &self,
        rng: &mut dyn RngCore,
        _context: Option<ArrayView1<'_, f64>>,
    ) -> trellis_core::Result<Array1<f64>> {
        let z = standard_normal(rng, self.dim());
        Ok(&self.mu + &self.chol.dot(&z))
    }

    #[allow(clippy::cast_precision_loss)]
    fn log_pdf(
        &self,
        theta: ArrayView1<'_, f64>,
        _context: Option<ArrayView1<'_, f64>>,
    ) -> trellis_core::Result<f64> {
        check_len(self.dim(), theta.len())?;
        let w = self.whiten(theta)?;
        let log_det = self.chol.diag().mapv(|d| d.abs().ln()).sum();
        Ok(-0.5 * w.norm_squared() - log_det - 0.5 * self.dim() as f64 * LN_2PI)
    }

    fn mean(&self, _context: Option<ArrayView1<'_, f64>>) -> trellis_core::Result<Array1<f64>> {
        Ok(self.mu.clone())
    }

    fn mle(
        &mut self,
        theta: ArrayView2<'_, f64>,
        weights: Option<ArrayView1<'_, f64>>,
        _contexts: Option<ArrayView2<'_, f64>>,
    ) -> trellis_core::Result<()> {
        let (weights, sum_d, z) = sample_weights(theta, weights, self.dim())?;
        let mu = weighted_mean(theta, &weights, sum_d);
        let delta = &theta - &mu;
        let weighted = &delta * &weights.view().insert_axis(ndarray::Axis(1));
        let sigma = weighted.t().dot(&delta) / z;
        self.chol = cholesky(&to_dmatrix(&sigma))?;
        self.mu = mu;
        Ok(())
    }

    fn diff_log(
        &self,
        theta: ArrayView1<'_, f64>,
        _context: Option<ArrayView1<'_, f64>>,
    ) -> trellis_core::Result<Array1<f64>> {
        check_len(self.dim(), theta.len())?;
        let n = self.dim();
        let l = to_dmatrix(&self.chol);
        let l_inv = l
            .clone()
            .try_inverse()
            .ok_or_else(|| RLError::Computation("Cholesky factor is singular".to_string()))?;
        let sigma_inv = l_inv.transpose() * &l_inv;
        let delta = DVector::from_iterator(n, theta.iter().zip(&self.mu).map(|(t, m)| t - m));

        let g_mu = &sigma_inv * &delta;
        // d log p / d Sigma, mapped through Sigma = L L^T
        let g_sigma = (&g_mu * g_mu.transpose() - &sigma_inv) * 0.5;
        let g_chol = g_sigma * &l * 2.0;

        let mut grad = Vec::with_capacity(self.parameters_size());
        grad.extend(g_mu.iter().copied());
        for i in 0..n {
            for j in 0..=i {
                grad.push(g_chol[(i, j)]);
            }
        }
        Ok(Array1::from(grad))
    }

    fn parameters(&self) -> Array1<f64> {
        let n = self.dim();
        let mut rho = Vec::with_capacity(self.parameters_size());
        rho.extend(self.mu.iter().copied());
        for i in 0..n {
            rho.extend(self.chol.slice(s![i, ..=i]).iter().copied());
        }
        Array1::from(rho)
    }

    fn set_parameters(&mut self, rho: ArrayView1<'_, f64>) -> trellis_core::Result<()> {
        let n = self.dim();
        check_len(self.parameters_size(), rho.len())?;
        self.mu.assign(&rho.slice(s![..n]));
        let mut chol = Array2::zeros((n, n));
        let mut k = n;
        for i in 0..n {
            for j in 0..=i {
                chol[[i, j]] = rho[k];
                k += 1;
            }
        }
        self.chol = chol;
        Ok(())
    }

    fn parameters_size(&self) -> usize {
        let n = self.dim();
        n + tril_len(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2};
    use rand::SeedableRng;

    fn dist() -> GaussianCholesky {
        GaussianCholesky::new(arr1(&[1.0, -1.0]), &arr2(&[[2.0, 0.6], [0.6, 1.0]])).unwrap()
    }

    #[test]
    fn test_factor_reproduces_covariance() {
        let d = dist();
        let cov = d.covariance();
        assert_relative_eq!(cov[[0, 0]], 2.0, epsilon = 1e-12);
        assert_relative_eq!(cov[[0, 1]], 0.6, epsilon = 1e-12);
        assert_relative_eq!(d.chol()[[0, 1]], 0.0);
        assert_eq!(d.parameters_size(), 5);
    }

    #[test]
    fn test_rejects_indefinite_covariance() {
        let result = GaussianCholesky::new(arr1(&[0.0, 0.0]), &arr2(&[[1.0, 2.0], [2.0, 1.0]]));
        assert!(matches!(result, Err(RLError::Computation(_))));
    }

    #[test]
    fn test_parameters_round_trip_through_set() {
        let mut d = dist();
        let rho = d.parameters();
        d.set_parameters(arr1(&[0.0, 0.0, 1.0, 0.0, 1.0]).view()).unwrap();
        assert_eq!(d.covariance(), Array2::<f64>::eye(2));
        d.set_parameters(rho.view()).unwrap();
        assert_relative_eq!(d.covariance()[[1, 0]], 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_factor_diagonal_gives_same_density() {
        let mut d = GaussianCholesky::new(arr1(&[0.0]), &arr2(&[[1.0]])).unwrap();
        let expected = d.log_pdf(arr1(&[0.5]).view(), None).unwrap();
        assert_relative_eq!(expected, -1.043_938_533_204_672_7, epsilon = 1e-12);

        d.set_parameters(arr1(&[0.0, -1.0]).view()).unwrap();
        let flipped = d.log_pdf(arr1(&[0.5]).view(), None).unwrap();
        assert_relative_eq!(flipped, expected, epsilon = 1e-12);

        // negating the first column of L leaves L L^T unchanged
        let mut d = dist();
        let theta = arr1(&[0.3, 0.2]);
        let expected = d.log_pdf(theta.view(), None).unwrap();
        let mut rho = d.parameters();
        rho[2] = -rho[2];
        rho[3] = -rho[3];
        d.set_parameters(rho.view()).unwrap();
        assert_relative_eq!(d.covariance()[[0, 1]], 0.6, epsilon = 1e-12);
        assert_relative_eq!(d.log_pdf(theta.view(), None).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_diff_log_matches_finite_difference() {
        let mut d = dist();
        let theta = arr1(&[0.3, 0.2]);
        let grad = d.diff_log(theta.view(), None).unwrap();
        let rho = d.parameters();
        let h = 1e-6;
        for i in 0..rho.len() {
            let mut plus = rho.clone();
            plus[i] += h;
            d.set_parameters(plus.view()).unwrap();
            let up = d.log_pdf(theta.view(), None).unwrap();
            let mut minus = rho.clone();
            minus[i] -= h;
            d.set_parameters(minus.view()).unwrap();
            let down = d.log_pdf(theta.view(), None).unwrap();
            assert_relative_eq!(grad[i], (up - down) / (2.0 * h), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_mle_recovers_correlation() {
        let source = dist();
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let rows: Vec<Array1<f64>> = (0..5000)
            .map(|_| source.sample(&mut rng, None).unwrap())
            .collect();
        let batch = trellis_core::ArrayBackend::Dense.from_rows(&rows, 2).unwrap();

        let mut fitted = GaussianCholesky::new(Array1::zeros(2), &Array2::eye(2)).unwrap();
        fitted.mle(batch.view(), None, None).unwrap();
        let cov = fitted.covariance();
        assert_relative_eq!(fitted.mean(None).unwrap()[0], 1.0, epsilon = 0.1);
        assert_relative_eq!(cov[[0, 0]], 2.0, epsilon = 0.15);
        assert_relative_eq!(cov[[0, 1]], 0.6, epsilon = 0.1);
    }
}
