//! Gaussian with independent components

use ndarray::{concatenate, s, Array1, ArrayView1, ArrayView2, Axis};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use trellis_core::{Distribution, RLError};

use super::{check_len, sample_weights, standard_normal, weighted_mean, LN_2PI};

/// `N(mu, diag(std²))`, parameterized as `[mu, std]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianDiagonal {
    mu: Array1<f64>,
    std: Array1<f64>,
    min_std: Option<f64>,
}

impl GaussianDiagonal {
    /// Create a distribution; `mu` and `std` must have the same length
    pub fn new(mu: Array1<f64>, std: Array1<f64>) -> trellis_core::Result<Self> {
        check_len(mu.len(), std.len())?;
        Ok(Self {
            mu,
            std,
            min_std: None,
        })
    }

    /// Clamp every fitted standard deviation to at least `min_std`
    #[must_use]
    pub fn with_min_std(mut self, min_std: f64) -> Self {
        self.min_std = Some(min_std);
        self
    }

    /// Per-component standard deviations
    #[must_use]
    pub fn std(&self) -> &Array1<f64> {
        &self.std
    }
}

impl Distribution for GaussianDiagonal {
    fn dim(&self) -> usize {
        self.mu.len()
    }

    fn sample(
        &self,
        rng: &mut dyn RngCore,
        _context: Option<ArrayView1<'_, f64>>,
    ) -> trellis_core::Result<Array1<f64>> {
        Ok(&self.mu + &(standard_normal(rng, self.dim()) * &self.std))
    }

    #[allow(clippy::cast_precision_loss)]
    fn log_pdf(
        &self,
        theta: ArrayView1<'_, f64>,
        _context: Option<ArrayView1<'_, f64>>,
    ) -> trellis_core::Result<f64> {
        check_len(self.dim(), theta.len())?;
        let z = (&theta - &self.mu) / &self.std;
        Ok(-0.5 * z.mapv(|v| v * v).sum()
            - self.std.mapv(f64::ln).sum()
            - 0.5 * self.dim() as f64 * LN_2PI)
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
        let delta2 = (&theta - &mu).mapv(|v| v * v);
        let mut std = (weights.dot(&delta2) / z).mapv(f64::sqrt);
        if let Some(min_std) = self.min_std {
            std.mapv_inplace(|v| if v.is_nan() { min_std } else { v.max(min_std) });
        }
        self.mu = mu;
        self.std = std;
        Ok(())
    }

    fn diff_log(
        &self,
        theta: ArrayView1<'_, f64>,
        _context: Option<ArrayView1<'_, f64>>,
    ) -> trellis_core::Result<Array1<f64>> {
        check_len(self.dim(), theta.len())?;
        let delta = &theta - &self.mu;
        let var = self.std.mapv(|s| s * s);
        let g_mu = &delta / &var;
        let g_std = delta.mapv(|d| d * d) / (&var * &self.std) - self.std.mapv(f64::recip);
        Ok(concatenate![Axis(0), g_mu, g_std])
    }

    fn parameters(&self) -> Array1<f64> {
        concatenate![Axis(0), self.mu, self.std]
    }

    fn set_parameters(&mut self, rho: ArrayView1<'_, f64>) -> trellis_core::Result<()> {
        let n = self.dim();
        check_len(2 * n, rho.len())?;
        if rho.slice(s![n..]).iter().any(|&v| v <= 0.0) {
            return Err(RLError::InvalidParameter(
                "standard deviations must be positive".to_string(),
            ));
        }
        self.mu.assign(&rho.slice(s![..n]));
        self.std.assign(&rho.slice(s![n..]));
        Ok(())
    }

    fn parameters_size(&self) -> usize {
        2 * self.dim()
    }
}
