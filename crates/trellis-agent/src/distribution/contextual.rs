//! Gaussian whose mean is linear in a context vector

use nalgebra::Cholesky;
use ndarray::{concatenate, s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use trellis_core::{Distribution, RLError};

use super::{check_len, from_dmatrix, sample_weights, standard_normal, to_dmatrix, LN_2PI};

/// `N(A · [c; 1], diag(std²))` for a context `c`.
///
/// `A` has shape `(dim, context_dim + 1)`; the flat parameters are `A` in
/// row-major order followed by `std`. Fitting solves a weighted ridge
/// regression of the samples on their contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearContextualGaussian {
    a: Array2<f64>,
    std: Array1<f64>,
    ridge: f64,
    min_std: Option<f64>,
}

impl LinearContextualGaussian {
    /// Zero-mean map with the given per-component standard deviations
    #[must_use]
    pub fn new(context_dim: usize, std: Array1<f64>) -> Self {
        Self {
            a: Array2::zeros((std.len(), context_dim + 1)),
            std,
            ridge: 1e-6,
            min_std: None,
        }
    }

    /// Ridge coefficient of the regression (default `1e-6`)
    #[must_use]
    pub fn with_ridge(mut self, ridge: f64) -> Self {
        self.ridge = ridge;
        self
    }

    /// Clamp every fitted standard deviation to at least `min_std`
    #[must_use]
    pub fn with_min_std(mut self, min_std: f64) -> Self {
        self.min_std = Some(min_std);
        self
    }

    /// Context length
    #[must_use]
    pub fn context_dim(&self) -> usize {
        self.a.ncols() - 1
    }

    /// Mean map `A`
    #[must_use]
    pub fn mean_map(&self) -> &Array2<f64> {
        &self.a
    }

    /// Per-component standard deviations
    #[must_use]
    pub fn std(&self) -> &Array1<f64> {
        &self.std
    }

    fn features(&self, context: Option<ArrayView1<'_, f64>>) -> trellis_core::Result<Array1<f64>> {
        let context = context.ok_or(RLError::MissingContext)?;
        check_len(self.context_dim(), context.len())?;
        let mut x = Array1::ones(context.len() + 1);
        x.slice_mut(s![..context.len()]).assign(&context);
        Ok(x)
    }
}

impl Distribution for LinearContextualGaussian {
    fn dim(&self) -> usize {
        self.std.len()
    }

    fn is_contextual(&self) -> bool {
        true
    }

    fn sample(
        &self,
        rng: &mut dyn RngCore,
        context: Option<ArrayView1<'_, f64>>,
    ) -> trellis_core::Result<Array1<f64>> {
        let mean = self.mean(context)?;
        Ok(mean + standard_normal(rng, self.dim()) * &self.std)
    }

    #[allow(clippy::cast_precision_loss)]
    fn log_pdf(
        &self,
        theta: ArrayView1<'_, f64>,
        context: Option<ArrayView1<'_, f64>>,
    ) -> trellis_core::Result<f64> {
        check_len(self.dim(), theta.len())?;
        let mean = self.mean(context)?;
        let z = (&theta - &mean) / &self.std;
        Ok(-0.5 * z.mapv(|v| v * v).sum()
            - self.std.mapv(f64::ln).sum()
            - 0.5 * self.dim() as f64 * LN_2PI)
    }

    fn mean(&self, context: Option<ArrayView1<'_, f64>>) -> trellis_core::Result<Array1<f64>> {
        Ok(self.a.dot(&self.features(context)?))
    }

    fn mle(
        &mut self,
        theta: ArrayView2<'_, f64>,
        weights: Option<ArrayView1<'_, f64>>,
        contexts: Option<ArrayView2<'_, f64>>,
    ) -> trellis_core::Result<()> {
        let contexts = contexts.ok_or(RLError::MissingContext)?;
        let (weights, _sum_d, z) = sample_weights(theta, weights, self.dim())?;
        check_len(theta.nrows(), contexts.nrows())?;
        check_len(self.context_dim(), contexts.ncols())?;

        let n = contexts.nrows();
        let x = concatenate![Axis(1), contexts, Array2::<f64>::ones((n, 1))];
        let weighted_x = &x * &weights.view().insert_axis(Axis(1));

        let k = x.ncols();
        let mut gram = to_dmatrix(&weighted_x.t().dot(&x));
        for i in 0..k {
            gram[(i, i)] += self.ridge;
        }
        let rhs = to_dmatrix(&weighted_x.t().dot(&theta));
        let solution = Cholesky::new(gram)
            .ok_or_else(|| {
                RLError::Computation("context regression is not positive definite".to_string())
            })?
            .solve(&rhs);
        let a = from_dmatrix(&solution.transpose());

        let residual = &theta - &x.dot(&a.t());
        let mut std = (weights.dot(&residual.mapv(|r| r * r)) / z).mapv(f64::sqrt);
        if let Some(min_std) = self.min_std {
            std.mapv_inplace(|v| if v.is_nan() { min_std } else { v.max(min_std) });
        }
        self.a = a;
        self.std = std;
        Ok(())
    }

    fn diff_log(
        &self,
        theta: ArrayView1<'_, f64>,
        context: Option<ArrayView1<'_, f64>>,
    ) -> trellis_core::Result<Array1<f64>> {
        check_len(self.dim(), theta.len())?;
        let x = self.features(context)?;
        let delta = &theta - &self.a.dot(&x);
        let var = self.std.mapv(|s| s * s);
        let scaled = &delta / &var;

        let g_a = scaled
            .view()
            .insert_axis(Axis(1))
            .dot(&x.view().insert_axis(Axis(0)));
        let g_std = delta.mapv(|d| d * d) / (&var * &self.std) - self.std.mapv(f64::recip);

        let mut grad = Vec::with_capacity(self.parameters_size());
        grad.extend(g_a.iter().copied());
        grad.extend(g_std.iter().copied());
        Ok(Array1::from(grad))
    }

    fn parameters(&self) -> Array1<f64> {
        self.a.iter().chain(self.std.iter()).copied().collect()
    }

    fn set_parameters(&mut self, rho: ArrayView1<'_, f64>) -> trellis_core::Result<()> {
        check_len(self.parameters_size(), rho.len())?;
        let n_a = self.a.len();
        let shape = self.a.dim();
        self.a = rho.slice(s![..n_a]).to_owned().into_shape(shape)?;
        self.std.assign(&rho.slice(s![n_a..]));
        Ok(())
    }

    fn parameters_size(&self) -> usize {
        self.a.len() + self.std.len()
    }
}
