//! Distributions over flat policy-parameter vectors

use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::RngCore;

/// Parametric distribution over policy parameters.
///
/// A contextual distribution conditions its moments on a per-episode context
/// vector; `sample`, `log_pdf`, `mean` and `diff_log` then require one and
/// `mle` requires one context row per sample.
pub trait Distribution: Send {
    /// Dimension of the sampled parameter vectors
    fn dim(&self) -> usize;

    /// Whether the moments depend on an external context
    fn is_contextual(&self) -> bool {
        false
    }

    /// Draw one parameter vector
    fn sample(
        &self,
        rng: &mut dyn RngCore,
        context: Option<ArrayView1<'_, f64>>,
    ) -> crate::Result<Array1<f64>>;

    /// Log density of `theta`
    fn log_pdf(
        &self,
        theta: ArrayView1<'_, f64>,
        context: Option<ArrayView1<'_, f64>>,
    ) -> crate::Result<f64>;

    /// Mean parameter vector
    fn mean(&self, context: Option<ArrayView1<'_, f64>>) -> crate::Result<Array1<f64>>;

    /// Weighted maximum-likelihood fit to the rows of `theta`.
    ///
    /// `weights` defaults to uniform. `contexts` holds one row per sample and
    /// is only read by contextual distributions.
    fn mle(
        &mut self,
        theta: ArrayView2<'_, f64>,
        weights: Option<ArrayView1<'_, f64>>,
        contexts: Option<ArrayView2<'_, f64>>,
    ) -> crate::Result<()>;

    /// Gradient of `log_pdf(theta)` with respect to the distribution parameters
    fn diff_log(
        &self,
        theta: ArrayView1<'_, f64>,
        context: Option<ArrayView1<'_, f64>>,
    ) -> crate::Result<Array1<f64>>;

    /// Flat vector of distribution parameters
    fn parameters(&self) -> Array1<f64>;

    /// Overwrite the distribution parameters
    fn set_parameters(&mut self, rho: ArrayView1<'_, f64>) -> crate::Result<()>;

    /// Length of [`Distribution::parameters`]
    fn parameters_size(&self) -> usize;
}

/// Resolve the context argument against a distribution's contextuality.
///
/// Contextual distributions get `Err(MissingContext)` when none is supplied;
/// non-contextual ones ignore whatever is passed.
pub fn require_context<'a>(
    distribution: &dyn Distribution,
    context: Option<ArrayView1<'a, f64>>,
) -> crate::Result<Option<ArrayView1<'a, f64>>> {
    match (distribution.is_contextual(), context) {
        (true, None) => Err(crate::RLError::MissingContext),
        (true, Some(c)) => Ok(Some(c)),
        (false, _) => Ok(None),
    }
}
