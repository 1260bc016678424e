//! Single-family directional distributions and their weighted fitters.
//!
//! The mixture couples two families through a shared class variable:
//!
//! | Family | Observation | Support | Parameters |
//! |--------|-------------|---------|------------|
//! | [`VonMisesFisher`] | embedding `(N, E)` | real unit sphere | mean `(K, E)`, concentration `(K,)` |
//! | [`ComplexAngularCentralGaussian`] | spatial `(F, T, D)` | complex unit sphere mod phase | `B` per `(F, K)` |
//!
//! The mixture only sees them through the four traits below, so either side
//! can be swapped for another family with the same shapes.
//!
//! ## Shape contracts
//!
//! ```text
//! EmbeddingFit::fit      samples (N, E), weights (K, N)           -> model
//! EmbeddingDensity       samples (N, E)                           -> log-density (K, N)
//! SpatialFit::fit        samples (F, T, D), weights (F, K, T),
//!                        quadratic form (F, K, T)                 -> model
//! SpatialDensity         samples (F, T, D)                        -> (log-density, quadratic form), both (F, K, T)
//! ```
//!
//! Spatial samples are broadcast over the class axis by the implementation.

mod cacg;
pub mod special;
mod vmf;

pub use cacg::{ComplexAngularCentralGaussian, ComplexAngularCentralGaussianTrainer};
pub use vmf::{VonMisesFisher, VonMisesFisherTrainer};

use crate::error::Result;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use num_complex::Complex64;

/// Numeric stabilizers applied to every spatial covariance estimate.
///
/// They are passed through the mixture trainer untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialFitOptions {
    /// Replace `B` by `(B + Bᴴ) / 2` before decomposing.
    pub hermitize: bool,
    /// Scale `B` to unit trace.
    pub trace_norm: bool,
    /// Relative floor: eigenvalues below `eigenvalue_floor · λ_max` are raised
    /// to it. Non-positive disables flooring.
    pub eigenvalue_floor: f64,
}

impl Default for SpatialFitOptions {
    fn default() -> Self {
        Self {
            hermitize: true,
            trace_norm: true,
            eigenvalue_floor: 1e-10,
        }
    }
}

/// A fitted family over real embedding directions, one component per class.
pub trait EmbeddingDensity {
    /// Number of classes `K`.
    fn num_classes(&self) -> usize;

    /// Embedding dimension `E`.
    fn dimension(&self) -> usize;

    /// Log-density of every sample under every class, shape `(K, N)`.
    fn log_pdf(&self, samples: ArrayView2<'_, f64>) -> Result<Array2<f64>>;
}

/// Weighted single-pass fitter for an [`EmbeddingDensity`].
pub trait EmbeddingFit {
    /// The fitted model.
    type Model: EmbeddingDensity;

    /// Fit `K` components from samples `(N, E)` and per-class weights `(K, N)`,
    /// keeping concentrations within `[min_concentration, max_concentration]`.
    fn fit(
        &self,
        samples: ArrayView2<'_, f64>,
        weights: ArrayView2<'_, f64>,
        min_concentration: f64,
        max_concentration: f64,
    ) -> Result<Self::Model>;
}

/// A fitted family over complex spatial directions, one component per
/// `(frequency, class)` pair.
pub trait SpatialDensity {
    /// Number of frequencies `F`.
    fn num_frequencies(&self) -> usize;

    /// Number of classes `K`.
    fn num_classes(&self) -> usize;

    /// Channel count `D`.
    fn channels(&self) -> usize;

    /// Log-density and quadratic form for samples `(F, T, D)`, both `(F, K, T)`.
    fn log_pdf(&self, samples: ArrayView3<'_, Complex64>) -> Result<(Array3<f64>, Array3<f64>)>;
}

/// Weighted single-pass fitter for a [`SpatialDensity`].
pub trait SpatialFit {
    /// The fitted model.
    type Model: SpatialDensity;

    /// Fit one component per `(F, K)` from samples `(F, T, D)`, weights
    /// `(F, K, T)` and the quadratic form carried over from the last
    /// evaluation.
    fn fit(
        &self,
        samples: ArrayView3<'_, Complex64>,
        weights: ArrayView3<'_, f64>,
        quadratic_form: ArrayView3<'_, f64>,
        options: &SpatialFitOptions,
    ) -> Result<Self::Model>;
}
