//! von Mises-Fisher distribution over real unit vectors.
//!
//! ```text
//! p(y | μ, κ) = c_E(κ)⁻¹ exp(κ μᵀy),   ‖y‖ = ‖μ‖ = 1
//! ```
//!
//! # Weighted fit
//!
//! With per-class weights `w_kn` the resultant `r_k = Σₙ w_kn yₙ` gives the
//! mean direction `r_k / ‖r_k‖`. The concentration uses the closed-form
//! approximation of Banerjee et al. (2005):
//!
//! ```text
//! r̄ = ‖r_k‖ / Σₙ w_kn
//! κ̂ = (r̄E - r̄³) / (1 - r̄²)
//! ```
//!
//! `κ̂` diverges as `r̄ → 1` (all mass on one direction) and vanishes as
//! `r̄ → 0` (empty or perfectly spread class); both ends are clamped to the
//! caller's `[min_concentration, max_concentration]`.
//!
//! # References
//!
//! - Banerjee et al. (2005). "Clustering on the Unit Hypersphere using von
//!   Mises-Fisher Distributions"

use super::special::vmf_log_normalizer;
use super::{EmbeddingDensity, EmbeddingFit};
use crate::error::{Error, Result};
use crate::normalize::{unit_norm, TINY};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Fitted vMF parameters, one component per class.
#[derive(Debug, Clone, PartialEq)]
pub struct VonMisesFisher {
    /// Mean directions, `(K, E)`.
    mean: Array2<f64>,
    /// Concentrations, `(K,)`.
    concentration: Array1<f64>,
}

impl VonMisesFisher {
    /// Build from mean directions `(K, E)` and concentrations `(K,)`.
    ///
    /// Means are used as given; pass unit vectors.
    pub fn new(mean: Array2<f64>, concentration: Array1<f64>) -> Result<Self> {
        if mean.nrows() != concentration.len() {
            return Err(Error::DimensionMismatch {
                expected: mean.nrows(),
                found: concentration.len(),
            });
        }
        if concentration.iter().any(|k| !k.is_finite() || *k < 0.0) {
            return Err(Error::InvalidParameter {
                name: "concentration",
                message: "must be finite and >= 0",
            });
        }
        Ok(Self {
            mean,
            concentration,
        })
    }

    /// Mean directions, `(K, E)`.
    pub fn mean(&self) -> ArrayView2<'_, f64> {
        self.mean.view()
    }

    /// Concentrations, `(K,)`.
    pub fn concentration(&self) -> ArrayView1<'_, f64> {
        self.concentration.view()
    }

    /// `ln c_E(κ_k)` per class.
    pub fn log_norm(&self) -> Array1<f64> {
        let dim = self.mean.ncols();
        self.concentration.mapv(|kappa| vmf_log_normalizer(dim, kappa))
    }
}

impl EmbeddingDensity for VonMisesFisher {
    fn num_classes(&self) -> usize {
        self.mean.nrows()
    }

    fn dimension(&self) -> usize {
        self.mean.ncols()
    }

    /// Samples are re-normalized before evaluation.
    fn log_pdf(&self, samples: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if samples.ncols() != self.dimension() {
            return Err(Error::DimensionMismatch {
                expected: self.dimension(),
                found: samples.ncols(),
            });
        }
        let samples = unit_norm(samples);
        let log_norm = self.log_norm();

        // (K, E) · (E, N) -> (K, N)
        let mut out = self.mean.dot(&samples.t());
        for (mut row, (&kappa, &norm)) in out
            .axis_iter_mut(Axis(0))
            .zip(self.concentration.iter().zip(log_norm.iter()))
        {
            row.mapv_inplace(|cos| kappa * cos - norm);
        }
        Ok(out)
    }
}

/// Weighted vMF fitter (Banerjee approximation).
#[derive(Debug, Clone, Copy, Default)]
pub struct VonMisesFisherTrainer;

impl VonMisesFisherTrainer {
    /// Create a new trainer.
    pub fn new() -> Self {
        Self
    }
}

impl EmbeddingFit for VonMisesFisherTrainer {
    type Model = VonMisesFisher;

    /// Samples are normalized here, so callers may pass raw embeddings.
    fn fit(
        &self,
        samples: ArrayView2<'_, f64>,
        weights: ArrayView2<'_, f64>,
        min_concentration: f64,
        max_concentration: f64,
    ) -> Result<VonMisesFisher> {
        let (n, dim) = samples.dim();
        if n == 0 || dim == 0 {
            return Err(Error::EmptyInput);
        }
        if weights.ncols() != n {
            return Err(Error::ShapeMismatch {
                expected: format!("(K, {n}) weights"),
                actual: format!("{:?} weights", weights.shape()),
            });
        }
        if weights.nrows() == 0 {
            return Err(Error::InvalidParameter {
                name: "weights",
                message: "need at least one class",
            });
        }
        if !(min_concentration.is_finite() && max_concentration.is_finite())
            || min_concentration < 0.0
            || min_concentration > max_concentration
        {
            return Err(Error::InvalidParameter {
                name: "concentration bounds",
                message: "need finite 0 <= min_concentration <= max_concentration",
            });
        }

        let samples = unit_norm(samples);
        let d = dim as f64;

        // (K, N) · (N, E) -> (K, E)
        let mut mean = weights.dot(&samples);
        let mut concentration = Array1::zeros(weights.nrows());

        for (k, (mut direction, kappa)) in mean
            .axis_iter_mut(Axis(0))
            .zip(concentration.iter_mut())
            .enumerate()
        {
            let norm = direction.iter().map(|v| v * v).sum::<f64>().sqrt();
            direction.mapv_inplace(|v| v / norm.max(TINY));

            let mass = weights.row(k).sum().max(TINY);
            let r_bar = (norm / mass).clamp(0.0, 1.0);
            let denominator = 1.0 - r_bar * r_bar;
            let raw = if denominator > 0.0 {
                (r_bar * d - r_bar.powi(3)) / denominator
            } else {
                f64::INFINITY
            };
            *kappa = raw.clamp(min_concentration, max_concentration);

            tracing::trace!(class = k, r_bar, kappa = *kappa, "vmf component");
        }

        Ok(VonMisesFisher {
            mean,
            concentration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn fit_recovers_mean_direction() {
        let samples = array![[1.0, 0.1], [1.0, -0.1], [0.0, 1.0]];
        let weights = array![[1.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let vmf = VonMisesFisherTrainer::new()
            .fit(samples.view(), weights.view(), 1e-10, 500.0)
            .unwrap();

        assert_abs_diff_eq!(vmf.mean()[[0, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(vmf.mean()[[0, 1]], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(vmf.mean()[[1, 1]], 1.0, epsilon = 1e-12);
        // A single direction saturates the concentration.
        assert_abs_diff_eq!(vmf.concentration()[1], 500.0);
        assert!(vmf.concentration()[0] > 1.0 && vmf.concentration()[0] < 500.0);
    }

    #[test]
    fn concentration_respects_bounds() {
        let samples = array![[1.0, 0.0], [-1.0, 0.0], [0.0, 1.0], [1.0, 0.0]];
        let weights = array![[1.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 1.0]];
        let vmf = VonMisesFisherTrainer::new()
            .fit(samples.view(), weights.view(), 2.0, 3.0)
            .unwrap();
        for &kappa in vmf.concentration() {
            assert!((2.0..=3.0).contains(&kappa));
        }
        // Opposite directions cancel: r̄ = 0 -> lower bound.
        assert_abs_diff_eq!(vmf.concentration()[0], 2.0);
    }

    #[test]
    fn empty_class_is_finite() {
        let samples = array![[1.0, 0.0], [0.0, 1.0]];
        let weights = array![[1.0, 1.0], [0.0, 0.0]];
        let vmf = VonMisesFisherTrainer::new()
            .fit(samples.view(), weights.view(), 1e-10, 500.0)
            .unwrap();
        let log_pdf = vmf.log_pdf(samples.view()).unwrap();
        assert!(log_pdf.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn log_pdf_matches_closed_form() {
        // E = 3: p(y) = κ / (4π sinh κ) · exp(κ μᵀy)
        let kappa = 2.0_f64;
        let vmf = VonMisesFisher::new(array![[0.0, 0.0, 1.0]], array![kappa]).unwrap();
        let samples = array![[0.0, 0.0, 5.0], [1.0, 0.0, 0.0]];
        let log_pdf = vmf.log_pdf(samples.view()).unwrap();
        let norm = (4.0 * std::f64::consts::PI * kappa.sinh() / kappa).ln();

        assert_eq!(log_pdf.dim(), (1, 2));
        assert_abs_diff_eq!(log_pdf[[0, 0]], kappa - norm, epsilon = 1e-10);
        assert_abs_diff_eq!(log_pdf[[0, 1]], -norm, epsilon = 1e-10);
    }

    #[test]
    fn rejects_inverted_bounds() {
        let samples = array![[1.0, 0.0]];
        let weights = array![[1.0]];
        let err = VonMisesFisherTrainer::new()
            .fit(samples.view(), weights.view(), 5.0, 1.0)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }
}
