//! The fitted mixture and its joint posterior.

use crate::distribution::{
    ComplexAngularCentralGaussian, EmbeddingDensity, SpatialDensity, VonMisesFisher,
};
use crate::error::{Error, Result};
use crate::normalize::{unit_norm, unit_norm_complex, TINY};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView3, Axis};
use num_complex::Complex64;

/// Affiliation and quadratic form produced by one E-step.
#[derive(Debug, Clone)]
pub(crate) struct Posterior {
    /// Class posterior, `(F, K, T)`.
    pub(crate) affiliation: Array3<f64>,
    /// Spatial quadratic form, `(F, K, T)`, fed to the next spatial fit.
    pub(crate) quadratic_form: Array3<f64>,
}

/// von Mises-Fisher / complex Angular Central Gaussian mixture.
///
/// Immutable once built: the trainer creates a fresh value per M-step.
///
/// ```text
/// p(k | y_ft, e_ft) ∝ π_k · CACG(y_ft | B_fk) · vMF(e_ft | μ_k, κ_k)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VmfCacgMm<V = VonMisesFisher, C = ComplexAngularCentralGaussian> {
    weight: Array1<f64>,
    vmf: V,
    cacg: C,
}

impl<V: EmbeddingDensity, C: SpatialDensity> VmfCacgMm<V, C> {
    /// Assemble a model from class weights `(K,)` and the two components.
    pub fn new(weight: Array1<f64>, vmf: V, cacg: C) -> Result<Self> {
        let k = weight.len();
        if k == 0 {
            return Err(Error::InvalidParameter {
                name: "weight",
                message: "need at least one class",
            });
        }
        for found in [vmf.num_classes(), cacg.num_classes()] {
            if found != k {
                return Err(Error::DimensionMismatch { expected: k, found });
            }
        }
        Ok(Self { weight, vmf, cacg })
    }

    /// Class weights, `(K,)`.
    pub fn weight(&self) -> ArrayView1<'_, f64> {
        self.weight.view()
    }

    /// Embedding component.
    pub fn vmf(&self) -> &V {
        &self.vmf
    }

    /// Spatial component.
    pub fn cacg(&self) -> &C {
        &self.cacg
    }

    /// Number of classes `K`.
    pub fn num_classes(&self) -> usize {
        self.weight.len()
    }

    /// Class posterior for observations `(F, T, D)` and embeddings `(F, T, E)`.
    ///
    /// Both inputs are normalized to unit length along their last axis first.
    /// The result has shape `(F, K, T)` and sums to one over `K`.
    pub fn predict(
        &self,
        observation: ArrayView3<'_, Complex64>,
        embedding: ArrayView3<'_, f64>,
    ) -> Result<Array3<f64>> {
        let observation = unit_norm_complex(observation);
        let embedding = unit_norm(embedding);
        let posterior = self.joint_posterior(observation.view(), embedding.view())?;
        Ok(posterior.affiliation)
    }

    /// Most probable class per bin, `(F, T)`.
    pub fn predict_labels(
        &self,
        observation: ArrayView3<'_, Complex64>,
        embedding: ArrayView3<'_, f64>,
    ) -> Result<Array2<usize>> {
        let affiliation = self.predict(observation, embedding)?;
        let (f, _, t) = affiliation.dim();
        Ok(Array2::from_shape_fn((f, t), |(fi, ti)| {
            affiliation
                .slice(ndarray::s![fi, .., ti])
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(k, _)| k)
                .unwrap_or(0)
        }))
    }

    /// E-step on already normalized inputs.
    ///
    /// ```text
    /// score_fkt = ln π_k + ln CACG(y_ft | B_fk) + ln vMF(e_ft | μ_k, κ_k)
    /// γ_fkt     = exp(score_fkt - max_k score) / Σ_k exp(score_fkt - max_k score)
    /// ```
    ///
    /// The vMF is evaluated on the flattened batch `n = f·T + t` and its
    /// `(K, F·T)` result is read back into `(F, K, T)`.
    pub(crate) fn joint_posterior(
        &self,
        observation: ArrayView3<'_, Complex64>,
        embedding: ArrayView3<'_, f64>,
    ) -> Result<Posterior> {
        let (f, t, _) = observation.dim();
        let (ef, et, e) = embedding.dim();
        if (ef, et) != (f, t) {
            return Err(Error::ShapeMismatch {
                expected: format!("({f}, {t}, E) embedding"),
                actual: format!("({ef}, {et}, {e}) embedding"),
            });
        }
        let k = self.num_classes();

        let (cacg_log_pdf, quadratic_form) = self.cacg.log_pdf(observation)?;
        let vmf_log_pdf = self.vmf.log_pdf(flatten_bins(embedding).view())?;
        let log_weight = self.weight.mapv(|w| w.max(TINY).ln());

        let mut affiliation = Array3::from_shape_fn((f, k, t), |(fi, ki, ti)| {
            log_weight[ki] + cacg_log_pdf[[fi, ki, ti]] + vmf_log_pdf[[ki, fi * t + ti]]
        });

        for mut bin in affiliation.lanes_mut(Axis(1)) {
            let max = bin.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            bin.mapv_inplace(|v| (v - max).exp());
            let denominator = bin.sum().max(TINY);
            bin.mapv_inplace(|v| v / denominator);
        }

        Ok(Posterior {
            affiliation,
            quadratic_form,
        })
    }
}

/// `(F, T, E) -> (F·T, E)`, row `n = f·T + t`.
pub(crate) fn flatten_bins(embedding: ArrayView3<'_, f64>) -> Array2<f64> {
    let (f, t, e) = embedding.dim();
    Array2::from_shape_fn((f * t, e), |(n, d)| embedding[[n / t, n % t, d]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array4};

    fn model() -> VmfCacgMm {
        let vmf = VonMisesFisher::new(array![[1.0, 0.0], [0.0, 1.0]], array![10.0, 10.0]).unwrap();
        // Same isotropic spatial component for both classes at both frequencies.
        let eigenvectors = Array4::from_shape_fn((2, 2, 2, 2), |(_, _, i, j)| {
            Complex64::new(if i == j { 1.0 } else { 0.0 }, 0.0)
        });
        let eigenvalues = Array3::from_elem((2, 2, 2), 0.5);
        let cacg = ComplexAngularCentralGaussian::new(eigenvectors, eigenvalues).unwrap();
        VmfCacgMm::new(array![0.5, 0.5], vmf, cacg).unwrap()
    }

    #[test]
    fn flatten_is_frequency_major() {
        let embedding = Array3::from_shape_fn((2, 3, 1), |(f, t, _)| (10 * f + t) as f64);
        let flat = flatten_bins(embedding.view());
        assert_eq!(flat.column(0).to_vec(), vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn class_alignment_follows_embedding() {
        // Embedding direction alternates with time and frequency; the
        // spatial term is flat, so the posterior must track the embedding.
        let embedding = Array3::from_shape_fn((2, 3, 2), |(f, t, d)| {
            if (f + t) % 2 == d { 1.0 } else { 0.0 }
        });
        let observation = Array3::from_elem((2, 3, 2), Complex64::new(1.0, 0.0));
        let affiliation = model().predict(observation.view(), embedding.view()).unwrap();

        assert_eq!(affiliation.dim(), (2, 2, 3));
        for f in 0..2 {
            for t in 0..3 {
                let expected = (f + t) % 2;
                assert!(affiliation[[f, expected, t]] > 0.99, "bin ({f}, {t})");
            }
        }
    }

    #[test]
    fn predict_rows_sum_to_one() {
        let embedding = Array3::from_shape_fn((2, 3, 2), |(f, t, d)| (f + 2 * t + d) as f64 - 2.0);
        let observation = Array3::from_shape_fn((2, 3, 2), |(f, t, d)| {
            Complex64::new((f + d) as f64, t as f64 - 1.0)
        });
        let affiliation = model().predict(observation.view(), embedding.view()).unwrap();
        for bin in affiliation.lanes(Axis(1)) {
            assert_abs_diff_eq!(bin.sum(), 1.0, epsilon = 1e-12);
            assert!(bin.iter().all(|&g| g >= 0.0));
        }
    }

    #[test]
    fn predict_labels_is_argmax() {
        let embedding =
            Array3::from_shape_fn((2, 3, 2), |(_, t, d)| if t == d { 1.0 } else { 0.0 });
        let observation = Array3::from_elem((2, 3, 2), Complex64::new(0.0, 1.0));
        let labels = model().predict_labels(observation.view(), embedding.view()).unwrap();
        assert_eq!(labels[[0, 0]], 0);
        assert_eq!(labels[[1, 1]], 1);
    }

    #[test]
    fn rejects_misaligned_embedding() {
        let embedding = Array3::<f64>::ones((2, 4, 2));
        let observation = Array3::from_elem((2, 3, 2), Complex64::new(1.0, 0.0));
        let err = model().predict(observation.view(), embedding.view()).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn rejects_class_count_disagreement() {
        let vmf = VonMisesFisher::new(array![[1.0, 0.0]], array![1.0]).unwrap();
        let cacg = ComplexAngularCentralGaussian::new(
            Array4::zeros((1, 2, 2, 2)),
            Array3::ones((1, 2, 2)),
        )
        .unwrap();
        let err = VmfCacgMm::new(array![0.5, 0.5], vmf, cacg).unwrap_err();
        assert_eq!(err, Error::DimensionMismatch { expected: 2, found: 1 });
    }
}
