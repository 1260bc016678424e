//! EM trainer for [`VmfCacgMm`].

use super::model::{flatten_bins, VmfCacgMm};
use crate::distribution::{
    ComplexAngularCentralGaussianTrainer, EmbeddingFit, SpatialFit, SpatialFitOptions,
    VonMisesFisherTrainer,
};
use crate::error::{Error, Result};
use crate::normalize::{unit_norm_complex, TINY};
use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};
use num_complex::Complex64;
use rand::prelude::*;
use rand_distr::Uniform;

/// Covariance structure requested for the spatial component.
///
/// Accepted for interface compatibility; the CACG always estimates a full
/// Hermitian matrix per `(frequency, class)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CovarianceType {
    /// Full Hermitian matrix.
    Full,
    /// Diagonal matrix.
    Diagonal,
    /// Scaled identity.
    #[default]
    Spherical,
}

/// EM trainer for the vMF / CACG mixture.
///
/// Every iteration runs an M-step (class weights, then one weighted fit per
/// component) followed by an E-step with the new model, except after the
/// last M-step: that model is returned as is.
#[derive(Debug, Clone)]
pub struct VmfCacgMmTrainer<VF = VonMisesFisherTrainer, CF = ComplexAngularCentralGaussianTrainer> {
    vmf_trainer: VF,
    cacg_trainer: CF,
    /// Number of M-steps.
    iterations: usize,
    min_concentration: f64,
    max_concentration: f64,
    spatial: SpatialFitOptions,
    covariance_type: CovarianceType,
    /// Seed for the random initial affiliation.
    seed: Option<u64>,
}

impl VmfCacgMmTrainer {
    /// Create a trainer with the default vMF and CACG fitters.
    pub fn new() -> Self {
        Self::with_fitters(VonMisesFisherTrainer, ComplexAngularCentralGaussianTrainer)
    }
}

impl Default for VmfCacgMmTrainer {
    fn default() -> Self {
        Self::new()
    }
}

impl<VF, CF> VmfCacgMmTrainer<VF, CF> {
    /// Create a trainer around custom component fitters.
    pub fn with_fitters(vmf_trainer: VF, cacg_trainer: CF) -> Self {
        Self {
            vmf_trainer,
            cacg_trainer,
            iterations: 100,
            min_concentration: 1e-10,
            max_concentration: 500.0,
            spatial: SpatialFitOptions::default(),
            covariance_type: CovarianceType::default(),
            seed: None,
        }
    }

    /// Set the number of EM iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Bound the vMF concentration to `[min, max]`.
    pub fn with_concentration_bounds(mut self, min: f64, max: f64) -> Self {
        self.min_concentration = min;
        self.max_concentration = max;
        self
    }

    /// Toggle Hermitization of the spatial covariance.
    pub fn with_hermitize(mut self, hermitize: bool) -> Self {
        self.spatial.hermitize = hermitize;
        self
    }

    /// Toggle trace normalization of the spatial covariance.
    pub fn with_trace_norm(mut self, trace_norm: bool) -> Self {
        self.spatial.trace_norm = trace_norm;
        self
    }

    /// Set the relative eigenvalue floor of the spatial covariance.
    pub fn with_eigenvalue_floor(mut self, floor: f64) -> Self {
        self.spatial.eigenvalue_floor = floor;
        self
    }

    /// Set the requested covariance type.
    pub fn with_covariance_type(mut self, covariance_type: CovarianceType) -> Self {
        self.covariance_type = covariance_type;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of EM iterations.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Requested covariance type.
    pub fn covariance_type(&self) -> CovarianceType {
        self.covariance_type
    }

    /// Stabilizers handed to the spatial fitter.
    pub fn spatial_options(&self) -> &SpatialFitOptions {
        &self.spatial
    }
}

impl<VF: EmbeddingFit, CF: SpatialFit> VmfCacgMmTrainer<VF, CF> {
    /// Fit the mixture.
    ///
    /// - `observation`: `(F, T, D)`, normalized here once.
    /// - `embedding`: `(F, T, E)`, passed on as is; the embedding fitter
    ///   normalizes it.
    /// - `initialization`: affiliation `(F, K, T)`, or
    /// - `num_classes`: draw a uniform random affiliation with `K` classes.
    ///   Exactly one of the two must be given.
    /// - `saliency`: non-negative importance per bin `(F, T)`, all ones if `None`.
    pub fn fit(
        &self,
        observation: ArrayView3<'_, Complex64>,
        embedding: ArrayView3<'_, f64>,
        initialization: Option<ArrayView3<'_, f64>>,
        num_classes: Option<usize>,
        saliency: Option<ArrayView2<'_, f64>>,
    ) -> Result<VmfCacgMm<VF::Model, CF::Model>> {
        if self.iterations == 0 {
            return Err(Error::InvalidParameter {
                name: "iterations",
                message: "must be > 0",
            });
        }

        let (f, t, _) = observation.dim();
        let (ef, et, e) = embedding.dim();
        if f * t == 0 {
            return Err(Error::EmptyInput);
        }
        if (ef, et) != (f, t) {
            return Err(Error::ShapeMismatch {
                expected: format!("({f}, {t}, E) embedding"),
                actual: format!("({ef}, {et}, {e}) embedding"),
            });
        }

        let saliency = match saliency {
            Some(s) => {
                if s.dim() != (f, t) {
                    return Err(Error::ShapeMismatch {
                        expected: format!("({f}, {t}) saliency"),
                        actual: format!("{:?} saliency", s.shape()),
                    });
                }
                if s.iter().any(|v| !(*v >= 0.0)) {
                    return Err(Error::InvalidParameter {
                        name: "saliency",
                        message: "must be >= 0",
                    });
                }
                s.to_owned()
            }
            None => Array2::ones((f, t)),
        };

        let affiliation = match (initialization, num_classes) {
            (Some(init), None) => {
                let (i_f, k, i_t) = init.dim();
                if (i_f, i_t) != (f, t) || k == 0 {
                    return Err(Error::ShapeMismatch {
                        expected: format!("({f}, K > 0, {t}) initialization"),
                        actual: format!("{:?} initialization", init.shape()),
                    });
                }
                init.to_owned()
            }
            (None, Some(k)) => self.random_affiliation(f, k, t)?,
            (init, k) => {
                return Err(Error::AmbiguousInitialization {
                    initialization: init.is_some(),
                    num_classes: k.is_some(),
                })
            }
        };

        let observation = unit_norm_complex(observation);
        let quadratic_form = Array3::ones(affiliation.raw_dim());

        tracing::debug!(
            frequencies = f,
            frames = t,
            classes = affiliation.dim().1,
            iterations = self.iterations,
            covariance_type = ?self.covariance_type,
            "fitting vmf/cacg mixture"
        );

        let mut model = self.m_step(
            observation.view(),
            embedding,
            quadratic_form.view(),
            affiliation.view(),
            saliency.view(),
        )?;
        for iteration in 1..self.iterations {
            let posterior = model.joint_posterior(observation.view(), embedding)?;
            model = self.m_step(
                observation.view(),
                embedding,
                posterior.quadratic_form.view(),
                posterior.affiliation.view(),
                saliency.view(),
            )?;
            tracing::debug!(iteration, weight = ?model.weight(), "em iteration");
        }

        Ok(model)
    }

    /// Re-estimate weights and both components from saliency-masked affiliations.
    ///
    /// ```text
    /// m_fkt = γ_fkt · s_ft
    /// π_k   = Σ_ft m_fkt / Σ_ft s_ft
    /// ```
    ///
    /// An all-zero saliency carries no evidence; the weights fall back to `1/K`.
    fn m_step(
        &self,
        observation: ArrayView3<'_, Complex64>,
        embedding: ArrayView3<'_, f64>,
        quadratic_form: ArrayView3<'_, f64>,
        affiliation: ArrayView3<'_, f64>,
        saliency: ArrayView2<'_, f64>,
    ) -> Result<VmfCacgMm<VF::Model, CF::Model>> {
        let (f, k, t) = affiliation.dim();

        let masked = &affiliation * &saliency.insert_axis(Axis(1));
        let total = saliency.sum();
        let weight = if total > 0.0 {
            masked.sum_axis(Axis(2)).sum_axis(Axis(0)) / total
        } else {
            Array1::from_elem(k, 1.0 / k as f64)
        };

        // (F, K, T) -> (K, F·T), column n = f·T + t as in `flatten_bins`.
        let class_weights =
            Array2::from_shape_fn((k, f * t), |(ki, n)| masked[[n / t, ki, n % t]]);
        let vmf = self.vmf_trainer.fit(
            flatten_bins(embedding).view(),
            class_weights.view(),
            self.min_concentration,
            self.max_concentration,
        )?;
        let cacg = self
            .cacg_trainer
            .fit(observation, masked.view(), quadratic_form, &self.spatial)?;

        VmfCacgMm::new(weight, vmf, cacg)
    }

    fn random_affiliation(&self, f: usize, k: usize, t: usize) -> Result<Array3<f64>> {
        if k == 0 {
            return Err(Error::InvalidParameter {
                name: "num_classes",
                message: "must be > 0",
            });
        }

        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };
        let uniform = Uniform::new(0.0_f64, 1.0).map_err(|_| Error::InvalidParameter {
            name: "initialization",
            message: "invalid uniform range",
        })?;

        let mut affiliation = Array3::from_shape_fn((f, k, t), |_| uniform.sample(&mut rng));
        for mut bin in affiliation.lanes_mut(Axis(1)) {
            let sum = bin.sum().max(TINY);
            bin.mapv_inplace(|v| v / sum);
        }
        Ok(affiliation)
    }
}
