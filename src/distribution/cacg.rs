//! Complex Angular Central Gaussian over complex unit vectors.
//!
//! The CACG is what a zero-mean complex Gaussian with covariance `B` looks
//! like after projecting onto the unit sphere and forgetting the phase:
//!
//! ```text
//! p(y | B) = Γ(D) / (2 π^D det B) · (yᴴ B⁻¹ y)^(-D)
//! ```
//!
//! One `B` is kept per `(frequency, class)`, stored through its Hermitian
//! eigendecomposition `B = U Λ Uᴴ` so that evaluation needs neither an
//! inverse nor a determinant:
//!
//! ```text
//! yᴴ B⁻¹ y = Σ_d |u_dᴴ y|² / λ_d,     ln det B = Σ_d ln λ_d
//! ```
//!
//! # Weighted fit
//!
//! The fixed-point update uses the quadratic form from the previous
//! evaluation:
//!
//! ```text
//! B_fk = D · Σ_t (w_fkt / q_fkt) y_ft y_ftᴴ / Σ_t w_fkt
//! ```
//!
//! followed by the optional stabilizers in [`SpatialFitOptions`].

use super::{SpatialDensity, SpatialFit, SpatialFitOptions};
use crate::error::{Error, Result};
use crate::normalize::TINY;
use faer::{Mat, Side};
use ndarray::{s, Array1, Array2, Array3, Array4, ArrayView2, ArrayView3, ArrayView4, Axis};
use num_complex::Complex64;
use statrs::function::gamma::ln_gamma;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Fitted CACG parameters, one component per `(frequency, class)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexAngularCentralGaussian {
    /// Eigenvectors of `B` as columns, `(F, K, D, D)`.
    eigenvectors: Array4<Complex64>,
    /// Eigenvalues of `B`, `(F, K, D)`.
    eigenvalues: Array3<f64>,
}

impl ComplexAngularCentralGaussian {
    /// Build from eigenvectors `(F, K, D, D)` (columns) and eigenvalues `(F, K, D)`.
    pub fn new(eigenvectors: Array4<Complex64>, eigenvalues: Array3<f64>) -> Result<Self> {
        let (f, k, d, d2) = eigenvectors.dim();
        if d != d2 || eigenvalues.dim() != (f, k, d) {
            return Err(Error::ShapeMismatch {
                expected: format!("({f}, {k}, {d}) eigenvalues for square eigenvectors"),
                actual: format!(
                    "{:?} eigenvalues, {:?} eigenvectors",
                    eigenvalues.shape(),
                    eigenvectors.shape()
                ),
            });
        }
        Ok(Self {
            eigenvectors,
            eigenvalues,
        })
    }

    /// Eigenvectors of every `B_fk`, `(F, K, D, D)`.
    pub fn eigenvectors(&self) -> ArrayView4<'_, Complex64> {
        self.eigenvectors.view()
    }

    /// Eigenvalues of every `B_fk`, `(F, K, D)`.
    pub fn eigenvalues(&self) -> ArrayView3<'_, f64> {
        self.eigenvalues.view()
    }

    /// Reassemble `B_fk = U Λ Uᴴ`, `(F, K, D, D)`.
    pub fn covariance(&self) -> Array4<Complex64> {
        let (f, k, d, _) = self.eigenvectors.dim();
        Array4::from_shape_fn((f, k, d, d), |(fi, ki, i, j)| {
            (0..d)
                .map(|e| {
                    self.eigenvectors[[fi, ki, i, e]]
                        * self.eigenvalues[[fi, ki, e]]
                        * self.eigenvectors[[fi, ki, j, e]].conj()
                })
                .sum()
        })
    }

    /// `(log-density, quadratic form)` at one frequency, both `(K, T)`.
    fn log_pdf_frequency(
        &self,
        frequency: usize,
        samples: ArrayView2<'_, Complex64>,
    ) -> (Array2<f64>, Array2<f64>) {
        let (num_classes, d) = (self.num_classes(), self.channels());
        let frames = samples.nrows();
        let constant = ln_gamma(d as f64)
            - std::f64::consts::LN_2
            - d as f64 * std::f64::consts::PI.ln();

        let mut log_pdf = Array2::zeros((num_classes, frames));
        let mut quadratic_form = Array2::zeros((num_classes, frames));

        for k in 0..num_classes {
            let vectors = self.eigenvectors.slice(s![frequency, k, .., ..]);
            let values = self
                .eigenvalues
                .slice(s![frequency, k, ..])
                .mapv(|l| l.max(TINY));
            let log_det: f64 = values.iter().map(|l| l.ln()).sum();

            for (t, y) in samples.outer_iter().enumerate() {
                let q: f64 = (0..d)
                    .map(|e| {
                        let projection: Complex64 = (0..d)
                            .map(|i| vectors[[i, e]].conj() * y[i])
                            .sum();
                        projection.norm_sqr() / values[e]
                    })
                    .sum();
                let q = q.abs().max(TINY);
                quadratic_form[[k, t]] = q;
                log_pdf[[k, t]] = constant - log_det - d as f64 * q.ln();
            }
        }

        (log_pdf, quadratic_form)
    }
}

impl SpatialDensity for ComplexAngularCentralGaussian {
    fn num_frequencies(&self) -> usize {
        self.eigenvectors.dim().0
    }

    fn num_classes(&self) -> usize {
        self.eigenvectors.dim().1
    }

    fn channels(&self) -> usize {
        self.eigenvectors.dim().2
    }

    /// Samples are used as given; the mixture normalizes them beforehand.
    fn log_pdf(&self, samples: ArrayView3<'_, Complex64>) -> Result<(Array3<f64>, Array3<f64>)> {
        let (f, t, d) = samples.dim();
        if f != self.num_frequencies() || d != self.channels() {
            return Err(Error::ShapeMismatch {
                expected: format!("({}, T, {})", self.num_frequencies(), self.channels()),
                actual: format!("({f}, {t}, {d})"),
            });
        }

        #[cfg(feature = "parallel")]
        let per_frequency: Vec<_> = (0..f)
            .into_par_iter()
            .map(|fi| self.log_pdf_frequency(fi, samples.index_axis(Axis(0), fi)))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let per_frequency: Vec<_> = (0..f)
            .map(|fi| self.log_pdf_frequency(fi, samples.index_axis(Axis(0), fi)))
            .collect();

        let num_classes = self.num_classes();
        let mut log_pdf = Array3::zeros((f, num_classes, t));
        let mut quadratic_form = Array3::zeros((f, num_classes, t));
        for (fi, (lp, q)) in per_frequency.into_iter().enumerate() {
            log_pdf.index_axis_mut(Axis(0), fi).assign(&lp);
            quadratic_form.index_axis_mut(Axis(0), fi).assign(&q);
        }
        Ok((log_pdf, quadratic_form))
    }
}

/// Weighted CACG fitter (one fixed-point step per call).
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexAngularCentralGaussianTrainer;

impl ComplexAngularCentralGaussianTrainer {
    /// Create a new trainer.
    pub fn new() -> Self {
        Self
    }

    /// Fit all classes at one frequency.
    ///
    /// Returns eigenvectors `(K, D, D)`, eigenvalues `(K, D)` and the number
    /// of degenerate classes replaced by the identity.
    fn fit_frequency(
        samples: ArrayView2<'_, Complex64>,
        weights: ArrayView2<'_, f64>,
        quadratic_form: ArrayView2<'_, f64>,
        options: &SpatialFitOptions,
    ) -> Result<(Array3<Complex64>, Array2<f64>, usize)> {
        let d = samples.ncols();
        let num_classes = weights.nrows();
        let mut vectors = Array3::zeros((num_classes, d, d));
        let mut values = Array2::zeros((num_classes, d));
        let mut degenerate = 0;

        for k in 0..num_classes {
            let mass = weights.row(k).sum().max(TINY);
            let mut covariance = Array2::<Complex64>::zeros((d, d));
            for (t, y) in samples.outer_iter().enumerate() {
                let scale = weights[[k, t]] / quadratic_form[[k, t]].max(TINY);
                if scale == 0.0 || y.iter().all(|z| z.norm_sqr() == 0.0) {
                    continue;
                }
                for i in 0..d {
                    for j in 0..d {
                        covariance[[i, j]] += y[i] * y[j].conj() * scale;
                    }
                }
            }
            covariance.mapv_inplace(|z| z * (d as f64 / mass));

            if options.hermitize {
                let adjoint = covariance.t().mapv(|z| z.conj());
                covariance = (&covariance + &adjoint).mapv(|z| z * 0.5);
            }

            let trace: Complex64 = covariance.diag().sum();
            if !(trace.re > TINY) || !trace.is_finite() {
                degenerate += 1;
                let scale = if options.trace_norm { 1.0 / d as f64 } else { 1.0 };
                covariance = Array2::from_diag_elem(d, Complex64::new(scale, 0.0));
            } else if options.trace_norm {
                covariance.mapv_inplace(|z| z / trace);
            }

            let (u, mut lambda) = hermitian_eigen(&covariance)?;
            if options.eigenvalue_floor > 0.0 {
                let largest = lambda.fold(f64::NEG_INFINITY, |m, &l| m.max(l));
                let floor = largest * options.eigenvalue_floor;
                lambda.mapv_inplace(|l| l.max(floor));
            }

            vectors.index_axis_mut(Axis(0), k).assign(&u);
            values.index_axis_mut(Axis(0), k).assign(&lambda);
        }

        Ok((vectors, values, degenerate))
    }
}

impl SpatialFit for ComplexAngularCentralGaussianTrainer {
    type Model = ComplexAngularCentralGaussian;

    fn fit(
        &self,
        samples: ArrayView3<'_, Complex64>,
        weights: ArrayView3<'_, f64>,
        quadratic_form: ArrayView3<'_, f64>,
        options: &SpatialFitOptions,
    ) -> Result<ComplexAngularCentralGaussian> {
        let (f, t, d) = samples.dim();
        let (wf, num_classes, wt) = weights.dim();
        if f * t == 0 || d == 0 {
            return Err(Error::EmptyInput);
        }
        if (wf, wt) != (f, t) || num_classes == 0 {
            return Err(Error::ShapeMismatch {
                expected: format!("({f}, K > 0, {t}) weights"),
                actual: format!("{:?} weights", weights.shape()),
            });
        }
        if quadratic_form.dim() != weights.dim() {
            return Err(Error::ShapeMismatch {
                expected: format!("{:?} quadratic form", weights.shape()),
                actual: format!("{:?} quadratic form", quadratic_form.shape()),
            });
        }

        let fit_one = |fi: usize| {
            Self::fit_frequency(
                samples.index_axis(Axis(0), fi),
                weights.index_axis(Axis(0), fi),
                quadratic_form.index_axis(Axis(0), fi),
                options,
            )
        };

        #[cfg(feature = "parallel")]
        let per_frequency: Vec<_> = (0..f)
            .into_par_iter()
            .map(fit_one)
            .collect::<Result<_>>()?;

        #[cfg(not(feature = "parallel"))]
        let per_frequency: Vec<_> = (0..f).map(fit_one).collect::<Result<_>>()?;

        let mut eigenvectors = Array4::zeros((f, num_classes, d, d));
        let mut eigenvalues = Array3::zeros((f, num_classes, d));
        let mut degenerate = 0;
        for (fi, (u, lambda, n)) in per_frequency.into_iter().enumerate() {
            eigenvectors.index_axis_mut(Axis(0), fi).assign(&u);
            eigenvalues.index_axis_mut(Axis(0), fi).assign(&lambda);
            degenerate += n;
        }
        if degenerate > 0 {
            tracing::warn!(
                degenerate,
                "cacg: classes without weight replaced by identity covariance"
            );
        }

        Ok(ComplexAngularCentralGaussian {
            eigenvectors,
            eigenvalues,
        })
    }
}

/// Eigendecomposition of a Hermitian matrix via faer (lower triangle).
///
/// Eigenvectors are returned as columns.
fn hermitian_eigen(matrix: &Array2<Complex64>) -> Result<(Array2<Complex64>, Array1<f64>)> {
    let d = matrix.nrows();
    let mat = Mat::<Complex64>::from_fn(d, d, |i, j| matrix[[i, j]]);
    let evd = mat
        .self_adjoint_eigen(Side::Lower)
        .map_err(|e| Error::Decomposition(format!("{e:?}")))?;
    let u = evd.U();
    let s = evd.S().column_vector();
    let vectors = Array2::from_shape_fn((d, d), |(i, j)| u[(i, j)]);
    let values = Array1::from_shape_fn(d, |i| s[i].re);
    Ok((vectors, values))
}
