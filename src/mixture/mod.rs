//! Joint spatial / embedding mixture over time-frequency bins.
//!
//! Each bin `(f, t)` carries two views of the same source:
//!
//! - a complex **observation** `y_ft ∈ C^D` (multichannel STFT), modeled by a
//!   complex Angular Central Gaussian per `(f, k)`;
//! - a real **embedding** `e_ft ∈ R^E` (e.g. deep clustering output),
//!   modeled by a von Mises-Fisher component per class `k`.
//!
//! A single categorical weight `π_k` ties them together:
//!
//! ```text
//! p(y, e) = Σₖ πₖ · CACG(y | B_fk) · vMF(e | μ_k, κ_k)
//! ```
//!
//! # EM
//!
//! **M-step** (given affiliations `γ` and saliency `s`):
//! - masked affiliations `m = γ · s`
//! - `π_k = Σ m_fkt / Σ s_ft`
//! - vMF refit on the flattened embeddings with weights `m` as `(K, F·T)`
//! - CACG refit per frequency with weights `m` and the carried quadratic form
//!
//! **E-step**: [`VmfCacgMm::predict`] without the input normalization, also
//! returning the CACG quadratic form for the next M-step.
//!
//! The trainer runs a fixed number of M-steps with no convergence check. The
//! E-step after the final M-step is skipped, so the returned parameters are
//! consistent with the previous iteration's affiliation.
//!
//! # Normalization asymmetry
//!
//! [`VmfCacgMm::predict`] normalizes both inputs. [`VmfCacgMmTrainer::fit`]
//! normalizes only the observation up front; embeddings are normalized
//! inside the vMF fit and evaluation.
//!
//! # Types
//!
//! Observations must be complex and embeddings real. A real observation is
//! rejected at compile time:
//!
//! ```compile_fail
//! use ndarray::Array3;
//! use vmfcacg::VmfCacgMmTrainer;
//!
//! let observation = Array3::<f64>::zeros((2, 3, 2));
//! let embedding = Array3::<f64>::zeros((2, 3, 2));
//! let _ = VmfCacgMmTrainer::new().fit(observation.view(), embedding.view(), None, Some(2), None);
//! ```
//!
//! and so is a complex embedding:
//!
//! ```compile_fail
//! use ndarray::Array3;
//! use num_complex::Complex64;
//! use vmfcacg::VmfCacgMmTrainer;
//!
//! let observation = Array3::<Complex64>::zeros((2, 3, 2));
//! let embedding = Array3::<Complex64>::zeros((2, 3, 2));
//! let _ = VmfCacgMmTrainer::new().fit(observation.view(), embedding.view(), None, Some(2), None);
//! ```
//!
//! The same holds for a fitted model:
//!
//! ```compile_fail
//! use ndarray::Array3;
//! use vmfcacg::VmfCacgMm;
//!
//! fn posterior(model: &VmfCacgMm) {
//!     let observation = Array3::<f64>::zeros((2, 3, 2));
//!     let embedding = Array3::<f64>::zeros((2, 3, 2));
//!     let _ = model.predict(observation.view(), embedding.view());
//! }
//! ```
//!
//! ```compile_fail
//! use ndarray::Array3;
//! use num_complex::Complex64;
//! use vmfcacg::VmfCacgMm;
//!
//! fn posterior(model: &VmfCacgMm) {
//!     let observation = Array3::<Complex64>::zeros((2, 3, 2));
//!     let embedding = Array3::<Complex64>::zeros((2, 3, 2));
//!     let _ = model.predict(observation.view(), embedding.view());
//! }
//! ```
//!
//! # Usage
//!
//! ```rust
//! use ndarray::Array3;
//! use num_complex::Complex64;
//! use vmfcacg::VmfCacgMmTrainer;
//!
//! let observation = Array3::from_shape_fn((2, 4, 2), |(f, t, d)| {
//!     Complex64::new(1.0 + (f + d) as f64, (t % 2) as f64)
//! });
//! let embedding =
//!     Array3::from_shape_fn((2, 4, 3), |(_, t, e)| if t % 2 == e { 1.0 } else { 0.1 });
//!
//! let model = VmfCacgMmTrainer::new()
//!     .with_iterations(5)
//!     .with_seed(0)
//!     .fit(observation.view(), embedding.view(), None, Some(2), None)
//!     .unwrap();
//!
//! let affiliation = model.predict(observation.view(), embedding.view()).unwrap();
//! assert_eq!(affiliation.dim(), (2, 2, 4));
//! ```

mod model;
mod trainer;

pub use model::VmfCacgMm;
pub use trainer::{CovarianceType, VmfCacgMmTrainer};
