//! # vmfcacg
//!
//! von Mises-Fisher / complex Angular Central Gaussian mixture model for
//! clustering time-frequency bins by source, combining multichannel spatial
//! cues with learned embeddings.
//!
//! - [`mixture`]: the joint model ([`VmfCacgMm`]) and its EM trainer
//!   ([`VmfCacgMmTrainer`]).
//! - [`distribution`]: the two component families and the traits the mixture
//!   uses to talk to them.
//!
//! Enable the `parallel` feature to run the per-frequency spatial fits on
//! rayon.

pub mod distribution;
/// Error types used across `vmfcacg`.
pub mod error;
pub mod mixture;
pub mod normalize;


pub use distribution::{
    ComplexAngularCentralGaussian, ComplexAngularCentralGaussianTrainer, EmbeddingDensity,
    EmbeddingFit, SpatialDensity, SpatialFit, SpatialFitOptions, VonMisesFisher,
    VonMisesFisherTrainer,
};
pub use error::{Error, Result};
pub use mixture::{CovarianceType, VmfCacgMm, VmfCacgMmTrainer};
