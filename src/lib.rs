#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Marginal stochastic models for generative causal modelling: fit a model to
//! observed samples of one variable, then draw new samples from it. Three
//! representations are offered, from a single named distribution family
//! chosen automatically by divergence, through resampling of the raw data, to
//! a Bayesian Gaussian mixture whose component count is picked by silhouette
//! search.
//!
//! # Getting Started
//!
//! Let the library pick a distribution family for the data:
//!
//! ```
//! use stochastic_models::prelude::*;
//!
//! let data: Vec<f64> = (0..200).map(|i| f64::from(i) / 20.0).collect();
//!
//! let mut model = ParametricDistribution::builder()
//!     .divergence_threshold(0.05)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//! model.fit(&samples::from_column(&data)).unwrap();
//!
//! println!("selected {}", model);
//! let new_samples = model.draw_samples(10).unwrap();
//! assert_eq!(new_samples.nrows(), 10);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`StochasticModel`] | Fit / draw / clone lifecycle shared by every model. |
//! | [`ParametricDistribution`] | One catalog family, pinned or selected automatically, with fitted or fixed parameters. |
//! | [`EmpiricalDistribution`] | Stores the observed rows and resamples them with replacement. |
//! | [`GaussianMixtureDistribution`] | Variational Gaussian mixture with automatic component count. |
//! | [`Family`] | A named continuous or discrete distribution family from the [`catalog`]. |
//! | [`ParameterSet`] | Ordered `name → value` parameters of a fitted family. |
//! | [`DivergenceEstimator`](divergence::DivergenceEstimator) | Scores how far fitted samples are from the observed data. |
//!
//! # Selection Pipeline
//!
//! | Stage | Where | What happens |
//! |-------|-------|--------------|
//! | Catalog | [`catalog`] | Continuous families in a fixed order, common families first. |
//! | Fit | [`family`] | Closed-form or Nelder–Mead maximum-likelihood estimates per family. |
//! | Score | [`divergence`] | k-nearest-neighbour KL estimate between generated and observed samples. |
//! | Choose | [`selection`] | Lowest divergence wins; early exit below the threshold. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on [`ParameterSet`], configuration types and search reports | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at selection and fitting milestones | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod catalog;
pub mod divergence;
mod error;
pub mod family;
pub mod mixture;
pub mod model;
pub mod parameters;
mod rng_util;
pub mod samples;
pub mod selection;

pub use error::{ClusteringError, Error, FitError, Result};
pub use family::Family;
pub use model::{
    EmpiricalDistribution, GaussianMixtureDistribution, ParametricDistribution, StochasticModel,
};
pub use parameters::{ParameterSet, map_parameters_to_names};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use stochastic_models::prelude::*;
/// ```
pub mod prelude {
    pub use crate::divergence::{DivergenceEstimator, KnnKlDivergence};
    pub use crate::error::{Error, FitError, Result};
    pub use crate::family::{Family, FamilyKind};
    pub use crate::mixture::{ComponentSearch, MixtureConfig, SearchStop};
    pub use crate::model::{
        EmpiricalDistribution, GaussianMixtureDistribution, ParametricDistribution,
        StochasticModel,
    };
    pub use crate::parameters::{ParameterSet, map_parameters_to_names};
    pub use crate::selection::{Selection, SelectionConfig, select_best_continuous_family};
    pub use crate::{catalog, samples};
}
