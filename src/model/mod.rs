//! Stochastic models: fit once, then draw samples.
//!
//! Every model follows the same lifecycle. It is constructed unfitted (or with
//! fixed parameters), [`fit`](StochasticModel::fit) is called with a sample
//! array, and [`draw_samples`](StochasticModel::draw_samples) then produces
//! new rows any number of times. [`clone_model`](StochasticModel::clone_model)
//! returns a fresh instance with the same configuration and none of the
//! fitted state.
//!
//! | Model | Representation |
//! |-------|----------------|
//! | [`ParametricDistribution`] | one catalog family with fitted or fixed parameters |
//! | [`EmpiricalDistribution`] | the observed rows, resampled with replacement |
//! | [`GaussianMixtureDistribution`] | a variational Gaussian mixture with automatic component count |

mod empirical;
mod mixture;
mod parametric;

pub use empirical::EmpiricalDistribution;
pub use mixture::{GaussianMixtureDistribution, GaussianMixtureDistributionBuilder};
pub use parametric::{ParametricDistribution, ParametricDistributionBuilder};

use nalgebra::DMatrix;

use crate::error::Result;

/// A model of a random variable's marginal distribution.
///
/// Sample arrays hold one row per sample and one column per dimension.
pub trait StochasticModel: Send + Sync {
    /// Fits the model to `samples`, replacing any previous fit.
    ///
    /// # Errors
    ///
    /// Returns an error when the samples cannot be fitted at all, for example
    /// when the array is empty.
    fn fit(&mut self, samples: &DMatrix<f64>) -> Result<()>;

    /// Draws `n` new samples, one per row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFitted`](crate::Error::NotFitted) if the model has
    /// nothing to sample from yet.
    fn draw_samples(&self, n: usize) -> Result<DMatrix<f64>>;

    /// Returns an unfitted model with the same configuration.
    ///
    /// Fixed parameters are configuration and are carried over; fitted
    /// parameters, stored data and fitted mixtures are not.
    fn clone_model(&self) -> Box<dyn StochasticModel>;
}

/// Rejects sample arrays without any values.
pub(crate) fn check_not_empty(samples: &DMatrix<f64>) -> Result<()> {
    if samples.is_empty() {
        return Err(crate::Error::EmptySamples);
    }
    Ok(())
}
