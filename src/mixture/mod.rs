//! Gaussian mixture fitting with automatic component count.
//!
//! [`GaussianMixtureDistribution`](crate::model::GaussianMixtureDistribution)
//! uses this module in two steps: [`search_component_count`] over k-means
//! partitions scored by [`silhouette_score`] picks the number of components,
//! then [`BayesianGaussianMixture`] fits the mixture itself.

mod bayesian_gmm;
mod complexity;
mod kmeans;
mod silhouette;

pub use bayesian_gmm::{BayesianGaussianMixture, FittedMixture};
pub(crate) use complexity::select_component_count;
pub use complexity::{ComponentSearch, SearchStop, candidate_range, search_component_count};
pub use kmeans::{KMeans, KMeansFit};
pub use silhouette::silhouette_score;

use crate::error::{Error, Result};

/// Configuration for mixture fitting.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MixtureConfig {
    /// Variational iteration cap. Default: `1000`.
    pub max_iter: usize,
    /// Convergence tolerance on the mean log-normaliser. Default: `1e-3`.
    pub tol: f64,
    /// Added to covariance diagonals. Default: `1e-6`.
    pub reg_covar: f64,
    /// Consecutive non-improving component counts before the search stops.
    /// Default: `3`.
    pub plateau_patience: usize,
    /// Maximum number of points the silhouette is computed on. Default: `5000`.
    pub silhouette_sample_size: usize,
    /// K-means restarts per candidate count. Default: `10`.
    pub kmeans_restarts: usize,
    /// Lloyd iterations per k-means restart. Default: `300`.
    pub kmeans_max_iter: usize,
}

impl Default for MixtureConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tol: 1e-3,
            reg_covar: 1e-6,
            plateau_patience: 3,
            silhouette_sample_size: 5000,
            kmeans_restarts: 10,
            kmeans_max_iter: 300,
        }
    }
}

impl MixtureConfig {
    /// Checks every field is in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(Error::InvalidConfig("max_iter must be at least 1"));
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(Error::InvalidConfig("tol must be positive"));
        }
        if !(self.reg_covar.is_finite() && self.reg_covar >= 0.0) {
            return Err(Error::InvalidConfig("reg_covar must be non-negative"));
        }
        if self.plateau_patience == 0 {
            return Err(Error::InvalidConfig("plateau_patience must be at least 1"));
        }
        if self.silhouette_sample_size < 2 {
            return Err(Error::InvalidConfig(
                "silhouette_sample_size must be at least 2",
            ));
        }
        if self.kmeans_restarts == 0 || self.kmeans_max_iter == 0 {
            return Err(Error::InvalidConfig(
                "k-means restarts and iterations must be at least 1",
            ));
        }
        Ok(())
    }

    /// The variational fitter these settings describe.
    pub(crate) fn mixture(&self, n_components: usize) -> BayesianGaussianMixture {
        BayesianGaussianMixture::new(n_components)
            .max_iter(self.max_iter)
            .tol(self.tol)
            .reg_covar(self.reg_covar)
    }
}
