use core::fmt;

use nalgebra::DMatrix;
use parking_lot::Mutex;

use super::{StochasticModel, check_not_empty};
use crate::error::{Error, Result};
use crate::mixture::{ComponentSearch, FittedMixture, MixtureConfig, select_component_count};
use crate::rng_util;

/// A Bayesian Gaussian mixture approximating the data distribution.
///
/// On `fit` the number of components is chosen by a silhouette search over
/// k-means partitions, then a variational Gaussian mixture with that many
/// components is fitted. Works for any number of columns.
///
/// # Examples
///
/// ```
/// use stochastic_models::prelude::*;
///
/// let values: Vec<f64> = (0..200).map(|i| f64::from(i % 10)).collect();
/// let mut model = GaussianMixtureDistribution::builder().seed(1).build().unwrap();
/// model.fit(&samples::from_column(&values)).unwrap();
///
/// assert!(model.n_components().unwrap() >= 1);
/// assert_eq!(model.draw_samples(5).unwrap().shape(), (5, 1));
/// ```
pub struct GaussianMixtureDistribution {
    config: MixtureConfig,
    seed: Option<u64>,
    fitted: Option<FittedMixture>,
    search: Option<ComponentSearch>,
    rng: Mutex<fastrand::Rng>,
}

impl GaussianMixtureDistribution {
    /// Creates an unfitted model with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(MixtureConfig::default(), None)
    }

    /// Returns a builder for the mixture settings and seed.
    #[must_use]
    pub fn builder() -> GaussianMixtureDistributionBuilder {
        GaussianMixtureDistributionBuilder {
            config: MixtureConfig::default(),
            seed: None,
        }
    }

    fn from_parts(config: MixtureConfig, seed: Option<u64>) -> Self {
        Self {
            config,
            seed,
            fitted: None,
            search: None,
            rng: Mutex::new(rng_util::seeded(seed)),
        }
    }

    /// Number of mixture components, if fitted.
    #[must_use]
    pub fn n_components(&self) -> Option<usize> {
        self.fitted.as_ref().map(FittedMixture::n_components)
    }

    /// The fitted mixture.
    #[must_use]
    pub fn mixture(&self) -> Option<&FittedMixture> {
        self.fitted.as_ref()
    }

    /// The component-count search from the last fit.
    #[must_use]
    pub fn component_search(&self) -> Option<&ComponentSearch> {
        self.search.as_ref()
    }

    /// The settings used by `fit`.
    #[must_use]
    pub fn config(&self) -> &MixtureConfig {
        &self.config
    }
}

impl Default for GaussianMixtureDistribution {
    fn default() -> Self {
        Self::new()
    }
}

impl StochasticModel for GaussianMixtureDistribution {
    fn fit(&mut self, samples: &DMatrix<f64>) -> Result<()> {
        check_not_empty(samples)?;
        let mut rng = self.rng.lock();
        let search = select_component_count(samples, &self.config, &mut rng);
        let fitted = self.config.mixture(search.best).fit(samples, &mut rng)?;
        trace_info!(
            components = fitted.n_components(),
            converged = fitted.converged(),
            iterations = fitted.n_iter(),
            "gaussian mixture fitted"
        );
        drop(rng);
        self.fitted = Some(fitted);
        self.search = Some(search);
        Ok(())
    }

    fn draw_samples(&self, n: usize) -> Result<DMatrix<f64>> {
        let fitted = self.fitted.as_ref().ok_or(Error::NotFitted {
            model: "GaussianMixtureDistribution",
        })?;
        Ok(fitted.sample(n, &mut self.rng.lock()))
    }

    fn clone_model(&self) -> Box<dyn StochasticModel> {
        Box::new(Self::from_parts(self.config, self.seed))
    }
}

impl fmt::Debug for GaussianMixtureDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GaussianMixtureDistribution")
            .field("config", &self.config)
            .field("n_components", &self.n_components())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for GaussianMixtureDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Approximated data distribution")
    }
}

/// Builder for [`GaussianMixtureDistribution`].
pub struct GaussianMixtureDistributionBuilder {
    config: MixtureConfig,
    seed: Option<u64>,
}

impl GaussianMixtureDistributionBuilder {
    /// Replaces every setting at once.
    #[must_use]
    pub fn config(mut self, config: MixtureConfig) -> Self {
        self.config = config;
        self
    }

    /// Variational iteration cap. Default: `1000`.
    #[must_use]
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    /// Non-improving candidates tolerated by the component search. Default: `3`.
    #[must_use]
    pub fn plateau_patience(mut self, patience: usize) -> Self {
        self.config.plateau_patience = patience;
        self
    }

    /// Seeds the RNG used for fitting and sampling.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if any setting is out of range.
    pub fn build(self) -> Result<GaussianMixtureDistribution> {
        self.config.validate()?;
        Ok(GaussianMixtureDistribution::from_parts(self.config, self.seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples;

    #[test]
    fn unfitted_model_reports_not_fitted() {
        let model = GaussianMixtureDistribution::new();
        assert!(matches!(
            model.draw_samples(3),
            Err(Error::NotFitted { model: "GaussianMixtureDistribution" })
        ));
        assert_eq!(model.to_string(), "Approximated data distribution");
    }

    #[test]
    fn small_inputs_fit_one_component() {
        let mut model = GaussianMixtureDistribution::builder().seed(2).build().unwrap();
        model
            .fit(&samples::from_column(&[1.0, 2.0, 3.0, 4.0, 5.0]))
            .unwrap();
        assert_eq!(model.n_components(), Some(1));
        assert!(model.component_search().unwrap().evaluated.is_empty());
    }

    #[test]
    fn builder_rejects_bad_settings() {
        assert!(matches!(
            GaussianMixtureDistribution::builder().plateau_patience(0).build(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(GaussianMixtureDistribution::builder().max_iter(0).build().is_err());
    }
}
