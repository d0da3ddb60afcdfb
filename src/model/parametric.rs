use core::fmt;
use std::sync::Arc;

use nalgebra::DMatrix;
use parking_lot::Mutex;

use super::{StochasticModel, check_not_empty};
use crate::divergence::{DivergenceEstimator, KnnKlDivergence};
use crate::error::{Error, Result};
use crate::family::Family;
use crate::parameters::{ParameterSet, map_parameters_to_names};
use crate::rng_util;
use crate::samples;
use crate::selection::{Selection, SelectionConfig, select_best_continuous_family};

/// A single parametric family with fitted or fixed parameters.
///
/// Three modes, decided at construction:
///
/// - **automatic** ([`new`](Self::new)): `fit` picks the best continuous
///   catalog family by divergence and fits it.
/// - **pinned family** ([`with_family`](Self::with_family)): `fit`
///   re-estimates that family's parameters by maximum likelihood.
/// - **fixed parameters** ([`builder`](Self::builder) with
///   [`parameter`](ParametricDistributionBuilder::parameter)): `fit` is a
///   no-op and sampling works immediately.
///
/// Multi-column input is flattened into one list of values before fitting.
///
/// # Examples
///
/// ```
/// use stochastic_models::prelude::*;
///
/// let model = ParametricDistribution::builder()
///     .family(catalog::lookup("norm").unwrap())
///     .parameter("loc", 5.0)
///     .parameter("scale", 2.0)
///     .seed(7)
///     .build()
///     .unwrap();
///
/// let samples = model.draw_samples(100).unwrap();
/// assert_eq!(samples.shape(), (100, 1));
/// ```
pub struct ParametricDistribution {
    pinned: Option<Family>,
    fixed: Option<ParameterSet>,
    fitted: Option<(Family, ParameterSet)>,
    selection: Option<Selection>,
    config: SelectionConfig,
    estimator: Arc<dyn DivergenceEstimator>,
    seed: Option<u64>,
    rng: Mutex<fastrand::Rng>,
}

impl ParametricDistribution {
    /// Creates a model that selects its family automatically on `fit`.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(
            None,
            None,
            SelectionConfig::default(),
            Arc::new(KnnKlDivergence::default()),
            None,
        )
    }

    /// Creates a model pinned to `family`, with parameters estimated on `fit`.
    #[must_use]
    pub fn with_family(family: Family) -> Self {
        Self::from_parts(
            Some(family),
            None,
            SelectionConfig::default(),
            Arc::new(KnnKlDivergence::default()),
            None,
        )
    }

    /// Creates a model with fixed parameters that are never re-estimated.
    ///
    /// Missing `loc` defaults to `0` and missing `scale` to `1`; every shape
    /// parameter must be given.
    ///
    /// # Errors
    ///
    /// See [`ParametricDistributionBuilder::build`].
    pub fn with_parameters(family: Family, parameters: &[(&str, f64)]) -> Result<Self> {
        parameters
            .iter()
            .fold(Self::builder().family(family), |builder, &(name, value)| {
                builder.parameter(name, value)
            })
            .build()
    }

    /// Returns a builder for full control over the model's configuration.
    #[must_use]
    pub fn builder() -> ParametricDistributionBuilder {
        ParametricDistributionBuilder::new()
    }

    fn from_parts(
        pinned: Option<Family>,
        fixed: Option<ParameterSet>,
        config: SelectionConfig,
        estimator: Arc<dyn DivergenceEstimator>,
        seed: Option<u64>,
    ) -> Self {
        Self {
            pinned,
            fixed,
            fitted: None,
            selection: None,
            config,
            estimator,
            seed,
            rng: Mutex::new(rng_util::seeded(seed)),
        }
    }

    /// The family samples are drawn from: the fitted one, else the pinned one.
    #[must_use]
    pub fn family(&self) -> Option<Family> {
        self.fitted.as_ref().map(|(family, _)| *family).or(self.pinned)
    }

    /// The parameters samples are drawn with, if any are available yet.
    #[must_use]
    pub fn parameters(&self) -> Option<&ParameterSet> {
        self.fixed
            .as_ref()
            .or_else(|| self.fitted.as_ref().map(|(_, params)| params))
    }

    /// Details of the last automatic family selection.
    #[must_use]
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Whether the parameters were fixed at construction.
    #[must_use]
    pub fn has_fixed_parameters(&self) -> bool {
        self.fixed.is_some()
    }

    /// The early-exit configuration used for automatic selection.
    #[must_use]
    pub fn selection_config(&self) -> &SelectionConfig {
        &self.config
    }
}

impl Default for ParametricDistribution {
    fn default() -> Self {
        Self::new()
    }
}

impl StochasticModel for ParametricDistribution {
    fn fit(&mut self, samples: &DMatrix<f64>) -> Result<()> {
        if self.fixed.is_some() {
            return Ok(());
        }
        check_not_empty(samples)?;

        match self.pinned {
            Some(family) => {
                let data = samples::flatten(samples);
                let values = family.fit(&data).map_err(|source| Error::Fit {
                    family: family.name(),
                    source,
                })?;
                let parameters = map_parameters_to_names(family, &values)?;
                trace_debug!(family = family.name(), %parameters, "pinned family fitted");
                self.fitted = Some((family, parameters));
            }
            None => {
                let selection = select_best_continuous_family(
                    samples,
                    &self.config,
                    self.estimator.as_ref(),
                    &mut self.rng.lock(),
                )?;
                self.fitted = Some((selection.family, selection.parameters.clone()));
                self.selection = Some(selection);
            }
        }
        Ok(())
    }

    fn draw_samples(&self, n: usize) -> Result<DMatrix<f64>> {
        let (Some(family), Some(parameters)) = (self.family(), self.parameters()) else {
            return Err(Error::NotFitted {
                model: "ParametricDistribution",
            });
        };
        let values = family.draw(&parameters.values(), n, &mut self.rng.lock());
        Ok(samples::from_column(&values))
    }

    fn clone_model(&self) -> Box<dyn StochasticModel> {
        Box::new(Self::from_parts(
            self.pinned,
            self.fixed.clone(),
            self.config,
            Arc::clone(&self.estimator),
            self.seed,
        ))
    }
}

impl fmt::Debug for ParametricDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParametricDistribution")
            .field("family", &self.family())
            .field("parameters", &self.parameters())
            .field("fixed", &self.has_fixed_parameters())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ParametricDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.family(), self.parameters()) {
            (Some(family), Some(parameters)) => write!(f, "{family}({parameters})"),
            (Some(family), None) => write!(f, "{family} (unfitted)"),
            _ => f.write_str("Unfitted parametric distribution"),
        }
    }
}

/// Builder for [`ParametricDistribution`].
///
/// # Defaults
///
/// - Family: selected automatically on `fit`
/// - Parameters: estimated on `fit`
/// - Divergence threshold: `0.01`
/// - Divergence estimator: [`KnnKlDivergence`] with `k = 5`
/// - Seed: none (fresh entropy)
pub struct ParametricDistributionBuilder {
    family: Option<Family>,
    parameters: Vec<(String, f64)>,
    config: SelectionConfig,
    estimator: Option<Arc<dyn DivergenceEstimator>>,
    seed: Option<u64>,
}

impl ParametricDistributionBuilder {
    fn new() -> Self {
        Self {
            family: None,
            parameters: Vec::new(),
            config: SelectionConfig::default(),
            estimator: None,
            seed: None,
        }
    }

    /// Pins the family instead of selecting one automatically.
    #[must_use]
    pub fn family(mut self, family: Family) -> Self {
        self.family = Some(family);
        self
    }

    /// Fixes a parameter value. Giving any parameter fixes them all.
    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, value: f64) -> Self {
        self.parameters.push((name.into(), value));
        self
    }

    /// Sets the divergence below which automatic selection stops early.
    #[must_use]
    pub fn divergence_threshold(mut self, threshold: f64) -> Self {
        self.config.divergence_threshold = threshold;
        self
    }

    /// Replaces the divergence estimator used for automatic selection.
    #[must_use]
    pub fn divergence_estimator(mut self, estimator: impl DivergenceEstimator + 'static) -> Self {
        self.estimator = Some(Arc::new(estimator));
        self
    }

    /// Seeds the model's random number generator.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the model.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidThreshold`] for a non-positive threshold.
    /// - [`Error::InvalidConfig`] when parameters are given without a family.
    /// - [`Error::UnknownParameter`] for a name the family does not declare.
    /// - [`Error::MissingParameter`] for an omitted shape parameter.
    /// - [`Error::InvalidParameters`] when the values are outside the
    ///   family's parameter space.
    /// - [`Error::UnsupportedFamily`] when fixing parameters of a family that
    ///   is not in the catalog.
    pub fn build(self) -> Result<ParametricDistribution> {
        self.config.validate()?;
        let fixed = if self.parameters.is_empty() {
            None
        } else {
            let family = self.family.ok_or(Error::InvalidConfig(
                "fixed parameters require a pinned family",
            ))?;
            Some(resolve_fixed(family, &self.parameters)?)
        };
        let estimator = self
            .estimator
            .unwrap_or_else(|| Arc::new(KnnKlDivergence::default()));
        Ok(ParametricDistribution::from_parts(
            self.family,
            fixed,
            self.config,
            estimator,
            self.seed,
        ))
    }
}

/// Orders user-supplied values by the family's declared parameter list.
fn resolve_fixed(family: Family, given: &[(String, f64)]) -> Result<ParameterSet> {
    let names = family.parameter_names();
    if let Some((unknown, _)) = given
        .iter()
        .find(|(name, _)| !names.iter().any(|known| known == name))
    {
        return Err(Error::UnknownParameter {
            family: family.name(),
            name: unknown.clone(),
        });
    }

    let values = names
        .iter()
        .map(|&name| {
            let given_value = given.iter().rev().find(|(n, _)| n == name).map(|&(_, v)| v);
            match (given_value, name) {
                (Some(value), _) => Ok(value),
                (None, "loc") => Ok(0.0),
                (None, "scale") => Ok(1.0),
                (None, _) => Err(Error::MissingParameter {
                    family: family.name(),
                    name: name.to_owned(),
                }),
            }
        })
        .collect::<Result<Vec<f64>>>()?;

    if !family.valid_parameters(&values) {
        return Err(Error::InvalidParameters {
            family: family.name(),
        });
    }
    map_parameters_to_names(family, &values)
}
