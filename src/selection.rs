//! Automatic choice of a continuous family for a batch of samples.
//!
//! Every catalog family is fitted by maximum likelihood, a synthetic sample
//! of the same size is drawn from the fit, and the divergence between the
//! observed and synthetic samples scores the candidate. The first candidate
//! scoring below the configured threshold is accepted immediately; otherwise
//! the lowest score wins.

use nalgebra::DMatrix;

use crate::catalog;
use crate::divergence::DivergenceEstimator;
use crate::error::{Error, FitError, Result};
use crate::family::Family;
use crate::parameters::{ParameterSet, map_parameters_to_names};
use crate::samples;

/// Configuration for [`select_best_continuous_family`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectionConfig {
    /// Divergence below which a candidate is accepted without looking at the
    /// remaining families. Default: `0.01`.
    pub divergence_threshold: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            divergence_threshold: 0.01,
        }
    }
}

impl SelectionConfig {
    /// Creates a configuration with the given early-exit threshold.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThreshold`] unless the threshold is finite and
    /// strictly positive.
    pub fn new(divergence_threshold: f64) -> Result<Self> {
        let config = Self {
            divergence_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the threshold is finite and strictly positive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThreshold`] otherwise.
    pub fn validate(&self) -> Result<()> {
        if self.divergence_threshold.is_finite() && self.divergence_threshold > 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidThreshold(self.divergence_threshold))
        }
    }
}

/// What happened when one candidate family was tried.
#[derive(Clone, Debug, PartialEq)]
pub enum CandidateOutcome {
    /// The family does not apply to the data.
    Skipped(FitError),
    /// The family was fitted and scored, but not good enough to stop early.
    Scored {
        /// Fitted raw parameters, `[shapes..., loc, scale]`.
        params: Vec<f64>,
        /// Divergence of the observed samples from the synthetic ones.
        divergence: f64,
    },
    /// The family scored below the threshold; the search stops here.
    Accepted {
        /// Fitted raw parameters, `[shapes..., loc, scale]`.
        params: Vec<f64>,
        /// Divergence of the observed samples from the synthetic ones.
        divergence: f64,
    },
}

/// Result of a family search.
#[derive(Clone, Debug)]
pub struct Selection {
    /// The winning family (`norm` if no candidate could be fitted).
    pub family: Family,
    /// Its named parameters.
    pub parameters: ParameterSet,
    /// Divergence of the winner; `+inf` when no candidate could be scored.
    pub divergence: f64,
    /// How many candidates were tried, including skipped ones.
    pub evaluated: usize,
    /// Whether the search stopped on a below-threshold candidate.
    pub accepted_early: bool,
}

/// Fits one family and scores it against the observed samples.
///
/// `observed` must be the single-column form of `data`. The synthetic sample
/// has as many rows as `observed`.
pub fn evaluate_candidate(
    family: Family,
    data: &[f64],
    observed: &DMatrix<f64>,
    config: &SelectionConfig,
    estimator: &dyn DivergenceEstimator,
    rng: &mut fastrand::Rng,
) -> CandidateOutcome {
    let params = match family.fit(data) {
        Ok(params) if family.valid_parameters(&params) => params,
        Ok(_) => {
            trace_debug!(family = family.name(), "fitted parameters out of range");
            return CandidateOutcome::Skipped(FitError::NotConverged);
        }
        Err(reason) => {
            trace_debug!(family = family.name(), %reason, "candidate skipped");
            return CandidateOutcome::Skipped(reason);
        }
    };

    let synthetic = samples::from_column(&family.draw(&params, observed.nrows(), rng));
    let divergence = estimator.estimate(observed, &synthetic);
    if !divergence.is_finite() {
        trace_debug!(family = family.name(), divergence, "candidate unscored");
        return CandidateOutcome::Skipped(FitError::Unscored);
    }

    trace_debug!(family = family.name(), divergence, "candidate scored");
    if divergence < config.divergence_threshold {
        CandidateOutcome::Accepted { params, divergence }
    } else {
        CandidateOutcome::Scored { params, divergence }
    }
}

/// Picks the continuous catalog family that best describes `samples`.
///
/// Multi-column input is flattened into a single list of values. Candidates
/// are tried in catalog order; fitting failures skip the candidate. If no
/// candidate can be fitted at all the result is `norm` with `loc = 0`,
/// `scale = 1` and infinite divergence.
///
/// # Errors
///
/// Returns [`Error::InvalidThreshold`] if `config` is invalid.
///
/// # Examples
///
/// ```
/// use stochastic_models::divergence::KnnKlDivergence;
/// use stochastic_models::selection::{SelectionConfig, select_best_continuous_family};
/// use stochastic_models::samples;
///
/// let data: Vec<f64> = (0..200).map(|i| f64::from(i) / 200.0).collect();
/// let mut rng = fastrand::Rng::with_seed(1);
/// let selection = select_best_continuous_family(
///     &samples::from_column(&data),
///     &SelectionConfig::default(),
///     &KnnKlDivergence::default(),
///     &mut rng,
/// )
/// .unwrap();
/// assert!(selection.evaluated >= 1);
/// ```
pub fn select_best_continuous_family(
    samples: &DMatrix<f64>,
    config: &SelectionConfig,
    estimator: &dyn DivergenceEstimator,
    rng: &mut fastrand::Rng,
) -> Result<Selection> {
    select_from(catalog::continuous_families(), samples, config, estimator, rng)
}

fn select_from(
    families: &[Family],
    samples: &DMatrix<f64>,
    config: &SelectionConfig,
    estimator: &dyn DivergenceEstimator,
    rng: &mut fastrand::Rng,
) -> Result<Selection> {
    config.validate()?;
    let data = samples::flatten(samples);
    let observed = samples::from_column(&data);

    let fallback = catalog::continuous("norm").unwrap_or(families[0]);
    let mut best: (Family, Vec<f64>, f64) = (fallback, vec![0.0, 1.0], f64::INFINITY);
    let mut evaluated = 0;
    let mut accepted_early = false;

    for &family in families {
        evaluated += 1;
        match evaluate_candidate(family, &data, &observed, config, estimator, rng) {
            CandidateOutcome::Skipped(_) => {}
            CandidateOutcome::Scored { params, divergence } => {
                if divergence < best.2 {
                    best = (family, params, divergence);
                }
            }
            CandidateOutcome::Accepted { params, divergence } => {
                trace_info!(family = family.name(), divergence, "candidate accepted early");
                best = (family, params, divergence);
                accepted_early = true;
                break;
            }
        }
    }

    let (family, params, divergence) = best;
    let parameters = map_parameters_to_names(family, &params)?;
    trace_info!(
        family = family.name(),
        %parameters,
        divergence,
        evaluated,
        "selected continuous family"
    );
    Ok(Selection {
        family,
        parameters,
        divergence,
        evaluated,
        accepted_early,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::divergence::KnnKlDivergence;
    use crate::rng_util::standard_normal;

    fn normal_samples(n: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = fastrand::Rng::with_seed(seed);
        DMatrix::from_fn(n, 1, |_, _| 3.0 + 2.0 * standard_normal(&mut rng))
    }

    #[test]
    fn threshold_must_be_positive() {
        assert!(SelectionConfig::new(0.5).is_ok());
        assert!(matches!(
            SelectionConfig::new(0.0),
            Err(Error::InvalidThreshold(_))
        ));
        assert!(SelectionConfig::new(f64::NAN).is_err());
    }

    #[test]
    fn loose_threshold_accepts_first_family() {
        let samples = normal_samples(500, 1);
        let mut rng = fastrand::Rng::with_seed(2);
        let selection = select_best_continuous_family(
            &samples,
            &SelectionConfig::new(0.5).unwrap(),
            &KnnKlDivergence::default(),
            &mut rng,
        )
        .unwrap();
        assert!(selection.accepted_early);
        assert_eq!(selection.evaluated, 1);
        assert_eq!(selection.family.name(), "norm");
        assert!((selection.parameters.get("loc").unwrap() - 3.0).abs() < 0.3);
    }

    #[test]
    fn unscoreable_candidates_fall_back_to_standard_normal() {
        let samples = normal_samples(100, 3);
        let never = |_: &DMatrix<f64>, _: &DMatrix<f64>| f64::NAN;
        let mut rng = fastrand::Rng::with_seed(4);
        let selection =
            select_best_continuous_family(&samples, &SelectionConfig::default(), &never, &mut rng)
                .unwrap();
        assert_eq!(selection.family.name(), "norm");
        assert_eq!(selection.parameters.values(), vec![0.0, 1.0]);
        assert!(selection.divergence.is_infinite());
        assert!(!selection.accepted_early);
        assert_eq!(selection.evaluated, catalog::continuous_families().len());
    }

    #[test]
    fn lowest_divergence_wins_without_early_exit() {
        // Score candidates by how far their synthetic mean is from 10.
        let families = &catalog::continuous_families()[..4];
        let score = |_: &DMatrix<f64>, synthetic: &DMatrix<f64>| (synthetic.mean() - 10.0).abs();
        let samples = normal_samples(200, 5);
        let mut rng = fastrand::Rng::with_seed(6);
        let config = SelectionConfig::new(1e-12).unwrap();
        let selection = select_from(families, &samples, &config, &score, &mut rng).unwrap();
        assert_eq!(selection.evaluated, 4);
        assert!(!selection.accepted_early);
        assert!(selection.divergence.is_finite());
    }

    #[test]
    fn evaluate_candidate_reports_skips() {
        let uniform = catalog::continuous("uniform").unwrap();
        let data = [1.0; 20];
        let observed = samples::from_column(&data);
        let mut rng = fastrand::Rng::with_seed(7);
        let outcome = evaluate_candidate(
            uniform,
            &data,
            &observed,
            &SelectionConfig::default(),
            &KnnKlDivergence::default(),
            &mut rng,
        );
        assert_eq!(outcome, CandidateOutcome::Skipped(FitError::Degenerate));
    }

    #[test]
    fn multi_column_input_is_flattened() {
        let mut rng = fastrand::Rng::with_seed(8);
        let samples = DMatrix::from_fn(250, 2, |_, _| standard_normal(&mut rng));
        let selection = select_best_continuous_family(
            &samples,
            &SelectionConfig::new(0.5).unwrap(),
            &KnnKlDivergence::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(selection.family.name(), "norm");
        assert_eq!(selection.parameters.names(), vec!["loc", "scale"]);
    }
}
