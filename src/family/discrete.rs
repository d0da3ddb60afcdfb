//! Built-in discrete families.
//!
//! All of them are fitted with `loc = 0`; the location shift only matters for
//! user-fixed parameters.

use rand::distributions::Distribution;
use statrs::distribution::{self as dist, Discrete};

use super::DiscreteFamily;
use crate::error::FitError;
use crate::rng_util;
use crate::samples::{mean_std, min_max};

/// Converts an integer-valued sample to a count; `None` below zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count(k: f64) -> Option<u64> {
    (k >= 0.0).then_some(k as u64)
}

/// Log mass under a `statrs` distribution built from the shape parameters;
/// `-inf` for rejected shapes and negative `k`.
fn ln_pmf<D: Discrete<u64, f64>, E>(built: Result<D, E>, k: f64) -> f64 {
    match (built, count(k)) {
        (Ok(d), Some(k)) => d.ln_pmf(k),
        _ => f64::NEG_INFINITY,
    }
}

/// One variate from a `statrs` distribution; `NaN` for rejected shapes.
fn sample<D: Distribution<f64>, E>(built: Result<D, E>, rng: &mut fastrand::Rng) -> f64 {
    built.map_or(f64::NAN, |d| rng_util::sample(&d, rng))
}

fn require_non_negative(data: &[f64]) -> Result<(), FitError> {
    if data.iter().any(|&x| x < 0.0) {
        return Err(FitError::OutsideSupport);
    }
    Ok(())
}

fn is_probability(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

/// Bernoulli distribution on `{0, 1}` with success probability `p`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bernoulli;

impl DiscreteFamily for Bernoulli {
    fn name(&self) -> &'static str {
        "bernoulli"
    }

    fn shapes(&self) -> &'static str {
        "p"
    }

    fn valid_shapes(&self, shapes: &[f64]) -> bool {
        is_probability(shapes[0])
    }

    fn log_pmf_standard(&self, k: f64, shapes: &[f64]) -> f64 {
        ln_pmf(dist::Bernoulli::new(shapes[0]), k)
    }

    fn sample_standard(&self, shapes: &[f64], rng: &mut fastrand::Rng) -> f64 {
        sample(dist::Bernoulli::new(shapes[0]), rng)
    }

    fn fit_shapes(&self, data: &[f64]) -> Result<Vec<f64>, FitError> {
        if data.iter().any(|&x| x != 0.0 && x != 1.0) {
            return Err(FitError::OutsideSupport);
        }
        Ok(vec![mean_std(data).0])
    }
}

/// Binomial distribution with `n` trials and success probability `p`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Binom;

impl Binom {
    /// Smallest half-width of the trial-count window searched around the
    /// moment estimate.
    const MIN_HALF_WIDTH: f64 = 50.0;
    /// Candidates per pass of the coarse-to-fine window search.
    const GRID_POINTS: f64 = 40.0;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn log_likelihood(data: &[f64], n: f64, p: f64) -> f64 {
        dist::Binomial::new(p, n as u64).map_or(f64::NEG_INFINITY, |d| {
            data.iter()
                .map(|&k| count(k).map_or(f64::NEG_INFINITY, |k| d.ln_pmf(k)))
                .sum()
        })
    }

    /// Best `(n, log-likelihood)` over `low, low + step, ..., high`, with
    /// `p = mean / n` for each candidate.
    fn scan(data: &[f64], mean: f64, low: f64, high: f64, step: f64) -> Option<(f64, f64)> {
        let mut best: Option<(f64, f64)> = None;
        let mut n = low;
        while n <= high {
            let ll = Self::log_likelihood(data, n, mean / n);
            if ll.is_finite() && best.is_none_or(|(_, b)| ll > b) {
                best = Some((n, ll));
            }
            n += step;
        }
        best
    }
}

impl DiscreteFamily for Binom {
    fn name(&self) -> &'static str {
        "binom"
    }

    fn shapes(&self) -> &'static str {
        "n, p"
    }

    fn valid_shapes(&self, shapes: &[f64]) -> bool {
        let (n, p) = (shapes[0], shapes[1]);
        n >= 0.0 && n.fract() == 0.0 && is_probability(p)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn log_pmf_standard(&self, k: f64, shapes: &[f64]) -> f64 {
        ln_pmf(dist::Binomial::new(shapes[1], shapes[0] as u64), k)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn sample_standard(&self, shapes: &[f64], rng: &mut fastrand::Rng) -> f64 {
        sample(dist::Binomial::new(shapes[1], shapes[0] as u64), rng)
    }

    /// Profile likelihood over integer `n` in a window centred on the moment
    /// estimate `mean^2 / (mean - var)`, searched coarse to fine so the cost
    /// does not grow with the counts.
    fn fit_shapes(&self, data: &[f64]) -> Result<Vec<f64>, FitError> {
        require_non_negative(data)?;
        let (mean, std) = mean_std(data);
        let var = std * std;
        let (_, max) = min_max(data);
        let floor = max.max(1.0);
        let centre = if var < mean {
            (mean * mean / (mean - var)).round().max(floor)
        } else {
            floor
        };
        let half = (0.5 * centre).ceil().max(Self::MIN_HALF_WIDTH);
        let (mut low, mut high) = ((centre - half).max(floor), centre + half);

        let mut step = ((high - low) / Self::GRID_POINTS).ceil().max(1.0);
        let mut best = Self::scan(data, mean, low, high, step);
        while step > 1.0 {
            let Some((n, _)) = best else { break };
            low = (n - step).max(floor);
            high = n + step;
            step = (step / Self::GRID_POINTS).ceil().max(1.0);
            best = Self::scan(data, mean, low, high, step);
        }
        best.map(|(n, _)| vec![n, mean / n])
            .ok_or(FitError::NotConverged)
    }
}

/// Geometric distribution: number of trials up to and including the first
/// success, supported on `k >= 1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Geom;

impl DiscreteFamily for Geom {
    fn name(&self) -> &'static str {
        "geom"
    }

    fn shapes(&self) -> &'static str {
        "p"
    }

    fn valid_shapes(&self, shapes: &[f64]) -> bool {
        shapes[0] > 0.0 && shapes[0] <= 1.0
    }

    fn log_pmf_standard(&self, k: f64, shapes: &[f64]) -> f64 {
        ln_pmf(dist::Geometric::new(shapes[0]), k)
    }

    fn sample_standard(&self, shapes: &[f64], rng: &mut fastrand::Rng) -> f64 {
        sample(dist::Geometric::new(shapes[0]), rng)
    }

    fn fit_shapes(&self, data: &[f64]) -> Result<Vec<f64>, FitError> {
        if data.iter().any(|&x| x < 1.0) {
            return Err(FitError::OutsideSupport);
        }
        Ok(vec![1.0 / mean_std(data).0])
    }
}

/// Negative binomial distribution: failures before the `n`-th success.
#[derive(Debug, Clone, Copy, Default)]
pub struct NBinom;

impl DiscreteFamily for NBinom {
    fn name(&self) -> &'static str {
        "nbinom"
    }

    fn shapes(&self) -> &'static str {
        "n, p"
    }

    fn valid_shapes(&self, shapes: &[f64]) -> bool {
        let (n, p) = (shapes[0], shapes[1]);
        n > 0.0 && p > 0.0 && p <= 1.0
    }

    fn log_pmf_standard(&self, k: f64, shapes: &[f64]) -> f64 {
        ln_pmf(dist::NegativeBinomial::new(shapes[0], shapes[1]), k)
    }

    #[allow(clippy::cast_precision_loss)]
    fn sample_standard(&self, shapes: &[f64], rng: &mut fastrand::Rng) -> f64 {
        dist::NegativeBinomial::new(shapes[0], shapes[1])
            .map_or(f64::NAN, |d| rng_util::sample::<u64, _>(&d, rng) as f64)
    }

    /// Method of moments; requires over-dispersed data (variance above mean).
    fn fit_shapes(&self, data: &[f64]) -> Result<Vec<f64>, FitError> {
        require_non_negative(data)?;
        let (mean, std) = mean_std(data);
        let var = std * std;
        if var <= mean || mean <= 0.0 {
            return Err(FitError::OutsideSupport);
        }
        Ok(vec![mean * mean / (var - mean), mean / var])
    }
}

/// Poisson distribution with mean `mu`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Poisson;

impl DiscreteFamily for Poisson {
    fn name(&self) -> &'static str {
        "poisson"
    }

    fn shapes(&self) -> &'static str {
        "mu"
    }

    fn valid_shapes(&self, shapes: &[f64]) -> bool {
        shapes[0] >= 0.0
    }

    fn log_pmf_standard(&self, k: f64, shapes: &[f64]) -> f64 {
        let mu = shapes[0];
        // A zero mean is a point mass at zero.
        if mu == 0.0 {
            return if k == 0.0 { 0.0 } else { f64::NEG_INFINITY };
        }
        ln_pmf(dist::Poisson::new(mu), k)
    }

    fn sample_standard(&self, shapes: &[f64], rng: &mut fastrand::Rng) -> f64 {
        if shapes[0] == 0.0 {
            return 0.0;
        }
        sample(dist::Poisson::new(shapes[0]), rng)
    }

    fn fit_shapes(&self, data: &[f64]) -> Result<Vec<f64>, FitError> {
        require_non_negative(data)?;
        Ok(vec![mean_std(data).0])
    }
}

/// Discrete uniform distribution on `low..high` (upper bound exclusive).
#[derive(Debug, Clone, Copy, Default)]
pub struct RandInt;

impl RandInt {
    /// `statrs` takes both bounds inclusive.
    #[allow(clippy::cast_possible_truncation)]
    fn inclusive(shapes: &[f64]) -> Result<dist::DiscreteUniform, dist::DiscreteUniformError> {
        dist::DiscreteUniform::new(shapes[0] as i64, shapes[1] as i64 - 1)
    }
}

impl DiscreteFamily for RandInt {
    fn name(&self) -> &'static str {
        "randint"
    }

    fn shapes(&self) -> &'static str {
        "low, high"
    }

    fn valid_shapes(&self, shapes: &[f64]) -> bool {
        let (low, high) = (shapes[0], shapes[1]);
        low.fract() == 0.0 && high.fract() == 0.0 && low < high
    }

    #[allow(clippy::cast_possible_truncation)]
    fn log_pmf_standard(&self, k: f64, shapes: &[f64]) -> f64 {
        RandInt::inclusive(shapes).map_or(f64::NEG_INFINITY, |d| d.ln_pmf(k as i64))
    }

    fn sample_standard(&self, shapes: &[f64], rng: &mut fastrand::Rng) -> f64 {
        sample(RandInt::inclusive(shapes), rng)
    }

    fn fit_shapes(&self, data: &[f64]) -> Result<Vec<f64>, FitError> {
        let (min, max) = min_max(data);
        Ok(vec![min, max + 1.0])
    }
}
