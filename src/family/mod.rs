//! Parametric distribution families.
//!
//! A family is a named distribution shape with zero or more shape parameters
//! and a fixed trailing-parameter contract: continuous families end with
//! `loc, scale`, discrete families end with `loc`. Shape names are static
//! metadata declared by each implementation as a comma-separated list.
//!
//! Families are referred to through the copyable [`Family`] handle, which
//! wraps a `'static` reference to either a [`ContinuousFamily`] or a
//! [`DiscreteFamily`]. The built-in families live in the
//! [`catalog`](crate::catalog).
//!
//! # Implementing a custom continuous family
//!
//! ```
//! use stochastic_models::family::{ContinuousFamily, Family};
//!
//! struct Standardised;
//!
//! impl ContinuousFamily for Standardised {
//!     fn name(&self) -> &'static str {
//!         "standardised"
//!     }
//!
//!     fn log_pdf_standard(&self, z: f64, _shapes: &[f64]) -> f64 {
//!         -0.5 * z * z - 0.5 * (2.0 * core::f64::consts::PI).ln()
//!     }
//!
//!     fn sample_standard(&self, _shapes: &[f64], rng: &mut fastrand::Rng) -> f64 {
//!         // Irwin-Hall approximation, good enough for a doc example.
//!         (0..12).map(|_| rng.f64()).sum::<f64>() - 6.0
//!     }
//!
//!     fn initial_guess(&self, data: &[f64]) -> Vec<f64> {
//!         vec![data[0], 1.0]
//!     }
//! }
//!
//! static STANDARDISED: Standardised = Standardised;
//! let family = Family::Continuous(&STANDARDISED);
//! assert_eq!(family.parameter_names(), vec!["loc", "scale"]);
//! ```

mod continuous;
mod discrete;
pub(crate) mod mle;

use core::fmt;

pub use continuous::{
    Cauchy, Chi2, Expon, Gamma, GumbelL, GumbelR, HalfNorm, Laplace, LogNorm, Logistic, Norm,
    Rayleigh, SkewNorm, StudentT, Triang, Uniform, WeibullMin,
};
pub use discrete::{Bernoulli, Binom, Geom, NBinom, Poisson, RandInt};

use crate::error::FitError;

/// Whether a family describes a continuous or a discrete random variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FamilyKind {
    /// Density-based family with trailing `loc, scale` parameters.
    Continuous,
    /// Mass-based family with a trailing `loc` parameter.
    Discrete,
}

impl FamilyKind {
    /// The parameter names every family of this kind appends after its shapes.
    #[must_use]
    pub fn trailing_parameters(self) -> &'static [&'static str] {
        match self {
            Self::Continuous => &["loc", "scale"],
            Self::Discrete => &["loc"],
        }
    }
}

/// A continuous location/scale family.
///
/// Implementations describe the *standardised* variable `z = (x - loc) / scale`;
/// the density of `x` is `f(z; shapes) / scale`. Parameter vectors passed to
/// [`Family`] methods are laid out as `[shapes..., loc, scale]`.
pub trait ContinuousFamily: Send + Sync {
    /// Unique family name, e.g. `"norm"`.
    fn name(&self) -> &'static str;

    /// Comma-separated shape parameter names, empty when there are none.
    fn shapes(&self) -> &'static str {
        ""
    }

    /// Whether the given shape values lie inside the parameter space.
    ///
    /// The default accepts finite, strictly positive shapes.
    fn valid_shapes(&self, shapes: &[f64]) -> bool {
        shapes.iter().all(|s| s.is_finite() && *s > 0.0)
    }

    /// Log density of the standardised variable; `-inf` outside the support.
    fn log_pdf_standard(&self, z: f64, shapes: &[f64]) -> f64;

    /// Draws one standardised variate.
    fn sample_standard(&self, shapes: &[f64], rng: &mut fastrand::Rng) -> f64;

    /// Starting point `[shapes..., loc, scale]` for likelihood maximisation.
    ///
    /// Callers guarantee `data` is non-empty, finite and not degenerate.
    fn initial_guess(&self, data: &[f64]) -> Vec<f64>;

    /// Maximum-likelihood estimate of `[shapes..., loc, scale]`.
    ///
    /// The default runs a Nelder-Mead search on the negative log-likelihood
    /// from [`initial_guess`](Self::initial_guess).
    ///
    /// # Errors
    ///
    /// Returns a [`FitError`] when the data cannot be described by the family.
    fn fit(&self, data: &[f64]) -> Result<Vec<f64>, FitError> {
        mle::fit_continuous(self, data)
    }
}

/// A discrete family supported on a lattice shifted by `loc`.
///
/// Parameter vectors passed to [`Family`] methods are laid out as
/// `[shapes..., loc]`.
pub trait DiscreteFamily: Send + Sync {
    /// Unique family name, e.g. `"poisson"`.
    fn name(&self) -> &'static str;

    /// Comma-separated shape parameter names.
    fn shapes(&self) -> &'static str;

    /// Whether the given shape values lie inside the parameter space.
    fn valid_shapes(&self, shapes: &[f64]) -> bool;

    /// Log probability mass at integer `k = x - loc`; `-inf` outside the support.
    fn log_pmf_standard(&self, k: f64, shapes: &[f64]) -> f64;

    /// Draws one variate with `loc = 0`.
    fn sample_standard(&self, shapes: &[f64], rng: &mut fastrand::Rng) -> f64;

    /// Estimates the shape parameters from integer-valued data with `loc = 0`.
    ///
    /// # Errors
    ///
    /// Returns a [`FitError`] when the data cannot be described by the family.
    fn fit_shapes(&self, data: &[f64]) -> Result<Vec<f64>, FitError>;
}

/// Copyable handle to a registered (or user-supplied) distribution family.
#[derive(Clone, Copy)]
pub enum Family {
    /// A continuous family with trailing `loc, scale`.
    Continuous(&'static dyn ContinuousFamily),
    /// A discrete family with trailing `loc`.
    Discrete(&'static dyn DiscreteFamily),
}

impl Family {
    /// The family's unique name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Continuous(f) => f.name(),
            Self::Discrete(f) => f.name(),
        }
    }

    /// Whether the family is continuous or discrete.
    #[must_use]
    pub fn kind(&self) -> FamilyKind {
        match self {
            Self::Continuous(_) => FamilyKind::Continuous,
            Self::Discrete(_) => FamilyKind::Discrete,
        }
    }

    /// The raw comma-separated shape metadata.
    #[must_use]
    pub fn shapes(&self) -> &'static str {
        match self {
            Self::Continuous(f) => f.shapes(),
            Self::Discrete(f) => f.shapes(),
        }
    }

    /// Shape parameter names, parsed from [`shapes`](Self::shapes).
    #[must_use]
    pub fn shape_names(&self) -> Vec<&'static str> {
        parse_shapes(self.shapes())
    }

    /// The declared parameter list: shapes followed by the trailing names of
    /// the family's kind.
    #[must_use]
    pub fn parameter_names(&self) -> Vec<&'static str> {
        let mut names = self.shape_names();
        names.extend_from_slice(self.kind().trailing_parameters());
        names
    }

    /// Whether a full parameter vector lies inside the parameter space.
    #[must_use]
    pub fn valid_parameters(&self, params: &[f64]) -> bool {
        if params.len() != self.parameter_names().len() || params.iter().any(|p| !p.is_finite()) {
            return false;
        }
        match self {
            Self::Continuous(f) => {
                let (shapes, loc_scale) = params.split_at(params.len() - 2);
                loc_scale[1] > 0.0 && f.valid_shapes(shapes)
            }
            Self::Discrete(f) => {
                let (shapes, loc) = params.split_at(params.len() - 1);
                loc[0].fract() == 0.0 && f.valid_shapes(shapes)
            }
        }
    }

    /// Maximum-likelihood estimate of the full parameter vector.
    ///
    /// # Errors
    ///
    /// Returns a [`FitError`] when the data cannot be described by the family.
    pub fn fit(&self, data: &[f64]) -> Result<Vec<f64>, FitError> {
        match self {
            Self::Continuous(f) => f.fit(data),
            Self::Discrete(f) => {
                mle::check_samples(data)?;
                if data.iter().any(|x| x.fract() != 0.0) {
                    return Err(FitError::OutsideSupport);
                }
                let mut params = f.fit_shapes(data)?;
                params.push(0.0);
                Ok(params)
            }
        }
    }

    /// Log density (continuous) or log mass (discrete) at `x`.
    #[must_use]
    pub fn log_density(&self, x: f64, params: &[f64]) -> f64 {
        if !self.valid_parameters(params) {
            return f64::NEG_INFINITY;
        }
        match self {
            Self::Continuous(f) => {
                let (shapes, loc_scale) = params.split_at(params.len() - 2);
                let (loc, scale) = (loc_scale[0], loc_scale[1]);
                f.log_pdf_standard((x - loc) / scale, shapes) - scale.ln()
            }
            Self::Discrete(f) => {
                let (shapes, loc) = params.split_at(params.len() - 1);
                let k = x - loc[0];
                if k.fract() == 0.0 {
                    f.log_pmf_standard(k, shapes)
                } else {
                    f64::NEG_INFINITY
                }
            }
        }
    }

    /// Draws `n` i.i.d. values with the given full parameter vector.
    ///
    /// The caller is responsible for passing valid parameters (see
    /// [`valid_parameters`](Self::valid_parameters)).
    pub fn draw(&self, params: &[f64], n: usize, rng: &mut fastrand::Rng) -> Vec<f64> {
        match self {
            Self::Continuous(f) => {
                let (shapes, loc_scale) = params.split_at(params.len() - 2);
                let (loc, scale) = (loc_scale[0], loc_scale[1]);
                (0..n)
                    .map(|_| loc + scale * f.sample_standard(shapes, rng))
                    .collect()
            }
            Self::Discrete(f) => {
                let (shapes, loc) = params.split_at(params.len() - 1);
                (0..n)
                    .map(|_| loc[0] + f.sample_standard(shapes, rng))
                    .collect()
            }
        }
    }
}

impl fmt::Debug for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Family")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("shapes", &self.shapes())
            .finish()
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl PartialEq for Family {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.name() == other.name()
    }
}

impl Eq for Family {}

/// Splits `"a, b"` into `["a", "b"]`; an empty string has no shapes.
pub(crate) fn parse_shapes(shapes: &'static str) -> Vec<&'static str> {
    shapes
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
