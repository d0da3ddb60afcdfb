//! Process-wide registries of the built-in distribution families.
//!
//! Both registries are built lazily on first access and never mutated
//! afterwards, so they can be read from any thread. Iteration follows
//! insertion order; name lookup is a hash-map probe.
//!
//! The continuous registry starts from a seed list of common families
//! (`norm`, `laplace`, `t`, `uniform`, `rayleigh`) and then merges every
//! other built-in continuous family. When two entries share a name the first
//! one wins.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::family::{
    Bernoulli, Binom, Cauchy, Chi2, Expon, Family, Gamma, Geom, GumbelL, GumbelR, HalfNorm,
    Laplace, LogNorm, Logistic, NBinom, Norm, Poisson, RandInt, Rayleigh, SkewNorm, StudentT,
    Triang, Uniform, WeibullMin,
};

static NORM: Norm = Norm;
static LAPLACE: Laplace = Laplace;
static STUDENT_T: StudentT = StudentT;
static UNIFORM: Uniform = Uniform;
static RAYLEIGH: Rayleigh = Rayleigh;
static CAUCHY: Cauchy = Cauchy;
static CHI2: Chi2 = Chi2;
static EXPON: Expon = Expon;
static GAMMA: Gamma = Gamma;
static GUMBEL_L: GumbelL = GumbelL;
static GUMBEL_R: GumbelR = GumbelR;
static HALFNORM: HalfNorm = HalfNorm;
static LOGISTIC: Logistic = Logistic;
static LOGNORM: LogNorm = LogNorm;
static SKEWNORM: SkewNorm = SkewNorm;
static TRIANG: Triang = Triang;
static WEIBULL_MIN: WeibullMin = WeibullMin;

static BERNOULLI: Bernoulli = Bernoulli;
static BINOM: Binom = Binom;
static GEOM: Geom = Geom;
static NBINOM: NBinom = NBinom;
static POISSON: Poisson = Poisson;
static RANDINT: RandInt = RandInt;

/// Ordered, name-indexed set of families.
struct Registry {
    families: Vec<Family>,
    index: HashMap<&'static str, usize>,
}

impl Registry {
    fn build(candidates: impl IntoIterator<Item = Family>) -> Self {
        let mut families = Vec::new();
        let mut index = HashMap::new();
        for family in candidates {
            if index.contains_key(family.name()) {
                continue;
            }
            index.insert(family.name(), families.len());
            families.push(family);
        }
        Self { families, index }
    }

    fn get(&self, name: &str) -> Option<Family> {
        self.index.get(name).map(|&i| self.families[i])
    }
}

fn continuous_registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let seed = [
            Family::Continuous(&NORM),
            Family::Continuous(&LAPLACE),
            Family::Continuous(&STUDENT_T),
            Family::Continuous(&UNIFORM),
            Family::Continuous(&RAYLEIGH),
        ];
        // Every built-in continuous family, alphabetically.
        let registered = [
            Family::Continuous(&CAUCHY),
            Family::Continuous(&CHI2),
            Family::Continuous(&EXPON),
            Family::Continuous(&GAMMA),
            Family::Continuous(&GUMBEL_L),
            Family::Continuous(&GUMBEL_R),
            Family::Continuous(&HALFNORM),
            Family::Continuous(&LAPLACE),
            Family::Continuous(&LOGISTIC),
            Family::Continuous(&LOGNORM),
            Family::Continuous(&NORM),
            Family::Continuous(&RAYLEIGH),
            Family::Continuous(&SKEWNORM),
            Family::Continuous(&STUDENT_T),
            Family::Continuous(&TRIANG),
            Family::Continuous(&UNIFORM),
            Family::Continuous(&WEIBULL_MIN),
        ];
        Registry::build(seed.into_iter().chain(registered))
    })
}

fn discrete_registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        Registry::build([
            Family::Discrete(&BERNOULLI),
            Family::Discrete(&BINOM),
            Family::Discrete(&GEOM),
            Family::Discrete(&NBINOM),
            Family::Discrete(&POISSON),
            Family::Discrete(&RANDINT),
        ])
    })
}

/// All continuous families, in catalog (selection) order.
#[must_use]
pub fn continuous_families() -> &'static [Family] {
    &continuous_registry().families
}

/// All discrete families, in catalog order.
#[must_use]
pub fn discrete_families() -> &'static [Family] {
    &discrete_registry().families
}

/// Looks up a continuous family by name.
#[must_use]
pub fn continuous(name: &str) -> Option<Family> {
    continuous_registry().get(name)
}

/// Looks up a discrete family by name.
#[must_use]
pub fn discrete(name: &str) -> Option<Family> {
    discrete_registry().get(name)
}

/// Looks up a family by name, preferring the continuous catalog.
///
/// # Errors
///
/// Returns [`Error::UnknownFamily`] if neither catalog has the name.
pub fn lookup(name: &str) -> Result<Family> {
    continuous(name)
        .or_else(|| discrete(name))
        .ok_or_else(|| Error::UnknownFamily {
            name: name.to_owned(),
        })
}

/// Whether `family` is registered in the catalog matching its kind.
#[must_use]
pub fn is_registered(family: Family) -> bool {
    let found = match family {
        Family::Continuous(_) => continuous(family.name()),
        Family::Discrete(_) => discrete(family.name()),
    };
    found == Some(family)
}
