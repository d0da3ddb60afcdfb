//! Named parameter sets.

use core::fmt;

use crate::catalog;
use crate::error::{Error, Result};
use crate::family::Family;

/// An ordered mapping from parameter name to value.
///
/// The order always matches the owning family's declared list: shape
/// parameters first, then `loc` (and `scale` for continuous families).
/// Sets are built whole by [`map_parameters_to_names`] and never edited in
/// place.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterSet {
    entries: Vec<(String, f64)>,
}

impl ParameterSet {
    /// Returns the value of the named parameter, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|&(_, value)| value)
    }

    /// Parameter names in declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(key, _)| key.as_str()).collect()
    }

    /// Parameter values in declaration order.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|&(_, value)| value).collect()
    }

    /// Iterates `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), *value))
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Zips names with values without any catalog check.
    pub(crate) fn from_parts(names: &[&str], values: &[f64]) -> Self {
        Self {
            entries: names
                .iter()
                .zip(values)
                .map(|(name, &value)| ((*name).to_owned(), value))
                .collect(),
        }
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = (&'a str, f64);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, f64)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Names a raw parameter tuple positionally using the family's declared
/// parameter list (shapes, then `loc`, then `scale` for continuous families).
///
/// # Errors
///
/// Returns [`Error::UnsupportedFamily`] if the family is registered in
/// neither catalog, or [`Error::ParameterCount`] if the tuple length does not
/// match the declared list.
///
/// # Examples
///
/// ```
/// use stochastic_models::{catalog, map_parameters_to_names};
///
/// let gamma = catalog::continuous("gamma").unwrap();
/// let params = map_parameters_to_names(gamma, &[2.0, 0.5, 3.0]).unwrap();
/// assert_eq!(params.names(), vec!["a", "loc", "scale"]);
/// assert_eq!(params.get("scale"), Some(3.0));
/// ```
pub fn map_parameters_to_names(family: Family, values: &[f64]) -> Result<ParameterSet> {
    if !catalog::is_registered(family) {
        return Err(Error::UnsupportedFamily {
            name: family.name().to_owned(),
        });
    }
    let names = family.parameter_names();
    if names.len() != values.len() {
        return Err(Error::ParameterCount {
            family: family.name(),
            expected: names.len(),
            got: values.len(),
        });
    }
    Ok(ParameterSet::from_parts(&names, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_declared_order() {
        let binom = catalog::discrete("binom").unwrap();
        let params = map_parameters_to_names(binom, &[10.0, 0.3, 0.0]).unwrap();
        assert_eq!(params.names(), vec!["n", "p", "loc"]);
        assert_eq!(params.values(), vec![10.0, 0.3, 0.0]);
        assert_eq!(params.get("p"), Some(0.3));
        assert_eq!(params.get("scale"), None);
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let norm = catalog::continuous("norm").unwrap();
        let err = map_parameters_to_names(norm, &[0.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::ParameterCount {
                family: "norm",
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn display_lists_pairs() {
        let t = catalog::continuous("t").unwrap();
        let params = map_parameters_to_names(t, &[3.0, 0.0, 1.5]).unwrap();
        assert_eq!(params.to_string(), "df=3, loc=0, scale=1.5");
        assert_eq!(params.len(), 3);
        assert!(!params.is_empty());
        let collected: Vec<(&str, f64)> = (&params).into_iter().collect();
        assert_eq!(collected[0], ("df", 3.0));
    }
}
