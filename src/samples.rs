//! Helpers for two-dimensional sample arrays.
//!
//! Every model in this crate consumes and produces `DMatrix<f64>` values with
//! one row per sample and one column per dimension.

use nalgebra::DMatrix;
use statrs::statistics::{Data, OrderStatistics, Statistics};

use crate::error::{Error, Result};

/// Builds an `n × 1` sample array from a flat slice of scalar samples.
#[must_use]
pub fn from_column(values: &[f64]) -> DMatrix<f64> {
    DMatrix::from_column_slice(values.len(), 1, values)
}

/// Builds a sample array from row vectors.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the rows have different lengths.
pub fn from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let n_cols = rows.first().map_or(0, Vec::len);
    if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
        return Err(Error::DimensionMismatch {
            expected: n_cols,
            got: r.len(),
            row,
        });
    }
    Ok(DMatrix::from_fn(rows.len(), n_cols, |i, j| rows[i][j]))
}

/// Flattens a sample array into a single list of values, row by row.
#[must_use]
pub fn flatten(samples: &DMatrix<f64>) -> Vec<f64> {
    // Column-major storage of the transpose is row-major order of the input.
    samples.transpose().iter().copied().collect()
}

/// Arithmetic mean and biased (population) standard deviation.
pub(crate) fn mean_std(values: &[f64]) -> (f64, f64) {
    (values.mean(), values.population_std_dev())
}

/// Returns `(min, max)` of a non-empty slice.
pub(crate) fn min_max(values: &[f64]) -> (f64, f64) {
    (Statistics::min(values), Statistics::max(values))
}

/// Median of a non-empty slice.
pub(crate) fn median(values: &[f64]) -> f64 {
    Data::new(values.to_vec()).median()
}

/// Sample skewness (biased), zero for degenerate input.
pub(crate) fn skewness(values: &[f64]) -> f64 {
    let (mean, std) = mean_std(values);
    if std < f64::EPSILON {
        return 0.0;
    }
    values.iter().map(|x| ((x - mean) / std).powi(3)).mean()
}
