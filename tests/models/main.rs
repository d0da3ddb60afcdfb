#![allow(
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

mod empirical;
mod mixture;
mod parametric;

use statrs::statistics::Statistics;
use stochastic_models::prelude::*;

/// Draws `n` values from a catalog family with fixed parameters.
pub(crate) fn draw_from(family: &str, parameters: &[(&str, f64)], n: usize, seed: u64) -> Vec<f64> {
    let model = parameters
        .iter()
        .fold(
            ParametricDistribution::builder()
                .family(catalog::lookup(family).unwrap())
                .seed(seed),
            |builder, &(name, value)| builder.parameter(name, value),
        )
        .build()
        .unwrap();
    model.draw_samples(n).unwrap().iter().copied().collect()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.mean()
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    values.population_std_dev()
}
