use nalgebra::DMatrix;
use parking_lot::Mutex;

use super::{StochasticModel, check_not_empty};
use crate::error::{Error, Result};
use crate::rng_util;

/// The observed samples themselves, resampled uniformly with replacement.
///
/// Each drawn row is a copy of a stored row, so every column keeps its joint
/// structure with the others.
#[derive(Debug)]
pub struct EmpiricalDistribution {
    data: Option<DMatrix<f64>>,
    seed: Option<u64>,
    rng: Mutex<fastrand::Rng>,
}

impl EmpiricalDistribution {
    /// Creates an unfitted model that resamples with a fresh RNG.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng_seed(None)
    }

    /// Creates a model whose draws are reproducible for a given fit.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng_seed(Some(seed))
    }

    fn with_rng_seed(seed: Option<u64>) -> Self {
        Self {
            data: None,
            seed,
            rng: Mutex::new(rng_util::seeded(seed)),
        }
    }

    /// The stored samples, if fitted.
    #[must_use]
    pub fn data(&self) -> Option<&DMatrix<f64>> {
        self.data.as_ref()
    }
}

impl Default for EmpiricalDistribution {
    fn default() -> Self {
        Self::new()
    }
}

impl StochasticModel for EmpiricalDistribution {
    fn fit(&mut self, samples: &DMatrix<f64>) -> Result<()> {
        check_not_empty(samples)?;
        trace_debug!(rows = samples.nrows(), cols = samples.ncols(), "stored empirical samples");
        self.data = Some(samples.clone());
        Ok(())
    }

    fn draw_samples(&self, n: usize) -> Result<DMatrix<f64>> {
        let data = self.data.as_ref().ok_or(Error::NotFitted {
            model: "EmpiricalDistribution",
        })?;
        let rows = data.nrows();
        let mut rng = self.rng.lock();
        let picks: Vec<usize> = (0..n).map(|_| rng.usize(..rows)).collect();
        Ok(data.select_rows(picks.iter()))
    }

    fn clone_model(&self) -> Box<dyn StochasticModel> {
        Box::new(Self::with_rng_seed(self.seed))
    }
}
