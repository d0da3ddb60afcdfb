//! Seeding helpers and the bridge from `fastrand` to the `rand` traits that
//! `statrs` samplers are written against.

use rand::RngCore;
use rand::distributions::Distribution;
use statrs::distribution::Normal;

/// Creates an RNG from an optional seed.
pub(crate) fn seeded(seed: Option<u64>) -> fastrand::Rng {
    seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed)
}

/// Exposes a borrowed `fastrand::Rng` as a `rand` 0.8 generator.
pub(crate) struct RandAdapter<'a>(pub(crate) &'a mut fastrand::Rng);

impl RngCore for RandAdapter<'_> {
    fn next_u32(&mut self) -> u32 {
        self.0.u32(..)
    }

    fn next_u64(&mut self) -> u64 {
        self.0.u64(..)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.fill(dest);
        Ok(())
    }
}

/// Draws one value from a `rand` distribution using a `fastrand` generator.
#[inline]
pub(crate) fn sample<T, D: Distribution<T>>(dist: &D, rng: &mut fastrand::Rng) -> T {
    dist.sample(&mut RandAdapter(rng))
}

/// Draws one standard normal variate.
#[inline]
pub(crate) fn standard_normal(rng: &mut fastrand::Rng) -> f64 {
    sample(&Normal::standard(), rng)
}
