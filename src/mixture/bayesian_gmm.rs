//! Variational Bayesian Gaussian mixture with full covariances.
//!
//! Weights follow a truncated Dirichlet-process (stick-breaking) prior, means
//! a Gaussian prior centred on the data mean, and precisions a Wishart prior
//! built from the sample covariance. Fitting alternates an E-step computing
//! log-responsibilities under the expected parameters and an M-step updating
//! the variational posteriors, until the mean log-normaliser stops moving.

use core::f64::consts::{LN_2, TAU};

use nalgebra::{Cholesky, DMatrix, DVector};
use statrs::function::gamma::digamma;

use super::kmeans::KMeans;
use crate::error::{Error, Result};
use crate::rng_util::standard_normal;

/// Fitting configuration for a variational Gaussian mixture.
///
/// # Examples
///
/// ```
/// use nalgebra::DMatrix;
/// use stochastic_models::mixture::BayesianGaussianMixture;
///
/// let data = DMatrix::from_column_slice(8, 1, &[0.0, 0.2, 0.1, 0.3, 9.0, 9.2, 9.1, 9.3]);
/// let mut rng = fastrand::Rng::with_seed(1);
/// let mixture = BayesianGaussianMixture::new(2).fit(&data, &mut rng).unwrap();
/// assert_eq!(mixture.n_components(), 2);
/// assert_eq!(mixture.sample(5, &mut rng).shape(), (5, 1));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct BayesianGaussianMixture {
    n_components: usize,
    max_iter: usize,
    tol: f64,
    reg_covar: f64,
}

/// A fitted mixture: component weights, means and covariances.
#[derive(Clone, Debug)]
pub struct FittedMixture {
    weights: Vec<f64>,
    means: Vec<DVector<f64>>,
    covariances: Vec<DMatrix<f64>>,
    /// Lower Cholesky factors of `covariances`.
    factors: Vec<DMatrix<f64>>,
    converged: bool,
    n_iter: usize,
}

/// Prior hyper-parameters derived from the data.
struct Priors {
    weight_concentration: f64,
    mean_precision: f64,
    mean: DVector<f64>,
    dof: f64,
    covariance: DMatrix<f64>,
}

/// Variational posterior parameters.
struct Posterior {
    /// Stick-breaking Beta parameters `(a_k, b_k)`.
    concentration: Vec<(f64, f64)>,
    mean_precision: Vec<f64>,
    means: Vec<DVector<f64>>,
    dof: Vec<f64>,
    covariances: Vec<DMatrix<f64>>,
    factors: Vec<DMatrix<f64>>,
}

impl BayesianGaussianMixture {
    /// Creates a configuration with `n_components` components (at least one),
    /// 1000 iterations, tolerance `1e-3` and covariance regularisation `1e-6`.
    #[must_use]
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components: n_components.max(1),
            max_iter: 1000,
            tol: 1e-3,
            reg_covar: 1e-6,
        }
    }

    /// Sets the iteration cap.
    #[must_use]
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    /// Sets the convergence tolerance on the mean log-normaliser.
    #[must_use]
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the value added to covariance diagonals.
    #[must_use]
    pub fn reg_covar(mut self, reg_covar: f64) -> Self {
        self.reg_covar = reg_covar;
        self
    }

    /// Fits the mixture to the rows of `data`.
    ///
    /// Responsibilities start from a k-means partition, or from random ones
    /// when k-means cannot find enough distinct points.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySamples`] for empty input,
    /// [`Error::InvalidConfig`] when there are fewer rows than components and
    /// [`Error::SingularCovariance`] if a covariance loses positive
    /// definiteness.
    pub fn fit(&self, data: &DMatrix<f64>, rng: &mut fastrand::Rng) -> Result<FittedMixture> {
        let (n, _) = data.shape();
        if n == 0 || data.ncols() == 0 {
            return Err(Error::EmptySamples);
        }
        if n < self.n_components {
            return Err(Error::InvalidConfig(
                "mixture needs at least as many samples as components",
            ));
        }

        let priors = self.priors(data);
        let mut posterior = self.m_step(&priors, data, &self.initial_responsibilities(data, rng))?;

        let mut lower_bound = f64::NEG_INFINITY;
        let mut converged = false;
        let mut n_iter = 0;
        for iter in 1..=self.max_iter {
            n_iter = iter;
            let previous = lower_bound;
            let (log_norm, responsibilities) = e_step(&posterior, data)?;
            posterior = self.m_step(&priors, data, &responsibilities)?;
            lower_bound = log_norm;
            if (lower_bound - previous).abs() < self.tol {
                converged = true;
                break;
            }
        }
        trace_debug!(
            components = self.n_components,
            n_iter,
            converged,
            lower_bound,
            "variational mixture fitted"
        );

        Ok(FittedMixture {
            weights: stick_breaking_weights(&posterior.concentration),
            means: posterior.means,
            covariances: posterior.covariances,
            factors: posterior.factors,
            converged,
            n_iter,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn priors(&self, data: &DMatrix<f64>) -> Priors {
        let (n, d) = data.shape();
        let mean = data.row_mean().transpose();
        let covariance = if n > 1 {
            let centred = DMatrix::from_fn(n, d, |i, j| data[(i, j)] - mean[j]);
            centred.transpose() * &centred / (n - 1) as f64
        } else {
            DMatrix::identity(d, d)
        };
        Priors {
            weight_concentration: 1.0 / self.n_components as f64,
            mean_precision: 1.0,
            mean,
            dof: d as f64,
            covariance,
        }
    }

    fn initial_responsibilities(&self, data: &DMatrix<f64>, rng: &mut fastrand::Rng) -> DMatrix<f64> {
        let (n, k) = (data.nrows(), self.n_components);
        match KMeans::new(k).n_init(1).fit(data, rng) {
            Ok(fit) => DMatrix::from_fn(n, k, |i, c| if fit.labels[i] == c { 1.0 } else { 0.0 }),
            Err(_) => {
                let mut resp = DMatrix::from_fn(n, k, |_, _| rng.f64());
                for mut row in resp.row_iter_mut() {
                    let total = row.sum();
                    row /= total;
                }
                resp
            }
        }
    }

    /// Updates the variational posterior from responsibilities.
    #[allow(clippy::cast_precision_loss)]
    fn m_step(&self, priors: &Priors, data: &DMatrix<f64>, resp: &DMatrix<f64>) -> Result<Posterior> {
        let (n, d) = data.shape();
        let k = self.n_components;
        let counts: Vec<f64> = (0..k)
            .map(|c| resp.column(c).sum() + 10.0 * f64::EPSILON)
            .collect();
        let weighted_sums = resp.transpose() * data;

        let mut tail = 0.0;
        let mut concentration = vec![(0.0, 0.0); k];
        for c in (0..k).rev() {
            concentration[c] = (1.0 + counts[c], priors.weight_concentration + tail);
            tail += counts[c];
        }

        let mut posterior = Posterior {
            concentration,
            mean_precision: Vec::with_capacity(k),
            means: Vec::with_capacity(k),
            dof: Vec::with_capacity(k),
            covariances: Vec::with_capacity(k),
            factors: Vec::with_capacity(k),
        };

        for (c, &nk) in counts.iter().enumerate() {
            let centre: DVector<f64> = weighted_sums.row(c).transpose() / nk;
            let centred = DMatrix::from_fn(n, d, |i, j| data[(i, j)] - centre[j]);
            let scaled = DMatrix::from_fn(n, d, |i, j| resp[(i, c)] * centred[(i, j)]);
            let scatter = scaled.transpose() * &centred / nk
                + DMatrix::identity(d, d) * self.reg_covar;

            let beta = priors.mean_precision + nk;
            let mean = (&priors.mean * priors.mean_precision + &centre * nk) / beta;
            let dof = priors.dof + nk;
            let diff = &centre - &priors.mean;
            let covariance = (&priors.covariance
                + scatter * nk
                + &diff * diff.transpose() * (nk * priors.mean_precision / beta))
                / dof;
            let factor = Cholesky::new(covariance.clone())
                .ok_or(Error::SingularCovariance { component: c })?
                .l();

            posterior.mean_precision.push(beta);
            posterior.means.push(mean);
            posterior.dof.push(dof);
            posterior.covariances.push(covariance);
            posterior.factors.push(factor);
        }
        Ok(posterior)
    }
}

/// Returns the mean log-normaliser and the responsibilities.
#[allow(clippy::cast_precision_loss)]
fn e_step(posterior: &Posterior, data: &DMatrix<f64>) -> Result<(f64, DMatrix<f64>)> {
    let (n, d) = data.shape();
    let k = posterior.means.len();
    let d_f = d as f64;

    let mut stick = 0.0;
    let log_weights: Vec<f64> = posterior
        .concentration
        .iter()
        .map(|&(a, b)| {
            let total = digamma(a + b);
            let log_weight = digamma(a) - total + stick;
            stick += digamma(b) - total;
            log_weight
        })
        .collect();

    let mut weighted = DMatrix::<f64>::zeros(n, k);
    for c in 0..k {
        let factor = &posterior.factors[c];
        let mean = &posterior.means[c];
        let dof = posterior.dof[c];
        let centred = DMatrix::from_fn(d, n, |j, i| data[(i, j)] - mean[j]);
        let whitened = factor
            .solve_lower_triangular(&centred)
            .ok_or(Error::SingularCovariance { component: c })?;
        let log_det: f64 = factor.diagonal().iter().map(|v| v.ln()).sum();
        let log_lambda: f64 = d_f * LN_2
            + (0..d)
                .map(|i| digamma(0.5 * (dof - i as f64)))
                .sum::<f64>();
        let offset = -0.5 * d_f * TAU.ln() - log_det - 0.5 * d_f * dof.ln()
            + 0.5 * (log_lambda - d_f / posterior.mean_precision[c])
            + log_weights[c];
        for i in 0..n {
            weighted[(i, c)] = offset - 0.5 * whitened.column(i).norm_squared();
        }
    }

    let mut total_norm = 0.0;
    let mut resp = weighted;
    for mut row in resp.row_iter_mut() {
        let max = row.max();
        let norm = max + row.iter().map(|v| (v - max).exp()).sum::<f64>().ln();
        total_norm += norm;
        row.apply(|v| *v = (*v - norm).exp());
    }
    Ok((total_norm / n as f64, resp))
}

/// Expected weights under the stick-breaking posterior, normalised.
fn stick_breaking_weights(concentration: &[(f64, f64)]) -> Vec<f64> {
    let mut remaining = 1.0;
    let mut weights: Vec<f64> = concentration
        .iter()
        .map(|&(a, b)| {
            let w = remaining * a / (a + b);
            remaining *= b / (a + b);
            w
        })
        .collect();
    let total: f64 = weights.iter().sum();
    weights.iter_mut().for_each(|w| *w /= total);
    weights
}

impl FittedMixture {
    /// Mixing weights, summing to one.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Component means.
    #[must_use]
    pub fn means(&self) -> &[DVector<f64>] {
        &self.means
    }

    /// Component covariance matrices.
    #[must_use]
    pub fn covariances(&self) -> &[DMatrix<f64>] {
        &self.covariances
    }

    /// Number of components.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.weights.len()
    }

    /// Dimension of each sample.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.means.first().map_or(0, DVector::len)
    }

    /// Whether fitting stopped on the tolerance rather than the iteration cap.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Iterations performed.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Draws `n` samples, one per row.
    pub fn sample(&self, n: usize, rng: &mut fastrand::Rng) -> DMatrix<f64> {
        let d = self.n_features();
        let mut out = DMatrix::<f64>::zeros(n, d);
        for i in 0..n {
            let c = self.pick_component(rng);
            let z = DVector::from_fn(d, |_, _| standard_normal(rng));
            let x = &self.means[c] + &self.factors[c] * z;
            out.row_mut(i).copy_from(&x.transpose());
        }
        out
    }

    fn pick_component(&self, rng: &mut fastrand::Rng) -> usize {
        let mut u = rng.f64();
        for (c, &w) in self.weights.iter().enumerate() {
            if u < w {
                return c;
            }
            u -= w;
        }
        self.weights.len() - 1
    }
}

#[cfg(test)]
#[allow(clippy::cast_precision_loss)]
mod tests {
    use super::*;

    fn two_groups(n_per: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = fastrand::Rng::with_seed(seed);
        let values: Vec<f64> = (0..2 * n_per)
            .map(|i| if i < n_per { -5.0 } else { 5.0 } + 0.5 * standard_normal(&mut rng))
            .collect();
        DMatrix::from_column_slice(2 * n_per, 1, &values)
    }

    #[test]
    fn recovers_two_separated_components() {
        let data = two_groups(200, 1);
        let mut rng = fastrand::Rng::with_seed(2);
        let mixture = BayesianGaussianMixture::new(2).fit(&data, &mut rng).unwrap();
        assert!(mixture.converged());
        let mut means: Vec<f64> = mixture.means().iter().map(|m| m[0]).collect();
        means.sort_by(f64::total_cmp);
        assert!((means[0] + 5.0).abs() < 0.3, "means = {means:?}");
        assert!((means[1] - 5.0).abs() < 0.3, "means = {means:?}");
        for w in mixture.weights() {
            assert!((w - 0.5).abs() < 0.05, "weights = {:?}", mixture.weights());
        }
        // The Wishart prior pulls the covariance above the within-group
        // variance of 0.25.
        for cov in mixture.covariances() {
            assert!((0.2..1.0).contains(&cov[(0, 0)]), "cov = {cov}");
        }
    }

    #[test]
    fn weights_sum_to_one() {
        let data = two_groups(50, 3);
        let mut rng = fastrand::Rng::with_seed(4);
        let mixture = BayesianGaussianMixture::new(4).fit(&data, &mut rng).unwrap();
        let total: f64 = mixture.weights().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(mixture.n_components(), 4);
    }

    #[test]
    fn samples_follow_the_fitted_mixture() {
        let data = two_groups(200, 5);
        let mut rng = fastrand::Rng::with_seed(6);
        let mixture = BayesianGaussianMixture::new(2).fit(&data, &mut rng).unwrap();
        let samples = mixture.sample(4000, &mut rng);
        assert_eq!(samples.shape(), (4000, 1));
        let positive = samples.iter().filter(|&&v| v > 0.0).count() as f64 / 4000.0;
        assert!((positive - 0.5).abs() < 0.05, "positive share = {positive}");
        assert!(samples.iter().all(|v| v.abs() < 10.0));
    }

    #[test]
    fn multivariate_covariance_is_recovered() {
        let mut rng = fastrand::Rng::with_seed(7);
        let values: Vec<f64> = (0..500)
            .flat_map(|_| {
                let a = standard_normal(&mut rng);
                let b = standard_normal(&mut rng);
                [a, 0.8 * a + 0.6 * b]
            })
            .collect();
        let data = DMatrix::from_row_slice(500, 2, &values);
        let mixture = BayesianGaussianMixture::new(1).fit(&data, &mut rng).unwrap();
        let cov = &mixture.covariances()[0];
        assert!((cov[(0, 1)] - 0.8).abs() < 0.15, "cov = {cov}");
        assert_eq!(mixture.n_features(), 2);
    }

    #[test]
    fn constant_data_still_fits() {
        let data = DMatrix::from_element(10, 1, 3.0);
        let mut rng = fastrand::Rng::with_seed(8);
        let mixture = BayesianGaussianMixture::new(1).fit(&data, &mut rng).unwrap();
        let samples = mixture.sample(20, &mut rng);
        assert!(samples.iter().all(|v| (v - 3.0).abs() < 0.1));
    }

    #[test]
    fn input_validation() {
        let mut rng = fastrand::Rng::with_seed(9);
        let empty = DMatrix::<f64>::zeros(0, 1);
        assert!(matches!(
            BayesianGaussianMixture::new(1).fit(&empty, &mut rng),
            Err(Error::EmptySamples)
        ));
        let tiny = DMatrix::from_column_slice(2, 1, &[1.0, 2.0]);
        assert!(matches!(
            BayesianGaussianMixture::new(3).fit(&tiny, &mut rng),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn stick_breaking_matches_closed_form() {
        let weights = stick_breaking_weights(&[(3.0, 1.0), (1.0, 1.0)]);
        // 0.75, then 0.25 * 0.5 = 0.125, normalised by 0.875.
        assert!((weights[0] - 0.75 / 0.875).abs() < 1e-12);
        assert!((weights[1] - 0.125 / 0.875).abs() < 1e-12);
    }
}
