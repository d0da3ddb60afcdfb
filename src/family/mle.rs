//! Maximum-likelihood fitting by Nelder-Mead simplex search.
//!
//! Mirrors the classic downhill-simplex recipe: an initial simplex built by
//! perturbing each coordinate of the starting point by 5% (or 0.00025 for
//! zero coordinates), reflection/expansion/contraction/shrink steps, and a
//! joint tolerance on simplex size and objective spread.

use super::ContinuousFamily;
use crate::error::FitError;
use crate::samples::min_max;

/// Tuning knobs for [`minimize`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct NelderMeadOptions {
    /// Iteration cap per free coordinate.
    pub(crate) iterations_per_dim: usize,
    /// Absolute tolerance on simplex vertex spread.
    pub(crate) xtol: f64,
    /// Absolute tolerance on objective spread across vertices.
    pub(crate) ftol: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            iterations_per_dim: 200,
            xtol: 1e-4,
            ftol: 1e-4,
        }
    }
}

/// Result of a simplex search: the best vertex found, whether or not the
/// tolerances were met before the iteration cap.
#[derive(Debug, Clone)]
pub(crate) struct Minimum {
    pub(crate) x: Vec<f64>,
    pub(crate) value: f64,
}

/// Minimises `f` starting from `x0`. NaN objective values count as `+inf`.
pub(crate) fn minimize<F>(mut f: F, x0: &[f64], options: NelderMeadOptions) -> Minimum
where
    F: FnMut(&[f64]) -> f64,
{
    const RHO: f64 = 1.0;
    const CHI: f64 = 2.0;
    const PSI: f64 = 0.5;
    const SIGMA: f64 = 0.5;

    let mut eval = |x: &[f64]| {
        let v = f(x);
        if v.is_nan() { f64::INFINITY } else { v }
    };

    let n = x0.len();
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.to_vec());
    for k in 0..n {
        let mut y = x0.to_vec();
        y[k] = if y[k] == 0.0 { 0.000_25 } else { 1.05 * y[k] };
        simplex.push(y);
    }
    let mut values: Vec<f64> = simplex.iter().map(|x| eval(x)).collect();
    sort_simplex(&mut simplex, &mut values);

    let max_iter = options.iterations_per_dim * n.max(1);

    for _ in 0..max_iter {
        let x_spread = simplex[1..]
            .iter()
            .flat_map(|v| v.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
            .fold(0.0_f64, f64::max);
        let f_spread = values[1..]
            .iter()
            .map(|v| (v - values[0]).abs())
            .fold(0.0_f64, f64::max);
        if x_spread <= options.xtol && f_spread <= options.ftol {
            break;
        }

        let centroid = centroid(&simplex[..n]);
        let worst = simplex[n].clone();
        let along = |t: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&worst)
                .map(|(c, w)| (1.0 + t) * c - t * w)
                .collect()
        };

        let xr = along(RHO);
        let fxr = eval(&xr);
        let mut shrink = false;

        if fxr < values[0] {
            let xe = along(RHO * CHI);
            let fxe = eval(&xe);
            if fxe < fxr {
                simplex[n] = xe;
                values[n] = fxe;
            } else {
                simplex[n] = xr;
                values[n] = fxr;
            }
        } else if fxr < values[n - 1] {
            simplex[n] = xr;
            values[n] = fxr;
        } else if fxr < values[n] {
            let xc = along(PSI * RHO);
            let fxc = eval(&xc);
            if fxc <= fxr {
                simplex[n] = xc;
                values[n] = fxc;
            } else {
                shrink = true;
            }
        } else {
            let xcc = along(-PSI);
            let fxcc = eval(&xcc);
            if fxcc < values[n] {
                simplex[n] = xcc;
                values[n] = fxcc;
            } else {
                shrink = true;
            }
        }

        if shrink {
            let best = simplex[0].clone();
            for j in 1..=n {
                for (x, b) in simplex[j].iter_mut().zip(&best) {
                    *x = b + SIGMA * (*x - b);
                }
                values[j] = eval(&simplex[j]);
            }
        }

        sort_simplex(&mut simplex, &mut values);
    }

    Minimum {
        x: simplex.swap_remove(0),
        value: values[0],
    }
}

#[allow(clippy::cast_precision_loss)]
fn centroid(points: &[Vec<f64>]) -> Vec<f64> {
    let n = points.len() as f64;
    let mut c = vec![0.0; points[0].len()];
    for p in points {
        for (ci, pi) in c.iter_mut().zip(p) {
            *ci += pi;
        }
    }
    c.iter_mut().for_each(|ci| *ci /= n);
    c
}

fn sort_simplex(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    *simplex = order.iter().map(|&i| simplex[i].clone()).collect();
    *values = order.iter().map(|&i| values[i]).collect();
}

/// Rejects inputs no family can be fitted to.
pub(crate) fn check_samples(data: &[f64]) -> Result<(), FitError> {
    if data.is_empty() {
        return Err(FitError::Empty);
    }
    if data.iter().any(|x| !x.is_finite()) {
        return Err(FitError::NonFinite);
    }
    Ok(())
}

/// Like [`check_samples`], additionally requiring a positive spread.
pub(crate) fn check_continuous_samples(data: &[f64]) -> Result<(), FitError> {
    check_samples(data)?;
    let (lo, hi) = min_max(data);
    if hi - lo <= 0.0 {
        return Err(FitError::Degenerate);
    }
    Ok(())
}

/// Negative log-likelihood of `data` under `[shapes..., loc, scale]`.
pub(crate) fn negative_log_likelihood<F>(family: &F, data: &[f64], params: &[f64]) -> f64
where
    F: ContinuousFamily + ?Sized,
{
    let (shapes, loc_scale) = params.split_at(params.len() - 2);
    let (loc, scale) = (loc_scale[0], loc_scale[1]);
    if !(scale > 0.0 && scale.is_finite() && loc.is_finite()) || !family.valid_shapes(shapes) {
        return f64::INFINITY;
    }
    let log_scale = scale.ln();
    let mut total = 0.0;
    for &x in data {
        let lp = family.log_pdf_standard((x - loc) / scale, shapes);
        if lp == f64::NEG_INFINITY || lp.is_nan() {
            return f64::INFINITY;
        }
        total -= lp - log_scale;
    }
    total
}

/// Generic continuous MLE: simplex search from the family's initial guess.
pub(crate) fn fit_continuous<F>(family: &F, data: &[f64]) -> Result<Vec<f64>, FitError>
where
    F: ContinuousFamily + ?Sized,
{
    check_continuous_samples(data)?;
    let start = family.initial_guess(data);
    if !negative_log_likelihood(family, data, &start).is_finite() {
        return Err(FitError::OutsideSupport);
    }
    let minimum = minimize(
        |params| negative_log_likelihood(family, data, params),
        &start,
        NelderMeadOptions::default(),
    );
    if !minimum.value.is_finite() || minimum.x.iter().any(|p| !p.is_finite()) {
        return Err(FitError::NotConverged);
    }
    Ok(minimum.x)
}
