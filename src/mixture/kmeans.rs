//! K-means clustering.
//!
//! Lloyd iterations from a k-means++ seeding, restarted several times and
//! keeping the partition with the lowest inertia.

use std::collections::HashSet;

use nalgebra::{DMatrix, RowDVector};

use crate::error::ClusteringError;

/// K-means configuration.
///
/// # Examples
///
/// ```
/// use nalgebra::DMatrix;
/// use stochastic_models::mixture::KMeans;
///
/// let data = DMatrix::from_row_slice(6, 1, &[0.0, 0.1, 0.2, 10.0, 10.1, 10.2]);
/// let mut rng = fastrand::Rng::with_seed(1);
/// let fit = KMeans::new(2).fit(&data, &mut rng).unwrap();
/// assert_eq!(fit.labels[0], fit.labels[2]);
/// assert_ne!(fit.labels[0], fit.labels[3]);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct KMeans {
    n_clusters: usize,
    max_iter: usize,
    n_init: usize,
    tol: f64,
}

/// A fitted partition.
#[derive(Clone, Debug)]
pub struct KMeansFit {
    /// Cluster centres, one row per cluster.
    pub centroids: DMatrix<f64>,
    /// Cluster index of every input row.
    pub labels: Vec<usize>,
    /// Sum of squared distances of rows to their centre.
    pub inertia: f64,
    /// Lloyd iterations used by the winning restart.
    pub n_iter: usize,
}

impl KMeans {
    /// Creates a k-means configuration with 300 iterations, 10 restarts and a
    /// relative tolerance of `1e-4`.
    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            n_init: 10,
            tol: 1e-4,
        }
    }

    /// Sets the Lloyd iteration cap per restart.
    #[must_use]
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    /// Sets the number of restarts.
    #[must_use]
    pub fn n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    /// Partitions the rows of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ClusteringError::TooFewDistinctPoints`] when the data has
    /// fewer distinct rows than requested clusters (including zero clusters
    /// requested on empty data).
    pub fn fit(
        &self,
        data: &DMatrix<f64>,
        rng: &mut fastrand::Rng,
    ) -> Result<KMeansFit, ClusteringError> {
        let distinct = distinct_rows(data);
        if self.n_clusters == 0 || distinct < self.n_clusters {
            return Err(ClusteringError::TooFewDistinctPoints {
                requested: self.n_clusters,
                distinct,
            });
        }

        let tol = self.tol * mean_column_variance(data);
        let mut best: Option<KMeansFit> = None;
        for _ in 0..self.n_init {
            let fit = self.lloyd(data, plus_plus_seeding(data, self.n_clusters, rng), tol);
            if best.as_ref().is_none_or(|b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }
        best.ok_or(ClusteringError::TooFewDistinctPoints {
            requested: self.n_clusters,
            distinct,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn lloyd(&self, data: &DMatrix<f64>, mut centroids: DMatrix<f64>, tol: f64) -> KMeansFit {
        let (n, d) = data.shape();
        let k = self.n_clusters;
        let mut labels = vec![0; n];
        let mut n_iter = 0;

        for iter in 1..=self.max_iter {
            n_iter = iter;
            let distances = assign(data, &centroids, &mut labels);

            let mut sums = DMatrix::<f64>::zeros(k, d);
            let mut counts = vec![0_usize; k];
            for (i, &label) in labels.iter().enumerate() {
                let mut row = sums.row_mut(label);
                row += data.row(i);
                counts[label] += 1;
            }

            // Empty clusters take over the points farthest from their centres.
            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by(|&a, &b| distances[b].total_cmp(&distances[a]));
            let mut donors = order.into_iter();
            for c in 0..k {
                if counts[c] > 0 {
                    continue;
                }
                if let Some(i) = donors.find(|&i| counts[labels[i]] > 1) {
                    let mut from = sums.row_mut(labels[i]);
                    from -= data.row(i);
                    counts[labels[i]] -= 1;
                    labels[i] = c;
                    sums.row_mut(c).copy_from(&data.row(i));
                    counts[c] = 1;
                }
            }

            let mut updated = centroids.clone();
            for c in 0..k {
                if counts[c] > 0 {
                    let mean: RowDVector<f64> = sums.row(c) / counts[c] as f64;
                    updated.row_mut(c).copy_from(&mean);
                }
            }
            let shift = (&updated - &centroids).norm_squared();
            centroids = updated;
            if shift <= tol {
                break;
            }
        }

        let distances = assign(data, &centroids, &mut labels);
        KMeansFit {
            centroids,
            labels,
            inertia: distances.iter().sum(),
            n_iter,
        }
    }
}

/// Assigns every row to its nearest centre; returns the squared distances.
fn assign(data: &DMatrix<f64>, centroids: &DMatrix<f64>, labels: &mut [usize]) -> Vec<f64> {
    (0..data.nrows())
        .map(|i| {
            let (label, dist) = (0..centroids.nrows())
                .map(|c| (c, squared_distance(data, i, centroids, c)))
                .fold((0, f64::INFINITY), |best, cur| {
                    if cur.1 < best.1 { cur } else { best }
                });
            labels[i] = label;
            dist
        })
        .collect()
}

pub(crate) fn squared_distance(a: &DMatrix<f64>, i: usize, b: &DMatrix<f64>, j: usize) -> f64 {
    a.row(i)
        .iter()
        .zip(b.row(j).iter())
        .map(|(p, q)| (p - q).powi(2))
        .sum()
}

/// k-means++: each new centre is drawn with probability proportional to the
/// squared distance to the nearest centre chosen so far.
fn plus_plus_seeding(data: &DMatrix<f64>, k: usize, rng: &mut fastrand::Rng) -> DMatrix<f64> {
    let n = data.nrows();
    let mut centroids = DMatrix::<f64>::zeros(k, data.ncols());
    centroids.row_mut(0).copy_from(&data.row(rng.usize(..n)));
    let mut closest: Vec<f64> = (0..n)
        .map(|i| squared_distance(data, i, &centroids, 0))
        .collect();

    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.f64() * total;
            closest
                .iter()
                .position(|&w| {
                    target -= w;
                    target < 0.0
                })
                .unwrap_or_else(|| closest.iter().rposition(|&w| w > 0.0).unwrap_or(n - 1))
        } else {
            rng.usize(..n)
        };
        centroids.row_mut(c).copy_from(&data.row(chosen));
        for (i, best) in closest.iter_mut().enumerate() {
            *best = best.min(squared_distance(data, i, &centroids, c));
        }
    }
    centroids
}

/// Number of distinct rows, comparing values bit for bit.
pub(crate) fn distinct_rows(data: &DMatrix<f64>) -> usize {
    (0..data.nrows())
        .map(|i| data.row(i).iter().map(|v| v.to_bits()).collect::<Vec<u64>>())
        .collect::<HashSet<_>>()
        .len()
}

#[allow(clippy::cast_precision_loss)]
fn mean_column_variance(data: &DMatrix<f64>) -> f64 {
    if data.nrows() == 0 || data.ncols() == 0 {
        return 0.0;
    }
    data.column_iter().map(|col| col.variance()).sum::<f64>() / data.ncols() as f64
}
