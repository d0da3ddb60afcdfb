//! Choosing the number of mixture components.
//!
//! Candidate counts are scored by clustering the data with k-means and
//! measuring the silhouette of the result. The search walks the candidates in
//! increasing order and stops on a plateau: once `patience` consecutive
//! candidates fail to beat the best score. A clustering failure also stops the
//! search, keeping whatever was best so far.

use core::ops::Range;

use nalgebra::DMatrix;

use super::MixtureConfig;
use super::kmeans::KMeans;
use super::silhouette::silhouette_score;
use crate::error::ClusteringError;

/// Why a component-count search ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchStop {
    /// Every candidate was scored.
    Exhausted,
    /// `patience` consecutive candidates did not improve the best score.
    Plateau,
    /// Clustering could not produce a partition for the next candidate.
    StructuralFailure,
}

/// Outcome of a component-count search.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentSearch {
    /// The chosen number of components (1 when nothing beat a zero score).
    pub best: usize,
    /// Score of the chosen count; `0.0` when `best == 1`.
    pub best_score: f64,
    /// Every candidate that was scored, with its score, in search order.
    pub evaluated: Vec<(usize, f64)>,
    /// Why the search ended.
    pub stop: SearchStop,
}

/// Candidate component counts for `rows` samples: `2..floor(sqrt(rows / 2))`.
///
/// The range is empty for fewer than 18 rows.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn candidate_range(rows: usize) -> Range<usize> {
    let upper = (rows as f64 / 2.0).sqrt().floor() as usize;
    2..upper.max(2)
}

/// Walks `candidates` in order, keeping the best-scoring count.
///
/// A candidate improves on the best only with a strictly larger score; the
/// initial best is one component with score `0`. The search stops after
/// `patience` consecutive non-improving candidates, or at the first candidate
/// whose score is an error.
///
/// # Examples
///
/// ```
/// use stochastic_models::mixture::{SearchStop, search_component_count};
///
/// let scores = [0.3, 0.6, 0.5, 0.4, 0.2, 0.9];
/// let search = search_component_count(2..8, 3, |k| Ok(scores[k - 2]));
/// assert_eq!(search.best, 3);
/// assert_eq!(search.stop, SearchStop::Plateau);
/// assert_eq!(search.evaluated.len(), 5);
/// ```
pub fn search_component_count<I, F>(candidates: I, patience: usize, mut score: F) -> ComponentSearch
where
    I: IntoIterator<Item = usize>,
    F: FnMut(usize) -> Result<f64, ClusteringError>,
{
    let mut search = ComponentSearch {
        best: 1,
        best_score: 0.0,
        evaluated: Vec::new(),
        stop: SearchStop::Exhausted,
    };
    let mut stagnant = 0;

    for k in candidates {
        let value = match score(k) {
            Ok(value) => value,
            Err(_) => {
                trace_debug!(components = k, "clustering failed, keeping best so far");
                search.stop = SearchStop::StructuralFailure;
                break;
            }
        };
        trace_debug!(components = k, score = value, "scored component count");
        search.evaluated.push((k, value));

        if value > search.best_score {
            search.best = k;
            search.best_score = value;
            stagnant = 0;
        } else {
            stagnant += 1;
        }
        if stagnant >= patience {
            search.stop = SearchStop::Plateau;
            break;
        }
    }

    trace_info!(best = search.best, stop = ?search.stop, "component count selected");
    search
}

/// Runs the k-means / silhouette search over [`candidate_range`] for `data`.
pub(crate) fn select_component_count(
    data: &DMatrix<f64>,
    config: &MixtureConfig,
    rng: &mut fastrand::Rng,
) -> ComponentSearch {
    let kmeans = |k| {
        KMeans::new(k)
            .n_init(config.kmeans_restarts)
            .max_iter(config.kmeans_max_iter)
    };
    search_component_count(candidate_range(data.nrows()), config.plateau_patience, |k| {
        let fit = kmeans(k).fit(data, rng)?;
        silhouette_score(data, &fit.labels, config.silhouette_sample_size, rng)
    })
}
