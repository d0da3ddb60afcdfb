//! Silhouette coefficient of a labelled partition.

use std::collections::HashMap;

use nalgebra::DMatrix;

use super::kmeans::squared_distance;
use crate::error::ClusteringError;

/// Mean silhouette coefficient of `labels` over the rows of `data`, in
/// `[-1, 1]`; higher means tighter, better separated clusters.
///
/// When `data` has more than `sample_size` rows the score is computed on a
/// random subset of `sample_size` rows. Points alone in their cluster score
/// `0`.
///
/// # Errors
///
/// Returns [`ClusteringError::InvalidLabelCount`] unless the (sampled)
/// labelling has between 2 and `rows - 1` distinct labels.
///
/// # Panics
///
/// Panics if `labels` is shorter than the number of rows in `data`.
#[allow(clippy::cast_precision_loss)]
pub fn silhouette_score(
    data: &DMatrix<f64>,
    labels: &[usize],
    sample_size: usize,
    rng: &mut fastrand::Rng,
) -> Result<f64, ClusteringError> {
    let n = data.nrows();
    let mut indices: Vec<usize> = (0..n).collect();
    if n > sample_size {
        rng.shuffle(&mut indices);
        indices.truncate(sample_size);
    }
    let m = indices.len();

    let mut cluster_of: HashMap<usize, usize> = HashMap::new();
    let clusters: Vec<usize> = indices
        .iter()
        .map(|&i| {
            let next = cluster_of.len();
            *cluster_of.entry(labels[i]).or_insert(next)
        })
        .collect();
    let n_labels = cluster_of.len();
    if n_labels < 2 || n_labels + 1 > m {
        return Err(ClusteringError::InvalidLabelCount {
            labels: n_labels,
            max: m.saturating_sub(1),
        });
    }

    let mut sizes = vec![0_usize; n_labels];
    for &c in &clusters {
        sizes[c] += 1;
    }

    let mut total = 0.0;
    let mut sums = vec![0.0; n_labels];
    for (a, &i) in indices.iter().enumerate() {
        sums.iter_mut().for_each(|s| *s = 0.0);
        for (b, &j) in indices.iter().enumerate() {
            if a != b {
                sums[clusters[b]] += squared_distance(data, i, data, j).sqrt();
            }
        }
        let own = clusters[a];
        if sizes[own] == 1 {
            continue;
        }
        let intra = sums[own] / (sizes[own] - 1) as f64;
        let nearest = (0..n_labels)
            .filter(|&c| c != own)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let spread = intra.max(nearest);
        if spread > 0.0 {
            total += (nearest - intra) / spread;
        }
    }
    Ok(total / m as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_separated_clusters_score_near_one() {
        let data = DMatrix::from_row_slice(6, 1, &[0.0, 0.1, 0.2, 10.0, 10.1, 10.2]);
        let mut rng = fastrand::Rng::with_seed(1);
        let score = silhouette_score(&data, &[0, 0, 0, 1, 1, 1], 5000, &mut rng).unwrap();
        assert!(score > 0.95, "score = {score}");
    }

    #[test]
    fn matches_hand_computed_value() {
        // Points 0, 1 | 4: a(0) = 1, b(0) = 4, s = 0.75; a(1) = 1, b(1) = 3,
        // s = 2/3; the singleton scores 0.
        let data = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 4.0]);
        let mut rng = fastrand::Rng::with_seed(1);
        let score = silhouette_score(&data, &[7, 7, 3], 5000, &mut rng).unwrap();
        let expected = (0.75 + 2.0 / 3.0) / 3.0;
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn mislabelled_partition_scores_negative() {
        let data = DMatrix::from_row_slice(4, 1, &[0.0, 0.1, 10.0, 10.1]);
        let mut rng = fastrand::Rng::with_seed(1);
        let score = silhouette_score(&data, &[0, 1, 0, 1], 5000, &mut rng).unwrap();
        assert!(score < 0.0);
    }

    #[test]
    fn label_count_must_be_in_range() {
        let data = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 2.0]);
        let mut rng = fastrand::Rng::with_seed(1);
        assert_eq!(
            silhouette_score(&data, &[0, 0, 0], 5000, &mut rng),
            Err(ClusteringError::InvalidLabelCount { labels: 1, max: 2 })
        );
        assert_eq!(
            silhouette_score(&data, &[0, 1, 2], 5000, &mut rng),
            Err(ClusteringError::InvalidLabelCount { labels: 3, max: 2 })
        );
    }

    #[test]
    fn subsampling_bounds_the_work() {
        let values: Vec<f64> = (0..400).map(|i| if i < 200 { 0.0 } else { 5.0 } + f64::from(i) * 1e-3).collect();
        let labels: Vec<usize> = (0..400).map(|i| usize::from(i >= 200)).collect();
        let data = DMatrix::from_column_slice(400, 1, &values);
        let mut rng = fastrand::Rng::with_seed(2);
        let score = silhouette_score(&data, &labels, 50, &mut rng).unwrap();
        assert!(score > 0.8, "score = {score}");
    }
}
