//! Behavioural segmentation of providers
//!
//! Features are standardised over the whole population and clustered with
//! k-means. Labels carry no order; they only group providers within a run.

use std::time::Instant;

use crate::algorithm::features::FeatureMatrix;
use crate::algorithm::kmeans::{KMeans, KMeansModel};
use crate::algorithm::scaling::StandardScaler;
use crate::config::KMeansConfig;
use crate::error::Result;
use crate::models::{FEATURE_COUNT, FeatureVector};
use crate::schema::FEATURE_NAMES;
use crate::utils::logging::log_stage_complete;

/// Fitted segmentation with one label per provider
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Cluster label per row of the input matrix
    pub labels: Vec<usize>,
    /// Scaler fitted on the input matrix
    pub scaler: StandardScaler,
    /// Clustering fitted on the standardised matrix
    pub model: KMeansModel,
}

/// Size and mean unscaled features of one segment
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentProfile {
    pub cluster_id: usize,
    pub size: usize,
    pub mean_features: FeatureVector,
}

/// Standardise `features` and cluster them
pub fn segment_providers(features: &FeatureMatrix, config: &KMeansConfig) -> Result<Segmentation> {
    let start = Instant::now();

    let (scaler, scaled) = StandardScaler::fit_transform(features);
    let model = KMeans::new(config.clone()).fit(&scaled)?;
    let labels = model.predict_all(&scaled);

    log_stage_complete("Segmented", labels.len(), start.elapsed());
    Ok(Segmentation {
        labels,
        scaler,
        model,
    })
}

/// Per-segment summaries, ordered by cluster id. Empty segments are omitted.
#[must_use]
pub fn segment_profiles(features: &FeatureMatrix, labels: &[usize]) -> Vec<SegmentProfile> {
    let n_clusters = labels.iter().max().map_or(0, |max| max + 1);
    let mut sums = vec![[0.0; FEATURE_COUNT]; n_clusters];
    let mut sizes = vec![0usize; n_clusters];

    for (row, &label) in features.rows().iter().zip(labels) {
        sizes[label] += 1;
        for (sum, value) in sums[label].iter_mut().zip(row) {
            *sum += value;
        }
    }

    sums.into_iter()
        .zip(sizes)
        .enumerate()
        .filter(|(_, (_, size))| *size > 0)
        .map(|(cluster_id, (sum, size))| SegmentProfile {
            cluster_id,
            size,
            mean_features: sum.map(|s| s / size as f64),
        })
        .collect()
}

/// Log one line per segment
pub fn log_segment_profiles(profiles: &[SegmentProfile]) {
    for profile in profiles {
        let means = FEATURE_NAMES
            .iter()
            .zip(profile.mean_features)
            .map(|(name, mean)| format!("{name}={mean:.3}"))
            .collect::<Vec<_>>()
            .join(", ");
        log::info!(
            "Segment {}: {} providers ({means})",
            profile.cluster_id,
            profile.size
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_within_cluster_range() {
        let rows: Vec<FeatureVector> = (0..40)
            .map(|i| {
                let x = f64::from(i);
                [x * 3.0, (x % 7.0) / 7.0, 1.0 + x % 5.0, x * x, 30.0 + x % 3.0]
            })
            .collect();
        let matrix = FeatureMatrix::new(rows);
        let segmentation = segment_providers(&matrix, &KMeansConfig::default()).unwrap();

        assert_eq!(segmentation.labels.len(), 40);
        assert!(segmentation.labels.iter().all(|&label| label <= 3));
        assert_eq!(segmentation.model.n_clusters(), 4);
    }

    #[test]
    fn test_segment_profiles() {
        let matrix = FeatureMatrix::new(vec![
            [1.0, 0.0, 0.0, 0.0, 0.0],
            [3.0, 0.0, 0.0, 0.0, 0.0],
            [10.0, 1.0, 0.0, 0.0, 0.0],
        ]);
        let profiles = segment_profiles(&matrix, &[2, 2, 0]);

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].cluster_id, 0);
        assert_eq!(profiles[0].size, 1);
        assert_eq!(profiles[0].mean_features[1], 1.0);
        assert_eq!(profiles[1].cluster_id, 2);
        assert_eq!(profiles[1].size, 2);
        assert_eq!(profiles[1].mean_features[0], 2.0);
    }
}
