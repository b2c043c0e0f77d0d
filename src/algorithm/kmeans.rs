//! Seeded k-means clustering
//!
//! Each restart seeds its centroids with k-means++ and then runs Lloyd
//! iterations until the total centroid shift falls below the tolerance.
//! Restarts run in parallel, restart `r` drawing from
//! `StdRng::seed_from_u64(seed + r)`, so the winning model depends only on
//! the seed and the data.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::algorithm::features::FeatureMatrix;
use crate::config::KMeansConfig;
use crate::error::{Error, Result};
use crate::models::{FEATURE_COUNT, FeatureVector};
use crate::utils::logging::log_warning;

/// Squared Euclidean distance
#[must_use]
pub fn squared_distance(a: &FeatureVector, b: &FeatureVector) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Index of and squared distance to the nearest centroid; ties go to the lower index
fn nearest_centroid(centroids: &[FeatureVector], row: &FeatureVector) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(idx, centroid)| (idx, squared_distance(centroid, row)))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        .unwrap_or((0, 0.0))
}

/// Fitted k-means model
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansModel {
    centroids: Vec<FeatureVector>,
    inertia: f64,
    n_iter: usize,
}

impl KMeansModel {
    /// Label of the nearest centroid
    #[must_use]
    pub fn predict(&self, row: &FeatureVector) -> usize {
        nearest_centroid(&self.centroids, row).0
    }

    /// Labels for every row of `matrix`
    #[must_use]
    pub fn predict_all(&self, matrix: &FeatureMatrix) -> Vec<usize> {
        matrix.rows().iter().map(|row| self.predict(row)).collect()
    }

    #[must_use]
    pub fn centroids(&self) -> &[FeatureVector] {
        &self.centroids
    }

    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.centroids.len()
    }

    /// Sum of squared distances of the training rows to their centroid
    #[must_use]
    pub const fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Lloyd iterations used by the winning restart
    #[must_use]
    pub const fn n_iter(&self) -> usize {
        self.n_iter
    }
}

/// K-means estimator
#[derive(Debug, Clone)]
pub struct KMeans {
    config: KMeansConfig,
}

impl KMeans {
    #[must_use]
    pub const fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    /// Fit on `data`, keeping the restart with the lowest inertia
    ///
    /// When `data` has fewer rows than the configured cluster count, one
    /// cluster per row is used instead.
    ///
    /// # Errors
    /// Returns [`Error::EmptyPopulation`] for an empty matrix and
    /// [`Error::InvalidConfig`] when no cluster or restart is requested
    pub fn fit(&self, data: &FeatureMatrix) -> Result<KMeansModel> {
        if data.is_empty() {
            return Err(Error::EmptyPopulation {
                stage: "segmentation",
            }
            .into());
        }
        if self.config.n_clusters == 0 || self.config.n_init == 0 {
            return Err(Error::InvalidConfig(
                "k-means needs at least one cluster and one restart".to_string(),
            )
            .into());
        }

        let rows = data.rows();
        let k = self.config.n_clusters.min(rows.len());
        if k < self.config.n_clusters {
            log_warning(
                &format!(
                    "Only {} providers for {} clusters, using {k} clusters",
                    rows.len(),
                    self.config.n_clusters
                ),
                None,
            );
        }

        let tolerance = self.config.tolerance * mean_variance(data);
        let seed = self.config.random_seed;
        let max_iter = self.config.max_iter.max(1);

        let runs: Vec<KMeansModel> = (0..self.config.n_init)
            .into_par_iter()
            .map(|run| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(run as u64));
                let centroids = init_centroids(rows, k, &mut rng);
                lloyd(rows, centroids, max_iter, tolerance)
            })
            .collect();

        let best = runs
            .into_iter()
            .reduce(|best, run| if run.inertia < best.inertia { run } else { best })
            .ok_or_else(|| anyhow::anyhow!("k-means produced no runs"))?;

        log::debug!(
            "k-means converged with inertia {:.4} after {} iterations",
            best.inertia,
            best.n_iter
        );
        Ok(best)
    }
}

/// Mean of the per-feature population variances
fn mean_variance(data: &FeatureMatrix) -> f64 {
    let n = data.len() as f64;
    let total: f64 = (0..FEATURE_COUNT)
        .map(|feature| {
            let mean = data.column(feature).sum::<f64>() / n;
            data.column(feature).map(|v| (v - mean).powi(2)).sum::<f64>() / n
        })
        .sum();
    total / FEATURE_COUNT as f64
}

/// k-means++ seeding: each new centroid is drawn with probability
/// proportional to its squared distance from the closest chosen one
fn init_centroids(rows: &[FeatureVector], k: usize, rng: &mut StdRng) -> Vec<FeatureVector> {
    let mut centroids = Vec::with_capacity(k);
    let first = rows[rng.random_range(0..rows.len())];
    centroids.push(first);

    let mut closest: Vec<f64> = rows.iter().map(|row| squared_distance(row, &first)).collect();

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();
        let idx = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            closest
                .iter()
                .position(|&d| {
                    cumulative += d;
                    cumulative > target
                })
                .or_else(|| closest.iter().rposition(|&d| d > 0.0))
                .unwrap_or(0)
        } else {
            rng.random_range(0..rows.len())
        };

        let centroid = rows[idx];
        for (dist, row) in closest.iter_mut().zip(rows) {
            *dist = dist.min(squared_distance(row, &centroid));
        }
        centroids.push(centroid);
    }

    centroids
}

/// Assign every row to its nearest centroid, returning the inertia
fn assign(rows: &[FeatureVector], centroids: &[FeatureVector], labels: &mut [usize]) -> f64 {
    let mut inertia = 0.0;
    for (label, row) in labels.iter_mut().zip(rows) {
        let (idx, dist) = nearest_centroid(centroids, row);
        *label = idx;
        inertia += dist;
    }
    inertia
}

/// New centroids as cluster means. An empty cluster takes over the row
/// farthest from its current centroid.
fn update_centroids(
    rows: &[FeatureVector],
    labels: &[usize],
    centroids: &[FeatureVector],
) -> Vec<FeatureVector> {
    let k = centroids.len();
    let mut sums = vec![[0.0; FEATURE_COUNT]; k];
    let mut counts = vec![0usize; k];

    for (row, &label) in rows.iter().zip(labels) {
        counts[label] += 1;
        for (sum, value) in sums[label].iter_mut().zip(row) {
            *sum += value;
        }
    }

    let mut farthest: Vec<usize> = Vec::new();
    if counts.contains(&0) {
        farthest = (0..rows.len()).collect();
        farthest.sort_by(|&a, &b| {
            let da = squared_distance(&rows[a], &centroids[labels[a]]);
            let db = squared_distance(&rows[b], &centroids[labels[b]]);
            db.partial_cmp(&da).unwrap_or(Ordering::Equal).then(a.cmp(&b))
        });
    }
    let mut farthest = farthest.into_iter();

    sums.into_iter()
        .zip(counts)
        .map(|(sum, count)| {
            if count > 0 {
                sum.map(|s| s / count as f64)
            } else {
                farthest.next().map_or(sum, |idx| rows[idx])
            }
        })
        .collect()
}

fn lloyd(
    rows: &[FeatureVector],
    mut centroids: Vec<FeatureVector>,
    max_iter: usize,
    tolerance: f64,
) -> KMeansModel {
    let mut labels = vec![0usize; rows.len()];
    let mut n_iter = 0;

    for iteration in 0..max_iter {
        n_iter = iteration + 1;
        assign(rows, &centroids, &mut labels);
        let updated = update_centroids(rows, &labels, &centroids);
        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(old, new)| squared_distance(old, new))
            .sum();
        centroids = updated;
        if shift <= tolerance {
            break;
        }
    }

    let inertia = assign(rows, &centroids, &mut labels);
    KMeansModel {
        centroids,
        inertia,
        n_iter,
    }
}
