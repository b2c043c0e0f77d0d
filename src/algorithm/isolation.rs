//! Seeded isolation forest
//!
//! Every tree is grown on a random subsample by splitting on a random
//! feature at a uniform threshold between the node's extremes, up to a
//! height limit of `ceil(log2(subsample))`. Rows that are isolated after
//! few splits are anomalous. Tree `i` draws from
//! `StdRng::seed_from_u64(seed + i)`, so the forest does not depend on how
//! rayon schedules the trees.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::algorithm::features::FeatureMatrix;
use crate::config::IsolationForestConfig;
use crate::error::{Error, Result};
use crate::models::{AnomalyFlag, FEATURE_COUNT, FeatureVector};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Average path length of an unsuccessful search in a binary search tree
/// of `n` nodes, used to normalise isolation depths
#[must_use]
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Percentile with linear interpolation between closest ranks
///
/// `q` is in `[0, 100]`. Returns NaN for an empty slice.
#[must_use]
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let position = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// One isolation tree, nodes stored in an arena with the root at index 0
#[derive(Debug, Clone, PartialEq)]
pub struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(
        rows: &[FeatureVector],
        indices: &mut [usize],
        max_depth: usize,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow_node(rows, indices, 0, max_depth, rng);
        tree
    }

    fn grow_node(
        &mut self,
        rows: &[FeatureVector],
        indices: &mut [usize],
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let node = self.nodes.len();
        self.nodes.push(Node::Leaf {
            size: indices.len(),
        });
        if depth >= max_depth || indices.len() <= 1 {
            return node;
        }

        let mut candidates: [usize; FEATURE_COUNT] = std::array::from_fn(|i| i);
        candidates.shuffle(rng);

        let split = candidates.into_iter().find_map(|feature| {
            let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, &i| {
                (acc.0.min(rows[i][feature]), acc.1.max(rows[i][feature]))
            });
            (max > min).then_some((feature, min, max))
        });
        let Some((feature, min, max)) = split else {
            return node;
        };

        let threshold = min + rng.random::<f64>() * (max - min);

        let mut mid = 0;
        for j in 0..indices.len() {
            if rows[indices[j]][feature] <= threshold {
                indices.swap(mid, j);
                mid += 1;
            }
        }
        let (left_rows, right_rows) = indices.split_at_mut(mid);

        let left = self.grow_node(rows, left_rows, depth + 1, max_depth, rng);
        let right = self.grow_node(rows, right_rows, depth + 1, max_depth, rng);
        self.nodes[node] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        node
    }

    /// Depth at which `row` lands, plus the expected remaining depth of its leaf
    #[must_use]
    pub fn path_length(&self, row: &FeatureVector) -> f64 {
        let mut node = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes[node] {
                Node::Leaf { size } => return depth + average_path_length(size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[feature] <= threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Fitted isolation forest
#[derive(Debug, Clone, PartialEq)]
pub struct IsolationForestModel {
    trees: Vec<IsolationTree>,
    subsample_size: usize,
    offset: f64,
}

impl IsolationForestModel {
    /// Anomaly score in `[-1, 0)`; lower is more anomalous
    #[must_use]
    pub fn score_sample(&self, row: &FeatureVector) -> f64 {
        let normaliser = average_path_length(self.subsample_size);
        if normaliser == 0.0 || self.trees.is_empty() {
            return -1.0;
        }
        let mean_depth = self
            .trees
            .iter()
            .map(|tree| tree.path_length(row))
            .sum::<f64>()
            / self.trees.len() as f64;
        -(2f64.powf(-mean_depth / normaliser))
    }

    /// Scores for every row of `matrix`
    #[must_use]
    pub fn score_samples(&self, matrix: &FeatureMatrix) -> Vec<f64> {
        matrix
            .rows()
            .par_iter()
            .map(|row| self.score_sample(row))
            .collect()
    }

    /// Score shifted by the contamination offset; negative means outlier
    #[must_use]
    pub fn decision_function(&self, matrix: &FeatureMatrix) -> Vec<f64> {
        self.score_samples(matrix)
            .into_iter()
            .map(|score| score - self.offset)
            .collect()
    }

    /// Inlier/outlier classification of every row
    #[must_use]
    pub fn predict(&self, matrix: &FeatureMatrix) -> Vec<AnomalyFlag> {
        self.decision_function(matrix)
            .into_iter()
            .map(classify_decision)
            .collect()
    }

    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Outlier when the decision value is negative
#[must_use]
pub fn classify_decision(decision: f64) -> AnomalyFlag {
    if decision < 0.0 {
        AnomalyFlag::Outlier
    } else {
        AnomalyFlag::Inlier
    }
}

/// Isolation forest estimator
#[derive(Debug, Clone)]
pub struct IsolationForest {
    config: IsolationForestConfig,
}

impl IsolationForest {
    #[must_use]
    pub const fn new(config: IsolationForestConfig) -> Self {
        Self { config }
    }

    /// Grow the forest on `data` and set the offset so that the configured
    /// contamination fraction of `data` falls below it
    pub fn fit(&self, data: &FeatureMatrix) -> Result<IsolationForestModel> {
        if data.is_empty() {
            return Err(Error::EmptyPopulation {
                stage: "anomaly detection",
            }
            .into());
        }
        let contamination = self.config.contamination;
        if !(contamination > 0.0 && contamination <= 0.5) {
            return Err(Error::InvalidConfig(format!(
                "contamination must be in (0, 0.5], got {contamination}"
            ))
            .into());
        }
        if self.config.n_estimators == 0 || self.config.max_samples == 0 {
            return Err(Error::InvalidConfig(
                "isolation forest needs at least one tree and one sample per tree".to_string(),
            )
            .into());
        }

        let rows = data.rows();
        let subsample_size = self.config.max_samples.min(rows.len());
        let max_depth = (subsample_size as f64).log2().ceil() as usize;
        let seed = self.config.random_seed;

        let trees: Vec<IsolationTree> = (0..self.config.n_estimators)
            .into_par_iter()
            .map(|tree| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(tree as u64));
                let mut indices =
                    rand::seq::index::sample(&mut rng, rows.len(), subsample_size).into_vec();
                IsolationTree::grow(rows, &mut indices, max_depth, &mut rng)
            })
            .collect();

        let mut model = IsolationForestModel {
            trees,
            subsample_size,
            offset: 0.0,
        };
        let scores = model.score_samples(data);
        model.offset = percentile(&scores, 100.0 * contamination);

        log::debug!(
            "Isolation forest: {} trees on {} rows each, offset {:.6}",
            model.trees.len(),
            subsample_size,
            model.offset
        );
        Ok(model)
    }
}
