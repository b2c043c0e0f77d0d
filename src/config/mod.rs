//! Configuration for the risk segmentation pipeline.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default directory holding the yearly prescriber summaries
pub const DEFAULT_ARCHIVE_DIR: &str = "archive";

/// Default yearly input files, relative to [`DEFAULT_ARCHIVE_DIR`]
pub const DEFAULT_INPUT_FILES: [&str; 3] = ["DY18.parquet", "DY19.parquet", "DY20.parquet"];

/// Default output file
pub const DEFAULT_OUTPUT_FILE: &str = "segmentation_results.csv";

/// Configuration for k-means segmentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Number of behavioural segments
    pub n_clusters: usize,
    /// Number of independent restarts; the lowest-inertia run wins
    pub n_init: usize,
    /// Maximum Lloyd iterations per restart
    pub max_iter: usize,
    /// Convergence tolerance, relative to the mean feature variance
    pub tolerance: f64,
    /// Seed for centroid initialisation
    pub random_seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            n_clusters: 4,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            random_seed: 42,
        }
    }
}

/// Configuration for the isolation forest anomaly detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationForestConfig {
    /// Number of isolation trees
    pub n_estimators: usize,
    /// Upper bound on rows drawn for each tree
    pub max_samples: usize,
    /// Expected fraction of outliers, in (0, 0.5]
    pub contamination: f64,
    /// Base seed; tree `i` is grown from `random_seed + i`
    pub random_seed: u64,
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.01,
            random_seed: 42,
        }
    }
}

/// Weights of the composite risk score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub anomaly: f64,
    pub cost: f64,
    pub elderly: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            anomaly: 0.5,
            cost: 0.25,
            elderly: 0.25,
        }
    }
}

/// Inclusive lower bounds of the risk bands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high: 80.0,
            medium: 50.0,
        }
    }
}

/// Configuration for a full pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input Parquet files, one per data year
    pub input_paths: Vec<PathBuf>,
    /// Destination of the scored CSV table
    pub output_path: PathBuf,
    /// Providers need strictly more claims than this to be scored
    pub min_claims: f64,
    /// Segmentation settings
    pub kmeans: KMeansConfig,
    /// Anomaly detection settings
    pub isolation_forest: IsolationForestConfig,
    /// Composite score weights
    pub risk_weights: RiskWeights,
    /// Risk band thresholds
    pub risk_thresholds: RiskThresholds,
    /// Show spinners while the models are fitted
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let archive = Path::new(DEFAULT_ARCHIVE_DIR);
        Self {
            input_paths: DEFAULT_INPUT_FILES
                .iter()
                .map(|file| archive.join(file))
                .collect(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            min_claims: 10.0,
            kmeans: KMeansConfig::default(),
            isolation_forest: IsolationForestConfig::default(),
            risk_weights: RiskWeights::default(),
            risk_thresholds: RiskThresholds::default(),
            show_progress: false,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new builder for constructing a pipeline configuration
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Parse a configuration from JSON; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("Failed to parse pipeline configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Check that every setting is within its valid range
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(Error::InvalidConfig(msg).into()) };

        if self.input_paths.is_empty() {
            return invalid("at least one input path is required".to_string());
        }
        if !self.min_claims.is_finite() {
            return invalid(format!("min_claims must be finite, got {}", self.min_claims));
        }
        if self.kmeans.n_clusters == 0 {
            return invalid("kmeans.n_clusters must be at least 1".to_string());
        }
        if self.kmeans.n_init == 0 {
            return invalid("kmeans.n_init must be at least 1".to_string());
        }
        if self.kmeans.max_iter == 0 {
            return invalid("kmeans.max_iter must be at least 1".to_string());
        }
        if !(self.kmeans.tolerance >= 0.0) {
            return invalid(format!(
                "kmeans.tolerance must be non-negative, got {}",
                self.kmeans.tolerance
            ));
        }
        if self.isolation_forest.n_estimators == 0 {
            return invalid("isolation_forest.n_estimators must be at least 1".to_string());
        }
        if self.isolation_forest.max_samples == 0 {
            return invalid("isolation_forest.max_samples must be at least 1".to_string());
        }
        let contamination = self.isolation_forest.contamination;
        if !(contamination > 0.0 && contamination <= 0.5) {
            return invalid(format!(
                "isolation_forest.contamination must be in (0, 0.5], got {contamination}"
            ));
        }
        let thresholds = self.risk_thresholds;
        if !(thresholds.medium <= thresholds.high) {
            return invalid(format!(
                "risk_thresholds.medium ({}) must not exceed risk_thresholds.high ({})",
                thresholds.medium, thresholds.high
            ));
        }

        Ok(())
    }
}

/// Builder for constructing a pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfigBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Set the input files
    #[must_use]
    pub fn input_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config.input_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Set the output file
    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    /// Set the low-volume exclusion threshold
    #[must_use]
    pub const fn min_claims(mut self, min_claims: f64) -> Self {
        self.config.min_claims = min_claims;
        self
    }

    /// Set the segmentation settings
    #[must_use]
    pub fn kmeans(mut self, kmeans: KMeansConfig) -> Self {
        self.config.kmeans = kmeans;
        self
    }

    /// Set the anomaly detection settings
    #[must_use]
    pub fn isolation_forest(mut self, isolation_forest: IsolationForestConfig) -> Self {
        self.config.isolation_forest = isolation_forest;
        self
    }

    /// Set one seed for both models
    #[must_use]
    pub const fn random_seed(mut self, seed: u64) -> Self {
        self.config.kmeans.random_seed = seed;
        self.config.isolation_forest.random_seed = seed;
        self
    }

    /// Set the composite score weights
    #[must_use]
    pub const fn risk_weights(mut self, weights: RiskWeights) -> Self {
        self.config.risk_weights = weights;
        self
    }

    /// Set the risk band thresholds
    #[must_use]
    pub const fn risk_thresholds(mut self, thresholds: RiskThresholds) -> Self {
        self.config.risk_thresholds = thresholds;
        self
    }

    /// Set whether spinners are shown
    #[must_use]
    pub const fn show_progress(mut self, show: bool) -> Self {
        self.config.show_progress = show;
        self
    }

    /// Build the pipeline configuration
    #[must_use]
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
