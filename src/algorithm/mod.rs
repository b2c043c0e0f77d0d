//! Analytical stages of the risk segmentation pipeline
//!
//! Data flows aggregate → features → (segmentation, anomaly) → risk.
//! Segmentation and anomaly scoring only share the feature matrix and can
//! run concurrently.

pub mod aggregate;
pub mod anomaly;
pub mod features;
pub mod isolation;
pub mod kmeans;
pub mod risk;
pub mod scaling;
pub mod segmentation;

pub use aggregate::aggregate_batches;
pub use anomaly::{AnomalyAssessment, assess_anomalies, normalize_anomaly_scores};
pub use features::{FeatureMatrix, FeatureSet, derive_features};
pub use isolation::{IsolationForest, IsolationForestModel};
pub use kmeans::{KMeans, KMeansModel};
pub use risk::{compose_risk, percentile_ranks};
pub use scaling::StandardScaler;
pub use segmentation::{
    SegmentProfile, Segmentation, log_segment_profiles, segment_profiles, segment_providers,
};
