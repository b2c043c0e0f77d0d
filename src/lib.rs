//! Prescriber risk segmentation over multi-year Part D prescriber summaries.
//!
//! Yearly Parquet files are aggregated per prescriber, five behavioural
//! ratios are derived, prescribers are clustered into segments and scored
//! for statistical outlierness, and both signals are blended into a
//! weighted risk score with an ordinal risk category.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod utils;

// Re-export the most common types for easier use
pub use config::{
    IsolationForestConfig, KMeansConfig, PipelineConfig, PipelineConfigBuilder, RiskThresholds,
    RiskWeights,
};
pub use error::{Error, Result};
pub use models::{
    AnomalyFlag, ModelOutput, ProviderAggregate, ProviderFeatures, RiskCategory, ScoredProvider,
};
pub use pipeline::{PipelineSummary, run_pipeline, score_providers};

// Arrow types
pub use arrow::record_batch::RecordBatch;
