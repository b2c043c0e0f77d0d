//! Record types produced by each pipeline stage
//!
//! Every stage wraps the record of the stage before it, so a scored provider
//! still carries its aggregated metrics, features and model outputs.

pub mod provider;
pub mod risk_category;

pub use provider::{
    AnomalyFlag, FEATURE_COUNT, FeatureVector, ModelOutput, ProviderAggregate, ProviderFeatures,
    ScoredProvider,
};
pub use risk_category::RiskCategory;
