//! End-to-end risk segmentation run
//!
//! [`score_providers`] is the in-memory core: it takes already loaded
//! record batches and returns the scored table. [`run_pipeline`] wraps it
//! with source loading and CSV export.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use arrow::record_batch::RecordBatch;

use crate::algorithm::{
    AnomalyAssessment, SegmentProfile, Segmentation, aggregate_batches, assess_anomalies,
    compose_risk, derive_features, log_segment_profiles, segment_profiles, segment_providers,
};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::io::{load_claims_sources, write_results_csv};
use crate::models::{ModelOutput, RiskCategory, ScoredProvider};
use crate::schema::claims_schema;
use crate::utils::logging::{create_spinner, finish_spinner};

/// Everything produced by scoring one set of batches
#[derive(Debug, Clone)]
pub struct ScoringRun {
    /// Distinct providers found across all sources
    pub providers_aggregated: usize,
    /// Providers that passed the volume filter, fully scored
    pub scored: Vec<ScoredProvider>,
    /// Size and mean features of each segment
    pub profiles: Vec<SegmentProfile>,
    /// Providers classified as outliers
    pub outliers: usize,
}

/// Outcome of a successful pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub sources_read: usize,
    pub sources_missing: usize,
    pub providers_aggregated: usize,
    pub providers_scored: usize,
    pub outliers: usize,
    pub category_counts: BTreeMap<RiskCategory, usize>,
    pub output_path: PathBuf,
}

impl PipelineSummary {
    /// Providers in `category`
    #[must_use]
    pub fn count(&self, category: RiskCategory) -> usize {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    /// Log the summary at info level
    pub fn log(&self) {
        log::info!(
            "Read {} sources ({} missing), aggregated {} providers, scored {}",
            self.sources_read,
            self.sources_missing,
            self.providers_aggregated,
            self.providers_scored
        );
        for category in RiskCategory::ALL.iter().rev() {
            log::info!("  {}: {}", category, self.count(*category));
        }
        log::info!("  Outliers: {}", self.outliers);
    }
}

/// Count providers per risk category, every category present
#[must_use]
pub fn category_counts(scored: &[ScoredProvider]) -> BTreeMap<RiskCategory, usize> {
    let mut counts: BTreeMap<RiskCategory, usize> =
        RiskCategory::ALL.iter().map(|c| (*c, 0)).collect();
    for provider in scored {
        *counts.entry(provider.risk_category).or_default() += 1;
    }
    counts
}

/// Run every analytical stage on loaded batches
pub fn score_batches(batches: &[RecordBatch], config: &PipelineConfig) -> Result<ScoringRun> {
    let aggregates = aggregate_batches(batches)?;
    let providers_aggregated = aggregates.len();

    let feature_set = derive_features(aggregates, config.min_claims);
    if feature_set.is_empty() {
        return Err(Error::EmptyPopulation {
            stage: "feature derivation",
        }
        .into());
    }
    let matrix = feature_set.matrix();

    let spinner = create_spinner(
        &format!("Fitting models on {} providers", matrix.len()),
        config.show_progress,
    );
    let (segmentation, anomalies): (Result<Segmentation>, Result<AnomalyAssessment>) =
        rayon::join(
            || segment_providers(&matrix, &config.kmeans),
            || assess_anomalies(&matrix, &config.isolation_forest),
        );
    finish_spinner(&spinner, "Models fitted");
    let segmentation = segmentation?;
    let anomalies = anomalies?;

    let profiles = segment_profiles(&matrix, &segmentation.labels);
    log_segment_profiles(&profiles);
    let outliers = anomalies.outlier_count();

    let outputs: Vec<ModelOutput> = feature_set
        .rows
        .into_iter()
        .enumerate()
        .map(|(i, features)| ModelOutput {
            features,
            cluster_id: segmentation.labels[i],
            anomaly_flag: anomalies.flags[i],
            anomaly_decision: anomalies.decisions[i],
            anomaly_score: anomalies.scores[i],
        })
        .collect();

    let scored = compose_risk(outputs, &config.risk_weights, &config.risk_thresholds);

    Ok(ScoringRun {
        providers_aggregated,
        scored,
        profiles,
        outliers,
    })
}

/// Aggregate, model and score loaded batches
pub fn score_providers(
    batches: &[RecordBatch],
    config: &PipelineConfig,
) -> Result<Vec<ScoredProvider>> {
    Ok(score_batches(batches, config)?.scored)
}

/// Load the configured sources, score every provider and export the table
///
/// Nothing is written unless every stage succeeds.
///
/// # Errors
/// Returns [`Error::NoReadableSources`] when no input file exists, and
/// propagates any read, modelling or export failure
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineSummary> {
    config.validate()?;
    let start = Instant::now();

    let loaded = load_claims_sources(&config.input_paths, &claims_schema())?;
    let run = score_batches(&loaded.batches, config)?;

    log::info!(
        "Exporting {} prescribers to {}...",
        run.scored.len(),
        config.output_path.display()
    );
    write_results_csv(&config.output_path, &run.scored)?;

    let summary = PipelineSummary {
        sources_read: loaded.sources_read.len(),
        sources_missing: loaded.sources_missing.len(),
        providers_aggregated: run.providers_aggregated,
        providers_scored: run.scored.len(),
        outliers: run.outliers,
        category_counts: category_counts(&run.scored),
        output_path: config.output_path.clone(),
    };
    summary.log();
    log::info!("Pipeline finished in {:?}", start.elapsed());

    Ok(summary)
}
