//! Anomaly scoring of providers
//!
//! Features are standardised independently of the segmentation step, an
//! isolation forest is fitted on them, and the raw decision values are
//! rescaled to a 0-100 score where 100 marks the most anomalous provider.

use std::time::Instant;

use crate::algorithm::features::FeatureMatrix;
use crate::algorithm::isolation::{IsolationForest, IsolationForestModel, classify_decision};
use crate::algorithm::scaling::StandardScaler;
use crate::config::IsolationForestConfig;
use crate::error::Result;
use crate::models::AnomalyFlag;
use crate::utils::logging::{log_stage_complete, log_warning};

/// Anomaly results, one entry per row of the input matrix
#[derive(Debug, Clone)]
pub struct AnomalyAssessment {
    /// Raw decision values, lower is more anomalous
    pub decisions: Vec<f64>,
    /// Outlier classification at the configured contamination
    pub flags: Vec<AnomalyFlag>,
    /// Decision values rescaled to `[0, 100]`, 100 is most anomalous
    pub scores: Vec<f64>,
    pub scaler: StandardScaler,
    pub model: IsolationForestModel,
}

impl AnomalyAssessment {
    #[must_use]
    pub fn outlier_count(&self) -> usize {
        self.flags
            .iter()
            .filter(|flag| **flag == AnomalyFlag::Outlier)
            .count()
    }
}

/// Rescale decision values to `[0, 100]` with the sign flipped:
/// `(max - raw) / (max - min) * 100`
///
/// When every value is the same there is no range to scale by; all scores
/// are then 0 and a warning is logged.
#[must_use]
pub fn normalize_anomaly_scores(raw: &[f64]) -> Vec<f64> {
    let (min, max) = raw
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    if raw.is_empty() || !(range > 0.0) || !range.is_finite() {
        if !raw.is_empty() {
            log_warning(
                &format!(
                    "Anomaly decision values have no spread across {} providers, scoring all as 0",
                    raw.len()
                ),
                None,
            );
        }
        return vec![0.0; raw.len()];
    }

    raw.iter()
        .map(|&value| ((max - value) / range * 100.0).clamp(0.0, 100.0))
        .collect()
}

/// Standardise `features`, fit the forest and score every provider
pub fn assess_anomalies(
    features: &FeatureMatrix,
    config: &IsolationForestConfig,
) -> Result<AnomalyAssessment> {
    let start = Instant::now();

    let (scaler, scaled) = StandardScaler::fit_transform(features);
    let model = IsolationForest::new(config.clone()).fit(&scaled)?;
    let decisions = model.decision_function(&scaled);
    let flags = decisions.iter().copied().map(classify_decision).collect();
    let scores = normalize_anomaly_scores(&decisions);

    let assessment = AnomalyAssessment {
        decisions,
        flags,
        scores,
        scaler,
        model,
    };
    log::info!(
        "Flagged {} of {} providers as outliers",
        assessment.outlier_count(),
        assessment.decisions.len()
    );
    log_stage_complete("Scored anomalies", assessment.decisions.len(), start.elapsed());

    Ok(assessment)
}
