//! Per-prescriber records

use serde::{Deserialize, Serialize};

use super::RiskCategory;

/// Number of derived features fed to the models
pub const FEATURE_COUNT: usize = 5;

/// One provider's features in the fixed model order
/// (see [`crate::schema::FEATURE_NAMES`])
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Metrics summed across all input sources for one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAggregate {
    /// Opaque prescriber identifier
    pub provider_id: String,
    pub total_claims: f64,
    pub total_drug_cost: f64,
    pub total_day_supply: f64,
    pub total_beneficiaries: f64,
    /// Claims for beneficiaries aged 65 or older
    pub elderly_claims: f64,
    /// Drug cost for beneficiaries aged 65 or older
    pub elderly_drug_cost: f64,
}

impl ProviderAggregate {
    /// Sum yearly observations, each given in [`crate::schema::METRIC_COLUMNS`]
    /// order. `None` cells contribute nothing.
    ///
    /// Each metric is summed in ascending value order, so the totals are the
    /// same bit for bit however the observations are ordered.
    #[must_use]
    pub fn from_observations(provider_id: String, observations: &[[Option<f64>; 6]]) -> Self {
        let totals: [f64; 6] = std::array::from_fn(|metric| {
            let mut values: Vec<f64> = observations.iter().filter_map(|row| row[metric]).collect();
            values.sort_unstable_by(f64::total_cmp);
            values.into_iter().fold(0.0, |sum, value| sum + value)
        });
        let [
            total_claims,
            total_drug_cost,
            total_day_supply,
            total_beneficiaries,
            elderly_claims,
            elderly_drug_cost,
        ] = totals;

        Self {
            provider_id,
            total_claims,
            total_drug_cost,
            total_day_supply,
            total_beneficiaries,
            elderly_claims,
            elderly_drug_cost,
        }
    }
}

/// A provider that passed the volume filter, with its derived ratios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderFeatures {
    pub aggregate: ProviderAggregate,
    pub avg_cost_per_claim: f64,
    pub elderly_claim_rate: f64,
    pub claims_per_patient: f64,
    pub cost_per_patient: f64,
    pub avg_day_supply: f64,
}

impl ProviderFeatures {
    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.aggregate.provider_id
    }

    /// Features in model order
    #[must_use]
    pub const fn feature_vector(&self) -> FeatureVector {
        [
            self.avg_cost_per_claim,
            self.elderly_claim_rate,
            self.claims_per_patient,
            self.cost_per_patient,
            self.avg_day_supply,
        ]
    }
}

/// Raw classification of the anomaly detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnomalyFlag {
    Inlier,
    Outlier,
}

/// A provider with segmentation and anomaly results attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub features: ProviderFeatures,
    /// Segment label; only meaningful relative to other labels of the same run
    pub cluster_id: usize,
    pub anomaly_flag: AnomalyFlag,
    /// Raw decision value, lower is more anomalous
    pub anomaly_decision: f64,
    /// Normalised anomaly score in `[0, 100]`, 100 is most anomalous
    pub anomaly_score: f64,
}

/// Final per-provider record, ready for export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredProvider {
    pub model: ModelOutput,
    /// Percentile rank of the average cost per claim
    pub norm_cost: f64,
    /// Percentile rank of the elderly claim rate
    pub norm_elderly: f64,
    /// Percentile rank of claims per patient
    pub norm_claims_per_patient: f64,
    pub final_risk_score: f64,
    pub risk_category: RiskCategory,
}

impl ScoredProvider {
    #[must_use]
    pub fn provider_id(&self) -> &str {
        self.model.features.provider_id()
    }

    #[must_use]
    pub const fn aggregate(&self) -> &ProviderAggregate {
        &self.model.features.aggregate
    }

    #[must_use]
    pub const fn features(&self) -> &ProviderFeatures {
        &self.model.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observations_skip_missing_cells() {
        let aggregate = ProviderAggregate::from_observations(
            "1000000001".to_string(),
            &[
                [Some(12.0), Some(100.0), None, Some(4.0), Some(6.0), None],
                [Some(8.0), None, Some(90.0), Some(1.0), None, Some(5.5)],
            ],
        );

        assert_eq!(aggregate.total_claims, 20.0);
        assert_eq!(aggregate.total_drug_cost, 100.0);
        assert_eq!(aggregate.total_day_supply, 90.0);
        assert_eq!(aggregate.total_beneficiaries, 5.0);
        assert_eq!(aggregate.elderly_claims, 6.0);
        assert_eq!(aggregate.elderly_drug_cost, 5.5);
    }

    #[test]
    fn test_totals_ignore_observation_order() {
        let row = |claims: f64| [Some(claims), Some(claims * 3.0), None, None, None, None];
        let forward = ProviderAggregate::from_observations(
            "1".to_string(),
            &[row(0.1), row(0.2), row(0.3)],
        );
        let reversed = ProviderAggregate::from_observations(
            "1".to_string(),
            &[row(0.3), row(0.2), row(0.1)],
        );
        assert_eq!(forward, reversed);
        assert_eq!(forward.total_claims.to_bits(), reversed.total_claims.to_bits());
    }
}
