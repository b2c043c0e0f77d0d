//! Derived behavioural features
//!
//! Low-volume providers are removed first, then five ratios are computed
//! from the summed metrics. A ratio that is not finite (zero denominator)
//! is recorded as 0 so that no NaN or infinity reaches the models.

use std::time::Instant;

use crate::models::{FEATURE_COUNT, FeatureVector, ProviderAggregate, ProviderFeatures};
use crate::schema::FEATURE_NAMES;
use crate::utils::logging::log_stage_complete;

/// Row-major feature matrix, one row per provider
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMatrix {
    rows: Vec<FeatureVector>,
}

impl FeatureMatrix {
    #[must_use]
    pub const fn new(rows: Vec<FeatureVector>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub const fn n_features(&self) -> usize {
        FEATURE_COUNT
    }

    /// Values of one feature across all rows
    pub fn column(&self, feature: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |row| row[feature])
    }
}

impl From<Vec<FeatureVector>> for FeatureMatrix {
    fn from(rows: Vec<FeatureVector>) -> Self {
        Self::new(rows)
    }
}

/// Providers that passed the volume filter, with the feature names in model order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub rows: Vec<ProviderFeatures>,
    pub names: [&'static str; FEATURE_COUNT],
}

impl FeatureSet {
    /// Feature matrix in [`FeatureSet::names`] order
    #[must_use]
    pub fn matrix(&self) -> FeatureMatrix {
        self.rows
            .iter()
            .map(ProviderFeatures::feature_vector)
            .collect::<Vec<_>>()
            .into()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Ratio with the non-finite cases replaced by 0
#[must_use]
pub fn sanitize_ratio(numerator: f64, denominator: f64) -> f64 {
    let ratio = numerator / denominator;
    if ratio.is_finite() { ratio } else { 0.0 }
}

/// Derive the five ratios for one provider
#[must_use]
pub fn derive_provider_features(aggregate: ProviderAggregate) -> ProviderFeatures {
    let claims = aggregate.total_claims;
    let cost = aggregate.total_drug_cost;
    let beneficiaries = aggregate.total_beneficiaries;

    ProviderFeatures {
        avg_cost_per_claim: sanitize_ratio(cost, claims),
        elderly_claim_rate: sanitize_ratio(aggregate.elderly_claims, claims),
        claims_per_patient: sanitize_ratio(claims, beneficiaries),
        cost_per_patient: sanitize_ratio(cost, beneficiaries),
        avg_day_supply: sanitize_ratio(aggregate.total_day_supply, claims),
        aggregate,
    }
}

/// Keep providers with more than `min_claims` claims and derive their features
#[must_use]
pub fn derive_features(aggregates: Vec<ProviderAggregate>, min_claims: f64) -> FeatureSet {
    let start = Instant::now();
    let total = aggregates.len();

    let rows: Vec<ProviderFeatures> = aggregates
        .into_iter()
        .filter(|aggregate| aggregate.total_claims > min_claims)
        .map(derive_provider_features)
        .collect();

    log::info!(
        "Excluded {} of {} providers with {} or fewer claims",
        total - rows.len(),
        total,
        min_claims
    );
    log_stage_complete("Derived features", rows.len(), start.elapsed());

    FeatureSet {
        rows,
        names: FEATURE_NAMES,
    }
}
