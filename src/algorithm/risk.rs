//! Composite risk scoring
//!
//! The anomaly score is blended with percentile ranks of the cost and
//! elderly-reliance features into one score, which is then banded.

use std::cmp::Ordering;
use std::time::Instant;

use itertools::Itertools;

use crate::config::{RiskThresholds, RiskWeights};
use crate::models::{ModelOutput, RiskCategory, ScoredProvider};
use crate::utils::logging::log_stage_complete;

/// Percentile rank (0-100] of every value within `values`
///
/// Ranks are 1-based, tied values share the average of their ranks, and
/// the rank is divided by the population size.
#[must_use]
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let order = (0..n)
        .sorted_by(|&a, &b| {
            values[a]
                .partial_cmp(&values[b])
                .unwrap_or(Ordering::Equal)
        })
        .collect_vec();

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1..=end
        let average_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = average_rank * 100.0 / n as f64;
        }
        start = end;
    }

    ranks
}

/// Weighted blend of the anomaly score and two percentile ranks
#[must_use]
pub fn composite_score(anomaly: f64, norm_cost: f64, norm_elderly: f64, weights: &RiskWeights) -> f64 {
    weights.anomaly * anomaly + weights.cost * norm_cost + weights.elderly * norm_elderly
}

/// Rank features across the population, compute the composite score and band it
#[must_use]
pub fn compose_risk(
    outputs: Vec<ModelOutput>,
    weights: &RiskWeights,
    thresholds: &RiskThresholds,
) -> Vec<ScoredProvider> {
    let start = Instant::now();

    let cost: Vec<f64> = outputs.iter().map(|o| o.features.avg_cost_per_claim).collect();
    let elderly: Vec<f64> = outputs.iter().map(|o| o.features.elderly_claim_rate).collect();
    let claims: Vec<f64> = outputs.iter().map(|o| o.features.claims_per_patient).collect();

    let norm_cost = percentile_ranks(&cost);
    let norm_elderly = percentile_ranks(&elderly);
    let norm_claims = percentile_ranks(&claims);

    let scored = outputs
        .into_iter()
        .enumerate()
        .map(|(i, model)| {
            let final_risk_score =
                composite_score(model.anomaly_score, norm_cost[i], norm_elderly[i], weights);
            ScoredProvider {
                model,
                norm_cost: norm_cost[i],
                norm_elderly: norm_elderly[i],
                norm_claims_per_patient: norm_claims[i],
                final_risk_score,
                risk_category: RiskCategory::from_score(final_risk_score, thresholds),
            }
        })
        .collect_vec();

    log_stage_complete("Composed risk scores", scored.len(), start.elapsed());
    scored
}
