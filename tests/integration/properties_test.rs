use crate::utils::{claims_batch, synthetic_population};
use prescriber_risk::{
    AnomalyFlag, PipelineConfig, RecordBatch, RiskCategory, RiskThresholds, ScoredProvider,
    score_providers,
};

const POPULATION: i64 = 300;

fn two_years() -> Vec<RecordBatch> {
    vec![
        claims_batch(&synthetic_population(POPULATION, 0)),
        claims_batch(&synthetic_population(POPULATION, 1)),
    ]
}

fn score(batches: &[RecordBatch]) -> Vec<ScoredProvider> {
    score_providers(batches, &PipelineConfig::new()).unwrap()
}

#[test]
fn test_only_high_volume_providers_are_scored() {
    let scored = score(&two_years());

    let excluded = (0..POPULATION).filter(|i| i % 9 == 0).count();
    assert_eq!(scored.len(), POPULATION as usize - excluded);
    assert!(scored.iter().all(|p| p.aggregate().total_claims > 10.0));
}

#[test]
fn test_output_is_sorted_and_unique() {
    let scored = score(&two_years());
    assert!(
        scored
            .windows(2)
            .all(|pair| pair[0].provider_id() < pair[1].provider_id())
    );
}

#[test]
fn test_features_are_finite() {
    for provider in score(&two_years()) {
        assert!(
            provider.features().feature_vector().iter().all(|v| v.is_finite()),
            "non-finite feature for {}",
            provider.provider_id()
        );
    }
}

#[test]
fn test_zero_beneficiaries_give_zero_patient_ratios() {
    let scored = score(&two_years());
    // i = 34 has no beneficiaries in either year
    let provider = scored
        .iter()
        .find(|p| p.provider_id() == "1000000034")
        .unwrap();
    assert_eq!(provider.features().claims_per_patient, 0.0);
    assert_eq!(provider.features().cost_per_patient, 0.0);
}

#[test]
fn test_cluster_ids_in_range() {
    let scored = score(&two_years());
    assert!(scored.iter().all(|p| p.model.cluster_id < 4));
    let distinct: std::collections::BTreeSet<usize> =
        scored.iter().map(|p| p.model.cluster_id).collect();
    assert!(distinct.len() > 1);
}

#[test]
fn test_anomaly_scores_span_full_range() {
    let scored = score(&two_years());
    assert!(
        scored
            .iter()
            .all(|p| (0.0..=100.0).contains(&p.model.anomaly_score))
    );
    assert!(scored.iter().any(|p| p.model.anomaly_score == 0.0));
    assert!(scored.iter().any(|p| p.model.anomaly_score == 100.0));

    let outliers = scored
        .iter()
        .filter(|p| p.model.anomaly_flag == AnomalyFlag::Outlier)
        .count();
    assert!(outliers >= 1);
    assert!(outliers <= scored.len() / 20);
}

#[test]
fn test_extreme_prescriber_is_most_anomalous() {
    let scored = score(&two_years());
    let extreme = scored
        .iter()
        .find(|p| p.provider_id() == "1000000001")
        .unwrap();
    assert_eq!(extreme.model.anomaly_flag, AnomalyFlag::Outlier);
    assert_eq!(extreme.model.anomaly_score, 100.0);
    assert_eq!(extreme.norm_cost, 100.0);
}

#[test]
fn test_risk_score_and_category_are_consistent() {
    let thresholds = RiskThresholds::default();
    for provider in score(&two_years()) {
        let expected = 0.5 * provider.model.anomaly_score
            + 0.25 * provider.norm_cost
            + 0.25 * provider.norm_elderly;
        assert!((provider.final_risk_score - expected).abs() < 1e-9);
        assert!((0.0..=100.0).contains(&provider.final_risk_score));
        assert_eq!(
            provider.risk_category,
            RiskCategory::from_score(provider.final_risk_score, &thresholds)
        );
        for rank in [
            provider.norm_cost,
            provider.norm_elderly,
            provider.norm_claims_per_patient,
        ] {
            assert!(rank > 0.0 && rank <= 100.0);
        }
    }
}

#[test]
fn test_scoring_is_idempotent() {
    let batches = two_years();
    let first = score(&batches);
    let second = score(&batches);
    assert_eq!(first, second);
}

#[test]
fn test_source_order_does_not_matter() {
    let batches = two_years();
    let reversed: Vec<RecordBatch> = batches.iter().rev().cloned().collect();

    let forward = score(&batches);
    let backward = score(&reversed);
    assert_eq!(forward.len(), backward.len());
    for (a, b) in forward.iter().zip(&backward) {
        assert_eq!(a.provider_id(), b.provider_id());
        assert_eq!(a.model.cluster_id, b.model.cluster_id);
        assert_eq!(a.model.anomaly_score, b.model.anomaly_score);
        assert_eq!(a.final_risk_score, b.final_risk_score);
        assert_eq!(a.risk_category, b.risk_category);
    }
}

#[test]
fn test_different_seed_keeps_invariants() {
    let config = PipelineConfig::builder().random_seed(7).build();
    let scored = score_providers(&two_years(), &config).unwrap();
    assert!(scored.iter().all(|p| p.model.cluster_id < 4));
    assert!(
        scored
            .iter()
            .all(|p| (0.0..=100.0).contains(&p.model.anomaly_score))
    );
}
