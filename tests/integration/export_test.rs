use std::fs;

use tempfile::TempDir;

use crate::utils::{claims_batch, synthetic_population};
use arrow::datatypes::DataType;
use prescriber_risk::io::{scored_to_record_batch, write_results_csv};
use prescriber_risk::schema::{CLUSTER_ID, EXPORT_COLUMNS, RISK_CATEGORY};
use prescriber_risk::{PipelineConfig, RiskCategory, ScoredProvider, score_providers};

fn scored_population() -> Vec<ScoredProvider> {
    let batches = vec![claims_batch(&synthetic_population(60, 0))];
    score_providers(&batches, &PipelineConfig::new()).unwrap()
}

#[test]
fn test_record_batch_matches_export_schema() {
    let scored = scored_population();
    let batch = scored_to_record_batch(&scored).unwrap();

    assert_eq!(batch.num_rows(), scored.len());
    let names: Vec<&str> = batch
        .schema_ref()
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    assert_eq!(names, EXPORT_COLUMNS);

    let schema = batch.schema();
    assert_eq!(
        schema.field_with_name(CLUSTER_ID).unwrap().data_type(),
        &DataType::UInt32
    );
    assert_eq!(
        schema.field_with_name(RISK_CATEGORY).unwrap().data_type(),
        &DataType::Utf8
    );
}

#[test]
fn test_csv_has_header_and_one_line_per_provider() {
    let scored = scored_population();
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let path = dir.join("nested").join("segmentation_results.csv");

    let written = write_results_csv(&path, &scored).unwrap();
    assert_eq!(written, scored.len());

    let csv = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], EXPORT_COLUMNS.join(","));
    assert_eq!(lines.len(), scored.len() + 1);

    let labels: Vec<&str> = RiskCategory::ALL.iter().map(|c| c.as_str()).collect();
    for (line, provider) in lines[1..].iter().zip(&scored) {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), EXPORT_COLUMNS.len());
        assert_eq!(fields[0], provider.provider_id());
        assert!(labels.contains(&fields[9]));
    }
}

#[test]
fn test_csv_replaces_previous_output() {
    let scored = scored_population();
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let path = dir.join("segmentation_results.csv");
    fs::write(&path, "stale contents that are longer than nothing\n").unwrap();

    write_results_csv(&path, &scored[..3]).unwrap();

    let csv = fs::read_to_string(&path).unwrap();
    assert_eq!(csv.lines().count(), 4);
    assert!(!csv.contains("stale"));
    assert!(!dir.join("segmentation_results.csv.tmp").exists());
}
