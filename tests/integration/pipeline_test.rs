use std::fs;

use tempfile::TempDir;

use crate::utils::{ClaimsRow, claims_batch, synthetic_population, write_parquet};
use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use prescriber_risk::schema::{EXPORT_COLUMNS, PROVIDER_ID, TOTAL_CLAIMS};
use prescriber_risk::{Error, PipelineConfig, RiskCategory, run_pipeline};
use std::sync::Arc;

/// Providers with 20, 5 and 50 claims: the 5-claim provider must not appear
#[test]
fn test_low_volume_provider_excluded_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let source = dir.join("DY18.parquet");
    write_parquet(
        &source,
        &claims_batch(&[
            ClaimsRow::with_claims(1001, 20.0),
            ClaimsRow::with_claims(1002, 5.0),
            ClaimsRow::with_claims(1003, 50.0),
        ]),
    );
    let output = dir.join("segmentation_results.csv");

    let config = PipelineConfig::builder()
        .input_paths([source, dir.join("DY19.parquet")])
        .output_path(&output)
        .build();
    let summary = run_pipeline(&config).unwrap();

    assert_eq!(summary.sources_read, 1);
    assert_eq!(summary.sources_missing, 1);
    assert_eq!(summary.providers_aggregated, 3);
    assert_eq!(summary.providers_scored, 2);
    assert_eq!(summary.count(RiskCategory::Low), 2);

    let csv = fs::read_to_string(&output).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next().unwrap(), EXPORT_COLUMNS.join(","));

    let rows: Vec<Vec<&str>> = lines.map(|line| line.split(',').collect()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "1001");
    assert_eq!(rows[1][0], "1003");
    for row in &rows {
        assert_eq!(row.len(), EXPORT_COLUMNS.len());
        assert!(row.iter().all(|field| !field.is_empty()));
        assert_eq!(row[9], "Low Risk");
    }
    assert!(!dir.join("segmentation_results.csv.tmp").exists());
}

#[test]
fn test_no_readable_sources_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let output = dir.join("segmentation_results.csv");
    let config = PipelineConfig::builder()
        .input_paths([dir.join("DY18.parquet"), dir.join("DY19.parquet")])
        .output_path(&output)
        .build();

    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::NoReadableSources { attempted: 2 })
    ));
    assert!(!output.exists());
}

#[test]
fn test_source_missing_columns_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let source = dir.join("DY18.parquet");
    let schema = Arc::new(Schema::new(vec![
        Field::new(PROVIDER_ID, DataType::Int64, false),
        Field::new(TOTAL_CLAIMS, DataType::Float64, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(vec![1, 2])),
        Arc::new(Float64Array::from(vec![40.0, 50.0])),
    ];
    write_parquet(&source, &RecordBatch::try_new(schema, columns).unwrap());
    let output = dir.join("segmentation_results.csv");

    let config = PipelineConfig::builder()
        .input_paths([source])
        .output_path(&output)
        .build();
    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::ColumnNotFound { .. })
    ));
    assert!(!output.exists());
}

#[test]
fn test_all_providers_filtered_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let source = dir.join("DY18.parquet");
    write_parquet(
        &source,
        &claims_batch(&[ClaimsRow::with_claims(1, 3.0), ClaimsRow::with_claims(2, 10.0)]),
    );
    let output = dir.join("segmentation_results.csv");

    let config = PipelineConfig::builder()
        .input_paths([source])
        .output_path(&output)
        .build();
    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::EmptyPopulation { .. })
    ));
    assert!(!output.exists());
}

/// Same input and seed give byte-identical output, whatever the source order
#[test]
fn test_rerun_is_reproducible() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let sources: Vec<_> = ["DY18.parquet", "DY19.parquet", "DY20.parquet"]
        .iter()
        .zip(0..)
        .map(|(name, year)| {
            let path = dir.join(name);
            write_parquet(&path, &claims_batch(&synthetic_population(150, year)));
            path
        })
        .collect();

    let run = |order: [usize; 3], name: &str| {
        let output = dir.join(name);
        let config = PipelineConfig::builder()
            .input_paths(order.map(|i| sources[i].as_path()))
            .output_path(&output)
            .random_seed(42)
            .build();
        run_pipeline(&config).unwrap();
        fs::read_to_string(output).unwrap()
    };

    let first = run([0, 1, 2], "first.csv");
    let second = run([0, 1, 2], "second.csv");
    let reversed = run([2, 1, 0], "reversed.csv");
    let rotated = run([1, 2, 0], "rotated.csv");

    assert_eq!(first, second);
    assert_eq!(first, reversed);
    assert_eq!(first, rotated);
    assert!(first.lines().count() > 100);
}
