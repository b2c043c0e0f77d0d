//! CSV export of the scored provider table
//!
//! Rows are converted to an Arrow `RecordBatch` with `serde_arrow` against
//! the fixed export schema, then written with Arrow's CSV writer. The file
//! is written next to its destination and renamed into place, so a failed
//! export never leaves a partial table behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use arrow::csv::WriterBuilder;
use arrow::datatypes::FieldRef;
use arrow::record_batch::RecordBatch;
use serde::Serialize;

use crate::error::Result;
use crate::error::util::create_file_with_parents;
use crate::models::ScoredProvider;
use crate::schema::export_schema;
use crate::utils::logging::{log_operation_start, log_write_complete};

/// One exported row; field names are the output column names
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow<'a> {
    #[serde(rename = "Prscrbr_NPI")]
    pub provider_id: &'a str,
    #[serde(rename = "Tot_Clms")]
    pub total_claims: f64,
    #[serde(rename = "Tot_Drug_Cst")]
    pub total_drug_cost: f64,
    #[serde(rename = "Avg_Cost_Per_Claim")]
    pub avg_cost_per_claim: f64,
    #[serde(rename = "Claims_Per_Patient")]
    pub claims_per_patient: f64,
    #[serde(rename = "Elderly_Claim_Rate")]
    pub elderly_claim_rate: f64,
    #[serde(rename = "Cluster_ID")]
    pub cluster_id: u32,
    #[serde(rename = "AI_Anomaly_Score")]
    pub anomaly_score: f64,
    #[serde(rename = "Final_Risk_Score")]
    pub final_risk_score: f64,
    #[serde(rename = "Risk_Category")]
    pub risk_category: &'static str,
    #[serde(rename = "Norm_Cost")]
    pub norm_cost: f64,
    #[serde(rename = "Norm_Elderly")]
    pub norm_elderly: f64,
    #[serde(rename = "Norm_Claims_Per_Patient")]
    pub norm_claims_per_patient: f64,
}

impl<'a> From<&'a ScoredProvider> for ExportRow<'a> {
    fn from(scored: &'a ScoredProvider) -> Self {
        let aggregate = scored.aggregate();
        let features = scored.features();
        Self {
            provider_id: scored.provider_id(),
            total_claims: aggregate.total_claims,
            total_drug_cost: aggregate.total_drug_cost,
            avg_cost_per_claim: features.avg_cost_per_claim,
            claims_per_patient: features.claims_per_patient,
            elderly_claim_rate: features.elderly_claim_rate,
            cluster_id: u32::try_from(scored.model.cluster_id).unwrap_or(u32::MAX),
            anomaly_score: scored.model.anomaly_score,
            final_risk_score: scored.final_risk_score,
            risk_category: scored.risk_category.as_str(),
            norm_cost: scored.norm_cost,
            norm_elderly: scored.norm_elderly,
            norm_claims_per_patient: scored.norm_claims_per_patient,
        }
    }
}

/// Convert scored providers into a record batch with the export schema
pub fn scored_to_record_batch(scored: &[ScoredProvider]) -> Result<RecordBatch> {
    let schema = export_schema();
    let fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    let rows: Vec<ExportRow<'_>> = scored.iter().map(ExportRow::from).collect();

    serde_arrow::to_record_batch(&fields, &rows)
        .map_err(|e| anyhow::anyhow!("Failed to convert scored providers to Arrow: {e}"))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write scored providers to a CSV file with a header row
///
/// # Returns
/// The number of rows written
pub fn write_results_csv(path: &Path, scored: &[ScoredProvider]) -> Result<usize> {
    let start = Instant::now();
    log_operation_start("Writing results to", path);

    let batch = scored_to_record_batch(scored)?;

    let mut buffer = Vec::new();
    {
        let mut writer = WriterBuilder::new().with_header(true).build(&mut buffer);
        writer
            .write(&batch)
            .context("Failed to encode scored providers as CSV")?;
    }

    let staging = staging_path(path);
    let mut file = create_file_with_parents(&staging, "writing results")?;
    file.write_all(&buffer)
        .and_then(|()| file.sync_all())
        .with_context(|| format!("Failed to write {}", staging.display()))?;
    drop(file);

    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(e).with_context(|| format!("Failed to move results into {}", path.display()));
    }

    log_write_complete(path, batch.num_rows(), start.elapsed());
    Ok(batch.num_rows())
}
