//! Column names and Arrow schemas for prescriber summary data.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};

/// Prescriber identifier column
pub const PROVIDER_ID: &str = "Prscrbr_NPI";

pub const TOTAL_CLAIMS: &str = "Tot_Clms";
pub const TOTAL_DRUG_COST: &str = "Tot_Drug_Cst";
pub const TOTAL_DAY_SUPPLY: &str = "Tot_Day_Suply";
pub const TOTAL_BENEFICIARIES: &str = "Tot_Benes";
pub const ELDERLY_CLAIMS: &str = "GE65_Tot_Clms";
pub const ELDERLY_DRUG_COST: &str = "GE65_Tot_Drug_Cst";

/// Metric columns summed per provider, in aggregation order
pub const METRIC_COLUMNS: [&str; 6] = [
    TOTAL_CLAIMS,
    TOTAL_DRUG_COST,
    TOTAL_DAY_SUPPLY,
    TOTAL_BENEFICIARIES,
    ELDERLY_CLAIMS,
    ELDERLY_DRUG_COST,
];

pub const AVG_COST_PER_CLAIM: &str = "Avg_Cost_Per_Claim";
pub const ELDERLY_CLAIM_RATE: &str = "Elderly_Claim_Rate";
pub const CLAIMS_PER_PATIENT: &str = "Claims_Per_Patient";
pub const COST_PER_PATIENT: &str = "Cost_Per_Patient";
pub const AVG_DAY_SUPPLY: &str = "Avg_Day_Supply";

/// Derived features, in the column order both models consume
pub const FEATURE_NAMES: [&str; 5] = [
    AVG_COST_PER_CLAIM,
    ELDERLY_CLAIM_RATE,
    CLAIMS_PER_PATIENT,
    COST_PER_PATIENT,
    AVG_DAY_SUPPLY,
];

pub const CLUSTER_ID: &str = "Cluster_ID";
pub const ANOMALY_SCORE: &str = "AI_Anomaly_Score";
pub const FINAL_RISK_SCORE: &str = "Final_Risk_Score";
pub const RISK_CATEGORY: &str = "Risk_Category";
pub const NORM_COST: &str = "Norm_Cost";
pub const NORM_ELDERLY: &str = "Norm_Elderly";
pub const NORM_CLAIMS_PER_PATIENT: &str = "Norm_Claims_Per_Patient";

/// Exported columns, in file order
pub const EXPORT_COLUMNS: [&str; 13] = [
    PROVIDER_ID,
    TOTAL_CLAIMS,
    TOTAL_DRUG_COST,
    AVG_COST_PER_CLAIM,
    CLAIMS_PER_PATIENT,
    ELDERLY_CLAIM_RATE,
    CLUSTER_ID,
    ANOMALY_SCORE,
    FINAL_RISK_SCORE,
    RISK_CATEGORY,
    NORM_COST,
    NORM_ELDERLY,
    NORM_CLAIMS_PER_PATIENT,
];

/// Projection schema for reading input files
///
/// Only the names matter for projection; the types describe the usual
/// layout of the yearly files. The reader casts whatever it finds.
#[must_use]
pub fn claims_schema() -> Arc<Schema> {
    let mut fields = vec![Field::new(PROVIDER_ID, DataType::Utf8, false)];
    fields.extend(
        METRIC_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Float64, true)),
    );
    Arc::new(Schema::new(fields))
}

/// Arrow schema of the exported table
#[must_use]
pub fn export_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(PROVIDER_ID, DataType::Utf8, false),
        Field::new(TOTAL_CLAIMS, DataType::Float64, false),
        Field::new(TOTAL_DRUG_COST, DataType::Float64, false),
        Field::new(AVG_COST_PER_CLAIM, DataType::Float64, false),
        Field::new(CLAIMS_PER_PATIENT, DataType::Float64, false),
        Field::new(ELDERLY_CLAIM_RATE, DataType::Float64, false),
        Field::new(CLUSTER_ID, DataType::UInt32, false),
        Field::new(ANOMALY_SCORE, DataType::Float64, false),
        Field::new(FINAL_RISK_SCORE, DataType::Float64, false),
        Field::new(RISK_CATEGORY, DataType::Utf8, false),
        Field::new(NORM_COST, DataType::Float64, false),
        Field::new(NORM_ELDERLY, DataType::Float64, false),
        Field::new(NORM_CLAIMS_PER_PATIENT, DataType::Float64, false),
    ]))
}

/// Required input columns absent from `schema`
#[must_use]
pub fn missing_columns(schema: &Schema) -> Vec<&'static str> {
    std::iter::once(PROVIDER_ID)
        .chain(METRIC_COLUMNS)
        .filter(|name| schema.index_of(name).is_err())
        .collect()
}
