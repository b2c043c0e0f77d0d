use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use prescriber_risk::schema::{METRIC_COLUMNS, PROVIDER_ID};

/// One claims row: provider id and the six metrics in `METRIC_COLUMNS` order
#[derive(Debug, Clone, Copy)]
pub struct ClaimsRow {
    pub npi: i64,
    pub metrics: [f64; 6],
}

impl ClaimsRow {
    /// Row with plausible metrics derived from the claim count
    #[must_use]
    pub fn with_claims(npi: i64, claims: f64) -> Self {
        Self {
            npi,
            metrics: [claims, claims * 42.5, claims * 30.0, claims / 3.0, claims * 0.4, claims * 17.0],
        }
    }
}

/// Build a batch with the yearly file layout
#[must_use]
pub fn claims_batch(rows: &[ClaimsRow]) -> RecordBatch {
    let mut fields = vec![Field::new(PROVIDER_ID, DataType::Int64, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(Int64Array::from(
        rows.iter().map(|r| r.npi).collect::<Vec<_>>(),
    ))];
    for (i, name) in METRIC_COLUMNS.iter().enumerate() {
        fields.push(Field::new(*name, DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(
            rows.iter().map(|r| r.metrics[i]).collect::<Vec<_>>(),
        )));
    }
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).expect("valid claims batch")
}

/// Write `batch` to a Parquet file
pub fn write_parquet(path: &Path, batch: &RecordBatch) {
    let file = File::create(path).expect("create parquet file");
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).expect("parquet writer");
    writer.write(batch).expect("write batch");
    writer.close().expect("close parquet writer");
}

/// A deterministic population of `n` providers; every ninth has too few
/// claims and provider 1 is an extreme prescriber
#[must_use]
pub fn synthetic_population(n: i64, year_offset: i64) -> Vec<ClaimsRow> {
    (0..n)
        .map(|i| {
            let npi = 1_000_000_000 + i;
            if i % 9 == 0 {
                return ClaimsRow::with_claims(npi, 2.0 + (i % 3) as f64);
            }
            let claims = 6.0 + ((i * 37 + year_offset * 11) % 400) as f64;
            let unit_cost = 20.0 + ((i * 13 + year_offset) % 90) as f64;
            let beneficiaries = if i % 17 == 0 { 0.0 } else { 1.0 + ((i * 7) % 50) as f64 };
            let elderly_share = ((i * 11 + year_offset * 3) % 100) as f64 / 100.0;
            let mut row = ClaimsRow {
                npi,
                metrics: [
                    claims,
                    claims * unit_cost,
                    claims * (15.0 + (i % 60) as f64),
                    beneficiaries,
                    claims * elderly_share,
                    claims * unit_cost * elderly_share,
                ],
            };
            if i == 1 {
                row.metrics[1] = claims * 25_000.0;
                row.metrics[3] = 1.0;
            }
            row
        })
        .collect()
}
