//! Per-provider aggregation of yearly claims records
//!
//! All batches of all sources are treated as one multiset of rows, grouped
//! by provider identifier, with every metric summed independently. Each
//! provider's observations are buffered and summed in sorted order so the
//! totals do not depend on which source was read first.

use std::time::Instant;

use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::compute::{can_cast_types, cast};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::models::ProviderAggregate;
use crate::schema::{METRIC_COLUMNS, PROVIDER_ID};
use crate::utils::logging::{log_stage_complete, log_warning};

/// Fetch `column` from `batch`, cast to `target`
fn cast_column(batch: &RecordBatch, column: &str, target: &DataType) -> Result<ArrayRef> {
    let idx = batch.schema().index_of(column).map_err(|_| Error::ColumnNotFound {
        column: column.to_string(),
    })?;

    let array = batch.column(idx);
    if array.data_type() == target {
        return Ok(array.clone());
    }
    if !can_cast_types(array.data_type(), target) {
        return Err(Error::InvalidColumnType {
            column: column.to_string(),
            actual: array.data_type().to_string(),
        }
        .into());
    }

    Ok(cast(array, target)?)
}

/// Provider identifiers of a batch as strings, whatever their stored type
pub fn provider_id_column(batch: &RecordBatch) -> Result<StringArray> {
    let array = cast_column(batch, PROVIDER_ID, &DataType::Utf8)?;
    array
        .as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Failed to downcast column '{PROVIDER_ID}' to strings"))
}

/// A metric column of a batch as `f64`
pub fn metric_column(batch: &RecordBatch, column: &str) -> Result<Float64Array> {
    let array = cast_column(batch, column, &DataType::Float64)?;
    array
        .as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Failed to downcast column '{column}' to f64"))
}

fn cell(array: &Float64Array, row: usize) -> Option<f64> {
    if array.is_null(row) {
        return None;
    }
    Some(array.value(row)).filter(|v| !v.is_nan())
}

/// Group all rows by provider and sum each metric
///
/// Null or NaN metric cells contribute nothing to the sum. Rows without a
/// provider identifier are dropped. The result is ordered by provider id and
/// does not depend on the order of `batches`.
pub fn aggregate_batches(batches: &[RecordBatch]) -> Result<Vec<ProviderAggregate>> {
    let start = Instant::now();
    let mut groups: FxHashMap<String, Vec<[Option<f64>; 6]>> = FxHashMap::default();
    let mut dropped = 0usize;

    for batch in batches {
        let ids = provider_id_column(batch)?;
        let metrics: Vec<Float64Array> = METRIC_COLUMNS
            .iter()
            .map(|column| metric_column(batch, column))
            .collect::<Result<_>>()?;

        for row in 0..batch.num_rows() {
            if ids.is_null(row) {
                dropped += 1;
                continue;
            }
            let values: [Option<f64>; 6] = std::array::from_fn(|i| cell(&metrics[i], row));

            let id = ids.value(row);
            if let Some(observations) = groups.get_mut(id) {
                observations.push(values);
            } else {
                groups.insert(id.to_string(), vec![values]);
            }
        }
    }

    if dropped > 0 {
        log_warning(
            &format!("Dropped {dropped} rows without a {PROVIDER_ID} value"),
            None,
        );
    }

    let aggregates = groups
        .into_iter()
        .sorted_unstable_by(|a, b| a.0.cmp(&b.0))
        .map(|(id, observations)| ProviderAggregate::from_observations(id, &observations))
        .collect_vec();

    log_stage_complete("Aggregated", aggregates.len(), start.elapsed());
    Ok(aggregates)
}
