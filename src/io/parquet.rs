//! Parquet input sources
//!
//! Each configured file is one data year of prescriber summaries. Files are
//! read in parallel with only the identifier and metric columns projected.
//! A missing file is skipped with a warning; any other failure is fatal.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use parquet::arrow::{ProjectionMask, arrow_reader::ParquetRecordBatchReaderBuilder};
use rayon::prelude::*;

use crate::error::util::open_optional_file;
use crate::error::{Error, Result};
use crate::schema::missing_columns;
use crate::utils::logging::{log_operation_complete, log_operation_start, log_warning};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Batches read from every available source
#[derive(Debug, Default)]
pub struct LoadedSources {
    /// Record batches of all sources, in source order
    pub batches: Vec<RecordBatch>,
    /// Sources that were read
    pub sources_read: Vec<PathBuf>,
    /// Sources that did not exist
    pub sources_missing: Vec<PathBuf>,
}

impl LoadedSources {
    /// Total number of rows across all batches
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }
}

/// Build a projection mask selecting the columns of `schema` present in the file
///
/// Returns `None` if none of the requested columns exist.
#[must_use]
pub fn create_projection(
    schema: &Schema,
    file_schema: &Schema,
    parquet_schema: &parquet::schema::types::SchemaDescriptor,
) -> Option<ProjectionMask> {
    let projection = schema
        .fields()
        .iter()
        .filter_map(|f| file_schema.index_of(f.name()).ok())
        .sorted_unstable()
        .collect_vec();

    if projection.is_empty() {
        None
    } else {
        Some(ProjectionMask::roots(parquet_schema, projection))
    }
}

/// Read one claims source into Arrow record batches
///
/// # Returns
/// `Ok(None)` when the file does not exist, otherwise the projected batches
///
/// # Errors
/// Returns an error if the file cannot be opened or decoded, or if it lacks
/// any of the required columns
pub fn read_claims_source(path: &Path, schema: &Schema) -> Result<Option<Vec<RecordBatch>>> {
    let Some(file) = open_optional_file(path, "reading claims source")? else {
        return Ok(None);
    };

    let start = Instant::now();
    log_operation_start("Reading claims source", path);

    let reader_builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("Failed to read parquet file {}", path.display()))?;

    let file_schema = reader_builder.schema().clone();
    if let Some(column) = missing_columns(&file_schema).first() {
        return Err(Error::ColumnNotFound {
            column: (*column).to_string(),
        })
        .with_context(|| format!("Invalid claims source {}", path.display()));
    }

    let projection = create_projection(schema, &file_schema, reader_builder.parquet_schema());
    let reader_builder = match projection {
        Some(mask) => reader_builder.with_projection(mask),
        None => reader_builder,
    };

    let reader = reader_builder
        .with_batch_size(DEFAULT_BATCH_SIZE)
        .build()
        .with_context(|| format!("Failed to build parquet reader for {}", path.display()))?;

    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read record batch from {}", path.display()))?;

    let rows = batches.iter().map(RecordBatch::num_rows).sum();
    log_operation_complete("read", path, rows, Some(start.elapsed()));

    Ok(Some(batches))
}

/// Load all claims sources in parallel
///
/// Missing sources are logged and skipped.
///
/// # Errors
/// Returns [`Error::NoReadableSources`] if no source exists, or the first
/// read failure of an existing source
pub fn load_claims_sources(paths: &[PathBuf], schema: &Schema) -> Result<LoadedSources> {
    let results: Vec<Result<Option<Vec<RecordBatch>>>> = paths
        .par_iter()
        .map(|path| read_claims_source(path, schema))
        .collect();

    let mut loaded = LoadedSources::default();
    for (path, result) in paths.iter().zip(results) {
        match result? {
            Some(batches) => {
                loaded.batches.extend(batches);
                loaded.sources_read.push(path.clone());
            }
            None => {
                log_warning("Could not find input source", Some(path));
                loaded.sources_missing.push(path.clone());
            }
        }
    }

    if loaded.sources_read.is_empty() {
        return Err(Error::NoReadableSources {
            attempted: paths.len(),
        }
        .into());
    }

    log::info!(
        "Loaded {} rows from {} of {} input sources",
        loaded.num_rows(),
        loaded.sources_read.len(),
        paths.len()
    );

    Ok(loaded)
}
