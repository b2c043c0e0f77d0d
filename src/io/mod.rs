//! Reading input sources and writing the scored table

pub mod export;
pub mod parquet;

pub use export::{ExportRow, scored_to_record_batch, write_results_csv};
pub use parquet::{DEFAULT_BATCH_SIZE, LoadedSources, load_claims_sources, read_claims_source};
