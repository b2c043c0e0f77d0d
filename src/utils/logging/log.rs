//! Logging utilities
//!
//! Standardized log lines for file operations and pipeline stages.

use std::path::Path;
use std::time::Duration;

/// Log the start of an operation on a file
pub fn log_operation_start(operation: &str, path: &Path) {
    log::info!("{} {}", operation, path.display());
}

/// Log the completion of an operation on a file
///
/// # Arguments
/// * `operation` - Past-tense verb, e.g. "read"
/// * `path` - File that was operated on
/// * `items` - Number of items (rows, batches) processed
/// * `elapsed` - Optional elapsed time
pub fn log_operation_complete(
    operation: &str,
    path: &Path,
    items: usize,
    elapsed: Option<Duration>,
) {
    if let Some(duration) = elapsed {
        log::info!(
            "Successfully {} {} items from {} in {:?}",
            operation,
            items,
            path.display(),
            duration
        );
    } else {
        log::info!(
            "Successfully {} {} items from {}",
            operation,
            items,
            path.display()
        );
    }
}

/// Log the completion of a write to a file
pub fn log_write_complete(path: &Path, rows: usize, elapsed: Duration) {
    log::info!(
        "Successfully wrote {} rows to {} in {:?}",
        rows,
        path.display(),
        elapsed
    );
}

/// Log the completion of an in-memory pipeline stage
pub fn log_stage_complete(stage: &str, providers: usize, elapsed: Duration) {
    log::info!("{stage}: {providers} providers in {elapsed:?}");
}

/// Log a warning, optionally naming the file it concerns
pub fn log_warning(message: &str, path: Option<&Path>) {
    if let Some(path) = path {
        log::warn!("{}: {}", message, path.display());
    } else {
        log::warn!("{message}");
    }
}
