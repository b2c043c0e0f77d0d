//! Logging utilities for output and progress tracking

pub mod log;
pub mod progress;

pub use log::{
    log_operation_complete, log_operation_start, log_stage_complete, log_warning,
    log_write_complete,
};
pub use progress::{create_spinner, finish_spinner};
