//! Shared utilities
//!
//! Logging helpers with a consistent message format, and progress spinners
//! for the long-running model fits.

pub mod logging;

pub use logging::{
    create_spinner, finish_spinner, log_operation_complete, log_operation_start,
    log_stage_complete, log_warning, log_write_complete,
};
