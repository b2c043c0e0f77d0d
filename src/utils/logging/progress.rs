//! Progress reporting for the model fits, using the indicatif crate

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Template for model-fitting spinners
pub const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {msg}";

/// Create a spinner for an operation without a known length
///
/// A hidden spinner is returned when `enabled` is false so callers do not
/// need to branch.
#[must_use]
pub fn create_spinner(message: &str, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    pb
}

/// Finish a spinner, leaving `message` on screen
pub fn finish_spinner(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(message.to_string());
}
