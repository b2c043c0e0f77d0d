//! Utility functions for error handling
//!
//! Helpers that turn file-system failures into errors carrying the path and
//! the purpose of the operation.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::Context;

use crate::error::Result;

/// Open a file that is allowed to be absent
///
/// Returns `Ok(None)` when the file does not exist. Every other failure
/// (permissions, path is a directory, ...) is an error with the path and
/// `purpose` attached.
pub fn open_optional_file(path: &Path, purpose: &str) -> Result<Option<fs::File>> {
    if path.exists() && !path.is_file() {
        anyhow::bail!("Path is not a file: {} (needed for: {purpose})", path.display());
    }

    match fs::File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => {
            let context = match e.kind() {
                io::ErrorKind::PermissionDenied => {
                    "Permission denied - check file permissions".to_string()
                }
                _ => format!("Failed to open file for: {purpose}"),
            };
            Err(e).with_context(|| format!("{context}: {}", path.display()))
        }
    }
}

/// Create a file, creating missing parent directories first
pub fn create_file_with_parents(path: &Path, purpose: &str) -> Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create directory {} for: {purpose}", parent.display())
        })?;
    }

    fs::File::create(path)
        .with_context(|| format!("Failed to create {} for: {purpose}", path.display()))
}
