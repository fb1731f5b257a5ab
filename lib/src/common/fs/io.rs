//! # execrs Filesystem I/O Operations
//!
//! File: lib/src/common/fs/io.rs
//! Author: Christi Mahu
//!

//! ## Overview
//!
//! This module centralizes the few filesystem operations the library needs:
//! making sure a log directory exists, reading configuration files, and
//! opening log files in append mode so output from successive runs
//! accumulates instead of being overwritten.
//!
//! ## Architecture
//!
//! - **`ensure_dir_exists`**: Creates a directory (and parents) if missing; errors if the path exists but is not a directory.
//! - **`read_file_to_string`**: Wraps `fs::read_to_string` with `anyhow::Context`.
//! - **`open_append`**: Opens (creating if needed) a file for appending. Optionally creates the parent directory first.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crate::common::fs::io;
//!
//! io::ensure_dir_exists(Path::new("./logs"))?;
//! let log = io::open_append(Path::new("./logs/build.log"), true)?;
//! ```
//!
use crate::core::error::{ExecError, Result};
use anyhow::Context;
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use tracing::{debug, info};

/// Ensures that a directory exists at the specified path.
///
/// If the path does not exist, this function creates it, including any
/// necessary parent directories (similar to `mkdir -p`).
///
/// # Errors
///
/// Returns an `Err` if:
/// - The path exists but is not a directory (`ExecError::FileSystem`).
/// - Creating the directory fails (e.g., due to permissions).
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {:?}", path))?;
        info!("Created directory: {:?}", path);
    } else if !path.is_dir() {
        anyhow::bail!(ExecError::FileSystem(format!(
            "Path exists but is not a directory: {:?}",
            path
        )));
    } else {
        debug!("Directory already exists: {:?}", path);
    }
    Ok(())
}

/// Reads the entire content of a file into a string, with the path in the error context.
pub fn read_file_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file {:?}", path))
}

/// Opens `path` for appending, creating the file if it does not exist.
///
/// When `create_parent` is true, a missing parent directory is created with
/// [`ensure_dir_exists`]. When it is false and the parent is missing, an
/// `ExecError::FileSystem` is returned instead of an opaque I/O error.
///
/// # Errors
///
/// Returns an `Err` if the parent directory is missing (and may not be
/// created), cannot be created, or the file cannot be opened.
pub fn open_append(path: &Path, create_parent: bool) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if create_parent {
            ensure_dir_exists(parent)?;
        } else if !parent.is_dir() {
            anyhow::bail!(ExecError::FileSystem(format!(
                "Log directory does not exist: {:?}",
                parent
            )));
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {:?} for appending", path))?;
    debug!("Opened {:?} in append mode", path);
    Ok(file)
}
