//! # execrs Common Utilities (`common`)
//!
//! File: lib/src/common/mod.rs
//! Author: Christi Mahu
//!

//! ## Overview
//!
//! This module is the organizational entry point for the shared utility
//! modules of the library, keeping them separate from the core
//! infrastructure (`core::`: errors and configuration).
//!
//! ## Architecture
//!
//! - **`fs`**: Filesystem operations (directory creation, append-mode log files, file reads).
//! - **`process`**: Executing external commands: spawning, concurrent draining of stdout/stderr, stdin feeding, strict exit handling.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crate::common::{fs, process};
//!
//! fs::io::ensure_dir_exists(Path::new("./logs"))?;
//! let result = process::run(&command, &process::CallOptions::default())?;
//! ```
//!

/// Utilities for filesystem operations (I/O, append-mode log files).
pub mod fs;
/// Utilities for executing and managing external processes.
pub mod process;
