//! # execrs Filesystem Utilities (`common::fs`)
//!
//! File: lib/src/common/fs/mod.rs
//! Author: Christi Mahu
//!

//! ## Overview
//!
//! Filesystem helpers shared by the configuration loader and the log-file
//! sink of the output drainers.
//!
//! - **`io`**: `ensure_dir_exists`, `read_file_to_string`, `open_append`.
//!
//! Callers import the specific submodule (e.g., `crate::common::fs::io::open_append`).
//!

/// Contains basic file I/O operations (e.g., `ensure_dir_exists`, `read_file_to_string`, `open_append`).
pub mod io;
