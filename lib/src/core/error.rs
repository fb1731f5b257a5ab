//! # execrs Error Types
//!
//! File: lib/src/core/error.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module defines the error types used throughout the execrs library.
//! Every failure a caller may want to react to (bad options, a child that
//! exited non-zero, a timeout) has its own `ExecError` variant carrying the
//! data needed to diagnose it without re-running the command.
//!
//! ## Architecture
//!
//! The error system consists of two main components:
//! - `ExecError`: A custom error enum using `thiserror` for specific error types
//! - `Result<T>`: A type alias for `anyhow::Result<T>` for flexible error handling
//!
//! Spawn failures (executable not found, permission denied) are *not* wrapped:
//! the native `std::io::Error` is propagated as-is inside the `anyhow::Error`.
//!
//! ## Examples
//!
//! ```rust
//! use execrs::{call, CallOptions, ExecError};
//!
//! let command = vec!["sh".to_string(), "-c".to_string(), "exit 7".to_string()];
//! match call(&command, &CallOptions::default()) {
//!     Ok(output) => println!("{:?}", output),
//!     Err(e) => match e.downcast_ref::<ExecError>() {
//!         Some(exec_err) if exec_err.returncode() == Some(7) => println!("exit 7: {}", exec_err),
//!         _ => eprintln!("other failure: {e}"),
//!     },
//! }
//! ```
//!
use crate::common::process::ExecutionResult;
use std::time::Duration;
use thiserror::Error;

/// Custom error type for the execrs library.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Filesystem error: {0}")]
    FileSystem(String),

    #[error("Invalid process state: {0}")]
    InvalidState(String),

    /// The child exited with a non-zero status while strict mode was on.
    #[error("error while executing {command:?},\nstdout: {stdout}\nstderr: {stderr}\n")]
    NonZeroExit {
        command: Vec<String>,
        returncode: i32,
        stdout: String,
        stderr: String,
    },

    /// The child wrote to stderr and the caller asked for that to be fatal.
    #[error("error while executing {command:?} (stderr not empty),\nstdout: {stdout}\nstderr: {stderr}\n")]
    StderrNotEmpty {
        command: Vec<String>,
        returncode: i32,
        stdout: String,
        stderr: String,
    },

    #[error("timed out after {timeout:?} while executing {command:?},\nstdout: {stdout}\nstderr: {stderr}\n")]
    TimedOut {
        command: Vec<String>,
        timeout: Duration,
        stdout: String,
        stderr: String,
    },
}

impl ExecError {
    /// Builds the strict-mode failure for `command` from its finished result.
    pub fn non_zero_exit(command: &[String], result: ExecutionResult) -> Self {
        ExecError::NonZeroExit {
            command: command.to_vec(),
            returncode: result.returncode,
            stdout: result.stdout,
            stderr: result.stderr,
        }
    }

    /// Builds the "stderr is fatal" failure for `command` from its finished result.
    pub fn stderr_not_empty(command: &[String], result: ExecutionResult) -> Self {
        ExecError::StderrNotEmpty {
            command: command.to_vec(),
            returncode: result.returncode,
            stdout: result.stdout,
            stderr: result.stderr,
        }
    }

    /// Exit status of the child, for variants produced by a finished process.
    pub fn returncode(&self) -> Option<i32> {
        match self {
            ExecError::NonZeroExit { returncode, .. }
            | ExecError::StderrNotEmpty { returncode, .. } => Some(*returncode),
            _ => None,
        }
    }

    /// The command that was executed, for process-outcome variants.
    pub fn command(&self) -> Option<&[String]> {
        match self {
            ExecError::NonZeroExit { command, .. }
            | ExecError::StderrNotEmpty { command, .. }
            | ExecError::TimedOut { command, .. } => Some(command),
            _ => None,
        }
    }

    /// Reassembles the full `ExecutionResult` carried by a process-outcome variant.
    pub fn execution_result(&self) -> Option<ExecutionResult> {
        match self {
            ExecError::NonZeroExit {
                returncode,
                stdout,
                stderr,
                ..
            }
            | ExecError::StderrNotEmpty {
                returncode,
                stdout,
                stderr,
                ..
            } => Some(ExecutionResult {
                returncode: *returncode,
                stdout: stdout.clone(),
                stderr: stderr.clone(),
            }),
            _ => None,
        }
    }
}

/// Type alias for Result using anyhow::Error for broad compatibility.
/// Anyhow allows for easy context addition and flexible error handling.
pub type Result<T> = anyhow::Result<T>;
