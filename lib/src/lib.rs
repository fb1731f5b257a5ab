//! # execrs Library Entry Point
//!
//! File: lib/src/lib.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! execrs runs external commands synchronously and hands back their output.
//! It exists to get the fiddly parts right once:
//! - stdout and stderr are drained on their own threads while the child
//!   runs, so a child writing megabytes never deadlocks on a full pipe;
//! - stdin payloads are fed on a separate thread and the pipe is closed
//!   afterwards (or immediately, when there is no payload);
//! - output can be teed to an append-mode log file, the console and a
//!   per-line callback while it is captured;
//! - a non-zero exit is an error by default (strict mode), carrying the
//!   command and both streams in a directly printable message.
//!
//! ## Architecture
//!
//! - `core::error`: `ExecError` and the crate-wide `Result` alias.
//! - `core::config`: TOML configuration for call defaults.
//! - `common::fs`: filesystem helpers (append-mode log files).
//! - `common::process`: drainers, stdin feeder, `ProcessHandle`, `run` / `call`.
//!
//! ## Examples
//!
//! ```rust
//! # #[cfg(unix)]
//! # fn main() -> anyhow::Result<()> {
//! use execrs::{call, run, CallOptions, ExecError};
//!
//! // Captured stdout, returned byte-for-byte.
//! let out = call(&["sh", "-c", "echo hello"], &CallOptions::default())?;
//! assert_eq!(out.stdout(), Some("hello\n"));
//!
//! // Strict mode turns a non-zero exit into an error.
//! let err = call(&["sh", "-c", "exit 7"], &CallOptions::default()).unwrap_err();
//! assert_eq!(err.downcast_ref::<ExecError>().and_then(ExecError::returncode), Some(7));
//!
//! // Non-strict mode returns the result for inspection instead.
//! let result = run(&["sh", "-c", "exit 7"], &CallOptions::default().strict(false))?;
//! assert_eq!(result.returncode, 7);
//! # Ok(())
//! # }
//! # #[cfg(not(unix))]
//! # fn main() {}
//! ```
//!
pub mod common;
pub mod core;

pub use crate::common::process::{
    call, run, CallOptions, CallOutput, ExecutionResult, HandleState, LineHandler,
    ProcessHandle, Stream,
};
pub use crate::core::config;
pub use crate::core::error::{ExecError, Result};
