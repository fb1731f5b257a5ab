//! # execrs Process Execution Utilities (`common::process`)
//!
//! File: lib/src/common/process/mod.rs
//! Author: Christi Mahu
//!

//! ## Overview
//!
//! This module executes external commands synchronously while streaming and
//! capturing their output without deadlocking on full pipe buffers.
//!
//! ## Architecture
//!
//! - **`drainer`**: `StreamDrainer`, one background thread per output pipe. Tees each line to a log file, the console and a line handler, and accumulates it in memory.
//! - **`feeder`**: `StdinFeeder`, a background thread that writes a stdin payload and closes the pipe.
//! - **`handle`**: `ProcessHandle`, which owns one child: spawn (`prepare`), `wait`, `wait_timeout`, `kill`. Also `ExecutionResult`.
//! - **`call`**: `run` / `call` convenience entry points configured by `CallOptions`.
//!
//! All concurrency is plain OS threads; every call blocks until the child
//! and its workers are done. Nothing is shared between calls except a log
//! file two callers choose to point at.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use execrs::common::process::{call, CallOptions, CallOutput};
//!
//! # fn main() -> anyhow::Result<()> {
//! let options = CallOptions::default().log_file("/tmp/build.log").return_stderr(true);
//! if let CallOutput::Both { stdout, stderr } = call(&["make", "all"], &options)? {
//!     println!("stdout: {stdout}\nstderr: {stderr}");
//! }
//! # Ok(())
//! # }
//! ```
//!
use std::fmt;
use std::sync::Arc;

pub mod call;
pub mod drainer;
pub mod feeder;
pub mod handle;

pub use call::{call, run, CallOptions, CallOutput};
pub use drainer::{DrainSettings, LogSink, StreamDrainer};
pub use feeder::StdinFeeder;
pub use handle::{ExecutionResult, HandleState, ProcessHandle};

/// One of the two output pipes of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => f.write_str("stdout"),
            Stream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Callback invoked with every line drained from a child, tagged with its stream.
///
/// A line that is very long, or still unterminated when the pipe goes
/// quiet, is delivered in several pieces.
///
/// Runs on the drainer threads, so it must be `Send + Sync`; the stdout and
/// stderr drainers may call it concurrently.
pub type LineHandler = Arc<dyn Fn(Stream, &str) + Send + Sync>;
