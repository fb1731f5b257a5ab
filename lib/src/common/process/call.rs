//! # Synchronous Call Entry Points (`common::process::call`)
//!
//! File: lib/src/common/process/call.rs
//! Author: Christi Mahu
//!

//! ## Overview
//!
//! `run` and `call` are the single synchronous calls most code uses. They
//! build a [`ProcessHandle`] from [`CallOptions`], feed stdin, wait for the
//! child and all workers, and then apply the success contract:
//!
//! - **strict** (default on): a non-zero exit becomes `ExecError::NonZeroExit`,
//!   whose message contains the command and both captured streams.
//! - **stderr_is_error** (default off): non-empty stderr becomes
//!   `ExecError::StderrNotEmpty`. Without it, stderr output alone is never fatal.
//!
//! `run` returns the whole [`ExecutionResult`]; `call` projects it to what
//! the caller asked for (stdout, stdout + stderr, or nothing).
//!
//! ## Newline policy
//!
//! Captured text is returned exactly as the child wrote it, trailing newline
//! included. `trim_trailing_newline(true)` removes one trailing `\n` (or
//! `\r\n`) from each returned stream.
//!
use super::handle::{ExecutionResult, ProcessHandle};
use super::LineHandler;
use crate::core::config::Config;
use crate::core::error::{ExecError, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Options for [`run`] and [`call`]. `Default` gives the strict, capturing variant.
#[derive(Clone)]
pub struct CallOptions {
    stdin_str: Option<String>,
    stdin_bytes: Option<Vec<u8>>,
    log_file: Option<PathBuf>,
    log_console: bool,
    cwd: Option<PathBuf>,
    capture_output: bool,
    env: Option<HashMap<String, String>>,
    on_line: Option<LineHandler>,
    return_stderr: bool,
    strict: bool,
    stderr_is_error: bool,
    create_log_dir: bool,
    timeout: Option<Duration>,
    trim_trailing_newline: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        CallOptions {
            stdin_str: None,
            stdin_bytes: None,
            log_file: None,
            log_console: false,
            cwd: None,
            capture_output: true,
            env: None,
            on_line: None,
            return_stderr: false,
            strict: true,
            stderr_is_error: false,
            create_log_dir: true,
            timeout: None,
            trim_trailing_newline: false,
        }
    }
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("stdin_str", &self.stdin_str.as_ref().map(String::len))
            .field("stdin_bytes", &self.stdin_bytes.as_ref().map(Vec::len))
            .field("log_file", &self.log_file)
            .field("log_console", &self.log_console)
            .field("cwd", &self.cwd)
            .field("capture_output", &self.capture_output)
            .field("env", &self.env.as_ref().map(HashMap::len))
            .field("on_line", &self.on_line.is_some())
            .field("return_stderr", &self.return_stderr)
            .field("strict", &self.strict)
            .field("stderr_is_error", &self.stderr_is_error)
            .field("create_log_dir", &self.create_log_dir)
            .field("timeout", &self.timeout)
            .field("trim_trailing_newline", &self.trim_trailing_newline)
            .finish()
    }
}

impl CallOptions {
    /// Seeds options from the `[call]` section of a loaded [`Config`].
    pub fn from_config(config: &Config) -> Self {
        let defaults = &config.call;
        CallOptions {
            log_file: defaults.log_file.as_ref().map(PathBuf::from),
            log_console: defaults.log_console,
            cwd: defaults.cwd.as_ref().map(PathBuf::from),
            capture_output: defaults.capture_output,
            return_stderr: defaults.return_stderr,
            strict: defaults.strict,
            stderr_is_error: defaults.stderr_is_error,
            create_log_dir: defaults.create_log_dir,
            timeout: defaults.timeout_secs.map(Duration::from_secs),
            trim_trailing_newline: defaults.trim_trailing_newline,
            ..CallOptions::default()
        }
    }

    /// Sends `input` (UTF-8) to the child's stdin. Mutually exclusive with `stdin_bytes`.
    pub fn stdin_str(mut self, input: impl Into<String>) -> Self {
        self.stdin_str = Some(input.into());
        self
    }

    /// Sends raw `input` to the child's stdin. Mutually exclusive with `stdin_str`.
    pub fn stdin_bytes(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin_bytes = Some(input.into());
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn log_console(mut self, echo: bool) -> Self {
        self.log_console = echo;
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// Replaces the child's environment. Copy `std::env::vars()` first to extend it instead.
    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn on_line(mut self, handler: LineHandler) -> Self {
        self.on_line = Some(handler);
        self
    }

    /// Makes [`call`] return `CallOutput::Both` instead of `CallOutput::Stdout`.
    pub fn return_stderr(mut self, both: bool) -> Self {
        self.return_stderr = both;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn stderr_is_error(mut self, fatal: bool) -> Self {
        self.stderr_is_error = fatal;
        self
    }

    pub fn create_log_dir(mut self, create: bool) -> Self {
        self.create_log_dir = create;
        self
    }

    /// Kills the child (its whole process group on Unix) and fails with
    /// `ExecError::TimedOut` if it runs longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn trim_trailing_newline(mut self, trim: bool) -> Self {
        self.trim_trailing_newline = trim;
        self
    }

    /// The stdin payload, or a configuration error if both forms were given.
    fn stdin_payload(&self) -> Result<Option<Vec<u8>>> {
        match (&self.stdin_str, &self.stdin_bytes) {
            (Some(_), Some(_)) => Err(ExecError::Config(
                "stdin_str and stdin_bytes are mutually exclusive".to_string(),
            )
            .into()),
            (Some(text), None) => Ok(Some(text.clone().into_bytes())),
            (None, Some(bytes)) => Ok(Some(bytes.clone())),
            (None, None) => Ok(None),
        }
    }

    fn handle_for(&self, command: Vec<String>) -> ProcessHandle {
        let mut handle = ProcessHandle::new(command)
            .capture(self.capture_output || self.stderr_is_error)
            .strict(self.strict)
            .log_console(self.log_console)
            .create_log_dir(self.create_log_dir);
        if let Some(dir) = &self.cwd {
            handle = handle.cwd(dir.clone());
        }
        if let Some(env) = &self.env {
            handle = handle.env(env.clone());
        }
        if let Some(path) = &self.log_file {
            handle = handle.log_file(path.clone());
        }
        if let Some(handler) = &self.on_line {
            handle = handle.on_line(handler.clone());
        }
        handle
    }
}

/// What [`call`] hands back, depending on `capture_output` and `return_stderr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutput {
    /// `capture_output(false)`: output went only to the log file / console / handler.
    Discarded,
    Stdout(String),
    Both { stdout: String, stderr: String },
}

impl CallOutput {
    /// Captured stdout, if any was captured.
    pub fn stdout(&self) -> Option<&str> {
        match self {
            CallOutput::Discarded => None,
            CallOutput::Stdout(stdout) | CallOutput::Both { stdout, .. } => Some(stdout),
        }
    }

    /// Captured stderr, only present with `return_stderr(true)`.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            CallOutput::Both { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Runs `command` to completion and returns its full [`ExecutionResult`].
///
/// # Errors
///
/// - `ExecError::Config`: empty command, or both stdin forms given (checked before spawning).
/// - Native `std::io::Error`: the program could not be spawned.
/// - `ExecError::NonZeroExit`: strict mode and a non-zero exit.
/// - `ExecError::StderrNotEmpty`: `stderr_is_error` and the child wrote to stderr.
/// - `ExecError::TimedOut`: the configured timeout expired.
pub fn run<S: AsRef<str>>(command: &[S], options: &CallOptions) -> Result<ExecutionResult> {
    let command: Vec<String> = command.iter().map(|s| s.as_ref().to_string()).collect();
    let stdin = options.stdin_payload()?;
    debug!("Running {:?} with {:?}", command, options);

    let mut handle = options.handle_for(command);
    handle.prepare(stdin)?;
    let mut result = match options.timeout {
        Some(timeout) => handle.wait_timeout(timeout)?,
        None => handle.wait()?,
    };

    if options.stderr_is_error && !result.stderr.is_empty() {
        anyhow::bail!(ExecError::stderr_not_empty(handle.command(), result));
    }
    if !options.capture_output {
        result.stdout.clear();
        result.stderr.clear();
    }
    if options.trim_trailing_newline {
        trim_newline(&mut result.stdout);
        trim_newline(&mut result.stderr);
    }
    Ok(result)
}

/// Runs `command` and returns its captured output per `options`.
///
/// See [`run`] for the error contract.
///
/// ```rust
/// # #[cfg(unix)]
/// # fn main() -> anyhow::Result<()> {
/// use execrs::{call, CallOptions, CallOutput};
///
/// let out = call(&["sh", "-c", "echo hello"], &CallOptions::default())?;
/// assert_eq!(out, CallOutput::Stdout("hello\n".to_string()));
/// # Ok(())
/// # }
/// # #[cfg(not(unix))]
/// # fn main() {}
/// ```
pub fn call<S: AsRef<str>>(command: &[S], options: &CallOptions) -> Result<CallOutput> {
    let result = run(command, options)?;
    Ok(if !options.capture_output {
        CallOutput::Discarded
    } else if options.return_stderr {
        CallOutput::Both {
            stdout: result.stdout,
            stderr: result.stderr,
        }
    } else {
        CallOutput::Stdout(result.stdout)
    })
}

fn trim_newline(text: &mut String) {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
}
