//! # Process Handle (`common::process::handle`)
//!
//! File: lib/src/common/process/handle.rs
//! Author: Christi Mahu
//!

//! ## Overview
//!
//! `ProcessHandle` owns the full lifecycle of one child process:
//!
//! ```text
//! Created --prepare()--> Running --wait()--> Completed
//!                           |
//!                           +--kill()--> Killed --wait()--> Completed
//! ```
//!
//! `prepare` spawns the child with stdin, stdout and stderr all piped, then
//! starts one [`StreamDrainer`] per output pipe *before* anything waits on
//! the child. Stdin is either handed to a [`StdinFeeder`] or closed at once,
//! so a child that reads stdin gets EOF instead of hanging.
//!
//! `wait` blocks until the child exits and then joins every worker before
//! reading the captured buffers; checking the exit status alone would risk
//! returning output that is still sitting in the pipes.
//!
use super::drainer::{DrainSettings, LogSink, StreamDrainer};
use super::feeder::StdinFeeder;
use super::{LineHandler, Stream};
use crate::core::error::{ExecError, Result};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// Immutable outcome of a finished child process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionResult {
    /// Exit code; `-N` when the child was terminated by signal `N` (Unix).
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    /// Whether the child exited with status 0.
    pub fn success(&self) -> bool {
        self.returncode == 0
    }
}

/// Lifecycle state of a [`ProcessHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Created,
    Running,
    Completed,
    Killed,
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleState::Created => "created",
            HandleState::Running => "running",
            HandleState::Completed => "completed",
            HandleState::Killed => "killed",
        };
        f.write_str(name)
    }
}

/// Owner of one child process and the workers attached to its pipes.
pub struct ProcessHandle {
    command: Vec<String>,
    cwd: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
    capture: bool,
    strict: bool,
    log_file: Option<PathBuf>,
    log_console: bool,
    create_log_dir: bool,
    on_line: Option<LineHandler>,
    state: HandleState,
    child: Option<Child>,
    stdout: Option<StreamDrainer>,
    stderr: Option<StreamDrainer>,
    feeder: Option<StdinFeeder>,
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("command", &self.command)
            .field("cwd", &self.cwd)
            .field("state", &self.state)
            .field("pid", &self.id())
            .finish_non_exhaustive()
    }
}

impl ProcessHandle {
    /// Creates a handle for `command` (program followed by its arguments).
    ///
    /// Defaults: inherit the caller's environment and working directory,
    /// capture output, non-strict, no log file, no console echo.
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProcessHandle {
            command: command.into_iter().map(Into::into).collect(),
            cwd: None,
            env: None,
            capture: true,
            strict: false,
            log_file: None,
            log_console: false,
            create_log_dir: true,
            on_line: None,
            state: HandleState::Created,
            child: None,
            stdout: None,
            stderr: None,
            feeder: None,
        }
    }

    /// Runs the child in `dir` instead of the caller's working directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Replaces (does not extend) the child's environment with `env`.
    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Whether drained output is accumulated in memory.
    pub fn capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    /// In strict mode a non-zero exit makes `wait` return `ExecError::NonZeroExit`.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Appends both output streams to `path` as they are read.
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Echoes child stdout/stderr to this process's stdout/stderr as they are read.
    pub fn log_console(mut self, echo: bool) -> Self {
        self.log_console = echo;
        self
    }

    /// Whether a missing log-file directory is created (default) or reported as an error.
    pub fn create_log_dir(mut self, create: bool) -> Self {
        self.create_log_dir = create;
        self
    }

    /// Calls `handler` with every line (or partial line) read from either stream.
    pub fn on_line(mut self, handler: LineHandler) -> Self {
        self.on_line = Some(handler);
        self
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    /// OS process id of the child while it is owned by this handle.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Spawns the child and starts its drainers (and stdin feeder, if `stdin` is given).
    ///
    /// # Errors
    ///
    /// - `ExecError::InvalidState` if the handle was already prepared.
    /// - `ExecError::Config` if the command is empty.
    /// - `ExecError::FileSystem` / I/O errors if the log file cannot be opened.
    /// - The native `std::io::Error` from spawning (e.g. `NotFound`), unwrapped.
    pub fn prepare(&mut self, stdin: Option<Vec<u8>>) -> Result<()> {
        if self.state != HandleState::Created {
            anyhow::bail!(ExecError::InvalidState(format!(
                "cannot prepare a handle that is already {}",
                self.state
            )));
        }
        let (program, args) = self.command.split_first().ok_or_else(|| {
            ExecError::Config("cannot execute an empty command".to_string())
        })?;

        // Opened before spawning so a bad log path never leaves an orphan child.
        let log = match &self.log_file {
            Some(path) => Some(LogSink::open(path, self.create_log_dir)?),
            None => None,
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        if let Some(env) = &self.env {
            cmd.env_clear().envs(env);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // The child leads its own process group so `kill` also reaches
            // grandchildren that inherited the output pipes.
            cmd.process_group(0);
        }

        let mut child = cmd.spawn()?;
        info!("Spawned {:?} (pid {})", self.command, child.id());

        let settings = DrainSettings {
            capture: self.capture,
            echo: self.log_console,
            log,
            on_line: self.on_line.clone(),
        };
        let drainers = start_drainers(&mut child, settings);
        let (stdout, stderr) = match drainers {
            Ok(pair) => pair,
            Err(e) => {
                reap(&mut child);
                return Err(e);
            }
        };
        self.stdout = stdout;
        self.stderr = stderr;

        let stdin_pipe = child.stdin.take();
        match (stdin, stdin_pipe) {
            (Some(payload), Some(pipe)) => {
                debug!("Feeding {} bytes to stdin of pid {}", payload.len(), child.id());
                match StdinFeeder::spawn(pipe, payload) {
                    Ok(feeder) => self.feeder = Some(feeder),
                    Err(e) => {
                        reap(&mut child);
                        return Err(e);
                    }
                }
            }
            // No payload: dropping the pipe closes it so the child reads EOF.
            (_, pipe) => drop(pipe),
        }

        self.child = Some(child);
        self.state = HandleState::Running;
        Ok(())
    }

    /// Waits for the child to exit and for every worker to finish.
    ///
    /// # Errors
    ///
    /// - `ExecError::InvalidState` if the handle was never prepared or already waited.
    /// - `ExecError::NonZeroExit` in strict mode when the exit code is not 0.
    pub fn wait(&mut self) -> Result<ExecutionResult> {
        let child = self.running_child("wait")?;
        let status = child.wait()?;
        self.finish(status)
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout`.
    ///
    /// On expiry the child's process group is killed and the child reaped,
    /// workers are joined, and `ExecError::TimedOut` is returned with
    /// whatever output was captured.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<ExecutionResult> {
        let command = self.command.clone();
        let child = self.running_child("wait")?;
        let status = match child.wait_timeout(timeout)? {
            Some(status) => return self.finish(status),
            None => {
                warn!("{:?} timed out after {:?}, killing it", command, timeout);
                let _ = kill_tree(child);
                child.wait()?
            }
        };
        let partial = self.collect(status);
        anyhow::bail!(ExecError::TimedOut {
            command,
            timeout,
            stdout: partial.stdout,
            stderr: partial.stderr,
        });
    }

    /// Forcibly terminates the child and, on Unix, its process group.
    ///
    /// Drainers are not joined; output captured after a kill may be
    /// truncated. Call [`wait`](Self::wait) afterwards to reap the child.
    pub fn kill(&mut self) -> Result<()> {
        if self.state != HandleState::Running {
            anyhow::bail!(ExecError::InvalidState(format!(
                "cannot kill a handle that is {}",
                self.state
            )));
        }
        if let Some(child) = self.child.as_mut() {
            kill_tree(child)?;
            info!("Killed {:?} (pid {})", self.command, child.id());
        }
        self.state = HandleState::Killed;
        Ok(())
    }

    fn running_child(&mut self, action: &str) -> Result<&mut Child> {
        match (self.state, self.child.as_mut()) {
            (HandleState::Running | HandleState::Killed, Some(child)) => Ok(child),
            (state, _) => Err(ExecError::InvalidState(format!(
                "cannot {action} a handle that is {state}"
            ))
            .into()),
        }
    }

    /// Joins the workers and applies the strict contract.
    fn finish(&mut self, status: ExitStatus) -> Result<ExecutionResult> {
        let result = self.collect(status);
        debug!("{:?} exited with {}", self.command, result.returncode);
        if self.strict && !result.success() {
            warn!(
                "{:?} failed with exit code {} in strict mode",
                self.command, result.returncode
            );
            anyhow::bail!(ExecError::non_zero_exit(&self.command, result));
        }
        Ok(result)
    }

    /// Releases the child and joins feeder and drainers, in that order.
    fn collect(&mut self, status: ExitStatus) -> ExecutionResult {
        self.child = None;
        self.state = HandleState::Completed;
        if let Some(mut feeder) = self.feeder.take() {
            feeder.join();
        }
        let stdout = self.stdout.take().map(StreamDrainer::into_result);
        let stderr = self.stderr.take().map(StreamDrainer::into_result);
        ExecutionResult {
            returncode: returncode(status),
            stdout: stdout.unwrap_or_default(),
            stderr: stderr.unwrap_or_default(),
        }
    }
}

impl Drop for ProcessHandle {
    /// A handle dropped while its child still runs kills and reaps the child.
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if self.state == HandleState::Running {
                debug!("Handle for {:?} dropped while running", self.command);
            }
            reap(child);
        }
    }
}

fn start_drainers(
    child: &mut Child,
    settings: DrainSettings,
) -> Result<(Option<StreamDrainer>, Option<StreamDrainer>)> {
    let stdout = match child.stdout.take() {
        Some(pipe) => Some(StreamDrainer::spawn(Stream::Stdout, pipe, settings.clone())?),
        None => None,
    };
    let stderr = match child.stderr.take() {
        Some(pipe) => Some(StreamDrainer::spawn(Stream::Stderr, pipe, settings)?),
        None => None,
    };
    Ok((stdout, stderr))
}

/// Kills `child` (ignoring "already exited") and collects its exit status.
fn reap(child: &mut Child) {
    let _ = kill_tree(child);
    let _ = child.wait();
}

/// Sends SIGKILL to the child's process group, falling back to the child alone.
fn kill_tree(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let pgid = Pid::from_raw(child.id() as i32);
        match killpg(pgid, Signal::SIGKILL) {
            Ok(()) => return Ok(()),
            Err(e) => debug!("killpg({}) failed: {}, killing the child only", pgid, e),
        }
    }
    child.kill()
}

/// Maps an exit status to a single integer, `-signal` for signal deaths.
fn returncode(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}
