//! # Output Drainer (`common::process::drainer`)
//!
//! File: lib/src/common/process/drainer.rs
//! Author: Christi Mahu
//!

//! ## Overview
//!
//! A `StreamDrainer` owns one background thread that continuously reads a
//! child's stdout or stderr pipe until EOF. Reading concurrently with the
//! parent's `wait()` is what keeps a chatty child from blocking on a full OS
//! pipe buffer (64 KiB on Linux) while the parent blocks waiting for it.
//!
//! Each chunk read (one line, or the part of a line received so far) is,
//! in order:
//! 1. appended to the log file, if one is configured;
//! 2. echoed to the parent's matching console stream, if enabled;
//! 3. passed to the line handler, if provided;
//! 4. accumulated in memory, if capture is enabled.
//!
//! A read error ends the loop early; the text captured so far is still
//! returned.
//!
use super::{LineHandler, Stream};
use crate::common::fs::io::open_append;
use crate::core::error::Result;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Read buffer size for each drained pipe.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// An append-mode log file shared by the drainers of one process.
///
/// Cloning is cheap; all clones write through the same file descriptor,
/// which was opened with `O_APPEND`.
#[derive(Debug, Clone)]
pub struct LogSink {
    file: Arc<File>,
}

impl LogSink {
    /// Opens `path` in append mode, creating its parent directory when `create_dir` is set.
    pub fn open(path: &Path, create_dir: bool) -> Result<Self> {
        let file = open_append(path, create_dir)?;
        Ok(LogSink {
            file: Arc::new(file),
        })
    }

    fn write_chunk(&self, chunk: &[u8]) -> io::Result<()> {
        let mut file: &File = &self.file;
        file.write_all(chunk)?;
        file.flush()
    }
}

/// What a drainer does with each chunk besides consuming it.
#[derive(Clone, Default)]
pub struct DrainSettings {
    /// Accumulate chunks in memory for the final result.
    pub capture: bool,
    /// Copy chunks to this process's matching stdout or stderr.
    pub echo: bool,
    /// Append chunks to a shared log file.
    pub log: Option<LogSink>,
    /// Called with every chunk, tagged with its stream.
    pub on_line: Option<LineHandler>,
}

impl std::fmt::Debug for DrainSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrainSettings")
            .field("capture", &self.capture)
            .field("echo", &self.echo)
            .field("log", &self.log.is_some())
            .field("on_line", &self.on_line.is_some())
            .finish()
    }
}

/// Background reader bound to exactly one output pipe of one child.
#[derive(Debug)]
pub struct StreamDrainer {
    stream: Stream,
    worker: Option<JoinHandle<Vec<u8>>>,
    result: Option<String>,
}

impl StreamDrainer {
    /// Starts draining `source` on a new thread immediately.
    ///
    /// # Errors
    ///
    /// Returns an `Err` only if the OS refuses to create the thread.
    pub fn spawn<R>(stream: Stream, source: R, settings: DrainSettings) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let worker = thread::Builder::new()
            .name(format!("execrs-drain-{stream}"))
            .spawn(move || drain(stream, source, &settings))?;
        debug!("Started {} drainer", stream);
        Ok(StreamDrainer {
            stream,
            worker: Some(worker),
            result: None,
        })
    }

    /// Which pipe this drainer reads.
    pub fn stream(&self) -> Stream {
        self.stream
    }

    /// Whether the drain thread has reached EOF (or was already joined).
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }

    /// Blocks until the pipe reaches EOF and returns the captured text.
    ///
    /// Subsequent calls return the same text without blocking.
    pub fn join(&mut self) -> &str {
        if let Some(worker) = self.worker.take() {
            let bytes = worker.join().unwrap_or_else(|_| {
                error!("The {} drainer thread panicked; its output is lost", self.stream);
                Vec::new()
            });
            self.result = Some(String::from_utf8_lossy(&bytes).into_owned());
        }
        self.result.as_deref().unwrap_or_default()
    }

    /// Consumes the drainer, returning its captured text.
    pub fn into_result(mut self) -> String {
        self.join();
        self.result.take().unwrap_or_default()
    }

    /// The captured text, available once [`join`](Self::join) has returned.
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }
}

/// The drain loop: reads `source` until EOF or error.
///
/// A chunk ends at a newline or at whatever the pipe has delivered so far,
/// whichever comes first, so no chunk exceeds `READ_BUFFER_SIZE` and
/// output without a newline still reaches the log file as it arrives.
fn drain<R: Read>(stream: Stream, source: R, settings: &DrainSettings) -> Vec<u8> {
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, source);
    let mut captured = Vec::new();
    loop {
        let consumed = match reader.fill_buf() {
            Ok([]) => break,
            Ok(available) => {
                let len = available
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(available.len(), |i| i + 1);
                consume(stream, &available[..len], settings, &mut captured);
                len
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Reading child {} failed, stopping drain early: {}", stream, e);
                break;
            }
        };
        reader.consume(consumed);
    }
    debug!("{} drainer reached EOF ({} bytes captured)", stream, captured.len());
    captured
}

fn consume(stream: Stream, chunk: &[u8], settings: &DrainSettings, captured: &mut Vec<u8>) {
    if let Some(log) = &settings.log {
        if let Err(e) = log.write_chunk(chunk) {
            warn!("Failed to append child {} to log file: {}", stream, e);
        }
    }
    if settings.echo {
        let echoed = match stream {
            Stream::Stdout => echo(io::stdout().lock(), chunk),
            Stream::Stderr => echo(io::stderr().lock(), chunk),
        };
        if let Err(e) = echoed {
            debug!("Console echo of child {} failed: {}", stream, e);
        }
    }
    if let Some(handler) = &settings.on_line {
        handler(stream, &String::from_utf8_lossy(chunk));
    }
    if settings.capture {
        captured.extend_from_slice(chunk);
    }
}

fn echo(mut target: impl Write, chunk: &[u8]) -> io::Result<()> {
    target.write_all(chunk)?;
    target.flush()
}
