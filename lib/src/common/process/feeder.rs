//! # Input Feeder (`common::process::feeder`)
//!
//! File: lib/src/common/process/feeder.rs
//! Author: Christi Mahu
//!

//! ## Overview
//!
//! Writes a byte payload to a child's stdin on a background thread, then
//! closes the pipe so the child sees EOF. Runs concurrently with the output
//! drainers so a child that echoes its input never deadlocks against us.
//!
//! A child that exits (or closes stdin) before consuming the whole payload
//! makes the write fail with `BrokenPipe`; that is expected and swallowed.
//! Overall success is decided by the exit status alone.
//!
use crate::core::error::Result;
use std::io::{self, Write};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Size of each write to the stdin pipe.
const FEED_CHUNK_SIZE: usize = 64 * 1024;

/// Background writer bound to a child's stdin.
#[derive(Debug)]
pub struct StdinFeeder {
    worker: Option<JoinHandle<()>>,
}

impl StdinFeeder {
    /// Starts writing `payload` to `sink` on a new thread, closing `sink` afterwards.
    pub fn spawn<W>(sink: W, payload: Vec<u8>) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let worker = thread::Builder::new()
            .name("execrs-feed-stdin".to_string())
            .spawn(move || feed(sink, &payload))?;
        Ok(StdinFeeder {
            worker: Some(worker),
        })
    }

    /// Waits for the payload to be written (or abandoned) and stdin closed.
    pub fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("The stdin feeder thread panicked");
            }
        }
    }

    /// Whether the feeder thread has exited (or was already joined).
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }
}

fn feed<W: Write>(mut sink: W, payload: &[u8]) {
    let mut written = 0;
    for chunk in payload.chunks(FEED_CHUNK_SIZE) {
        if let Err(e) = sink.write_all(chunk) {
            match e.kind() {
                io::ErrorKind::BrokenPipe => {
                    debug!("Child closed stdin after {} of {} bytes", written, payload.len())
                }
                _ => warn!("Writing child stdin failed after {} bytes: {}", written, e),
            }
            return;
        }
        written += chunk.len();
    }
    if let Err(e) = sink.flush() {
        debug!("Flushing child stdin failed: {}", e);
    }
    debug!("Fed {} bytes to child stdin", written);
    // `sink` is dropped here, closing the pipe.
}
