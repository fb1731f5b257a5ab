//! # execrs Integration Test Common Helpers
//!
//! File: lib/tests/common.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `lib/tests/`. Each test file
//! declares `mod common;` to pull these in.
//!

// Different test files use different helpers.
#![allow(dead_code)]

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Routes library logs into the test harness output (filter with `RUST_LOG`).
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(false)
            .compact()
            .try_init();
    });
}

/// Builds `sh -c <script>` as a command vector.
pub fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}
