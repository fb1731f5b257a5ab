//! # execrs Core Infrastructure
//!
//! File: lib/src/core/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module aggregates the core infrastructure components used by the
//! process utilities:
//! - `config`: Configuration loading, merging, and validation
//! - `error`: Error types and error handling utilities
//!
//! ```rust,ignore
//! use crate::core::config; // For loading configuration
//! use crate::core::error::{ExecError, Result}; // For error handling
//! ```
//!
pub mod config;
pub mod error;
