//! # execrs Configuration System
//!
//! File: lib/src/core/config.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module loads the default options used by `CallOptions::from_config`:
//! whether calls are strict, where output is logged, timeouts, and so on.
//!
//! ## Architecture
//!
//! Configuration sources (in order of precedence):
//! 1. Project-specific `.execrs.toml` in current directory or ancestors
//! 2. User-specific `<config dir>/execrs/config.toml`
//! 3. Default values defined in the code
//!
//! The ancestor search stops at the first directory containing `.git`.
//! After merging, `~` in paths is expanded and the result is validated.
//!
//! ## Examples
//!
//! ```toml
//! [call]
//! strict = true
//! log_console = true
//! log_file = "~/.local/state/execrs/calls.log"
//! timeout_secs = 600
//! ```
//!
//! ```rust,no_run
//! use execrs::{config, CallOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! let cfg = config::load_config()?;
//! let options = CallOptions::from_config(&cfg);
//! # Ok(())
//! # }
//! ```
//!
use crate::common::fs::io::read_file_to_string;
use crate::core::error::{ExecError, Result};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Resolved configuration: every layer merged over the built-in defaults.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Config {
    pub call: CallDefaults,
}

/// Defaults for `run` / `call` invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDefaults {
    /// Treat a non-zero exit status as an error.
    pub strict: bool,
    /// Treat any stderr output as an error.
    pub stderr_is_error: bool,
    /// Accumulate child output in memory.
    pub capture_output: bool,
    /// Make `call` return stderr alongside stdout.
    pub return_stderr: bool,
    /// Echo child output to this process's console.
    pub log_console: bool,
    /// File that child output is appended to (can use ~). Will be expanded.
    pub log_file: Option<String>,
    /// Create the log file's directory when missing.
    pub create_log_dir: bool,
    /// Working directory for children (can use ~). Will be expanded.
    pub cwd: Option<String>,
    /// Kill children running longer than this many seconds.
    pub timeout_secs: Option<u64>,
    /// Strip one trailing newline from returned output.
    pub trim_trailing_newline: bool,
}

impl Default for CallDefaults {
    fn default() -> Self {
        CallDefaults {
            strict: true,
            stderr_is_error: false,
            capture_output: true,
            return_stderr: false,
            log_console: false,
            log_file: None,
            create_log_dir: true,
            cwd: None,
            timeout_secs: None,
            trim_trailing_newline: false,
        }
    }
}

/// One configuration file as written. Keys it does not mention stay `None`.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct ConfigLayer {
    #[serde(default)]
    call: CallLayer,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct CallLayer {
    strict: Option<bool>,
    stderr_is_error: Option<bool>,
    capture_output: Option<bool>,
    return_stderr: Option<bool>,
    log_console: Option<bool>,
    log_file: Option<String>,
    create_log_dir: Option<bool>,
    cwd: Option<String>,
    timeout_secs: Option<u64>,
    trim_trailing_newline: Option<bool>,
}

impl CallLayer {
    /// Keys set in `self` win; the rest come from `lower`.
    fn over(self, lower: CallLayer) -> CallLayer {
        CallLayer {
            strict: self.strict.or(lower.strict),
            stderr_is_error: self.stderr_is_error.or(lower.stderr_is_error),
            capture_output: self.capture_output.or(lower.capture_output),
            return_stderr: self.return_stderr.or(lower.return_stderr),
            log_console: self.log_console.or(lower.log_console),
            log_file: self.log_file.or(lower.log_file),
            create_log_dir: self.create_log_dir.or(lower.create_log_dir),
            cwd: self.cwd.or(lower.cwd),
            timeout_secs: self.timeout_secs.or(lower.timeout_secs),
            trim_trailing_newline: self.trim_trailing_newline.or(lower.trim_trailing_newline),
        }
    }

    fn resolve(self) -> CallDefaults {
        let defaults = CallDefaults::default();
        CallDefaults {
            strict: self.strict.unwrap_or(defaults.strict),
            stderr_is_error: self.stderr_is_error.unwrap_or(defaults.stderr_is_error),
            capture_output: self.capture_output.unwrap_or(defaults.capture_output),
            return_stderr: self.return_stderr.unwrap_or(defaults.return_stderr),
            log_console: self.log_console.unwrap_or(defaults.log_console),
            log_file: self.log_file,
            create_log_dir: self.create_log_dir.unwrap_or(defaults.create_log_dir),
            cwd: self.cwd,
            timeout_secs: self.timeout_secs,
            trim_trailing_newline: self
                .trim_trailing_newline
                .unwrap_or(defaults.trim_trailing_newline),
        }
    }
}

const PROJECT_CONFIG_FILENAME: &str = ".execrs.toml";

/// Loads, merges, expands and validates user and project configuration.
pub fn load_config() -> Result<Config> {
    let user_config = load_user_config()?;
    let project_config = load_project_config()?;
    let mut merged_config = merge_configs(user_config, project_config);
    expand_config_paths(&mut merged_config).context("Failed to expand paths in configuration")?;
    validate_config(&merged_config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", merged_config);
    Ok(merged_config)
}

/// Loads a single configuration file, expanded and validated, without merging.
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let mut config = Config {
        call: parse_config_file(path)?.call.resolve(),
    };
    expand_config_paths(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

fn load_user_config() -> Result<Option<ConfigLayer>> {
    if let Some(proj_dirs) = ProjectDirs::from("com", "execrs", "execrs") {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.exists() {
            info!("Loading user configuration from: {}", config_path.display());
            parse_config_file(&config_path).map(Some)
        } else {
            debug!(
                "User configuration file not found at {}",
                config_path.display()
            );
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

fn load_project_config() -> Result<Option<ConfigLayer>> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    if let Some(project_config_path) = find_project_config_path(&current_dir) {
        info!(
            "Loading project configuration from: {}",
            project_config_path.display()
        );
        parse_config_file(&project_config_path).map(Some)
    } else {
        debug!("No project configuration file (.execrs.toml) found in current directory or ancestors.");
        Ok(None)
    }
}

fn find_project_config_path(start: &Path) -> Option<PathBuf> {
    let mut path = start;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Some(project_config);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

fn parse_config_file(path: &Path) -> Result<ConfigLayer> {
    let content = read_file_to_string(path)?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

/// Keys set in the project file override the user file; unset keys fall back to defaults.
fn merge_configs(user: Option<ConfigLayer>, project: Option<ConfigLayer>) -> Config {
    let user = user.unwrap_or_default().call;
    let project = project.unwrap_or_default().call;
    Config {
        call: project.over(user).resolve(),
    }
}

fn expand_config_paths(config: &mut Config) -> Result<()> {
    for path in [&mut config.call.log_file, &mut config.call.cwd]
        .into_iter()
        .flatten()
    {
        *path = shellexpand::tilde(path.as_str()).into_owned();
        debug!("Expanded configured path: {}", path);
    }
    Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
    let call = &config.call;
    if call.timeout_secs == Some(0) {
        return Err(anyhow!(ExecError::Config(
            "timeout_secs must be greater than zero".to_string()
        )));
    }
    if let Some(log_file) = &call.log_file {
        if log_file.trim().is_empty() {
            return Err(anyhow!(ExecError::Config(
                "log_file cannot be empty".to_string()
            )));
        }
        if Path::new(log_file).is_dir() {
            return Err(anyhow!(ExecError::Config(format!(
                "Configured log_file '{}' is a directory.",
                log_file
            ))));
        }
    }
    if let Some(cwd) = &call.cwd {
        if !Path::new(cwd).is_dir() {
            warn!("Configured working directory '{}' does not exist.", cwd);
        }
    }
    Ok(())
}
