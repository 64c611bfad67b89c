//! TOML configuration.
//!
//! A binary owns one file and one top-level struct; each section is a serde
//! struct living next to the code it tunes ([`crate::hal::config`],
//! [`crate::scheduler`]). Loading and validation are separate steps:
//! [`ConfigLoader`] only parses, and each section's `validate()` checks
//! ranges afterwards.
//!
//! ```rust,no_run
//! use cobalt_common::config::{ConfigError, ConfigLoader, SharedConfig};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct RunnerConfig {
//!     shared: SharedConfig,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = RunnerConfig::load(Path::new("robot.toml"))?;
//!     config.shared.validate()?;
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a configuration could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("configuration file {} not found", .0.display())]
    FileNotFound(PathBuf),

    /// The file exists but is unreadable or is not valid TOML for the
    /// target struct.
    #[error("cannot parse configuration: {0}")]
    ParseError(String),

    /// A value parsed but is out of range.
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// `[shared] log_level`, spelled in lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-callback detail.
    Trace,
    /// Per-tick detail.
    Debug,
    /// Lifecycle events.
    #[default]
    Info,
    /// Misuse that did not fail the call.
    Warn,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// `[shared]` section common to every Cobalt binary.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "cobalt-sim"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Default log level; `RUST_LOG` overrides it.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Name reported in logs.
    pub service_name: String,
}

impl SharedConfig {
    /// # Errors
    /// `ConfigError::ValidationError` for a blank `service_name`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: crate::consts::DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

/// Parse any deserializable struct from TOML.
///
/// Implemented for every `DeserializeOwned` type; nothing needs to opt in.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Read and parse `path`.
    ///
    /// # Errors
    /// [`ConfigError::FileNotFound`] for a missing file, otherwise
    /// [`ConfigError::ParseError`].
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
            _ => ConfigError::ParseError(format!("{}: {e}", path.display())),
        })?;
        Self::parse(&content)
    }

    /// Parse TOML text.
    ///
    /// # Errors
    /// [`ConfigError::ParseError`] with the TOML diagnostic.
    fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
