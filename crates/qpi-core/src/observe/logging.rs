//! Structured logging via `tracing`
//!
//! The core emits `tracing` events on state transitions (spectral rebuilds,
//! background captures); this module gives the embedding application one
//! call to stand up a subscriber from configuration.
//!
//! ## Example
//!
//! ```rust,ignore
//! use qpi_core::observe::{init_logging, LogConfig, LogLevel};
//!
//! init_logging(&LogConfig {
//!     level: LogLevel::Debug,
//!     ..Default::default()
//! });
//!
//! tracing::info!(width = 640, height = 512, "acquisition started");
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log verbosity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, colourised
    #[default]
    Pretty,
    /// One line per event
    Compact,
    /// Machine-readable JSON
    Json,
}

/// Logging configuration, loadable from the YAML config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Verbosity threshold
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
    /// Include source file and line in events
    pub source_location: bool,
    /// Explicit filter directive (e.g. `qpi_core=debug`); overrides `level`
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            source_location: false,
            filter: None,
        }
    }
}

impl LogConfig {
    /// Verbose configuration for alignment and debugging sessions.
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            source_location: true,
            ..Default::default()
        }
    }

    /// JSON output for long unattended acquisition runs.
    pub fn production() -> Self {
        Self {
            format: LogFormat::Json,
            ..Default::default()
        }
    }
}

/// Install the global subscriber; call once at startup.
///
/// The `RUST_LOG` environment variable takes precedence over the configured
/// level. Repeat calls are ignored so tests can all invoke this safely.
pub fn init_logging(config: &LogConfig) {
    let filter = match &config.filter {
        Some(directive) => {
            EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(config.level.to_string()))
        }
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.to_string())),
    };

    let layer = fmt::layer()
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    let result = match config.format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(
            tracing_subscriber::registry().with(filter).with(layer.pretty()),
        ),
        LogFormat::Compact => tracing::subscriber::set_global_default(
            tracing_subscriber::registry().with(filter).with(layer.compact()),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            tracing_subscriber::registry().with(filter).with(layer.json()),
        ),
    };

    // A subscriber installed earlier wins
    let _ = result;
}
