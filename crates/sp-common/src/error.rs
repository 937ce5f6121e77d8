//! Error types for SpikePhi.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! The sweep driver relies on the taxonomy here: estimation failures
//! ([`Error::InsufficientObservations`]), malformed data
//! ([`Error::InvalidInput`]), and oracle failures ([`Error::Oracle`]) are
//! isolated per sweep cell, while everything else aborts the run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for SpikePhi operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Sweep configuration errors (TOML parse, validation).
    Config,
    /// Spike data and state-space input errors.
    Data,
    /// Transition-model estimation errors.
    Estimation,
    /// External integration-oracle errors.
    Oracle,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Data => write!(f, "data"),
            ErrorCategory::Estimation => write!(f, "estimation"),
            ErrorCategory::Oracle => write!(f, "oracle"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for SpikePhi.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid sweep config: {0}")]
    InvalidConfig(String),

    // Data errors (20-29)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Estimation errors (30-39)
    #[error(
        "state {state} was observed {observed} times, fewer than the required {required}"
    )]
    InsufficientObservations {
        state: usize,
        observed: u64,
        required: u64,
    },

    // Oracle errors (40-49)
    #[error("oracle invocation failed: {0}")]
    Oracle(String),

    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code for this error type.
    ///
    /// Codes are grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Data errors
    /// - 30-39: Estimation errors
    /// - 40-49: Oracle errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig(_) => 11,
            Error::InvalidInput(_) => 20,
            Error::InsufficientObservations { .. } => 30,
            Error::Oracle(_) => 40,
            Error::OracleUnavailable(_) => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidConfig(_) => ErrorCategory::Config,
            Error::InvalidInput(_) => ErrorCategory::Data,
            Error::InsufficientObservations { .. } => ErrorCategory::Estimation,
            Error::Oracle(_) | Error::OracleUnavailable(_) => ErrorCategory::Oracle,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Config errors: recoverable by fixing the sweep file
            Error::Config(_) => true,
            Error::InvalidConfig(_) => true,

            // Malformed spike data will not fix itself
            Error::InvalidInput(_) => false,

            // Recoverable with a larger bin size or skip
            Error::InsufficientObservations { .. } => true,

            // Oracle invocations may be transient; a missing oracle is not
            Error::Oracle(_) => true,
            Error::OracleUnavailable(_) => false,

            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }

    /// Returns whether the sweep driver may isolate this error to a single
    /// (bin size, skip) cell and continue the sweep.
    ///
    /// Only the specifically defined per-configuration failures qualify;
    /// anything else would mask programming or environment errors.
    pub fn is_cell_isolable(&self) -> bool {
        matches!(
            self,
            Error::InsufficientObservations { .. } | Error::InvalidInput(_) | Error::Oracle(_)
        )
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Run 'spikephi check --config <file>' to validate the sweep configuration."
            }
            Error::InvalidConfig(_) => {
                "Fix the named field in the sweep TOML file and re-run 'spikephi check'."
            }
            Error::InvalidInput(_) => {
                "Inspect the named spike file or state input; timestamps must be one finite non-negative number per line."
            }
            Error::InsufficientObservations { .. } => {
                "Rerun with a larger bin size or skip, or lower required_observations."
            }
            Error::Oracle(_) => {
                "Check the oracle command's stderr; it must read a JSON request on stdin and print a JSON response."
            }
            Error::OracleUnavailable(_) => {
                "Install the oracle command named in the sweep config or fix its path."
            }
            Error::Io(_) => {
                "Check disk space, permissions, and that the output directory exists."
            }
            Error::Json(_) => "Invalid JSON produced or consumed; check the named file.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidConfig(_) => "Invalid Sweep Configuration",
            Error::InvalidInput(_) => "Invalid Input Data",
            Error::InsufficientObservations { .. } => "Insufficient Observations",
            Error::Oracle(_) => "Oracle Failure",
            Error::OracleUnavailable(_) => "Oracle Unavailable",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g., state index, shortfall).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        if let Error::InsufficientObservations {
            state,
            observed,
            required,
        } = err
        {
            context.insert("state".to_string(), serde_json::json!(state));
            context.insert("observed".to_string(), serde_json::json!(observed));
            context.insert("required".to_string(), serde_json::json!(required));
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
