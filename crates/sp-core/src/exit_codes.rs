//! Exit codes for the spikephi CLI.
//!
//! Exit codes communicate operation outcome without requiring output
//! parsing. Ranges:
//! - 0-6: Success/operational outcomes
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors

use sp_common::{Error, ErrorCategory};

/// Exit codes for spikephi operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success: every sweep cell produced a value.
    Clean = 0,

    /// Sweep completed, but some cells failed and hold the NaN sentinel.
    Partial = 1,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments or sweep configuration.
    ConfigError = 10,

    /// Malformed spike data.
    DataError = 11,

    /// Oracle command missing or unusable.
    OracleError = 12,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report).
    InternalError = 20,

    /// I/O error.
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success (codes 0-1).
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::Partial)
    }

    /// Map an error to its exit code.
    pub fn from_error(err: &Error) -> Self {
        match err.category() {
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Data => ExitCode::DataError,
            ErrorCategory::Estimation => ExitCode::DataError,
            ErrorCategory::Oracle => ExitCode::OracleError,
            ErrorCategory::Io => ExitCode::IoError,
        }
    }
}
