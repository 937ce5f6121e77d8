//! Spike timestamp file loading.
//!
//! Input files carry one timestamp per line, ordered ascending. Units are
//! whatever the recording system produced; the caller supplies a divisor
//! (e.g. 1000.0 when files are in milliseconds and the pipeline wants
//! seconds).

use std::path::Path;

use sp_common::{Error, Result};
use tracing::warn;

/// Load a spike train from a text file, dividing every value by
/// `unit_divisor`.
///
/// Blank lines are skipped. Malformed lines, non-finite values, and
/// negative timestamps fail with the file and line number named.
pub fn load_spike_train(path: &Path, unit_divisor: f64) -> Result<Vec<f64>> {
    if !(unit_divisor > 0.0) || !unit_divisor.is_finite() {
        return Err(Error::InvalidInput(format!(
            "unit divisor must be finite and positive, got {unit_divisor}"
        )));
    }

    let text = std::fs::read_to_string(path)?;
    let mut timestamps = Vec::new();
    let mut descending_seen = false;

    for (lineno, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let raw: f64 = trimmed.parse().map_err(|_| {
            Error::InvalidInput(format!(
                "{} line {}: not a number: {:?}",
                path.display(),
                lineno + 1,
                trimmed
            ))
        })?;
        let t = raw / unit_divisor;
        if !t.is_finite() || t < 0.0 {
            return Err(Error::InvalidInput(format!(
                "{} line {}: timestamp must be finite and non-negative, got {}",
                path.display(),
                lineno + 1,
                t
            )));
        }
        if let Some(&prev) = timestamps.last() {
            if t < prev {
                descending_seen = true;
            }
        }
        timestamps.push(t);
    }

    if timestamps.is_empty() {
        return Err(Error::InvalidInput(format!(
            "{}: no timestamps found",
            path.display()
        )));
    }
    if descending_seen {
        warn!(file = %path.display(), "timestamps are not ascending");
    }

    Ok(timestamps)
}
