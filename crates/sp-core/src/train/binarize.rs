//! Spike-train binarization.
//!
//! A spike train is a list of firing times in seconds. Binarization maps
//! it onto fixed-width time bins: bin `i` covers `[i·w, (i+1)·w)` and is 1
//! iff at least one spike falls inside (saturating, not counting).

use sp_common::{Error, Result};

/// Multi-channel binary matrix: rows are channels, columns are time bins.
///
/// All rows share one length; construction truncates every channel to the
/// shortest channel's bin count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMatrix {
    channels: usize,
    bins: usize,
    data: Vec<u8>,
}

impl BinaryMatrix {
    /// Build from per-channel rows, truncating to the shortest row.
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::InvalidInput("no channels given".to_string()));
        }
        let bins = rows.iter().map(|r| r.len()).min().unwrap_or(0);
        let channels = rows.len();
        let mut data = Vec::with_capacity(channels * bins);
        for row in &rows {
            if row.iter().any(|&v| v > 1) {
                return Err(Error::InvalidInput(
                    "binary matrix entries must be 0 or 1".to_string(),
                ));
            }
            data.extend_from_slice(&row[..bins]);
        }
        Ok(BinaryMatrix {
            channels,
            bins,
            data,
        })
    }

    /// Number of channels (rows).
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of time bins (columns).
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Borrow channel `c` as a slice over all bins.
    pub fn channel(&self, c: usize) -> &[u8] {
        assert!(c < self.channels, "channel out of bounds");
        &self.data[c * self.bins..(c + 1) * self.bins]
    }

    /// Value at (channel, bin).
    pub fn get(&self, channel: usize, bin: usize) -> u8 {
        assert!(
            channel < self.channels && bin < self.bins,
            "binary matrix index out of bounds"
        );
        self.data[channel * self.bins + bin]
    }
}

/// Binarize one spike train with bins of width `bin_width` seconds.
///
/// The output has `ceil(max(timestamps) / bin_width)` bins. A spike at the
/// exact right edge of the covered span lands in the final bin.
pub fn binarize(timestamps: &[f64], bin_width: f64) -> Result<Vec<u8>> {
    if timestamps.is_empty() {
        return Err(Error::InvalidInput("empty spike train".to_string()));
    }
    if !(bin_width > 0.0) || !bin_width.is_finite() {
        return Err(Error::InvalidInput(format!(
            "bin width must be finite and positive, got {bin_width}"
        )));
    }
    let mut max = 0.0f64;
    for &t in timestamps {
        if !t.is_finite() || t < 0.0 {
            return Err(Error::InvalidInput(format!(
                "spike timestamps must be finite and non-negative, got {t}"
            )));
        }
        max = max.max(t);
    }

    let bins = (max / bin_width).ceil() as usize;
    if bins == 0 {
        // All spikes at t = 0 still occupy one bin.
        return Ok(vec![1]);
    }
    let mut states = vec![0u8; bins];
    for &t in timestamps {
        let index = ((t / bin_width) as usize).min(bins - 1);
        states[index] = 1;
    }
    Ok(states)
}

/// Binarize every channel and stack into a matrix truncated to the
/// shortest channel.
pub fn binarize_all(trains: &[Vec<f64>], bin_width: f64) -> Result<BinaryMatrix> {
    if trains.is_empty() {
        return Err(Error::InvalidInput("no spike trains given".to_string()));
    }
    let rows = trains
        .iter()
        .map(|t| binarize(t, bin_width))
        .collect::<Result<Vec<_>>>()?;
    BinaryMatrix::from_rows(rows)
}
