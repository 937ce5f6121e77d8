//! Sweep configuration types.
//!
//! A sweep file is TOML:
//!
//! ```toml
//! output_dir = "out/cori_probe1"
//! state_bits = 2
//! required_observations = 200
//! unit_divisor = 1000.0        # timestamps on disk are milliseconds
//! skips = [2, 4, 6, 8, 10]
//! weighted = false
//!
//! [bin_sizes]
//! min = 0.0029
//! max = 0.02
//! count = 9
//!
//! [[pairs]]
//! a = "data/cell143.txt"
//! b = "data/cell168.txt"
//!
//! [oracle]
//! command = "phi-oracle"
//! args = ["--mode", "sia"]
//! timeout_secs = 600
//! partition_mode = "all"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Inclusive linearly spaced bin-size range, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinSizeRange {
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl BinSizeRange {
    /// Materialize the range: `count` evenly spaced values from `min` to
    /// `max` inclusive. A count of 1 yields just `min`.
    pub fn values(&self) -> Vec<f64> {
        if self.count <= 1 {
            return vec![self.min];
        }
        let step = (self.max - self.min) / (self.count - 1) as f64;
        (0..self.count).map(|i| self.min + step * i as f64).collect()
    }
}

/// One pair of spike-train files to analyze together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelPair {
    /// First channel's timestamp file. Listed first, so it varies fastest
    /// in the transition-matrix state ordering.
    pub a: PathBuf,
    /// Second channel's timestamp file.
    pub b: PathBuf,
    /// Optional label used in output file names; defaults to the file stems.
    #[serde(default)]
    pub label: Option<String>,
}

impl ChannelPair {
    /// Label for output naming: explicit label or `<stem_a>_<stem_b>`.
    pub fn output_label(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        format!("{}_{}", file_stem(&self.a), file_stem(&self.b))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "channel".to_string())
}

/// Traversal order for transition sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Traversal {
    /// Uniform random permutation of valid time indices (seeded).
    #[default]
    Shuffled,
    /// Deterministic order: fixed start offset, step 2.
    Strided,
}

/// External oracle command and algorithm parameters.
///
/// These replace process-wide library flags: every parameter is explicit
/// and serialized into each oracle request, so runs are reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSettings {
    /// Command to execute for each (network, state) evaluation.
    pub command: String,

    /// Extra arguments passed before the JSON request.
    #[serde(default)]
    pub args: Vec<String>,

    /// Per-invocation timeout in seconds.
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,

    /// Partition scheme the oracle should search over.
    #[serde(default = "default_partition_mode")]
    pub partition_mode: String,

    /// Whether the oracle may assume cuts cannot create new concepts.
    #[serde(default = "default_true")]
    pub assume_cuts_cannot_create_concepts: bool,
}

fn default_oracle_timeout() -> u64 {
    600
}

fn default_partition_mode() -> String {
    "all".to_string()
}

fn default_true() -> bool {
    true
}

/// Full sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Directory for transition matrices, result arrays, and run metadata.
    pub output_dir: PathBuf,

    /// Bins per state window (K). Each channel contributes 2^K micro states.
    #[serde(default = "default_state_bits")]
    pub state_bits: usize,

    /// Required observations per source state; estimation fails below this.
    pub required_observations: u64,

    /// Divide raw timestamps by this on load (e.g. 1000.0 for ms → s).
    #[serde(default = "default_unit_divisor")]
    pub unit_divisor: f64,

    /// Bin sizes to sweep, in seconds.
    pub bin_sizes: BinSizeRange,

    /// Temporal skips to sweep (future state starts at t + skip).
    pub skips: Vec<usize>,

    /// Channel pairs to analyze.
    pub pairs: Vec<ChannelPair>,

    /// Oracle command and parameters.
    pub oracle: OracleSettings,

    /// Weight state phis by occurrence frequency.
    #[serde(default)]
    pub weighted: bool,

    /// Traversal order for transition sampling.
    #[serde(default)]
    pub traversal: Traversal,

    /// Start offset for strided traversal.
    #[serde(default)]
    pub strided_start: usize,

    /// RNG seed for shuffled traversal; recorded in run metadata.
    /// Unset means one is drawn from entropy at run start.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_state_bits() -> usize {
    2
}

fn default_unit_divisor() -> f64 {
    1.0
}

impl SweepConfig {
    /// Load and validate a sweep configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: SweepConfig = toml::from_str(&text)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges and cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.state_bits == 0 {
            return Err(Error::InvalidConfig("state_bits must be >= 1".into()));
        }
        if self.unit_divisor <= 0.0 || !self.unit_divisor.is_finite() {
            return Err(Error::InvalidConfig(
                "unit_divisor must be finite and positive".into(),
            ));
        }
        if self.bin_sizes.count == 0 {
            return Err(Error::InvalidConfig("bin_sizes.count must be >= 1".into()));
        }
        if self.bin_sizes.min <= 0.0 || !self.bin_sizes.min.is_finite() {
            return Err(Error::InvalidConfig(
                "bin_sizes.min must be finite and positive".into(),
            ));
        }
        if self.bin_sizes.max < self.bin_sizes.min {
            return Err(Error::InvalidConfig(
                "bin_sizes.max must be >= bin_sizes.min".into(),
            ));
        }
        if self.skips.is_empty() {
            return Err(Error::InvalidConfig("skips must be non-empty".into()));
        }
        if self.skips.iter().any(|&s| s == 0) {
            return Err(Error::InvalidConfig("skips must all be >= 1".into()));
        }
        if self.pairs.is_empty() {
            return Err(Error::InvalidConfig("at least one channel pair required".into()));
        }
        if self.oracle.command.is_empty() {
            return Err(Error::InvalidConfig("oracle.command must be set".into()));
        }
        if self.oracle.timeout_secs == 0 {
            return Err(Error::InvalidConfig("oracle.timeout_secs must be >= 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal_toml() -> &'static str {
        r#"
            output_dir = "out"
            required_observations = 200
            skips = [2, 4]

            [bin_sizes]
            min = 0.002
            max = 0.02
            count = 4

            [[pairs]]
            a = "data/cell143.txt"
            b = "data/cell168.txt"

            [oracle]
            command = "phi-oracle"
        "#
    }

    #[test]
    fn test_parse_minimal() {
        let config: SweepConfig = toml::from_str(minimal_toml()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.state_bits, 2);
        assert_eq!(config.unit_divisor, 1.0);
        assert_eq!(config.oracle.timeout_secs, 600);
        assert_eq!(config.oracle.partition_mode, "all");
        assert_eq!(config.traversal, Traversal::Shuffled);
        assert!(!config.weighted);
    }

    #[test]
    fn test_bin_size_values_linspace() {
        let range = BinSizeRange {
            min: 1.0,
            max: 2.0,
            count: 5,
        };
        let values = range.values();
        assert_eq!(values.len(), 5);
        assert!((values[0] - 1.0).abs() < 1e-12);
        assert!((values[4] - 2.0).abs() < 1e-12);
        assert!((values[2] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_bin_size_values_single() {
        let range = BinSizeRange {
            min: 0.004,
            max: 0.02,
            count: 1,
        };
        assert_eq!(range.values(), vec![0.004]);
    }

    #[test]
    fn test_pair_label() {
        let pair = ChannelPair {
            a: PathBuf::from("data/cell143.txt"),
            b: PathBuf::from("data/cell168.txt"),
            label: None,
        };
        assert_eq!(pair.output_label(), "cell143_cell168");

        let labeled = ChannelPair {
            label: Some("pair0".into()),
            ..pair
        };
        assert_eq!(labeled.output_label(), "pair0");
    }

    #[test]
    fn test_validate_rejects_zero_skip() {
        let mut config: SweepConfig = toml::from_str(minimal_toml()).unwrap();
        config.skips = vec![0];
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_bins() {
        let mut config: SweepConfig = toml::from_str(minimal_toml()).unwrap();
        config.bin_sizes.max = config.bin_sizes.min / 2.0;
        assert!(config.validate().is_err());

        let mut config: SweepConfig = toml::from_str(minimal_toml()).unwrap();
        config.bin_sizes.min = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(minimal_toml().as_bytes()).unwrap();

        let config = SweepConfig::load(&path).unwrap();
        assert_eq!(config.required_observations, 200);
        assert_eq!(config.skips, vec![2, 4]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SweepConfig::load(Path::new("/nonexistent/sweep.toml"));
        assert!(matches!(err, Err(Error::Config(_))));
    }
}
