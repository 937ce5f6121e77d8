//! Persistence of transition matrices, result arrays, and run metadata.
//!
//! Three on-disk forms:
//! - Transition matrices as plain numeric text tables (one row per line,
//!   space-separated), named deterministically from their generating
//!   parameters.
//! - Scalar result arrays as binary little-endian f64 files with a
//!   `SPHI` magic and explicit dimensions, so failed sweep cells can be
//!   stored as NaN without losing shape.
//! - Run metadata as a JSON sidecar.

use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sp_common::config::SweepConfig;
use sp_common::{Error, Matrix, Result};

/// Magic prefix of binary array files.
const ARRAY_MAGIC: &[u8; 4] = b"SPHI";
/// Binary array format version.
const ARRAY_VERSION: u32 = 1;

/// Deterministic transition-matrix file name from generating parameters.
pub fn tpm_file_name(label: &str, required_obs: u64, bin_size: f64, skip: usize) -> String {
    format!("micro_{label}_occs_{required_obs}_bin_{bin_size}_skip_{skip}.tsv")
}

/// Write a matrix as a plain text table: one row per line, values
/// space-separated in scientific notation.
pub fn save_matrix_text(path: &Path, matrix: &Matrix) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut out = BufWriter::new(file);
    for row in matrix.iter_rows() {
        let mut first = true;
        for value in row {
            if !first {
                write!(out, " ")?;
            }
            write!(out, "{value:.18e}")?;
            first = false;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Read a matrix previously written by [`save_matrix_text`].
pub fn load_matrix_text(path: &Path) -> Result<Matrix> {
    let text = std::fs::read_to_string(path)?;
    let mut rows = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>().map_err(|_| {
                    Error::InvalidInput(format!(
                        "{} line {}: not a number: {:?}",
                        path.display(),
                        lineno + 1,
                        tok
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    Matrix::from_rows(rows)
}

/// Write per-state occurrence counts, one per line.
pub fn save_occurrences(path: &Path, occurrences: &[u64]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut out = BufWriter::new(file);
    for count in occurrences {
        writeln!(out, "{count}")?;
    }
    out.flush()?;
    Ok(())
}

/// Write an n-dimensional f64 array: `SPHI` magic, version, dimension
/// count, dimensions, then row-major little-endian payload.
pub fn save_f64_array(path: &Path, dims: &[usize], data: &[f64]) -> Result<()> {
    let expected: usize = dims.iter().product();
    if data.len() != expected {
        return Err(Error::InvalidInput(format!(
            "array has {} values but dims {:?} require {}",
            data.len(),
            dims,
            expected
        )));
    }
    let file = std::fs::File::create(path)?;
    let mut out = BufWriter::new(file);
    out.write_all(ARRAY_MAGIC)?;
    out.write_all(&ARRAY_VERSION.to_le_bytes())?;
    out.write_all(&(dims.len() as u32).to_le_bytes())?;
    for &d in dims {
        out.write_all(&(d as u64).to_le_bytes())?;
    }
    for &v in data {
        out.write_all(&v.to_le_bytes())?;
    }
    out.flush()?;
    Ok(())
}

/// Read an array previously written by [`save_f64_array`].
pub fn load_f64_array(path: &Path) -> Result<(Vec<usize>, Vec<f64>)> {
    let mut file = std::fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let bad = |what: &str| {
        Error::InvalidInput(format!("{}: {what}", path.display()))
    };

    if bytes.len() < 12 || &bytes[..4] != ARRAY_MAGIC {
        return Err(bad("not a SpikePhi array file"));
    }
    let version = u32::from_le_bytes(bytes[4..8].try_into().expect("4 bytes"));
    if version != ARRAY_VERSION {
        return Err(bad(&format!("unsupported array version {version}")));
    }
    let ndim = u32::from_le_bytes(bytes[8..12].try_into().expect("4 bytes")) as usize;

    let header_len = 12 + ndim * 8;
    if bytes.len() < header_len {
        return Err(bad("truncated dimension header"));
    }
    let mut dims = Vec::with_capacity(ndim);
    for i in 0..ndim {
        let at = 12 + i * 8;
        dims.push(u64::from_le_bytes(bytes[at..at + 8].try_into().expect("8 bytes")) as usize);
    }

    let expected: usize = dims.iter().product();
    let payload = &bytes[header_len..];
    if payload.len() != expected * 8 {
        return Err(bad(&format!(
            "payload holds {} values, dims {:?} require {}",
            payload.len() / 8,
            dims,
            expected
        )));
    }
    let data = payload
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().expect("8 bytes")))
        .collect();
    Ok((dims, data))
}

/// Metadata persisted alongside each pair's result arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub pair: String,
    /// Seed actually used for shuffled traversal this run.
    pub seed: u64,
    pub config: SweepConfig,
}

impl RunMetadata {
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Output paths for one channel pair.
pub fn pair_output_paths(output_dir: &Path, label: &str) -> (PathBuf, PathBuf, PathBuf) {
    (
        output_dir.join(format!("micro_{label}.sphi")),
        output_dir.join(format!("macro_{label}.sphi")),
        output_dir.join(format!("meta_{label}.json")),
    )
}
