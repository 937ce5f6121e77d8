//! SpikePhi shared types: errors, matrices, and sweep configuration.
//!
//! This crate holds the types every other SpikePhi crate agrees on:
//! - The unified [`Error`] enum with stable codes and categories
//! - The dense row-major [`Matrix`] used for transition and count matrices
//! - The [`SweepConfig`] loaded from TOML sweep files

pub mod config;
pub mod error;
pub mod matrix;

pub use config::{BinSizeRange, ChannelPair, OracleSettings, SweepConfig, Traversal};
pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use matrix::Matrix;
