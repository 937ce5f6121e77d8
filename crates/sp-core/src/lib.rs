//! SpikePhi Core Library
//!
//! This library provides the core functionality for multi-scale integrated
//! information estimation from spike trains:
//! - Spike-train loading and binarization
//! - Windowed state sampling and transition-model estimation
//! - Coarse-graining of micro transition models
//! - The external integration-oracle adapter
//! - Per-state phi aggregation and the parameter-sweep driver
//!
//! The binary entry point is in `main.rs`.

pub mod coarse;
pub mod exit_codes;
pub mod logging;
pub mod model;
pub mod oracle;
pub mod persist;
pub mod phi;
pub mod sweep;
pub mod train;
