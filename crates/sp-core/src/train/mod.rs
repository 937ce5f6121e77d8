//! Spike-train loading and binarization.

pub mod binarize;
pub mod load;

pub use binarize::{binarize, binarize_all, BinaryMatrix};
pub use load::load_spike_train;
