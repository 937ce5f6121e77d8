//! Empirical transition-model construction.
//!
//! The model pipeline: a binarized multi-channel matrix is sliced into
//! K-bin state windows ([`windows`]), each window is mapped to a unique
//! state index ([`indexer`]), and the resulting (current, future) index
//! stream is folded into a row-stochastic transition matrix
//! ([`estimator`]).

pub mod estimator;
pub mod indexer;
pub mod windows;

pub use estimator::{estimate, estimate_from_trains, Estimation};
pub use indexer::{index_window, num_states, state_values};
pub use windows::{state_occurrences, window_pairs, TraversalOrder};
