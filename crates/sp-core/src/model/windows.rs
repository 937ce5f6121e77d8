//! Windowed state sampling.
//!
//! A state at time `t` looks BACK over the K bins `[t-K+1, t]`; its future
//! counterpart is the same window shifted forward by `skip` bins. Valid
//! time indices therefore run over `[K-1, bins - skip)`.
//!
//! Two traversal orders are supported. The shuffled order decorrelates the
//! per-state observation cap from trajectory position; the strided order
//! gives a reproducible estimator for comparison runs.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use sp_common::{Error, Result};

use crate::model::indexer::{index_columns, num_states};
use crate::train::BinaryMatrix;

/// Order in which valid time indices are visited during estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOrder {
    /// Uniform random permutation of valid indices, seeded for
    /// reproducibility.
    Shuffled { seed: u64 },
    /// Deterministic: start at `K-1 + start`, step 2.
    Strided { start: usize },
}

fn validate(matrix: &BinaryMatrix, k: usize, skip: usize) -> Result<()> {
    if k == 0 {
        return Err(Error::InvalidInput("window size K must be >= 1".to_string()));
    }
    if matrix.channels() == 0 {
        return Err(Error::InvalidInput("matrix has no channels".to_string()));
    }
    if skip == 0 {
        return Err(Error::InvalidInput("skip must be >= 1".to_string()));
    }
    Ok(())
}

/// The valid time indices for (K, skip) over `bins` bins, in traversal
/// order. Empty when the data span is too short for even one window.
fn traversal_indices(bins: usize, k: usize, skip: usize, order: TraversalOrder) -> Vec<usize> {
    let lo = k - 1;
    let hi = bins.saturating_sub(skip);
    match order {
        TraversalOrder::Shuffled { seed } => {
            let mut indices: Vec<usize> = (lo..hi).collect();
            let mut rng = StdRng::seed_from_u64(seed);
            indices.shuffle(&mut rng);
            indices
        }
        TraversalOrder::Strided { start } => (lo + start..hi).step_by(2).collect(),
    }
}

/// Build the (current, future) state-index pairs for one estimation run.
///
/// The sequence is finite and restartable: calling this again with the
/// same order yields the same pairs.
pub fn window_pairs(
    matrix: &BinaryMatrix,
    k: usize,
    skip: usize,
    order: TraversalOrder,
) -> Result<Vec<(usize, usize)>> {
    validate(matrix, k, skip)?;
    // Confirm the state space is representable before sampling.
    num_states(k, matrix.channels())?;

    let indices = traversal_indices(matrix.bins(), k, skip, order);
    let pairs = indices
        .into_iter()
        .map(|t| {
            let current = index_columns(matrix, t - (k - 1), k);
            let future = index_columns(matrix, t - (k - 1) + skip, k);
            (current, future)
        })
        .collect();
    Ok(pairs)
}

/// Count every valid time index's current state, with no cap and no
/// ordering policy: the occurrence profile of the state space over the
/// same span estimation samples from.
pub fn state_occurrences(matrix: &BinaryMatrix, k: usize, skip: usize) -> Result<Vec<u64>> {
    validate(matrix, k, skip)?;
    let size = num_states(k, matrix.channels())?;

    let lo = k - 1;
    let hi = matrix.bins().saturating_sub(skip);
    let mut occurrences = vec![0u64; size];
    for t in lo..hi {
        occurrences[index_columns(matrix, t - (k - 1), k)] += 1;
    }
    Ok(occurrences)
}
