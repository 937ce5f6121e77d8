//! Transition-model estimation from sampled state transitions.
//!
//! Estimation folds a (current, future) index stream into an observation
//! count matrix under a per-source-state cap, then verifies every state
//! met the required evidence threshold before normalizing rows into a
//! transition matrix. Partial matrices are never returned: a single
//! under-observed state fails the whole estimation.

use sp_common::{Error, Matrix, Result};
use sp_math::normalize_row;
use tracing::debug;

use crate::model::indexer::num_states;
use crate::model::windows::{window_pairs, TraversalOrder};
use crate::train::binarize_all;

/// An estimated transition model with its supporting evidence.
#[derive(Debug, Clone)]
pub struct Estimation {
    /// Row-stochastic transition matrix: `tpm[i][j] = P(next = j | current = i)`.
    pub tpm: Matrix,
    /// `counts[i][j]` = sampled transitions from state `i` to state `j`.
    pub counts: Matrix,
}

/// Estimate a transition matrix from a transition stream.
///
/// For each (current, future) pair, in the order given: when the current
/// state's running total already holds `required_obs` observations the
/// pair is skipped, so no source state's row ever exceeds the cap and
/// later data still serves states that are not yet saturated. After the
/// stream is exhausted, any state whose total fell short fails the
/// estimation with [`Error::InsufficientObservations`].
///
/// `required_obs == 0` is the defined degenerate case: nothing is
/// recorded and every row becomes the uniform distribution.
pub fn estimate(
    pairs: &[(usize, usize)],
    num_states: usize,
    required_obs: u64,
) -> Result<Estimation> {
    if num_states == 0 {
        return Err(Error::InvalidInput("state space is empty".to_string()));
    }

    let mut counts = Matrix::zeros(num_states, num_states);
    // Per-state counter arena: the cap check must see running totals
    // without re-summing rows.
    let mut row_totals = vec![0u64; num_states];

    for &(current, future) in pairs {
        if current >= num_states || future >= num_states {
            return Err(Error::InvalidInput(format!(
                "state index ({current}, {future}) outside [0, {num_states})"
            )));
        }
        if row_totals[current] >= required_obs {
            // Already enough evidence for this source state.
            continue;
        }
        counts.add(current, future, 1.0);
        row_totals[current] += 1;
    }

    for (state, &observed) in row_totals.iter().enumerate() {
        if observed < required_obs {
            return Err(Error::InsufficientObservations {
                state,
                observed,
                required: required_obs,
            });
        }
    }

    let mut tpm = counts.clone();
    for i in 0..tpm.rows() {
        normalize_row(tpm.row_mut(i));
    }

    debug!(
        states = num_states,
        sampled = row_totals.iter().sum::<u64>(),
        "transition matrix estimated"
    );
    Ok(Estimation { tpm, counts })
}

/// Estimate directly from raw spike trains: binarize, window, estimate.
pub fn estimate_from_trains(
    trains: &[Vec<f64>],
    bin_width: f64,
    k: usize,
    skip: usize,
    required_obs: u64,
    order: TraversalOrder,
) -> Result<Estimation> {
    let matrix = binarize_all(trains, bin_width)?;
    let size = num_states(k, matrix.channels())?;
    let pairs = window_pairs(&matrix, k, skip, order)?;
    estimate(&pairs, size, required_obs)
}
