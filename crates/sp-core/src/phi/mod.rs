//! Per-state phi collection and aggregation.
//!
//! States are enumerated in canonical order: the Cartesian product of
//! per-element cardinalities with the **last** element varying fastest.
//! This is the order the oracle receives states in, and it is NOT the
//! transition-matrix index order (where the first element varies
//! fastest). Occurrence weights are stored in matrix-index order, so the
//! two orders are explicitly converted here rather than assumed equal.

use sp_common::{Error, Matrix, Result};
use tracing::{debug, info};

use crate::coarse::{aggregate, CoarseGraining, ElementGrouping, StateMap};
use crate::oracle::{IntegrationOracle, Network};

/// Enumerate every joint state, last element varying fastest.
pub fn system_states(cardinalities: &[usize]) -> Vec<Vec<usize>> {
    let total: usize = cardinalities.iter().product();
    let mut states = Vec::with_capacity(total);
    for mut i in 0..total {
        let mut state = vec![0usize; cardinalities.len()];
        for (slot, &card) in state.iter_mut().zip(cardinalities).rev() {
            *slot = i % card;
            i /= card;
        }
        states.push(state);
    }
    states
}

/// Map a joint state to its transition-matrix index (first element
/// varying fastest).
pub fn tpm_state_index(state: &[usize], cardinalities: &[usize]) -> usize {
    let mut index = 0usize;
    let mut place = 1usize;
    for (&s, &card) in state.iter().zip(cardinalities) {
        index += s * place;
        place *= card;
    }
    index
}

/// Evaluate the oracle at every reachable state, in canonical order.
pub fn state_phis(oracle: &dyn IntegrationOracle, network: &Network) -> Result<Vec<f64>> {
    let states = system_states(network.states_per_node());
    let mut phis = Vec::with_capacity(states.len());
    for state in &states {
        let result = oracle.evaluate(network, state)?;
        phis.push(result.phi);
    }
    debug!(states = phis.len(), "collected per-state phis");
    Ok(phis)
}

/// Arithmetic mean of per-state phis.
pub fn average_phi(oracle: &dyn IntegrationOracle, network: &Network) -> Result<f64> {
    let phis = state_phis(oracle, network)?;
    Ok(phis.iter().sum::<f64>() / phis.len() as f64)
}

/// Occurrence-weighted mean of per-state phis.
///
/// `occurrences` is indexed in transition-matrix order; each canonical
/// state's weight is its occurrence share. Weights sum to 1, so the
/// weighted sum needs no further normalization.
pub fn weighted_average_phi(
    oracle: &dyn IntegrationOracle,
    network: &Network,
    occurrences: &[u64],
) -> Result<f64> {
    let cardinalities = network.states_per_node();
    let expected: usize = cardinalities.iter().product();
    if occurrences.len() != expected {
        return Err(Error::InvalidInput(format!(
            "occurrence vector has {} entries, state space has {}",
            occurrences.len(),
            expected
        )));
    }
    let total: u64 = occurrences.iter().sum();
    if total == 0 {
        return Err(Error::InvalidInput(
            "occurrence counts are all zero".to_string(),
        ));
    }

    let phis = state_phis(oracle, network)?;
    let states = system_states(cardinalities);
    let mut weighted = 0.0;
    for (phi, state) in phis.iter().zip(&states) {
        let occ = occurrences[tpm_state_index(state, cardinalities)];
        weighted += phi * occ as f64 / total as f64;
    }
    Ok(weighted)
}

/// Fold micro occurrence counts into the macro state space: a macro
/// state's count is the sum over its constituent micro states.
pub fn macro_occurrences(micro: &[u64], state_map: &StateMap) -> Vec<u64> {
    state_map
        .iter()
        .map(|members| members.iter().map(|&u| micro[u]).sum())
        .collect()
}

/// Build the macro network for one coarse-graining of a micro matrix.
pub fn macro_network(micro: &Matrix, graining: &CoarseGraining) -> Result<Network> {
    let macro_tpm = aggregate(micro, &graining.state_map)?;
    Network::new(macro_tpm, graining.states_per_element.clone())
}

/// Average phi for every coarse-graining combination, in combination
/// order.
pub fn all_coarse_grainings_average(
    oracle: &dyn IntegrationOracle,
    micro: &Matrix,
    catalog: &[ElementGrouping],
) -> Result<Vec<f64>> {
    let combinations = crate::coarse::enumerate_combinations(catalog)?;
    let mut averages = Vec::with_capacity(combinations.len());
    for (index, graining) in combinations.iter().enumerate() {
        let network = macro_network(micro, graining)?;
        let avg = average_phi(oracle, &network)?;
        info!(combination = index, phi = avg, "macro average phi");
        averages.push(avg);
    }
    Ok(averages)
}

/// Occurrence-weighted average phi for every coarse-graining combination.
pub fn all_coarse_grainings_weighted_average(
    oracle: &dyn IntegrationOracle,
    micro: &Matrix,
    occurrences: &[u64],
    catalog: &[ElementGrouping],
) -> Result<Vec<f64>> {
    let combinations = crate::coarse::enumerate_combinations(catalog)?;
    let mut averages = Vec::with_capacity(combinations.len());
    for (index, graining) in combinations.iter().enumerate() {
        let network = macro_network(micro, graining)?;
        let macro_occs = macro_occurrences(occurrences, &graining.state_map);
        let avg = weighted_average_phi(oracle, &network, &macro_occs)?;
        info!(combination = index, phi = avg, "macro weighted average phi");
        averages.push(avg);
    }
    Ok(averages)
}
