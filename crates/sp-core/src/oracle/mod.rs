//! Integration-oracle adapter.
//!
//! The integration measure itself is an external computation. This module
//! defines the contract: an immutable [`Network`] built from a transition
//! matrix and per-node state cardinalities, a state to evaluate at, and a
//! returned non-negative scalar with the minimizing-partition descriptor.
//!
//! State ordering convention: the node listed first varies fastest across
//! the matrix's row/column index. [`crate::model::indexer`] produces
//! indices in exactly this convention; both sides must agree or results
//! are silently wrong.

pub mod subprocess;

pub use subprocess::SubprocessOracle;

use serde::{Deserialize, Serialize};
use sp_common::{Error, Matrix, Result};
use sp_math::{is_stochastic_row, ROW_SUM_TOL};

/// An immutable causal-network description: pure data, no computation.
#[derive(Debug, Clone)]
pub struct Network {
    tpm: Matrix,
    states_per_node: Vec<usize>,
}

impl Network {
    /// Build a network, validating the matrix against the cardinalities.
    pub fn new(tpm: Matrix, states_per_node: Vec<usize>) -> Result<Self> {
        if states_per_node.is_empty() || states_per_node.iter().any(|&n| n == 0) {
            return Err(Error::InvalidInput(
                "every node needs at least one state".to_string(),
            ));
        }
        if !tpm.is_square() {
            return Err(Error::InvalidInput(format!(
                "transition matrix must be square, got {}x{}",
                tpm.rows(),
                tpm.cols()
            )));
        }
        let expected: usize = states_per_node.iter().product();
        if tpm.rows() != expected {
            return Err(Error::InvalidInput(format!(
                "matrix size {} does not match state space {:?} (= {})",
                tpm.rows(),
                states_per_node,
                expected
            )));
        }
        for i in 0..tpm.rows() {
            if !is_stochastic_row(tpm.row(i), ROW_SUM_TOL) {
                return Err(Error::InvalidInput(format!(
                    "transition matrix row {i} is not a probability distribution"
                )));
            }
        }
        Ok(Network {
            tpm,
            states_per_node,
        })
    }

    /// The row-stochastic transition matrix.
    pub fn tpm(&self) -> &Matrix {
        &self.tpm
    }

    /// Per-node state cardinalities, in node order.
    pub fn states_per_node(&self) -> &[usize] {
        &self.states_per_node
    }

    /// Whether `state` is a valid joint assignment for this network.
    pub fn is_valid_state(&self, state: &[usize]) -> bool {
        state.len() == self.states_per_node.len()
            && state
                .iter()
                .zip(&self.states_per_node)
                .all(|(&s, &n)| s < n)
    }
}

/// The oracle's answer for one system state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateIntegration {
    /// Integration scalar; non-negative.
    pub phi: f64,
    /// Descriptor of the partition that minimized the measure.
    #[serde(default)]
    pub partition: Option<serde_json::Value>,
}

/// External integration-measure computation.
///
/// Implementations must behave as pure functions of (network, state):
/// the sweep driver may call them in any order and treats every failure
/// as isolated to the configuration being evaluated.
pub trait IntegrationOracle {
    fn evaluate(&self, network: &Network, state: &[usize]) -> Result<StateIntegration>;
}

/// One oracle invocation's wire request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRequest {
    /// Transition matrix as nested rows, state-by-state form.
    pub tpm: Vec<Vec<f64>>,
    pub states_per_node: Vec<usize>,
    /// The system state to evaluate, one value per node.
    pub state: Vec<usize>,
    /// Algorithm parameters, explicit per request.
    pub partition_mode: String,
    pub assume_cuts_cannot_create_concepts: bool,
}

impl OracleRequest {
    /// Assemble a request from validated inputs.
    pub fn new(
        network: &Network,
        state: &[usize],
        partition_mode: &str,
        assume_cuts_cannot_create_concepts: bool,
    ) -> Result<Self> {
        if !network.is_valid_state(state) {
            return Err(Error::InvalidInput(format!(
                "state {:?} invalid for cardinalities {:?}",
                state,
                network.states_per_node()
            )));
        }
        Ok(OracleRequest {
            tpm: network.tpm().iter_rows().map(|r| r.to_vec()).collect(),
            states_per_node: network.states_per_node().to_vec(),
            state: state.to_vec(),
            partition_mode: partition_mode.to_string(),
            assume_cuts_cannot_create_concepts,
        })
    }
}
