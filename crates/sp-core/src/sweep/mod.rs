//! Parameter-sweep driver.
//!
//! Runs the full pipeline over a (bin size × temporal skip) grid for each
//! configured channel pair: estimate the micro transition model, persist
//! it, evaluate micro and coarse-grained phi averages, and collect the
//! results into shape-preserving arrays. A cell whose estimation or
//! oracle evaluation fails is recorded as NaN and never aborts the rest
//! of the sweep; any other error kind propagates.

use std::path::Path;

use sp_common::config::{SweepConfig, Traversal};
use sp_common::{Matrix, Result};
use tracing::{info, warn};

use crate::coarse::{canonical_catalog, ElementGrouping};
use crate::model::{estimate, num_states, state_occurrences, window_pairs, TraversalOrder};
use crate::oracle::{IntegrationOracle, Network};
use crate::persist;
use crate::phi;
use crate::train::{binarize_all, load_spike_train};

/// Three-dimensional result array (bins × skips × combinations),
/// NaN-initialized so untouched cells read as the failure sentinel.
#[derive(Debug, Clone)]
pub struct ScalarCube {
    dims: [usize; 3],
    data: Vec<f64>,
}

impl ScalarCube {
    pub fn new(d0: usize, d1: usize, d2: usize) -> Self {
        ScalarCube {
            dims: [d0, d1, d2],
            data: vec![f64::NAN; d0 * d1 * d2],
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.data[self.offset(i, j, k)]
    }

    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f64) {
        let at = self.offset(i, j, k);
        self.data[at] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    fn offset(&self, i: usize, j: usize, k: usize) -> usize {
        assert!(
            i < self.dims[0] && j < self.dims[1] && k < self.dims[2],
            "cube index out of bounds"
        );
        (i * self.dims[1] + j) * self.dims[2] + k
    }
}

/// Results for one channel pair over the full sweep grid.
#[derive(Debug, Clone)]
pub struct PairOutcome {
    pub label: String,
    /// Micro average phi, bins × skips; NaN marks failed cells.
    pub micro_phis: Matrix,
    /// Macro average phi per coarse-graining combination.
    pub macro_phis: ScalarCube,
    /// Number of grid cells that failed and hold the sentinel.
    pub failed_cells: usize,
}

/// One cell's computed values before aggregation into the outcome grids.
struct CellResult {
    micro_phi: f64,
    macro_phis: Vec<f64>,
}

/// Orchestrates a sweep for a fixed configuration and oracle.
pub struct ExperimentDriver<'a, O: IntegrationOracle> {
    config: &'a SweepConfig,
    oracle: &'a O,
    catalog: Vec<ElementGrouping>,
}

impl<'a, O: IntegrationOracle> ExperimentDriver<'a, O> {
    pub fn new(config: &'a SweepConfig, oracle: &'a O) -> Self {
        // The coarse-graining catalog is defined over 4-state elements;
        // other window sizes run the micro analysis only.
        let catalog = if config.state_bits == 2 {
            canonical_catalog()
        } else {
            Vec::new()
        };
        ExperimentDriver {
            config,
            oracle,
            catalog,
        }
    }

    /// Number of coarse-graining combinations the sweep evaluates.
    pub fn num_combinations(&self) -> usize {
        self.catalog.len() * self.catalog.len()
    }

    /// Run the sweep for every configured pair, persisting results under
    /// the configured output directory.
    pub fn run(&self, run_id: &str) -> Result<Vec<PairOutcome>> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        let seed = self.config.seed.unwrap_or_else(rand::random);

        let mut outcomes = Vec::with_capacity(self.config.pairs.len());
        for pair in &self.config.pairs {
            let label = pair.output_label();
            info!(pair = %label, "sweeping channel pair");
            let outcome = self.run_pair(&pair.a, &pair.b, &label, seed)?;

            let (micro_path, macro_path, meta_path) =
                persist::pair_output_paths(&self.config.output_dir, &label);
            persist::save_f64_array(
                &micro_path,
                &[outcome.micro_phis.rows(), outcome.micro_phis.cols()],
                outcome.micro_phis.as_slice(),
            )?;
            let dims = outcome.macro_phis.dims();
            persist::save_f64_array(
                &macro_path,
                &[dims[0], dims[1], dims[2]],
                outcome.macro_phis.as_slice(),
            )?;
            persist::RunMetadata {
                run_id: run_id.to_string(),
                created_at: chrono::Utc::now(),
                pair: label.clone(),
                seed,
                config: self.config.clone(),
            }
            .save(&meta_path)?;

            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Sweep the full grid for one pair of spike files.
    pub fn run_pair(
        &self,
        path_a: &Path,
        path_b: &Path,
        label: &str,
        seed: u64,
    ) -> Result<PairOutcome> {
        let trains = vec![
            load_spike_train(path_a, self.config.unit_divisor)?,
            load_spike_train(path_b, self.config.unit_divisor)?,
        ];

        let bin_sizes = self.config.bin_sizes.values();
        let skips = &self.config.skips;
        let combos = self.num_combinations();

        let mut micro_phis = Matrix::zeros(bin_sizes.len(), skips.len());
        for i in 0..bin_sizes.len() {
            for j in 0..skips.len() {
                micro_phis.set(i, j, f64::NAN);
            }
        }
        let mut macro_phis = ScalarCube::new(bin_sizes.len(), skips.len(), combos);
        let mut failed_cells = 0usize;

        for (i, &bin_size) in bin_sizes.iter().enumerate() {
            for (j, &skip) in skips.iter().enumerate() {
                match self.run_cell(&trains, bin_size, skip, seed, label) {
                    Ok(cell) => {
                        micro_phis.set(i, j, cell.micro_phi);
                        for (c, &value) in cell.macro_phis.iter().enumerate() {
                            macro_phis.set(i, j, c, value);
                        }
                    }
                    Err(e) if e.is_cell_isolable() => {
                        warn!(
                            bin_size,
                            skip,
                            error = %e,
                            "sweep cell failed; recording sentinel"
                        );
                        failed_cells += 1;
                        // The grids stay NaN for this cell.
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        info!(
            pair = %label,
            cells = bin_sizes.len() * skips.len(),
            failed = failed_cells,
            "pair sweep complete"
        );
        Ok(PairOutcome {
            label: label.to_string(),
            micro_phis,
            macro_phis,
            failed_cells,
        })
    }

    /// Estimate and evaluate a single (bin size, skip) cell.
    fn run_cell(
        &self,
        trains: &[Vec<f64>],
        bin_size: f64,
        skip: usize,
        seed: u64,
        label: &str,
    ) -> Result<CellResult> {
        let config = self.config;
        let k = config.state_bits;

        let matrix = binarize_all(trains, bin_size)?;
        let size = num_states(k, matrix.channels())?;
        let order = match config.traversal {
            Traversal::Shuffled => TraversalOrder::Shuffled { seed },
            Traversal::Strided => TraversalOrder::Strided {
                start: config.strided_start,
            },
        };
        let pairs = window_pairs(&matrix, k, skip, order)?;
        let estimation = estimate(&pairs, size, config.required_observations)?;

        let tpm_path = config.output_dir.join(persist::tpm_file_name(
            label,
            config.required_observations,
            bin_size,
            skip,
        ));
        persist::save_matrix_text(&tpm_path, &estimation.tpm)?;

        let per_channel = size_per_channel(k);
        let network = Network::new(
            estimation.tpm.clone(),
            vec![per_channel; matrix.channels()],
        )?;

        let occurrences = state_occurrences(&matrix, k, skip)?;
        let micro_phi = if config.weighted {
            phi::weighted_average_phi(self.oracle, &network, &occurrences)?
        } else {
            phi::average_phi(self.oracle, &network)?
        };

        let macro_phis = if self.catalog.is_empty() {
            Vec::new()
        } else if config.weighted {
            phi::all_coarse_grainings_weighted_average(
                self.oracle,
                &estimation.tpm,
                &occurrences,
                &self.catalog,
            )?
        } else {
            phi::all_coarse_grainings_average(self.oracle, &estimation.tpm, &self.catalog)?
        };

        info!(bin_size, skip, micro_phi, "sweep cell complete");
        Ok(CellResult {
            micro_phi,
            macro_phis,
        })
    }
}

fn size_per_channel(k: usize) -> usize {
    1usize << k
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_sentinel_and_set() {
        let mut cube = ScalarCube::new(2, 2, 3);
        assert!(cube.get(1, 1, 2).is_nan());
        cube.set(1, 0, 2, 0.5);
        assert_eq!(cube.get(1, 0, 2), 0.5);
        assert!(cube.get(1, 0, 1).is_nan());
        assert_eq!(cube.as_slice().len(), 12);
    }

    #[test]
    fn test_cube_layout_row_major() {
        let mut cube = ScalarCube::new(2, 3, 4);
        cube.set(1, 2, 3, 9.0);
        // Offset (1·3 + 2)·4 + 3 = 23.
        assert_eq!(cube.as_slice()[23], 9.0);
    }

    #[test]
    #[should_panic(expected = "cube index out of bounds")]
    fn test_cube_bounds_panic() {
        let cube = ScalarCube::new(1, 1, 1);
        cube.get(0, 0, 1);
    }
}
