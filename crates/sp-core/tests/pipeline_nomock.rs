//! End-to-end pipeline tests with a deterministic in-process oracle.
//!
//! Covers the full path: synthetic spike trains → binarization →
//! estimation → coarse-graining → phi aggregation, plus the sweep
//! driver's per-cell failure isolation.

use std::path::PathBuf;

use sp_common::config::{
    BinSizeRange, ChannelPair, OracleSettings, SweepConfig, Traversal,
};
use sp_common::Result;
use sp_core::coarse::canonical_catalog;
use sp_core::model::{
    estimate, num_states, state_occurrences, window_pairs, TraversalOrder,
};
use sp_core::oracle::{IntegrationOracle, Network, StateIntegration};
use sp_core::persist::load_f64_array;
use sp_core::phi;
use sp_core::sweep::ExperimentDriver;
use sp_core::train::binarize_all;
use sp_math::{is_stochastic_row, ROW_SUM_TOL};

/// Deterministic oracle: phi depends only on the state, so ordering bugs
/// show up as value mismatches rather than flaky averages.
struct StubOracle;

impl IntegrationOracle for StubOracle {
    fn evaluate(&self, network: &Network, state: &[usize]) -> Result<StateIntegration> {
        assert!(network.is_valid_state(state), "oracle got invalid state");
        let phi = state
            .iter()
            .enumerate()
            .map(|(i, &s)| (i + 1) as f64 * s as f64)
            .sum();
        Ok(StateIntegration {
            phi,
            partition: None,
        })
    }
}

/// Small deterministic LCG so the synthetic recordings are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_unit(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Two synthetic channels: independent-ish spikes with density ~0.3 at
/// resolution `bin` over `bins` bins.
fn synthetic_pair(bins: usize, bin: f64, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = Lcg(seed);
    let mut a = Vec::new();
    let mut b = Vec::new();
    for i in 0..bins {
        let t = i as f64 * bin + bin / 2.0;
        if rng.next_unit() < 0.3 {
            a.push(t);
        }
        if rng.next_unit() < 0.3 {
            b.push(t);
        }
    }
    // Anchor both channels to the same span so truncation keeps most bins.
    let last = (bins - 1) as f64 * bin + bin / 2.0;
    if a.last() != Some(&last) {
        a.push(last);
    }
    if b.last() != Some(&last) {
        b.push(last);
    }
    (a, b)
}

fn write_train(dir: &std::path::Path, name: &str, train: &[f64]) -> PathBuf {
    let path = dir.join(name);
    let body: String = train.iter().map(|t| format!("{t}\n")).collect();
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn micro_pipeline_rows_are_stochastic() {
    let (a, b) = synthetic_pair(6000, 0.01, 42);
    let matrix = binarize_all(&[a, b], 0.01).unwrap();
    let size = num_states(2, 2).unwrap();
    let pairs = window_pairs(&matrix, 2, 2, TraversalOrder::Shuffled { seed: 7 }).unwrap();
    let estimation = estimate(&pairs, size, 5).unwrap();

    assert_eq!(estimation.tpm.rows(), 16);
    for i in 0..16 {
        assert!(
            is_stochastic_row(estimation.tpm.row(i), ROW_SUM_TOL),
            "row {i} sums to {}",
            estimation.tpm.row_sum(i)
        );
        assert!(estimation.counts.row_sum(i) >= 5.0);
    }
}

#[test]
fn micro_and_macro_phis_from_estimated_model() {
    let (a, b) = synthetic_pair(6000, 0.01, 99);
    let matrix = binarize_all(&[a, b], 0.01).unwrap();
    let size = num_states(2, 2).unwrap();
    let pairs = window_pairs(&matrix, 2, 2, TraversalOrder::Shuffled { seed: 3 }).unwrap();
    let estimation = estimate(&pairs, size, 5).unwrap();
    let occurrences = state_occurrences(&matrix, 2, 2).unwrap();

    let network = Network::new(estimation.tpm.clone(), vec![4, 4]).unwrap();
    let unweighted = phi::average_phi(&StubOracle, &network).unwrap();
    let weighted = phi::weighted_average_phi(&StubOracle, &network, &occurrences).unwrap();
    assert!(unweighted.is_finite() && unweighted >= 0.0);
    assert!(weighted.is_finite() && weighted >= 0.0);

    let catalog = canonical_catalog();
    let macros = phi::all_coarse_grainings_average(&StubOracle, &estimation.tpm, &catalog).unwrap();
    assert_eq!(macros.len(), 16);
    assert!(macros.iter().all(|p| p.is_finite()));

    let weighted_macros = phi::all_coarse_grainings_weighted_average(
        &StubOracle,
        &estimation.tpm,
        &occurrences,
        &catalog,
    )
    .unwrap();
    assert_eq!(weighted_macros.len(), 16);
}

#[test]
fn sweep_isolates_one_insufficient_cell() {
    // Two bin sizes × two skips. The large skip leaves only ~50 samples
    // at the coarse bin size, far below 4 states × 40 observations, so
    // exactly that one cell fails; every other cell has hundreds of
    // samples per state.
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let out_dir = dir.path().join("out");
    std::fs::create_dir_all(&data_dir).unwrap();

    let (a, b) = synthetic_pair(2000, 0.01, 7);
    let path_a = write_train(&data_dir, "cellA.txt", &a);
    let path_b = write_train(&data_dir, "cellB.txt", &b);

    let config = SweepConfig {
        output_dir: out_dir.clone(),
        state_bits: 1,
        required_observations: 40,
        unit_divisor: 1.0,
        bin_sizes: BinSizeRange {
            min: 0.01,
            max: 0.02,
            count: 2,
        },
        skips: vec![1, 950],
        pairs: vec![ChannelPair {
            a: path_a,
            b: path_b,
            label: Some("synth".into()),
        }],
        oracle: OracleSettings {
            command: "unused-by-test".into(),
            args: vec![],
            timeout_secs: 5,
            partition_mode: "all".into(),
            assume_cuts_cannot_create_concepts: true,
        },
        weighted: false,
        traversal: Traversal::Shuffled,
        strided_start: 0,
        seed: Some(11),
    };

    let driver = ExperimentDriver::new(&config, &StubOracle);
    let outcomes = driver.run("run-test").unwrap();
    assert_eq!(outcomes.len(), 1);

    let outcome = &outcomes[0];
    assert_eq!(outcome.micro_phis.rows(), 2);
    assert_eq!(outcome.micro_phis.cols(), 2);
    assert_eq!(outcome.failed_cells, 1);

    let sentinels = outcome
        .micro_phis
        .as_slice()
        .iter()
        .filter(|v| v.is_nan())
        .count();
    assert_eq!(sentinels, 1, "exactly one cell holds the sentinel");
    // The failing cell is the coarse bin size at the large skip.
    assert!(outcome.micro_phis.get(1, 1).is_nan());
    assert!(outcome.micro_phis.get(0, 0).is_finite());
    assert!(outcome.micro_phis.get(0, 1).is_finite());
    assert!(outcome.micro_phis.get(1, 0).is_finite());

    // Persisted arrays preserve the grid shape and the sentinel.
    let (dims, values) = load_f64_array(&out_dir.join("micro_synth.sphi")).unwrap();
    assert_eq!(dims, vec![2, 2]);
    assert_eq!(values.iter().filter(|v| v.is_nan()).count(), 1);

    // K = 1 has no coarse-graining catalog: the macro cube is empty but
    // shaped.
    let (macro_dims, _) = load_f64_array(&out_dir.join("macro_synth.sphi")).unwrap();
    assert_eq!(macro_dims, vec![2, 2, 0]);

    // Metadata sidecar exists and echoes the pair label.
    let meta = std::fs::read_to_string(out_dir.join("meta_synth.json")).unwrap();
    assert!(meta.contains("\"pair\": \"synth\""));
    assert!(meta.contains("\"seed\": 11"));
}

#[test]
fn sweep_full_success_with_k2_macro_cube() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let out_dir = dir.path().join("out");
    std::fs::create_dir_all(&data_dir).unwrap();

    let (a, b) = synthetic_pair(6000, 0.01, 21);
    let path_a = write_train(&data_dir, "cellA.txt", &a);
    let path_b = write_train(&data_dir, "cellB.txt", &b);

    let config = SweepConfig {
        output_dir: out_dir.clone(),
        state_bits: 2,
        required_observations: 5,
        unit_divisor: 1.0,
        bin_sizes: BinSizeRange {
            min: 0.01,
            max: 0.01,
            count: 1,
        },
        skips: vec![2],
        pairs: vec![ChannelPair {
            a: path_a,
            b: path_b,
            label: Some("synth".into()),
        }],
        oracle: OracleSettings {
            command: "unused-by-test".into(),
            args: vec![],
            timeout_secs: 5,
            partition_mode: "all".into(),
            assume_cuts_cannot_create_concepts: true,
        },
        weighted: true,
        traversal: Traversal::Shuffled,
        strided_start: 0,
        seed: Some(5),
    };

    let driver = ExperimentDriver::new(&config, &StubOracle);
    assert_eq!(driver.num_combinations(), 16);
    let outcomes = driver.run("run-test").unwrap();
    let outcome = &outcomes[0];
    assert_eq!(outcome.failed_cells, 0);
    assert!(outcome.micro_phis.get(0, 0).is_finite());
    assert_eq!(outcome.macro_phis.dims(), [1, 1, 16]);
    for c in 0..16 {
        assert!(outcome.macro_phis.get(0, 0, c).is_finite());
    }

    // The estimated transition matrix was persisted as a text table.
    let tpm_name = "micro_synth_occs_5_bin_0.01_skip_2.tsv";
    let tpm = sp_core::persist::load_matrix_text(&out_dir.join(tpm_name)).unwrap();
    assert_eq!(tpm.rows(), 16);
    for i in 0..16 {
        assert!(is_stochastic_row(tpm.row(i), 1e-9));
    }
}
