//! CLI end-to-end tests for the spikephi binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn write_train(dir: &Path, name: &str, spikes: &[f64]) -> std::path::PathBuf {
    let path = dir.join(name);
    let body: String = spikes.iter().map(|t| format!("{t}\n")).collect();
    std::fs::write(&path, body).unwrap();
    path
}

/// Write a sweep config pointing at generated data; the oracle is `sh`
/// so availability checks pass without a real integration backend.
fn write_config(dir: &Path) -> std::path::PathBuf {
    let data_dir = dir.join("data");
    std::fs::create_dir_all(&data_dir).unwrap();

    // Dense alternating spikes so estimation at the configured scale works.
    let a: Vec<f64> = (0..400).map(|i| i as f64 * 0.01 + 0.005).collect();
    let b: Vec<f64> = (0..200).map(|i| i as f64 * 0.02 + 0.005).collect();
    write_train(&data_dir, "cellA.txt", &a);
    write_train(&data_dir, "cellB.txt", &b);

    let out_dir = dir.join("out");
    let config = format!(
        r#"
output_dir = "{out}"
state_bits = 1
required_observations = 0
skips = [1]

[bin_sizes]
min = 0.01
max = 0.01
count = 1

[[pairs]]
a = "{a}"
b = "{b}"
label = "ab"

[oracle]
command = "sh"
"#,
        out = out_dir.display(),
        a = data_dir.join("cellA.txt").display(),
        b = data_dir.join("cellB.txt").display(),
    );
    let path = dir.join("sweep.toml");
    std::fs::write(&path, config).unwrap();
    path
}

#[test]
fn no_args_shows_usage() {
    Command::cargo_bin("spikephi")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn check_reports_ok_for_valid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    Command::cargo_bin("spikephi")
        .unwrap()
        .args(["check", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\": true"))
        .stdout(predicate::str::contains("\"spikes_a\": 400"));
}

#[test]
fn check_missing_config_exits_config_error() {
    Command::cargo_bin("spikephi")
        .unwrap()
        .args(["check", "--config", "/nonexistent/sweep.toml"])
        .assert()
        .code(10)
        .stderr(predicate::str::contains("Configuration Error"));
}

#[test]
fn check_invalid_config_names_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sweep.toml");
    // skips empty fails validation.
    std::fs::write(
        &path,
        r#"
output_dir = "out"
required_observations = 10
skips = []

[bin_sizes]
min = 0.01
max = 0.02
count = 2

[[pairs]]
a = "a.txt"
b = "b.txt"

[oracle]
command = "sh"
"#,
    )
    .unwrap();

    Command::cargo_bin("spikephi")
        .unwrap()
        .args(["check", "--config"])
        .arg(&path)
        .assert()
        .code(10)
        .stderr(predicate::str::contains("skips"));
}

#[test]
fn estimate_writes_tpm_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    Command::cargo_bin("spikephi")
        .unwrap()
        .args(["estimate", "--bin-size", "0.01", "--skip", "1", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"states\": 4"))
        .stdout(predicate::str::contains("tsv"));

    let tpm_path = dir
        .path()
        .join("out")
        .join("micro_ab_occs_0_bin_0.01_skip_1.tsv");
    assert!(tpm_path.is_file(), "expected {}", tpm_path.display());
}

#[test]
fn estimate_insufficient_data_exits_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    // A cap of 0 was written; ask for a skip so large no window fits,
    // then estimation under a real threshold cannot be satisfied. Use a
    // separate config with a nonzero threshold.
    let raised = std::fs::read_to_string(&config)
        .unwrap()
        .replace("required_observations = 0", "required_observations = 50");
    std::fs::write(&config, raised).unwrap();

    Command::cargo_bin("spikephi")
        .unwrap()
        .args(["estimate", "--bin-size", "0.01", "--skip", "399", "--config"])
        .arg(&config)
        .assert()
        .code(11)
        .stderr(predicate::str::contains("Insufficient Observations"));
}
