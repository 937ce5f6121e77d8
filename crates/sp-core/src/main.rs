//! SpikePhi - multi-scale integrated information from spike trains
//!
//! The main entry point, handling:
//! - `sweep`: the full (bin size × skip) parameter sweep for every pair
//! - `estimate`: a single transition-matrix estimation, persisted
//! - `check`: configuration and environment validation
//!
//! stdout carries JSON payloads; all logging goes to stderr.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use sp_common::config::{SweepConfig, Traversal};
use sp_common::error::format_error_human;
use sp_common::{Error, Result};
use sp_core::exit_codes::ExitCode;
use sp_core::logging::{generate_run_id, init_logging, LogConfig, LogFormat, LogLevel};
use sp_core::model::{estimate, num_states, state_occurrences, window_pairs, TraversalOrder};
use sp_core::oracle::SubprocessOracle;
use sp_core::persist;
use sp_core::sweep::ExperimentDriver;
use sp_core::train::{binarize_all, load_spike_train};

/// SpikePhi - integrated information estimation over spike-train pairs
#[derive(Parser)]
#[command(name = "spikephi")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log output format (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full parameter sweep from a sweep configuration file
    Sweep(SweepArgs),

    /// Estimate and persist a single transition matrix
    Estimate(EstimateArgs),

    /// Validate configuration, data files, and oracle availability
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct SweepArgs {
    /// Path to the sweep TOML file
    #[arg(long, env = "SPIKEPHI_CONFIG")]
    config: PathBuf,
}

#[derive(Args, Debug)]
struct EstimateArgs {
    /// Path to the sweep TOML file
    #[arg(long, env = "SPIKEPHI_CONFIG")]
    config: PathBuf,

    /// Bin size in seconds
    #[arg(long)]
    bin_size: f64,

    /// Temporal skip in bins
    #[arg(long)]
    skip: usize,

    /// Index of the channel pair to estimate (default: first)
    #[arg(long, default_value_t = 0)]
    pair: usize,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Path to the sweep TOML file
    #[arg(long, env = "SPIKEPHI_CONFIG")]
    config: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    init_logging(&LogConfig::from_env(cli_level, cli.global.log_format));

    let outcome = match &cli.command {
        Commands::Sweep(args) => cmd_sweep(args),
        Commands::Estimate(args) => cmd_estimate(args),
        Commands::Check(args) => cmd_check(args),
    };

    match outcome {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            eprintln!("{}", format_error_human(&err, !cli.global.no_color));
            std::process::exit(ExitCode::from_error(&err).as_i32());
        }
    }
}

fn cmd_sweep(args: &SweepArgs) -> Result<ExitCode> {
    let config = SweepConfig::load(&args.config)?;
    let oracle = SubprocessOracle::new(config.oracle.clone());
    if !oracle.available() {
        return Err(Error::OracleUnavailable(config.oracle.command.clone()));
    }

    let run_id = generate_run_id();
    let driver = ExperimentDriver::new(&config, &oracle);
    let outcomes = driver.run(&run_id)?;

    let failed: usize = outcomes.iter().map(|o| o.failed_cells).sum();
    let summary = serde_json::json!({
        "run_id": run_id,
        "output_dir": config.output_dir,
        "combinations": driver.num_combinations(),
        "pairs": outcomes.iter().map(|o| serde_json::json!({
            "label": o.label,
            "grid": [o.micro_phis.rows(), o.micro_phis.cols()],
            "failed_cells": o.failed_cells,
        })).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(if failed == 0 {
        ExitCode::Clean
    } else {
        ExitCode::Partial
    })
}

fn cmd_estimate(args: &EstimateArgs) -> Result<ExitCode> {
    let config = SweepConfig::load(&args.config)?;
    let pair = config.pairs.get(args.pair).ok_or_else(|| {
        Error::InvalidConfig(format!(
            "pair index {} out of range (have {})",
            args.pair,
            config.pairs.len()
        ))
    })?;

    let trains = vec![
        load_spike_train(&pair.a, config.unit_divisor)?,
        load_spike_train(&pair.b, config.unit_divisor)?,
    ];
    let matrix = binarize_all(&trains, args.bin_size)?;
    let size = num_states(config.state_bits, matrix.channels())?;
    let order = match config.traversal {
        Traversal::Shuffled => TraversalOrder::Shuffled {
            seed: config.seed.unwrap_or_else(rand::random),
        },
        Traversal::Strided => TraversalOrder::Strided {
            start: config.strided_start,
        },
    };
    let pairs = window_pairs(&matrix, config.state_bits, args.skip, order)?;
    let estimation = estimate(&pairs, size, config.required_observations)?;
    let occurrences = state_occurrences(&matrix, config.state_bits, args.skip)?;

    std::fs::create_dir_all(&config.output_dir)?;
    let label = pair.output_label();
    let tpm_path = config.output_dir.join(persist::tpm_file_name(
        &label,
        config.required_observations,
        args.bin_size,
        args.skip,
    ));
    persist::save_matrix_text(&tpm_path, &estimation.tpm)?;
    let occ_path = config
        .output_dir
        .join(format!("occurrences_{label}_bin_{}_skip_{}.txt", args.bin_size, args.skip));
    persist::save_occurrences(&occ_path, &occurrences)?;

    let summary = serde_json::json!({
        "pair": label,
        "bin_size": args.bin_size,
        "skip": args.skip,
        "states": size,
        "bins": matrix.bins(),
        "sampled_transitions": estimation.counts.as_slice().iter().sum::<f64>() as u64,
        "tpm": tpm_path,
        "occurrences": occ_path,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(ExitCode::Clean)
}

fn cmd_check(args: &CheckArgs) -> Result<ExitCode> {
    let config = SweepConfig::load(&args.config)?;

    let mut pair_reports = Vec::new();
    for pair in &config.pairs {
        let a = load_spike_train(&pair.a, config.unit_divisor)?;
        let b = load_spike_train(&pair.b, config.unit_divisor)?;
        pair_reports.push(serde_json::json!({
            "label": pair.output_label(),
            "spikes_a": a.len(),
            "spikes_b": b.len(),
        }));
    }

    let oracle = SubprocessOracle::new(config.oracle.clone());
    if !oracle.available() {
        return Err(Error::OracleUnavailable(config.oracle.command.clone()));
    }

    let summary = serde_json::json!({
        "ok": true,
        "bin_sizes": config.bin_sizes.values(),
        "skips": config.skips,
        "required_observations": config.required_observations,
        "oracle": config.oracle.command,
        "pairs": pair_reports,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(ExitCode::Clean)
}
