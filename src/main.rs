//! Command-line entry point: `wca analyze <configfile>`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};

use wca_rs::config::AnalysisConfig;
use wca_rs::driver::Analyzer;
use wca_rs::exec::{BoundedExplorer, Op};

#[derive(Parser)]
#[command(author, version, about = "Worst-case resource analysis via policy-guided exploration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the two-phase analysis described by a config file
    Analyze {
        /// Properties file with the analysis options
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    color_eyre::install().ok();

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze { config } => match analyze(&config) {
            Ok(()) => ExitCode::SUCCESS,
            Err(code) => ExitCode::from(code),
        },
    }
}

fn analyze(config_path: &std::path::Path) -> Result<(), u8> {
    let config = AnalysisConfig::from_file(config_path).map_err(|e| {
        error!("configuration error: {}", e);
        1u8
    })?;

    let Some(target) = config.target.clone() else {
        error!("configuration error: missing required option `target`");
        return Err(1);
    };
    let Some(build) = target_program(&target) else {
        error!("configuration error: unknown target `{}`", target);
        return Err(1);
    };

    let mut analyzer = Analyzer::new(config, BoundedExplorer::new(build));
    match analyzer.run() {
        Ok(report) => {
            info!(
                "analysis complete: {} points, chart at {}",
                report.series.len(),
                report.chart_path.display()
            );
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e.exit_code() as u8)
        }
    }
}

/// Built-in demo targets, selected by the `target` config option.
fn target_program(name: &str) -> Option<fn(u32) -> Op> {
    match name {
        "count-loop" => Some(count_loop),
        "branchy-loop" => Some(branchy_loop),
        "paired-calls" => Some(paired_calls),
        _ => None,
    }
}

/// Straight-line program: linear cost, no decisions at all.
fn count_loop(n: u32) -> Op {
    Op::seq((0..n).map(|_| Op::cost(1)).collect())
}

/// Each iteration branches between a constant step and a step whose cost
/// grows with the iteration counter; the worst case is quadratic.
fn branchy_loop(n: u32) -> Op {
    Op::seq(
        (1..=n)
            .map(|i| Op::branch(100, vec![Op::cost(1), Op::cost(i as u64)]))
            .collect(),
    )
}

/// Two call sites of one procedure whose heavy arm depends on an earlier
/// in-frame choice, so the policy needs context-sensitive keys.
fn paired_calls(n: u32) -> Op {
    let heavy = (n as u64) * (n as u64);
    let first = Op::branch(
        10,
        vec![
            Op::branch(20, vec![Op::cost(1), Op::cost(1)]),
            Op::branch(20, vec![Op::cost(heavy), Op::cost(1)]),
        ],
    );
    let second = Op::branch(
        10,
        vec![
            Op::branch(20, vec![Op::cost(1), Op::cost(heavy)]),
            Op::branch(20, vec![Op::cost(1), Op::cost(1)]),
        ],
    );
    Op::seq(vec![Op::call(first), Op::call(second)])
}
