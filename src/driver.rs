//! The analysis driver.
//!
//! [`Analyzer`] orchestrates the two phases against an attached host:
//!
//! 1. an exhaustive exploration at `policy.inputSize` with a
//!    [`PolicyGenerator`] attached, persisting the resulting trie (skipped
//!    when `reusePolicy` is set and a policy file exists);
//! 2. one policy-guided exploration per input size in `0..=input.max`, each
//!    with a fresh [`HeuristicSearch`], assembling the `(n, WC(n))` series.
//!
//! The series is then handed to the fitting and charting collaborators. Any
//! failed exploration aborts the pipeline; partial series are never emitted.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use log::{info, warn};

use crate::chart;
use crate::config::{AnalysisConfig, ConfigError};
use crate::fitting::{best_fit, fit_all, TrendFit};
use crate::generator::PolicyGenerator;
use crate::heuristic::{HeuristicSearch, MissFallback};
use crate::host::{Explorer, HostError};
use crate::io::PolicyIoError;
use crate::path::Path;
use crate::trie::PolicyTrie;

/// Name of the policy file under `<outputDir>/serialized/`.
pub const POLICY_FILE: &str = "policy.wcp";

/// Which stage of the pipeline an error surfaced in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    PolicyGeneration,
    HeuristicSweep,
    Reporting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::PolicyGeneration => write!(f, "policy generation"),
            Phase::HeuristicSweep => write!(f, "heuristic sweep"),
            Phase::Reporting => write!(f, "reporting"),
        }
    }
}

/// A fatal analysis failure. Only policy misses are recovered locally (inside
/// the heuristic search); everything else surfaces here and terminates the
/// pipeline.
#[derive(Debug)]
pub enum AnalysisError {
    Config(ConfigError),
    Host { phase: Phase, source: HostError },
    Io { phase: Phase, source: PolicyIoError },
}

impl AnalysisError {
    /// Process exit code for this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            AnalysisError::Config(_) => 1,
            AnalysisError::Host { .. } => 2,
            AnalysisError::Io { .. } => 3,
        }
    }
}

impl From<ConfigError> for AnalysisError {
    fn from(e: ConfigError) -> Self {
        AnalysisError::Config(e)
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Config(e) => write!(f, "configuration error: {}", e),
            AnalysisError::Host { phase, source } => {
                write!(f, "host exploration failed during {}: {}", phase, source)
            }
            AnalysisError::Io { phase, source } => {
                write!(f, "policy I/O failed during {}: {}", phase, source)
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

/// The output of a completed analysis.
#[derive(Debug)]
pub struct AnalysisReport {
    /// The measured `(n, WC(n))` series.
    pub series: Vec<(u32, u64)>,
    /// Every trend model that could be fitted.
    pub fits: Vec<TrendFit>,
    pub policy_path: PathBuf,
    pub chart_path: PathBuf,
    pub csv_path: PathBuf,
}

/// Orchestrates the two-phase analysis over an exploration host.
pub struct Analyzer<E> {
    config: AnalysisConfig,
    explorer: E,
}

impl<E: Explorer> Analyzer<E> {
    pub fn new(config: AnalysisConfig, explorer: E) -> Self {
        Analyzer { config, explorer }
    }

    pub fn run(&mut self) -> Result<AnalysisReport, AnalysisError> {
        let root = self.config.output_dir.clone();
        let serialized_dir = root.join("serialized");
        fs::create_dir_all(&serialized_dir).map_err(|e| AnalysisError::Io {
            phase: Phase::PolicyGeneration,
            source: e.into(),
        })?;
        let policy_path = serialized_dir.join(POLICY_FILE);

        let policy = self.obtain_policy(&policy_path)?;
        info!(
            "phase 1 done: {} terminals over {} nodes",
            policy.terminal_count(),
            policy.node_count()
        );

        if self.config.verbose {
            self.write_policy_dump(&root, &policy)?;
        }

        let series = self.sweep(&policy, &root)?;
        info!("phase 2 done: {} points", series.len());

        let points: Vec<(f64, f64)> = series.iter().map(|&(n, wc)| (n as f64, wc as f64)).collect();
        let fits = if points.is_empty() {
            warn!("empty series; skipping trend fitting");
            Vec::new()
        } else {
            fit_all(&points, self.config.poly_degree)
        };
        if let Some(best) = best_fit(&fits) {
            info!("best fit: {} (r2 = {:.4})", best.kind, best.r_squared);
        }

        let horizon = self
            .config
            .prediction_size
            .unwrap_or_else(|| (series.len() as f64 * 1.5).ceil() as usize);

        let svg = chart::render_svg(
            &points,
            &fits,
            horizon as f64,
            self.config.req_max_input,
            self.config.req_max_res,
        );
        let chart_path = root.join("worst_case.svg");
        let csv_path = root.join("worst_case.csv");
        write_report_file(&chart_path, &svg)?;
        write_report_file(&csv_path, &chart::render_csv(&points))?;
        info!("chart written to {}", chart_path.display());

        Ok(AnalysisReport {
            series,
            fits,
            policy_path,
            chart_path,
            csv_path,
        })
    }

    /// Phase 1, or a load of the previously persisted policy.
    fn obtain_policy(&mut self, policy_path: &std::path::Path) -> Result<PolicyTrie, AnalysisError> {
        if self.config.reuse_policy && policy_path.exists() {
            info!("reusing policy at {}", policy_path.display());
            return PolicyTrie::load(policy_path).map_err(|e| AnalysisError::Io {
                phase: Phase::PolicyGeneration,
                source: e,
            });
        }

        let mut generator = PolicyGenerator::new(self.config.max_history);
        let stats = self
            .explorer
            .explore(self.config.policy_input_size, &mut generator)
            .map_err(|e| AnalysisError::Host {
                phase: Phase::PolicyGeneration,
                source: e,
            })?;
        info!(
            "exhaustive exploration at size {}: {} paths",
            self.config.policy_input_size, stats.paths_completed
        );

        let policy = generator.finish();
        policy.save(policy_path).map_err(|e| AnalysisError::Io {
            phase: Phase::PolicyGeneration,
            source: e,
        })?;
        Ok(policy)
    }

    /// Phase 2: one guided exploration per input size.
    fn sweep(&mut self, policy: &PolicyTrie, root: &std::path::Path) -> Result<Vec<(u32, u64)>, AnalysisError> {
        let fallback = if self.config.no_solver {
            MissFallback::FirstChoice
        } else {
            MissFallback::ExploreAll
        };

        let mut series = Vec::with_capacity(self.config.max_input as usize + 1);
        for n in 0..=self.config.max_input {
            let mut search = HeuristicSearch::new(policy, fallback, self.config.max_history);
            self.explorer.explore(n, &mut search).map_err(|e| AnalysisError::Host {
                phase: Phase::HeuristicSweep,
                source: e,
            })?;

            let (hits, misses) = search.lookup_stats();
            let worst = search.into_worst();
            let cost = match &worst {
                Some(worst) => worst.cost,
                None => {
                    warn!("no path completed at input size {}", n);
                    0
                }
            };
            info!("input size {}: WC = {} ({} policy hits, {} misses)", n, cost, hits, misses);

            if self.config.verbose {
                if let Some(worst) = &worst {
                    let report = format!(
                        "input size: {}\nwc: {}\npath: {}\n",
                        n,
                        worst.cost,
                        Path::from_decisions(worst.decisions.clone())
                    );
                    let dir = root.join("verbose").join("heuristic");
                    fs::create_dir_all(&dir).map_err(to_reporting_error)?;
                    fs::write(dir.join(format!("wc_input_{}.txt", n)), report).map_err(to_reporting_error)?;
                }
            }

            series.push((n, cost));
        }
        Ok(series)
    }

    fn write_policy_dump(&self, root: &std::path::Path, policy: &PolicyTrie) -> Result<(), AnalysisError> {
        let dir = root.join("verbose").join("policy");
        fs::create_dir_all(&dir).map_err(to_reporting_error)?;
        let dump = format!("{}\n", policy);
        fs::write(dir.join("policy.txt"), dump).map_err(to_reporting_error)?;
        Ok(())
    }
}

fn to_reporting_error(e: std::io::Error) -> AnalysisError {
    AnalysisError::Io {
        phase: Phase::Reporting,
        source: e.into(),
    }
}

fn write_report_file(path: &std::path::Path, contents: &str) -> Result<(), AnalysisError> {
    fs::write(path, contents).map_err(to_reporting_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{BoundedExplorer, Op};

    fn config(dir: &std::path::Path, policy_size: u32, max_input: u32) -> AnalysisConfig {
        let mut config = AnalysisConfig::new(policy_size, max_input);
        config.output_dir = dir.to_path_buf();
        config.verbose = false;
        config
    }

    #[test]
    fn test_linear_program_series() {
        let dir = tempfile::tempdir().unwrap();
        let explorer = BoundedExplorer::new(|n| Op::seq((0..n).map(|_| Op::cost(1)).collect()));
        let mut analyzer = Analyzer::new(config(dir.path(), 5, 10), explorer);
        let report = analyzer.run().unwrap();

        let expected: Vec<(u32, u64)> = (0..=10).map(|n| (n, n as u64)).collect();
        assert_eq!(report.series, expected);
        assert!(report.policy_path.exists());
        assert!(report.chart_path.exists());
        assert!(report.csv_path.exists());
    }

    #[test]
    fn test_quadratic_branch_guided_to_heavy_arm() {
        // One branch: choice 0 costs n, choice 1 costs n^2.
        let build = |n: u32| {
            Op::branch(
                1,
                vec![
                    Op::seq((0..n).map(|_| Op::cost(1)).collect()),
                    Op::seq((0..n * n).map(|_| Op::cost(1)).collect()),
                ],
            )
        };
        let dir = tempfile::tempdir().unwrap();
        let mut analyzer = Analyzer::new(config(dir.path(), 3, 7), BoundedExplorer::new(build));
        let report = analyzer.run().unwrap();
        assert_eq!(report.series[7], (7, 49));
    }

    #[test]
    fn test_host_failure_aborts_sweep() {
        // Blows the path budget at larger sizes: every iteration branches.
        let build = |n: u32| Op::seq((0..n).map(|i| Op::branch(i as u64, vec![Op::cost(0), Op::cost(1)])).collect());
        let dir = tempfile::tempdir().unwrap();
        let explorer = BoundedExplorer::with_config(build, crate::exec::ExplorerConfig { max_paths: 40 });
        let mut config = config(dir.path(), 2, 30);
        // Exhaustive fallback makes size 30 need 2^30 paths.
        config.no_solver = false;
        let mut analyzer = Analyzer::new(config, explorer);
        match analyzer.run() {
            Err(AnalysisError::Host { phase, .. }) => assert_eq!(phase, Phase::HeuristicSweep),
            other => panic!("expected host failure, got {:?}", other.map(|r| r.series)),
        }
    }

    #[test]
    fn test_exit_codes() {
        let config_error = AnalysisError::Config(ConfigError::Missing("input.max"));
        assert_eq!(config_error.exit_code(), 1);
        let host_error = AnalysisError::Host {
            phase: Phase::HeuristicSweep,
            source: HostError::new("boom"),
        };
        assert_eq!(host_error.exit_code(), 2);
        let io_error = AnalysisError::Io {
            phase: Phase::Reporting,
            source: std::io::Error::other("disk").into(),
        };
        assert_eq!(io_error.exit_code(), 3);
    }
}
