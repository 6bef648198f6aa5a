//! # wca-rs: Empirical Worst-Case Resource Analysis
//!
//! **`wca-rs`** discovers how a program's worst-case resource consumption grows
//! with its input size. Given a program whose behavior depends on a bounded
//! integer size *n*, it finds, for each *n* in a range, an execution path that
//! maximizes a resource measure, fits analytic trend models to the resulting
//! `(n, WC(n))` series, and renders the projected growth.
//!
//! ## How it works
//!
//! The analysis runs in two phases against an exploration host:
//!
//! 1. **Policy generation.** An exhaustive exploration at a single small input
//!    size records, for each branching decision on the heaviest path, which
//!    concrete choice was taken. The result is compiled into a compact
//!    [`PolicyTrie`][crate::trie::PolicyTrie] indexed by local decision
//!    histories and persisted to disk.
//! 2. **Policy-guided search.** For each input size, a second exploration
//!    consults the policy at every branch (a longest-matching-suffix lookup
//!    over the in-frame decision history) and prunes exploration to the
//!    recommended choices, yielding a single heavy path per size.
//!
//! The trie matches *suffixes* of histories even though keys are inserted as
//! *prefixes*: the policy is most predictive near the branch being decided,
//! and a trace's local suffix is stable across input sizes while its global
//! prefix is not.
//!
//! ## Quick Start
//!
//! ```rust
//! use wca_rs::config::AnalysisConfig;
//! use wca_rs::driver::Analyzer;
//! use wca_rs::exec::{BoundedExplorer, Op};
//!
//! // A program with one branch: the right arm costs n^2, the left costs n.
//! let explorer = BoundedExplorer::new(|n| {
//!     Op::branch(1, vec![Op::cost(n as u64), Op::cost(n as u64 * n as u64)])
//! });
//!
//! let mut config = AnalysisConfig::new(3, 10);
//! config.output_dir = std::env::temp_dir().join("wca-quickstart");
//! config.verbose = false;
//!
//! let mut analyzer = Analyzer::new(config, explorer);
//! let report = analyzer.run().unwrap();
//!
//! // The policy learned at size 3 steers every later size to the heavy arm.
//! assert_eq!(report.series[7], (7, 49));
//! ```
//!
//! ## Core Components
//!
//! - **[`trie`]**: the branch policy: an arena-allocated trie from decision
//!   histories to recommended choice sets, with longest-suffix lookup.
//! - **[`generator`]** / **[`heuristic`]**: the phase-1 and phase-2 observers.
//! - **[`host`]**: the narrow contract an exploration host implements.
//! - **[`exec`]**: a bounded concrete explorer usable as a host.
//! - **[`driver`]**: orchestration, series assembly, and reporting.
//! - **[`fitting`]** / **[`chart`]**: trend models and the rendered chart.

pub mod chart;
pub mod config;
pub mod decision;
pub mod driver;
pub mod exec;
pub mod fitting;
pub mod generator;
pub mod heuristic;
pub mod host;
pub mod io;
pub mod path;
pub mod trie;
pub mod types;
