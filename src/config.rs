//! Analysis configuration.
//!
//! Options come from a properties file (`key = value`, `#` comments). The
//! parsed [`AnalysisConfig`] is an explicit value handed to the driver; there
//! are no process-wide singletons.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use log::warn;

const KEY_TARGET: &str = "target";
const KEY_POLICY_INPUT_SIZE: &str = "policy.inputSize";
const KEY_MAX_INPUT: &str = "input.max";
const KEY_MAX_HISTORY: &str = "policy.maxHistory";
const KEY_PREDICTION_SIZE: &str = "predictionModel.size";
const KEY_POLY_DEGREE: &str = "poly.degree";
const KEY_VERBOSE: &str = "verbose";
const KEY_OUTPUT_DIR: &str = "outputDir";
const KEY_NO_SOLVER: &str = "heuristic.noSolver";
const KEY_REUSE_POLICY: &str = "reusePolicy";
const KEY_REQ_MAX_INPUT: &str = "req.maxInputSize";
const KEY_REQ_MAX_RES: &str = "req.maxRes";

const KNOWN_KEYS: &[&str] = &[
    KEY_TARGET,
    KEY_POLICY_INPUT_SIZE,
    KEY_MAX_INPUT,
    KEY_MAX_HISTORY,
    KEY_PREDICTION_SIZE,
    KEY_POLY_DEGREE,
    KEY_VERBOSE,
    KEY_OUTPUT_DIR,
    KEY_NO_SOLVER,
    KEY_REUSE_POLICY,
    KEY_REQ_MAX_INPUT,
    KEY_REQ_MAX_RES,
];

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    Io(io::Error),
    /// A line is not `key = value` or a comment.
    Syntax { line: usize },
    /// A required option is absent.
    Missing(&'static str),
    /// An option's value does not parse.
    Invalid { key: String, value: String },
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config: {}", e),
            ConfigError::Syntax { line } => write!(f, "config line {} is not `key = value`", line),
            ConfigError::Missing(key) => write!(f, "missing required option `{}`", key),
            ConfigError::Invalid { key, value } => {
                write!(f, "option `{}` has invalid value `{}`", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Everything the driver needs for one analysis.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Name of the program under test; consumed by the CLI's target registry.
    pub target: Option<String>,
    /// The single input size `N0` used for policy generation.
    pub policy_input_size: u32,
    /// Inclusive upper bound of the phase-2 sweep.
    pub max_input: u32,
    /// Bound on local-history length for policy keys and lookups.
    pub max_history: Option<usize>,
    /// Extrapolation horizon; defaults to `ceil(1.5 * series length)`.
    pub prediction_size: Option<usize>,
    /// Degree of the polynomial trend model.
    pub poly_degree: usize,
    /// Emit auxiliary reports and the policy dump.
    pub verbose: bool,
    /// Root of all emitted files.
    pub output_dir: PathBuf,
    /// Use the deterministic first-choice fallback on policy misses.
    pub no_solver: bool,
    /// Skip phase 1 when a policy file already exists.
    pub reuse_policy: bool,
    /// Input-size budget annotation for the chart.
    pub req_max_input: Option<f64>,
    /// Resource budget annotation for the chart.
    pub req_max_res: Option<f64>,
}

impl AnalysisConfig {
    /// A config with the two required sizes set and everything else at its
    /// default.
    pub fn new(policy_input_size: u32, max_input: u32) -> Self {
        AnalysisConfig {
            target: None,
            policy_input_size,
            max_input,
            max_history: None,
            prediction_size: None,
            poly_degree: 2,
            verbose: true,
            output_dir: PathBuf::from("."),
            no_solver: false,
            reuse_policy: false,
            req_max_input: None,
            req_max_res: None,
        }
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path)?;
        Self::from_str_source(&source)
    }

    /// Parses a properties-file source.
    pub fn from_str_source(source: &str) -> Result<Self, ConfigError> {
        let mut options: HashMap<&str, &str> = HashMap::new();
        for (number, raw) in source.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Syntax { line: number + 1 });
            };
            let key = key.trim();
            if !KNOWN_KEYS.contains(&key) {
                warn!("ignoring unknown option `{}`", key);
                continue;
            }
            options.insert(key, value.trim());
        }

        let mut config = AnalysisConfig::new(
            parse_required(&options, KEY_POLICY_INPUT_SIZE)?,
            parse_required(&options, KEY_MAX_INPUT)?,
        );
        config.target = options.get(KEY_TARGET).map(|s| s.to_string());
        config.max_history = parse_optional(&options, KEY_MAX_HISTORY)?;
        config.prediction_size = parse_optional(&options, KEY_PREDICTION_SIZE)?;
        if let Some(degree) = parse_optional(&options, KEY_POLY_DEGREE)? {
            config.poly_degree = degree;
        }
        if let Some(verbose) = parse_optional(&options, KEY_VERBOSE)? {
            config.verbose = verbose;
        }
        if let Some(dir) = options.get(KEY_OUTPUT_DIR) {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(no_solver) = parse_optional(&options, KEY_NO_SOLVER)? {
            config.no_solver = no_solver;
        }
        if let Some(reuse) = parse_optional(&options, KEY_REUSE_POLICY)? {
            config.reuse_policy = reuse;
        }
        config.req_max_input = parse_optional(&options, KEY_REQ_MAX_INPUT)?;
        config.req_max_res = parse_optional(&options, KEY_REQ_MAX_RES)?;
        Ok(config)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_required<T: std::str::FromStr>(
    options: &HashMap<&str, &str>,
    key: &'static str,
) -> Result<T, ConfigError> {
    match options.get(key) {
        Some(value) => parse_value(key, value),
        None => Err(ConfigError::Missing(key)),
    }
}

fn parse_optional<T: std::str::FromStr>(
    options: &HashMap<&str, &str>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    options.get(key).map(|value| parse_value(key, value)).transpose()
}
