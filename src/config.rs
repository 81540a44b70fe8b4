// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Analysis configuration (§6) and its CLI surface. Mirrors
//! `rustanlys-rupta/src/util/options.rs`'s clap-based option parsing,
//! minus the rustc-passthrough argument splitting that no longer applies.

use clap::{Arg, Command};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "DEBUG" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARNING" => LogLevel::Warning,
            "ERROR" => LogLevel::Error,
            _ => return None,
        })
    }

    /// The `env_logger` filter directive for this level.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub context_policy: String,
    pub max_iterations: i64,
    pub max_points_to_size: Option<i64>,
    pub verbose: bool,
    pub log_level: LogLevel,
    pub build_class_hierarchy: bool,
    pub use_mro_resolution: bool,
    pub max_import_depth: i64,
    pub track_unknowns: bool,
    pub log_unknown_details: bool,
    pub entry_points: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            context_policy: "0-cfa".to_string(),
            max_iterations: 1_000_000,
            max_points_to_size: None,
            verbose: false,
            log_level: LogLevel::Info,
            build_class_hierarchy: true,
            use_mro_resolution: true,
            max_import_depth: -1,
            track_unknowns: true,
            log_unknown_details: false,
            entry_points: None,
        }
    }
}

impl Config {
    /// Validates option values, failing fast with a descriptive error
    /// rather than letting an inconsistent config reach the solver (§7
    /// configuration-error taxonomy).
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if crate::context::parse_policy(&self.context_policy).is_none() {
            return Err(AnalysisError::InvalidContextPolicy(self.context_policy.clone()));
        }
        if self.max_iterations <= 0 {
            return Err(AnalysisError::NonPositiveMaxIterations(self.max_iterations));
        }
        if let Some(max) = self.max_points_to_size {
            if max <= 0 {
                return Err(AnalysisError::NonPositiveMaxPointsToSize(max));
            }
        }
        if self.max_import_depth < -1 {
            return Err(AnalysisError::InvalidMaxImportDepth(self.max_import_depth));
        }
        Ok(())
    }

    pub fn log_level_filter(&self) -> &'static str {
        self.log_level.as_filter_str()
    }

    fn make_parser() -> Command<'static> {
        Command::new("kcfa-pta")
            .no_binary_name(true)
            .arg(
                Arg::new("context-policy")
                    .long("context-policy")
                    .takes_value(true)
                    .default_value("0-cfa")
                    .help("Context-sensitivity policy (0-cfa, 1-cfa, 1-obj, 1-type, 1-rcv, 1c1o, ...)."),
            )
            .arg(
                Arg::new("max-iterations")
                    .long("max-iterations")
                    .takes_value(true)
                    .value_parser(clap::value_parser!(i64))
                    .default_value("1000000")
                    .help("Solver fixpoint iteration safety cap."),
            )
            .arg(
                Arg::new("max-points-to-size")
                    .long("max-points-to-size")
                    .takes_value(true)
                    .value_parser(clap::value_parser!(i64))
                    .help("Widen any points-to set exceeding this size to a single unknown object."),
            )
            .arg(Arg::new("verbose").long("verbose").takes_value(false).help("Verbose logging."))
            .arg(
                Arg::new("log-level")
                    .long("log-level")
                    .takes_value(true)
                    .value_parser(["DEBUG", "INFO", "WARNING", "ERROR"])
                    .default_value("INFO"),
            )
            .arg(
                Arg::new("no-class-hierarchy")
                    .long("no-class-hierarchy")
                    .takes_value(false)
                    .help("Disable class hierarchy construction."),
            )
            .arg(
                Arg::new("no-mro-resolution")
                    .long("no-mro-resolution")
                    .takes_value(false)
                    .help("Disable MRO-based attribute resolution."),
            )
            .arg(
                Arg::new("max-import-depth")
                    .long("max-import-depth")
                    .takes_value(true)
                    .value_parser(clap::value_parser!(i64))
                    .default_value("-1")
                    .help("Transitive import depth; 0 disables, -1 unlimited."),
            )
            .arg(Arg::new("no-track-unknowns").long("no-track-unknowns").takes_value(false))
            .arg(Arg::new("log-unknown-details").long("log-unknown-details").takes_value(false))
            .arg(
                Arg::new("entry-point")
                    .long("entry-point")
                    .takes_value(true)
                    .multiple_occurrences(true)
                    .help("Call-graph reachability root; may be repeated."),
            )
            .arg(Arg::new("INPUT").help("Entry module path.").required(true))
    }

    pub fn parse_from_args(args: &[String]) -> (Self, String) {
        let matches = Self::make_parser().get_matches_from(args.iter());
        let mut config = Config::default();
        if let Some(policy) = matches.get_one::<String>("context-policy") {
            config.context_policy = policy.clone();
        }
        if let Some(max) = matches.get_one::<i64>("max-iterations") {
            config.max_iterations = *max;
        }
        config.max_points_to_size = matches.get_one::<i64>("max-points-to-size").copied();
        config.verbose = matches.contains_id("verbose");
        if let Some(level) = matches.get_one::<String>("log-level").and_then(|s| LogLevel::parse(s)) {
            config.log_level = level;
        }
        config.build_class_hierarchy = !matches.contains_id("no-class-hierarchy");
        config.use_mro_resolution = !matches.contains_id("no-mro-resolution");
        if let Some(depth) = matches.get_one::<i64>("max-import-depth") {
            config.max_import_depth = *depth;
        }
        config.track_unknowns = !matches.contains_id("no-track-unknowns");
        config.log_unknown_details = matches.contains_id("log-unknown-details");
        config.entry_points = matches.get_many::<String>("entry-point").map(|v| v.cloned().collect());
        let input = matches.get_one::<String>("INPUT").cloned().unwrap_or_default();
        (config, input)
    }
}
