// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! CLI entry point: loads a JSON IR fixture, runs the analysis, and
//! prints a JSON summary of statistics and recorded unknowns. Mirrors the
//! teacher's `util/options.rs`-driven argument parsing, minus the
//! rustc-passthrough wrapper `cargo-pta.rs` used to invoke it through
//! `cargo`.

use std::env;
use std::fs;
use std::process::ExitCode;

use log::error;

use kcfa_pta::config::Config;
use kcfa_pta::fixture::LoadedFixture;
use kcfa_pta::ir::World as _;
use kcfa_pta::PointerAnalysis;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let (config, input) = Config::parse_from_args(&args);

    let level = if config.verbose { "debug" } else { config.log_level_filter() };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let text = match fs::read_to_string(&input) {
        Ok(t) => t,
        Err(e) => {
            error!("failed to read input fixture {input:?}: {e}");
            return ExitCode::FAILURE;
        }
    };
    let fixture = match LoadedFixture::from_json(&text) {
        Ok(f) => f,
        Err(e) => {
            error!("failed to parse input fixture {input:?}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let analysis = match PointerAnalysis::new(&fixture, config) {
        Ok(a) => a,
        Err(e) => {
            error!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let entry = fixture.entry_module();
    let mut result = analysis.analyze(entry);
    let query = result.query();
    let report = serde_json::json!({
        "statistics": query.statistics(),
        "unknowns": query.unknown_summary(),
    });
    println!("{}", serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string()));
    ExitCode::SUCCESS
}
