// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! A whole-program, context-sensitive k-CFA points-to analysis engine for
//! a dynamically-typed, object-oriented source language: first-class
//! functions, multiple inheritance, closures, and modules/imports. Flow-
//! insensitive and field-sensitive; context-sensitivity is selected via
//! [`config::Config::context_policy`] from 16 supported policies (§2).
//!
//! A host front end supplies its own lowered IR by implementing
//! [`ir::World`] and hands it to [`PointerAnalysis::new`]; the engine
//! consumes that interface only and has no parser, AST, or disk-file
//! dependency of its own (§6).

pub mod builtins;
pub mod call_graph;
pub mod class_hierarchy;
pub mod config;
pub mod constraints;
pub mod context;
pub mod error;
pub mod fixture;
pub mod heap;
pub mod ids;
pub mod ir;
pub mod object;
pub mod pfg;
pub mod points_to_set;
pub mod pts_set;
pub mod query;
pub mod scope;
pub mod solver;
pub mod translator;
pub mod unknown_tracker;
pub mod util;
pub mod variable;

use config::Config;
use error::AnalysisError;
use ids::IrScopeId;
use ir::World;
use query::AnalysisResult;
use solver::Solver;

/// Entry point: validates `config`, then drives the worklist solver to a
/// fixpoint over whatever `world` exposes.
pub struct PointerAnalysis<'w> {
    world: &'w dyn World,
    config: Config,
}

impl<'w> PointerAnalysis<'w> {
    pub fn new(world: &'w dyn World, config: Config) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(PointerAnalysis { world, config })
    }

    /// Runs the analysis with `entry_module` as the program's top-level
    /// scope, returning a read-only view over the final fixpoint.
    pub fn analyze(self, entry_module: IrScopeId) -> AnalysisResult<'w> {
        let mut solver = Solver::new(self.world, self.config);
        let entry_scope = solver.analyze(entry_module);
        AnalysisResult::new(solver, entry_scope)
    }
}
