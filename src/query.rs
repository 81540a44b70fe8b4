// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Read-only query surface (C14) over a finished analysis: `points_to`,
//! `field`, `may_alias`, `call_graph`, and the statistics/unknowns
//! summaries a consumer renders as a report (§6, `SPEC_FULL.md`'s
//! Configuration/CLI ambient section). Mirrors the teacher's
//! `results_dumper`/`pta_statistics` split between raw query and
//! serializable summary.

use std::collections::HashMap;

use serde::Serialize;

use crate::call_graph::CallGraph;
use crate::heap::Field;
use crate::ids::{ObjectId, ScopeId};
use crate::points_to_set::Pts;
use crate::solver::Solver;
use crate::variable::{CVar, Variable};

/// A finished analysis: owns the solver's final state and answers queries
/// against it without mutating anything further.
pub struct AnalysisResult<'w> {
    solver: Solver<'w>,
    entry_scope: ScopeId,
}

impl<'w> AnalysisResult<'w> {
    pub fn new(solver: Solver<'w>, entry_scope: ScopeId) -> Self {
        AnalysisResult { solver, entry_scope }
    }

    pub fn query(&mut self) -> Query<'_, 'w> {
        Query { result: self }
    }
}

/// Borrows the result for the duration of a query session. Taking `&mut`
/// lets `points_to`/`field` reuse `PointerTable::var`/`field`'s interning
/// without requiring every pointer to already exist.
pub struct Query<'q, 'w> {
    result: &'q mut AnalysisResult<'w>,
}

impl Query<'_, '_> {
    pub fn points_to(&mut self, var: CVar) -> Pts {
        let ptr = self.result.solver.pointers_mut().var(var);
        self.result.solver.env().pts_of(ptr)
    }

    pub fn field(&mut self, obj: ObjectId, field: Field) -> Pts {
        let ptr = self.result.solver.pointers_mut().field(obj, field);
        self.result.solver.env().pts_of(ptr)
    }

    /// Two variables may-alias iff their points-to sets share at least one
    /// object.
    pub fn may_alias(&mut self, a: CVar, b: CVar) -> bool {
        let pa = self.points_to(a);
        let pb = self.points_to(b);
        pa.iter().any(|o| pb.contains(o))
    }

    pub fn call_graph(&self) -> &CallGraph {
        self.result.solver.call_graph()
    }

    pub fn statistics(&self) -> Statistics {
        let cg = self.result.solver.call_graph();
        Statistics {
            reachable_scopes: cg.node_count(),
            call_edges: cg.edge_count(),
            objects: self.result.solver.objects().len(),
            constraints: self.result.solver.constraints_len(),
            iterations: self.result.solver.iterations(),
        }
    }

    pub fn unknown_summary(&self) -> HashMap<String, usize> {
        self.result.solver.unknowns().get_summary()
    }

    pub fn unknown_details(&self) -> &[crate::unknown_tracker::UnknownRecord] {
        self.result.solver.unknowns().get_detailed_report()
    }

    /// The analysis-time scope the entry module's body ran under, for
    /// addressing its top-level variables via [`Self::cvar`].
    pub fn entry_scope(&self) -> ScopeId {
        self.result.entry_scope
    }

    /// Interns `name` as a local variable of `scope` and returns the
    /// resulting [`CVar`], letting a caller address a variable by name
    /// instead of reconstructing `VarId` interning by hand.
    pub fn cvar(&mut self, scope: ScopeId, name: &str) -> CVar {
        let id = self.result.solver.vars().intern(Variable::local(name));
        CVar::new(scope, id)
    }

    /// All interned class objects registered under `name`.
    pub fn class_named(&mut self, name: &str) -> Vec<ObjectId> {
        self.result.solver.class_hierarchy().lookup_class_by_name(name).collect()
    }

    /// The C3-linearized method resolution order of `class_obj`.
    pub fn mro_of(&mut self, class_obj: ObjectId) -> Vec<ObjectId> {
        self.result.solver.mro_of(class_obj)
    }
}

/// Aggregate counters a CLI renders as a one-line report or dumps as JSON
/// (`SPEC_FULL.md`'s Configuration/CLI ambient section).
#[derive(Clone, Debug, Serialize)]
pub struct Statistics {
    pub reachable_scopes: usize,
    pub call_edges: usize,
    pub objects: usize,
    pub constraints: usize,
    pub iterations: u64,
}
