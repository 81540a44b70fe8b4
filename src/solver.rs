// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The worklist-driven fixpoint solver (C13). See
//! `original_source/pythonstan/analysis/pointer/kcfa/solver.py` and
//! spec.md §4.8.
//!
//! Function and method bodies are translated lazily, only when a `Call`
//! constraint actually dispatches to them — not a second time eagerly at
//! `Alloc`. The reference solver does both, but its eager pass selects a
//! context from a placeholder call site with no receiver, and since
//! [`Translator::translate`] memoizes by `ScopeId` and the eager scope's id
//! never matches any real call's callee scope, that pass never gets reused;
//! it is dead work. Translating once, lazily, is equivalent and simpler.

use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, warn};

use crate::builtins::{self, SummaryContext};
use crate::call_graph::CallGraph;
use crate::class_hierarchy::ClassHierarchyManager;
use crate::config::Config;
use crate::constraints::{Constraint, ConstraintManager};
use crate::context::selector::{CallHints, ContextSelector};
use crate::context::{AbstractContext, ContextArena, ObjOrProxy};
use crate::heap::Field;
use crate::ids::{CallSiteId, IrScopeId, ObjectId, PointerId, ScopeId};
use crate::ir::{IrScopeManager, IrStmt, ModuleGraph, ScopeKind, World};
use crate::object::{AbstractObject, AllocKind, AllocSite, ObjectFactory};
use crate::pfg::{PointerFlowEdge, PointerFlowGraph, PointerFlowKind};
use crate::points_to_set::Pts;
use crate::pts_set::pt_data::DiffPTData;
use crate::pts_set::points_to::{HybridPointsToSet, PointsToSet as _};
use crate::scope::{Scope, ScopeTable};
use crate::translator::Translator;
use crate::unknown_tracker::{UnknownKind, UnknownTracker};
use crate::variable::{CVar, Location, Variable, VariableTable};

/// Interns [`Location`]s behind [`PointerId`], the node identity the
/// pointer flow graph and the environment key on.
#[derive(Default)]
pub struct PointerTable {
    interner: crate::ids::Interner<Location, PointerId>,
}

impl PointerTable {
    pub fn new() -> Self {
        PointerTable { interner: crate::ids::Interner::new() }
    }

    pub fn get(&self, id: PointerId) -> &Location {
        self.interner.get(id)
    }

    pub fn var(&mut self, cvar: CVar) -> PointerId {
        self.interner.intern(Location::Var(cvar))
    }

    pub fn field(&mut self, obj: ObjectId, field: Field) -> PointerId {
        self.interner.intern(Location::Field(obj, field))
    }
}

/// Current points-to state, partitioned the same way [`Pts`] is so each
/// partition's diff propagates independently. Three [`DiffPTData`]
/// instances rather than one keyed on an enum avoids re-partitioning on
/// every read.
#[derive(Default)]
pub struct Env {
    plain: DiffPTData<PointerId, ObjectId, HybridPointsToSet<ObjectId>>,
    class_methods: DiffPTData<PointerId, ObjectId, HybridPointsToSet<ObjectId>>,
    instance_methods: DiffPTData<PointerId, ObjectId, HybridPointsToSet<ObjectId>>,
}

impl Env {
    pub fn new() -> Self {
        Env { plain: DiffPTData::new(), class_methods: DiffPTData::new(), instance_methods: DiffPTData::new() }
    }

    pub fn pts_of(&self, ptr: PointerId) -> Pts {
        let mut out = Pts::empty();
        if let Some(ds) = self.plain.get_propa_pts(ptr) {
            out.plain_objects.union(ds);
        }
        if let Some(ds) = self.class_methods.get_propa_pts(ptr) {
            out.class_methods.union(ds);
        }
        if let Some(ds) = self.instance_methods.get_propa_pts(ptr) {
            out.instance_methods.union(ds);
        }
        out
    }

    /// Adds `delta` to `ptr`'s points-to set and flushes immediately, so
    /// growth within the same solver step is visible to `pts_of`. Returns
    /// the subset of `delta` that was genuinely new.
    pub fn merge(&mut self, ptr: PointerId, delta: &Pts) -> Pts {
        let mut added = Pts::empty();
        for obj in delta.plain_objects.iter() {
            if self.plain.add_pts(ptr, obj) {
                added.plain_objects.insert(obj);
            }
        }
        for obj in delta.class_methods.iter() {
            if self.class_methods.add_pts(ptr, obj) {
                added.class_methods.insert(obj);
            }
        }
        for obj in delta.instance_methods.iter() {
            if self.instance_methods.add_pts(ptr, obj) {
                added.instance_methods.insert(obj);
            }
        }
        self.plain.flush(ptr);
        self.class_methods.flush(ptr);
        self.instance_methods.flush(ptr);
        added
    }
}

/// Free variables a function/method object captured from its defining
/// scope at allocation time, rebound into the callee scope on every call
/// (covers cell, global, and nonlocal capture uniformly, since the IR
/// scope manager reports them as one `free_vars` list rather than three).
#[derive(Default, Clone)]
struct Closure {
    captured: HashMap<String, CVar>,
}

struct BuiltinCtx<'a> {
    vars: &'a mut VariableTable,
    scope: ScopeId,
    ir_scope: IrScopeId,
    call_site_seq: &'a mut u32,
}

impl SummaryContext for BuiltinCtx<'_> {
    fn fresh_alloc(&mut self, kind: AllocKind) -> AllocSite {
        let stmt_index = *self.call_site_seq;
        *self.call_site_seq += 1;
        AllocSite::Stmt { scope: self.ir_scope, stmt_index, kind }
    }

    fn fresh_temp(&mut self) -> CVar {
        let id = self.vars.intern(Variable::Temp(*self.call_site_seq));
        *self.call_site_seq += 1;
        CVar::new(self.scope, id)
    }

    fn fresh_super_alloc(&mut self, self_var: CVar, declaring_class: CVar) -> AllocSite {
        let stmt_index = *self.call_site_seq;
        *self.call_site_seq += 1;
        AllocSite::Super { scope: self.ir_scope, stmt_index, self_var, declaring_class }
    }
}

fn next_call_site(seq: &mut u32) -> CallSiteId {
    let id = CallSiteId::new(*seq as usize);
    *seq += 1;
    id
}

/// Every local variable a scope's body assigns to, in first-assignment
/// order: `StoreAttr`/`StoreSubscr`/`Return` write through an existing
/// variable rather than introduce one, so they contribute nothing here.
fn local_targets(stmts: &[IrStmt]) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    for stmt in stmts {
        let target = match stmt {
            IrStmt::Copy { target, .. }
            | IrStmt::LoadAttr { target, .. }
            | IrStmt::LoadSubscr { target, .. }
            | IrStmt::BuildContainer { target, .. }
            | IrStmt::Constant { target, .. }
            | IrStmt::DefFunction { target, .. }
            | IrStmt::DefClass { target, .. }
            | IrStmt::Import { target, .. }
            | IrStmt::SuperAccess { target, .. } => Some(target.clone()),
            IrStmt::Call { target, .. } => target.clone(),
            IrStmt::StoreAttr { .. } | IrStmt::StoreSubscr { .. } | IrStmt::Return { .. } => None,
        };
        if let Some(name) = target {
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }
    names
}

/// The worklist-driven fixpoint solver: owns every interning table and
/// runs §4.8's two-queue loop to completion.
pub struct Solver<'w> {
    scope_mgr: &'w dyn IrScopeManager,
    module_graph: &'w dyn ModuleGraph,

    scopes: ScopeTable,
    vars: VariableTable,
    contexts: ContextArena,
    objects: ObjectFactory,
    pointers: PointerTable,
    constraints: ConstraintManager,
    pfg: PointerFlowGraph,
    env: Env,
    call_graph: CallGraph,
    class_hierarchy: ClassHierarchyManager,
    selector: ContextSelector,
    translator: Translator,
    unknowns: UnknownTracker,
    config: Config,

    static_queue: VecDeque<Constraint>,
    worklist_queue: VecDeque<PointerId>,
    worklist_delta: HashMap<PointerId, Pts>,

    processed_allocs: HashMap<(ScopeId, AllocSite), ObjectId>,
    is_class_method: HashMap<ObjectId, bool>,
    closures: HashMap<ObjectId, Closure>,
    class_internal_scope: HashMap<ObjectId, ScopeId>,
    widened: HashSet<PointerId>,
    widened_obj: Option<ObjectId>,
    import_depth: HashMap<ScopeId, u32>,

    call_site_seq: u32,
    iterations: u64,
}

impl<'w> Solver<'w> {
    pub fn new(world: &'w dyn World, config: Config) -> Self {
        let policy = crate::context::parse_policy(&config.context_policy).unwrap_or(crate::context::ContextPolicy::Insensitive);
        Solver {
            scope_mgr: world.scope_manager(),
            module_graph: world.module_graph(),
            scopes: ScopeTable::new(),
            vars: VariableTable::new(),
            contexts: ContextArena::new(),
            objects: ObjectFactory::new(),
            pointers: PointerTable::new(),
            constraints: ConstraintManager::new(),
            pfg: PointerFlowGraph::new(),
            env: Env::new(),
            call_graph: CallGraph::new(),
            class_hierarchy: ClassHierarchyManager::new(),
            selector: ContextSelector::new(policy),
            translator: Translator::new(),
            unknowns: UnknownTracker::new(config.track_unknowns, config.log_unknown_details),
            static_queue: VecDeque::new(),
            worklist_queue: VecDeque::new(),
            worklist_delta: HashMap::new(),
            processed_allocs: HashMap::new(),
            is_class_method: HashMap::new(),
            closures: HashMap::new(),
            class_internal_scope: HashMap::new(),
            widened: HashSet::new(),
            widened_obj: None,
            import_depth: HashMap::new(),
            call_site_seq: 0,
            iterations: 0,
            config,
        }
    }

    pub fn unknowns(&self) -> &UnknownTracker {
        &self.unknowns
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    pub fn class_hierarchy(&mut self) -> &mut ClassHierarchyManager {
        &mut self.class_hierarchy
    }

    /// The C3-linearized method resolution order of `class_obj`, recording
    /// a diagnostic against this solver's tracker if linearization fails.
    pub fn mro_of(&mut self, class_obj: ObjectId) -> Vec<ObjectId> {
        self.class_hierarchy.get_mro(class_obj, &mut self.unknowns)
    }

    pub fn objects(&self) -> &ObjectFactory {
        &self.objects
    }

    pub fn scopes(&self) -> &ScopeTable {
        &self.scopes
    }

    pub fn vars(&mut self) -> &mut VariableTable {
        &mut self.vars
    }

    pub fn pointers(&self) -> &PointerTable {
        &self.pointers
    }

    pub fn pointers_mut(&mut self) -> &mut PointerTable {
        &mut self.pointers
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn constraints_len(&self) -> usize {
        self.constraints.len()
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Runs the whole analysis: translates `entry_module`, then drives the
    /// fixpoint loop. Returns the analysis-time scope the module body ran
    /// under, so a caller (the query layer, or a test) can address its
    /// top-level variables.
    pub fn analyze(&mut self, entry_module: IrScopeId) -> ScopeId {
        let entry = entry_module;
        let empty_ctx = self.selector.empty_context().clone();
        let empty_ctx_id = self.contexts.intern(empty_ctx);
        let entry_scope = self.scopes.intern(Scope::module(entry, empty_ctx_id));
        self.call_graph.add_node(entry_scope);
        let body = self.translator.translate(entry_scope, entry, self.scope_mgr, &mut self.vars, &mut self.unknowns, &mut self.call_site_seq);
        for c in body {
            self.register_constraint(c);
        }
        self.run();
        entry_scope
    }

    fn register_constraint(&mut self, c: Constraint) {
        if c.is_static() {
            self.static_queue.push_back(c);
        } else {
            self.register_dynamic(c);
        }
    }

    /// Registers a dynamic constraint, bootstrapping it against whatever
    /// its trigger variables already point to (`constraints.py`'s
    /// `add_constraint` has no equivalent bootstrap step since its solver
    /// always registers constraints before the variables they depend on
    /// have any points-to facts; ours may register one mid-fixpoint, e.g.
    /// a body translated lazily at `Call` time whose free variables
    /// already point somewhere).
    fn register_dynamic(&mut self, constraint: Constraint) {
        if !self.constraints.add(constraint.clone()) {
            return;
        }
        for v in constraint.trigger_vars() {
            let ptr = self.pointers.var(v);
            let pts = self.env.pts_of(ptr);
            if !pts.is_empty() {
                self.apply_constraint(v, &constraint, &pts);
            }
        }
    }

    fn enqueue_growth(&mut self, ptr: PointerId, delta: Pts) {
        if delta.is_empty() {
            return;
        }
        match self.worklist_delta.entry(ptr) {
            std::collections::hash_map::Entry::Occupied(mut e) => {
                e.get_mut().union_in_place(&delta);
            }
            std::collections::hash_map::Entry::Vacant(v) => {
                v.insert(delta);
                self.worklist_queue.push_back(ptr);
            }
        }
    }

    fn pop_worklist(&mut self) -> Option<(PointerId, Pts)> {
        let ptr = self.worklist_queue.pop_front()?;
        let delta = self.worklist_delta.remove(&ptr)?;
        Some((ptr, delta))
    }

    /// Adds a PFG edge and, if it is new, seeds the edge with whatever the
    /// source already points to (an edge can be added after its source has
    /// already accumulated facts — lazy translation means a callee's
    /// parameter-binding edges are often added well after the caller's
    /// argument variable first grew).
    fn connect(&mut self, source: PointerId, target: PointerId, kind: PointerFlowKind) {
        let edge = PointerFlowEdge { source, target, kind };
        if self.pfg.add_edge(edge) {
            let existing = self.env.pts_of(source);
            if !existing.is_empty() {
                let payload = edge.flow_through(&existing, &mut self.objects);
                self.enqueue_growth(target, payload);
            }
        }
    }

    /// The single canonical object standing in for an over-large points-to
    /// set (§9's widening design note). Reusing one object rather than
    /// minting one per widened pointer keeps the widened-object count
    /// bounded regardless of how many pointers overflow the cap.
    fn widened_unknown_object(&mut self) -> ObjectId {
        if let Some(obj) = self.widened_obj {
            return obj;
        }
        let alloc_site = self.objects.get_or_create_builtin_site("<widened>", AllocKind::Unknown);
        let empty_ctx = self.selector.empty_context().clone();
        let context = self.contexts.intern(empty_ctx);
        let obj = self.objects.intern(AbstractObject::Plain { context, alloc_site });
        self.widened_obj = Some(obj);
        obj
    }

    /// Caps a pointer's points-to set size (§9 widening): once it exceeds
    /// `max_points_to_size`, a single canonical unknown object is added so
    /// downstream consumers see an explicit imprecision marker. The set is
    /// never shrunk — only widened — so monotonicity (§8 property 1) still
    /// holds; this pointer is marked so the (now permanently oversized) set
    /// isn't re-widened on every subsequent growth.
    fn maybe_widen(&mut self, ptr: PointerId) {
        let Some(max) = self.config.max_points_to_size else { return };
        if max <= 0 || self.widened.contains(&ptr) {
            return;
        }
        if self.env.pts_of(ptr).len() as i64 <= max {
            return;
        }
        self.widened.insert(ptr);
        let unk = self.widened_unknown_object();
        let pts = Pts::singleton(unk, &self.objects, false);
        self.enqueue_growth(ptr, pts);
        self.unknowns.record(UnknownKind::PointsToSetWidened, format!("{:?}", self.pointers.get(ptr)), format!("points-to set exceeded max_points_to_size ({max})"), None);
    }

    fn edge_kind_for(&self, obj: ObjectId) -> PointerFlowKind {
        match self.objects.get(obj) {
            AbstractObject::Class { .. } => PointerFlowKind::Inherit { target_class: obj },
            AbstractObject::Instance { .. } => PointerFlowKind::Instance { source_instance: obj },
            _ => PointerFlowKind::Normal,
        }
    }

    /// Iteration cadence for `run`'s progress log (teacher's
    /// `context_sensitive.rs` logs every 10000 iterations rather than every
    /// one, to keep a long-running solve from flooding the log).
    const LOG_CADENCE: u64 = 10_000;

    fn run(&mut self) {
        let cap = self.config.max_iterations.max(1) as u64;
        loop {
            if self.iterations >= cap {
                warn!("solver reached the {cap}-iteration safety cap without reaching a fixpoint");
                break;
            }
            if self.iterations > 0 && self.iterations % Self::LOG_CADENCE == 0 {
                debug!(
                    "solver progress: {} iterations, {} worklist entries, {} objects, {} call edges",
                    self.iterations,
                    self.worklist_queue.len(),
                    self.objects.len(),
                    self.call_graph.edge_count(),
                );
            }
            if let Some(constraint) = self.static_queue.pop_front() {
                self.iterations += 1;
                self.apply_static(constraint);
                continue;
            }
            let Some((ptr, delta)) = self.pop_worklist() else { break };
            self.iterations += 1;
            let diff = self.env.merge(ptr, &delta);
            if diff.is_empty() {
                continue;
            }
            self.maybe_widen(ptr);
            if let Location::Var(cvar) = self.pointers.get(ptr).clone() {
                let triggered: Vec<Constraint> = self.constraints.get_by_variable(cvar).cloned().collect();
                for c in triggered {
                    self.apply_constraint(cvar, &c, &diff);
                }
            }
            for (target, payload) in self.pfg.propagate(ptr, &diff, &mut self.objects) {
                self.enqueue_growth(target, payload);
            }
        }
    }

    fn apply_static(&mut self, constraint: Constraint) {
        match constraint {
            Constraint::Copy { source, target } => {
                let s = self.pointers.var(source);
                let t = self.pointers.var(target);
                self.connect(s, t, PointerFlowKind::Normal);
            }
            Constraint::Alloc { target, alloc_site } => self.apply_alloc(target, alloc_site),
            _ => unreachable!("only Copy/Alloc are ever queued as static"),
        }
    }

    // ---- Alloc ----------------------------------------------------------

    fn apply_alloc(&mut self, target: CVar, alloc_site: AllocSite) {
        let key = (target.scope, alloc_site.clone());
        if let Some(&obj) = self.processed_allocs.get(&key) {
            let is_cm = *self.is_class_method.get(&obj).unwrap_or(&false);
            let pts = Pts::singleton(obj, &self.objects, is_cm);
            let tptr = self.pointers.var(target);
            self.enqueue_growth(tptr, pts);
            return;
        }

        let scope = self.scopes.get(target.scope).clone();
        let result = match alloc_site.kind() {
            AllocKind::Function => Some(self.alloc_closure(target.scope, &scope, &alloc_site, false)),
            AllocKind::Method => Some(self.alloc_closure(target.scope, &scope, &alloc_site, true)),
            AllocKind::Class => Some(self.alloc_class(target.scope, &scope, &alloc_site)),
            AllocKind::Module => self.alloc_module(target.scope, &scope, &alloc_site),
            AllocKind::Constant => {
                let repr = match &alloc_site {
                    AllocSite::Constant { repr, .. } => repr.clone(),
                    other => other.to_string(),
                };
                let obj = self.objects.intern(AbstractObject::Constant { context: scope.context, alloc_site: alloc_site.clone(), repr });
                Some((obj, false))
            }
            AllocKind::List | AllocKind::Tuple | AllocKind::Dict | AllocKind::Set => {
                let obj = self.objects.intern(AbstractObject::Plain { context: scope.context, alloc_site: alloc_site.clone() });
                Some((obj, false))
            }
            AllocKind::Super => {
                let (self_var, declaring_class) = match &alloc_site {
                    AllocSite::Super { self_var, declaring_class, .. } => (*self_var, *declaring_class),
                    other => unreachable!("AllocKind::Super site must be AllocSite::Super, got {other:?}"),
                };
                let obj = self.objects.intern(AbstractObject::SuperProxy { context: scope.context, alloc_site: alloc_site.clone(), self_var, declaring_class });
                Some((obj, false))
            }
            AllocKind::Object | AllocKind::Unknown => {
                let obj = self.objects.intern(AbstractObject::Plain { context: scope.context, alloc_site: alloc_site.clone() });
                Some((obj, false))
            }
            AllocKind::Cell | AllocKind::BoundMethod | AllocKind::Builtin => None,
        };

        if let Some((obj, is_cm)) = result {
            self.processed_allocs.insert(key, obj);
            self.is_class_method.insert(obj, is_cm);
            let pts = Pts::singleton(obj, &self.objects, is_cm);
            let tptr = self.pointers.var(target);
            self.enqueue_growth(tptr, pts);
        }
    }

    /// Shared function/method allocation: builds the object and captures
    /// its free variables. Body translation is deferred to the first call
    /// (see the module doc comment).
    fn alloc_closure(&mut self, def_scope: ScopeId, def_scope_val: &Scope, alloc_site: &AllocSite, is_method: bool) -> (ObjectId, bool) {
        let ir_scope = match alloc_site {
            AllocSite::Stmt { scope, .. } => *scope,
            _ => unreachable!("function/method alloc sites are always Stmt"),
        };
        let context = def_scope_val.context;
        let obj = if is_method {
            self.objects.intern(AbstractObject::Method {
                context,
                alloc_site: alloc_site.clone(),
                container_scope: def_scope_val.ir_scope,
                ir: ir_scope,
                class_obj: None,
                instance_obj: None,
            })
        } else {
            self.objects.intern(AbstractObject::Function { context, alloc_site: alloc_site.clone(), container_scope: def_scope_val.ir_scope, ir: ir_scope })
        };

        let free_vars = self.scope_mgr.free_vars(ir_scope).to_vec();
        let mut closure = Closure::default();
        for name in free_vars {
            let var_id = self.vars.intern(Variable::local(&name));
            closure.captured.insert(name, CVar::new(def_scope, var_id));
        }
        self.closures.insert(obj, closure);

        let is_cm = matches!(self.scope_mgr.kind(ir_scope), ScopeKind::ClassMethod);
        (obj, is_cm)
    }

    fn alloc_class(&mut self, def_scope: ScopeId, def_scope_val: &Scope, alloc_site: &AllocSite) -> (ObjectId, bool) {
        let ir_scope = match alloc_site {
            AllocSite::Stmt { scope, .. } => *scope,
            _ => unreachable!("class alloc sites are always Stmt"),
        };
        let obj = self.objects.intern(AbstractObject::Class { context: def_scope_val.context, alloc_site: alloc_site.clone() });
        let module = def_scope_val.module.unwrap_or(def_scope);
        let ctx_scope = self.scopes.intern(Scope::nested(ir_scope, obj, def_scope_val.context, def_scope, module));
        self.class_internal_scope.insert(obj, ctx_scope);
        if self.config.build_class_hierarchy {
            self.class_hierarchy.add_class(obj, Some(self.scope_mgr.qualified_name(ir_scope)), &[]);
        }

        let stmts = self.scope_mgr.statements(ir_scope).to_vec();
        let locals = local_targets(&stmts);
        let body = self.translator.translate(ctx_scope, ir_scope, self.scope_mgr, &mut self.vars, &mut self.unknowns, &mut self.call_site_seq);
        for c in body {
            self.register_constraint(c);
        }
        for name in locals {
            let var_id = self.vars.intern(Variable::local(&name));
            let cvar = CVar::new(ctx_scope, var_id);
            let src = self.pointers.var(cvar);
            let field_node = self.pointers.field(obj, Field::attr(name));
            self.connect(src, field_node, PointerFlowKind::Normal);
        }
        (obj, false)
    }

    fn alloc_module(&mut self, importer_scope: ScopeId, importer: &Scope, alloc_site: &AllocSite) -> Option<(ObjectId, bool)> {
        let (current_ir, module_path, level) = match alloc_site {
            AllocSite::Import { scope, module_path, level, .. } => (*scope, module_path.as_str(), *level),
            AllocSite::Stmt { scope, .. } => (*scope, "", 0),
            _ => return None,
        };
        let Some(resolved) = self.module_graph.resolve_import(current_ir, module_path, level) else {
            self.unknowns.record(UnknownKind::ImportNotFound, format!("{alloc_site}"), format!("could not resolve module {module_path:?} (level {level})"), None);
            return None;
        };
        let depth = self.import_depth.get(&importer_scope).copied().unwrap_or(0);
        if self.config.max_import_depth >= 0 && depth as i64 >= self.config.max_import_depth {
            self.unknowns.record(
                UnknownKind::ImportNotFound,
                format!("{alloc_site}"),
                format!("transitive import depth limit {} reached resolving {module_path:?} (level {level})", self.config.max_import_depth),
                None,
            );
            return None;
        }
        let obj = self.objects.intern(AbstractObject::Module { context: importer.context, alloc_site: alloc_site.clone() });
        let module_scope = self.scopes.intern(Scope::module(resolved, importer.context));
        self.import_depth.insert(module_scope, depth + 1);
        let body = self.translator.translate(module_scope, resolved, self.scope_mgr, &mut self.vars, &mut self.unknowns, &mut self.call_site_seq);
        for c in body {
            self.register_constraint(c);
        }
        self.call_graph.add_edge(next_call_site(&mut self.call_site_seq), importer_scope, module_scope);
        Some((obj, false))
    }

    // ---- Dynamic constraints --------------------------------------------

    fn apply_constraint(&mut self, trigger: CVar, constraint: &Constraint, diff: &Pts) {
        match constraint.clone() {
            Constraint::Load { base, field, target } => self.apply_load(base, field, target, diff),
            Constraint::Store { base, field, source } => self.apply_store(trigger, base, field, source, diff),
            Constraint::LoadSubscr { base, key, target } => self.apply_load_subscr(base, key, target),
            Constraint::StoreSubscr { base, key, source } => self.apply_store_subscr(base, key, source),
            Constraint::Call { callee, args, target, call_site } => {
                if trigger == callee {
                    self.apply_call(args, target, call_site, diff);
                }
                // Growth of an argument variable needs no extra handling
                // here: the parameter-binding edges created the first time
                // the callee resolved already carry later argument growth
                // through the ordinary PFG propagation step.
            }
            Constraint::Return { callee_return, caller_target } => {
                let s = self.pointers.var(callee_return);
                let t = self.pointers.var(caller_target);
                self.connect(s, t, PointerFlowKind::Normal);
            }
            Constraint::SuperResolve { field, target, .. } => self.apply_super_resolve(field, target, diff),
            Constraint::Copy { .. } | Constraint::Alloc { .. } => {}
        }
    }

    fn apply_load(&mut self, _base: CVar, field: Field, target: CVar, diff: &Pts) {
        let target_ptr = self.pointers.var(target);
        for obj in diff.iter() {
            if let Field::Attr(name) = &field {
                if builtins::container_method_name(self.objects.get(obj).kind(), name) {
                    let method_obj = self.container_method_object(obj, name);
                    self.enqueue_growth(target_ptr, Pts::singleton(method_obj, &self.objects, false));
                    continue;
                }
                if let AbstractObject::SuperProxy { self_var, declaring_class, .. } = self.objects.get(obj).clone() {
                    self.register_dynamic(Constraint::SuperResolve {
                        base: self_var,
                        field: Field::attr(name.clone()),
                        target,
                        declaring_class,
                    });
                    continue;
                }
            }
            let field_node = self.pointers.field(obj, field.clone());
            self.connect(field_node, target_ptr, PointerFlowKind::Normal);
        }
    }

    /// Returns (interning on first use) the bound method object for
    /// `receiver.method`, a built-in list/tuple/dict/set method (§4.9's
    /// container-method table). Interning on `(receiver, method)` gives
    /// every `LoadAttr` of the same attribute on the same receiver the
    /// identical object for free, with no separate cache needed.
    fn container_method_object(&mut self, receiver: ObjectId, method: &str) -> ObjectId {
        let context = self.objects.get(receiver).context();
        let alloc_site = self.objects.get_or_create_builtin_site(method, AllocKind::Builtin);
        self.objects.intern(AbstractObject::ContainerMethod { context, alloc_site, receiver, method: method.to_string() })
    }

    /// Only the `base`-growth path needs to wire new field edges: when
    /// `source` grows instead, the edges from a previous `base` growth
    /// already carry it forward. `__bases__` writes also refresh the class
    /// hierarchy, on either trigger, since growth of either side can
    /// reveal a base class the hierarchy hasn't seen yet.
    fn apply_store(&mut self, trigger: CVar, base: CVar, field: Field, source: CVar, diff: &Pts) {
        if trigger == base {
            let source_ptr = self.pointers.var(source);
            for obj in diff.iter() {
                let kind = self.edge_kind_for(obj);
                let field_node = self.pointers.field(obj, field.clone());
                self.connect(source_ptr, field_node, kind);
            }
        }
        if let Field::Attr(name) = &field {
            if name == "__bases__" {
                let base_ptr = self.pointers.var(base);
                let base_pts = self.env.pts_of(base_ptr);
                let classes: Vec<ObjectId> = base_pts.iter().filter(|&o| matches!(self.objects.get(o), AbstractObject::Class { .. })).collect();
                for class_obj in classes {
                    self.refresh_class_bases(class_obj, source);
                }
            }
        }
    }

    fn refresh_class_bases(&mut self, class_obj: ObjectId, source: CVar) {
        if !self.config.build_class_hierarchy {
            return;
        }
        let source_ptr = self.pointers.var(source);
        let pts = self.env.pts_of(source_ptr);
        let bases: Vec<ObjectId> = pts.iter().filter(|&o| matches!(self.objects.get(o), AbstractObject::Class { .. })).collect();
        self.class_hierarchy.update_bases(class_obj, bases);
    }

    fn subscript_field(&self, key_obj: ObjectId) -> Field {
        match self.objects.get(key_obj) {
            AbstractObject::Constant { repr, .. } => Field::key(repr.clone()),
            _ => Field::elem(),
        }
    }

    /// Recomputes the full `base` × `key` cross product on every firing
    /// rather than just the triggering diff: simpler than tracking which
    /// side grew, and `connect`'s own edge dedup keeps repeat firings
    /// cheap.
    fn apply_load_subscr(&mut self, base: CVar, key: CVar, target: CVar) {
        let base_ptr = self.pointers.var(base);
        let key_ptr = self.pointers.var(key);
        let base_pts = self.env.pts_of(base_ptr);
        let key_pts = self.env.pts_of(key_ptr);
        let target_ptr = self.pointers.var(target);
        for key_obj in key_pts.iter() {
            let field = self.subscript_field(key_obj);
            for base_obj in base_pts.iter() {
                let field_node = self.pointers.field(base_obj, field.clone());
                self.connect(field_node, target_ptr, PointerFlowKind::Normal);
            }
        }
    }

    fn apply_store_subscr(&mut self, base: CVar, key: CVar, source: CVar) {
        let base_ptr = self.pointers.var(base);
        let key_ptr = self.pointers.var(key);
        let base_pts = self.env.pts_of(base_ptr);
        let key_pts = self.env.pts_of(key_ptr);
        let source_ptr = self.pointers.var(source);
        for key_obj in key_pts.iter() {
            let field = self.subscript_field(key_obj);
            for base_obj in base_pts.iter() {
                let kind = self.edge_kind_for(base_obj);
                let field_node = self.pointers.field(base_obj, field.clone());
                self.connect(source_ptr, field_node, kind);
            }
        }
    }

    fn apply_super_resolve(&mut self, field: Field, target: CVar, diff: &Pts) {
        let target_ptr = self.pointers.var(target);
        for class_obj in diff.iter() {
            if !matches!(self.objects.get(class_obj), AbstractObject::Class { .. }) {
                continue;
            }
            // With MRO-based resolution disabled, `super()` only sees the
            // declaring class's own direct bases, left to right, rather
            // than the full C3-linearized chain.
            let later: Vec<ObjectId> = if self.config.use_mro_resolution {
                let mro = self.class_hierarchy.get_mro(class_obj, &mut self.unknowns);
                match mro.iter().position(|&c| c == class_obj) {
                    Some(pos) => mro[pos + 1..].to_vec(),
                    None => Vec::new(),
                }
            } else {
                self.class_hierarchy.get_bases(class_obj).to_vec()
            };
            for later in later {
                let field_node = self.pointers.field(later, field.clone());
                self.connect(field_node, target_ptr, PointerFlowKind::Normal);
            }
        }
    }

    // ---- Call dispatch ---------------------------------------------------

    fn apply_call(&mut self, args: Vec<CVar>, target: Option<CVar>, call_site: CallSiteId, diff: &Pts) {
        if diff.is_empty() {
            if !args.is_empty() {
                self.unknowns.record(UnknownKind::CalleeEmpty, format!("{:?}", call_site), "call constraint fired with an empty callee points-to set", None);
            }
            return;
        }
        for obj in diff.iter() {
            match self.objects.get(obj).clone() {
                AbstractObject::Function { ir, .. } => {
                    let caller_scope = args.first().map(|a| a.scope).or(target.map(|t| t.scope));
                    let Some(caller_scope) = caller_scope else {
                        self.unknowns.record(UnknownKind::MissingArgument, format!("{:?}", call_site), "zero-argument call with no target has no caller scope to anchor", None);
                        continue;
                    };
                    self.invoke(obj, ir, caller_scope, &args, target, call_site, CallHints::default(), None)
                }
                AbstractObject::Method { .. } => self.handle_method_call(&args, target, call_site, obj),
                AbstractObject::Class { .. } => self.handle_class_instantiation(&args, target, call_site, obj),
                AbstractObject::Builtin { alloc_site, .. } => self.handle_builtin_call(&args, target, call_site, alloc_site),
                AbstractObject::ContainerMethod { receiver, method, .. } => {
                    self.handle_container_method(receiver, &method, &args, target, call_site)
                }
                _ => {
                    self.unknowns.record(UnknownKind::CalleeNonCallable, format!("{:?}", call_site), format!("attempted to call non-callable object {obj:?}"), None);
                    if let Some(t) = target {
                        self.bind_unknown_result(t, call_site);
                    }
                }
            }
        }
    }

    fn bind_unknown_result(&mut self, target: CVar, call_site: CallSiteId) {
        let ir_scope = self.scopes.ir_scope_of(target.scope);
        let alloc_site = AllocSite::Stmt { scope: ir_scope, stmt_index: call_site.index() as u32, kind: AllocKind::Unknown };
        self.register_constraint(Constraint::Alloc { target, alloc_site });
    }

    /// Binds a callee scope and wires parameters/captures/return for a
    /// plain function call, or a method call once the receiver is known
    /// (§4.8's function-call 7-step procedure; `self_binding` supplies the
    /// extra first step method calls need).
    fn invoke(
        &mut self,
        closure_obj: ObjectId,
        ir: IrScopeId,
        caller_scope_id: ScopeId,
        args: &[CVar],
        target: Option<CVar>,
        call_site: CallSiteId,
        hints: CallHints<'_>,
        self_binding: Option<ObjectId>,
    ) {
        let caller_scope = self.scopes.get(caller_scope_id).clone();
        let caller_ctx = self.contexts.get(caller_scope.context).clone();

        // 1. select the callee context.
        let callee_ctx = self.selector.select_call_context(&caller_ctx, call_site, hints);
        let callee_ctx_id = self.contexts.intern(callee_ctx);

        // 2. build the callee scope, parented on the *caller's* scope.
        let module = caller_scope.module.unwrap_or(caller_scope_id);
        let callee_scope = self.scopes.intern(Scope::nested(ir, closure_obj, callee_ctx_id, caller_scope_id, module));

        // 3. translate the body (memoized per scope).
        let body = self.translator.translate(callee_scope, ir, self.scope_mgr, &mut self.vars, &mut self.unknowns, &mut self.call_site_seq);
        for c in body {
            self.register_constraint(c);
        }

        // 4. rebind captured cell/global/nonlocal variables.
        if let Some(closure) = self.closures.get(&closure_obj).cloned() {
            for (name, captured) in closure.captured {
                let var_id = self.vars.intern(Variable::local(&name));
                let local = CVar::new(callee_scope, var_id);
                let src = self.pointers.var(captured);
                let dst = self.pointers.var(local);
                self.connect(src, dst, PointerFlowKind::Normal);
            }
        }

        // 5. bind parameters: `self`/`cls` directly to the receiver object
        // when bound, remaining positional parameters from caller args.
        let params = self.scope_mgr.params(ir).to_vec();
        let mut names = params.iter();
        if let Some(holder) = self_binding {
            if let Some(self_name) = names.next() {
                let var_id = self.vars.intern(Variable::local(self_name));
                let self_var = CVar::new(callee_scope, var_id);
                let ptr = self.pointers.var(self_var);
                let pts = Pts::singleton(holder, &self.objects, false);
                self.enqueue_growth(ptr, pts);
            }
        }
        for (i, pname) in names.enumerate() {
            let var_id = self.vars.intern(Variable::local(pname));
            let param_var = CVar::new(callee_scope, var_id);
            if let Some(&arg) = args.get(i) {
                let a = self.pointers.var(arg);
                let p = self.pointers.var(param_var);
                self.connect(a, p, PointerFlowKind::Normal);
            } else {
                self.unknowns.record(UnknownKind::MissingArgument, format!("{:?}", call_site), format!("missing argument for parameter {pname}"), None);
            }
        }

        // 6. bind the callee's return value into the caller's target. The
        // translator writes a `Return` statement's value into the local
        // named "$return" (see `translator.rs`), so the callee's return
        // slot must be addressed the same way here.
        if let Some(t) = target {
            let ret_var_id = self.vars.intern(Variable::local("$return"));
            let ret_var = CVar::new(callee_scope, ret_var_id);
            self.register_dynamic(Constraint::Return { callee_return: ret_var, caller_target: t });
        }

        // 7. record the call edge.
        self.call_graph.add_edge(call_site, caller_scope_id, callee_scope);
    }

    fn handle_method_call(&mut self, args: &[CVar], target: Option<CVar>, call_site: CallSiteId, method_obj: ObjectId) {
        let (ir, class_obj, instance_obj) = match self.objects.get(method_obj) {
            AbstractObject::Method { ir, class_obj, instance_obj, .. } => (*ir, *class_obj, *instance_obj),
            _ => return,
        };
        let caller_scope = args.first().map(|a| a.scope).or(target.map(|t| t.scope));
        let Some(caller_scope) = caller_scope else {
            // A no-argument, no-target call has nothing to anchor the
            // caller scope to; nothing useful to bind.
            return;
        };
        match self.scope_mgr.kind(ir) {
            ScopeKind::StaticMethod => self.invoke(method_obj, ir, caller_scope, args, target, call_site, CallHints::default(), None),
            ScopeKind::ClassMethod => {
                let Some(holder) = class_obj else {
                    self.unknowns.record(UnknownKind::MissingArgument, format!("{:?}", call_site), "classmethod has no declaring class bound", None);
                    return;
                };
                let hints = CallHints { receiver: Some(ObjOrProxy::Object(holder)), ..Default::default() };
                self.invoke(method_obj, ir, caller_scope, args, target, call_site, hints, Some(holder));
            }
            _ => {
                let Some(holder) = instance_obj.or(class_obj) else {
                    self.unknowns.record(UnknownKind::MissingArgument, format!("{:?}", call_site), "method call has no bound receiver", None);
                    return;
                };
                let hints = CallHints { receiver: Some(ObjOrProxy::Object(holder)), ..Default::default() };
                self.invoke(method_obj, ir, caller_scope, args, target, call_site, hints, Some(holder));
            }
        }
    }

    fn handle_class_instantiation(&mut self, args: &[CVar], target: Option<CVar>, call_site: CallSiteId, class_obj: ObjectId) {
        let Some(target) = target else { return };
        let caller_scope_id = target.scope;
        let caller_scope = self.scopes.get(caller_scope_id).clone();
        let caller_ctx = self.contexts.get(caller_scope.context).clone();
        let ir_scope = self.scopes.ir_scope_of(caller_scope_id);

        let alloc_site = AllocSite::Stmt { scope: ir_scope, stmt_index: call_site.index() as u32, kind: AllocKind::Instance };
        let alloc_ctx = self.selector.select_alloc_context(&caller_ctx, ObjOrProxy::Object(class_obj));
        let alloc_ctx_id = self.contexts.intern(alloc_ctx);
        let instance_obj = self.objects.intern(AbstractObject::Instance { context: alloc_ctx_id, alloc_site, class_obj });

        let target_ptr = self.pointers.var(target);
        let pts = Pts::singleton(instance_obj, &self.objects, false);
        self.enqueue_growth(target_ptr, pts);

        // `__init__` resolves through the normal inheritance machinery: a
        // field load on the instance's `attr("__init__")` already sees
        // every class in the MRO via the `Inherit`/`Instance` edges added
        // when each class's methods were bound.
        let init_field = self.pointers.field(instance_obj, Field::attr("__init__"));
        let init_var_id = self.vars.intern(Variable::Temp(next_call_site(&mut self.call_site_seq).index() as u32));
        let init_cvar = CVar::new(caller_scope_id, init_var_id);
        let init_ptr = self.pointers.var(init_cvar);
        self.connect(init_field, init_ptr, PointerFlowKind::Normal);

        let init_call_site = next_call_site(&mut self.call_site_seq);
        self.register_dynamic(Constraint::Call { callee: init_cvar, args: args.to_vec(), target: None, call_site: init_call_site });
    }

    fn handle_builtin_call(&mut self, args: &[CVar], target: Option<CVar>, call_site: CallSiteId, alloc_site: AllocSite) {
        let qualname = match &alloc_site {
            AllocSite::Builtin { qualname, .. } => qualname.clone(),
            _ => return,
        };
        if !builtins::has_summary(&qualname) {
            self.unknowns.record(UnknownKind::CalleeNonCallable, format!("{:?}", call_site), format!("no summary registered for builtin {qualname}"), None);
            if let Some(t) = target {
                self.bind_unknown_result(t, call_site);
            }
            return;
        }
        let scope = args.first().map(|a| a.scope).or(target.map(|t| t.scope));
        let Some(scope) = scope else { return };
        let ir_scope = self.scopes.ir_scope_of(scope);
        if qualname == "super" && args.len() < 2 {
            // The zero-argument form only resolves when the front end lowers
            // it to `SuperAccess` (which carries `self`/the declaring class
            // explicitly); reaching it as a bare builtin call means neither
            // is available, so the points-to set is approximated.
            self.unknowns.record(
                UnknownKind::TranslationError,
                format!("{:?}", call_site),
                "zero-argument super() called as a builtin has no self/declaring class to resolve against",
                None,
            );
        }
        let constraints = {
            let mut ctx = BuiltinCtx { vars: &mut self.vars, scope, ir_scope, call_site_seq: &mut self.call_site_seq };
            builtins::apply(&qualname, target, args, &mut ctx)
        };
        for c in constraints {
            self.register_constraint(c);
        }
    }

    /// Dispatches a call to a bound list/tuple/dict/set method against its
    /// concrete receiver object (§4.9's container-method table). Unlike
    /// [`Self::handle_builtin_call`], the receiver is already known
    /// (carried by [`AbstractObject::ContainerMethod`]), so this wires
    /// field edges directly rather than through a registered constraint.
    /// Methods with no interesting pointer effect under a flow-insensitive,
    /// never-shrink model (`clear`, `sort`, `reverse`, `remove`, `discard`)
    /// are no-ops.
    fn handle_container_method(&mut self, receiver: ObjectId, method: &str, args: &[CVar], target: Option<CVar>, call_site: CallSiteId) {
        let scope = args.first().map(|a| a.scope).or_else(|| target.map(|t| t.scope));
        let elem = Field::elem();
        let kind = self.edge_kind_for(receiver);
        match method {
            "append" | "add" => {
                if let Some(&val) = args.first() {
                    let val_ptr = self.pointers.var(val);
                    let field_node = self.pointers.field(receiver, elem);
                    self.connect(val_ptr, field_node, kind);
                }
            }
            "insert" => {
                if let Some(&val) = args.get(1) {
                    let val_ptr = self.pointers.var(val);
                    let field_node = self.pointers.field(receiver, elem);
                    self.connect(val_ptr, field_node, kind);
                }
            }
            "extend" | "update" => {
                if let Some(&other) = args.first() {
                    let other_ptr = self.pointers.var(other);
                    let other_pts = self.env.pts_of(other_ptr);
                    let field_node = self.pointers.field(receiver, elem.clone());
                    for o in other_pts.iter() {
                        let src_field = self.pointers.field(o, elem.clone());
                        self.connect(src_field, field_node, kind);
                    }
                }
            }
            "pop" | "popitem" => {
                if let Some(t) = target {
                    let field_node = self.pointers.field(receiver, elem);
                    let t_ptr = self.pointers.var(t);
                    self.connect(field_node, t_ptr, PointerFlowKind::Normal);
                }
            }
            "get" | "setdefault" => {
                if method == "setdefault" {
                    if let Some(&val) = args.get(1) {
                        let val_ptr = self.pointers.var(val);
                        let field_node = self.pointers.field(receiver, Field::value());
                        self.connect(val_ptr, field_node, kind);
                    }
                }
                if let Some(t) = target {
                    let value_node = self.pointers.field(receiver, Field::value());
                    let t_ptr = self.pointers.var(t);
                    self.connect(value_node, t_ptr, PointerFlowKind::Normal);
                    if let Some(&default) = args.get(1) {
                        let d_ptr = self.pointers.var(default);
                        self.connect(d_ptr, t_ptr, PointerFlowKind::Normal);
                    }
                }
            }
            "keys" | "values" | "items" => {
                let (Some(t), Some(scope)) = (target, scope) else { return };
                let ir_scope = self.scopes.ir_scope_of(scope);
                let alloc_site = AllocSite::Stmt { scope: ir_scope, stmt_index: call_site.index() as u32, kind: AllocKind::List };
                let list_obj = self.objects.intern(AbstractObject::Plain { context: self.objects.get(receiver).context(), alloc_site });
                let t_ptr = self.pointers.var(t);
                self.enqueue_growth(t_ptr, Pts::singleton(list_obj, &self.objects, false));
                let value_node = self.pointers.field(receiver, Field::value());
                let new_elem = self.pointers.field(list_obj, elem);
                self.connect(value_node, new_elem, PointerFlowKind::Normal);
            }
            "copy" => {
                let (Some(t), Some(scope)) = (target, scope) else { return };
                let ir_scope = self.scopes.ir_scope_of(scope);
                let alloc_site = AllocSite::Stmt { scope: ir_scope, stmt_index: call_site.index() as u32, kind: self.objects.get(receiver).kind() };
                let new_obj = self.objects.intern(AbstractObject::Plain { context: self.objects.get(receiver).context(), alloc_site });
                let t_ptr = self.pointers.var(t);
                self.enqueue_growth(t_ptr, Pts::singleton(new_obj, &self.objects, false));
                for field in [Field::elem(), Field::value()] {
                    let src = self.pointers.field(receiver, field.clone());
                    let dst = self.pointers.field(new_obj, field);
                    self.connect(src, dst, PointerFlowKind::Normal);
                }
            }
            "index" | "count" => {
                let (Some(t), Some(scope)) = (target, scope) else { return };
                let ir_scope = self.scopes.ir_scope_of(scope);
                let alloc_site = AllocSite::Stmt { scope: ir_scope, stmt_index: call_site.index() as u32, kind: AllocKind::Constant };
                self.register_constraint(Constraint::Alloc { target: t, alloc_site });
            }
            "union" | "intersection" | "difference" => {
                let (Some(t), Some(scope)) = (target, scope) else { return };
                let ir_scope = self.scopes.ir_scope_of(scope);
                let alloc_site = AllocSite::Stmt { scope: ir_scope, stmt_index: call_site.index() as u32, kind: AllocKind::Set };
                let new_obj = self.objects.intern(AbstractObject::Plain { context: self.objects.get(receiver).context(), alloc_site });
                let t_ptr = self.pointers.var(t);
                self.enqueue_growth(t_ptr, Pts::singleton(new_obj, &self.objects, false));
                let dst = self.pointers.field(new_obj, elem.clone());
                let recv_src = self.pointers.field(receiver, elem.clone());
                self.connect(recv_src, dst, PointerFlowKind::Normal);
                if let Some(&other) = args.first() {
                    let other_ptr = self.pointers.var(other);
                    let other_pts = self.env.pts_of(other_ptr);
                    for o in other_pts.iter() {
                        let src = self.pointers.field(o, elem.clone());
                        self.connect(src, dst, PointerFlowKind::Normal);
                    }
                }
            }
            "remove" | "discard" | "clear" | "sort" | "reverse" => {}
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::fixture::{FixtureImport, FixtureScope, FixtureStmt, FixtureWorld, LoadedFixture};
    use crate::heap::Field;
    use crate::ir::{ContainerKind, ScopeKind};
    use crate::query::AnalysisResult;
    use crate::unknown_tracker::UnknownKind;
    use crate::PointerAnalysis;

    /// Loads and analyzes `world` against a default [`Config`], handing the
    /// finished result to `f` while the fixture is still in scope (an
    /// [`AnalysisResult`] borrows the [`LoadedFixture`] it was built from).
    fn with_analysis<R>(world: FixtureWorld, f: impl FnOnce(&mut AnalysisResult<'_>) -> R) -> R {
        with_analysis_config(world, Config::default(), f)
    }

    fn with_analysis_config<R>(world: FixtureWorld, config: Config, f: impl FnOnce(&mut AnalysisResult<'_>) -> R) -> R {
        let fixture = LoadedFixture::from_world(world);
        let entry = fixture.entry_module();
        let analysis = PointerAnalysis::new(&fixture, config).unwrap();
        let mut result = analysis.analyze(entry);
        f(&mut result)
    }

    fn module(id: usize, statements: Vec<FixtureStmt>) -> FixtureScope {
        FixtureScope { id, kind: ScopeKind::Module, qualified_name: format!("<module {id}>"), params: vec![], free_vars: vec![], statements, subscopes: vec![] }
    }

    fn class_scope(id: usize, name: &str) -> FixtureScope {
        FixtureScope { id, kind: ScopeKind::Class, qualified_name: name.to_string(), params: vec![], free_vars: vec![], statements: vec![], subscopes: vec![] }
    }

    // ---- basic copy propagation -----------------------------------------

    #[test]
    fn copy_propagates_constant_object() {
        let world = FixtureWorld {
            entry: 0,
            top_level: vec![0],
            scopes: vec![module(
                0,
                vec![FixtureStmt::Constant { target: "x".into(), repr: "1".into() }, FixtureStmt::Copy { target: "y".into(), source: "x".into() }],
            )],
            imports: vec![],
        };
        with_analysis(world, |result| {
            let mut q = result.query();
            let entry = q.entry_scope();
            let x = q.cvar(entry, "x");
            let y = q.cvar(entry, "y");
            let px = q.points_to(x);
            let py = q.points_to(y);
            assert_eq!(px.len(), 1);
            assert!(q.may_alias(x, y));
            assert!(px.iter().all(|o| py.contains(o)));
        });
    }

    // ---- field store/load -------------------------------------------------

    #[test]
    fn store_then_load_attr_round_trips() {
        let world = FixtureWorld {
            entry: 0,
            top_level: vec![0],
            scopes: vec![module(
                0,
                vec![
                    FixtureStmt::BuildContainer { target: "obj".into(), kind: ContainerKind::List, elements: vec![] },
                    FixtureStmt::Constant { target: "v".into(), repr: "42".into() },
                    FixtureStmt::StoreAttr { base: "obj".into(), attr: "val".into(), source: "v".into() },
                    FixtureStmt::LoadAttr { target: "r".into(), base: "obj".into(), attr: "val".into() },
                ],
            )],
            imports: vec![],
        };
        with_analysis(world, |result| {
            let mut q = result.query();
            let entry = q.entry_scope();
            let v = q.cvar(entry, "v");
            let r = q.cvar(entry, "r");
            assert!(q.may_alias(v, r));
            assert_eq!(q.points_to(r).len(), 1);
        });
    }

    // ---- simple inheritance MRO ------------------------------------------

    #[test]
    fn simple_inheritance_mro_is_linear() {
        let world = FixtureWorld {
            entry: 0,
            top_level: vec![0, 1, 2, 3],
            scopes: vec![
                module(
                    0,
                    vec![
                        FixtureStmt::DefClass { target: "A".into(), scope: 1, bases: vec![] },
                        FixtureStmt::DefClass { target: "B".into(), scope: 2, bases: vec!["A".into()] },
                        FixtureStmt::DefClass { target: "C".into(), scope: 3, bases: vec!["B".into()] },
                    ],
                ),
                class_scope(1, "A"),
                class_scope(2, "B"),
                class_scope(3, "C"),
            ],
            imports: vec![],
        };
        with_analysis(world, |result| {
            let mut q = result.query();
            let a = q.class_named("A")[0];
            let b = q.class_named("B")[0];
            let c = q.class_named("C")[0];
            assert_eq!(q.mro_of(c), vec![c, b, a]);
        });
    }

    // ---- diamond inheritance MRO -------------------------------------------

    #[test]
    fn diamond_inheritance_mro_prefers_left_to_right() {
        let world = FixtureWorld {
            entry: 0,
            top_level: vec![0, 1, 2, 3, 4],
            scopes: vec![
                module(
                    0,
                    vec![
                        FixtureStmt::DefClass { target: "A".into(), scope: 1, bases: vec![] },
                        FixtureStmt::DefClass { target: "B".into(), scope: 2, bases: vec!["A".into()] },
                        FixtureStmt::DefClass { target: "C".into(), scope: 3, bases: vec!["A".into()] },
                        FixtureStmt::DefClass { target: "D".into(), scope: 4, bases: vec!["B".into(), "C".into()] },
                    ],
                ),
                class_scope(1, "A"),
                class_scope(2, "B"),
                class_scope(3, "C"),
                class_scope(4, "D"),
            ],
            imports: vec![],
        };
        with_analysis(world, |result| {
            let mut q = result.query();
            let a = q.class_named("A")[0];
            let b = q.class_named("B")[0];
            let c = q.class_named("C")[0];
            let d = q.class_named("D")[0];
            assert_eq!(q.mro_of(d), vec![d, b, c, a]);
        });
    }

    // ---- builtin container method ------------------------------------------

    #[test]
    fn list_append_flows_into_elem_field() {
        let world = FixtureWorld {
            entry: 0,
            top_level: vec![0],
            scopes: vec![module(
                0,
                vec![
                    FixtureStmt::BuildContainer { target: "xs".into(), kind: ContainerKind::List, elements: vec![] },
                    FixtureStmt::Constant { target: "five".into(), repr: "5".into() },
                    FixtureStmt::LoadAttr { target: "m".into(), base: "xs".into(), attr: "append".into() },
                    FixtureStmt::Call { target: None, callee: "m".into(), args: vec!["five".into()], call_site: "cs0".into() },
                ],
            )],
            imports: vec![],
        };
        with_analysis(world, |result| {
            let mut q = result.query();
            let entry = q.entry_scope();
            let xs = q.cvar(entry, "xs");
            let five = q.cvar(entry, "five");
            let xs_obj = q.points_to(xs).iter().next().expect("xs must point somewhere");
            let elem = q.field(xs_obj, Field::elem());
            let five_pts = q.points_to(five);
            assert!(!elem.is_empty());
            assert!(five_pts.iter().all(|o| elem.contains(o)));
        });
    }

    // ---- unknown callee -----------------------------------------------------

    #[test]
    fn calling_a_non_callable_records_callee_non_callable() {
        let world = FixtureWorld {
            entry: 0,
            top_level: vec![0],
            scopes: vec![module(
                0,
                vec![
                    FixtureStmt::Constant { target: "c".into(), repr: "not_callable".into() },
                    FixtureStmt::Call { target: Some("r".into()), callee: "c".into(), args: vec![], call_site: "cs0".into() },
                ],
            )],
            imports: vec![],
        };
        with_analysis(world, |result| {
            let mut q = result.query();
            let entry = q.entry_scope();
            let r = q.cvar(entry, "r");
            assert!(q.unknown_details().iter().any(|rec| rec.kind == UnknownKind::CalleeNonCallable));
            // An unknown-callee result still allocates a placeholder object,
            // so downstream uses of `r` don't see an empty points-to set.
            assert_eq!(q.points_to(r).len(), 1);
        });
    }

    // ---- universal properties & boundary behaviors -------------------------

    #[test]
    fn repeated_allocation_of_the_same_site_interns_one_object() {
        let world = FixtureWorld {
            entry: 0,
            top_level: vec![0],
            scopes: vec![module(
                0,
                vec![
                    FixtureStmt::Constant { target: "a".into(), repr: "7".into() },
                    FixtureStmt::Copy { target: "b".into(), source: "a".into() },
                    FixtureStmt::Copy { target: "c".into(), source: "b".into() },
                ],
            )],
            imports: vec![],
        };
        with_analysis(world, |result| {
            let mut q = result.query();
            let entry = q.entry_scope();
            let a = q.cvar(entry, "a");
            let c = q.cvar(entry, "c");
            // Copy propagation is transitive: points-to only grows along
            // the chain, it is never replaced (monotonicity, §8 property 1).
            assert_eq!(q.points_to(a).len(), q.points_to(c).len());
            assert!(q.may_alias(a, c));
        });
    }

    #[test]
    fn empty_module_analyzes_to_an_empty_result() {
        let world = FixtureWorld { entry: 0, top_level: vec![0], scopes: vec![module(0, vec![])], imports: vec![] };
        with_analysis(world, |result| {
            let q = result.query();
            let stats = q.statistics();
            assert_eq!(stats.call_edges, 0);
            assert!(q.unknown_details().is_empty());
        });
    }

    #[test]
    fn zero_argument_call_binds_no_parameters_but_still_calls() {
        // `def f(): return 1` then `x = f()`.
        let world = FixtureWorld {
            entry: 0,
            top_level: vec![0, 1],
            scopes: vec![
                module(
                    0,
                    vec![
                        FixtureStmt::DefFunction { target: "f".into(), scope: 1, decorators: vec![] },
                        FixtureStmt::Call { target: Some("x".into()), callee: "f".into(), args: vec![], call_site: "cs0".into() },
                    ],
                ),
                FixtureScope {
                    id: 1,
                    kind: ScopeKind::Function,
                    qualified_name: "f".into(),
                    params: vec![],
                    free_vars: vec![],
                    statements: vec![FixtureStmt::Constant { target: "$return".into(), repr: "1".into() }],
                    subscopes: vec![],
                },
            ],
            imports: vec![],
        };
        with_analysis(world, |result| {
            let mut q = result.query();
            let entry = q.entry_scope();
            let x = q.cvar(entry, "x");
            assert_eq!(q.points_to(x).len(), 1);
            assert_eq!(q.call_graph().edge_count(), 1);
        });
    }

    #[test]
    fn class_with_no_base_has_a_singleton_mro() {
        let world = FixtureWorld {
            entry: 0,
            top_level: vec![0, 1],
            scopes: vec![module(0, vec![FixtureStmt::DefClass { target: "A".into(), scope: 1, bases: vec![] }]), class_scope(1, "A")],
            imports: vec![],
        };
        with_analysis(world, |result| {
            let mut q = result.query();
            let a = q.class_named("A")[0];
            assert_eq!(q.mro_of(a), vec![a]);
        });
    }

    #[test]
    fn context_bound_respects_0cfa_insensitivity() {
        // Two distinct call sites of the same function under 0-CFA must
        // fold into the same callee scope (the call-graph has one callee
        // node, even though there are two call edges in).
        let world = FixtureWorld {
            entry: 0,
            top_level: vec![0, 1],
            scopes: vec![
                module(
                    0,
                    vec![
                        FixtureStmt::DefFunction { target: "f".into(), scope: 1, decorators: vec![] },
                        FixtureStmt::Call { target: Some("x".into()), callee: "f".into(), args: vec![], call_site: "cs0".into() },
                        FixtureStmt::Call { target: Some("y".into()), callee: "f".into(), args: vec![], call_site: "cs1".into() },
                    ],
                ),
                FixtureScope {
                    id: 1,
                    kind: ScopeKind::Function,
                    qualified_name: "f".into(),
                    params: vec![],
                    free_vars: vec![],
                    statements: vec![FixtureStmt::Constant { target: "$return".into(), repr: "1".into() }],
                    subscopes: vec![],
                },
            ],
            imports: vec![],
        };
        let config = Config { context_policy: "0-cfa".into(), ..Config::default() };
        with_analysis_config(world, config, |result| {
            let mut q = result.query();
            let stats = q.statistics();
            assert_eq!(stats.call_edges, 2);
            // One context-insensitive callee scope reached by both calls,
            // plus the entry module scope itself.
            assert_eq!(q.call_graph().node_count(), 2);
        });
    }

    #[test]
    fn relative_import_resolves_through_module_graph() {
        let world = FixtureWorld {
            entry: 0,
            top_level: vec![0, 1],
            scopes: vec![
                module(0, vec![FixtureStmt::Import { target: "pkg".into(), module_path: "pkg".into(), level: 0, from_name: None }]),
                module(1, vec![FixtureStmt::Constant { target: "marker".into(), repr: "'pkg'".into() }]),
            ],
            imports: vec![FixtureImport { from_scope: 0, module_path: "pkg".into(), level: 0, resolves_to: 1 }],
        };
        with_analysis(world, |result| {
            let mut q = result.query();
            let entry = q.entry_scope();
            let pkg = q.cvar(entry, "pkg");
            assert_eq!(q.points_to(pkg).len(), 1);
            assert!(q.unknown_details().iter().all(|rec| rec.kind != UnknownKind::ImportNotFound));
        });
    }
}
