// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! IR translator (C9): lowers IR statements into constraints, memoized
//! per analysis-time scope so a body already translated under a given
//! `(ir_scope, context)` is never re-walked. See spec.md §4.5.

use std::collections::HashMap;

use crate::constraints::Constraint;
use crate::heap::Field;
use crate::ids::{CallSiteId, IrScopeId, ScopeId};
use crate::ir::{ContainerKind, IrScopeManager, IrStmt, ScopeKind};
use crate::object::AllocKind;
use crate::unknown_tracker::{UnknownKind, UnknownTracker};
use crate::variable::{CVar, Variable, VariableTable};

/// Translates IR bodies into constraints lazily, caching the result per
/// `(ir_scope, context)` instantiation (a [`ScopeId`] already bundles
/// both, so memoizing by `ScopeId` is equivalent to memoizing "per scope"
/// while still producing concretely-contextualized contextual variables).
pub struct Translator {
    cache: HashMap<ScopeId, Vec<Constraint>>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    pub fn new() -> Self {
        Translator { cache: HashMap::new() }
    }

    /// Translates `scope`'s body (looked up via `ir_scope`) into
    /// constraints, or returns the cached result if this exact scope was
    /// already translated.
    pub fn translate(
        &mut self,
        scope: ScopeId,
        ir_scope: IrScopeId,
        scopes: &dyn IrScopeManager,
        vars: &mut VariableTable,
        unknowns: &mut UnknownTracker,
        call_site_seq: &mut u32,
    ) -> Vec<Constraint> {
        if let Some(cached) = self.cache.get(&scope) {
            return cached.clone();
        }
        let stmts = scopes.statements(ir_scope).to_vec();
        let mut out = Vec::new();
        for (idx, stmt) in stmts.iter().enumerate() {
            translate_stmt(scope, ir_scope, stmt, idx, scopes, vars, unknowns, call_site_seq, &mut out);
        }
        self.cache.insert(scope, out.clone());
        out
    }

    pub fn is_cached(&self, scope: ScopeId) -> bool {
        self.cache.contains_key(&scope)
    }
}

fn cv(scope: ScopeId, vars: &mut VariableTable, name: &str) -> CVar {
    let var = vars.intern(Variable::local(name));
    CVar::new(scope, var)
}

fn next_call_site(call_site_seq: &mut u32) -> CallSiteId {
    let id = CallSiteId::new(*call_site_seq as usize);
    *call_site_seq += 1;
    id
}

/// A scratch contextual variable for threading a decorator call chain's
/// intermediate results, distinct from any real source-level name.
fn fresh_temp(scope: ScopeId, vars: &mut VariableTable, call_site_seq: &mut u32) -> CVar {
    let id = vars.intern(Variable::Temp(*call_site_seq));
    *call_site_seq += 1;
    CVar::new(scope, id)
}

/// Whether `name` is a bare identifier, as opposed to a complex decorator
/// expression like `obj.method(arg)` (spec.md §4.5/§9, §8's decorator
/// test). A front end that cannot reduce a decorator to a single name
/// passes through its source text, which this rejects on sight of `.`,
/// `(`, or any other non-identifier character.
fn is_simple_decorator_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[allow(clippy::too_many_arguments)]
fn translate_stmt(
    scope: ScopeId,
    ir_scope: IrScopeId,
    stmt: &IrStmt,
    idx: usize,
    scopes: &dyn IrScopeManager,
    vars: &mut VariableTable,
    unknowns: &mut UnknownTracker,
    call_site_seq: &mut u32,
    out: &mut Vec<Constraint>,
) {
    match stmt {
        IrStmt::Copy { target, source } => {
            out.push(Constraint::Copy { source: cv(scope, vars, source), target: cv(scope, vars, target) });
        }
        IrStmt::LoadAttr { target, base, attr } => {
            out.push(Constraint::Load {
                base: cv(scope, vars, base),
                field: Field::attr(attr.clone()),
                target: cv(scope, vars, target),
            });
        }
        IrStmt::StoreAttr { base, attr, source } => {
            out.push(Constraint::Store {
                base: cv(scope, vars, base),
                field: Field::attr(attr.clone()),
                source: cv(scope, vars, source),
            });
        }
        IrStmt::LoadSubscr { target, base, index } => {
            out.push(Constraint::LoadSubscr { base: cv(scope, vars, base), key: cv(scope, vars, index), target: cv(scope, vars, target) });
        }
        IrStmt::StoreSubscr { base, index, source } => {
            out.push(Constraint::StoreSubscr { base: cv(scope, vars, base), key: cv(scope, vars, index), source: cv(scope, vars, source) });
        }
        IrStmt::BuildContainer { target, kind, elements } => {
            let kind = match kind {
                ContainerKind::List => AllocKind::List,
                ContainerKind::Tuple => AllocKind::Tuple,
                ContainerKind::Dict => AllocKind::Dict,
                ContainerKind::Set => AllocKind::Set,
            };
            let target_var = cv(scope, vars, target);
            out.push(Constraint::Alloc {
                target: target_var,
                alloc_site: crate::object::AllocSite::Stmt { scope: ir_scope, stmt_index: idx as u32, kind },
            });
            for (i, elem) in elements.iter().enumerate() {
                let field = match kind {
                    AllocKind::Tuple => Field::position(i),
                    _ => Field::elem(),
                };
                out.push(Constraint::Store { base: target_var, field, source: cv(scope, vars, elem) });
            }
        }
        IrStmt::Constant { target, repr } => {
            out.push(Constraint::Alloc {
                target: cv(scope, vars, target),
                alloc_site: crate::object::AllocSite::Constant { scope: ir_scope, stmt_index: idx as u32, repr: repr.clone() },
            });
        }
        IrStmt::Call { target, callee, args, call_site } => {
            let call_site_id = next_call_site(call_site_seq);
            let _ = call_site;
            out.push(Constraint::Call {
                callee: cv(scope, vars, callee),
                args: args.iter().map(|a| cv(scope, vars, a)).collect(),
                target: target.as_ref().map(|t| cv(scope, vars, t)),
                call_site: call_site_id,
            });
        }
        IrStmt::Return { value } => {
            if let Some(v) = value {
                out.push(Constraint::Copy { source: cv(scope, vars, v), target: cv(scope, vars, "$return") });
            }
        }
        IrStmt::DefFunction { target, scope: fn_scope, decorators } => {
            let target_var = cv(scope, vars, target);
            // A body declared `InstanceMethod`/`ClassMethod`/`StaticMethod`
            // allocates as `AllocKind::Method` so `apply_alloc` interns an
            // `AbstractObject::Method` (rebindable via `inherit_into`/
            // `deliver_into`) instead of a plain `Function` that method
            // dispatch and classification can never recognize as one.
            let fn_kind = match scopes.kind(*fn_scope) {
                ScopeKind::InstanceMethod | ScopeKind::ClassMethod | ScopeKind::StaticMethod => AllocKind::Method,
                _ => AllocKind::Function,
            };
            let raw_alloc_site = crate::object::AllocSite::Stmt { scope: *fn_scope, stmt_index: idx as u32, kind: fn_kind };
            if decorators.is_empty() {
                out.push(Constraint::Alloc { target: target_var, alloc_site: raw_alloc_site });
            } else if decorators.iter().all(|d| is_simple_decorator_name(d)) {
                // `f = d_n(d_{n-1}(... d_1(f) ...))`: left-associative
                // unfolding of the common, name-only decorator case
                // (spec.md §4.5/§9). `decorators[0]` is closest to `def`
                // and applied first (innermost call).
                let raw_var = fresh_temp(scope, vars, call_site_seq);
                out.push(Constraint::Alloc { target: raw_var, alloc_site: raw_alloc_site });
                let mut current = raw_var;
                let last = decorators.len() - 1;
                for (i, dec_name) in decorators.iter().enumerate() {
                    let dec_var = cv(scope, vars, dec_name);
                    let call_site_id = next_call_site(call_site_seq);
                    let result = if i == last { target_var } else { fresh_temp(scope, vars, call_site_seq) };
                    out.push(Constraint::Call { callee: dec_var, args: vec![current], target: Some(result), call_site: call_site_id });
                    current = result;
                }
            } else {
                unknowns.record(
                    UnknownKind::TranslationError,
                    format!("scope {:?} stmt {idx}", scope),
                    "decorator application approximated (complex decorator expression)",
                    None,
                );
                out.push(Constraint::Alloc { target: target_var, alloc_site: raw_alloc_site });
            }
        }
        IrStmt::DefClass { target, scope: class_scope, bases } => {
            let target_var = cv(scope, vars, target);
            out.push(Constraint::Alloc {
                target: target_var,
                alloc_site: crate::object::AllocSite::Stmt { scope: *class_scope, stmt_index: idx as u32, kind: AllocKind::Class },
            });
            for base in bases {
                out.push(Constraint::Store { base: target_var, field: Field::attr("__bases__"), source: cv(scope, vars, base) });
            }
        }
        IrStmt::Import { target, module_path, level, from_name } => {
            let target_var = cv(scope, vars, target);
            out.push(Constraint::Alloc {
                target: target_var,
                alloc_site: crate::object::AllocSite::Import {
                    scope: ir_scope,
                    stmt_index: idx as u32,
                    module_path: module_path.clone(),
                    level: *level,
                },
            });
            // `from_name` only matters to a front end that lowers `from X
            // import Y` into a subsequent `LoadAttr` on `target`; the
            // module object itself resolves the same way either form.
            let _ = from_name;
        }
        IrStmt::SuperAccess { target, attr, class_var, self_var } => {
            let target_var = cv(scope, vars, target);
            let self_cvar = cv(scope, vars, self_var);
            let declaring_class_cvar = cv(scope, vars, class_var);
            out.push(Constraint::Alloc {
                target: target_var,
                alloc_site: crate::object::AllocSite::Super {
                    scope: ir_scope,
                    stmt_index: idx as u32,
                    self_var: self_cvar,
                    declaring_class: declaring_class_cvar,
                },
            });
            // The fused `super().attr` form resolves immediately; a bare
            // `super()` stored into `target` resolves lazily instead, the
            // first time something `LoadAttr`s off the proxy object this
            // `Alloc` just produced (`solver.rs`'s `apply_load`).
            if let Some(name) = attr {
                out.push(Constraint::SuperResolve { base: self_cvar, field: Field::attr(name.clone()), target: target_var, declaring_class: declaring_class_cvar });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A stub scope manager reporting a single, fixed [`ScopeKind`] for
    /// every scope asked about — enough for `translate_stmt`, which only
    /// ever queries the kind of the scope a `DefFunction` names.
    struct StubScopes(ScopeKind);

    impl IrScopeManager for StubScopes {
        fn top_level_scopes(&self) -> Vec<IrScopeId> {
            vec![]
        }
        fn subscopes(&self, _scope: IrScopeId) -> Vec<IrScopeId> {
            vec![]
        }
        fn statements(&self, _scope: IrScopeId) -> &[IrStmt] {
            &[]
        }
        fn qualified_name(&self, _scope: IrScopeId) -> &str {
            "<stub>"
        }
        fn kind(&self, _scope: IrScopeId) -> ScopeKind {
            self.0
        }
        fn params(&self, _scope: IrScopeId) -> &[String] {
            &[]
        }
        fn free_vars(&self, _scope: IrScopeId) -> &[String] {
            &[]
        }
    }

    fn run(stmt: IrStmt) -> (Vec<Constraint>, UnknownTracker) {
        let (out, unknowns, _vars) = run_with_vars(stmt);
        (out, unknowns)
    }

    fn run_with_vars(stmt: IrStmt) -> (Vec<Constraint>, UnknownTracker, VariableTable) {
        run_with_scope_kind(stmt, ScopeKind::Function)
    }

    fn run_with_scope_kind(stmt: IrStmt, fn_scope_kind: ScopeKind) -> (Vec<Constraint>, UnknownTracker, VariableTable) {
        let scope = ScopeId::new(0);
        let ir_scope = IrScopeId::new(0);
        let scopes = StubScopes(fn_scope_kind);
        let mut vars = VariableTable::new();
        let mut unknowns = UnknownTracker::new(true, false);
        let mut call_site_seq = 0u32;
        let mut out = Vec::new();
        translate_stmt(scope, ir_scope, &stmt, 0, &scopes, &mut vars, &mut unknowns, &mut call_site_seq, &mut out);
        (out, unknowns, vars)
    }

    #[test]
    fn is_simple_decorator_name_rejects_anything_but_a_bare_identifier() {
        assert!(is_simple_decorator_name("staticmethod"));
        assert!(is_simple_decorator_name("_private"));
        assert!(!is_simple_decorator_name("obj.method"));
        assert!(!is_simple_decorator_name("factory(arg)"));
        assert!(!is_simple_decorator_name(""));
        assert!(!is_simple_decorator_name("1leading_digit"));
    }

    #[test]
    fn undecorated_function_def_is_a_plain_alloc() {
        let (out, unknowns) = run(IrStmt::DefFunction { target: "f".into(), scope: IrScopeId::new(1), decorators: vec![] });
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Constraint::Alloc { .. }));
        assert!(unknowns.get_detailed_report().is_empty());
    }

    #[test]
    fn simple_decorator_chain_unfolds_left_associatively() {
        // `@d1` then `@d2` applied to `def f(): ...` lowers to
        // `f = d2(d1(f))`, i.e. `d1` (index 0) is called first.
        let (out, unknowns, mut vars) = run_with_vars(IrStmt::DefFunction {
            target: "f".into(),
            scope: IrScopeId::new(1),
            decorators: vec!["d1".into(), "d2".into()],
        });
        assert!(unknowns.get_detailed_report().is_empty());
        // One Alloc for the raw function, then one Call per decorator.
        assert_eq!(out.len(), 3);
        assert!(matches!(out[0], Constraint::Alloc { .. }));
        let Constraint::Call { callee: c1, args: a1, target: t1, .. } = &out[1] else { panic!("expected a Call") };
        let Constraint::Call { callee: c2, args: a2, target: t2, .. } = &out[2] else { panic!("expected a Call") };
        // The first call's single argument is the raw function's target.
        let Constraint::Alloc { target: raw, .. } = &out[0] else { unreachable!() };
        assert_eq!(a1[0], *raw);
        // Its result feeds the second call, whose result lands on `f`.
        assert_eq!(a2[0], t1.unwrap());
        let f_var = cv(ScopeId::new(0), &mut vars, "f");
        assert_eq!(c1.var, cv(ScopeId::new(0), &mut vars, "d1").var);
        assert_eq!(c2.var, cv(ScopeId::new(0), &mut vars, "d2").var);
        assert_eq!(t2.unwrap().var, f_var.var);
    }

    #[test]
    fn complex_decorator_expression_falls_back_and_records_an_unknown() {
        let (out, unknowns) = run(IrStmt::DefFunction {
            target: "f".into(),
            scope: IrScopeId::new(1),
            decorators: vec!["registry.register".into()],
        });
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Constraint::Alloc { .. }));
        assert!(unknowns.get_detailed_report().iter().any(|r| r.kind == UnknownKind::TranslationError));
    }

    #[test]
    fn super_access_with_attr_resolves_immediately() {
        let (out, _) = run(IrStmt::SuperAccess {
            target: "r".into(),
            attr: Some("greet".into()),
            class_var: "Base".into(),
            self_var: "self".into(),
        });
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], Constraint::Alloc { alloc_site: crate::object::AllocSite::Super { .. }, .. }));
        assert!(matches!(out[1], Constraint::SuperResolve { .. }));
    }

    #[test]
    fn bare_super_access_allocates_without_an_immediate_resolve() {
        let (out, _) = run(IrStmt::SuperAccess { target: "r".into(), attr: None, class_var: "Base".into(), self_var: "self".into() });
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Constraint::Alloc { alloc_site: crate::object::AllocSite::Super { .. }, .. }));
    }

    #[test]
    fn def_function_in_an_instance_method_scope_allocates_as_a_method() {
        for kind in [ScopeKind::InstanceMethod, ScopeKind::ClassMethod, ScopeKind::StaticMethod] {
            let (out, _, _) = run_with_scope_kind(
                IrStmt::DefFunction { target: "f".into(), scope: IrScopeId::new(1), decorators: vec![] },
                kind,
            );
            let Constraint::Alloc { alloc_site, .. } = &out[0] else { panic!("expected an Alloc") };
            assert_eq!(alloc_site.kind(), AllocKind::Method, "{kind:?} should allocate as a Method");
        }
    }

    #[test]
    fn def_function_outside_a_method_scope_allocates_as_a_plain_function() {
        for kind in [ScopeKind::Module, ScopeKind::Class, ScopeKind::Function] {
            let (out, _, _) = run_with_scope_kind(
                IrStmt::DefFunction { target: "f".into(), scope: IrScopeId::new(1), decorators: vec![] },
                kind,
            );
            let Constraint::Alloc { alloc_site, .. } = &out[0] else { panic!("expected an Alloc") };
            assert_eq!(alloc_site.kind(), AllocKind::Function, "{kind:?} should allocate as a plain Function");
        }
    }
}
