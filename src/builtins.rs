// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Built-in summaries (C11). Representative built-ins are modeled as
//! constraint templates rather than translated bodies, dispatched by name
//! the way `rustanlys-rupta`'s `builder/special_function_handler.rs`
//! dispatches on `KnownNames` via a `lazy_static!` set. See spec.md §4.9.

use lazy_static::lazy_static;
use std::collections::HashSet;

use crate::constraints::Constraint;
use crate::heap::Field;
use crate::object::AllocKind;
use crate::variable::CVar;

/// What a summary needs from the solver to synthesize fresh allocations:
/// a new allocation site of the given kind, already context-selected.
pub trait SummaryContext {
    fn fresh_alloc(&mut self, kind: AllocKind) -> crate::object::AllocSite;
    /// A scratch contextual variable usable to thread a field-to-field
    /// flow through a `Load` followed by a `Store` (e.g. "link source
    /// `elem()` to result `elem()`").
    fn fresh_temp(&mut self) -> CVar;
    /// A `super()` proxy allocation site binding `self_var`/`declaring_class`
    /// (§4.9), used by the `super` builtin's explicit two-argument form.
    fn fresh_super_alloc(&mut self, self_var: CVar, declaring_class: CVar) -> crate::object::AllocSite;
}

/// Emits `base_a.field -> base_b.field` as `Load(base_a, field, tmp)` then
/// `Store(base_b, field, tmp)`, since the constraint model has no direct
/// field-to-field edge constructor.
fn link_field(out: &mut Vec<Constraint>, ctx: &mut dyn SummaryContext, base_a: CVar, base_b: CVar, field: Field) {
    let tmp = ctx.fresh_temp();
    out.push(Constraint::Load { base: base_a, field: field.clone(), target: tmp });
    out.push(Constraint::Store { base: base_b, field, source: tmp });
}

lazy_static! {
    static ref CONTAINER_CTORS: HashSet<&'static str> = {
        ["list", "dict", "tuple", "set", "frozenset"].into_iter().collect()
    };
    static ref CONSERVATIVE_RESULT: HashSet<&'static str> = {
        [
            "len", "type", "isinstance", "issubclass", "print", "input", "open", "hasattr", "delattr",
            "repr", "id", "hash", "hex", "oct", "bin", "chr", "ord", "abs", "round",
        ]
        .into_iter()
        .collect()
    };
    static ref HANDLED: HashSet<&'static str> = {
        let mut s: HashSet<&'static str> = CONTAINER_CTORS.iter().copied().collect();
        s.extend(CONSERVATIVE_RESULT.iter().copied());
        s.extend([
            "iter", "next", "enumerate", "zip", "map", "filter", "sorted", "reversed", "getattr", "setattr", "super",
        ]);
        s
    };
}

pub fn has_summary(name: &str) -> bool {
    HANDLED.contains(name)
}

lazy_static! {
    static ref LIST_METHODS: HashSet<&'static str> =
        ["append", "extend", "pop", "insert", "remove", "clear", "sort", "reverse", "copy", "index", "count"].into_iter().collect();
    static ref TUPLE_METHODS: HashSet<&'static str> = ["index", "count"].into_iter().collect();
    static ref DICT_METHODS: HashSet<&'static str> =
        ["get", "keys", "values", "items", "update", "setdefault", "pop", "popitem", "clear", "copy"].into_iter().collect();
    static ref SET_METHODS: HashSet<&'static str> =
        ["add", "remove", "discard", "pop", "clear", "union", "intersection", "difference", "copy"].into_iter().collect();
}

/// Whether `name` is a built-in instance method of a list/tuple/dict/set
/// (spec's container-method table). Dispatched by the solver directly
/// against the concrete receiver object (`solver.rs`'s
/// `handle_container_method`) rather than through [`apply`], since these
/// act on a known receiver rather than a named free function.
pub fn container_method_name(kind: AllocKind, name: &str) -> bool {
    match kind {
        AllocKind::List => LIST_METHODS.contains(name),
        AllocKind::Tuple => TUPLE_METHODS.contains(name),
        AllocKind::Dict => DICT_METHODS.contains(name),
        AllocKind::Set => SET_METHODS.contains(name),
        _ => false,
    }
}

/// Applies a named built-in's summary, emitting the constraints it would
/// produce for this call (`target = name(args...)`). Returns an empty
/// vector for a name `has_summary` rejects.
pub fn apply(name: &str, target: Option<CVar>, args: &[CVar], ctx: &mut dyn SummaryContext) -> Vec<Constraint> {
    let mut out = Vec::new();
    match name {
        "list" | "dict" | "tuple" | "set" | "frozenset" => {
            let Some(target) = target else { return out };
            let kind = match name {
                "list" => AllocKind::List,
                "dict" => AllocKind::Dict,
                "tuple" => AllocKind::Tuple,
                _ => AllocKind::Set,
            };
            let alloc_site = ctx.fresh_alloc(kind);
            out.push(Constraint::Alloc { target, alloc_site });
            if let Some(&src) = args.first() {
                link_field(&mut out, ctx, src, target, Field::elem());
            }
        }
        "iter" => {
            let Some(target) = target else { return out };
            let alloc_site = ctx.fresh_alloc(AllocKind::Object);
            out.push(Constraint::Alloc { target, alloc_site });
            if let Some(&src) = args.first() {
                link_field(&mut out, ctx, src, target, Field::elem());
            }
        }
        "next" => {
            if let (Some(target), Some(&it)) = (target, args.first()) {
                out.push(Constraint::Load { base: it, field: Field::elem(), target });
            }
        }
        "len" | "type" | "isinstance" | "issubclass" | "print" | "input" | "open" | "hasattr" | "delattr" | "repr"
        | "id" | "hash" | "hex" | "oct" | "bin" | "chr" | "ord" | "abs" | "round" => {
            if let Some(target) = target {
                let alloc_site = ctx.fresh_alloc(AllocKind::Constant);
                out.push(Constraint::Alloc { target, alloc_site });
            }
        }
        "enumerate" | "zip" | "sorted" | "reversed" => {
            let Some(target) = target else { return out };
            let alloc_site = ctx.fresh_alloc(AllocKind::List);
            out.push(Constraint::Alloc { target, alloc_site });
            for &a in args {
                link_field(&mut out, ctx, a, target, Field::elem());
            }
        }
        "map" => {
            let Some(target) = target else { return out };
            let alloc_site = ctx.fresh_alloc(AllocKind::List);
            out.push(Constraint::Alloc { target, alloc_site });
            // args[0] is the mapping function, not an iterable; only the
            // remaining args contribute elements.
            for &a in args.iter().skip(1) {
                link_field(&mut out, ctx, a, target, Field::elem());
            }
        }
        "filter" => {
            let Some(target) = target else { return out };
            let alloc_site = ctx.fresh_alloc(AllocKind::List);
            out.push(Constraint::Alloc { target, alloc_site });
            if let Some(&src) = args.get(1).or_else(|| args.first()) {
                link_field(&mut out, ctx, src, target, Field::elem());
            }
        }
        "getattr" => {
            if let Some(target) = target {
                let alloc_site = ctx.fresh_alloc(AllocKind::Unknown);
                out.push(Constraint::Alloc { target, alloc_site });
            }
        }
        "setattr" => {
            if let Some(&obj) = args.first() {
                if let Some(&val) = args.get(2) {
                    out.push(Constraint::Store { base: obj, field: Field::unknown(), source: val });
                }
            }
        }
        "super" => {
            let Some(target) = target else { return out };
            match (args.first(), args.get(1)) {
                (Some(&declaring_class), Some(&self_var)) => {
                    let alloc_site = ctx.fresh_super_alloc(self_var, declaring_class);
                    out.push(Constraint::Alloc { target, alloc_site });
                }
                _ => {
                    // Implicit zero-argument `super()`: the enclosing
                    // method's `self`/declaring class aren't reachable from
                    // a builtin call's bare argument list, so fall back to
                    // a conservative unknown object rather than leaving the
                    // points-to set empty forever.
                    let alloc_site = ctx.fresh_alloc(AllocKind::Unknown);
                    out.push(Constraint::Alloc { target, alloc_site });
                }
            }
        }
        _ => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{IrScopeId, ScopeId, VarId};
    use crate::object::AllocSite;

    struct MockCtx {
        scope: ScopeId,
        next: u32,
    }

    impl MockCtx {
        fn new() -> Self {
            MockCtx { scope: ScopeId::new(0), next: 0 }
        }

        fn fresh_var(&mut self) -> CVar {
            let v = CVar::new(self.scope, VarId::new(self.next as usize));
            self.next += 1;
            v
        }
    }

    impl SummaryContext for MockCtx {
        fn fresh_alloc(&mut self, kind: AllocKind) -> AllocSite {
            let stmt_index = self.next;
            self.next += 1;
            AllocSite::Stmt { scope: IrScopeId::new(0), stmt_index, kind }
        }

        fn fresh_temp(&mut self) -> CVar {
            self.fresh_var()
        }

        fn fresh_super_alloc(&mut self, self_var: CVar, declaring_class: CVar) -> AllocSite {
            let stmt_index = self.next;
            self.next += 1;
            AllocSite::Super { scope: IrScopeId::new(0), stmt_index, self_var, declaring_class }
        }
    }

    #[test]
    fn has_summary_recognizes_container_ctors_and_rejects_unknown_names() {
        assert!(has_summary("list"));
        assert!(has_summary("super"));
        assert!(!has_summary("not_a_builtin"));
    }

    #[test]
    fn container_method_name_is_scoped_to_its_own_kind() {
        assert!(container_method_name(AllocKind::List, "append"));
        assert!(!container_method_name(AllocKind::Tuple, "append"));
        assert!(container_method_name(AllocKind::Dict, "keys"));
        assert!(!container_method_name(AllocKind::Function, "append"));
    }

    #[test]
    fn list_ctor_allocates_and_links_its_source_into_elem() {
        let mut ctx = MockCtx::new();
        let target = ctx.fresh_var();
        let src = ctx.fresh_var();
        let out = apply("list", Some(target), &[src], &mut ctx);
        assert!(matches!(out[0], Constraint::Alloc { target: t, .. } if t == target));
        assert!(out.iter().any(|c| matches!(c, Constraint::Load { base, .. } if *base == src)));
    }

    #[test]
    fn map_does_not_treat_its_function_argument_as_an_iterable_source() {
        let mut ctx = MockCtx::new();
        let target = ctx.fresh_var();
        let func = ctx.fresh_var();
        let xs = ctx.fresh_var();
        let out = apply("map", Some(target), &[func, xs], &mut ctx);
        let load_bases: Vec<CVar> = out.iter().filter_map(|c| match c { Constraint::Load { base, .. } => Some(*base), _ => None }).collect();
        assert!(load_bases.contains(&xs));
        assert!(!load_bases.contains(&func));
    }

    #[test]
    fn super_with_two_args_allocates_a_super_proxy_site() {
        let mut ctx = MockCtx::new();
        let target = ctx.fresh_var();
        let declaring_class = ctx.fresh_var();
        let self_var = ctx.fresh_var();
        let out = apply("super", Some(target), &[declaring_class, self_var], &mut ctx);
        match &out[..] {
            [Constraint::Alloc { target: t, alloc_site: AllocSite::Super { self_var: sv, declaring_class: dc, .. } }] => {
                assert_eq!(*t, target);
                assert_eq!(*sv, self_var);
                assert_eq!(*dc, declaring_class);
            }
            other => panic!("expected a single Super alloc, got {other:?}"),
        }
    }

    #[test]
    fn super_with_no_args_falls_back_to_an_unknown_alloc() {
        let mut ctx = MockCtx::new();
        let target = ctx.fresh_var();
        let out = apply("super", Some(target), &[], &mut ctx);
        assert!(matches!(out[0], Constraint::Alloc { alloc_site: AllocSite::Stmt { kind: AllocKind::Unknown, .. }, .. }));
    }

    #[test]
    fn apply_with_no_target_is_a_no_op() {
        let mut ctx = MockCtx::new();
        assert!(apply("list", None, &[], &mut ctx).is_empty());
    }
}
