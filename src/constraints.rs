// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Constraints (C6): the unit of work the solver propagates to fixpoint.
//! See `original_source/pythonstan/analysis/pointer/kcfa/constraints.py`,
//! extended with `SuperResolve`/`LoadSubscr`/`StoreSubscr` per spec.md
//! §4.7/§4.9 (the Python source has no dedicated subscript/`super`
//! constraint kinds; this crate adds them as first-class variants rather
//! than lowering them to `Load`/`Store` with a synthetic field, since
//! `super()` resolution needs the declaring class and MRO position, not
//! just a field key).

use std::collections::{HashMap, HashSet};

use crate::heap::Field;
use crate::variable::CVar;

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Constraint {
    /// `target = source`.
    Copy { source: CVar, target: CVar },
    /// `target = base.field`.
    Load { base: CVar, field: Field, target: CVar },
    /// `base.field = source`.
    Store { base: CVar, field: Field, source: CVar },
    /// `target = new <alloc_site>`.
    Alloc { target: CVar, alloc_site: crate::object::AllocSite },
    /// `target = callee(args...)`.
    Call { callee: CVar, args: Vec<CVar>, target: Option<CVar>, call_site: crate::ids::CallSiteId },
    /// Propagate a callee's return value into the caller's target.
    Return { callee_return: CVar, caller_target: CVar },
    /// `target = super().field`, resolved against the MRO of the
    /// enclosing method's declaring class starting just after that class.
    SuperResolve { base: CVar, field: Field, target: CVar, declaring_class: CVar },
    /// `target = base[key]` where `key` is itself a variable (as opposed
    /// to `Load` with a statically-known `Field`).
    LoadSubscr { base: CVar, key: CVar, target: CVar },
    /// `base[key] = source`.
    StoreSubscr { base: CVar, key: CVar, source: CVar },
}

impl Constraint {
    /// The contextual variables this constraint reads from, used to index
    /// it for re-triggering when one of them grows.
    pub fn trigger_vars(&self) -> Vec<CVar> {
        match self {
            Constraint::Copy { source, .. } => vec![*source],
            Constraint::Load { base, .. } => vec![*base],
            Constraint::Store { base, source, .. } => vec![*base, *source],
            Constraint::Alloc { .. } => vec![],
            Constraint::Call { callee, args, .. } => {
                let mut v = vec![*callee];
                v.extend(args.iter().copied());
                v
            }
            Constraint::Return { callee_return, .. } => vec![*callee_return],
            Constraint::SuperResolve { declaring_class, .. } => vec![*declaring_class],
            Constraint::LoadSubscr { base, key, .. } => vec![*base, *key],
            Constraint::StoreSubscr { base, key, source } => vec![*base, *key, *source],
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Constraint::Copy { .. } | Constraint::Alloc { .. })
    }
}

/// Indexes constraints by the variable(s) that trigger them and by kind,
/// mirroring `constraints.py`'s `ConstraintManager`.
#[derive(Default)]
pub struct ConstraintManager {
    all: Vec<Constraint>,
    seen: HashSet<Constraint>,
    by_var: HashMap<CVar, Vec<usize>>,
    by_kind: HashMap<&'static str, Vec<usize>>,
}

impl ConstraintManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn kind_name(c: &Constraint) -> &'static str {
        match c {
            Constraint::Copy { .. } => "copy",
            Constraint::Load { .. } => "load",
            Constraint::Store { .. } => "store",
            Constraint::Alloc { .. } => "alloc",
            Constraint::Call { .. } => "call",
            Constraint::Return { .. } => "return",
            Constraint::SuperResolve { .. } => "super_resolve",
            Constraint::LoadSubscr { .. } => "load_subscr",
            Constraint::StoreSubscr { .. } => "store_subscr",
        }
    }

    /// Adds the constraint if not already present; returns `true` if it
    /// was newly added.
    pub fn add(&mut self, constraint: Constraint) -> bool {
        if self.seen.contains(&constraint) {
            return false;
        }
        let idx = self.all.len();
        self.seen.insert(constraint.clone());
        for v in constraint.trigger_vars() {
            self.by_var.entry(v).or_default().push(idx);
        }
        self.by_kind.entry(Self::kind_name(&constraint)).or_default().push(idx);
        self.all.push(constraint);
        true
    }

    pub fn get_by_variable(&self, v: CVar) -> impl Iterator<Item = &Constraint> {
        self.by_var.get(&v).into_iter().flatten().map(move |&i| &self.all[i])
    }

    pub fn get_by_kind(&self, kind: &str) -> impl Iterator<Item = &Constraint> {
        self.by_kind.get(kind).into_iter().flatten().map(move |&i| &self.all[i])
    }

    pub fn all(&self) -> impl Iterator<Item = &Constraint> {
        self.all.iter()
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ScopeId, VarId};

    fn var(n: u32) -> CVar {
        CVar::new(ScopeId::new(0), VarId::new(n as usize))
    }

    #[test]
    fn adding_the_same_constraint_twice_is_deduplicated() {
        let mut mgr = ConstraintManager::new();
        let c = Constraint::Copy { source: var(0), target: var(1) };
        assert!(mgr.add(c.clone()));
        assert!(!mgr.add(c));
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn get_by_variable_indexes_every_trigger_var_of_a_constraint() {
        let mut mgr = ConstraintManager::new();
        let base = var(0);
        let source = var(1);
        mgr.add(Constraint::Store { base, field: Field::attr("x"), source });
        assert_eq!(mgr.get_by_variable(base).count(), 1);
        assert_eq!(mgr.get_by_variable(source).count(), 1);
        assert_eq!(mgr.get_by_variable(var(2)).count(), 0);
    }

    #[test]
    fn get_by_kind_groups_constraints_by_their_variant() {
        let mut mgr = ConstraintManager::new();
        mgr.add(Constraint::Copy { source: var(0), target: var(1) });
        mgr.add(Constraint::Copy { source: var(1), target: var(2) });
        mgr.add(Constraint::Load { base: var(0), field: Field::attr("y"), target: var(3) });
        assert_eq!(mgr.get_by_kind("copy").count(), 2);
        assert_eq!(mgr.get_by_kind("load").count(), 1);
        assert_eq!(mgr.get_by_kind("store").count(), 0);
    }

    #[test]
    fn alloc_constraints_have_no_trigger_vars_and_are_static() {
        let alloc_site = crate::object::AllocSite::Builtin { qualname: "x".into(), kind: crate::object::AllocKind::Object };
        let c = Constraint::Alloc { target: var(0), alloc_site };
        assert!(c.trigger_vars().is_empty());
        assert!(c.is_static());
        assert!(!Constraint::Copy { source: var(0), target: var(1) }.is_static());
    }
}
