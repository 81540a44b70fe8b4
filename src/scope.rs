// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Analysis-time scopes (§3): the context identity of a function/class/
//! module body. Mirrors `context.py`'s `Scope` dataclass, minus its
//! `kind`/`name` derived properties, which live on [`crate::ir::IrScopeManager`]
//! instead since they read straight off the IR scope.

use crate::ids::{ContextId, IrScopeId, ObjectId, ScopeId};

/// `{ir_scope, owner_obj, context, parent?, module?}`. Module scopes are
/// their own module and require no parent; non-module scopes require a
/// parent (enforced by callers constructing scopes, not by this type).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Scope {
    pub ir_scope: IrScopeId,
    pub owner_obj: Option<ObjectId>,
    pub context: ContextId,
    pub parent: Option<ScopeId>,
    pub module: Option<ScopeId>,
}

impl Scope {
    pub fn module(ir_scope: IrScopeId, context: ContextId) -> Self {
        Scope { ir_scope, owner_obj: None, context, parent: None, module: None }
    }

    pub fn nested(ir_scope: IrScopeId, owner_obj: ObjectId, context: ContextId, parent: ScopeId, module: ScopeId) -> Self {
        Scope { ir_scope, owner_obj: Some(owner_obj), context, parent: Some(parent), module: Some(module) }
    }
}

/// Interns [`Scope`] values behind [`ScopeId`]; every distinct
/// `(ir_scope, owner_obj, context)` triple gets exactly one id, matching
/// invariant 2 in spec.md §3 (interning makes identity comparison
/// sufficient for contextual variables keyed by scope).
#[derive(Default)]
pub struct ScopeTable {
    interner: crate::ids::Interner<Scope, ScopeId>,
}

impl ScopeTable {
    pub fn new() -> Self {
        ScopeTable { interner: crate::ids::Interner::new() }
    }

    pub fn intern(&mut self, scope: Scope) -> ScopeId {
        self.interner.intern(scope)
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        self.interner.get(id)
    }

    pub fn context_of(&self, id: ScopeId) -> ContextId {
        self.get(id).context
    }

    pub fn ir_scope_of(&self, id: ScopeId) -> IrScopeId {
        self.get(id).ir_scope
    }
}
