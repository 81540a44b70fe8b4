// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Variables and pointer-flow-graph addressable locations (C5). See
//! spec.md §3/§4.5. Modeled on `rustanlys-rupta/src/mir/path.rs`'s pattern
//! of interning a bare value behind a handle, then qualifying it with a
//! separate context-carrying wrapper rather than baking the context into
//! the value type itself.

use crate::heap::Field;
use crate::ids::{ObjectId, ScopeId, VarId};

/// The kind of a bare program variable, scope-local and context-free.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Variable {
    /// A named local (including parameters); `"$return"` and the receiver
    /// parameter's own name are ordinary locals like any other, not
    /// distinct variants — the translator and solver bind both by name.
    Local(String),
    /// A synthetic temporary introduced by translation (e.g. the
    /// intermediate of a chained call).
    Temp(u32),
}

impl Variable {
    pub fn local(name: impl Into<String>) -> Self {
        Variable::Local(name.into())
    }
}

/// A location the pointer flow graph can hold a points-to set for: either
/// a contextual variable or a field access on an abstract object.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Location {
    Var(CVar),
    Field(ObjectId, Field),
}

/// A variable qualified by the scope it is being analyzed under — the
/// actual unit the solver tracks points-to sets for. `scope` already
/// carries its context (a [`ScopeId`] interns the unique `(ir_scope,
/// owner_obj, context)` triple, see [`crate::scope::Scope`]), so the
/// contextual variable `(scope, context, variable)` spec.md §3 describes
/// is fully captured without a second context field.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CVar {
    pub scope: ScopeId,
    pub var: VarId,
}

impl CVar {
    pub fn new(scope: ScopeId, var: VarId) -> Self {
        CVar { scope, var }
    }
}

/// Interns bare [`Variable`] values, scope- and context-independent.
#[derive(Default)]
pub struct VariableTable {
    interner: crate::ids::Interner<Variable, VarId>,
}

impl VariableTable {
    pub fn new() -> Self {
        VariableTable { interner: crate::ids::Interner::new() }
    }

    pub fn intern(&mut self, var: Variable) -> VarId {
        self.interner.intern(var)
    }

    pub fn get(&self, id: VarId) -> &Variable {
        self.interner.get(id)
    }
}
