// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Newtyped interned identifiers (C1). Every piece of the analysis that
//! needs stable, hashable, copyable identity — call sites, allocation
//! sites, scopes, contexts, variables, fields, objects, pointer nodes —
//! is represented as one of these rather than by the value itself, so
//! equality and hashing stay O(1) regardless of payload size.

use std::fmt;

use crate::util::bit_vec::Idx as BitIdx;

macro_rules! newtype_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub fn new(idx: usize) -> Self {
                $name(idx as u32)
            }

            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl BitIdx for $name {
            #[inline]
            fn new(idx: usize) -> Self {
                $name::new(idx)
            }
            #[inline]
            fn index(self) -> usize {
                $name::index(self)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

newtype_id! {
    /// Interned `AbstractContext`.
    ContextId
}

newtype_id! {
    /// Interned IR scope handle (module/function/class body), as reported
    /// by the IR Scope Manager.
    IrScopeId
}

newtype_id! {
    /// Interned analysis-time `Scope` (ir scope + owner object + context).
    ScopeId
}

newtype_id! {
    /// Interned call site.
    CallSiteId
}

newtype_id! {
    /// Interned allocation site.
    AllocSiteId
}

newtype_id! {
    /// Interned `AbstractObject`.
    ObjectId
}

newtype_id! {
    /// Interned `Field` key.
    FieldId
}

newtype_id! {
    /// Interned bare `Variable` (name + kind), scope-independent.
    VarId
}

newtype_id! {
    /// Interned contextual variable: `(scope, context, variable)`.
    CVarId
}

newtype_id! {
    /// Interned pointer-flow-graph node: a contextual variable or a
    /// field-access node.
    PointerId
}

/// A generic arena mapping interned values to ids and back, the way the
/// teacher's `ContextCache` interns `Context<E>` values behind `ContextId`.
pub struct Interner<K, V> {
    by_value: std::collections::HashMap<K, V>,
    by_id: Vec<K>,
}

impl<K, V> Interner<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: BitIdx,
{
    pub fn new() -> Self {
        Interner { by_value: std::collections::HashMap::new(), by_id: Vec::new() }
    }

    pub fn intern(&mut self, value: K) -> V {
        if let Some(&id) = self.by_value.get(&value) {
            return id;
        }
        let id = V::new(self.by_id.len());
        self.by_id.push(value.clone());
        self.by_value.insert(value, id);
        id
    }

    pub fn get(&self, id: V) -> &K {
        &self.by_id[id.index()]
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter_ids(&self) -> impl Iterator<Item = V> + '_ {
        (0..self.by_id.len()).map(V::new)
    }
}

impl<K, V> Default for Interner<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: BitIdx,
{
    fn default() -> Self {
        Self::new()
    }
}
