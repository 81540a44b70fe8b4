// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context model (C2): tagged context variants with bounded-length append.
//! See `original_source/pythonstan/analysis/pointer/kcfa/context.py`.

pub mod selector;

use std::fmt;

use crate::ids::{CallSiteId, ContextId, ObjectId};

/// A receiver element in an object/receiver/hybrid context: either the
/// abstract object itself or, when no receiver is available, a proxy
/// derived from the call site (mirrors `context_selector.py`'s
/// `f"call:{call_site.site_id}"` fallback for `k-obj`).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ObjOrProxy {
    Object(ObjectId),
    CallProxy(CallSiteId),
}

/// Context-sensitivity policy. A closed enumeration of the sixteen
/// concrete policies, matching `context_selector.py`'s `ContextPolicy` —
/// each hybrid policy fixes both of its bounds in the identifier itself
/// rather than taking them as independent parameters (SPEC_FULL supplement
/// #1).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ContextPolicy {
    Insensitive,
    Call1,
    Call2,
    Call3,
    Obj1,
    Obj2,
    Obj3,
    Type1,
    Type2,
    Type3,
    Receiver1,
    Receiver2,
    Receiver3,
    HybridCall1Obj1,
    HybridCall2Obj1,
    HybridCall1Obj2,
}

impl ContextPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextPolicy::Insensitive => "0-cfa",
            ContextPolicy::Call1 => "1-cfa",
            ContextPolicy::Call2 => "2-cfa",
            ContextPolicy::Call3 => "3-cfa",
            ContextPolicy::Obj1 => "1-obj",
            ContextPolicy::Obj2 => "2-obj",
            ContextPolicy::Obj3 => "3-obj",
            ContextPolicy::Type1 => "1-type",
            ContextPolicy::Type2 => "2-type",
            ContextPolicy::Type3 => "3-type",
            ContextPolicy::Receiver1 => "1-rcv",
            ContextPolicy::Receiver2 => "2-rcv",
            ContextPolicy::Receiver3 => "3-rcv",
            ContextPolicy::HybridCall1Obj1 => "1c1o",
            ContextPolicy::HybridCall2Obj1 => "2c1o",
            ContextPolicy::HybridCall1Obj2 => "1c2o",
        }
    }
}

/// Parse a policy string (`"2-cfa"`, `"1-obj"`, ...) into a [`ContextPolicy`].
pub fn parse_policy(s: &str) -> Option<ContextPolicy> {
    Some(match s {
        "0-cfa" => ContextPolicy::Insensitive,
        "1-cfa" => ContextPolicy::Call1,
        "2-cfa" => ContextPolicy::Call2,
        "3-cfa" => ContextPolicy::Call3,
        "1-obj" => ContextPolicy::Obj1,
        "2-obj" => ContextPolicy::Obj2,
        "3-obj" => ContextPolicy::Obj3,
        "1-type" => ContextPolicy::Type1,
        "2-type" => ContextPolicy::Type2,
        "3-type" => ContextPolicy::Type3,
        "1-rcv" => ContextPolicy::Receiver1,
        "2-rcv" => ContextPolicy::Receiver2,
        "3-rcv" => ContextPolicy::Receiver3,
        "1c1o" => ContextPolicy::HybridCall1Obj1,
        "2c1o" => ContextPolicy::HybridCall2Obj1,
        "1c2o" => ContextPolicy::HybridCall1Obj2,
        _ => return None,
    })
}

/// A context-sensitivity context. Immutable; `append_*` returns a new value
/// with the bound enforced by truncating to the rightmost `k`/`depth`
/// entries, matching each Python variant's `append`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum AbstractContext {
    CallString { sites: Vec<CallSiteId>, k: usize },
    Object { sites: Vec<ObjOrProxy>, depth: usize },
    Type { types: Vec<String>, depth: usize },
    Receiver { sites: Vec<ObjOrProxy>, depth: usize },
    Hybrid { call_sites: Vec<CallSiteId>, objects: Vec<ObjOrProxy>, call_k: usize, obj_depth: usize },
}

impl AbstractContext {
    pub fn is_empty(&self) -> bool {
        match self {
            AbstractContext::CallString { sites, .. } => sites.is_empty(),
            AbstractContext::Object { sites, .. } => sites.is_empty(),
            AbstractContext::Type { types, .. } => types.is_empty(),
            AbstractContext::Receiver { sites, .. } => sites.is_empty(),
            AbstractContext::Hybrid { call_sites, objects, .. } => {
                call_sites.is_empty() && objects.is_empty()
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AbstractContext::CallString { sites, .. } => sites.len(),
            AbstractContext::Object { sites, .. } => sites.len(),
            AbstractContext::Type { types, .. } => types.len(),
            AbstractContext::Receiver { sites, .. } => sites.len(),
            AbstractContext::Hybrid { call_sites, objects, .. } => call_sites.len() + objects.len(),
        }
    }

    fn append_bounded<T: Clone>(items: &[T], new_item: T, bound: usize) -> Vec<T> {
        if bound == 0 {
            return items.to_vec();
        }
        let mut v = items.to_vec();
        v.push(new_item);
        if v.len() > bound {
            let drop = v.len() - bound;
            v.drain(0..drop);
        }
        v
    }

    pub fn append_call_site(&self, cs: CallSiteId) -> AbstractContext {
        match self {
            AbstractContext::CallString { sites, k } => AbstractContext::CallString {
                sites: Self::append_bounded(sites, cs, *k),
                k: *k,
            },
            other => other.clone(),
        }
    }

    pub fn append_object(&self, item: ObjOrProxy) -> AbstractContext {
        match self {
            AbstractContext::Object { sites, depth } => AbstractContext::Object {
                sites: Self::append_bounded(sites, item, *depth),
                depth: *depth,
            },
            other => other.clone(),
        }
    }

    pub fn append_type(&self, ty: String) -> AbstractContext {
        match self {
            AbstractContext::Type { types, depth } => AbstractContext::Type {
                types: Self::append_bounded(types, ty, *depth),
                depth: *depth,
            },
            other => other.clone(),
        }
    }

    pub fn append_receiver(&self, item: ObjOrProxy) -> AbstractContext {
        match self {
            AbstractContext::Receiver { sites, depth } => AbstractContext::Receiver {
                sites: Self::append_bounded(sites, item, *depth),
                depth: *depth,
            },
            other => other.clone(),
        }
    }

    pub fn append_hybrid_call(&self, cs: CallSiteId) -> AbstractContext {
        match self {
            AbstractContext::Hybrid { call_sites, objects, call_k, obj_depth } => AbstractContext::Hybrid {
                call_sites: Self::append_bounded(call_sites, cs, *call_k),
                objects: objects.clone(),
                call_k: *call_k,
                obj_depth: *obj_depth,
            },
            other => other.clone(),
        }
    }

    pub fn append_hybrid_object(&self, item: ObjOrProxy) -> AbstractContext {
        match self {
            AbstractContext::Hybrid { call_sites, objects, call_k, obj_depth } => AbstractContext::Hybrid {
                call_sites: call_sites.clone(),
                objects: Self::append_bounded(objects, item, *obj_depth),
                call_k: *call_k,
                obj_depth: *obj_depth,
            },
            other => other.clone(),
        }
    }
}

impl fmt::Display for AbstractContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbstractContext::CallString { sites, .. } => {
                write!(f, "[{}]", sites.len())
            }
            AbstractContext::Object { sites, .. } => write!(f, "<{}>", sites.len()),
            AbstractContext::Type { types, .. } => write!(f, "<{}>", types.join(":")),
            AbstractContext::Receiver { sites, .. } => write!(f, "<rcv:{}>", sites.len()),
            AbstractContext::Hybrid { call_sites, objects, .. } => {
                write!(f, "[{}]<{}>", call_sites.len(), objects.len())
            }
        }
    }
}

/// Arena of interned contexts, keyed by structural equality.
#[derive(Default)]
pub struct ContextArena {
    inner: crate::ids::Interner<AbstractContext, ContextId>,
}

impl ContextArena {
    pub fn new() -> Self {
        ContextArena { inner: crate::ids::Interner::new() }
    }

    pub fn intern(&mut self, ctx: AbstractContext) -> ContextId {
        self.inner.intern(ctx)
    }

    pub fn get(&self, id: ContextId) -> &AbstractContext {
        self.inner.get(id)
    }
}
