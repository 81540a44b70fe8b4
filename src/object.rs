// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Abstract objects (C3): allocation sites and the tagged object variants
//! they produce. See
//! `original_source/pythonstan/analysis/pointer/kcfa/object.py`.

use std::collections::HashMap;
use std::fmt;

use crate::context::AbstractContext;
use crate::ids::{ContextId, IrScopeId, ObjectId};
use crate::variable::CVar;

/// The syntactic kind of value an allocation site produces, mirroring
/// `object.py`'s `AllocKind`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum AllocKind {
    Object,
    List,
    Tuple,
    Dict,
    Set,
    Function,
    Method,
    Class,
    Instance,
    Module,
    BoundMethod,
    Builtin,
    Cell,
    Constant,
    Unknown,
    /// A `super()` proxy (SPEC_FULL supplement #11).
    Super,
}

/// An allocation site: the IR statement that allocates, tagged with what
/// kind of object it produces. Builtin synthetic sites carry no real IR
/// statement handle and are distinguished by `BuiltinId` instead.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum AllocSite {
    /// A real allocation at a program statement within a given IR scope.
    Stmt { scope: IrScopeId, stmt_index: u32, kind: AllocKind },
    /// A synthetic site standing in for a builtin function/method/type,
    /// keyed by qualified name (`object.py`'s `ObjectFactory` builtin
    /// caching keys on name + kind).
    Builtin { qualname: String, kind: AllocKind },
    /// A literal constant, carrying its source-level representation so
    /// `LoadSubscr`/`StoreSubscr` can dispatch on a constant string key
    /// (§4.8). Builtin summaries that synthesize an opaque constant result
    /// (e.g. `len(...)`) use the generic `Stmt` site with `kind: Constant`
    /// instead, since they have no real literal to carry.
    Constant { scope: IrScopeId, stmt_index: u32, repr: String },
    /// An `import`/`from ... import ...` statement, carrying what the
    /// module graph (§6.2) needs to resolve the target module.
    Import { scope: IrScopeId, stmt_index: u32, module_path: String, level: i32 },
    /// A `super()` proxy, carrying the contextual variables for the
    /// enclosing method's `self` parameter and declaring class so a later
    /// attribute load on the proxy can reconstruct the matching
    /// `SuperResolve` constraint (§4.9, SPEC_FULL supplement #11). Every
    /// `super()` entry point (the fused `SuperAccess` form, a bare
    /// `super()` loaded from later, and the builtin `super(C, o)` call)
    /// produces this same site shape.
    Super { scope: IrScopeId, stmt_index: u32, self_var: CVar, declaring_class: CVar },
}

impl AllocSite {
    pub fn kind(&self) -> AllocKind {
        match self {
            AllocSite::Stmt { kind, .. } => *kind,
            AllocSite::Builtin { kind, .. } => *kind,
            AllocSite::Constant { .. } => AllocKind::Constant,
            AllocSite::Import { .. } => AllocKind::Module,
            AllocSite::Super { .. } => AllocKind::Super,
        }
    }
}

impl fmt::Display for AllocSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocSite::Stmt { scope, stmt_index, .. } => {
                write!(f, "{:?}@{}", scope, stmt_index)
            }
            AllocSite::Builtin { qualname, .. } => write!(f, "builtin:{qualname}"),
            AllocSite::Constant { scope, stmt_index, repr } => {
                write!(f, "{:?}@{}={repr:?}", scope, stmt_index)
            }
            AllocSite::Import { scope, stmt_index, module_path, level } => {
                write!(f, "{:?}@{}=import({module_path:?}, level={level})", scope, stmt_index)
            }
            AllocSite::Super { scope, stmt_index, .. } => {
                write!(f, "{:?}@{}=super()", scope, stmt_index)
            }
        }
    }
}

/// An abstract heap object: an allocation site paired with the context it
/// was allocated under, plus variant-specific payload. Mirrors the
/// `AbstractObject` hierarchy in `object.py`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum AbstractObject {
    /// A plain `object`/list/tuple/dict/set/cell allocation with no
    /// further structure tracked beyond its site and context.
    Plain { context: ContextId, alloc_site: AllocSite },
    /// A first-class function value.
    Function { context: ContextId, alloc_site: AllocSite, container_scope: IrScopeId, ir: IrScopeId },
    /// A method value bound to a declaring class (`class_obj`) and,
    /// once delivered, an instance (`instance_obj`). Rebinding produces a
    /// *new* `Method` value rather than mutating in place (`object.py`'s
    /// `deliver_into`/`inherit_into`).
    Method {
        context: ContextId,
        alloc_site: AllocSite,
        container_scope: IrScopeId,
        ir: IrScopeId,
        class_obj: Option<ObjectId>,
        instance_obj: Option<ObjectId>,
    },
    Class { context: ContextId, alloc_site: AllocSite },
    Module { context: ContextId, alloc_site: AllocSite },
    Instance { context: ContextId, alloc_site: AllocSite, class_obj: ObjectId },
    Constant { context: ContextId, alloc_site: AllocSite, repr: String },
    Builtin { context: ContextId, alloc_site: AllocSite },
    /// A bound instance method of a built-in container (e.g. `xs.append`).
    /// Carries the receiver directly rather than through the `class_obj`/
    /// `instance_obj` rebinding `Method` uses, since container methods have
    /// no inheritance to resolve — the receiver is fixed at bind time.
    ContainerMethod { context: ContextId, alloc_site: AllocSite, receiver: ObjectId, method: String },
    /// A `super()` proxy. Carries the `self`/declaring-class contextual
    /// variables so a `LoadAttr` against this object (solver.rs's
    /// `apply_load`) can synthesize a `SuperResolve` constraint the way
    /// `ContainerMethod` synthesizes a bound-method dispatch.
    SuperProxy { context: ContextId, alloc_site: AllocSite, self_var: CVar, declaring_class: CVar },
}

impl AbstractObject {
    pub fn context(&self) -> ContextId {
        match self {
            AbstractObject::Plain { context, .. }
            | AbstractObject::Function { context, .. }
            | AbstractObject::Method { context, .. }
            | AbstractObject::Class { context, .. }
            | AbstractObject::Module { context, .. }
            | AbstractObject::Instance { context, .. }
            | AbstractObject::Constant { context, .. }
            | AbstractObject::Builtin { context, .. }
            | AbstractObject::ContainerMethod { context, .. }
            | AbstractObject::SuperProxy { context, .. } => *context,
        }
    }

    pub fn alloc_site(&self) -> &AllocSite {
        match self {
            AbstractObject::Plain { alloc_site, .. }
            | AbstractObject::Function { alloc_site, .. }
            | AbstractObject::Method { alloc_site, .. }
            | AbstractObject::Class { alloc_site, .. }
            | AbstractObject::Module { alloc_site, .. }
            | AbstractObject::Instance { alloc_site, .. }
            | AbstractObject::Constant { alloc_site, .. }
            | AbstractObject::Builtin { alloc_site, .. }
            | AbstractObject::ContainerMethod { alloc_site, .. }
            | AbstractObject::SuperProxy { alloc_site, .. } => alloc_site,
        }
    }

    pub fn kind(&self) -> AllocKind {
        self.alloc_site().kind()
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            AbstractObject::Function { .. }
                | AbstractObject::Method { .. }
                | AbstractObject::Class { .. }
                | AbstractObject::Builtin { .. }
                | AbstractObject::ContainerMethod { .. }
        )
    }

    /// Whether the underlying declared function is itself `@classmethod`.
    /// Only meaningful for `Method`; used by the points-to set to classify
    /// a freshly-allocated method object into `classmethods` vs
    /// `instancemethods` regardless of current binding state (SPEC_FULL
    /// supplement #8). Callers supply the flag from the IR scope manager at
    /// allocation time since this type itself has no IR access.
    pub fn is_method(&self) -> bool {
        matches!(self, AbstractObject::Method { .. })
    }

    /// Rebind a method's declaring class, producing a fresh `Method`
    /// value (`object.py`'s `inherit_into`). No-op on non-method objects.
    pub fn inherit_into(&self, class_obj: ObjectId) -> AbstractObject {
        match self {
            AbstractObject::Method { context, alloc_site, container_scope, ir, instance_obj, .. } => {
                AbstractObject::Method {
                    context: *context,
                    alloc_site: alloc_site.clone(),
                    container_scope: *container_scope,
                    ir: *ir,
                    class_obj: Some(class_obj),
                    instance_obj: *instance_obj,
                }
            }
            other => other.clone(),
        }
    }

    /// Rebind a method's bound instance, producing a fresh `Method` value
    /// (`object.py`'s `deliver_into`).
    pub fn deliver_into(&self, instance_obj: ObjectId) -> AbstractObject {
        match self {
            AbstractObject::Method { context, alloc_site, container_scope, ir, class_obj, .. } => {
                AbstractObject::Method {
                    context: *context,
                    alloc_site: alloc_site.clone(),
                    container_scope: *container_scope,
                    ir: *ir,
                    class_obj: *class_obj,
                    instance_obj: Some(instance_obj),
                }
            }
            other => other.clone(),
        }
    }
}

/// Interns `AbstractObject` values and caches synthetic builtin objects by
/// qualified name, mirroring `object.py`'s `ObjectFactory`.
#[derive(Default)]
pub struct ObjectFactory {
    interner: crate::ids::Interner<AbstractObject, ObjectId>,
    builtin_sites: HashMap<(String, AllocKind), AllocSite>,
}

impl ObjectFactory {
    pub fn new() -> Self {
        ObjectFactory { interner: crate::ids::Interner::new(), builtin_sites: HashMap::new() }
    }

    pub fn intern(&mut self, obj: AbstractObject) -> ObjectId {
        self.interner.intern(obj)
    }

    pub fn get(&self, id: ObjectId) -> &AbstractObject {
        self.interner.get(id)
    }

    pub fn len(&self) -> usize {
        self.interner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interner.is_empty()
    }

    /// Returns (creating and caching on first use) the synthetic
    /// allocation site for a builtin symbol.
    pub fn get_or_create_builtin_site(&mut self, qualname: &str, kind: AllocKind) -> AllocSite {
        let key = (qualname.to_string(), kind);
        if let Some(site) = self.builtin_sites.get(&key) {
            return site.clone();
        }
        let site = AllocSite::Builtin { qualname: qualname.to_string(), kind };
        self.builtin_sites.insert(key, site.clone());
        site
    }

    pub fn create_builtin_function(&mut self, qualname: &str, context: ContextId) -> ObjectId {
        let alloc_site = self.get_or_create_builtin_site(qualname, AllocKind::Builtin);
        self.intern(AbstractObject::Builtin { context, alloc_site })
    }
}
