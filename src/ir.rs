// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! External interfaces (§6): the only surface the core analysis consumes
//! from a host front end. No MIR/TyCtxt dependency — a consumer plugs in
//! an `IrScopeManager`, `ModuleGraph`, and `World` over whatever source
//! representation it has.

use crate::ids::IrScopeId;

/// What kind of body a scope is, and for functions, its method modifier.
#[derive(Copy, Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub enum ScopeKind {
    Module,
    Class,
    Function,
    InstanceMethod,
    ClassMethod,
    StaticMethod,
}

/// A single IR statement. Tagged variant shape mandated by §4.5; a host
/// front end lowers its own AST/bytecode into this shape before handing
/// scopes to the analysis.
#[derive(Clone, Debug)]
pub enum IrStmt {
    Copy { target: String, source: String },
    LoadAttr { target: String, base: String, attr: String },
    StoreAttr { base: String, attr: String, source: String },
    LoadSubscr { target: String, base: String, index: String },
    StoreSubscr { base: String, index: String, source: String },
    BuildContainer { target: String, kind: ContainerKind, elements: Vec<String> },
    Constant { target: String, repr: String },
    Call { target: Option<String>, callee: String, args: Vec<String>, call_site: String },
    Return { value: Option<String> },
    DefFunction { target: String, scope: IrScopeId, decorators: Vec<String> },
    DefClass { target: String, scope: IrScopeId, bases: Vec<String> },
    Import { target: String, module_path: String, level: i32, from_name: Option<String> },
    /// `target = super()` or `target = super().attr` style access; the
    /// translator distinguishes by whether `attr` is present. `class_var`
    /// and `self_var` name the enclosing method's declaring class and
    /// receiver, which a front end always knows at lowering time and
    /// which the solver needs to resolve the MRO position (§4.9).
    SuperAccess { target: String, attr: Option<String>, class_var: String, self_var: String },
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub enum ContainerKind {
    List,
    Tuple,
    Dict,
    Set,
}

/// Enumerates scopes and their statements. The only requirement the core
/// analysis places on a host IR is that each statement can be lowered to
/// an [`IrStmt`].
pub trait IrScopeManager {
    fn top_level_scopes(&self) -> Vec<IrScopeId>;
    fn subscopes(&self, scope: IrScopeId) -> Vec<IrScopeId>;
    fn statements(&self, scope: IrScopeId) -> &[IrStmt];
    fn qualified_name(&self, scope: IrScopeId) -> &str;
    fn kind(&self, scope: IrScopeId) -> ScopeKind;
    /// Declared parameter names in order, `self`/`cls` included when
    /// present as the first entry.
    fn params(&self, scope: IrScopeId) -> &[String];
    /// Free variables captured from an enclosing scope (cells).
    fn free_vars(&self, scope: IrScopeId) -> &[String];
}

/// Resolves imports to module scopes, including Python-style relative
/// import semantics (§6.2): trim `level` trailing dotted components off
/// the current package then append the import name, or for an empty name
/// with `level >= 1`, return the current package itself.
pub trait ModuleGraph {
    fn resolve_import(&self, current_scope: IrScopeId, module_path: &str, level: i32) -> Option<IrScopeId>;
}

/// Supplies the analysis entry point and scope manager.
pub trait World {
    fn entry_module(&self) -> IrScopeId;
    fn scope_manager(&self) -> &dyn IrScopeManager;
    fn module_graph(&self) -> &dyn ModuleGraph;
}
