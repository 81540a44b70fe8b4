// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! A JSON-loadable [`World`] (§6's Testing/CLI plumbing): a host front end
//! normally lowers its own AST into [`IrStmt`]s directly, but the CLI
//! binary and fixture-driven tests have no front end at all, so this
//! module gives them a serializable stand-in. `DefFunction`/`DefClass`
//! reference subscopes by a plain `usize` index rather than [`IrScopeId`]
//! (which carries no serde impl of its own), converted to real ids at load
//! time since the fixture controls id allocation 1:1 with scope index.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::IrScopeId;
use crate::ir::{ContainerKind, IrScopeManager, IrStmt, ModuleGraph, ScopeKind, World};

#[derive(Clone, Serialize, Deserialize)]
pub enum FixtureStmt {
    Copy { target: String, source: String },
    LoadAttr { target: String, base: String, attr: String },
    StoreAttr { base: String, attr: String, source: String },
    LoadSubscr { target: String, base: String, index: String },
    StoreSubscr { base: String, index: String, source: String },
    BuildContainer { target: String, kind: ContainerKind, elements: Vec<String> },
    Constant { target: String, repr: String },
    Call { target: Option<String>, callee: String, args: Vec<String>, call_site: String },
    Return { value: Option<String> },
    DefFunction { target: String, scope: usize, decorators: Vec<String> },
    DefClass { target: String, scope: usize, bases: Vec<String> },
    Import { target: String, module_path: String, level: i32, from_name: Option<String> },
    SuperAccess { target: String, attr: Option<String>, class_var: String, self_var: String },
}

impl FixtureStmt {
    fn into_ir_stmt(self) -> IrStmt {
        match self {
            FixtureStmt::Copy { target, source } => IrStmt::Copy { target, source },
            FixtureStmt::LoadAttr { target, base, attr } => IrStmt::LoadAttr { target, base, attr },
            FixtureStmt::StoreAttr { base, attr, source } => IrStmt::StoreAttr { base, attr, source },
            FixtureStmt::LoadSubscr { target, base, index } => IrStmt::LoadSubscr { target, base, index },
            FixtureStmt::StoreSubscr { base, index, source } => IrStmt::StoreSubscr { base, index, source },
            FixtureStmt::BuildContainer { target, kind, elements } => IrStmt::BuildContainer { target, kind, elements },
            FixtureStmt::Constant { target, repr } => IrStmt::Constant { target, repr },
            FixtureStmt::Call { target, callee, args, call_site } => IrStmt::Call { target, callee, args, call_site },
            FixtureStmt::Return { value } => IrStmt::Return { value },
            FixtureStmt::DefFunction { target, scope, decorators } => {
                IrStmt::DefFunction { target, scope: IrScopeId::new(scope), decorators }
            }
            FixtureStmt::DefClass { target, scope, bases } => IrStmt::DefClass { target, scope: IrScopeId::new(scope), bases },
            FixtureStmt::Import { target, module_path, level, from_name } => IrStmt::Import { target, module_path, level, from_name },
            FixtureStmt::SuperAccess { target, attr, class_var, self_var } => IrStmt::SuperAccess { target, attr, class_var, self_var },
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct FixtureScope {
    pub id: usize,
    pub kind: ScopeKind,
    pub qualified_name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub free_vars: Vec<String>,
    #[serde(default)]
    pub statements: Vec<FixtureStmt>,
    #[serde(default)]
    pub subscopes: Vec<usize>,
}

/// An import key is `(current_scope, module_path, level)`; the fixture
/// resolves it by exact lookup rather than computing relative-import
/// arithmetic itself (that's a front end's job per §6.2 — this is a fixed
/// table for test/CLI determinism).
#[derive(Clone, Serialize, Deserialize)]
pub struct FixtureImport {
    pub from_scope: usize,
    pub module_path: String,
    pub level: i32,
    pub resolves_to: usize,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct FixtureWorld {
    pub entry: usize,
    pub top_level: Vec<usize>,
    pub scopes: Vec<FixtureScope>,
    #[serde(default)]
    pub imports: Vec<FixtureImport>,
}

/// The runtime form of [`FixtureWorld`]: statements converted once at load
/// time and indexed by scope id for `O(1)` lookup.
pub struct LoadedFixture {
    entry: IrScopeId,
    top_level: Vec<IrScopeId>,
    scopes: HashMap<usize, (ScopeKind, String, Vec<String>, Vec<String>, Vec<IrStmt>, Vec<usize>)>,
    imports: HashMap<(usize, String, i32), usize>,
}

impl LoadedFixture {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let raw: FixtureWorld = serde_json::from_str(text)?;
        Ok(Self::from_world(raw))
    }

    pub fn from_world(raw: FixtureWorld) -> Self {
        let mut scopes = HashMap::new();
        for s in raw.scopes {
            let stmts = s.statements.into_iter().map(FixtureStmt::into_ir_stmt).collect();
            scopes.insert(s.id, (s.kind, s.qualified_name, s.params, s.free_vars, stmts, s.subscopes));
        }
        let mut imports = HashMap::new();
        for imp in raw.imports {
            imports.insert((imp.from_scope, imp.module_path, imp.level), imp.resolves_to);
        }
        LoadedFixture {
            entry: IrScopeId::new(raw.entry),
            top_level: raw.top_level.into_iter().map(IrScopeId::new).collect(),
            scopes,
            imports,
        }
    }
}

impl IrScopeManager for LoadedFixture {
    fn top_level_scopes(&self) -> Vec<IrScopeId> {
        self.top_level.clone()
    }

    fn subscopes(&self, scope: IrScopeId) -> Vec<IrScopeId> {
        self.scopes.get(&scope.index()).map(|(_, _, _, _, _, sub)| sub.iter().copied().map(IrScopeId::new).collect()).unwrap_or_default()
    }

    fn statements(&self, scope: IrScopeId) -> &[IrStmt] {
        self.scopes.get(&scope.index()).map(|(_, _, _, _, stmts, _)| stmts.as_slice()).unwrap_or(&[])
    }

    fn qualified_name(&self, scope: IrScopeId) -> &str {
        self.scopes.get(&scope.index()).map(|(_, name, _, _, _, _)| name.as_str()).unwrap_or("<unknown>")
    }

    fn kind(&self, scope: IrScopeId) -> ScopeKind {
        self.scopes.get(&scope.index()).map(|(kind, _, _, _, _, _)| *kind).unwrap_or(ScopeKind::Module)
    }

    fn params(&self, scope: IrScopeId) -> &[String] {
        self.scopes.get(&scope.index()).map(|(_, _, params, _, _, _)| params.as_slice()).unwrap_or(&[])
    }

    fn free_vars(&self, scope: IrScopeId) -> &[String] {
        self.scopes.get(&scope.index()).map(|(_, _, _, free, _, _)| free.as_slice()).unwrap_or(&[])
    }
}

impl ModuleGraph for LoadedFixture {
    fn resolve_import(&self, current_scope: IrScopeId, module_path: &str, level: i32) -> Option<IrScopeId> {
        self.imports.get(&(current_scope.index(), module_path.to_string(), level)).copied().map(IrScopeId::new)
    }
}

impl World for LoadedFixture {
    fn entry_module(&self) -> IrScopeId {
        self.entry
    }

    fn scope_manager(&self) -> &dyn IrScopeManager {
        self
    }

    fn module_graph(&self) -> &dyn ModuleGraph {
        self
    }
}
