use std::collections::HashMap;

use thiserror::Error;

use crate::compile::ast::{SourcePos, Type};

pub type ScopeId = usize;

#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub pos: SourcePos,
    pub initialized: bool,
}

#[derive(Error, Clone, Debug, PartialEq)]
#[error("{name} is already declared in this scope (at {previous})")]
pub struct AlreadyDeclared {
    pub name: String,
    pub previous: SourcePos,
}

#[derive(Clone, Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    symbols: HashMap<String, Symbol>,
    children: Vec<ScopeId>,
}

/// Scopes of one program, stored in an arena. Every scope except the root
/// has a parent; children are kept in the order they were opened, which is
/// the order a traversal of the program meets its blocks.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub const ROOT: ScopeId = 0;

    pub fn new() -> Self {
        SymbolTable {
            scopes: vec![Scope::default()],
        }
    }

    pub fn open(&mut self, parent: ScopeId) -> ScopeId {
        let id = self.scopes.len();

        self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        self.scopes[parent].children.push(id);

        id
    }

    /// The `index`-th scope opened directly inside `scope`.
    pub fn child(&self, scope: ScopeId, index: usize) -> Option<ScopeId> {
        self.scopes
            .get(scope)
            .and_then(|s| s.children.get(index))
            .copied()
    }

    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        ty: Type,
        pos: SourcePos,
    ) -> Result<&Symbol, AlreadyDeclared> {
        let symbols = &mut self.scopes[scope].symbols;

        if let Some(previous) = symbols.get(name) {
            return Err(AlreadyDeclared {
                name: name.to_string(),
                previous: previous.pos,
            });
        }

        Ok(symbols.entry(name.to_string()).or_insert(Symbol {
            name: name.to_string(),
            ty,
            pos,
            initialized: false,
        }))
    }

    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.scopes.get(scope).and_then(|s| s.symbols.get(name))
    }

    /// Resolves `name` walking outward from `scope` to the root.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.resolve(scope, name)
            .and_then(|owner| self.lookup_local(owner, name))
    }

    pub fn lookup_mut(&mut self, scope: ScopeId, name: &str) -> Option<&mut Symbol> {
        let owner = self.resolve(scope, name)?;
        self.scopes[owner].symbols.get_mut(name)
    }

    fn resolve(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(scope);

        while let Some(id) = current {
            let scope = self.scopes.get(id)?;

            if scope.symbols.contains_key(name) {
                return Some(id);
            }

            current = scope.parent;
        }

        None
    }
}
