use std::{
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
};

use crate::{
    errors::errors::{Error, ErrorImpl, InternalError},
    Position,
};

use super::{
    ast::{DeclExpr, Expr},
    types::Type,
};

pub type ScopeRef = Rc<RefCell<Scope>>;
pub type SymbolRef = Rc<RefCell<Symbol>>;

/// What a symbol names. Function symbols carry their defining declaration.
#[derive(Debug)]
pub enum SymbolKind {
    Function(Rc<DeclExpr>),
    Variable,
}

/// One declared name.
///
/// `ty` is None until declared or inferred from a first assignment. `def`
/// tracks the node that last provided the symbol's value. `offset` is the
/// stack slot, assigned exactly once when storage is allocated during code
/// generation; only variables and parameters ever receive one.
#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Option<Type>,
    pub def: Option<Rc<Expr>>,
    pub offset: Option<i32>,
    pub pos: Position,
}

impl Symbol {
    pub fn function(name: String, ty: Option<Type>, decl: Rc<DeclExpr>, pos: Position) -> Self {
        Symbol {
            name,
            kind: SymbolKind::Function(decl),
            ty,
            def: None,
            offset: None,
            pos,
        }
    }

    pub fn variable(name: String, ty: Option<Type>, pos: Position) -> Self {
        Symbol {
            name,
            kind: SymbolKind::Variable,
            ty,
            def: None,
            offset: None,
            pos,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function(_))
    }

    /// Assigns the symbol's stack slot.
    ///
    /// A slot is assigned once, at the point storage is allocated. Re-running
    /// a pass over the same tree re-derives the same value, which is
    /// accepted; a *different* value means two allocations disagreed and the
    /// analysis is in an inconsistent state.
    pub fn assign_offset(&mut self, offset: i32) -> Result<(), InternalError> {
        match self.offset {
            None => {
                self.offset = Some(offset);
                Ok(())
            }
            Some(existing) if existing == offset => Ok(()),
            Some(_) => Err(InternalError::SlotReassigned {
                name: self.name.clone(),
            }),
        }
    }
}

/// A nested symbol table.
///
/// Lookup resolves a name in this scope, then in each ancestor in order, so
/// shadowing resolves to the nearest enclosing definition. Declarations keep
/// their insertion order; the declaration emitter's two scans rely on it for
/// deterministic output.
#[derive(Debug, Default)]
pub struct Scope {
    table: HashMap<String, SymbolRef>,
    order: Vec<String>,
    parent: Option<Weak<RefCell<Scope>>>,
}

impl Scope {
    pub fn root() -> ScopeRef {
        Rc::new(RefCell::new(Scope::default()))
    }

    pub fn nested(parent: &ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            table: HashMap::new(),
            order: Vec::new(),
            parent: Some(Rc::downgrade(parent)),
        }))
    }

    pub fn declare(&mut self, symbol: Symbol) -> Result<SymbolRef, Error> {
        if self.table.contains_key(&symbol.name) {
            return Err(Error::new(
                ErrorImpl::AlreadyDeclared {
                    name: symbol.name.clone(),
                },
                symbol.pos.clone(),
            ));
        }

        let name = symbol.name.clone();
        let symbol = Rc::new(RefCell::new(symbol));
        self.table.insert(name.clone(), Rc::clone(&symbol));
        self.order.push(name);
        Ok(symbol)
    }

    /// Resolves a name in this scope only.
    pub fn get(&self, name: &str) -> Option<SymbolRef> {
        self.table.get(name).map(Rc::clone)
    }

    /// Resolves a name through this scope and its ancestors.
    pub fn lookup(&self, name: &str) -> Option<SymbolRef> {
        if let Some(symbol) = self.table.get(name) {
            return Some(Rc::clone(symbol));
        }

        match &self.parent {
            Some(parent) => parent
                .upgrade()
                .and_then(|parent| parent.borrow().lookup(name)),
            None => None,
        }
    }

    /// The scope's symbols in declaration order.
    pub fn decls_in_order(&self) -> Vec<SymbolRef> {
        self.order
            .iter()
            .filter_map(|name| self.get(name))
            .collect()
    }
}
