// File: src/symbol_table.rs
//
// Two-scope symbol resolution (spec.md §3, §4.2.2). A symbol table is
// pushed per lexical scope (function or the synthetic program scope);
// resolution walks outward but only a `Global` hit from an enclosing
// scope is legitimate — an outward hit on another function's `Local` is
// the unsupported closure-over-local case spec.md §9 calls out.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Local,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub scope: Scope,
    pub index: u16,
}

pub struct SymbolTable {
    outer: Option<Rc<RefCell<SymbolTable>>>,
    store: HashMap<String, Symbol>,
    pub size: u16,
}

impl SymbolTable {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self { outer: None, store: HashMap::new(), size: 0 }))
    }

    pub fn enclosed(outer: Rc<RefCell<SymbolTable>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self { outer: Some(outer), store: HashMap::new(), size: 0 }))
    }

    fn is_global(&self) -> bool {
        self.outer.is_none()
    }

    pub fn outer(&self) -> Option<Rc<RefCell<SymbolTable>>> {
        self.outer.clone()
    }

    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.is_global() { Scope::Global } else { Scope::Local };
        let symbol = Symbol { name: name.to_string(), scope, index: self.size };
        self.size += 1;
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Resolves `name`, walking outward. Returns `Ok(None)` rather than
    /// an error for "not found anywhere" (the caller has source location
    /// context for a better diagnostic); returns `Err(())` specifically
    /// for the unsupported case of resolving to a `Local` symbol defined
    /// in a non-immediate enclosing scope, i.e. a closure over a local.
    pub fn resolve(&self, name: &str) -> Result<Option<Symbol>, ()> {
        if let Some(symbol) = self.store.get(name) {
            return Ok(Some(symbol.clone()));
        }
        match &self.outer {
            None => Ok(None),
            Some(outer) => {
                let outer = outer.borrow();
                match outer.resolve(name)? {
                    Some(symbol) if symbol.scope == Scope::Global => Ok(Some(symbol)),
                    Some(_local) => Err(()),
                    None => Ok(None),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_scope_assigns_increasing_indices() {
        let table = SymbolTable::new();
        let a = table.borrow_mut().define("a");
        let b = table.borrow_mut().define("b");
        assert_eq!(a.scope, Scope::Global);
        assert_eq!(a.index, 0);
        assert_eq!(b.index, 1);
    }

    #[test]
    fn local_scope_resolves_own_locals() {
        let global = SymbolTable::new();
        global.borrow_mut().define("x");
        let local = SymbolTable::enclosed(global);
        let p = local.borrow_mut().define("p");
        assert_eq!(p.scope, Scope::Local);
        assert_eq!(local.borrow().resolve("p").unwrap().unwrap().scope, Scope::Local);
    }

    #[test]
    fn local_scope_resolves_outer_global() {
        let global = SymbolTable::new();
        global.borrow_mut().define("x");
        let local = SymbolTable::enclosed(global);
        let resolved = local.borrow().resolve("x").unwrap().unwrap();
        assert_eq!(resolved.scope, Scope::Global);
    }

    #[test]
    fn nested_local_capture_is_rejected() {
        let global = SymbolTable::new();
        let outer_fn = SymbolTable::enclosed(global);
        outer_fn.borrow_mut().define("captured");
        let inner_fn = SymbolTable::enclosed(outer_fn);
        assert_eq!(inner_fn.borrow().resolve("captured"), Err(()));
    }
}
