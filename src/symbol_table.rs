// File: src/symbol_table.rs
//
// Symbol table tree built up during parsing. A new scope is pushed only
// at function boundaries (if/for bodies share their enclosing function's
// scope) so block statements never shadow anything. The global scope is
// the tree's root; every function scope is an ordered child of it (or of
// another function scope, for nested function definitions), linked by an
// `outer` pointer for resolution and kept in an `inner` list so the
// compiler can re-enter a scope by name once it starts the separate
// compile pass over the same AST.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    Global,
    Local,
    Builtin,
    /// The function's own name, bound inside its own scope so a function
    /// body can call itself recursively before the outer `var`/`def`
    /// binding exists.
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: u16,
}

pub struct SymbolTableNode {
    pub outer: Option<Rc<RefCell<SymbolTableNode>>>,
    pub inner: Vec<Rc<RefCell<SymbolTableNode>>>,
    /// Name of the function this scope belongs to; `None` for the global
    /// scope. Used by `find_child` to re-enter a scope by name.
    pub block_name: Option<String>,
    store: HashMap<String, Symbol>,
    num_definitions: u16,
    /// Method names interned across the whole tree, shared (not copied)
    /// from parent to child so every scope addresses the same table by
    /// index (`OpCallMethod`'s operand).
    pub methods: Rc<RefCell<Vec<String>>>,
}

pub type SymbolTable = Rc<RefCell<SymbolTableNode>>;

pub fn new_global() -> SymbolTable {
    Rc::new(RefCell::new(SymbolTableNode {
        outer: None,
        inner: Vec::new(),
        block_name: None,
        store: HashMap::new(),
        num_definitions: 0,
        methods: Rc::new(RefCell::new(Vec::new())),
    }))
}

pub fn new_enclosed(outer: &SymbolTable, block_name: impl Into<String>) -> SymbolTable {
    let methods = Rc::clone(&outer.borrow().methods);
    let child = Rc::new(RefCell::new(SymbolTableNode {
        outer: Some(Rc::clone(outer)),
        inner: Vec::new(),
        block_name: Some(block_name.into()),
        store: HashMap::new(),
        num_definitions: 0,
        methods,
    }));
    outer.borrow_mut().inner.push(Rc::clone(&child));
    child
}

impl SymbolTableNode {
    pub fn define(&mut self, name: &str) -> Symbol {
        // Redefinition within one scope rebinds the existing slot rather
        // than allocating a new one, so slot ids stay dense (0..n-1) even
        // when a name is shadowed by a later `var` in the same scope.
        if let Some(existing) = self.store.get(name) {
            let symbol = Symbol { index: existing.index, ..existing.clone() };
            self.store.insert(name.to_string(), symbol.clone());
            return symbol;
        }
        let scope = if self.outer.is_none() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let symbol = Symbol { name: name.to_string(), scope, index: self.num_definitions };
        self.store.insert(name.to_string(), symbol.clone());
        self.num_definitions += 1;
        symbol
    }

    pub fn define_function_name(&mut self, name: &str) -> Symbol {
        let symbol = Symbol { name: name.to_string(), scope: SymbolScope::Function, index: 0 };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    pub fn define_builtin(&mut self, index: u16, name: &str) -> Symbol {
        let symbol = Symbol { name: name.to_string(), scope: SymbolScope::Builtin, index };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        if let Some(sym) = self.store.get(name) {
            return Some(sym.clone());
        }
        match &self.outer {
            Some(outer) => outer.borrow().resolve(name),
            None => None,
        }
    }

    pub fn num_definitions(&self) -> u16 {
        self.num_definitions
    }

    /// Breadth-first search of this node's children for a scope previously
    /// created with `block_name == name`. Lets the compiler, which walks
    /// the AST in a second pass, find the exact scope the parser built for
    /// a given function definition without threading the `Rc` through the
    /// AST itself.
    pub fn find_child(&self, name: &str) -> Option<Rc<RefCell<SymbolTableNode>>> {
        let mut queue: Vec<Rc<RefCell<SymbolTableNode>>> = self.inner.clone();
        while let Some(node) = queue.first().cloned() {
            queue.remove(0);
            let node_ref = node.borrow();
            if node_ref.block_name.as_deref() == Some(name) {
                drop(node_ref);
                return Some(node);
            }
            queue.extend(node_ref.inner.iter().cloned());
        }
        None
    }

    /// All names resolvable from this scope (this scope's own bindings
    /// plus every outer scope's), used only for "did you mean?" compile
    /// error suggestions — never for actual resolution.
    pub fn all_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.store.keys().cloned().collect();
        if let Some(outer) = &self.outer {
            names.extend(outer.borrow().all_names());
        }
        names
    }

    pub fn intern_method(&self, name: &str) -> u16 {
        let mut methods = self.methods.borrow_mut();
        if let Some(pos) = methods.iter().position(|m| m == name) {
            return pos as u16;
        }
        methods.push(name.to_string());
        (methods.len() - 1) as u16
    }
}
