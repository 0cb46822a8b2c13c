use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::SymbolRef;
use crate::node::SyntaxNode;
use crate::source::Position;

struct Scope {
    parent: Weak<RefCell<Scope>>,
    document_path: String,
    start: Position,
    end: Position,
    symbols: Vec<SymbolRef>,
    scopes: Vec<SymbolTree>,
}

/// A lexical scope: the symbols declared in it and its nested scopes.
///
/// Every child scope lies within the range of its parent. Parents are held
/// weakly; ownership points from a scope to its children.
#[derive(Clone)]
pub struct SymbolTree(Rc<RefCell<Scope>>);

impl SymbolTree {
    /// Creates a root scope for a document.
    pub fn new(document_path: impl Into<String>) -> Self {
        Self::with_range(document_path, Position::default(), Position::default())
    }

    pub fn with_range(document_path: impl Into<String>, start: Position, end: Position) -> Self {
        SymbolTree(Rc::new(RefCell::new(Scope {
            parent: Weak::new(),
            document_path: document_path.into(),
            start,
            end,
            symbols: Vec::new(),
            scopes: Vec::new(),
        })))
    }

    pub fn ptr_eq(&self, other: &SymbolTree) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn parent(&self) -> Option<SymbolTree> {
        self.0.borrow().parent.upgrade().map(SymbolTree)
    }

    pub fn document_path(&self) -> String {
        self.0.borrow().document_path.clone()
    }

    pub fn start(&self) -> Position {
        self.0.borrow().start
    }

    pub fn end(&self) -> Position {
        self.0.borrow().end
    }

    pub fn symbols(&self) -> Vec<SymbolRef> {
        self.0.borrow().symbols.clone()
    }

    pub fn scopes(&self) -> Vec<SymbolTree> {
        self.0.borrow().scopes.clone()
    }

    pub fn contains_index(&self, index: usize) -> bool {
        let scope = self.0.borrow();
        scope.start.index <= index && index <= scope.end.index
    }

    fn widen(&self, start: Position, end: Position) {
        let mut scope = self.0.borrow_mut();
        if start.index < scope.start.index {
            scope.start = start;
        }
        if end.index > scope.end.index {
            scope.end = end;
        }
    }

    /// Declares a symbol in this scope. A symbol with the same name replaces
    /// the previous one.
    pub fn add(&self, sym: SymbolRef) {
        if let Some(loc) = sym.location() {
            self.widen(loc.start, loc.end);
        }

        if let Some(children) = sym.children() {
            self.attach(children);
            self.widen(children.start(), children.end());
        }

        let name = sym.name();
        let mut scope = self.0.borrow_mut();
        match scope.symbols.iter().position(|s| s.name() == name) {
            Some(i) => scope.symbols[i] = sym,
            None => scope.symbols.push(sym),
        }
    }

    fn attach(&self, child: &SymbolTree) {
        if self.0.borrow().scopes.iter().any(|s| s.ptr_eq(child)) {
            return;
        }
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0.borrow_mut().scopes.push(child.clone());
    }

    /// Looks `name` up in this scope only.
    pub fn get(&self, name: &str) -> Option<SymbolRef> {
        self.0
            .borrow()
            .symbols
            .iter()
            .find(|s| s.name() == name)
            .cloned()
    }

    /// Looks `name` up in this scope, then in the enclosing ones.
    pub fn find(&self, name: &str) -> Option<SymbolRef> {
        if let Some(sym) = self.get(name) {
            return Some(sym);
        }
        self.parent()?.find(name)
    }

    /// The innermost scope containing the byte index.
    pub fn nearest_scope(&self, index: usize) -> SymbolTree {
        let scopes = self.scopes();
        match scopes.into_iter().find(|s| s.contains_index(index)) {
            Some(child) => child.nearest_scope(index),
            None => self.clone(),
        }
    }

    pub fn find_at(&self, name: &str, index: usize) -> Option<SymbolRef> {
        self.nearest_scope(index).find(name)
    }

    /// Resolves the symbol an identifier node refers to.
    pub fn symbol_by_node(&self, node: SyntaxNode<'_>) -> Option<SymbolRef> {
        self.find_at(node.text(), node.start_byte())
    }

    /// Returns the child scope spanning exactly `[start, end]`, creating it if needed.
    pub fn create_child(&self, start: Position, end: Position) -> SymbolTree {
        let existing = self
            .0
            .borrow()
            .scopes
            .iter()
            .find(|s| s.start().index == start.index && s.end().index == end.index)
            .cloned();
        if let Some(child) = existing {
            return child;
        }

        let child = SymbolTree::with_range(self.document_path(), start, end);
        self.attach(&child);
        self.widen(start, end);
        child
    }
}

impl fmt::Debug for SymbolTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = self.0.borrow();
        let names: Vec<String> = scope.symbols.iter().map(|s| s.name()).collect();
        f.debug_struct("SymbolTree")
            .field("document_path", &scope.document_path)
            .field("start", &scope.start)
            .field("end", &scope.end)
            .field("symbols", &names)
            .field("scopes", &scope.scopes)
            .finish()
    }
}
