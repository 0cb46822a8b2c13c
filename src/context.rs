//! Per-analysis state shared by the engine, the analyzers and the template hooks.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::depgraph::DepGraph;
use crate::language::LanguageAnalyzer;
use crate::node::{NodeRef, SyntaxNode};
use crate::source::Document;
use crate::symbols::{SymbolRef, SymbolTree};
use crate::trace::{StackTraceEntry, TraceStack};

/// Documents, their symbol trees and the import graph between them.
#[derive(Debug, Default)]
pub struct Store {
    pub documents: HashMap<String, Rc<Document>>,
    pub symbols: HashMap<String, SymbolTree>,
    pub dep_graph: DepGraph,
}

impl Store {
    /// Stores a document, replacing a previous version of the same path.
    pub fn insert_document(&mut self, doc: Rc<Document>) {
        self.documents.insert(doc.path().to_string(), doc);
    }

    /// Starts a fresh symbol tree for `path`, dropping the previous one.
    pub fn reset_symbol_tree(&mut self, path: &str) -> SymbolTree {
        let tree = SymbolTree::new(path);
        self.symbols.insert(path.to_string(), tree.clone());
        tree
    }
}

/// The frame an error is reported for and the syntax node it points at.
pub struct MainError {
    pub error_node: StackTraceEntry,
    pub document: Rc<Document>,
    pub nearest: Option<NodeRef>,
    /// Value attached by a template's analyze hook for its explain and fix hooks.
    pub context: Option<Box<dyn Any>>,
}

impl MainError {
    pub fn new(error_node: StackTraceEntry, document: Rc<Document>) -> Self {
        Self {
            error_node,
            document,
            nearest: None,
            context: None,
        }
    }

    pub fn nearest(&self) -> Option<SyntaxNode<'_>> {
        self.nearest?.resolve(&self.document)
    }

    pub fn set_nearest(&mut self, node: NodeRef) {
        self.nearest = Some(node);
    }

    pub fn context<T: 'static>(&self) -> Option<&T> {
        self.context.as_ref()?.downcast_ref::<T>()
    }

    pub fn set_context<T: 'static>(&mut self, value: T) {
        self.context = Some(Box::new(value));
    }
}

impl fmt::Debug for MainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainError")
            .field("error_node", &self.error_node)
            .field("document", &self.document.path())
            .field("nearest", &self.nearest)
            .finish_non_exhaustive()
    }
}

/// Everything known about one error message while it is being analyzed.
pub struct ContextData {
    pub store: Store,
    pub analyzer: Option<Box<dyn LanguageAnalyzer>>,
    pub working_path: String,
    pub current_document_path: String,
    pub variables: HashMap<String, String>,
    pub trace_stack: TraceStack,
    pub main_error: Option<MainError>,
}

impl ContextData {
    pub fn new(working_path: impl Into<String>) -> Self {
        Self {
            store: Store::default(),
            analyzer: None,
            working_path: working_path.into(),
            current_document_path: String::new(),
            variables: HashMap::new(),
            trace_stack: TraceStack::new(),
            main_error: None,
        }
    }

    pub fn analyzer(&self) -> Option<&dyn LanguageAnalyzer> {
        self.analyzer.as_deref()
    }

    pub fn main_error(&self) -> Option<&MainError> {
        self.main_error.as_ref()
    }

    pub fn document(&self, path: &str) -> Option<&Rc<Document>> {
        self.store.documents.get(path)
    }

    pub fn current_document(&self) -> Option<&Rc<Document>> {
        self.document(&self.current_document_path)
    }

    pub fn symbol_tree(&self, path: &str) -> Option<&SymbolTree> {
        self.store.symbols.get(path)
    }

    pub fn init_or_get_symbol_tree(&mut self, path: &str) -> SymbolTree {
        self.store
            .symbols
            .entry(path.to_string())
            .or_insert_with(|| SymbolTree::new(path))
            .clone()
    }

    /// Resolves `name` in the scope of the current document at byte `index`,
    /// falling back to the builtins of the analyzer.
    pub fn find_symbol(&self, name: &str, index: usize) -> Option<SymbolRef> {
        self.symbol_tree(&self.current_document_path)
            .and_then(|tree| tree.find_at(name, index))
            .or_else(|| self.analyzer()?.find_symbol(name))
    }

    pub fn add_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// The value of a template variable, or "" when it was not captured.
    pub fn variable(&self, name: &str) -> &str {
        self.variables.get(name).map(String::as_str).unwrap_or("")
    }
}

impl fmt::Debug for ContextData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextData")
            .field("working_path", &self.working_path)
            .field("current_document_path", &self.current_document_path)
            .field("variables", &self.variables)
            .field("trace_stack", &self.trace_stack)
            .field("main_error", &self.main_error)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Location, Position};
    use crate::symbols::Symbol;

    #[test]
    fn test_find_symbol_uses_current_document() {
        let mut cd = ContextData::new("/work");
        let tree = cd.init_or_get_symbol_tree("/work/a.py");
        tree.add(Rc::new(Symbol::Variable {
            name: "a".to_string(),
            location: Location::new("/work/a.py", Position::with_index(0, 0, 0), Position::with_index(0, 5, 5)),
            return_type: Symbol::builtin("int"),
            is_param: false,
        }));

        assert!(cd.find_symbol("a", 0).is_none());
        cd.current_document_path = "/work/a.py".to_string();
        assert_eq!(cd.find_symbol("a", 2).unwrap().name(), "a");
        assert!(cd.init_or_get_symbol_tree("/work/a.py").ptr_eq(&tree));
    }

    #[test]
    fn test_variables() {
        let mut cd = ContextData::new("/work");
        cd.add_variable("input", "123abc");
        assert_eq!(cd.variable("input"), "123abc");
        assert_eq!(cd.variable("missing"), "");
    }
}
