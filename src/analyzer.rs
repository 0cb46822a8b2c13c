//! Builds symbol trees from the capture query of a language.
//!
//! Every query match becomes a capture group. Groups are walked in source
//! order (outer constructs first) and dispatched on their head capture, the
//! first capture whose tag has no `.`:
//!
//! - `import` resolves a dependency edge through the language analyzer
//! - `class` opens a child scope at `class.body`
//! - `function`/`method` open a scope at the body and declare parameters in it
//! - `variable` and `assignment` declare values in the nearest scope
//! - `block` opens a scope at its own range

use std::cmp::Reverse;
use std::rc::Rc;

use streaming_iterator::StreamingIterator;
use tree_sitter::QueryCursor;

use crate::context::ContextData;
use crate::error::Result;
use crate::fs::{RawFs, ReadFileFs};
use crate::language::{ImportParams, LanguageAnalyzer};
use crate::node::SyntaxNode;
use crate::source::Document;
use crate::symbols::{Symbol, SymbolKind, SymbolRef, SymbolTree};

#[derive(Debug, Clone, Copy)]
struct Cap<'a> {
    tag: &'static str,
    node: SyntaxNode<'a>,
}

fn is_head(tag: &str) -> bool {
    !tag.contains('.')
}

fn first<'a>(captures: &[Cap<'a>], tag: &str) -> Option<SyntaxNode<'a>> {
    captures.iter().find(|c| c.tag == tag).map(|c| c.node)
}

/// Splits a flat capture list into groups, each starting at a head capture.
fn group_by_head<'a>(captures: &[Cap<'a>]) -> Vec<Vec<Cap<'a>>> {
    let mut groups: Vec<Vec<Cap<'a>>> = Vec::new();
    for cap in captures {
        if is_head(cap.tag) || groups.is_empty() {
            groups.push(vec![*cap]);
        } else if let Some(group) = groups.last_mut() {
            group.push(*cap);
        }
    }
    groups
}

/// Import edges found while analyzing a document, as `(label, path)`.
pub type ImportEdges = Vec<(String, String)>;

/// Populates the symbol tree of one document.
pub struct SymbolAnalyzer<'a> {
    cd: &'a ContextData,
    doc: &'a Document,
    analyzer: &'a dyn LanguageAnalyzer,
    fs: &'a dyn ReadFileFs,
    edges: ImportEdges,
}

impl<'a> SymbolAnalyzer<'a> {
    pub fn new(cd: &'a ContextData, doc: &'a Document, analyzer: &'a dyn LanguageAnalyzer) -> Self {
        Self {
            cd,
            doc,
            analyzer,
            fs: &RawFs,
            edges: Vec::new(),
        }
    }

    /// Resolves imports through `fs` instead of the host filesystem.
    pub fn with_fs(mut self, fs: &'a dyn ReadFileFs) -> Self {
        self.fs = fs;
        self
    }

    /// Declares every symbol of the document in `root` and returns the import edges.
    pub fn analyze(mut self, root: &SymbolTree) -> Result<ImportEdges> {
        let query = self.doc.language().symbols()?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, self.doc.root_node(), self.doc.contents().as_bytes());

        let mut groups: Vec<Vec<Cap<'a>>> = Vec::new();
        while let Some(m) = matches.next() {
            let mut captures: Vec<Cap<'a>> = m
                .captures
                .iter()
                .map(|c| Cap {
                    tag: query.capture_names()[c.index as usize],
                    node: SyntaxNode::new(self.doc, c.node),
                })
                .collect();
            captures.sort_by_key(|c| {
                (
                    c.node.start_byte(),
                    Reverse(c.node.end_byte()),
                    c.tag.matches('.').count(),
                )
            });
            if let Some(pos) = captures.iter().position(|c| is_head(c.tag)) {
                let head = captures.remove(pos);
                captures.insert(0, head);
                groups.push(captures);
            }
        }
        groups.sort_by_key(|g| (g[0].node.start_byte(), Reverse(g[0].node.end_byte())));

        for group in &groups {
            let scope = root.nearest_scope(group[0].node.start_byte());
            self.dispatch(&scope, group);
        }
        Ok(self.edges)
    }

    fn dispatch(&mut self, scope: &SymbolTree, captures: &[Cap<'a>]) {
        let Some((head, rest)) = captures.split_first() else {
            return;
        };
        match head.tag {
            "import" => self.import(scope, head, rest),
            "class" => self.class(scope, head, rest),
            "function" => self.function(scope, head, rest, SymbolKind::Function),
            "method" => self.function(scope, head, rest, SymbolKind::Method),
            "variable" => self.variable(scope, head, rest),
            "assignment" => self.assignment(scope, head, rest),
            "block" => self.block(scope, head, rest),
            other => log::trace!("skipping capture group {}", other),
        }
    }

    fn dispatch_nested(&mut self, scope: &SymbolTree, captures: &[Cap<'a>]) {
        for group in group_by_head(captures) {
            self.dispatch(scope, &group);
        }
    }

    fn value_of(&self, node: Option<SyntaxNode<'a>>) -> SymbolRef {
        match node {
            Some(node) => self.analyzer.analyze_node(self.cd, node),
            None => self.analyzer.fallback_symbol(),
        }
    }

    fn import(&mut self, scope: &SymbolTree, head: &Cap<'a>, rest: &[Cap<'a>]) {
        let resolved = self.analyzer.analyze_import(
            self.cd,
            ImportParams {
                node: head.node,
                name: first(rest, "import.name"),
                current_path: self.doc.path(),
                fs: self.fs,
            },
        );
        if resolved.path.is_empty() {
            return;
        }

        self.edges.push((resolved.name.clone(), resolved.path.clone()));
        scope.add(Rc::new(Symbol::Import {
            alias: resolved.name,
            path: resolved.path,
            location: head.node.location(),
            symbols: resolved.symbols,
        }));
    }

    fn class(&mut self, scope: &SymbolTree, head: &Cap<'a>, rest: &[Cap<'a>]) {
        let Some(name) = first(rest, "class.name") else {
            return;
        };
        let children = first(rest, "class.body")
            .map(|body| scope.create_child(body.start_position(), body.end_position()));

        scope.add(Rc::new(Symbol::TopLevel {
            name: name.text().to_string(),
            kind: SymbolKind::Class,
            location: head.node.location(),
            children: children.clone(),
            return_type: None,
        }));

        if let Some(child) = children {
            let nested: Vec<Cap<'a>> = rest
                .iter()
                .filter(|c| !c.tag.starts_with("class."))
                .copied()
                .collect();
            self.dispatch_nested(&child, &nested);
        }
    }

    fn function(&mut self, scope: &SymbolTree, head: &Cap<'a>, rest: &[Cap<'a>], kind: SymbolKind) {
        let prefix = head.tag;
        let Some(name) = first(rest, &format!("{}.name", prefix)) else {
            return;
        };
        let children = first(rest, &format!("{}.body", prefix))
            .map(|body| scope.create_child(body.start_position(), body.end_position()));

        if let Some(child) = &children {
            for param in parameters(rest) {
                let Some(param_name) = param.name else {
                    continue;
                };
                child.add(Rc::new(Symbol::Variable {
                    name: param_name.text().to_string(),
                    location: param.node.unwrap_or(param_name).location(),
                    return_type: self.value_of(param.return_type),
                    is_param: true,
                }));
            }
        }

        let return_type = self.value_of(first(rest, &format!("{}.return-type", prefix)));
        scope.add(Rc::new(Symbol::TopLevel {
            name: name.text().to_string(),
            kind,
            location: head.node.location(),
            children,
            return_type: Some(return_type),
        }));
    }

    fn variable(&mut self, scope: &SymbolTree, head: &Cap<'a>, rest: &[Cap<'a>]) {
        let return_type = match first(rest, "variable.return-type") {
            Some(node) => self.value_of(Some(node)),
            None => self.value_of(first(rest, "variable.content")),
        };

        for name in rest.iter().filter(|c| c.tag == "variable.name") {
            scope.add(Rc::new(Symbol::Variable {
                name: name.node.text().to_string(),
                location: head.node.location(),
                return_type: Rc::clone(&return_type),
                is_param: false,
            }));
        }
    }

    fn assignment(&mut self, scope: &SymbolTree, head: &Cap<'a>, rest: &[Cap<'a>]) {
        let Some(name) = first(rest, "assignment.name") else {
            return;
        };
        let content_return_type = self.value_of(first(rest, "assignment.content"));
        scope.add(Rc::new(Symbol::Assignment {
            variable: scope.find(name.text()),
            fallback_name: name.text().to_string(),
            location: head.node.location(),
            content_return_type,
        }));
    }

    fn block(&mut self, scope: &SymbolTree, head: &Cap<'a>, rest: &[Cap<'a>]) {
        let child = scope.create_child(head.node.start_position(), head.node.end_position());
        let nested: Vec<Cap<'a>> = rest
            .iter()
            .filter(|c| !c.tag.starts_with("block."))
            .copied()
            .collect();
        self.dispatch_nested(&child, &nested);
    }
}

#[derive(Default)]
struct Param<'a> {
    node: Option<SyntaxNode<'a>>,
    name: Option<SyntaxNode<'a>>,
    return_type: Option<SyntaxNode<'a>>,
}

/// Reads the repeating `parameter` group; each `parameter` capture starts a new record.
fn parameters<'a>(captures: &[Cap<'a>]) -> Vec<Param<'a>> {
    let mut params: Vec<Param<'a>> = Vec::new();
    for cap in captures {
        match cap.tag {
            "parameter" => params.push(Param {
                node: Some(cap.node),
                ..Default::default()
            }),
            "parameter.name" | "parameter.return-type" => {
                let needs_new = params.last().map_or(true, |p| match cap.tag {
                    "parameter.name" => p.name.is_some(),
                    _ => p.return_type.is_some(),
                });
                if needs_new {
                    params.push(Param::default());
                }
                if let Some(param) = params.last_mut() {
                    if cap.tag == "parameter.name" {
                        param.name = Some(cap.node);
                    } else {
                        param.return_type = Some(cap.node);
                    }
                }
            }
            _ => {}
        }
    }
    params
}
