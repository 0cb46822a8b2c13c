//! Syntax-node helpers bound to their owning document.

use std::fmt;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Point, QueryCursor, TreeCursor};

use crate::error::Result;
use crate::source::{Document, Location, Position};

/// A tree-sitter node together with the document it was parsed from.
#[derive(Clone, Copy)]
pub struct SyntaxNode<'a> {
    doc: &'a Document,
    node: Node<'a>,
}

impl<'a> SyntaxNode<'a> {
    pub fn new(doc: &'a Document, node: Node<'a>) -> Self {
        Self { doc, node }
    }

    /// The root node of `doc`.
    pub fn root(doc: &'a Document) -> Self {
        Self::new(doc, doc.root_node())
    }

    pub fn raw(&self) -> Node<'a> {
        self.node
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn text(&self) -> &'a str {
        self.node
            .utf8_text(self.doc.contents().as_bytes())
            .unwrap_or("")
    }

    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    pub fn is_named(&self) -> bool {
        self.node.is_named()
    }

    pub fn is_error(&self) -> bool {
        self.node.is_error()
    }

    pub fn start_position(&self) -> Position {
        Position::from_point(self.node.start_position(), self.node.start_byte())
    }

    pub fn end_position(&self) -> Position {
        Position::from_point(self.node.end_position(), self.node.end_byte())
    }

    pub fn start_byte(&self) -> usize {
        self.node.start_byte()
    }

    pub fn end_byte(&self) -> usize {
        self.node.end_byte()
    }

    pub fn location(&self) -> Location {
        Location::from_node(self.doc.path(), self.node)
    }

    fn wrap(&self, node: Option<Node<'a>>) -> Option<SyntaxNode<'a>> {
        node.map(|n| Self::new(self.doc, n))
    }

    pub fn parent(&self) -> Option<SyntaxNode<'a>> {
        self.wrap(self.node.parent())
    }

    pub fn child_by_field_name(&self, name: &str) -> Option<SyntaxNode<'a>> {
        self.wrap(self.node.child_by_field_name(name))
    }

    pub fn named_child(&self, i: usize) -> Option<SyntaxNode<'a>> {
        self.wrap(self.node.named_child(i))
    }

    pub fn named_child_count(&self) -> usize {
        self.node.named_child_count()
    }

    pub fn named_children(&self) -> Vec<SyntaxNode<'a>> {
        (0..self.named_child_count())
            .filter_map(|i| self.named_child(i))
            .collect()
    }

    pub fn prev_named_sibling(&self) -> Option<SyntaxNode<'a>> {
        self.wrap(self.node.prev_named_sibling())
    }

    /// Walks up the parents until `pred` holds, starting with this node.
    pub fn ancestor(&self, pred: impl Fn(&SyntaxNode<'a>) -> bool) -> Option<SyntaxNode<'a>> {
        let mut current = Some(*self);
        while let Some(node) = current {
            if pred(&node) {
                return Some(node);
            }
            current = node.parent();
        }
        None
    }

    /// Runs `query` below this node and returns every capture in match order.
    pub fn captures(&self, query: &str) -> Result<Vec<Capture<'a>>> {
        let query = self.doc.language().query(query)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&*query, self.node, self.doc.contents().as_bytes());

        let mut captures = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                captures.push(Capture {
                    name: query.capture_names()[capture.index as usize].to_string(),
                    node: Self::new(self.doc, capture.node),
                });
            }
        }
        Ok(captures)
    }

    /// The first node captured as `name` that satisfies `pred`.
    pub fn find_capture(
        &self,
        query: &str,
        name: &str,
        pred: impl Fn(&SyntaxNode<'a>) -> bool,
    ) -> Result<Option<SyntaxNode<'a>>> {
        Ok(self
            .captures(query)?
            .into_iter()
            .find(|c| c.name == name && pred(&c.node))
            .map(|c| c.node))
    }

    pub fn to_ref(&self) -> NodeRef {
        NodeRef::from_node(self.node)
    }
}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] - [{}] in {}",
            self.kind(),
            self.start_position(),
            self.end_position(),
            self.doc.path()
        )
    }
}

/// A query capture.
#[derive(Debug, Clone)]
pub struct Capture<'a> {
    pub name: String,
    pub node: SyntaxNode<'a>,
}

/// An owned reference to a node that can be resolved again against its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef {
    pub kind: &'static str,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl NodeRef {
    pub fn from_node(node: Node) -> Self {
        Self {
            kind: node.kind(),
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }

    pub fn resolve<'a>(&self, doc: &'a Document) -> Option<SyntaxNode<'a>> {
        let mut node = doc
            .root_node()
            .descendant_for_byte_range(self.start_byte, self.end_byte)?;
        loop {
            if node.kind() == self.kind
                && node.start_byte() == self.start_byte
                && node.end_byte() == self.end_byte
            {
                return Some(SyntaxNode::new(doc, node));
            }
            match node.parent() {
                Some(parent) if parent.start_byte() == self.start_byte => node = parent,
                _ => return Some(SyntaxNode::new(doc, node)),
            }
        }
    }
}

/// Locates the syntax node reported by a stack frame.
///
/// `row` is 0-based. The search starts at the smallest named node spanning
/// the non-blank text of the line; when that node starts on another row the
/// cursor descends into the child that starts on the row, or else the child
/// whose span covers it.
pub fn nearest_node_at_line(doc: &Document, row: usize) -> Option<SyntaxNode<'_>> {
    let line = doc.line_at(row);
    let start_col = line.len() - line.trim_start().len();
    let end_col = line.trim_end().len().max(start_col);

    let root = doc.root_node();
    let descendant = root
        .named_descendant_for_point_range(Point::new(row, start_col), Point::new(row, end_col))
        .unwrap_or(root);
    if descendant.start_position().row == row {
        return Some(SyntaxNode::new(doc, descendant));
    }

    let mut cursor = descendant.walk();
    let found = descend_to_row(&mut cursor, row).unwrap_or(descendant);
    Some(SyntaxNode::new(doc, found))
}

fn descend_to_row<'a>(cursor: &mut TreeCursor<'a>, row: usize) -> Option<Node<'a>> {
    let mut covering = None;
    if !cursor.goto_first_child() {
        return None;
    }
    loop {
        let node = cursor.node();
        if node.is_named() {
            if node.start_position().row == row {
                return Some(node);
            }
            if covering.is_none()
                && node.start_position().row < row
                && node.end_position().row >= row
            {
                covering = Some(node);
            }
        }
        if !cursor.goto_next_sibling() {
            break;
        }
    }

    let covering = covering?;
    cursor.reset(covering);
    descend_to_row(cursor, row).or(Some(covering))
}
