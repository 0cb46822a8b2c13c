//! Source documents and the in-memory change-set model used to render fixes.

use std::fmt;
use std::ops::Add;
use std::rc::Rc;

use tree_sitter::{Node, Parser, Point, Tree};

use crate::error::{Error, Result};
use crate::language::Language;

/// A position inside a document. Lines and columns are 0-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    /// Byte offset from the start of the document.
    pub index: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            line,
            column,
            index: 0,
        }
    }

    pub fn with_index(line: usize, column: usize, index: usize) -> Self {
        Self {
            line,
            column,
            index,
        }
    }

    pub fn from_point(point: Point, index: usize) -> Self {
        Self::with_index(point.row, point.column, index)
    }

    pub fn to_point(self) -> Point {
        Point::new(self.line, self.column)
    }

    /// Moves the position by a delta, saturating at zero.
    pub fn shift(self, delta: PositionDelta) -> Self {
        Self {
            line: offset(self.line, delta.line),
            column: offset(self.column, delta.column),
            index: offset(self.index, delta.index),
        }
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position {
            line: self.line + rhs.line,
            column: self.column + rhs.column,
            index: self.index + rhs.index,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

fn offset(value: usize, by: isize) -> usize {
    if by < 0 {
        value.saturating_sub(by.unsigned_abs())
    } else {
        value + by as usize
    }
}

/// The shift an edit produces on the positions that follow it.
///
/// `column` only applies to positions on the line where the edit ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionDelta {
    pub line: isize,
    pub column: isize,
    pub index: isize,
}

impl PositionDelta {
    pub fn is_zero(&self) -> bool {
        self.line == 0 && self.column == 0 && self.index == 0
    }
}

impl Add for PositionDelta {
    type Output = PositionDelta;

    fn add(self, rhs: PositionDelta) -> PositionDelta {
        PositionDelta {
            line: self.line + rhs.line,
            column: self.column + rhs.column,
            index: self.index + rhs.index,
        }
    }
}

/// A range inside a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub document_path: String,
    pub start: Position,
    pub end: Position,
}

impl Location {
    pub fn new(document_path: impl Into<String>, start: Position, end: Position) -> Self {
        Self {
            document_path: document_path.into(),
            start,
            end,
        }
    }

    /// A zero-width location.
    pub fn at(document_path: impl Into<String>, position: Position) -> Self {
        Self::new(document_path, position, position)
    }

    pub fn from_node(document_path: impl Into<String>, node: Node) -> Self {
        Self::new(
            document_path,
            Position::from_point(node.start_position(), node.start_byte()),
            Position::from_point(node.end_position(), node.end_byte()),
        )
    }
}

/// A single text replacement over `[start, end)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    pub id: usize,
    pub new_text: String,
    pub start: Position,
    pub end: Position,
}

impl Changeset {
    pub fn new(new_text: impl Into<String>, start: Position, end: Position) -> Self {
        Self {
            id: 0,
            new_text: new_text.into(),
            start,
            end,
        }
    }

    pub fn insert(new_text: impl Into<String>, at: Position) -> Self {
        Self::new(new_text, at, at)
    }

    pub fn delete(start: Position, end: Position) -> Self {
        Self::new("", start, end)
    }
}

/// A parsed source file.
#[derive(Debug)]
pub struct Document {
    path: String,
    contents: String,
    lines: Vec<String>,
    language: &'static Language,
    tree: Tree,
}

impl Document {
    /// Parses `contents` with the grammar of `language`.
    ///
    /// Trees containing error nodes are kept; only a missing tree is an error.
    pub fn parse(
        path: impl Into<String>,
        contents: impl Into<String>,
        language: &'static Language,
        parser: &mut Parser,
    ) -> Result<Self> {
        let path = path.into();
        let contents = contents.into();
        parser
            .set_language(&language.grammar())
            .map_err(|e| Error::Grammar {
                language: language.name.to_string(),
                message: e.to_string(),
            })?;
        let tree = parser
            .parse(&contents, None)
            .ok_or_else(|| Error::Parse { path: path.clone() })?;
        Ok(Self::new(path, contents, language, tree))
    }

    pub fn new(
        path: impl Into<String>,
        contents: impl Into<String>,
        language: &'static Language,
        tree: Tree,
    ) -> Self {
        let contents = contents.into();
        let lines = split_lines(&contents);
        Self {
            path: path.into(),
            contents,
            lines,
            language,
            tree,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn language(&self) -> &'static Language {
        self.language
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The line at `n`, or "" when out of range.
    pub fn line_at(&self, n: usize) -> &str {
        self.lines.get(n).map(String::as_str).unwrap_or("")
    }

    /// The original lines in `[from, to)`.
    pub fn lines_at(&self, from: usize, to: usize) -> &[String] {
        let (from, to) = clamp_span(from, to, self.lines.len());
        &self.lines[from..to]
    }

    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    /// Starts a scratch layer of edits over this document.
    pub fn editable(self: &Rc<Self>) -> EditableDocument {
        EditableDocument::new(Rc::clone(self))
    }
}

/// Splits on `\n`, dropping the `\r` of CRLF line endings.
fn split_lines(contents: &str) -> Vec<String> {
    contents
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

fn clamp_span(from: usize, to: usize, len: usize) -> (usize, usize) {
    let (from, to) = if to < from { (to, from) } else { (from, to) };
    (from.min(len), to.min(len))
}

/// A document plus an ordered list of applied change-sets.
///
/// Applying the change-sets in order to the original contents always yields
/// the current modified lines.
#[derive(Debug, Clone)]
pub struct EditableDocument {
    document: Rc<Document>,
    modified_lines: Vec<String>,
    changesets: Vec<Changeset>,
}

impl EditableDocument {
    pub fn new(document: Rc<Document>) -> Self {
        let modified_lines = document.lines.clone();
        Self {
            document,
            modified_lines,
            changesets: Vec::new(),
        }
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    pub fn changesets(&self) -> &[Changeset] {
        &self.changesets
    }

    pub fn modified_lines(&self) -> &[String] {
        &self.modified_lines
    }

    pub fn modified_line_at(&self, n: usize) -> &str {
        self.modified_lines.get(n).map(String::as_str).unwrap_or("")
    }

    pub fn modified_lines_at(&self, from: usize, to: usize) -> &[String] {
        let (from, to) = clamp_span(from, to, self.modified_lines.len());
        &self.modified_lines[from..to]
    }

    pub fn total_lines(&self) -> usize {
        self.modified_lines.len()
    }

    /// Drops every change-set and restores the original lines.
    pub fn reset(&mut self) {
        self.modified_lines = self.document.lines.clone();
        self.changesets.clear();
    }

    /// Returns `pos` with its byte index computed against the modified text.
    pub fn fill_index(&self, pos: Position) -> Position {
        let pos = self.clamp(pos);
        let index = self.modified_lines[..pos.line]
            .iter()
            .map(|l| l.len() + 1)
            .sum::<usize>()
            + pos.column;
        Position::with_index(pos.line, pos.column, index)
    }

    fn clamp(&self, pos: Position) -> Position {
        let line = pos.line.min(self.modified_lines.len().saturating_sub(1));
        let text = &self.modified_lines[line];
        let mut column = pos.column.min(text.len());
        while !text.is_char_boundary(column) {
            column -= 1;
        }
        Position::with_index(line, column, pos.index)
    }

    /// Applies a change-set and returns the shift it produced.
    pub fn apply(&mut self, changeset: Changeset) -> PositionDelta {
        let start = self.fill_index(changeset.start);
        let mut end = self.fill_index(changeset.end);
        if end < start {
            end = start;
        }
        if changeset.new_text.is_empty() && start == end {
            return PositionDelta::default();
        }

        let delta = if changeset.new_text.is_empty()
            && start.column == 0
            && end.column == self.modified_lines[end.line].len()
        {
            self.remove_lines(start.line, end.line, end.index - start.index)
        } else {
            self.splice(&changeset.new_text, start, end)
        };

        self.changesets.push(Changeset {
            id: self.changesets.len() + 1,
            new_text: changeset.new_text,
            start,
            end,
        });
        delta
    }

    fn remove_lines(&mut self, from: usize, to: usize, removed_bytes: usize) -> PositionDelta {
        let count = to - from + 1;
        self.modified_lines.drain(from..=to);
        let mut removed_index = removed_bytes as isize;
        if self.modified_lines.is_empty() {
            self.modified_lines.push(String::new());
        } else {
            // the line break that joined the removed block
            removed_index += 1;
        }
        PositionDelta {
            line: -(count as isize),
            column: 0,
            index: -removed_index,
        }
    }

    fn splice(&mut self, new_text: &str, start: Position, end: Position) -> PositionDelta {
        let left = &self.modified_lines[start.line][..start.column];
        let right = &self.modified_lines[end.line][end.column..];
        let right_len = right.len();
        let combined = format!("{}{}{}", left, new_text, right);
        let new_lines = split_lines(&combined);

        let added_lines = new_lines.len() - 1;
        let new_end_column = new_lines[added_lines].len() - right_len;
        self.modified_lines.splice(start.line..=end.line, new_lines);

        PositionDelta {
            line: added_lines as isize - (end.line - start.line) as isize,
            column: new_end_column as isize - end.column as isize,
            index: new_text.len() as isize - (end.index - start.index) as isize,
        }
    }
}

impl fmt::Display for EditableDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.modified_lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::TEST_LANGUAGE;

    fn document(contents: &str) -> Rc<Document> {
        let mut parser = Parser::new();
        Rc::new(Document::parse("test.test", contents, &TEST_LANGUAGE, &mut parser).unwrap())
    }

    fn apply(contents: &str, changesets: Vec<Changeset>) -> String {
        let doc = document(contents);
        let mut editable = doc.editable();
        for cs in changesets {
            editable.apply(cs);
        }
        editable.to_string()
    }

    #[test]
    fn test_document_lines() {
        let doc = document("a = 1\nb = 2\nc = 3\n");
        assert_eq!(doc.total_lines(), 4);
        assert_eq!(doc.line_at(1), "b = 2");
        assert_eq!(doc.line_at(10), "");
        assert_eq!(doc.lines_at(0, 2), &["a = 1".to_string(), "b = 2".to_string()]);
        assert_eq!(doc.lines_at(2, 0).len(), 2);
        assert_eq!(doc.lines_at(3, 99), &[String::new()]);
    }

    #[test]
    fn test_document_crlf_lines() {
        let doc = document("a = 1\r\nb = 2\r\n");
        assert_eq!(doc.lines(), &["a = 1", "b = 2", ""]);
        assert_eq!(doc.line_at(0), "a = 1");

        let mut editable = doc.editable();
        editable.apply(Changeset::insert("\r\nc = 3", Position::new(1, 5)));
        assert_eq!(editable.modified_lines(), &["a = 1", "b = 2", "c = 3", ""]);
        assert_eq!(editable.to_string(), "a = 1\nb = 2\nc = 3\n");
    }

    #[test]
    fn test_insert() {
        assert_eq!(
            apply("hello = 1", vec![Changeset::insert("_world", Position::new(0, 5))]),
            "hello_world = 1"
        );
        assert_eq!(
            apply(
                "hello = 1",
                vec![Changeset::insert("foo\nbar\n\n", Position::new(0, 0))]
            ),
            "foo\nbar\n\nhello = 1"
        );
        assert_eq!(
            apply(
                "hello = 1",
                vec![Changeset::insert("\nprint(hello)", Position::new(0, 9))]
            ),
            "hello = 1\nprint(hello)"
        );
    }

    #[test]
    fn test_insert_with_end_before_start() {
        let out = apply(
            "hello = 1",
            vec![Changeset::new(
                "\nworld\n",
                Position::new(0, 2),
                Position::new(0, 0),
            )],
        );
        assert_eq!(out, "he\nworld\nllo = 1");
    }

    #[test]
    fn test_replace() {
        let out = apply(
            "hello = 1",
            vec![Changeset::new(
                "wwo = 3\nfoo",
                Position::new(0, 2),
                Position::new(0, 5),
            )],
        );
        assert_eq!(out, "hewwo = 3\nfoo = 1");
    }

    #[test]
    fn test_delete() {
        assert_eq!(
            apply(
                "hello = 1",
                vec![Changeset::delete(Position::new(0, 1), Position::new(0, 3))]
            ),
            "hlo = 1"
        );
        assert_eq!(
            apply(
                "a = 1\nb = 2\nhello = 1",
                vec![Changeset::delete(Position::new(1, 0), Position::new(2, 9))]
            ),
            "a = 1"
        );
        assert_eq!(
            apply(
                "a = 1\nb = 2\nc = 3\nhello = 1",
                vec![Changeset::delete(Position::new(1, 0), Position::new(2, 5))]
            ),
            "a = 1\nhello = 1"
        );
        assert_eq!(
            apply(
                "a = 1\nb = 2\nhello = 1",
                vec![Changeset::delete(Position::new(1, 0), Position::new(2, 1))]
            ),
            "a = 1\nello = 1"
        );
    }

    #[test]
    fn test_empty_changeset_is_noop() {
        let doc = document("a = xyz\nb = 123");
        let mut editable = doc.editable();
        let delta = editable.apply(Changeset::default());
        assert!(delta.is_zero());
        assert_eq!(editable.to_string(), doc.contents());
        assert!(editable.changesets().is_empty());
    }

    #[test]
    fn test_deltas() {
        let doc = document("a = xyz\nb = 123");
        let mut editable = doc.editable();

        let delta = editable.apply(Changeset::new(
            "\"test\"",
            Position::new(0, 4),
            Position::new(0, 7),
        ));
        assert_eq!(delta, PositionDelta { line: 0, column: 3, index: 3 });

        let delta = editable.apply(Changeset::insert("xyz = 1\n", Position::new(0, 0)));
        assert_eq!(delta.line, 1);
        assert_eq!(delta.column, 0);
        assert_eq!(editable.to_string(), "xyz = 1\na = \"test\"\nb = 123");

        let delta = editable.apply(Changeset::delete(Position::new(0, 0), Position::new(0, 7)));
        assert_eq!(delta.line, -1);
        assert_eq!(editable.to_string(), "a = \"test\"\nb = 123");
    }

    #[test]
    fn test_line_accounting() {
        let doc = document("def main():\n    a = 1\n");
        let mut editable = doc.editable();
        editable.apply(Changeset::insert("    b = 2\n", Position::new(1, 0)));
        editable.apply(Changeset::delete(Position::new(0, 4), Position::new(0, 8)));
        editable.apply(Changeset::insert("x", Position::new(40, 40)));

        let text = editable.to_string();
        assert_eq!(editable.total_lines(), text.matches('\n').count() + 1);
        assert_eq!(editable.changesets().len(), 3);
        assert_eq!(editable.changesets()[2].id, 3);
    }

    #[test]
    fn test_reset_and_fill_index() {
        let doc = document("ab\ncd");
        let mut editable = doc.editable();
        editable.apply(Changeset::insert("z", Position::new(1, 1)));
        assert_eq!(editable.modified_line_at(1), "czd");
        assert_eq!(editable.fill_index(Position::new(1, 2)).index, 5);

        editable.reset();
        assert_eq!(editable.to_string(), "ab\ncd");
        assert!(editable.changesets().is_empty());
        assert_eq!(editable.modified_lines_at(0, 5).len(), 2);
    }
}
