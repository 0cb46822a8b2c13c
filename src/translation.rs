//! Builders the template hooks use to write explanations and fix suggestions.

use std::rc::Rc;

use crate::error::Error;
use crate::source::{Changeset, Document, EditableDocument, Position, PositionDelta};

/// Explanation of an error, with optional named sections.
#[derive(Debug, Clone, Default)]
pub struct ExplainGenerator {
    pub error_name: String,
    text: String,
    sections: Vec<(String, ExplainGenerator)>,
}

impl ExplainGenerator {
    pub fn new(error_name: impl Into<String>) -> Self {
        Self {
            error_name: error_name.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, text: impl AsRef<str>) {
        self.text.push_str(text.as_ref());
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sections(&self) -> &[(String, ExplainGenerator)] {
        &self.sections
    }

    /// The section called `name`, created on first use. Empty names have no section.
    pub fn create_section(&mut self, name: &str) -> Option<&mut ExplainGenerator> {
        if name.is_empty() {
            return None;
        }
        let index = match self.sections.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.sections
                    .push((name.to_string(), ExplainGenerator::new(self.error_name.clone())));
                self.sections.len() - 1
            }
        };
        Some(&mut self.sections[index].1)
    }
}

/// A single edit proposed by a step, in the coordinates of the step's base document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixSuggestion {
    pub new_text: String,
    pub start: Position,
    pub end: Position,
    pub description: String,
}

impl FixSuggestion {
    pub fn replace(new_text: impl Into<String>, start: Position, end: Position) -> Self {
        Self {
            new_text: new_text.into(),
            start,
            end,
            description: String::new(),
        }
    }

    pub fn insert(new_text: impl Into<String>, at: Position) -> Self {
        Self::replace(new_text, at, at)
    }

    pub fn delete(start: Position, end: Position) -> Self {
        Self::replace("", start, end)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// One step of a suggestion: an instruction and the fixes that carry it out.
#[derive(Debug, Clone)]
pub struct BugFixStep {
    pub content: String,
    fixes: Vec<FixSuggestion>,
    base: EditableDocument,
    doc: EditableDocument,
    /// Applied edits as (original end position, delta).
    applied: Vec<(Position, PositionDelta)>,
    line_delta: isize,
    start_line: Option<usize>,
    after_line: usize,
    notice: Option<String>,
}

impl BugFixStep {
    fn new(content: String, base: EditableDocument) -> Self {
        Self {
            content,
            fixes: Vec::new(),
            doc: base.clone(),
            base,
            applied: Vec::new(),
            line_delta: 0,
            start_line: None,
            after_line: 0,
            notice: None,
        }
    }

    /// Applies `fix` to the step's document.
    ///
    /// Positions refer to the document as it was when the step started; the
    /// shift caused by earlier fixes of this step is added here. A fix on
    /// lines outside the document is skipped and leaves a notice.
    pub fn add_fix(&mut self, fix: FixSuggestion) -> &mut Self {
        let total = self.base.total_lines();
        let line = fix.start.line.max(fix.end.line);
        if line >= total {
            let err = Error::FixOutOfRange { line, total };
            log::warn!("{}", err);
            self.notice = Some(format!("Unable to apply the fix: {}.", err));
            return self;
        }

        let start = self.translate(fix.start);
        let end = self.translate(fix.end.max(fix.start));
        let delta = self
            .doc
            .apply(Changeset::new(fix.new_text.clone(), start, end));

        self.applied.push((fix.end.max(fix.start), delta));
        self.line_delta += delta.line;
        self.start_line = Some(self.start_line.map_or(fix.start.line, |l| l.min(fix.start.line)));
        self.after_line = self.after_line.max(fix.end.line.max(fix.start.line));
        self.fixes.push(fix);
        self
    }

    fn translate(&self, pos: Position) -> Position {
        let mut line = pos.line as isize;
        let mut column = pos.column as isize;
        for (end, delta) in &self.applied {
            if pos.line > end.line {
                line += delta.line;
            } else if pos.line == end.line && pos.column >= end.column {
                line += delta.line;
                column += delta.column;
            }
        }
        Position::new(line.max(0) as usize, column.max(0) as usize)
    }

    pub fn fixes(&self) -> &[FixSuggestion] {
        &self.fixes
    }

    /// The document before this step.
    pub fn base(&self) -> &EditableDocument {
        &self.base
    }

    /// The document after this step.
    pub fn doc(&self) -> &EditableDocument {
        &self.doc
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Original lines touched by the fixes, as `(first, last)`.
    pub fn line_range(&self) -> Option<(usize, usize)> {
        self.start_line.map(|start| (start, self.after_line))
    }

    pub fn line_delta(&self) -> isize {
        self.line_delta
    }
}

/// A titled, ordered list of steps. Each step starts from the result of the
/// previous one.
#[derive(Debug, Clone)]
pub struct BugFixSuggestion {
    pub title: String,
    steps: Vec<BugFixStep>,
    doc: EditableDocument,
}

impl BugFixSuggestion {
    fn new(title: String, doc: EditableDocument) -> Self {
        Self {
            title,
            steps: Vec::new(),
            doc,
        }
    }

    pub fn add_step(&mut self, content: impl Into<String>) -> Result<&mut BugFixStep, Error> {
        let mut content = content.into();
        if content.trim().is_empty() {
            return Err(Error::EmptyContent);
        }
        if !content.chars().last().is_some_and(is_punctuation) {
            content.push('.');
        }

        let base = match self.steps.last() {
            Some(prev) => prev.doc.clone(),
            None => self.doc.clone(),
        };
        self.steps.push(BugFixStep::new(content, base));
        let index = self.steps.len() - 1;
        Ok(&mut self.steps[index])
    }

    pub fn steps(&self) -> &[BugFixStep] {
        &self.steps
    }

    /// The document after every step.
    pub fn doc(&self) -> &EditableDocument {
        self.steps.last().map_or(&self.doc, |s| &s.doc)
    }
}

/// Unicode punctuation (general category P) that may end a step.
fn is_punctuation(c: char) -> bool {
    matches!(
        c,
        '!' | '"'
            | '#'
            | '%'
            | '&'
            | '\''
            | '('
            | ')'
            | '*'
            | ','
            | '-'
            | '.'
            | '/'
            | ':'
            | ';'
            | '?'
            | '@'
            | '['
            | '\\'
            | ']'
            | '_'
            | '{'
            | '}'
            | '¡'
            | '¿'
            | '«'
            | '»'
            | '…'
            | '‘'
            | '’'
            | '“'
            | '”'
    )
}

/// Collects the fix suggestions of a template for the main error document.
#[derive(Debug, Clone, Default)]
pub struct BugFixGenerator {
    document: Option<Rc<Document>>,
    suggestions: Vec<BugFixSuggestion>,
}

impl BugFixGenerator {
    pub fn new(document: Option<Rc<Document>>) -> Self {
        Self {
            document,
            suggestions: Vec::new(),
        }
    }

    pub fn document(&self) -> Option<&Rc<Document>> {
        self.document.as_ref()
    }

    /// Builds a suggestion with `maker`. It is kept only if `maker` succeeds.
    pub fn add<F>(&mut self, title: impl Into<String>, maker: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut BugFixSuggestion) -> anyhow::Result<()>,
    {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(Error::EmptyTitle.into());
        }
        let document = self.document.as_ref().ok_or(Error::NoDocument)?;

        let mut suggestion = BugFixSuggestion::new(title, document.editable());
        maker(&mut suggestion)?;
        self.suggestions.push(suggestion);
        Ok(())
    }

    pub fn suggestions(&self) -> &[BugFixSuggestion] {
        &self.suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::TEST_LANGUAGE;
    use tree_sitter::Parser;

    fn generator(contents: &str) -> BugFixGenerator {
        let doc = Document::parse("test.test", contents, &TEST_LANGUAGE, &mut Parser::new()).unwrap();
        BugFixGenerator::new(Some(Rc::new(doc)))
    }

    #[test]
    fn test_explain_sections() {
        let mut gen = ExplainGenerator::new("NameError");
        gen.add("first");
        gen.add(" second");
        assert_eq!(gen.text(), "first second");

        assert!(gen.create_section("").is_none());
        gen.create_section("More info").unwrap().add("a");
        gen.create_section("More info").unwrap().add("b");
        assert_eq!(gen.sections().len(), 1);
        assert_eq!(gen.sections()[0].1.text(), "ab");
    }

    #[test]
    fn test_validation() {
        let mut gen = generator("a = 1");
        let err = gen.add("", |_| Ok(())).unwrap_err();
        assert_eq!(err.to_string(), "title cannot be empty");

        let err = gen
            .add("Title", |s| {
                s.add_step("")?;
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "content cannot be empty");
        assert!(gen.suggestions().is_empty());

        let mut empty = BugFixGenerator::new(None);
        assert!(empty.add("Title", |_| Ok(())).is_err());
    }

    #[test]
    fn test_step_punctuation() {
        let mut gen = generator("a = 1");
        gen.add("Title", |s| {
            s.add_step("Define the variable named `xyz`")?;
            s.add_step("Done!")?;
            Ok(())
        })
        .unwrap();
        let steps = gen.suggestions()[0].steps();
        assert_eq!(steps[0].content, "Define the variable named `xyz`.");
        assert_eq!(steps[1].content, "Done!");
    }

    #[test]
    fn test_fixes_are_translated() {
        let mut gen = generator("x = a / b\nprint(x)");
        gen.add("Guard", |s| {
            s.add_step("Wrap the division")?
                .add_fix(FixSuggestion::insert("try:\n", Position::new(0, 0)))
                .add_fix(FixSuggestion::insert("    ", Position::new(0, 0)))
                .add_fix(FixSuggestion::insert(
                    "\nexcept ZeroDivisionError:\n    x = 0",
                    Position::new(0, 9),
                ));
            Ok(())
        })
        .unwrap();

        let step = &gen.suggestions()[0].steps()[0];
        assert_eq!(
            step.doc().to_string(),
            "try:\n    x = a / b\nexcept ZeroDivisionError:\n    x = 0\nprint(x)"
        );
        assert_eq!(step.line_range(), Some((0, 0)));
        assert_eq!(step.line_delta(), 3);
    }

    #[test]
    fn test_steps_accumulate() {
        let mut gen = generator("a = xyz\nb = 123");
        gen.add("Two steps", |s| {
            s.add_step("Replace")?.add_fix(FixSuggestion::replace(
                "1",
                Position::new(0, 4),
                Position::new(0, 7),
            ));
            s.add_step("Insert")?
                .add_fix(FixSuggestion::insert("c = 2\n", Position::new(1, 0)));
            Ok(())
        })
        .unwrap();

        let suggestion = &gen.suggestions()[0];
        assert_eq!(suggestion.steps()[1].base().to_string(), "a = 1\nb = 123");
        assert_eq!(suggestion.doc().to_string(), "a = 1\nc = 2\nb = 123");
    }

    #[test]
    fn test_out_of_range_fix_leaves_notice() {
        let mut gen = generator("a = 1");
        gen.add("Title", |s| {
            s.add_step("Edit")?
                .add_fix(FixSuggestion::insert("x", Position::new(5, 0)));
            Ok(())
        })
        .unwrap();
        let step = &gen.suggestions()[0].steps()[0];
        assert!(step.notice().unwrap().contains("line 5"));
        assert_eq!(step.doc().to_string(), "a = 1");
    }
}
