//! Markdown rendering of explanations and fix suggestions.

use crate::context::ContextData;
use crate::translation::{BugFixGenerator, BugFixStep, BugFixSuggestion, ExplainGenerator};

pub const NO_EXPLANATION: &str = "No explanation found for this error.";
pub const NO_BUG_FIX: &str = "No bug fixes found for this error.";

/// Renders the final Markdown report.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputGenerator {
    /// Adds a snippet of the offending line with a caret underline.
    pub is_testing: bool,
}

impl OutputGenerator {
    pub fn new(is_testing: bool) -> Self {
        Self { is_testing }
    }

    pub fn generate(
        &self,
        cd: &ContextData,
        explain: &ExplainGenerator,
        bug_fix: &BugFixGenerator,
    ) -> String {
        let mut out: Vec<String> = vec![format!("# {}", explain.error_name)];

        let text = explain.text().trim_end();
        out.push(if text.is_empty() { NO_EXPLANATION } else { text }.to_string());
        write_sections(&mut out, explain, 2);

        if self.is_testing {
            if let Some(snippet) = error_snippet(cd) {
                out.push(snippet);
            }
        }

        out.push("## Steps to fix".to_string());
        let suggestions = bug_fix.suggestions();
        if suggestions.is_empty() {
            out.push(NO_BUG_FIX.to_string());
        } else {
            let rendered: Vec<String> = suggestions
                .iter()
                .enumerate()
                .map(|(i, s)| render_suggestion(i, suggestions.len(), s))
                .collect();
            out.push(rendered.join("\n\n"));
        }

        out.join("\n")
    }
}

fn write_sections(out: &mut Vec<String>, explain: &ExplainGenerator, depth: usize) {
    for (name, section) in explain.sections() {
        out.push(format!("{} {}", "#".repeat(depth), name));
        let text = section.text().trim_end();
        if !text.is_empty() {
            out.push(text.to_string());
        }
        write_sections(out, section, depth + 1);
    }
}

fn render_suggestion(index: usize, total: usize, suggestion: &BugFixSuggestion) -> String {
    let mut lines = Vec::new();
    if total > 1 {
        lines.push(format!("### {}. {}", index + 1, suggestion.title));
    } else {
        lines.push(format!("### {}", suggestion.title));
    }

    let steps = suggestion.steps();
    for (i, step) in steps.iter().enumerate() {
        if steps.len() > 1 {
            lines.push(format!("{}. {}", i + 1, step.content));
        } else {
            lines.push(step.content.clone());
        }

        if let Some(notice) = step.notice() {
            lines.push(notice.to_string());
        } else if let Some(diff) = render_diff(step) {
            lines.push(diff);
        }

        for fix in step.fixes() {
            if !fix.description.is_empty() {
                lines.push(fix.description.clone());
            }
        }
    }
    lines.join("\n")
}

/// A `diff` fence: one line of context, the original lines prefixed with
/// `- `, the modified lines prefixed with `+ `, one line of context.
fn render_diff(step: &BugFixStep) -> Option<String> {
    let (start, after) = step.line_range()?;
    let base = step.base();
    let doc = step.doc();
    let new_after = after as isize + step.line_delta();

    let mut lines = vec!["```diff".to_string()];
    if start > 0 {
        lines.push(base.modified_line_at(start - 1).to_string());
    }
    for line in base.modified_lines_at(start, after + 1) {
        lines.push(format!("- {}", line));
    }
    if new_after >= start as isize {
        for line in doc.modified_lines_at(start, new_after as usize + 1) {
            lines.push(format!("+ {}", line));
        }
    }
    let next = (new_after + 1).max(start as isize) as usize;
    let is_final_newline = next + 1 == doc.total_lines() && doc.modified_line_at(next).is_empty();
    if next < doc.total_lines() && !is_final_newline {
        lines.push(doc.modified_line_at(next).to_string());
    }
    lines.push("```".to_string());
    Some(lines.join("\n"))
}

/// Two lines around the main error line and a caret underline below the
/// nearest node.
fn error_snippet(cd: &ContextData) -> Option<String> {
    let main = cd.main_error()?;
    let node = main.nearest()?;
    let doc = &main.document;

    let start = node.start_position();
    let end = node.end_position();
    let row = start.line;
    let line = doc.line_at(row);

    let mut lines = vec!["```".to_string()];
    for l in doc.lines_at(row.saturating_sub(2), row) {
        lines.push(l.clone());
    }
    lines.push(line.to_string());

    let prefix: String = line
        .get(..start.column)
        .unwrap_or("")
        .chars()
        .map(|c| if c == '\t' { "    " } else { " " })
        .collect();
    let width = if end.line == row {
        end.column.saturating_sub(start.column)
    } else {
        line.len().saturating_sub(start.column)
    };
    lines.push(format!("{}{}", prefix, "^".repeat(width.max(1))));

    for l in doc.lines_at(row + 1, row + 3) {
        lines.push(l.clone());
    }
    lines.push("```".to_string());
    Some(lines.join("\n"))
}
