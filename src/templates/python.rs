//! Python error templates.

use crate::context::{ContextData, MainError};
use crate::error::Result;
use crate::languages::PYTHON;
use crate::node::NodeRef;
use crate::source::Position;
use crate::template::{ErrorTemplate, ErrorTemplates};
use crate::translation::{BugFixGenerator, ExplainGenerator, FixSuggestion};

use super::{enclosing_statement, indentation, is_zero_literal, main_node, zoom_to};

/// Compile-time errors are reported without a traceback header.
macro_rules! compile_time_error {
    ($pattern:literal) => {
        concat!("\"\"\"", "$stacktrace", $pattern)
    };
}

const INDENT: &str = "    ";

/// Node kinds that hold a sequence of statements.
const BLOCKS: &[&str] = &["module", "block"];

pub fn load(templates: &mut ErrorTemplates) -> Result<()> {
    for template in [
        NAME_ERROR,
        VALUE_ERROR,
        ZERO_DIVISION_ERROR,
        ATTRIBUTE_ERROR,
        SYNTAX_ERROR,
        INDENTATION_ERROR,
    ] {
        templates.add(Some(&PYTHON), template)?;
    }
    Ok(())
}

// NameError

pub const NAME_ERROR: ErrorTemplate = ErrorTemplate {
    name: "NameError",
    pattern: r"NameError: name '(?P<variable>\S+)' is not defined",
    on_analyze: Some(name_error_analyze),
    on_explain: Some(name_error_explain),
    on_bug_fix: Some(name_error_fix),
    ..ErrorTemplate::EMPTY
};

fn name_error_analyze(cd: &ContextData, m: &mut MainError) -> anyhow::Result<()> {
    let variable = cd.variable("variable");
    zoom_to(m, "(identifier) @name", "name", |n| n.text() == variable)?;
    Ok(())
}

fn name_error_explain(cd: &ContextData, gen: &mut ExplainGenerator) {
    gen.add(format!(
        "This error occurs when trying to use a variable (`{}`) or name that has not been defined in the current scope.",
        cd.variable("variable")
    ));
}

fn name_error_fix(cd: &ContextData, gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    let Some(node) = main_node(cd) else {
        return Ok(());
    };
    let variable = cd.variable("variable");
    let stmt = enclosing_statement(node, BLOCKS);
    let line = stmt.start_position().line;
    let indent = indentation(stmt.document().line_at(line));

    gen.add("Define the variable before using it", |s| {
        s.add_step(format!(
            "Make sure to define the variable `{}` before using it.",
            variable
        ))?
        .add_fix(FixSuggestion::insert(
            format!("{}{} = \"Hello!\"\n", indent, variable),
            Position::new(line, 0),
        ));
        Ok(())
    })
}

// ValueError

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueErrorKind {
    Unknown,
    /// `int()` received a string that is not an integer.
    Int,
}

#[derive(Debug, Clone, Copy)]
struct ValueErrorContext {
    kind: ValueErrorKind,
    call: Option<NodeRef>,
}

pub const VALUE_ERROR: ErrorTemplate = ErrorTemplate {
    name: "ValueError",
    pattern: r"ValueError: (?P<reason>.+)",
    on_analyze: Some(value_error_analyze),
    on_explain: Some(value_error_explain),
    on_bug_fix: Some(value_error_fix),
    ..ErrorTemplate::EMPTY
};

fn value_error_analyze(cd: &ContextData, m: &mut MainError) -> anyhow::Result<()> {
    let mut ctx = ValueErrorContext {
        kind: ValueErrorKind::Unknown,
        call: None,
    };

    if cd
        .variable("reason")
        .starts_with("invalid literal for int() with base 10")
    {
        ctx.kind = ValueErrorKind::Int;
        if zoom_to(m, "(call function: (identifier) @func) @call", "call", |n| {
            n.child_by_field_name("function")
                .is_some_and(|f| f.text() == "int")
        })? {
            ctx.call = m.nearest;
            let argument = m
                .nearest()
                .and_then(|call| call.child_by_field_name("arguments"))
                .and_then(|args| args.named_child(0))
                .map(|arg| arg.to_ref());
            if argument.is_some() {
                m.nearest = argument;
            }
        }
    }

    m.set_context(ctx);
    Ok(())
}

fn value_error_context(cd: &ContextData) -> Option<&ValueErrorContext> {
    cd.main_error()?.context::<ValueErrorContext>()
}

fn value_error_explain(cd: &ContextData, gen: &mut ExplainGenerator) {
    match value_error_context(cd).map(|c| c.kind) {
        Some(ValueErrorKind::Int) => gen.add(
            "This error occurs when you try to convert a value to `int`, but the value is not a valid `int`.",
        ),
        _ => gen.add(
            "This error occurs when you try to convert a value to another type, but the value is not a valid value for that type.",
        ),
    }
}

fn value_error_fix(cd: &ContextData, gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    let (Some(m), Some(nearest)) = (cd.main_error(), main_node(cd)) else {
        return Ok(());
    };
    let ctx = value_error_context(cd);

    if ctx.is_some_and(|c| c.kind == ValueErrorKind::Int) {
        gen.add("Use a valid integer string", |s| {
            s.add_step("Make sure the value you're trying to convert is a valid integer string.")?
                .add_fix(FixSuggestion::replace(
                    "\"123\"",
                    nearest.start_position(),
                    nearest.end_position(),
                ));
            Ok(())
        })?;
    }

    let call = ctx
        .and_then(|c| c.call)
        .and_then(|r| r.resolve(&m.document))
        .unwrap_or(nearest);
    let stmt = enclosing_statement(call, BLOCKS);
    let start = stmt.start_position();
    let end = stmt.end_position();
    let indent = indentation(m.document.line_at(start.line));

    gen.add("Add error handling", |s| {
        s.add_step("To handle invalid inputs gracefully, you can use a try-except block.")?
            .add_fix(FixSuggestion::insert(
                format!("{}try:\n", indent),
                Position::new(start.line, 0),
            ))
            .add_fix(FixSuggestion::insert(INDENT, start))
            .add_fix(FixSuggestion::insert(
                format!(
                    "\n{0}except ValueError as e:\n{0}{1}print(f\"Error: {{e}}\")",
                    indent, INDENT
                ),
                end,
            ));
        Ok(())
    })
}

// ZeroDivisionError

pub const ZERO_DIVISION_ERROR: ErrorTemplate = ErrorTemplate {
    name: "ZeroDivisionError",
    pattern: r"ZeroDivisionError: (?P<reason>.+)",
    on_analyze: Some(zero_division_analyze),
    on_explain: Some(zero_division_explain),
    on_bug_fix: Some(zero_division_fix),
    ..ErrorTemplate::EMPTY
};

fn zero_division_analyze(_cd: &ContextData, m: &mut MainError) -> anyhow::Result<()> {
    zoom_to(m, "(binary_operator) @op", "op", |n| {
        n.child_by_field_name("operator")
            .is_some_and(|o| matches!(o.text(), "/" | "//" | "%"))
    })?;
    Ok(())
}

fn zero_division_explain(_cd: &ContextData, gen: &mut ExplainGenerator) {
    gen.add("This error occurs when you try to divide a number by zero, which is mathematically undefined.");
}

fn zero_division_fix(cd: &ContextData, gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    let Some(node) = main_node(cd) else {
        return Ok(());
    };
    if node.kind() != "binary_operator" {
        return Ok(());
    }
    let Some(divisor) = node.child_by_field_name("right") else {
        return Ok(());
    };

    if is_zero_literal(&divisor) {
        return gen.add("Use a non-zero divisor", |s| {
            s.add_step("Replace the zero divisor with a non-zero value.")?
                .add_fix(FixSuggestion::replace(
                    "1",
                    divisor.start_position(),
                    divisor.end_position(),
                ));
            Ok(())
        });
    }

    let stmt = enclosing_statement(node, BLOCKS);
    let start = stmt.start_position();
    let indent = indentation(stmt.document().line_at(start.line));

    gen.add("Check the divisor before dividing", |s| {
        s.add_step(format!(
            "Add a condition to check that the divisor (`{}`) is not zero before dividing.",
            divisor.text()
        ))?
        .add_fix(FixSuggestion::insert(
            format!("{}if {} != 0:\n", indent, divisor.text()),
            Position::new(start.line, 0),
        ))
        .add_fix(FixSuggestion::insert(INDENT, start));
        Ok(())
    })
}

// AttributeError

pub const ATTRIBUTE_ERROR: ErrorTemplate = ErrorTemplate {
    name: "AttributeError",
    pattern: r"AttributeError: '(?P<typeName>\S+)' object has no attribute '(?P<attribute>\S+)'",
    on_analyze: Some(attribute_error_analyze),
    on_explain: Some(attribute_error_explain),
    on_bug_fix: Some(attribute_error_fix),
    ..ErrorTemplate::EMPTY
};

fn attribute_error_analyze(cd: &ContextData, m: &mut MainError) -> anyhow::Result<()> {
    let attribute = cd.variable("attribute");
    zoom_to(m, "(attribute attribute: (identifier) @attr)", "attr", |n| {
        n.text() == attribute
    })?;
    Ok(())
}

fn attribute_error_explain(cd: &ContextData, gen: &mut ExplainGenerator) {
    gen.add(format!(
        "This error occurs when you try to access an attribute or method (`{}`) that does not exist on an object of type `{}`.",
        cd.variable("attribute"),
        cd.variable("typeName")
    ));
}

fn attribute_error_fix(cd: &ContextData, gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    if cd.main_error().is_none() {
        return Ok(());
    }
    gen.add("Check the attribute name", |s| {
        s.add_step(format!(
            "Make sure that `{}` is defined for `{}` objects and that its name is spelled correctly.",
            cd.variable("attribute"),
            cd.variable("typeName")
        ))?;
        Ok(())
    })
}

// SyntaxError

/// Opening character, closing character and name of the bracket pairs.
const BRACKETS: &[(&str, &str, &str)] = &[
    ("(", ")", "open parenthesis"),
    ("[", "]", "open bracket"),
    ("{", "}", "open curly brace"),
];

fn bracket(open: &str) -> Option<(&'static str, &'static str)> {
    BRACKETS
        .iter()
        .find(|(o, _, _)| *o == open)
        .map(|(_, close, word)| (*close, *word))
}

pub const SYNTAX_ERROR: ErrorTemplate = ErrorTemplate {
    name: "SyntaxError",
    pattern: compile_time_error!(r"SyntaxError: '(?P<character>.+)' was never closed"),
    on_explain: Some(syntax_error_explain),
    on_bug_fix: Some(syntax_error_fix),
    ..ErrorTemplate::EMPTY
};

fn syntax_error_explain(cd: &ContextData, gen: &mut ExplainGenerator) {
    let character = cd.variable("character");
    let subject = match bracket(character) {
        Some((_, word)) => format!("the {} `{}`", word, character),
        None => format!("the '{}'", character),
    };
    gen.add(format!(
        "This error occurs when there is a syntax error in the code, and {} is not closed properly.",
        subject
    ));
}

fn syntax_error_fix(cd: &ContextData, gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    let Some(m) = cd.main_error() else {
        return Ok(());
    };
    let character = cd.variable("character");
    let Some((close, word)) = bracket(character) else {
        return Ok(());
    };

    let row = m.error_node.location.start.line.saturating_sub(1);
    let column = m.document.line_at(row).trim_end().len();

    gen.add(format!("Close the {}", word), |s| {
        s.add_step(format!(
            "Ensure that the {} (`{}`) is closed properly.",
            word, character
        ))?
        .add_fix(FixSuggestion::insert(close, Position::new(row, column)));
        Ok(())
    })
}

// IndentationError

pub const INDENTATION_ERROR: ErrorTemplate = ErrorTemplate {
    name: "IndentationError",
    pattern: compile_time_error!(
        r"IndentationError: unindent does not match any outer indentation level"
    ),
    on_explain: Some(indentation_error_explain),
    on_bug_fix: Some(indentation_error_fix),
    ..ErrorTemplate::EMPTY
};

fn indentation_error_explain(_cd: &ContextData, gen: &mut ExplainGenerator) {
    gen.add("This error occurs when there is a mismatch in the indentation levels in the code.");
}

fn indentation_error_fix(cd: &ContextData, gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    let Some(m) = cd.main_error() else {
        return Ok(());
    };
    let doc = &m.document;
    let row = m.error_node.location.start.line.saturating_sub(1);
    let current = indentation(doc.line_at(row));
    let expected = (0..row)
        .rev()
        .map(|r| doc.line_at(r))
        .find(|l| !l.trim().is_empty())
        .map_or("", indentation);

    gen.add("Correct the indentation", |s| {
        s.add_step(
            "Ensure consistent indentation by using the correct spacing for each level of indentation.",
        )?
        .add_fix(FixSuggestion::replace(
            expected,
            Position::new(row, 0),
            Position::new(row, current.len()),
        ));
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::fs::VirtualFs;
    use crate::template::ErrorTemplates;

    fn setup(path: &str, contents: &str) -> Engine {
        let mut templates = ErrorTemplates::new();
        load(&mut templates).unwrap();
        let mut engine = Engine::with_templates(templates);
        engine
            .fs
            .attach("memory", Box::new(VirtualFs::new().with_file(path, contents)));
        engine
    }

    #[test]
    fn test_name_error_zooms_to_identifier() {
        let mut engine = setup("/work/main.py", "a = 1\nprint(b)\n");
        let msg = "Traceback (most recent call last):\n  File \"main.py\", line 2, in <module>\n    print(b)\nNameError: name 'b' is not defined";
        let (template, cd) = engine.analyze("/work", msg).unwrap();
        assert_eq!(template.name(), "NameError");

        let nearest = cd.main_error().unwrap().nearest().unwrap();
        assert_eq!(nearest.kind(), "identifier");
        assert_eq!(nearest.text(), "b");
    }

    #[test]
    fn test_name_error_keeps_indentation() {
        let src = "def main():\n    print(b)\n\nmain()\n";
        let mut engine = setup("/work/main.py", src);
        let msg = "Traceback (most recent call last):\n  File \"main.py\", line 4, in <module>\n    main()\n  File \"main.py\", line 2, in main\n    print(b)\nNameError: name 'b' is not defined";
        let out = engine.run("/work", msg).unwrap();
        assert!(out.contains("+     b = \"Hello!\"\n+     print(b)"));
    }

    #[test]
    fn test_value_error_context() {
        let mut engine = setup("/work/main.py", "a = int(\"abc\")\n");
        let msg = "Traceback (most recent call last):\n  File \"main.py\", line 1, in <module>\n    a = int(\"abc\")\nValueError: invalid literal for int() with base 10: 'abc'";
        let (_, cd) = engine.analyze("/work", msg).unwrap();

        let ctx = value_error_context(&cd).unwrap();
        assert_eq!(ctx.kind, ValueErrorKind::Int);
        assert!(ctx.call.is_some());
        assert_eq!(cd.main_error().unwrap().nearest().unwrap().text(), "\"abc\"");
    }

    #[test]
    fn test_zero_literal_divisor() {
        let mut engine = setup("/work/main.py", "x = 10 / 0\n");
        let msg = "Traceback (most recent call last):\n  File \"main.py\", line 1, in <module>\n    x = 10 / 0\nZeroDivisionError: division by zero";
        let out = engine.run("/work", msg).unwrap();
        assert!(out.contains("### Use a non-zero divisor"));
        assert!(out.contains("- x = 10 / 0\n+ x = 10 / 1"));
    }

    #[test]
    fn test_bracket_names() {
        assert_eq!(bracket("("), Some((")", "open parenthesis")));
        assert_eq!(bracket("<"), None);
    }
}
