//! Java error templates.

use std::path::Path;
use std::rc::Rc;

use crate::context::{ContextData, MainError};
use crate::error::Result;
use crate::languages::JAVA;
use crate::node::SyntaxNode;
use crate::source::{Document, Position};
use crate::symbols::SymbolKind;
use crate::template::{ErrorTemplate, ErrorTemplates};
use crate::translation::{BugFixGenerator, BugFixStep, ExplainGenerator, FixSuggestion};

use super::{enclosing_statement, indentation, is_zero_literal, main_node, zoom_to};

/// Uncaught exceptions print `Exception in thread "<thread>" <class>: <message>`.
macro_rules! runtime_error {
    ($class:literal) => {
        concat!(
            r#"Exception in thread "(?P<thread>\w+)" "#,
            $class,
            r"(?:: (?P<reason>.+))?"
        )
    };
    ($class:literal, $pattern:literal) => {
        concat!(
            r#"Exception in thread "(?P<thread>\w+)" "#,
            $class,
            ": ",
            $pattern
        )
    };
}

/// javac reports `<path>:<line>: error: <message>`.
const COMPILE_TIME_STACK_TRACE: &str = r"(?P<path>\S+):(?P<position>\d+)";

const INDENT: &str = "    ";

const BLOCKS: &[&str] = &["block", "class_body", "program"];

pub fn load(templates: &mut ErrorTemplates) -> Result<()> {
    for template in [
        NULL_POINTER_EXCEPTION,
        ARRAY_INDEX_OUT_OF_BOUNDS_EXCEPTION,
        ARITHMETIC_EXCEPTION,
        NEGATIVE_ARRAY_SIZE_EXCEPTION,
        STRING_INDEX_OUT_OF_BOUNDS_EXCEPTION,
        NUMBER_FORMAT_EXCEPTION,
        PUBLIC_CLASS_FILENAME_MISMATCH_ERROR,
        SYMBOL_NOT_FOUND_ERROR,
        MISSING_RETURN_ERROR,
    ] {
        templates.add(Some(&JAVA), template)?;
    }
    Ok(())
}

/// Wraps `stmt` in `if (<condition>) { ... }`.
fn wrap_with_if(step: &mut BugFixStep, stmt: SyntaxNode<'_>, condition: &str) {
    let start = stmt.start_position();
    let end = stmt.end_position();
    let indent = indentation(stmt.document().line_at(start.line));

    step.add_fix(FixSuggestion::insert(
        format!("{}if ({}) {{\n", indent, condition),
        Position::new(start.line, 0),
    ))
    .add_fix(FixSuggestion::insert(INDENT, start))
    .add_fix(FixSuggestion::insert(format!("\n{}}}", indent), end));
}

/// The method invocation `arg` is an argument of.
fn invocation_of<'a>(arg: &SyntaxNode<'a>) -> Option<SyntaxNode<'a>> {
    arg.parent()
        .filter(|p| p.kind() == "argument_list")
        .and_then(|p| p.parent())
        .filter(|p| p.kind() == "method_invocation")
}

fn invoked_name<'a>(call: &SyntaxNode<'a>) -> &'a str {
    call.child_by_field_name("name").map_or("", |n| n.text())
}

/// A literal usable as the initial value of a `type_name`.
fn default_value(type_name: &str) -> Option<&'static str> {
    match type_name {
        "int" | "short" | "byte" => Some("0"),
        "long" => Some("0L"),
        "double" => Some("0.0"),
        "float" => Some("0.0f"),
        "boolean" => Some("false"),
        "char" => Some("' '"),
        "String" => Some("\"\""),
        _ => None,
    }
}

/// The declarator of `name` whose value matches `value_kind`, e.g.
/// `(null_literal)`.
fn declarator_of<'a>(
    doc: &'a Document,
    name: &str,
    value_kind: &str,
) -> Result<Option<SyntaxNode<'a>>> {
    let query = format!(
        "(variable_declarator name: (identifier) @name value: {})",
        value_kind
    );
    Ok(SyntaxNode::root(doc)
        .find_capture(&query, "name", |n| n.text() == name)?
        .and_then(|n| n.parent()))
}

// NullPointerException

pub const NULL_POINTER_EXCEPTION: ErrorTemplate = ErrorTemplate {
    name: "NullPointerException",
    pattern: runtime_error!(r"java\.lang\.NullPointerException"),
    on_analyze: Some(null_pointer_analyze),
    on_explain: Some(null_pointer_explain),
    on_bug_fix: Some(null_pointer_fix),
    ..ErrorTemplate::EMPTY
};

#[derive(Debug, Default)]
struct NullPointerContext {
    /// The null value was passed to `System.out`.
    printed: bool,
    method_name: String,
    origin: String,
}

fn null_pointer_analyze(cd: &ContextData, m: &mut MainError) -> anyhow::Result<()> {
    let doc = Rc::clone(&m.document);
    let mut ctx = NullPointerContext::default();

    let call = m
        .nearest
        .and_then(|r| r.resolve(&doc))
        .filter(|n| n.kind() == "expression_statement")
        .and_then(|n| n.named_child(0))
        .filter(|n| n.kind() == "method_invocation");

    if let Some(call) = call {
        let args = call
            .child_by_field_name("arguments")
            .map(|a| a.named_children())
            .unwrap_or_default();
        let is_null = |node: &SyntaxNode<'_>| {
            cd.analyzer()
                .is_some_and(|a| a.analyze_node(cd, *node).name() == "null")
        };

        let mut culprit = call;
        if call
            .child_by_field_name("object")
            .is_some_and(|o| o.text() == "System.out")
        {
            ctx.printed = true;
            if let Some(arg) = args.first() {
                culprit = *arg;
            }
        } else if let Some(arg) = args
            .iter()
            .find(|a| is_null(*a) || a.kind() == "array_access")
        {
            culprit = *arg;
        }

        if culprit.kind() == "method_invocation" {
            ctx.method_name = invoked_name(&culprit).to_string();
            ctx.origin = culprit
                .child_by_field_name("object")
                .map_or_else(String::new, |o| o.text().to_string());
        } else {
            ctx.origin = culprit.text().to_string();
        }
        m.nearest = Some(culprit.to_ref());
    }

    m.set_context(ctx);
    Ok(())
}

fn null_pointer_explain(cd: &ContextData, gen: &mut ExplainGenerator) {
    let ctx = cd
        .main_error()
        .and_then(|m| m.context::<NullPointerContext>());
    match ctx {
        Some(ctx) if ctx.printed && !ctx.origin.is_empty() => {
            gen.add("Your program tried to print the value of ");
            if !ctx.method_name.is_empty() {
                gen.add(format!("\"{}\" method from ", ctx.method_name));
            }
            gen.add(format!("\"{}\" which is a null.", ctx.origin));
        }
        Some(ctx) if !ctx.method_name.is_empty() && !ctx.origin.is_empty() => {
            gen.add(format!(
                "Your program tried to execute the \"{}\" method from \"{}\" which is a null.",
                ctx.method_name, ctx.origin
            ));
        }
        _ => gen.add("Your program tried to access or manipulate an object reference that is currently pointing to `null`, meaning it doesn't refer to any actual object in memory. This typically happens when you forget to initialize an object before using it, or when you try to access an object that hasn't been properly assigned a value."),
    }
}

fn null_pointer_fix(cd: &ContextData, gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    let Some(ctx) = cd
        .main_error()
        .and_then(|m| m.context::<NullPointerContext>())
    else {
        return Ok(());
    };
    let Some(node) = main_node(cd) else {
        return Ok(());
    };
    if ctx.origin.is_empty() {
        return Ok(());
    }

    let stmt = enclosing_statement(node, BLOCKS);
    let action = if ctx.method_name.is_empty() {
        "using it".to_string()
    } else {
        format!("calling the `{}` method", ctx.method_name)
    };
    gen.add("Wrap with an if statement", |s| {
        let step = s.add_step(format!(
            "Check that `{}` is not `null` before {}.",
            ctx.origin, action
        ))?;
        wrap_with_if(step, stmt, &format!("{} != null", ctx.origin));
        Ok(())
    })?;

    let Some(declarator) = declarator_of(node.document(), &ctx.origin, "(null_literal)")? else {
        return Ok(());
    };
    let Some(value) = declarator.child_by_field_name("value") else {
        return Ok(());
    };
    let type_name = declarator
        .parent()
        .and_then(|d| d.child_by_field_name("type"))
        .map_or("Object", |t| t.text());
    let init = match type_name {
        "String" => "\"\"".to_string(),
        other => format!("new {}()", other),
    };

    gen.add("Initialize the variable", |s| {
        s.add_step(format!(
            "Initialize `{}` with a non-null value before using it.",
            ctx.origin
        ))?
        .add_fix(FixSuggestion::replace(
            init,
            value.start_position(),
            value.end_position(),
        ));
        Ok(())
    })
}

// ArithmeticException

pub const ARITHMETIC_EXCEPTION: ErrorTemplate = ErrorTemplate {
    name: "ArithmeticException",
    pattern: runtime_error!(r"java\.lang\.ArithmeticException", r"(?P<reason>.+)"),
    on_analyze: Some(arithmetic_analyze),
    on_explain: Some(arithmetic_explain),
    on_bug_fix: Some(arithmetic_fix),
    ..ErrorTemplate::EMPTY
};

fn arithmetic_analyze(_cd: &ContextData, m: &mut MainError) -> anyhow::Result<()> {
    zoom_to(m, "(binary_expression) @op", "op", |n| {
        n.child_by_field_name("operator")
            .is_some_and(|o| matches!(o.text(), "/" | "%"))
    })?;
    Ok(())
}

fn arithmetic_explain(cd: &ContextData, gen: &mut ExplainGenerator) {
    if cd.variable("reason") == "/ by zero" {
        gen.add("This error is raised when you try to divide a number by zero, which is mathematically undefined.");
    } else {
        gen.add(format!(
            "This error is raised when an arithmetic operation cannot be performed: {}.",
            cd.variable("reason")
        ));
    }
}

fn arithmetic_fix(cd: &ContextData, gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    let Some(node) = main_node(cd) else {
        return Ok(());
    };
    if node.kind() != "binary_expression" {
        return Ok(());
    }
    let Some(divisor) = node.child_by_field_name("right") else {
        return Ok(());
    };

    if is_zero_literal(&divisor) {
        return gen.add("Avoid dividing by zero", |s| {
            s.add_step("Change the divisor to a non-zero value.")?
                .add_fix(FixSuggestion::replace(
                    "1",
                    divisor.start_position(),
                    divisor.end_position(),
                ));
            Ok(())
        });
    }

    let stmt = enclosing_statement(node, BLOCKS);
    gen.add("Check the divisor before dividing", |s| {
        let step = s.add_step(format!(
            "Wrap the division in an `if` statement that checks that `{}` is not zero.",
            divisor.text()
        ))?;
        wrap_with_if(step, stmt, &format!("{} != 0", divisor.text()));
        Ok(())
    })
}

// ArrayIndexOutOfBoundsException

pub const ARRAY_INDEX_OUT_OF_BOUNDS_EXCEPTION: ErrorTemplate = ErrorTemplate {
    name: "ArrayIndexOutOfBoundsException",
    pattern: runtime_error!(
        r"java\.lang\.ArrayIndexOutOfBoundsException",
        r"Index (?P<index>\d+) out of bounds for length (?P<length>\d+)"
    ),
    on_analyze: Some(array_index_analyze),
    on_explain: Some(array_index_explain),
    on_bug_fix: Some(array_index_fix),
    ..ErrorTemplate::EMPTY
};

fn array_index_analyze(_cd: &ContextData, m: &mut MainError) -> anyhow::Result<()> {
    zoom_to(m, "(array_access index: (_) @index)", "index", |_| true)?;
    Ok(())
}

fn array_index_explain(cd: &ContextData, gen: &mut ExplainGenerator) {
    gen.add(format!(
        "This error occurs because the code is trying to access index {} that is beyond the bounds of the array which only has {} items.",
        cd.variable("index"),
        cd.variable("length")
    ));
}

fn array_index_fix(cd: &ContextData, gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    let Some(node) = main_node(cd) else {
        return Ok(());
    };
    let length: usize = cd.variable("length").parse().unwrap_or(0);
    let sample = length.saturating_sub(1);
    let array = node
        .parent()
        .filter(|p| p.kind() == "array_access")
        .and_then(|p| p.child_by_field_name("array"))
        .map_or("array", |a| a.text());

    gen.add("Accessing Array Index Within Bounds", |s| {
        s.add_step(format!(
            "The error is caused by trying to access an index that does not exist within the array. Instead of accessing index {}, which is beyond the array's length, change it to a valid index within the array bounds, for example, `{}[{}]`.",
            cd.variable("index"),
            array,
            sample
        ))?
        .add_fix(
            FixSuggestion::replace(
                sample.to_string(),
                node.start_position(),
                node.end_position(),
            )
            .with_description("This adjustment ensures that you're accessing an index that exists within the array bounds, preventing the `ArrayIndexOutOfBoundsException`."),
        );
        Ok(())
    })
}

// NegativeArraySizeException

pub const NEGATIVE_ARRAY_SIZE_EXCEPTION: ErrorTemplate = ErrorTemplate {
    name: "NegativeArraySizeException",
    pattern: runtime_error!(r"java\.lang\.NegativeArraySizeException", r"(?P<size>.+)"),
    on_analyze: Some(negative_array_size_analyze),
    on_explain: Some(negative_array_size_explain),
    on_bug_fix: Some(negative_array_size_fix),
    ..ErrorTemplate::EMPTY
};

fn negative_array_size_analyze(_cd: &ContextData, m: &mut MainError) -> anyhow::Result<()> {
    zoom_to(m, "(dimensions_expr (unary_expression) @size)", "size", |n| {
        n.child_by_field_name("operator")
            .is_some_and(|o| o.text() == "-")
    })?;
    Ok(())
}

fn negative_array_size_explain(_cd: &ContextData, gen: &mut ExplainGenerator) {
    gen.add("This error occurs when you try to create an array with a negative size.");
}

fn negative_array_size_fix(cd: &ContextData, gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    let Some(node) = main_node(cd).filter(|n| n.kind() == "unary_expression") else {
        return Ok(());
    };
    let Some(operand) = node.child_by_field_name("operand") else {
        return Ok(());
    };

    gen.add("Ensure a non-negative array size", |s| {
        s.add_step("Make sure the array size is non-negative")?
            .add_fix(FixSuggestion::replace(
                operand.text(),
                node.start_position(),
                node.end_position(),
            ));
        Ok(())
    })
}

// StringIndexOutOfBoundsException

pub const STRING_INDEX_OUT_OF_BOUNDS_EXCEPTION: ErrorTemplate = ErrorTemplate {
    name: "StringIndexOutOfBoundsException",
    pattern: runtime_error!(
        r"java\.lang\.StringIndexOutOfBoundsException",
        r"(?:String index out of range: |[Ii]ndex )(?P<index>-?\d+)(?:,? (?:out of bounds for )?length (?P<length>\d+))?"
    ),
    on_analyze: Some(string_index_analyze),
    on_explain: Some(string_index_explain),
    on_bug_fix: Some(string_index_fix),
    ..ErrorTemplate::EMPTY
};

const CHAR_AT_QUERY: &str = "(method_invocation arguments: (argument_list (_) @arg))";

fn is_char_at_argument(node: &SyntaxNode<'_>) -> bool {
    invocation_of(node).is_some_and(|call| invoked_name(&call) == "charAt")
}

fn string_index_analyze(cd: &ContextData, m: &mut MainError) -> anyhow::Result<()> {
    let index = cd.variable("index");
    let found = zoom_to(m, CHAR_AT_QUERY, "arg", |n| {
        n.text() == index && is_char_at_argument(n)
    })?;
    if !found {
        zoom_to(m, CHAR_AT_QUERY, "arg", is_char_at_argument)?;
    }
    Ok(())
}

fn string_index_explain(cd: &ContextData, gen: &mut ExplainGenerator) {
    let length = cd.variable("length");
    if length.is_empty() {
        gen.add(format!(
            "This error occurs because the code is trying to access index {} that is beyond the length of the string.",
            cd.variable("index")
        ));
    } else {
        gen.add(format!(
            "This error occurs because the code is trying to access index {} of a string which only has {} characters.",
            cd.variable("index"),
            length
        ));
    }
}

fn string_index_fix(cd: &ContextData, gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    let Some(node) = main_node(cd) else {
        return Ok(());
    };
    let Some(object) = invocation_of(&node)
        .filter(|call| invoked_name(call) == "charAt")
        .and_then(|call| call.child_by_field_name("object"))
    else {
        return Ok(());
    };

    let stmt = enclosing_statement(node, BLOCKS);
    gen.add("Ensure the index is within the string length", |s| {
        let step = s.add_step("Check that the index used for accessing the character is within the valid range of the string length.")?;
        wrap_with_if(
            step,
            stmt,
            &format!("{} < {}.length()", node.text(), object.text()),
        );
        Ok(())
    })
}

// NumberFormatException

pub const NUMBER_FORMAT_EXCEPTION: ErrorTemplate = ErrorTemplate {
    name: "NumberFormatException",
    pattern: runtime_error!(
        r"java\.lang\.NumberFormatException",
        r#"For input string: "(?P<string>.*)"(?: under radix \d+)?"#
    ),
    on_analyze: Some(number_format_analyze),
    on_explain: Some(number_format_explain),
    on_bug_fix: Some(number_format_fix),
    ..ErrorTemplate::EMPTY
};

fn number_format_analyze(_cd: &ContextData, m: &mut MainError) -> anyhow::Result<()> {
    zoom_to(
        m,
        "(method_invocation arguments: (argument_list (_) @arg))",
        "arg",
        |n| invocation_of(n).is_some_and(|call| invoked_name(&call).starts_with("parse")),
    )?;
    Ok(())
}

fn number_format_explain(_cd: &ContextData, gen: &mut ExplainGenerator) {
    gen.add("This error occurs when there is an attempt to convert a string to a numeric type, but the string does not represent a valid number.");
}

fn number_format_fix(cd: &ContextData, gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    let Some(node) = main_node(cd) else {
        return Ok(());
    };
    let literal = match node.kind() {
        "string_literal" => Some(node),
        "identifier" => declarator_of(node.document(), node.text(), "(string_literal)")?
            .and_then(|d| d.child_by_field_name("value")),
        _ => None,
    };
    let Some(literal) = literal else {
        return Ok(());
    };

    // keep the quotes
    let start = literal.start_position();
    let end = literal.end_position();
    gen.add("Ensure valid input for parsing", |s| {
        s.add_step("Make sure the string contains a valid numeric representation before attempting to parse it.")?
            .add_fix(FixSuggestion::replace(
                "123",
                Position::new(start.line, start.column + 1),
                Position::new(end.line, end.column.saturating_sub(1)),
            ));
        Ok(())
    })
}

// PublicClassFilenameMismatchError

pub const PUBLIC_CLASS_FILENAME_MISMATCH_ERROR: ErrorTemplate = ErrorTemplate {
    name: "PublicClassFilenameMismatchError",
    pattern: concat!(
        "\"\"\"",
        r"$stacktrace: error: class (?P<className>\S+) is public, should be declared in a file named (?P<classFileName>\S+\.java)(?:.|\s)*"
    ),
    stack_trace_pattern: COMPILE_TIME_STACK_TRACE,
    on_analyze: Some(public_class_analyze),
    on_explain: Some(public_class_explain),
    on_bug_fix: Some(public_class_fix),
};

fn public_class_analyze(cd: &ContextData, m: &mut MainError) -> anyhow::Result<()> {
    let class_name = cd.variable("className");
    zoom_to(
        m,
        "(class_declaration name: (identifier) @name)",
        "name",
        |n| n.text() == class_name,
    )?;
    Ok(())
}

fn public_class_explain(_cd: &ContextData, gen: &mut ExplainGenerator) {
    gen.add("This error occurs because the name of the Java file does not match the name of the public class defined in it.");
}

fn public_class_fix(cd: &ContextData, gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    let Some(m) = cd.main_error() else {
        return Ok(());
    };
    let class_name = cd.variable("className");
    let expected_file = cd.variable("classFileName");
    let file_class = Path::new(m.document.path())
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    gen.add("Rename your file", |s| {
        s.add_step(format!(
            "Rename your file to `{}` to match the public class name `{}`.",
            expected_file, class_name
        ))?;
        Ok(())
    })?;

    let Some(node) = main_node(cd).filter(|n| n.text() == class_name) else {
        return Ok(());
    };
    gen.add("Rename the public class", |s| {
        s.add_step(format!(
            "Change the name of the public class to `{}` to match the file name.",
            file_class
        ))?
        .add_fix(FixSuggestion::replace(
            file_class.as_str(),
            node.start_position(),
            node.end_position(),
        ));
        Ok(())
    })
}

// SymbolNotFoundError

pub const SYMBOL_NOT_FOUND_ERROR: ErrorTemplate = ErrorTemplate {
    name: "SymbolNotFoundError",
    pattern: concat!(
        "\"\"\"",
        r"$stacktrace: error: cannot find symbol(?:.|\s)+symbol:\s+(?P<symbolType>variable|method|class) (?P<symbolName>\S+)\s+location:\s+(?:(?:class (?P<locationClass>\S+))|(?:variable (?P<locationVariable>\S+) of type (?P<locationVarType>\S+)))"
    ),
    stack_trace_pattern: COMPILE_TIME_STACK_TRACE,
    on_analyze: Some(symbol_not_found_analyze),
    on_explain: Some(symbol_not_found_explain),
    on_bug_fix: Some(symbol_not_found_fix),
};

#[derive(Debug, Default)]
struct SymbolNotFoundContext {
    /// `add` for the method symbol `add(int,int)`.
    name: String,
    /// Class the symbol was looked up in.
    location_class: String,
}

fn symbol_not_found_analyze(cd: &ContextData, m: &mut MainError) -> anyhow::Result<()> {
    let symbol_name = cd.variable("symbolName");
    let name = symbol_name.split('(').next().unwrap_or(symbol_name);
    let query = if cd.variable("symbolType") == "class" {
        "(type_identifier) @symbol"
    } else {
        "(identifier) @symbol"
    };
    zoom_to(m, query, "symbol", |n| n.text() == name)?;

    let mut location_class = cd.variable("locationClass").to_string();
    if location_class.is_empty() {
        location_class = cd.variable("locationVarType").to_string();
    }
    let variable = cd.variable("locationVariable");
    if location_class.is_empty() && !variable.is_empty() {
        let doc = Rc::clone(&m.document);
        location_class = SyntaxNode::root(&doc)
            .find_capture(
                "(local_variable_declaration declarator: (variable_declarator name: (identifier) @name))",
                "name",
                |n| n.text() == variable,
            )?
            .and_then(|n| n.parent())
            .and_then(|d| d.parent())
            .and_then(|d| d.child_by_field_name("type"))
            .map_or_else(String::new, |t| t.text().to_string());
    }

    m.set_context(SymbolNotFoundContext {
        name: name.to_string(),
        location_class,
    });
    Ok(())
}

fn symbol_not_found_explain(cd: &ContextData, gen: &mut ExplainGenerator) {
    let Some(ctx) = cd
        .main_error()
        .and_then(|m| m.context::<SymbolNotFoundContext>())
    else {
        return;
    };
    match cd.variable("symbolType") {
        "variable" => gen.add(format!(
            "The error indicates that the compiler cannot find variable \"{}\".",
            ctx.name
        )),
        "method" => gen.add(format!(
            "The error indicates that the compiler cannot find the method `{}` in the `{}` class.",
            ctx.name, ctx.location_class
        )),
        _ => gen.add(format!(
            "The error indicates that the compiler cannot find the class `{}` when attempting to create an instance of it in the `{}` class.",
            ctx.name, ctx.location_class
        )),
    }
}

fn symbol_not_found_fix(cd: &ContextData, gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    let Some(ctx) = cd
        .main_error()
        .and_then(|m| m.context::<SymbolNotFoundContext>())
    else {
        return Ok(());
    };
    let Some(node) = main_node(cd).filter(|n| n.text() == ctx.name) else {
        return Ok(());
    };

    match cd.variable("symbolType") {
        "variable" => missing_variable_fix(cd, gen, node, &ctx.name),
        "method" => missing_method_fix(cd, gen, node, ctx),
        _ => missing_class_fix(gen, node, ctx),
    }
}

/// The type of the other operand when `node` is one side of a binary
/// expression, if it has a known default value.
fn operand_type(cd: &ContextData, node: SyntaxNode<'_>) -> Option<String> {
    let parent = node.parent().filter(|p| p.kind() == "binary_expression")?;
    let left = parent.child_by_field_name("left")?;
    let other = if left.start_byte() == node.start_byte() {
        parent.child_by_field_name("right")?
    } else {
        left
    };
    let type_name = cd.analyzer()?.analyze_node(cd, other).name();
    default_value(&type_name).map(|_| type_name)
}

fn missing_variable_fix(
    cd: &ContextData,
    gen: &mut BugFixGenerator,
    node: SyntaxNode<'_>,
    name: &str,
) -> anyhow::Result<()> {
    let stmt = enclosing_statement(node, BLOCKS);
    let line = stmt.start_position().line;
    let indent = indentation(stmt.document().line_at(line));
    let type_name = operand_type(cd, node).unwrap_or_else(|| "String".to_string());
    let value = default_value(&type_name).unwrap_or("null");

    gen.add("Create a variable.", |s| {
        s.add_step(format!("Create a variable named \"{}\". For example:", name))?
            .add_fix(FixSuggestion::insert(
                format!("{}{} {} = {};\n", indent, type_name, name, value),
                Position::new(line, 0),
            ));
        Ok(())
    })
}

fn class_declaration<'a>(doc: &'a Document, name: &str) -> Result<Option<SyntaxNode<'a>>> {
    Ok(SyntaxNode::root(doc)
        .find_capture(
            "(class_declaration name: (identifier) @name)",
            "name",
            |n| n.text() == name,
        )?
        .and_then(|n| n.parent()))
}

fn missing_method_fix(
    cd: &ContextData,
    gen: &mut BugFixGenerator,
    node: SyntaxNode<'_>,
    ctx: &SymbolNotFoundContext,
) -> anyhow::Result<()> {
    let Some(body) = class_declaration(node.document(), &ctx.location_class)?
        .and_then(|c| c.child_by_field_name("body"))
    else {
        return Ok(());
    };
    let at = match body.named_children().into_iter().last() {
        Some(last) => last.end_position(),
        None => {
            let open = body.start_position();
            Position::new(open.line, open.column + 1)
        }
    };

    let signature = cd.variable("symbolName");
    let parameters: Vec<String> = signature
        .split_once('(')
        .map(|(_, rest)| rest.trim_end_matches(')'))
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .zip('a'..='z')
        .map(|(ty, name)| format!("{} {}", ty, name))
        .collect();

    gen.add("Define the missing method.", |s| {
        s.add_step(format!(
            "Add the missing method `{}` to the `{}` class.",
            ctx.name, ctx.location_class
        ))?
        .add_fix(FixSuggestion::insert(
            format!(
                "\n\n{i}private static void {}({}) {{\n{i}{i}// Add code here\n{i}}}",
                ctx.name,
                parameters.join(", "),
                i = INDENT
            ),
            at,
        ));
        Ok(())
    })
}

fn missing_class_fix(
    gen: &mut BugFixGenerator,
    node: SyntaxNode<'_>,
    ctx: &SymbolNotFoundContext,
) -> anyhow::Result<()> {
    let Some(class) = class_declaration(node.document(), &ctx.location_class)? else {
        return Ok(());
    };
    let line = class.start_position().line;

    gen.add("Create the missing class", |s| {
        s.add_step(format!(
            "Create a new class named `{}` to resolve the \"cannot find symbol\" error.",
            ctx.name
        ))?
        .add_fix(FixSuggestion::insert(
            format!(
                "class {name} {{\n{}// Add any necessary code for {name} class\n}}\n\n",
                INDENT,
                name = ctx.name
            ),
            Position::new(line, 0),
        ));
        Ok(())
    })
}

// MissingReturnError

pub const MISSING_RETURN_ERROR: ErrorTemplate = ErrorTemplate {
    name: "MissingReturnError",
    pattern: concat!(
        "\"\"\"",
        r"$stacktrace: error: missing return statement.*"
    ),
    stack_trace_pattern: COMPILE_TIME_STACK_TRACE,
    on_analyze: Some(missing_return_analyze),
    on_explain: Some(missing_return_explain),
    on_bug_fix: Some(missing_return_fix),
};

fn missing_return_analyze(_cd: &ContextData, m: &mut MainError) -> anyhow::Result<()> {
    let row = m.error_node.location.start.line.saturating_sub(1);
    let doc = Rc::clone(&m.document);
    let method = SyntaxNode::root(&doc).find_capture(
        "(method_declaration) @method",
        "method",
        |n| n.start_position().line <= row && row <= n.end_position().line,
    )?;
    if let Some(method) = method {
        m.nearest = Some(method.to_ref());
    }
    Ok(())
}

fn missing_return_explain(_cd: &ContextData, gen: &mut ExplainGenerator) {
    gen.add("This error occurs when a method is declared to return a value, but there is no return statement within the method.");
}

/// The last variable in scope at `index` whose type is `type_name`.
fn nearest_value_of_type(cd: &ContextData, path: &str, index: usize, type_name: &str) -> Option<String> {
    cd.symbol_tree(path)?
        .nearest_scope(index)
        .symbols()
        .into_iter()
        .filter(|s| matches!(s.kind(), SymbolKind::Variable | SymbolKind::Assignment))
        .filter(|s| s.return_type().is_some_and(|t| t.name() == type_name))
        .last()
        .map(|s| s.name())
}

fn missing_return_fix(cd: &ContextData, gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    let Some(method) = main_node(cd).filter(|n| n.kind() == "method_declaration") else {
        return Ok(());
    };
    let (Some(name), Some(return_type), Some(body)) = (
        method.child_by_field_name("name"),
        method.child_by_field_name("type"),
        method.child_by_field_name("body"),
    ) else {
        return Ok(());
    };

    let doc = method.document();
    let (at, index, indent) = match body.named_children().into_iter().last() {
        Some(last) => (
            last.end_position(),
            last.end_byte(),
            indentation(doc.line_at(last.start_position().line)).to_string(),
        ),
        None => {
            let open = body.start_position();
            (
                Position::new(open.line, open.column + 1),
                body.start_byte() + 1,
                format!("{}{}", indentation(doc.line_at(open.line)), INDENT),
            )
        }
    };

    let expected = match cd.analyzer() {
        Some(analyzer) => analyzer.analyze_node(cd, return_type).name(),
        None => return_type.text().to_string(),
    };
    let value = nearest_value_of_type(cd, doc.path(), index, &expected)
        .or_else(|| default_value(&expected).map(str::to_string))
        .unwrap_or_else(|| "null".to_string());

    gen.add("Provide a return statement", |s| {
        s.add_step(format!(
            "Since the `{}` method is declared to return an `{}`, you need to provide a return statement with the result.",
            name.text(),
            return_type.text()
        ))?
        .add_fix(
            FixSuggestion::insert(format!("\n{}return {};", indent, value), at)
                .with_description("This ensures that the method returns a value of the declared type."),
        );
        Ok(())
    })?;

    gen.add("Set the method return type to void", |s| {
        s.add_step(format!(
            "If you don't intend to return a value from the `{}` method, you can change its return type to `void`.",
            name.text()
        ))?
        .add_fix(
            FixSuggestion::replace(
                "void",
                return_type.start_position(),
                return_type.end_position(),
            )
            .with_description("This is appropriate if you're using the method for side effects rather than returning a value."),
        );
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

    const DIVIDE: &str = "public class Main {\n    static int divide(int a, int b) {\n        int result = a / b;\n        return result;\n    }\n}\n";

    #[test]
    fn test_arithmetic_guard() {
        let mut engine = setup("/work/Main.java", DIVIDE);
        let msg = "Exception in thread \"main\" java.lang.ArithmeticException: / by zero\n\tat Main.divide(Main.java:3)";
        let (template, cd) = engine.analyze("/work", msg).unwrap();
        assert_eq!(template.name(), "ArithmeticException");
        assert_eq!(cd.variable("thread"), "main");
        assert_eq!(main_node(&cd).unwrap().text(), "a / b");

        let out = engine.translate(&template, &cd).unwrap();
        assert!(out.contains("### Check the divisor before dividing"));
        assert!(out.contains(
            "+         if (b != 0) {\n+             int result = a / b;\n+         }"
        ));
    }

    #[test]
    fn test_jdk_frames_are_skipped() {
        let src = "public class Main {\n    public static void main(String[] args) {\n        int n = Integer.parseInt(\"x\") / 0;\n    }\n}\n";
        let mut engine = setup("/work/Main.java", src);
        let msg = "Exception in thread \"main\" java.lang.ArithmeticException: / by zero\n\tat java.base/java.lang.Integer.parseInt(Integer.java:652)\n\tat Main.main(Main.java:3)";
        let (_, cd) = engine.analyze("/work", msg).unwrap();
        assert_eq!(cd.store.documents.len(), 1);
        assert_eq!(cd.main_error().unwrap().document.path(), "/work/Main.java");
    }

    #[test]
    fn test_public_class_variables() {
        let mut engine = setup("/work/Main.java", "public class Hello {\n}\n");
        let msg = "Main.java:1: error: class Hello is public, should be declared in a file named Hello.java\npublic class Hello {\n       ^\n1 error";
        let (template, cd) = engine.analyze("/work", msg).unwrap();
        assert_eq!(template.name(), "PublicClassFilenameMismatchError");
        assert_eq!(cd.variable("className"), "Hello");
        assert_eq!(cd.variable("classFileName"), "Hello.java");
        assert_eq!(cd.trace_stack.len(), 1);
        assert_eq!(main_node(&cd).unwrap().text(), "Hello");
    }

    #[test]
    fn test_null_pointer_message_with_reason() {
        let src = "public class Main {\n    public static void main(String[] args) {\n        String s = null;\n        System.out.println(s.length());\n    }\n}\n";
        let mut engine = setup("/work/Main.java", src);
        let msg = "Exception in thread \"main\" java.lang.NullPointerException: Cannot invoke \"String.length()\" because \"<local1>\" is null\n\tat Main.main(Main.java:4)";
        let (template, cd) = engine.analyze("/work", msg).unwrap();
        assert_eq!(template.name(), "NullPointerException");
        assert!(cd.variable("reason").starts_with("Cannot invoke"));
        assert_eq!(cd.trace_stack.len(), 1);
        assert_eq!(main_node(&cd).unwrap().text(), "s.length()");
    }

    #[test]
    fn test_null_pointer_without_message() {
        let src = "public class Main {\n    public static void main(String[] args) {\n        String s = null;\n        s.trim();\n    }\n}\n";
        let mut engine = setup("/work/Main.java", src);
        let msg = "Exception in thread \"main\" java.lang.NullPointerException\n\tat Main.main(Main.java:4)";
        let (template, cd) = engine.analyze("/work", msg).unwrap();
        assert_eq!(template.name(), "NullPointerException");
        assert_eq!(cd.variable("reason"), "");

        let out = engine.translate(&template, &cd).unwrap();
        assert!(out.contains(
            "Your program tried to execute the \"trim\" method from \"s\" which is a null."
        ));
        assert!(out.contains("+         if (s != null) {\n+             s.trim();\n+         }"));
        assert!(out.contains("+         String s = \"\";"));
    }

    #[test]
    fn test_string_index_length_message() {
        let src = "public class Main {\n    public static void main(String[] args) {\n        String word = \"abc\";\n        int i = 7;\n        System.out.println(word.charAt(i));\n    }\n}\n";
        let mut engine = setup("/work/Main.java", src);
        let msg = "Exception in thread \"main\" java.lang.StringIndexOutOfBoundsException: Index 7 out of bounds for length 3\n\tat Main.main(Main.java:5)";
        let (template, cd) = engine.analyze("/work", msg).unwrap();
        assert_eq!(template.name(), "StringIndexOutOfBoundsException");
        assert_eq!(cd.variable("index"), "7");
        assert_eq!(cd.variable("length"), "3");
        assert_eq!(main_node(&cd).unwrap().text(), "i");

        let out = engine.translate(&template, &cd).unwrap();
        assert!(out.contains("access index 7 of a string which only has 3 characters."));
        assert!(out.contains("+         if (i < word.length()) {"));
    }

    #[test]
    fn test_number_format_literal_argument() {
        let src = "public class Main {\n    public static void main(String[] args) {\n        int n = Integer.parseInt(\"12a\");\n    }\n}\n";
        let mut engine = setup("/work/Main.java", src);
        let msg = "Exception in thread \"main\" java.lang.NumberFormatException: For input string: \"12a\"\n\tat java.base/java.lang.NumberFormatException.forInputString(NumberFormatException.java:67)\n\tat java.base/java.lang.Integer.parseInt(Integer.java:668)\n\tat Main.main(Main.java:3)";
        let (template, cd) = engine.analyze("/work", msg).unwrap();
        assert_eq!(template.name(), "NumberFormatException");
        assert_eq!(cd.variable("string"), "12a");
        assert_eq!(main_node(&cd).unwrap().kind(), "string_literal");

        let out = engine.translate(&template, &cd).unwrap();
        assert!(out.contains("+         int n = Integer.parseInt(\"123\");"));
    }

    #[test]
    fn test_symbol_not_found_method() {
        let src = "public class Main {\n    public static void main(String[] args) {\n        int sum = add(1, 2);\n    }\n}\n";
        let mut engine = setup("/work/Main.java", src);
        let msg = "Main.java:3: error: cannot find symbol\n        int sum = add(1, 2);\n                  ^\n  symbol:   method add(int,int)\n  location: class Main\n1 error";
        let (template, cd) = engine.analyze("/work", msg).unwrap();
        assert_eq!(template.name(), "SymbolNotFoundError");
        assert_eq!(cd.variable("symbolType"), "method");
        assert_eq!(cd.variable("symbolName"), "add(int,int)");
        assert_eq!(main_node(&cd).unwrap().text(), "add");

        let out = engine.translate(&template, &cd).unwrap();
        assert!(out.contains("cannot find the method `add` in the `Main` class."));
        assert!(out.contains("### Define the missing method."));
        assert!(out.contains("+     private static void add(int a, int b) {\n+         // Add code here\n+     }"));
    }

    #[test]
    fn test_symbol_not_found_class() {
        let src = "public class Main {\n    public static void main(String[] args) {\n        Helper h = new Helper();\n    }\n}\n";
        let mut engine = setup("/work/Main.java", src);
        let msg = "Main.java:3: error: cannot find symbol\n        Helper h = new Helper();\n        ^\n  symbol:   class Helper\n  location: class Main\n1 error";
        let (template, cd) = engine.analyze("/work", msg).unwrap();
        assert_eq!(cd.variable("symbolType"), "class");
        assert_eq!(main_node(&cd).unwrap().kind(), "type_identifier");

        let out = engine.translate(&template, &cd).unwrap();
        assert!(out.contains("cannot find the class `Helper` when attempting to create an instance of it in the `Main` class."));
        assert!(out.contains("+ class Helper {\n+     // Add any necessary code for Helper class\n+ }\n+ \n+ public class Main {"));
    }

    #[test]
    fn test_missing_return_without_candidates() {
        let src = "public class Main {\n    static String name(int id) {\n        System.out.println(id);\n    }\n}\n";
        let mut engine = setup("/work/Main.java", src);
        let msg = "Main.java:4: error: missing return statement\n    }\n    ^\n1 error";
        let (template, cd) = engine.analyze("/work", msg).unwrap();
        assert_eq!(template.name(), "MissingReturnError");
        assert_eq!(main_node(&cd).unwrap().kind(), "method_declaration");

        let out = engine.translate(&template, &cd).unwrap();
        assert!(out.contains("+         return \"\";"));
        assert!(out.contains("+     static void name(int id) {"));
    }

    #[test]
    fn test_default_value() {
        assert_eq!(default_value("long"), Some("0L"));
        assert_eq!(default_value("String"), Some("\"\""));
        assert_eq!(default_value("Scanner"), None);
    }
}
