//! Bundled error templates.
//!
//! Each language module exposes its templates as constants and a `load`
//! function that registers them.

pub mod java;
pub mod python;

use std::rc::Rc;

use crate::context::{ContextData, MainError};
use crate::error::Result;
use crate::languages;
use crate::node::SyntaxNode;
use crate::template::{ErrorTemplates, FALLBACK_ERROR_TEMPLATE};

/// Registers the bundled languages, every bundled template and the fallback.
pub fn load_all(templates: &mut ErrorTemplates) -> Result<()> {
    languages::register_languages();
    python::load(templates)?;
    java::load(templates)?;
    templates.add_fallback(FALLBACK_ERROR_TEMPLATE)?;
    Ok(())
}

/// Moves the main error to the first `capture` of `query` below the current
/// nearest node that satisfies `pred`. Returns whether a node was found.
pub(crate) fn zoom_to(
    m: &mut MainError,
    query: &str,
    capture: &str,
    pred: impl Fn(&SyntaxNode<'_>) -> bool,
) -> anyhow::Result<bool> {
    let doc = Rc::clone(&m.document);
    let Some(nearest) = m.nearest.and_then(|r| r.resolve(&doc)) else {
        return Ok(false);
    };
    match nearest.find_capture(query, capture, pred)? {
        Some(found) => {
            m.nearest = Some(found.to_ref());
            Ok(true)
        }
        None => Ok(false),
    }
}

/// The nearest node of the main error.
pub(crate) fn main_node(cd: &ContextData) -> Option<SyntaxNode<'_>> {
    cd.main_error()?.nearest()
}

/// The outermost ancestor of `node` (itself included) whose parent is one of
/// `containers`.
pub(crate) fn enclosing_statement<'a>(node: SyntaxNode<'a>, containers: &[&str]) -> SyntaxNode<'a> {
    node.ancestor(|n| n.parent().map_or(true, |p| containers.contains(&p.kind())))
        .unwrap_or(node)
}

/// Leading whitespace of `line`.
pub(crate) fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Whether `node` is a numeric literal equal to zero.
pub(crate) fn is_zero_literal(node: &SyntaxNode<'_>) -> bool {
    const NUMERIC: &[&str] = &[
        "integer",
        "float",
        "decimal_integer_literal",
        "decimal_floating_point_literal",
    ];
    if !NUMERIC.contains(&node.kind()) {
        return false;
    }
    node.text()
        .trim_end_matches(|c: char| "fFdDlL".contains(c))
        .replace('_', "")
        .parse::<f64>()
        .is_ok_and(|v| v == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_all() {
        let mut templates = ErrorTemplates::new();
        load_all(&mut templates).unwrap();
        assert!(templates.find("Python", "NameError").is_some());
        assert!(templates.find("Java", "ArrayIndexOutOfBoundsException").is_some());
        for name in [
            "NullPointerException",
            "NumberFormatException",
            "StringIndexOutOfBoundsException",
            "NegativeArraySizeException",
            "SymbolNotFoundError",
            "MissingReturnError",
        ] {
            assert!(templates.find("Java", name).is_some(), "{}", name);
        }
        assert!(templates.fallback().is_some());

        let count = templates.len();
        load_all(&mut templates).unwrap();
        assert_eq!(templates.len(), count);
    }

    #[test]
    fn test_indentation() {
        assert_eq!(indentation("    return a"), "    ");
        assert_eq!(indentation("\tx"), "\t");
        assert_eq!(indentation("x = 1"), "");
    }
}
