//! Python language plug-in.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use crate::context::ContextData;
use crate::language::{ImportParams, Language, LanguageAnalyzer, ResolvedImport};
use crate::node::SyntaxNode;
use crate::symbols::{get_from_symbol, unwrap_return_type, Symbol, SymbolKind, SymbolRef};

const SYMBOLS_QUERY: &str = r#"
(import_statement
  name: (dotted_name) @import.name) @import

(import_from_statement
  module_name: (dotted_name) @import.name) @import

(class_definition
  name: (identifier) @class.name
  body: (block) @class.body) @class

(function_definition
  name: (identifier) @function.name
  parameters: (parameters
    [
      (identifier) @parameter @parameter.name
      (typed_parameter
        (identifier) @parameter.name
        type: (type) @parameter.return-type) @parameter
      (default_parameter
        name: (identifier) @parameter.name) @parameter
      (typed_default_parameter
        name: (identifier) @parameter.name
        type: (type) @parameter.return-type) @parameter
      (list_splat_pattern
        (identifier) @parameter.name) @parameter
      (dictionary_splat_pattern
        (identifier) @parameter.name) @parameter
    ]*)
  body: (block) @function.body) @function

(assignment
  left: (identifier) @variable.name
  right: (_) @variable.content) @variable

(assignment
  left: (identifier) @variable.name
  type: (type) @variable.return-type) @variable
"#;

const BUILTIN_TYPES: &[&str] = &["none", "any", "void", "bool", "str", "int", "float"];
const COLLECTION_TYPES: &[&str] = &["list", "dict", "tuple", "set"];

pub(crate) fn language() -> Language {
    Language::new("Python", grammar)
        .with_file_patterns(&[".py"])
        .with_stack_trace_pattern(
            r#"\s*File "(?P<path>[^"]+)", line (?P<position>\d+)(?:, in (?P<symbol>\S+))?"#,
        )
        .with_error_pattern(r"Traceback \(most recent call last\):$stacktrace$message")
        .with_symbols_query(SYMBOLS_QUERY)
        .with_analyzer(create_analyzer)
}

fn grammar() -> tree_sitter::Language {
    tree_sitter_python::LANGUAGE.into()
}

fn create_analyzer(_cd: &ContextData) -> Box<dyn LanguageAnalyzer> {
    Box::new(PythonAnalyzer::new())
}

/// Type inference for Python expressions and type hints.
pub struct PythonAnalyzer {
    builtins: HashMap<&'static str, SymbolRef>,
}

impl PythonAnalyzer {
    pub fn new() -> Self {
        let builtins = BUILTIN_TYPES
            .iter()
            .chain(COLLECTION_TYPES)
            .map(|name| (*name, Symbol::builtin(*name)))
            .collect();
        Self { builtins }
    }

    fn builtin(&self, name: &str) -> SymbolRef {
        self.builtins
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.fallback_symbol())
    }

    fn analyze_identifier(&self, cd: &ContextData, node: SyntaxNode<'_>) -> SymbolRef {
        if let Some(sym) = self.find_symbol(node.text()) {
            return sym;
        }
        match cd.find_symbol(node.text(), node.start_byte()) {
            Some(sym) if matches!(sym.kind(), SymbolKind::Variable | SymbolKind::Assignment) => {
                unwrap_return_type(&sym)
            }
            Some(sym) => sym,
            None => Symbol::unresolved(),
        }
    }

    /// `list[int]`, `dict[str, int]` and friends.
    fn analyze_collection(
        &self,
        cd: &ContextData,
        base: SyntaxNode<'_>,
        params: Vec<SyntaxNode<'_>>,
    ) -> SymbolRef {
        let name = base.text();
        if !COLLECTION_TYPES.contains(&name) {
            return self.analyze_node(cd, base);
        }
        let mut types = params.into_iter().map(|p| self.analyze_node(cd, p));
        let first = types.next().unwrap_or_else(|| self.builtin("any"));
        let (key, value) = match (name, types.next()) {
            ("dict", Some(value)) => (Some(first), value),
            _ => (None, first),
        };
        Rc::new(Symbol::Collection {
            name: name.to_string(),
            key,
            value,
        })
    }

    fn analyze_call(&self, cd: &ContextData, node: SyntaxNode<'_>) -> SymbolRef {
        let Some(function) = node.child_by_field_name("function") else {
            return self.fallback_symbol();
        };
        let sym = self.analyze_node(cd, function);
        match sym.kind() {
            SymbolKind::Function | SymbolKind::Method => sym
                .return_type()
                .unwrap_or_else(|| self.fallback_symbol()),
            _ => sym,
        }
    }
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for PythonAnalyzer {
    fn fallback_symbol(&self) -> SymbolRef {
        self.builtins
            .get("any")
            .cloned()
            .unwrap_or_else(|| Symbol::builtin("any"))
    }

    fn find_symbol(&self, name: &str) -> Option<SymbolRef> {
        self.builtins.get(name).cloned()
    }

    fn analyze_node(&self, cd: &ContextData, node: SyntaxNode<'_>) -> SymbolRef {
        match node.kind() {
            "type" | "parenthesized_expression" => match node.named_child(0) {
                Some(inner) => self.analyze_node(cd, inner),
                None => self.fallback_symbol(),
            },
            "true" | "false" | "comparison_operator" | "not_operator" => self.builtin("bool"),
            "string" | "concatenated_string" => self.builtin("str"),
            "integer" => self.builtin("int"),
            "float" => self.builtin("float"),
            "none" => self.builtin("none"),
            "list" | "list_comprehension" => self.builtin("list"),
            "dictionary" | "dictionary_comprehension" => self.builtin("dict"),
            "tuple" => self.builtin("tuple"),
            "set" | "set_comprehension" => self.builtin("set"),
            "identifier" => self.analyze_identifier(cd, node),
            "attribute" => {
                let (Some(object), Some(attribute)) = (
                    node.child_by_field_name("object"),
                    node.child_by_field_name("attribute"),
                ) else {
                    return self.fallback_symbol();
                };
                let object = self.analyze_node(cd, object);
                get_from_symbol(&object, attribute.text())
                    .map(|sym| unwrap_return_type(&sym))
                    .unwrap_or_else(|| self.fallback_symbol())
            }
            "subscript" => match node.child_by_field_name("value") {
                Some(value) => {
                    let params = node
                        .named_children()
                        .into_iter()
                        .skip(1)
                        .collect();
                    self.analyze_collection(cd, value, params)
                }
                None => self.fallback_symbol(),
            },
            "generic_type" => {
                let children = node.named_children();
                let Some((base, rest)) = children.split_first() else {
                    return self.fallback_symbol();
                };
                let params = rest
                    .iter()
                    .flat_map(|p| match p.kind() {
                        "type_parameter" => p.named_children(),
                        _ => vec![*p],
                    })
                    .collect();
                self.analyze_collection(cd, *base, params)
            }
            "call" => self.analyze_call(cd, node),
            "binary_operator" => match node.child_by_field_name("left") {
                Some(left) => self.analyze_node(cd, left),
                None => self.fallback_symbol(),
            },
            _ => self.fallback_symbol(),
        }
    }

    fn analyze_import(&self, _cd: &ContextData, params: ImportParams<'_>) -> ResolvedImport {
        let Some(module) = params.name else {
            return ResolvedImport::default();
        };

        let symbols = if params.node.kind() == "import_from_statement" {
            let raw = params.node.raw();
            let mut cursor = raw.walk();
            let doc = params.node.document();
            raw.children_by_field_name("name", &mut cursor)
                .map(|n| SyntaxNode::new(doc, n).text().to_string())
                .collect()
        } else {
            Vec::new()
        };

        let relative = format!("{}.py", module.text().replace('.', "/"));
        let dir = Path::new(params.current_path)
            .parent()
            .unwrap_or_else(|| Path::new(""));
        let candidate = dir.join(relative);
        if !params.has_source(&candidate) {
            log::debug!("unresolved python import {}", module.text());
            return ResolvedImport::default();
        }

        ResolvedImport {
            path: candidate.to_string_lossy().to_string(),
            name: module.text().to_string(),
            symbols,
        }
    }
}
