//! Java language plug-in.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use crate::context::ContextData;
use crate::fs::VirtualFs;
use crate::language::{ExternFile, ImportParams, Language, LanguageAnalyzer, ResolvedImport};
use crate::node::SyntaxNode;
use crate::symbols::{get_from_symbol, unwrap_return_type, Symbol, SymbolKind, SymbolRef};

use super::JAVA;

const SYMBOLS_QUERY: &str = r#"
(import_declaration
  (scoped_identifier) @import.name) @import

(class_declaration
  name: (identifier) @class.name
  body: (class_body) @class.body) @class

(method_declaration
  type: (_) @method.return-type
  name: (identifier) @method.name
  parameters: (formal_parameters
    (formal_parameter
      type: (_) @parameter.return-type
      name: (identifier) @parameter.name)* @parameter)
  body: (block) @method.body) @method

(local_variable_declaration
  type: (_) @variable.return-type
  declarator: (variable_declarator
    name: (identifier) @variable.name)) @variable

(field_declaration
  type: (_) @variable.return-type
  declarator: (variable_declarator
    name: (identifier) @variable.name)) @variable

(assignment_expression
  left: (identifier) @assignment.name
  right: (_) @assignment.content) @assignment
"#;

const BUILTIN_TYPES: &[&str] = &[
    "null", "boolean", "String", "byte", "short", "int", "long", "char", "float", "double", "void",
];

/// JDK classes described for method and field resolution.
const EXTERNS: &[(&str, &str)] = &[
    (
        "String.json",
        r#"{
  "name": "String",
  "package": "java.lang",
  "methods": [
    { "name": "length", "returnType": "int" },
    { "name": "charAt", "returnType": "char" },
    { "name": "substring", "returnType": "String" },
    { "name": "indexOf", "returnType": "int" },
    { "name": "equals", "returnType": "boolean" },
    { "name": "isEmpty", "returnType": "boolean" },
    { "name": "trim", "returnType": "String" },
    { "name": "toUpperCase", "returnType": "String" },
    { "name": "toLowerCase", "returnType": "String" },
    { "name": "split", "returnType": "String[]" }
  ]
}"#,
    ),
    (
        "Math.json",
        r#"{
  "name": "Math",
  "package": "java.lang",
  "methods": [
    { "name": "abs", "returnType": "int" },
    { "name": "max", "returnType": "int" },
    { "name": "min", "returnType": "int" },
    { "name": "pow", "returnType": "double" },
    { "name": "sqrt", "returnType": "double" },
    { "name": "random", "returnType": "double" },
    { "name": "floor", "returnType": "double" },
    { "name": "ceil", "returnType": "double" }
  ],
  "fields": [
    { "name": "PI", "returnType": "double" },
    { "name": "E", "returnType": "double" }
  ]
}"#,
    ),
    (
        "Integer.json",
        r#"{
  "name": "Integer",
  "package": "java.lang",
  "methods": [
    { "name": "parseInt", "returnType": "int" },
    { "name": "valueOf", "returnType": "int" },
    { "name": "toString", "returnType": "String" }
  ],
  "fields": [
    { "name": "MAX_VALUE", "returnType": "int" },
    { "name": "MIN_VALUE", "returnType": "int" }
  ]
}"#,
    ),
];

/// JDK sources that show up in runtime stack traces.
const STUB_FILES: &[&str] = &[
    "Integer.java",
    "String.java",
    "Math.java",
    "NumberFormatException.java",
    "ArrayList.java",
    "Objects.java",
    "Scanner.java",
];

const COMPARISON_OPERATORS: &[&str] = &["==", "!=", "<", ">", "<=", ">=", "&&", "||", "instanceof"];

pub(crate) fn language() -> Language {
    Language::new("Java", grammar)
        .with_file_patterns(&[".java"])
        .with_stack_trace_pattern(r"\s+at (?P<symbol>\S+)\((?P<path>\S+):(?P<position>\d+)\)")
        .with_symbols_query(SYMBOLS_QUERY)
        .with_analyzer(create_analyzer)
        .with_stub_fs(stub_fs)
        .with_externs(EXTERNS)
}

fn grammar() -> tree_sitter::Language {
    tree_sitter_java::LANGUAGE.into()
}

fn create_analyzer(_cd: &ContextData) -> Box<dyn LanguageAnalyzer> {
    Box::new(JavaAnalyzer::new())
}

fn stub_fs() -> VirtualFs {
    STUB_FILES
        .iter()
        .fold(VirtualFs::new(), |fs, name| fs.stub(*name))
}

/// Type inference for Java expressions.
pub struct JavaAnalyzer {
    builtins: HashMap<&'static str, SymbolRef>,
}

impl JavaAnalyzer {
    pub fn new() -> Self {
        let builtins = BUILTIN_TYPES
            .iter()
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

    /// Resolves a type written as text, e.g. `int` or `String[]`.
    fn type_from_name(&self, cd: &ContextData, name: &str) -> SymbolRef {
        if let Some(element) = name.strip_suffix("[]") {
            return Rc::new(Symbol::Array {
                value: self.type_from_name(cd, element),
                length: 0,
            });
        }
        self.find_symbol(name)
            .or_else(|| cd.symbol_tree(&cd.current_document_path)?.find(name))
            .unwrap_or_else(Symbol::unresolved)
    }

    fn analyze_array_creation(&self, cd: &ContextData, node: SyntaxNode<'_>) -> SymbolRef {
        let value = match node.child_by_field_name("type") {
            Some(ty) => self.analyze_node(cd, ty),
            None => self.fallback_symbol(),
        };
        let length = node
            .named_children()
            .into_iter()
            .find_map(|child| match child.kind() {
                "dimensions_expr" => child.named_child(0)?.text().parse().ok(),
                "array_initializer" => Some(child.named_child_count()),
                _ => None,
            })
            .unwrap_or(0);
        Rc::new(Symbol::Array { value, length })
    }

    fn analyze_field_access(&self, cd: &ContextData, node: SyntaxNode<'_>) -> SymbolRef {
        let (Some(object), Some(field)) = (
            node.child_by_field_name("object"),
            node.child_by_field_name("field"),
        ) else {
            return self.fallback_symbol();
        };

        if let Some(ext) = self.static_extern(cd, object) {
            return match ext.field(field.text()) {
                Some(member) => self.type_from_name(cd, &member.return_type),
                None => Symbol::unresolved(),
            };
        }

        let object = self.analyze_node(cd, object);
        if matches!(*object, Symbol::Array { .. }) && field.text() == "length" {
            return self.builtin("int");
        }
        if let Some(member) = JAVA
            .extern_file(&object.name())
            .and_then(|ext| ext.field(field.text()))
        {
            return self.type_from_name(cd, &member.return_type);
        }
        get_from_symbol(&object, field.text())
            .map(|sym| unwrap_return_type(&sym))
            .unwrap_or_else(Symbol::unresolved)
    }

    fn analyze_method_invocation(&self, cd: &ContextData, node: SyntaxNode<'_>) -> SymbolRef {
        let Some(name) = node.child_by_field_name("name") else {
            return self.fallback_symbol();
        };
        let arg_count = node
            .child_by_field_name("arguments")
            .map(|args| args.named_child_count())
            .unwrap_or(0);

        let method = match node.child_by_field_name("object") {
            Some(object) => {
                if let Some(ext) = self.static_extern(cd, object) {
                    return match ext.method(name.text()) {
                        Some(member) => self.type_from_name(cd, &member.return_type),
                        None => Symbol::unresolved(),
                    };
                }
                let object = self.analyze_node(cd, object);
                if let Some(member) = JAVA
                    .extern_file(&object.name())
                    .and_then(|ext| ext.method(name.text()))
                {
                    return self.type_from_name(cd, &member.return_type);
                }
                get_from_symbol(&object, name.text())
            }
            None => cd.find_symbol(name.text(), name.start_byte()),
        };

        let Some(method) = method else {
            return Symbol::unresolved();
        };
        if let Some(scope) = method.children() {
            let params = scope.symbols().iter().filter(|s| s.is_param()).count();
            if params != arg_count {
                return Symbol::unresolved();
            }
        }
        method.return_type().unwrap_or_else(|| self.fallback_symbol())
    }

    /// A static member access on a JDK class such as `Math.PI`.
    fn static_extern(
        &self,
        cd: &ContextData,
        object: SyntaxNode<'_>,
    ) -> Option<&'static ExternFile> {
        if object.kind() != "identifier" {
            return None;
        }
        if cd.find_symbol(object.text(), object.start_byte()).is_some() {
            return None;
        }
        JAVA.extern_file(object.text())
    }

    fn analyze_binary(&self, cd: &ContextData, node: SyntaxNode<'_>) -> SymbolRef {
        let operator = node
            .child_by_field_name("operator")
            .map(|op| op.text())
            .unwrap_or("");
        if COMPARISON_OPERATORS.contains(&operator) {
            return self.builtin("boolean");
        }

        let left = node
            .child_by_field_name("left")
            .map(|n| self.analyze_node(cd, n))
            .unwrap_or_else(|| self.fallback_symbol());
        let right = node
            .child_by_field_name("right")
            .map(|n| self.analyze_node(cd, n))
            .unwrap_or_else(|| self.fallback_symbol());

        let names = [left.name(), right.name()];
        if operator == "+" && names.iter().any(|n| n == "String") {
            return self.builtin("String");
        }
        for wide in ["double", "float", "long"] {
            if names.iter().any(|n| n == wide) {
                return self.builtin(wide);
            }
        }
        left
    }
}

impl Default for JavaAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for JavaAnalyzer {
    fn fallback_symbol(&self) -> SymbolRef {
        self.builtins
            .get("void")
            .cloned()
            .unwrap_or_else(|| Symbol::builtin("void"))
    }

    fn find_symbol(&self, name: &str) -> Option<SymbolRef> {
        self.builtins.get(name).cloned()
    }

    fn analyze_node(&self, cd: &ContextData, node: SyntaxNode<'_>) -> SymbolRef {
        match node.kind() {
            "integral_type" | "floating_point_type" | "boolean_type" | "void_type" => {
                self.builtin(node.text())
            }
            "type_identifier" => self.type_from_name(cd, node.text()),
            "generic_type" | "scoped_type_identifier" => match node.named_child(0) {
                Some(inner) => self.analyze_node(cd, inner),
                None => self.fallback_symbol(),
            },
            "array_type" => {
                let value = match node.child_by_field_name("element") {
                    Some(element) => self.analyze_node(cd, element),
                    None => self.fallback_symbol(),
                };
                Rc::new(Symbol::Array { value, length: 0 })
            }
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal" => {
                if node.text().ends_with(['l', 'L']) {
                    self.builtin("long")
                } else {
                    self.builtin("int")
                }
            }
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                if node.text().ends_with(['f', 'F']) {
                    self.builtin("float")
                } else {
                    self.builtin("double")
                }
            }
            "true" | "false" => self.builtin("boolean"),
            "string_literal" => self.builtin("String"),
            "character_literal" => self.builtin("char"),
            "null_literal" => self.builtin("null"),
            "array_creation_expression" => self.analyze_array_creation(cd, node),
            "array_initializer" => {
                let value = match node.named_child(0) {
                    Some(first) => self.analyze_node(cd, first),
                    None => self.fallback_symbol(),
                };
                Rc::new(Symbol::Array {
                    value,
                    length: node.named_child_count(),
                })
            }
            "object_creation_expression" => match node.child_by_field_name("type") {
                Some(ty) => self.analyze_node(cd, ty),
                None => self.fallback_symbol(),
            },
            "cast_expression" => match node.child_by_field_name("type") {
                Some(ty) => self.analyze_node(cd, ty),
                None => self.fallback_symbol(),
            },
            "parenthesized_expression" => match node.named_child(0) {
                Some(inner) => self.analyze_node(cd, inner),
                None => self.fallback_symbol(),
            },
            "ternary_expression" => match node.child_by_field_name("consequence") {
                Some(inner) => self.analyze_node(cd, inner),
                None => self.fallback_symbol(),
            },
            "identifier" => match cd.find_symbol(node.text(), node.start_byte()) {
                Some(sym) if matches!(sym.kind(), SymbolKind::Variable | SymbolKind::Assignment) => {
                    unwrap_return_type(&sym)
                }
                Some(sym) => sym,
                None => Symbol::unresolved(),
            },
            "array_access" => {
                let array = match node.child_by_field_name("array") {
                    Some(array) => self.analyze_node(cd, array),
                    None => return self.fallback_symbol(),
                };
                match &*array {
                    Symbol::Array { value, .. } => Rc::clone(value),
                    _ => self.fallback_symbol(),
                }
            }
            "field_access" => self.analyze_field_access(cd, node),
            "method_invocation" => self.analyze_method_invocation(cd, node),
            "binary_expression" => self.analyze_binary(cd, node),
            _ => self.fallback_symbol(),
        }
    }

    fn analyze_import(&self, _cd: &ContextData, params: ImportParams<'_>) -> ResolvedImport {
        let Some(name) = params.name else {
            return ResolvedImport::default();
        };
        let qualified = name.text();
        let class_name = qualified.rsplit('.').next().unwrap_or(qualified);

        let dir = Path::new(params.current_path)
            .parent()
            .unwrap_or_else(|| Path::new(""));
        let candidate = dir.join(format!("{}.java", class_name));
        if !params.has_source(&candidate) {
            return ResolvedImport::default();
        }

        ResolvedImport {
            path: candidate.to_string_lossy().to_string(),
            name: class_name.to_string(),
            symbols: vec![class_name.to_string()],
        }
    }
}
