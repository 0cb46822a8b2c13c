//! A minimal language used by the test suite.
//!
//! It parses with the Python grammar and reads stack frames of the form
//! `in <symbol> at <path>:<line>`.

use std::collections::HashMap;

use crate::context::ContextData;
use crate::language::{ImportParams, Language, LanguageAnalyzer, ResolvedImport};
use crate::node::SyntaxNode;
use crate::symbols::{Symbol, SymbolRef};

const SYMBOLS_QUERY: &str = r#"
(function_definition
  name: (identifier) @function.name
  body: (block) @function.body) @function

(assignment
  left: (identifier) @variable.name
  right: (_) @variable.content) @variable
"#;

pub(crate) fn language() -> Language {
    Language::new("TestLang", grammar)
        .with_file_patterns(&[".test"])
        .with_stack_trace_pattern(r"\sin (?P<symbol>\S+) at (?P<path>\S+):(?P<position>\d+)")
        .with_symbols_query(SYMBOLS_QUERY)
        .with_analyzer(create_analyzer)
}

fn grammar() -> tree_sitter::Language {
    tree_sitter_python::LANGUAGE.into()
}

fn create_analyzer(_cd: &ContextData) -> Box<dyn LanguageAnalyzer> {
    Box::new(TestAnalyzer::default())
}

struct TestAnalyzer {
    builtins: HashMap<&'static str, SymbolRef>,
}

impl Default for TestAnalyzer {
    fn default() -> Self {
        let builtins = ["any", "int", "str"]
            .into_iter()
            .map(|name| (name, Symbol::builtin(name)))
            .collect();
        Self { builtins }
    }
}

impl LanguageAnalyzer for TestAnalyzer {
    fn fallback_symbol(&self) -> SymbolRef {
        self.find_symbol("any")
            .unwrap_or_else(|| Symbol::builtin("any"))
    }

    fn find_symbol(&self, name: &str) -> Option<SymbolRef> {
        self.builtins.get(name).cloned()
    }

    fn analyze_node(&self, _cd: &ContextData, node: SyntaxNode<'_>) -> SymbolRef {
        let name = match node.kind() {
            "integer" => "int",
            "string" => "str",
            _ => "any",
        };
        self.find_symbol(name)
            .unwrap_or_else(|| self.fallback_symbol())
    }

    fn analyze_import(&self, _cd: &ContextData, _params: ImportParams<'_>) -> ResolvedImport {
        ResolvedImport::default()
    }
}
