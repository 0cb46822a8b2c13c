//! Language descriptors and the per-language analyzer interface.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, RwLock};

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;
use tree_sitter::Query;

use crate::context::ContextData;
use crate::error::{Error, Result};
use crate::fs::{ReadFileFs, VirtualFs};
use crate::node::SyntaxNode;
use crate::source::{Location, Position};
use crate::symbols::SymbolRef;

/// Converts a raw `(path, position)` pair taken from a stack frame into a location.
pub type LocationConverter = fn(path: &str, position: &str) -> Location;

/// Creates the analyzer used while a context is being analyzed.
pub type AnalyzerFactory = fn(&ContextData) -> Box<dyn LanguageAnalyzer>;

/// Language-specific semantic analysis.
pub trait LanguageAnalyzer {
    /// The symbol used when nothing better can be inferred.
    fn fallback_symbol(&self) -> SymbolRef;

    /// Looks up a builtin symbol by name.
    fn find_symbol(&self, name: &str) -> Option<SymbolRef>;

    /// Infers the value (type) symbol of an expression or type node.
    fn analyze_node(&self, cd: &ContextData, node: SyntaxNode<'_>) -> SymbolRef;

    /// Resolves an import statement into a dependency edge.
    fn analyze_import(&self, cd: &ContextData, params: ImportParams<'_>) -> ResolvedImport;
}

/// Input to [`LanguageAnalyzer::analyze_import`].
#[derive(Clone, Copy)]
pub struct ImportParams<'a> {
    /// The node captured as `import`.
    pub node: SyntaxNode<'a>,
    /// The node captured as `import.name`, if any.
    pub name: Option<SyntaxNode<'a>>,
    pub current_path: &'a str,
    /// The filesystem the engine reads documents from.
    pub fs: &'a dyn ReadFileFs,
}

impl ImportParams<'_> {
    /// Whether `path` is a source file the engine could load. Stub files do
    /// not count.
    pub fn has_source(&self, path: &Path) -> bool {
        self.fs.exists(path)
            && self
                .fs
                .read_file(path)
                .map(|contents| !contents.is_empty())
                .unwrap_or(false)
    }
}

impl fmt::Debug for ImportParams<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportParams")
            .field("node", &self.node)
            .field("name", &self.name)
            .field("current_path", &self.current_path)
            .finish_non_exhaustive()
    }
}

/// The dependency an import statement points at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedImport {
    /// Path of the imported document; empty when it could not be resolved.
    pub path: String,
    /// The alias the import is bound to.
    pub name: String,
    pub symbols: Vec<String>,
}

/// A class description embedded as JSON in a language.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExternFile {
    pub name: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub methods: Vec<ExternMember>,
    #[serde(default)]
    pub fields: Vec<ExternMember>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExternMember {
    pub name: String,
    #[serde(rename = "returnType")]
    pub return_type: String,
}

impl ExternFile {
    pub fn method(&self, name: &str) -> Option<&ExternMember> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&ExternMember> {
        self.fields.iter().find(|m| m.name == name)
    }
}

struct CompiledLanguage {
    stack_trace: Regex,
    query: Query,
    externs: Vec<ExternFile>,
}

/// A programming language known to the engine.
pub struct Language {
    pub name: &'static str,
    /// File suffixes handled by this language (e.g. `.py`).
    pub file_patterns: &'static [&'static str],
    /// Regex with the named groups `symbol`, `path` and `position`.
    pub stack_trace_pattern: &'static str,
    /// Layout of a full error message, using `$message` and `$stacktrace`.
    pub error_pattern: &'static str,
    /// Capture query used to build symbol trees.
    pub symbols_query: &'static str,
    pub location_converter: Option<LocationConverter>,
    pub analyzer_factory: Option<AnalyzerFactory>,
    pub stub_fs: Option<fn() -> VirtualFs>,
    /// `(file name, JSON)` extern symbol files.
    pub externs: &'static [(&'static str, &'static str)],
    grammar: fn() -> tree_sitter::Language,
    compiled: OnceCell<CompiledLanguage>,
    /// Ad-hoc queries compiled by templates, keyed by their source.
    queries: RwLock<HashMap<String, Arc<Query>>>,
}

impl Language {
    pub fn new(name: &'static str, grammar: fn() -> tree_sitter::Language) -> Self {
        Self {
            name,
            file_patterns: &[],
            stack_trace_pattern: "",
            error_pattern: "",
            symbols_query: "",
            location_converter: None,
            analyzer_factory: None,
            stub_fs: None,
            externs: &[],
            grammar,
            compiled: OnceCell::new(),
            queries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_file_patterns(mut self, patterns: &'static [&'static str]) -> Self {
        self.file_patterns = patterns;
        self
    }

    pub fn with_stack_trace_pattern(mut self, pattern: &'static str) -> Self {
        self.stack_trace_pattern = pattern;
        self
    }

    pub fn with_error_pattern(mut self, pattern: &'static str) -> Self {
        self.error_pattern = pattern;
        self
    }

    pub fn with_symbols_query(mut self, query: &'static str) -> Self {
        self.symbols_query = query;
        self
    }

    pub fn with_location_converter(mut self, converter: LocationConverter) -> Self {
        self.location_converter = Some(converter);
        self
    }

    pub fn with_analyzer(mut self, factory: AnalyzerFactory) -> Self {
        self.analyzer_factory = Some(factory);
        self
    }

    pub fn with_stub_fs(mut self, stub_fs: fn() -> VirtualFs) -> Self {
        self.stub_fs = Some(stub_fs);
        self
    }

    pub fn with_externs(mut self, externs: &'static [(&'static str, &'static str)]) -> Self {
        self.externs = externs;
        self
    }

    pub fn grammar(&self) -> tree_sitter::Language {
        (self.grammar)()
    }

    /// Validates and compiles the language. Later calls are free.
    pub fn compile(&self) -> Result<()> {
        self.compiled().map(|_| ())
    }

    fn compiled(&self) -> Result<&CompiledLanguage> {
        self.compiled.get_or_try_init(|| {
            if self.analyzer_factory.is_none() {
                return Err(Error::MissingAnalyzerFactory {
                    language: self.name.to_string(),
                });
            }

            let stack_trace = Regex::new(&format!("(?m){}", self.stack_trace_pattern)).map_err(
                |source| Error::InvalidPattern {
                    template: format!("{} stack trace", self.name),
                    source,
                },
            )?;

            let query = Query::new(&self.grammar(), self.symbols_query).map_err(|e| {
                Error::QueryCompile {
                    language: self.name.to_string(),
                    message: e.to_string(),
                }
            })?;

            let mut externs = Vec::with_capacity(self.externs.len());
            for (file, json) in self.externs {
                let parsed: ExternFile =
                    serde_json::from_str(json).map_err(|source| Error::ExternSymbols {
                        file: file.to_string(),
                        source,
                    })?;
                externs.push(parsed);
            }

            log::debug!("compiled language {}", self.name);
            Ok(CompiledLanguage {
                stack_trace,
                query,
                externs,
            })
        })
    }

    pub fn stack_trace_regex(&self) -> Result<&Regex> {
        Ok(&self.compiled()?.stack_trace)
    }

    pub fn symbols(&self) -> Result<&Query> {
        Ok(&self.compiled()?.query)
    }

    /// Compiles `source` against this grammar, reusing earlier compilations.
    pub fn query(&self, source: &str) -> Result<Arc<Query>> {
        if let Some(query) = self
            .queries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(source)
        {
            return Ok(Arc::clone(query));
        }

        let query = Query::new(&self.grammar(), source).map_err(|e| Error::QueryCompile {
            language: self.name.to_string(),
            message: e.to_string(),
        })?;
        let mut queries = self.queries.write().unwrap_or_else(|e| e.into_inner());
        let query = queries
            .entry(source.to_string())
            .or_insert_with(|| Arc::new(query));
        Ok(Arc::clone(query))
    }

    pub fn extern_file(&self, name: &str) -> Option<&ExternFile> {
        self.compiled
            .get()
            .and_then(|c| c.externs.iter().find(|e| e.name == name))
    }

    pub fn match_path(&self, path: &str) -> bool {
        self.file_patterns.iter().any(|p| path.ends_with(p))
    }

    pub fn convert_location(&self, path: &str, position: &str) -> Location {
        let convert = self.location_converter.unwrap_or(default_location_converter);
        convert(path, position)
    }

    pub fn create_analyzer(&self, cd: &ContextData) -> Result<Box<dyn LanguageAnalyzer>> {
        let factory = self
            .analyzer_factory
            .ok_or_else(|| Error::MissingAnalyzerFactory {
                language: self.name.to_string(),
            })?;
        Ok(factory(cd))
    }
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.name)
            .field("file_patterns", &self.file_patterns)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Language {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Keeps the reported 1-based line number as the location line.
pub fn default_location_converter(path: &str, position: &str) -> Location {
    let line = position.trim().parse().unwrap_or(0);
    Location::at(path, Position::new(line, 0))
}
