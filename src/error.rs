//! Error types for the analysis pipeline.

use std::path::PathBuf;

/// Errors produced by the engine, its registries and the bug-fix generator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No template matched the message and no fallback is registered.
    #[error("template not found")]
    TemplateNotFound,

    /// None of the files referenced by the stack trace has a registered language.
    #[error("no language found for {path}")]
    NoLanguageForPath { path: String },

    /// Reading a source file referenced by a stack frame failed.
    #[error("failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// tree-sitter did not produce a tree.
    #[error("failed to parse {path}")]
    Parse { path: String },

    /// The grammar could not be loaded into a parser.
    #[error("failed to load {language} grammar: {message}")]
    Grammar { language: String, message: String },

    /// A language capture query is not valid for its grammar.
    #[error("failed to compile {language} symbols query: {message}")]
    QueryCompile { language: String, message: String },

    /// A template or stack-trace pattern is not a valid regex.
    #[error("invalid pattern for {template}: {source}")]
    InvalidPattern {
        template: String,
        #[source]
        source: regex::Error,
    },

    /// An extern symbol file of a language is malformed.
    #[error("invalid extern symbols in {file}: {source}")]
    ExternSymbols {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("({language}) analyzer factory is required")]
    MissingAnalyzerFactory { language: String },

    #[error("({key}) {hook} is required")]
    MissingHook { key: String, hook: &'static str },

    #[error("language name and/or template name are empty")]
    EmptyTemplateKey,

    /// A template hook returned an error or panicked.
    #[error("{template}: {message}")]
    Hook { template: String, message: String },

    /// A fix targets lines outside of the document.
    #[error("fix targets line {line} but the document only has {total} lines")]
    FixOutOfRange { line: usize, total: usize },

    #[error("title cannot be empty")]
    EmptyTitle,

    #[error("content cannot be empty")]
    EmptyContent,

    #[error("no document found for the main error")]
    NoDocument,

    #[error("dependency '{dep}' not found in {path}'s dependencies")]
    DependencyNotFound { dep: String, path: String },

    /// A template test fixture is malformed.
    #[error("fixture: {0}")]
    Fixture(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
