//! errgoengine - contextualized programming error analysis.
//!
//! errgoengine takes the error message a compiler or runtime printed, finds
//! the error template that matches it, loads the source files named in the
//! stack trace and produces a Markdown explanation with concrete fix
//! suggestions rendered as diffs.
//!
//! # Architecture
//!
//! - `source`, `node`: documents, positions and tree-sitter node wrappers
//! - `language`, `languages`: language plug-ins and their registry
//! - `symbols`, `analyzer`, `depgraph`: symbol trees, scope analysis and
//!   the import graph
//! - `template`, `templates`: error templates and the bundled Python and
//!   Java sets
//! - `engine`: the analyze/translate pipeline
//! - `translation`, `output`: explanation and bug-fix generators and the
//!   Markdown renderer
//! - `fixture`: the test fixture format used by template tests
//!
//! # Adding a New Template
//!
//! See `src/templates/python.rs` for examples. Declare an `ErrorTemplate`
//! constant and register it in the language's `load` function.

pub mod analyzer;
pub mod cli;
pub mod context;
pub mod depgraph;
pub mod engine;
pub mod error;
pub mod fixture;
pub mod fs;
pub mod language;
pub mod languages;
pub mod node;
pub mod output;
pub mod source;
pub mod symbols;
pub mod template;
pub mod templates;
pub mod trace;
pub mod translation;

pub use context::{ContextData, MainError};
pub use engine::Engine;
pub use error::{Error, Result};
pub use fs::{MultiReadFileFs, RawFs, ReadFileFs, VirtualFs};
pub use language::{Language, LanguageAnalyzer};
pub use output::OutputGenerator;
pub use source::{Document, EditableDocument, Location, Position};
pub use template::{CompiledErrorTemplate, ErrorTemplate, ErrorTemplates};
pub use translation::{BugFixGenerator, ExplainGenerator, FixSuggestion};

/// Initialize all subsystems.
///
/// Registers the bundled languages. `Engine::bundled` calls this itself.
pub fn init() {
    languages::register_languages();
}
