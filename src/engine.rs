//! The analysis pipeline: match a template, load the documents of the stack
//! trace, locate the main error and render the report.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use tree_sitter::Parser;

use crate::analyzer::SymbolAnalyzer;
use crate::context::{ContextData, MainError};
use crate::error::{Error, Result};
use crate::fs::{MultiReadFileFs, ReadFileFs};
use crate::language::{Language, LanguageAnalyzer};
use crate::languages;
use crate::node::nearest_node_at_line;
use crate::output::OutputGenerator;
use crate::source::Document;
use crate::template::{CompiledErrorTemplate, ErrorTemplates};
use crate::trace::StackTraceEntry;
use crate::translation::{BugFixGenerator, ExplainGenerator};

/// Name of the filesystem layer holding the stub files of a language.
const STUB_LAYER: &str = "stub";

/// Turns raw error messages into explanations and fix suggestions.
pub struct Engine {
    pub templates: ErrorTemplates,
    pub fs: MultiReadFileFs,
    pub output: OutputGenerator,
}

impl Engine {
    /// An engine without templates, reading from the host filesystem.
    pub fn new() -> Self {
        Self::with_templates(ErrorTemplates::new())
    }

    pub fn with_templates(templates: ErrorTemplates) -> Self {
        Self {
            templates,
            fs: MultiReadFileFs::new(),
            output: OutputGenerator::default(),
        }
    }

    /// An engine with the bundled languages and templates.
    pub fn bundled() -> Result<Self> {
        let mut templates = ErrorTemplates::new();
        crate::templates::load_all(&mut templates)?;
        Ok(Self::with_templates(templates))
    }

    /// Matches `msg` against the templates and builds the context the
    /// template hooks work on.
    pub fn analyze(
        &mut self,
        working_path: &str,
        msg: &str,
    ) -> Result<(Arc<CompiledErrorTemplate>, ContextData)> {
        let template = self
            .templates
            .match_message(msg)
            .ok_or(Error::TemplateNotFound)?;
        log::debug!("matched template {}", template.key());

        let mut cd = ContextData::new(working_path);
        if let Some(language) = template.language {
            language.compile()?;
            cd.analyzer = Some(language.create_analyzer(&cd)?);
            if let Some(stub_fs) = language.stub_fs {
                self.fs.attach_or_replace(STUB_LAYER, Box::new(stub_fs()));
            }
        }

        cd.variables = template.extract_variables(msg);
        cd.trace_stack = template.extract_stack_trace(&cd)?;
        log::debug!("extracted {} stack frames", cd.trace_stack.len());

        let paths: Vec<String> = cd
            .trace_stack
            .entries()
            .iter()
            .map(|e| e.location.document_path.clone())
            .collect();

        let mut parser = Parser::new();
        let mut unsupported = Vec::new();
        for path in paths {
            if !self.load_document(&mut cd, &template, &path, &mut parser)? {
                unsupported.push(path);
            }
        }

        if cd.store.documents.is_empty() {
            if let Some(path) = unsupported.into_iter().next() {
                return Err(Error::NoLanguageForPath { path });
            }
            return Ok((template, cd));
        }

        if let Some(entry) = main_frame(&cd) {
            let main = self.locate_main_error(&mut cd, &template, entry)?;
            cd.main_error = Some(main);
        }
        Ok((template, cd))
    }

    /// Reads, parses and analyzes the document of one frame.
    ///
    /// Returns false when no language handles the file. Empty files are
    /// stubs and are skipped.
    fn load_document(
        &self,
        cd: &mut ContextData,
        template: &CompiledErrorTemplate,
        path: &str,
        parser: &mut Parser,
    ) -> Result<bool> {
        let contents = self
            .fs
            .read_file(Path::new(path))
            .map_err(|source| Error::FileRead {
                path: PathBuf::from(path),
                source,
            })?;
        if contents.is_empty() {
            log::debug!("skipping stub file {}", path);
            return Ok(true);
        }

        let language = match cd.document(path) {
            Some(existing) if existing.contents() == contents => return Ok(true),
            Some(existing) => Some(existing.language()),
            None => template
                .language
                .filter(|l| l.match_path(path))
                .or_else(|| languages::for_path(path)),
        };
        let Some(language) = language else {
            log::warn!("no language found for {}, skipping frame", path);
            return Ok(false);
        };
        language.compile()?;

        let doc = Rc::new(Document::parse(path, contents, language, parser)?);
        cd.store.insert_document(Rc::clone(&doc));
        cd.current_document_path = path.to_string();
        let tree = cd.store.reset_symbol_tree(path);

        let edges = {
            let owned: Box<dyn LanguageAnalyzer>;
            let analyzer = match cd.analyzer() {
                Some(analyzer) if same_language(template.language, language) => analyzer,
                _ => {
                    owned = language.create_analyzer(cd)?;
                    owned.as_ref()
                }
            };
            SymbolAnalyzer::new(cd, &doc, analyzer)
                .with_fs(&self.fs)
                .analyze(&tree)?
        };
        log::debug!("analyzed {} ({} imports)", path, edges.len());
        cd.store.dep_graph.add(path, edges);
        Ok(true)
    }

    fn locate_main_error(
        &self,
        cd: &mut ContextData,
        template: &CompiledErrorTemplate,
        entry: StackTraceEntry,
    ) -> Result<MainError> {
        let path = entry.location.document_path.clone();
        let doc = cd
            .document(&path)
            .cloned()
            .ok_or_else(|| Error::NoLanguageForPath { path: path.clone() })?;
        cd.current_document_path = path;

        // Reported lines are 1-based.
        let row = entry.location.start.line.saturating_sub(1);
        let mut main = MainError::new(entry, Rc::clone(&doc));
        main.nearest = nearest_node_at_line(&doc, row).map(|n| n.to_ref());

        if let Some(on_analyze) = template.template.on_analyze {
            let cd: &ContextData = cd;
            run_hook(&template.key(), || on_analyze(cd, &mut main))?;
        }
        Ok(main)
    }

    /// Runs the explain and bug-fix hooks of `template` and renders the report.
    pub fn translate(&self, template: &CompiledErrorTemplate, cd: &ContextData) -> Result<String> {
        let key = template.key();

        let mut explain = ExplainGenerator::new(template.name());
        if let Some(on_explain) = template.template.on_explain {
            run_hook(&key, || {
                on_explain(cd, &mut explain);
                Ok(())
            })?;
        }

        let mut bug_fix = BugFixGenerator::new(cd.main_error().map(|m| Rc::clone(&m.document)));
        if let Some(on_bug_fix) = template.template.on_bug_fix {
            run_hook(&key, || on_bug_fix(cd, &mut bug_fix))?;
        }

        Ok(self.output.generate(cd, &explain, &bug_fix))
    }

    /// Analyzes and translates `msg` in one go.
    pub fn run(&mut self, working_path: &str, msg: &str) -> Result<String> {
        let (template, cd) = self.analyze(working_path, msg)?;
        self.translate(&template, &cd)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn same_language(a: Option<&'static Language>, b: &'static Language) -> bool {
    a.is_some_and(|a| a == b)
}

/// The frame nearest to the working path, or else the topmost frame whose
/// document was loaded.
fn main_frame(cd: &ContextData) -> Option<StackTraceEntry> {
    let loaded = |e: &&StackTraceEntry| cd.document(&e.location.document_path).is_some();
    cd.trace_stack
        .nearest_to(&cd.working_path)
        .filter(loaded)
        .or_else(|| cd.trace_stack.entries().iter().rev().find(loaded))
        .cloned()
}

/// Runs a template hook, turning errors and panics into `Error::Hook`.
fn run_hook<T>(template: &str, hook: impl FnOnce() -> anyhow::Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Error::Hook {
            template: template.to_string(),
            message: format!("{:#}", e),
        }),
        Err(payload) => Err(Error::Hook {
            template: template.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "hook panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::VirtualFs;
    use crate::languages::TEST_LANGUAGE;
    use crate::template::{ErrorTemplate, FALLBACK_ERROR_TEMPLATE};

    fn explain(cd: &ContextData, gen: &mut ExplainGenerator) {
        gen.add(format!("Input `{}` is invalid.", cd.variable("input")));
    }

    fn no_fix(_cd: &ContextData, _gen: &mut BugFixGenerator) -> anyhow::Result<()> {
        Ok(())
    }

    fn failing_fix(_cd: &ContextData, _gen: &mut BugFixGenerator) -> anyhow::Result<()> {
        anyhow::bail!("cannot fix")
    }

    fn panicking_explain(_cd: &ContextData, _gen: &mut ExplainGenerator) {
        panic!("explain exploded")
    }

    const INVALID_INPUT: ErrorTemplate = ErrorTemplate {
        name: "InvalidInput",
        pattern: r"invalid input '(?P<input>[^']+)'",
        on_explain: Some(explain),
        on_bug_fix: Some(no_fix),
        ..ErrorTemplate::EMPTY
    };

    const MSG: &str = "invalid input '123abc'\nin main at /work/main.test:2";

    fn setup(template: ErrorTemplate) -> Engine {
        let mut templates = ErrorTemplates::new();
        templates.add(Some(&TEST_LANGUAGE), template).unwrap();
        let mut engine = Engine::with_templates(templates);
        engine.fs.attach(
            "memory",
            Box::new(VirtualFs::new().with_file("/work/main.test", "a = 1\nb = int(a)\n")),
        );
        engine
    }

    #[test]
    fn test_analyze_locates_main_error() {
        let mut engine = setup(INVALID_INPUT);
        let (template, cd) = engine.analyze("/work", MSG).unwrap();
        assert_eq!(template.name(), "InvalidInput");
        assert_eq!(cd.variable("input"), "123abc");
        assert!(cd.store.dep_graph.has("/work/main.test"));

        let main = cd.main_error().unwrap();
        assert_eq!(main.document.path(), "/work/main.test");
        let nearest = main.nearest().unwrap();
        assert_eq!(nearest.start_position().line, 1);
        assert!(nearest.text().starts_with("b = int(a)"));
        assert!(cd.symbol_tree("/work/main.test").unwrap().get("b").is_some());
    }

    #[test]
    fn test_template_not_found() {
        let mut engine = setup(INVALID_INPUT);
        let err = engine.analyze("/work", "segmentation fault").unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let mut engine = setup(INVALID_INPUT);
        let err = engine
            .analyze("/work", "invalid input 'x'\nin main at /work/missing.test:1")
            .unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[test]
    fn test_unsupported_frames() {
        let mut engine = setup(INVALID_INPUT);
        engine
            .fs
            .attach("other", Box::new(VirtualFs::new().with_file("/work/main.rb", "puts 1")));
        let err = engine
            .analyze("/work", "invalid input 'x'\nin main at /work/main.rb:1")
            .unwrap_err();
        assert!(matches!(err, Error::NoLanguageForPath { .. }));
    }

    #[test]
    fn test_hook_failures_are_isolated() {
        let mut engine = setup(ErrorTemplate {
            on_bug_fix: Some(failing_fix),
            ..INVALID_INPUT
        });
        let (template, cd) = engine.analyze("/work", MSG).unwrap();
        let err = engine.translate(&template, &cd).unwrap_err();
        assert_eq!(err.to_string(), "TestLang.InvalidInput: cannot fix");

        let mut engine = setup(ErrorTemplate {
            on_explain: Some(panicking_explain),
            ..INVALID_INPUT
        });
        let (template, cd) = engine.analyze("/work", MSG).unwrap();
        let err = engine.translate(&template, &cd).unwrap_err();
        assert!(err.to_string().contains("explain exploded"));
    }

    #[test]
    fn test_run_fallback_only() {
        let mut templates = ErrorTemplates::new();
        templates.add_fallback(FALLBACK_ERROR_TEMPLATE).unwrap();
        let mut engine = Engine::with_templates(templates);

        let out = engine.run("/work", "Segmentation fault (core dumped)").unwrap();
        assert!(out.starts_with("# UnknownError\n"));
        assert!(out.contains("Segmentation fault (core dumped)"));
        assert!(out.contains("## Steps to fix\nNo bug fixes found for this error."));
    }
}
