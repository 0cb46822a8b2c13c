//! Error templates: the patterns that recognize an error message and the
//! hooks that explain it and propose fixes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;

use crate::context::{ContextData, MainError};
use crate::error::{Error, Result};
use crate::language::Language;
use crate::trace::TraceStack;
use crate::translation::{BugFixGenerator, ExplainGenerator};

/// Narrows down the main error and attaches template-specific context.
pub type AnalyzeHook = fn(&ContextData, &mut MainError) -> anyhow::Result<()>;

/// Writes the explanation of the error.
pub type ExplainHook = fn(&ContextData, &mut ExplainGenerator);

/// Registers fix suggestions.
pub type BugFixHook = fn(&ContextData, &mut BugFixGenerator) -> anyhow::Result<()>;

/// Patterns starting with this prefix are used verbatim instead of being
/// embedded in the error pattern of their language.
pub const CUSTOM_PATTERN_PREFIX: &str = "\"\"\"";

const STACKTRACE_GROUP: &str = r"(?P<stacktrace>(?:.|\s)*)";

/// Marks a pattern as a complete error pattern.
pub fn custom_error_pattern(pattern: &str) -> String {
    format!("{}{}", CUSTOM_PATTERN_PREFIX, pattern)
}

#[derive(Clone, Copy)]
pub struct ErrorTemplate {
    pub name: &'static str,
    /// Regex for the error message. It may embed `$stacktrace`.
    pub pattern: &'static str,
    /// Overrides the stack-trace pattern of the language when non-empty.
    pub stack_trace_pattern: &'static str,
    pub on_analyze: Option<AnalyzeHook>,
    pub on_explain: Option<ExplainHook>,
    pub on_bug_fix: Option<BugFixHook>,
}

impl ErrorTemplate {
    pub const EMPTY: ErrorTemplate = ErrorTemplate {
        name: "",
        pattern: "",
        stack_trace_pattern: "",
        on_analyze: None,
        on_explain: None,
        on_bug_fix: None,
    };
}

impl std::fmt::Debug for ErrorTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorTemplate")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Matches any message. Used when no other template applies.
pub const FALLBACK_ERROR_TEMPLATE: ErrorTemplate = ErrorTemplate {
    name: "UnknownError",
    pattern: r"(?P<message>(?:.|\s)*)",
    on_explain: Some(explain_unknown),
    on_bug_fix: Some(no_bug_fix),
    ..ErrorTemplate::EMPTY
};

fn explain_unknown(cd: &ContextData, gen: &mut ExplainGenerator) {
    gen.add(format!(
        "There are no available error templates for this error.\n```\n{}\n```",
        cd.variable("message").trim_end()
    ));
}

fn no_bug_fix(_cd: &ContextData, _gen: &mut BugFixGenerator) -> anyhow::Result<()> {
    Ok(())
}

/// `Language.Name`, or just the name for language-less templates.
pub fn template_key(language: &str, name: &str) -> String {
    if language.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", language, name)
    }
}

/// A template bound to its language with its patterns compiled.
#[derive(Debug)]
pub struct CompiledErrorTemplate {
    pub template: ErrorTemplate,
    pub language: Option<&'static Language>,
    pattern: Regex,
    stack_trace: Option<Regex>,
}

impl CompiledErrorTemplate {
    pub fn compile(language: Option<&'static Language>, template: ErrorTemplate) -> Result<Self> {
        let key = template_key(language.map_or("", |l| l.name), template.name);
        let invalid = |source| Error::InvalidPattern {
            template: key.clone(),
            source,
        };

        let pattern = expand_pattern(language, template.pattern);
        let pattern = Regex::new(&format!("(?m)^{}$", pattern)).map_err(invalid)?;

        let stack_trace = if template.stack_trace_pattern.is_empty() {
            None
        } else {
            Some(Regex::new(&format!("(?m){}", template.stack_trace_pattern)).map_err(invalid)?)
        };

        Ok(Self {
            template,
            language,
            pattern,
            stack_trace,
        })
    }

    pub fn name(&self) -> &'static str {
        self.template.name
    }

    pub fn key(&self) -> String {
        template_key(self.language.map_or("", |l| l.name), self.template.name)
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn matches(&self, msg: &str) -> bool {
        self.pattern.is_match(msg)
    }

    /// Named groups of the pattern. The first non-empty value of each group
    /// wins; every group, `stacktrace` included, is present in the result.
    pub fn extract_variables(&self, msg: &str) -> HashMap<String, String> {
        let names: Vec<&str> = self.pattern.capture_names().flatten().collect();
        let mut vars: HashMap<String, String> = HashMap::new();

        for caps in self.pattern.captures_iter(msg) {
            for name in &names {
                let Some(m) = caps.name(name) else {
                    continue;
                };
                if m.as_str().is_empty() {
                    continue;
                }
                vars.entry(name.to_string())
                    .or_insert_with(|| m.as_str().to_string());
            }
        }

        for name in names {
            vars.entry(name.to_string()).or_default();
        }
        vars.entry("stacktrace".to_string()).or_default();
        vars
    }

    fn stack_trace_regex(&self) -> Result<Option<&Regex>> {
        if let Some(re) = &self.stack_trace {
            return Ok(Some(re));
        }
        match self.language {
            Some(language) => Ok(Some(language.stack_trace_regex()?)),
            None => Ok(None),
        }
    }

    /// Parses the `stacktrace` variable of `cd` into frames.
    ///
    /// Relative paths are resolved against the working path before the
    /// location converter of the language runs.
    pub fn extract_stack_trace(&self, cd: &ContextData) -> Result<TraceStack> {
        let mut stack = TraceStack::new();
        let Some(re) = self.stack_trace_regex()? else {
            return Ok(stack);
        };

        for caps in re.captures_iter(cd.variable("stacktrace")) {
            let symbol = caps.name("symbol").map_or("", |m| m.as_str());
            let raw_path = caps.name("path").map_or("", |m| m.as_str());
            let position = caps.name("position").map_or("", |m| m.as_str());

            let path = if Path::new(raw_path).is_absolute() || cd.working_path.is_empty() {
                raw_path.to_string()
            } else {
                Path::new(&cd.working_path)
                    .join(raw_path)
                    .to_string_lossy()
                    .to_string()
            };

            let location = match self.language {
                Some(language) => language.convert_location(&path, position),
                None => crate::language::default_location_converter(&path, position),
            };
            stack.add(symbol, location);
        }
        Ok(stack)
    }
}

fn expand_pattern(language: Option<&Language>, pattern: &str) -> String {
    let pattern = match pattern.strip_prefix(CUSTOM_PATTERN_PREFIX) {
        Some(custom) => custom.to_string(),
        None => {
            let error_pattern = language.map_or("", |l| l.error_pattern);
            if error_pattern.is_empty() {
                if pattern.contains("$stacktrace") {
                    pattern.to_string()
                } else {
                    format!("{}$stacktrace", pattern)
                }
            } else if error_pattern.contains("$message") {
                error_pattern.replace("$message", pattern)
            } else {
                format!("{}{}", error_pattern, pattern)
            }
        }
    };
    pattern.replace("$stacktrace", STACKTRACE_GROUP)
}

/// Templates in registration order plus an optional fallback.
#[derive(Debug, Clone, Default)]
pub struct ErrorTemplates {
    entries: Vec<Arc<CompiledErrorTemplate>>,
    fallback: Option<Arc<CompiledErrorTemplate>>,
}

impl ErrorTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles and registers a template. Re-adding a key returns the
    /// template already registered under it.
    pub fn add(
        &mut self,
        language: Option<&'static Language>,
        template: ErrorTemplate,
    ) -> Result<Arc<CompiledErrorTemplate>> {
        let language_name = language.map_or("", |l| l.name);
        if template.name.is_empty() || language.is_some_and(|l| l.name.is_empty()) {
            return Err(Error::EmptyTemplateKey);
        }

        let key = template_key(language_name, template.name);
        if template.on_explain.is_none() {
            return Err(Error::MissingHook {
                key,
                hook: "OnGenExplainFn",
            });
        }
        if template.on_bug_fix.is_none() {
            return Err(Error::MissingHook {
                key,
                hook: "OnGenBugFixFn",
            });
        }

        if let Some(existing) = self.find(language_name, template.name) {
            return Ok(existing);
        }

        let compiled = Arc::new(CompiledErrorTemplate::compile(language, template)?);
        log::debug!("registered template {}", key);
        self.entries.push(Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Registers the template consulted after every other one.
    pub fn add_fallback(&mut self, template: ErrorTemplate) -> Result<Arc<CompiledErrorTemplate>> {
        let compiled = Arc::new(CompiledErrorTemplate::compile(None, template)?);
        self.fallback = Some(Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn fallback(&self) -> Option<&Arc<CompiledErrorTemplate>> {
        self.fallback.as_ref()
    }

    pub fn find(&self, language: &str, name: &str) -> Option<Arc<CompiledErrorTemplate>> {
        let key = template_key(language, name);
        self.entries.iter().find(|t| t.key() == key).cloned()
    }

    /// The first template matching `msg`, else the fallback when it matches.
    pub fn match_message(&self, msg: &str) -> Option<Arc<CompiledErrorTemplate>> {
        self.entries
            .iter()
            .find(|t| t.matches(msg))
            .or_else(|| self.fallback.as_ref().filter(|t| t.matches(msg)))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CompiledErrorTemplate>> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::{PYTHON, TEST_LANGUAGE};

    fn explain(_cd: &ContextData, gen: &mut ExplainGenerator) {
        gen.add("explained");
    }

    const INVALID_INPUT: ErrorTemplate = ErrorTemplate {
        name: "InvalidInput",
        pattern: r"invalid input '(?P<input>[^']+)'",
        on_explain: Some(explain),
        on_bug_fix: Some(no_bug_fix),
        ..ErrorTemplate::EMPTY
    };

    #[test]
    fn test_add_validation() {
        let mut templates = ErrorTemplates::new();
        let err = templates
            .add(
                Some(&TEST_LANGUAGE),
                ErrorTemplate {
                    on_bug_fix: None,
                    ..INVALID_INPUT
                },
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "(TestLang.InvalidInput) OnGenBugFixFn is required");

        let err = templates
            .add(Some(&TEST_LANGUAGE), ErrorTemplate { name: "", ..INVALID_INPUT })
            .unwrap_err();
        assert!(matches!(err, Error::EmptyTemplateKey));

        let first = templates.add(Some(&TEST_LANGUAGE), INVALID_INPUT).unwrap();
        let second = templates.add(Some(&TEST_LANGUAGE), INVALID_INPUT).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(templates.len(), 1);
        assert!(templates.find("TestLang", "InvalidInput").is_some());
    }

    #[test]
    fn test_extract_variables_and_trace() {
        let mut templates = ErrorTemplates::new();
        templates.add(Some(&TEST_LANGUAGE), INVALID_INPUT).unwrap();

        let msg = "invalid input '123abc'\nin main at /home/user/main.py:123\nin main at /home/user/main.py:1";
        let template = templates.match_message(msg).unwrap();
        assert_eq!(template.key(), "TestLang.InvalidInput");

        let vars = template.extract_variables(msg);
        assert_eq!(vars["input"], "123abc");
        assert_eq!(
            vars["stacktrace"],
            "\nin main at /home/user/main.py:123\nin main at /home/user/main.py:1"
        );

        let mut cd = ContextData::new("/home/user");
        cd.variables = vars;
        let stack = template.extract_stack_trace(&cd).unwrap();
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.entries()[0].location.document_path, "/home/user/main.py");
        assert_eq!(stack.entries()[0].location.start.line, 123);
        assert_eq!(stack.entries()[1].location.start.line, 1);
        assert_eq!(stack.entries()[1].symbol_name, "main");
    }

    #[test]
    fn test_language_error_pattern() {
        let mut templates = ErrorTemplates::new();
        let template = templates
            .add(
                Some(&PYTHON),
                ErrorTemplate {
                    name: "NameError",
                    pattern: r"NameError: name '(?P<variable>\S+)' is not defined",
                    ..INVALID_INPUT
                },
            )
            .unwrap();

        let msg = "Traceback (most recent call last):\n  File \"main.py\", line 2, in <module>\n    print(b)\nNameError: name 'b' is not defined";
        assert!(template.matches(msg));
        let vars = template.extract_variables(msg);
        assert_eq!(vars["variable"], "b");

        let mut cd = ContextData::new("/work");
        cd.variables = vars;
        let stack = template.extract_stack_trace(&cd).unwrap();
        assert_eq!(stack.len(), 1);
        let top = stack.top().unwrap();
        assert_eq!(top.symbol_name, "<module>");
        assert_eq!(top.location.document_path, "/work/main.py");
        assert_eq!(top.location.start.line, 2);
    }

    #[test]
    fn test_custom_pattern_and_fallback() {
        let mut templates = ErrorTemplates::new();
        let custom = custom_error_pattern(r"(?P<path>\S+):(?P<line>\d+): boom");
        let pattern: &'static str = Box::leak(custom.into_boxed_str());
        templates
            .add(Some(&PYTHON), ErrorTemplate { name: "Boom", pattern, ..INVALID_INPUT })
            .unwrap();
        templates.add_fallback(FALLBACK_ERROR_TEMPLATE).unwrap();

        let boom = templates.match_message("a.py:3: boom").unwrap();
        assert_eq!(boom.name(), "Boom");
        assert_eq!(boom.extract_variables("a.py:3: boom")["line"], "3");

        let unknown = templates.match_message("something else entirely").unwrap();
        assert_eq!(unknown.name(), "UnknownError");
        assert_eq!(
            unknown.extract_variables("something else entirely")["message"],
            "something else entirely"
        );
    }
}
