//! Bundled language plug-ins and the global language registry.

mod java;
mod python;
mod test_lang;

pub use java::JavaAnalyzer;
pub use python::PythonAnalyzer;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::language::Language;

pub static PYTHON: Lazy<Language> = Lazy::new(python::language);

pub static JAVA: Lazy<Language> = Lazy::new(java::language);

/// Python-grammar language with a simple `in <symbol> at <path>:<line>` trace format.
pub static TEST_LANGUAGE: Lazy<Language> = Lazy::new(test_lang::language);

lazy_static::lazy_static! {
    /// Languages consulted when a stack frame's file has no loaded document.
    static ref REGISTRY: RwLock<Vec<&'static Language>> = RwLock::new(Vec::new());
}

/// Whether the bundled languages have been registered.
static REGISTERED: AtomicBool = AtomicBool::new(false);

/// Adds a language to the registry. Registering a name twice is a no-op.
pub fn register(language: &'static Language) {
    let mut registry = REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    if !registry.iter().any(|l| l.name == language.name) {
        registry.push(language);
    }
}

/// Registers the bundled languages.
///
/// This is idempotent - calling it multiple times is safe.
pub fn register_languages() {
    if REGISTERED.swap(true, Ordering::SeqCst) {
        return;
    }
    register(&PYTHON);
    register(&JAVA);
}

/// The registered language handling `path`.
pub fn for_path(path: &str) -> Option<&'static Language> {
    let registry = REGISTRY.read().unwrap_or_else(|e| e.into_inner());
    registry.iter().copied().find(|l| l.match_path(path))
}

pub fn by_name(name: &str) -> Option<&'static Language> {
    let registry = REGISTRY.read().unwrap_or_else(|e| e.into_inner());
    registry.iter().copied().find(|l| l.name == name)
}

pub fn all() -> Vec<&'static Language> {
    REGISTRY
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        register_languages();
        register_languages();
        assert_eq!(for_path("/a/main.py").map(|l| l.name), Some("Python"));
        assert_eq!(for_path("Main.java").map(|l| l.name), Some("Java"));
        assert!(by_name("Java").is_some());

        register(&TEST_LANGUAGE);
        register(&TEST_LANGUAGE);
        assert_eq!(all().iter().filter(|l| l.name == "TestLang").count(), 1);
        assert_eq!(for_path("x.test").map(|l| l.name), Some("TestLang"));
    }
}
