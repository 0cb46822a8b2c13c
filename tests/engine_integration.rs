//! Integration tests for the analyze/translate pipeline.
//!
//! These tests drive the engine through its public API, reading sources
//! from a temporary directory on the host filesystem.

use std::fs;

use errgoengine::context::ContextData;
use errgoengine::languages::TEST_LANGUAGE;
use errgoengine::template::{CompiledErrorTemplate, FALLBACK_ERROR_TEMPLATE};
use errgoengine::{Engine, Error, ErrorTemplate, ErrorTemplates, OutputGenerator};
use tempfile::TempDir;

const INVALID_INPUT: ErrorTemplate = ErrorTemplate {
    name: "InvalidInput",
    pattern: r"invalid input '(?P<input>[^']+)'",
    ..ErrorTemplate::EMPTY
};

fn setup() -> (TempDir, Engine) {
    let dir = TempDir::new().expect("should create temp dir");
    let engine = Engine::bundled().expect("bundled templates should load");
    (dir, engine)
}

// =============================================================================
// Variables and stack traces
// =============================================================================

#[test]
fn test_extract_variables_and_trace() {
    let template = CompiledErrorTemplate::compile(Some(&TEST_LANGUAGE), INVALID_INPUT).unwrap();
    let msg = "invalid input '123abc'\nin main at /home/user/main.py:123\nin main at /home/user/main.py:1";

    let mut cd = ContextData::new("/home/user");
    cd.variables = template.extract_variables(msg);
    assert_eq!(cd.variable("input"), "123abc");
    assert_eq!(
        cd.variable("stacktrace"),
        "\nin main at /home/user/main.py:123\nin main at /home/user/main.py:1"
    );

    let stack = template.extract_stack_trace(&cd).unwrap();
    assert_eq!(stack.len(), 2);
    let entries = stack.entries();
    assert_eq!(entries[0].location.document_path, "/home/user/main.py");
    assert_eq!(entries[0].location.start.line, 123);
    assert_eq!(entries[1].location.document_path, "/home/user/main.py");
    assert_eq!(entries[1].location.start.line, 1);
    assert_eq!(stack.top().unwrap().location.start.line, 1);
}

// =============================================================================
// Fallback
// =============================================================================

#[test]
fn test_fallback_only() {
    let mut templates = ErrorTemplates::new();
    templates.add_fallback(FALLBACK_ERROR_TEMPLATE).unwrap();
    let mut engine = Engine::with_templates(templates);

    for msg in ["boom", "error: something\nwent wrong", "   "] {
        let out = engine.run("/tmp", msg).unwrap();
        assert!(out.lines().next().unwrap().starts_with("# "), "{}", out);
        assert!(out.contains("## Steps to fix"), "{}", out);
    }
}

#[test]
fn test_no_templates() {
    let mut engine = Engine::new();
    let err = engine.run("/tmp", "boom").unwrap_err();
    assert!(matches!(err, Error::TemplateNotFound));
}

// =============================================================================
// End to end
// =============================================================================

#[test]
fn test_python_name_error_from_disk() {
    let (dir, mut engine) = setup();
    fs::write(dir.path().join("app.py"), "x = 1\nprint(y)\n").unwrap();

    let msg = "Traceback (most recent call last):\n  File \"app.py\", line 2, in <module>\n    print(y)\nNameError: name 'y' is not defined";
    let working_path = dir.path().to_string_lossy().to_string();
    let out = engine.run(&working_path, msg).unwrap();

    assert!(out.starts_with("# NameError\n"));
    assert!(out.contains("### Define the variable before using it"));
    assert!(out.contains("x = 1\n- print(y)\n+ y = \"Hello!\"\n+ print(y)\n```"));
}

#[test]
fn test_test_mode_snippet() {
    let (dir, mut engine) = setup();
    fs::write(dir.path().join("app.py"), "x = 1\nprint(y)\n").unwrap();
    engine.output = OutputGenerator::new(true);

    let msg = "Traceback (most recent call last):\n  File \"app.py\", line 2, in <module>\n    print(y)\nNameError: name 'y' is not defined";
    let working_path = dir.path().to_string_lossy().to_string();
    let out = engine.run(&working_path, msg).unwrap();

    assert!(out.contains("```\nx = 1\nprint(y)\n      ^\n\n```"), "{}", out);
}

#[test]
fn test_missing_source_file() {
    let (dir, mut engine) = setup();
    let msg = "Traceback (most recent call last):\n  File \"gone.py\", line 1, in <module>\n    print(y)\nNameError: name 'y' is not defined";
    let working_path = dir.path().to_string_lossy().to_string();

    let err = engine.run(&working_path, msg).unwrap_err();
    match err {
        Error::FileRead { path, .. } => assert!(path.ends_with("gone.py")),
        other => panic!("unexpected error: {}", other),
    }
}
