//! Runs every fixture under `testdata/<language>/<case>/test.txt`.
//!
//! Each case directory holds the fixture and the source files its stack
//! trace points at. Relative paths in the input are resolved against the
//! case directory.

use std::path::{Path, PathBuf};

use errgoengine::fixture;
use errgoengine::Engine;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn setup() -> Engine {
    Engine::bundled().expect("bundled templates should load")
}

fn fixture_dirs(language: &str) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(testdata_path().join(language))
        .expect("should read testdata dir")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.join("test.txt").is_file())
        .collect();
    dirs.sort();
    dirs
}

fn run_fixture(dir: &Path) {
    let (input, expected) = fixture::load(&dir.join("test.txt"))
        .unwrap_or_else(|e| panic!("{}: {}", dir.display(), e));

    let mut engine = setup();
    let working_path = dir.to_string_lossy().to_string();
    let (template, cd) = engine
        .analyze(&working_path, input.output.trim())
        .unwrap_or_else(|e| panic!("{}: analyze failed: {}", dir.display(), e));

    assert_eq!(
        template.language.map(|l| l.name).unwrap_or(""),
        expected.language,
        "{}: language",
        dir.display()
    );
    assert_eq!(template.name(), expected.template, "{}: template", dir.display());

    let output = engine
        .translate(&template, &cd)
        .unwrap_or_else(|e| panic!("{}: translate failed: {}", dir.display(), e));
    assert_eq!(output.trim(), expected.output.trim(), "{}", dir.display());
}

// =============================================================================
// Python
// =============================================================================

#[test]
fn test_python_fixtures() {
    let dirs = fixture_dirs("python");
    assert!(dirs.len() >= 6, "expected python fixtures, got {}", dirs.len());
    for dir in dirs {
        run_fixture(&dir);
    }
}

// =============================================================================
// Java
// =============================================================================

#[test]
fn test_java_fixtures() {
    let dirs = fixture_dirs("java");
    assert!(dirs.len() >= 9, "expected java fixtures, got {}", dirs.len());
    for dir in dirs {
        run_fixture(&dir);
    }
}
