//! Parser for template test fixtures.
//!
//! A fixture holds two blocks, the input and the expected output. Each block
//! is a header of `key: "value"` lines, a `===` line and the raw content:
//!
//! ```text
//! template: "Python.NameError"
//! ===
//! Traceback (most recent call last):
//! ...
//! ===
//! template: "Python.NameError"
//! ===
//! # NameError
//! ...
//! ```

use std::path::Path;

use crate::error::{Error, Result};

const SEPARATOR: &str = "===";

/// One block of a fixture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fixture {
    pub name: String,
    pub language: String,
    pub template: String,
    pub output: String,
}

impl Fixture {
    /// Parses a block from its header and content.
    pub fn parse(header: &str, content: &str) -> Result<Self> {
        let mut fixture = Fixture {
            output: content.to_string(),
            ..Default::default()
        };
        let mut template_key = String::new();

        for (i, line) in header.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, raw_value) = line.split_once(':').ok_or_else(|| {
                Error::Fixture(format!("line {}: expected `key: \"value\"`", i + 1))
            })?;
            let key = key.trim();
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(Error::Fixture(format!("line {}: invalid key `{}`", i + 1, key)));
            }

            let value: String = serde_json::from_str(raw_value.trim()).map_err(|e| {
                Error::Fixture(format!("line {}: invalid value for {}: {}", i + 1, key, e))
            })?;
            match key {
                "name" => fixture.name = value,
                "language" => fixture.language = value,
                "template" => template_key = value,
                other => log::debug!("ignoring fixture key {}", other),
            }
        }

        if template_key.is_empty() {
            return Err(Error::Fixture("missing template".to_string()));
        }
        if fixture.output.trim().is_empty() {
            return Err(Error::Fixture("missing output".to_string()));
        }

        match template_key.split_once('.') {
            Some((language, template)) => {
                fixture.language = language.to_string();
                fixture.template = template.to_string();
            }
            None => fixture.template = template_key,
        }
        Ok(fixture)
    }
}

/// Parses a fixture into its input and expected blocks.
pub fn parse(text: &str) -> Result<(Fixture, Fixture)> {
    let mut parts: Vec<Vec<&str>> = vec![Vec::new()];
    for line in text.lines() {
        if line == SEPARATOR {
            parts.push(Vec::new());
        } else if let Some(part) = parts.last_mut() {
            part.push(line);
        }
    }

    if parts.len() != 4 {
        return Err(Error::Fixture(format!(
            "expected 2 raw outputs (1 for input, 1 for expected), got {}",
            parts.len() / 2
        )));
    }

    let joined: Vec<String> = parts.iter().map(|p| p.join("\n")).collect();
    let input = Fixture::parse(&joined[0], &joined[1])?;
    let expected = Fixture::parse(&joined[2], &joined[3])?;
    Ok((input, expected))
}

/// Reads and parses the fixture at `path`.
pub fn load(path: &Path) -> Result<(Fixture, Fixture)> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"name: "Simple"
template: "Python.NameError"
===
Traceback (most recent call last):
NameError: name 'b' is not defined
===
template: "Python.NameError"
===
# NameError
body"#;

    #[test]
    fn test_parse_fixture() {
        let (input, expected) = parse(FIXTURE).unwrap();
        assert_eq!(input.name, "Simple");
        assert_eq!(input.language, "Python");
        assert_eq!(input.template, "NameError");
        assert_eq!(
            input.output,
            "Traceback (most recent call last):\nNameError: name 'b' is not defined"
        );
        assert_eq!(expected.output, "# NameError\nbody");
    }

    #[test]
    fn test_escaped_values() {
        let fixture = Fixture::parse("name: \"say \\\"hi\\\"\"\ntemplate: \"Java.X\"", "out").unwrap();
        assert_eq!(fixture.name, "say \"hi\"");
        assert_eq!(fixture.language, "Java");
    }

    #[test]
    fn test_missing_keys() {
        let err = Fixture::parse("name: \"x\"", "out").unwrap_err();
        assert_eq!(err.to_string(), "fixture: missing template");

        let err = Fixture::parse("template: \"Python.NameError\"", "  \n").unwrap_err();
        assert_eq!(err.to_string(), "fixture: missing output");

        assert!(Fixture::parse("template: unquoted", "out").is_err());
    }

    #[test]
    fn test_wrong_block_count() {
        let err = parse("template: \"A.B\"\n===\ncontent").unwrap_err();
        assert_eq!(
            err.to_string(),
            "fixture: expected 2 raw outputs (1 for input, 1 for expected), got 1"
        );
    }
}
