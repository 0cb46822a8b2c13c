//! Command-line interface for errgoengine.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::engine::Engine;
use crate::output::OutputGenerator;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Explain compiler and runtime errors and suggest fixes.
///
/// Reads an error message with its stack trace from stdin, loads the source
/// files it points at and prints a Markdown explanation with fix suggestions
/// to stdout.
#[derive(Parser, Debug)]
#[command(name = "errgoengine")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory relative stack-trace paths are resolved against
    /// (default: current directory)
    #[arg(short = 'C', long)]
    pub working_dir: Option<PathBuf>,

    /// Increase log verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Render a snippet of the offending line under the explanation
    #[arg(long)]
    pub test_mode: bool,
}

impl Cli {
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Run the analysis on the error message read from stdin.
pub fn run(cli: &Cli) -> anyhow::Result<i32> {
    let stdin = io::stdin();
    let lines = stdin
        .lock()
        .lines()
        .collect::<io::Result<Vec<String>>>()
        .context("Failed to read error message from stdin")?;
    let msg = lines.join("\n");

    if msg.trim().is_empty() {
        eprintln!("No error message given.");
        return Ok(EXIT_FAILED);
    }

    let working_dir = match &cli.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let output = explain(&working_dir.to_string_lossy(), &msg, cli.test_mode)?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", output)?;
    Ok(EXIT_SUCCESS)
}

/// Analyze `msg` with the bundled templates and return the Markdown report.
pub fn explain(working_dir: &str, msg: &str, test_mode: bool) -> anyhow::Result<String> {
    let mut engine = Engine::bundled().context("Failed to load error templates")?;
    engine.output = OutputGenerator::new(test_mode);
    let output = engine.run(working_dir, msg)?;
    Ok(output)
}
