//! errgoengine CLI entry point.

use clap::Parser;
use errgoengine::cli::{self, Cli, EXIT_ERROR};
use simple_logger::SimpleLogger;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = SimpleLogger::new()
        .with_level(cli.log_level())
        .env()
        .init()
    {
        eprintln!("Error: failed to initialize logger: {}", e);
    }

    let exit_code = match cli::run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
