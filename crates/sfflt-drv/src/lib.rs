//! The `sfflt_lang` driver: CLI parsing, file I/O, and phase wiring.
//!
//! The core crates never touch a filesystem path directly — `sfflt-par`
//! asks an `IncludeResolver` for `include`d text, and everything downstream
//! of it works on in-memory `Program`/`Instr` values. This crate is the one
//! place that reads a path off argv, writes a `.fflt` file, and decides a
//! process exit code.

mod config;
mod pipeline;

pub use config::{Cli, Config};
pub use pipeline::{compile_path, PipelineError};

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Installs the ambient `tracing` subscriber. Controlled entirely by
/// `RUST_LOG` — `-v` already means "print version and exit", so there's
/// no CLI flag left to double as a verbosity switch.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// Parses argv and runs the driver, returning the process exit code: `0`
/// on success, `1` on any parse/resolve/format/IO failure.
/// An `Err` here means something the driver itself can't make sense of
/// (not a user-facing compile error) — `main` reports it and exits `1`.
pub fn run() -> anyhow::Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    if cli.version {
        println!("sfflt_lang version {VERSION}");
        return Ok(ExitCode::SUCCESS);
    }

    let Some(path) = cli.file.as_ref() else {
        Cli::print_usage();
        return Ok(ExitCode::FAILURE);
    };

    let config = Config::from_cli(&cli)?;
    match compile_path(path, &config) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(PipelineError::Reported) => Ok(ExitCode::FAILURE),
        Err(other) => Err(other.into()),
    }
}
