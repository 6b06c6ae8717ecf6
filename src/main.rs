//! Attain - outcome attainment rollup CLI
//!
//! Scores gradebook exports against course outcomes and rolls the results
//! up to program and institutional outcomes through weighted mappings.

mod cli;
mod commands;

use std::env;
use std::process::ExitCode;
use std::time::Instant;

use clap::error::ErrorKind;
use clap::Parser;

use attain_core::error::{AttainError, ExitCode as AttainExitCode};
use attain_core::format::OutputFormat;
use attain_core::logging;
use cli::Cli;

fn main() -> ExitCode {
    let start = Instant::now();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // The parse failed, so `cli.format` is unknown; look at argv instead
        Err(err) if json_requested(env::args().skip(1)) => {
            return report(&parse_error(err), OutputFormat::Json, false);
        }
        Err(err) => err.exit(),
    };

    if let Err(e) = logging::init_tracing(cli.verbose, cli.log_level.as_deref(), cli.log_json) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
    tracing::debug!(elapsed = ?start.elapsed(), "parse_args");

    match commands::dispatch::run(&cli, start) {
        Ok(()) => ExitCode::from(AttainExitCode::Success as u8),
        Err(e) => report(&e, cli.format, cli.quiet),
    }
}

/// Print `error` for the operator and turn it into the process exit code
fn report(error: &AttainError, format: OutputFormat, quiet: bool) -> ExitCode {
    match format {
        OutputFormat::Json => eprintln!("{}", error.to_json()),
        OutputFormat::Human if !quiet => eprintln!("error: {}", error),
        OutputFormat::Human => {}
    }
    ExitCode::from(error.exit_code() as u8)
}

/// Classify a clap failure. Help and version requests exit right here.
fn parse_error(err: clap::Error) -> AttainError {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
        ErrorKind::ValueValidation
        | ErrorKind::InvalidValue
        | ErrorKind::InvalidSubcommand
        | ErrorKind::UnknownArgument
        | ErrorKind::MissingRequiredArgument
        | ErrorKind::ArgumentConflict => AttainError::UsageError(err.to_string()),
        _ => AttainError::Other(err.to_string()),
    }
}

/// Whether `--format json` (or `--format=json`) appears anywhere in `args`
fn json_requested(args: impl Iterator<Item = String>) -> bool {
    let args: Vec<String> = args.collect();
    args.iter().any(|a| a == "--format=json")
        || args.windows(2).any(|w| w[0] == "--format" && w[1] == "json")
}
