//! Command dispatch logic for attain
use std::time::Instant;

use attain_core::error::{AttainError, Result};

use crate::cli::{Cli, Commands};
use crate::commands;
use crate::commands::profile::ProfileSource;

pub fn run(cli: &Cli, start: Instant) -> Result<()> {
    match &cli.command {
        Commands::Run { config, no_persist } => {
            commands::run::execute(cli, config, !*no_persist, start)
        }
        Commands::Check { config } => commands::check::execute(cli, config),
        Commands::Likert { scores } => commands::likert::execute(cli, scores),
        Commands::Profile {
            results,
            database,
            level,
            student_id,
        } => {
            let source = match (results, database) {
                (_, Some(db)) => ProfileSource::Database(db),
                (Some(dir), None) => ProfileSource::Results(dir),
                (None, None) => {
                    return Err(AttainError::UsageError(
                        "profile needs --results or --database".to_string(),
                    ))
                }
            };
            commands::profile::execute(cli, source, *level, student_id)
        }
    }
}
