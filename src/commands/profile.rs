//! `attain profile` command - one student's scores across sections

use std::path::Path;

use attain_core::error::Result;
use attain_core::format::{format_score, OutputFormat};
use attain_core::outcome::Level;
use attain_core::profile::{collect_profile, profile_from_database};
use attain_core::score::REPORT_PRECISION;

use crate::cli::Cli;

/// Where recorded scores are read from
pub enum ProfileSource<'a> {
    /// Directory of written score tables
    Results(&'a Path),
    /// Run database
    Database(&'a Path),
}

/// Execute the profile command
pub fn execute(cli: &Cli, source: ProfileSource<'_>, level: Level, student_id: &str) -> Result<()> {
    let profile = match source {
        ProfileSource::Results(dir) => collect_profile(dir, student_id, level)?,
        ProfileSource::Database(db) => profile_from_database(db, student_id, level)?,
    };

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        OutputFormat::Human => {
            if profile.is_empty() {
                if !cli.quiet {
                    println!("No {} scores found for student {}", level, profile.student_id);
                }
                return Ok(());
            }
            if !cli.quiet {
                println!("Student {} ({} outcomes)", profile.student_id, level);
            }
            for (section, scores) in &profile.sections {
                let cells: Vec<String> = scores
                    .iter()
                    .map(|(outcome, score)| {
                        format!("{} {}", outcome, format_score(Some(*score), REPORT_PRECISION))
                    })
                    .collect();
                println!("  {}: {}", section, cells.join(", "));
            }
        }
    }
    Ok(())
}
