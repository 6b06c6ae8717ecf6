//! `attain run` command - score every section and roll up
//!
//! A section that fails at any stage is reported and skipped; the command
//! fails only when no section completed.

use std::path::Path;
use std::time::Instant;

use attain_core::aggregate::summary_lines;
use attain_core::config::RunConfig;
use attain_core::error::{AttainError, ExitCode, Result};
use attain_core::format::{format_score, OutputFormat};
use attain_core::pipeline::{CompletedSection, Orchestrator, RunReport, SectionOutcome};
use attain_core::score::ScoreTable;

use crate::cli::Cli;

/// Execute the run command
pub fn execute(cli: &Cli, config_path: &Path, persist: bool, start: Instant) -> Result<()> {
    let config = RunConfig::load(config_path)?;
    if cli.verbose {
        tracing::debug!(elapsed = ?start.elapsed(), "load_config");
    }

    let report = Orchestrator::new(&config)
        .config_path(config_path)
        .persist(persist)
        .run()?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Human => {
            if !cli.quiet {
                print_human(cli, &report, config.options.precision);
            }
        }
    }

    if report.exit_code() == ExitCode::Data {
        return Err(AttainError::empty_data(
            "completed sections",
            config_path.display(),
        ));
    }
    Ok(())
}

fn print_human(cli: &Cli, report: &RunReport, precision: u32) {
    for result in &report.sections {
        match &result.outcome {
            SectionOutcome::Completed(section) => {
                println!("{}", result.key);
                print_section(cli, section, precision);
            }
            SectionOutcome::Skipped { stage, reason, .. } => {
                println!("{}: skipped at {}: {}", result.key, stage, reason);
            }
        }
    }
    println!(
        "Completed {} of {} sections",
        report.completed_count(),
        report.sections.len()
    );
}

fn print_section(cli: &Cli, section: &CompletedSection, precision: u32) {
    for line in summary_lines(&section.course.table) {
        println!("  {}", line);
    }
    for level in section.levels().skip(1) {
        for line in level_lines(&level.table, precision) {
            println!("  {}", line);
        }
    }

    if cli.verbose {
        if !section.insufficient.is_empty() {
            println!(
                "  {} student/outcome cells had no contributing grade",
                section.insufficient.len()
            );
        }
        for (outcome, names) in &section.resolution.unresolved {
            println!("  {}: unmatched criteria {:?}", outcome, names);
        }
        for level in section.levels() {
            if let Some(audit) = &level.audit {
                if !audit.unresolved_sources.is_empty() {
                    println!(
                        "  {} mapping sources without scores: {:?}",
                        level.table.level(),
                        audit.unresolved_sources
                    );
                }
                if !audit.dropped_students.is_empty() {
                    println!(
                        "  {} students without {} scores",
                        audit.dropped_students.len(),
                        level.table.level()
                    );
                }
            }
            if let Some(mapping) = &level.mapping {
                for invalid in &mapping.invalid_weights {
                    println!(
                        "  skipped weight {:?} for {} -> {}",
                        invalid.value, invalid.source, invalid.target
                    );
                }
            }
        }
        for file in &section.files {
            println!("  wrote {}", file.display());
        }
    }
}

/// Class-average lines for a rolled-up level
fn level_lines(table: &ScoreTable, precision: u32) -> Vec<String> {
    let title = table.level().title();
    table
        .outcomes()
        .iter()
        .map(|outcome| match table.class_score(outcome) {
            Some(avg) => format!(
                "{title}: {outcome}, Class Average: {}",
                format_score(Some(avg), precision)
            ),
            None => format!("{title}: {outcome}, Class Average: n/a"),
        })
        .collect()
}
