//! `attain check` command - validate a run configuration
//!
//! Loads the configuration exactly as `attain run` would and reports every
//! input file that does not exist.

use std::path::Path;

use attain_core::config::RunConfig;
use attain_core::error::{AttainError, Result};
use attain_core::format::OutputFormat;

use crate::cli::Cli;

/// Execute the check command
pub fn execute(cli: &Cli, config_path: &Path) -> Result<()> {
    let config = RunConfig::load(config_path)?;
    let files = config.input_files();
    let missing: Vec<_> = files.iter().filter(|f| !f.path.exists()).collect();

    match cli.format {
        OutputFormat::Json => {
            let entries: Vec<_> = files
                .iter()
                .map(|f| {
                    serde_json::json!({
                        "role": f.role,
                        "path": f.path.display().to_string(),
                        "exists": f.path.exists(),
                    })
                })
                .collect();
            let output = serde_json::json!({
                "status": if missing.is_empty() { "ok" } else { "missing_inputs" },
                "courses": config.courses.len(),
                "sections": config.section_count(),
                "files": entries,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            if !cli.quiet {
                println!(
                    "{} courses, {} sections, {} input files",
                    config.courses.len(),
                    config.section_count(),
                    files.len()
                );
                for f in &missing {
                    println!("  missing {}: {}", f.role, f.path.display());
                }
                if cli.verbose {
                    for f in files.iter().filter(|f| f.path.exists()) {
                        println!("  ok {}: {}", f.role, f.path.display());
                    }
                }
            }
        }
    }

    if let Some(first) = missing.first() {
        return Err(AttainError::missing_input(
            format!("{} input file(s), first {}", missing.len(), first.role),
            config_path.display(),
        ));
    }
    Ok(())
}
