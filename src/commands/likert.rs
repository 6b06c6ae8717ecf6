//! `attain likert` command - print Likert levels for raw scores

use attain_core::error::Result;
use attain_core::format::OutputFormat;
use attain_core::likert::to_likert;

use crate::cli::Cli;

/// Execute the likert command
pub fn execute(cli: &Cli, scores: &[f64]) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            let output: Vec<_> = scores
                .iter()
                .map(|s| serde_json::json!({ "score": s, "level": to_likert(*s) }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            for s in scores {
                if cli.quiet {
                    println!("{}", to_likert(*s));
                } else {
                    println!("{} -> {}", s, to_likert(*s));
                }
            }
        }
    }
    Ok(())
}
