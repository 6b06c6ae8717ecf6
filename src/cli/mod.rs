//! CLI argument parsing for attain
//!
//! Global flags: --format, --quiet, --verbose, --log-level, --log-json

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use attain_core::format::OutputFormat;
use attain_core::outcome::Level;

/// Attain - outcome attainment rollup for accreditation reporting
#[derive(Parser, Debug)]
#[command(name = "attain")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (human or json)
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Show per-section details and debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log filter, e.g. `debug` or `attain_core=trace`
    #[arg(long, global = true, env = "ATTAIN_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score every configured section and roll results up to PO and IO
    Run {
        /// Run configuration (TOML or JSON)
        #[arg(long, short)]
        config: PathBuf,

        /// Compute and report without writing tables or the database
        #[arg(long)]
        no_persist: bool,
    },

    /// Validate a configuration and report missing input files
    Check {
        /// Run configuration (TOML or JSON)
        #[arg(long, short)]
        config: PathBuf,
    },

    /// Convert percentage scores to Likert levels
    Likert {
        /// Scores on a 0-100 scale
        #[arg(required = true, allow_negative_numbers = true)]
        scores: Vec<f64>,
    },

    /// Show one student's scores across every written section
    Profile {
        /// Directory holding the written score tables
        #[arg(long, short, required_unless_present = "database")]
        results: Option<PathBuf>,

        /// Read recorded scores from a run database instead
        #[arg(long, conflicts_with = "results")]
        database: Option<PathBuf>,

        /// Outcome level to collect
        #[arg(long, default_value = "course")]
        level: Level,

        /// Student identifier
        student_id: String,
    },
}
