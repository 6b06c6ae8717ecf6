//! Configuration type definitions

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::aggregate::EmptyCriteriaPolicy;
use crate::score::REPORT_PRECISION;

/// Largest accepted reporting precision
pub const MAX_PRECISION: u32 = 6;

/// A complete rollup run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Run-wide options
    #[serde(default)]
    pub options: RunOptions,

    /// Course offerings to process, in order
    #[serde(default)]
    pub courses: Vec<CourseConfig>,

    /// Shared program and institution mappings
    #[serde(default)]
    pub mappings: MappingConfig,

    /// Where results are written
    #[serde(default)]
    pub output: OutputConfig,
}

/// Options shared by every section of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Grade column holding the student identifier
    #[serde(default = "default_student_id_column")]
    pub student_id_column: String,

    /// Decimals in reported scores (default 2)
    #[serde(default = "default_precision")]
    pub precision: u32,

    /// Scoring of outcomes with no contributing grade
    #[serde(default)]
    pub empty_criteria: EmptyCriteriaPolicy,

    /// Label of the class-average row in written tables
    #[serde(default = "default_class_average_label")]
    pub class_average_label: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            student_id_column: default_student_id_column(),
            precision: default_precision(),
            empty_criteria: EmptyCriteriaPolicy::default(),
            class_average_label: default_class_average_label(),
        }
    }
}

/// One course offering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseConfig {
    pub name: String,
    pub semester: String,

    /// Course outcome definitions (first column: outcome id)
    pub outcomes_file: PathBuf,

    /// Outcome -> assignment criteria; defaults to `outcomes_file`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_file: Option<PathBuf>,

    #[serde(default)]
    pub sections: Vec<SectionConfig>,
}

impl CourseConfig {
    pub fn criteria_path(&self) -> &PathBuf {
        self.criteria_file.as_ref().unwrap_or(&self.outcomes_file)
    }
}

/// One section of a course offering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionConfig {
    pub section: String,

    /// Section-specific assignment aliases (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignments_file: Option<PathBuf>,

    pub grades_file: PathBuf,
}

/// Shared mapping files; a missing level ends the cascade before it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_outcomes_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co_to_po_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_outcomes_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_to_io_file: Option<PathBuf>,
}

impl MappingConfig {
    /// Program outcome definitions and CO -> PO weights, when both are set
    pub fn program(&self) -> Option<(&PathBuf, &PathBuf)> {
        self.program_outcomes_file.as_ref().zip(self.co_to_po_file.as_ref())
    }

    /// Institution outcome definitions and PO -> IO weights, when both are set
    pub fn institution(&self) -> Option<(&PathBuf, &PathBuf)> {
        self.institution_outcomes_file
            .as_ref()
            .zip(self.po_to_io_file.as_ref())
    }
}

/// Result destinations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for CSV score tables
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// SQLite database recording every run (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            database: None,
        }
    }
}

fn default_student_id_column() -> String {
    "SIS User ID".to_string()
}

fn default_precision() -> u32 {
    REPORT_PRECISION
}

fn default_class_average_label() -> String {
    "Class Average".to_string()
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("results")
}
