//! Rollup orchestration
//!
//! Every section of every configured course runs through the same stages:
//!
//! ```text
//! LOAD_OUTCOMES -> LOAD_MAPPING -> LOAD_GRADES -> AGGREGATE_CO
//!               -> ROLLUP_PO -> ROLLUP_IO -> PERSIST
//! ```
//!
//! A stage either hands its output to the next one or fails with a reason,
//! in which case the section is skipped and the run moves on. Sections share
//! no mutable state.

mod orchestrator;
mod report;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use orchestrator::Orchestrator;
pub use report::{CompletedSection, LevelReport, RunReport, SectionOutcome, SectionResult};

/// Identifies one course section
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionKey {
    pub course: String,
    pub semester: String,
    pub section: String,
}

impl SectionKey {
    pub fn new(course: &str, semester: &str, section: &str) -> Self {
        Self {
            course: course.trim().to_string(),
            semester: semester.trim().to_string(),
            section: section.trim().to_string(),
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} section {}", self.course, self.semester, self.section)
    }
}

/// Pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    LoadOutcomes,
    LoadMapping,
    LoadGrades,
    AggregateCo,
    RollupPo,
    RollupIo,
    Persist,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::LoadOutcomes => "LOAD_OUTCOMES",
            Stage::LoadMapping => "LOAD_MAPPING",
            Stage::LoadGrades => "LOAD_GRADES",
            Stage::AggregateCo => "AGGREGATE_CO",
            Stage::RollupPo => "ROLLUP_PO",
            Stage::RollupIo => "ROLLUP_IO",
            Stage::Persist => "PERSIST",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
