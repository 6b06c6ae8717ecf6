//! Run and section results

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{SectionKey, Stage};
use crate::criteria::ResolutionReport;
use crate::error::ExitCode;
use crate::mapping::MappingReport;
use crate::outcome::OutcomeId;
use crate::rollup::RollupAudit;
use crate::score::ScoreTable;
use crate::table::StudentId;

/// One level's reporting table plus what was skipped building it
#[derive(Debug, Clone, Serialize)]
pub struct LevelReport {
    /// Rounded to the run's precision
    pub table: ScoreTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<MappingReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<RollupAudit>,
}

/// Everything a successful section produced
#[derive(Debug, Clone, Serialize)]
pub struct CompletedSection {
    #[serde(rename = "course_outcomes")]
    pub course: LevelReport,
    #[serde(rename = "program_outcomes", skip_serializing_if = "Option::is_none")]
    pub program: Option<LevelReport>,
    #[serde(rename = "institution_outcomes", skip_serializing_if = "Option::is_none")]
    pub institution: Option<LevelReport>,
    pub resolution: ResolutionReport,
    /// (student, outcome) cells with no contributing grade
    pub insufficient: Vec<(StudentId, OutcomeId)>,
    /// CSV tables written
    pub files: Vec<PathBuf>,
    /// Score rows stored in the database
    pub stored_rows: usize,
}

impl CompletedSection {
    /// Available levels, course first
    pub fn levels(&self) -> impl Iterator<Item = &LevelReport> {
        std::iter::once(&self.course)
            .chain(self.program.as_ref())
            .chain(self.institution.as_ref())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionOutcome {
    Completed(Box<CompletedSection>),
    Skipped {
        stage: Stage,
        reason: String,
        error_type: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionResult {
    #[serde(flatten)]
    pub key: SectionKey,
    #[serde(flatten)]
    pub outcome: SectionOutcome,
}

impl SectionResult {
    pub fn completed(&self) -> Option<&CompletedSection> {
        match &self.outcome {
            SectionOutcome::Completed(section) => Some(section),
            SectionOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, SectionOutcome::Skipped { .. })
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<i64>,
    pub sections: Vec<SectionResult>,
}

impl RunReport {
    pub fn completed_count(&self) -> usize {
        self.sections.iter().filter(|s| !s.is_skipped()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.sections.iter().filter(|s| s.is_skipped()).count()
    }

    /// Success while at least one section completed
    pub fn exit_code(&self) -> ExitCode {
        if self.completed_count() == 0 {
            ExitCode::Data
        } else {
            ExitCode::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skipped(section: &str) -> SectionResult {
        SectionResult {
            key: SectionKey::new("COMP-101", "S24", section),
            outcome: SectionOutcome::Skipped {
                stage: Stage::LoadGrades,
                reason: "file not found: g.csv".into(),
                error_type: "file_not_found".into(),
            },
        }
    }

    #[test]
    fn test_all_skipped_is_data_error() {
        let now = Utc::now();
        let report = RunReport {
            started_at: now,
            finished_at: now,
            run_id: None,
            sections: vec![skipped("001"), skipped("002")],
        };
        assert_eq!(report.skipped_count(), 2);
        assert_eq!(report.exit_code(), ExitCode::Data);
    }

    #[test]
    fn test_skipped_section_json_shape() {
        let json = serde_json::to_value(skipped("001")).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["stage"], "LOAD_GRADES");
        assert_eq!(json["course"], "COMP-101");
        assert_eq!(json["section"], "001");
    }
}
