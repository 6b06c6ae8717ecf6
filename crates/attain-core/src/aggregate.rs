//! Course outcome aggregation
//!
//! Per student and outcome: mean of the grades present for the outcome's
//! assignments, discretised with [`to_likert`]. The class-average row is the
//! mean of the students' Likert levels, not of their raw grades.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::criteria::CriteriaMap;
use crate::error::AttainError;
use crate::likert::to_likert;
use crate::outcome::{Level, OutcomeId, OutcomeSet};
use crate::score::{ScoreRow, ScoreTable};
use crate::table::{GradeBook, StudentId};

/// What to do with a (student, outcome) cell that has no contributing grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyCriteriaPolicy {
    /// Treat the average as 0, which scores the lowest level
    #[default]
    LowestLevel,
    /// Leave the cell undefined; it is excluded from the class average
    Exclude,
}

impl fmt::Display for EmptyCriteriaPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyCriteriaPolicy::LowestLevel => write!(f, "lowest-level"),
            EmptyCriteriaPolicy::Exclude => write!(f, "exclude"),
        }
    }
}

impl FromStr for EmptyCriteriaPolicy {
    type Err = AttainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lowest-level" | "lowest" => Ok(EmptyCriteriaPolicy::LowestLevel),
            "exclude" => Ok(EmptyCriteriaPolicy::Exclude),
            other => Err(AttainError::invalid_value("empty criteria policy", other)),
        }
    }
}

/// Course outcome table plus the cells that had no data behind them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseAggregation {
    pub table: ScoreTable,
    /// (student, outcome) cells with no contributing grade, whatever the policy
    pub insufficient: Vec<(StudentId, OutcomeId)>,
}

/// Score every student on every course outcome.
pub fn aggregate_course_outcomes(
    outcomes: &OutcomeSet,
    criteria: &CriteriaMap,
    grades: &GradeBook,
    policy: EmptyCriteriaPolicy,
) -> CourseAggregation {
    debug_assert_eq!(outcomes.level(), Level::Course);

    let mut insufficient = Vec::new();
    let mut students: BTreeMap<StudentId, ScoreRow> = BTreeMap::new();

    for (student, row) in grades.students() {
        let mut scores = ScoreRow::new();
        for outcome in outcomes.iter() {
            let present: Vec<f64> = criteria
                .assignments(outcome)
                .iter()
                .filter_map(|a| row.get(a))
                .flatten()
                .copied()
                .collect();

            if present.is_empty() {
                insufficient.push((student.clone(), outcome.to_string()));
                if policy == EmptyCriteriaPolicy::LowestLevel {
                    scores.insert(outcome.to_string(), f64::from(to_likert(0.0)));
                }
                continue;
            }

            let average = present.iter().sum::<f64>() / present.len() as f64;
            scores.insert(outcome.to_string(), f64::from(to_likert(average)));
        }
        students.insert(student.clone(), scores);
    }

    if !insufficient.is_empty() {
        tracing::debug!(
            cells = insufficient.len(),
            policy = %policy,
            "course_outcomes_without_grades"
        );
    }

    CourseAggregation {
        table: ScoreTable::with_class_mean(outcomes, students),
        insufficient,
    }
}

/// Summary lines in the form printed to operators after aggregation
pub fn summary_lines(table: &ScoreTable) -> Vec<String> {
    table
        .outcomes()
        .iter()
        .map(|outcome| match table.class_score(outcome) {
            Some(avg) => format!("Course Outcome: {outcome}, Class Likert Average: {avg:.2}"),
            None => format!("Course Outcome: {outcome}, Class Likert Average: n/a"),
        })
        .collect()
}
