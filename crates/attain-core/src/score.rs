//! Score tables: per-student outcome scores plus a class-average row
//!
//! A table is built once and never mutated; each level of the hierarchy is
//! a fresh table computed from the level below.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::outcome::{Level, OutcomeId, OutcomeSet};
use crate::table::StudentId;

/// One subject's scores keyed by outcome; absent keys are undefined
pub type ScoreRow = BTreeMap<OutcomeId, f64>;

/// Default number of decimals in reported tables
pub const REPORT_PRECISION: u32 = 2;

/// Per-student and class-average scores at one outcome level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreTable {
    level: Level,
    outcomes: Vec<OutcomeId>,
    students: BTreeMap<StudentId, ScoreRow>,
    class_average: ScoreRow,
}

impl ScoreTable {
    /// Assemble a table whose class-average row was computed independently
    pub fn new(
        outcomes: &OutcomeSet,
        students: BTreeMap<StudentId, ScoreRow>,
        class_average: ScoreRow,
    ) -> Self {
        Self {
            level: outcomes.level(),
            outcomes: outcomes.ids().to_vec(),
            students,
            class_average,
        }
    }

    /// Assemble a table whose class-average row is the mean of the student rows
    pub fn with_class_mean(outcomes: &OutcomeSet, students: BTreeMap<StudentId, ScoreRow>) -> Self {
        let class_average = class_mean(outcomes.ids(), &students);
        Self::new(outcomes, students, class_average)
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Declared outcomes in report order
    pub fn outcomes(&self) -> &[OutcomeId] {
        &self.outcomes
    }

    pub fn students(&self) -> &BTreeMap<StudentId, ScoreRow> {
        &self.students
    }

    pub fn student(&self, id: &str) -> Option<&ScoreRow> {
        self.students.get(id)
    }

    pub fn score(&self, student: &str, outcome: &str) -> Option<f64> {
        self.students.get(student)?.get(outcome).copied()
    }

    pub fn class_average(&self) -> &ScoreRow {
        &self.class_average
    }

    pub fn class_score(&self, outcome: &str) -> Option<f64> {
        self.class_average.get(outcome).copied()
    }

    pub fn student_count(&self) -> usize {
        self.students.len()
    }

    /// Reporting view with every value rounded to `precision` decimals
    pub fn rounded(&self, precision: u32) -> ScoreTable {
        let round_row = |row: &ScoreRow| -> ScoreRow {
            row.iter()
                .map(|(k, v)| (k.clone(), round_to(*v, precision)))
                .collect()
        };
        ScoreTable {
            level: self.level,
            outcomes: self.outcomes.clone(),
            students: self
                .students
                .iter()
                .map(|(id, row)| (id.clone(), round_row(row)))
                .collect(),
            class_average: round_row(&self.class_average),
        }
    }
}

/// Per-outcome arithmetic mean over the students that have a value.
///
/// Outcomes no student has a value for are left out.
pub fn class_mean(outcomes: &[OutcomeId], students: &BTreeMap<StudentId, ScoreRow>) -> ScoreRow {
    outcomes
        .iter()
        .filter_map(|outcome| {
            let (sum, n) = students
                .values()
                .filter_map(|row| row.get(outcome))
                .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
            (n > 0).then(|| (outcome.clone(), sum / n as f64))
        })
        .collect()
}

/// Round half away from zero to `precision` decimals
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, f64)]) -> ScoreRow {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_class_mean_skips_undefined() {
        let outcomes = OutcomeSet::new(Level::Course, ["CO-1", "CO-2", "CO-3"]);
        let mut students = BTreeMap::new();
        students.insert("1".to_string(), row(&[("CO-1", 5.0), ("CO-2", 2.0)]));
        students.insert("2".to_string(), row(&[("CO-1", 3.0)]));
        let table = ScoreTable::with_class_mean(&outcomes, students);

        assert_eq!(table.class_score("CO-1"), Some(4.0));
        assert_eq!(table.class_score("CO-2"), Some(2.0));
        assert_eq!(table.class_score("CO-3"), None);
        assert_eq!(table.student_count(), 2);
    }

    #[test]
    fn test_rounded_view() {
        let outcomes = OutcomeSet::new(Level::Program, ["PO-1"]);
        let mut students = BTreeMap::new();
        students.insert("1".to_string(), row(&[("PO-1", 10.0 / 3.0)]));
        let table = ScoreTable::with_class_mean(&outcomes, students).rounded(2);
        assert_eq!(table.score("1", "PO-1"), Some(3.33));
        assert_eq!(table.class_score("PO-1"), Some(3.33));
        assert_eq!(table.level(), Level::Program);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(3.456, 2), 3.46);
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(4.0, 2), 4.0);
    }
}
