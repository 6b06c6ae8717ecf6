//! Per-student outcome profile across every written section
//!
//! Reads back the score tables of a results directory, or the score
//! database, and collects one student's row per section, keyed by the
//! `<course>_<semester>_<section>` prefix of the table file name.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{AttainError, Result};
use crate::outcome::{Level, OutcomeId};
use crate::sink::{section_prefix, ScoreDatabase, STUDENT_ID_HEADER};
use crate::table::{StudentId, Table};

/// One student's scores per section table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StudentProfile {
    pub student_id: StudentId,
    pub level: Option<Level>,
    /// Section file prefix -> outcome -> score
    pub sections: BTreeMap<String, BTreeMap<OutcomeId, f64>>,
}

impl StudentProfile {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Collect `student_id`'s scores at `level` from every table under `dir`.
///
/// Unreadable tables are logged and skipped. A student found in no table
/// gets an empty profile.
pub fn collect_profile(dir: &Path, student_id: &str, level: Level) -> Result<StudentProfile> {
    if !dir.is_dir() {
        return Err(AttainError::FileNotFound(dir.to_path_buf()));
    }
    let suffix = format!("_{}_outcomes.csv", level.as_str());
    let student_id = student_id.trim();

    let mut profile = StudentProfile {
        student_id: student_id.to_string(),
        level: Some(level),
        sections: BTreeMap::new(),
    };

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let name = entry.file_name().to_string_lossy();
        let Some(prefix) = name.strip_suffix(suffix.as_str()) else {
            continue;
        };
        let table = match Table::read(entry.path()) {
            Ok(table) => table,
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "skipping unreadable table");
                continue;
            }
        };
        if let Some(scores) = student_row(&table, student_id) {
            profile.sections.insert(prefix.to_string(), scores);
        }
    }

    debug!(student = %student_id, sections = profile.sections.len(), "profile_collected");
    Ok(profile)
}

/// Collect `student_id`'s scores at `level` from a score database.
///
/// Each section reports the newest run that recorded this student.
pub fn profile_from_database(
    database: &Path,
    student_id: &str,
    level: Level,
) -> Result<StudentProfile> {
    if !database.is_file() {
        return Err(AttainError::FileNotFound(database.to_path_buf()));
    }
    let db = ScoreDatabase::open(database)?;
    let student_id = student_id.trim();

    let mut profile = StudentProfile {
        student_id: student_id.to_string(),
        level: Some(level),
        sections: BTreeMap::new(),
    };
    let mut newest_run: BTreeMap<String, i64> = BTreeMap::new();
    for stored in db.student_scores(student_id, level)? {
        let prefix = section_prefix(&stored.key);
        let run = *newest_run.entry(prefix.clone()).or_insert(stored.run_id);
        if run != stored.run_id {
            continue;
        }
        profile
            .sections
            .entry(prefix)
            .or_default()
            .insert(stored.outcome, stored.score);
    }

    debug!(student = %student_id, sections = profile.sections.len(), "profile_loaded");
    Ok(profile)
}

/// The student's defined scores in one table, if the student is listed
fn student_row(table: &Table, student_id: &str) -> Option<BTreeMap<OutcomeId, f64>> {
    let Some(id_col) = table.column_index(STUDENT_ID_HEADER) else {
        warn!(location = %table.location(), "table has no student id column");
        return None;
    };
    let row = table
        .rows()
        .iter()
        .find(|row| Table::cell(row, id_col) == student_id)?;

    Some(
        table
            .headers()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != id_col)
            .filter_map(|(i, outcome)| {
                let value = Table::cell(row, i).parse::<f64>().ok()?;
                Some((outcome.clone(), value))
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_collects_across_courses() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("COMP-101_S24_001_course_outcomes.csv"),
            "Student ID,CO-1,CO-2\n1001,5.00,\n1002,3.00,4.00\nClass Average,4.00,4.00\n",
        )
        .unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested/MATH-201_S24_002_course_outcomes.csv"),
            "Student ID,CO-1\n1001,2.00\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("COMP-101_S24_001_program_outcomes.csv"),
            "Student ID,PO-1\n1001,4.50\n",
        )
        .unwrap();

        let profile = collect_profile(dir.path(), "1001", Level::Course).unwrap();
        assert_eq!(profile.sections.len(), 2);
        let comp = &profile.sections["COMP-101_S24_001"];
        assert_eq!(comp["CO-1"], 5.0);
        // Blank cells are undefined, not zero
        assert!(!comp.contains_key("CO-2"));
        assert_eq!(profile.sections["MATH-201_S24_002"]["CO-1"], 2.0);

        let program = collect_profile(dir.path(), "1001", Level::Program).unwrap();
        assert_eq!(program.sections["COMP-101_S24_001"]["PO-1"], 4.5);
    }

    #[test]
    fn test_unknown_student_has_empty_profile() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("COMP-101_S24_001_course_outcomes.csv"),
            "Student ID,CO-1\n1001,5.00\n",
        )
        .unwrap();
        let profile = collect_profile(dir.path(), "9999", Level::Course).unwrap();
        assert!(profile.is_empty());
    }

    #[test]
    fn test_database_profile_uses_newest_run() {
        use crate::outcome::OutcomeSet;
        use crate::pipeline::SectionKey;
        use crate::score::{ScoreRow, ScoreTable};
        use chrono::Utc;

        let table = |score: f64| {
            let outcomes = OutcomeSet::new(Level::Course, ["CO-1"]);
            let row: ScoreRow = [("CO-1".to_string(), score)].into_iter().collect();
            ScoreTable::with_class_mean(&outcomes, [("1001".to_string(), row)].into_iter().collect())
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("attain.db");
        {
            let mut db = ScoreDatabase::open(&path).unwrap();
            let comp = SectionKey::new("COMP-101", "S24", "001");
            let math = SectionKey::new("MATH-201", "S24", "002");
            let first = db.begin_run(Utc::now(), "a.toml").unwrap();
            db.record_section(first, &comp, &[&table(2.0)], "Class Average", 2)
                .unwrap();
            db.record_section(first, &math, &[&table(4.0)], "Class Average", 2)
                .unwrap();
            let second = db.begin_run(Utc::now(), "b.toml").unwrap();
            db.record_section(second, &comp, &[&table(5.0)], "Class Average", 2)
                .unwrap();
        }

        let profile = profile_from_database(&path, "1001", Level::Course).unwrap();
        assert_eq!(profile.sections["COMP-101_S24_001"]["CO-1"], 5.0);
        assert_eq!(profile.sections["MATH-201_S24_002"]["CO-1"], 4.0);

        let program = profile_from_database(&path, "1001", Level::Program).unwrap();
        assert!(program.is_empty());
        assert!(matches!(
            profile_from_database(&dir.path().join("none.db"), "1001", Level::Course),
            Err(AttainError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempdir().unwrap();
        let err = collect_profile(&dir.path().join("none"), "1001", Level::Course).unwrap_err();
        assert!(matches!(err, AttainError::FileNotFound(_)));
    }
}
