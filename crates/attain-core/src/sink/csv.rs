//! CSV score table writer
//!
//! Tables are staged under a `.tmp` name and renamed into place, so a
//! reader never sees a half-written section.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AttainError, Result};
use crate::format::format_score;
use crate::outcome::Level;
use crate::pipeline::SectionKey;
use crate::score::ScoreTable;

/// Header of the first column of every written table
pub const STUDENT_ID_HEADER: &str = "Student ID";

/// `<course>_<semester>_<section>_<level>_outcomes.csv`
pub fn table_file_name(key: &SectionKey, level: Level) -> String {
    format!("{}_{}_outcomes.csv", section_prefix(key), level.as_str())
}

/// `<course>_<semester>_<section>`, as used in file names and profiles
pub fn section_prefix(key: &SectionKey) -> String {
    format!(
        "{}_{}_{}",
        file_part(&key.course),
        file_part(&key.semester),
        file_part(&key.section)
    )
}

/// Keep identifiers usable as file name parts
fn file_part(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// A table written beside its final path and not yet visible under it
#[derive(Debug)]
pub struct StagedTable {
    staged: PathBuf,
    path: PathBuf,
}

impl StagedTable {
    /// Where the table lands on [`commit`](Self::commit)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the table into place. A failed move leaves nothing behind.
    pub fn commit(self) -> Result<PathBuf> {
        match fs::rename(&self.staged, &self.path) {
            Ok(()) => Ok(self.path),
            Err(e) => {
                let err = AttainError::io_operation("replace", self.path.display(), e);
                remove_quietly(&self.staged);
                Err(err)
            }
        }
    }

    pub fn discard(self) {
        remove_quietly(&self.staged);
    }
}

/// Write one score table, rounded to `precision`, as `<name>.tmp` beside
/// its final path, ready to [`commit`](StagedTable::commit).
///
/// Students come first in id order, then the class-average row under
/// `class_label`. Undefined scores are written as empty cells.
pub fn stage_table(
    dir: &Path,
    key: &SectionKey,
    table: &ScoreTable,
    class_label: &str,
    precision: u32,
) -> Result<StagedTable> {
    fs::create_dir_all(dir)
        .map_err(|e| AttainError::io_operation("create directory", dir.display(), e))?;
    let name = table_file_name(key, table.level());
    let staged = dir.join(format!("{name}.tmp"));

    if let Err(err) = write_rows(&staged, table, class_label, precision) {
        remove_quietly(&staged);
        return Err(err);
    }
    Ok(StagedTable {
        staged,
        path: dir.join(name),
    })
}

fn write_rows(path: &Path, table: &ScoreTable, class_label: &str, precision: u32) -> Result<()> {
    let rounded = table.rounded(precision);
    let mut writer = ::csv::Writer::from_path(path)?;

    let mut header = vec![STUDENT_ID_HEADER.to_string()];
    header.extend(rounded.outcomes().iter().cloned());
    writer.write_record(&header)?;

    let cells = |row: &crate::score::ScoreRow| -> Vec<String> {
        rounded
            .outcomes()
            .iter()
            .map(|o| format_score(row.get(o).copied(), precision))
            .collect()
    };

    for (student, row) in rounded.students() {
        let mut record = vec![student.clone()];
        record.extend(cells(row));
        writer.write_record(&record)?;
    }
    let mut record = vec![class_label.to_string()];
    record.extend(cells(rounded.class_average()));
    writer.write_record(&record)?;

    writer
        .flush()
        .map_err(|e| AttainError::io_operation("write", path.display(), e))?;

    tracing::debug!(path = %path.display(), rows = rounded.student_count() + 1, "table_written");
    Ok(())
}

/// Best-effort removal of a file this run wrote
pub fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "could not remove partial output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::OutcomeSet;
    use crate::score::ScoreRow;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn key() -> SectionKey {
        SectionKey::new("COMP-101", "S24", "001")
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            table_file_name(&key(), Level::Program),
            "COMP-101_S24_001_program_outcomes.csv"
        );
        let odd = SectionKey::new("COMP 101", "Fall/24", "A");
        assert_eq!(
            table_file_name(&odd, Level::Course),
            "COMP-101_Fall-24_A_course_outcomes.csv"
        );
    }

    #[test]
    fn test_write_table_layout() {
        let dir = tempdir().unwrap();
        let outcomes = OutcomeSet::new(Level::Program, ["PO-1", "PO-2"]);
        let mut students: BTreeMap<String, ScoreRow> = BTreeMap::new();
        students.insert(
            "1002".into(),
            [("PO-1".to_string(), 10.0 / 3.0)].into_iter().collect(),
        );
        students.insert(
            "1001".into(),
            [("PO-1".to_string(), 4.0), ("PO-2".to_string(), 2.5)]
                .into_iter()
                .collect(),
        );
        let table = ScoreTable::with_class_mean(&outcomes, students);

        let path = stage_table(dir.path(), &key(), &table, "Class Average", 2)
            .and_then(StagedTable::commit)
            .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            [
                "Student ID,PO-1,PO-2",
                "1001,4.00,2.50",
                "1002,3.33,",
                "Class Average,3.67,2.50",
            ]
        );
    }

    fn small_table() -> ScoreTable {
        let outcomes = OutcomeSet::new(Level::Course, ["CO-1"]);
        let mut students: BTreeMap<String, ScoreRow> = BTreeMap::new();
        students.insert("1".into(), [("CO-1".to_string(), 5.0)].into_iter().collect());
        ScoreTable::with_class_mean(&outcomes, students)
    }

    #[test]
    fn test_staged_table_is_hidden_until_commit() {
        let dir = tempdir().unwrap();
        let staged = stage_table(dir.path(), &key(), &small_table(), "Class Average", 2).unwrap();
        let target = staged.path().to_path_buf();
        assert!(!target.exists());

        let path = staged.commit().unwrap();
        assert_eq!(path, target);
        assert!(path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

        let discarded = stage_table(dir.path(), &key(), &small_table(), "Class Average", 2).unwrap();
        discarded.discard();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_commit_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("COMP-101_S24_001_course_outcomes.csv")).unwrap();

        let staged = stage_table(dir.path(), &key(), &small_table(), "Class Average", 2).unwrap();
        let err = staged.commit().unwrap_err();
        assert!(matches!(err, AttainError::FailedOperationWithTarget { .. }));
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["COMP-101_S24_001_course_outcomes.csv"]);
    }
}
