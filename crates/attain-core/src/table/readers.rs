//! Typed readers over [`Table`]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::{debug, warn};

use super::Table;
use crate::error::{AttainError, Result};
use crate::outcome::{Level, OutcomeId, OutcomeSet};
use crate::text::{canonical_name, is_marked};
use crate::{bail_empty, bail_missing};

/// A student identifier as it appears in the gradebook
pub type StudentId = String;

/// Per-student raw grades keyed by canonical assignment name.
///
/// Distinct columns can share a canonical name (`Quiz 1 (101)` and
/// `Quiz 1 (202)`); every one of their grades is kept under that name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeBook {
    assignments: BTreeSet<String>,
    students: BTreeMap<StudentId, BTreeMap<String, Vec<f64>>>,
}

impl GradeBook {
    /// Build a gradebook directly; assignment names are canonicalised
    pub fn from_rows<I, S, G, A>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, G)>,
        S: Into<StudentId>,
        G: IntoIterator<Item = (A, f64)>,
        A: AsRef<str>,
    {
        let mut book = GradeBook::default();
        for (student, grades) in rows {
            let row = book.students.entry(student.into()).or_default();
            for (assignment, grade) in grades {
                let name = canonical_name(assignment.as_ref());
                book.assignments.insert(name.clone());
                row.entry(name).or_default().push(grade);
            }
        }
        book
    }

    /// Canonical names of every assignment column in the source
    pub fn assignments(&self) -> &BTreeSet<String> {
        &self.assignments
    }

    pub fn students(&self) -> &BTreeMap<StudentId, BTreeMap<String, Vec<f64>>> {
        &self.students
    }

    /// Every grade the student has under `assignment`, in column order
    pub fn grades(&self, student: &str, assignment: &str) -> &[f64] {
        self.students
            .get(student)
            .and_then(|row| row.get(assignment))
            .map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

/// Declared criteria: outcome -> assignment names, in file order
pub type CriteriaTable = Vec<(OutcomeId, Vec<String>)>;

/// Section-specific renames: key (criterion or outcome) -> assignment names
pub type AliasTable = BTreeMap<String, Vec<String>>;

/// Unvalidated weight cells of a mapping table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawWeights {
    /// Where the cells came from
    pub location: String,
    /// Target outcome column headers, in file order
    pub targets: Vec<String>,
    /// Source outcome id and its raw cells, aligned with `targets`
    pub rows: Vec<(String, Vec<String>)>,
}

/// Parse a grade cell; blanks, dashes and text are "no grade"
fn parse_grade(cell: &str) -> Option<f64> {
    let cell = cell.trim().trim_end_matches('%').trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Read a gradebook export: one row per student, one column per assignment.
pub fn read_grades(path: &Path, student_id_column: &str) -> Result<GradeBook> {
    grades_from_table(&Table::read(path)?, student_id_column)
}

pub(crate) fn grades_from_table(table: &Table, student_id_column: &str) -> Result<GradeBook> {
    let Some(id_col) = table.column_index(student_id_column) else {
        bail_missing!(format!("column '{}'", student_id_column), table.location());
    };

    let columns: Vec<(usize, String)> = table
        .headers()
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != id_col && !h.is_empty())
        .map(|(i, h)| (i, canonical_name(h)))
        .collect();

    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, name) in &columns {
        *seen.entry(name.as_str()).or_default() += 1;
    }
    for (name, count) in seen.into_iter().filter(|(_, n)| *n > 1) {
        warn!(
            assignment = name,
            columns = count,
            location = table.location(),
            "columns share an assignment name, all grades count"
        );
    }

    let mut book = GradeBook {
        assignments: columns.iter().map(|(_, name)| name.clone()).collect(),
        students: BTreeMap::new(),
    };

    for row in table.rows() {
        let student = Table::cell(row, id_col);
        if student.is_empty() {
            // Export footers such as "Points Possible" carry no id
            continue;
        }
        let mut grades: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for (i, name) in &columns {
            if let Some(grade) = parse_grade(Table::cell(row, *i)) {
                grades.entry(name.clone()).or_default().push(grade);
            }
        }
        if book.students.insert(student.to_string(), grades).is_some() {
            warn!(student, location = table.location(), "duplicate student row, keeping last");
        }
    }

    if book.students.is_empty() {
        bail_empty!("student rows", table.location());
    }
    debug!(
        location = table.location(),
        students = book.students.len(),
        assignments = book.assignments.len(),
        "grades_loaded"
    );
    Ok(book)
}

/// Read outcome identifiers from the first column of a table.
pub fn read_outcome_definitions(path: &Path, level: Level) -> Result<OutcomeSet> {
    outcomes_from_table(&Table::read(path)?, level)
}

pub(crate) fn outcomes_from_table(table: &Table, level: Level) -> Result<OutcomeSet> {
    let set = OutcomeSet::new(level, table.rows().iter().map(|r| Table::cell(r, 0)));
    if set.is_empty() {
        bail_empty!(format!("{} outcomes", level), table.location());
    }
    Ok(set)
}

/// Read an outcome-by-assignment criteria table.
///
/// Column one names the outcome; every other header names an assignment,
/// and a marked cell means the assignment assesses that outcome.
pub fn read_criteria(path: &Path) -> Result<CriteriaTable> {
    Ok(criteria_from_table(&Table::read(path)?))
}

pub(crate) fn criteria_from_table(table: &Table) -> CriteriaTable {
    table
        .rows()
        .iter()
        .filter(|row| !Table::cell(row, 0).is_empty())
        .map(|row| {
            let assignments = table
                .headers()
                .iter()
                .enumerate()
                .skip(1)
                .filter(|(i, h)| !h.is_empty() && is_marked(Table::cell(row, *i)))
                .map(|(_, h)| h.clone())
                .collect();
            (Table::cell(row, 0).to_string(), assignments)
        })
        .collect()
}

/// Read a two-column alias table (criterion or outcome -> assignment).
pub fn read_aliases(path: &Path) -> Result<AliasTable> {
    aliases_from_table(&Table::read(path)?)
}

pub(crate) fn aliases_from_table(table: &Table) -> Result<AliasTable> {
    if table.headers().len() < 2 {
        bail_missing!("assignment column", table.location());
    }
    let mut aliases = AliasTable::new();
    for row in table.rows() {
        let (key, assignment) = (Table::cell(row, 0), Table::cell(row, 1));
        if key.is_empty() || assignment.is_empty() {
            continue;
        }
        aliases
            .entry(key.to_string())
            .or_default()
            .push(assignment.to_string());
    }
    Ok(aliases)
}

/// Read a source-by-target weight table without validating the cells.
pub fn read_weights(path: &Path) -> Result<RawWeights> {
    weights_from_table(&Table::read(path)?)
}

pub(crate) fn weights_from_table(table: &Table) -> Result<RawWeights> {
    if table.headers().len() < 2 {
        return Err(AttainError::missing_input(
            "target outcome columns",
            table.location(),
        ));
    }
    let targets: Vec<String> = table.headers().iter().skip(1).cloned().collect();
    let rows = table
        .rows()
        .iter()
        .filter(|row| !Table::cell(row, 0).is_empty())
        .map(|row| {
            let cells = (1..=targets.len())
                .map(|i| Table::cell(row, i).to_string())
                .collect();
            (Table::cell(row, 0).to_string(), cells)
        })
        .collect();
    Ok(RawWeights {
        location: table.location().to_string(),
        targets,
        rows,
    })
}
