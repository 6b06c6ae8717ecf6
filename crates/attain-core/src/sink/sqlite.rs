//! SQLite record of rollup runs

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::error::{AttainError, Result};
use crate::outcome::Level;
use crate::pipeline::SectionKey;
use crate::score::ScoreTable;

pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA_SQL: &str = r#"
-- One row per `attain run`
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    config TEXT NOT NULL,
    completed INTEGER,
    skipped INTEGER
);

-- Rounded scores, class-average rows flagged
CREATE TABLE IF NOT EXISTS scores (
    run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    course TEXT NOT NULL,
    semester TEXT NOT NULL,
    section TEXT NOT NULL,
    level TEXT NOT NULL,
    student_id TEXT NOT NULL,
    outcome_id TEXT NOT NULL,
    score REAL NOT NULL,
    is_class_average INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_scores_student ON scores(student_id);
CREATE INDEX IF NOT EXISTS idx_scores_section ON scores(course, semester, section);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT
);
"#;

fn create_schema(conn: &Connection) -> Result<()> {
    let current: Option<i32> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |r| r.get::<_, String>(0).map(|s| s.parse().unwrap_or(0)),
        )
        .ok();

    match current {
        None => {
            conn.execute_batch(SCHEMA_SQL)?;
            conn.execute(
                "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)",
                [&SCHEMA_VERSION.to_string()],
            )?;
            Ok(())
        }
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(v) => Err(AttainError::Sqlite(format!(
            "unsupported schema version {v} (expected {SCHEMA_VERSION})"
        ))),
    }
}

/// Run history and scores
#[derive(Debug)]
pub struct ScoreDatabase {
    conn: Connection,
}

impl ScoreDatabase {
    /// Open or create the database file
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| AttainError::io_operation("create directory", parent.display(), e))?;
        }
        let conn = Connection::open(path).map_err(|e| {
            AttainError::Sqlite(format!(
                "failed to open database at {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        create_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Register a new run and return its id
    pub fn begin_run(&self, started_at: DateTime<Utc>, config: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO runs (started_at, config) VALUES (?1, ?2)",
            params![started_at.to_rfc3339(), config],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Record the section counts once a run is over
    pub fn finish_run(&self, run_id: i64, completed: usize, skipped: usize) -> Result<()> {
        self.conn.execute(
            "UPDATE runs SET completed = ?1, skipped = ?2 WHERE id = ?3",
            params![completed as i64, skipped as i64, run_id],
        )?;
        Ok(())
    }

    /// Store every table of one section in a single transaction.
    ///
    /// Returns the number of score rows inserted.
    pub fn record_section(
        &mut self,
        run_id: i64,
        key: &SectionKey,
        tables: &[&ScoreTable],
        class_label: &str,
        precision: u32,
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO scores (run_id, course, semester, section, level, student_id, outcome_id, score, is_class_average)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for table in tables {
                let rounded = table.rounded(precision);
                let level = rounded.level().as_str();
                let rows = rounded
                    .students()
                    .iter()
                    .map(|(id, row)| (id.as_str(), row, false))
                    .chain([(class_label, rounded.class_average(), true)]);
                for (student, row, is_class) in rows {
                    for (outcome, score) in row {
                        stmt.execute(params![
                            run_id,
                            key.course,
                            key.semester,
                            key.section,
                            level,
                            student,
                            outcome,
                            score,
                            is_class,
                        ])?;
                        inserted += 1;
                    }
                }
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Scores of one student at `level` across every recorded run, newest first
    pub fn student_scores(&self, student_id: &str, level: Level) -> Result<Vec<StoredScore>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, course, semester, section, outcome_id, score FROM scores
             WHERE student_id = ?1 AND level = ?2 AND is_class_average = 0
             ORDER BY run_id DESC, course, semester, section, outcome_id",
        )?;
        let rows = stmt.query_map(params![student_id, level.as_str()], |r| {
            Ok(StoredScore {
                run_id: r.get(0)?,
                key: SectionKey {
                    course: r.get(1)?,
                    semester: r.get(2)?,
                    section: r.get(3)?,
                },
                outcome: r.get(4)?,
                score: r.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

/// One persisted student score
#[derive(Debug, Clone, PartialEq)]
pub struct StoredScore {
    pub run_id: i64,
    pub key: SectionKey,
    pub outcome: String,
    pub score: f64,
}
