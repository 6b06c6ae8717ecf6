//! Result sinks for the PERSIST stage
//!
//! Score tables are written as CSV files, one per section and level, and
//! optionally recorded in a SQLite database alongside earlier runs.

pub mod csv;
pub mod sqlite;

pub use self::csv::{
    remove_quietly, section_prefix, stage_table, table_file_name, StagedTable, STUDENT_ID_HEADER,
};
pub use self::sqlite::{ScoreDatabase, StoredScore, SCHEMA_VERSION};
