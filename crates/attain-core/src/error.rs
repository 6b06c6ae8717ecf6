//! Error types and exit codes for attain
//!
//! Exit codes:
//! - 0: Success (including runs where only some sections were skipped)
//! - 1: Generic failure
//! - 2: Usage error (bad flags/args, invalid configuration)
//! - 3: Data error (missing or empty input, every section skipped)

mod macros;

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the attain binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage error - bad flags/args (2)
    Usage = 2,
    /// Data error - missing or empty input (3)
    Data = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Which side of a mapping an unresolved identifier was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Source outcome missing from the source score table
    Source,
    /// Target outcome missing from the target definitions
    Target,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Source => write!(f, "source outcome"),
            ReferenceKind::Target => write!(f, "target outcome"),
        }
    }
}

impl From<rusqlite::Error> for AttainError {
    fn from(err: rusqlite::Error) -> Self {
        AttainError::Sqlite(err.to_string())
    }
}

/// Errors that can occur during attain operations
#[derive(Error, Debug)]
pub enum AttainError {
    // Usage errors (exit code 2)
    #[error("unknown format: {0} (expected: human or json)")]
    UnknownFormat(String),

    #[error("{0}")]
    UsageError(String),

    #[error("invalid {context}: {value}")]
    InvalidValue { context: String, value: String },

    // Data errors (exit code 3)
    #[error("missing {what} in {location}")]
    MissingInput { what: String, location: String },

    #[error("no usable {what} in {location}")]
    EmptyData { what: String, location: String },

    #[error("invalid weight {value:?} for {from} -> {to}")]
    InvalidWeight {
        from: String,
        to: String,
        value: String,
    },

    #[error("unresolved {kind}: {id}")]
    UnresolvedReference { kind: ReferenceKind, id: String },

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    // Generic failures (exit code 1)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("database error: {0}")]
    Sqlite(String),

    #[error("failed to {operation} {target}: {reason}")]
    FailedOperationWithTarget {
        operation: String,
        target: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl AttainError {
    /// Create an error for a required file or column that is absent
    pub fn missing_input(what: impl fmt::Display, location: impl fmt::Display) -> Self {
        AttainError::MissingInput {
            what: what.to_string(),
            location: location.to_string(),
        }
    }

    /// Create an error for input that parsed but produced no usable rows
    pub fn empty_data(what: impl fmt::Display, location: impl fmt::Display) -> Self {
        AttainError::EmptyData {
            what: what.to_string(),
            location: location.to_string(),
        }
    }

    /// Create an error for a weight cell that is non-numeric or negative
    pub fn invalid_weight(from: &str, to: &str, value: impl fmt::Display) -> Self {
        AttainError::InvalidWeight {
            from: from.to_string(),
            to: to.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for a mapping entry naming an unknown outcome
    pub fn unresolved(kind: ReferenceKind, id: impl fmt::Display) -> Self {
        AttainError::UnresolvedReference {
            kind,
            id: id.to_string(),
        }
    }

    /// Create an error for an invalid value or configuration
    pub fn invalid_value(context: &str, value: impl fmt::Display) -> Self {
        AttainError::InvalidValue {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for a failed IO operation with context
    pub fn io_operation(
        operation: &str,
        path: impl fmt::Display,
        error: impl fmt::Display,
    ) -> Self {
        AttainError::FailedOperationWithTarget {
            operation: operation.to_string(),
            target: path.to_string(),
            reason: error.to_string(),
        }
    }

    /// Whether the orchestrator may recover from this error by skipping a unit
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AttainError::MissingInput { .. }
                | AttainError::EmptyData { .. }
                | AttainError::FileNotFound(_)
                | AttainError::Csv(_)
                | AttainError::Io(_)
                | AttainError::InvalidWeight { .. }
                | AttainError::UnresolvedReference { .. }
        )
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            AttainError::UnknownFormat(_)
            | AttainError::UsageError(_)
            | AttainError::InvalidValue { .. } => ExitCode::Usage,

            AttainError::MissingInput { .. }
            | AttainError::EmptyData { .. }
            | AttainError::InvalidWeight { .. }
            | AttainError::UnresolvedReference { .. }
            | AttainError::FileNotFound(_) => ExitCode::Data,

            AttainError::Io(_)
            | AttainError::Csv(_)
            | AttainError::Json(_)
            | AttainError::Toml(_)
            | AttainError::Sqlite(_)
            | AttainError::FailedOperationWithTarget { .. }
            | AttainError::Other(_) => ExitCode::Failure,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            AttainError::UnknownFormat(_) => "unknown_format",
            AttainError::UsageError(_) => "usage_error",
            AttainError::InvalidValue { .. } => "invalid_value",
            AttainError::MissingInput { .. } => "missing_input",
            AttainError::EmptyData { .. } => "empty_data",
            AttainError::InvalidWeight { .. } => "invalid_weight",
            AttainError::UnresolvedReference { .. } => "unresolved_reference",
            AttainError::FileNotFound(_) => "file_not_found",
            AttainError::Io(_) => "io_error",
            AttainError::Csv(_) => "csv_error",
            AttainError::Json(_) => "json_error",
            AttainError::Toml(_) => "toml_error",
            AttainError::Sqlite(_) => "database_error",
            AttainError::FailedOperationWithTarget { .. } => "failed_operation_with_target",
            AttainError::Other(_) => "other",
        }
    }

    /// Convert error to JSON representation for structured error output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.exit_code() as i32,
                "type": self.error_type(),
                "message": self.to_string(),
            }
        })
    }
}

/// Result type alias for attain operations
pub type Result<T> = std::result::Result<T, AttainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_errors_exit_3() {
        let err = AttainError::missing_input("column 'SIS User ID'", "grades.csv");
        assert_eq!(err.exit_code(), ExitCode::Data);
        assert!(err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "missing column 'SIS User ID' in grades.csv"
        );
    }

    #[test]
    fn test_usage_errors_are_not_recoverable() {
        let err = AttainError::invalid_value("precision", 12);
        assert_eq!(err.exit_code(), ExitCode::Usage);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_json_envelope() {
        let err = AttainError::empty_data("outcomes", "COMP-101.csv");
        let json = err.to_json();
        assert_eq!(json["error"]["code"], 3);
        assert_eq!(json["error"]["type"], "empty_data");
        assert_eq!(json["error"]["message"], "no usable outcomes in COMP-101.csv");
    }

    #[test]
    fn test_invalid_weight_message() {
        let err = AttainError::invalid_weight("CO-1", "PO-2", "-0.5");
        assert_eq!(err.to_string(), "invalid weight \"-0.5\" for CO-1 -> PO-2");
    }
}
