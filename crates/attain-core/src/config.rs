//! Run configuration for attain
//!
//! A run is described by a TOML file (or JSON, picked by extension) listing
//! the course offerings, their sections and the shared mapping files.
//! Relative paths are resolved against the directory holding the file.

pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AttainError, Result};
use crate::{bail_usage, bail_invalid};

pub use types::{
    CourseConfig, MappingConfig, OutputConfig, RunConfig, RunOptions, SectionConfig,
    MAX_PRECISION,
};

/// Serialization of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from a file extension; anything but `.json` is TOML
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if ext == "json" {
            ConfigFormat::Json
        } else {
            ConfigFormat::Toml
        }
    }
}

/// One input file a run will read, for pre-flight checks
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct InputFile {
    /// Where the file is used, e.g. `COMP-101 S24 001 grades`
    pub role: String,
    pub path: PathBuf,
}

impl RunConfig {
    /// Load, resolve and validate a configuration file
    #[tracing::instrument(skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AttainError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)
            .map_err(|e| AttainError::io_operation("read", path.display(), e))?;

        let mut config = Self::parse(&content, ConfigFormat::from_path(path))?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;

        tracing::debug!(
            courses = config.courses.len(),
            sections = config.section_count(),
            "config_loaded"
        );
        Ok(config)
    }

    /// Parse configuration text without touching the filesystem
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };
        Ok(config)
    }

    /// Make every relative path absolute against `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        for course in &mut self.courses {
            resolve(&mut course.outcomes_file);
            if let Some(p) = course.criteria_file.as_mut() {
                resolve(p);
            }
            for section in &mut course.sections {
                resolve(&mut section.grades_file);
                if let Some(p) = section.assignments_file.as_mut() {
                    resolve(p);
                }
            }
        }

        let mappings = &mut self.mappings;
        for p in [
            mappings.program_outcomes_file.as_mut(),
            mappings.co_to_po_file.as_mut(),
            mappings.institution_outcomes_file.as_mut(),
            mappings.po_to_io_file.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            resolve(p);
        }

        resolve(&mut self.output.directory);
        if let Some(p) = self.output.database.as_mut() {
            resolve(p);
        }
    }

    /// Reject configurations no section could run with
    pub fn validate(&self) -> Result<()> {
        if self.courses.is_empty() {
            bail_usage!("configuration lists no courses");
        }
        if self.options.precision > MAX_PRECISION {
            bail_invalid!("precision", self.options.precision);
        }
        if self.options.student_id_column.trim().is_empty() {
            bail_invalid!("student_id_column", "(empty)");
        }
        for course in &self.courses {
            if course.name.trim().is_empty() || course.semester.trim().is_empty() {
                bail_usage!("every course needs a name and a semester");
            }
            if course.sections.is_empty() {
                bail_usage!(format!(
                    "course {} {} lists no sections",
                    course.name, course.semester
                ));
            }
            if course.sections.iter().any(|s| s.section.trim().is_empty()) {
                bail_usage!(format!(
                    "course {} {} has a section without a name",
                    course.name, course.semester
                ));
            }
        }
        Ok(())
    }

    pub fn section_count(&self) -> usize {
        self.courses.iter().map(|c| c.sections.len()).sum()
    }

    /// Every file the run reads, in processing order
    pub fn input_files(&self) -> Vec<InputFile> {
        let mut files = Vec::new();
        let mut push = |role: String, path: &PathBuf| {
            if !files.iter().any(|f: &InputFile| &f.path == path) {
                files.push(InputFile {
                    role,
                    path: path.clone(),
                });
            }
        };

        for course in &self.courses {
            let label = format!("{} {}", course.name, course.semester);
            push(format!("{label} outcomes"), &course.outcomes_file);
            push(format!("{label} criteria"), course.criteria_path());
            for section in &course.sections {
                push(
                    format!("{label} {} grades", section.section),
                    &section.grades_file,
                );
                if let Some(p) = &section.assignments_file {
                    push(format!("{label} {} assignments", section.section), p);
                }
            }
        }

        let m = &self.mappings;
        for (role, path) in [
            ("program outcomes", &m.program_outcomes_file),
            ("CO -> PO mapping", &m.co_to_po_file),
            ("institution outcomes", &m.institution_outcomes_file),
            ("PO -> IO mapping", &m.po_to_io_file),
        ] {
            if let Some(p) = path {
                push(role.to_string(), p);
            }
        }
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::EmptyCriteriaPolicy;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
[options]
empty_criteria = "exclude"

[[courses]]
name = "COMP-101"
semester = "S24"
outcomes_file = "comp101/outcomes.csv"

[[courses.sections]]
section = "001"
grades_file = "comp101/grades_001.csv"
assignments_file = "comp101/aliases_001.csv"

[mappings]
program_outcomes_file = "program_outcomes.csv"
co_to_po_file = "co_po.csv"

[output]
directory = "out"
"#;

    #[test]
    fn test_defaults() {
        let config = RunConfig::parse(SAMPLE, ConfigFormat::Toml).unwrap();
        assert_eq!(config.options.student_id_column, "SIS User ID");
        assert_eq!(config.options.precision, 2);
        assert_eq!(config.options.class_average_label, "Class Average");
        assert_eq!(config.options.empty_criteria, EmptyCriteriaPolicy::Exclude);
        assert!(config.output.database.is_none());
        assert!(config.mappings.program().is_some());
        assert!(config.mappings.institution().is_none());
    }

    #[test]
    fn test_criteria_defaults_to_outcomes_file() {
        let config = RunConfig::parse(SAMPLE, ConfigFormat::Toml).unwrap();
        let course = &config.courses[0];
        assert_eq!(course.criteria_path(), &course.outcomes_file);
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(
            config.courses[0].sections[0].grades_file,
            dir.path().join("comp101/grades_001.csv")
        );
        assert_eq!(config.output.directory, dir.path().join("out"));
        assert_eq!(
            config.mappings.co_to_po_file,
            Some(dir.path().join("co_po.csv"))
        );
    }

    #[test]
    fn test_load_json_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");
        let json = r#"{
            "courses": [{
                "name": "COMP-101",
                "semester": "S24",
                "outcomes_file": "o.csv",
                "sections": [{"section": "001", "grades_file": "g.csv"}]
            }]
        }"#;
        fs::write(&path, json).unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.courses[0].name, "COMP-101");
        assert_eq!(config.output.directory, dir.path().join("results"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = RunConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, AttainError::FileNotFound(_)));
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        let empty = RunConfig::parse("", ConfigFormat::Toml).unwrap();
        assert!(matches!(empty.validate(), Err(AttainError::UsageError(_))));

        let mut config = RunConfig::parse(SAMPLE, ConfigFormat::Toml).unwrap();
        config.options.precision = 9;
        assert!(matches!(
            config.validate(),
            Err(AttainError::InvalidValue { .. })
        ));

        let mut config = RunConfig::parse(SAMPLE, ConfigFormat::Toml).unwrap();
        config.courses[0].name = " ".into();
        assert_eq!(config.validate().unwrap_err().exit_code(), crate::error::ExitCode::Usage);
    }

    #[test]
    fn test_input_files_lists_each_path_once() {
        let config = RunConfig::parse(SAMPLE, ConfigFormat::Toml).unwrap();
        let files = config.input_files();
        let roles: Vec<&str> = files.iter().map(|f| f.role.as_str()).collect();
        assert_eq!(
            roles,
            [
                "COMP-101 S24 outcomes",
                "COMP-101 S24 001 grades",
                "COMP-101 S24 001 assignments",
                "program outcomes",
                "CO -> PO mapping",
            ]
        );
    }
}
