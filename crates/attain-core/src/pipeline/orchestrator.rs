//! Per-section state machine

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, info_span, warn};

use super::report::{CompletedSection, LevelReport, RunReport, SectionOutcome, SectionResult};
use super::{SectionKey, Stage};
use crate::aggregate::aggregate_course_outcomes;
use crate::config::{CourseConfig, RunConfig, SectionConfig};
use crate::criteria::resolve_criteria;
use crate::error::{AttainError, Result};
use crate::mapping::{MappingReport, MappingScope, WeightedMapping};
use crate::outcome::{Level, OutcomeSet};
use crate::rollup::{rollup, RollupAudit};
use crate::score::ScoreTable;
use crate::sink::{remove_quietly, stage_table, ScoreDatabase, StagedTable};
use crate::table::{
    read_aliases, read_criteria, read_grades, read_outcome_definitions, read_weights, AliasTable,
    CriteriaTable,
};
use crate::trace_time;

/// A stage error, tagged with where it happened
struct StageFailure {
    stage: Stage,
    error: AttainError,
}

type StageResult<T> = std::result::Result<T, StageFailure>;

/// Run `f` as `stage`, timing it and tagging its error
fn stage<T>(stage: Stage, f: impl FnOnce() -> Result<T>) -> StageResult<T> {
    let start = Instant::now();
    let result = f().map_err(|error| StageFailure { stage, error });
    trace_time!(start, "stage_finished", stage = stage.as_str());
    result
}

/// Outcome definitions for every level this section reaches
struct Definitions {
    course: OutcomeSet,
    program: Option<OutcomeSet>,
    institution: Option<OutcomeSet>,
}

/// A validated weight mapping for one rollup
struct LevelMapping {
    mapping: WeightedMapping,
    report: MappingReport,
}

/// Criteria, aliases and weights for one section
struct Mappings {
    criteria: CriteriaTable,
    aliases: AliasTable,
    co_po: Option<LevelMapping>,
    po_io: Option<LevelMapping>,
}

/// Full-precision tables computed for one section
struct Computed {
    course: ScoreTable,
    program: Option<(ScoreTable, LevelMapping, RollupAudit)>,
    institution: Option<(ScoreTable, LevelMapping, RollupAudit)>,
}

/// Drives every configured section through the pipeline
pub struct Orchestrator<'a> {
    config: &'a RunConfig,
    config_path: Option<&'a Path>,
    persist: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        Self {
            config,
            config_path: None,
            persist: true,
        }
    }

    /// Configuration file recorded with the run in the database
    pub fn config_path(mut self, path: &'a Path) -> Self {
        self.config_path = Some(path);
        self
    }

    /// Whether the PERSIST stage writes anything
    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Process every section, skipping the ones that fail.
    ///
    /// Only a database that cannot be opened fails the whole run.
    pub fn run(&self) -> Result<RunReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        let mut database = match (&self.config.output.database, self.persist) {
            (Some(path), true) => Some(ScoreDatabase::open(path)?),
            _ => None,
        };
        let run_id = match &database {
            Some(db) => {
                let config = self
                    .config_path
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                Some(db.begin_run(started_at, &config)?)
            }
            None => None,
        };

        let mut sections = Vec::with_capacity(self.config.section_count());
        for course in &self.config.courses {
            for section in &course.sections {
                let key = SectionKey::new(&course.name, &course.semester, &section.section);
                let span = info_span!(
                    "section",
                    course = %key.course,
                    semester = %key.semester,
                    section = %key.section
                );
                let _guard = span.enter();

                let outcome = match self.run_section(&key, course, section, database.as_mut().zip(run_id)) {
                    Ok(completed) => {
                        info!(levels = completed.levels().count(), "section_completed");
                        SectionOutcome::Completed(Box::new(completed))
                    }
                    Err(StageFailure { stage, error }) => {
                        if error.is_recoverable() {
                            warn!(stage = %stage, error = %error, "section_skipped");
                        } else {
                            error!(stage = %stage, error = %error, "section_skipped");
                        }
                        SectionOutcome::Skipped {
                            stage,
                            reason: error.to_string(),
                            error_type: error.error_type().to_string(),
                        }
                    }
                };
                sections.push(SectionResult { key, outcome });
            }
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            run_id,
            sections,
        };
        if let (Some(db), Some(id)) = (&database, run_id) {
            db.finish_run(id, report.completed_count(), report.skipped_count())?;
        }
        trace_time!(
            start,
            "run_finished",
            completed = report.completed_count(),
            skipped = report.skipped_count()
        );
        Ok(report)
    }

    fn run_section(
        &self,
        key: &SectionKey,
        course: &CourseConfig,
        section: &SectionConfig,
        database: Option<(&mut ScoreDatabase, i64)>,
    ) -> StageResult<CompletedSection> {
        let options = &self.config.options;

        let definitions = stage(Stage::LoadOutcomes, || self.load_definitions(course))?;
        let mappings = stage(Stage::LoadMapping, || {
            self.load_mappings(course, section, &definitions)
        })?;
        let grades = stage(Stage::LoadGrades, || {
            read_grades(&section.grades_file, &options.student_id_column)
        })?;

        let (course_table, resolution, insufficient) = stage(Stage::AggregateCo, || {
            let (criteria, resolution) = resolve_criteria(
                &definitions.course,
                &mappings.criteria,
                &mappings.aliases,
                grades.assignments(),
            );
            if resolution.empty_outcomes.len() == definitions.course.len() {
                return Err(AttainError::empty_data(
                    "assignment criteria matching the grade columns",
                    section.grades_file.display(),
                ));
            }
            for outcome in &resolution.empty_outcomes {
                warn!(outcome = %outcome, policy = %options.empty_criteria, "outcome_without_assignments");
            }
            let agg = aggregate_course_outcomes(
                &definitions.course,
                &criteria,
                &grades,
                options.empty_criteria,
            );
            Ok((agg.table, resolution, agg.insufficient))
        })?;

        let computed = cascade(course_table, &definitions, mappings.co_po, mappings.po_io)?;

        let (files, stored_rows) = stage(Stage::Persist, || {
            self.persist_section(key, &computed, database)
        })?;

        let precision = options.precision;
        let level = |entry: Option<(ScoreTable, LevelMapping, RollupAudit)>| {
            entry.map(|(table, mapping, audit)| LevelReport {
                table: table.rounded(precision),
                mapping: Some(mapping.report),
                audit: Some(audit),
            })
        };
        Ok(CompletedSection {
            course: LevelReport {
                table: computed.course.rounded(precision),
                mapping: None,
                audit: None,
            },
            program: level(computed.program),
            institution: level(computed.institution),
            resolution,
            insufficient,
            files,
            stored_rows,
        })
    }

    fn load_definitions(&self, course: &CourseConfig) -> Result<Definitions> {
        let mappings = &self.config.mappings;
        let course_set = read_outcome_definitions(&course.outcomes_file, Level::Course)?;
        let program = match mappings.program() {
            Some((outcomes, _)) => Some(read_outcome_definitions(outcomes, Level::Program)?),
            None => None,
        };
        let institution = match (&program, mappings.institution()) {
            (Some(_), Some((outcomes, _))) => {
                Some(read_outcome_definitions(outcomes, Level::Institution)?)
            }
            _ => None,
        };
        Ok(Definitions {
            course: course_set,
            program,
            institution,
        })
    }

    fn load_mappings(
        &self,
        course: &CourseConfig,
        section: &SectionConfig,
        definitions: &Definitions,
    ) -> Result<Mappings> {
        let criteria = read_criteria(course.criteria_path())?;
        let aliases = match &section.assignments_file {
            Some(path) => read_aliases(path)?,
            None => AliasTable::new(),
        };

        let scope =
            MappingScope::course(&course.name, &course.semester).with_sources(&definitions.course);
        let co_po = match (self.config.mappings.program(), &definitions.program) {
            (Some((_, weights)), Some(targets)) => Some(load_level_mapping(weights, targets, &scope)?),
            _ => None,
        };
        // PO ids are program-wide; no course scoping
        let po_io = match (self.config.mappings.institution(), &definitions.institution) {
            (Some((_, weights)), Some(targets)) => {
                Some(load_level_mapping(weights, targets, &MappingScope::unscoped())?)
            }
            _ => None,
        };

        Ok(Mappings {
            criteria,
            aliases,
            co_po,
            po_io,
        })
    }

    fn persist_section(
        &self,
        key: &SectionKey,
        computed: &Computed,
        database: Option<(&mut ScoreDatabase, i64)>,
    ) -> Result<(Vec<PathBuf>, usize)> {
        if !self.persist {
            return Ok((Vec::new(), 0));
        }
        let options = &self.config.options;
        let tables: Vec<&ScoreTable> = std::iter::once(&computed.course)
            .chain(computed.program.as_ref().map(|(t, _, _)| t))
            .chain(computed.institution.as_ref().map(|(t, _, _)| t))
            .collect();

        // Nothing becomes visible until every table is on disk
        let mut staged = Vec::with_capacity(tables.len());
        for table in &tables {
            let written = stage_table(
                &self.config.output.directory,
                key,
                table,
                &options.class_average_label,
                options.precision,
            );
            match written {
                Ok(table) => staged.push(table),
                Err(err) => {
                    staged.into_iter().for_each(StagedTable::discard);
                    return Err(err);
                }
            }
        }

        let mut files = Vec::with_capacity(staged.len());
        let mut pending = staged.into_iter();
        while let Some(table) = pending.next() {
            match table.commit() {
                Ok(path) => files.push(path),
                Err(err) => {
                    pending.by_ref().for_each(StagedTable::discard);
                    unpublish(&files);
                    return Err(err);
                }
            }
        }

        let stored = match database {
            Some((db, run_id)) => {
                let recorded = db.record_section(
                    run_id,
                    key,
                    &tables,
                    &options.class_average_label,
                    options.precision,
                );
                match recorded {
                    Ok(rows) => rows,
                    Err(err) => {
                        unpublish(&files);
                        return Err(err);
                    }
                }
            }
            None => 0,
        };
        Ok((files, stored))
    }
}

/// Remove the tables of a section whose PERSIST stage failed
fn unpublish(files: &[PathBuf]) {
    for file in files {
        remove_quietly(file);
    }
    if !files.is_empty() {
        warn!(files = files.len(), "removed partial section output");
    }
}

/// ROLLUP_PO then ROLLUP_IO, each only when its mapping is configured
fn cascade(
    course: ScoreTable,
    definitions: &Definitions,
    co_po: Option<LevelMapping>,
    po_io: Option<LevelMapping>,
) -> StageResult<Computed> {
    let program = match (co_po, &definitions.program) {
        (Some(m), Some(targets)) => Some(stage(Stage::RollupPo, || {
            rollup_level(&course, targets, m)
        })?),
        _ => {
            debug!("no program mapping configured, stopping after course outcomes");
            None
        }
    };

    let institution = match (&program, po_io, &definitions.institution) {
        (Some((program_table, _, _)), Some(m), Some(targets)) => {
            Some(stage(Stage::RollupIo, || rollup_level(program_table, targets, m))?)
        }
        _ => None,
    };

    Ok(Computed {
        course,
        program,
        institution,
    })
}

fn load_level_mapping(
    weights: &Path,
    targets: &OutcomeSet,
    scope: &MappingScope,
) -> Result<LevelMapping> {
    let raw = read_weights(weights)?;
    let (mapping, report) = WeightedMapping::from_raw(&raw, targets, scope);
    if mapping.is_empty() {
        return Err(AttainError::empty_data(
            format!("{} weights for this course", targets.level().abbreviation()),
            weights.display(),
        ));
    }
    Ok(LevelMapping { mapping, report })
}

fn rollup_level(
    source: &ScoreTable,
    targets: &OutcomeSet,
    level: LevelMapping,
) -> Result<(ScoreTable, LevelMapping, RollupAudit)> {
    let result = rollup(source, targets, &level.mapping);
    if result.table.student_count() == 0 {
        return Err(AttainError::empty_data(
            "student scores",
            format!(
                "{} -> {} rollup",
                source.level().abbreviation(),
                targets.level().abbreviation()
            ),
        ));
    }
    if !result.audit.dropped_students.is_empty() {
        warn!(
            level = %targets.level(),
            dropped = result.audit.dropped_students.len(),
            "students_without_rolled_up_scores"
        );
    }
    Ok((result.table, level, result.audit))
}
