//! Weighted rollup engine
//!
//! One engine serves both CO -> PO and PO -> IO. For each subject (a student
//! row or the class-average row) and each declared target outcome:
//!
//! ```text
//! contributing = {(s, w) : w > 0 and the subject has a score for s}
//! score(T)     = sum(score(s) * w) / sum(w)      when sum(w) > 0
//! ```
//!
//! A target with no contributing source is left out of the subject's row.
//! The class-average row is rolled up from the source class averages, never
//! from the rolled-up student rows.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AttainError, ReferenceKind};
use crate::mapping::WeightedMapping;
use crate::outcome::{OutcomeId, OutcomeSet};
use crate::score::{ScoreRow, ScoreTable};
use crate::table::StudentId;

/// What the rollup skipped, for audit
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RollupAudit {
    /// Mapping sources that are not outcomes of the source table
    pub unresolved_sources: BTreeSet<OutcomeId>,
    /// Target -> number of student rows where it was undefined
    pub undefined_targets: BTreeMap<OutcomeId, usize>,
    /// Targets undefined in the class-average row
    pub undefined_class_targets: Vec<OutcomeId>,
    /// Students dropped because no target was defined for them
    pub dropped_students: Vec<StudentId>,
}

/// A rolled-up table and its audit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rollup {
    pub table: ScoreTable,
    pub audit: RollupAudit,
}

/// Precomputed target -> [(source, weight)] lists
struct Contributions<'a> {
    by_target: Vec<(&'a str, Vec<(&'a str, f64)>)>,
}

impl<'a> Contributions<'a> {
    fn new(targets: &'a OutcomeSet, mapping: &'a WeightedMapping) -> Self {
        let by_target = targets
            .iter()
            .map(|t| {
                let sources = mapping
                    .contributions_to(t)
                    .filter(|(_, w)| *w > 0.0)
                    .collect();
                (t, sources)
            })
            .collect();
        Self { by_target }
    }
}

/// Roll one subject's source scores up to the target level.
pub fn weighted_row(row: &ScoreRow, targets: &OutcomeSet, mapping: &WeightedMapping) -> ScoreRow {
    rollup_row(row, &Contributions::new(targets, mapping))
}

fn rollup_row(row: &ScoreRow, contributions: &Contributions<'_>) -> ScoreRow {
    contributions
        .by_target
        .iter()
        .filter_map(|(target, sources)| {
            let (raw, weight_sum) = sources
                .iter()
                .filter_map(|(source, w)| row.get(*source).map(|score| (score * w, *w)))
                .fold((0.0, 0.0), |(raw, sum), (sw, w)| (raw + sw, sum + w));
            (weight_sum > 0.0).then(|| (target.to_string(), raw / weight_sum))
        })
        .collect()
}

/// Roll a whole source table up to the target level.
pub fn rollup(source: &ScoreTable, targets: &OutcomeSet, mapping: &WeightedMapping) -> Rollup {
    let mut audit = RollupAudit::default();

    for s in mapping.sources() {
        if !source.outcomes().iter().any(|o| o == s) {
            audit.unresolved_sources.insert(s.to_string());
        }
    }
    if !audit.unresolved_sources.is_empty() {
        let err = AttainError::unresolved(
            ReferenceKind::Source,
            audit
                .unresolved_sources
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        );
        debug!(level = %targets.level(), error = %err, "mapping sources without scores");
    }

    let contributions = Contributions::new(targets, mapping);

    let mut students = BTreeMap::new();
    for (student, row) in source.students() {
        let rolled = rollup_row(row, &contributions);
        for target in targets.iter() {
            if !rolled.contains_key(target) {
                *audit.undefined_targets.entry(target.to_string()).or_default() += 1;
            }
        }
        if rolled.is_empty() {
            audit.dropped_students.push(student.clone());
            continue;
        }
        students.insert(student.clone(), rolled);
    }

    let class_average = rollup_row(source.class_average(), &contributions);
    audit.undefined_class_targets = targets
        .iter()
        .filter(|t| !class_average.contains_key(*t))
        .map(str::to_string)
        .collect();

    if !audit.undefined_class_targets.is_empty() {
        warn!(
            level = %targets.level(),
            targets = %audit.undefined_class_targets.join(", "),
            "targets with no contributing source"
        );
    }

    Rollup {
        table: ScoreTable::new(targets, students, class_average),
        audit,
    }
}
