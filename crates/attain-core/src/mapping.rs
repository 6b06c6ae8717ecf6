//! Weighted outcome mappings (CO -> PO, PO -> IO)
//!
//! A mapping is sparse: source outcome -> {target outcome: weight}. Only
//! strictly positive weights are stored, so a weight of 0 and a blank cell
//! both mean "no contribution".
//!
//! Mapping tables shared by several courses tag course outcomes with the
//! course they belong to: `COMP-101.CO-1` or `COMP-101.F24.CO-1`. Scoping
//! keeps the rows for one course (and semester, when tagged), strips the tag
//! and drops every other course's rows before any weights are used. When
//! rows overlap, `COMP-101.F24.CO-1` beats `COMP-101.CO-1` beats `CO-1`.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::warn;

use crate::error::{AttainError, ReferenceKind, Result};
use crate::outcome::{OutcomeId, OutcomeSet};
use crate::table::RawWeights;

/// Sparse source -> {target: weight} relation with positive weights only
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeightedMapping {
    edges: BTreeMap<OutcomeId, BTreeMap<OutcomeId, f64>>,
}

impl WeightedMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one weight.
    ///
    /// Zero removes the entry; negative or non-finite weights are rejected.
    pub fn insert(&mut self, source: &str, target: &str, weight: f64) -> Result<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(AttainError::invalid_weight(source, target, weight));
        }
        if weight == 0.0 {
            if let Some(row) = self.edges.get_mut(source) {
                row.remove(target);
                if row.is_empty() {
                    self.edges.remove(source);
                }
            }
            return Ok(());
        }
        self.edges
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string(), weight);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert) for literal mappings
    pub fn with(mut self, source: &str, target: &str, weight: f64) -> Result<Self> {
        self.insert(source, target, weight)?;
        Ok(self)
    }

    pub fn weight(&self, source: &str, target: &str) -> Option<f64> {
        self.edges.get(source)?.get(target).copied()
    }

    /// Every source outcome with at least one positive weight
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Sources feeding `target`, with their weights
    pub fn contributions_to<'a>(&'a self, target: &'a str) -> impl Iterator<Item = (&'a str, f64)> {
        self.edges
            .iter()
            .filter_map(move |(source, row)| row.get(target).map(|w| (source.as_str(), *w)))
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Number of stored (source, target) weights
    pub fn len(&self) -> usize {
        self.edges.values().map(BTreeMap::len).sum()
    }
}

/// How specifically a mapping row names its source outcome.
///
/// When two rows resolve to the same source, the more specific row wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tag {
    /// `CO-1`
    Untagged,
    /// `COMP-101.CO-1`
    Course,
    /// `COMP-101.S24.CO-1`
    Term,
}

/// Which mapping rows participate for one course offering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingScope {
    course: Option<String>,
    semester: Option<String>,
    /// Declared source outcome ids, used to tell a course tag from a dotted id
    sources: BTreeSet<OutcomeId>,
}

impl MappingScope {
    /// Every row participates and ids are used verbatim
    pub fn unscoped() -> Self {
        Self::default()
    }

    /// Rows untagged or tagged with this course (and semester)
    pub fn course(course: &str, semester: &str) -> Self {
        Self {
            course: Some(course.trim().to_string()),
            semester: Some(semester.trim().to_string()),
            sources: BTreeSet::new(),
        }
    }

    /// Declare the course's own outcome ids.
    ///
    /// A declared id is always taken verbatim, so `CO-1.1` stays a sub-outcome
    /// instead of reading as course `CO-1`. Rows of other courses are only
    /// recognised (and counted out of scope) once their outcome is known.
    pub fn with_sources(mut self, sources: &OutcomeSet) -> Self {
        self.sources = sources.iter().map(str::to_string).collect();
        self
    }

    /// The outcome id a source row stands for in this scope, or `None` when
    /// the row belongs to another course.
    pub fn resolve<'a>(&self, source: &'a str) -> Option<&'a str> {
        self.resolve_tagged(source).map(|(id, _)| id)
    }

    /// Like [`resolve`](Self::resolve), also reporting how the row was tagged
    pub fn resolve_tagged<'a>(&self, source: &'a str) -> Option<(&'a str, Tag)> {
        let source = source.trim();
        let Some(course) = &self.course else {
            return Some((source, Tag::Untagged));
        };
        if self.sources.contains(source) {
            return Some((source, Tag::Untagged));
        }
        let Some((tag, rest)) = source.split_once('.') else {
            return Some((source, Tag::Untagged));
        };

        if !tag.trim().eq_ignore_ascii_case(course) {
            // Another course's outcome, or an undeclared dotted id
            return if self.names_declared(rest) {
                None
            } else {
                Some((source, Tag::Untagged))
            };
        }

        if self.sources.contains(rest) {
            return Some((rest, Tag::Course));
        }
        match rest.split_once('.') {
            Some((term, outcome))
                if self
                    .semester
                    .as_deref()
                    .is_some_and(|s| term.trim().eq_ignore_ascii_case(s)) =>
            {
                Some((outcome, Tag::Term))
            }
            Some((_, outcome)) if self.sources.contains(outcome) => None,
            _ => Some((rest, Tag::Course)),
        }
    }

    /// Whether `rest` (after a course tag) names a declared outcome,
    /// with or without a term tag in front
    fn names_declared(&self, rest: &str) -> bool {
        self.sources.contains(rest)
            || rest
                .split_once('.')
                .is_some_and(|(_, outcome)| self.sources.contains(outcome))
    }
}

/// One rejected weight cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidWeight {
    pub source: String,
    pub target: String,
    pub value: String,
}

/// Everything skipped while building a mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappingReport {
    /// Non-numeric or negative cells
    pub invalid_weights: Vec<InvalidWeight>,
    /// Target columns not among the declared target outcomes
    pub unresolved_targets: BTreeSet<OutcomeId>,
    /// Rows tagged for a different course or semester
    pub out_of_scope_rows: usize,
    /// Cells that named a (source, target) pair an earlier row already set
    pub overridden_weights: usize,
}

impl WeightedMapping {
    /// Validate raw weight cells into a mapping.
    ///
    /// Bad cells are logged, recorded in the report and skipped; they never
    /// fail the whole mapping.
    pub fn from_raw(
        raw: &RawWeights,
        targets: &OutcomeSet,
        scope: &MappingScope,
    ) -> (WeightedMapping, MappingReport) {
        let mut mapping = WeightedMapping::new();
        let mut report = MappingReport::default();

        let columns: Vec<(usize, &str)> = raw
            .targets
            .iter()
            .enumerate()
            .filter_map(|(i, t)| {
                let t = t.trim();
                if targets.contains(t) {
                    Some((i, t))
                } else {
                    if !t.is_empty() {
                        report.unresolved_targets.insert(t.to_string());
                    }
                    None
                }
            })
            .collect();

        for target in &report.unresolved_targets {
            let err = AttainError::unresolved(ReferenceKind::Target, target);
            warn!(location = %raw.location, error = %err, "skipping mapping column");
        }

        let mut set_by: BTreeMap<(&str, &str), Tag> = BTreeMap::new();
        for (source, cells) in &raw.rows {
            let Some((source, tag)) = scope.resolve_tagged(source) else {
                report.out_of_scope_rows += 1;
                continue;
            };
            for &(i, target) in &columns {
                let cell = cells.get(i).map_or("", |c| c.trim());
                if cell.is_empty() {
                    continue;
                }
                let weight = match cell.parse::<f64>() {
                    Ok(w) if w.is_finite() && w >= 0.0 => w,
                    _ => {
                        let err = AttainError::invalid_weight(source, target, cell);
                        warn!(location = %raw.location, error = %err, "skipping mapping weight");
                        report.invalid_weights.push(InvalidWeight {
                            source: source.to_string(),
                            target: target.to_string(),
                            value: cell.to_string(),
                        });
                        continue;
                    }
                };

                if let Some(&earlier) = set_by.get(&(source, target)) {
                    report.overridden_weights += 1;
                    if earlier > tag {
                        warn!(
                            location = %raw.location,
                            from = source,
                            to = target,
                            "ignoring weight, a more specifically tagged row already set it"
                        );
                        continue;
                    }
                    warn!(
                        location = %raw.location,
                        from = source,
                        to = target,
                        "mapping row overrides an earlier weight"
                    );
                }
                if let Err(err) = mapping.insert(source, target, weight) {
                    warn!(location = %raw.location, error = %err, "skipping mapping weight");
                    continue;
                }
                set_by.insert((source, target), tag);
            }
        }

        (mapping, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Level;

    fn raw(targets: &[&str], rows: Vec<(&str, Vec<&str>)>) -> RawWeights {
        RawWeights {
            location: "weights.csv".into(),
            targets: targets.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|(s, cells)| (s.to_string(), cells.into_iter().map(String::from).collect()))
                .collect(),
        }
    }

    fn po(ids: &[&str]) -> OutcomeSet {
        OutcomeSet::new(Level::Program, ids.iter().copied())
    }

    fn co(ids: &[&str]) -> OutcomeSet {
        OutcomeSet::new(Level::Course, ids.iter().copied())
    }

    #[test]
    fn test_zero_and_blank_are_not_stored() {
        let cells = raw(&["PO-1", "PO-2"], vec![("CO-1", vec!["0", "2"]), ("CO-2", vec!["", "1.5"])]);
        let (m, report) = WeightedMapping::from_raw(&cells, &po(&["PO-1", "PO-2"]), &MappingScope::unscoped());
        assert_eq!(m.weight("CO-1", "PO-1"), None);
        assert_eq!(m.weight("CO-1", "PO-2"), Some(2.0));
        assert_eq!(m.weight("CO-2", "PO-2"), Some(1.5));
        assert_eq!(m.len(), 2);
        assert_eq!(report, MappingReport::default());
    }

    #[test]
    fn test_invalid_weights_skip_only_that_cell() {
        let cells = raw(&["PO-1", "PO-2"], vec![("CO-1", vec!["high", "1"]), ("CO-2", vec!["-1", "3"])]);
        let (m, report) = WeightedMapping::from_raw(&cells, &po(&["PO-1", "PO-2"]), &MappingScope::unscoped());
        assert_eq!(m.weight("CO-1", "PO-2"), Some(1.0));
        assert_eq!(m.weight("CO-2", "PO-2"), Some(3.0));
        assert_eq!(report.invalid_weights.len(), 2);
        assert_eq!(report.invalid_weights[0].value, "high");
        assert_eq!(report.invalid_weights[1].value, "-1");
    }

    #[test]
    fn test_undeclared_target_column_is_unresolved() {
        let cells = raw(&["PO-1", "PO-9"], vec![("CO-1", vec!["1", "1"])]);
        let (m, report) = WeightedMapping::from_raw(&cells, &po(&["PO-1"]), &MappingScope::unscoped());
        assert_eq!(m.len(), 1);
        assert!(report.unresolved_targets.contains("PO-9"));
    }

    #[test]
    fn test_scope_filters_before_weights_are_used() {
        let cells = raw(
            &["PO-1"],
            vec![
                ("COMP-101.CO-1", vec!["1"]),
                ("COMP-103.CO-1", vec!["5"]),
                ("COMP-101.S24.CO-2", vec!["2"]),
                ("COMP-101.F23.CO-2", vec!["7"]),
                ("CO-3", vec!["1"]),
            ],
        );
        let scope = MappingScope::course("COMP-101", "S24").with_sources(&co(&["CO-1", "CO-2", "CO-3"]));
        let (m, report) = WeightedMapping::from_raw(&cells, &po(&["PO-1"]), &scope);
        assert_eq!(m.weight("CO-1", "PO-1"), Some(1.0));
        assert_eq!(m.weight("CO-2", "PO-1"), Some(2.0));
        assert_eq!(m.weight("CO-3", "PO-1"), Some(1.0));
        assert_eq!(report.out_of_scope_rows, 2);
    }

    #[test]
    fn test_dotted_unqualified_ids_apply_to_the_course() {
        let cells = raw(
            &["PO-1"],
            vec![("CO-1.1", vec!["1"]), ("1.2", vec!["2"]), ("COMP-101.CO-1.3", vec!["3"])],
        );
        let scope = MappingScope::course("COMP-101", "S24")
            .with_sources(&co(&["CO-1.1", "1.2", "CO-1.3"]));
        let (m, report) = WeightedMapping::from_raw(&cells, &po(&["PO-1"]), &scope);
        assert_eq!(m.weight("CO-1.1", "PO-1"), Some(1.0));
        assert_eq!(m.weight("1.2", "PO-1"), Some(2.0));
        assert_eq!(m.weight("CO-1.3", "PO-1"), Some(3.0));
        assert_eq!(report.out_of_scope_rows, 0);

        // Without declared outcomes a dotted id is still kept, never dropped
        let bare = MappingScope::course("COMP-101", "S24");
        let (m, report) = WeightedMapping::from_raw(&cells, &po(&["PO-1"]), &bare);
        assert_eq!(m.weight("CO-1.1", "PO-1"), Some(1.0));
        assert_eq!(report.out_of_scope_rows, 0);
    }

    #[test]
    fn test_more_specific_tag_wins() {
        let cells = raw(
            &["PO-1", "PO-2"],
            vec![
                ("COMP-101.CO-1", vec!["2", "4"]),
                ("CO-1", vec!["9", "0"]),
                ("COMP-101.S24.CO-1", vec!["3", ""]),
            ],
        );
        let scope = MappingScope::course("COMP-101", "S24").with_sources(&co(&["CO-1"]));
        let (m, report) = WeightedMapping::from_raw(&cells, &po(&["PO-1", "PO-2"]), &scope);
        // The untagged row neither replaces nor zeroes the course-tagged weights
        assert_eq!(m.weight("CO-1", "PO-1"), Some(3.0));
        assert_eq!(m.weight("CO-1", "PO-2"), Some(4.0));
        assert_eq!(report.overridden_weights, 3);
    }

    #[test]
    fn test_resolve_tagged() {
        let scope = MappingScope::course("comp-101", "s24").with_sources(&co(&["CO-1"]));
        assert_eq!(scope.resolve_tagged("CO-1"), Some(("CO-1", Tag::Untagged)));
        assert_eq!(scope.resolve_tagged("COMP-101.CO-1"), Some(("CO-1", Tag::Course)));
        assert_eq!(scope.resolve_tagged("COMP-101.S24.CO-1"), Some(("CO-1", Tag::Term)));
        assert_eq!(scope.resolve_tagged("COMP-101.F23.CO-1"), None);
        assert_eq!(scope.resolve_tagged("MATH-201.CO-1"), None);
        assert_eq!(MappingScope::unscoped().resolve("PO-1.a"), Some("PO-1.a"));
    }

    #[test]
    fn test_insert_rejects_negative_and_removes_zero() {
        let mut m = WeightedMapping::new().with("CO-1", "PO-1", 1.0).unwrap();
        assert!(matches!(
            m.insert("CO-1", "PO-1", -0.5),
            Err(AttainError::InvalidWeight { .. })
        ));
        m.insert("CO-1", "PO-1", 0.0).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn test_contributions_to() {
        let m = WeightedMapping::new()
            .with("CO-1", "PO-1", 1.0)
            .and_then(|m| m.with("CO-2", "PO-1", 3.0))
            .and_then(|m| m.with("CO-2", "PO-2", 1.0))
            .unwrap();
        let mut got: Vec<_> = m.contributions_to("PO-1").collect();
        got.sort_by(|a, b| a.0.cmp(b.0));
        assert_eq!(got, [("CO-1", 1.0), ("CO-2", 3.0)]);
    }
}
