//! Outcome criteria resolution
//!
//! Turns the declared outcome -> assignment criteria of a course into the
//! assignment columns that actually exist in one section's gradebook.
//!
//! Resolution order for each outcome:
//! 1. An alias keyed by the outcome id replaces all of its criteria for
//!    this section.
//! 2. Otherwise each criterion is replaced by its own alias, if any.
//! 3. Names are canonicalised and kept only when the gradebook has them.
//!
//! An outcome that resolves to nothing gets an empty list, not an error.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::outcome::{OutcomeId, OutcomeSet};
use crate::table::{AliasTable, CriteriaTable};
use crate::text::canonical_name;

/// Outcome -> canonical assignment names present in the section's grades
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CriteriaMap {
    entries: Vec<(OutcomeId, Vec<String>)>,
}

impl CriteriaMap {
    /// Build directly from resolved entries
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (OutcomeId, Vec<String>)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Assignments contributing to `outcome` (empty if none resolved)
    pub fn assignments(&self, outcome: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(id, _)| id == outcome)
            .map(|(_, names)| names.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(id, names)| (id.as_str(), names.as_slice()))
    }
}

/// What resolution could not match, for the operator
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolutionReport {
    /// Criteria whose assignment is not a gradebook column
    pub unresolved: BTreeMap<OutcomeId, Vec<String>>,
    /// Outcomes left with no contributing assignment
    pub empty_outcomes: Vec<OutcomeId>,
    /// Criteria rows naming outcomes the course does not declare
    pub undeclared: Vec<OutcomeId>,
}

impl ResolutionReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.empty_outcomes.is_empty() && self.undeclared.is_empty()
    }
}

/// Resolve declared criteria against the assignments present in a section.
pub fn resolve_criteria(
    outcomes: &OutcomeSet,
    declared: &CriteriaTable,
    aliases: &AliasTable,
    available: &BTreeSet<String>,
) -> (CriteriaMap, ResolutionReport) {
    let mut report = ResolutionReport::default();

    for (outcome, _) in declared {
        if !outcomes.contains(outcome.trim()) {
            report.undeclared.push(outcome.trim().to_string());
        }
    }

    let entries = outcomes
        .iter()
        .map(|outcome| {
            let criteria = declared_for(outcome, declared);
            let candidates: Vec<String> = match aliases.get(outcome) {
                Some(overrides) => overrides.clone(),
                None => criteria
                    .iter()
                    .flat_map(|c| aliases.get(c).cloned().unwrap_or_else(|| vec![c.clone()]))
                    .collect(),
            };

            let mut seen = HashSet::new();
            let mut resolved = Vec::new();
            for candidate in candidates {
                let name = canonical_name(&candidate);
                if !available.contains(&name) {
                    report
                        .unresolved
                        .entry(outcome.to_string())
                        .or_default()
                        .push(name);
                } else if seen.insert(name.clone()) {
                    resolved.push(name);
                }
            }

            if resolved.is_empty() {
                report.empty_outcomes.push(outcome.to_string());
            }
            (outcome.to_string(), resolved)
        })
        .collect::<Vec<_>>();

    if !report.is_clean() {
        debug!(
            unresolved = report.unresolved.values().map(Vec::len).sum::<usize>(),
            empty = report.empty_outcomes.len(),
            undeclared = report.undeclared.len(),
            "criteria_resolution_incomplete"
        );
    }

    (CriteriaMap { entries }, report)
}

/// All declared criteria for an outcome, merging repeated rows
fn declared_for(outcome: &str, declared: &CriteriaTable) -> Vec<String> {
    declared
        .iter()
        .filter(|(id, _)| id.trim() == outcome)
        .flat_map(|(_, names)| names.iter().cloned())
        .collect()
}
