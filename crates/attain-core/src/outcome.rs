//! Outcome identifiers and ordered outcome sets
//!
//! Outcomes live at one of three levels. Course outcomes are additionally
//! scoped to a course offering by the pipeline; the identifiers themselves
//! are plain strings such as `CO-1`, `PO-3` or `IO-2`.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AttainError;

/// Hierarchy level of an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Course outcome (CO)
    Course,
    /// Program outcome (PO)
    Program,
    /// Institutional outcome (IO)
    Institution,
}

impl Level {
    /// Short label used in file names and database rows
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Course => "course",
            Level::Program => "program",
            Level::Institution => "institution",
        }
    }

    /// Conventional abbreviation (CO, PO, IO)
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Level::Course => "CO",
            Level::Program => "PO",
            Level::Institution => "IO",
        }
    }

    /// Heading used in printed summaries
    pub fn title(&self) -> &'static str {
        match self {
            Level::Course => "Course Outcome",
            Level::Program => "Program Outcome",
            Level::Institution => "Institutional Outcome",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = AttainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "course" | "co" => Ok(Level::Course),
            "program" | "po" => Ok(Level::Program),
            "institution" | "io" => Ok(Level::Institution),
            other => Err(AttainError::invalid_value("outcome level", other)),
        }
    }
}

/// An outcome identifier
pub type OutcomeId = String;

/// Ordered, duplicate-free set of outcome identifiers at one level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeSet {
    level: Level,
    ids: Vec<OutcomeId>,
}

impl OutcomeSet {
    /// Build a set from identifiers, trimming each and dropping blanks and
    /// repeats while keeping first-seen order.
    pub fn new<I, S>(level: Level, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for id in ids {
            let id = id.as_ref().trim();
            if id.is_empty() {
                continue;
            }
            if seen.insert(id.to_string()) {
                ordered.push(id.to_string());
            }
        }
        Self {
            level,
            ids: ordered,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn ids(&self) -> &[OutcomeId] {
        &self.ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|o| o == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_set_dedups_and_keeps_order() {
        let set = OutcomeSet::new(Level::Course, ["CO-2", " CO-1 ", "", "CO-2", "CO-3"]);
        assert_eq!(set.ids(), ["CO-2", "CO-1", "CO-3"]);
        assert!(set.contains("CO-1"));
        assert!(!set.contains("CO-4"));
        assert_eq!(set.level(), Level::Course);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("PO".parse::<Level>().unwrap(), Level::Program);
        assert_eq!("institution".parse::<Level>().unwrap(), Level::Institution);
        assert!("department".parse::<Level>().is_err());
    }
}
