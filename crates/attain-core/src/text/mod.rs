//! Name canonicalisation for assignment and column headers
//!
//! Gradebook exports decorate assignment columns with system identifiers
//! (`"Midterm Exam (482913)"`), while criteria tables use the bare display
//! name. Both sides are reduced to the same canonical form before matching.

use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

/// Trailing parenthetical qualifier, e.g. `" (482913)"`
static TRAILING_QUALIFIER: OnceLock<Option<Regex>> = OnceLock::new();

fn trailing_qualifier() -> Option<&'static Regex> {
    TRAILING_QUALIFIER
        .get_or_init(|| match Regex::new(r"\s*\([^()]*\)\s*$") {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(error = %e, "Failed to compile qualifier regex");
                None
            }
        })
        .as_ref()
}

/// Canonical form of an assignment or column name.
///
/// Strips every trailing parenthetical qualifier, collapses internal runs of
/// whitespace to a single space and trims both ends.
pub fn canonical_name(name: &str) -> String {
    let mut current = name.trim().to_string();
    while let Some(re) = trailing_qualifier() {
        let stripped = re.replace(&current, "").into_owned();
        if stripped == current || stripped.trim().is_empty() {
            break;
        }
        current = stripped;
    }
    current.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a cell's text counts as "present" in a criteria table
pub fn is_marked(cell: &str) -> bool {
    let cell = cell.trim();
    !cell.is_empty()
        && !matches!(
            cell.to_ascii_lowercase().as_str(),
            "0" | "no" | "false" | "n" | "-"
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_system_ids() {
        assert_eq!(canonical_name("Midterm Exam (482913)"), "Midterm Exam");
        assert_eq!(canonical_name("  Quiz 1  (12) (Final) "), "Quiz 1");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(canonical_name("Lab   Report\t2"), "Lab Report 2");
    }

    #[test]
    fn test_keeps_inner_parentheses() {
        assert_eq!(canonical_name("Project (Phase 1) Report"), "Project (Phase 1) Report");
    }

    #[test]
    fn test_name_that_is_only_a_qualifier() {
        assert_eq!(canonical_name("(123)"), "(123)");
    }

    #[test]
    fn test_is_marked() {
        assert!(is_marked("x"));
        assert!(is_marked("1"));
        assert!(is_marked("Yes"));
        assert!(!is_marked(""));
        assert!(!is_marked(" 0 "));
        assert!(!is_marked("No"));
    }
}
