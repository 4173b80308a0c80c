//! Non-fatal findings collected while deriving models from a table.
//!
//! Hard failures are [`MrioError`](crate::MrioError)s. Everything else that a
//! careful analyst wants to know about a table (industries with zero output,
//! coefficient columns summing to one or more, self-supplying industries,
//! large cyclic groups) is recorded here and travels with the derived
//! matrices.
//!
//! # Example
//!
//! ```
//! use mrio_core::diagnostics::{Diagnostics, Severity};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_at("inactive", "zero total output", 17, "AT/Steel");
//! diag.add_error("unbalanced", "coefficient column sums to 1.02");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.error_count(), 1);
//! ```

use serde::Serialize;

/// Category for industries with zero total output.
pub const INACTIVE: &str = "inactive";
/// Category for coefficient columns that sum to one or more.
pub const UNBALANCED: &str = "unbalanced";
/// Category for industries buying from themselves.
pub const SELF_SUPPLY: &str = "self-supply";
/// Category for cyclic supplier structure.
pub const CYCLIC: &str = "cyclic";

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; the table is usable as-is
    Info,
    /// Unusual but the operation continued (e.g., zero-output industry)
    Warning,
    /// Likely to make results economically meaningless
    Error,
}

/// A single finding about a table
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping (see the constants in this module)
    pub category: String,
    pub message: String,
    /// Industry position the finding refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    /// Human-readable industry label (e.g., "DE/Steel")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            position: None,
            entity: None,
        }
    }

    pub fn at(mut self, position: usize, entity: impl Into<String>) -> Self {
        self.position = Some(position);
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        Ok(())
    }
}

/// Collection of diagnostic issues
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_info(&mut self, category: &str, message: &str) {
        self.add(DiagnosticIssue::new(Severity::Info, category, message));
    }

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.add(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    /// Warning tied to one industry
    pub fn add_warning_at(&mut self, category: &str, message: &str, position: usize, entity: &str) {
        self.add(DiagnosticIssue::new(Severity::Warning, category, message).at(position, entity));
    }

    pub fn add_error(&mut self, category: &str, message: &str) {
        self.add(DiagnosticIssue::new(Severity::Error, category, message));
    }

    /// Error tied to one industry
    pub fn add_error_at(&mut self, category: &str, message: &str, position: usize, entity: &str) {
        self.add(DiagnosticIssue::new(Severity::Error, category, message).at(position, entity));
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    pub fn summary(&self) -> String {
        fn plural(n: usize, word: &str) -> String {
            format!("{} {}{}", n, word, if n == 1 { "" } else { "s" })
        }

        match (self.warning_count(), self.error_count()) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => plural(w, "warning"),
            (0, e) => plural(e, "error"),
            (w, e) => format!("{}, {}", plural(w, "warning"), plural(e, "error")),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_counts() {
        let mut diag = Diagnostics::new();
        diag.add_warning(INACTIVE, "zero output");
        diag.add_error(UNBALANCED, "column sum 1.2");
        diag.add_info(CYCLIC, "one cyclic group");

        assert_eq!(diag.warning_count(), 1);
        assert_eq!(diag.error_count(), 1);
        assert!(diag.has_issues());
        assert!(diag.has_errors());
        assert_eq!(diag.issues_by_category(CYCLIC).count(), 1);
    }

    #[test]
    fn test_diagnostics_serialization() {
        let mut diag = Diagnostics::new();
        diag.add_warning_at(INACTIVE, "zero output", 4, "CN/Mining");

        let json = serde_json::to_string_pretty(&diag).unwrap();
        assert!(json.contains("\"warning\""));
        assert!(json.contains("\"position\": 4"));
        assert!(json.contains("\"entity\": \"CN/Mining\""));
    }

    #[test]
    fn test_issue_display() {
        let issue = DiagnosticIssue::new(Severity::Error, UNBALANCED, "column sum 1.05")
            .at(3, "DE/Steel");
        let display = issue.to_string();
        assert!(display.contains("error"));
        assert!(display.contains("unbalanced"));
        assert!(display.contains("DE/Steel"));
    }

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No issues");

        diag.add_warning(INACTIVE, "warning");
        assert_eq!(diag.summary(), "1 warning");

        diag.add_error(UNBALANCED, "error");
        assert_eq!(diag.summary(), "1 warning, 1 error");

        diag.add_warning(SELF_SUPPLY, "another warning");
        assert_eq!(diag.summary(), "2 warnings, 1 error");
    }
}
