//! Structured results of the non-fatal pipeline checks.

use serde::{Deserialize, Serialize};

/// How many planned files the generator rendered versus skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub rendered: usize,
    /// Planned relative paths with no matching template.
    pub skipped: Vec<String>,
}

impl GenerationReport {
    pub fn planned(&self) -> usize {
        self.rendered + self.skipped.len()
    }
}

/// Result of the compile-check and test-run phases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub passed: bool,
    /// Source files examined by the compile check.
    pub total: usize,
    pub failures: usize,
    pub output: String,
}

/// Result of the static review. `passed` holds iff `issues` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub passed: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

impl ReviewOutcome {
    pub fn from_findings(issues: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            passed: issues.is_empty(),
            issues,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_alone_do_not_fail_review() {
        let outcome = ReviewOutcome::from_findings(Vec::new(), vec!["w".to_string()]);
        assert!(outcome.passed);
        let outcome = ReviewOutcome::from_findings(vec!["i".to_string()], Vec::new());
        assert!(!outcome.passed);
    }
}
