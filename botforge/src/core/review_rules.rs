//! Static review rules evaluated over a scanned project inventory.

use std::collections::BTreeSet;

use crate::core::outcome::ReviewOutcome;

/// Files whose absence fails the review.
pub const REQUIRED_FILES: &[&str] = &["main.py", "README.md", "requirements.txt"];

/// Call patterns flagged in source files. Matches are warnings only.
pub const DENYLIST: &[&str] = &[
    "eval(",
    "exec(",
    "__import__(",
    "subprocess.call(",
    "os.system(",
];

/// README smaller than this many bytes gets a warning.
pub const MIN_README_BYTES: u64 = 20;

pub const README_FILE: &str = "README.md";
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// Read-only snapshot of a generated project.
#[derive(Debug, Clone, Default)]
pub struct ProjectInventory {
    /// Every file, as a `/`-separated path relative to the project root.
    pub files: BTreeSet<String>,
    /// Source files and their text, sorted by path.
    pub sources: Vec<(String, String)>,
    pub readme_bytes: Option<u64>,
    pub requirements_bytes: Option<u64>,
}

pub fn evaluate(inventory: &ProjectInventory) -> ReviewOutcome {
    let issues: Vec<String> = REQUIRED_FILES
        .iter()
        .filter(|f| !inventory.files.contains(**f))
        .map(|f| format!("Missing required file: {f}"))
        .collect();

    let mut warnings = Vec::new();
    for (path, text) in &inventory.sources {
        for pattern in DENYLIST {
            if text.contains(pattern) {
                warnings.push(format!("Potentially unsafe pattern '{pattern}' in {path}"));
            }
        }
    }
    if inventory.readme_bytes.is_some_and(|n| n < MIN_README_BYTES) {
        warnings.push(format!("{README_FILE} appears to be too short"));
    }
    if inventory.requirements_bytes == Some(0) {
        warnings.push(format!("{REQUIREMENTS_FILE} is empty"));
    }

    ReviewOutcome::from_findings(issues, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> ProjectInventory {
        ProjectInventory {
            files: REQUIRED_FILES.iter().map(|f| (*f).to_string()).collect(),
            sources: vec![("main.py".to_string(), "print('hello')\n".to_string())],
            readme_bytes: Some(200),
            requirements_bytes: Some(30),
        }
    }

    #[test]
    fn complete_project_passes_clean() {
        let outcome = evaluate(&complete());
        assert!(outcome.passed);
        assert!(outcome.issues.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn missing_required_files_are_blocking() {
        let outcome = evaluate(&ProjectInventory::default());
        assert!(!outcome.passed);
        assert_eq!(outcome.issues.len(), 3);
        assert!(outcome.issues.contains(&"Missing required file: main.py".to_string()));
    }

    #[test]
    fn denylisted_call_warns_without_failing() {
        let mut inventory = complete();
        inventory
            .sources
            .push(("bot/handler.py".to_string(), "os.system('ls')\n".to_string()));
        let outcome = evaluate(&inventory);
        assert!(outcome.passed);
        assert_eq!(
            outcome.warnings,
            vec!["Potentially unsafe pattern 'os.system(' in bot/handler.py".to_string()]
        );
    }

    #[test]
    fn undersized_docs_warn() {
        let mut inventory = complete();
        inventory.readme_bytes = Some(5);
        inventory.requirements_bytes = Some(0);
        let outcome = evaluate(&inventory);
        assert!(outcome.passed);
        assert_eq!(outcome.warnings.len(), 2);
    }
}
