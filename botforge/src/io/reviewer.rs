//! Read-only scan of a generated project for the static review.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

use crate::core::outcome::ReviewOutcome;
use crate::core::review_rules::{ProjectInventory, README_FILE, REQUIREMENTS_FILE, evaluate};

/// Collect the inventory the review rules run over. Never writes.
pub fn scan_project(project_dir: &Path, source_extension: &str) -> Result<ProjectInventory> {
    let mut inventory = ProjectInventory::default();
    for entry in WalkDir::new(project_dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", project_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(project_dir)
            .with_context(|| format!("relativize {}", entry.path().display()))?
            .to_string_lossy()
            .replace('\\', "/");
        if entry.path().extension().is_some_and(|ext| ext == source_extension) {
            let bytes =
                fs::read(entry.path()).with_context(|| format!("read {}", entry.path().display()))?;
            inventory
                .sources
                .push((rel.clone(), String::from_utf8_lossy(&bytes).into_owned()));
        }
        inventory.files.insert(rel);
    }

    inventory.readme_bytes = file_len(&project_dir.join(README_FILE))?;
    inventory.requirements_bytes = file_len(&project_dir.join(REQUIREMENTS_FILE))?;
    Ok(inventory)
}

fn file_len(path: &Path) -> Result<Option<u64>> {
    if !path.is_file() {
        return Ok(None);
    }
    let meta = fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    Ok(Some(meta.len()))
}

#[instrument(skip_all, fields(project_dir = %project_dir.display()))]
pub fn review_project(project_dir: &Path, source_extension: &str) -> Result<ReviewOutcome> {
    let inventory = scan_project(project_dir, source_extension)?;
    let outcome = evaluate(&inventory);
    if !outcome.warnings.is_empty() {
        warn!(warnings = outcome.warnings.len(), "review produced warnings");
    }
    info!(
        passed = outcome.passed,
        issues = outcome.issues.len(),
        warnings = outcome.warnings.len(),
        "review finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
        let temp = tempfile::tempdir().expect("tempdir");
        for (rel, body) in files {
            let path = temp.path().join(rel);
            fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            fs::write(path, body).expect("write");
        }
        temp
    }

    fn snapshot(dir: &Path) -> Vec<(String, Vec<u8>)> {
        WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .map(|e| e.expect("entry"))
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                (
                    e.path().display().to_string(),
                    fs::read(e.path()).expect("read"),
                )
            })
            .collect()
    }

    #[test]
    fn empty_project_fails_with_three_issues() {
        let dir = project(&[]);
        let outcome = review_project(dir.path(), "py").expect("review");
        assert!(!outcome.passed);
        assert!(outcome.issues.len() >= 3);
    }

    #[test]
    fn denylisted_pattern_warns_and_names_file() {
        let dir = project(&[
            ("main.py", "import os\nos.system('echo hi')\n"),
            ("README.md", "# A bot\n\nLong enough readme text.\n"),
            ("requirements.txt", "click>=8.1.7\n"),
        ]);
        let outcome = review_project(dir.path(), "py").expect("review");
        assert!(outcome.passed);
        assert!(
            outcome
                .warnings
                .iter()
                .any(|w| w.contains("os.system(") && w.contains("main.py"))
        );
    }

    #[test]
    fn nested_sources_are_scanned() {
        let dir = project(&[("bot/handler.py", "eval(text)\n")]);
        let inventory = scan_project(dir.path(), "py").expect("scan");
        assert_eq!(inventory.sources[0].0, "bot/handler.py");
        assert!(inventory.files.contains("bot/handler.py"));
    }

    #[test]
    fn review_does_not_touch_the_tree() {
        let dir = project(&[
            ("main.py", "exec('x')\n"),
            ("README.md", "tiny"),
            ("requirements.txt", ""),
        ]);
        let before = snapshot(dir.path());
        let outcome = review_project(dir.path(), "py").expect("review");
        assert_eq!(outcome.warnings.len(), 3);
        assert_eq!(snapshot(dir.path()), before);
    }
}
