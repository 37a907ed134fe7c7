//! Compile-check and test a generated project.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use crate::core::outcome::TestOutcome;
use crate::io::config::TesterConfig;
use crate::io::toolchain::Toolchain;

pub const NO_TESTS_NOTE: &str = "No test files found, skipping test run.";

static FAILED_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) failed").expect("static regex"));

/// Number of failed tests reported in runner output (last summary wins).
pub fn parse_failed_count(output: &str) -> Option<usize> {
    FAILED_COUNT_RE
        .captures_iter(output)
        .last()
        .and_then(|c| c[1].parse().ok())
}

/// Source files under `project_dir` with `extension`, in sorted order.
pub fn source_files(project_dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(project_dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", project_dir.display()))?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == extension)
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn has_test_files(test_dir: &Path, extension: &str) -> Result<bool> {
    if !test_dir.is_dir() {
        return Ok(false);
    }
    let suffix = format!(".{extension}");
    for entry in WalkDir::new(test_dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("walk {}", test_dir.display()))?;
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_file() && name.starts_with("test_") && name.ends_with(&suffix) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn display_rel(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Run both phases and fold them into one outcome.
///
/// Failing checks are recorded, not returned as errors. Only a toolchain that
/// cannot be launched, or an unreadable tree, is an error.
#[instrument(skip_all, fields(project_dir = %project_dir.display()))]
pub fn test_project(
    project_dir: &Path,
    toolchain: &dyn Toolchain,
    config: &TesterConfig,
) -> Result<TestOutcome> {
    let mut sections = Vec::new();

    let files = source_files(project_dir, &config.source_extension)?;
    let mut compile_failures = 0usize;
    for file in &files {
        let rel = display_rel(file, project_dir);
        let report = toolchain
            .compile_check(file, project_dir)
            .with_context(|| format!("compile check {rel}"))?;
        debug!(file = %rel, success = report.success, "compile check");
        if !report.success {
            compile_failures += 1;
            sections.push(format!("COMPILE FAIL {rel}: {}", report.output.trim_end()));
        }
    }
    sections.push(format!(
        "Compile check: {}/{} OK",
        files.len() - compile_failures,
        files.len()
    ));

    let test_dir = project_dir.join(&config.test_dir);
    let mut test_failures = 0usize;
    let mut tests_ok = true;
    if has_test_files(&test_dir, &config.source_extension)? {
        let report = toolchain
            .run_tests(&test_dir, project_dir)
            .context("run test suite")?;
        tests_ok = report.success;
        if !report.success {
            test_failures = parse_failed_count(&report.output).unwrap_or(1).max(1);
        }
        let verdict = if report.success { "passed" } else { "failed" };
        sections.push(format!("Test run {verdict}:\n{}", report.output.trim_end()));
    } else {
        sections.push(NO_TESTS_NOTE.to_string());
    }

    let outcome = TestOutcome {
        passed: compile_failures == 0 && tests_ok,
        total: files.len(),
        failures: compile_failures + test_failures,
        output: sections.join("\n"),
    };
    info!(
        passed = outcome.passed,
        files = outcome.total,
        failures = outcome.failures,
        "tests finished"
    );
    Ok(outcome)
}
