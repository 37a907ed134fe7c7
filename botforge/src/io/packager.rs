//! Bundle a project directory into a sibling `.tar.gz`.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{info, instrument};

pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Where the archive for `project_dir` goes: next to it, named after it.
pub fn archive_path_for(project_dir: &Path) -> Result<PathBuf> {
    let name = project_dir
        .file_name()
        .ok_or_else(|| anyhow!("project dir {} has no name", project_dir.display()))?;
    let parent = project_dir
        .parent()
        .ok_or_else(|| anyhow!("project dir {} has no parent", project_dir.display()))?;
    Ok(parent.join(format!("{}{ARCHIVE_SUFFIX}", name.to_string_lossy())))
}

/// Archive `project_dir` with the directory itself as the single top-level entry.
#[instrument(skip_all, fields(project_dir = %project_dir.display()))]
pub fn package_project(project_dir: &Path) -> Result<PathBuf> {
    if !project_dir.is_dir() {
        return Err(anyhow!("project dir {} does not exist", project_dir.display()));
    }
    let archive_path = archive_path_for(project_dir)?;
    let top = project_dir
        .file_name()
        .ok_or_else(|| anyhow!("project dir {} has no name", project_dir.display()))?;

    let file = File::create(&archive_path)
        .with_context(|| format!("create archive {}", archive_path.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder
        .append_dir_all(top, project_dir)
        .with_context(|| format!("add {} to archive", project_dir.display()))?;
    builder
        .into_inner()
        .context("finish tar stream")?
        .finish()
        .context("finish gzip stream")?;

    let size = fs::metadata(&archive_path)
        .with_context(|| format!("stat archive {}", archive_path.display()))?
        .len();
    info!(
        archive = %archive_path.display(),
        size_kb = %format!("{:.1}", size as f64 / 1024.0),
        "packaged project"
    );
    Ok(archive_path)
}
