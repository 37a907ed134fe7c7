//! Filesystem-backed template store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::core::resolve::TemplateLookup;

/// Subdirectory of the template root searched after the root itself.
pub const COMMON_DIR: &str = "common";

/// Template names are `/`-separated and resolved against each root in order.
#[derive(Debug, Clone)]
pub struct FsTemplateSource {
    roots: Vec<PathBuf>,
}

impl FsTemplateSource {
    /// Search `root`, then `root/common`.
    pub fn new(root: &Path) -> Self {
        Self {
            roots: vec![root.to_path_buf(), root.join(COMMON_DIR)],
        }
    }

    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// First existing file for `name` across the roots.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        if !is_safe_name(name) {
            return None;
        }
        self.roots
            .iter()
            .map(|root| root.join(name))
            .find(|path| path.is_file())
    }

    pub fn load(&self, name: &str) -> Result<String> {
        let path = self
            .locate(name)
            .ok_or_else(|| anyhow!("template {name} not found"))?;
        fs::read_to_string(&path).with_context(|| format!("read template {}", path.display()))
    }
}

impl TemplateLookup for FsTemplateSource {
    fn exists(&self, name: &str) -> bool {
        self.locate(name).is_some()
    }
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('/')
        && name.split('/').all(|part| !part.is_empty() && part != "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, contents).expect("write");
    }

    #[test]
    fn root_is_searched_before_common() {
        let temp = tempfile::tempdir().expect("tempdir");
        write(temp.path(), "README.md.j2", "root");
        write(temp.path(), "common/README.md.j2", "common");
        write(temp.path(), "common/main.py.j2", "common main");

        let source = FsTemplateSource::new(temp.path());
        assert_eq!(
            source.roots(),
            [temp.path().to_path_buf(), temp.path().join(COMMON_DIR)]
        );
        assert_eq!(source.load("README.md.j2").expect("load"), "root");
        assert_eq!(source.load("main.py.j2").expect("load"), "common main");
        assert!(!source.exists("config.py.j2"));
        assert!(source.load("config.py.j2").is_err());
    }

    #[test]
    fn escaping_names_never_resolve() {
        let temp = tempfile::tempdir().expect("tempdir");
        write(temp.path(), "inner/x.j2", "x");
        let source = FsTemplateSource::with_roots(vec![temp.path().join("inner")]);
        assert!(source.exists("x.j2"));
        assert!(!source.exists("../inner/x.j2"));
        assert!(!source.exists("/etc/passwd"));
    }

    #[test]
    fn directories_are_not_templates() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("telegram")).expect("mkdir");
        let source = FsTemplateSource::new(temp.path());
        assert!(!source.exists("telegram"));
    }
}
