//! Factory configuration stored in `botforge.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::io::process::ProcessLimits;

pub const DEFAULT_CONFIG_FILE: &str = "botforge.toml";

/// Template set shipped with the crate.
pub const BUNDLED_TEMPLATES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates");

pub const ENV_DB_PATH: &str = "BOTFORGE_DB_PATH";
pub const ENV_OUTPUT_DIR: &str = "BOTFORGE_OUTPUT_DIR";
pub const ENV_TEMPLATES_DIR: &str = "BOTFORGE_TEMPLATES_DIR";
pub const ENV_LOG_LEVEL: &str = "BOTFORGE_LOG_LEVEL";
pub const ENV_HOST: &str = "BOTFORGE_HOST";
pub const ENV_PORT: &str = "BOTFORGE_PORT";

/// Factory configuration (TOML). Every section falls back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FactoryConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_level: String,
    pub paths: PathsConfig,
    pub tester: TesterConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub db_path: PathBuf,
    /// Generated projects land in `{output_dir}/{bot name}`.
    pub output_dir: PathBuf,
    pub templates_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TesterConfig {
    /// Program and leading args; the file path is appended.
    pub compile_command: Vec<String>,
    /// Program and leading args; the test directory is appended, then `test_args`.
    pub test_command: Vec<String>,
    pub test_args: Vec<String>,
    /// Extension (without the dot) of files to compile-check.
    pub source_extension: String,
    pub test_dir: String,
    pub timeout_secs: u64,
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            paths: PathsConfig::default(),
            tester: TesterConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/botforge.db"),
            output_dir: PathBuf::from("./output"),
            templates_dir: PathBuf::from(BUNDLED_TEMPLATES_DIR),
        }
    }
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            compile_command: strings(&["python3", "-m", "py_compile"]),
            test_command: strings(&["python3", "-m", "pytest"]),
            test_args: strings(&["-v", "--tb=short"]),
            source_extension: "py".to_string(),
            test_dir: "tests".to_string(),
            timeout_secs: 300,
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl TesterConfig {
    pub fn limits(&self) -> ProcessLimits {
        ProcessLimits {
            timeout: Duration::from_secs(self.timeout_secs),
            output_limit_bytes: self.output_limit_bytes,
        }
    }
}

impl FactoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            return Err(anyhow!("log_level must not be empty"));
        }
        if self.paths.db_path.as_os_str().is_empty() {
            return Err(anyhow!("paths.db_path must not be empty"));
        }
        if self.paths.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("paths.output_dir must not be empty"));
        }
        if self.paths.templates_dir.as_os_str().is_empty() {
            return Err(anyhow!("paths.templates_dir must not be empty"));
        }
        let t = &self.tester;
        if t.compile_command.first().is_none_or(|p| p.trim().is_empty()) {
            return Err(anyhow!("tester.compile_command must be a non-empty array"));
        }
        if t.test_command.first().is_none_or(|p| p.trim().is_empty()) {
            return Err(anyhow!("tester.test_command must be a non-empty array"));
        }
        if t.source_extension.trim().is_empty() || t.source_extension.starts_with('.') {
            return Err(anyhow!(
                "tester.source_extension must be a bare extension like \"py\""
            ));
        }
        if t.test_dir.trim().is_empty() {
            return Err(anyhow!("tester.test_dir must not be empty"));
        }
        if t.timeout_secs == 0 {
            return Err(anyhow!("tester.timeout_secs must be > 0"));
        }
        if t.output_limit_bytes == 0 {
            return Err(anyhow!("tester.output_limit_bytes must be > 0"));
        }
        if self.server.host.trim().is_empty() {
            return Err(anyhow!("server.host must not be empty"));
        }
        Ok(())
    }

    /// Apply `BOTFORGE_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; unset or blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get(ENV_DB_PATH) {
            self.paths.db_path = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_OUTPUT_DIR) {
            self.paths.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_TEMPLATES_DIR) {
            self.paths.templates_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_LOG_LEVEL) {
            self.log_level = v.trim().to_lowercase();
        }
        if let Some(v) = get(ENV_HOST) {
            self.server.host = v;
        }
        if let Some(v) = get(ENV_PORT) {
            self.server.port = v
                .trim()
                .parse()
                .with_context(|| format!("parse {ENV_PORT}={v}"))?;
        }
        Ok(())
    }

    /// Create the output directory and the database's parent directory.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.paths.output_dir).with_context(|| {
            format!("create output dir {}", self.paths.output_dir.display())
        })?;
        if let Some(parent) = self
            .paths
            .db_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create db dir {}", parent.display()))?;
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FactoryConfig::default()`.
pub fn load_config(path: &Path) -> Result<FactoryConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config file missing, using defaults");
        let cfg = FactoryConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FactoryConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// [`load_config`] followed by environment overrides and a second validation.
pub fn load_effective_config(path: &Path) -> Result<FactoryConfig> {
    let mut cfg = load_config(path)?;
    cfg.apply_env_overrides()?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &FactoryConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
