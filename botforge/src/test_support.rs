//! Test doubles and builders for pipeline tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};

use crate::core::job::JobRecord;
use crate::core::outcome::{ReviewOutcome, TestOutcome};
use crate::core::planner::Plan;
use crate::core::spec::{BotSpec, BotSpecInput, Platform};
use crate::core::stage::Stage;
use crate::io::config::{BUNDLED_TEMPLATES_DIR, FactoryConfig};
use crate::io::generator::GeneratedProject;
use crate::io::job_store::JobStore;
use crate::io::toolchain::{ProcessReport, Toolchain};
use crate::stages::{FactoryStages, Stages};

/// Template set shipped with the crate.
pub fn templates_dir() -> PathBuf {
    PathBuf::from(BUNDLED_TEMPLATES_DIR)
}

/// Valid spec with defaults for every optional field.
pub fn spec(name: &str, platform: Platform) -> BotSpec {
    BotSpec::try_from(BotSpecInput::new(name, platform, format!("{name} for tests")))
        .unwrap_or_else(|e| panic!("test spec {name:?} invalid: {e}"))
}

pub fn cli_spec(name: &str) -> BotSpec {
    spec(name, Platform::Cli)
}

/// Toolchain that answers every call with a fixed report and records targets.
pub struct ScriptedToolchain {
    compile: ProcessReport,
    tests: ProcessReport,
    calls: Mutex<Vec<String>>,
}

impl ScriptedToolchain {
    pub fn passing() -> Self {
        Self::new(ProcessReport::ok(""), ProcessReport::ok("1 passed"))
    }

    pub fn new(compile: ProcessReport, tests: ProcessReport) -> Self {
        Self {
            compile,
            tests,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `compile <file name>` and `test <dir name>` entries, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, entry: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(entry);
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Toolchain for ScriptedToolchain {
    fn compile_check(&self, file: &Path, _workdir: &Path) -> Result<ProcessReport> {
        self.record(format!("compile {}", file_name(file)));
        Ok(self.compile.clone())
    }

    fn run_tests(&self, test_dir: &Path, _workdir: &Path) -> Result<ProcessReport> {
        self.record(format!("test {}", file_name(test_dir)));
        Ok(self.tests.clone())
    }
}

/// Real stages over the bundled templates with a passing scripted toolchain.
pub fn fake_stages(output_root: &Path) -> FactoryStages {
    let config = FactoryConfig::default();
    FactoryStages::new(&templates_dir(), output_root, config.tester)
        .with_toolchain(ScriptedToolchain::passing())
}

/// Scratch directory with a config pointing into it.
pub struct TestFactory {
    pub dir: tempfile::TempDir,
    pub config: FactoryConfig,
}

impl TestFactory {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let mut config = FactoryConfig::default();
        config.paths.output_dir = dir.path().join("output");
        config.paths.db_path = dir.path().join("data").join("botforge.db");
        config.paths.templates_dir = templates_dir();
        config.ensure_dirs()?;
        Ok(Self { dir, config })
    }

    pub fn stages(&self) -> FactoryStages {
        FactoryStages::from_config(&self.config).with_toolchain(ScriptedToolchain::passing())
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.paths.output_dir
    }
}

/// Job store kept in memory.
#[derive(Default)]
pub struct MemoryJobStore {
    records: Mutex<BTreeMap<String, JobRecord>>,
}

impl MemoryJobStore {
    fn records(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, JobRecord>>> {
        self.records
            .lock()
            .map_err(|e| anyhow!("memory store lock poisoned: {e}"))
    }
}

impl JobStore for MemoryJobStore {
    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn save(&self, record: &JobRecord) -> Result<()> {
        self.records()?.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<JobRecord>> {
        Ok(self.records()?.get(id).cloned())
    }

    fn list(&self, limit: usize) -> Result<Vec<JobRecord>> {
        let mut jobs: Vec<JobRecord> = self.records()?.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        jobs.truncate(limit);
        Ok(jobs)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.records()?.remove(id).is_some())
    }
}

/// Memory store that also remembers the stage and timestamp of every save.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryJobStore,
    saves: Mutex<Vec<(Stage, DateTime<Utc>)>>,
    reject: Option<Stage>,
}

impl RecordingStore {
    /// Store that fails any save of a record at `stage`.
    pub fn rejecting(stage: Stage) -> Self {
        Self {
            reject: Some(stage),
            ..Self::default()
        }
    }

    pub fn saved_stages(&self) -> Vec<Stage> {
        self.saves()
            .into_iter()
            .map(|(stage, _)| stage)
            .collect()
    }

    pub fn saved_times(&self) -> Vec<DateTime<Utc>> {
        self.saves().into_iter().map(|(_, at)| at).collect()
    }

    fn saves(&self) -> Vec<(Stage, DateTime<Utc>)> {
        self.saves.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl JobStore for RecordingStore {
    fn init(&self) -> Result<()> {
        self.inner.init()
    }

    fn save(&self, record: &JobRecord) -> Result<()> {
        if self.reject == Some(record.stage) {
            bail!("store rejected {} record", record.stage);
        }
        if let Ok(mut saves) = self.saves.lock() {
            saves.push((record.stage, record.updated_at));
        }
        self.inner.save(record)
    }

    fn get(&self, id: &str) -> Result<Option<JobRecord>> {
        self.inner.get(id)
    }

    fn list(&self, limit: usize) -> Result<Vec<JobRecord>> {
        self.inner.list(limit)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        self.inner.delete(id)
    }
}

/// Store whose every operation fails.
pub struct FailingStore;

impl JobStore for FailingStore {
    fn init(&self) -> Result<()> {
        bail!("store unavailable")
    }

    fn save(&self, _record: &JobRecord) -> Result<()> {
        bail!("store unavailable")
    }

    fn get(&self, _id: &str) -> Result<Option<JobRecord>> {
        bail!("store unavailable")
    }

    fn list(&self, _limit: usize) -> Result<Vec<JobRecord>> {
        bail!("store unavailable")
    }

    fn delete(&self, _id: &str) -> Result<bool> {
        bail!("store unavailable")
    }
}

/// Wraps real stages and returns an error from the one matching `stage`.
pub struct FailAt<S> {
    inner: S,
    stage: Stage,
}

impl<S: Stages> FailAt<S> {
    pub fn new(inner: S, stage: Stage) -> Self {
        Self { inner, stage }
    }

    fn check(&self, current: Stage) -> Result<()> {
        if current == self.stage {
            bail!("injected fault at {current}");
        }
        Ok(())
    }
}

impl<S: Stages> Stages for FailAt<S> {
    fn plan(&self, spec: &BotSpec) -> Result<Plan> {
        self.check(Stage::Plan)?;
        self.inner.plan(spec)
    }

    fn retrieve_docs(&self, plan: Plan) -> Result<Plan> {
        self.check(Stage::RetrieveDocs)?;
        self.inner.retrieve_docs(plan)
    }

    fn generate(&self, plan: &Plan) -> Result<GeneratedProject> {
        self.check(Stage::Generate)?;
        self.inner.generate(plan)
    }

    fn test(&self, project_dir: &Path) -> Result<TestOutcome> {
        self.check(Stage::Test)?;
        self.inner.test(project_dir)
    }

    fn review(&self, project_dir: &Path) -> Result<ReviewOutcome> {
        self.check(Stage::Review)?;
        self.inner.review(project_dir)
    }

    fn package(&self, project_dir: &Path) -> Result<PathBuf> {
        self.check(Stage::Package)?;
        self.inner.package(project_dir)
    }

    fn deploy(&self, project_dir: &Path, archive: &Path) -> Result<()> {
        self.check(Stage::Deploy)?;
        self.inner.deploy(project_dir, archive)
    }
}
