//! The collaborating components the pipeline drives, behind one seam.
//!
//! [`Stages`] is the pipeline's only view of planning, generation, testing,
//! review, and packaging. [`FactoryStages`] wires the real adapters; tests
//! substitute doubles or wrap it to inject faults.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use tracing::{debug, info};

use crate::core::outcome::{ReviewOutcome, TestOutcome};
use crate::core::planner::{Plan, build_plan};
use crate::core::retriever::{ContextSource, StaticGuides, retrieve_context};
use crate::core::spec::BotSpec;
use crate::io::config::{FactoryConfig, TesterConfig};
use crate::io::generator::{GeneratedProject, generate_project};
use crate::io::packager::package_project;
use crate::io::reviewer::review_project;
use crate::io::templates::FsTemplateSource;
use crate::io::tester::test_project;
use crate::io::toolchain::{CommandToolchain, Toolchain};

/// One method per pipeline stage, called in order by the pipeline.
///
/// An `Err` from any method is an unexpected fault and fails the job. Expected
/// outcomes (skipped templates, failing tests, review issues) come back as data.
pub trait Stages: Send + Sync {
    fn plan(&self, spec: &BotSpec) -> Result<Plan>;
    fn retrieve_docs(&self, plan: Plan) -> Result<Plan>;
    fn generate(&self, plan: &Plan) -> Result<GeneratedProject>;
    fn test(&self, project_dir: &Path) -> Result<TestOutcome>;
    fn review(&self, project_dir: &Path) -> Result<ReviewOutcome>;
    /// Returns the archive path.
    fn package(&self, project_dir: &Path) -> Result<PathBuf>;
    fn deploy(&self, project_dir: &Path, archive: &Path) -> Result<()>;
}

/// Production stages: filesystem templates, external toolchain, tar.gz output.
pub struct FactoryStages {
    templates: FsTemplateSource,
    output_dir: PathBuf,
    tester: TesterConfig,
    toolchain: Box<dyn Toolchain>,
    context: Box<dyn ContextSource>,
}

impl FactoryStages {
    pub fn new(templates_dir: &Path, output_dir: &Path, tester: TesterConfig) -> Self {
        let toolchain = CommandToolchain::from_config(&tester);
        Self {
            templates: FsTemplateSource::new(templates_dir),
            output_dir: output_dir.to_path_buf(),
            tester,
            toolchain: Box::new(toolchain),
            context: Box::new(StaticGuides),
        }
    }

    pub fn from_config(config: &FactoryConfig) -> Self {
        Self::new(
            &config.paths.templates_dir,
            &config.paths.output_dir,
            config.tester.clone(),
        )
    }

    pub fn with_toolchain(mut self, toolchain: impl Toolchain + 'static) -> Self {
        self.toolchain = Box::new(toolchain);
        self
    }

    pub fn with_context_source(mut self, source: impl ContextSource + 'static) -> Self {
        self.context = Box::new(source);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl Stages for FactoryStages {
    fn plan(&self, spec: &BotSpec) -> Result<Plan> {
        Ok(build_plan(spec))
    }

    fn retrieve_docs(&self, plan: Plan) -> Result<Plan> {
        Ok(retrieve_context(plan, self.context.as_ref()))
    }

    fn generate(&self, plan: &Plan) -> Result<GeneratedProject> {
        generate_project(plan, &self.templates, &self.output_dir)
    }

    fn test(&self, project_dir: &Path) -> Result<TestOutcome> {
        test_project(project_dir, self.toolchain.as_ref(), &self.tester)
    }

    fn review(&self, project_dir: &Path) -> Result<ReviewOutcome> {
        review_project(project_dir, &self.tester.source_extension)
    }

    fn package(&self, project_dir: &Path) -> Result<PathBuf> {
        package_project(project_dir)
    }

    /// Artifacts are delivered on the local filesystem; deploying confirms
    /// both are in place.
    fn deploy(&self, project_dir: &Path, archive: &Path) -> Result<()> {
        if !project_dir.is_dir() {
            return Err(anyhow!(
                "project dir {} missing at deploy",
                project_dir.display()
            ));
        }
        if !archive.is_file() {
            return Err(anyhow!("archive {} missing at deploy", archive.display()));
        }
        debug!(archive = %archive.display(), "deploy checks passed");
        info!(project_dir = %project_dir.display(), archive = %archive.display(), "deployed to filesystem");
        Ok(())
    }
}
