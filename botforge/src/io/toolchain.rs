//! External compile and test commands.

use std::path::Path;
use std::process::Command;

use anyhow::{Result, anyhow};
use tracing::debug;

use crate::io::config::TesterConfig;
use crate::io::process::{ProcessLimits, run_command_with_timeout};

/// Result of one toolchain invocation. A non-zero exit is `success = false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    pub success: bool,
    /// Stdout and stderr combined.
    pub output: String,
}

impl ProcessReport {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Compile and test commands for generated projects.
///
/// Returning `Err` means the tool could not be run at all.
pub trait Toolchain: Send + Sync {
    fn compile_check(&self, file: &Path, workdir: &Path) -> Result<ProcessReport>;
    fn run_tests(&self, test_dir: &Path, workdir: &Path) -> Result<ProcessReport>;
}

/// Runs the commands named in [`TesterConfig`].
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    compile_command: Vec<String>,
    test_command: Vec<String>,
    test_args: Vec<String>,
    limits: ProcessLimits,
}

impl CommandToolchain {
    pub fn from_config(config: &TesterConfig) -> Self {
        Self {
            compile_command: config.compile_command.clone(),
            test_command: config.test_command.clone(),
            test_args: config.test_args.clone(),
            limits: config.limits(),
        }
    }

    fn run(&self, argv: &[String], target: &Path, extra: &[String], workdir: &Path) -> Result<ProcessReport> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("toolchain command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args).arg(target).args(extra).current_dir(workdir);
        debug!(program = %program, target = %target.display(), "running toolchain command");
        let out = run_command_with_timeout(cmd, self.limits)?;
        Ok(ProcessReport {
            success: out.succeeded(),
            output: out.combined_text(),
        })
    }
}

impl Toolchain for CommandToolchain {
    fn compile_check(&self, file: &Path, workdir: &Path) -> Result<ProcessReport> {
        self.run(&self.compile_command, file, &[], workdir)
    }

    fn run_tests(&self, test_dir: &Path, workdir: &Path) -> Result<ProcessReport> {
        self.run(&self.test_command, test_dir, &self.test_args, workdir)
    }
}
