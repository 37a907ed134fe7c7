//! `botforge` command-line front end.
//!
//! Submits bot specs to the factory pipeline and inspects stored jobs.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use botforge::core::job::JobRecord;
use botforge::core::spec::{BotSpec, Platform};
use botforge::core::stage::Stage;
use botforge::exit_codes;
use botforge::io::config::{DEFAULT_CONFIG_FILE, FactoryConfig, load_effective_config};
use botforge::io::job_store::{JobStore, SqliteJobStore};
use botforge::io::spec_file::load_spec_file;
use botforge::logging;
use botforge::pipeline::run_pipeline;
use botforge::stages::FactoryStages;

#[derive(Parser)]
#[command(
    name = "botforge",
    version,
    about = "Generate, test, review, and package bots from a JSON spec"
)]
struct Cli {
    /// Path to the factory config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log at debug level unless `RUST_LOG` is set.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline for a spec file.
    Forge {
        /// JSON spec describing the bot.
        spec: PathBuf,
    },
    /// List recent jobs, newest first.
    Jobs {
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
    /// Show one job in full.
    Status { id: String },
    /// Remove a job record. Generated files are kept.
    Delete { id: String },
    /// List supported platforms.
    Platforms,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    if let Command::Platforms = cli.command {
        print!("{}", render_platforms());
        return Ok(exit_codes::OK);
    }

    let cfg = load_effective_config(&cli.config)
        .with_context(|| format!("load config {}", cli.config.display()))?;
    logging::init(if cli.verbose { "debug" } else { &cfg.log_level });

    match cli.command {
        Command::Forge { spec } => cmd_forge(&cfg, &spec),
        Command::Jobs { limit } => cmd_jobs(&cfg, limit),
        Command::Status { id } => cmd_status(&cfg, &id),
        Command::Delete { id } => cmd_delete(&cfg, &id),
        Command::Platforms => Ok(exit_codes::OK),
    }
}

fn open_store(cfg: &FactoryConfig) -> Result<SqliteJobStore> {
    SqliteJobStore::open(&cfg.paths.db_path)
}

fn cmd_forge(cfg: &FactoryConfig, spec_path: &Path) -> Result<i32> {
    let spec = match load_spec_file(spec_path) {
        Ok(spec) => spec,
        Err(err) => {
            eprintln!("invalid spec: {err}");
            return Ok(exit_codes::INVALID);
        }
    };
    cfg.ensure_dirs()?;
    print!("{}", render_spec_summary(&spec));

    let store = open_store(cfg)?;
    let stages = FactoryStages::from_config(cfg);
    let job = run_pipeline(spec, &store, &stages);

    print!("{}", render_forge_result(&job));
    Ok(if job.stage == Stage::Done {
        exit_codes::OK
    } else {
        exit_codes::FAILED
    })
}

fn cmd_jobs(cfg: &FactoryConfig, limit: usize) -> Result<i32> {
    let store = open_store(cfg)?;
    let jobs = store.list(limit)?;
    if jobs.is_empty() {
        println!("No jobs found.");
    } else {
        print!("{}", render_job_table(&jobs));
    }
    Ok(exit_codes::OK)
}

fn cmd_status(cfg: &FactoryConfig, id: &str) -> Result<i32> {
    let store = open_store(cfg)?;
    match store.get(id)? {
        Some(job) => {
            print!("{}", render_job_detail(&job));
            Ok(exit_codes::OK)
        }
        None => {
            eprintln!("job {id} not found");
            Ok(exit_codes::NOT_FOUND)
        }
    }
}

fn cmd_delete(cfg: &FactoryConfig, id: &str) -> Result<i32> {
    let store = open_store(cfg)?;
    if store.delete(id)? {
        println!("Deleted job {id}");
        Ok(exit_codes::OK)
    } else {
        eprintln!("job {id} not found");
        Ok(exit_codes::NOT_FOUND)
    }
}

fn render_platforms() -> String {
    let mut out = String::new();
    for platform in Platform::ALL {
        let _ = writeln!(out, "{:<10} {}", platform.as_str(), platform.summary());
    }
    out
}

fn render_spec_summary(spec: &BotSpec) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Bot:       {}", spec.name);
    let _ = writeln!(out, "Platform:  {}", spec.platform);
    let _ = writeln!(out, "Features:  {}", spec.features.join(", "));
    let env: Vec<&str> = spec.env_vars.iter().map(|v| v.name.as_str()).collect();
    if !env.is_empty() {
        let _ = writeln!(out, "Env vars:  {}", env.join(", "));
    }
    out
}

fn pass_fail(passed: bool) -> &'static str {
    if passed { "PASSED" } else { "FAILED" }
}

fn render_forge_result(job: &JobRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Job:       {}", job.id);
    if job.stage != Stage::Done {
        let _ = writeln!(out, "Stage:     {}", job.stage);
        let _ = writeln!(out, "Error:     {}", job.error.as_deref().unwrap_or("unknown"));
        return out;
    }
    if let Some(path) = &job.output_path {
        let _ = writeln!(out, "Output:    {}", path.display());
    }
    if let Some(path) = &job.archive_path {
        let _ = writeln!(out, "Archive:   {}", path.display());
    }
    if let Some(test) = &job.test_result {
        let _ = writeln!(
            out,
            "Tests:     {} ({} files, {} failures)",
            pass_fail(test.passed),
            test.total,
            test.failures
        );
    }
    if let Some(review) = &job.review_report {
        let _ = writeln!(out, "Review:    {}", pass_fail(review.passed));
        for issue in &review.issues {
            let _ = writeln!(out, "  issue:   {issue}");
        }
        for warning in &review.warnings {
            let _ = writeln!(out, "  warning: {warning}");
        }
    }
    out
}

fn render_job_table(jobs: &[JobRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12}  {:<24}  {:<9}  {:<13}  CREATED",
        "ID", "NAME", "PLATFORM", "STAGE"
    );
    for job in jobs {
        let _ = writeln!(
            out,
            "{:<12}  {:<24}  {:<9}  {:<13}  {}",
            job.id,
            job.spec.name,
            job.spec.platform.as_str(),
            job.stage.as_str(),
            job.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    out
}

fn render_job_detail(job: &JobRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Job:       {}", job.id);
    let _ = writeln!(out, "Bot:       {}", job.spec.name);
    let _ = writeln!(out, "Platform:  {}", job.spec.platform);
    let _ = writeln!(out, "Stage:     {}", job.stage);
    let _ = writeln!(out, "Created:   {}", job.created_at.to_rfc3339());
    let _ = writeln!(out, "Updated:   {}", job.updated_at.to_rfc3339());
    if let Some(path) = &job.output_path {
        let _ = writeln!(out, "Output:    {}", path.display());
    }
    if let Some(path) = &job.archive_path {
        let _ = writeln!(out, "Archive:   {}", path.display());
    }
    if let Some(error) = &job.error {
        let _ = writeln!(out, "Error:     {error}");
    }
    if let Some(generation) = &job.generation {
        let _ = writeln!(
            out,
            "Generated: {}/{} files",
            generation.rendered,
            generation.planned()
        );
    }
    if let Some(test) = &job.test_result {
        let _ = writeln!(
            out,
            "Tests:     {} ({} files, {} failures)",
            pass_fail(test.passed),
            test.total,
            test.failures
        );
    }
    if let Some(review) = &job.review_report {
        let _ = writeln!(out, "Review:    {}", pass_fail(review.passed));
        for issue in &review.issues {
            let _ = writeln!(out, "  issue:   {issue}");
        }
        for warning in &review.warnings {
            let _ = writeln!(out, "  warning: {warning}");
        }
    }
    if !job.notes.is_empty() {
        let _ = writeln!(out, "Notes:");
        for note in &job.notes {
            let _ = writeln!(out, "  - {note}");
        }
    }
    out
}
