//! Job orchestration: run every stage in order, checkpointing each transition.

use anyhow::{Context, Result};
use tracing::{error, info, instrument};

use crate::core::job::JobRecord;
use crate::core::spec::BotSpec;
use crate::core::stage::Stage;
use crate::io::job_store::JobStore;
use crate::stages::Stages;

/// Run one job for `spec` to a terminal stage.
///
/// Never returns an error: any stage fault moves the record to
/// [`Stage::Failed`] with a message, and the record is returned. Generated
/// files are left in place on failure.
pub fn run_pipeline(spec: BotSpec, store: &dyn JobStore, stages: &dyn Stages) -> JobRecord {
    run_job(JobRecord::new(spec), store, stages)
}

/// Like [`run_pipeline`] for a record the caller created (at [`Stage::Intake`]).
#[instrument(skip_all, fields(job_id = %job.id, bot = %job.spec.name))]
pub fn run_job(mut job: JobRecord, store: &dyn JobStore, stages: &dyn Stages) -> JobRecord {
    info!(platform = %job.spec.platform, "pipeline started");
    match drive(&mut job, store, stages) {
        Ok(()) => info!(stage = %job.stage, "pipeline finished"),
        Err(err) => {
            let message = format!("{err:#}");
            error!(stage = %job.stage, error = %message, "pipeline failed");
            if let Err(stage_err) = job.fail(message) {
                error!(error = %stage_err, "could not mark job failed");
                return job;
            }
            if let Err(save_err) = store.save(&job) {
                error!(error = %format!("{save_err:#}"), "could not persist failed job");
            }
        }
    }
    job
}

/// Persist the advanced record, then adopt it before the stage body runs.
///
/// A failed save leaves `job` at its previous stage.
fn checkpoint(job: &mut JobRecord, store: &dyn JobStore, next: Stage) -> Result<()> {
    let mut advanced = job.clone();
    advanced.advance(next)?;
    store
        .save(&advanced)
        .with_context(|| format!("checkpoint {next}"))?;
    *job = advanced;
    info!(stage = %next, "stage entered");
    Ok(())
}

fn drive(job: &mut JobRecord, store: &dyn JobStore, stages: &dyn Stages) -> Result<()> {
    store.save(job).context("checkpoint intake")?;

    checkpoint(job, store, Stage::Plan)?;
    let plan = stages.plan(&job.spec)?;
    info!(files = plan.files.len(), dependencies = plan.dependencies.len(), "planned");

    checkpoint(job, store, Stage::RetrieveDocs)?;
    let plan = stages.retrieve_docs(plan)?;
    job.notes = plan.notes.clone();
    job.touch();

    checkpoint(job, store, Stage::Generate)?;
    let project = stages.generate(&plan)?;
    job.output_path = Some(project.project_dir.clone());
    job.notes.extend(project.warnings.iter().cloned());
    job.generation = Some(project.report.clone());
    job.touch();
    let project_dir = project.project_dir;

    checkpoint(job, store, Stage::Test)?;
    let tested = stages.test(&project_dir)?;
    info!(passed = tested.passed, failures = tested.failures, "tested");
    job.test_result = Some(tested);
    job.touch();

    checkpoint(job, store, Stage::Review)?;
    let reviewed = stages.review(&project_dir)?;
    info!(passed = reviewed.passed, issues = reviewed.issues.len(), "reviewed");
    job.review_report = Some(reviewed);
    job.touch();

    checkpoint(job, store, Stage::Package)?;
    let archive = stages.package(&project_dir)?;
    job.archive_path = Some(archive.clone());
    job.touch();

    checkpoint(job, store, Stage::Deploy)?;
    stages.deploy(&project_dir, &archive)?;

    checkpoint(job, store, Stage::Done)?;
    Ok(())
}
