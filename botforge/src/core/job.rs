//! Durable job record mutated by the pipeline.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

use crate::core::outcome::{GenerationReport, ReviewOutcome, TestOutcome};
use crate::core::spec::BotSpec;
use crate::core::stage::{Stage, StageError};

/// Length of a generated job id.
pub const JOB_ID_LEN: usize = 12;

/// One pipeline run. Identity and spec never change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub spec: BotSpec,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    #[serde(default)]
    pub archive_path: Option<PathBuf>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub generation: Option<GenerationReport>,
    #[serde(default)]
    pub test_result: Option<TestOutcome>,
    #[serde(default)]
    pub review_report: Option<ReviewOutcome>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobRecord {
    /// Fresh record at [`Stage::Intake`] with a random id.
    pub fn new(spec: BotSpec) -> Self {
        Self::with_id(generate_job_id(), spec, Utc::now())
    }

    pub fn with_id(id: String, spec: BotSpec, now: DateTime<Utc>) -> Self {
        Self {
            id,
            spec,
            stage: Stage::Intake,
            created_at: now,
            updated_at: now,
            output_path: None,
            archive_path: None,
            notes: Vec::new(),
            generation: None,
            test_result: None,
            review_report: None,
            error: None,
        }
    }

    /// Move to `next`, which must be the immediate successor of the current stage.
    ///
    /// An illegal move leaves the record untouched.
    pub fn advance(&mut self, next: Stage) -> Result<(), StageError> {
        if next == Stage::Failed {
            return Err(StageError::IllegalTransition {
                from: self.stage,
                to: next,
            });
        }
        self.stage.check_transition(next)?;
        self.stage = next;
        self.touch();
        Ok(())
    }

    /// Enter the terminal failure state with `message`.
    ///
    /// Calling this again after failure only re-records the message. A blank
    /// message is replaced so a failed record always explains itself. A
    /// [`Stage::Done`] record cannot fail and is left untouched.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), StageError> {
        if self.stage != Stage::Failed {
            self.stage.check_transition(Stage::Failed)?;
        }
        let message = message.into();
        let message = if message.trim().is_empty() {
            format!("pipeline failed during {}", self.stage)
        } else {
            message
        };
        self.stage = Stage::Failed;
        self.error = Some(message);
        self.touch();
        Ok(())
    }

    /// Bump `updated_at`, never moving it backwards.
    pub fn touch(&mut self) {
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

}

/// Random lowercase alphanumeric id of [`JOB_ID_LEN`] characters.
pub fn generate_job_id() -> String {
    let mut rng = rand::thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(JOB_ID_LEN)
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::core::spec::{BotSpecInput, Platform};

    fn record() -> JobRecord {
        let spec = BotSpec::try_from(BotSpecInput::new("job test", Platform::Cli, "a job"))
            .expect("valid spec");
        JobRecord::new(spec)
    }

    #[test]
    fn new_record_starts_at_intake_with_fixed_length_id() {
        let job = record();
        assert_eq!(job.stage, Stage::Intake);
        assert_eq!(job.id.len(), JOB_ID_LEN);
        assert!(
            job.id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn ids_are_independent() {
        assert_ne!(generate_job_id(), generate_job_id());
    }

    #[test]
    fn advance_follows_order_and_rejects_skips() {
        let mut job = record();
        job.advance(Stage::Plan).expect("plan");
        let before = job.clone();
        let err = job.advance(Stage::Test).expect_err("skip");
        assert_eq!(
            err,
            StageError::IllegalTransition {
                from: Stage::Plan,
                to: Stage::Test
            }
        );
        assert_eq!(job, before);
    }

    #[test]
    fn advance_cannot_be_used_to_fail() {
        let mut job = record();
        assert!(job.advance(Stage::Failed).is_err());
        assert_eq!(job.stage, Stage::Intake);
    }

    #[test]
    fn fail_is_absorbing_and_rerecords_message() {
        let mut job = record();
        job.advance(Stage::Plan).expect("plan");
        job.fail("boom").expect("fail");
        assert_eq!(job.stage, Stage::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));

        job.fail("again").expect("fail again");
        assert_eq!(job.stage, Stage::Failed);
        assert_eq!(job.error.as_deref(), Some("again"));

        assert!(job.advance(Stage::RetrieveDocs).is_err());
        assert_eq!(job.stage, Stage::Failed);
    }

    #[test]
    fn fail_with_blank_message_still_records_error() {
        let mut job = record();
        job.fail("   ").expect("fail");
        assert!(job.error.as_deref().is_some_and(|e| e.contains("intake")));
    }

    #[test]
    fn finished_job_cannot_fail() {
        let mut job = record();
        for stage in &Stage::ORDER[1..] {
            job.advance(*stage).expect("advance");
        }
        assert_eq!(job.stage, Stage::Done);
        let before = job.clone();

        let err = job.fail("late").expect_err("done is terminal");
        assert_eq!(
            err,
            StageError::IllegalTransition {
                from: Stage::Done,
                to: Stage::Failed
            }
        );
        assert_eq!(job, before);
    }

    #[test]
    fn updated_at_never_moves_backwards() {
        let mut job = record();
        let future = Utc::now() + TimeDelta::hours(1);
        job.updated_at = future;
        job.advance(Stage::Plan).expect("plan");
        assert_eq!(job.updated_at, future);
        assert!(job.updated_at >= job.created_at);
    }

    #[test]
    fn record_round_trips_through_json() {
        let mut job = record();
        job.notes.push("Platform: cli".to_string());
        let json = serde_json::to_string(&job).expect("serialize");
        let back: JobRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, job);
    }
}
