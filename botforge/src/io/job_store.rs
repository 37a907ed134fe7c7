//! Durable job records.
//!
//! The pipeline only sees [`JobStore`]. [`SqliteJobStore`] keeps each record as
//! a JSON blob keyed by id, with timestamp columns for ordering.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use tracing::debug;

use crate::core::job::JobRecord;

/// Persistence contract for job records. Last write wins per id.
pub trait JobStore: Send + Sync {
    /// Prepare storage. Safe to call more than once.
    fn init(&self) -> Result<()>;
    /// Insert or replace the record with `record.id`.
    fn save(&self, record: &JobRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<JobRecord>>;
    /// Most recently created first.
    fn list(&self, limit: usize) -> Result<Vec<JobRecord>>;
    /// Returns whether a record was removed.
    fn delete(&self, id: &str) -> Result<bool>;
}

impl<T: JobStore + ?Sized> JobStore for &T {
    fn init(&self) -> Result<()> {
        (**self).init()
    }
    fn save(&self, record: &JobRecord) -> Result<()> {
        (**self).save(record)
    }
    fn get(&self, id: &str) -> Result<Option<JobRecord>> {
        (**self).get(id)
    }
    fn list(&self, limit: usize) -> Result<Vec<JobRecord>> {
        (**self).list(limit)
    }
    fn delete(&self, id: &str) -> Result<bool> {
        (**self).delete(id)
    }
}

pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Open (or create) the database at `path` and create the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create db dir {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open sqlite database {}", path.display()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init()?;
        debug!(path = %path.display(), "opened job store");
        Ok(store)
    }

    /// In-memory database, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite database")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow!("job store lock poisoned: {}", e))
    }
}

fn timestamp(ts: &DateTime<Utc>) -> String {
    // Fixed width so text ordering matches time ordering.
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode(id: &str, data: &str) -> Result<JobRecord> {
    serde_json::from_str(data).with_context(|| format!("decode job record {id}"))
}

impl JobStore for SqliteJobStore {
    fn init(&self) -> Result<()> {
        self.lock()?
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS jobs (
                    id TEXT PRIMARY KEY,
                    data TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS jobs_created_at ON jobs(created_at);
                ",
            )
            .context("create jobs table")?;
        Ok(())
    }

    fn save(&self, record: &JobRecord) -> Result<()> {
        let data = serde_json::to_string(record).context("serialize job record")?;
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO jobs (id, data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id,
                    data,
                    timestamp(&record.created_at),
                    timestamp(&record.updated_at)
                ],
            )
            .with_context(|| format!("save job {}", record.id))?;
        debug!(job_id = %record.id, stage = %record.stage, "saved job");
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<JobRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT data FROM jobs WHERE id = ?1")
            .context("prepare get job")?;
        let mut rows = stmt
            .query_map(params![id], |row| row.get::<_, String>(0))
            .context("query job")?;
        match rows.next() {
            Some(row) => {
                let data = row.context("read job row")?;
                Ok(Some(decode(id, &data)?))
            }
            None => Ok(None),
        }
    }

    fn list(&self, limit: usize) -> Result<Vec<JobRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, data FROM jobs ORDER BY created_at DESC, id ASC LIMIT ?1")
            .context("prepare list jobs")?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .context("query jobs")?;
        let mut jobs = Vec::new();
        for row in rows {
            let (id, data) = row.context("read job row")?;
            jobs.push(decode(&id, &data)?);
        }
        Ok(jobs)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let count = self
            .lock()?
            .execute("DELETE FROM jobs WHERE id = ?1", params![id])
            .with_context(|| format!("delete job {id}"))?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::core::spec::{BotSpec, BotSpecInput, Platform};
    use crate::core::stage::Stage;

    fn record(id: &str, offset_secs: i64) -> JobRecord {
        let spec = BotSpec::try_from(BotSpecInput::new("store bot", Platform::Cli, "stored"))
            .expect("valid spec");
        let at = Utc::now() + TimeDelta::seconds(offset_secs);
        JobRecord::with_id(id.to_string(), spec, at)
    }

    #[test]
    fn save_then_get_round_trips() {
        let store = SqliteJobStore::open_in_memory().expect("store");
        let mut job = record("aaaaaaaaaaaa", 0);
        job.advance(Stage::Plan).expect("plan");
        store.save(&job).expect("save");
        assert_eq!(store.get(&job.id).expect("get"), Some(job));
        assert_eq!(store.get("missing").expect("get"), None);
    }

    #[test]
    fn save_replaces_existing_record() {
        let store = SqliteJobStore::open_in_memory().expect("store");
        let mut job = record("bbbbbbbbbbbb", 0);
        store.save(&job).expect("save");
        job.fail("boom").expect("fail");
        store.save(&job).expect("save again");
        let loaded = store.get(&job.id).expect("get").expect("present");
        assert_eq!(loaded.stage, Stage::Failed);
        assert_eq!(store.list(10).expect("list").len(), 1);
    }

    #[test]
    fn list_is_most_recent_first_and_limited() {
        let store = SqliteJobStore::open_in_memory().expect("store");
        store.save(&record("old000000000", -60)).expect("save");
        store.save(&record("new000000000", 0)).expect("save");
        store.save(&record("mid000000000", -30)).expect("save");

        let ids: Vec<String> = store
            .list(10)
            .expect("list")
            .into_iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(ids, vec!["new000000000", "mid000000000", "old000000000"]);
        assert_eq!(store.list(2).expect("list").len(), 2);
    }

    #[test]
    fn delete_reports_whether_a_record_existed() {
        let store = SqliteJobStore::open_in_memory().expect("store");
        let job = record("cccccccccccc", 0);
        store.save(&job).expect("save");
        assert!(store.delete(&job.id).expect("delete"));
        assert!(!store.delete(&job.id).expect("delete again"));
        assert_eq!(store.get(&job.id).expect("get"), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("data").join("jobs.db");
        let job = record("dddddddddddd", 0);
        {
            let store = SqliteJobStore::open(&path).expect("open");
            store.save(&job).expect("save");
        }
        let store = SqliteJobStore::open(&path).expect("reopen");
        assert_eq!(store.get(&job.id).expect("get"), Some(job));
    }
}
