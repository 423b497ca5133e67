//! SQLite persistence for scraped postings.
//!
//! One table, `jobs`, keyed by the natural `job_id`. Writes are upserts: a
//! posting seen for the first time is inserted, a posting seen again has its
//! other columns overwritten in place. Nothing is ever deleted except by
//! [`JobStore::reset`].

use crate::models::JobPosting;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::error::Error;
use std::path::Path;
use tracing::{error, info, instrument, warn};

const CREATE_JOBS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS jobs (
        job_id TEXT PRIMARY KEY,
        title TEXT,
        location TEXT,
        team TEXT,
        posted_date TEXT,
        deadline TEXT,
        summary TEXT,
        link TEXT,
        keywords TEXT,
        supervisor TEXT,
        funding TEXT,
        is_phd BOOLEAN,
        last_updated TEXT
    )";

const INSERT_JOB: &str = "
    INSERT INTO jobs (
        job_id, title, location, team, posted_date, deadline,
        summary, link, keywords, supervisor, funding, is_phd, last_updated
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)";

const UPDATE_JOB: &str = "
    UPDATE jobs
    SET title = ?2, location = ?3, team = ?4, posted_date = ?5, deadline = ?6,
        summary = ?7, link = ?8, keywords = ?9, supervisor = ?10, funding = ?11,
        is_phd = ?12, last_updated = ?13
    WHERE job_id = ?1";

/// Column order of the `jobs` table.
pub const JOB_COLUMNS: [&str; 13] = [
    "job_id",
    "title",
    "location",
    "team",
    "posted_date",
    "deadline",
    "summary",
    "link",
    "keywords",
    "supervisor",
    "funding",
    "is_phd",
    "last_updated",
];

/// Outcome of one upsert batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpsertCounts {
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Handle on the SQLite store.
#[derive(Debug)]
pub struct JobStore {
    conn: Connection,
}

impl JobStore {
    /// Open (or create) the store file at `path`.
    pub fn open(path: &Path) -> Result<Self, Box<dyn Error>> {
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened job store");
        Ok(Self { conn })
    }

    /// In-memory store, gone when dropped.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Create the `jobs` table if it does not exist.
    pub fn ensure_schema(&self) -> Result<(), Box<dyn Error>> {
        self.conn.execute_batch(CREATE_JOBS_TABLE)?;
        info!("Database initialized");
        Ok(())
    }

    /// Remove every posting by dropping and recreating the table.
    #[instrument(level = "info", skip_all)]
    pub fn reset(&self) -> Result<(), Box<dyn Error>> {
        self.conn.execute_batch("DROP TABLE IF EXISTS jobs")?;
        warn!("Dropped all stored jobs");
        self.ensure_schema()
    }

    /// Insert new postings and update known ones; returns the number inserted.
    ///
    /// A posting that fails to write is logged and skipped; the rest of the
    /// batch still goes through.
    pub fn upsert(&mut self, jobs: &[JobPosting]) -> Result<usize, Box<dyn Error>> {
        Ok(self.upsert_counts(jobs)?.inserted)
    }

    /// Same as [`JobStore::upsert`], reporting updated and failed rows as well.
    #[instrument(level = "info", skip_all, fields(batch = jobs.len()))]
    pub fn upsert_counts(&mut self, jobs: &[JobPosting]) -> Result<UpsertCounts, Box<dyn Error>> {
        let tx = self.conn.transaction()?;
        let mut counts = UpsertCounts::default();

        for job in jobs {
            match upsert_one(&tx, job) {
                Ok(true) => counts.inserted += 1,
                Ok(false) => counts.updated += 1,
                Err(e) => {
                    counts.failed += 1;
                    error!(job_id = %job.job_id, error = %e, "Error updating database for job");
                }
            }
        }

        tx.commit()?;
        info!(
            inserted = counts.inserted,
            updated = counts.updated,
            failed = counts.failed,
            "Stored jobs"
        );
        Ok(counts)
    }

    /// Every posting classified as PhD, ordered by `job_id`.
    pub fn phd_postings(&self) -> Result<Vec<JobPosting>, Box<dyn Error>> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE is_phd = 1 ORDER BY job_id",
            JOB_COLUMNS.join(", ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], posting_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Look up one posting.
    #[cfg(test)]
    pub fn get(&self, job_id: &str) -> Result<Option<JobPosting>, Box<dyn Error>> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE job_id = ?1",
            JOB_COLUMNS.join(", ")
        );
        let posting = self
            .conn
            .query_row(&sql, params![job_id], posting_from_row)
            .optional()?;
        Ok(posting)
    }

    /// Number of stored postings.
    pub fn count(&self) -> Result<usize, Box<dyn Error>> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;
        Ok(usize::try_from(count)?)
    }
}

/// Returns `true` when the row was inserted, `false` when it was updated.
fn upsert_one(conn: &Connection, job: &JobPosting) -> rusqlite::Result<bool> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM jobs WHERE job_id = ?1",
            params![job.job_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    let sql = if exists { UPDATE_JOB } else { INSERT_JOB };
    conn.execute(
        sql,
        params![
            job.job_id,
            job.title,
            job.location,
            job.team,
            job.posted_date,
            job.deadline,
            job.summary,
            job.link,
            job.keywords,
            job.supervisor,
            job.funding,
            job.is_phd,
            job.last_updated,
        ],
    )?;
    Ok(!exists)
}

fn posting_from_row(row: &Row<'_>) -> rusqlite::Result<JobPosting> {
    Ok(JobPosting {
        job_id: row.get("job_id")?,
        title: text_column(row, "title")?,
        location: text_column(row, "location")?,
        team: text_column(row, "team")?,
        posted_date: text_column(row, "posted_date")?,
        deadline: text_column(row, "deadline")?,
        summary: text_column(row, "summary")?,
        link: text_column(row, "link")?,
        keywords: text_column(row, "keywords")?,
        supervisor: text_column(row, "supervisor")?,
        funding: text_column(row, "funding")?,
        is_phd: row.get::<_, Option<bool>>("is_phd")?.unwrap_or(false),
        last_updated: text_column(row, "last_updated")?,
    })
}

// Columns are nullable; NULL reads back as an empty string.
fn text_column(row: &Row<'_>, name: &str) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(name)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(job_id: &str, title: &str) -> JobPosting {
        JobPosting {
            job_id: job_id.to_string(),
            title: title.to_string(),
            location: "Rennes".to_string(),
            team: "WIDE".to_string(),
            posted_date: String::new(),
            deadline: "2025-06-30".to_string(),
            summary: "A summary.".to_string(),
            link: format!("https://jobs.inria.fr/offres/{job_id}"),
            keywords: "networks, systems".to_string(),
            supervisor: "Jane Doe".to_string(),
            funding: "2100 €".to_string(),
            is_phd: true,
            last_updated: "2025-05-06T14:30:00.000000".to_string(),
        }
    }

    fn store() -> JobStore {
        let store = JobStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        store
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let store = store();
        store.ensure_schema().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_upsert_inserts_new_rows() {
        let mut store = store();
        let inserted = store
            .upsert(&[posting("1", "PhD Position F/M A"), posting("2", "PhD Position F/M B")])
            .unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.get("1").unwrap().unwrap(), posting("1", "PhD Position F/M A"));
    }

    #[test]
    fn test_upsert_is_idempotent_on_job_id() {
        let mut store = store();
        let first = posting("2025-001", "PhD Position F/M First");
        let mut second = posting("2025-001", "PhD Position F/M Second");
        second.supervisor = "John Roe".to_string();
        second.last_updated = "2025-05-07T09:00:00.000000".to_string();

        assert_eq!(store.upsert(&[first]).unwrap(), 1);
        let counts = store.upsert_counts(&[second.clone()]).unwrap();

        assert_eq!(
            counts,
            UpsertCounts {
                inserted: 0,
                updated: 1,
                failed: 0
            }
        );
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get("2025-001").unwrap().unwrap(), second);
    }

    #[test]
    fn test_upsert_same_id_twice_in_one_batch() {
        let mut store = store();
        let inserted = store
            .upsert(&[posting("7", "PhD Position F/M old"), posting("7", "PhD Position F/M new")])
            .unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(store.get("7").unwrap().unwrap().title, "PhD Position F/M new");
    }

    #[test]
    fn test_upsert_skips_failing_rows() {
        let mut store = store();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON jobs
                 WHEN NEW.job_id = 'bad'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let counts = store
            .upsert_counts(&[posting("ok-1", "A"), posting("bad", "B"), posting("ok-2", "C")])
            .unwrap();

        assert_eq!(counts.inserted, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(store.count().unwrap(), 2);
        assert!(store.get("bad").unwrap().is_none());
    }

    #[test]
    fn test_reset_removes_everything() {
        let mut store = store();
        store.upsert(&[posting("1", "A"), posting("2", "B")]).unwrap();

        store.reset().unwrap();

        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.upsert(&[posting("1", "A")]).unwrap(), 1);
    }

    #[test]
    fn test_phd_postings_filters_and_orders() {
        let mut store = store();
        let mut not_phd = posting("0", "Engineer");
        not_phd.is_phd = false;
        store
            .upsert(&[posting("b", "PhD B"), not_phd, posting("a", "PhD A")])
            .unwrap();

        let ids: Vec<String> = store
            .phd_postings()
            .unwrap()
            .into_iter()
            .map(|p| p.job_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_open_file_store_persists() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("jobs.db");
        {
            let mut store = JobStore::open(&path).unwrap();
            store.ensure_schema().unwrap();
            store.upsert(&[posting("1", "PhD Position F/M A")]).unwrap();
        }
        let store = JobStore::open(&path).unwrap();
        store.ensure_schema().unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }
}
