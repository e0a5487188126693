// src/ledger/sqlite.rs
//! SQLite-backed ledger. A connection is opened per call so no handle is
//! held across unrelated operations.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::store::LedgerStore;
use super::{LedgerEntry, LedgerStats};
use crate::error::LedgerError;
use crate::fingerprint::Fingerprint;

const SCHEMA: &str = "BEGIN;
CREATE TABLE IF NOT EXISTS processed_hashes(
    content_hash TEXT PRIMARY KEY,
    processed_at INTEGER NOT NULL,
    title TEXT,
    company_name TEXT,
    article_link TEXT
);
CREATE INDEX IF NOT EXISTS idx_processed_at ON processed_hashes(processed_at);
COMMIT;";

const UPSERT: &str = "INSERT OR REPLACE INTO processed_hashes
    (content_hash, processed_at, title, company_name, article_link)
    VALUES (?1, ?2, ?3, ?4, ?5)";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) the ledger database at `path`.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, LedgerError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| LedgerError::Unavailable(format!("{}: {e}", dir.display())))?;
        }
        let store = Self { path };
        store.connect()?.execute_batch(SCHEMA)?;
        info!(target: "ledger", path = %store.path.display(), "ledger database ready");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, LedgerError> {
        Ok(Connection::open(&self.path)?)
    }
}

fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

fn upsert_with(conn: &Connection, entry: &LedgerEntry) -> Result<(), LedgerError> {
    conn.execute(
        UPSERT,
        params![
            entry.fingerprint.as_str(),
            to_millis(entry.processed_at),
            entry.title,
            entry.label,
            entry.link
        ],
    )?;
    Ok(())
}

impl LedgerStore for SqliteStore {
    fn contains(&self, fp: &Fingerprint) -> Result<bool, LedgerError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT 1 FROM processed_hashes WHERE content_hash = ?1 LIMIT 1")?;
        Ok(stmt.exists(params![fp.as_str()])?)
    }

    fn recent(&self, limit: usize) -> Result<HashSet<Fingerprint>, LedgerError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT content_hash FROM processed_hashes ORDER BY processed_at DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], |row| row.get::<_, String>(0))?;

        let mut out = HashSet::new();
        for r in rows {
            out.insert(Fingerprint::from_token(r?));
        }
        Ok(out)
    }

    fn upsert(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let conn = self.connect()?;
        upsert_with(&conn, entry)?;
        debug!(target: "ledger", fingerprint = %entry.fingerprint, "ledger entry written");
        Ok(())
    }

    fn upsert_many(&self, entries: &[LedgerEntry]) -> Vec<Result<(), LedgerError>> {
        let conn = match self.connect() {
            Ok(c) => c,
            Err(e) => {
                // every entry shares the same failure
                let msg = e.to_string();
                return entries
                    .iter()
                    .map(|_| Err(LedgerError::Unavailable(msg.clone())))
                    .collect();
            }
        };
        entries.iter().map(|e| upsert_with(&conn, e)).collect()
    }

    fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize, LedgerError> {
        let conn = self.connect()?;
        let n = conn.execute(
            "DELETE FROM processed_hashes WHERE processed_at < ?1",
            params![to_millis(cutoff)],
        )?;
        Ok(n)
    }

    fn stats(&self, now: DateTime<Utc>) -> Result<LedgerStats, LedgerError> {
        let conn = self.connect()?;
        let count_since = |since: DateTime<Utc>| -> Result<u64, LedgerError> {
            let n: i64 = conn.query_row(
                "SELECT COUNT(1) FROM processed_hashes WHERE processed_at >= ?1",
                params![to_millis(since)],
                |r| r.get(0),
            )?;
            Ok(n.max(0) as u64)
        };

        let total: i64 = conn.query_row("SELECT COUNT(1) FROM processed_hashes", [], |r| r.get(0))?;
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(now);
        let today = count_since(midnight)?;
        let last_24h = count_since(now - Duration::days(1))?;
        let last: Option<i64> = conn
            .query_row("SELECT MAX(processed_at) FROM processed_hashes", [], |r| {
                r.get::<_, Option<i64>>(0)
            })
            .optional()?
            .flatten();

        Ok(LedgerStats {
            total: total.max(0) as u64,
            today,
            last_24h,
            last_processed_at: last.and_then(from_millis),
        })
    }

    fn clear(&self) -> Result<usize, LedgerError> {
        let conn = self.connect()?;
        Ok(conn.execute("DELETE FROM processed_hashes", [])?)
    }
}
