// src/ledger/mod.rs
//! Deduplication ledger: fingerprints of records that were already acted on.
//!
//! The pipeline reads it through `filter_new` and writes it through
//! `mark_many`, only after a notification went out.

pub mod memory;
pub mod sqlite;
pub mod store;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::entity;
use crate::error::LedgerError;
use crate::fingerprint::Fingerprint;
use crate::record::Record;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::LedgerStore;

pub const DEFAULT_RECENT_LIMIT: usize = 10_000;
pub const TITLE_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub fingerprint: Fingerprint,
    pub processed_at: DateTime<Utc>,
    /// At most `TITLE_SNIPPET_CHARS` characters.
    pub title: String,
    pub label: String,
    pub link: String,
}

impl LedgerEntry {
    pub fn for_record(record: &Record, label: Option<&str>, processed_at: DateTime<Utc>) -> Self {
        let label = match label {
            Some(l) => l.to_string(),
            None => entity::extract_label(&record.title),
        };
        Self {
            fingerprint: record.fingerprint(),
            processed_at,
            title: record.title.chars().take(TITLE_SNIPPET_CHARS).collect(),
            label,
            link: record.link.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub total: u64,
    pub today: u64,
    pub last_24h: u64,
    pub last_processed_at: Option<DateTime<Utc>>,
}

/// Per-item result of a batch write.
#[derive(Debug)]
pub enum WriteOutcome {
    Written(Fingerprint),
    Failed {
        fingerprint: Fingerprint,
        error: LedgerError,
    },
}

#[derive(Debug, Default)]
pub struct BatchWrite {
    pub outcomes: Vec<WriteOutcome>,
}

impl BatchWrite {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, WriteOutcome::Written(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.written()
    }

    pub fn is_complete(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Fingerprint, &LedgerError)> {
        self.outcomes.iter().filter_map(|o| match o {
            WriteOutcome::Failed { fingerprint, error } => Some((fingerprint, error)),
            WriteOutcome::Written(_) => None,
        })
    }
}

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    recent_limit: usize,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("recent_limit", &self.recent_limit)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn sqlite(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        Ok(Self::new(Arc::new(SqliteStore::open(path)?)))
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    pub fn recent_limit(&self) -> usize {
        self.recent_limit
    }

    pub fn is_processed(&self, fp: &Fingerprint) -> Result<bool, LedgerError> {
        self.store.contains(fp)
    }

    pub fn recent_fingerprints(&self, limit: usize) -> Result<HashSet<Fingerprint>, LedgerError> {
        self.store.recent(limit)
    }

    /// Upsert one record. Without an explicit label the title-derived entity
    /// label is stored.
    pub fn mark_processed(&self, record: &Record, label: Option<&str>) -> Result<(), LedgerError> {
        self.record_entry(&LedgerEntry::for_record(record, label, Utc::now()))
    }

    pub fn record_entry(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        self.store.upsert(entry)?;
        counter!("ledger_writes_total").increment(1);
        Ok(())
    }

    /// Best-effort batch upsert. Every record is attempted; failures are
    /// reported per item.
    pub fn mark_many<T: AsRef<Record>>(
        &self,
        records: &[T],
        labels: &HashMap<Fingerprint, String>,
    ) -> BatchWrite {
        let now = Utc::now();
        let entries: Vec<LedgerEntry> = records
            .iter()
            .map(|r| {
                let r = r.as_ref();
                let fp = r.fingerprint();
                LedgerEntry::for_record(r, labels.get(&fp).map(String::as_str), now)
            })
            .collect();

        let results = self.store.upsert_many(&entries);
        let mut batch = BatchWrite::default();
        for (entry, res) in entries.into_iter().zip(results) {
            match res {
                Ok(()) => batch.outcomes.push(WriteOutcome::Written(entry.fingerprint)),
                Err(error) => {
                    warn!(
                        target: "ledger",
                        fingerprint = %entry.fingerprint,
                        error = %error,
                        "failed to mark record as processed"
                    );
                    batch.outcomes.push(WriteOutcome::Failed {
                        fingerprint: entry.fingerprint,
                        error,
                    });
                }
            }
        }

        counter!("ledger_writes_total").increment(batch.written() as u64);
        counter!("ledger_write_failures_total").increment(batch.failed() as u64);
        info!(
            target: "ledger",
            attempted = batch.attempted(),
            written = batch.written(),
            "batch marked as processed"
        );
        batch
    }

    /// Items whose fingerprint is not among the `recent_limit` most recent
    /// ledger entries, in input order. Duplicates within the batch are kept.
    pub fn filter_new<T: AsRef<Record> + Clone>(&self, items: &[T]) -> Result<Vec<T>, LedgerError> {
        let recent = self.store.recent(self.recent_limit)?;
        let out: Vec<T> = items
            .iter()
            .filter(|item| !recent.contains(&item.as_ref().fingerprint()))
            .cloned()
            .collect();

        debug!(
            target: "ledger",
            total = items.len(),
            new = out.len(),
            window = recent.len(),
            "filtered against ledger"
        );
        Ok(out)
    }

    /// Delete entries older than `retention`; returns the number removed.
    pub fn cleanup(&self, retention: Duration) -> Result<usize, LedgerError> {
        let cutoff = Utc::now() - retention;
        let deleted = self.store.delete_before(cutoff)?;
        info!(target: "ledger", deleted, %cutoff, "ledger cleanup finished");
        counter!("ledger_cleanup_deleted_total").increment(deleted as u64);
        Ok(deleted)
    }

    pub fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let stats = self.store.stats(Utc::now())?;
        gauge!("ledger_entries").set(stats.total as f64);
        Ok(stats)
    }

    /// Maintenance only: wipes every entry.
    pub fn reset(&self) -> Result<usize, LedgerError> {
        let n = self.store.clear()?;
        warn!(target: "ledger", removed = n, "ledger reset");
        Ok(n)
    }
}
