// src/ledger/memory.rs
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::store::LedgerStore;
use super::{LedgerEntry, LedgerStats};
use crate::error::LedgerError;
use crate::fingerprint::Fingerprint;

/// Process-local ledger for tests and dry runs. Contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<Fingerprint, LedgerEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> LedgerError {
        LedgerError::Unavailable("in-memory ledger lock poisoned".into())
    }
}

impl LedgerStore for MemoryStore {
    fn contains(&self, fp: &Fingerprint) -> Result<bool, LedgerError> {
        let map = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(map.contains_key(fp))
    }

    fn recent(&self, limit: usize) -> Result<HashSet<Fingerprint>, LedgerError> {
        let map = self.entries.read().map_err(|_| Self::poisoned())?;
        let mut all: Vec<&LedgerEntry> = map.values().collect();
        all.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        Ok(all
            .into_iter()
            .take(limit)
            .map(|e| e.fingerprint.clone())
            .collect())
    }

    fn upsert(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let mut map = self.entries.write().map_err(|_| Self::poisoned())?;
        map.insert(entry.fingerprint.clone(), entry.clone());
        Ok(())
    }

    fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize, LedgerError> {
        let mut map = self.entries.write().map_err(|_| Self::poisoned())?;
        let before = map.len();
        map.retain(|_, e| e.processed_at >= cutoff);
        Ok(before - map.len())
    }

    fn stats(&self, now: DateTime<Utc>) -> Result<LedgerStats, LedgerError> {
        let map = self.entries.read().map_err(|_| Self::poisoned())?;
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(now);
        let day_ago = now - Duration::days(1);

        Ok(LedgerStats {
            total: map.len() as u64,
            today: map.values().filter(|e| e.processed_at >= midnight).count() as u64,
            last_24h: map.values().filter(|e| e.processed_at >= day_ago).count() as u64,
            last_processed_at: map.values().map(|e| e.processed_at).max(),
        })
    }

    fn clear(&self) -> Result<usize, LedgerError> {
        let mut map = self.entries.write().map_err(|_| Self::poisoned())?;
        let n = map.len();
        map.clear();
        Ok(n)
    }
}
