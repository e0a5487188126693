// src/ledger/store.rs
use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::{LedgerEntry, LedgerStats};
use crate::error::LedgerError;
use crate::fingerprint::Fingerprint;

/// Backing store for the dedup ledger.
///
/// Implementations acquire and release their underlying resource per call;
/// nothing is held between calls.
pub trait LedgerStore: Send + Sync {
    fn contains(&self, fp: &Fingerprint) -> Result<bool, LedgerError>;

    /// Up to `limit` fingerprints, most recently processed first.
    fn recent(&self, limit: usize) -> Result<HashSet<Fingerprint>, LedgerError>;

    /// Insert or replace by fingerprint (last write wins).
    fn upsert(&self, entry: &LedgerEntry) -> Result<(), LedgerError>;

    /// Per-entry results; one failure must not stop the remaining writes.
    fn upsert_many(&self, entries: &[LedgerEntry]) -> Vec<Result<(), LedgerError>> {
        entries.iter().map(|e| self.upsert(e)).collect()
    }

    /// Delete entries processed strictly before `cutoff`; returns the count.
    fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize, LedgerError>;

    fn stats(&self, now: DateTime<Utc>) -> Result<LedgerStats, LedgerError>;

    /// Remove everything; returns the count.
    fn clear(&self) -> Result<usize, LedgerError>;
}
