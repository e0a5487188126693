// tests/ledger_dedup.rs
//
// Ledger behaviour against the SQLite store (temp files) and the in-memory
// store: idempotence, link-prefix stability, membership, retention.

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use newswatch::fingerprint::fingerprint;
use newswatch::ledger::{Ledger, LedgerEntry, SqliteStore};
use newswatch::Record;

fn sqlite_ledger(dir: &tempfile::TempDir) -> Ledger {
    Ledger::new(Arc::new(SqliteStore::open(dir.path().join("ledger.db")).unwrap()))
}

fn long_link(tag: char) -> String {
    let prefix = format!("http://n/1?ref={}", "x".repeat(85));
    assert_eq!(prefix.chars().count(), 100);
    let tail: String = std::iter::repeat(tag).take(30).collect();
    format!("{prefix}{tail}")
}

#[test]
fn marking_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = sqlite_ledger(&dir);
    let r = Record::new("ABC Ltd wins award", "bridge order").with_link("http://n/1");

    ledger.mark_processed(&r, None).unwrap();
    ledger.mark_processed(&r, None).unwrap();
    assert_eq!(ledger.stats().unwrap().total, 1);
    assert!(ledger.filter_new(&[r]).unwrap().is_empty());
}

#[test]
fn link_prefix_drift_is_a_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = sqlite_ledger(&dir);

    let first = Record::new("Same title", "Same summary").with_link(long_link('a'));
    let second = Record::new("Same title", "Same summary").with_link(long_link('b'));
    assert_eq!(first.link.as_ref().unwrap().chars().count(), 130);
    assert_eq!(first.fingerprint(), second.fingerprint());

    assert_eq!(ledger.filter_new(&[second.clone()]).unwrap().len(), 1);
    let batch = ledger.mark_many(&[first], &HashMap::new());
    assert_eq!(batch.written(), 1);
    assert!(ledger.filter_new(&[second]).unwrap().is_empty());
}

#[test]
fn known_fingerprint_is_filtered_out() {
    let ledger = Ledger::in_memory();
    let r = Record::new("ABC Ltd", "order").with_link("http://n/7");
    let f = fingerprint("ABC Ltd", "order", Some("http://n/7"));

    ledger
        .record_entry(&LedgerEntry {
            fingerprint: f.clone(),
            processed_at: Utc::now(),
            title: "ABC Ltd".into(),
            label: "ABC Ltd".into(),
            link: "http://n/7".into(),
        })
        .unwrap();

    assert!(ledger.is_processed(&f).unwrap());
    assert_eq!(ledger.filter_new(&[r]).unwrap().len(), 0);
}

#[test]
fn ledger_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let r = Record::new("Persisted", "entry").with_link("http://n/p");
    sqlite_ledger(&dir).mark_processed(&r, Some("Persisted Co")).unwrap();

    let reopened = sqlite_ledger(&dir);
    assert!(reopened.is_processed(&r.fingerprint()).unwrap());
    assert!(reopened
        .recent_fingerprints(10)
        .unwrap()
        .contains(&r.fingerprint()));
}

#[test]
fn cleanup_only_removes_entries_past_retention() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = sqlite_ledger(&dir);
    let now = Utc::now();
    let old = Record::new("old", "x").with_link("http://n/old");
    let fresh = Record::new("fresh", "x").with_link("http://n/fresh");

    ledger
        .record_entry(&LedgerEntry::for_record(&old, None, now - Duration::days(31)))
        .unwrap();
    ledger
        .record_entry(&LedgerEntry::for_record(&fresh, None, now - Duration::days(29)))
        .unwrap();

    assert_eq!(ledger.cleanup(Duration::days(30)).unwrap(), 1);
    assert!(!ledger.is_processed(&old.fingerprint()).unwrap());
    assert!(ledger.is_processed(&fresh.fingerprint()).unwrap());
}

#[test]
fn stats_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = sqlite_ledger(&dir);
    let records: Vec<Record> = (0..3)
        .map(|i| Record::new(format!("t{i}"), "s").with_link(format!("http://n/{i}")))
        .collect();
    ledger.mark_many(&records, &HashMap::new());

    let stats = ledger.stats().unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.last_24h, 3);
    assert!(stats.last_processed_at.is_some());

    assert_eq!(ledger.reset().unwrap(), 3);
    assert_eq!(ledger.stats().unwrap().total, 0);
}
