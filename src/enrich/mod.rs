// src/enrich/mod.rs
//! Per-entity enrichment lookups run between dedup and notify.
//!
//! Lookups are sequential, capped per run, and retried with a fixed backoff.
//! A lookup that still fails is recorded as an error tag, never as a run
//! failure.

pub mod http;

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

/// External lookup keyed by entity label. Must be idempotent.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn lookup(&self, entity: &str) -> Result<Value, String>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnrichmentResult {
    Data(Value),
    Error { error: String },
}

impl EnrichmentResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, EnrichmentResult::Data(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentSettings {
    pub enabled: bool,
    /// Distinct entities looked up per run.
    pub max_requests: usize,
    /// Tries per entity, including the first.
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_requests: 10,
            attempts: 2,
            backoff: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnrichmentOutcome {
    pub results: BTreeMap<String, EnrichmentResult>,
    /// Entities left out because the per-run cap was reached.
    pub throttled: usize,
}

impl EnrichmentOutcome {
    pub fn successes(&self) -> usize {
        self.results.values().filter(|r| r.is_ok()).count()
    }

    pub fn failures(&self) -> usize {
        self.results.len() - self.successes()
    }
}

/// A JSON object carrying an `error` key is a failed lookup.
fn embedded_error(v: &Value) -> Option<String> {
    v.get("error").map(|e| match e {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

async fn lookup_with_retry(enricher: &dyn Enricher, entity: &str, settings: &EnrichmentSettings) -> EnrichmentResult {
    let attempts = settings.attempts.max(1);
    let mut last_err = String::new();

    for attempt in 1..=attempts {
        let res = enricher
            .lookup(entity)
            .await
            .and_then(|v| match embedded_error(&v) {
                Some(e) => Err(e),
                None => Ok(v),
            });
        match res {
            Ok(v) => return EnrichmentResult::Data(v),
            Err(e) => {
                warn!(target: "enrich", %entity, attempt, error = %e, "lookup attempt failed");
                last_err = e;
                if attempt < attempts && !settings.backoff.is_zero() {
                    tokio::time::sleep(settings.backoff).await;
                }
            }
        }
    }
    EnrichmentResult::Error { error: last_err }
}

/// Look up each distinct label once, in first-seen order, up to
/// `max_requests` lookups.
pub async fn enrich_labels<I, S>(enricher: &dyn Enricher, labels: I, settings: &EnrichmentSettings) -> EnrichmentOutcome
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out = EnrichmentOutcome::default();
    let mut requested = 0usize;

    for label in labels {
        let label = label.into();
        if out.results.contains_key(&label) {
            continue;
        }
        if requested >= settings.max_requests {
            out.throttled += 1;
            continue;
        }
        requested += 1;

        let result = lookup_with_retry(enricher, &label, settings).await;
        if result.is_ok() {
            counter!("enrich_lookups_total", "outcome" => "ok").increment(1);
        } else {
            counter!("enrich_lookups_total", "outcome" => "error").increment(1);
        }
        out.results.insert(label, result);
    }

    if out.throttled > 0 {
        info!(
            target: "enrich",
            max_requests = settings.max_requests,
            throttled = out.throttled,
            "enrichment request cap reached"
        );
    }
    info!(
        target: "enrich",
        ok = out.successes(),
        failed = out.failures(),
        "enrichment finished"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        calls: AtomicUsize,
        fail_first: usize,
    }

    #[async_trait]
    impl Enricher for Flaky {
        async fn lookup(&self, entity: &str) -> Result<Value, String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Ok(json!({ "error": "rate limited" }))
            } else {
                Ok(json!({ "entity": entity }))
            }
        }
    }

    fn fast(max_requests: usize) -> EnrichmentSettings {
        EnrichmentSettings {
            enabled: true,
            max_requests,
            attempts: 2,
            backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let e = Flaky { calls: AtomicUsize::new(0), fail_first: 1 };
        let out = enrich_labels(&e, ["ABC Ltd"], &fast(10)).await;
        assert_eq!(e.calls.load(Ordering::SeqCst), 2);
        assert_eq!(out.results["ABC Ltd"], EnrichmentResult::Data(json!({ "entity": "ABC Ltd" })));
    }

    #[tokio::test]
    async fn exhaustion_records_error_tag() {
        let e = Flaky { calls: AtomicUsize::new(0), fail_first: usize::MAX };
        let out = enrich_labels(&e, ["ABC Ltd"], &fast(10)).await;
        assert_eq!(e.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            out.results["ABC Ltd"],
            EnrichmentResult::Error { error: "rate limited".into() }
        );
        assert_eq!(
            serde_json::to_value(&out.results["ABC Ltd"]).unwrap(),
            json!({ "error": "rate limited" })
        );
    }

    #[tokio::test]
    async fn distinct_labels_and_cap() {
        let e = Flaky { calls: AtomicUsize::new(0), fail_first: 0 };
        let out = enrich_labels(&e, ["A", "B", "A", "C", "D"], &fast(2)).await;
        assert_eq!(e.calls.load(Ordering::SeqCst), 2);
        assert_eq!(out.results.len(), 2);
        assert_eq!(out.throttled, 2);
        assert_eq!(out.successes(), 2);
    }
}
