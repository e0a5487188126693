// src/pipeline/mod.rs
//! One batch run: FETCH -> FILTER -> DEDUP -> ENRICH -> NOTIFY -> COMMIT.
//!
//! Stages run strictly in sequence. Acquisition trouble is a warning, a
//! failed notification is an error and leaves the ledger untouched, so the
//! same records are offered again next run.

pub mod digest;
pub mod report;
pub mod scheduler;

use chrono::Utc;
use metrics::{counter, gauge, histogram};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

use crate::enrich::{self, Enricher, EnrichmentSettings};
use crate::entity::extract_label;
use crate::error::ConfigError;
use crate::filter::{FilterEngine, MatchedRecord, Rule};
use crate::ingest::types::Acquisition;
use crate::ledger::Ledger;
use crate::notify::Notifier;

pub use report::{RunReport, Stage};

/// What DEDUP does when the ledger cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPolicy {
    /// Treat every match as new. Risks a duplicate notification.
    #[default]
    FailOpen,
    /// Drop the batch for this run.
    FailClosed,
}

pub struct Pipeline {
    source: Arc<dyn Acquisition>,
    engine: FilterEngine,
    rules: Vec<Rule>,
    ledger: Ledger,
    notifier: Arc<dyn Notifier>,
    enricher: Option<Arc<dyn Enricher>>,
    enrichment: EnrichmentSettings,
    read_policy: ReadPolicy,
}

impl Pipeline {
    /// Regex conditions are compiled here, so a bad pattern fails before the
    /// first run.
    pub fn new(
        source: Arc<dyn Acquisition>,
        rules: Vec<Rule>,
        ledger: Ledger,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConfigError> {
        crate::metrics::ensure_metrics_described();
        let engine = FilterEngine::new();
        engine.precompile(&rules)?;
        Ok(Self {
            source,
            engine,
            rules,
            ledger,
            notifier,
            enricher: None,
            enrichment: EnrichmentSettings::default(),
            read_policy: ReadPolicy::default(),
        })
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>, settings: EnrichmentSettings) -> Self {
        self.enricher = Some(enricher);
        self.enrichment = settings;
        self
    }

    pub fn with_read_policy(mut self, policy: ReadPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    fn filter(&self, records: &[crate::record::Record]) -> Result<Vec<MatchedRecord>, ConfigError> {
        match self.rules.as_slice() {
            [single] => self.engine.apply_rule(records, single),
            many => self.engine.apply_rules(records, many),
        }
    }

    pub async fn run_once(&self) -> RunReport {
        let t0 = std::time::Instant::now();
        let report = self.run_stages().await.finish();

        let outcome = if report.success { "ok" } else { "error" };
        counter!("pipeline_runs_total", "outcome" => outcome).increment(1);
        histogram!("pipeline_run_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("pipeline_last_run_ts").set(Utc::now().timestamp() as f64);
        report.log();
        report
    }

    async fn run_stages(&self) -> RunReport {
        let mut report = RunReport::start();

        // FETCH
        let records = match self.source.fetch().await {
            Ok(acquired) => {
                if acquired.stats.errors > 0 {
                    report.warn(format!(
                        "{} acquisition error(s) from {}",
                        acquired.stats.errors,
                        self.source.name()
                    ));
                }
                acquired.records
            }
            Err(e) => {
                report.warn(format!("fetch from {} failed: {e:#}", self.source.name()));
                Vec::new()
            }
        };
        report.fetched = records.len();

        // FILTER
        report.enter(Stage::Filter);
        let matched = match self.filter(&records) {
            Ok(m) => m,
            Err(e) => {
                report.error(format!("filter configuration error: {e}"));
                return report;
            }
        };
        report.matched = matched.len();
        if matched.is_empty() {
            info!(target: "pipeline", fetched = report.fetched, "no records matched");
            report.enter(Stage::Done);
            return report;
        }

        // DEDUP
        report.enter(Stage::Dedup);
        let ledger = self.ledger.clone();
        let lookup = tokio::task::spawn_blocking(move || {
            let fresh = ledger.filter_new(&matched);
            (matched, fresh)
        })
        .await;
        let (matched, fresh) = match lookup {
            Ok(pair) => pair,
            Err(e) => {
                report.error(format!("ledger lookup task failed: {e}"));
                return report;
            }
        };
        let fresh = match fresh {
            Ok(fresh) => fresh,
            Err(e) => match self.read_policy {
                ReadPolicy::FailOpen => {
                    report.warn(format!(
                        "ledger read failed ({e}); fail-open: treating all {} matches as new",
                        matched.len()
                    ));
                    matched
                }
                ReadPolicy::FailClosed => {
                    report.error(format!(
                        "ledger read failed ({e}); fail-closed: dropping {} matches this run",
                        matched.len()
                    ));
                    return report;
                }
            },
        };
        report.new = fresh.len();
        if fresh.is_empty() {
            info!(target: "pipeline", matched = report.matched, "nothing new since last run");
            report.enter(Stage::Done);
            return report;
        }

        let labels: Vec<String> = fresh.iter().map(|m| extract_label(&m.record.title)).collect();

        // ENRICH
        let mut enrichment = BTreeMap::new();
        if let Some(enricher) = self.enricher.as_deref().filter(|_| self.enrichment.enabled) {
            report.enter(Stage::Enrich);
            let outcome = enrich::enrich_labels(enricher, labels.iter().cloned(), &self.enrichment).await;
            report.enriched_ok = outcome.successes();
            report.enriched_failed = outcome.failures();
            enrichment = outcome.results;
        }

        // NOTIFY
        report.enter(Stage::Notify);
        let d = digest::compose(&fresh, &enrichment, Utc::now());
        if !self.notifier.send(&d.subject, &d.html, true).await {
            report.error(format!(
                "notification failed; {} records left uncommitted for the next run",
                fresh.len()
            ));
            return report;
        }
        report.notified = true;

        // COMMIT
        report.enter(Stage::Commit);
        let by_fp: HashMap<_, _> = fresh
            .iter()
            .zip(labels)
            .map(|(m, label)| (m.record.fingerprint(), label))
            .collect();
        let ledger = self.ledger.clone();
        let batch = match tokio::task::spawn_blocking(move || ledger.mark_many(&fresh, &by_fp)).await {
            Ok(batch) => batch,
            Err(e) => {
                report.error(format!("ledger commit task failed: {e}"));
                return report;
            }
        };
        report.committed = batch.written();
        if !batch.is_complete() {
            report.warn(format!(
                "partial commit: {}/{} records marked; the rest may be notified again",
                batch.written(),
                batch.attempted()
            ));
        }

        report.enter(Stage::Done);
        report
    }
}
