// src/metrics.rs
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("filter_matches_total", "Records matched per rule application.");
        describe_counter!(
            "filter_eval_errors_total",
            "Conditions that could not be evaluated and counted as non-match."
        );
        describe_counter!("ingest_records_total", "Records produced by acquisition.");
        describe_counter!("ingest_feed_errors_total", "Feed fetch/parse errors.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("ingest_last_fetch_ts", "Unix ts of the last acquisition.");
        describe_counter!("ledger_writes_total", "Ledger entries written.");
        describe_counter!("ledger_write_failures_total", "Ledger entries that failed to write.");
        describe_counter!("ledger_cleanup_deleted_total", "Ledger entries removed by retention.");
        describe_gauge!("ledger_entries", "Ledger size at the last stats call.");
        describe_counter!("enrich_lookups_total", "Enrichment lookups by outcome.");
        describe_counter!("notify_sent_total", "Digests delivered.");
        describe_counter!("notify_failures_total", "Digest deliveries that failed.");
        describe_counter!("pipeline_runs_total", "Pipeline runs by outcome.");
        describe_histogram!("pipeline_run_ms", "Pipeline run time in milliseconds.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already set.
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Recorder-less handle for tests and embedding.
    pub fn detached() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        Self {
            handle: recorder.handle(),
        }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
