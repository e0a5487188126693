// src/pipeline/scheduler.rs
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{Pipeline, RunReport};
use crate::ledger::Ledger;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15 * 60);
pub const CLEANUP_PERIOD: Duration = Duration::from_secs(24 * 3600);

/// Most recent run report, shared with the HTTP status surface.
pub type LastRun = Arc<RwLock<Option<RunReport>>>;

/// Run the pipeline on a fixed interval. Each run is awaited before the next
/// tick is taken, so runs never overlap within the process.
pub fn spawn_scheduler(pipeline: Arc<Pipeline>, interval: Duration, last_run: LastRun) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(target: "pipeline", interval_secs = interval.as_secs(), "scheduler started");
        loop {
            ticker.tick().await;
            let report = pipeline.run_once().await;
            if let Ok(mut slot) = last_run.write() {
                *slot = Some(report);
            }
        }
    })
}

/// Daily ledger retention cleanup; the first pass runs immediately.
pub fn spawn_cleanup(ledger: Ledger, retention: chrono::Duration, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let l = ledger.clone();
            let res = tokio::task::spawn_blocking(move || l.cleanup(retention)).await;
            match res {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!(target: "ledger", error = %e, "ledger cleanup failed"),
                Err(e) => tracing::warn!(target: "ledger", error = %e, "ledger cleanup task panicked"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::presets;
    use crate::ingest::StaticSource;
    use crate::notify::LogNotifier;
    use crate::record::Record;

    #[tokio::test]
    async fn scheduler_publishes_last_run() {
        let source = StaticSource::new(
            "static",
            vec![Record::new("ABC Ltd wins award", "").with_link("http://n/1")],
        );
        let pipeline = Pipeline::new(
            Arc::new(source),
            vec![presets::awards_bagging()],
            Ledger::in_memory(),
            Arc::new(LogNotifier),
        )
        .unwrap();
        let last_run: LastRun = Arc::default();
        let handle = spawn_scheduler(Arc::new(pipeline), Duration::from_millis(20), last_run.clone());

        let mut seen = None;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if let Some(r) = last_run.read().unwrap().clone() {
                seen = Some(r);
                break;
            }
        }
        handle.abort();

        let report = seen.expect("scheduler produced a report");
        assert_eq!(report.matched, 1);
        // log-only delivery never commits
        assert!(!report.notified);
        assert_eq!(report.committed, 0);
    }
}
