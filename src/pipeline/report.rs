// src/pipeline/report.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Filter,
    Dedup,
    Enrich,
    Notify,
    Commit,
    Done,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Last stage entered.
    pub stage: Stage,
    pub fetched: usize,
    pub matched: usize,
    pub new: usize,
    pub enriched_ok: usize,
    pub enriched_failed: usize,
    pub notified: bool,
    pub committed: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub success: bool,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            stage: Stage::Fetch,
            fetched: 0,
            matched: 0,
            new: 0,
            enriched_ok: 0,
            enriched_failed: 0,
            notified: false,
            committed: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
            success: true,
        }
    }

    pub fn enter(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        warn!(target: "pipeline", stage = ?self.stage, "{msg}");
        self.warnings.push(msg);
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        tracing::error!(target: "pipeline", stage = ?self.stage, "{msg}");
        self.errors.push(msg);
    }

    /// Stamp the finish time and derive `success` from the error list.
    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self.success = self.errors.is_empty();
        self
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|f| (f - self.started_at).num_milliseconds())
    }

    pub fn log(&self) {
        info!(
            target: "pipeline",
            success = self.success,
            stage = ?self.stage,
            fetched = self.fetched,
            matched = self.matched,
            new = self.new,
            enriched_ok = self.enriched_ok,
            enriched_failed = self.enriched_failed,
            notified = self.notified,
            committed = self.committed,
            warnings = self.warnings.len(),
            errors = self.errors.len(),
            duration_ms = self.duration_ms().unwrap_or_default(),
            "run finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_fail_a_run() {
        let mut r = RunReport::start();
        r.warn("one feed failed");
        let r = r.finish();
        assert!(r.success);
        assert!(r.finished_at.is_some());

        let mut r = RunReport::start();
        r.error("notification failed");
        assert!(!r.finish().success);
    }

    #[test]
    fn stages_are_ordered() {
        assert!(Stage::Fetch < Stage::Notify);
        assert!(Stage::Commit < Stage::Done);
    }
}
