// src/api.rs
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::ledger::{Ledger, LedgerStats};
use crate::metrics::Metrics;
use crate::pipeline::scheduler::LastRun;
use crate::pipeline::RunReport;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub last_run: LastRun,
}

impl AppState {
    pub fn new(ledger: Ledger, last_run: LastRun) -> Self {
        Self { ledger, last_run }
    }
}

#[derive(Serialize)]
struct StatsResp {
    ledger: LedgerStats,
    last_run: Option<RunReport>,
}

/// `/health` and `/stats`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/stats", get(stats))
        .with_state(state)
}

/// Status routes plus `/metrics`.
pub fn app(state: AppState, metrics: &Metrics) -> Router {
    router(state).merge(metrics.router())
}

async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.ledger.clone();
    let res = tokio::task::spawn_blocking(move || ledger.stats()).await;

    let stats = match res {
        Ok(Ok(s)) => s,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "ledger stats unavailable");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let last_run = state.last_run.read().ok().and_then(|g| g.clone());
    Json(StatsResp {
        ledger: stats,
        last_run,
    })
    .into_response()
}
