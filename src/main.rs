//! newswatch binary: loads config, starts the scheduled pipeline, the daily
//! ledger cleanup and the status HTTP server.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newswatch::api::{self, AppState};
use newswatch::config::AppConfig;
use newswatch::ledger::Ledger;
use newswatch::metrics::Metrics;
use newswatch::notify::{email::EmailSender, LogNotifier, Notifier};
use newswatch::pipeline::scheduler::{self, LastRun};
use newswatch::pipeline::Pipeline;

/// Compact logs by default, JSON lines with LOG_FORMAT=json.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newswatch=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

/// SMTP when configured. Without it startup fails unless NEWSWATCH_DRY_RUN
/// is set, in which case digests are only logged and nothing is committed.
fn build_notifier() -> Result<Arc<dyn Notifier>> {
    if EmailSender::configured() {
        return Ok(Arc::new(EmailSender::from_env()?));
    }
    let dry_run = std::env::var("NEWSWATCH_DRY_RUN")
        .is_ok_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
    if !dry_run {
        anyhow::bail!(
            "SMTP env not set (SMTP_HOST, SMTP_USER, SMTP_PASS, NOTIFY_EMAIL_FROM, NOTIFY_EMAIL_TO); \
             set NEWSWATCH_DRY_RUN=1 to only log digests"
        );
    }
    tracing::warn!(target: "notify", "dry run: digests are logged, never delivered or committed");
    Ok(Arc::new(LogNotifier))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load().context("loading config")?;
    let rules = cfg.rules().context("building rule set")?;
    tracing::info!(rules = rules.len(), feeds = cfg.feeds.len(), "config loaded");

    let metrics = Metrics::install()?;

    let ledger = Ledger::sqlite(&cfg.ledger.path)
        .with_context(|| format!("opening ledger at {}", cfg.ledger.path.display()))?
        .with_recent_limit(cfg.ledger.recent_limit);

    let sources = cfg.build_sources()?;
    if sources.is_empty() {
        tracing::warn!("no feeds configured; runs will fetch nothing");
    }

    let mut pipeline = Pipeline::new(Arc::new(sources), rules, ledger.clone(), build_notifier()?)?
        .with_read_policy(cfg.ledger.read_policy);
    if let Some(enricher) = cfg.enrichment.build_enricher()? {
        pipeline = pipeline.with_enricher(enricher, cfg.enrichment.settings());
    }

    let last_run: LastRun = Arc::default();
    let runs = scheduler::spawn_scheduler(Arc::new(pipeline), cfg.interval(), last_run.clone());
    let cleanup = scheduler::spawn_cleanup(
        ledger.clone(),
        cfg.retention(),
        Duration::from_secs(cfg.schedule.cleanup_interval_secs.max(60)),
    );

    if cfg.http.enabled {
        let app = api::app(AppState::new(ledger, last_run), &metrics);
        let listener = tokio::net::TcpListener::bind(&cfg.http.bind)
            .await
            .with_context(|| format!("binding {}", cfg.http.bind))?;
        tracing::info!(bind = %cfg.http.bind, "http server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
            .context("http server")?;
    } else {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("shutting down");
    runs.abort();
    cleanup.abort();
    Ok(())
}
