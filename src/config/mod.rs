// src/config/mod.rs
//! Application config: `config/newswatch.toml`, overridable via env.
//!
//! Resolution order for the file:
//! 1) $NEWSWATCH_CONFIG_PATH (must exist)
//! 2) config/newswatch.toml
//! 3) built-in defaults
//!
//! Scalar overrides applied afterwards: `NEWSWATCH_INTERVAL_SECS`,
//! `NEWSWATCH_LEDGER_PATH`. SMTP settings are read from env by the notifier.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::enrich::http::HttpEnricher;
use crate::enrich::{Enricher, EnrichmentSettings};
use crate::error::ConfigError;
use crate::filter::config::FilterConfig;
use crate::filter::Rule;
use crate::ingest::providers::rss::{HttpTimeouts, RssFeed};
use crate::ingest::types::Acquisition;
use crate::ingest::FeedSet;
use crate::pipeline::ReadPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "config/newswatch.toml";
pub const ENV_CONFIG_PATH: &str = "NEWSWATCH_CONFIG_PATH";
pub const ENV_INTERVAL_SECS: &str = "NEWSWATCH_INTERVAL_SECS";
pub const ENV_LEDGER_PATH: &str = "NEWSWATCH_LEDGER_PATH";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 900,
            cleanup_interval_secs: 24 * 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub path: PathBuf,
    pub recent_limit: usize,
    pub retention_days: i64,
    pub read_policy: ReadPolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/processed_hashes.db"),
            recent_limit: crate::ledger::DEFAULT_RECENT_LIMIT,
            retention_days: 30,
            read_policy: ReadPolicy::FailOpen,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    /// Name of the env var holding a bearer token, if the endpoint needs one.
    pub api_key_env: Option<String>,
    pub max_requests: usize,
    pub attempts: u32,
    pub backoff_secs: u64,
    pub timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        let s = EnrichmentSettings::default();
        Self {
            enabled: s.enabled,
            endpoint: None,
            api_key_env: None,
            max_requests: s.max_requests,
            attempts: s.attempts,
            backoff_secs: s.backoff.as_secs(),
            timeout_secs: 60,
        }
    }
}

impl EnrichmentConfig {
    pub fn settings(&self) -> EnrichmentSettings {
        EnrichmentSettings {
            enabled: self.enabled,
            max_requests: self.max_requests,
            attempts: self.attempts.max(1),
            backoff: Duration::from_secs(self.backoff_secs),
        }
    }

    /// `None` when disabled. Enabled without an endpoint is an error.
    pub fn build_enricher(&self) -> Result<Option<Arc<dyn Enricher>>> {
        if !self.enabled {
            return Ok(None);
        }
        let endpoint = self
            .endpoint
            .clone()
            .ok_or_else(|| anyhow!("enrichment.enabled = true but enrichment.endpoint is not set"))?;
        let api_key = match &self.api_key_env {
            Some(var) => Some(std::env::var(var).with_context(|| format!("missing {var} env var"))?),
            None => None,
        };
        let e = HttpEnricher::new(endpoint, api_key, Duration::from_secs(self.timeout_secs))?;
        Ok(Some(Arc::new(e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Local RSS file, read once at startup (offline runs).
    #[serde(default)]
    pub fixture_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub enabled: bool,
    pub bind: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0:8080".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub schedule: ScheduleConfig,
    pub ledger: LedgerConfig,
    pub enrichment: EnrichmentConfig,
    pub filter: FilterConfig,
    pub feeds: Vec<FeedConfig>,
    pub http: HttpConfig,
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// File (env path, then default path, then defaults) plus env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display()));
            }
            Self::load_from(&pb)?
        } else {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default.exists() {
                Self::load_from(&default)?
            } else {
                tracing::info!("no config file found; using defaults");
                Self::default()
            }
        };
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var(ENV_INTERVAL_SECS) {
            let secs: u64 = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_INTERVAL_SECS} must be a positive integer"))?;
            if secs == 0 {
                return Err(anyhow!("{ENV_INTERVAL_SECS} must be > 0"));
            }
            self.schedule.interval_secs = secs;
        }
        if let Ok(p) = std::env::var(ENV_LEDGER_PATH) {
            if !p.trim().is_empty() {
                self.ledger.path = PathBuf::from(p.trim());
            }
        }
        Ok(())
    }

    pub fn rules(&self) -> Result<Vec<Rule>, ConfigError> {
        self.filter.build()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_secs.max(1))
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.ledger.retention_days.max(1))
    }

    pub fn timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_secs(self.http.connect_timeout_secs),
            request: Duration::from_secs(self.http.request_timeout_secs),
        }
    }

    /// One acquisition per configured feed. A feed needs a `url` or a
    /// `fixture_path`.
    pub fn build_sources(&self) -> Result<FeedSet> {
        let mut feeds: Vec<Box<dyn Acquisition>> = Vec::with_capacity(self.feeds.len());
        for f in &self.feeds {
            let feed = match (&f.url, &f.fixture_path) {
                (Some(url), _) => RssFeed::from_url(&f.name, url, self.timeouts())?,
                (None, Some(path)) => {
                    let xml = std::fs::read_to_string(path)
                        .with_context(|| format!("reading fixture feed {}", path.display()))?;
                    RssFeed::from_fixture_str(&f.name, &xml)
                }
                (None, None) => return Err(anyhow!("feed `{}` has neither url nor fixture_path", f.name)),
            };
            feeds.push(Box::new(feed));
        }
        Ok(FeedSet::new(feeds))
    }
}
