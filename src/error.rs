// src/error.rs
//! Error taxonomy shared by the filter engine, the ledger and the pipeline.
//!
//! Adapters (RSS, SMTP, enrichment HTTP) and the binary stay on `anyhow`;
//! these typed errors are for the places where callers branch on the kind.

use thiserror::Error;

/// Rule-authoring and configuration mistakes. Always fail fast.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid regex pattern `{pattern}`: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown preset rule `{0}`")]
    UnknownPreset(String),

    #[error("duplicate rule name `{0}`")]
    DuplicateRule(String),

    #[error("rule `{rule}` references unknown field `{field}`")]
    UnknownField { rule: String, field: String },

    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to parse json rules: {0}")]
    ParseJson(#[from] serde_json::Error),
}

/// Outcome of a single condition that could not be evaluated.
///
/// `Config` escapes the batch (bad rule); `Evaluation` is swallowed by the
/// engine and counted as a non-match.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot apply `{operator}` to list field `{field}`")]
    Evaluation { field: String, operator: &'static str },
}

/// Ledger read/write failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("ledger storage unavailable: {0}")]
    Unavailable(String),
}

/// Notification could not be delivered; blocks the ledger commit.
#[derive(Debug, Error)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);
