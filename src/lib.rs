// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod enrich;
pub mod entity;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod ingest;
pub mod ledger;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod record;

pub use crate::error::{ConfigError, DeliveryError, LedgerError, MatchError};
pub use crate::filter::{FilterEngine, MatchedRecord, Rule};
pub use crate::ledger::Ledger;
pub use crate::pipeline::{Pipeline, RunReport};
pub use crate::record::Record;
