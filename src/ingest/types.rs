// src/ingest/types.rs
use anyhow::Result;
use serde::Serialize;

use crate::record::Record;

/// Per-fetch counters reported by an acquisition source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    pub fetched: usize,
    /// Feeds or items that failed but did not abort the whole fetch.
    pub errors: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Acquired {
    pub records: Vec<Record>,
    pub stats: FetchStats,
}

/// A source of records. An `Err` means nothing could be fetched at all;
/// partial trouble is reported through `FetchStats::errors`.
#[async_trait::async_trait]
pub trait Acquisition: Send + Sync {
    async fn fetch(&self) -> Result<Acquired>;
    fn name(&self) -> &str;
}
