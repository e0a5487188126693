// src/ingest/mod.rs
pub mod providers;
pub mod types;

use async_trait::async_trait;
use metrics::{counter, gauge};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ingest::types::{Acquired, Acquisition, FetchStats};

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("static tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static whitespace regex"));

/// Cap on normalized summary length (chars).
pub const MAX_TEXT_CHARS: usize = 4000;

/// Normalize feed text: decode entities, strip tags, fold typographic quotes,
/// collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let stripped = RE_TAGS.replace_all(&decoded, " ");

    let quoted = stripped
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    let mut out = RE_WS.replace_all(&quoted, " ").trim().to_string();
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

/// Several feeds behind one acquisition. A failing feed is logged and
/// counted; the others still contribute.
pub struct FeedSet {
    feeds: Vec<Box<dyn Acquisition>>,
}

impl FeedSet {
    pub fn new(feeds: Vec<Box<dyn Acquisition>>) -> Self {
        Self { feeds }
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

#[async_trait]
impl Acquisition for FeedSet {
    async fn fetch(&self) -> anyhow::Result<Acquired> {
        let mut out = Acquired::default();
        for feed in &self.feeds {
            match feed.fetch().await {
                Ok(mut got) => {
                    out.stats.fetched += got.stats.fetched;
                    out.stats.errors += got.stats.errors;
                    out.records.append(&mut got.records);
                }
                Err(e) => {
                    tracing::warn!(target: "ingest", error = ?e, feed = feed.name(), "feed fetch failed");
                    counter!("ingest_feed_errors_total").increment(1);
                    out.stats.errors += 1;
                }
            }
        }

        counter!("ingest_records_total").increment(out.records.len() as u64);
        gauge!("ingest_last_fetch_ts").set(chrono::Utc::now().timestamp() as f64);
        tracing::info!(
            target: "ingest",
            feeds = self.feeds.len(),
            fetched = out.stats.fetched,
            errors = out.stats.errors,
            "feeds fetched"
        );
        Ok(out)
    }

    fn name(&self) -> &str {
        "feeds"
    }
}

/// Fixed record list; handy for dry runs and tests.
pub struct StaticSource {
    name: String,
    records: Vec<crate::record::Record>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, records: Vec<crate::record::Record>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }
}

#[async_trait]
impl Acquisition for StaticSource {
    async fn fetch(&self) -> anyhow::Result<Acquired> {
        Ok(Acquired {
            records: self.records.clone(),
            stats: FetchStats {
                fetched: self.records.len(),
                errors: 0,
            },
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
