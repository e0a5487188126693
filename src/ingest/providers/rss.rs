// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;

use crate::fingerprint::synthesize_link;
use crate::ingest::normalize_text;
use crate::ingest::types::{Acquired, Acquisition, FetchStats};
use crate::record::Record;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    author: Option<String>,
    guid: Option<Guid>,
    #[serde(rename = "category", default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text", default)]
    value: String,
}

/// HTTP settings for live feeds.
#[derive(Debug, Clone, Copy)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(30),
        }
    }
}

pub struct RssFeed {
    name: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssFeed {
    /// Parse inline XML instead of fetching.
    pub fn from_fixture_str(name: impl Into<String>, xml: &str) -> Self {
        Self {
            name: name.into(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(name: impl Into<String>, url: impl Into<String>, timeouts: HttpTimeouts) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.request)
            .user_agent(concat!("newswatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building rss http client")?;
        Ok(Self {
            name: name.into(),
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        })
    }

    fn parse_items_from_str(&self, s: &str) -> Result<Vec<Record>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean)
            .with_context(|| format!("parsing rss xml for feed {}", self.name))?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            let summary = normalize_text(it.description.as_deref().unwrap_or_default());
            if title.is_empty() && summary.is_empty() {
                tracing::debug!(target: "ingest", feed = %self.name, "skipping empty rss item");
                continue;
            }

            let link = match it.link.map(|l| l.trim().to_string()) {
                Some(l) if !l.is_empty() => l,
                _ => synthesize_link(&self.name, &title),
            };

            out.push(Record {
                title,
                summary,
                link: Some(link),
                published: it.pub_date.map(|d| d.trim().to_string()).unwrap_or_default(),
                source: self.name.clone(),
                author: it
                    .author
                    .map(|a| normalize_text(&a))
                    .filter(|a| !a.is_empty()),
                tags: it
                    .categories
                    .iter()
                    .map(|c| normalize_text(c))
                    .filter(|c| !c.is_empty())
                    .collect(),
                guid: it
                    .guid
                    .map(|g| g.value.trim().to_string())
                    .filter(|g| !g.is_empty()),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        Ok(out)
    }
}

#[async_trait]
impl Acquisition for RssFeed {
    async fn fetch(&self) -> Result<Acquired> {
        let records = match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s)?,
            Mode::Http { url, client } => {
                let resp = match client
                    .get(url.as_str())
                    .header(
                        reqwest::header::ACCEPT,
                        "application/rss+xml, application/xml, text/xml, */*",
                    )
                    .send()
                    .await
                {
                    Ok(resp) => resp,
                    Err(e) => {
                        tracing::warn!(target: "ingest", error = ?e, feed = %self.name, "rss http error");
                        counter!("ingest_feed_errors_total").increment(1);
                        return Err(e).context("rss http get()");
                    }
                };
                let body = resp
                    .error_for_status()
                    .context("rss http status")?
                    .text()
                    .await
                    .context("rss http .text()")?;
                self.parse_items_from_str(&body)?
            }
        };

        Ok(Acquired {
            stats: FetchStats {
                fetched: records.len(),
                errors: 0,
            },
            records,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Named HTML entities that show up in feeds but are not valid XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
