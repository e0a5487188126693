// src/record.rs
use serde::{Deserialize, Serialize};

use crate::fingerprint::{self, Fingerprint};

/// One news-like item as produced by an acquisition adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub title: String,
    pub summary: String,
    /// True link from the feed, or a synthesized `internal://` placeholder.
    pub link: Option<String>,
    /// Free-text date as published by the source.
    pub published: String,
    pub source: String,
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub guid: Option<String>,
}

/// Borrowed view of a record field for condition matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    List(&'a [String]),
}

/// Field names a condition may address.
pub const FIELD_NAMES: &[&str] = &[
    "title",
    "summary",
    "link",
    "published",
    "source",
    "source_feed",
    "author",
    "tags",
    "guid",
];

impl Record {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            ..Default::default()
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_known_field(name: &str) -> bool {
        FIELD_NAMES.contains(&name)
    }

    /// Field lookup used only by the condition matcher.
    /// Unknown names and absent optional fields both come back as `None`.
    pub fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "title" => Some(FieldValue::Text(&self.title)),
            "summary" => Some(FieldValue::Text(&self.summary)),
            // placeholder links are display-only; the record has no real link
            "link" => self
                .link
                .as_deref()
                .filter(|l| !fingerprint::is_internal_link(l))
                .map(FieldValue::Text),
            "published" => Some(FieldValue::Text(&self.published)),
            "source" | "source_feed" => Some(FieldValue::Text(&self.source)),
            "author" => self.author.as_deref().map(FieldValue::Text),
            "tags" => Some(FieldValue::List(&self.tags)),
            "guid" => self.guid.as_deref().map(FieldValue::Text),
            _ => None,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint::fingerprint(&self.title, &self.summary, self.link.as_deref())
    }

    /// Identity used to de-duplicate matches across rules: the link when
    /// present, otherwise the content fingerprint.
    pub fn identity(&self) -> String {
        match self.link.as_deref() {
            Some(link) if !link.is_empty() => link.to_string(),
            _ => self.fingerprint().into_string(),
        }
    }
}

impl AsRef<Record> for Record {
    fn as_ref(&self) -> &Record {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_lookup_covers_optional_and_aliases() {
        let mut r = Record::new("T", "S").with_source("NSE");
        assert_eq!(r.field("title"), Some(FieldValue::Text("T")));
        assert_eq!(r.field("source_feed"), Some(FieldValue::Text("NSE")));
        assert_eq!(r.field("link"), None);
        assert_eq!(r.field("author"), None);
        assert_eq!(r.field("nope"), None);

        r.author = Some("desk".into());
        assert_eq!(r.field("author"), Some(FieldValue::Text("desk")));
    }

    #[test]
    fn synthesized_link_reads_as_missing() {
        let r = Record::new("Board meeting outcome", "")
            .with_link(fingerprint::synthesize_link("NSE", "Board meeting outcome"));
        assert_eq!(r.field("link"), None);

        let real = Record::new("T", "").with_link("https://exchange.test/a");
        assert_eq!(real.field("link"), Some(FieldValue::Text("https://exchange.test/a")));
    }

    #[test]
    fn identity_falls_back_to_fingerprint() {
        let a = Record::new("A", "x");
        let b = Record::new("B", "x");
        assert_ne!(a.identity(), b.identity());

        let linked = Record::new("A", "x").with_link("http://n/1");
        assert_eq!(linked.identity(), "http://n/1");
    }
}
