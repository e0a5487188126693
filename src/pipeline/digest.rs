// src/pipeline/digest.rs
//! Notification subject and HTML body for a batch of new records.

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::enrich::EnrichmentResult;
use crate::entity::extract_label;
use crate::filter::MatchedRecord;
use crate::fingerprint::is_internal_link;

const SUBJECT_PREFIX: &str = "[Market News] Update:";

const STYLE: &str = "body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
.header { background-color: #f4f4f4; padding: 20px; border-radius: 5px; border: 1px solid #ddd; }
.stats { background-color: #e8f5e8; padding: 20px; border-radius: 5px; margin: 20px 0; border: 1px solid #ddd; }
.record { border: 1px solid #ddd; margin: 15px 0; padding: 15px; border-radius: 5px; }
.record-title { color: #2c3e50; font-size: 18px; font-weight: bold; margin-bottom: 10px; }
.record-meta { font-size: 13px; margin-bottom: 10px; }
.enrichment { background-color: #f8f9fa; padding: 15px; border-radius: 5px; margin-top: 15px; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
.footer { margin-top: 30px; padding-top: 20px; border-top: 1px solid #ddd; font-size: 12px; }";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub html: String,
}

pub fn subject_for(records: &[MatchedRecord]) -> String {
    match records {
        [one] => format!("{SUBJECT_PREFIX} {}", extract_label(&one.record.title)),
        many => format!("{SUBJECT_PREFIX} {} companies", many.len()),
    }
}

fn scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "N/A".to_string(),
        other => other.to_string(),
    }
}

fn render_enrichment(out: &mut String, label: &str, result: &EnrichmentResult) {
    out.push_str("<div class=\"enrichment\">");
    match result {
        EnrichmentResult::Data(Value::Object(map)) => {
            let _ = write!(out, "<h4>Data for {}</h4><table>", encode_text(label));
            for (k, v) in map {
                let _ = write!(
                    out,
                    "<tr><th>{}</th><td>{}</td></tr>",
                    encode_text(k),
                    encode_text(&scalar(v))
                );
            }
            out.push_str("</table>");
        }
        EnrichmentResult::Data(other) => {
            let _ = write!(
                out,
                "<h4>Data for {}</h4><pre>{}</pre>",
                encode_text(label),
                encode_text(&other.to_string())
            );
        }
        EnrichmentResult::Error { error } => {
            let _ = write!(
                out,
                "<p><strong>Data unavailable:</strong> {}</p>",
                encode_text(error)
            );
        }
    }
    out.push_str("</div>");
}

/// Build the digest. Every piece of record text is HTML-escaped.
pub fn compose(
    records: &[MatchedRecord],
    enrichment: &BTreeMap<String, EnrichmentResult>,
    generated_at: DateTime<Utc>,
) -> Digest {
    let ok = enrichment.values().filter(|r| r.is_ok()).count();
    let failed = enrichment.len() - ok;

    let mut html = String::with_capacity(2048 + records.len() * 1024);
    let _ = write!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><style>{STYLE}</style></head><body>"
    );
    let _ = write!(
        html,
        "<div class=\"header\"><h1>Announcement Alert</h1><ul>\
         <li><strong>Generated:</strong> {}</li>\
         <li><strong>New records:</strong> {}</li></ul></div>",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        records.len()
    );
    let _ = write!(
        html,
        "<div class=\"stats\"><h2>Summary</h2><ul>\
         <li><strong>New records:</strong> {}</li>\
         <li><strong>Enriched:</strong> {ok}</li>\
         <li><strong>Enrichment errors:</strong> {failed}</li></ul></div>",
        records.len()
    );

    for (i, m) in records.iter().enumerate() {
        let r = &m.record;
        let label = extract_label(&r.title);
        let published = if r.published.is_empty() {
            "Unknown date"
        } else {
            r.published.as_str()
        };

        let _ = write!(
            html,
            "<div class=\"record\"><div class=\"record-title\">{}. {}</div>\
             <div class=\"record-meta\">Published: {} | Company: {} | Rule: {}</div>\
             <div><strong>Summary:</strong> {}</div>",
            i + 1,
            encode_text(&r.title),
            encode_text(published),
            encode_text(&label),
            encode_text(&m.rule_name),
            encode_text(&r.summary)
        );
        match r.link.as_deref() {
            Some(link) if !link.is_empty() && !is_internal_link(link) => {
                let _ = write!(
                    html,
                    "<p><a href=\"{}\">Read full announcement</a></p>",
                    encode_double_quoted_attribute(link)
                );
            }
            _ => {}
        }
        if let Some(result) = enrichment.get(&label) {
            render_enrichment(&mut html, &label, result);
        }
        html.push_str("</div>");
    }

    html.push_str(
        "<div class=\"footer\"><p>Generated automatically by newswatch.</p>\
         <p>Only records not previously notified are included.</p></div></body></html>",
    );

    Digest {
        subject: subject_for(records),
        html,
    }
}
