// src/entity.rs
//! Company/entity label derived from an announcement title.
//! Used for ledger labels, enrichment lookups and digest subjects.

use once_cell::sync::Lazy;
use regex::Regex;

pub const UNKNOWN_ENTITY: &str = "Unknown Company";

static RE_COMPANY: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^([^-]+Limited)",
        r"(?i)^([^-]+Ltd)",
        r"(?i)^([A-Za-z0-9\s&\(\)\.]+?(?:Limited|Ltd))",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static company regex"))
    .collect()
});

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static whitespace regex"));

const SEPARATORS: &[&str] = &[" has informed", " informs", "-", "|"];

pub fn extract_label(title: &str) -> String {
    let cleaned = title.trim();
    if cleaned.is_empty() {
        return UNKNOWN_ENTITY.to_string();
    }

    for re in RE_COMPANY.iter() {
        if let Some(m) = re.captures(cleaned).and_then(|c| c.get(1)) {
            return RE_WS.replace_all(m.as_str().trim(), " ").into_owned();
        }
    }

    for sep in SEPARATORS {
        if let Some((head, _)) = cleaned.split_once(sep) {
            let head = head.trim();
            if head.chars().count() > 3 {
                return head.to_string();
            }
        }
    }

    cleaned.chars().take(50).collect::<String>().trim().to_string()
}
