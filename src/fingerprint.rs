// src/fingerprint.rs
//! Content fingerprints: the identity the ledger de-duplicates on.
//!
//! `fingerprint(title, summary, link)` hashes `title|summary|stabilizer` with
//! SHA-256, where the stabilizer is the first 100 characters of a real link.
//! Tracking-parameter drift past that prefix collapses to the same token.
//! Synthesized `internal://` links never reach the hash.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Scheme used for placeholder links on records that arrived without one.
pub const INTERNAL_LINK_SCHEME: &str = "internal://";

/// Number of link characters folded into the fingerprint.
pub const LINK_STABILIZER_CHARS: usize = 100;

/// Fixed-width (64 hex chars) content identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already-computed token (e.g. read back from storage).
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn is_internal_link(link: &str) -> bool {
    link.starts_with(INTERNAL_LINK_SCHEME)
}

fn stabilizer(link: Option<&str>) -> &str {
    match link {
        Some(l) if !l.is_empty() && !is_internal_link(l) => {
            match l.char_indices().nth(LINK_STABILIZER_CHARS) {
                Some((cut, _)) => &l[..cut],
                None => l,
            }
        }
        _ => "",
    }
}

/// Deterministic identity token for a record's stable content.
pub fn fingerprint(title: &str, summary: &str, link: Option<&str>) -> Fingerprint {
    let content = format!(
        "{}|{}|{}",
        title.trim(),
        summary.trim(),
        stabilizer(link)
    );

    let digest = Sha256::digest(content.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    Fingerprint(out)
}

/// Placeholder display link for a record without one.
///
/// The trailing discriminator differs on every call, so this must only be
/// assigned after (or independently of) fingerprinting; the `internal://`
/// scheme keeps it out of `fingerprint` either way.
pub fn synthesize_link(source: &str, title: &str) -> String {
    static SEQ: AtomicU64 = AtomicU64::new(0);

    let slug = |s: &str, max: usize| -> String {
        s.chars()
            .take(max)
            .collect::<String>()
            .replace(' ', "-")
            .to_lowercase()
    };
    let source_part = if source.trim().is_empty() {
        "unknown".to_string()
    } else {
        slug(source.trim(), 40)
    };
    let title_part = if title.trim().is_empty() {
        "no-title".to_string()
    } else {
        slug(title.trim(), 50)
    };

    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);

    format!("{INTERNAL_LINK_SCHEME}{source_part}/{title_part}/{nanos:x}{seq:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_token() {
        for (t, s, l) in [
            ("", "", None),
            ("", "", Some("")),
            ("ABC Ltd wins award", "summary", Some("http://n/1")),
            ("  padded  ", "\tsum\n", Some("https://example.test/a?b=c")),
        ] {
            assert_eq!(fingerprint(t, s, l), fingerprint(t, s, l));
        }
    }

    #[test]
    fn token_is_fixed_width_hex() {
        let fp = fingerprint("a", "b", Some("http://x"));
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(
            fingerprint("  Title ", " Sum ", None),
            fingerprint("Title", "Sum", None)
        );
    }

    #[test]
    fn link_beyond_prefix_is_ignored() {
        let base = format!("http://n/1?ref={}", "x".repeat(85));
        assert_eq!(base.chars().count(), 100);
        let a = format!("{base}&utm=a");
        let b = format!("{base}&utm=b-and-more");
        assert_eq!(fingerprint("t", "s", Some(&a)), fingerprint("t", "s", Some(&b)));
        assert_ne!(
            fingerprint("t", "s", Some(&a)),
            fingerprint("t", "s", Some("http://n/2"))
        );
    }

    #[test]
    fn internal_links_hash_like_no_link() {
        let synthetic = synthesize_link("NSE Feed", "Some title");
        assert!(is_internal_link(&synthetic));
        assert_eq!(
            fingerprint("t", "s", Some(&synthetic)),
            fingerprint("t", "s", None)
        );
    }

    #[test]
    fn synthesized_links_differ_per_call() {
        let a = synthesize_link("NSE", "Same");
        let b = synthesize_link("NSE", "Same");
        assert_ne!(a, b);
        assert!(a.starts_with("internal://nse/same/"));
    }
}
