// src/filter/presets.rs
//! Rules shipped with the crate, addressable by name from config.

use super::rule::{Combinator, Condition, Rule};

pub const AWARDS_BAGGING: &str = "Awards/Bagging";
pub const CONTRACTS: &str = "Contracts";
pub const REGULATION_30: &str = "Regulation 30";

/// OR of case-insensitive `contains` for every (field, term) pair.
fn any_of(fields: &[&str], terms: &[&str]) -> Vec<Condition> {
    let mut out = Vec::with_capacity(fields.len() * terms.len());
    for field in fields {
        for term in terms {
            out.push(Condition::new(*field, *term).combined_with(Combinator::Or));
        }
    }
    out
}

pub fn awards_bagging() -> Rule {
    Rule::new(
        AWARDS_BAGGING,
        any_of(&["title", "summary", "link"], &["award", "bagging"]),
        5,
    )
}

pub fn contracts() -> Rule {
    Rule::new(
        CONTRACTS,
        any_of(&["title", "summary", "link"], &["contract"]),
        4,
    )
}

pub fn regulation_30() -> Rule {
    Rule::new(
        REGULATION_30,
        any_of(&["title", "summary", "link"], &["regulation 30"]),
        3,
    )
}

pub fn all() -> Vec<Rule> {
    vec![awards_bagging(), contracts(), regulation_30()]
}

pub fn by_name(name: &str) -> Option<Rule> {
    match name {
        AWARDS_BAGGING => Some(awards_bagging()),
        CONTRACTS => Some(contracts()),
        REGULATION_30 => Some(regulation_30()),
        _ => None,
    }
}

/// Simple keyword rule: any keyword in title or summary.
pub fn keyword_rule<S: AsRef<str>>(keywords: &[S], name: &str, priority: i32) -> Rule {
    let mut conditions = Vec::with_capacity(keywords.len() * 2);
    for kw in keywords {
        let kw = kw.as_ref();
        conditions.push(Condition::new("title", kw).combined_with(Combinator::Or));
        conditions.push(Condition::new("summary", kw).combined_with(Combinator::Or));
    }
    Rule::new(name, conditions, priority)
}
