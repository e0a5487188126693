// src/filter/rule.rs
//! Rule and condition types.
//!
//! TOML shape (see `filter::config`):
//! ```toml
//! [[filter.rules]]
//! name = "Orders"
//! priority = 2
//! conditions = [
//!   { field = "title", value = "order", combinator = "or" },
//!   { field = "summary", value = "(?:bag|win)s? .*order", match_type = "regex", combinator = "or" },
//! ]
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Contains,
    Exact,
    StartsWith,
    EndsWith,
    Regex,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Contains => "contains",
            MatchType::Exact => "exact",
            MatchType::StartsWith => "starts_with",
            MatchType::EndsWith => "ends_with",
            MatchType::Regex => "regex",
        }
    }
}

/// Per-condition operator used by the left-to-right fold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    #[serde(alias = "AND")]
    And,
    #[serde(alias = "OR")]
    Or,
    #[serde(alias = "NOT")]
    Not,
}

/// A single predicate over one record field. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    field: String,
    value: String,
    #[serde(default)]
    match_type: MatchType,
    #[serde(default)]
    case_sensitive: bool,
    #[serde(default, alias = "operator")]
    combinator: Combinator,
}

impl Condition {
    /// Case-insensitive `contains` joined with AND.
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            match_type: MatchType::Contains,
            case_sensitive: false,
            combinator: Combinator::And,
        }
    }

    pub fn matching(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    pub fn combined_with(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }
}

fn default_priority() -> i32 {
    1
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Higher runs first in `apply_rules`.
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Rule {
    pub fn new(name: impl Into<String>, conditions: Vec<Condition>, priority: i32) -> Self {
        Self {
            name: name.into(),
            conditions,
            priority,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Inactive or empty rules never match.
    pub fn can_match(&self) -> bool {
        self.active && !self.conditions.is_empty()
    }
}

/// A record copy tagged with the rule that selected it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedRecord {
    pub record: Record,
    pub rule_name: String,
    pub priority: i32,
}

impl AsRef<Record> for MatchedRecord {
    fn as_ref(&self) -> &Record {
        &self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_defaults_from_toml() {
        #[derive(Deserialize)]
        struct Wrap {
            c: Condition,
        }
        let w: Wrap = toml::from_str(r#"c = { field = "title", value = "award" }"#).unwrap();
        assert_eq!(w.c, Condition::new("title", "award"));

        let w: Wrap = toml::from_str(
            r#"c = { field = "link", value = "^https", match_type = "regex", case_sensitive = true, operator = "NOT" }"#,
        )
        .unwrap();
        assert_eq!(w.c.match_type(), MatchType::Regex);
        assert!(w.c.is_case_sensitive());
        assert_eq!(w.c.combinator(), Combinator::Not);
    }

    #[test]
    fn rule_defaults() {
        let r: Rule = toml::from_str(
            r#"
name = "X"
conditions = [{ field = "title", value = "x" }]
"#,
        )
        .unwrap();
        assert_eq!(r.priority, 1);
        assert!(r.active);
        assert!(r.can_match());
        assert!(!Rule::new("empty", vec![], 1).can_match());
        assert!(!r.clone().inactive().can_match());
    }
}
