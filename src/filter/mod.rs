// src/filter/mod.rs
//! Rule-matching filter engine.
//!
//! - `matches`:     one condition against one record
//! - `evaluate`:    a rule's conditions folded strictly left to right
//! - `apply_rule`:  one rule over a batch, matches annotated with the rule
//! - `apply_rules`: many rules by priority; a record is emitted at most once
//!
//! Compiled regexes are cached per engine instance, keyed by
//! (pattern, case-insensitive). The cache is never evicted; patterns come from
//! operator-authored config, so its size is bounded by the rule set.

pub mod config;
pub mod presets;
pub mod rule;

use metrics::counter;
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, MatchError};
use crate::record::{FieldValue, Record};

pub use rule::{Combinator, Condition, MatchType, MatchedRecord, Rule};

#[derive(Debug, Default)]
pub struct FilterEngine {
    regex_cache: RwLock<HashMap<(String, bool), Regex>>,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct (pattern, flag) pairs compiled so far.
    pub fn cached_patterns(&self) -> usize {
        self.regex_cache.read().map(|c| c.len()).unwrap_or(0)
    }

    fn compile(&self, pattern: &str, case_insensitive: bool) -> Result<Regex, ConfigError> {
        let key = (pattern.to_string(), case_insensitive);
        if let Ok(cache) = self.regex_cache.read() {
            if let Some(re) = cache.get(&key) {
                return Ok(re.clone());
            }
        }

        let re = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|source| {
                warn!(target: "filter", %pattern, error = %source, "invalid regex pattern");
                ConfigError::InvalidRegex {
                    pattern: pattern.to_string(),
                    source,
                }
            })?;

        if let Ok(mut cache) = self.regex_cache.write() {
            cache.entry(key).or_insert_with(|| re.clone());
        }
        Ok(re)
    }

    /// Compile every regex condition up front so a bad pattern surfaces at
    /// load time instead of mid-run.
    pub fn precompile(&self, rules: &[Rule]) -> Result<(), ConfigError> {
        for rule in rules {
            for cond in &rule.conditions {
                if cond.match_type() == MatchType::Regex {
                    self.compile(cond.value(), !cond.is_case_sensitive())?;
                }
            }
        }
        Ok(())
    }

    fn compare_text(&self, text: &str, cond: &Condition) -> Result<bool, ConfigError> {
        if cond.match_type() == MatchType::Regex {
            let re = self.compile(cond.value(), !cond.is_case_sensitive())?;
            return Ok(re.is_match(text));
        }

        let (hay, needle): (Cow<'_, str>, Cow<'_, str>) = if cond.is_case_sensitive() {
            (Cow::Borrowed(text), Cow::Borrowed(cond.value()))
        } else {
            (
                Cow::Owned(text.to_lowercase()),
                Cow::Owned(cond.value().to_lowercase()),
            )
        };

        Ok(match cond.match_type() {
            MatchType::Contains => hay.contains(needle.as_ref()),
            MatchType::Exact => hay == needle,
            MatchType::StartsWith => hay.starts_with(needle.as_ref()),
            MatchType::EndsWith => hay.ends_with(needle.as_ref()),
            MatchType::Regex => false,
        })
    }

    /// Evaluate one condition, surfacing both error kinds.
    pub fn try_matches(&self, record: &Record, cond: &Condition) -> Result<bool, MatchError> {
        let Some(value) = record.field(cond.field()) else {
            return Ok(false);
        };

        match value {
            FieldValue::Text(text) => Ok(self.compare_text(text, cond)?),
            FieldValue::List(items) => match cond.match_type() {
                MatchType::Contains | MatchType::Regex => {
                    for item in items {
                        if self.compare_text(item, cond)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                other => Err(MatchError::Evaluation {
                    field: cond.field().to_string(),
                    operator: other.as_str(),
                }),
            },
        }
    }

    /// Evaluate one condition. Configuration errors propagate; anything else
    /// is logged and counted as a non-match.
    pub fn matches(&self, record: &Record, cond: &Condition) -> Result<bool, ConfigError> {
        match self.try_matches(record, cond) {
            Ok(hit) => Ok(hit),
            Err(MatchError::Config(e)) => Err(e),
            Err(e @ MatchError::Evaluation { .. }) => {
                warn!(
                    target: "filter",
                    field = cond.field(),
                    value = cond.value(),
                    error = %e,
                    "condition evaluation failed; treating as non-match"
                );
                counter!("filter_eval_errors_total").increment(1);
                Ok(false)
            }
        }
    }

    /// Fold a rule's conditions left to right.
    ///
    /// NOT inverts a condition's own result before folding. From the second
    /// condition on, AND/OR combine into the accumulator; a NOT condition past
    /// the first leaves the accumulator as is. There is no precedence and no
    /// grouping, so mixed AND/OR rules are order dependent.
    pub fn evaluate(&self, record: &Record, rule: &Rule) -> Result<bool, ConfigError> {
        if !rule.can_match() {
            return Ok(false);
        }

        let mut acc: Option<bool> = None;
        for cond in &rule.conditions {
            let mut hit = self.matches(record, cond)?;
            if cond.combinator() == Combinator::Not {
                hit = !hit;
            }
            acc = Some(match acc {
                None => hit,
                Some(prev) => match cond.combinator() {
                    Combinator::And => prev && hit,
                    Combinator::Or => prev || hit,
                    Combinator::Not => prev,
                },
            });
        }
        Ok(acc.unwrap_or(false))
    }

    /// Records matched by `rule`, annotated, in input order.
    pub fn apply_rule(
        &self,
        records: &[Record],
        rule: &Rule,
    ) -> Result<Vec<MatchedRecord>, ConfigError> {
        if !rule.can_match() {
            debug!(target: "filter", rule = %rule.name, "rule inactive or empty; skipping");
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for record in records {
            if self.evaluate(record, rule)? {
                out.push(MatchedRecord {
                    record: record.clone(),
                    rule_name: rule.name.clone(),
                    priority: rule.priority,
                });
            }
        }

        info!(
            target: "filter",
            rule = %rule.name,
            matched = out.len(),
            total = records.len(),
            "rule applied"
        );
        counter!("filter_matches_total").increment(out.len() as u64);
        Ok(out)
    }

    /// Apply all active rules, highest priority first (ties keep declaration
    /// order). A record already emitted by an earlier rule is not emitted
    /// again.
    pub fn apply_rules(
        &self,
        records: &[Record],
        rules: &[Rule],
    ) -> Result<Vec<MatchedRecord>, ConfigError> {
        let mut ordered: Vec<&Rule> = rules.iter().filter(|r| r.active).collect();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        for rule in &ordered {
            for m in self.apply_rule(records, rule)? {
                if seen.insert(m.record.identity()) {
                    out.push(m);
                }
            }
        }

        info!(
            target: "filter",
            rules = ordered.len(),
            unique_matches = out.len(),
            "rules applied"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(title: &str) -> Record {
        Record::new(title, "").with_link(format!("http://x/{}", title.len()))
    }

    #[test]
    fn operators_respect_case_flag() {
        let e = FilterEngine::new();
        let r = Record::new("XYZ Corp wins AWARD", "");

        let ci = Condition::new("title", "award");
        assert!(e.matches(&r, &ci).unwrap());
        let cs = Condition::new("title", "award").case_sensitive(true);
        assert!(!e.matches(&r, &cs).unwrap());

        let exact = Condition::new("title", "xyz corp wins award").matching(MatchType::Exact);
        assert!(e.matches(&r, &exact).unwrap());
        let sw = Condition::new("title", "xyz").matching(MatchType::StartsWith);
        assert!(e.matches(&r, &sw).unwrap());
        let ew = Condition::new("title", "AWARD")
            .matching(MatchType::EndsWith)
            .case_sensitive(true);
        assert!(e.matches(&r, &ew).unwrap());
    }

    #[test]
    fn regex_is_partial_and_flagged() {
        let e = FilterEngine::new();
        let r = Record::new("Order worth Rs 500 crore", "");
        let c = Condition::new("title", r"rs\s+\d+").matching(MatchType::Regex);
        assert!(e.matches(&r, &c).unwrap());

        let cs = c.clone().case_sensitive(true);
        assert!(!e.matches(&r, &cs).unwrap());
        assert_eq!(e.cached_patterns(), 2);
    }

    #[test]
    fn missing_field_is_false() {
        let e = FilterEngine::new();
        let r = Record::new("t", "s");
        assert!(!e.matches(&r, &Condition::new("link", "")).unwrap());
        assert!(!e.matches(&r, &Condition::new("author", "x")).unwrap());
        assert!(!e.matches(&r, &Condition::new("no_such_field", "x")).unwrap());
    }

    #[test]
    fn invalid_regex_fails_fast() {
        let e = FilterEngine::new();
        let r = Record::new("t", "s");
        let bad = Condition::new("title", "(unclosed").matching(MatchType::Regex);
        let err = e.matches(&r, &bad).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegex { .. }));

        let rule = Rule::new("bad", vec![bad], 1);
        assert!(e.precompile(&[rule]).is_err());
    }

    #[test]
    fn list_field_semantics() {
        let e = FilterEngine::new();
        let r = Record::new("t", "s").with_tags(["Orders", "Infra"]);
        assert!(e.matches(&r, &Condition::new("tags", "infra")).unwrap());
        let re = Condition::new("tags", "^ord").matching(MatchType::Regex);
        assert!(e.matches(&r, &re).unwrap());

        let exact = Condition::new("tags", "orders").matching(MatchType::Exact);
        assert!(matches!(
            e.try_matches(&r, &exact),
            Err(MatchError::Evaluation { .. })
        ));
        assert!(!e.matches(&r, &exact).unwrap());
    }

    #[test]
    fn fold_is_left_to_right_without_precedence() {
        let e = FilterEngine::new();
        let r = rec("alpha");
        let yes = |c: Combinator| Condition::new("title", "alpha").combined_with(c);
        let no = |c: Combinator| Condition::new("title", "omega").combined_with(c);

        // (true OR false) AND false == false; precedence would give true.
        let rule = Rule::new(
            "mixed",
            vec![yes(Combinator::Or), no(Combinator::Or), no(Combinator::And)],
            1,
        );
        assert!(!e.evaluate(&r, &rule).unwrap());

        // false AND false OR true == true
        let rule = Rule::new(
            "mixed2",
            vec![no(Combinator::And), no(Combinator::And), yes(Combinator::Or)],
            1,
        );
        assert!(e.evaluate(&r, &rule).unwrap());
    }

    #[test]
    fn not_inverts_first_and_is_neutral_after() {
        let e = FilterEngine::new();
        let r = rec("alpha");

        let single = Rule::new(
            "not",
            vec![Condition::new("title", "alpha").combined_with(Combinator::Not)],
            1,
        );
        assert!(!e.evaluate(&r, &single).unwrap());

        // Leading OR true, then NOT(true) leaves the accumulator untouched.
        let trailing = Rule::new(
            "trailing-not",
            vec![
                Condition::new("title", "alpha").combined_with(Combinator::Or),
                Condition::new("title", "alpha").combined_with(Combinator::Not),
            ],
            1,
        );
        assert!(e.evaluate(&r, &trailing).unwrap());
    }

    #[test]
    fn inactive_and_empty_rules_match_nothing() {
        let e = FilterEngine::new();
        let records = vec![rec("alpha")];
        let inactive = Rule::new("off", vec![Condition::new("title", "alpha")], 1).inactive();
        assert!(e.apply_rule(&records, &inactive).unwrap().is_empty());
        let empty = Rule::new("empty", vec![], 1);
        assert!(e.apply_rule(&records, &empty).unwrap().is_empty());
    }

    #[test]
    fn apply_rules_orders_by_priority_then_input() {
        let e = FilterEngine::new();
        let records = vec![
            Record::new("a contract", "").with_link("http://x/1"),
            Record::new("an award", "").with_link("http://x/2"),
            Record::new("award and contract", "").with_link("http://x/3"),
        ];
        let low = Rule::new("contracts", vec![Condition::new("title", "contract")], 1);
        let high = Rule::new("awards", vec![Condition::new("title", "award")], 9);

        let out = e.apply_rules(&records, &[low, high]).unwrap();
        let got: Vec<(&str, &str)> = out
            .iter()
            .map(|m| (m.rule_name.as_str(), m.record.link.as_deref().unwrap()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("awards", "http://x/2"),
                ("awards", "http://x/3"),
                ("contracts", "http://x/1"),
            ]
        );
    }

    #[test]
    fn equal_priorities_keep_declaration_order() {
        let e = FilterEngine::new();
        let records = vec![Record::new("award contract", "").with_link("http://x/1")];
        let first = Rule::new("first", vec![Condition::new("title", "contract")], 3);
        let second = Rule::new("second", vec![Condition::new("title", "award")], 3);
        let out = e.apply_rules(&records, &[first, second]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rule_name, "first");
    }
}
