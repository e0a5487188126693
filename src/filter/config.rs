// src/filter/config.rs
//! Rule-set configuration: presets by name, keyword rules, custom rules, and
//! an optional external rules file (TOML or JSON).
//!
//! ```toml
//! [filter]
//! presets = ["Awards/Bagging", "Contracts"]
//! rules_path = "config/rules.toml"
//!
//! [[filter.keyword_rules]]
//! name = "Keywords"
//! keywords = ["award", "bagging", "contract"]
//! ```

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::presets;
use super::rule::Rule;
use crate::error::ConfigError;
use crate::record::Record;

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordRuleCfg {
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(default = "default_keyword_priority")]
    pub priority: i32,
}

fn default_keyword_priority() -> i32 {
    1
}

fn default_presets() -> Vec<String> {
    vec![presets::AWARDS_BAGGING.to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_presets")]
    pub presets: Vec<String>,
    #[serde(default)]
    pub keyword_rules: Vec<KeywordRuleCfg>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Extra rules loaded from a separate file at build time.
    #[serde(default)]
    pub rules_path: Option<PathBuf>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            presets: default_presets(),
            keyword_rules: Vec::new(),
            rules: Vec::new(),
            rules_path: None,
        }
    }
}

#[derive(Deserialize)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<Rule>,
}

/// Load rules from a standalone file. `.json` is parsed as JSON, anything
/// else as TOML; both use a top-level `rules` array.
pub fn load_rules_file(path: &Path) -> Result<Vec<Rule>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let is_json = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        let file: RulesFile = serde_json::from_str(&content)?;
        Ok(file.rules)
    } else {
        let file: RulesFile = toml::from_str(&content)?;
        Ok(file.rules)
    }
}

impl FilterConfig {
    /// Resolve presets, keyword rules, inline rules and the rules file into
    /// one validated rule set (declaration order preserved).
    pub fn build(&self) -> Result<Vec<Rule>, ConfigError> {
        let mut rules = Vec::new();

        for name in &self.presets {
            let rule =
                presets::by_name(name).ok_or_else(|| ConfigError::UnknownPreset(name.clone()))?;
            rules.push(rule);
        }
        for kw in &self.keyword_rules {
            rules.push(presets::keyword_rule(&kw.keywords, &kw.name, kw.priority));
        }
        rules.extend(self.rules.iter().cloned());
        if let Some(path) = &self.rules_path {
            rules.extend(load_rules_file(path)?);
        }

        validate(&rules)?;
        Ok(rules)
    }
}

/// Unique names and addressable fields.
pub fn validate(rules: &[Rule]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for rule in rules {
        if !names.insert(rule.name.as_str()) {
            return Err(ConfigError::DuplicateRule(rule.name.clone()));
        }
        for cond in &rule.conditions {
            if !Record::is_known_field(cond.field()) {
                return Err(ConfigError::UnknownField {
                    rule: rule.name.clone(),
                    field: cond.field().to_string(),
                });
            }
        }
    }
    Ok(())
}
