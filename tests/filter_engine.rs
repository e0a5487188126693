// tests/filter_engine.rs
//
// Filter engine behaviour through the public API: presets, priority ordering,
// cross-rule de-duplication, NOT, case handling, regex cache reuse.

use newswatch::filter::{presets, Combinator, Condition, FilterEngine, MatchType, Rule};
use newswatch::Record;

fn award_record() -> Record {
    Record::new(
        "ABC Ltd wins award for bridge",
        "The company secured a bridge construction order.",
    )
    .with_link("http://n/1")
}

#[test]
fn awards_preset_matches_award_title() {
    let engine = FilterEngine::new();
    let rule = presets::awards_bagging();
    assert!(engine.evaluate(&award_record(), &rule).unwrap());

    let out = engine.apply_rule(&[award_record()], &rule).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].rule_name, "Awards/Bagging");
    assert_eq!(out[0].priority, 5);
}

#[test]
fn awards_preset_also_looks_at_link() {
    let engine = FilterEngine::new();
    let r = Record::new("Board meeting outcome", "").with_link("https://x.test/bagging-of-order");
    assert!(engine.evaluate(&r, &presets::awards_bagging()).unwrap());
}

#[test]
fn same_inputs_same_verdict() {
    let engine = FilterEngine::new();
    let rules = presets::all();
    let batch = vec![
        award_record(),
        Record::new("Contract signed", "").with_link("http://n/2"),
        Record::new("Quarterly results", "").with_link("http://n/3"),
    ];
    let first = engine.apply_rules(&batch, &rules).unwrap();
    let second = engine.apply_rules(&batch, &rules).unwrap();
    assert_eq!(first, second);
}

#[test]
fn higher_priority_rule_claims_shared_record() {
    let engine = FilterEngine::new();
    let record = Record::new("Award of contract to XYZ Ltd", "").with_link("http://n/9");
    let out = engine
        .apply_rules(&[record], &[presets::contracts(), presets::awards_bagging()])
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].rule_name, "Awards/Bagging");
}

#[test]
fn linkless_records_are_not_collapsed() {
    let engine = FilterEngine::new();
    let batch = vec![
        Record::new("award one", "a"),
        Record::new("award two", "b"),
    ];
    let out = engine
        .apply_rules(&batch, &[presets::awards_bagging(), presets::keyword_rule(&["award"], "kw", 1)])
        .unwrap();
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|m| m.rule_name == "Awards/Bagging"));
}

#[test]
fn inactive_rules_are_skipped() {
    let engine = FilterEngine::new();
    let rules = vec![presets::awards_bagging().inactive(), presets::contracts()];
    let out = engine.apply_rules(&[award_record()], &rules).unwrap();
    assert!(out.is_empty());
    assert!(engine.apply_rules(&[award_record()], &[]).unwrap().is_empty());
}

#[test]
fn not_condition_inverts_single_result() {
    let engine = FilterEngine::new();
    let rule = Rule::new(
        "no-awards",
        vec![Condition::new("title", "award").combined_with(Combinator::Not)],
        1,
    );
    assert!(!engine.evaluate(&award_record(), &rule).unwrap());
    let other = Record::new("Results", "").with_link("http://n/4");
    assert!(engine.evaluate(&other, &rule).unwrap());
}

#[test]
fn case_insensitive_by_default() {
    let engine = FilterEngine::new();
    let r = Record::new("ABC LTD WINS AWARD", "");
    assert!(engine.matches(&r, &Condition::new("title", "Award")).unwrap());
    assert!(!engine
        .matches(&r, &Condition::new("title", "Award").case_sensitive(true))
        .unwrap());
}

#[test]
fn regex_class_escapes_survive_case_folding() {
    let engine = FilterEngine::new();
    let r = Record::new("Order of Rs 250 crore", "");
    // `\D` must keep meaning "non-digit" under case-insensitive matching.
    let c = Condition::new("title", r"^\D+\d+ CRORE$").matching(MatchType::Regex);
    assert!(engine.matches(&r, &c).unwrap());
}

#[test]
fn regex_cache_is_reused_across_records() {
    let engine = FilterEngine::new();
    let rule = Rule::new(
        "orders",
        vec![Condition::new("title", r"rs\s+\d+").matching(MatchType::Regex)],
        1,
    );
    let batch: Vec<Record> = (0..50)
        .map(|i| Record::new(format!("Order of Rs {i} crore"), "").with_link(format!("http://n/{i}")))
        .collect();
    let out = engine.apply_rule(&batch, &rule).unwrap();
    assert_eq!(out.len(), 50);
    assert_eq!(engine.cached_patterns(), 1);

    // a second engine has its own cache
    let other = FilterEngine::new();
    assert_eq!(other.cached_patterns(), 0);
}

#[test]
fn invalid_regex_aborts_the_batch() {
    let engine = FilterEngine::new();
    let rule = Rule::new(
        "broken",
        vec![Condition::new("title", "[unclosed").matching(MatchType::Regex)],
        1,
    );
    assert!(engine.apply_rules(&[award_record()], &[rule]).is_err());
}

#[tokio::test]
async fn linkless_feed_item_has_no_link_to_match() {
    use newswatch::ingest::providers::rss::RssFeed;
    use newswatch::ingest::types::Acquisition;

    let xml = r#"<rss version="2.0"><channel>
      <item><title>Board meeting outcome</title><description>Results approved</description></item>
    </channel></rss>"#;
    let got = RssFeed::from_fixture_str("NSE", xml).fetch().await.unwrap();
    let record = &got.records[0];
    // a display link was filled in, but conditions on `link` see nothing
    assert!(record.link.is_some());

    let engine = FilterEngine::new();
    let on_link = Rule::new("Link", vec![Condition::new("link", "board")], 1);
    assert!(!engine.evaluate(record, &on_link).unwrap());
    let on_title = Rule::new("Title", vec![Condition::new("title", "board")], 1);
    assert!(engine.evaluate(record, &on_title).unwrap());
}
