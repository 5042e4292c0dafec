use archivist_core::classify::{RuleClassifier, RuleOutcome};
use archivist_core::config::{CategoryRule, ConfigError, RuleTable};
use archivist_core::document::FeatureExtractor;
use archivist_core::types::CategoryName;

fn name(s: &str) -> CategoryName {
    CategoryName::new(s).unwrap()
}

fn rule(category: &str, keywords: &[&str], weight: f32) -> CategoryRule {
    CategoryRule {
        name: name(category),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        weight,
    }
}

fn table(rules: Vec<CategoryRule>) -> RuleTable {
    RuleTable::from_rules(rules).unwrap()
}

#[test]
fn highest_scoring_category_wins() {
    let table = table(vec![
        rule("invoices", &["invoice", "payment"], 1.0),
        rule("contracts", &["contract", "agreement"], 1.0),
    ]);
    let extractor = FeatureExtractor::new();
    let features = extractor.extract("invoice payment for invoice processing");

    let classifier = RuleClassifier::default();
    match classifier.decide(&features, &table) {
        RuleOutcome::Matched(matched) => {
            assert_eq!(matched.category, name("invoices"));
            assert!(matched.score > 0.0);
            assert!((0.0..=1.0).contains(&matched.confidence));
        }
        RuleOutcome::NeedsRefinement => panic!("expected a rule match"),
    }
}

#[test]
fn lemma_matches_catch_morphological_variants() {
    let table = table(vec![rule("invoices", &["invoice"], 1.0)]);
    let extractor = FeatureExtractor::new();
    let classifier = RuleClassifier::default();

    // plural form: no raw hit, but the lemmatized token matches
    let features = extractor.extract("invoices overdue");
    match classifier.decide(&features, &table) {
        RuleOutcome::Matched(matched) => assert_eq!(matched.category, name("invoices")),
        RuleOutcome::NeedsRefinement => panic!("lemma match should classify plural form"),
    }
}

#[test]
fn surface_and_lemma_hits_stack() {
    let table = table(vec![rule("invoices", &["invoice"], 1.0)]);
    let extractor = FeatureExtractor::new();
    let classifier = RuleClassifier::default();

    // singular: raw hit + lemma hit; plural: lemma hit only
    let singular = classifier.score(&extractor.extract("invoice"), &table);
    let plural = classifier.score(&extractor.extract("invoices"), &table);

    let singular_score = singular[&name("invoices")];
    let plural_score = plural[&name("invoices")];
    assert!(singular_score > plural_score);
    assert!(plural_score > 0.0);
}

#[test]
fn score_ties_break_to_lexically_earlier_name() {
    // identical keywords and weights: "alpha" must win over "beta"
    // regardless of table order
    let extractor = FeatureExtractor::new();
    let classifier = RuleClassifier::default();
    let features = extractor.extract("zebra crossing");

    for rules in [
        vec![rule("beta", &["zebra"], 1.0), rule("alpha", &["zebra"], 1.0)],
        vec![rule("alpha", &["zebra"], 1.0), rule("beta", &["zebra"], 1.0)],
    ] {
        match classifier.decide(&features, &table(rules)) {
            RuleOutcome::Matched(matched) => assert_eq!(matched.category, name("alpha")),
            RuleOutcome::NeedsRefinement => panic!("expected a match"),
        }
    }
}

#[test]
fn zero_matches_defer_to_refinement() {
    let table = table(vec![rule("invoices", &["invoice"], 1.0)]);
    let extractor = FeatureExtractor::new();
    let classifier = RuleClassifier::default();

    let outcome = classifier.decide(&extractor.extract("unrelated gardening notes"), &table);
    assert_eq!(outcome, RuleOutcome::NeedsRefinement);

    let outcome = classifier.decide(&extractor.extract(""), &table);
    assert_eq!(outcome, RuleOutcome::NeedsRefinement);
}

#[test]
fn weights_scale_scores() {
    let table = table(vec![
        rule("light", &["shared"], 1.0),
        rule("heavy", &["shared"], 2.0),
    ]);
    let extractor = FeatureExtractor::new();
    let classifier = RuleClassifier::default();

    match classifier.decide(&extractor.extract("shared term"), &table) {
        RuleOutcome::Matched(matched) => assert_eq!(matched.category, name("heavy")),
        RuleOutcome::NeedsRefinement => panic!("expected a match"),
    }
}

#[test]
fn rule_table_rejects_invalid_configuration() {
    assert!(matches!(
        RuleTable::from_rules(vec![]),
        Err(ConfigError::EmptyTable)
    ));

    assert!(matches!(
        RuleTable::from_rules(vec![
            rule("dup", &["a"], 1.0),
            rule("DUP", &["b"], 1.0),
        ]),
        Err(ConfigError::DuplicateCategory(_))
    ));

    assert!(matches!(
        RuleTable::from_rules(vec![rule("empty", &["  "], 1.0)]),
        Err(ConfigError::NoKeywords(_))
    ));

    assert!(matches!(
        RuleTable::from_rules(vec![rule("bad", &["kw"], 0.0)]),
        Err(ConfigError::InvalidWeight { .. })
    ));
}

#[test]
fn rule_table_lowercases_keywords() {
    let table = table(vec![rule("invoices", &["INVOICE"], 1.0)]);
    let extractor = FeatureExtractor::new();
    let classifier = RuleClassifier::default();

    match classifier.decide(&extractor.extract("invoice attached"), &table) {
        RuleOutcome::Matched(matched) => assert_eq!(matched.category, name("invoices")),
        RuleOutcome::NeedsRefinement => panic!("keyword case must not matter"),
    }
}
