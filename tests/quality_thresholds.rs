use archivist_core::classify::{Category, CategoryOrigin};
use archivist_core::config::QualityOverrides;
use archivist_core::quality::{acceptance_threshold, min_category_size, QualityValidator};
use archivist_core::types::{CategoryName, DocumentId};

fn category(name: &str, order: usize, members: usize, offset: usize) -> Category {
    let mut category = Category::new(
        CategoryName::new(name).unwrap(),
        CategoryOrigin::Rule,
        order,
    );
    for i in 0..members {
        category
            .members
            .push(DocumentId::new(format!("doc-{}", offset + i)).unwrap());
    }
    category
}

/// One singleton category per document.
fn singletons(n: usize) -> Vec<Category> {
    (0..n).map(|i| category(&format!("cat-{i:02}"), i, 1, i)).collect()
}

#[test]
fn threshold_follows_size_adaptive_table() {
    assert_eq!(acceptance_threshold(1), 0.40);
    assert_eq!(acceptance_threshold(5), 0.40);
    assert_eq!(acceptance_threshold(6), 0.50);
    assert_eq!(acceptance_threshold(9), 0.50);
    assert_eq!(acceptance_threshold(10), 0.50);
    assert_eq!(acceptance_threshold(11), 0.55);
    assert_eq!(acceptance_threshold(15), 0.55);
    assert_eq!(acceptance_threshold(20), 0.55);
    assert_eq!(acceptance_threshold(21), 0.60);
    assert_eq!(acceptance_threshold(25), 0.60);
}

#[test]
fn minimum_category_size_is_size_adaptive() {
    for n in 1..=10 {
        assert_eq!(min_category_size(n), 1, "N={n}");
    }
    for n in [11, 15, 20, 21, 100] {
        assert_eq!(min_category_size(n), 2, "N={n}");
    }
}

#[test]
fn singleton_categories_never_flagged_at_or_below_ten_documents() {
    let validator = QualityValidator::default();

    // N=9: one singleton among larger categories is fine
    let mut categories = vec![category("big", 0, 8, 0)];
    categories.push(category("lone", 1, 1, 8));
    let report = validator.validate(&categories, 9, Vec::new());
    assert_eq!(report.small_category_count, 0);

    // N=15: the same singleton now counts as undersized
    let mut categories = vec![category("big", 0, 14, 0)];
    categories.push(category("lone", 1, 1, 14));
    let report = validator.validate(&categories, 15, Vec::new());
    assert_eq!(report.small_category_count, 1);
}

#[test]
fn scenario_nine_documents_pass_adaptive_threshold() {
    // 9 singleton categories compute to exactly 0.50 with default
    // weights; the adaptive threshold for 6-10 documents is 0.50
    let validator = QualityValidator::default();
    let report = validator.validate(&singletons(9), 9, Vec::new());

    assert_eq!(report.threshold_used, 0.50);
    assert_eq!(report.computed_score, 0.50);
    assert!(report.passed);
    assert_eq!(report.total_documents, 9);
}

#[test]
fn scenario_nine_documents_fail_fixed_legacy_threshold() {
    // the same batch against the fixed 60% legacy threshold regresses
    let validator = QualityValidator::new(QualityOverrides {
        fixed_threshold: Some(0.60),
        ..QualityOverrides::default()
    });
    let report = validator.validate(&singletons(9), 9, Vec::new());

    assert_eq!(report.threshold_used, 0.60);
    assert_eq!(report.computed_score, 0.50);
    assert!(!report.passed);
}

#[test]
fn scenario_three_singleton_categories_accepted() {
    let validator = QualityValidator::default();
    let report = validator.validate(&singletons(3), 3, Vec::new());

    assert_eq!(report.threshold_used, 0.40);
    assert_eq!(report.small_category_count, 0);
    assert!(report.passed);
}

#[test]
fn undersized_categories_drag_the_score_down() {
    let validator = QualityValidator::default();

    // N=12, min size 2: four singletons leave 8/12 adequately filed
    let mut categories = vec![category("a", 0, 4, 0), category("b", 1, 4, 4)];
    for i in 0..4 {
        categories.push(category(&format!("s{i}"), 2 + i, 1, 8 + i));
    }
    let report = validator.validate(&categories, 12, Vec::new());

    assert_eq!(report.small_category_count, 4);
    let balanced = validator.validate(
        &[category("a", 0, 6, 0), category("b", 1, 6, 6)],
        12,
        Vec::new(),
    );
    assert!(report.computed_score < balanced.computed_score);
}

#[test]
fn warnings_pass_through_the_report() {
    let validator = QualityValidator::default();
    let report = validator.validate(
        &singletons(2),
        2,
        vec!["lexicon degraded".to_string()],
    );
    assert_eq!(report.warnings, vec!["lexicon degraded".to_string()]);
}

#[test]
fn empty_categories_are_ignored() {
    let validator = QualityValidator::default();
    let mut categories = singletons(3);
    categories.push(category("unused", 3, 0, 100));

    let report = validator.validate(&categories, 3, Vec::new());
    assert_eq!(report.small_category_count, 0);
}
