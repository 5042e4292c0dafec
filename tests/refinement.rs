use std::collections::BTreeMap;

use archivist_core::classify::{Category, CategoryOrigin, SimilarityRefiner};
use archivist_core::config::RefineConfig;
use archivist_core::document::{Document, FeatureExtractor, RawDocument};
use archivist_core::types::{CategoryName, ClassificationMethod, DocumentId};

fn id(s: &str) -> DocumentId {
    DocumentId::new(s).unwrap()
}

fn name(s: &str) -> CategoryName {
    CategoryName::new(s).unwrap()
}

fn doc(id_str: &str, text: &str) -> Document {
    Document::ingest(
        RawDocument::new(id(id_str), text),
        &FeatureExtractor::new(),
    )
}

fn category(category_name: &str, order: usize, members: &[&str]) -> Category {
    let mut category = Category::new(name(category_name), CategoryOrigin::Rule, order);
    category.members = members.iter().map(|m| id(m)).collect();
    category
}

fn refiner() -> SimilarityRefiner {
    SimilarityRefiner::new(RefineConfig::default())
}

#[test]
fn unresolved_document_adopts_overlapping_rule_category() {
    let documents = vec![
        doc("a", "invoice payment amount due vendor"),
        doc("b", "invoice payment amount due vendor"),
        doc("c", "payment amount due vendor total"),
    ];
    let categories = vec![category("invoices", 0, &["a", "b"])];

    let outcome = refiner().refine(&documents, categories, &[id("c")], &name("review"));

    let resolved = &outcome.resolved[&id("c")];
    assert_eq!(resolved.category, name("invoices"));
    assert_eq!(resolved.method, ClassificationMethod::Similarity);
    assert!(resolved.confidence > 0.7);

    let invoices = outcome
        .categories
        .iter()
        .find(|c| c.name == name("invoices"))
        .unwrap();
    assert!(invoices.members.contains(&id("c")));
}

#[test]
fn unclaimed_cluster_synthesizes_category_from_frequent_terms() {
    let documents = vec![
        doc("a", "garden flower plant soil seed"),
        doc("b", "garden flower plant soil water"),
    ];

    let outcome = refiner().refine(&documents, Vec::new(), &[id("a"), id("b")], &name("review"));

    let a = &outcome.resolved[&id("a")];
    let b = &outcome.resolved[&id("b")];
    assert_eq!(a.category, b.category);
    assert_eq!(a.method, ClassificationMethod::Similarity);

    // top two lemmas by (count desc, lexical asc)
    assert_eq!(a.category, name("flower garden"));

    let synthesized = outcome
        .categories
        .iter()
        .find(|c| c.name == a.category)
        .unwrap();
    assert_eq!(synthesized.origin, CategoryOrigin::Ml);
    assert_eq!(synthesized.members, vec![id("a"), id("b")]);
}

#[test]
fn empty_feature_documents_fall_back_to_review() {
    let documents = vec![doc("a", "invoice payment"), doc("empty", "")];
    let categories = vec![category("invoices", 0, &["a"])];

    let outcome = refiner().refine(&documents, categories, &[id("empty")], &name("review"));

    let resolved = &outcome.resolved[&id("empty")];
    assert_eq!(resolved.category, name("review"));
    assert_eq!(resolved.method, ClassificationMethod::Fallback);
    assert_eq!(resolved.confidence, 0.0);
}

#[test]
fn overlapping_categories_merge_into_earlier_created_name() {
    // Scenario: two rule categories whose members co-cluster almost
    // entirely are folded into one, the earlier-created name winning.
    let documents = vec![
        doc("r1", "report quarterly finance budget revenue"),
        doc("r2", "report quarterly finance budget revenue"),
        doc("s1", "summary quarterly finance budget revenue"),
        doc("s2", "summary quarterly finance budget revenue"),
    ];
    let categories = vec![
        category("reports", 0, &["r1", "r2"]),
        category("summaries", 1, &["s1", "s2"]),
    ];

    let outcome = refiner().refine(&documents, categories, &[], &name("review"));

    assert_eq!(
        outcome.merges,
        vec![(name("summaries"), name("reports"))]
    );
    let names: Vec<&str> = outcome
        .categories
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert!(names.contains(&"reports"));
    assert!(!names.contains(&"summaries"));

    let reports = outcome
        .categories
        .iter()
        .find(|c| c.name == name("reports"))
        .unwrap();
    assert_eq!(reports.members.len(), 4);
}

#[test]
fn dissimilar_categories_are_not_merged() {
    let documents = vec![
        doc("r1", "report quarterly finance budget revenue"),
        doc("g1", "garden flower plant soil seed"),
    ];
    let categories = vec![
        category("reports", 0, &["r1"]),
        category("gardening", 1, &["g1"]),
    ];

    let outcome = refiner().refine(&documents, categories, &[], &name("review"));

    assert!(outcome.merges.is_empty());
    assert_eq!(outcome.categories.len(), 2);
}

#[test]
fn refinement_never_demotes_rule_assignments() {
    let documents = vec![
        doc("a", "invoice payment amount due vendor"),
        doc("b", "contract agreement terms counsel signature"),
        doc("c", "payment amount due vendor total"),
    ];
    let categories = vec![
        category("invoices", 0, &["a"]),
        category("contracts", 1, &["b"]),
    ];

    let outcome = refiner().refine(&documents, categories, &[id("c")], &name("review"));

    // every rule member is still assigned, under some surviving name
    let mut assigned: BTreeMap<DocumentId, usize> = BTreeMap::new();
    for category in &outcome.categories {
        for member in &category.members {
            *assigned.entry(member.clone()).or_insert(0) += 1;
        }
    }
    assert_eq!(assigned.get(&id("a")), Some(&1));
    assert_eq!(assigned.get(&id("b")), Some(&1));
    assert_eq!(assigned.get(&id("c")), Some(&1));
}
