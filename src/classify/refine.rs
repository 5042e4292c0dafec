use std::collections::{BTreeMap, BTreeSet};

use crate::config::RefineConfig;
use crate::document::document::Document;
use crate::types::batch::ClassificationMethod;
use crate::types::identifiers::{CategoryName, DocumentId};

use super::embedding::{centroid, cosine_similarity, Embedder, HashedBagEmbedder};
use super::{Category, CategoryOrigin};

/// A refinement decision for one previously unresolved document.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAssignment {
    pub category: CategoryName,
    pub confidence: f32,
    pub method: ClassificationMethod,
}

#[derive(Debug)]
pub struct RefineOutcome {
    pub categories: Vec<Category>,
    pub resolved: BTreeMap<DocumentId, ResolvedAssignment>,
    /// (absorbed, surviving) category names, in merge order.
    pub merges: Vec<(CategoryName, CategoryName)>,
}

/// Similarity-clustering fallback stage.
///
/// Resolves documents the rule stage could not place and merges
/// near-duplicate rule categories. Existing confident assignments are
/// never demoted, only renamed when their category is absorbed.
#[derive(Debug)]
pub struct SimilarityRefiner<E = HashedBagEmbedder> {
    embedder: E,
    config: RefineConfig,
}

impl SimilarityRefiner {
    pub fn new(config: RefineConfig) -> Self {
        SimilarityRefiner {
            embedder: HashedBagEmbedder,
            config,
        }
    }
}

impl<E: Embedder> SimilarityRefiner<E> {
    pub fn with_embedder(embedder: E, config: RefineConfig) -> Self {
        SimilarityRefiner { embedder, config }
    }

    pub fn refine(
        &self,
        documents: &[Document],
        categories: Vec<Category>,
        unresolved: &[DocumentId],
        fallback: &CategoryName,
    ) -> RefineOutcome {
        let docs_by_id: BTreeMap<&DocumentId, &Document> =
            documents.iter().map(|d| (&d.id, d)).collect();

        // 1. Embedding phase. Zero vectors (empty features) stay out of
        // the similarity graph entirely.
        let mut vectors: BTreeMap<&DocumentId, Vec<f32>> = BTreeMap::new();
        for doc in documents {
            vectors.insert(&doc.id, self.embedder.embed(&doc.features));
        }

        // 2. Clustering phase: single-link components over mutual cosine,
        // visited in ascending id order for determinism.
        let (clusters, cluster_of) = self.cluster(&vectors);

        // 3. Category merge phase.
        let (mut categories, merges) = self.merge_categories(categories, &cluster_of);

        // 4. Resolution phase for documents the rule stage deferred.
        let unresolved_set: BTreeSet<&DocumentId> = unresolved.iter().collect();
        let mut resolved: BTreeMap<DocumentId, ResolvedAssignment> = BTreeMap::new();
        let mut synthesized_by_cluster: BTreeMap<usize, CategoryName> = BTreeMap::new();

        let mut member_category: BTreeMap<DocumentId, CategoryName> = BTreeMap::new();
        for category in &categories {
            for member in &category.members {
                member_category.insert(member.clone(), category.name.clone());
            }
        }

        for id in unresolved {
            let assignment = match cluster_of.get(id) {
                None => ResolvedAssignment {
                    category: fallback.clone(),
                    confidence: 0.0,
                    method: ClassificationMethod::Fallback,
                },
                Some(&cluster_idx) => self.resolve_in_cluster(
                    id,
                    cluster_idx,
                    &clusters,
                    &vectors,
                    &docs_by_id,
                    &member_category,
                    &unresolved_set,
                    &categories,
                    &mut synthesized_by_cluster,
                ),
            };

            let origin = match assignment.method {
                ClassificationMethod::Fallback => CategoryOrigin::Rule,
                _ => CategoryOrigin::Ml,
            };
            attach_member(&mut categories, &assignment.category, origin, id);
            member_category.insert(id.clone(), assignment.category.clone());
            resolved.insert(id.clone(), assignment);
        }

        RefineOutcome {
            categories,
            resolved,
            merges,
        }
    }

    fn cluster(
        &self,
        vectors: &BTreeMap<&DocumentId, Vec<f32>>,
    ) -> (Vec<Vec<DocumentId>>, BTreeMap<DocumentId, usize>) {
        let ids: Vec<&DocumentId> = vectors
            .iter()
            .filter(|(_, v)| v.iter().any(|x| *x != 0.0))
            .map(|(id, _)| *id)
            .collect();

        let mut clusters: Vec<Vec<DocumentId>> = Vec::new();
        let mut cluster_of: BTreeMap<DocumentId, usize> = BTreeMap::new();

        for seed in &ids {
            if cluster_of.contains_key(*seed) {
                continue;
            }
            let cluster_idx = clusters.len();
            cluster_of.insert((*seed).clone(), cluster_idx);
            let mut frontier = vec![(*seed).clone()];
            let mut members = Vec::new();

            while let Some(current) = frontier.pop() {
                let current_vec = &vectors[&current];
                for other in &ids {
                    if cluster_of.contains_key(*other) {
                        continue;
                    }
                    let similarity = cosine_similarity(current_vec, &vectors[*other]);
                    if similarity >= self.config.merge_threshold {
                        cluster_of.insert((*other).clone(), cluster_idx);
                        frontier.push((*other).clone());
                    }
                }
                members.push(current);
            }

            members.sort();
            clusters.push(members);
        }

        (clusters, cluster_of)
    }

    /// Merge rule categories whose memberships co-cluster almost entirely.
    /// The earlier-created name survives.
    fn merge_categories(
        &self,
        categories: Vec<Category>,
        cluster_of: &BTreeMap<DocumentId, usize>,
    ) -> (Vec<Category>, Vec<(CategoryName, CategoryName)>) {
        let mut dominant_groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();

        for (idx, category) in categories.iter().enumerate() {
            if category.members.is_empty() {
                continue;
            }
            let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
            for member in &category.members {
                if let Some(&cluster_idx) = cluster_of.get(member) {
                    *counts.entry(cluster_idx).or_insert(0) += 1;
                }
            }
            // larger count wins; ties to the smaller cluster index
            let Some((&dominant, &count)) = counts
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            else {
                continue;
            };
            let fraction = count as f32 / category.members.len() as f32;
            if fraction > self.config.category_overlap {
                dominant_groups.entry(dominant).or_default().push(idx);
            }
        }

        let mut absorbed_into: BTreeMap<usize, usize> = BTreeMap::new();
        for group in dominant_groups.values() {
            if group.len() < 2 {
                continue;
            }
            let mut ordered = group.clone();
            ordered.sort_by_key(|&idx| categories[idx].created_order);
            let survivor = ordered[0];
            for &other in &ordered[1..] {
                absorbed_into.insert(other, survivor);
            }
        }

        let mut merges = Vec::new();
        let mut donations: BTreeMap<usize, (Vec<DocumentId>, BTreeSet<String>)> = BTreeMap::new();
        for (&other, &survivor) in &absorbed_into {
            let donation = donations.entry(survivor).or_default();
            donation.0.extend(categories[other].members.iter().cloned());
            donation
                .1
                .extend(categories[other].pattern_keywords.iter().cloned());
            merges.push((
                categories[other].name.clone(),
                categories[survivor].name.clone(),
            ));
        }

        let mut merged: Vec<Category> = Vec::new();
        for (idx, mut category) in categories.into_iter().enumerate() {
            if absorbed_into.contains_key(&idx) {
                continue;
            }
            if let Some((members, keywords)) = donations.remove(&idx) {
                category.members.extend(members);
                category.members.sort();
                category.pattern_keywords.extend(keywords);
            }
            merged.push(category);
        }

        if !merges.is_empty() {
            tracing::debug!(count = merges.len(), "merged near-duplicate categories");
        }

        (merged, merges)
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_in_cluster(
        &self,
        id: &DocumentId,
        cluster_idx: usize,
        clusters: &[Vec<DocumentId>],
        vectors: &BTreeMap<&DocumentId, Vec<f32>>,
        docs_by_id: &BTreeMap<&DocumentId, &Document>,
        member_category: &BTreeMap<DocumentId, CategoryName>,
        unresolved: &BTreeSet<&DocumentId>,
        categories: &[Category],
        synthesized_by_cluster: &mut BTreeMap<usize, CategoryName>,
    ) -> ResolvedAssignment {
        let cluster = &clusters[cluster_idx];
        let doc_vector = &vectors[id];

        // Classified neighbors vote for their category; a majority of them
        // counts as significant overlap with that category.
        let classified: Vec<&DocumentId> = cluster
            .iter()
            .filter(|m| *m != id && !unresolved.contains(m))
            .collect();

        let mut votes: BTreeMap<&CategoryName, usize> = BTreeMap::new();
        for member in &classified {
            if let Some(category) = member_category.get(*member) {
                *votes.entry(category).or_insert(0) += 1;
            }
        }

        let mut adopted: Option<&CategoryName> = None;
        let mut best_votes = 0;
        for (category, &count) in &votes {
            if count * 2 >= classified.len() && count > best_votes {
                adopted = Some(category);
                best_votes = count;
            }
        }

        if let Some(category) = adopted {
            let confidence = classified
                .iter()
                .filter(|m| member_category.get(**m) == Some(category))
                .map(|m| cosine_similarity(doc_vector, &vectors[*m]))
                .fold(0.0f32, f32::max);
            return ResolvedAssignment {
                category: category.clone(),
                confidence,
                method: ClassificationMethod::Similarity,
            };
        }

        // No rule category claims this cluster: name it once from its
        // unresolved members' most frequent terms.
        let peers: Vec<&DocumentId> = cluster.iter().filter(|m| unresolved.contains(m)).collect();
        let peer_vectors: Vec<&Vec<f32>> = peers.iter().map(|m| &vectors[*m]).collect();
        let confidence = cosine_similarity(doc_vector, &centroid(&peer_vectors));

        if let Some(existing) = synthesized_by_cluster.get(&cluster_idx) {
            return ResolvedAssignment {
                category: existing.clone(),
                confidence,
                method: ClassificationMethod::Similarity,
            };
        }

        let name = synthesize_name(&peers, docs_by_id, categories);
        synthesized_by_cluster.insert(cluster_idx, name.clone());
        ResolvedAssignment {
            category: name,
            confidence,
            method: ClassificationMethod::Similarity,
        }
    }
}

/// Name a cluster after its two most frequent lemmas (count descending,
/// then lexical). Collisions with an existing category resolve to that
/// category's display name, so the documents simply join it.
fn synthesize_name(
    peers: &[&DocumentId],
    docs_by_id: &BTreeMap<&DocumentId, &Document>,
    categories: &[Category],
) -> CategoryName {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for id in peers {
        if let Some(doc) = docs_by_id.get(*id) {
            for lemma in &doc.features.lemmas {
                *counts.entry(lemma.as_str()).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    let label = ranked
        .iter()
        .take(2)
        .map(|(lemma, _)| *lemma)
        .collect::<Vec<_>>()
        .join(" ");

    let name = CategoryName::new(if label.is_empty() {
        "miscellaneous".to_string()
    } else {
        label
    })
    .expect("synthesized label is non-empty");

    let normalized = name.normalized();
    for category in categories {
        if category.name.normalized() == normalized {
            return category.name.clone();
        }
    }
    name
}

/// Append a member to the named category, creating it on first use.
fn attach_member(
    categories: &mut Vec<Category>,
    name: &CategoryName,
    origin: CategoryOrigin,
    id: &DocumentId,
) {
    let normalized = name.normalized();
    if let Some(category) = categories
        .iter_mut()
        .find(|c| c.name.normalized() == normalized)
    {
        category.members.push(id.clone());
        category.members.sort();
        return;
    }

    let next_order = categories
        .iter()
        .map(|c| c.created_order + 1)
        .max()
        .unwrap_or(0);
    let mut category = Category::new(name.clone(), origin, next_order);
    category
        .pattern_keywords
        .extend(name.normalized().split(' ').map(str::to_string));
    category.members.push(id.clone());
    categories.push(category);
}
