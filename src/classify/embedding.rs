use sha2::{Digest, Sha256};

use crate::document::features::Features;

/// Fixed embedding dimensionality.
pub const EMBED_DIM: usize = 256;

pub trait Embedder {
    fn embed(&self, features: &Features) -> Vec<f32>;
}

/// Deterministic hashed bag-of-lemmas embedding.
///
/// Each lemma (and lowercased entity) is bucketed by the leading bytes of
/// its SHA-256 digest, so vectors are identical across processes and
/// platforms. Vectors are L2-normalized; empty features embed to the zero
/// vector.
#[derive(Debug, Default, Clone, Copy)]
pub struct HashedBagEmbedder;

impl Embedder for HashedBagEmbedder {
    fn embed(&self, features: &Features) -> Vec<f32> {
        let mut vector = vec![0.0f32; EMBED_DIM];
        for lemma in &features.lemmas {
            vector[bucket(lemma)] += 1.0;
        }
        for entity in &features.entities {
            vector[bucket(&entity.to_lowercase())] += 1.0;
        }
        l2_normalize(&mut vector);
        vector
    }
}

fn bucket(token: &str) -> usize {
    let digest = Sha256::digest(token.as_bytes());
    let index = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    index as usize % EMBED_DIM
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity; zero vectors compare as 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Component-wise mean of a non-empty set of vectors.
pub fn centroid(vectors: &[&Vec<f32>]) -> Vec<f32> {
    let mut mean = vec![0.0f32; EMBED_DIM];
    if vectors.is_empty() {
        return mean;
    }
    for vector in vectors {
        for (m, x) in mean.iter_mut().zip(vector.iter()) {
            *m += x;
        }
    }
    let n = vectors.len() as f32;
    for m in mean.iter_mut() {
        *m /= n;
    }
    mean
}
