//! Embedder plug-in contract (spec.md §4.2).
//!
//! The core never ships a concrete embedding model — the embedder is a
//! plug-in, matching `memory-core::embeddings::provider::EmbeddingProvider`'s
//! trait boundary. The vector ranker (§4.5) gates on whether one is
//! configured.

use async_trait::async_trait;

/// Produces a fixed-dimension numeric vector for a piece of text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embedding dimensionality. Must be stable for a given instance.
    fn dimension(&self) -> usize;

    /// Embed `text`. Implementations may call out to a network provider
    /// or a local model; failures surface as `anyhow::Error` and the
    /// caller treats them as "embedder absent" (spec.md §7, Missing
    /// dependency).
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// Cosine similarity between two equal-length vectors. Returns 0.0 if
/// either vector has zero magnitude or the lengths differ.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Deterministic, non-semantic embedder for tests and for running the
/// engine without a real provider wired up (spec.md §4.2, "Embedder
/// may be absent"; SPEC_FULL.md §4.2). Hashes the input text into a
/// fixed-dimension vector and normalizes it, grounded on
/// `memory-core::embeddings::mock_model::MockLocalModel::generate_mock_embedding`.
/// Never produces semantically meaningful vectors — only useful to
/// exercise the vector ranker's plumbing.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut seed = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            embedding.push(((seed >> 16) as f32) / 32768.0 - 1.0);
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(self.generate(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new(16);
        let a = embedder.embed("hello world").await.unwrap();
        let b = embedder.embed("hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[tokio::test]
    async fn mock_embedder_differs_across_inputs() {
        let embedder = MockEmbedder::new(16);
        let a = embedder.embed("hello world").await.unwrap();
        let b = embedder.embed("goodbye world").await.unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_handled_without_panicking() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
