//! Vector ranker (spec.md §4.5) — embeds the query and performs
//! nearest-neighbor search over persisted turn embeddings. Gates on the
//! presence of an `Embedder` (spec.md §4.2, §7 "Missing dependency").

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{RankedResult, Ranker};
use crate::embedder::Embedder;

/// Store-side nearest-neighbor contract (spec.md §4.1, §4.5).
#[async_trait]
pub trait TurnEmbeddingIndex: Send + Sync {
    async fn nearest(
        &self,
        embedding: &[f32],
        top_k: usize,
        project: Option<&str>,
    ) -> anyhow::Result<Vec<RankedResult>>;
}

pub struct VectorRanker<I: TurnEmbeddingIndex> {
    index: Arc<I>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl<I: TurnEmbeddingIndex> VectorRanker<I> {
    #[must_use]
    pub fn new(index: Arc<I>, embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self { index, embedder }
    }
}

#[async_trait]
impl<I: TurnEmbeddingIndex> Ranker for VectorRanker<I> {
    fn name(&self) -> &'static str {
        "vector"
    }

    async fn rank(&self, query: &str, top_k: usize, project: Option<&str>) -> Vec<RankedResult> {
        let Some(embedder) = &self.embedder else {
            return Vec::new();
        };
        let embedding = match embedder.embed(query).await {
            Ok(v) => v,
            Err(err) => {
                warn!(ranker = "vector", error = %err, "embedder failed, eliding from fusion");
                return Vec::new();
            }
        };
        match self.index.nearest(&embedding, top_k, project).await {
            Ok(results) => results,
            Err(err) => {
                warn!(ranker = "vector", error = %err, "ranker failed, eliding from fusion");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyIndex;
    #[async_trait]
    impl TurnEmbeddingIndex for EmptyIndex {
        async fn nearest(
            &self,
            _embedding: &[f32],
            _top_k: usize,
            _project: Option<&str>,
        ) -> anyhow::Result<Vec<RankedResult>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn absent_embedder_yields_empty_list() {
        let ranker = VectorRanker::new(Arc::new(EmptyIndex), None);
        assert!(ranker.rank("q", 10, None).await.is_empty());
    }
}
