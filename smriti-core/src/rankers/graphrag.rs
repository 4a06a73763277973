//! Graph-RAG ranker (spec.md §4.5) — node lookup by label and
//! edge-neighborhood expansion.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{RankedResult, Ranker};
use crate::types::PramanaType;

/// Store-side graph contract. Also the source of
/// `pramana_batch(ids) → map` used by Hybrid Search's epistemic boost
/// (spec.md §4.6 step 5).
#[async_trait]
pub trait GraphIndex: Send + Sync {
    async fn search_entities(
        &self,
        query: &str,
        top_k: usize,
        project: Option<&str>,
    ) -> anyhow::Result<Vec<RankedResult>>;

    async fn pramana_batch(&self, ids: &[String]) -> HashMap<String, PramanaType>;
}

pub struct GraphRagRanker<G: GraphIndex> {
    graph: Arc<G>,
}

impl<G: GraphIndex> GraphRagRanker<G> {
    #[must_use]
    pub fn new(graph: Arc<G>) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl<G: GraphIndex> Ranker for GraphRagRanker<G> {
    fn name(&self) -> &'static str {
        "graphrag"
    }

    async fn rank(&self, query: &str, top_k: usize, project: Option<&str>) -> Vec<RankedResult> {
        match self.graph.search_entities(query, top_k, project).await {
            Ok(results) => results,
            Err(err) => {
                warn!(ranker = "graphrag", error = %err, "ranker failed, eliding from fusion");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingGraph;
    #[async_trait]
    impl GraphIndex for FailingGraph {
        async fn search_entities(
            &self,
            _query: &str,
            _top_k: usize,
            _project: Option<&str>,
        ) -> anyhow::Result<Vec<RankedResult>> {
            anyhow::bail!("graph index unavailable")
        }

        async fn pramana_batch(&self, _ids: &[String]) -> HashMap<String, PramanaType> {
            HashMap::new()
        }
    }

    #[tokio::test]
    async fn failure_yields_empty_list() {
        let ranker = GraphRagRanker::new(Arc::new(FailingGraph));
        assert!(ranker.rank("q", 10, None).await.is_empty());
    }
}
