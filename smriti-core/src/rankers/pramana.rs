//! Pramana reliability lookup (spec.md §4.5) — ranks entries by their
//! epistemic category's reliability weight, and resolves
//! `id → pramana_type` for the Hybrid Search boost. Absent type
//! defaults to `shabda` (spec.md §4.5).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{RankedResult, Ranker};
use crate::types::PramanaType;

/// Store-side epistemic index contract.
#[async_trait]
pub trait PramanaIndex: Send + Sync {
    /// Entries matching `query`, ordered by Pramana reliability
    /// descending (ties by recency).
    async fn reliable_entries(
        &self,
        query: &str,
        top_k: usize,
        project: Option<&str>,
    ) -> anyhow::Result<Vec<RankedResult>>;

    async fn pramana_batch(&self, ids: &[String]) -> HashMap<String, PramanaType>;
}

pub struct PramanaRanker<P: PramanaIndex> {
    index: Arc<P>,
}

impl<P: PramanaIndex> PramanaRanker<P> {
    #[must_use]
    pub fn new(index: Arc<P>) -> Self {
        Self { index }
    }

    /// Resolve pramana types for a batch of ids, defaulting missing
    /// entries to `shabda` (spec.md §4.5, §4.6 step 5).
    pub async fn pramana_batch(&self, ids: &[String]) -> HashMap<String, PramanaType> {
        let mut resolved = self.index.pramana_batch(ids).await;
        for id in ids {
            resolved
                .entry(id.clone())
                .or_insert_with(PramanaType::default_missing);
        }
        resolved
    }
}

#[async_trait]
impl<P: PramanaIndex> Ranker for PramanaRanker<P> {
    fn name(&self) -> &'static str {
        "pramana"
    }

    async fn rank(&self, query: &str, top_k: usize, project: Option<&str>) -> Vec<RankedResult> {
        match self.index.reliable_entries(query, top_k, project).await {
            Ok(results) => results,
            Err(err) => {
                warn!(ranker = "pramana", error = %err, "ranker failed, eliding from fusion");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedIndex;
    #[async_trait]
    impl PramanaIndex for FixedIndex {
        async fn reliable_entries(
            &self,
            _query: &str,
            _top_k: usize,
            _project: Option<&str>,
        ) -> anyhow::Result<Vec<RankedResult>> {
            Ok(Vec::new())
        }

        async fn pramana_batch(&self, ids: &[String]) -> HashMap<String, PramanaType> {
            ids.iter()
                .filter(|id| id.as_str() == "known")
                .map(|id| (id.clone(), PramanaType::Pratyaksha))
                .collect()
        }
    }

    #[tokio::test]
    async fn missing_ids_default_to_shabda() {
        let ranker = PramanaRanker::new(Arc::new(FixedIndex));
        let ids = vec!["known".to_string(), "unknown".to_string()];
        let map = ranker.pramana_batch(&ids).await;
        assert_eq!(map["known"], PramanaType::Pratyaksha);
        assert_eq!(map["unknown"], PramanaType::Shabda);
    }
}
