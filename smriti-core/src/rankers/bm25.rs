//! BM25 ranker (spec.md §4.5) — delegates to the store's native
//! full-text search over `(session.title, session.tags, session.agent)`.

use async_trait::async_trait;
use tracing::warn;

use super::{RankedResult, Ranker};

/// Store-side contract the BM25 ranker delegates to (spec.md §4.1).
/// Implemented by `smriti-storage`; never panics, but may return an
/// error which this ranker swallows into an empty list.
#[async_trait]
pub trait SessionFts: Send + Sync {
    async fn search_sessions(
        &self,
        query: &str,
        top_k: usize,
        project: Option<&str>,
    ) -> anyhow::Result<Vec<RankedResult>>;
}

pub struct Bm25Ranker<S: SessionFts> {
    store: std::sync::Arc<S>,
}

impl<S: SessionFts> Bm25Ranker<S> {
    #[must_use]
    pub fn new(store: std::sync::Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: SessionFts> Ranker for Bm25Ranker<S> {
    fn name(&self) -> &'static str {
        "bm25"
    }

    async fn rank(&self, query: &str, top_k: usize, project: Option<&str>) -> Vec<RankedResult> {
        match self.store.search_sessions(query, top_k, project).await {
            Ok(results) => results,
            Err(err) => {
                warn!(ranker = "bm25", error = %err, "ranker failed, eliding from fusion");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingFts;
    #[async_trait]
    impl SessionFts for FailingFts {
        async fn search_sessions(
            &self,
            _query: &str,
            _top_k: usize,
            _project: Option<&str>,
        ) -> anyhow::Result<Vec<RankedResult>> {
            anyhow::bail!("store unreachable")
        }
    }

    #[tokio::test]
    async fn failure_yields_empty_list_not_panic() {
        let ranker = Bm25Ranker::new(std::sync::Arc::new(FailingFts));
        let results = ranker.rank("query", 10, None).await;
        assert!(results.is_empty());
    }
}
