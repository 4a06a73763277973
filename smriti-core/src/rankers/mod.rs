//! Individual rankers (spec.md §4.5): BM25, vector, graph-RAG, and
//! Pramana reliability lookup. Each is independent and never throws to
//! the caller — an internal failure yields an empty list and the
//! failure is logged so Hybrid Search can proceed with the surviving
//! signals (spec.md §7, "Ranker failure").

mod bm25;
mod graphrag;
mod pramana;
mod vector;

pub use bm25::{Bm25Ranker, SessionFts};
pub use graphrag::{GraphIndex, GraphRagRanker};
pub use pramana::{PramanaIndex, PramanaRanker};
pub use vector::{TurnEmbeddingIndex, VectorRanker};

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::PramanaType;

/// Batch `id → pramana_type` resolution used by Hybrid Search's
/// epistemic boost (spec.md §4.6 step 5). Implemented by whichever
/// store-side index owns Pramana classification — spec.md §4.6 names
/// the GraphRAG ranker as one exposer of this contract.
#[async_trait]
pub trait PramanaResolver: Send + Sync {
    async fn pramana_batch(&self, ids: &[String]) -> HashMap<String, PramanaType>;
}

/// One hit from an individual ranker (spec.md §4.5).
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub id: String,
    pub title: String,
    pub content_snippet: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub pramana_type: Option<PramanaType>,
}

/// Common shape all four rankers present to Hybrid Search, so the
/// fusion loop (spec.md §4.6 step 2) can treat them uniformly.
#[async_trait]
pub trait Ranker: Send + Sync {
    /// Human-readable name used in logs and test assertions.
    fn name(&self) -> &'static str;

    /// Return up to `top_k` results for `query`, optionally scoped to a
    /// project. Must never panic or propagate an error — on internal
    /// failure, return an empty vector.
    async fn rank(&self, query: &str, top_k: usize, project: Option<&str>) -> Vec<RankedResult>;
}
