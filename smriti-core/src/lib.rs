//! `smriti-core`: persistent agent memory and dream consolidation
//! engine (spec.md §1–§9).
//!
//! This crate owns the data model, the plug-in contracts (`Store`,
//! `Tokenizer`, `Embedder`, `Ranker`, …), the Samshodhana hybrid search
//! engine, the Kala Chakra temporal relevance mixer, the Vasana
//! behavioral-tendency engine, the Svapna offline consolidation cycle,
//! unified recall, hierarchical temporal search, and the identity
//! context loader. Concrete storage (`smriti-storage`) and the
//! operator surface (`smriti-cli`) depend on this crate; it depends on
//! neither.

pub mod embedder;
pub mod error;
pub mod identity;
pub mod kala_chakra;
pub mod rankers;
pub mod recall;
pub mod rng;
pub mod search;
pub mod store;
pub mod streams;
pub mod svapna;
pub mod temporal;
pub mod tokenizer;
pub mod types;
pub mod vasana;
pub mod weight_learner;

pub use embedder::{cosine_similarity, Embedder, MockEmbedder};
pub use error::{Error, Result};
pub use identity::{IdentityLoader, IdentityLoaderConfig};
pub use kala_chakra::{KalaChakra, Scale, ScaleConfig};
pub use rankers::{
    Bm25Ranker, GraphIndex, GraphRagRanker, PramanaIndex, PramanaRanker, PramanaResolver,
    RankedResult, Ranker, SessionFts, TurnEmbeddingIndex, VectorRanker,
};
pub use recall::{DayFileIndex, DayFileMatch, PrimarySource, RecallAnswer, UnifiedRecall, UnifiedRecallConfig};
pub use search::{should_retrieve, HybridResult, HybridSearch, HybridSearchBuilder, HybridSearchConfig};
pub use store::{Store, BOCPD_CATEGORY, BOCPD_PROJECT_KEY, WEIGHT_LEARNER_CATEGORY};
pub use streams::allocate_stream_budget;
pub use svapna::{SvapnaConfig, SvapnaConsolidator, SvapnaRunResult};
pub use temporal::{HierarchicalTemporalSearch, TemporalHit};
pub use tokenizer::{FallbackTokenizer, Tokenizer};
pub use vasana::{BocpdTracker, ChangePointEvent, CrystallizeResult, VasanaConfig, VasanaEngine};
pub use weight_learner::{Signal, ThompsonWeightLearner, Weights};
