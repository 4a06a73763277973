//! Persistence store contract (spec.md §4.1, §6).
//!
//! A single-writer, many-reader embedded relational store. Concrete
//! backends (the `smriti-storage` crate's `libsql`-backed store) plus
//! the markdown file hierarchy implement this trait; `smriti-core`
//! only depends on the contract, never a specific engine.
//!
//! Failure semantics (spec.md §7): any write is transactional. Read
//! errors of a single row must not fail the containing operation —
//! implementations skip and count corrupt rows rather than propagate.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{
    ConsolidationLogRow, MemoryEntry, Samskara, Session, TemporalSummary, Turn, Vasana, Vidhi,
};

/// Reserved keys for the process-wide BOCPD persistence row (spec.md
/// §4.9, §9 "Global mutable state").
pub const BOCPD_CATEGORY: &str = "bocpd_state";
pub const BOCPD_PROJECT_KEY: &str = "__vasana_engine__";

/// Reserved key for the weight-learner persistence row.
pub const WEIGHT_LEARNER_CATEGORY: &str = "weight_learner_state";

#[async_trait]
pub trait Store: Send + Sync {
    async fn put_session(&self, session: &Session) -> Result<()>;
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>>;

    /// Append-only turn insertion. `(session_id, turn_number)` is
    /// unique; callers must supply monotone turn numbers.
    async fn append_turn(&self, turn: &Turn) -> Result<()>;
    async fn get_turns(&self, session_id: Uuid) -> Result<Vec<Turn>>;

    /// Most recent sessions for a project (or all projects when
    /// `project` is `None`), most-recent first.
    async fn recent_sessions(&self, project: Option<&str>, limit: usize) -> Result<Vec<Session>>;

    async fn upsert_samskara(&self, samskara: &Samskara) -> Result<()>;
    async fn list_samskaras(&self, project: Option<&str>) -> Result<Vec<Samskara>>;

    /// Upsert by `(name, project)` (spec.md §3, Vasana).
    async fn upsert_vasana(&self, vasana: &Vasana) -> Result<()>;
    async fn get_vasana(&self, name: &str, project: &str) -> Result<Option<Vasana>>;
    async fn list_vasanas(&self, project: Option<&str>) -> Result<Vec<Vasana>>;
    async fn delete_vasana(&self, id: Uuid) -> Result<()>;

    /// Upsert by `(ordered tool-name sequence, project)`; the key is
    /// the caller-supplied `vidhi.name` (spec.md §3, §4.10.4).
    async fn upsert_vidhi(&self, vidhi: &Vidhi) -> Result<()>;
    async fn list_vidhis(&self, project: Option<&str>) -> Result<Vec<Vidhi>>;

    async fn get_memory(&self, key: &str, scope: &str) -> Result<Option<MemoryEntry>>;
    async fn set_memory(&self, entry: &MemoryEntry) -> Result<()>;
    async fn search_memory(&self, query: &str, project: Option<&str>) -> Result<Vec<MemoryEntry>>;

    async fn get_summary(&self, level: &str, period: &str, project: Option<&str>) -> Result<Option<TemporalSummary>>;
    async fn put_summary(&self, summary: &TemporalSummary) -> Result<()>;
    async fn list_summaries(&self, level: &str, prefix: &str, project: Option<&str>) -> Result<Vec<TemporalSummary>>;

    async fn append_consolidation_log(&self, row: &ConsolidationLogRow) -> Result<()>;

    /// Generic opaque-blob persistence for the weight learner and the
    /// BOCPD state, keyed by `(category, project_key)` (spec.md §4.9,
    /// §9 "Global mutable state"). Returns `None` on parse failure or
    /// absence — callers treat both identically (spec.md §7).
    async fn get_blob(&self, category: &str, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put_blob(&self, category: &str, key: &str, bytes: &[u8]) -> Result<()>;
}
