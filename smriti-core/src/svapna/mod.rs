//! Svapna: the five-phase offline dream-consolidation cycle (spec.md
//! §4.10). `run()` drains a bounded window of recent sessions once and
//! threads it through REPLAY → RECOMBINE → CRYSTALLIZE → PROCEDURALIZE
//! → COMPRESS, writing results back through the Vasana engine (for
//! CRYSTALLIZE) and the store (Vidhi upserts, consolidation log rows).

mod compress;
mod proceduralize;
mod recombine;
mod replay;

pub use compress::{classify_importance, compress, CompressResult};
pub use proceduralize::{proceduralize, ProceduralizeResult};
pub use recombine::{recombine, Association, RecombineResult};
pub use replay::{replay, ReplayResult, ScoredTurn};

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::store::Store;
use crate::tokenizer::Tokenizer;
use crate::types::{ConsolidationLogRow, ConsolidationPhase, ConsolidationStatus, ProjectScope, Session, Turn};
use crate::vasana::VasanaEngine;

/// Tunables for one consolidation cycle (spec.md §4.10 configuration
/// list, plus `compress_target_ratio` — an implementation choice since
/// spec.md leaves COMPRESS's target length unspecified; see
/// DESIGN.md).
#[derive(Debug, Clone, Copy)]
pub struct SvapnaConfig {
    pub max_sessions_per_cycle: usize,
    pub surprise_threshold: f64,
    pub min_pattern_frequency: u64,
    pub min_sequence_length: usize,
    pub min_success_rate: f64,
    pub compress_target_ratio: f64,
}

impl Default for SvapnaConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_cycle: 50,
            surprise_threshold: 0.6,
            min_pattern_frequency: 3,
            min_sequence_length: 2,
            min_success_rate: 0.8,
            compress_target_ratio: 0.5,
        }
    }
}

/// Outcome of one phase, as logged to the consolidation log (spec.md
/// §3, Consolidation Log).
#[derive(Debug, Clone)]
pub struct PhaseOutcome {
    pub phase: ConsolidationPhase,
    pub status: ConsolidationStatus,
    pub metrics: serde_json::Value,
}

/// Result of one full (or partially-completed) Svapna cycle (spec.md
/// §4.10, `run`).
#[derive(Debug, Clone)]
pub struct SvapnaRunResult {
    pub cycle_id: Uuid,
    pub phases: Vec<PhaseOutcome>,
    pub total_duration_ms: i64,
}

/// A progress callback invoked exactly 10 times per completed cycle:
/// `(phase, 0)` on entry, `(phase, 1)` on exit, for each of the five
/// phases in order (spec.md §8, "progress callback invoked exactly 10
/// times in phase order").
pub type ProgressCallback = dyn Fn(ConsolidationPhase, u8) + Send + Sync;

/// A cooperative cancellation check, polled between phases (spec.md
/// §5, "honors a cancellation request between phases").
pub type CancelCheck = dyn Fn() -> bool + Send + Sync;

pub struct SvapnaConsolidator {
    store: Arc<dyn Store>,
    vasana: Arc<VasanaEngine>,
    tokenizer: Arc<dyn Tokenizer>,
    config: SvapnaConfig,
}

impl SvapnaConsolidator {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        vasana: Arc<VasanaEngine>,
        tokenizer: Arc<dyn Tokenizer>,
        config: SvapnaConfig,
    ) -> Self {
        Self { store, vasana, tokenizer, config }
    }

    /// Run one full consolidation cycle for `project` (spec.md §4.10).
    /// Never propagates a phase failure to the caller: a failing phase
    /// is logged `error`, the cycle log is closed `error`, remaining
    /// phases are skipped, and the function returns a partial result
    /// with zeroed metrics for every unfinished phase (spec.md §7,
    /// "Consolidation phase failure").
    pub async fn run(
        &self,
        project: &str,
        progress_cb: Option<&ProgressCallback>,
        cancel: Option<&CancelCheck>,
    ) -> Result<SvapnaRunResult> {
        let cycle_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut phases = Vec::with_capacity(5);

        let sessions = self.store.recent_sessions(Some(project), self.config.max_sessions_per_cycle).await?;
        let mut per_session: Vec<(Session, Vec<Turn>)> = Vec::with_capacity(sessions.len());
        for session in sessions {
            let turns = self.store.get_turns(session.id).await.unwrap_or_default();
            per_session.push((session, turns));
        }

        for phase in ConsolidationPhase::ALL {
            if let Some(check) = cancel {
                if check() {
                    self.log_phase(cycle_id, project, phase, ConsolidationStatus::Error, serde_json::json!({"reason": "cancelled"}))
                        .await
                        .ok();
                    phases.push(PhaseOutcome { phase, status: ConsolidationStatus::Error, metrics: serde_json::json!({"reason": "cancelled"}) });
                    break;
                }
            }

            emit(progress_cb, phase, 0);
            self.log_phase(cycle_id, project, phase, ConsolidationStatus::Running, serde_json::json!({})).await.ok();

            let outcome = match phase {
                ConsolidationPhase::Replay => self.run_replay(&per_session),
                ConsolidationPhase::Recombine => self.run_recombine(&per_session),
                ConsolidationPhase::Crystallize => self.run_crystallize(project).await,
                ConsolidationPhase::Proceduralize => self.run_proceduralize(project, &per_session).await,
                ConsolidationPhase::Compress => self.run_compress(&per_session),
            };

            match outcome {
                Ok(metrics) => {
                    self.log_phase(cycle_id, project, phase, ConsolidationStatus::Success, metrics.clone()).await.ok();
                    phases.push(PhaseOutcome { phase, status: ConsolidationStatus::Success, metrics });
                    emit(progress_cb, phase, 1);
                }
                Err(err) => {
                    let metrics = serde_json::json!({"error": err.to_string()});
                    self.log_phase(cycle_id, project, phase, ConsolidationStatus::Error, metrics.clone()).await.ok();
                    phases.push(PhaseOutcome { phase, status: ConsolidationStatus::Error, metrics });
                    emit(progress_cb, phase, 1);
                    break;
                }
            }
        }

        let total_duration_ms = (Utc::now() - started_at).num_milliseconds();
        Ok(SvapnaRunResult { cycle_id, phases, total_duration_ms })
    }

    fn run_replay(&self, per_session: &[(Session, Vec<Turn>)]) -> Result<serde_json::Value> {
        let result = replay::replay(per_session, self.config.surprise_threshold);
        Ok(serde_json::json!({
            "scored": result.scored.len(),
            "high_surprise": result.high_surprise.len(),
        }))
    }

    fn run_recombine(&self, per_session: &[(Session, Vec<Turn>)]) -> Result<serde_json::Value> {
        let replay_result = replay::replay(per_session, self.config.surprise_threshold);
        let result = recombine::recombine(&replay_result.scored);
        Ok(serde_json::json!({
            "associations": result.associations.len(),
            "cross_sessions": result.cross_sessions,
        }))
    }

    async fn run_crystallize(&self, project: &str) -> Result<serde_json::Value> {
        let result = self.vasana.crystallize(project).await?;
        Ok(serde_json::json!({
            "vasanas_created": result.created.len(),
            "vasanas_reinforced": result.reinforced.len(),
            "pending": result.pending.len(),
            "change_points": result.change_points.len(),
        }))
    }

    async fn run_proceduralize(&self, project: &str, per_session: &[(Session, Vec<Turn>)]) -> Result<serde_json::Value> {
        let result = proceduralize::proceduralize(
            self.store.as_ref(),
            project,
            per_session,
            self.config.min_sequence_length,
            self.config.min_success_rate,
        )
        .await?;
        Ok(serde_json::json!({ "vidhis": result.vidhis.len() }))
    }

    fn run_compress(&self, per_session: &[(Session, Vec<Turn>)]) -> Result<serde_json::Value> {
        let mut total_old_tokens = 0u64;
        let mut total_new_tokens = 0u64;
        let mut tokens_compressed = 0u64;

        for (_, turns) in per_session {
            let old: u64 = turns.iter().map(|t| self.tokenizer.tokens(&t.content)).sum();
            let result = compress::compress(turns, self.tokenizer.as_ref(), self.config.compress_target_ratio);
            total_old_tokens += old;
            total_new_tokens += (old as f64 * result.compression_ratio).round() as u64;
            tokens_compressed += result.tokens_compressed;
        }

        let compression_ratio = if total_old_tokens == 0 {
            1.0
        } else {
            (total_new_tokens as f64 / total_old_tokens as f64).clamp(f64::MIN_POSITIVE, 1.0)
        };

        Ok(serde_json::json!({
            "tokens_compressed": tokens_compressed,
            "compression_ratio": compression_ratio,
        }))
    }

    async fn log_phase(
        &self,
        cycle_id: Uuid,
        project: &str,
        phase: ConsolidationPhase,
        status: ConsolidationStatus,
        metrics: serde_json::Value,
    ) -> Result<()> {
        let row = ConsolidationLogRow {
            cycle_id,
            project: ProjectScope::from_str(project),
            phase,
            status,
            metrics,
            started_at: Utc::now(),
            ended_at: (!matches!(status, ConsolidationStatus::Running)).then(Utc::now),
        };
        self.store.append_consolidation_log(&row).await
    }
}

fn emit(cb: Option<&ProgressCallback>, phase: ConsolidationPhase, value: u8) {
    if let Some(cb) = cb {
        cb(phase, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::tokenizer::FallbackTokenizer;
    use crate::types::{ConsolidationLogRow as LogRow, MemoryEntry, Samskara, TemporalSummary, Vasana, Vidhi};
    use crate::vasana::VasanaConfig;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MemStore {
        sessions: Mutex<HashMap<Uuid, Session>>,
        turns: Mutex<HashMap<Uuid, Vec<Turn>>>,
        log: Mutex<Vec<LogRow>>,
    }

    #[async_trait]
    impl Store for MemStore {
        async fn put_session(&self, session: &Session) -> crate::error::Result<()> {
            self.sessions.lock().insert(session.id, session.clone());
            Ok(())
        }
        async fn get_session(&self, id: Uuid) -> crate::error::Result<Option<Session>> {
            Ok(self.sessions.lock().get(&id).cloned())
        }
        async fn append_turn(&self, turn: &Turn) -> crate::error::Result<()> {
            self.turns.lock().entry(turn.session_id).or_default().push(turn.clone());
            Ok(())
        }
        async fn get_turns(&self, session_id: Uuid) -> crate::error::Result<Vec<Turn>> {
            Ok(self.turns.lock().get(&session_id).cloned().unwrap_or_default())
        }
        async fn recent_sessions(&self, _project: Option<&str>, limit: usize) -> crate::error::Result<Vec<Session>> {
            let mut sessions: Vec<Session> = self.sessions.lock().values().cloned().collect();
            sessions.sort_by_key(|s| std::cmp::Reverse(s.created_at));
            sessions.truncate(limit);
            Ok(sessions)
        }
        async fn upsert_samskara(&self, _samskara: &Samskara) -> crate::error::Result<()> {
            Ok(())
        }
        async fn list_samskaras(&self, _project: Option<&str>) -> crate::error::Result<Vec<Samskara>> {
            Ok(Vec::new())
        }
        async fn upsert_vasana(&self, _vasana: &Vasana) -> crate::error::Result<()> {
            Ok(())
        }
        async fn get_vasana(&self, _name: &str, _project: &str) -> crate::error::Result<Option<Vasana>> {
            Ok(None)
        }
        async fn list_vasanas(&self, _project: Option<&str>) -> crate::error::Result<Vec<Vasana>> {
            Ok(Vec::new())
        }
        async fn delete_vasana(&self, _id: Uuid) -> crate::error::Result<()> {
            Ok(())
        }
        async fn upsert_vidhi(&self, _vidhi: &Vidhi) -> crate::error::Result<()> {
            Ok(())
        }
        async fn list_vidhis(&self, _project: Option<&str>) -> crate::error::Result<Vec<Vidhi>> {
            Ok(Vec::new())
        }
        async fn get_memory(&self, _key: &str, _scope: &str) -> crate::error::Result<Option<MemoryEntry>> {
            Ok(None)
        }
        async fn set_memory(&self, _entry: &MemoryEntry) -> crate::error::Result<()> {
            Ok(())
        }
        async fn search_memory(&self, _query: &str, _project: Option<&str>) -> crate::error::Result<Vec<MemoryEntry>> {
            Ok(Vec::new())
        }
        async fn get_summary(&self, _level: &str, _period: &str, _project: Option<&str>) -> crate::error::Result<Option<TemporalSummary>> {
            Ok(None)
        }
        async fn put_summary(&self, _summary: &TemporalSummary) -> crate::error::Result<()> {
            Ok(())
        }
        async fn list_summaries(&self, _level: &str, _prefix: &str, _project: Option<&str>) -> crate::error::Result<Vec<TemporalSummary>> {
            Ok(Vec::new())
        }
        async fn append_consolidation_log(&self, row: &LogRow) -> crate::error::Result<()> {
            self.log.lock().push(row.clone());
            Ok(())
        }
        async fn get_blob(&self, _category: &str, _key: &str) -> crate::error::Result<Option<Vec<u8>>> {
            Ok(None)
        }
        async fn put_blob(&self, _category: &str, _key: &str, _bytes: &[u8]) -> crate::error::Result<()> {
            Ok(())
        }
    }

    fn session(project: &str) -> Session {
        Session {
            id: Uuid::new_v4(),
            title: "t".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            project: ProjectScope::from_str(project),
            agent: "agent".into(),
            model: "model".into(),
            provider: "provider".into(),
            parent_session_id: None,
            branch: None,
            tags: vec![],
            cost: 0.0,
            input_tokens: 0,
            output_tokens: 0,
        }
    }

    #[tokio::test]
    async fn progress_callback_fires_exactly_ten_times() {
        let store = Arc::new(MemStore::default());
        let vasana = Arc::new(VasanaEngine::new(store.clone(), VasanaConfig::default()));
        let consolidator =
            SvapnaConsolidator::new(store, vasana, Arc::new(FallbackTokenizer), SvapnaConfig::default());

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let cb = move |_phase: ConsolidationPhase, _v: u8| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        };

        let result = consolidator.run("proj", Some(&cb), None).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 10);
        assert_eq!(result.phases.len(), 5);
        assert!(result.phases.iter().all(|p| p.status == ConsolidationStatus::Success));
    }

    #[tokio::test]
    async fn zero_sessions_yields_compression_ratio_one() {
        let store = Arc::new(MemStore::default());
        let vasana = Arc::new(VasanaEngine::new(store.clone(), VasanaConfig::default()));
        let consolidator =
            SvapnaConsolidator::new(store, vasana, Arc::new(FallbackTokenizer), SvapnaConfig::default());

        let result = consolidator.run("empty-project", None, None).await.unwrap();
        let compress_phase = result.phases.iter().find(|p| p.phase == ConsolidationPhase::Compress).unwrap();
        assert_eq!(compress_phase.metrics["compression_ratio"], serde_json::json!(1.0));
    }

    #[tokio::test]
    async fn cancellation_between_phases_stops_early_and_logs_error() {
        let store = Arc::new(MemStore::default());
        store.put_session(&session("proj")).await.unwrap();
        let vasana = Arc::new(VasanaEngine::new(store.clone(), VasanaConfig::default()));
        let consolidator =
            SvapnaConsolidator::new(store, vasana, Arc::new(FallbackTokenizer), SvapnaConfig::default());

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let cancel = move || calls_clone.fetch_add(1, Ordering::SeqCst) >= 1;

        let result = consolidator.run("proj", None, Some(&cancel)).await.unwrap();
        assert!(result.phases.len() < 5);
        assert_eq!(result.phases.last().unwrap().status, ConsolidationStatus::Error);
    }
}
