//! Unified recall (spec.md §4.7): fans out across the hybrid search
//! engine, a turns-fallback path, key-value memory, and consolidated
//! day files, then normalizes, dedups, and ranks across all of them.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::rankers::SessionFts;
use crate::search::HybridSearch;
use crate::store::Store;

/// Scan contract over consolidated day markdown files (spec.md §4.7,
/// "Day-file layer"). Implemented by `smriti-storage`'s markdown
/// hierarchy.
#[async_trait]
pub trait DayFileIndex: Send + Sync {
    async fn search_day_files(&self, query: &str, project: Option<&str>) -> anyhow::Result<Vec<DayFileMatch>>;
}

/// One day file's matches for a query.
#[derive(Debug, Clone)]
pub struct DayFileMatch {
    pub date: String,
    pub matches: Vec<String>,
}

/// Which recall layer produced an answer (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimarySource {
    Turns,
    Memory,
    DayFile,
    Hybrid,
    Graph,
}

impl PrimarySource {
    fn as_str(self) -> &'static str {
        match self {
            PrimarySource::Turns => "turns",
            PrimarySource::Memory => "memory",
            PrimarySource::DayFile => "dayfile",
            PrimarySource::Hybrid => "hybrid",
            PrimarySource::Graph => "graph",
        }
    }
}

/// One ranked, unified answer (spec.md §4.7).
#[derive(Debug, Clone)]
pub struct RecallAnswer {
    pub score: f64,
    pub answer_text: String,
    pub primary_source: PrimarySource,
    pub snippet: String,
    pub session_id: Option<Uuid>,
    pub project: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub provider: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UnifiedRecallConfig {
    pub limit: usize,
    pub include_memory: bool,
    pub include_day_files: bool,
    pub project: Option<String>,
}

impl Default for UnifiedRecallConfig {
    fn default() -> Self {
        Self { limit: 5, include_memory: true, include_day_files: true, project: None }
    }
}

pub struct UnifiedRecall {
    hybrid: Arc<HybridSearch>,
    session_fts: Arc<dyn SessionFts>,
    store: Arc<dyn Store>,
    day_files: Option<Arc<dyn DayFileIndex>>,
}

impl UnifiedRecall {
    #[must_use]
    pub fn new(
        hybrid: Arc<HybridSearch>,
        session_fts: Arc<dyn SessionFts>,
        store: Arc<dyn Store>,
        day_files: Option<Arc<dyn DayFileIndex>>,
    ) -> Self {
        Self { hybrid, session_fts, store, day_files }
    }

    /// Dispatch every layer, normalize, dedup, and rank (spec.md §4.7).
    /// Never rejects: a failing layer contributes an empty list.
    pub async fn recall(&self, query: &str, config: &UnifiedRecallConfig) -> Vec<RecallAnswer> {
        let project = config.project.as_deref();

        let (hybrid_answers, memory_answers, day_file_answers) = tokio::join!(
            self.hybrid_layer(query, project),
            self.memory_layer(query, config),
            self.day_file_layer(query, config),
        );

        let mut answers = hybrid_answers;
        if answers.is_empty() {
            answers.extend(self.turns_fallback_layer(query, project).await);
        }
        answers.extend(memory_answers);
        answers.extend(day_file_answers);

        dedup(&mut answers);
        answers.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        answers.truncate(config.limit);
        answers
    }

    async fn hybrid_layer(&self, query: &str, project: Option<&str>) -> Vec<RecallAnswer> {
        let overrides = project.map(|p| crate::search::HybridSearchConfig {
            project: Some(p.to_string()),
            ..crate::search::HybridSearchConfig::default()
        });
        let hits = self.hybrid.gated_search(query, overrides).await;

        hits.into_iter()
            .map(|hit| {
                let normalized = (hit.score / (hit.score + 0.5)).min(1.0);
                let only_graphrag = hit.sources.len() == 1 && hit.sources.contains("graphrag");
                let only_bm25 = hit.sources.len() == 1 && hit.sources.contains("bm25");
                let primary_source = if only_graphrag {
                    PrimarySource::Graph
                } else if only_bm25 {
                    PrimarySource::Turns
                } else {
                    PrimarySource::Hybrid
                };
                let session_id = hit.id.strip_prefix("session-").and_then(|s| Uuid::parse_str(s).ok());
                RecallAnswer {
                    score: normalized,
                    answer_text: truncate(&hit.content_snippet, 300),
                    primary_source,
                    snippet: truncate(&hit.content_snippet, 300),
                    session_id,
                    project: None,
                    date: hit.timestamp,
                    provider: None,
                }
            })
            .collect()
    }

    async fn turns_fallback_layer(&self, query: &str, project: Option<&str>) -> Vec<RecallAnswer> {
        let sessions = match self.session_fts.search_sessions(query, 10, project).await {
            Ok(hits) => hits,
            Err(_) => return Vec::new(),
        };

        let terms = query_terms(query);
        let mut answers = Vec::new();

        for hit in sessions.into_iter().take(10) {
            let Some(session_id) = Uuid::parse_str(&hit.id).ok() else { continue };
            let Ok(Some(session)) = self.store.get_session(session_id).await else { continue };
            let Ok(turns) = self.store.get_turns(session_id).await else { continue };
            if turns.is_empty() {
                continue;
            }

            let best = turns
                .iter()
                .map(|turn| (turn, term_overlap_score(&terms, &turn.content)))
                .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let Some((turn, score)) = best else { continue };
            let provider_or_agent =
                if session.provider.is_empty() { session.agent.clone() } else { session.provider.clone() };
            let basename = project_basename(session.project.as_str());
            let date = session.created_at.format("%Y-%m-%d");
            let snippet = truncate(&turn.content, 300);
            let answer_text = truncate(
                &format!("In {basename} ({date}) via {provider_or_agent}: {snippet}"),
                300,
            );

            answers.push(RecallAnswer {
                score,
                answer_text,
                primary_source: PrimarySource::Turns,
                snippet,
                session_id: Some(session_id),
                project: Some(session.project.as_str().to_string()),
                date: Some(session.created_at),
                provider: Some(provider_or_agent),
            });
        }

        answers
    }

    async fn memory_layer(&self, query: &str, config: &UnifiedRecallConfig) -> Vec<RecallAnswer> {
        if !config.include_memory {
            return Vec::new();
        }
        let Ok(entries) = self.store.search_memory(query, config.project.as_deref()).await else {
            return Vec::new();
        };

        entries
            .into_iter()
            .take(5)
            .map(|entry| {
                let relevance = entry.relevance.unwrap_or(0.5);
                let score = (relevance + 0.1).min(1.0);
                let snippet = truncate(&entry.content, 300);
                RecallAnswer {
                    score,
                    answer_text: truncate(&format!("From memory: {snippet}"), 300),
                    primary_source: PrimarySource::Memory,
                    snippet,
                    session_id: None,
                    project: Some(entry.scope.as_str().to_string()),
                    date: Some(entry.updated_at),
                    provider: None,
                }
            })
            .collect()
    }

    async fn day_file_layer(&self, query: &str, config: &UnifiedRecallConfig) -> Vec<RecallAnswer> {
        if !config.include_day_files {
            return Vec::new();
        }
        let Some(index) = &self.day_files else {
            return Vec::new();
        };
        let Ok(hits) = index.search_day_files(query, config.project.as_deref()).await else {
            return Vec::new();
        };

        hits.into_iter()
            .map(|day| {
                let joined = day.matches.join(" | ");
                let answer_text = truncate(&format!("On {}: {joined}", day.date), 300);
                RecallAnswer {
                    score: 0.5,
                    answer_text: answer_text.clone(),
                    primary_source: PrimarySource::DayFile,
                    snippet: answer_text,
                    session_id: None,
                    project: config.project.clone(),
                    date: None,
                    provider: None,
                }
            })
            .collect()
    }
}

fn dedup(answers: &mut Vec<RecallAnswer>) {
    let mut seen_sessions = HashSet::new();
    let mut first_pass = Vec::with_capacity(answers.len());
    for answer in answers.drain(..) {
        if let Some(id) = answer.session_id {
            if !seen_sessions.insert(id) {
                continue;
            }
        }
        first_pass.push(answer);
    }

    let mut seen_source_snippet = HashSet::new();
    let mut second_pass = Vec::with_capacity(first_pass.len());
    for answer in first_pass {
        let prefix: String = answer.snippet.chars().take(50).collect::<String>().to_lowercase();
        let key = (answer.primary_source.as_str(), prefix);
        if seen_source_snippet.insert(key) {
            second_pass.push(answer);
        }
    }

    *answers = second_pass;
}

fn query_terms(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).filter(|t| t.len() > 2).collect()
}

fn term_overlap_score(terms: &[String], content: &str) -> f64 {
    if terms.is_empty() {
        return 0.3;
    }
    let content = content.to_lowercase();
    let hits = terms.iter().filter(|t| content.contains(t.as_str())).count();
    (hits as f64 / terms.len() as f64 + 0.3).min(1.0)
}

fn project_basename(project: &str) -> String {
    std::path::Path::new(project)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| project.to_string())
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_len.saturating_sub(1)).collect();
    format!("{truncated}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(source: PrimarySource, session_id: Option<Uuid>, snippet: &str, score: f64) -> RecallAnswer {
        RecallAnswer {
            score,
            answer_text: snippet.to_string(),
            primary_source: source,
            snippet: snippet.to_string(),
            session_id,
            project: None,
            date: None,
            provider: None,
        }
    }

    #[test]
    fn seed_scenario_4_dedup_by_session_and_snippet_prefix() {
        let shared_session = Uuid::new_v4();
        let mut answers = vec![
            answer(PrimarySource::Turns, Some(shared_session), "first hit here", 0.9),
            answer(PrimarySource::Turns, Some(shared_session), "a totally different snippet", 0.4),
            answer(
                PrimarySource::Memory,
                None,
                "the quick brown fox jumps over the lazy dog repeatedly today",
                0.7,
            ),
            answer(
                PrimarySource::Memory,
                None,
                "the quick brown fox jumps over the lazy dog repeatedly forever",
                0.6,
            ),
        ];
        dedup(&mut answers);
        assert_eq!(answers.len(), 2);
    }

    #[test]
    fn truncate_adds_ellipsis_only_when_needed() {
        assert_eq!(truncate("short", 300), "short");
        let long = "x".repeat(310);
        let truncated = truncate(&long, 300);
        assert_eq!(truncated.chars().count(), 300);
        assert!(truncated.ends_with('…'));
    }

    #[test]
    fn term_overlap_score_caps_at_one() {
        let terms = query_terms("deploy release pipeline");
        let score = term_overlap_score(&terms, "deploy release pipeline finished");
        assert!(score <= 1.0);
    }

    #[test]
    fn project_basename_strips_path_components() {
        assert_eq!(project_basename("/home/user/projects/acme"), "acme");
        assert_eq!(project_basename("__global__"), "__global__");
    }
}
