//! `impl Store for LibsqlStore` (spec.md §4.1) plus the search-side
//! index traits the rankers delegate to (spec.md §4.5): `SessionFts`,
//! `TurnEmbeddingIndex`, `GraphIndex`, `PramanaIndex`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use smriti_core::error::{Error as CoreError, Result as CoreResult};
use smriti_core::rankers::{
    GraphIndex, PramanaIndex, PramanaResolver, RankedResult, SessionFts, TurnEmbeddingIndex,
};
use smriti_core::store::{Store, BOCPD_CATEGORY};
use smriti_core::types::{
    ConsolidationLogRow, MemoryEntry, PramanaType, Samskara, Session, TemporalSummary,
    Turn, Vasana, Vidhi,
};

use crate::rows;
use crate::schema::GLOBAL_PROJECT_KEY;
use crate::LibsqlStore;

fn into_core<T>(result: crate::error::Result<T>) -> CoreResult<T> {
    result.map_err(CoreError::from)
}

#[async_trait]
impl Store for LibsqlStore {
    async fn put_session(&self, session: &Session) -> CoreResult<()> {
        into_core(self.put_session_inner(session).await)
    }

    async fn get_session(&self, id: Uuid) -> CoreResult<Option<Session>> {
        into_core(self.get_session_inner(id).await)
    }

    async fn append_turn(&self, turn: &Turn) -> CoreResult<()> {
        into_core(self.append_turn_inner(turn).await)
    }

    async fn get_turns(&self, session_id: Uuid) -> CoreResult<Vec<Turn>> {
        into_core(self.get_turns_inner(session_id).await)
    }

    async fn recent_sessions(&self, project: Option<&str>, limit: usize) -> CoreResult<Vec<Session>> {
        into_core(self.recent_sessions_inner(project, limit).await)
    }

    async fn upsert_samskara(&self, samskara: &Samskara) -> CoreResult<()> {
        into_core(self.upsert_samskara_inner(samskara).await)
    }

    async fn list_samskaras(&self, project: Option<&str>) -> CoreResult<Vec<Samskara>> {
        into_core(self.list_samskaras_inner(project).await)
    }

    async fn upsert_vasana(&self, vasana: &Vasana) -> CoreResult<()> {
        into_core(self.upsert_vasana_inner(vasana).await)
    }

    async fn get_vasana(&self, name: &str, project: &str) -> CoreResult<Option<Vasana>> {
        into_core(self.get_vasana_inner(name, project).await)
    }

    async fn list_vasanas(&self, project: Option<&str>) -> CoreResult<Vec<Vasana>> {
        into_core(self.list_vasanas_inner(project).await)
    }

    async fn delete_vasana(&self, id: Uuid) -> CoreResult<()> {
        into_core(self.delete_vasana_inner(id).await)
    }

    async fn upsert_vidhi(&self, vidhi: &Vidhi) -> CoreResult<()> {
        into_core(self.upsert_vidhi_inner(vidhi).await)
    }

    async fn list_vidhis(&self, project: Option<&str>) -> CoreResult<Vec<Vidhi>> {
        into_core(self.list_vidhis_inner(project).await)
    }

    async fn get_memory(&self, key: &str, scope: &str) -> CoreResult<Option<MemoryEntry>> {
        into_core(self.get_memory_inner(key, scope).await)
    }

    async fn set_memory(&self, entry: &MemoryEntry) -> CoreResult<()> {
        into_core(self.set_memory_inner(entry).await)
    }

    async fn search_memory(&self, query: &str, project: Option<&str>) -> CoreResult<Vec<MemoryEntry>> {
        into_core(self.search_memory_inner(query, project).await)
    }

    async fn get_summary(
        &self,
        level: &str,
        period: &str,
        project: Option<&str>,
    ) -> CoreResult<Option<TemporalSummary>> {
        into_core(self.get_summary_inner(level, period, project).await)
    }

    async fn put_summary(&self, summary: &TemporalSummary) -> CoreResult<()> {
        into_core(self.put_summary_inner(summary).await)
    }

    async fn list_summaries(
        &self,
        level: &str,
        prefix: &str,
        project: Option<&str>,
    ) -> CoreResult<Vec<TemporalSummary>> {
        into_core(self.list_summaries_inner(level, prefix, project).await)
    }

    async fn append_consolidation_log(&self, row: &ConsolidationLogRow) -> CoreResult<()> {
        into_core(self.append_consolidation_log_inner(row).await)
    }

    async fn get_blob(&self, category: &str, key: &str) -> CoreResult<Option<Vec<u8>>> {
        into_core(self.get_blob_inner(category, key).await)
    }

    async fn put_blob(&self, category: &str, key: &str, bytes: &[u8]) -> CoreResult<()> {
        into_core(self.put_blob_inner(category, key, bytes).await)
    }
}

impl LibsqlStore {
    async fn put_session_inner(&self, session: &Session) -> crate::error::Result<()> {
        let conn = self.connection()?;
        conn.execute(
            r#"INSERT INTO sessions (
                id, title, created_at, updated_at, project, agent, model, provider,
                parent_session_id, branch, tags, cost, input_tokens, output_tokens
            ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?)
            ON CONFLICT(id) DO UPDATE SET
                title=excluded.title, updated_at=excluded.updated_at, project=excluded.project,
                agent=excluded.agent, model=excluded.model, provider=excluded.provider,
                parent_session_id=excluded.parent_session_id, branch=excluded.branch,
                tags=excluded.tags, cost=excluded.cost, input_tokens=excluded.input_tokens,
                output_tokens=excluded.output_tokens"#,
            libsql::params![
                session.id.to_string(),
                session.title.clone(),
                session.created_at.timestamp(),
                session.updated_at.timestamp(),
                session.project.as_str().to_string(),
                session.agent.clone(),
                session.model.clone(),
                session.provider.clone(),
                session.parent_session_id.map(|id| id.to_string()),
                session.branch.clone(),
                serde_json::to_string(&session.tags)?,
                session.cost,
                session.input_tokens as i64,
                session.output_tokens as i64,
            ],
        )
        .await?;
        Ok(())
    }

    async fn get_session_inner(&self, id: Uuid) -> crate::error::Result<Option<Session>> {
        let conn = self.connection()?;
        let mut result = conn
            .query(
                r#"SELECT id, title, created_at, updated_at, project, agent, model, provider,
                          parent_session_id, branch, tags, cost, input_tokens, output_tokens
                   FROM sessions WHERE id = ?"#,
                libsql::params![id.to_string()],
            )
            .await?;
        match result.next().await? {
            Some(row) => Ok(Some(rows::session_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn append_turn_inner(&self, turn: &Turn) -> crate::error::Result<()> {
        let conn = self.connection()?;
        conn.execute(
            r#"INSERT INTO turns (session_id, turn_number, role, content, tool_calls, created_at)
               VALUES (?,?,?,?,?,?)"#,
            libsql::params![
                turn.session_id.to_string(),
                i64::from(turn.turn_number),
                turn.role.as_str().to_string(),
                turn.content.clone(),
                serde_json::to_string(&turn.tool_calls)?,
                turn.created_at.timestamp(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn get_turns_inner(&self, session_id: Uuid) -> crate::error::Result<Vec<Turn>> {
        let conn = self.connection()?;
        let mut result = conn
            .query(
                r#"SELECT session_id, turn_number, role, content, tool_calls, created_at
                   FROM turns WHERE session_id = ? ORDER BY turn_number ASC"#,
                libsql::params![session_id.to_string()],
            )
            .await?;
        let mut turns = Vec::new();
        while let Some(row) = result.next().await? {
            match rows::turn_from_row(&row) {
                Ok(turn) => turns.push(turn),
                Err(err) => debug!(error = %err, "skipping corrupt turn row"),
            }
        }
        Ok(turns)
    }

    async fn recent_sessions_inner(
        &self,
        project: Option<&str>,
        limit: usize,
    ) -> crate::error::Result<Vec<Session>> {
        let conn = self.connection()?;
        let base = r#"SELECT id, title, created_at, updated_at, project, agent, model, provider,
                             parent_session_id, branch, tags, cost, input_tokens, output_tokens
                      FROM sessions"#;
        let mut result = match project {
            Some(p) => {
                conn.query(
                    &format!("{base} WHERE project = ? ORDER BY created_at DESC LIMIT ?"),
                    libsql::params![p.to_string(), limit as i64],
                )
                .await?
            }
            None => {
                conn.query(&format!("{base} ORDER BY created_at DESC LIMIT ?"), libsql::params![limit as i64])
                    .await?
            }
        };
        let mut sessions = Vec::new();
        while let Some(row) = result.next().await? {
            match rows::session_from_row(&row) {
                Ok(session) => sessions.push(session),
                Err(err) => debug!(error = %err, "skipping corrupt session row"),
            }
        }
        Ok(sessions)
    }

    async fn upsert_samskara_inner(&self, samskara: &Samskara) -> crate::error::Result<()> {
        let conn = self.connection()?;
        conn.execute(
            r#"INSERT INTO samskaras (
                id, session_id, pattern_type, pattern_content, observation_count,
                confidence, pramana_type, project, created_at, updated_at
            ) VALUES (?,?,?,?,?,?,?,?,?,?)
            ON CONFLICT(id) DO UPDATE SET
                pattern_type=excluded.pattern_type, pattern_content=excluded.pattern_content,
                observation_count=excluded.observation_count, confidence=excluded.confidence,
                pramana_type=excluded.pramana_type, updated_at=excluded.updated_at"#,
            libsql::params![
                samskara.id.to_string(),
                samskara.session_id.to_string(),
                samskara.pattern_type.as_str().to_string(),
                samskara.pattern_content.clone(),
                samskara.observation_count as i64,
                samskara.confidence,
                samskara.pramana_type.map(|p| p.as_str().to_string()),
                samskara.project.as_str().to_string(),
                samskara.created_at.timestamp(),
                samskara.updated_at.timestamp(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn list_samskaras_inner(&self, project: Option<&str>) -> crate::error::Result<Vec<Samskara>> {
        let conn = self.connection()?;
        let base = r#"SELECT id, session_id, pattern_type, pattern_content, observation_count,
                             confidence, pramana_type, project, created_at, updated_at
                      FROM samskaras"#;
        let mut result = match project {
            Some(p) => conn.query(&format!("{base} WHERE project = ?"), libsql::params![p.to_string()]).await?,
            None => conn.query(base, ()).await?,
        };
        let mut out = Vec::new();
        while let Some(row) = result.next().await? {
            match rows::samskara_from_row(&row) {
                Ok(s) => out.push(s),
                Err(err) => debug!(error = %err, "skipping corrupt samskara row"),
            }
        }
        Ok(out)
    }

    async fn upsert_vasana_inner(&self, vasana: &Vasana) -> crate::error::Result<()> {
        let conn = self.connection()?;
        let source_ids: Vec<String> = vasana.source_samskaras.iter().map(Uuid::to_string).collect();
        conn.execute(
            r#"INSERT INTO vasanas (
                id, name, description, valence, strength, stability, predictive_accuracy,
                source_samskaras, reinforcement_count, project, created_at, updated_at,
                last_activated, activation_count
            ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?)
            ON CONFLICT(name, project) DO UPDATE SET
                description=excluded.description, valence=excluded.valence, strength=excluded.strength,
                stability=excluded.stability, predictive_accuracy=excluded.predictive_accuracy,
                source_samskaras=excluded.source_samskaras, reinforcement_count=excluded.reinforcement_count,
                updated_at=excluded.updated_at, last_activated=excluded.last_activated,
                activation_count=excluded.activation_count"#,
            libsql::params![
                vasana.id.to_string(),
                vasana.name.clone(),
                vasana.description.clone(),
                vasana.valence.as_str().to_string(),
                vasana.strength,
                vasana.stability,
                vasana.predictive_accuracy,
                serde_json::to_string(&source_ids)?,
                vasana.reinforcement_count as i64,
                vasana.project.as_str().to_string(),
                vasana.created_at.timestamp(),
                vasana.updated_at.timestamp(),
                vasana.last_activated.map(|t| t.timestamp()),
                vasana.activation_count as i64,
            ],
        )
        .await?;
        Ok(())
    }

    async fn get_vasana_inner(&self, name: &str, project: &str) -> crate::error::Result<Option<Vasana>> {
        let conn = self.connection()?;
        let mut result = conn
            .query(
                r#"SELECT id, name, description, valence, strength, stability, predictive_accuracy,
                          source_samskaras, reinforcement_count, project, created_at, updated_at,
                          last_activated, activation_count
                   FROM vasanas WHERE name = ? AND project = ?"#,
                libsql::params![name.to_string(), project.to_string()],
            )
            .await?;
        match result.next().await? {
            Some(row) => Ok(Some(rows::vasana_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_vasanas_inner(&self, project: Option<&str>) -> crate::error::Result<Vec<Vasana>> {
        let conn = self.connection()?;
        let base = r#"SELECT id, name, description, valence, strength, stability, predictive_accuracy,
                             source_samskaras, reinforcement_count, project, created_at, updated_at,
                             last_activated, activation_count
                      FROM vasanas"#;
        let mut result = match project {
            Some(p) => conn.query(&format!("{base} WHERE project = ?"), libsql::params![p.to_string()]).await?,
            None => conn.query(base, ()).await?,
        };
        let mut out = Vec::new();
        while let Some(row) = result.next().await? {
            match rows::vasana_from_row(&row) {
                Ok(v) => out.push(v),
                Err(err) => debug!(error = %err, "skipping corrupt vasana row"),
            }
        }
        Ok(out)
    }

    async fn delete_vasana_inner(&self, id: Uuid) -> crate::error::Result<()> {
        let conn = self.connection()?;
        conn.execute("DELETE FROM vasanas WHERE id = ?", libsql::params![id.to_string()]).await?;
        Ok(())
    }

    async fn upsert_vidhi_inner(&self, vidhi: &Vidhi) -> crate::error::Result<()> {
        let conn = self.connection()?;
        let learned_from: Vec<String> = vidhi.learned_from.iter().map(Uuid::to_string).collect();
        conn.execute(
            r#"INSERT INTO vidhis (
                id, name, steps, triggers, parameter_schema, confidence, success_count,
                failure_count, learned_from, project, created_at, updated_at
            ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?)
            ON CONFLICT(name, project) DO UPDATE SET
                steps=excluded.steps, triggers=excluded.triggers, parameter_schema=excluded.parameter_schema,
                confidence=excluded.confidence, success_count=excluded.success_count,
                failure_count=excluded.failure_count, learned_from=excluded.learned_from,
                updated_at=excluded.updated_at"#,
            libsql::params![
                vidhi.id.to_string(),
                vidhi.name.clone(),
                serde_json::to_string(&vidhi.steps)?,
                serde_json::to_string(&vidhi.triggers)?,
                serde_json::to_string(&vidhi.parameter_schema)?,
                vidhi.confidence,
                vidhi.success_count as i64,
                vidhi.failure_count as i64,
                serde_json::to_string(&learned_from)?,
                vidhi.project.as_str().to_string(),
                vidhi.created_at.timestamp(),
                vidhi.updated_at.timestamp(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn list_vidhis_inner(&self, project: Option<&str>) -> crate::error::Result<Vec<Vidhi>> {
        let conn = self.connection()?;
        let base = r#"SELECT id, name, steps, triggers, parameter_schema, confidence, success_count,
                             failure_count, learned_from, project, created_at, updated_at
                      FROM vidhis"#;
        let mut result = match project {
            Some(p) => conn.query(&format!("{base} WHERE project = ?"), libsql::params![p.to_string()]).await?,
            None => conn.query(base, ()).await?,
        };
        let mut out = Vec::new();
        while let Some(row) = result.next().await? {
            match rows::vidhi_from_row(&row) {
                Ok(v) => out.push(v),
                Err(err) => debug!(error = %err, "skipping corrupt vidhi row"),
            }
        }
        Ok(out)
    }

    async fn get_memory_inner(&self, key: &str, scope: &str) -> crate::error::Result<Option<MemoryEntry>> {
        let conn = self.connection()?;
        let mut result = conn
            .query(
                "SELECT key, scope, content, relevance, updated_at FROM memory WHERE key = ? AND scope = ?",
                libsql::params![key.to_string(), scope.to_string()],
            )
            .await?;
        match result.next().await? {
            Some(row) => Ok(Some(rows::memory_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn set_memory_inner(&self, entry: &MemoryEntry) -> crate::error::Result<()> {
        let conn = self.connection()?;
        conn.execute(
            r#"INSERT INTO memory (key, scope, content, relevance, updated_at) VALUES (?,?,?,?,?)
               ON CONFLICT(key, scope) DO UPDATE SET
                 content=excluded.content, relevance=excluded.relevance, updated_at=excluded.updated_at"#,
            libsql::params![
                entry.key.clone(),
                entry.scope.as_str().to_string(),
                entry.content.clone(),
                entry.relevance,
                entry.updated_at.timestamp(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn search_memory_inner(
        &self,
        query: &str,
        project: Option<&str>,
    ) -> crate::error::Result<Vec<MemoryEntry>> {
        let conn = self.connection()?;
        let like = format!("%{}%", query.replace('%', ""));
        let mut result = match project {
            Some(p) => {
                conn.query(
                    r#"SELECT key, scope, content, relevance, updated_at FROM memory
                       WHERE (scope = ? OR scope = ?) AND (content LIKE ? OR key LIKE ?)
                       ORDER BY updated_at DESC"#,
                    libsql::params![p.to_string(), GLOBAL_PROJECT_KEY.to_string(), like.clone(), like],
                )
                .await?
            }
            None => {
                conn.query(
                    r#"SELECT key, scope, content, relevance, updated_at FROM memory
                       WHERE content LIKE ? OR key LIKE ? ORDER BY updated_at DESC"#,
                    libsql::params![like.clone(), like],
                )
                .await?
            }
        };
        let mut out = Vec::new();
        while let Some(row) = result.next().await? {
            match rows::memory_from_row(&row) {
                Ok(m) => out.push(m),
                Err(err) => debug!(error = %err, "skipping corrupt memory row"),
            }
        }
        Ok(out)
    }

    async fn get_summary_inner(
        &self,
        level: &str,
        period: &str,
        project: Option<&str>,
    ) -> crate::error::Result<Option<TemporalSummary>> {
        let conn = self.connection()?;
        let project_key = project.unwrap_or(GLOBAL_PROJECT_KEY);
        let mut result = conn
            .query(
                "SELECT level, period, project, content FROM consolidation_summaries WHERE level = ? AND period = ? AND project = ?",
                libsql::params![level.to_string(), period.to_string(), project_key.to_string()],
            )
            .await?;
        match result.next().await? {
            Some(row) => Ok(Some(rows::temporal_summary_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn put_summary_inner(&self, summary: &TemporalSummary) -> crate::error::Result<()> {
        let conn = self.connection()?;
        let project_key = summary.project.as_deref().unwrap_or(GLOBAL_PROJECT_KEY);
        conn.execute(
            r#"INSERT INTO consolidation_summaries (level, period, project, content) VALUES (?,?,?,?)
               ON CONFLICT(level, period, project) DO UPDATE SET content = excluded.content"#,
            libsql::params![summary.level.as_str().to_string(), summary.period.clone(), project_key.to_string(), summary.content.clone()],
        )
        .await?;
        Ok(())
    }

    async fn list_summaries_inner(
        &self,
        level: &str,
        prefix: &str,
        project: Option<&str>,
    ) -> crate::error::Result<Vec<TemporalSummary>> {
        let conn = self.connection()?;
        let like = format!("{prefix}%");
        let mut result = match project {
            Some(p) => {
                conn.query(
                    r#"SELECT level, period, project, content FROM consolidation_summaries
                       WHERE level = ? AND period LIKE ? AND (project = ? OR project = ?)"#,
                    libsql::params![level.to_string(), like, p.to_string(), GLOBAL_PROJECT_KEY.to_string()],
                )
                .await?
            }
            None => {
                conn.query(
                    "SELECT level, period, project, content FROM consolidation_summaries WHERE level = ? AND period LIKE ?",
                    libsql::params![level.to_string(), like],
                )
                .await?
            }
        };
        let mut out = Vec::new();
        while let Some(row) = result.next().await? {
            match rows::temporal_summary_from_row(&row) {
                Ok(s) => out.push(s),
                Err(err) => debug!(error = %err, "skipping corrupt summary row"),
            }
        }
        Ok(out)
    }

    async fn append_consolidation_log_inner(&self, row: &ConsolidationLogRow) -> crate::error::Result<()> {
        let conn = self.connection()?;
        conn.execute(
            r#"INSERT INTO consolidation_log (cycle_id, project, phase, status, metrics, started_at, ended_at)
               VALUES (?,?,?,?,?,?,?)"#,
            libsql::params![
                row.cycle_id.to_string(),
                row.project.as_str().to_string(),
                row.phase.as_str().to_string(),
                row.status.as_str().to_string(),
                serde_json::to_string(&row.metrics)?,
                row.started_at.timestamp(),
                row.ended_at.map(|t| t.timestamp()),
            ],
        )
        .await?;
        Ok(())
    }

    async fn get_blob_inner(&self, category: &str, key: &str) -> crate::error::Result<Option<Vec<u8>>> {
        let conn = self.connection()?;
        let table = blob_table(category);
        let mut result = conn
            .query(
                &format!("SELECT bytes FROM {table} WHERE category = ? AND key = ?"),
                libsql::params![category.to_string(), key.to_string()],
            )
            .await?;
        match result.next().await? {
            Some(row) => Ok(Some(row.get::<Vec<u8>>(0)?)),
            None => Ok(None),
        }
    }

    async fn put_blob_inner(&self, category: &str, key: &str, bytes: &[u8]) -> crate::error::Result<()> {
        let conn = self.connection()?;
        let table = blob_table(category);
        conn.execute(
            &format!(
                "INSERT INTO {table} (category, key, bytes) VALUES (?,?,?) \
                 ON CONFLICT(category, key) DO UPDATE SET bytes = excluded.bytes"
            ),
            libsql::params![category.to_string(), key.to_string(), bytes.to_vec()],
        )
        .await?;
        Ok(())
    }
}

/// Routes the BOCPD reserved category to `consolidation_rules` and
/// everything else (currently just the weight learner) to
/// `nidra_state` (spec.md §6, §9 "Global mutable state").
fn blob_table(category: &str) -> &'static str {
    if category == BOCPD_CATEGORY {
        "consolidation_rules"
    } else {
        "nidra_state"
    }
}

// ---- Search-side index traits (spec.md §4.5) ----

#[async_trait]
impl SessionFts for LibsqlStore {
    async fn search_sessions(
        &self,
        query: &str,
        top_k: usize,
        project: Option<&str>,
    ) -> anyhow::Result<Vec<RankedResult>> {
        let conn = self.connection()?;
        let fts_query = sanitize_fts_query(query);
        if fts_query.is_empty() {
            return Ok(Vec::new());
        }

        let mut result = match project {
            Some(p) => {
                conn.query(
                    r#"SELECT s.id, s.title, bm25(sessions_fts) AS rank, s.project
                       FROM sessions_fts JOIN sessions s ON s.id = sessions_fts.session_id
                       WHERE sessions_fts MATCH ? AND s.project = ?
                       ORDER BY rank LIMIT ?"#,
                    libsql::params![fts_query, p.to_string(), top_k as i64],
                )
                .await?
            }
            None => {
                conn.query(
                    r#"SELECT s.id, s.title, bm25(sessions_fts) AS rank, s.project
                       FROM sessions_fts JOIN sessions s ON s.id = sessions_fts.session_id
                       WHERE sessions_fts MATCH ?
                       ORDER BY rank LIMIT ?"#,
                    libsql::params![fts_query, top_k as i64],
                )
                .await?
            }
        };

        let mut out = Vec::new();
        while let Some(row) = result.next().await? {
            let id: String = row.get(0)?;
            let title: String = row.get(1)?;
            out.push(RankedResult {
                id: format!("session-{id}"),
                title: title.clone(),
                content_snippet: title,
                timestamp: None,
                pramana_type: None,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl TurnEmbeddingIndex for LibsqlStore {
    async fn nearest(
        &self,
        embedding: &[f32],
        top_k: usize,
        project: Option<&str>,
    ) -> anyhow::Result<Vec<RankedResult>> {
        let conn = self.connection()?;
        let base = r#"SELECT te.session_id, te.turn_number, te.embedding, t.content, t.created_at
                      FROM turn_embeddings te JOIN turns t
                        ON t.session_id = te.session_id AND t.turn_number = te.turn_number"#;
        let mut result = match project {
            Some(p) => conn.query(&format!("{base} WHERE te.project = ?"), libsql::params![p.to_string()]).await?,
            None => conn.query(base, ()).await?,
        };

        let mut scored: Vec<(f64, RankedResult)> = Vec::new();
        while let Some(row) = result.next().await? {
            let session_id: String = row.get(0)?;
            let turn_number: i64 = row.get(1)?;
            let raw: Vec<u8> = row.get(2)?;
            let content: String = row.get(3)?;
            let created_at: i64 = row.get(4)?;
            let Some(stored) = decode_embedding(&raw) else { continue };
            let sim = f64::from(smriti_core::cosine_similarity(embedding, &stored));
            scored.push((
                sim,
                RankedResult {
                    id: format!("turn-{session_id}-{turn_number}"),
                    title: format!("turn {turn_number}"),
                    content_snippet: content,
                    timestamp: chrono::DateTime::from_timestamp(created_at, 0),
                    pramana_type: None,
                },
            ));
        }
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored.into_iter().map(|(_, r)| r).collect())
    }
}

impl LibsqlStore {
    /// Persist one turn's embedding (called by the ingestion pipeline
    /// after `append_turn`, not part of the `Store` trait itself since
    /// the embedding dimension is a plug-in detail).
    pub async fn store_turn_embedding(
        &self,
        session_id: Uuid,
        turn_number: u32,
        project: &str,
        embedding: &[f32],
    ) -> crate::error::Result<()> {
        let conn = self.connection()?;
        conn.execute(
            r#"INSERT INTO turn_embeddings (session_id, turn_number, project, embedding, created_at)
               VALUES (?,?,?,?,?)
               ON CONFLICT(session_id, turn_number) DO UPDATE SET embedding = excluded.embedding"#,
            libsql::params![
                session_id.to_string(),
                i64::from(turn_number),
                project.to_string(),
                encode_embedding(embedding),
                Utc::now().timestamp(),
            ],
        )
        .await?;
        Ok(())
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode_embedding(raw: &[u8]) -> Option<Vec<f32>> {
    if raw.len() % 4 != 0 {
        return None;
    }
    Some(raw.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect())
}

#[async_trait]
impl GraphIndex for LibsqlStore {
    async fn search_entities(
        &self,
        query: &str,
        top_k: usize,
        project: Option<&str>,
    ) -> anyhow::Result<Vec<RankedResult>> {
        let conn = self.connection()?;
        let like = format!("%{}%", query.replace('%', ""));
        let base = "SELECT id, label, pramana_type FROM graph_nodes WHERE label LIKE ?";
        let mut result = match project {
            Some(p) => {
                conn.query(
                    &format!("{base} AND project = ? ORDER BY updated_at DESC LIMIT ?"),
                    libsql::params![like, p.to_string(), top_k as i64],
                )
                .await?
            }
            None => {
                conn.query(&format!("{base} ORDER BY updated_at DESC LIMIT ?"), libsql::params![like, top_k as i64])
                    .await?
            }
        };

        let mut out = Vec::new();
        while let Some(row) = result.next().await? {
            let id: String = row.get(0)?;
            let label: String = row.get(1)?;
            let pramana_type: Option<String> = row.get(2).ok();
            out.push(RankedResult {
                id,
                title: label.clone(),
                content_snippet: label,
                timestamp: None,
                pramana_type: pramana_type.and_then(|s| PramanaType::from_str(&s)),
            });
        }
        Ok(out)
    }

    async fn pramana_batch(&self, ids: &[String]) -> HashMap<String, PramanaType> {
        let Ok(conn) = self.connection() else { return HashMap::new() };
        let mut out = HashMap::new();
        for id in ids {
            let Ok(mut result) =
                conn.query("SELECT pramana_type FROM graph_nodes WHERE id = ?", libsql::params![id.clone()]).await
            else {
                continue;
            };
            if let Ok(Some(row)) = result.next().await {
                if let Ok(Some(p)) = row.get::<Option<String>>(0).map(|v| v.and_then(|s| PramanaType::from_str(&s))) {
                    out.insert(id.clone(), p);
                }
            }
        }
        out
    }
}

impl LibsqlStore {
    /// Upsert a graph node for an entity label (samskara/vasana name),
    /// used by Svapna/Vasana to keep the GraphRAG substrate current.
    pub async fn upsert_graph_node(
        &self,
        id: &str,
        label: &str,
        project: &str,
        pramana_type: Option<PramanaType>,
    ) -> crate::error::Result<()> {
        let conn = self.connection()?;
        conn.execute(
            r#"INSERT INTO graph_nodes (id, label, project, pramana_type, updated_at) VALUES (?,?,?,?,?)
               ON CONFLICT(id) DO UPDATE SET label=excluded.label, project=excluded.project,
                 pramana_type=excluded.pramana_type, updated_at=excluded.updated_at"#,
            libsql::params![
                id.to_string(),
                label.to_string(),
                project.to_string(),
                pramana_type.map(|p| p.as_str().to_string()),
                Utc::now().timestamp(),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn upsert_graph_edge(&self, from_id: &str, to_id: &str, weight: f64) -> crate::error::Result<()> {
        let conn = self.connection()?;
        conn.execute(
            r#"INSERT INTO graph_edges (from_id, to_id, weight) VALUES (?,?,?)
               ON CONFLICT(from_id, to_id) DO UPDATE SET weight = excluded.weight"#,
            libsql::params![from_id.to_string(), to_id.to_string(), weight],
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PramanaIndex for LibsqlStore {
    async fn reliable_entries(
        &self,
        query: &str,
        top_k: usize,
        project: Option<&str>,
    ) -> anyhow::Result<Vec<RankedResult>> {
        let conn = self.connection()?;
        let like = format!("%{}%", query.replace('%', ""));
        let base = r#"SELECT id, session_id, pattern_content, pramana_type, created_at
                      FROM samskaras WHERE pattern_content LIKE ? AND pramana_type IS NOT NULL"#;
        let mut result = match project {
            Some(p) => {
                conn.query(&format!("{base} AND project = ?"), libsql::params![like, p.to_string()]).await?
            }
            None => conn.query(base, libsql::params![like]).await?,
        };

        let mut scored: Vec<(f64, RankedResult)> = Vec::new();
        while let Some(row) = result.next().await? {
            let id: String = row.get(0)?;
            let content: String = row.get(2)?;
            let pramana: Option<String> = row.get(3).ok();
            let created_at: i64 = row.get(4)?;
            let pramana_type = pramana.and_then(|s| PramanaType::from_str(&s));
            let reliability = pramana_type.map_or(0.0, PramanaType::reliability);
            scored.push((
                reliability,
                RankedResult {
                    id,
                    title: content.clone(),
                    content_snippet: content,
                    timestamp: chrono::DateTime::from_timestamp(created_at, 0),
                    pramana_type,
                },
            ));
        }
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored.into_iter().map(|(_, r)| r).collect())
    }

    async fn pramana_batch(&self, ids: &[String]) -> HashMap<String, PramanaType> {
        GraphIndex::pramana_batch(self, ids).await
    }
}

/// Resolves the `id → pramana_type` batch Hybrid Search needs for its
/// epistemic boost (spec.md §4.6 step 5), independent of which ranker
/// surfaced the id. Delegates to the same `graph_nodes` lookup
/// `GraphIndex::pramana_batch` uses, since that table is this store's
/// only Pramana-classification index.
#[async_trait]
impl PramanaResolver for LibsqlStore {
    async fn pramana_batch(&self, ids: &[String]) -> HashMap<String, PramanaType> {
        GraphIndex::pramana_batch(self, ids).await
    }
}

/// FTS5 MATCH syntax chokes on bare punctuation; quote each token and
/// OR them together so a multi-word query still matches partially.
fn sanitize_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|tok| tok.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|tok| !tok.is_empty())
        .map(|tok| format!("\"{tok}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}
