//! Row ↔ struct conversions (spec.md §4.1 invariants: malformed JSON on
//! read must not crash — callers skip/count corrupt rows rather than
//! propagate, spec.md §7 "Store read failure on a single row").

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use libsql::Row;
use tracing::debug;
use uuid::Uuid;

use smriti_core::types::{
    ConsolidationLogRow, MemoryEntry, ParameterSpec, PatternType, PramanaType, ProjectScope, Role,
    Samskara, Session, TemporalSummary, ToolCall, Turn, Valence, Vasana, Vidhi, VidhiStep,
};
use smriti_core::types::{ConsolidationPhase, ConsolidationStatus, TemporalLevel};

use crate::error::{Error, Result};

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

pub fn session_from_row(row: &Row) -> Result<Session> {
    let id: String = row.get(0)?;
    let title: String = row.get(1)?;
    let created_at: i64 = row.get(2)?;
    let updated_at: i64 = row.get(3)?;
    let project: String = row.get(4)?;
    let agent: String = row.get(5)?;
    let model: String = row.get(6)?;
    let provider: String = row.get(7)?;
    let parent_session_id: Option<String> = row.get(8).ok();
    let branch: Option<String> = row.get(9).ok();
    let tags: String = row.get(10)?;
    let cost: f64 = row.get(11)?;
    let input_tokens: i64 = row.get(12)?;
    let output_tokens: i64 = row.get(13)?;

    Ok(Session {
        id: Uuid::parse_str(&id).map_err(|_| Error::UnrecognizedEnum { column: "id", value: id })?,
        title,
        created_at: ts(created_at),
        updated_at: ts(updated_at),
        project: ProjectScope::from_str(&project),
        agent,
        model,
        provider,
        parent_session_id: parent_session_id.and_then(|s| Uuid::parse_str(&s).ok()),
        branch,
        tags: parse_json_or_default(&tags, "sessions.tags"),
        cost,
        input_tokens: input_tokens.max(0) as u64,
        output_tokens: output_tokens.max(0) as u64,
    })
}

pub fn turn_from_row(row: &Row) -> Result<Turn> {
    let session_id: String = row.get(0)?;
    let turn_number: i64 = row.get(1)?;
    let role: String = row.get(2)?;
    let content: String = row.get(3)?;
    let tool_calls: String = row.get(4)?;
    let created_at: i64 = row.get(5)?;

    let tool_calls: Vec<ToolCall> = match serde_json::from_str(&tool_calls) {
        Ok(v) => v,
        Err(err) => {
            debug!(error = %err, "malformed tool_calls JSON, defaulting to empty list");
            Vec::new()
        }
    };

    Ok(Turn {
        session_id: Uuid::parse_str(&session_id)
            .map_err(|_| Error::UnrecognizedEnum { column: "session_id", value: session_id })?,
        turn_number: turn_number.max(0) as u32,
        role: Role::from_str(&role)
            .ok_or_else(|| Error::UnrecognizedEnum { column: "role", value: role.clone() })?,
        content,
        tool_calls,
        created_at: ts(created_at),
    })
}

pub fn samskara_from_row(row: &Row) -> Result<Samskara> {
    let id: String = row.get(0)?;
    let session_id: String = row.get(1)?;
    let pattern_type: String = row.get(2)?;
    let pattern_content: String = row.get(3)?;
    let observation_count: i64 = row.get(4)?;
    let confidence: f64 = row.get(5)?;
    let pramana_type: Option<String> = row.get(6).ok();
    let project: String = row.get(7)?;
    let created_at: i64 = row.get(8)?;
    let updated_at: i64 = row.get(9)?;

    Ok(Samskara {
        id: Uuid::parse_str(&id).map_err(|_| Error::UnrecognizedEnum { column: "id", value: id })?,
        session_id: Uuid::parse_str(&session_id)
            .map_err(|_| Error::UnrecognizedEnum { column: "session_id", value: session_id })?,
        pattern_type: PatternType::from_str(&pattern_type).ok_or_else(|| Error::UnrecognizedEnum {
            column: "pattern_type",
            value: pattern_type.clone(),
        })?,
        pattern_content,
        observation_count: observation_count.max(0) as u64,
        confidence,
        pramana_type: pramana_type.and_then(|s| PramanaType::from_str(&s)),
        project: ProjectScope::from_str(&project),
        created_at: ts(created_at),
        updated_at: ts(updated_at),
    })
}

pub fn vasana_from_row(row: &Row) -> Result<Vasana> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let description: String = row.get(2)?;
    let valence: String = row.get(3)?;
    let strength: f64 = row.get(4)?;
    let stability: f64 = row.get(5)?;
    let predictive_accuracy: f64 = row.get(6)?;
    let source_samskaras: String = row.get(7)?;
    let reinforcement_count: i64 = row.get(8)?;
    let project: String = row.get(9)?;
    let created_at: i64 = row.get(10)?;
    let updated_at: i64 = row.get(11)?;
    let last_activated: Option<i64> = row.get(12).ok();
    let activation_count: i64 = row.get(13)?;

    let source_ids: Vec<String> = parse_json_or_default(&source_samskaras, "vasanas.source_samskaras");
    let source_samskaras: HashSet<Uuid> =
        source_ids.iter().filter_map(|s| Uuid::parse_str(s).ok()).collect();

    Ok(Vasana {
        id: Uuid::parse_str(&id).map_err(|_| Error::UnrecognizedEnum { column: "id", value: id })?,
        name,
        description,
        valence: Valence::from_str(&valence)
            .ok_or_else(|| Error::UnrecognizedEnum { column: "valence", value: valence.clone() })?,
        strength,
        stability,
        predictive_accuracy,
        source_samskaras,
        reinforcement_count: reinforcement_count.max(0) as u64,
        project: ProjectScope::from_str(&project),
        created_at: ts(created_at),
        updated_at: ts(updated_at),
        last_activated: last_activated.map(ts),
        activation_count: activation_count.max(0) as u64,
    })
}

pub fn vidhi_from_row(row: &Row) -> Result<Vidhi> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let steps: String = row.get(2)?;
    let triggers: String = row.get(3)?;
    let parameter_schema: String = row.get(4)?;
    let confidence: f64 = row.get(5)?;
    let success_count: i64 = row.get(6)?;
    let failure_count: i64 = row.get(7)?;
    let learned_from: String = row.get(8)?;
    let project: String = row.get(9)?;
    let created_at: i64 = row.get(10)?;
    let updated_at: i64 = row.get(11)?;

    let steps: Vec<VidhiStep> = parse_json_or_default(&steps, "vidhis.steps");
    let triggers: HashSet<String> = parse_json_or_default(&triggers, "vidhis.triggers");
    let parameter_schema: HashMap<String, ParameterSpec> =
        parse_json_or_default(&parameter_schema, "vidhis.parameter_schema");
    let learned_from_ids: Vec<String> = parse_json_or_default(&learned_from, "vidhis.learned_from");
    let learned_from: Vec<Uuid> = learned_from_ids.iter().filter_map(|s| Uuid::parse_str(s).ok()).collect();

    Ok(Vidhi {
        id: Uuid::parse_str(&id).map_err(|_| Error::UnrecognizedEnum { column: "id", value: id })?,
        name,
        steps,
        triggers,
        parameter_schema,
        confidence,
        success_count: success_count.max(0) as u64,
        failure_count: failure_count.max(0) as u64,
        learned_from,
        project: ProjectScope::from_str(&project),
        created_at: ts(created_at),
        updated_at: ts(updated_at),
    })
}

pub fn memory_from_row(row: &Row) -> Result<MemoryEntry> {
    let key: String = row.get(0)?;
    let scope: String = row.get(1)?;
    let content: String = row.get(2)?;
    let relevance: Option<f64> = row.get(3).ok();
    let updated_at: i64 = row.get(4)?;

    Ok(MemoryEntry {
        key,
        scope: ProjectScope::from_str(&scope),
        content,
        relevance,
        updated_at: ts(updated_at),
    })
}

pub fn temporal_summary_from_row(row: &Row) -> Result<TemporalSummary> {
    let level: String = row.get(0)?;
    let period: String = row.get(1)?;
    let project: String = row.get(2)?;
    let content: String = row.get(3)?;

    Ok(TemporalSummary {
        level: TemporalLevel::from_str(&level)
            .ok_or_else(|| Error::UnrecognizedEnum { column: "level", value: level.clone() })?,
        period,
        project: if project == smriti_core::types::ProjectScope::GLOBAL_KEY { None } else { Some(project) },
        content,
    })
}

pub fn consolidation_log_from_row(row: &Row) -> Result<ConsolidationLogRow> {
    let cycle_id: String = row.get(1)?;
    let project: String = row.get(2)?;
    let phase: String = row.get(3)?;
    let status: String = row.get(4)?;
    let metrics: String = row.get(5)?;
    let started_at: i64 = row.get(6)?;
    let ended_at: Option<i64> = row.get(7).ok();

    Ok(ConsolidationLogRow {
        cycle_id: Uuid::parse_str(&cycle_id)
            .map_err(|_| Error::UnrecognizedEnum { column: "cycle_id", value: cycle_id })?,
        project: ProjectScope::from_str(&project),
        phase: ConsolidationPhase::from_str(&phase)
            .ok_or_else(|| Error::UnrecognizedEnum { column: "phase", value: phase.clone() })?,
        status: ConsolidationStatus::from_str(&status)
            .ok_or_else(|| Error::UnrecognizedEnum { column: "status", value: status.clone() })?,
        metrics: serde_json::from_str(&metrics).unwrap_or(serde_json::Value::Null),
        started_at: ts(started_at),
        ended_at: ended_at.map(ts),
    })
}

/// Parse JSON, defaulting (and debug-logging) on failure rather than
/// propagating — spec.md §4.1 "Malformed JSON on read must not crash".
fn parse_json_or_default<T: Default + serde::de::DeserializeOwned>(raw: &str, column: &str) -> T {
    serde_json::from_str(raw).unwrap_or_else(|err| {
        debug!(column, error = %err, "malformed JSON column, defaulting");
        T::default()
    })
}
