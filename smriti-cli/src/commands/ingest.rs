//! `smriti ingest`: load a session (and its turns) from a JSON
//! manifest into both the relational store and the markdown session
//! log (spec.md §4.1, §6 — dual persistence).

use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use smriti_core::types::{ProjectScope, Role, Session, ToolCall, Turn};
use uuid::Uuid;

use crate::engine::{infer_project, Engine};
use crate::errors::CliError;
use crate::output::Output;

#[derive(Debug, Deserialize)]
struct ToolCallManifest {
    name: String,
    #[serde(default)]
    input: serde_json::Value,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    is_error: bool,
}

#[derive(Debug, Deserialize)]
struct TurnManifest {
    role: String,
    content: String,
    #[serde(default)]
    tool_calls: Vec<ToolCallManifest>,
}

#[derive(Debug, Deserialize)]
struct SessionManifest {
    title: String,
    #[serde(default)]
    project: Option<String>,
    #[serde(default = "default_agent")]
    agent: String,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default = "default_provider")]
    provider: String,
    #[serde(default)]
    tags: Vec<String>,
    turns: Vec<TurnManifest>,
}

fn default_agent() -> String {
    "smriti-cli".to_string()
}
fn default_model() -> String {
    "unknown".to_string()
}
fn default_provider() -> String {
    "unknown".to_string()
}

#[derive(Debug, Serialize)]
pub struct IngestOutput {
    pub session_id: String,
    pub project: String,
    pub turns_ingested: usize,
}

impl Output for IngestOutput {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(
            writer,
            "ingested session {} ({} turn(s)) into project {}",
            self.session_id, self.turns_ingested, self.project
        )?;
        Ok(())
    }
}

/// Parse `manifest_path`, insert the session and its turns, and mirror
/// them into the markdown session log.
pub async fn run(engine: &Engine, manifest_path: &Path) -> Result<IngestOutput, CliError> {
    let content = std::fs::read_to_string(manifest_path)
        .map_err(|source| CliError::ConfigRead { path: manifest_path.to_path_buf(), source })?;
    let manifest: SessionManifest = serde_json::from_str(&content)
        .map_err(|source| CliError::IngestManifest { path: manifest_path.to_path_buf(), source })?;

    let project = manifest
        .project
        .or_else(|| engine.project().map(str::to_string))
        .or_else(|| infer_project(None))
        .unwrap_or_else(|| ProjectScope::GLOBAL_KEY.to_string());

    let now = Utc::now();
    let session = Session {
        id: Uuid::new_v4(),
        title: manifest.title,
        created_at: now,
        updated_at: now,
        project: ProjectScope::from_str(&project),
        agent: manifest.agent,
        model: manifest.model,
        provider: manifest.provider,
        parent_session_id: None,
        branch: None,
        tags: manifest.tags,
        cost: 0.0,
        input_tokens: 0,
        output_tokens: 0,
    };

    engine.store.put_session(&session).await.map_err(CliError::Engine)?;

    let turns_ingested = manifest.turns.len();
    for (turn_number, turn_manifest) in manifest.turns.into_iter().enumerate() {
        let role = Role::from_str(&turn_manifest.role).ok_or_else(|| {
            CliError::InvalidInput(format!("unknown turn role: {}", turn_manifest.role))
        })?;
        let turn = Turn {
            session_id: session.id,
            turn_number: turn_number as u32,
            role,
            content: turn_manifest.content,
            tool_calls: turn_manifest
                .tool_calls
                .into_iter()
                .map(|t| ToolCall { name: t.name, input: t.input, result: t.result, is_error: t.is_error })
                .collect(),
            created_at: Utc::now(),
        };
        engine.store.append_turn(&turn).await.map_err(CliError::Engine)?;
        engine.markdown.append_turn(&session, &turn).map_err(|e| CliError::Engine(e.into()))?;
    }

    Ok(IngestOutput { session_id: session.id.to_string(), project, turns_ingested })
}
