//! `smriti recall`: unified recall across hybrid search, key-value
//! memory, consolidated day files, and the turns fallback (spec.md
//! §4.7).

use std::io::Write;

use serde::Serialize;
use smriti_core::recall::{PrimarySource, UnifiedRecallConfig};

use crate::engine::Engine;
use crate::output::Output;

#[derive(Debug, Serialize)]
pub struct RecallHit {
    pub score: f64,
    pub answer: String,
    pub primary_source: String,
    pub snippet: String,
    pub project: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecallOutput {
    pub query: String,
    pub hits: Vec<RecallHit>,
}

impl Output for RecallOutput {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        if self.hits.is_empty() {
            writeln!(writer, "nothing recalled for \"{}\"", self.query)?;
            return Ok(());
        }
        for (i, hit) in self.hits.iter().enumerate() {
            writeln!(writer, "{}. [{}] [{:.4}] {}", i + 1, hit.primary_source, hit.score, hit.answer)?;
        }
        Ok(())
    }
}

pub async fn run(engine: &Engine, query: &str, limit: usize) -> anyhow::Result<RecallOutput> {
    let config = UnifiedRecallConfig {
        limit,
        project: engine.project().map(str::to_string),
        ..UnifiedRecallConfig::default()
    };
    let answers = engine.recall.recall(query, &config).await;
    let hits = answers
        .into_iter()
        .map(|a| RecallHit {
            score: a.score,
            answer: a.answer_text,
            primary_source: primary_source_str(a.primary_source).to_string(),
            snippet: a.snippet,
            project: a.project,
        })
        .collect();
    Ok(RecallOutput { query: query.to_string(), hits })
}

fn primary_source_str(source: PrimarySource) -> &'static str {
    match source {
        PrimarySource::Turns => "turns",
        PrimarySource::Memory => "memory",
        PrimarySource::DayFile => "dayfile",
        PrimarySource::Hybrid => "hybrid",
        PrimarySource::Graph => "graph",
    }
}
