//! `smriti search`: runs Samshodhana hybrid search directly, bypassing
//! the Self-RAG gate and the other unified-recall layers (spec.md
//! §4.6; SPEC_FULL.md §2).

use std::io::Write;

use serde::Serialize;

use crate::engine::{hybrid_config, Engine};
use crate::output::Output;

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub snippet: String,
    pub score: f64,
    pub sources: Vec<String>,
    pub pramana_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchOutput {
    pub query: String,
    pub hits: Vec<SearchHit>,
}

impl Output for SearchOutput {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        if self.hits.is_empty() {
            writeln!(writer, "no results for \"{}\"", self.query)?;
            return Ok(());
        }
        writeln!(writer, "{} result(s) for \"{}\"", self.hits.len(), self.query)?;
        for (i, hit) in self.hits.iter().enumerate() {
            writeln!(writer, "{}. [{:.4}] {} ({})", i + 1, hit.score, hit.title, hit.sources.join(","))?;
            writeln!(writer, "   {}", hit.snippet)?;
        }
        Ok(())
    }
}

pub async fn run(engine: &Engine, query: &str, top_k: usize) -> anyhow::Result<SearchOutput> {
    let config = hybrid_config(&engine.config, top_k);
    let results = engine.hybrid.search(query, Some(config)).await;
    let hits = results
        .into_iter()
        .map(|r| SearchHit {
            id: r.id,
            title: r.title,
            snippet: r.content_snippet,
            score: r.score,
            sources: r.sources.into_iter().map(str::to_string).collect(),
            pramana_type: r.pramana_type.map(|t| t.as_str().to_string()),
        })
        .collect();
    Ok(SearchOutput { query: query.to_string(), hits })
}
