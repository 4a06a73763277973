//! `smriti svapna`: trigger one offline dream-consolidation cycle
//! (spec.md §4.10).

use std::io::Write;

use serde::Serialize;

use crate::engine::Engine;
use crate::output::Output;

#[derive(Debug, Serialize)]
pub struct PhaseRow {
    pub phase: String,
    pub status: String,
    pub metrics: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SvapnaOutput {
    pub cycle_id: String,
    pub total_duration_ms: i64,
    pub phases: Vec<PhaseRow>,
}

impl Output for SvapnaOutput {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "cycle {} ({} ms)", self.cycle_id, self.total_duration_ms)?;
        for phase in &self.phases {
            writeln!(writer, "- {}: {} {}", phase.phase, phase.status, phase.metrics)?;
        }
        Ok(())
    }
}

pub async fn run(engine: &Engine) -> anyhow::Result<SvapnaOutput> {
    let project = engine.project().unwrap_or(smriti_core::types::ProjectScope::GLOBAL_KEY);
    let result = engine.svapna.run(project, None, None).await?;

    let phases = result
        .phases
        .into_iter()
        .map(|p| PhaseRow {
            phase: p.phase.as_str().to_string(),
            status: p.status.as_str().to_string(),
            metrics: p.metrics,
        })
        .collect();

    Ok(SvapnaOutput { cycle_id: result.cycle_id.to_string(), total_duration_ms: result.total_duration_ms, phases })
}
