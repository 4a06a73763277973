//! `smriti vasana`: inspect and operate the behavioral-tendency engine
//! (spec.md §4.9) — listing crystallized tendencies, forcing a
//! crystallize/decay/promote sweep.

use std::io::Write;

use clap::Subcommand;
use serde::Serialize;

use crate::engine::Engine;
use crate::output::Output;

#[derive(Debug, Clone, Subcommand)]
pub enum VasanaCommand {
    /// List crystallized tendencies for the configured project.
    List {
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Re-evaluate every observed cluster against the four
    /// crystallization gates.
    Crystallize,
    /// Run the exponential decay sweep over every project.
    Decay {
        #[arg(long)]
        half_life_ms: Option<i64>,
    },
    /// Promote per-name tendencies attested across enough projects to
    /// the global scope.
    Promote,
}

#[derive(Debug, Serialize)]
pub struct VasanaRow {
    pub name: String,
    pub description: String,
    pub valence: String,
    pub strength: f64,
    pub stability: f64,
    pub project: String,
}

#[derive(Debug, Serialize)]
pub struct VasanaOutput {
    pub rows: Vec<VasanaRow>,
    pub summary: String,
}

impl Output for VasanaOutput {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "{}", self.summary)?;
        for row in &self.rows {
            writeln!(
                writer,
                "- {} [{}] strength={:.3} stability={:.3} ({})",
                row.name, row.valence, row.strength, row.stability, row.project
            )?;
        }
        Ok(())
    }
}

pub async fn run(engine: &Engine, command: &VasanaCommand) -> anyhow::Result<VasanaOutput> {
    let project = engine.project().unwrap_or(smriti_core::types::ProjectScope::GLOBAL_KEY);

    match command {
        VasanaCommand::List { top_k } => {
            let rows = engine.vasana.get_vasanas(project, *top_k).await?;
            let summary = format!("{} tendency(ies) for {project}", rows.len());
            Ok(VasanaOutput { rows: rows.into_iter().map(to_row).collect(), summary })
        }
        VasanaCommand::Crystallize => {
            let result = engine.vasana.crystallize(project).await?;
            let summary = format!(
                "crystallize: {} created, {} reinforced, {} pending, {} change point(s)",
                result.created.len(),
                result.reinforced.len(),
                result.pending.len(),
                result.change_points.len()
            );
            let mut rows: Vec<_> = result.created.into_iter().chain(result.reinforced).collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(VasanaOutput { rows: rows.into_iter().map(to_row).collect(), summary })
        }
        VasanaCommand::Decay { half_life_ms } => {
            let deleted = engine.vasana.decay(*half_life_ms).await?;
            Ok(VasanaOutput { rows: Vec::new(), summary: format!("decay: {deleted} tendency(ies) removed") })
        }
        VasanaCommand::Promote => {
            let promoted = engine.vasana.promote_to_global().await?;
            let summary = format!("promote: {} tendency(ies) promoted to global", promoted.len());
            Ok(VasanaOutput { rows: promoted.into_iter().map(to_row).collect(), summary })
        }
    }
}

fn to_row(v: smriti_core::types::Vasana) -> VasanaRow {
    VasanaRow {
        name: v.name,
        description: v.description,
        valence: v.valence.as_str().to_string(),
        strength: v.strength,
        stability: v.stability,
        project: v.project.to_string(),
    }
}
