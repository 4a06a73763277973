//! `smriti config`: print the effective, fully-resolved configuration
//! (spec.md ambient stack; SPEC_FULL.md §2) — useful to confirm what a
//! config file search actually resolved to.

use std::io::Write;

use serde::Serialize;

use crate::config::Config;
use crate::output::Output;

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub home: String,
    pub project: Option<String>,
    pub embedding_dimension: usize,
    pub vasana_lambda: f64,
    pub vasana_window_size: usize,
    pub svapna_max_sessions_per_cycle: usize,
    pub svapna_compress_target_ratio: f64,
}

impl Output for ConfigOutput {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "home: {}", self.home)?;
        writeln!(writer, "project: {}", self.project.as_deref().unwrap_or("(global)"))?;
        writeln!(writer, "embedding_dimension: {}", self.embedding_dimension)?;
        writeln!(writer, "vasana.lambda: {}", self.vasana_lambda)?;
        writeln!(writer, "vasana.window_size: {}", self.vasana_window_size)?;
        writeln!(writer, "svapna.max_sessions_per_cycle: {}", self.svapna_max_sessions_per_cycle)?;
        writeln!(writer, "svapna.compress_target_ratio: {}", self.svapna_compress_target_ratio)?;
        Ok(())
    }
}

pub fn run(config: &Config) -> ConfigOutput {
    ConfigOutput {
        home: config.home.display().to_string(),
        project: config.project.clone(),
        embedding_dimension: config.embedding_dimension,
        vasana_lambda: config.vasana.lambda,
        vasana_window_size: config.vasana.window_size,
        svapna_max_sessions_per_cycle: config.svapna.max_sessions_per_cycle,
        svapna_compress_target_ratio: config.svapna.compress_target_ratio,
    }
}
