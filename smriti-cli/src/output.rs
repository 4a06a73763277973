//! Output formatting (SPEC_FULL.md §2, "CLI surface"; grounded on
//! `memory-cli/src/output.rs`). Every subcommand result implements
//! `Output` and is rendered in one of three formats.

use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain human-readable text.
    Human,
    /// JSON, for scripting.
    Json,
    /// YAML.
    Yaml,
}

pub trait Output {
    fn write_human<W: Write>(&self, writer: W) -> anyhow::Result<()>;

    fn write_json<W: Write>(&self, writer: W) -> anyhow::Result<()>
    where
        Self: Serialize,
    {
        Ok(serde_json::to_writer_pretty(writer, self)?)
    }

    fn write_yaml<W: Write>(&self, writer: W) -> anyhow::Result<()>
    where
        Self: Serialize,
    {
        Ok(serde_yaml::to_writer(writer, self)?)
    }
}

impl OutputFormat {
    pub fn print<T: Output + Serialize>(self, data: &T) -> anyhow::Result<()> {
        let stdout = io::stdout();
        let handle = stdout.lock();
        match self {
            OutputFormat::Human => data.write_human(handle),
            OutputFormat::Json => data.write_json(handle),
            OutputFormat::Yaml => data.write_yaml(handle),
        }
    }
}
