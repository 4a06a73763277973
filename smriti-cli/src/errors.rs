//! CLI-level error type (SPEC_FULL.md §2, "Ambient stack — Error
//! handling"). Wraps the failures that can surface while parsing
//! config, opening the store, or dispatching a subcommand; engine-
//! internal failures already come back typed from `smriti-core`.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead { path: PathBuf, source: std::io::Error },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse { path: PathBuf, source: anyhow::Error },

    #[error("unsupported config file extension: {0}")]
    UnsupportedConfigFormat(String),

    #[error("failed to open smriti home at {path}: {source}")]
    StoreOpen { path: PathBuf, source: anyhow::Error },

    #[error("engine error: {0}")]
    Engine(#[from] smriti_core::error::Error),

    #[error("could not parse ingest manifest {path}: {source}")]
    IngestManifest { path: PathBuf, source: serde_json::Error },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
