//! Resolved CLI configuration (SPEC_FULL.md §2, "Ambient stack —
//! Configuration"). `loader` turns a config file (if any) plus
//! defaults into this struct; nothing else in the crate reads a config
//! file directly.

mod loader;

pub use loader::load_config;

use std::path::PathBuf;

use smriti_core::search::HybridSearchConfig;
use smriti_core::svapna::SvapnaConfig;
use smriti_core::vasana::VasanaConfig;

/// Where the Smriti home directory lives when not overridden by
/// `--home` or `SMRITI_HOME` (spec.md §6).
fn default_home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join("smriti")
}

#[derive(Debug, Clone)]
pub struct Config {
    pub home: PathBuf,
    pub project: Option<String>,
    /// Dimensionality for the built-in `MockEmbedder`, used only when
    /// no real embedding provider is configured (SPEC_FULL.md §4.2 —
    /// embedding-model internals are out of scope; the mock keeps the
    /// vector ranker exercisable end to end).
    pub embedding_dimension: usize,
    pub vasana: VasanaConfig,
    pub svapna: SvapnaConfig,
    pub hybrid: HybridSearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            home: default_home(),
            project: None,
            embedding_dimension: 32,
            vasana: VasanaConfig::default(),
            svapna: SvapnaConfig::default(),
            hybrid: HybridSearchConfig::default(),
        }
    }
}
