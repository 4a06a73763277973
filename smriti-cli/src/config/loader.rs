//! Config file search and parsing, grounded on `memory-cli`'s
//! `config::loader::load_config` shape: an explicit path wins, then an
//! environment variable, then a fixed list of filenames in the current
//! directory, then built-in defaults. Supports TOML, JSON, and YAML,
//! selected by file extension.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::Config;
use crate::errors::CliError;

const ENV_VAR: &str = "SMRITI_CONFIG";
const DEFAULT_FILENAMES: &[&str] = &["smriti.toml", ".smriti.toml", "smriti.json", "smriti.yaml"];

/// Raw, partially-specified config as read from disk. Every field is
/// optional; absent fields fall back to `Config::default()`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    home: Option<PathBuf>,
    project: Option<String>,
    embedding_dimension: Option<usize>,
    vasana: Option<RawVasanaConfig>,
    svapna: Option<RawSvapnaConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawVasanaConfig {
    lambda: Option<f64>,
    window_size: Option<usize>,
    stability_window: Option<u64>,
    change_point_threshold: Option<f64>,
    accuracy_threshold: Option<f64>,
    holdout_train_ratio: Option<f64>,
    promotion_min_projects: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSvapnaConfig {
    max_sessions_per_cycle: Option<usize>,
    surprise_threshold: Option<f64>,
    min_pattern_frequency: Option<u64>,
    min_sequence_length: Option<usize>,
    min_success_rate: Option<f64>,
    compress_target_ratio: Option<f64>,
}

/// Resolve and load the effective config (spec.md ambient stack;
/// SPEC_FULL.md §2). Search order: `explicit_path` → `SMRITI_CONFIG`
/// env var → `smriti.toml`/`.smriti.toml`/`smriti.json`/`smriti.yaml`
/// in the current directory → built-in defaults.
pub fn load_config(explicit_path: Option<&Path>) -> Result<Config, CliError> {
    let candidate = explicit_path
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(ENV_VAR).map(PathBuf::from))
        .or_else(find_in_cwd);

    let Some(path) = candidate else {
        return Ok(Config::default());
    };

    let raw = read_and_parse(&path)?;
    Ok(merge(raw))
}

fn find_in_cwd() -> Option<PathBuf> {
    DEFAULT_FILENAMES.iter().map(PathBuf::from).find(|p| p.is_file())
}

fn read_and_parse(path: &Path) -> Result<RawConfig, CliError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| CliError::ConfigRead { path: path.to_path_buf(), source })?;

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match extension {
        "toml" => toml::from_str(&content)
            .map_err(|e| CliError::ConfigParse { path: path.to_path_buf(), source: e.into() }),
        "json" => serde_json::from_str(&content)
            .map_err(|e| CliError::ConfigParse { path: path.to_path_buf(), source: e.into() }),
        "yaml" | "yml" => serde_yaml::from_str(&content)
            .map_err(|e| CliError::ConfigParse { path: path.to_path_buf(), source: e.into() }),
        other => Err(CliError::UnsupportedConfigFormat(other.to_string())),
    }
}

fn merge(raw: RawConfig) -> Config {
    let mut config = Config::default();

    if let Some(home) = raw.home {
        config.home = home;
    }
    if raw.project.is_some() {
        config.project = raw.project;
    }
    if let Some(dim) = raw.embedding_dimension {
        config.embedding_dimension = dim;
    }

    if let Some(v) = raw.vasana {
        if let Some(x) = v.lambda {
            config.vasana.lambda = x;
        }
        if let Some(x) = v.window_size {
            config.vasana.window_size = x;
        }
        if let Some(x) = v.stability_window {
            config.vasana.stability_window = x;
        }
        if let Some(x) = v.change_point_threshold {
            config.vasana.change_point_threshold = x;
        }
        if let Some(x) = v.accuracy_threshold {
            config.vasana.accuracy_threshold = x;
        }
        if let Some(x) = v.holdout_train_ratio {
            config.vasana.holdout_train_ratio = x;
        }
        if let Some(x) = v.promotion_min_projects {
            config.vasana.promotion_min_projects = x;
        }
    }

    if let Some(s) = raw.svapna {
        if let Some(x) = s.max_sessions_per_cycle {
            config.svapna.max_sessions_per_cycle = x;
        }
        if let Some(x) = s.surprise_threshold {
            config.svapna.surprise_threshold = x;
        }
        if let Some(x) = s.min_pattern_frequency {
            config.svapna.min_pattern_frequency = x;
        }
        if let Some(x) = s.min_sequence_length {
            config.svapna.min_sequence_length = x;
        }
        if let Some(x) = s.min_success_rate {
            config.svapna.min_success_rate = x;
        }
        if let Some(x) = s.compress_target_ratio {
            config.svapna.compress_target_ratio = x;
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_candidate_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prev = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        std::env::remove_var(ENV_VAR);
        let config = load_config(None).unwrap();
        std::env::set_current_dir(prev).unwrap();
        assert_eq!(config.embedding_dimension, 32);
        assert!(config.project.is_none());
    }

    #[test]
    fn explicit_toml_path_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "project = \"acme\"\nembedding_dimension = 64\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.project.as_deref(), Some("acme"));
        assert_eq!(config.embedding_dimension, 64);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "project=acme").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, CliError::UnsupportedConfigFormat(_)));
    }

    #[test]
    fn vasana_overrides_merge_onto_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[vasana]\nlambda = 100.0\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert!((config.vasana.lambda - 100.0).abs() < 1e-9);
        assert_eq!(config.vasana.window_size, Config::default().vasana.window_size);
    }
}
