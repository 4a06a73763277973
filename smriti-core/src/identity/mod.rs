//! Identity context loader (spec.md §4.11): assembles the operator's
//! own `SOUL.md`/`IDENTITY.md`/`PERSONALITY.md`/`USER.md`/`AGENTS.md`
//! files into a single markdown section, cached until explicitly
//! cleared.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// `(file stem, subheading)` pairs in search-and-assembly order
/// (spec.md §4.11).
const IDENTITY_FILES: [(&str, &str); 5] = [
    ("SOUL", "Soul"),
    ("IDENTITY", "Identity"),
    ("PERSONALITY", "Personality & Voice"),
    ("USER", "User Profile"),
    ("AGENTS", "Agent Behavior"),
];

const DEFAULT_MAX_CHARS_PER_FILE: usize = 3000;
const PARENT_SEARCH_DEPTH: usize = 3;

#[derive(Debug, Clone)]
pub struct IdentityLoaderConfig {
    /// Explicit config-supplied directory, searched before the project
    /// root (spec.md §4.11, "explicit-config path").
    pub explicit_config_dir: Option<PathBuf>,
    pub project_root: PathBuf,
    pub home_dir: Option<PathBuf>,
    pub max_chars_per_file: usize,
}

impl IdentityLoaderConfig {
    #[must_use]
    pub fn new(project_root: PathBuf) -> Self {
        Self {
            explicit_config_dir: None,
            project_root,
            home_dir: dirs_home(),
            max_chars_per_file: DEFAULT_MAX_CHARS_PER_FILE,
        }
    }
}

/// A located identity file, before truncation/assembly.
#[derive(Debug, Clone)]
struct FoundFile {
    stem: &'static str,
    subheading: &'static str,
    path: PathBuf,
    content: String,
}

#[derive(Debug, Clone, Default)]
struct CacheEntry {
    assembled: String,
    found_paths: Vec<PathBuf>,
}

/// Loads and caches the identity markdown section (spec.md §4.11).
pub struct IdentityLoader {
    config: IdentityLoaderConfig,
    cache: Mutex<Option<CacheEntry>>,
}

impl IdentityLoader {
    #[must_use]
    pub fn new(config: IdentityLoaderConfig) -> Self {
        Self { config, cache: Mutex::new(None) }
    }

    /// Assemble the `## Identity & Values` section, or an empty string
    /// when no identity files were found (spec.md §4.11, §8 seed
    /// scenario "Identity loader with no files").
    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> String {
        if let Some(cached) = self.cache.lock().as_ref() {
            return cached.assembled.clone();
        }

        let found = self.search();
        let entry = CacheEntry {
            assembled: assemble(&found, self.config.max_chars_per_file),
            found_paths: found.iter().map(|f| f.path.clone()).collect(),
        };
        let assembled = entry.assembled.clone();
        *self.cache.lock() = Some(entry);
        assembled
    }

    /// `true` once `load()` has run and at least one identity file was
    /// found.
    #[must_use]
    pub fn has_identity_files(&self) -> bool {
        self.ensure_cached();
        self.cache.lock().as_ref().is_some_and(|c| !c.found_paths.is_empty())
    }

    /// Paths of every identity file found by the last `load()`.
    #[must_use]
    pub fn get_found_paths(&self) -> Vec<PathBuf> {
        self.ensure_cached();
        self.cache.lock().as_ref().map(|c| c.found_paths.clone()).unwrap_or_default()
    }

    pub fn clear_cache(&self) {
        *self.cache.lock() = None;
    }

    fn ensure_cached(&self) {
        if self.cache.lock().is_none() {
            self.load();
        }
    }

    /// Search hierarchy, first match per file name wins (spec.md §4.11:
    /// "explicit-config path → project root → up to 3 parent
    /// directories → home directory").
    fn search(&self) -> Vec<FoundFile> {
        let mut dirs = Vec::new();
        if let Some(explicit) = &self.config.explicit_config_dir {
            dirs.push(explicit.clone());
        }
        dirs.push(self.config.project_root.clone());

        let mut ancestor = self.config.project_root.clone();
        for _ in 0..PARENT_SEARCH_DEPTH {
            if let Some(parent) = ancestor.parent() {
                dirs.push(parent.to_path_buf());
                ancestor = parent.to_path_buf();
            } else {
                break;
            }
        }

        if let Some(home) = &self.config.home_dir {
            dirs.push(home.clone());
        }

        let mut found = Vec::new();
        for (stem, subheading) in IDENTITY_FILES {
            if let Some(file) = find_in_dirs(&dirs, stem, subheading) {
                found.push(file);
            }
        }
        found
    }
}

/// Case-insensitively search `dirs` in order for `{stem}.md`, reading
/// and normalizing the first hit (spec.md §4.11).
fn find_in_dirs(dirs: &[PathBuf], stem: &'static str, subheading: &'static str) -> Option<FoundFile> {
    for dir in dirs {
        let candidate = match locate_case_insensitive(dir, stem) {
            Some(path) => path,
            None => continue,
        };
        match std::fs::read_to_string(&candidate) {
            Ok(raw) => {
                return Some(FoundFile { stem, subheading, path: candidate, content: raw });
            }
            Err(err) => {
                tracing::debug!(path = %candidate.display(), error = %err, "identity file unreadable, skipping");
            }
        }
    }
    None
}

fn locate_case_insensitive(dir: &Path, stem: &str) -> Option<PathBuf> {
    let canonical = dir.join(format!("{stem}.md"));
    if canonical.is_file() {
        return Some(canonical);
    }

    let entries = std::fs::read_dir(dir).ok()?;
    let target = format!("{stem}.md").to_lowercase();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.to_lowercase() == target) {
            return Some(path);
        }
    }
    None
}

/// Strip YAML frontmatter (`---` delimited) and the first top-level
/// heading (`# ...`), then truncate to `max_chars` (spec.md §4.11).
fn normalize(content: &str, max_chars: usize) -> String {
    let without_frontmatter = strip_frontmatter(content);
    let without_heading = strip_top_heading(without_frontmatter);
    let trimmed = without_heading.trim();
    truncate_chars(trimmed, max_chars)
}

fn strip_frontmatter(content: &str) -> &str {
    let trimmed = content.trim_start();
    let Some(rest) = trimmed.strip_prefix("---") else { return content };
    let Some(end) = rest.find("\n---") else { return content };
    let after = &rest[end + 4..];
    after.strip_prefix('\n').unwrap_or(after)
}

fn strip_top_heading(content: &str) -> &str {
    let trimmed = content.trim_start();
    if let Some(rest) = trimmed.strip_prefix('#') {
        if let Some(newline) = rest.find('\n') {
            return &rest[newline + 1..];
        }
        return "";
    }
    content
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

fn assemble(found: &[FoundFile], max_chars_per_file: usize) -> String {
    if found.is_empty() {
        return String::new();
    }

    let mut out = String::from("## Identity & Values\n\n");
    for (i, file) in found.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        out.push_str(&format!("### {}\n\n", file.subheading));
        out.push_str(normalize(&file.content, max_chars_per_file).trim_end());
    }
    out
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn strip_frontmatter_removes_yaml_block() {
        let content = "---\ntitle: x\n---\n# Heading\nbody text";
        let stripped = strip_frontmatter(content);
        assert!(!stripped.contains("title: x"));
        assert!(stripped.contains("# Heading"));
    }

    #[test]
    fn strip_top_heading_removes_first_heading_only() {
        let content = "# My Title\nfirst line\n# not a real heading, just text";
        let stripped = strip_top_heading(content);
        assert!(!stripped.contains("# My Title"));
        assert!(stripped.contains("# not a real heading"));
    }

    #[test]
    fn truncate_chars_respects_char_boundary() {
        let text = "hello world";
        assert_eq!(truncate_chars(text, 5), "hello");
        assert_eq!(truncate_chars(text, 100), "hello world");
    }

    #[test]
    fn no_identity_files_yields_empty_string() {
        let dir = tempfile::tempdir().unwrap();
        let config = IdentityLoaderConfig::new(dir.path().to_path_buf());
        let loader = IdentityLoader::new(IdentityLoaderConfig { home_dir: None, ..config });
        assert_eq!(loader.load(), String::new());
        assert!(!loader.has_identity_files());
        assert!(loader.get_found_paths().is_empty());
    }

    #[test]
    fn assembles_found_files_under_subheadings() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("SOUL.md"), "---\nx: 1\n---\n# Soul\nBe curious.").unwrap();
        fs::write(dir.path().join("user.md"), "# User\nPrefers terse answers.").unwrap();

        let config = IdentityLoaderConfig::new(dir.path().to_path_buf());
        let loader = IdentityLoader::new(IdentityLoaderConfig { home_dir: None, ..config });

        let section = loader.load();
        assert!(section.starts_with("## Identity & Values"));
        assert!(section.contains("### Soul"));
        assert!(section.contains("Be curious."));
        assert!(section.contains("### User Profile"));
        assert!(section.contains("Prefers terse answers."));
        assert!(loader.has_identity_files());
        assert_eq!(loader.get_found_paths().len(), 2);
    }

    #[test]
    fn case_insensitive_match_is_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("agents.md"), "# Agents\nAlways run tests.").unwrap();
        let config = IdentityLoaderConfig::new(dir.path().to_path_buf());
        let loader = IdentityLoader::new(IdentityLoaderConfig { home_dir: None, ..config });
        let section = loader.load();
        assert!(section.contains("### Agent Behavior"));
    }

    #[test]
    fn cache_persists_until_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let config = IdentityLoaderConfig::new(dir.path().to_path_buf());
        let loader = IdentityLoader::new(IdentityLoaderConfig { home_dir: None, ..config });
        assert_eq!(loader.load(), String::new());

        fs::write(dir.path().join("SOUL.md"), "# Soul\nNew content.").unwrap();
        assert_eq!(loader.load(), String::new(), "stale cache should still be returned");

        loader.clear_cache();
        assert!(loader.load().contains("New content."));
    }

    #[test]
    fn truncates_to_max_chars_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let long_body = "word ".repeat(1000);
        fs::write(dir.path().join("SOUL.md"), format!("# Soul\n{long_body}")).unwrap();
        let mut config = IdentityLoaderConfig::new(dir.path().to_path_buf());
        config.home_dir = None;
        config.max_chars_per_file = 50;
        let loader = IdentityLoader::new(config);
        let section = loader.load();
        let body_len = section.trim_start_matches("## Identity & Values\n\n### Soul\n\n").chars().count();
        assert!(body_len <= 50);
    }
}
