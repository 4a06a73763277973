//! The markdown file hierarchy under `<home>/smriti/` (spec.md §6):
//! per-session turn logs, the four preservation streams, and
//! consolidated day files. Implements `smriti_core::recall::DayFileIndex`.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use smriti_core::recall::{DayFileIndex, DayFileMatch};
use smriti_core::types::{Session, StreamKind, Turn};
use tracing::debug;

use crate::error::Result;

pub struct MarkdownStore {
    root: PathBuf,
}

impl MarkdownStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    fn streams_dir(&self) -> PathBuf {
        self.root.join("streams")
    }

    fn day_dir(&self) -> PathBuf {
        self.root.join("day")
    }

    fn session_path(&self, session: &Session) -> PathBuf {
        self.sessions_dir().join(format!("{}.md", session.id))
    }

    /// Append one turn to its session's markdown log, writing the
    /// title block on first write (spec.md §6,
    /// `sessions/{session_id}.md`).
    pub fn append_turn(&self, session: &Session, turn: &Turn) -> Result<()> {
        std::fs::create_dir_all(self.sessions_dir())?;
        let path = self.session_path(session);
        let is_new = !path.exists();

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;

        if is_new {
            writeln!(file, "# {}", session.title)?;
            writeln!(file)?;
            writeln!(file, "- project: {}", session.project)?;
            writeln!(file, "- agent: {}", session.agent)?;
            writeln!(file, "- model: {}", session.model)?;
            writeln!(file, "- created_at: {}", session.created_at.to_rfc3339())?;
            writeln!(file)?;
        }

        writeln!(file, "## Turn {} ({})", turn.turn_number, turn.role.as_str())?;
        writeln!(file)?;
        writeln!(file, "{}", turn.content)?;
        for call in &turn.tool_calls {
            writeln!(file, "- tool: `{}` error={}", call.name, call.is_error)?;
        }
        writeln!(file)?;
        Ok(())
    }

    /// Write one preservation stream file with a fixed token budget
    /// split across the four streams (spec.md §6). `tokens` is the
    /// plugged-in tokenizer's `tokens(body)` count for this stream's
    /// body.
    pub fn write_stream(&self, kind: StreamKind, body: &str, tokens: u64) -> Result<()> {
        std::fs::create_dir_all(self.streams_dir())?;
        let path = self.streams_dir().join(kind.file_name());

        use std::io::Write;
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "# {:?} stream", kind)?;
        writeln!(file)?;
        writeln!(file, "{body}")?;
        writeln!(file)?;
        writeln!(file, "## Meta")?;
        writeln!(file, "- last_updated: {}", Utc::now().to_rfc3339())?;
        writeln!(file, "- token_count: {tokens}")?;
        Ok(())
    }

    /// Write (overwrite) the consolidated markdown for one day
    /// (spec.md §6, `day/{YYYY-MM-DD}.md`).
    pub fn write_day_file(&self, date: NaiveDate, content: &str) -> Result<()> {
        std::fs::create_dir_all(self.day_dir())?;
        let path = self.day_dir().join(format!("{date}.md"));
        std::fs::write(path, content)?;
        Ok(())
    }

    fn list_day_files(&self) -> Vec<(String, String)> {
        let dir = self.day_dir();
        let Ok(entries) = std::fs::read_dir(&dir) else { return Vec::new() };
        let mut files = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            match std::fs::read_to_string(&path) {
                Ok(content) => files.push((stem.to_string(), content)),
                Err(err) => debug!(path = %path.display(), error = %err, "failed to read day file, skipping"),
            }
        }
        files.sort_by(|a, b| b.0.cmp(&a.0));
        files
    }
}

#[async_trait]
impl DayFileIndex for MarkdownStore {
    async fn search_day_files(&self, query: &str, project: Option<&str>) -> anyhow::Result<Vec<DayFileMatch>> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).filter(|t| t.len() > 2).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for (date, content) in self.list_day_files() {
            if let Some(project) = project {
                if !content.to_lowercase().contains(&project.to_lowercase()) {
                    continue;
                }
            }
            let lower = content.to_lowercase();
            let matches: Vec<String> = content
                .lines()
                .filter(|line| {
                    let lower_line = line.to_lowercase();
                    terms.iter().any(|t| lower_line.contains(t.as_str()))
                })
                .map(str::to_string)
                .take(5)
                .collect();
            if !matches.is_empty() || terms.iter().any(|t| lower.contains(t.as_str())) {
                if !matches.is_empty() {
                    results.push(DayFileMatch { date, matches });
                }
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smriti_core::types::{ProjectScope, Role, ToolCall};
    use uuid::Uuid;

    fn sample_session() -> Session {
        Session {
            id: Uuid::new_v4(),
            title: "Test session".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            project: ProjectScope::Project("acme".into()),
            agent: "claude".into(),
            model: "sonnet".into(),
            provider: "anthropic".into(),
            parent_session_id: None,
            branch: None,
            tags: vec![],
            cost: 0.0,
            input_tokens: 0,
            output_tokens: 0,
        }
    }

    #[test]
    fn append_turn_creates_title_block_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = MarkdownStore::new(dir.path().to_path_buf());
        let session = sample_session();
        let turn0 = Turn {
            session_id: session.id,
            turn_number: 0,
            role: Role::User,
            content: "hello".into(),
            tool_calls: vec![ToolCall { name: "read".into(), input: serde_json::json!({}), result: None, is_error: false }],
            created_at: Utc::now(),
        };
        store.append_turn(&session, &turn0).unwrap();
        let path = store.session_path(&session);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# Test session"));
        assert_eq!(content.matches("# Test session").count(), 1);
        assert!(content.contains("tool: `read`"));
    }

    #[test]
    fn write_stream_includes_meta_footer() {
        let dir = tempfile::tempdir().unwrap();
        let store = MarkdownStore::new(dir.path().to_path_buf());
        store.write_stream(StreamKind::Identity, "some identity facts", 42).unwrap();
        let content = std::fs::read_to_string(dir.path().join("streams").join("identity.md")).unwrap();
        assert!(content.contains("## Meta"));
        assert!(content.contains("token_count: 42"));
    }

    #[tokio::test]
    async fn search_day_files_finds_matching_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = MarkdownStore::new(dir.path().to_path_buf());
        store
            .write_day_file(NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(), "deployed the release pipeline today\nunrelated line")
            .unwrap();
        let hits = store.search_day_files("release pipeline", None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].date, "2026-07-01");
    }

    #[tokio::test]
    async fn search_day_files_empty_dir_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MarkdownStore::new(dir.path().to_path_buf());
        let hits = store.search_day_files("anything here", None).await.unwrap();
        assert!(hits.is_empty());
    }
}
