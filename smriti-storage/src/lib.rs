//! `smriti-storage`: the single embedded SQL store (spec.md §4.1, §6)
//! plus the markdown file hierarchy under `<home>/smriti/`.
//!
//! Mirrors `memory-storage-turso`'s crate shape (`schema.rs` /
//! `storage/*` split) but runs `libsql` purely in local-file mode —
//! there is no remote-replica sync in scope here (SPEC_FULL.md §4.1).

pub mod error;
mod markdown;
mod rows;
mod schema;
mod store_impl;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libsql::{Builder, Connection, Database};
use tracing::{debug, info};

pub use error::Error;
pub use markdown::MarkdownStore;

/// Embedded, single-file libsql store implementing
/// `smriti_core::Store` plus the search-side index traits
/// (`SessionFts`, `TurnEmbeddingIndex`, `GraphIndex`, `PramanaIndex`,
/// `PramanaResolver`).
pub struct LibsqlStore {
    db: Arc<Database>,
}

impl LibsqlStore {
    /// Open (creating if absent) the database file at `path` and run
    /// schema migration. Safe to call repeatedly (spec.md §6,
    /// "schema evolution is forward-only").
    pub async fn open(path: impl AsRef<Path>) -> error::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!(path = %path.display(), "opening smriti store");
        let db = Builder::new_local(path).build().await?;
        let store = Self { db: Arc::new(db) };
        store.migrate().await?;
        Ok(store)
    }

    /// Open an in-memory database (test fixtures).
    pub async fn open_in_memory() -> error::Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        let store = Self { db: Arc::new(db) };
        store.migrate().await?;
        Ok(store)
    }

    /// Convenience constructor matching spec.md §4.1's `open(root)`:
    /// the database file lives at `<root>/smriti.db`.
    pub async fn open_under_root(root: impl AsRef<Path>) -> error::Result<Self> {
        Self::open(root.as_ref().join("smriti.db")).await
    }

    /// Run every `CREATE TABLE IF NOT EXISTS` statement
    /// (spec.md §4.1 "Store::migrate()"). Idempotent.
    pub async fn migrate(&self) -> error::Result<()> {
        let conn = self.connection()?;
        for statement in schema::ALL_STATEMENTS {
            conn.execute(statement, ()).await?;
        }
        debug!(count = schema::ALL_STATEMENTS.len(), "schema migration complete");
        Ok(())
    }

    pub(crate) fn connection(&self) -> error::Result<Connection> {
        Ok(self.db.connect()?)
    }
}

/// Root layout for `smriti-storage`'s two persistence mechanisms: the
/// relational store and the markdown file hierarchy (spec.md §6).
pub struct SmritiHome {
    pub root: PathBuf,
}

impl SmritiHome {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.root.join("smriti.db")
    }

    pub async fn open_store(&self) -> error::Result<LibsqlStore> {
        LibsqlStore::open(self.db_path()).await
    }

    #[must_use]
    pub fn markdown(&self) -> MarkdownStore {
        MarkdownStore::new(self.root.clone())
    }
}
