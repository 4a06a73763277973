//! SQL schema for the single embedded libsql store (spec.md §6).
//!
//! One file per table, `CREATE TABLE IF NOT EXISTS` only — there is no
//! migration machinery since the schema never changes in place.
//! `ProjectScope::Global` is flattened to the literal string
//! `__global__` everywhere a `project` column appears.

pub const CREATE_SESSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    project TEXT NOT NULL,
    agent TEXT NOT NULL,
    model TEXT NOT NULL,
    provider TEXT NOT NULL,
    parent_session_id TEXT,
    branch TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    cost REAL NOT NULL DEFAULT 0.0,
    input_tokens INTEGER NOT NULL DEFAULT 0,
    output_tokens INTEGER NOT NULL DEFAULT 0
)
"#;

pub const CREATE_SESSIONS_PROJECT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_sessions_project_created
ON sessions(project, created_at DESC)
"#;

pub const CREATE_TURNS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS turns (
    session_id TEXT NOT NULL,
    turn_number INTEGER NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    tool_calls TEXT NOT NULL DEFAULT '[]',
    created_at INTEGER NOT NULL,
    PRIMARY KEY (session_id, turn_number)
)
"#;

pub const CREATE_TURNS_SESSION_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_turns_session
ON turns(session_id, turn_number)
"#;

pub const CREATE_SAMSKARAS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS samskaras (
    id TEXT PRIMARY KEY NOT NULL,
    session_id TEXT NOT NULL,
    pattern_type TEXT NOT NULL,
    pattern_content TEXT NOT NULL,
    observation_count INTEGER NOT NULL DEFAULT 1,
    confidence REAL NOT NULL,
    pramana_type TEXT,
    project TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
)
"#;

pub const CREATE_SAMSKARAS_PROJECT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_samskaras_project
ON samskaras(project)
"#;

pub const CREATE_VASANAS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS vasanas (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    valence TEXT NOT NULL,
    strength REAL NOT NULL,
    stability REAL NOT NULL,
    predictive_accuracy REAL NOT NULL,
    source_samskaras TEXT NOT NULL DEFAULT '[]',
    reinforcement_count INTEGER NOT NULL DEFAULT 0,
    project TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    last_activated INTEGER,
    activation_count INTEGER NOT NULL DEFAULT 0,
    UNIQUE(name, project)
)
"#;

pub const CREATE_VASANAS_PROJECT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_vasanas_project
ON vasanas(project)
"#;

pub const CREATE_VIDHIS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS vidhis (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    steps TEXT NOT NULL,
    triggers TEXT NOT NULL DEFAULT '[]',
    parameter_schema TEXT NOT NULL DEFAULT '{}',
    confidence REAL NOT NULL DEFAULT 1.0,
    success_count INTEGER NOT NULL DEFAULT 0,
    failure_count INTEGER NOT NULL DEFAULT 0,
    learned_from TEXT NOT NULL DEFAULT '[]',
    project TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE(name, project)
)
"#;

pub const CREATE_VIDHIS_PROJECT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_vidhis_project
ON vidhis(project)
"#;

pub const CREATE_MEMORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS memory (
    key TEXT NOT NULL,
    scope TEXT NOT NULL,
    content TEXT NOT NULL,
    relevance REAL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (key, scope)
)
"#;

pub const CREATE_CONSOLIDATION_SUMMARIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS consolidation_summaries (
    level TEXT NOT NULL,
    period TEXT NOT NULL,
    project TEXT NOT NULL,
    content TEXT NOT NULL,
    PRIMARY KEY (level, period, project)
)
"#;

pub const CREATE_CONSOLIDATION_LOG_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS consolidation_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    cycle_id TEXT NOT NULL,
    project TEXT NOT NULL,
    phase TEXT NOT NULL,
    status TEXT NOT NULL,
    metrics TEXT NOT NULL DEFAULT '{}',
    started_at INTEGER NOT NULL,
    ended_at INTEGER
)
"#;

pub const CREATE_CONSOLIDATION_LOG_CYCLE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_consolidation_log_cycle
ON consolidation_log(cycle_id, phase)
"#;

/// Opaque blob persistence for the Vasana BOCPD state (spec.md §4.9,
/// §6 "consolidation_rules (used by Vasana BOCPD blob)", §9 "Global
/// mutable state"). One row per `(category, key)`; the reserved
/// `(BOCPD_CATEGORY, BOCPD_PROJECT_KEY)` pair is the process-wide
/// singleton the engine round-trips through `persist()`/`restore()`.
pub const CREATE_CONSOLIDATION_RULES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS consolidation_rules (
    category TEXT NOT NULL,
    key TEXT NOT NULL,
    bytes BLOB NOT NULL,
    PRIMARY KEY (category, key)
)
"#;

/// Opaque blob persistence for every other process-wide singleton
/// (currently the weight-learner state; spec.md §6 `nidra_state`).
/// Same shape as `consolidation_rules`, kept as a distinct table so the
/// reserved Vasana blob and the rest of the daemon's persisted state
/// don't share a key namespace.
pub const CREATE_NIDRA_STATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS nidra_state (
    category TEXT NOT NULL,
    key TEXT NOT NULL,
    bytes BLOB NOT NULL,
    PRIMARY KEY (category, key)
)
"#;

/// Turn-level embeddings backing the vector ranker (spec.md §4.2,
/// §4.5). Not named in spec.md §6's required-table list because the
/// embedding dimension is a plug-in detail, but persistence needs
/// somewhere durable to put vectors the embedder produces.
pub const CREATE_TURN_EMBEDDINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS turn_embeddings (
    session_id TEXT NOT NULL,
    turn_number INTEGER NOT NULL,
    project TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (session_id, turn_number)
)
"#;

pub const CREATE_TURN_EMBEDDINGS_PROJECT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_turn_embeddings_project
ON turn_embeddings(project)
"#;

/// Minimal graph substrate for the GraphRAG ranker (spec.md §4.5):
/// nodes are labelled entities (samskara/vasana names), edges link
/// co-occurring nodes. spec.md leaves the graph's own schema
/// unspecified; this follows `memory-storage-turso`'s preference for a
/// plain relational table over an embedded graph engine.
pub const CREATE_GRAPH_NODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS graph_nodes (
    id TEXT PRIMARY KEY NOT NULL,
    label TEXT NOT NULL,
    project TEXT NOT NULL,
    pramana_type TEXT,
    updated_at INTEGER NOT NULL
)
"#;

pub const CREATE_GRAPH_NODES_LABEL_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_graph_nodes_label
ON graph_nodes(label)
"#;

pub const CREATE_GRAPH_EDGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS graph_edges (
    from_id TEXT NOT NULL,
    to_id TEXT NOT NULL,
    weight REAL NOT NULL DEFAULT 1.0,
    PRIMARY KEY (from_id, to_id)
)
"#;

/// FTS5 index over turn content, synchronized via triggers (spec.md
/// §4.5, BM25 ranker).
pub const CREATE_TURNS_FTS_TABLE: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS turns_fts USING fts5(
    session_id UNINDEXED,
    turn_number UNINDEXED,
    content,
    tokenize='porter unicode61'
)
"#;

pub const CREATE_TURNS_FTS_TRIGGERS: &str = r#"
CREATE TRIGGER IF NOT EXISTS turns_ai AFTER INSERT ON turns BEGIN
    INSERT INTO turns_fts(session_id, turn_number, content)
    VALUES (new.session_id, new.turn_number, new.content);
END;
"#;

/// FTS5 index over session titles, used by `SessionFts::search_sessions`
/// (spec.md §4.7, turns-fallback layer).
pub const CREATE_SESSIONS_FTS_TABLE: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS sessions_fts USING fts5(
    session_id UNINDEXED,
    title,
    tokenize='porter unicode61'
)
"#;

pub const CREATE_SESSIONS_FTS_TRIGGERS: &str = r#"
CREATE TRIGGER IF NOT EXISTS sessions_ai AFTER INSERT ON sessions BEGIN
    INSERT INTO sessions_fts(session_id, title) VALUES (new.id, new.title);
END;
CREATE TRIGGER IF NOT EXISTS sessions_au AFTER UPDATE ON sessions BEGIN
    UPDATE sessions_fts SET title = new.title WHERE session_id = new.id;
END;
"#;

/// Every statement `initialize_schema` runs, in dependency order.
pub const ALL_STATEMENTS: &[&str] = &[
    CREATE_SESSIONS_TABLE,
    CREATE_SESSIONS_PROJECT_INDEX,
    CREATE_TURNS_TABLE,
    CREATE_TURNS_SESSION_INDEX,
    CREATE_SAMSKARAS_TABLE,
    CREATE_SAMSKARAS_PROJECT_INDEX,
    CREATE_VASANAS_TABLE,
    CREATE_VASANAS_PROJECT_INDEX,
    CREATE_VIDHIS_TABLE,
    CREATE_VIDHIS_PROJECT_INDEX,
    CREATE_MEMORY_TABLE,
    CREATE_CONSOLIDATION_SUMMARIES_TABLE,
    CREATE_CONSOLIDATION_LOG_TABLE,
    CREATE_CONSOLIDATION_LOG_CYCLE_INDEX,
    CREATE_CONSOLIDATION_RULES_TABLE,
    CREATE_NIDRA_STATE_TABLE,
    CREATE_TURN_EMBEDDINGS_TABLE,
    CREATE_TURN_EMBEDDINGS_PROJECT_INDEX,
    CREATE_GRAPH_NODES_TABLE,
    CREATE_GRAPH_NODES_LABEL_INDEX,
    CREATE_GRAPH_EDGES_TABLE,
    CREATE_TURNS_FTS_TABLE,
    CREATE_TURNS_FTS_TRIGGERS,
    CREATE_SESSIONS_FTS_TABLE,
    CREATE_SESSIONS_FTS_TRIGGERS,
];

/// Sentinel written to a `project`/`scope` column for `ProjectScope::Global`
/// (spec.md §9, "tagged variants preferred over dynamic dispatch" — the
/// flat column is the serialization boundary, not the in-memory type).
pub const GLOBAL_PROJECT_KEY: &str = smriti_core::types::ProjectScope::GLOBAL_KEY;
