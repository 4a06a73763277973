use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ConsolidationStatus, PatternType, PramanaType, Role, Valence};
use super::ProjectScope;

/// A tool invocation embedded in a turn (spec.md §3, Turn).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub input: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub is_error: bool,
}

/// An immutable session turn (spec.md §3, Turn).
///
/// `turn_number` is 0-indexed and monotone within a session; rows are
/// never rewritten once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub session_id: Uuid,
    pub turn_number: u32,
    pub role: Role,
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub created_at: DateTime<Utc>,
}

/// A conversational session (spec.md §3, Session). Immutable after
/// close; the store owns it for the process lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub project: ProjectScope,
    pub agent: String,
    pub model: String,
    pub provider: String,
    pub parent_session_id: Option<Uuid>,
    pub branch: Option<String>,
    pub tags: Vec<String>,
    pub cost: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// An observed pattern extracted upstream of the core (spec.md §3,
/// Samskara). The extraction pipeline itself is outside this crate's
/// scope; Vasana and Svapna are its consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Samskara {
    pub id: Uuid,
    pub session_id: Uuid,
    pub pattern_type: PatternType,
    pub pattern_content: String,
    pub observation_count: u64,
    pub confidence: f64,
    pub pramana_type: Option<PramanaType>,
    pub project: ProjectScope,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A crystallized behavioral tendency (spec.md §3, Vasana).
///
/// Invariants enforced by the Vasana engine, not by this struct:
/// `strength` is monotone non-decreasing under reinforcement (capped at
/// 1) and strictly decreasing under decay; rows with `strength < 0.01`
/// are deleted. Upsert key is `(name, project)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vasana {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub valence: Valence,
    pub strength: f64,
    pub stability: f64,
    pub predictive_accuracy: f64,
    pub source_samskaras: HashSet<Uuid>,
    pub reinforcement_count: u64,
    pub project: ProjectScope,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_activated: Option<DateTime<Utc>>,
    pub activation_count: u64,
}

/// One step of a learned procedure (spec.md §3, Vidhi).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VidhiStep {
    pub index: u32,
    pub tool_name: String,
    /// JSON object with `${var}` placeholders for positions that varied
    /// across observations (anti-unification output, spec.md §4.10.4).
    pub arg_template: serde_json::Value,
    pub description: String,
}

/// Schema of one inferred Vidhi parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub param_type: String,
    pub required: bool,
    pub description: String,
}

/// A learned procedure: an anti-unified tool sequence template (spec.md
/// §3, Vidhi). At most one Vidhi exists per (ordered tool-name
/// sequence, project).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vidhi {
    pub id: Uuid,
    pub name: String,
    pub steps: Vec<VidhiStep>,
    pub triggers: HashSet<String>,
    pub parameter_schema: HashMap<String, ParameterSpec>,
    pub confidence: f64,
    pub success_count: u64,
    pub failure_count: u64,
    pub learned_from: Vec<Uuid>,
    pub project: ProjectScope,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A consolidated temporal summary (spec.md §3, Temporal Summary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalSummary {
    pub level: super::enums::TemporalLevel,
    /// `YYYY`, `YYYY-MM`, or `YYYY-MM-DD` depending on `level`.
    pub period: String,
    pub project: Option<String>,
    pub content: String,
}

/// A key-value fact (spec.md §3, Memory Entry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub key: String,
    pub scope: ProjectScope,
    pub content: String,
    pub relevance: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

/// One consolidation-log row (spec.md §3, Consolidation Log).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationLogRow {
    pub cycle_id: Uuid,
    pub project: ProjectScope,
    pub phase: super::enums::ConsolidationPhase,
    pub status: ConsolidationStatus,
    pub metrics: serde_json::Value,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// The 8 Beta-posterior counters plus total-feedback count (spec.md
/// §3, Weight Learner State). Serializable opaque state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightLearnerState {
    pub alpha: [f64; 4],
    pub beta: [f64; 4],
    pub total_feedback: u64,
}

impl Default for WeightLearnerState {
    fn default() -> Self {
        Self {
            alpha: [1.0; 4],
            beta: [1.0; 4],
            total_feedback: 0,
        }
    }
}

/// Per-cluster BOCPD run-length posterior and sufficient statistics
/// (spec.md §3, BOCPD State). Dense arrays keyed by cluster index
/// (spec.md §9, "Arena + index for BOCPD state").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BocpdState {
    /// `log_posterior[r]` = log P(run-length = r | observations so far).
    pub log_posterior: Vec<f64>,
    /// Running sufficient statistics (count, mean, M2 for Welford's
    /// variance) per run-length, parallel to `log_posterior`.
    pub stats: Vec<RunStats>,
    /// Bounded window of the most recent raw feature scalars, used to
    /// seed new run-length-0 statistics.
    #[serde(default)]
    pub recent_window: VecDeque<f64>,
    pub total_observations: u64,
}

impl Default for BocpdState {
    fn default() -> Self {
        Self {
            log_posterior: vec![0.0],
            stats: vec![RunStats::default()],
            recent_window: VecDeque::new(),
            total_observations: 0,
        }
    }
}

/// Running mean/variance sufficient statistics for one run-length
/// hypothesis (Welford's algorithm).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub count: u64,
    pub mean: f64,
    pub m2: f64,
}

impl RunStats {
    #[must_use]
    pub fn variance(self) -> f64 {
        if self.count < 2 {
            1.0
        } else {
            (self.m2 / self.count as f64).max(1e-6)
        }
    }

    #[must_use]
    pub fn observe(mut self, x: f64) -> Self {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;
        self
    }
}
