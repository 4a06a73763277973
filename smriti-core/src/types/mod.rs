//! Core data model: sessions, turns, and the derivative records Vasana
//! and Svapna read and write (Samskara, Vasana, Vidhi, temporal
//! summaries, memory entries).

mod enums;
mod structs;

pub use enums::{
    ConsolidationPhase, PatternType, PramanaType, Role, StreamKind, TemporalLevel,
    ConsolidationStatus, Valence,
};
pub use structs::{
    BocpdState, ConsolidationLogRow, MemoryEntry, ParameterSpec, RunStats, Samskara, Session,
    TemporalSummary, Turn, ToolCall, Vasana, Vidhi, VidhiStep, WeightLearnerState,
};

/// Project scope: either the reserved global bucket or a concrete
/// project path. Replaces the informal `string ∪ {__global__}` union
/// with a tagged enum (spec.md §9: "tagged variants preferred over
/// dynamic dispatch").
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ProjectScope {
    Global,
    Project(String),
}

impl ProjectScope {
    /// The reserved string used when a scope must be serialized flat,
    /// e.g. as a SQL column or a BOCPD persistence key.
    pub const GLOBAL_KEY: &'static str = "__global__";

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ProjectScope::Global => Self::GLOBAL_KEY,
            ProjectScope::Project(p) => p.as_str(),
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Self {
        if s == Self::GLOBAL_KEY {
            ProjectScope::Global
        } else {
            ProjectScope::Project(s.to_string())
        }
    }

    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, ProjectScope::Global)
    }
}

impl std::fmt::Display for ProjectScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
