use serde::{Deserialize, Serialize};

/// Role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// Kind of observed pattern feeding Vasana/Svapna (spec.md §3, Samskara).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternType {
    ToolSequence,
    Preference,
    Decision,
    Correction,
    Convention,
}

impl PatternType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PatternType::ToolSequence => "tool-sequence",
            PatternType::Preference => "preference",
            PatternType::Decision => "decision",
            PatternType::Correction => "correction",
            PatternType::Convention => "convention",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "tool-sequence" => Some(PatternType::ToolSequence),
            "preference" => Some(PatternType::Preference),
            "decision" => Some(PatternType::Decision),
            "correction" => Some(PatternType::Correction),
            "convention" => Some(PatternType::Convention),
            _ => None,
        }
    }
}

/// Pramana — the epistemic category of a piece of evidence, each with a
/// fixed reliability weight used by the hybrid search boost (spec.md
/// §4.6) and by Svapna's COMPRESS importance weighting (spec.md
/// §4.10.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PramanaType {
    /// Direct perception — a tool result was observed directly.
    Pratyaksha,
    /// Inference from reasoning without primary evidence.
    Anumana,
    /// Testimony — documentation or authority markers.
    Shabda,
    /// Analogy.
    Upamana,
    /// Postulation / necessary implication.
    Arthapatti,
    /// Non-apprehension — hedged, absence-of-evidence claims.
    Anupalabdhi,
}

impl PramanaType {
    /// Reliability weight used by the Pramana epistemic boost
    /// (spec.md §4.6 step 5).
    #[must_use]
    pub fn reliability(self) -> f64 {
        match self {
            PramanaType::Pratyaksha => 1.0,
            PramanaType::Anumana => 0.85,
            PramanaType::Shabda => 0.75,
            PramanaType::Upamana => 0.6,
            PramanaType::Arthapatti => 0.5,
            PramanaType::Anupalabdhi => 0.4,
        }
    }

    /// Importance weight used by Svapna's COMPRESS phase (spec.md
    /// §4.10.5) — distinct from `reliability` because compression
    /// favors retaining high-evidence turns, not boosting search rank.
    #[must_use]
    pub fn importance(self) -> f64 {
        match self {
            PramanaType::Pratyaksha => 0.95,
            PramanaType::Shabda => 0.80,
            PramanaType::Anumana => 0.65,
            PramanaType::Upamana => 0.50,
            PramanaType::Arthapatti => 0.40,
            PramanaType::Anupalabdhi => 0.25,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PramanaType::Pratyaksha => "pratyaksha",
            PramanaType::Anumana => "anumana",
            PramanaType::Shabda => "shabda",
            PramanaType::Upamana => "upamana",
            PramanaType::Arthapatti => "arthapatti",
            PramanaType::Anupalabdhi => "anupalabdhi",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pratyaksha" => Some(PramanaType::Pratyaksha),
            "anumana" => Some(PramanaType::Anumana),
            "shabda" => Some(PramanaType::Shabda),
            "upamana" => Some(PramanaType::Upamana),
            "arthapatti" => Some(PramanaType::Arthapatti),
            "anupalabdhi" => Some(PramanaType::Anupalabdhi),
            _ => None,
        }
    }

    /// Default used wherever a Pramana type is absent (spec.md §4.5,
    /// §4.6): testimony is the least committal default.
    #[must_use]
    pub fn default_missing() -> Self {
        PramanaType::Shabda
    }
}

/// Valence of a crystallized tendency (spec.md §3, Vasana).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Valence {
    Positive,
    Negative,
    Neutral,
}

impl Valence {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Valence::Positive => "positive",
            Valence::Negative => "negative",
            Valence::Neutral => "neutral",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Valence::Positive),
            "negative" => Some(Valence::Negative),
            "neutral" => Some(Valence::Neutral),
            _ => None,
        }
    }
}

impl PatternType {
    /// Valence a crystallized tendency derives from its originating
    /// pattern type (spec.md §4.9 step 3).
    #[must_use]
    pub fn derived_valence(self) -> Valence {
        match self {
            PatternType::Preference | PatternType::Convention => Valence::Positive,
            PatternType::Correction => Valence::Negative,
            PatternType::ToolSequence | PatternType::Decision => Valence::Neutral,
        }
    }
}

/// One of the five phases of a Svapna consolidation cycle (spec.md
/// §4.10), in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationPhase {
    Replay,
    Recombine,
    Crystallize,
    Proceduralize,
    Compress,
}

impl ConsolidationPhase {
    pub const ALL: [ConsolidationPhase; 5] = [
        ConsolidationPhase::Replay,
        ConsolidationPhase::Recombine,
        ConsolidationPhase::Crystallize,
        ConsolidationPhase::Proceduralize,
        ConsolidationPhase::Compress,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConsolidationPhase::Replay => "replay",
            ConsolidationPhase::Recombine => "recombine",
            ConsolidationPhase::Crystallize => "crystallize",
            ConsolidationPhase::Proceduralize => "proceduralize",
            ConsolidationPhase::Compress => "compress",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "replay" => Some(ConsolidationPhase::Replay),
            "recombine" => Some(ConsolidationPhase::Recombine),
            "crystallize" => Some(ConsolidationPhase::Crystallize),
            "proceduralize" => Some(ConsolidationPhase::Proceduralize),
            "compress" => Some(ConsolidationPhase::Compress),
            _ => None,
        }
    }
}

/// Status of a single consolidation-log row (spec.md §3,
/// Consolidation Log).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationStatus {
    Running,
    Success,
    Error,
}

impl ConsolidationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConsolidationStatus::Running => "running",
            ConsolidationStatus::Success => "success",
            ConsolidationStatus::Error => "error",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(ConsolidationStatus::Running),
            "success" => Some(ConsolidationStatus::Success),
            "error" => Some(ConsolidationStatus::Error),
            _ => None,
        }
    }
}

/// Granularity of a temporal summary / hierarchical search level
/// (spec.md §3, §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalLevel {
    Yearly,
    Monthly,
    Daily,
}

impl TemporalLevel {
    /// Depth boost applied during hierarchical drill (spec.md §4.8).
    #[must_use]
    pub fn depth_boost(self) -> f64 {
        match self {
            TemporalLevel::Yearly => 0.6,
            TemporalLevel::Monthly => 0.8,
            TemporalLevel::Daily => 1.0,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TemporalLevel::Yearly => "yearly",
            TemporalLevel::Monthly => "monthly",
            TemporalLevel::Daily => "daily",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "yearly" => Some(TemporalLevel::Yearly),
            "monthly" => Some(TemporalLevel::Monthly),
            "daily" => Some(TemporalLevel::Daily),
            _ => None,
        }
    }
}

/// One of the four preservation streams (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Identity,
    Projects,
    Tasks,
    Flow,
}

impl StreamKind {
    pub const ALL: [StreamKind; 4] = [
        StreamKind::Identity,
        StreamKind::Projects,
        StreamKind::Tasks,
        StreamKind::Flow,
    ];

    /// Preservation ratio fixed by spec.md §6.
    #[must_use]
    pub fn preservation_ratio(self) -> f64 {
        match self {
            StreamKind::Identity => 0.95,
            StreamKind::Projects => 0.80,
            StreamKind::Tasks => 0.70,
            StreamKind::Flow => 0.30,
        }
    }

    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            StreamKind::Identity => "identity.md",
            StreamKind::Projects => "projects.md",
            StreamKind::Tasks => "tasks.md",
            StreamKind::Flow => "flow.md",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips() {
        for r in [Role::User, Role::Assistant] {
            assert_eq!(Role::from_str(r.as_str()), Some(r));
        }
    }

    #[test]
    fn valence_round_trips() {
        for v in [Valence::Positive, Valence::Negative, Valence::Neutral] {
            assert_eq!(Valence::from_str(v.as_str()), Some(v));
        }
    }

    #[test]
    fn consolidation_phase_round_trips() {
        for p in ConsolidationPhase::ALL {
            assert_eq!(ConsolidationPhase::from_str(p.as_str()), Some(p));
        }
    }

    #[test]
    fn consolidation_status_round_trips() {
        for s in [ConsolidationStatus::Running, ConsolidationStatus::Success, ConsolidationStatus::Error] {
            assert_eq!(ConsolidationStatus::from_str(s.as_str()), Some(s));
        }
    }

    #[test]
    fn temporal_level_round_trips() {
        for l in [TemporalLevel::Yearly, TemporalLevel::Monthly, TemporalLevel::Daily] {
            assert_eq!(TemporalLevel::from_str(l.as_str()), Some(l));
        }
    }

    #[test]
    fn unknown_strings_parse_to_none() {
        assert_eq!(Role::from_str("bogus"), None);
        assert_eq!(PatternType::from_str("bogus"), None);
        assert_eq!(PramanaType::from_str("bogus"), None);
    }
}
