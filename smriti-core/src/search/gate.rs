//! Self-RAG gate: decide whether a query is worth retrieving for at
//! all (spec.md §4.6, `should_retrieve`).

/// Fixed list of English knowledge-gap phrases. Matching is
/// case-insensitive substring containment, so this is deterministic on
/// the input.
const KNOWLEDGE_GAP_PHRASES: &[&str] = &[
    "what did",
    "when did",
    "previously",
    "last time",
    "recall",
    "we discussed",
    "session:",
];

/// Tokens whose simultaneous presence signals a project/memory/context
/// lookup (spec.md §4.6: "project/memory/context cooccurrence").
const COOCCURRENCE_GROUPS: &[&[&str]] = &[&["project", "memory"], &["project", "context"], &["memory", "context"]];

/// True when `query` matches a knowledge-gap phrase, a
/// project/memory/context cooccurrence, or ends with `?` and has
/// length greater than 20 (spec.md §4.6).
#[must_use]
pub fn should_retrieve(query: &str) -> bool {
    let lower = query.to_lowercase();

    if KNOWLEDGE_GAP_PHRASES.iter().any(|p| lower.contains(p)) {
        return true;
    }

    if COOCCURRENCE_GROUPS
        .iter()
        .any(|group| group.iter().all(|term| lower.contains(term)))
    {
        return true;
    }

    query.trim_end().ends_with('?') && query.chars().count() > 20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_knowledge_gap_phrases() {
        assert!(should_retrieve("what did we decide about auth"));
        assert!(should_retrieve("Previously I configured the db"));
        assert!(should_retrieve("session: abc123"));
    }

    #[test]
    fn recognizes_cooccurrence() {
        assert!(should_retrieve("what's the project memory on this"));
    }

    #[test]
    fn long_question_triggers_gate() {
        let q = "is this the right approach for caching?";
        assert!(q.chars().count() > 20);
        assert!(should_retrieve(q));
    }

    #[test]
    fn short_question_does_not_trigger_gate() {
        assert!(!should_retrieve("really?"));
    }

    #[test]
    fn plain_statement_does_not_trigger_gate() {
        assert!(!should_retrieve("please add a new button to the form"));
    }
}
