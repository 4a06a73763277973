//! REPLAY — surprise scoring over a project's recent sessions
//! (spec.md §4.10.1).

use std::collections::HashMap;

use uuid::Uuid;

use crate::types::{Session, ToolCall, Turn};

/// One turn with its computed surprise and retention weight.
#[derive(Debug, Clone)]
pub struct ScoredTurn {
    pub session_id: Uuid,
    pub turn_number: u32,
    pub content: String,
    /// Multiset of tool names invoked by this turn, in call order.
    pub tool_names: Vec<String>,
    pub surprise: f64,
    pub retention_weight: f64,
    pub high_surprise: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReplayResult {
    pub scored: Vec<ScoredTurn>,
    pub high_surprise: Vec<ScoredTurn>,
}

/// Score every turn across the already-loaded session scope (spec.md
/// §4.10.1). The scope itself (up to `max_sessions_per_cycle` most
/// recent sessions) is loaded once by the caller and shared across all
/// five phases.
pub fn replay(per_session: &[(Session, Vec<Turn>)], surprise_threshold: f64) -> ReplayResult {
    let mut pattern_counts: HashMap<(String, bool), u64> = HashMap::new();
    let mut total_patterns = 0u64;
    for (_, turns) in per_session {
        for turn in turns {
            for call in &turn.tool_calls {
                *pattern_counts.entry((call.name.clone(), call.is_error)).or_insert(0) += 1;
                total_patterns += 1;
            }
        }
    }

    struct Raw {
        session_id: Uuid,
        turn_number: u32,
        content: String,
        tool_names: Vec<String>,
        raw_surprise: f64,
    }

    let mut raw = Vec::new();
    for (session, turns) in per_session {
        let mean_len = mean_content_len(turns);
        for turn in turns {
            let raw_surprise = if turn.tool_calls.is_empty() {
                (turn.content.chars().count() as f64 - mean_len).abs()
            } else {
                tool_surprise(&turn.tool_calls, &pattern_counts, total_patterns)
            };
            raw.push(Raw {
                session_id: session.id,
                turn_number: turn.turn_number,
                content: turn.content.clone(),
                tool_names: turn.tool_calls.iter().map(|c| c.name.clone()).collect(),
                raw_surprise,
            });
        }
    }

    let max_surprise = raw.iter().map(|r| r.raw_surprise).fold(0.0_f64, f64::max);

    let mut result = ReplayResult::default();

    for r in raw {
        let surprise = if max_surprise > 0.0 { (r.raw_surprise / max_surprise).clamp(0.0, 1.0) } else { 0.0 };
        let retention_weight = 0.5 + 0.5 * surprise;
        let high_surprise = surprise >= surprise_threshold;
        let scored = ScoredTurn {
            session_id: r.session_id,
            turn_number: r.turn_number,
            content: r.content,
            tool_names: r.tool_names,
            surprise,
            retention_weight,
            high_surprise,
        };
        if high_surprise {
            result.high_surprise.push(scored.clone());
        }
        result.scored.push(scored);
    }

    result
}

fn mean_content_len(turns: &[Turn]) -> f64 {
    if turns.is_empty() {
        return 0.0;
    }
    turns.iter().map(|t| t.content.chars().count() as f64).sum::<f64>() / turns.len() as f64
}

/// TF-IDF-style rarity of a turn's tool-call patterns across the
/// replay corpus, bumped when any call in the turn errored (spec.md
/// §4.10.1).
fn tool_surprise(calls: &[ToolCall], counts: &HashMap<(String, bool), u64>, total: u64) -> f64 {
    if calls.is_empty() {
        return 0.0;
    }
    let has_error = calls.iter().any(|c| c.is_error);
    let mean_idf = calls
        .iter()
        .map(|c| {
            let count = counts.get(&(c.name.clone(), c.is_error)).copied().unwrap_or(1);
            ((total.max(1) as f64 + 1.0) / (count as f64 + 1.0)).ln() + 1.0
        })
        .sum::<f64>()
        / calls.len() as f64;
    if has_error {
        mean_idf * 1.2
    } else {
        mean_idf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_content_len_of_empty_is_zero() {
        assert_eq!(mean_content_len(&[]), 0.0);
    }

    #[test]
    fn tool_surprise_bumps_on_error() {
        let mut counts = HashMap::new();
        counts.insert(("bash".to_string(), false), 10);
        counts.insert(("bash".to_string(), true), 1);
        let ok_call = ToolCall { name: "bash".into(), input: serde_json::json!({}), result: None, is_error: false };
        let err_call = ToolCall { name: "bash".into(), input: serde_json::json!({}), result: None, is_error: true };
        let ok_surprise = tool_surprise(std::slice::from_ref(&ok_call), &counts, 11);
        let err_surprise = tool_surprise(std::slice::from_ref(&err_call), &counts, 11);
        assert!(err_surprise > ok_surprise);
    }
}
