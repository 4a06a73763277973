//! COMPRESS — Sinkhorn-weighted turn compression (spec.md §4.10.5).
//!
//! Every turn gets a Pramana-derived importance weight; a
//! Sinkhorn–Knopp transport plan between the turn distribution and a
//! target-length distribution then picks which turns survive, biased
//! toward the turns the transport plan assigns the most responsibility
//! to, while errored tool calls are protected by a hard importance
//! floor.

use crate::tokenizer::Tokenizer;
use crate::types::{PramanaType, Turn};

/// Result of one COMPRESS pass (spec.md §4.10.5).
#[derive(Debug, Clone, Copy, Default)]
pub struct CompressResult {
    pub tokens_compressed: u64,
    /// `new_tokens / old_tokens`, in `(0, 1]`. `1.0` means no
    /// compression was performed (spec.md §4.10.5 step 4).
    pub compression_ratio: f64,
}

const SINKHORN_ITERATIONS: usize = 25;
const SINKHORN_TOLERANCE: f64 = 1e-6;

/// Classify a turn's importance via Pramana content heuristics, with a
/// hard floor of 0.9 when it carries an errored tool call (spec.md
/// §4.10.5 step 2).
#[must_use]
pub fn classify_importance(turn: &Turn) -> f64 {
    let has_tool_result = turn.tool_calls.iter().any(|c| c.result.is_some());
    let has_error = turn.tool_calls.iter().any(|c| c.is_error);
    let content = turn.content.to_lowercase();

    let base = if has_tool_result {
        PramanaType::Pratyaksha.importance()
    } else if contains_any(&content, &["according to", "the docs say", "specification", "per the reference"]) {
        PramanaType::Shabda.importance()
    } else if contains_any(&content, &["maybe", "perhaps", "possibly", "might", "could be"]) {
        PramanaType::Anupalabdhi.importance()
    } else if contains_any(&content, &["must be", "likely implies", "therefore", "probably means"]) {
        PramanaType::Arthapatti.importance()
    } else if contains_any(&content, &["similar to", "analogous to", "just as", "compared to"]) {
        PramanaType::Upamana.importance()
    } else {
        PramanaType::Anumana.importance()
    };

    if has_error {
        base.max(0.9)
    } else {
        base
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Run the full COMPRESS phase over one session's turns (spec.md
/// §4.10.5). `target_ratio` is the fraction of turns retained before
/// token accounting (an implementation choice — see DESIGN.md).
#[must_use]
pub fn compress(turns: &[Turn], tokenizer: &dyn Tokenizer, target_ratio: f64) -> CompressResult {
    if turns.len() < 2 {
        return CompressResult { tokens_compressed: 0, compression_ratio: 1.0 };
    }

    let old_tokens: u64 = turns.iter().map(|t| tokenizer.tokens(&t.content)).sum();
    if old_tokens == 0 {
        return CompressResult { tokens_compressed: 0, compression_ratio: 1.0 };
    }

    let importances: Vec<f64> = turns.iter().map(classify_importance).collect();
    let target_len = ((turns.len() as f64) * target_ratio.clamp(0.05, 1.0)).round().clamp(1.0, turns.len() as f64) as usize;

    let transport = sinkhorn_transport(&importances, target_len);
    let kept = select_by_responsibility(&transport, turns.len(), target_len);

    let new_tokens: u64 = kept.iter().map(|&i| tokenizer.tokens(&turns[i].content)).sum();
    let tokens_compressed = old_tokens.saturating_sub(new_tokens);
    let compression_ratio = if old_tokens == 0 { 1.0 } else { (new_tokens as f64 / old_tokens as f64).clamp(f64::MIN_POSITIVE, 1.0) };

    CompressResult { tokens_compressed, compression_ratio }
}

/// Build a bistochastic transport plan between the importance-weighted
/// source distribution (one row per turn) and a uniform target
/// distribution (one column per retained slot), via iterative
/// row/column normalization (spec.md §4.10.5 step 3, Sinkhorn–Knopp).
fn sinkhorn_transport(importances: &[f64], target_len: usize) -> Vec<Vec<f64>> {
    let n = importances.len();
    let m = target_len.max(1);

    let row_marginal: Vec<f64> = {
        let sum: f64 = importances.iter().sum::<f64>().max(1e-12);
        importances.iter().map(|w| w / sum).collect()
    };
    let col_marginal = vec![1.0 / m as f64; m];

    // Temporal-affinity kernel: turn i has more affinity for bucket j
    // when their normalized positions are close, so compression
    // prefers to keep a representative spread across the session
    // rather than collapsing onto a handful of turns.
    let mut k = vec![vec![0.0_f64; m]; n];
    for i in 0..n {
        let pos_i = i as f64 / n.max(1) as f64;
        for j in 0..m {
            let pos_j = j as f64 / m as f64;
            k[i][j] = (-((pos_i - pos_j).abs()) * 4.0).exp() * importances[i].max(1e-6);
        }
    }

    let mut u = vec![1.0_f64; n];
    let mut v = vec![1.0_f64; m];

    for _ in 0..SINKHORN_ITERATIONS {
        let mut max_dev: f64 = 0.0;

        for i in 0..n {
            let row_sum: f64 = (0..m).map(|j| k[i][j] * v[j]).sum();
            let new_u = if row_sum > 1e-300 { row_marginal[i] / row_sum } else { 0.0 };
            max_dev = max_dev.max((new_u - u[i]).abs());
            u[i] = new_u;
        }
        for j in 0..m {
            let col_sum: f64 = (0..n).map(|i| k[i][j] * u[i]).sum();
            let new_v = if col_sum > 1e-300 { col_marginal[j] / col_sum } else { 0.0 };
            max_dev = max_dev.max((new_v - v[j]).abs());
            v[j] = new_v;
        }

        if max_dev < SINKHORN_TOLERANCE {
            break;
        }
    }

    let mut transport = vec![vec![0.0_f64; m]; n];
    for i in 0..n {
        for j in 0..m {
            transport[i][j] = u[i] * k[i][j] * v[j];
        }
    }
    transport
}

/// For each target column, keep the turn the transport plan assigns
/// the most mass to; returns ascending, deduplicated turn indices so
/// the compressed sequence preserves original order (spec.md §4.10.5
/// step 3, "produce a compressed sequence").
fn select_by_responsibility(transport: &[Vec<f64>], n: usize, m: usize) -> Vec<usize> {
    let mut kept = std::collections::BTreeSet::new();
    for j in 0..m {
        let mut best_i = 0usize;
        let mut best_mass = f64::MIN;
        for (i, row) in transport.iter().enumerate().take(n) {
            if row[j] > best_mass {
                best_mass = row[j];
                best_i = i;
            }
        }
        kept.insert(best_i);
    }
    kept.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::FallbackTokenizer;
    use crate::types::{Role, ToolCall};
    use chrono::Utc;
    use uuid::Uuid;

    fn turn(content: &str, tool_calls: Vec<ToolCall>) -> Turn {
        Turn {
            session_id: Uuid::new_v4(),
            turn_number: 0,
            role: Role::Assistant,
            content: content.to_string(),
            tool_calls,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn fewer_than_two_turns_returns_ratio_one() {
        let turns = vec![turn("hello", vec![])];
        let result = compress(&turns, &FallbackTokenizer, 0.5);
        assert_eq!(result.compression_ratio, 1.0);
        assert_eq!(result.tokens_compressed, 0);
    }

    #[test]
    fn zero_turns_returns_ratio_one() {
        let result = compress(&[], &FallbackTokenizer, 0.5);
        assert_eq!(result.compression_ratio, 1.0);
    }

    #[test]
    fn error_tool_call_floors_importance_at_point_nine() {
        let call = ToolCall { name: "bash".into(), input: serde_json::json!({}), result: None, is_error: true };
        let t = turn("maybe this is fine", vec![call]);
        assert!((classify_importance(&t) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn tool_result_present_yields_pratyaksha_importance() {
        let call = ToolCall {
            name: "read".into(),
            input: serde_json::json!({}),
            result: Some(serde_json::json!("file contents")),
            is_error: false,
        };
        let t = turn("read the file", vec![call]);
        assert!((classify_importance(&t) - 0.95).abs() < 1e-9);
    }

    #[test]
    fn hedging_markers_yield_anupalabdhi_importance() {
        let t = turn("maybe this could be the cause", vec![]);
        assert!((classify_importance(&t) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn compression_shrinks_turn_count_and_ratio_is_bounded() {
        let turns: Vec<Turn> = (0..20).map(|i| turn(&format!("turn number {i} with some body text"), vec![])).collect();
        let result = compress(&turns, &FallbackTokenizer, 0.5);
        assert!(result.compression_ratio > 0.0 && result.compression_ratio <= 1.0);
    }

    #[test]
    fn sinkhorn_transport_rows_and_columns_are_nonnegative() {
        let importances = vec![0.9, 0.3, 0.5, 0.2, 0.95];
        let transport = sinkhorn_transport(&importances, 2);
        for row in &transport {
            for &cell in row {
                assert!(cell >= 0.0);
            }
        }
    }
}
