//! RECOMBINE — cross-session association via tool-fingerprint Jaccard
//! similarity (spec.md §4.10.2).

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use super::replay::ScoredTurn;

const SIMILARITY_FLOOR: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    pub anchor_session_id: Uuid,
    pub matched_session_id: Uuid,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RecombineResult {
    pub associations: Vec<Association>,
    pub cross_sessions: usize,
}

/// For each high-surprise, tool-bearing turn, find the best-matching
/// turn in every other session by Jaccard similarity of tool-name sets
/// (spec.md §4.10.2).
pub fn recombine(scored: &[ScoredTurn]) -> RecombineResult {
    let mut by_session: HashMap<Uuid, Vec<&ScoredTurn>> = HashMap::new();
    for turn in scored {
        by_session.entry(turn.session_id).or_default().push(turn);
    }

    let anchors: Vec<&ScoredTurn> =
        scored.iter().filter(|t| t.high_surprise && !t.tool_names.is_empty()).collect();

    let mut associations = Vec::new();
    let mut pairs: HashSet<(Uuid, Uuid)> = HashSet::new();

    for anchor in &anchors {
        let anchor_set: HashSet<&str> = anchor.tool_names.iter().map(String::as_str).collect();

        for (&other_session_id, turns) in &by_session {
            if other_session_id == anchor.session_id {
                continue;
            }

            let mut best: Option<(f64, usize)> = None;
            for turn in turns {
                if turn.tool_names.is_empty() {
                    continue;
                }
                let set: HashSet<&str> = turn.tool_names.iter().map(String::as_str).collect();
                let sim = jaccard(&anchor_set, &set);
                let size = set.len();
                let is_better = match best {
                    None => true,
                    Some((best_sim, best_size)) => sim > best_sim || (sim == best_sim && size > best_size),
                };
                if is_better {
                    best = Some((sim, size));
                }
            }

            if let Some((similarity, _)) = best {
                if similarity >= SIMILARITY_FLOOR {
                    associations.push(Association {
                        anchor_session_id: anchor.session_id,
                        matched_session_id: other_session_id,
                        similarity,
                    });
                    let pair = if anchor.session_id < other_session_id {
                        (anchor.session_id, other_session_id)
                    } else {
                        (other_session_id, anchor.session_id)
                    };
                    pairs.insert(pair);
                }
            }
        }
    }

    associations.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
    RecombineResult { associations, cross_sessions: pairs.len() }
}

fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(session: Uuid, tools: &[&str], high_surprise: bool) -> ScoredTurn {
        ScoredTurn {
            session_id: session,
            turn_number: 0,
            content: String::new(),
            tool_names: tools.iter().map(|s| s.to_string()).collect(),
            surprise: if high_surprise { 0.9 } else { 0.1 },
            retention_weight: 0.5,
            high_surprise,
        }
    }

    #[test]
    fn jaccard_identical_sets_is_one() {
        let a: HashSet<&str> = ["read", "edit"].into_iter().collect();
        let b: HashSet<&str> = ["read", "edit"].into_iter().collect();
        assert!((jaccard(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn seed_scenario_5_four_sessions_six_pairs() {
        let sessions: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let mut scored = Vec::new();
        for &s in &sessions {
            scored.push(turn(s, &["read"], true));
            scored.push(turn(s, &["edit"], true));
        }
        let result = recombine(&scored);
        assert_eq!(result.cross_sessions, 6);
    }

    #[test]
    fn excludes_self_session_matches() {
        let session = Uuid::new_v4();
        let scored = vec![turn(session, &["read"], true), turn(session, &["read"], false)];
        let result = recombine(&scored);
        assert!(result.associations.is_empty());
    }

    #[test]
    fn below_floor_similarity_is_dropped() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let scored = vec![turn(a, &["read", "edit", "write", "grep"], true), turn(b, &["bash"], true)];
        let result = recombine(&scored);
        assert!(result.associations.is_empty());
    }
}
