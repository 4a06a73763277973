//! Bayesian Online Change-Point Detection over per-cluster feature
//! streams (spec.md §4.9).
//!
//! Dense arena-style state keyed by a string→index map (spec.md §9,
//! "Arena + index for BOCPD state"), in the spirit of
//! `memory-mcp::patterns::statistical::analysis::bocpd::SimpleBOCPD`'s
//! `log_posterior: Vec<f64>` / log-sum-exp normalization, but per
//! cluster key rather than a single global stream, and using the
//! textbook Adams & MacKay (2007) growth/change-point recursion so the
//! posterior sums to 1 after every update to the tolerance spec.md §8
//! requires.

use std::collections::HashMap;

use crate::types::{BocpdState, RunStats};

/// Hard structural cap on tracked run-lengths per cluster (spec.md
/// §4.9). Not user-configurable: it bounds memory, not model
/// behavior.
pub const RUN_LENGTH_CAP: usize = 2000;

/// Per-cluster-key BOCPD tracker.
#[derive(Debug, Default)]
pub struct BocpdTracker {
    index: HashMap<String, usize>,
    clusters: Vec<ClusterState>,
    window_size: usize,
}

#[derive(Debug, Clone)]
struct ClusterState {
    key: String,
    state: BocpdState,
}

/// Result of feeding one observation into a cluster's BOCPD stream.
#[derive(Debug, Clone, Copy)]
pub struct BocpdUpdate {
    /// Posterior mass at run-length 0 after this update — the
    /// observable change-point signal (spec.md §4.9, §9).
    pub change_point_mass: f64,
    pub map_run_length: usize,
    pub total_observations: u64,
}

impl BocpdTracker {
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        Self {
            index: HashMap::new(),
            clusters: Vec::new(),
            window_size: window_size.max(1),
        }
    }

    fn cluster_index(&mut self, key: &str) -> usize {
        if let Some(&idx) = self.index.get(key) {
            return idx;
        }
        let idx = self.clusters.len();
        self.clusters.push(ClusterState {
            key: key.to_string(),
            state: BocpdState::default(),
        });
        self.index.insert(key.to_string(), idx);
        idx
    }

    /// Feed one scalar feature observation for `cluster_key` (spec.md
    /// §4.9, `observe`). `hazard = 1/lambda` is the geometric prior on
    /// segment length. Never panics; handles `confidence = 0`,
    /// `observation_count = 0`, and arbitrary feature magnitude.
    pub fn observe(&mut self, cluster_key: &str, feature: f64, hazard: f64) -> BocpdUpdate {
        let idx = self.cluster_index(cluster_key);
        let state = &mut self.clusters[idx].state;
        update_one(state, feature, hazard, self.window_size);

        let map_run_length = state
            .log_posterior
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(r, _)| r)
            .unwrap_or(0);

        BocpdUpdate {
            change_point_mass: state.log_posterior[0].exp(),
            map_run_length,
            total_observations: state.total_observations,
        }
    }

    #[must_use]
    pub fn observation_count(&self, cluster_key: &str) -> u64 {
        self.index
            .get(cluster_key)
            .map(|&idx| self.clusters[idx].state.total_observations)
            .unwrap_or(0)
    }

    /// Posterior mass at run-length 0 for `cluster_key` — the
    /// observable change-point signal (spec.md §4.9 step 2). `0.0` for
    /// an unobserved cluster.
    #[must_use]
    pub fn change_point_mass(&self, cluster_key: &str) -> f64 {
        self.index
            .get(cluster_key)
            .map(|&idx| self.clusters[idx].state.log_posterior[0].exp())
            .unwrap_or(0.0)
    }

    #[must_use]
    pub fn clusters(&self) -> impl Iterator<Item = &str> {
        self.clusters.iter().map(|c| c.key.as_str())
    }

    /// Serialize the whole tracker to an opaque blob (spec.md §4.9,
    /// `persist()`).
    pub fn persist(&self) -> serde_json::Result<Vec<u8>> {
        let snapshot: Vec<(&str, &BocpdState)> =
            self.clusters.iter().map(|c| (c.key.as_str(), &c.state)).collect();
        serde_json::to_vec(&snapshot)
    }

    /// Restore from a blob produced by `persist()`. On parse failure,
    /// silently clears and the tracker rebuilds over the next
    /// observation window (spec.md §4.9, §7).
    #[must_use]
    pub fn restore(bytes: &[u8], window_size: usize) -> Self {
        let parsed: Option<Vec<(String, BocpdState)>> = serde_json::from_slice(bytes).ok();
        match parsed {
            Some(entries) => {
                let mut tracker = Self::new(window_size);
                for (key, state) in entries {
                    let idx = tracker.clusters.len();
                    tracker.clusters.push(ClusterState { key: key.clone(), state });
                    tracker.index.insert(key, idx);
                }
                tracker
            }
            None => Self::new(window_size),
        }
    }
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Log predictive likelihood of `x` under a Normal approximation with
/// the run's running mean/variance — a pragmatic stand-in for the
/// conjugate Student-t predictive; spec.md §8 only constrains the
/// posterior's normalization, not the exact likelihood family.
fn log_predictive(x: f64, stats: RunStats) -> f64 {
    let variance = stats.variance();
    let diff = x - stats.mean;
    -0.5 * ((diff * diff) / variance + variance.ln() + (2.0 * std::f64::consts::PI).ln())
}

fn update_one(state: &mut BocpdState, x: f64, hazard: f64, window_size: usize) {
    let hazard = hazard.clamp(1e-9, 1.0 - 1e-9);
    let log_hazard = hazard.ln();
    let log_survival = (1.0 - hazard).ln();

    let r_max = state.log_posterior.len();
    let mut growth_terms = vec![f64::NEG_INFINITY; r_max];
    let mut cp_terms = vec![f64::NEG_INFINITY; r_max];

    for r in 0..r_max {
        if !state.log_posterior[r].is_finite() {
            continue;
        }
        let pred = log_predictive(x, state.stats[r]);
        growth_terms[r] = state.log_posterior[r] + pred + log_survival;
        cp_terms[r] = state.log_posterior[r] + pred + log_hazard;
    }

    let log_cp_mass = log_sum_exp(&cp_terms);

    let mut new_posterior = Vec::with_capacity(r_max + 1);
    new_posterior.push(log_cp_mass);
    new_posterior.extend_from_slice(&growth_terms);

    let mut new_stats = Vec::with_capacity(r_max + 1);
    new_stats.push(RunStats::default().observe(x));
    for r in 0..r_max {
        new_stats.push(state.stats[r].observe(x));
    }

    let normalizer = log_sum_exp(&new_posterior);
    if normalizer.is_finite() {
        for v in &mut new_posterior {
            if v.is_finite() {
                *v -= normalizer;
            }
        }
    }

    state.log_posterior = new_posterior;
    state.stats = new_stats;
    state.total_observations += 1;

    state.recent_window.push_back(x);
    while state.recent_window.len() > window_size {
        state.recent_window.pop_front();
    }

    if state.log_posterior.len() > RUN_LENGTH_CAP {
        state.log_posterior.truncate(RUN_LENGTH_CAP);
        state.stats.truncate(RUN_LENGTH_CAP);
        let renorm = log_sum_exp(&state.log_posterior);
        if renorm.is_finite() {
            for v in &mut state.log_posterior {
                if v.is_finite() {
                    *v -= renorm;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posterior_sums_to_one_after_each_update() {
        let mut tracker = BocpdTracker::new(500);
        for i in 0..50 {
            tracker.observe("cluster-a", (i as f64).sin(), 1.0 / 250.0);
            let idx = tracker.index["cluster-a"];
            let sum: f64 = tracker.clusters[idx].state.log_posterior.iter().map(|l| l.exp()).sum();
            assert!((sum - 1.0).abs() < 1e-6, "sum={sum} at step {i}");
        }
    }

    #[test]
    fn handles_zero_and_extreme_features_without_panicking() {
        let mut tracker = BocpdTracker::new(500);
        tracker.observe("edge", 0.0, 0.01);
        tracker.observe("edge", 1e9, 0.01);
        tracker.observe("edge", -1e9, 0.01);
        assert_eq!(tracker.observation_count("edge"), 3);
    }

    #[test]
    fn run_length_cap_keeps_vector_bounded() {
        let mut tracker = BocpdTracker::new(500);
        for i in 0..(RUN_LENGTH_CAP + 100) {
            tracker.observe("long", (i as f64) * 0.001, 1.0 / 10_000.0);
        }
        let idx = tracker.index["long"];
        assert!(tracker.clusters[idx].state.log_posterior.len() <= RUN_LENGTH_CAP + 1);
    }

    #[test]
    fn persist_restore_round_trip_continues_observing() {
        let mut tracker = BocpdTracker::new(500);
        for i in 0..20 {
            tracker.observe("a", i as f64, 1.0 / 250.0);
        }
        let blob = tracker.persist().unwrap();
        let mut restored = BocpdTracker::restore(&blob, 500);
        assert_eq!(restored.observation_count("a"), 20);
        restored.observe("a", 20.0, 1.0 / 250.0);
        assert_eq!(restored.observation_count("a"), 21);
    }

    #[test]
    fn restore_on_malformed_blob_starts_fresh() {
        let tracker = BocpdTracker::restore(b"not json", 500);
        assert_eq!(tracker.observation_count("anything"), 0);
    }
}
