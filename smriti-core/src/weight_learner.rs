//! Thompson-sampling weight learner over the 4 hybrid-search signals
//! (spec.md §4.3).

use rand::Rng;

use crate::rng::sample_beta;
use crate::types::WeightLearnerState;

/// The 4 signals fused by hybrid search, in their fixed index order
/// (spec.md §4.3: "signal → index mapping is fixed").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Bm25,
    Vector,
    GraphRag,
    Pramana,
}

impl Signal {
    pub const ALL: [Signal; 4] = [Signal::Bm25, Signal::Vector, Signal::GraphRag, Signal::Pramana];

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Signal::Bm25 => 0,
            Signal::Vector => 1,
            Signal::GraphRag => 2,
            Signal::Pramana => 3,
        }
    }
}

/// The four sampled weights, in `[bm25, vector, graphrag, pramana]`
/// order, always summing to 1 (or uniform 0.25 each in the degenerate
/// all-zero case).
pub type Weights = [f64; 4];

/// Thompson-sampling Beta posterior over the 4 signals (spec.md §4.3).
#[derive(Debug, Clone)]
pub struct ThompsonWeightLearner {
    state: WeightLearnerState,
}

impl Default for ThompsonWeightLearner {
    fn default() -> Self {
        Self::new()
    }
}

impl ThompsonWeightLearner {
    /// A fresh learner with the default `Beta(1, 1)` prior on every
    /// signal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: WeightLearnerState::default(),
        }
    }

    #[must_use]
    pub fn from_state(state: WeightLearnerState) -> Self {
        Self { state }
    }

    /// Sample each `Beta(alpha_i, beta_i)` independently and normalize
    /// so the 4 weights sum to 1. Falls back to uniform 0.25 each if
    /// all samples are numerically zero (spec.md §4.3).
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Weights {
        let mut raw = [0.0; 4];
        for i in 0..4 {
            raw[i] = sample_beta(rng, self.state.alpha[i], self.state.beta[i]);
        }
        let total: f64 = raw.iter().sum();
        if total <= 0.0 {
            return [0.25; 4];
        }
        let mut out = [0.0; 4];
        for i in 0..4 {
            out[i] = raw[i] / total;
        }
        out
    }

    /// Record feedback for one signal: `alpha += 1` on success, `beta
    /// += 1` on failure (spec.md §4.3).
    pub fn update(&mut self, signal: Signal, success: bool) {
        let i = signal.index();
        if success {
            self.state.alpha[i] += 1.0;
        } else {
            self.state.beta[i] += 1.0;
        }
        self.state.total_feedback += 1;
    }

    /// Posterior means `alpha_i / (alpha_i + beta_i)`, for diagnostics.
    #[must_use]
    pub fn means(&self) -> Weights {
        let mut out = [0.0; 4];
        for i in 0..4 {
            out[i] = self.state.alpha[i] / (self.state.alpha[i] + self.state.beta[i]);
        }
        out
    }

    #[must_use]
    pub fn serialize(&self) -> WeightLearnerState {
        self.state
    }

    /// Restore from a serialized state. Malformed input (non-finite or
    /// non-positive counters) is silently ignored and the current
    /// state is preserved (spec.md §4.3, §7).
    pub fn restore(&mut self, state: WeightLearnerState) {
        let valid = state
            .alpha
            .iter()
            .chain(state.beta.iter())
            .all(|v| v.is_finite() && *v >= 1.0);
        if valid {
            self.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn fresh_learner_samples_a_simplex() {
        let learner = ThompsonWeightLearner::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..500 {
            let w = learner.sample(&mut rng);
            let sum: f64 = w.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "sum={sum}");
            assert!(w.iter().all(|x| *x >= 0.0));
        }
    }

    #[test]
    fn update_increments_expected_counter() {
        let mut learner = ThompsonWeightLearner::new();
        learner.update(Signal::Vector, true);
        let s = learner.serialize();
        assert_eq!(s.alpha[Signal::Vector.index()], 2.0);
        assert_eq!(s.total_feedback, 1);

        learner.update(Signal::Pramana, false);
        let s2 = learner.serialize();
        assert_eq!(s2.beta[Signal::Pramana.index()], 2.0);
        assert_eq!(s2.total_feedback, 2);
    }

    #[test]
    fn restore_round_trips() {
        let mut learner = ThompsonWeightLearner::new();
        learner.update(Signal::Bm25, true);
        learner.update(Signal::Bm25, true);
        let saved = learner.serialize();

        let mut other = ThompsonWeightLearner::new();
        other.restore(saved);
        assert_eq!(other.serialize().alpha, saved.alpha);
    }

    #[test]
    fn restore_ignores_malformed_state() {
        let mut learner = ThompsonWeightLearner::new();
        let before = learner.serialize();
        let malformed = WeightLearnerState {
            alpha: [f64::NAN, 1.0, 1.0, 1.0],
            beta: [1.0; 4],
            total_feedback: 0,
        };
        learner.restore(malformed);
        assert_eq!(learner.serialize().alpha, before.alpha);
    }

    #[test]
    fn means_match_alpha_over_alpha_plus_beta() {
        let mut learner = ThompsonWeightLearner::new();
        learner.update(Signal::GraphRag, true);
        let means = learner.means();
        assert!((means[Signal::GraphRag.index()] - (2.0 / 3.0)).abs() < 1e-9);
    }
}
