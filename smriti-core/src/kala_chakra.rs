//! Kala Chakra — the multi-scale temporal relevance engine (spec.md
//! §4.4). "Wheel of time": five named exponential-decay scales mixed
//! by prior weight.

use chrono::{DateTime, Utc};

/// One of the five named time scales (spec.md §2, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scale {
    Immediate,
    Recent,
    Session,
    Episodic,
    Biographical,
}

impl Scale {
    pub const ALL: [Scale; 5] = [
        Scale::Immediate,
        Scale::Recent,
        Scale::Session,
        Scale::Episodic,
        Scale::Biographical,
    ];
}

/// Half-life and prior weight for one scale.
#[derive(Debug, Clone, Copy)]
pub struct ScaleConfig {
    pub half_life_ms: f64,
    pub weight: f64,
}

/// The recommended default table from spec.md §4.4: immediate 60s/0.05,
/// recent 1h/0.15, session 1d/0.25, episodic 7d/0.30, biographical
/// 365d/0.25. Weights sum to 1.
#[derive(Debug, Clone, Copy)]
pub struct KalaChakra {
    immediate: ScaleConfig,
    recent: ScaleConfig,
    session: ScaleConfig,
    episodic: ScaleConfig,
    biographical: ScaleConfig,
}

const SECOND: f64 = 1000.0;
const MINUTE: f64 = 60.0 * SECOND;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;

impl Default for KalaChakra {
    fn default() -> Self {
        Self {
            immediate: ScaleConfig {
                half_life_ms: 60.0 * SECOND,
                weight: 0.05,
            },
            recent: ScaleConfig {
                half_life_ms: HOUR,
                weight: 0.15,
            },
            session: ScaleConfig {
                half_life_ms: DAY,
                weight: 0.25,
            },
            episodic: ScaleConfig {
                half_life_ms: 7.0 * DAY,
                weight: 0.30,
            },
            biographical: ScaleConfig {
                half_life_ms: 365.0 * DAY,
                weight: 0.25,
            },
        }
    }
}

impl KalaChakra {
    #[must_use]
    pub fn config(&self, scale: Scale) -> ScaleConfig {
        match scale {
            Scale::Immediate => self.immediate,
            Scale::Recent => self.recent,
            Scale::Session => self.session,
            Scale::Episodic => self.episodic,
            Scale::Biographical => self.biographical,
        }
    }

    fn delta_ms(event_time: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let raw = (now - event_time).num_milliseconds() as f64;
        raw.max(0.0)
    }

    /// Mixture of per-scale exponential decays:
    /// `Σᵢ wᵢ · 2^(−Δt / halflifeᵢ)` with `Δt = max(0, now − event_time)`
    /// (spec.md §4.4). Always in `[0, 1]` and non-increasing in the gap.
    #[must_use]
    pub fn relevance(&self, event_time: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let delta = Self::delta_ms(event_time, now);
        Scale::ALL
            .iter()
            .map(|s| {
                let cfg = self.config(*s);
                cfg.weight * 2f64.powf(-delta / cfg.half_life_ms)
            })
            .sum()
    }

    /// Multiplicative temporal boost of a raw score.
    #[must_use]
    pub fn boost(&self, score: f64, event_time: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        score * self.relevance(event_time, now)
    }

    /// The scale whose `weight * decay` term is largest for a given
    /// gap (spec.md §4.4).
    #[must_use]
    pub fn dominant_scale(&self, delta_ms: f64) -> Scale {
        Scale::ALL
            .iter()
            .copied()
            .max_by(|a, b| {
                let term = |s: Scale| {
                    let cfg = self.config(s);
                    cfg.weight * 2f64.powf(-delta_ms.max(0.0) / cfg.half_life_ms)
                };
                term(*a)
                    .partial_cmp(&term(*b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(Scale::Immediate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn relevance_at_zero_gap_is_one() {
        let kala = KalaChakra::default();
        let now = Utc::now();
        assert!((kala.relevance(now, now) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn relevance_is_bounded_and_non_increasing() {
        let kala = KalaChakra::default();
        let now = Utc::now();
        let mut prev = 1.0;
        for days in [0i64, 1, 7, 30, 90, 365, 1000] {
            let t = now - Duration::days(days);
            let r = kala.relevance(t, now);
            assert!((0.0..=1.0).contains(&r));
            assert!(r <= prev + 1e-9, "relevance increased at {days} days");
            prev = r;
        }
    }

    #[test]
    fn future_event_time_is_clamped_to_zero_gap() {
        let kala = KalaChakra::default();
        let now = Utc::now();
        let future = now + Duration::hours(1);
        assert!((kala.relevance(future, now) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn boost_multiplies_score_by_relevance() {
        let kala = KalaChakra::default();
        let now = Utc::now();
        assert!((kala.boost(2.0, now, now) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn dominant_scale_is_episodic_at_zero_gap() {
        // At Δt=0 every scale's decay term is 2^0 = 1, so `weight ·
        // decay` reduces to the raw prior weight, and episodic (0.30)
        // is the largest of the five (spec.md §4.4 table).
        let kala = KalaChakra::default();
        assert_eq!(kala.dominant_scale(0.0), Scale::Episodic);
    }

    #[test]
    fn dominant_scale_shifts_to_biographical_far_out() {
        let kala = KalaChakra::default();
        assert_eq!(kala.dominant_scale(400.0 * DAY), Scale::Biographical);
    }
}
