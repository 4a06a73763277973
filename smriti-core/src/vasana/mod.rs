//! Vasana: the behavioral-tendency engine (spec.md §4.9).
//!
//! Online, `observe()` folds each new samskara into a per-cluster BOCPD
//! stream. Offline (normally from Svapna's CRYSTALLIZE phase),
//! `crystallize()` re-reads the accumulated online state against four
//! gates and upserts crystallized tendencies. `decay()` and
//! `promote_to_global()` run as periodic sweeps (spec.md §5).

mod bocpd;

pub use bocpd::{BocpdTracker, BocpdUpdate, RUN_LENGTH_CAP};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::Result;
use crate::store::Store;
use crate::types::{PatternType, ProjectScope, Samskara, Valence, Vasana};

/// Tunables for the Vasana engine (spec.md §4.9, "Configurable").
#[derive(Debug, Clone, Copy)]
pub struct VasanaConfig {
    /// Geometric prior hazard is `1 / lambda`.
    pub lambda: f64,
    pub window_size: usize,
    pub stability_window: u64,
    pub change_point_threshold: f64,
    pub accuracy_threshold: f64,
    pub holdout_train_ratio: f64,
    pub decay_half_life_ms: i64,
    pub promotion_min_projects: usize,
}

impl Default for VasanaConfig {
    fn default() -> Self {
        Self {
            lambda: 250.0,
            window_size: 500,
            stability_window: 100,
            change_point_threshold: 0.6,
            accuracy_threshold: 0.6,
            holdout_train_ratio: 0.7,
            decay_half_life_ms: 30 * 24 * 60 * 60 * 1000,
            promotion_min_projects: 3,
        }
    }
}

/// A single change-point report (spec.md §4.9 step 2, and §9 "observable-only event").
#[derive(Debug, Clone)]
pub struct ChangePointEvent {
    pub cluster_key: String,
    pub probability: f64,
    pub timestamp: DateTime<Utc>,
}

/// Result of one `crystallize()` call (spec.md §4.9).
#[derive(Debug, Clone, Default)]
pub struct CrystallizeResult {
    pub created: Vec<Vasana>,
    pub reinforced: Vec<Vasana>,
    pub pending: Vec<String>,
    pub change_points: Vec<ChangePointEvent>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// The Vasana engine: an in-memory BOCPD arena plus the store-backed
/// crystallize/weaken/decay/promote lifecycle.
pub struct VasanaEngine {
    store: Arc<dyn Store>,
    config: VasanaConfig,
    bocpd: Mutex<BocpdTracker>,
}

impl VasanaEngine {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: VasanaConfig) -> Self {
        let bocpd = BocpdTracker::new(config.window_size);
        Self { store, config, bocpd: Mutex::new(bocpd) }
    }

    /// Rebuild the BOCPD arena from a persisted blob (spec.md §4.9,
    /// "restore"). Parse failures silently fall back to fresh state.
    #[must_use]
    pub fn with_persisted_state(store: Arc<dyn Store>, config: VasanaConfig, blob: &[u8]) -> Self {
        let bocpd = BocpdTracker::restore(blob, config.window_size);
        Self { store, config, bocpd: Mutex::new(bocpd) }
    }

    /// Serialize the BOCPD arena for the reserved `("bocpd_state",
    /// "__vasana_engine__")` row (spec.md §4.9, §9).
    pub fn persist(&self) -> serde_json::Result<Vec<u8>> {
        self.bocpd.lock().persist()
    }

    /// Fold one samskara observation into its cluster's BOCPD stream.
    /// Never fails: malformed or empty content, zero confidence, and
    /// zero observation counts all map to well-defined features.
    pub fn observe(&self, samskara: &Samskara) -> BocpdUpdate {
        let key = cluster_key(samskara.pattern_type, &samskara.pattern_content);
        let feature = feature_scalar(samskara.confidence, samskara.observation_count);
        let hazard = 1.0 / self.config.lambda.max(1.0);
        self.bocpd.lock().observe(&key, feature, hazard)
    }

    /// Re-evaluate every cluster observed so far for `project` against
    /// the four crystallization gates (spec.md §4.9).
    #[tracing::instrument(skip(self))]
    pub async fn crystallize(&self, project: &str) -> Result<CrystallizeResult> {
        let samskaras = self.store.list_samskaras(Some(project)).await?;
        let mut groups: HashMap<String, ClusterGroup> = HashMap::new();
        for s in &samskaras {
            let key = cluster_key(s.pattern_type, &s.pattern_content);
            groups
                .entry(key)
                .or_insert_with(|| ClusterGroup::new(s.pattern_type, s.pattern_content.clone()))
                .push(s);
        }

        let now = Utc::now();
        let mut result = CrystallizeResult { timestamp: Some(now), ..CrystallizeResult::default() };

        for (key, group) in groups {
            let (observation_count, cp_mass) = {
                let tracker = self.bocpd.lock();
                (tracker.observation_count(&key), tracker.change_point_mass(&key))
            };

            if cp_mass > self.config.change_point_threshold {
                result.change_points.push(ChangePointEvent {
                    cluster_key: key.clone(),
                    probability: cp_mass,
                    timestamp: now,
                });
            }

            let stability_gate = observation_count >= self.config.stability_window;
            let cross_session_gate = group.sessions.len() >= 2;
            let mean_confidence = group.mean_confidence();
            let confidence_gate = mean_confidence > 0.5;
            let holdout_accuracy = group.holdout_accuracy(self.config.holdout_train_ratio);
            let accuracy_gate =
                holdout_accuracy.is_some_and(|a| a >= self.config.accuracy_threshold);

            if !(stability_gate && cross_session_gate && confidence_gate && accuracy_gate) {
                result.pending.push(key);
                continue;
            }

            let name = slugify(&group.content, 64);
            let description =
                format!("Observed {} pattern: \"{}\"", group.pattern_type.as_str(), group.content);
            let valence = group.pattern_type.derived_valence();
            let derived_stability = stability_formula(observation_count);

            match self.store.get_vasana(&name, project).await? {
                Some(mut existing) => {
                    existing.strength = reinforce(existing.strength);
                    existing.stability = existing.stability.max(derived_stability);
                    existing.predictive_accuracy = holdout_accuracy.unwrap_or(existing.predictive_accuracy);
                    existing.source_samskaras.extend(group.ids.iter().copied());
                    existing.reinforcement_count += 1;
                    existing.last_activated = Some(now);
                    existing.activation_count += 1;
                    existing.updated_at = now;
                    self.store.upsert_vasana(&existing).await?;
                    result.reinforced.push(existing);
                }
                None => {
                    let vasana = Vasana {
                        id: Uuid::new_v4(),
                        name: name.clone(),
                        description,
                        valence,
                        strength: reinforce(0.0),
                        stability: derived_stability,
                        predictive_accuracy: holdout_accuracy.unwrap_or(0.0),
                        source_samskaras: group.ids.clone(),
                        reinforcement_count: 1,
                        project: ProjectScope::from_str(project),
                        created_at: now,
                        updated_at: now,
                        last_activated: Some(now),
                        activation_count: 1,
                    };
                    self.store.upsert_vasana(&vasana).await?;
                    result.created.push(vasana);
                }
            }
        }

        Ok(result)
    }

    /// Punish a tendency that was contradicted by a later observation
    /// (spec.md §4.9). No-op when `id` is unknown.
    pub async fn weaken(&self, id: Uuid) -> Result<()> {
        let all = self.store.list_vasanas(None).await?;
        if let Some(mut vasana) = all.into_iter().find(|v| v.id == id) {
            vasana.strength = (vasana.strength - 0.15).max(0.0);
            vasana.updated_at = Utc::now();
            self.store.upsert_vasana(&vasana).await?;
        }
        Ok(())
    }

    /// Exponential decay sweep over every vasana (all projects).
    /// Returns the number of rows deleted below the `0.01` floor
    /// (spec.md §4.9, §8 seed scenario 3).
    pub async fn decay(&self, half_life_ms: Option<i64>) -> Result<usize> {
        let half_life = half_life_ms.unwrap_or(self.config.decay_half_life_ms).max(1) as f64;
        let now = Utc::now();
        let mut deleted = 0;

        for mut vasana in self.store.list_vasanas(None).await? {
            let last_activated = vasana.last_activated.unwrap_or(now);
            let delta_ms = (now - last_activated).num_milliseconds().max(0) as f64;
            let factor = 2f64.powf(-delta_ms / half_life);
            vasana.strength *= factor;

            if vasana.strength < 0.01 {
                self.store.delete_vasana(vasana.id).await?;
                deleted += 1;
            } else {
                vasana.updated_at = now;
                self.store.upsert_vasana(&vasana).await?;
            }
        }

        Ok(deleted)
    }

    /// Promote per-name tendencies that are attested across enough
    /// distinct projects (spec.md §4.9, `promote_to_global`).
    pub async fn promote_to_global(&self) -> Result<Vec<Vasana>> {
        let all = self.store.list_vasanas(None).await?;
        let mut by_name: HashMap<String, Vec<Vasana>> = HashMap::new();
        for vasana in all {
            if vasana.project.is_global() {
                continue;
            }
            by_name.entry(vasana.name.clone()).or_default().push(vasana);
        }

        let mut promoted = Vec::new();
        for (name, rows) in by_name {
            let mut distinct_projects: std::collections::HashSet<&str> =
                std::collections::HashSet::new();
            for row in &rows {
                distinct_projects.insert(row.project.as_str());
            }
            if distinct_projects.len() < self.config.promotion_min_projects {
                continue;
            }

            let mean_strength = rows.iter().map(|v| v.strength).sum::<f64>() / rows.len() as f64;
            if mean_strength < 0.4 {
                continue;
            }

            if self.store.get_vasana(&name, ProjectScope::GLOBAL_KEY).await?.is_some() {
                continue;
            }

            let max_stability = rows.iter().map(|v| v.stability).fold(0.0_f64, f64::max);
            let valence = majority_valence(&rows);
            let mut source_samskaras = std::collections::HashSet::new();
            for row in &rows {
                source_samskaras.extend(row.source_samskaras.iter().copied());
            }
            let now = Utc::now();

            let global = Vasana {
                id: Uuid::new_v4(),
                name: name.clone(),
                description: rows[0].description.clone(),
                valence,
                strength: mean_strength,
                stability: max_stability,
                predictive_accuracy: rows.iter().map(|v| v.predictive_accuracy).sum::<f64>()
                    / rows.len() as f64,
                source_samskaras,
                reinforcement_count: rows.iter().map(|v| v.reinforcement_count).sum(),
                project: ProjectScope::Global,
                created_at: now,
                updated_at: now,
                last_activated: Some(now),
                activation_count: 0,
            };
            self.store.upsert_vasana(&global).await?;
            promoted.push(global);
        }

        Ok(promoted)
    }

    /// Union of project-scoped and global tendencies, ranked (spec.md
    /// §4.9, `get_vasanas`).
    pub async fn get_vasanas(&self, project: &str, top_k: Option<usize>) -> Result<Vec<Vasana>> {
        let mut rows = self.store.list_vasanas(Some(project)).await?;
        if project != ProjectScope::GLOBAL_KEY {
            rows.extend(self.store.list_vasanas(Some(ProjectScope::GLOBAL_KEY)).await?);
        }
        rows.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.stability.partial_cmp(&a.stability).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| a.name.cmp(&b.name))
        });
        if let Some(k) = top_k {
            rows.truncate(k);
        }
        Ok(rows)
    }
}

fn majority_valence(rows: &[Vasana]) -> Valence {
    let mut counts = HashMap::new();
    for row in rows {
        *counts.entry(valence_tag(row.valence)).or_insert(0usize) += 1;
    }
    // `max_by_key` keeps the *last* maximal element on ties, so list in
    // reverse priority: neutral > positive > negative.
    [Valence::Negative, Valence::Positive, Valence::Neutral]
        .into_iter()
        .max_by_key(|v| counts.get(&valence_tag(*v)).copied().unwrap_or(0))
        .unwrap_or(Valence::Neutral)
}

fn valence_tag(v: Valence) -> u8 {
    match v {
        Valence::Positive => 0,
        Valence::Negative => 1,
        Valence::Neutral => 2,
    }
}

/// `strength ← min(1.0, strength + (1 − strength) · 0.2)` (spec.md
/// §4.9, "Reinforcement law").
fn reinforce(strength: f64) -> f64 {
    (strength + (1.0 - strength) * 0.2).min(1.0)
}

/// `max(stability, min(1.0, observation_count / (observation_count +
/// 10)))`, minus the outer `max` which the caller applies against the
/// existing row (spec.md §4.9).
fn stability_formula(observation_count: u64) -> f64 {
    let n = observation_count as f64;
    (n / (n + 10.0)).min(1.0)
}

fn normalize_content(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn cluster_key(pattern_type: PatternType, content: &str) -> String {
    format!("{}::{}", pattern_type.as_str(), normalize_content(content))
}

/// `(normalized pattern_type, normalized pattern_content, confidence,
/// log(1+observation_count)/log(101))` projected to the scalar BOCPD
/// feeds: the textual components already define the cluster key, so
/// only the two numeric components drive the per-cluster stream.
fn feature_scalar(confidence: f64, observation_count: u64) -> f64 {
    let log_term = (1.0 + observation_count as f64).ln() / 101f64.ln();
    0.5 * confidence.clamp(0.0, 1.0) + 0.5 * log_term.clamp(0.0, 1.0)
}

fn slugify(content: &str, max_len: usize) -> String {
    let mut slug = String::new();
    let mut last_was_dash = true;
    for ch in content.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("pattern");
    }
    slug.chars().take(max_len).collect()
}

struct ClusterGroup {
    pattern_type: PatternType,
    content: String,
    ids: std::collections::HashSet<Uuid>,
    sessions: std::collections::HashSet<Uuid>,
    /// `(created_at, confidence)` ordered as pushed (store returns rows
    /// in insertion order).
    observations: Vec<(DateTime<Utc>, f64)>,
}

impl ClusterGroup {
    fn new(pattern_type: PatternType, content: String) -> Self {
        Self {
            pattern_type,
            content,
            ids: std::collections::HashSet::new(),
            sessions: std::collections::HashSet::new(),
            observations: Vec::new(),
        }
    }

    fn push(&mut self, s: &Samskara) {
        self.ids.insert(s.id);
        self.sessions.insert(s.session_id);
        self.observations.push((s.created_at, s.confidence));
    }

    fn mean_confidence(&self) -> f64 {
        if self.observations.is_empty() {
            return 0.0;
        }
        self.observations.iter().map(|(_, c)| c).sum::<f64>() / self.observations.len() as f64
    }

    /// Train/test holdout split (spec.md §4.9, "Holdout accuracy
    /// gate"). Returns `None` when fewer than 4 observations exist.
    fn holdout_accuracy(&self, train_ratio: f64) -> Option<f64> {
        if self.observations.len() < 4 {
            return None;
        }
        let mut ordered = self.observations.clone();
        ordered.sort_by_key(|(ts, _)| *ts);

        let n = ordered.len();
        let train_len = ((n as f64) * train_ratio).round().clamp(1.0, (n - 1) as f64) as usize;
        let (train, test) = ordered.split_at(train_len);
        if test.is_empty() {
            return None;
        }

        let train_mean = train.iter().map(|(_, c)| c).sum::<f64>() / train.len() as f64;
        let test_mean = test.iter().map(|(_, c)| c).sum::<f64>() / test.len() as f64;
        Some(1.0 - (train_mean - test_mean).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reinforcement_is_diminishing_and_capped() {
        let mut s = 0.0;
        for _ in 0..100 {
            s = reinforce(s);
        }
        assert!(s <= 1.0);
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn decay_seed_scenario_matches_spec() {
        // spec.md §8 seed scenario 3: strength 0.5, Δt = 2h → 0.125.
        let strength = 0.5 * 2f64.powf(-2.0);
        assert!((strength - 0.125).abs() < 1e-9);
        let strength2 = 0.5 * 2f64.powf(-5.0);
        assert!((strength2 - 0.015_625).abs() < 1e-9);
    }

    #[test]
    fn slugify_truncates_and_kebab_cases() {
        let slug = slugify("Always Run Tests Before  Pushing!!", 12);
        assert_eq!(slug, "always-run-t");
        assert!(slug.len() <= 12);
    }

    #[test]
    fn slugify_empty_content_is_nonempty() {
        assert_eq!(slugify("   ", 64), "pattern");
    }

    #[test]
    fn feature_scalar_handles_zero_confidence_and_count() {
        let f = feature_scalar(0.0, 0);
        assert!(f.is_finite());
        assert!((0.0..=1.0).contains(&f));
    }

    #[test]
    fn holdout_accuracy_requires_minimum_four_observations() {
        let mut group = ClusterGroup::new(PatternType::Preference, "x".into());
        let now = Utc::now();
        for i in 0..3 {
            group.observations.push((now, 0.5 + i as f64 * 0.01));
        }
        assert!(group.holdout_accuracy(0.7).is_none());
        group.observations.push((now, 0.6));
        assert!(group.holdout_accuracy(0.7).is_some());
    }

    fn dummy_vasana(valence: Valence) -> Vasana {
        Vasana {
            id: Uuid::new_v4(),
            name: "x".into(),
            description: String::new(),
            valence,
            strength: 0.5,
            stability: 0.5,
            predictive_accuracy: 0.5,
            source_samskaras: std::collections::HashSet::new(),
            reinforcement_count: 1,
            project: ProjectScope::Project("p".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_activated: None,
            activation_count: 0,
        }
    }

    #[test]
    fn majority_valence_breaks_two_way_tie_toward_positive_over_negative() {
        let rows = vec![dummy_vasana(Valence::Positive), dummy_vasana(Valence::Negative)];
        assert_eq!(majority_valence(&rows), Valence::Positive);
    }

    #[test]
    fn majority_valence_breaks_three_way_tie_toward_neutral() {
        let rows =
            vec![dummy_vasana(Valence::Positive), dummy_vasana(Valence::Negative), dummy_vasana(Valence::Neutral)];
        assert_eq!(majority_valence(&rows), Valence::Neutral);
    }

    #[test]
    fn majority_valence_picks_outright_winner() {
        let rows = vec![
            dummy_vasana(Valence::Positive),
            dummy_vasana(Valence::Positive),
            dummy_vasana(Valence::Negative),
        ];
        assert_eq!(majority_valence(&rows), Valence::Positive);
    }
}
