//! Hierarchical temporal search (spec.md §4.8): a yearly→monthly→daily
//! drill that turns years of session history into a small constant
//! number of index probes per query instead of a full file scan.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::store::Store;
use crate::types::{TemporalLevel, TemporalSummary};

/// One ranked temporal result (spec.md §4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalHit {
    pub score: f64,
    pub level: TemporalLevel,
    pub period: String,
    pub snippet: String,
    /// Equal to `period` at the daily level, `None` otherwise.
    pub date: Option<String>,
    pub project: Option<String>,
}

pub struct HierarchicalTemporalSearch {
    store: Arc<dyn Store>,
}

impl HierarchicalTemporalSearch {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Drill yearly → monthly → daily, falling back to a shallower
    /// entry point when a level is empty (spec.md §4.8).
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        project: Option<&str>,
    ) -> Result<Vec<TemporalHit>> {
        let terms = query_terms(query);
        let yearly = self.rank_level(TemporalLevel::Yearly, "", 3, &terms, project).await?;

        let mut hits = Vec::new();
        if yearly.is_empty() {
            let monthly = self.rank_level(TemporalLevel::Monthly, "", 6, &terms, project).await?;
            if monthly.is_empty() {
                let daily = self.rank_level(TemporalLevel::Daily, "", limit, &terms, project).await?;
                hits.extend(daily.into_iter().map(|(s, sim)| to_hit(&s, sim)));
            } else {
                self.expand_monthly(&monthly, &terms, project, &mut hits).await?;
            }
        } else {
            for (year_summary, year_sim) in &yearly {
                hits.push(to_hit(year_summary, *year_sim));
                let monthly = self
                    .rank_level(TemporalLevel::Monthly, &year_summary.period, 3, &terms, project)
                    .await?;
                self.expand_monthly(&monthly, &terms, project, &mut hits).await?;
            }
        }

        dedup_keep_highest(&mut hits);
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn expand_monthly(
        &self,
        monthly: &[(TemporalSummary, f64)],
        terms: &[String],
        project: Option<&str>,
        hits: &mut Vec<TemporalHit>,
    ) -> Result<()> {
        for (month_summary, month_sim) in monthly {
            hits.push(to_hit(month_summary, *month_sim));
            let daily =
                self.rank_level(TemporalLevel::Daily, &month_summary.period, 5, terms, project).await?;
            hits.extend(daily.into_iter().map(|(s, sim)| to_hit(&s, sim)));
        }
        Ok(())
    }

    /// Load summaries at `level` whose period has `prefix`, score each
    /// by term overlap against `terms`, and return the top `top_k`.
    async fn rank_level(
        &self,
        level: TemporalLevel,
        prefix: &str,
        top_k: usize,
        terms: &[String],
        project: Option<&str>,
    ) -> Result<Vec<(TemporalSummary, f64)>> {
        let summaries = self.store.list_summaries(level.as_str(), prefix, project).await?;
        let mut scored: Vec<(TemporalSummary, f64)> = summaries
            .into_iter()
            .map(|s| {
                let sim = term_overlap(terms, &s.content);
                (s, sim)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

fn to_hit(summary: &TemporalSummary, similarity: f64) -> TemporalHit {
    let score = similarity * summary.level.depth_boost();
    let snippet = truncate_snippet(&summary.content, 300);
    let date = matches!(summary.level, TemporalLevel::Daily).then(|| summary.period.clone());
    TemporalHit {
        score,
        level: summary.level,
        period: summary.period.clone(),
        snippet,
        date,
        project: summary.project.clone(),
    }
}

fn dedup_keep_highest(hits: &mut Vec<TemporalHit>) {
    let mut best: HashMap<(TemporalLevel, String), usize> = HashMap::new();
    let mut kept: Vec<TemporalHit> = Vec::with_capacity(hits.len());
    for hit in hits.drain(..) {
        let key = (hit.level, hit.period.clone());
        match best.get(&key) {
            Some(&idx) if kept[idx].score >= hit.score => {}
            Some(&idx) => kept[idx] = hit,
            None => {
                best.insert(key, kept.len());
                kept.push(hit);
            }
        }
    }
    *hits = kept;
}

fn query_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .filter(|t| t.len() > 2)
        .collect()
}

fn term_overlap(terms: &[String], content: &str) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let content = content.to_lowercase();
    let hits = terms.iter().filter(|t| content.contains(t.as_str())).count();
    (hits as f64 / terms.len() as f64).min(1.0)
}

fn truncate_snippet(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_len.saturating_sub(1)).collect();
    format!("{truncated}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn summary(level: TemporalLevel, period: &str, content: &str) -> TemporalSummary {
        TemporalSummary { level, period: period.to_string(), project: None, content: content.to_string() }
    }

    #[test]
    fn seed_scenario_6_depth_boost_and_order() {
        let yearly = to_hit(&summary(TemporalLevel::Yearly, "2024", "x"), 0.9);
        let monthly = to_hit(&summary(TemporalLevel::Monthly, "2024-05", "x"), 0.6);
        let daily = to_hit(&summary(TemporalLevel::Daily, "2024-05-15", "x"), 0.7);

        assert!((yearly.score - 0.54).abs() < 1e-9);
        assert!((monthly.score - 0.48).abs() < 1e-9);
        assert!((daily.score - 0.70).abs() < 1e-9);

        let mut hits = vec![yearly, monthly, daily];
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        let periods: Vec<&str> = hits.iter().map(|h| h.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-05-15", "2024", "2024-05"]);
    }

    #[test]
    fn dedup_keeps_highest_scoring_duplicate() {
        let mut hits = vec![
            to_hit(&summary(TemporalLevel::Daily, "2024-05-15", "a"), 0.3),
            to_hit(&summary(TemporalLevel::Daily, "2024-05-15", "a"), 0.9),
        ];
        dedup_keep_highest(&mut hits);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn daily_hit_carries_its_period_as_date() {
        let hit = to_hit(&summary(TemporalLevel::Daily, "2024-05-15", "x"), 0.5);
        assert_eq!(hit.date.as_deref(), Some("2024-05-15"));
        let hit = to_hit(&summary(TemporalLevel::Yearly, "2024", "x"), 0.5);
        assert_eq!(hit.date, None);
    }

    #[test]
    fn term_overlap_is_bounded_and_handles_empty_query() {
        assert_eq!(term_overlap(&[], "anything"), 0.0);
        let terms = query_terms("the release deadline");
        let score = term_overlap(&terms, "we discussed the release deadline yesterday");
        assert!(score > 0.0 && score <= 1.0);
    }

    #[test]
    fn snippet_truncates_with_ellipsis() {
        let long = "a".repeat(400);
        let snippet = truncate_snippet(&long, 300);
        assert_eq!(snippet.chars().count(), 300);
        assert!(snippet.ends_with('…'));
    }

    #[test]
    fn empty_period_prefix_matches_top_level_search() {
        assert_eq!(term_overlap(&query_terms("x"), ""), 0.0);
        let _ = Utc::now();
    }
}
