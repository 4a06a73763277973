//! Samshodhana — the hybrid search engine (spec.md §4.6). Weighted RRF
//! over BM25, vector, graph-RAG, and Pramana signals, plus a
//! multi-source agreement bonus, a Pramana epistemic boost, and a
//! Kala Chakra temporal boost.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::kala_chakra::KalaChakra;
use crate::rankers::{PramanaResolver, RankedResult, Ranker};
use crate::types::PramanaType;
use crate::weight_learner::{Signal, ThompsonWeightLearner};

use super::gate::should_retrieve;

/// Tuning knobs for one search call (spec.md §4.6 configuration list).
#[derive(Debug, Clone)]
pub struct HybridSearchConfig {
    pub k: f64,
    pub top_k: usize,
    pub enable_bm25: bool,
    pub enable_vector: bool,
    pub enable_graphrag: bool,
    pub enable_pramana: bool,
    pub pramana_weight_delta: f64,
    pub min_score: f64,
    pub project: Option<String>,
}

impl Default for HybridSearchConfig {
    fn default() -> Self {
        Self {
            k: 60.0,
            top_k: 10,
            enable_bm25: true,
            enable_vector: true,
            enable_graphrag: true,
            enable_pramana: true,
            pramana_weight_delta: 0.1,
            min_score: 0.0,
            project: None,
        }
    }
}

/// One fused, ranked hit.
#[derive(Debug, Clone)]
pub struct HybridResult {
    pub id: String,
    pub title: String,
    pub content_snippet: String,
    pub score: f64,
    pub sources: BTreeSet<&'static str>,
    pub timestamp: Option<DateTime<Utc>>,
    pub pramana_type: Option<PramanaType>,
}

#[derive(Default)]
struct Fused {
    title: String,
    snippet: String,
    score: f64,
    sources: BTreeSet<&'static str>,
    timestamp: Option<DateTime<Utc>>,
    pramana_type: Option<PramanaType>,
}

/// The hybrid search engine. Holds non-owning references to its
/// rankers, weight learner, and Kala Chakra — their lifetime must
/// outlive the engine (spec.md §3, Ownership).
pub struct HybridSearch {
    bm25: Option<Arc<dyn Ranker>>,
    vector: Option<Arc<dyn Ranker>>,
    graphrag: Option<Arc<dyn Ranker>>,
    pramana: Option<Arc<dyn Ranker>>,
    pramana_resolver: Option<Arc<dyn PramanaResolver>>,
    weight_learner: Option<Arc<Mutex<ThompsonWeightLearner>>>,
    kala_chakra: Option<KalaChakra>,
}

impl HybridSearch {
    #[must_use]
    pub fn builder() -> HybridSearchBuilder {
        HybridSearchBuilder::default()
    }

    /// `should_retrieve(query)`-gated search: returns an empty result
    /// when the gate rejects the query (spec.md §4.6).
    pub async fn gated_search(
        &self,
        query: &str,
        overrides: Option<HybridSearchConfig>,
    ) -> Vec<HybridResult> {
        if !should_retrieve(query) {
            return Vec::new();
        }
        self.search(query, overrides).await
    }

    /// Run the full fusion algorithm (spec.md §4.6, steps 1–7).
    pub async fn search(&self, query: &str, overrides: Option<HybridSearchConfig>) -> Vec<HybridResult> {
        let config = overrides.unwrap_or_default();
        let weights = self.sample_weights();

        let fetch_k = config.top_k * 2;
        let project = config.project.as_deref();

        let mut enabled: Vec<(Signal, &Arc<dyn Ranker>)> = Vec::new();
        if config.enable_bm25 {
            if let Some(r) = &self.bm25 {
                enabled.push((Signal::Bm25, r));
            }
        }
        if config.enable_vector {
            if let Some(r) = &self.vector {
                enabled.push((Signal::Vector, r));
            }
        }
        if config.enable_graphrag {
            if let Some(r) = &self.graphrag {
                enabled.push((Signal::GraphRag, r));
            }
        }
        if config.enable_pramana {
            if let Some(r) = &self.pramana {
                enabled.push((Signal::Pramana, r));
            }
        }

        let ranker_futures = enabled
            .iter()
            .map(|(signal, ranker)| {
                let ranker = Arc::clone(ranker);
                let signal = *signal;
                let query = query.to_string();
                async move { (signal, ranker.rank(&query, fetch_k, project).await) }
            })
            .collect::<Vec<_>>();
        let per_ranker = futures::future::join_all(ranker_futures).await;

        let mut fused: HashMap<String, Fused> = HashMap::new();
        for (signal, results) in per_ranker {
            if results.is_empty() {
                continue;
            }
            let w = weights[signal.index()];
            let source_tag = signal_tag(signal);
            for (rank, hit) in results.into_iter().enumerate() {
                let contribution = w / (config.k + rank as f64);
                let entry = fused.entry(hit.id.clone()).or_default();
                entry.score += contribution;
                entry.sources.insert(source_tag);
                if hit.content_snippet.len() > entry.snippet.len() {
                    entry.snippet = hit.content_snippet.clone();
                    entry.title = hit.title.clone();
                }
                if entry.timestamp.is_none() {
                    entry.timestamp = hit.timestamp;
                }
                if entry.pramana_type.is_none() {
                    entry.pramana_type = hit.pramana_type;
                }
            }
        }

        // Multi-source agreement bonus (spec.md §4.6 step 4).
        for entry in fused.values_mut() {
            if entry.sources.len() >= 3 {
                entry.score *= 1.15;
            } else if entry.sources.len() >= 2 {
                entry.score *= 1.05;
            }
        }

        // Pramana epistemic boost (spec.md §4.6 step 5).
        if config.enable_pramana {
            if let Some(resolver) = &self.pramana_resolver {
                let ids: Vec<String> = fused.keys().cloned().collect();
                let types = resolver.pramana_batch(&ids).await;
                let w_pramana = weights[Signal::Pramana.index()];
                for (id, entry) in fused.iter_mut() {
                    let pramana_type = types
                        .get(id)
                        .copied()
                        .or(entry.pramana_type)
                        .unwrap_or_else(PramanaType::default_missing);
                    entry.pramana_type.get_or_insert(pramana_type);
                    entry.score += config.pramana_weight_delta * w_pramana * pramana_type.reliability();
                }
            }
        }

        // Temporal boost (spec.md §4.6 step 6).
        if let Some(kala) = &self.kala_chakra {
            let now = Utc::now();
            for entry in fused.values_mut() {
                if let Some(ts) = entry.timestamp {
                    entry.score = kala.boost(entry.score, ts, now);
                }
            }
        }

        let mut results: Vec<HybridResult> = fused
            .into_iter()
            .map(|(id, entry)| HybridResult {
                id,
                title: entry.title,
                content_snippet: entry.snippet,
                score: entry.score,
                sources: entry.sources,
                timestamp: entry.timestamp,
                pramana_type: entry.pramana_type,
            })
            .filter(|r| r.score >= config.min_score)
            .collect();

        // Stable total order: score descending, then id ascending
        // (spec.md §4.6 "Determinism").
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(config.top_k);
        results
    }

    /// Update the weight learner for each signal that contributed to
    /// `result`; if the result carries a Pramana type, the pramana
    /// signal is also updated (spec.md §4.6, `record_feedback`).
    pub fn record_feedback(&self, result: &HybridResult, success: bool) {
        let Some(learner) = &self.weight_learner else {
            return;
        };
        let mut guard = learner.lock();
        for source in &result.sources {
            if let Some(signal) = signal_from_tag(source) {
                guard.update(signal, success);
            }
        }
        if result.pramana_type.is_some() && !result.sources.contains(signal_tag(Signal::Pramana)) {
            guard.update(Signal::Pramana, success);
        }
    }

    fn sample_weights(&self) -> [f64; 4] {
        match &self.weight_learner {
            Some(learner) => {
                let guard = learner.lock();
                let mut rng = rand::rng();
                guard.sample(&mut rng)
            }
            None => [1.0; 4],
        }
    }
}

fn signal_tag(signal: Signal) -> &'static str {
    match signal {
        Signal::Bm25 => "bm25",
        Signal::Vector => "vector",
        Signal::GraphRag => "graphrag",
        Signal::Pramana => "pramana",
    }
}

fn signal_from_tag(tag: &str) -> Option<Signal> {
    match tag {
        "bm25" => Some(Signal::Bm25),
        "vector" => Some(Signal::Vector),
        "graphrag" => Some(Signal::GraphRag),
        "pramana" => Some(Signal::Pramana),
        _ => None,
    }
}

/// Builder for `HybridSearch`, since every ranker and cross-cutting
/// dependency is optional (spec.md §7, "Missing dependency").
#[derive(Default)]
pub struct HybridSearchBuilder {
    bm25: Option<Arc<dyn Ranker>>,
    vector: Option<Arc<dyn Ranker>>,
    graphrag: Option<Arc<dyn Ranker>>,
    pramana: Option<Arc<dyn Ranker>>,
    pramana_resolver: Option<Arc<dyn PramanaResolver>>,
    weight_learner: Option<ThompsonWeightLearner>,
    kala_chakra: Option<KalaChakra>,
}

impl HybridSearchBuilder {
    #[must_use]
    pub fn bm25(mut self, ranker: Arc<dyn Ranker>) -> Self {
        self.bm25 = Some(ranker);
        self
    }

    #[must_use]
    pub fn vector(mut self, ranker: Arc<dyn Ranker>) -> Self {
        self.vector = Some(ranker);
        self
    }

    #[must_use]
    pub fn graphrag(mut self, ranker: Arc<dyn Ranker>) -> Self {
        self.graphrag = Some(ranker);
        self
    }

    #[must_use]
    pub fn pramana(mut self, ranker: Arc<dyn Ranker>) -> Self {
        self.pramana = Some(ranker);
        self
    }

    #[must_use]
    pub fn pramana_resolver(mut self, resolver: Arc<dyn PramanaResolver>) -> Self {
        self.pramana_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn weight_learner(mut self, learner: ThompsonWeightLearner) -> Self {
        self.weight_learner = Some(learner);
        self
    }

    #[must_use]
    pub fn kala_chakra(mut self, kala: KalaChakra) -> Self {
        self.kala_chakra = Some(kala);
        self
    }

    #[must_use]
    pub fn build(self) -> HybridSearch {
        HybridSearch {
            bm25: self.bm25,
            vector: self.vector,
            graphrag: self.graphrag,
            pramana: self.pramana,
            pramana_resolver: self.pramana_resolver,
            weight_learner: self.weight_learner.map(|l| Arc::new(Mutex::new(l))),
            kala_chakra: self.kala_chakra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedRanker {
        hits: Vec<RankedResult>,
    }

    #[async_trait]
    impl Ranker for FixedRanker {
        fn name(&self) -> &'static str {
            "fixed"
        }
        async fn rank(&self, _query: &str, _top_k: usize, _project: Option<&str>) -> Vec<RankedResult> {
            self.hits.clone()
        }
    }

    fn hit(id: &str, snippet: &str) -> RankedResult {
        RankedResult {
            id: id.to_string(),
            title: id.to_string(),
            content_snippet: snippet.to_string(),
            timestamp: None,
            pramana_type: None,
        }
    }

    /// Seed scenario 1 (spec.md §8): BM25 returns [A, B], vector
    /// returns [B, C], k=60, uniform weights. Expected A=1/60,
    /// B=1/60+1/61, C=1/61; B gets the 1.05 bonus; order [B, A, C].
    #[tokio::test]
    async fn seed_scenario_1_hybrid_fusion() {
        let bm25 = Arc::new(FixedRanker {
            hits: vec![hit("A", "alpha"), hit("B", "beta")],
        });
        let vector = Arc::new(FixedRanker {
            hits: vec![hit("B", "beta-vec"), hit("C", "gamma")],
        });

        let engine = HybridSearch::builder()
            .bm25(bm25 as Arc<dyn Ranker>)
            .vector(vector as Arc<dyn Ranker>)
            .build();

        let config = HybridSearchConfig {
            enable_graphrag: false,
            enable_pramana: false,
            top_k: 3,
            ..Default::default()
        };

        let results = engine.search("query", Some(config)).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "B");
        assert_eq!(results[1].id, "A");
        assert_eq!(results[2].id, "C");

        let a = results.iter().find(|r| r.id == "A").unwrap();
        assert!((a.score - 1.0 / 60.0).abs() < 1e-9);

        let c = results.iter().find(|r| r.id == "C").unwrap();
        assert!((c.score - 1.0 / 61.0).abs() < 1e-9);

        let b = results.iter().find(|r| r.id == "B").unwrap();
        let expected_b = (1.0 / 60.0 + 1.0 / 61.0) * 1.05;
        assert!((b.score - expected_b).abs() < 1e-9);
    }

    /// Seed scenario 2 (spec.md §8), re-baselined to the no-learner
    /// path: with no weight learner configured, step 1 sets
    /// `w = {1,1,1,1}` (spec.md §4.6), so the Pramana boost is
    /// `delta · w[pramana] · reliability[type]` = `0.1 · 1 · reliability`,
    /// i.e. 0.10 for `pratyaksha` (reliability 1.0) and 0.04 for
    /// `anupalabdhi` (reliability 0.4).
    #[tokio::test]
    async fn seed_scenario_2_pramana_boost() {
        struct FixedPramana(HashMap<String, PramanaType>);
        #[async_trait]
        impl PramanaResolver for FixedPramana {
            async fn pramana_batch(&self, ids: &[String]) -> HashMap<String, PramanaType> {
                ids.iter()
                    .filter_map(|id| self.0.get(id).map(|t| (id.clone(), *t)))
                    .collect()
            }
        }

        let bm25 = Arc::new(FixedRanker {
            hits: vec![hit("P1", "strong evidence"), hit("P2", "hedged claim")],
        });

        let mut types = HashMap::new();
        types.insert("P1".to_string(), PramanaType::Pratyaksha);
        types.insert("P2".to_string(), PramanaType::Anupalabdhi);

        let engine = HybridSearch::builder()
            .bm25(bm25 as Arc<dyn Ranker>)
            .pramana_resolver(Arc::new(FixedPramana(types)))
            .build();

        let config = HybridSearchConfig {
            enable_vector: false,
            enable_graphrag: false,
            enable_pramana: true,
            top_k: 2,
            ..Default::default()
        };

        let results = engine.search("q", Some(config)).await;
        let p1 = results.iter().find(|r| r.id == "P1").unwrap();
        let p2 = results.iter().find(|r| r.id == "P2").unwrap();

        let base1 = 1.0 / 60.0;
        let base2 = 1.0 / 61.0;
        assert!((p1.score - (base1 + 0.10)).abs() < 1e-9);
        assert!((p2.score - (base2 + 0.04)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn all_rankers_failing_yields_empty_not_panic() {
        struct Failing;
        #[async_trait]
        impl Ranker for Failing {
            fn name(&self) -> &'static str {
                "failing"
            }
            async fn rank(&self, _q: &str, _k: usize, _p: Option<&str>) -> Vec<RankedResult> {
                Vec::new()
            }
        }
        let engine = HybridSearch::builder()
            .bm25(Arc::new(Failing))
            .vector(Arc::new(Failing))
            .graphrag(Arc::new(Failing))
            .pramana(Arc::new(Failing))
            .build();
        let results = engine.search("anything", None).await;
        assert!(results.is_empty());
    }

    #[test]
    fn gate_blocks_non_retrieval_queries() {
        assert!(!should_retrieve("add a button"));
    }
}
