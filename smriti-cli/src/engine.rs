//! Wires the concrete `smriti-storage` backend to every
//! `smriti-core` plug-in point and restores/persists the process-wide
//! mutable state blobs (weight learner, BOCPD) across invocations
//! (spec.md §4.3, §4.9, §9 "Global mutable state").

use std::path::Path;
use std::sync::Arc;

use smriti_core::embedder::{Embedder, MockEmbedder};
use smriti_core::rankers::{Bm25Ranker, GraphRagRanker, PramanaRanker, Ranker, VectorRanker};
use smriti_core::recall::{DayFileIndex, UnifiedRecall};
use smriti_core::search::{HybridSearch, HybridSearchConfig};
use smriti_core::store::{Store, BOCPD_CATEGORY, BOCPD_PROJECT_KEY, WEIGHT_LEARNER_CATEGORY};
use smriti_core::svapna::SvapnaConsolidator;
use smriti_core::temporal::HierarchicalTemporalSearch;
use smriti_core::tokenizer::{FallbackTokenizer, Tokenizer};
use smriti_core::types::WeightLearnerState;
use smriti_core::vasana::{VasanaConfig, VasanaEngine};
use smriti_core::weight_learner::ThompsonWeightLearner;
use smriti_storage::{LibsqlStore, MarkdownStore, SmritiHome};

use crate::config::Config;
use crate::errors::CliError;

/// Every subsystem one CLI invocation needs, assembled once at
/// startup: build the full dependency graph up front rather than
/// lazily.
pub struct Engine {
    pub store: Arc<LibsqlStore>,
    pub markdown: Arc<MarkdownStore>,
    pub hybrid: Arc<HybridSearch>,
    pub recall: Arc<UnifiedRecall>,
    pub temporal: Arc<HierarchicalTemporalSearch>,
    pub vasana: Arc<VasanaEngine>,
    pub svapna: Arc<SvapnaConsolidator>,
    pub config: Config,
    /// The weight-learner state as restored at startup. `HybridSearch`
    /// owns the live, feedback-mutated copy internally; this crate
    /// doesn't yet expose a `feedback` subcommand (out of
    /// SPEC_FULL.md's named CLI surface), so re-persisting this
    /// snapshot on exit is a faithful no-op until one is added.
    weight_learner_snapshot: ThompsonWeightLearner,
}

impl Engine {
    #[tracing::instrument(skip(config))]
    pub async fn open(config: Config) -> Result<Self, CliError> {
        let home = SmritiHome::new(config.home.clone());
        let store = Arc::new(home.open_store().await.map_err(|source| CliError::StoreOpen {
            path: home.db_path(),
            source: source.into(),
        })?);
        let markdown = Arc::new(home.markdown());

        let embedder: Option<Arc<dyn Embedder>> =
            Some(Arc::new(MockEmbedder::new(config.embedding_dimension)));

        let bm25 = Arc::new(Bm25Ranker::new(store.clone()));
        let vector = Arc::new(VectorRanker::new(store.clone(), embedder));
        let graphrag = Arc::new(GraphRagRanker::new(store.clone()));
        let pramana = Arc::new(PramanaRanker::new(store.clone()));

        let weight_learner_snapshot = restore_weight_learner(store.as_ref()).await;

        let hybrid = Arc::new(
            HybridSearch::builder()
                .bm25(bm25 as Arc<dyn Ranker>)
                .vector(vector as Arc<dyn Ranker>)
                .graphrag(graphrag as Arc<dyn Ranker>)
                .pramana(pramana as Arc<dyn Ranker>)
                .pramana_resolver(store.clone())
                .weight_learner(weight_learner_snapshot.clone())
                .kala_chakra(smriti_core::kala_chakra::KalaChakra::default())
                .build(),
        );

        let recall = Arc::new(UnifiedRecall::new(
            hybrid.clone(),
            store.clone(),
            store.clone() as Arc<dyn Store>,
            Some(markdown.clone() as Arc<dyn DayFileIndex>),
        ));

        let temporal = Arc::new(HierarchicalTemporalSearch::new(store.clone() as Arc<dyn Store>));

        let vasana = Arc::new(restore_vasana(store.clone() as Arc<dyn Store>, config.vasana).await);

        let tokenizer: Arc<dyn Tokenizer> = Arc::new(FallbackTokenizer);
        let svapna = Arc::new(SvapnaConsolidator::new(
            store.clone() as Arc<dyn Store>,
            vasana.clone(),
            tokenizer,
            config.svapna,
        ));

        Ok(Self {
            store,
            markdown,
            hybrid,
            recall,
            temporal,
            vasana,
            svapna,
            config,
            weight_learner_snapshot,
        })
    }

    /// Persist the weight-learner and BOCPD blobs back to the store.
    /// Call once before the process exits, or after any subcommand that
    /// mutates either (spec.md §9, "Global mutable state").
    pub async fn persist_state(&self) -> Result<(), CliError> {
        let bytes = serde_json::to_vec(&self.weight_learner_snapshot.serialize())
            .map_err(|source| CliError::IngestManifest { path: "<weight-learner-state>".into(), source })?;
        self.store
            .put_blob(WEIGHT_LEARNER_CATEGORY, WEIGHT_LEARNER_CATEGORY, &bytes)
            .await
            .map_err(CliError::Engine)?;

        if let Ok(bocpd) = self.vasana.persist() {
            self.store
                .put_blob(BOCPD_CATEGORY, BOCPD_PROJECT_KEY, &bocpd)
                .await
                .map_err(CliError::Engine)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn project(&self) -> Option<&str> {
        self.config.project.as_deref()
    }
}

async fn restore_weight_learner(store: &LibsqlStore) -> ThompsonWeightLearner {
    match store.get_blob(WEIGHT_LEARNER_CATEGORY, WEIGHT_LEARNER_CATEGORY).await {
        Ok(Some(bytes)) => match serde_json::from_slice::<WeightLearnerState>(&bytes) {
            Ok(state) => ThompsonWeightLearner::from_state(state),
            Err(err) => {
                tracing::warn!(error = %err, "weight learner blob unreadable, starting fresh");
                ThompsonWeightLearner::new()
            }
        },
        _ => ThompsonWeightLearner::new(),
    }
}

async fn restore_vasana(store: Arc<dyn Store>, config: VasanaConfig) -> VasanaEngine {
    match store.get_blob(BOCPD_CATEGORY, BOCPD_PROJECT_KEY).await {
        Ok(Some(bytes)) => VasanaEngine::with_persisted_state(store, config, &bytes),
        _ => VasanaEngine::new(store, config),
    }
}

/// Resolve the project under which `path` should be recorded, when the
/// user didn't pass `--project` explicitly: the basename of the
/// current working directory (spec.md §4.11's `project_basename`
/// convention, reused here for ingest).
#[must_use]
pub fn infer_project(path: Option<&Path>) -> Option<String> {
    let dir = path.map(Path::to_path_buf).or_else(|| std::env::current_dir().ok())?;
    dir.file_name().and_then(|n| n.to_str()).map(str::to_string)
}

/// Build the `HybridSearchConfig` for one search call, honoring the
/// configured project scope.
#[must_use]
pub fn hybrid_config(config: &Config, top_k: usize) -> HybridSearchConfig {
    HybridSearchConfig { top_k, project: config.project.clone(), ..config.hybrid.clone() }
}
