//! Error scenario integration tests
//!
//! Persistence failures, corrupt cache state and rejected input.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use growthloop::analytics::TrendAnalyzer;
use growthloop::cache::FileCache;
use growthloop::config::TrendConfig;
use growthloop::content::ContentEngine;
use growthloop::error::{Error, ErrorCategory, GrowthErrorTrait};
use growthloop::experiment::{ExperimentEngine, ExperimentError, ExperimentOptions, VariantTemplates};
use growthloop::growth::GrowthEngine;
use growthloop::models::{
    BaseContent, Experiment, ExperimentType, GeneratedContent, ScheduleRequest, ScheduledPost,
    TrendSnapshot,
};
use growthloop::storage::{ContentStore, ExperimentStore, MemoryStore, ScheduleStore};
use tempfile::TempDir;

use crate::common::{fast_content_config, strings, test_config, FakeKeywords, FakeSocial, FakeTopics, ScriptedGenerator};

/// Store whose writes can be switched to fail per record kind
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_content: bool,
    fail_experiments: bool,
    fail_schedule: bool,
    schedule_calls: AtomicUsize,
}

#[async_trait]
impl ContentStore for FlakyStore {
    async fn save_generated(&self, content: &GeneratedContent) -> Result<()> {
        if self.fail_content {
            anyhow::bail!("content table locked");
        }
        self.inner.save_generated(content).await
    }
}

#[async_trait]
impl ExperimentStore for FlakyStore {
    async fn save_experiment(&self, experiment: &Experiment) -> Result<()> {
        if self.fail_experiments {
            anyhow::bail!("experiments table locked");
        }
        self.inner.save_experiment(experiment).await
    }
}

#[async_trait]
impl ScheduleStore for FlakyStore {
    async fn get_scheduled_posts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScheduledPost>> {
        self.inner.get_scheduled_posts(start, end).await
    }

    async fn get_upcoming_posts(&self, limit: usize) -> Result<Vec<ScheduledPost>> {
        self.inner.get_upcoming_posts(limit).await
    }

    async fn reschedule_post(&self, post_id: &str, new_time: DateTime<Utc>) -> Result<()> {
        self.inner.reschedule_post(post_id, new_time).await
    }

    async fn schedule_content(&self, request: &ScheduleRequest) -> Result<Vec<ScheduledPost>> {
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_schedule {
            anyhow::bail!("calendar unavailable");
        }
        self.inner.schedule_content(request).await
    }
}

// ============================================================================
// Persistence failures
// ============================================================================

#[tokio::test]
async fn test_content_store_failure_surfaces_as_persistence() {
    let store = Arc::new(FlakyStore {
        fail_content: true,
        ..Default::default()
    });
    let engine = ContentEngine::new(
        Arc::new(ScriptedGenerator::always("Title\nbody")),
        store,
        &fast_content_config(),
    );

    let err = engine
        .generate("rust", &TrendSnapshot::default(), "professional", 3)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Persistence { ref context, .. } if context == "save_generated"));
    assert_eq!(err.category(), ErrorCategory::Persistence);
    assert!(err.is_recoverable());
    assert!(err.to_string().contains("content table locked"));
}

#[tokio::test]
async fn test_experiment_store_failure_surfaces_as_persistence() {
    let store = Arc::new(FlakyStore {
        fail_experiments: true,
        ..Default::default()
    });
    let engine = ExperimentEngine::new(store.clone(), VariantTemplates::default());

    let err = engine
        .create_experiment(
            "gen_1",
            ExperimentType::Title,
            &BaseContent::with_title("Hello"),
            ExperimentOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Persistence { .. }));
    assert!(store.inner.experiments().await.is_empty());
}

#[tokio::test]
async fn test_schedule_failure_counts_topic_as_failed() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let store = Arc::new(FlakyStore {
        fail_schedule: true,
        ..Default::default()
    });
    let topics = FakeTopics {
        trending: Some(strings(&["rust", "go"])),
        news: Some(vec![]),
        competitors: Some(vec![]),
        ..Default::default()
    };

    let cache = Arc::new(FileCache::new(&config.cache.dir).unwrap());
    let analyzer = TrendAnalyzer::new(
        Arc::new(FakeSocial::default()),
        Arc::new(FakeKeywords::default()),
        cache,
        &config.trends,
    );
    let engine = GrowthEngine::new(
        Arc::new(topics),
        analyzer,
        Arc::new(ContentEngine::new(
            Arc::new(ScriptedGenerator::always("Title\nbody.")),
            store.clone(),
            &config.content,
        )),
        Arc::new(ExperimentEngine::new(
            store.clone(),
            config.experiments.templates.clone(),
        )),
        store.clone(),
        &config,
    );

    let report = engine.run_cycle().await.unwrap();

    // Content and experiments were created before the calendar write failed
    assert_eq!(report.content_created, 2);
    assert_eq!(report.experiments_created, 2);
    assert_eq!(report.scheduled, 0);
    assert_eq!(report.failures, 2);
    assert_eq!(store.schedule_calls.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Cache damage
// ============================================================================

#[tokio::test]
async fn test_corrupt_cache_entry_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(FileCache::new(dir.path()).unwrap());
    let entry = dir
        .path()
        .join(format!("{}.json", FileCache::hash_key("trend:rust")));
    std::fs::write(&entry, b"{not json").unwrap();

    let social = Arc::new(FakeSocial::default());
    let analyzer = TrendAnalyzer::new(
        social.clone(),
        Arc::new(FakeKeywords::default()),
        cache.clone(),
        &TrendConfig::default(),
    );

    let scores = analyzer.analyze(&["rust"]).await;
    assert_eq!(scores.len(), 1);
    assert_eq!(social.calls(), 1);

    // The fresh score replaced the damaged entry
    assert!(cache.get_json("trend:rust").await.is_some());
}

#[tokio::test]
async fn test_wrong_shape_cache_entry_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(FileCache::new(dir.path()).unwrap());
    cache
        .set("trend:rust", &"not a score", std::time::Duration::from_secs(60))
        .await;

    let social = Arc::new(FakeSocial::default());
    let analyzer = TrendAnalyzer::new(
        social.clone(),
        Arc::new(FakeKeywords::default()),
        cache,
        &TrendConfig::default(),
    );

    assert_eq!(analyzer.analyze(&["rust"]).await.len(), 1);
    assert_eq!(social.calls(), 1);
}

// ============================================================================
// Rejected input
// ============================================================================

#[tokio::test]
async fn test_experiment_input_errors_are_not_recoverable() {
    let store = Arc::new(MemoryStore::new());
    let engine = ExperimentEngine::new(store.clone(), VariantTemplates::default());
    let base = BaseContent::with_title("Hello");

    let err = engine
        .create_experiment("  ", ExperimentType::Cta, &base, ExperimentOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Experiment(ExperimentError::EmptyContentId)));
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert!(!err.is_recoverable());

    let err = engine
        .create_experiment(
            "gen_1",
            ExperimentType::Cta,
            &base,
            ExperimentOptions {
                num_variants: 0,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Experiment(ExperimentError::InvalidVariantCount(0))));

    let err = engine
        .create_experiment_by_name("gen_1", "layout", &base, ExperimentOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Experiment(ExperimentError::UnknownType(ref t)) if t == "layout"));

    assert!(store.experiments().await.is_empty());
}
