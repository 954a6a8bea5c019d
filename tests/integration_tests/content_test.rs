//! Content generation integration tests

use std::sync::Arc;

use growthloop::content::ContentEngine;
use growthloop::error::Error;
use growthloop::models::TrendSnapshot;
use growthloop::storage::MemoryStore;

use crate::common::{article, fast_content_config, strings, ScriptedGenerator};

fn engine(generator: Arc<ScriptedGenerator>, store: Arc<MemoryStore>) -> ContentEngine {
    ContentEngine::new(generator, store, &fast_content_config())
}

fn snapshot(score: f64, volume: u64) -> TrendSnapshot {
    TrendSnapshot {
        trend_score: Some(score),
        volume: Some(volume),
        competition: Some(0.2),
        relevance: Some(0.5),
    }
}

// ============================================================================
// Single shot
// ============================================================================

#[tokio::test]
async fn test_generate_extracts_title_and_copies_score() {
    let generator = Arc::new(ScriptedGenerator::always("## Rust in Production\n\nBody text."));
    let store = Arc::new(MemoryStore::new());

    let content = engine(generator.clone(), store.clone())
        .generate("rust", &snapshot(72.5, 900), "casual", 3)
        .await
        .unwrap();

    assert!(content.id.starts_with("gen_"));
    assert_eq!(content.title, "Rust in Production");
    assert_eq!(content.score, 72.5);
    assert_eq!(content.metadata.topic, "rust");
    assert_eq!(content.metadata.style, "casual");
    assert_eq!(content.metadata.trend, Some(snapshot(72.5, 900)));
    assert_eq!(*generator.temperatures.lock().await, vec![0.7]);
    assert_eq!(store.contents().await, vec![content]);
}

#[tokio::test]
async fn test_generate_defaults_score_and_title() {
    let generator = Arc::new(ScriptedGenerator::always("  \n\t\n"));
    let store = Arc::new(MemoryStore::new());

    let content = engine(generator, store)
        .generate("rust tips", &TrendSnapshot::default(), "professional", 3)
        .await
        .unwrap();

    assert_eq!(content.title, "Rust Tips: A Practical Guide");
    assert_eq!(content.score, 50.0);
}

#[tokio::test]
async fn test_generate_retries_then_succeeds() {
    let generator = Arc::new(ScriptedGenerator::scripted(vec![
        Err(anyhow::anyhow!("rate limited")),
        Ok("Recovered\nbody".to_string()),
    ]));
    let store = Arc::new(MemoryStore::new());

    let content = engine(generator.clone(), store)
        .generate("rust", &TrendSnapshot::default(), "professional", 3)
        .await
        .unwrap();

    assert_eq!(content.title, "Recovered");
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn test_generate_exhausts_attempts() {
    let generator = Arc::new(ScriptedGenerator::scripted(vec![]));
    let store = Arc::new(MemoryStore::new());

    let err = engine(generator.clone(), store.clone())
        .generate("rust", &TrendSnapshot::default(), "professional", 2)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Generation { attempts: 2, .. }));
    assert_eq!(generator.calls(), 2);
    assert!(store.contents().await.is_empty());
}

#[tokio::test]
async fn test_blank_topic_rejected_without_calls() {
    let generator = Arc::new(ScriptedGenerator::always("text"));
    let engine = engine(generator.clone(), Arc::new(MemoryStore::new()));

    let err = engine
        .generate("   ", &TrendSnapshot::default(), "professional", 3)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = engine
        .generate_best("", &TrendSnapshot::default(), &[], "professional", 3)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(generator.calls(), 0);
}

// ============================================================================
// Best of N
// ============================================================================

#[tokio::test]
async fn test_generate_best_picks_highest_composite() {
    let strong = article("rust", "Why Rust? 🚀");
    let generator = Arc::new(ScriptedGenerator::scripted(vec![
        Ok("short note".to_string()),
        Ok(strong.clone()),
        Ok("Another one. Without the topic.".to_string()),
    ]));
    let store = Arc::new(MemoryStore::new());
    let related = strings(&["tokio", "serde"]);

    let best = engine(generator.clone(), store.clone())
        .generate_best("rust", &snapshot(80.0, 5000), &related, "professional", 3)
        .await
        .unwrap();

    assert_eq!(best.body, strong);
    assert_eq!(best.title, "Why Rust? 🚀");
    assert!(best.score > 0.0 && best.score <= 1.0);
    assert_eq!(best.metadata.related, related);
    assert_eq!(generator.calls(), 3);
    assert!(generator.temperatures.lock().await.iter().all(|t| *t == 0.8));

    // Only the winner is persisted
    assert_eq!(store.contents().await, vec![best]);
}

#[tokio::test]
async fn test_generate_best_tie_keeps_first_candidate() {
    // Same shape, same length, no topic mention: identical composite scores
    let generator = Arc::new(ScriptedGenerator::scripted(vec![
        Ok("Alpha\nbody text.".to_string()),
        Ok("Bravo\nbody text.".to_string()),
    ]));
    let store = Arc::new(MemoryStore::new());

    let best = engine(generator, store.clone())
        .generate_best("rust", &TrendSnapshot::default(), &[], "professional", 2)
        .await
        .unwrap();

    assert_eq!(best.title, "Alpha");
    assert_eq!(store.contents().await, vec![best]);
}

#[tokio::test]
async fn test_generate_best_discards_failed_candidates() {
    // Two candidates fail on every attempt, one succeeds first time
    let generator = Arc::new(ScriptedGenerator::scripted(vec![
        Err(anyhow::anyhow!("boom")),
        Ok("Survivor\nbody.".to_string()),
        Err(anyhow::anyhow!("boom")),
        Err(anyhow::anyhow!("boom")),
        Err(anyhow::anyhow!("boom")),
        Err(anyhow::anyhow!("boom")),
        Err(anyhow::anyhow!("boom")),
    ]));
    let store = Arc::new(MemoryStore::new());

    let best = engine(generator, store.clone())
        .generate_best("rust", &TrendSnapshot::default(), &[], "professional", 3)
        .await
        .unwrap();

    assert_eq!(best.title, "Survivor");
    assert_eq!(store.contents().await.len(), 1);
}

#[tokio::test]
async fn test_generate_best_falls_back_to_single_shot() {
    // 3 candidates x 3 attempts all fail, then the single shot succeeds
    let mut script: Vec<anyhow::Result<String>> =
        (0..9).map(|_| Err(anyhow::anyhow!("upstream down"))).collect();
    script.push(Ok("Fallback Title\nfallback body".to_string()));
    let generator = Arc::new(ScriptedGenerator::scripted(script));
    let store = Arc::new(MemoryStore::new());

    let content = engine(generator.clone(), store.clone())
        .generate_best("rust", &snapshot(64.0, 100), &strings(&["tokio"]), "professional", 3)
        .await
        .unwrap();

    assert_eq!(content.title, "Fallback Title");
    assert_eq!(content.score, 64.0);
    assert!(content.metadata.related.is_empty());
    assert_eq!(generator.calls(), 10);
    assert_eq!(*generator.temperatures.lock().await.last().unwrap(), 0.7);
    assert_eq!(store.contents().await.len(), 1);
}

#[tokio::test]
async fn test_generate_best_zero_variants_means_one() {
    let generator = Arc::new(ScriptedGenerator::always("Only\nbody."));
    let store = Arc::new(MemoryStore::new());

    engine(generator.clone(), store)
        .generate_best("rust", &TrendSnapshot::default(), &[], "professional", 0)
        .await
        .unwrap();

    assert_eq!(generator.calls(), 1);
}
