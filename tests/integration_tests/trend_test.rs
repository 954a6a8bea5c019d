//! Trend scoring integration tests

use std::sync::Arc;
use std::time::Duration;

use growthloop::analytics::TrendAnalyzer;
use growthloop::cache::FileCache;
use growthloop::config::TrendConfig;
use growthloop::models::{KeywordData, SocialSignal};
use proptest::prelude::*;
use tempfile::TempDir;

use crate::common::{FakeKeywords, FakeSocial};

fn analyzer(
    social: Arc<FakeSocial>,
    keywords: Arc<FakeKeywords>,
    dir: &TempDir,
) -> TrendAnalyzer {
    let cache = Arc::new(FileCache::new(dir.path()).unwrap());
    TrendAnalyzer::new(social, keywords, cache, &TrendConfig::default())
}

fn hot_signal() -> SocialSignal {
    SocialSignal {
        engagement: Some(1000.0),
        recency_hours: Some(0.0),
        related: vec![],
    }
}

// ============================================================================
// Scoring
// ============================================================================

#[tokio::test]
async fn test_scenario_ai_and_fastapi() {
    let dir = TempDir::new().unwrap();
    let social = Arc::new(FakeSocial::default().with("ai", hot_signal()));
    let keywords = Arc::new(FakeKeywords::default().with(
        "ai",
        KeywordData {
            search_volume: Some(2000),
            competition: Some(0.0),
            related: vec![],
        },
    ));

    let scores = analyzer(social, keywords, &dir)
        .analyze(&["ai", "AI ", "fastapi"])
        .await;

    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0].topic, "ai");
    assert!((scores[0].relevance - 0.7616).abs() < 1e-3);
    assert!((scores[0].trend_score - 83.3).abs() < 0.1);
    assert_eq!(scores[1].topic, "fastapi");
    assert!((scores[1].trend_score - 30.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_duplicates_scored_once() {
    let dir = TempDir::new().unwrap();
    let social = Arc::new(FakeSocial::default());
    let keywords = Arc::new(FakeKeywords::default());

    let scores = analyzer(social.clone(), keywords.clone(), &dir)
        .analyze(&["a", "A", " a "])
        .await;

    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].topic, "a");
    assert_eq!(social.calls(), 1);
    assert_eq!(keywords.calls(), 1);
}

#[tokio::test]
async fn test_empty_and_blank_topics() {
    let dir = TempDir::new().unwrap();
    let social = Arc::new(FakeSocial::default());
    let analyzer = analyzer(social.clone(), Arc::new(FakeKeywords::default()), &dir);

    assert!(analyzer.analyze::<&str>(&[]).await.is_empty());
    assert!(analyzer.analyze(&["", "   "]).await.is_empty());
    assert_eq!(social.calls(), 0);
}

#[tokio::test]
async fn test_ties_keep_first_seen_order() {
    let dir = TempDir::new().unwrap();
    let scores = analyzer(
        Arc::new(FakeSocial::default()),
        Arc::new(FakeKeywords::default()),
        &dir,
    )
    .analyze(&["zeta", "alpha", "mid"])
    .await;

    let topics: Vec<_> = scores.iter().map(|s| s.topic.as_str()).collect();
    assert_eq!(topics, vec!["zeta", "alpha", "mid"]);
}

#[tokio::test]
async fn test_upstream_calls_bounded_by_default_width() {
    let dir = TempDir::new().unwrap();
    let social = Arc::new(FakeSocial {
        delay: Some(Duration::from_millis(50)),
        ..Default::default()
    });
    let topics: Vec<String> = (0..20).map(|i| format!("topic-{i}")).collect();

    let scores = analyzer(social.clone(), Arc::new(FakeKeywords::default()), &dir)
        .analyze(&topics)
        .await;

    assert_eq!(scores.len(), 20);
    assert_eq!(social.calls(), 20);
    assert!(social.peak() <= TrendConfig::default().concurrency);
    assert!(social.peak() > 1);
}

#[tokio::test]
async fn test_upstream_calls_bounded_by_configured_width() {
    let dir = TempDir::new().unwrap();
    let social = Arc::new(FakeSocial {
        delay: Some(Duration::from_millis(100)),
        ..Default::default()
    });
    let config = TrendConfig {
        concurrency: 2,
        ..Default::default()
    };
    let cache = Arc::new(FileCache::new(dir.path()).unwrap());
    let analyzer = TrendAnalyzer::new(social.clone(), Arc::new(FakeKeywords::default()), cache, &config);
    let topics: Vec<String> = (0..8).map(|i| format!("topic-{i}")).collect();

    assert_eq!(analyzer.analyze(&topics).await.len(), 8);
    assert_eq!(social.peak(), 2);
}

// ============================================================================
// Caching
// ============================================================================

#[tokio::test]
async fn test_second_analysis_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let social = Arc::new(FakeSocial::default().with("rust", hot_signal()));
    let keywords = Arc::new(FakeKeywords::default());
    let analyzer = analyzer(social.clone(), keywords.clone(), &dir);

    let first = analyzer.analyze(&["rust"]).await;
    let second = analyzer.analyze(&["RUST"]).await;

    assert_eq!(first, second);
    assert_eq!(social.calls(), 1);
    assert_eq!(keywords.calls(), 1);
}

#[tokio::test]
async fn test_cache_shared_across_analyzers() {
    let dir = TempDir::new().unwrap();
    let social = Arc::new(FakeSocial::default());

    analyzer(social.clone(), Arc::new(FakeKeywords::default()), &dir)
        .analyze(&["rust"])
        .await;
    analyzer(social.clone(), Arc::new(FakeKeywords::default()), &dir)
        .analyze(&["rust"])
        .await;

    assert_eq!(social.calls(), 1);
}

// ============================================================================
// Degradation
// ============================================================================

#[tokio::test]
async fn test_failing_provider_degrades_to_defaults() {
    let dir = TempDir::new().unwrap();
    let social = Arc::new(FakeSocial::default().failing_on("rust"));
    let keywords = Arc::new(FakeKeywords {
        failing: true,
        ..Default::default()
    });

    let scores = analyzer(social, keywords, &dir).analyze(&["rust"]).await;

    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].relevance, 0.0);
    assert_eq!(scores[0].competition, 0.5);
    assert!((scores[0].trend_score - 15.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_slow_provider_times_out() {
    let dir = TempDir::new().unwrap();
    let social = Arc::new(FakeSocial {
        delay: Some(Duration::from_secs(60)),
        ..FakeSocial::default().with("rust", hot_signal())
    });
    let keywords = Arc::new(FakeKeywords::default());

    let scores = analyzer(social, keywords, &dir).analyze(&["rust"]).await;

    // Social timed out, keyword data still counted
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].relevance, 0.0);
    assert!((scores[0].trend_score - 30.0).abs() < 1e-9);
}

// ============================================================================
// Related topics
// ============================================================================

#[tokio::test]
async fn test_related_topics_union_social_first() {
    let dir = TempDir::new().unwrap();
    let social = Arc::new(FakeSocial::default().with(
        "rust",
        SocialSignal {
            related: vec!["tokio".into(), " serde ".into(), "".into()],
            ..Default::default()
        },
    ));
    let keywords = Arc::new(FakeKeywords::default().with(
        "rust",
        KeywordData {
            related: vec!["serde".into(), "axum".into()],
            ..Default::default()
        },
    ));
    let analyzer = analyzer(social.clone(), keywords, &dir);

    let related = analyzer.related_topics(" Rust ").await;
    assert_eq!(related, vec!["tokio", "serde", "axum"]);

    // Cached on the second call
    assert_eq!(analyzer.related_topics("rust").await, related);
    assert_eq!(social.calls(), 1);
}

#[tokio::test]
async fn test_related_topics_outage_not_cached() {
    let dir = TempDir::new().unwrap();
    let social = Arc::new(FakeSocial::default().failing_on("rust"));
    let keywords = Arc::new(FakeKeywords {
        failing: true,
        ..Default::default()
    });
    let analyzer = analyzer(social.clone(), keywords, &dir);

    assert!(analyzer.related_topics("rust").await.is_empty());
    assert!(analyzer.related_topics("rust").await.is_empty());
    assert_eq!(social.calls(), 2);
}

#[tokio::test]
async fn test_optimal_posting_time_is_next_half_hour() {
    use chrono::{Timelike, Utc};

    let dir = TempDir::new().unwrap();
    let analyzer = analyzer(
        Arc::new(FakeSocial::default()),
        Arc::new(FakeKeywords::default()),
        &dir,
    );

    let before = Utc::now();
    let at = analyzer.optimal_posting_time();
    assert!(at > before);
    assert!(at - before <= chrono::Duration::minutes(30));
    assert_eq!(at.second(), 0);
    assert!(at.minute() % 30 == 0);
}

// ============================================================================
// Properties
// ============================================================================

fn signal_strategy() -> impl Strategy<Value = (String, f64, f64, i64, f64)> {
    (
        "[a-cA-C ]{1,3}",
        0.0f64..5000.0,
        -10.0f64..200.0,
        -100i64..10_000,
        -0.5f64..1.5,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_analyze_sorted_unique_in_range(entries in proptest::collection::vec(signal_strategy(), 0..8)) {
        let mut social = FakeSocial::default();
        let mut keywords = FakeKeywords::default();
        for (topic, engagement, recency, volume, competition) in &entries {
            let key = topic.trim().to_lowercase();
            social.signals.insert(key.clone(), SocialSignal {
                engagement: Some(*engagement),
                recency_hours: Some(*recency),
                related: vec![],
            });
            keywords.data.insert(key, KeywordData {
                search_volume: Some(*volume),
                competition: Some(*competition),
                related: vec![],
            });
        }
        let topics: Vec<String> = entries.iter().map(|e| e.0.clone()).collect();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let dir = TempDir::new().unwrap();
        let scores = runtime.block_on(
            analyzer(Arc::new(social), Arc::new(keywords), &dir).analyze(&topics),
        );

        let mut seen = std::collections::HashSet::new();
        for pair in scores.windows(2) {
            prop_assert!(pair[0].trend_score >= pair[1].trend_score);
        }
        for score in &scores {
            prop_assert!(seen.insert(score.topic.clone()));
            prop_assert!((0.0..=1.0).contains(&score.relevance));
            prop_assert!((0.0..=1.0).contains(&score.competition));
            prop_assert!((0.0..=100.0).contains(&score.trend_score));
        }
    }
}
