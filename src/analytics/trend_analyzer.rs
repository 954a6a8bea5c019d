//! Concurrent, cache-memoized topic scoring
//!
//! Each unique topic is scored on its own task. Upstream calls are gated by a
//! semaphore and every call runs under its own timeout; a slow or failing
//! provider degrades that topic to default signals instead of failing the
//! batch.
//!
//! # Scoring
//!
//! - `relevance = clamp(tanh(engagement/1000) * exp(-max(0, recency_hours)/72), 0, 1)`
//! - `competition = clamp(competition or 0.5, 0, 1)`
//! - `volume = max(0, search_volume or 0)`
//! - `trend_score = clamp(100 * (0.4*relevance + 0.3*tanh(volume/2000) + 0.3*(1-competition)), 0, 100)`

use anyhow::Context;
use chrono::{DateTime, Duration as ChronoDuration, DurationRound, Utc};
use std::cmp::Ordering;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::cache::FileCache;
use crate::config::TrendConfig;
use crate::metrics;
use crate::models::{KeywordData, SocialSignal, TrendScore};
use crate::providers::{KeywordDataProvider, SocialSignalProvider};
use crate::utils::{clamp, dedup_preserving_order};

/// Engagement assumed when the social provider gives none
const DEFAULT_ENGAGEMENT: f64 = 0.0;

/// Content age assumed when the social provider gives none
const DEFAULT_RECENCY_HOURS: f64 = 48.0;

/// Competition assumed when the keyword provider gives none
const DEFAULT_COMPETITION: f64 = 0.5;

/// Concurrent trend scorer over two upstream signal providers
#[derive(Clone)]
pub struct TrendAnalyzer {
    social: Arc<dyn SocialSignalProvider>,
    keywords: Arc<dyn KeywordDataProvider>,
    cache: Arc<FileCache>,
    semaphore: Arc<Semaphore>,
    cache_ttl: Duration,
    call_timeout: Duration,
}

impl TrendAnalyzer {
    pub fn new(
        social: Arc<dyn SocialSignalProvider>,
        keywords: Arc<dyn KeywordDataProvider>,
        cache: Arc<FileCache>,
        config: &TrendConfig,
    ) -> Self {
        Self {
            social,
            keywords,
            cache,
            semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
            cache_ttl: config.cache_ttl(),
            call_timeout: config.call_timeout(),
        }
    }

    /// Score every unique topic, highest `trend_score` first
    ///
    /// Topics are trimmed, lower-cased and deduplicated before scoring; equal
    /// scores keep first-seen order. A topic whose task panics is dropped.
    #[instrument(skip(self, topics), fields(requested = topics.len()))]
    pub async fn analyze<S: AsRef<str>>(&self, topics: &[S]) -> Vec<TrendScore> {
        let unique = normalize_topics(topics);
        if unique.is_empty() {
            return Vec::new();
        }

        let mut tasks = JoinSet::new();
        for (index, topic) in unique.into_iter().enumerate() {
            let analyzer = self.clone();
            tasks.spawn(async move { (index, analyzer.score_topic(&topic).await) });
        }

        let mut scored = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => scored.push(entry),
                Err(e) => warn!(error = %e, "Topic scoring task failed, dropping topic"),
            }
        }

        scored.sort_by(|(ia, a), (ib, b)| {
            b.trend_score
                .partial_cmp(&a.trend_score)
                .unwrap_or(Ordering::Equal)
                .then(ia.cmp(ib))
        });

        debug!(scored = scored.len(), "Trend analysis complete");
        scored.into_iter().map(|(_, score)| score).collect()
    }

    /// Score one already-normalized topic, consulting the cache first
    async fn score_topic(&self, topic: &str) -> TrendScore {
        let cache_key = format!("trend:{topic}");
        if let Some(cached) = self.cache.get::<TrendScore>(&cache_key).await {
            debug!(topic = %topic, "Trend score served from cache");
            metrics::record_topic_scored(true);
            return cached;
        }

        let (social, keywords) = match self.fetch_signals(topic).await {
            Ok(signals) => signals,
            Err(e) => {
                warn!(topic = %topic, error = %e, "Upstream gate unavailable, using defaults");
                (None, None)
            }
        };

        let score = compute_trend_score(
            topic,
            &social.unwrap_or_default(),
            &keywords.unwrap_or_default(),
        );
        self.cache.set(&cache_key, &score, self.cache_ttl).await;
        metrics::record_topic_scored(false);
        score
    }

    /// Union of related-topic hints from both providers
    ///
    /// Social hints come first. Never fails: an outage yields an empty list,
    /// and nothing is cached unless at least one provider answered.
    #[instrument(skip(self))]
    pub async fn related_topics(&self, topic: &str) -> Vec<String> {
        let topic = topic.trim().to_lowercase();
        if topic.is_empty() {
            return Vec::new();
        }

        let cache_key = format!("related:{topic}");
        if let Some(cached) = self.cache.get::<Vec<String>>(&cache_key).await {
            return cached;
        }

        let (social, keywords) = match self.fetch_signals(&topic).await {
            Ok(signals) => signals,
            Err(e) => {
                warn!(topic = %topic, error = %e, "Upstream gate unavailable, no related topics");
                return Vec::new();
            }
        };

        if social.is_none() && keywords.is_none() {
            return Vec::new();
        }

        let related = dedup_preserving_order(
            social
                .into_iter()
                .flat_map(|s| s.related)
                .chain(keywords.into_iter().flat_map(|k| k.related)),
        );
        self.cache.set(&cache_key, &related, self.cache_ttl).await;
        related
    }

    /// Suggested publish time for new content
    ///
    /// A fixed heuristic for now; an analytics-driven model can replace it
    /// without changing callers.
    pub fn optimal_posting_time(&self) -> DateTime<Utc> {
        next_half_hour(Utc::now())
    }

    /// Run one provider call under the call timeout, degrading to `None`
    /// Both provider calls for `topic` under one semaphore permit
    async fn fetch_signals(
        &self,
        topic: &str,
    ) -> anyhow::Result<(Option<SocialSignal>, Option<KeywordData>)> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .context("Failed to acquire upstream permit")?;
        Ok(tokio::join!(
            self.guarded("social", topic, self.social.get_topic_metrics(topic)),
            self.guarded("keywords", topic, self.keywords.get_keyword_data(topic)),
        ))
    }

    async fn guarded<T, Fut>(&self, provider: &'static str, topic: &str, call: Fut) -> Option<T>
    where
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(provider, topic = %topic, error = %e, "Provider call failed, using defaults");
                metrics::record_upstream_degraded(provider, "error");
                None
            }
            Err(_) => {
                warn!(
                    provider,
                    topic = %topic,
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "Provider call timed out, using defaults"
                );
                metrics::record_upstream_degraded(provider, "timeout");
                None
            }
        }
    }
}

/// Trim, lower-case, drop empties and deduplicate keeping first-seen order
pub fn normalize_topics<S: AsRef<str>>(topics: &[S]) -> Vec<String> {
    dedup_preserving_order(topics.iter().map(|t| t.as_ref().trim().to_lowercase()))
}

/// Engagement weighted by recency decay, in `[0, 1]`
pub fn relevance(engagement: f64, recency_hours: f64) -> f64 {
    let decay = (-recency_hours.max(0.0) / 72.0).exp();
    clamp((engagement / 1000.0).tanh() * decay, 0.0, 1.0)
}

/// Blend both provider signals into a clamped [`TrendScore`]
pub fn compute_trend_score(topic: &str, social: &SocialSignal, keywords: &KeywordData) -> TrendScore {
    let relevance = relevance(
        social.engagement.unwrap_or(DEFAULT_ENGAGEMENT),
        social.recency_hours.unwrap_or(DEFAULT_RECENCY_HOURS),
    );
    let competition = clamp(keywords.competition.unwrap_or(DEFAULT_COMPETITION), 0.0, 1.0);
    let volume = keywords.search_volume.unwrap_or(0).max(0) as u64;

    let volume_norm = clamp((volume as f64 / 2000.0).tanh(), 0.0, 1.0);
    let trend_score = clamp(
        100.0 * (0.4 * relevance + 0.3 * volume_norm + 0.3 * (1.0 - competition)),
        0.0,
        100.0,
    );

    TrendScore {
        topic: topic.to_string(),
        relevance,
        volume,
        competition,
        trend_score,
    }
}

/// The next `:00` or `:30` UTC boundary strictly after `now`
pub fn next_half_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let step = ChronoDuration::minutes(30);
    match now.duration_trunc(step) {
        Ok(floor) => floor + step,
        Err(_) => now + step,
    }
}
