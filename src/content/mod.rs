//! Content generation and best-candidate selection
//!
//! [`ContentEngine::generate`] produces one article per call.
//! [`ContentEngine::generate_best`] fans out several candidates at a higher
//! temperature, scores them with [`scoring::CandidateScore`] and keeps the
//! best one. Every provider call goes through the retry policy.

pub mod scoring;

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::ContentConfig;
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::{ContentMetadata, GeneratedContent, GenerationOptions, TrendSnapshot};
use crate::providers::GenerationProvider;
use crate::storage::ContentStore;
use crate::utils::retry::{with_retry, RetryPolicy};
use crate::utils::{normalize_whitespace, title_case};

pub use scoring::CandidateScore;

/// Temperature for single-shot generation
const SINGLE_SHOT_TEMPERATURE: f32 = 0.7;

/// Temperature for candidate fan-out
const CANDIDATE_TEMPERATURE: f32 = 0.8;

/// Score assigned when the trend snapshot carries none
const DEFAULT_SCORE: f64 = 50.0;

/// Generates, scores and persists content
pub struct ContentEngine {
    generator: Arc<dyn GenerationProvider>,
    store: Arc<dyn ContentStore>,
    retry: RetryPolicy,
}

impl ContentEngine {
    pub fn new(
        generator: Arc<dyn GenerationProvider>,
        store: Arc<dyn ContentStore>,
        config: &ContentConfig,
    ) -> Self {
        Self {
            generator,
            store,
            retry: RetryPolicy::from(config),
        }
    }

    /// Generate one article for `topic` and persist it
    ///
    /// The score is the snapshot's trend score, 50 when absent.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for a blank topic, [`Error::Generation`] once
    /// every attempt failed, [`Error::Persistence`] if saving fails.
    #[instrument(skip(self, snapshot))]
    pub async fn generate(
        &self,
        topic: &str,
        snapshot: &TrendSnapshot,
        style: &str,
        max_attempts: u32,
    ) -> Result<GeneratedContent> {
        let topic = validate_topic(topic)?;
        let policy = self.retry.clone().with_attempts(max_attempts);

        let prompt = build_prompt(topic, snapshot, &[], style);
        let body = self
            .generate_text(topic, &prompt, SINGLE_SHOT_TEMPERATURE, &policy)
            .await?;

        let content = GeneratedContent {
            id: new_content_id(),
            title: extract_title(&body).unwrap_or_else(|| fallback_title(topic)),
            body,
            metadata: ContentMetadata {
                topic: topic.to_string(),
                style: style.to_string(),
                trend: Some(snapshot.clone()),
                related: Vec::new(),
            },
            score: snapshot.trend_score.unwrap_or(DEFAULT_SCORE),
        };

        self.save(&content).await?;
        debug!(content_id = %content.id, "Single-shot content generated");
        Ok(content)
    }

    /// Generate `max(1, variants)` candidates concurrently and keep the best
    ///
    /// Failed candidates are discarded. When none survive, falls back to
    /// [`Self::generate`]. The winner's score is its composite total and it is
    /// persisted exactly once.
    #[instrument(skip(self, snapshot, related))]
    pub async fn generate_best(
        &self,
        topic: &str,
        snapshot: &TrendSnapshot,
        related: &[String],
        style: &str,
        variants: usize,
    ) -> Result<GeneratedContent> {
        let topic = validate_topic(topic)?;
        let prompt = build_prompt(topic, snapshot, related, style);
        let requested = variants.max(1);

        let outcomes = join_all(
            (0..requested)
                .map(|_| self.generate_text(topic, &prompt, CANDIDATE_TEMPERATURE, &self.retry)),
        )
        .await;

        let bodies: Vec<String> = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                Ok(body) => Some(body),
                Err(e) => {
                    warn!(topic = %topic, error = %e, "Discarding failed candidate");
                    None
                }
            })
            .collect();
        metrics::record_candidates(bodies.len(), requested - bodies.len());

        if bodies.is_empty() {
            warn!(topic = %topic, requested, "All candidates failed, falling back to single shot");
            return self
                .generate(topic, snapshot, style, self.retry.max_attempts)
                .await;
        }

        let volume = snapshot.volume.unwrap_or(0);
        let mut best: Option<(GeneratedContent, CandidateScore)> = None;
        for body in bodies {
            let title = extract_title(&body).unwrap_or_else(|| fallback_title(topic));
            let score = CandidateScore::evaluate(topic, &title, &body, volume);
            if best.as_ref().is_some_and(|(_, top)| score.total <= top.total) {
                continue;
            }
            let candidate = GeneratedContent {
                id: new_content_id(),
                title,
                body,
                metadata: ContentMetadata {
                    topic: topic.to_string(),
                    style: style.to_string(),
                    trend: Some(snapshot.clone()),
                    related: related.to_vec(),
                },
                score: score.total,
            };
            best = Some((candidate, score));
        }

        let Some((winner, breakdown)) = best else {
            return Err(Error::other("no candidate survived scoring"));
        };

        self.save(&winner).await?;
        info!(
            content_id = %winner.id,
            total = breakdown.total,
            readability = breakdown.readability,
            seo = breakdown.seo,
            engagement = breakdown.engagement,
            "Best candidate selected"
        );
        Ok(winner)
    }

    async fn generate_text(
        &self,
        topic: &str,
        prompt: &str,
        temperature: f32,
        policy: &RetryPolicy,
    ) -> Result<String> {
        let options = GenerationOptions { temperature };
        with_retry(policy, || self.generator.generate(prompt, &options))
            .await
            .map_err(|e| Error::Generation {
                topic: topic.to_string(),
                attempts: policy.max_attempts,
                reason: format!("{e:#}"),
            })
    }

    async fn save(&self, content: &GeneratedContent) -> Result<()> {
        self.store
            .save_generated(content)
            .await
            .map_err(|e| Error::persistence("save_generated", &e))
    }
}

fn validate_topic(topic: &str) -> Result<&str> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(Error::validation("topic must not be empty"));
    }
    Ok(topic)
}

fn new_content_id() -> String {
    format!("gen_{}", uuid::Uuid::new_v4())
}

/// Prompt embedding the trend metrics, `n/a` where unknown
pub fn build_prompt(topic: &str, snapshot: &TrendSnapshot, related: &[String], style: &str) -> String {
    fn or_na<T: ToString>(value: Option<T>) -> String {
        value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
    }

    let mut prompt = format!(
        "Write a {style} article about '{topic}'.\n\
         Incorporate current interest: trend_score={}, volume={}, competition={}.\n",
        or_na(snapshot.trend_score.map(|s| format!("{s:.1}"))),
        or_na(snapshot.volume),
        or_na(snapshot.competition.map(|c| format!("{c:.2}"))),
    );
    if !related.is_empty() {
        prompt.push_str(&format!("Related topics worth weaving in: {}.\n", related.join(", ")));
    }
    prompt.push_str("Use clear headings, actionable steps, and end with a concise CTA.");
    prompt
}

/// First non-empty line with markdown heading markers stripped
pub fn extract_title(text: &str) -> Option<String> {
    text.lines()
        .map(|line| normalize_whitespace(line.trim().trim_start_matches('#')))
        .find(|line| !line.is_empty())
}

/// Title used when the generated text has none
pub fn fallback_title(topic: &str) -> String {
    format!("{}: A Practical Guide", title_case(topic))
}
