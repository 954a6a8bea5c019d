//! Top-level growth loop
//!
//! One cycle:
//!
//! 1. Pull candidate topics from the three [`TopicSource`] feeds concurrently.
//! 2. Score them with [`TrendAnalyzer`] and keep the top `top_n`.
//! 3. For each kept topic: fetch related topics, generate the best content,
//!    open a title experiment with the content title as control, and hand a
//!    [`ScheduleRequest`] to the [`ScheduleStore`].
//!
//! A failing topic is skipped. The loop backs off when a whole cycle fails.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::analytics::TrendAnalyzer;
use crate::config::{Config, GrowthConfig};
use crate::content::ContentEngine;
use crate::error::{Error, Result};
use crate::experiment::{ExperimentEngine, ExperimentOptions};
use crate::metrics;
use crate::models::{BaseContent, ExperimentType, ScheduleRequest, TrendScore, TrendSnapshot};
use crate::providers::TopicSource;
use crate::storage::ScheduleStore;
use crate::utils::dedup_preserving_order;
use crate::utils::retry::LoopBackoff;
use crate::utils::shutdown::Shutdown;

/// Outcome of one growth cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthReport {
    /// Unique topics gathered from all sources
    pub topics_collected: usize,
    /// Topics that came back from trend scoring
    pub topics_scored: usize,
    pub content_created: usize,
    pub experiments_created: usize,
    /// Posts created by the scheduling collaborator
    pub scheduled: usize,
    /// Topics abandoned after an error
    pub failures: usize,
}

/// Per-cycle content settings taken from the wider config
#[derive(Debug, Clone)]
struct ContentPlan {
    style: String,
    variants: usize,
    experiment: ExperimentOptions,
}

/// Orchestrates topic discovery, content, experiments and scheduling
pub struct GrowthEngine {
    sources: Arc<dyn TopicSource>,
    analyzer: TrendAnalyzer,
    content: Arc<ContentEngine>,
    experiments: Arc<ExperimentEngine>,
    schedule: Arc<dyn ScheduleStore>,
    config: GrowthConfig,
    plan: ContentPlan,
    shutdown: Shutdown,
}

impl GrowthEngine {
    pub fn new(
        sources: Arc<dyn TopicSource>,
        analyzer: TrendAnalyzer,
        content: Arc<ContentEngine>,
        experiments: Arc<ExperimentEngine>,
        schedule: Arc<dyn ScheduleStore>,
        config: &Config,
    ) -> Self {
        Self {
            sources,
            analyzer,
            content,
            experiments,
            schedule,
            config: config.growth.clone(),
            plan: ContentPlan {
                style: config.content.style.clone(),
                variants: config.content.variants,
                experiment: ExperimentOptions {
                    num_variants: config.experiments.num_variants,
                    duration_days: config.experiments.duration_days,
                    start: None,
                },
            },
            shutdown: Shutdown::new(),
        }
    }

    /// Share a stop flag with other loops
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Gather deduplicated topics from every source
    ///
    /// Failing sources are skipped.
    ///
    /// # Errors
    ///
    /// [`Error::Upstream`] when all three sources fail.
    pub async fn collect_topics(&self) -> Result<Vec<String>> {
        let (trending, news, competitors) = tokio::join!(
            self.sources.trending_topics(),
            self.sources.industry_news(),
            self.sources.competitor_content(),
        );

        let mut topics = Vec::new();
        let mut failed = 0;
        for (source, outcome) in [
            ("trending", trending),
            ("industry_news", news),
            ("competitor_content", competitors),
        ] {
            match outcome {
                Ok(found) => topics.extend(found),
                Err(e) => {
                    warn!(source, error = %e, "Topic source failed, skipping");
                    metrics::record_upstream_degraded(source, "error");
                    failed += 1;
                }
            }
        }

        if failed == 3 {
            return Err(Error::upstream("topic_sources", "every topic source failed"));
        }
        Ok(dedup_preserving_order(topics))
    }

    /// Run one discovery-to-schedule pass
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<GrowthReport> {
        let topics = self.collect_topics().await?;
        let mut report = GrowthReport {
            topics_collected: topics.len(),
            ..Default::default()
        };
        if topics.is_empty() {
            info!("No topics collected this cycle");
            return Ok(report);
        }

        let scores = self.analyzer.analyze(topics.as_slice()).await;
        report.topics_scored = scores.len();

        for score in scores.iter().take(self.config.top_n) {
            if let Err(e) = self.process_topic(score, &mut report).await {
                warn!(topic = %score.topic, error = %e, "Topic processing failed, skipping");
                report.failures += 1;
            }
        }

        info!(
            topics_collected = report.topics_collected,
            topics_scored = report.topics_scored,
            content_created = report.content_created,
            experiments_created = report.experiments_created,
            scheduled = report.scheduled,
            failures = report.failures,
            "Growth cycle complete"
        );
        Ok(report)
    }

    async fn process_topic(&self, score: &TrendScore, report: &mut GrowthReport) -> Result<()> {
        let related = self.analyzer.related_topics(&score.topic).await;
        let snapshot = TrendSnapshot::from(score);

        let content = self
            .content
            .generate_best(
                &score.topic,
                &snapshot,
                &related,
                &self.plan.style,
                self.plan.variants,
            )
            .await?;
        report.content_created += 1;

        let experiment = self
            .experiments
            .create_experiment(
                &content.id,
                ExperimentType::Title,
                &BaseContent::with_title(content.title.clone()),
                self.plan.experiment,
            )
            .await?;
        report.experiments_created += 1;

        let request = ScheduleRequest {
            content_id: content.id.clone(),
            experiment_id: Some(experiment.id.clone()),
            variant_id: experiment.control().map(|v| v.id.clone()),
            publish_at: self.analyzer.optimal_posting_time(),
            platforms: self.config.platforms.clone(),
            caption: content.title.clone(),
        };
        let posts = self
            .schedule
            .schedule_content(&request)
            .await
            .map_err(|e| Error::persistence("schedule_content", &e))?;
        report.scheduled += posts.len();

        info!(
            topic = %score.topic,
            content_id = %content.id,
            experiment_id = %experiment.id,
            publish_at = %request.publish_at,
            posts = posts.len(),
            "Topic scheduled"
        );
        Ok(())
    }

    /// Run cycles until [`Self::stop`] is called
    pub async fn run(&self) {
        let mut backoff = LoopBackoff::new(
            Duration::from_secs(self.config.backoff_floor_secs),
            Duration::from_secs(self.config.backoff_cap_secs),
        );
        info!(period_secs = self.config.period_secs, "Growth engine started");

        while !self.shutdown.is_triggered() {
            let started = Instant::now();
            let delay = match self.run_cycle().await {
                Ok(_) => {
                    metrics::record_cycle("growth", true, started.elapsed().as_secs_f64());
                    backoff.reset();
                    self.config.period()
                }
                Err(e) => {
                    metrics::record_cycle("growth", false, started.elapsed().as_secs_f64());
                    let delay = backoff.next_delay();
                    error!(error = %e, retry_in_secs = delay.as_secs(), "Growth cycle failed");
                    delay
                }
            };

            if self.shutdown.sleep_or_stop(delay).await {
                break;
            }
        }

        info!("Growth engine stopped");
    }

    /// Stop the loop, interrupting any sleep
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_triggered()
    }
}
