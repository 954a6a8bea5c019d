//! Upstream collaborator seams
//!
//! The pipeline never talks to a concrete third-party API. Each upstream
//! capability is an async trait; applications plug in their own clients and
//! tests plug in fakes.
//!
//! All methods return `anyhow::Result` so implementations can attach whatever
//! context their transport provides. Callers decide how a failure degrades:
//! trend scoring substitutes an empty signal, generation retries, publishing
//! logs and moves on.

use async_trait::async_trait;
use anyhow::Result;

use crate::models::{
    GenerationOptions, KeywordData, PerformanceReport, ScheduledPost, SocialSignal,
};

/// Social-graph metrics for a topic
#[async_trait]
pub trait SocialSignalProvider: Send + Sync {
    async fn get_topic_metrics(&self, topic: &str) -> Result<SocialSignal>;
}

/// SEO / keyword research data for a topic
#[async_trait]
pub trait KeywordDataProvider: Send + Sync {
    async fn get_keyword_data(&self, topic: &str) -> Result<KeywordData>;
}

/// Text generation backend (LLM)
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;
}

/// Delivers a due post to its platform
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, post: &ScheduledPost) -> Result<()>;
}

/// Historical performance data for slot planning
#[async_trait]
pub trait AnalyticsProvider: Send + Sync {
    async fn get_performance_metrics(&self, lookback_days: u32) -> Result<PerformanceReport>;
}

/// Candidate topics for the growth loop, from three independent feeds
#[async_trait]
pub trait TopicSource: Send + Sync {
    async fn trending_topics(&self) -> Result<Vec<String>>;

    async fn industry_news(&self) -> Result<Vec<String>>;

    async fn competitor_content(&self) -> Result<Vec<String>>;
}
