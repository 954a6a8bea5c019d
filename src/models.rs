// Core data structures for the growth pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::experiment::ExperimentError;

/// Metrics tracked by every experiment, in reporting order
pub const EXPERIMENT_METRICS: [&str; 3] = ["ctr", "engagement", "conversion"];

/// Composite trend metric for a single normalized topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendScore {
    pub topic: String,
    /// Engagement weighted by recency, 0.0 to 1.0
    pub relevance: f64,
    pub volume: u64,
    /// Keyword competition, 0.0 to 1.0
    pub competition: f64,
    /// Blended score, 0.0 to 100.0
    pub trend_score: f64,
}

/// Trend metrics embedded into prompts and content metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub trend_score: Option<f64>,
    pub volume: Option<u64>,
    pub competition: Option<f64>,
    pub relevance: Option<f64>,
}

impl From<&TrendScore> for TrendSnapshot {
    fn from(score: &TrendScore) -> Self {
        Self {
            trend_score: Some(score.trend_score),
            volume: Some(score.volume),
            competition: Some(score.competition),
            relevance: Some(score.relevance),
        }
    }
}

/// Provenance of a generated piece of content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub topic: String,
    pub style: String,
    #[serde(default)]
    pub trend: Option<TrendSnapshot>,
    #[serde(default)]
    pub related: Vec<String>,
}

/// A scored piece of generated content. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub id: String,
    pub title: String,
    pub body: String,
    pub metadata: ContentMetadata,
    pub score: f64,
}

/// Kind of A/B experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentType {
    Title,
    Cta,
    Media,
}

impl ExperimentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Cta => "cta",
            Self::Media => "media",
        }
    }
}

impl fmt::Display for ExperimentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperimentType {
    type Err = ExperimentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "cta" => Ok(Self::Cta),
            "media" => Ok(Self::Media),
            _ => Err(ExperimentError::UnknownType(s.to_string())),
        }
    }
}

/// Lifecycle state of an experiment. Transitions past `Draft` are owned by
/// whoever runs the experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Completed,
}

/// The field a variant overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantPayload {
    Title(String),
    Cta(String),
    Thumbnail(String),
}

impl VariantPayload {
    /// The rendered value regardless of which field it targets
    pub fn value(&self) -> &str {
        match self {
            Self::Title(v) | Self::Cta(v) | Self::Thumbnail(v) => v,
        }
    }
}

/// One alternative rendering under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    #[serde(flatten)]
    pub payload: VariantPayload,
    pub is_control: bool,
}

/// An A/B experiment over one content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub content_id: String,
    pub experiment_type: ExperimentType,
    pub variants: Vec<Variant>,
    pub metrics: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub duration_days: u32,
    pub status: ExperimentStatus,
}

impl Experiment {
    /// The control variant, if the source content provided a baseline
    pub fn control(&self) -> Option<&Variant> {
        self.variants.iter().find(|v| v.is_control)
    }
}

/// Source content an experiment's variants are derived from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseContent {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub cta: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub thumbnails: Vec<String>,
}

impl BaseContent {
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}

/// Publication state of a scheduled post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Scheduled,
    Published,
    Failed,
    Cancelled,
}

/// A post owned by the persistence layer. The scheduler only reads `id` and
/// `scheduled_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub id: String,
    pub scheduled_at: DateTime<Utc>,
    pub platform: String,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub content_id: Option<String>,
    #[serde(default)]
    pub caption: String,
}

/// Hand-off from the growth loop to the scheduling collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub content_id: String,
    pub experiment_id: Option<String>,
    pub variant_id: Option<String>,
    pub publish_at: DateTime<Utc>,
    pub platforms: Vec<String>,
    pub caption: String,
}

/// Social signal for a topic. Missing fields fall back to scoring defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialSignal {
    #[serde(default)]
    pub engagement: Option<f64>,
    #[serde(default)]
    pub recency_hours: Option<f64>,
    #[serde(default)]
    pub related: Vec<String>,
}

/// Keyword data for a topic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordData {
    #[serde(default)]
    pub search_volume: Option<i64>,
    #[serde(default)]
    pub competition: Option<f64>,
    #[serde(default)]
    pub related: Vec<String>,
}

/// Opaque analytics report consumed by slot planners
pub type PerformanceReport = serde_json::Value;

/// Options forwarded to the generation provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self { temperature: 0.7 }
    }
}
