//! Configuration management for the growth pipeline
//!
//! Configuration is read once at construction time. Every section has
//! defaults, can be overridden from `GROWTHLOOP_*` environment variables, or
//! loaded from a TOML file where missing sections fall back to defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::experiment::VariantTemplates;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Trend scoring configuration
    pub trends: TrendConfig,

    /// Content generation configuration
    pub content: ContentConfig,

    /// Experiment defaults and template pools
    pub experiments: ExperimentConfig,

    /// Publish/reschedule loop configuration
    pub scheduler: SchedulerConfig,

    /// Top-level growth loop configuration
    pub growth: GrowthConfig,

    /// File cache configuration
    pub cache: CacheConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TrendAnalyzer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Maximum number of in-flight upstream scoring calls
    pub concurrency: usize,

    /// Cache TTL for scores and related topics in seconds
    pub cache_ttl_secs: u64,

    /// Timeout for each provider call in milliseconds
    pub call_timeout_ms: u64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            concurrency: 6,
            cache_ttl_secs: 3600,
            call_timeout_ms: 8_000,
        }
    }
}

impl TrendConfig {
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// ContentEngine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Candidates generated per `generate_best` call
    pub variants: usize,

    /// Default writing style
    pub style: String,

    /// Generation attempts per candidate (first try included)
    pub max_attempts: u32,

    /// Base delay for exponential backoff between attempts in milliseconds
    pub backoff_base_ms: u64,

    /// Upper bound of the random jitter added to each delay in milliseconds
    pub jitter_ms: u64,

    /// Timeout for a single generation attempt in seconds
    pub attempt_timeout_secs: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            variants: 3,
            style: "professional".to_string(),
            max_attempts: 3,
            backoff_base_ms: 500,
            jitter_ms: 200,
            attempt_timeout_secs: 30,
        }
    }
}

/// ExperimentEngine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Variants requested when the caller does not say
    pub num_variants: usize,

    /// Experiment length in days
    pub duration_days: u32,

    /// Title and CTA template pools
    pub templates: VariantTemplates,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            num_variants: 3,
            duration_days: 7,
            templates: VariantTemplates::default(),
        }
    }
}

/// ContentScheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between cycles
    pub interval_secs: u64,

    /// Posts due within this many seconds from now are published
    pub publish_window_secs: u64,

    /// Maximum concurrent publish calls
    pub publish_concurrency: usize,

    /// Upcoming posts examined per optimize phase
    pub upcoming_limit: usize,

    /// Analytics lookback window in days
    pub lookback_days: u32,

    /// Initial backoff after a failed cycle in seconds
    pub backoff_floor_secs: u64,

    /// Backoff cap in seconds
    pub backoff_cap_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            publish_window_secs: 300,
            publish_concurrency: 8,
            upcoming_limit: 50,
            lookback_days: 30,
            backoff_floor_secs: 10,
            backoff_cap_secs: 300,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    #[must_use]
    pub fn publish_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.publish_window_secs).unwrap_or(i64::MAX))
    }
}

/// GrowthEngine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Seconds between growth cycles
    pub period_secs: u64,

    /// Highest-scoring topics turned into content per cycle
    pub top_n: usize,

    /// Platforms new content is scheduled on
    pub platforms: Vec<String>,

    /// Initial backoff after a failed cycle in seconds
    pub backoff_floor_secs: u64,

    /// Backoff cap in seconds
    pub backoff_cap_secs: u64,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            period_secs: 3600,
            top_n: 3,
            platforms: vec!["linkedin".to_string()],
            backoff_floor_secs: 60,
            backoff_cap_secs: 900,
        }
    }
}

impl GrowthConfig {
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

/// File cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding one JSON file per entry
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("_data_cache"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log filter directive (trace, debug, info, warn, error or a full EnvFilter)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables over the defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let trends = TrendConfig {
            concurrency: env_or("GROWTHLOOP_TREND_CONCURRENCY", defaults.trends.concurrency),
            cache_ttl_secs: env_or("GROWTHLOOP_CACHE_TTL", defaults.trends.cache_ttl_secs),
            call_timeout_ms: env_or("GROWTHLOOP_CALL_TIMEOUT_MS", defaults.trends.call_timeout_ms),
        };

        let content = ContentConfig {
            variants: env_or("GROWTHLOOP_CONTENT_VARIANTS", defaults.content.variants),
            style: std::env::var("GROWTHLOOP_CONTENT_STYLE").unwrap_or(defaults.content.style),
            max_attempts: env_or("GROWTHLOOP_RETRY_ATTEMPTS", defaults.content.max_attempts),
            backoff_base_ms: env_or("GROWTHLOOP_RETRY_BASE_MS", defaults.content.backoff_base_ms),
            ..defaults.content
        };

        let scheduler = SchedulerConfig {
            interval_secs: env_or("GROWTHLOOP_SCHEDULER_INTERVAL", defaults.scheduler.interval_secs),
            publish_window_secs: env_or(
                "GROWTHLOOP_PUBLISH_WINDOW",
                defaults.scheduler.publish_window_secs,
            ),
            publish_concurrency: env_or(
                "GROWTHLOOP_PUBLISH_CONCURRENCY",
                defaults.scheduler.publish_concurrency,
            ),
            ..defaults.scheduler
        };

        let growth = GrowthConfig {
            period_secs: env_or("GROWTHLOOP_GROWTH_PERIOD", defaults.growth.period_secs),
            top_n: env_or("GROWTHLOOP_GROWTH_TOP_N", defaults.growth.top_n),
            platforms: std::env::var("GROWTHLOOP_PLATFORMS")
                .map(|v| {
                    v.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.growth.platforms),
            ..defaults.growth
        };

        let cache = CacheConfig {
            dir: std::env::var("GROWTHLOOP_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache.dir),
        };

        let logging = LoggingConfig {
            level: std::env::var("GROWTHLOOP_LOG_LEVEL").unwrap_or(defaults.logging.level),
            format: std::env::var("GROWTHLOOP_LOG_FORMAT").unwrap_or(defaults.logging.format),
        };

        let config = Self {
            trends,
            content,
            experiments: defaults.experiments,
            scheduler,
            growth,
            cache,
            logging,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.trends.concurrency == 0 {
            anyhow::bail!("trends.concurrency must be greater than 0");
        }

        if self.trends.call_timeout_ms == 0 {
            anyhow::bail!("trends.call_timeout_ms must be greater than 0");
        }

        if self.content.max_attempts == 0 {
            anyhow::bail!("content.max_attempts must be greater than 0");
        }

        if self.content.attempt_timeout_secs == 0 {
            anyhow::bail!("content.attempt_timeout_secs must be greater than 0");
        }

        if self.experiments.num_variants == 0 {
            anyhow::bail!("experiments.num_variants must be greater than 0");
        }

        if self.experiments.templates.titles.is_empty() || self.experiments.templates.ctas.is_empty()
        {
            anyhow::bail!("experiment template pools must not be empty");
        }

        if self.scheduler.interval_secs == 0 || self.scheduler.publish_concurrency == 0 {
            anyhow::bail!("scheduler interval and publish_concurrency must be greater than 0");
        }

        if self.scheduler.backoff_floor_secs == 0
            || self.scheduler.backoff_floor_secs > self.scheduler.backoff_cap_secs
        {
            anyhow::bail!("scheduler backoff floor must be positive and not exceed the cap");
        }

        if self.growth.period_secs == 0 {
            anyhow::bail!("growth.period_secs must be greater than 0");
        }

        if self.growth.platforms.iter().all(|p| p.trim().is_empty()) {
            anyhow::bail!("growth.platforms must name at least one platform");
        }

        if self.growth.backoff_floor_secs == 0
            || self.growth.backoff_floor_secs > self.growth.backoff_cap_secs
        {
            anyhow::bail!("growth backoff floor must be positive and not exceed the cap");
        }

        Ok(())
    }
}
