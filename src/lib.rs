//! growthloop - social-media growth automation pipeline
//!
//! Discovers trending topics, generates and A/B-tests content, and publishes
//! posts at good times.
//!
//! # Architecture
//!
//! The library is organized leaf to root:
//!
//! - [`cache`] - TTL file cache memoizing expensive lookups
//! - [`analytics`] - concurrent, cache-backed trend scoring
//! - [`content`] - multi-candidate generation and heuristic scoring
//! - [`experiment`] - A/B variant sets for titles, CTAs and media
//! - [`scheduler`] - periodic publish and reschedule loop
//! - [`growth`] - top-level orchestration loop
//! - [`providers`] / [`storage`] - collaborator seams and reference stores
//! - [`config`], [`error`], [`metrics`], [`utils`] - ambient plumbing
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use growthloop::prelude::*;
//!
//! # async fn example(
//! #     social: Arc<dyn growthloop::providers::SocialSignalProvider>,
//! #     keywords: Arc<dyn growthloop::providers::KeywordDataProvider>,
//! # ) -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let cache = Arc::new(FileCache::new(&config.cache.dir)?);
//! let analyzer = TrendAnalyzer::new(social, keywords, cache, &config.trends);
//!
//! for score in analyzer.analyze(&["rust", "AI "]).await {
//!     println!("{} {:.1}", score.topic, score.trend_score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analytics;
pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod experiment;
pub mod growth;
pub mod metrics;
pub mod models;
pub mod providers;
pub mod scheduler;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::analytics::TrendAnalyzer;
    pub use crate::cache::FileCache;
    pub use crate::config::Config;
    pub use crate::content::ContentEngine;
    pub use crate::error::{Error, ErrorCategory, GrowthErrorTrait, Result};
    pub use crate::experiment::{ExperimentEngine, ExperimentOptions, VariantTemplates};
    pub use crate::growth::{GrowthEngine, GrowthReport};
    pub use crate::models::{
        BaseContent, Experiment, ExperimentType, GeneratedContent, ScheduledPost, TrendScore,
        TrendSnapshot,
    };
    pub use crate::scheduler::{ContentScheduler, OptimizeReport, PublishReport};
    pub use crate::storage::MemoryStore;
    pub use crate::utils::shutdown::Shutdown;
}

// Direct re-exports for convenience
pub use models::{GeneratedContent, TrendScore};
