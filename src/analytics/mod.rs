//! Trend analytics for topic discovery

pub mod trend_analyzer;

pub use trend_analyzer::{
    compute_trend_score, next_half_hour, normalize_topics, relevance, TrendAnalyzer,
};
