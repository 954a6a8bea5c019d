//! Integration tests module
//!
//! End-to-end tests for the growth pipeline, including:
//! - Concurrent, cached trend scoring
//! - Candidate generation, scoring and fallback
//! - Topic discovery through scheduling hand-off
//! - Upstream outages and persistence failures

pub mod content_test;
pub mod error_scenarios;
pub mod trend_test;
