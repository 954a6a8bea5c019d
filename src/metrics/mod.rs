//! Prometheus metrics for the growth pipeline
//!
//! This module tracks:
//! - Cache: hits and misses
//! - Trends: topics scored, degraded upstream calls
//! - Content: candidates generated and failed
//! - Scheduler: publish outcomes, reschedules, cycle durations and failures
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! Until then (or if registration fails) every recording function is a no-op.

use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

/// Container for all pipeline metrics
struct PipelineMetrics {
    cache_lookups: CounterVec,
    topics_scored: CounterVec,
    upstream_degraded: CounterVec,
    candidates: CounterVec,
    publishes: CounterVec,
    reschedules: CounterVec,
    loop_cycles: CounterVec,
    cycle_duration: HistogramVec,
}

static PIPELINE_METRICS: OnceLock<PipelineMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; later calls are no-ops.
///
/// ```ignore
/// if let Err(e) = growthloop::metrics::init_metrics() {
///     tracing::warn!(error = %e, "metrics disabled");
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = PipelineMetrics {
        cache_lookups: register_counter_vec!(
            "growthloop_cache_lookups_total",
            "Cache lookups by result",
            &["result"]
        )?,
        topics_scored: register_counter_vec!(
            "growthloop_trend_topics_scored_total",
            "Topics scored by source of the score",
            &["source"]
        )?,
        upstream_degraded: register_counter_vec!(
            "growthloop_upstream_degraded_total",
            "Upstream calls replaced by an empty result",
            &["provider", "reason"]
        )?,
        candidates: register_counter_vec!(
            "growthloop_content_candidates_total",
            "Content candidates by outcome",
            &["outcome"]
        )?,
        publishes: register_counter_vec!(
            "growthloop_scheduler_publishes_total",
            "Publish attempts by outcome",
            &["outcome"]
        )?,
        reschedules: register_counter_vec!(
            "growthloop_scheduler_reschedules_total",
            "Reschedule requests by outcome",
            &["outcome"]
        )?,
        loop_cycles: register_counter_vec!(
            "growthloop_loop_cycles_total",
            "Loop cycles by loop and outcome",
            &["loop", "outcome"]
        )?,
        cycle_duration: register_histogram_vec!(
            "growthloop_loop_cycle_duration_seconds",
            "Time spent in one loop cycle",
            &["loop"],
            vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0]
        )?,
    };

    PIPELINE_METRICS
        .set(metrics)
        .map_err(|_| "Pipeline metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "failure"
    }
}

/// Record a cache lookup
pub fn record_cache_lookup(hit: bool) {
    if let Some(m) = PIPELINE_METRICS.get() {
        let result = if hit { "hit" } else { "miss" };
        m.cache_lookups.with_label_values(&[result]).inc();
    }
}

/// Record a scored topic; `cached` is true when the score came from the cache
pub fn record_topic_scored(cached: bool) {
    if let Some(m) = PIPELINE_METRICS.get() {
        let source = if cached { "cache" } else { "upstream" };
        m.topics_scored.with_label_values(&[source]).inc();
    }
}

/// Record an upstream call that degraded to an empty result
pub fn record_upstream_degraded(provider: &str, reason: &str) {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.upstream_degraded
            .with_label_values(&[provider, reason])
            .inc();
    }
}

/// Record generated content candidates
pub fn record_candidates(generated: usize, failed: usize) {
    let Some(m) = PIPELINE_METRICS.get() else {
        return;
    };

    if generated > 0 {
        m.candidates
            .with_label_values(&["generated"])
            .inc_by(generated as f64);
    }
    if failed > 0 {
        m.candidates
            .with_label_values(&["failed"])
            .inc_by(failed as f64);
    }
}

/// Record a publish attempt
pub fn record_publish(ok: bool) {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.publishes.with_label_values(&[outcome(ok)]).inc();
    }
}

/// Record a reschedule request
pub fn record_reschedule(ok: bool) {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.reschedules.with_label_values(&[outcome(ok)]).inc();
    }
}

/// Record the outcome and duration of one loop cycle
pub fn record_cycle(loop_name: &str, ok: bool, duration_secs: f64) {
    let Some(m) = PIPELINE_METRICS.get() else {
        return;
    };

    m.loop_cycles
        .with_label_values(&[loop_name, outcome(ok)])
        .inc();
    m.cycle_duration
        .with_label_values(&[loop_name])
        .observe(duration_secs);
}
