//! Periodic publish and reschedule loop
//!
//! Each cycle runs two phases:
//!
//! ```text
//! ┌──────────────────────────── cycle ─────────────────────────────┐
//! │                                                                │
//! │  publish   get_scheduled_posts(now, now + window)              │
//! │            └─▶ one task per post, semaphore-gated ─▶ Publisher │
//! │                                                                │
//! │  optimize  get_performance_metrics ─▶ SlotPlanner ─▶ table     │
//! │            get_upcoming_posts(limit)                           │
//! │            └─▶ off-slot posts ─▶ reschedule_post               │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed publish or reschedule is logged and counted, never fatal to the
//! batch. A cycle that fails outright backs off exponentially before the next
//! attempt.
//!
//! # Modules
//!
//! - [`slots`] - best-slot tables and the planner seam

pub mod slots;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::config::SchedulerConfig;
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::{PerformanceReport, ScheduledPost};
use crate::providers::{AnalyticsProvider, Publisher};
use crate::storage::ScheduleStore;
use crate::utils::retry::LoopBackoff;
use crate::utils::shutdown::Shutdown;

pub use slots::{OptimalTimeTable, SlotPlanner, StaticSlotPlanner};

/// Outcome of one publish phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    pub attempted: usize,
    pub published: usize,
    pub failed: usize,
}

/// Outcome of one optimize phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeReport {
    pub examined: usize,
    pub rescheduled: usize,
    pub failed: usize,
}

/// Outcome of one full cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub publish: PublishReport,
    pub optimize: OptimizeReport,
}

/// Publishes due posts and moves future posts onto best slots
pub struct ContentScheduler {
    store: Arc<dyn ScheduleStore>,
    publisher: Arc<dyn Publisher>,
    analytics: Arc<dyn AnalyticsProvider>,
    planner: Arc<dyn SlotPlanner>,
    config: SchedulerConfig,
    shutdown: Shutdown,
}

impl ContentScheduler {
    /// Create a scheduler using the static slot table
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        publisher: Arc<dyn Publisher>,
        analytics: Arc<dyn AnalyticsProvider>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            analytics,
            planner: Arc::new(StaticSlotPlanner::default()),
            config,
            shutdown: Shutdown::new(),
        }
    }

    /// Use a different slot planner
    #[must_use]
    pub fn with_planner(mut self, planner: Arc<dyn SlotPlanner>) -> Self {
        self.planner = planner;
        self
    }

    /// Share a stop flag with other loops
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run both phases once
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let publish = self.publish_due(now).await?;
        let optimize = self.optimize(now).await?;
        Ok(CycleReport { publish, optimize })
    }

    /// Publish every post due within the publish window
    ///
    /// Each post is attempted exactly once; at most `publish_concurrency`
    /// publishes are in flight.
    #[instrument(skip(self))]
    pub async fn publish_due(&self, now: DateTime<Utc>) -> Result<PublishReport> {
        let window_end = now + self.config.publish_window();
        let due = self
            .store
            .get_scheduled_posts(now, window_end)
            .await
            .map_err(|e| Error::persistence("get_scheduled_posts", &e))?;

        let mut report = PublishReport {
            attempted: due.len(),
            ..Default::default()
        };
        if due.is_empty() {
            return Ok(report);
        }

        let semaphore = Arc::new(Semaphore::new(self.config.publish_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for post in due {
            let publisher = Arc::clone(&self.publisher);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .context("Failed to acquire publish permit")?;
                anyhow::Ok(Self::publish_one(publisher.as_ref(), &post).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let ok = match joined {
                Ok(Ok(ok)) => ok,
                Ok(Err(e)) => {
                    warn!(error = %e, "Publish task aborted");
                    false
                }
                Err(e) => {
                    warn!(error = %e, "Publish task panicked");
                    false
                }
            };
            metrics::record_publish(ok);
            if ok {
                report.published += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            attempted = report.attempted,
            published = report.published,
            failed = report.failed,
            "Publish phase complete"
        );
        Ok(report)
    }

    async fn publish_one(publisher: &dyn Publisher, post: &ScheduledPost) -> bool {
        match publisher.publish(post).await {
            Ok(()) => {
                debug!(post_id = %post.id, platform = %post.platform, "Post published");
                true
            }
            Err(e) => {
                warn!(post_id = %post.id, platform = %post.platform, error = %e, "Publish failed");
                false
            }
        }
    }

    /// Move upcoming posts that sit off their weekday's best slots
    ///
    /// Posts on days without slots are left alone, as are posts whose target
    /// slot is already in the past relative to `now`.
    #[instrument(skip(self))]
    pub async fn optimize(&self, now: DateTime<Utc>) -> Result<OptimizeReport> {
        let report = self.performance_report().await;
        let table = self.planner.plan(&report);

        let upcoming = self
            .store
            .get_upcoming_posts(self.config.upcoming_limit)
            .await
            .map_err(|e| Error::persistence("get_upcoming_posts", &e))?;

        let mut outcome = OptimizeReport {
            examined: upcoming.len(),
            ..Default::default()
        };

        for post in &upcoming {
            let Some(target) = table.reschedule_target(post.scheduled_at) else {
                continue;
            };
            if target < now {
                debug!(post_id = %post.id, target = %target, "Best slot already passed, keeping post");
                continue;
            }

            match self.store.reschedule_post(&post.id, target).await {
                Ok(()) => {
                    debug!(post_id = %post.id, from = %post.scheduled_at, to = %target, "Post rescheduled");
                    metrics::record_reschedule(true);
                    outcome.rescheduled += 1;
                }
                Err(e) => {
                    warn!(post_id = %post.id, error = %e, "Reschedule failed");
                    metrics::record_reschedule(false);
                    outcome.failed += 1;
                }
            }
        }

        info!(
            examined = outcome.examined,
            rescheduled = outcome.rescheduled,
            failed = outcome.failed,
            "Optimize phase complete"
        );
        Ok(outcome)
    }

    async fn performance_report(&self) -> PerformanceReport {
        match self
            .analytics
            .get_performance_metrics(self.config.lookback_days)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Performance metrics unavailable, planning without them");
                metrics::record_upstream_degraded("analytics", "error");
                PerformanceReport::Null
            }
        }
    }

    /// Run cycles until [`Self::stop`] is called
    ///
    /// Failed cycles back off from `backoff_floor_secs`, doubling up to
    /// `backoff_cap_secs`; a successful cycle resets the backoff.
    pub async fn run(&self) {
        let mut backoff = LoopBackoff::new(
            Duration::from_secs(self.config.backoff_floor_secs),
            Duration::from_secs(self.config.backoff_cap_secs),
        );
        info!(interval_secs = self.config.interval_secs, "Content scheduler started");

        while !self.shutdown.is_triggered() {
            let started = Instant::now();
            let delay = match self.run_cycle(Utc::now()).await {
                Ok(_) => {
                    metrics::record_cycle("scheduler", true, started.elapsed().as_secs_f64());
                    backoff.reset();
                    self.config.interval()
                }
                Err(e) => {
                    metrics::record_cycle("scheduler", false, started.elapsed().as_secs_f64());
                    let delay = backoff.next_delay();
                    error!(error = %e, retry_in_secs = delay.as_secs(), "Scheduler cycle failed");
                    delay
                }
            };

            if self.shutdown.sleep_or_stop(delay).await {
                break;
            }
        }

        info!("Content scheduler stopped");
    }

    /// Stop the loop, interrupting any sleep
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_triggered()
    }
}
