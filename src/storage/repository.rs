//! Persistence seams and an in-memory implementation
//!
//! The pipeline persists three kinds of records through narrow traits:
//!
//! ```text
//! ┌──────────────────┐  ┌────────────────┐  ┌─────────────────────┐
//! │ ExperimentEngine │  │ ContentEngine  │  │ ContentScheduler /  │
//! │                  │  │                │  │ GrowthEngine        │
//! └────────┬─────────┘  └───────┬────────┘  └──────────┬──────────┘
//!          │                    │                      │
//!   ExperimentStore        ContentStore           ScheduleStore
//!          │                    │                      │
//!          └──────────┬─────────┴──────────────────────┘
//!                     │
//!        ┌────────────┴─────────────┐
//!        │ MemoryStore / JSONL / DB │
//!        └──────────────────────────┘
//! ```
//!
//! Writes either succeed or return an error; nothing here retries.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::{
    Experiment, GeneratedContent, PostStatus, ScheduleRequest, ScheduledPost,
};

// ============================================================================
// Repository Traits
// ============================================================================

/// Stores experiment records
#[async_trait]
pub trait ExperimentStore: Send + Sync {
    async fn save_experiment(&self, experiment: &Experiment) -> Result<()>;
}

/// Stores generated content
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn save_generated(&self, content: &GeneratedContent) -> Result<()>;
}

/// Reads and mutates the posting calendar
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Posts still scheduled with `start <= scheduled_at <= end`, earliest first
    async fn get_scheduled_posts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScheduledPost>>;

    /// Up to `limit` scheduled posts that are not yet due, earliest first
    async fn get_upcoming_posts(&self, limit: usize) -> Result<Vec<ScheduledPost>>;

    /// Move a post to a new time
    async fn reschedule_post(&self, post_id: &str, new_time: DateTime<Utc>) -> Result<()>;

    /// Create one scheduled post per requested platform
    async fn schedule_content(&self, request: &ScheduleRequest) -> Result<Vec<ScheduledPost>>;
}

// ============================================================================
// In-memory Implementation
// ============================================================================

/// In-memory implementation of every store trait
///
/// Useful for tests and for embedding the pipeline without a database.
#[derive(Default)]
pub struct MemoryStore {
    experiments: RwLock<Vec<Experiment>>,
    contents: RwLock<Vec<GeneratedContent>>,
    posts: RwLock<HashMap<String, ScheduledPost>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a post directly into the calendar
    pub async fn insert_post(&self, post: ScheduledPost) {
        self.posts.write().await.insert(post.id.clone(), post);
    }

    pub async fn experiments(&self) -> Vec<Experiment> {
        self.experiments.read().await.clone()
    }

    pub async fn contents(&self) -> Vec<GeneratedContent> {
        self.contents.read().await.clone()
    }

    /// All posts, earliest first
    pub async fn posts(&self) -> Vec<ScheduledPost> {
        let mut posts: Vec<_> = self.posts.read().await.values().cloned().collect();
        posts.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then(a.id.cmp(&b.id)));
        posts
    }

    pub async fn post(&self, post_id: &str) -> Option<ScheduledPost> {
        self.posts.read().await.get(post_id).cloned()
    }

    /// Clear all records
    pub async fn clear(&self) {
        self.experiments.write().await.clear();
        self.contents.write().await.clear();
        self.posts.write().await.clear();
    }

    async fn scheduled_where<F>(&self, keep: F) -> Vec<ScheduledPost>
    where
        F: Fn(&ScheduledPost) -> bool,
    {
        let mut posts: Vec<_> = self
            .posts
            .read()
            .await
            .values()
            .filter(|p| p.status == PostStatus::Scheduled && keep(*p))
            .cloned()
            .collect();
        posts.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then(a.id.cmp(&b.id)));
        posts
    }
}

#[async_trait]
impl ExperimentStore for MemoryStore {
    async fn save_experiment(&self, experiment: &Experiment) -> Result<()> {
        self.experiments.write().await.push(experiment.clone());
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn save_generated(&self, content: &GeneratedContent) -> Result<()> {
        self.contents.write().await.push(content.clone());
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn get_scheduled_posts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScheduledPost>> {
        Ok(self
            .scheduled_where(|p| p.scheduled_at >= start && p.scheduled_at <= end)
            .await)
    }

    async fn get_upcoming_posts(&self, limit: usize) -> Result<Vec<ScheduledPost>> {
        let now = Utc::now();
        let mut posts = self.scheduled_where(|p| p.scheduled_at >= now).await;
        posts.truncate(limit);
        Ok(posts)
    }

    async fn reschedule_post(&self, post_id: &str, new_time: DateTime<Utc>) -> Result<()> {
        let mut posts = self.posts.write().await;
        let post = posts
            .get_mut(post_id)
            .with_context(|| format!("Unknown post: {post_id}"))?;
        post.scheduled_at = new_time;
        Ok(())
    }

    async fn schedule_content(&self, request: &ScheduleRequest) -> Result<Vec<ScheduledPost>> {
        if request.platforms.is_empty() {
            anyhow::bail!("No platforms requested for content {}", request.content_id);
        }

        let created: Vec<ScheduledPost> = request
            .platforms
            .iter()
            .map(|platform| ScheduledPost {
                id: uuid::Uuid::new_v4().to_string(),
                scheduled_at: request.publish_at,
                platform: platform.clone(),
                status: PostStatus::Scheduled,
                content_id: Some(request.content_id.clone()),
                caption: request.caption.clone(),
            })
            .collect();

        let mut posts = self.posts.write().await;
        for post in &created {
            posts.insert(post.id.clone(), post.clone());
        }
        Ok(created)
    }
}
