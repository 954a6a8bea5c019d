//! File-backed TTL cache for expensive upstream lookups
//!
//! Each entry lives in its own JSON file named after the SHA-256 digest of its
//! key. Writes go to a unique temporary file in the same directory and are then
//! renamed over the target, so a reader sees either the old entry or the new
//! one, never a partial write. Concurrent writers are last-writer-wins.
//!
//! Every backing-store failure (missing file, corrupt JSON, type mismatch, I/O
//! error) is reported as a miss; only construction can fail.
//!
//! # Example
//!
//! ```rust,ignore
//! use growthloop::cache::FileCache;
//! use std::time::Duration;
//!
//! let cache = FileCache::new("_data_cache")?;
//! cache.set("trend:rust", &score, Duration::from_secs(3600)).await;
//! let cached: Option<TrendScore> = cache.get("trend:rust").await;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::metrics;

/// On-disk representation of one cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    value: serde_json::Value,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// TTL key/value store persisted as one file per key
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Open a cache rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Directory holding the entry files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Hash a key into a file-name-safe digest
    pub fn hash_key(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::hash_key(key)))
    }

    /// Get a typed value, or `None` on miss, expiry or any decoding failure
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_json(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cached value has unexpected shape");
                None
            }
        }
    }

    /// Get the raw JSON value stored under `key`
    pub async fn get_json(&self, key: &str) -> Option<serde_json::Value> {
        let path = self.path_for(key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(key = %key, error = %e, "Failed to read cache entry");
                }
                tracing::debug!(key = %key, "Cache miss");
                metrics::record_cache_lookup(false);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Corrupt cache entry treated as miss");
                metrics::record_cache_lookup(false);
                return None;
            }
        };

        if entry.is_expired_at(Utc::now()) {
            tracing::debug!(key = %key, expired_at = %entry.expires_at, "Cache entry expired");
            self.remove_file(&path).await;
            metrics::record_cache_lookup(false);
            return None;
        }

        tracing::debug!(key = %key, "Cache hit");
        metrics::record_cache_lookup(true);
        Some(entry.value)
    }

    /// Store `value` under `key` for `ttl`. Failures are logged, not returned.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        if let Err(e) = self.try_set(key, value, ttl).await {
            tracing::warn!(key = %key, error = %e, "Failed to write cache entry");
        }
    }

    async fn try_set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let entry = CacheEntry {
            key: key.to_string(),
            value: serde_json::to_value(value).context("Failed to serialize value")?,
            expires_at,
        };
        let bytes = serde_json::to_vec(&entry).context("Failed to encode cache entry")?;

        let target = self.path_for(key);
        let tmp = self.dir.join(format!(
            "{}.{}.tmp",
            Self::hash_key(key),
            uuid::Uuid::new_v4().simple()
        ));

        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;

        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            self.remove_file(&tmp).await;
            return Err(e).with_context(|| format!("Failed to replace {}", target.display()));
        }

        Ok(())
    }

    /// Remove the entry stored under `key`, if any
    pub async fn delete(&self, key: &str) {
        self.remove_file(&self.path_for(key)).await;
    }

    /// Remove every entry and stray temporary file. Returns the number removed.
    pub async fn clear(&self) -> usize {
        let mut removed = 0;
        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
            return 0;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let is_cache_file = path
                .extension()
                .is_some_and(|ext| ext == "json" || ext == "tmp");
            if is_cache_file && tokio::fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }

        tracing::info!(dir = %self.dir.display(), removed, "Cleared cache");
        removed
    }

    async fn remove_file(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %e, "Failed to remove cache file");
            }
        }
    }
}
