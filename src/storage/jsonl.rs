//! Append-only JSON-lines experiment log
//!
//! One experiment per line. Useful until experiments get a proper table.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::models::Experiment;
use crate::storage::ExperimentStore;

/// File-backed [`ExperimentStore`]
pub struct JsonlExperimentStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlExperimentStore {
    /// Create a store writing to `path`, creating parent directories
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every experiment back, skipping lines that fail to parse
    pub async fn load_all(&self) -> Result<Vec<Experiment>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(experiment) => Some(experiment),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed experiment line");
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl ExperimentStore for JsonlExperimentStore {
    async fn save_experiment(&self, experiment: &Experiment) -> Result<()> {
        let mut line = serde_json::to_string(experiment).context("Failed to encode experiment")?;
        line.push('\n');

        // Appends from concurrent callers must not interleave
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .context("Failed to append experiment")?;
        file.flush().await.context("Failed to flush experiment log")?;

        tracing::debug!(experiment_id = %experiment.id, path = %self.path.display(), "Experiment appended");
        Ok(())
    }
}
