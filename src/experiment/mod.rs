//! A/B experiment creation
//!
//! Builds a variant set for one content item and persists it as a `draft`
//! experiment. Each experiment type has its own builder:
//!
//! | Type    | Control              | Remaining variants                 | Fallback                  |
//! |---------|----------------------|------------------------------------|---------------------------|
//! | `title` | base title           | shuffled title templates           | synthetic control title   |
//! | `cta`   | base CTA             | CTA pool, in order                 | `"Learn more"` control    |
//! | `media` | base thumbnail       | `base.thumbnails`, in order        | base thumbnail or `""`    |
//!
//! An experiment always has at least one variant.

pub mod templates;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::models::{
    BaseContent, Experiment, ExperimentStatus, ExperimentType, Variant, VariantPayload,
    EXPERIMENT_METRICS,
};
use crate::storage::ExperimentStore;

pub use templates::VariantTemplates;

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 12;

/// Input rejected by experiment creation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    #[error("content_id must not be empty")]
    EmptyContentId,

    #[error("Unknown experiment type: {0}")]
    UnknownType(String),

    #[error("num_variants must be at least 1, got {0}")]
    InvalidVariantCount(usize),
}

/// Per-call experiment parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExperimentOptions {
    pub num_variants: usize,
    /// Raised to 1 when smaller
    pub duration_days: u32,
    /// Defaults to now
    pub start: Option<DateTime<Utc>>,
}

impl Default for ExperimentOptions {
    fn default() -> Self {
        Self {
            num_variants: 3,
            duration_days: 7,
            start: None,
        }
    }
}

/// `exp_` followed by 12 lowercase alphanumerics
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("exp_{suffix}")
}

fn variant(payload: VariantPayload, is_control: bool) -> Variant {
    Variant {
        id: generate_id(),
        payload,
        is_control,
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Creates and persists A/B experiments
pub struct ExperimentEngine {
    store: Arc<dyn ExperimentStore>,
    templates: VariantTemplates,
}

impl ExperimentEngine {
    pub fn new(store: Arc<dyn ExperimentStore>, templates: VariantTemplates) -> Self {
        Self { store, templates }
    }

    pub fn templates(&self) -> &VariantTemplates {
        &self.templates
    }

    /// Build, persist and return a `draft` experiment
    ///
    /// # Errors
    ///
    /// Validation errors for a blank `content_id` or `num_variants == 0`, and
    /// a persistence error if the store rejects the record.
    #[instrument(skip(self, base, options), fields(num_variants = options.num_variants))]
    pub async fn create_experiment(
        &self,
        content_id: &str,
        experiment_type: ExperimentType,
        base: &BaseContent,
        options: ExperimentOptions,
    ) -> Result<Experiment> {
        let content_id = content_id.trim();
        if content_id.is_empty() {
            return Err(ExperimentError::EmptyContentId.into());
        }
        if options.num_variants < 1 {
            return Err(ExperimentError::InvalidVariantCount(options.num_variants).into());
        }

        let variants = self.build_variants(experiment_type, base, options.num_variants);

        let experiment = Experiment {
            id: generate_id(),
            content_id: content_id.to_string(),
            experiment_type,
            variants,
            metrics: EXPERIMENT_METRICS.iter().map(|m| m.to_string()).collect(),
            start_date: options.start.unwrap_or_else(Utc::now),
            duration_days: options.duration_days.max(1),
            status: ExperimentStatus::Draft,
        };

        self.store
            .save_experiment(&experiment)
            .await
            .map_err(|e| Error::persistence("save_experiment", &e))?;

        info!(
            experiment_id = %experiment.id,
            content_id = %experiment.content_id,
            experiment_type = %experiment_type,
            variants = experiment.variants.len(),
            "Experiment created"
        );
        Ok(experiment)
    }

    /// Same as [`Self::create_experiment`] with the type given by name
    pub async fn create_experiment_by_name(
        &self,
        content_id: &str,
        experiment_type: &str,
        base: &BaseContent,
        options: ExperimentOptions,
    ) -> Result<Experiment> {
        let experiment_type: ExperimentType = experiment_type.parse()?;
        self.create_experiment(content_id, experiment_type, base, options)
            .await
    }

    /// Variant set for `experiment_type`, never empty
    pub fn build_variants(
        &self,
        experiment_type: ExperimentType,
        base: &BaseContent,
        count: usize,
    ) -> Vec<Variant> {
        match experiment_type {
            ExperimentType::Title => self.title_variants(base, count),
            ExperimentType::Cta => self.cta_variants(base, count),
            ExperimentType::Media => Self::media_variants(base, count),
        }
    }

    fn title_variants(&self, base: &BaseContent, count: usize) -> Vec<Variant> {
        let base_title = non_blank(base.title.as_ref());
        let mut variants = Vec::with_capacity(count);

        if let Some(title) = base_title {
            variants.push(variant(VariantPayload::Title(title.to_string()), true));
        }

        let topic = base_title.unwrap_or(&self.templates.placeholder_topic);
        let mut pool: Vec<&String> = self.templates.titles.iter().collect();
        pool.shuffle(&mut rand::thread_rng());

        for template in pool {
            if variants.len() >= count {
                break;
            }
            let title = VariantTemplates::render_title(template, topic);
            variants.push(variant(VariantPayload::Title(title), false));
        }

        if variants.is_empty() {
            variants.push(variant(
                VariantPayload::Title(self.templates.fallback_title.clone()),
                true,
            ));
        }
        variants
    }

    fn cta_variants(&self, base: &BaseContent, count: usize) -> Vec<Variant> {
        let mut variants = Vec::with_capacity(count);

        if let Some(cta) = non_blank(base.cta.as_ref()) {
            variants.push(variant(VariantPayload::Cta(cta.to_string()), true));
        }

        for cta in &self.templates.ctas {
            if variants.len() >= count {
                break;
            }
            variants.push(variant(VariantPayload::Cta(cta.clone()), false));
        }

        if variants.is_empty() {
            variants.push(variant(
                VariantPayload::Cta(self.templates.fallback_cta.clone()),
                true,
            ));
        }
        variants
    }

    fn media_variants(base: &BaseContent, count: usize) -> Vec<Variant> {
        let mut variants = Vec::with_capacity(count);

        if let Some(thumbnail) = non_blank(base.thumbnail.as_ref()) {
            variants.push(variant(VariantPayload::Thumbnail(thumbnail.to_string()), true));
        }

        for thumbnail in &base.thumbnails {
            if variants.len() >= count {
                break;
            }
            variants.push(variant(VariantPayload::Thumbnail(thumbnail.clone()), false));
        }

        if variants.is_empty() {
            let thumbnail = base.thumbnail.clone().unwrap_or_default();
            variants.push(variant(VariantPayload::Thumbnail(thumbnail), true));
        }
        variants
    }
}
