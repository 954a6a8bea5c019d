//! Unified error handling for the growthloop crate
//!
//! Domain-specific errors (for example [`ExperimentError`]) are folded into a
//! single [`Error`] enum so that pipeline stages can propagate failures with
//! `?` while loop boundaries still get a coarse [`ErrorCategory`] to decide
//! whether to back off and retry.
//!
//! # Usage
//!
//! ```rust,ignore
//! use growthloop::error::{Error, ErrorCategory, GrowthErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(error = %err, "retrying after backoff");
//!     } else {
//!         tracing::error!(error = %err, category = ?err.category(), "rejected");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::experiment::ExperimentError;

/// Common trait for all growthloop error types
pub trait GrowthErrorTrait: std::error::Error {
    /// Check if this error is recoverable (worth retrying on the next cycle)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// An upstream provider timed out or failed
    Upstream,
    /// Invalid arguments; never retried
    Validation,
    /// Transient failure inside a scheduling or growth cycle
    Operational,
    /// The persistence collaborator rejected a read or write
    Persistence,
    /// Configuration loading and validation
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short, stable name used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upstream => "upstream",
            Self::Validation => "validation",
            Self::Operational => "operational",
            Self::Persistence => "persistence",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the growthloop crate
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid arguments passed to a pipeline operation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Experiment creation rejected its input
    #[error("Experiment error: {0}")]
    Experiment(#[from] ExperimentError),

    /// The generation provider failed on every attempt
    #[error("Generation failed for '{topic}' after {attempts} attempt(s): {reason}")]
    Generation {
        topic: String,
        attempts: u32,
        reason: String,
    },

    /// An upstream source could not be reached at all
    #[error("Upstream '{source_name}' unavailable: {reason}")]
    Upstream { source_name: String, reason: String },

    /// The persistence collaborator failed
    #[error("Persistence error during {context}: {reason}")]
    Persistence { context: String, reason: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl GrowthErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Experiment(_) => false,
            Self::Generation { .. } | Self::Upstream { .. } => true,
            Self::Persistence { .. } => true,
            Self::Io(_) => true, // I/O errors are often transient
            Self::Json(_) => false,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::Experiment(_) => ErrorCategory::Validation,
            Self::Generation { .. } | Self::Upstream { .. } => ErrorCategory::Upstream,
            Self::Persistence { .. } => ErrorCategory::Persistence,
            Self::Io(_) => ErrorCategory::Operational,
            Self::Json(_) => ErrorCategory::Other,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an upstream error for a named source
    pub fn upstream(source_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Upstream {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap a collaborator failure raised while persisting or loading state
    pub fn persistence(context: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::Persistence {
            context: context.into(),
            reason: format!("{err:#}"),
        }
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: format!("{err:#}"),
            source: Some(err.into()),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
