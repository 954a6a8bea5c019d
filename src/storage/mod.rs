//! Persistence collaborators
//!
//! - [`repository`] - store traits consumed by the pipeline and the in-memory store
//! - [`jsonl`] - append-only experiment log

pub mod jsonl;
pub mod repository;

pub use jsonl::JsonlExperimentStore;
pub use repository::{ContentStore, ExperimentStore, MemoryStore, ScheduleStore};
