//! Sync passes over stored records.
//!
//! # Module Structure
//!
//! - [`types`] - Options, constants and the per-pass report
//! - [`progress`] - Progress reporting: `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`engine`] - The [`Orchestrator`] that runs passes and single-record syncs
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use reposync::sync::{Orchestrator, SyncOptions};
//!
//! let orchestrator = Orchestrator::new(client, store, reposync::fields::github_project_schema()?)
//!     .with_options(SyncOptions { batch_cap: 10, ..SyncOptions::default() });
//! let report = orchestrator.run_sync_pass().await;
//! println!("synced {} records", report.synced());
//! ```

pub mod engine;
mod progress;
mod types;

// Re-export types
pub use types::{
    EnrichmentOutcome, EnrichmentReport, PassOutcome, PassReport, RecordOutcome, SkipReason,
    SyncOptions,
};

// Re-export constants
pub use types::{
    DEFAULT_BATCH_CAP, DEFAULT_CONTRIBUTORS_PAGE_SIZE, DEFAULT_RATE_PADDING, DEFAULT_SCAN_LIMIT,
};

// Re-export progress types
pub use progress::{ProgressCallback, SyncProgress, emit};

pub use engine::Orchestrator;
