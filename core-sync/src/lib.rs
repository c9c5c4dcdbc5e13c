//! # Core Sync
//!
//! Update-set synchronization pipeline: turns a remote application's file
//! records into a committed git tree.
//!
//! ## Architecture
//!
//! - [`run`] - Sync run entity and its validated state machine
//! - [`config`] - Per-run configuration loaded from the run store
//! - [`collaborators`] - Contracts for the run store, progress reporter,
//!   pull-request checker and project store
//! - [`batch`] - Grouping of application-file descriptors into class batches
//! - [`fetcher`] - Filtered, paginated record fetching per class batch
//! - [`materializer`] - Provenance resolution and record persistence
//! - [`orchestrator`] - The guarded workflow driving one run end to end
//!
//! The pipeline is platform-agnostic: remote access, git and persistence all
//! arrive as `Arc<dyn Trait>` collaborators, so hosts wire in their own
//! implementations and tests substitute mocks.

pub mod batch;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod materializer;
pub mod orchestrator;
pub mod run;

pub use batch::{ClassBatchGrouper, ClassBatches, FileDescriptor};
pub use collaborators::{
    Entity, EntityRequestParam, ProgressReporter, ProjectStore, PullRequestChecker, RunProgress,
    RunStore,
};
pub use config::{AppTarget, GitTarget, SyncConfig};
pub use error::{Result, SyncError};
pub use fetcher::RemoteRecordFetcher;
pub use materializer::{display_or_value, machine_value, Provenance, RecordMaterializer};
pub use orchestrator::{OrchestratorConfig, SyncOrchestrator, SyncOutcome};
pub use run::{SyncRun, SyncRunId, SyncRunState, SyncRunStats};
