//! Collaborator contracts consumed by the orchestrator.
//!
//! These traits mirror the external systems around the pipeline: the run
//! store that hands out configuration, the progress reporter the job layer
//! watches, the pull-request checker on the git host, and the project store
//! that owns entity registration and file persistence. Only their contracts
//! live here; implementations belong to the host.

use async_trait::async_trait;
use bridge_traits::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::config::SyncConfig;
use crate::run::SyncRunId;

/// Progress states reported to the run store's observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunProgress {
    InProgress,
    Skipped,
    Completed,
    Failed { step: String, message: String },
}

/// Source of run configuration.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Look up the configuration for a run. `None` means the run does not
    /// exist (the orchestrator surfaces that as `RunNotFound`).
    async fn get(&self, run_id: SyncRunId) -> Result<Option<SyncConfig>>;
}

/// Sink for run progress updates.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn set_progress(&self, config: &SyncConfig, state: RunProgress) -> Result<()>;
}

/// Queries the git host for in-flight change proposals.
#[async_trait]
pub trait PullRequestChecker: Send + Sync {
    /// Whether a pull request from `from_branch` is pending on `repo_name`.
    async fn pending_pull_request(
        &self,
        config: &SyncConfig,
        repo_name: &str,
        from_branch: &str,
    ) -> Result<bool>;
}

/// Per-class request shape registered with the project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRequestParam {
    /// Table the class's records live in
    pub class_name: String,
    /// Fields the entity's queries are built over
    pub query_field_names: Vec<String>,
    /// Fields to request; empty means all fields
    pub field_names: Vec<String>,
}

/// A class's registered entity: its pre-registered base query, already split
/// into alternative (disjunct) segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub query_segments: Vec<String>,
}

/// Project collaborator owning entity registration and record persistence.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Root of the generated project's code tree.
    fn code_directory(&self) -> PathBuf;

    /// Request shape for a class.
    async fn get_entity_request_param(&self, class_name: &str) -> Result<EntityRequestParam>;

    /// The class's registered entity, if one exists.
    async fn get_entity(&self, class_name: &str) -> Result<Option<Entity>>;

    /// Persist one record, returning the paths actually written or changed.
    async fn save(&self, record: &Value) -> Result<Vec<PathBuf>>;
}
