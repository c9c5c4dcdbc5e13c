use bridge_traits::{BridgeError, GitOperation};
use core_payload::PayloadError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync run {run_id} not found")]
    RunNotFound { run_id: String },

    #[error("A pull request from branch {branch} is already pending")]
    ConflictingPullRequest { branch: String },

    #[error("Malformed export payload: {0}")]
    MalformedPayload(#[from] PayloadError),

    #[error("Remote fetch failed for class {class_name}: {source}")]
    RemoteFetchFailed {
        class_name: String,
        #[source]
        source: BridgeError,
    },

    #[error("Materialization failed for {class_name}/{record_id}: {source}")]
    MaterializeFailed {
        class_name: String,
        record_id: String,
        #[source]
        source: BridgeError,
    },

    #[error("Git {operation} failed: {source}")]
    GitOperationFailed {
        operation: GitOperation,
        #[source]
        source: BridgeError,
    },

    #[error("Failed to clean managed subtree {path}: {source}")]
    CleanFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid run ID: {0}")]
    InvalidRunId(String),

    #[error("Invalid run state: {0}")]
    InvalidState(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Collaborator error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
