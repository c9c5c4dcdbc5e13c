//! # Sync Run State Machine
//!
//! Manages the lifecycle of one orchestrated sync run with validated state
//! transitions.
//!
//! ## State Machine
//!
//! ```text
//! Idle → ConfigLoaded → (PullRequestCheck) → BranchPrepared → Syncing → Committed → Done
//!                    ↘ Done (master export disabled: recorded skip, not a failure)
//!                    ↘ Syncing (git integration disabled: no branch prep, no commit)
//!
//! Failed is reachable from every non-terminal state.
//! ```
//!
//! The pull-request check and branch-preparation states are conditional on
//! configuration; transitions that bypass them are valid edges, not
//! shortcuts around validation.

use crate::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncRunId(Uuid);

impl SyncRunId {
    /// Create a new random sync run ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a sync run ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| SyncError::InvalidRunId(e.to_string()))?,
        ))
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for SyncRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SyncRunId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// State Types
// ============================================================================

/// The current state of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRunState {
    /// Run created, nothing loaded yet
    Idle,
    /// Run configuration loaded and validated
    ConfigLoaded,
    /// Checking for a conflicting pending pull request
    PullRequestCheck,
    /// Working tree switched, fetched and cleaned
    BranchPrepared,
    /// Fetching and materializing records class by class
    Syncing,
    /// Changes staged, committed and pushed
    Committed,
    /// Run finished successfully (including the recorded-skip path)
    Done,
    /// Run failed; the originating error is carried on the run
    Failed,
}

impl SyncRunState {
    /// Check if this state is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncRunState::Done | SyncRunState::Failed)
    }

    /// Valid forward edges of the state machine, excluding `Failed` (which
    /// is reachable from every non-terminal state).
    fn can_advance_to(&self, next: SyncRunState) -> bool {
        use SyncRunState::*;
        matches!(
            (self, next),
            (Idle, ConfigLoaded)
                | (ConfigLoaded, PullRequestCheck)
                | (ConfigLoaded, BranchPrepared)
                | (ConfigLoaded, Syncing)
                | (ConfigLoaded, Done)
                | (PullRequestCheck, BranchPrepared)
                | (PullRequestCheck, Syncing)
                | (BranchPrepared, Syncing)
                | (Syncing, Committed)
                | (Syncing, Done)
                | (Committed, Done)
        )
    }

    /// Get the string representation for persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncRunState::Idle => "idle",
            SyncRunState::ConfigLoaded => "config_loaded",
            SyncRunState::PullRequestCheck => "pull_request_check",
            SyncRunState::BranchPrepared => "branch_prepared",
            SyncRunState::Syncing => "syncing",
            SyncRunState::Committed => "committed",
            SyncRunState::Done => "done",
            SyncRunState::Failed => "failed",
        }
    }
}

impl FromStr for SyncRunState {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(SyncRunState::Idle),
            "config_loaded" => Ok(SyncRunState::ConfigLoaded),
            "pull_request_check" => Ok(SyncRunState::PullRequestCheck),
            "branch_prepared" => Ok(SyncRunState::BranchPrepared),
            "syncing" => Ok(SyncRunState::Syncing),
            "committed" => Ok(SyncRunState::Committed),
            "done" => Ok(SyncRunState::Done),
            "failed" => Ok(SyncRunState::Failed),
            _ => Err(SyncError::InvalidState(s.to_string())),
        }
    }
}

impl std::fmt::Display for SyncRunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Statistics collected over one sync run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRunStats {
    /// Number of classes synchronized
    pub classes_synced: u64,
    /// Number of records materialized across all classes
    pub records_materialized: u64,
    /// Number of files reported written by the project store
    pub files_written: u64,
}

// ============================================================================
// Sync Run Entity
// ============================================================================

/// A sync run with state machine semantics
///
/// Runs are created in `Idle` state and advanced through validated edges;
/// `fail` is accepted from any non-terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRun {
    /// Unique identifier for this run
    pub id: SyncRunId,
    /// Current state
    pub state: SyncRunState,
    /// Statistics (populated during and after the syncing phase)
    pub stats: SyncRunStats,
    /// Error message if failed
    pub error_message: Option<String>,
    /// When the run was created
    pub created_at: DateTime<Utc>,
    /// When the run reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncRun {
    /// Create a new run in `Idle` state
    pub fn new(id: SyncRunId) -> Self {
        Self {
            id,
            state: SyncRunState::Idle,
            stats: SyncRunStats::default(),
            error_message: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Advance to the next state
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the edge is not part of the state
    /// machine.
    pub fn advance(&mut self, next: SyncRunState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(SyncError::InvalidStateTransition {
                from: self.state.as_str().to_string(),
                to: next.as_str().to_string(),
                reason: "edge is not part of the sync state machine".to_string(),
            });
        }
        self.state = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Move the run to `Failed`, recording the originating error
    ///
    /// # Errors
    ///
    /// Returns an error if the run is already terminal.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        if self.state.is_terminal() {
            return Err(SyncError::InvalidStateTransition {
                from: self.state.as_str().to_string(),
                to: SyncRunState::Failed.as_str().to_string(),
                reason: "run already reached a terminal state".to_string(),
            });
        }
        self.state = SyncRunState::Failed;
        self.error_message = Some(message.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
