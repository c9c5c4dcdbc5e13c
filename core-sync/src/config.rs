//! Sync run configuration.
//!
//! Loaded from the run store per run; read-mostly. The only mutation the
//! pipeline performs is attaching the derived git working directory once the
//! project's code directory is known.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Result, SyncError};

/// Git side of the sync target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitTarget {
    /// Branch the sync lands on (typically protected)
    pub branch: String,
    /// Repository name, used for pull-request lookups
    pub repo_name: String,
    /// Whether a pending pull request against `branch` blocks the sync
    pub check_pending_pull_request: bool,
}

/// The application being synchronized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppTarget {
    /// sys_id of the application scope on the instance
    pub sys_id: String,
    /// Application name (also the default provenance app name)
    pub name: String,
    /// Scope identifier (default provenance scope name)
    pub scope: String,
}

/// Full configuration for one sync run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub git: GitTarget,
    pub application: AppTarget,

    /// Master switch: when false the run records a skip and finishes
    pub master_export_enabled: bool,

    /// Whether git operations (branch prep, commit, push) run at all
    pub git_enabled: bool,

    /// Derived git working directory; attached by the orchestrator, not
    /// part of the stored configuration
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub working_dir: Option<PathBuf>,
}

impl SyncConfig {
    /// Validate the loaded configuration before the pipeline acts on it
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first missing field.
    pub fn validate(&self) -> Result<()> {
        if self.application.sys_id.is_empty() {
            return Err(SyncError::InvalidConfig(
                "application sys_id is empty".to_string(),
            ));
        }
        if self.application.name.is_empty() {
            return Err(SyncError::InvalidConfig(
                "application name is empty".to_string(),
            ));
        }
        if self.git_enabled && self.git.branch.is_empty() {
            return Err(SyncError::InvalidConfig(
                "git is enabled but no target branch is set".to_string(),
            ));
        }
        if self.git_enabled && self.git.check_pending_pull_request && self.git.repo_name.is_empty()
        {
            return Err(SyncError::InvalidConfig(
                "pull-request gating is enabled but no repo name is set".to_string(),
            ));
        }
        Ok(())
    }

    /// Attach the derived working directory under the project's code root.
    pub fn attach_working_dir(&mut self, code_root: &Path) {
        self.working_dir = Some(code_root.join(&self.application.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SyncConfig {
        SyncConfig {
            git: GitTarget {
                branch: "main".to_string(),
                repo_name: "acme/widgets".to_string(),
                check_pending_pull_request: true,
            },
            application: AppTarget {
                sys_id: "a1b2c3".to_string(),
                name: "widgets".to_string(),
                scope: "x_acme_widgets".to_string(),
            },
            master_export_enabled: true,
            git_enabled: true,
            working_dir: None,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_missing_branch_rejected_when_git_enabled() {
        let mut cfg = config();
        cfg.git.branch.clear();
        assert!(matches!(cfg.validate(), Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_branch_allowed_when_git_disabled() {
        let mut cfg = config();
        cfg.git.branch.clear();
        cfg.git_enabled = false;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_attach_working_dir() {
        let mut cfg = config();
        cfg.attach_working_dir(Path::new("/srv/code"));
        assert_eq!(
            cfg.working_dir.as_deref(),
            Some(Path::new("/srv/code/widgets"))
        );
    }
}
