//! Git Client Implementation using the git CLI
//!
//! Shells out to the host's `git` binary against a fixed working tree.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    git::GitClient,
};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Subprocess-based git client
///
/// All operations run `git` in the working tree the client was constructed
/// with. A non-zero exit status surfaces as an operation failure carrying
/// git's stderr.
pub struct CommandGitClient {
    working_tree: PathBuf,
}

impl CommandGitClient {
    pub fn new(working_tree: impl Into<PathBuf>) -> Self {
        Self {
            working_tree: working_tree.into(),
        }
    }

    async fn run(&self, args: &[String]) -> Result<()> {
        debug!(args = %args.join(" "), tree = %self.working_tree.display(), "running git");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.working_tree)
            .output()
            .await
            .map_err(|e| {
                BridgeError::OperationFailed(format!("failed to launch git: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BridgeError::OperationFailed(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl GitClient for CommandGitClient {
    async fn switch_to_branch(&self, branch: &str) -> Result<()> {
        self.run(&["switch".to_string(), branch.to_string()]).await
    }

    async fn fetch(&self, flags: &[String]) -> Result<()> {
        let mut args = vec!["fetch".to_string()];
        args.extend(flags.iter().cloned());
        self.run(&args).await
    }

    async fn add(&self, flags: &[String]) -> Result<()> {
        let mut args = vec!["add".to_string()];
        args.extend(flags.iter().cloned());
        self.run(&args).await
    }

    async fn commit(&self, messages: &[String]) -> Result<()> {
        let mut args = vec!["commit".to_string()];
        for message in messages {
            args.push("-m".to_string());
            args.push(message.clone());
        }
        self.run(&args).await
    }

    async fn push(&self) -> Result<()> {
        self.run(&["push".to_string()]).await
    }
}
