//! Git Client Abstraction
//!
//! Wraps the host's git tooling behind an async contract. The pipeline only
//! needs branch switching, fetching, staging, committing and pushing; how the
//! host runs git (subprocess, libgit2, remote agent) is its own concern.

use async_trait::async_trait;

use crate::error::Result;

/// The git operations the sync pipeline performs, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitOperation {
    SwitchBranch,
    Fetch,
    Add,
    Commit,
    Push,
}

impl GitOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            GitOperation::SwitchBranch => "switch-branch",
            GitOperation::Fetch => "fetch",
            GitOperation::Add => "add",
            GitOperation::Commit => "commit",
            GitOperation::Push => "push",
        }
    }
}

impl std::fmt::Display for GitOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Async git client trait
///
/// All operations act on the working tree the implementation was constructed
/// with. The working tree and its branch are a shared resource across sync
/// runs; callers must serialize runs per application/branch externally.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::git::GitClient;
///
/// async fn land_changes(git: &dyn GitClient, branch: &str) -> Result<()> {
///     git.add(&["-A".to_string()]).await?;
///     git.commit(&[format!("Sync update set onto {branch}")]).await?;
///     git.push().await
/// }
/// ```
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Switch the working tree to the named branch.
    async fn switch_to_branch(&self, branch: &str) -> Result<()>;

    /// Fetch from the default remote with the given flags (e.g. `--prune`).
    async fn fetch(&self, flags: &[String]) -> Result<()>;

    /// Stage changes with the given flags (e.g. `-A` for all, including
    /// deletions).
    async fn add(&self, flags: &[String]) -> Result<()>;

    /// Commit staged changes; each entry becomes one `-m` message paragraph.
    async fn commit(&self, messages: &[String]) -> Result<()>;

    /// Push the current branch to its upstream.
    async fn push(&self) -> Result<()>;
}
