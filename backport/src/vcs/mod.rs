//! Local VCS driver.
//!
//! The backport workflow shares one local working copy across all target
//! branches, so [`Vcs`] is an explicit handle passed into the orchestrator
//! rather than anything global. Tests substitute in-memory fakes.

mod error;
mod git;

pub use error::VcsError;
pub use git::GitRepo;

use async_trait::async_trait;
use std::path::Path;

/// Result of applying one commit onto the current branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CherryPickOutcome {
    /// The commit applied cleanly.
    Clean,

    /// The commit conflicted; the working copy is left mid cherry-pick.
    Conflict {
        /// Paths with unresolved merge conflicts.
        files: Vec<String>,
    },
}

/// Local git user identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitIdentity {
    pub name: String,
    pub email: String,
}

/// Operations on the shared local working copy.
///
/// All methods mutate or inspect one checkout; callers must not interleave
/// operations for different branches.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Fetches a branch from origin.
    async fn fetch(&self, branch: &str) -> Result<(), VcsError>;

    /// Creates (or resets) a local branch at the given base ref and checks
    /// it out.
    async fn create_branch_from(&self, branch: &str, base_ref: &str) -> Result<(), VcsError>;

    /// Applies a commit onto the current branch.
    async fn cherry_pick(&self, sha: &str) -> Result<CherryPickOutcome, VcsError>;

    /// Stages everything and finishes the in-progress cherry-pick.
    async fn continue_cherry_pick(&self) -> Result<(), VcsError>;

    /// Aborts the in-progress cherry-pick, restoring a clean checkout.
    async fn abort_cherry_pick(&self) -> Result<(), VcsError>;

    /// Paths that still have unresolved conflicts.
    async fn unmerged_files(&self) -> Result<Vec<String>, VcsError>;

    /// Pushes the current branch to the remote owned by `remote_owner`.
    async fn push(&self, branch: &str, remote_owner: &str) -> Result<(), VcsError>;

    /// The local git user identity, as configured in the working copy.
    async fn local_identity(&self) -> Result<GitIdentity, VcsError>;

    /// The working copy directory.
    fn workdir(&self) -> &Path;
}
