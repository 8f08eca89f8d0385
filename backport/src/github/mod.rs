//! GitHub API boundary.
//!
//! [`GitHubApi`] is the typed contract the rest of the crate consumes;
//! [`OctocrabClient`] is the production implementation. Tests substitute
//! in-memory fakes for the trait.

mod error;
mod octocrab_client;
pub(crate) mod payload;

pub use error::GitHubError;
pub use octocrab_client::OctocrabClient;

use crate::commit::CommitPayload;
use async_trait::async_trait;
use serde::Deserialize;

/// Merge method for auto-merge and immediate merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMethod {
    Merge,
    Squash,
    Rebase,
}

impl MergeMethod {
    /// GraphQL enum value for the auto-merge mutation.
    #[must_use]
    pub fn as_graphql(self) -> &'static str {
        match self {
            Self::Merge => "MERGE",
            Self::Squash => "SQUASH",
            Self::Rebase => "REBASE",
        }
    }
}

/// A created (or reused) backport pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSummary {
    /// Pull request number.
    pub number: u64,

    /// Pull request URL.
    pub url: String,
}

/// Typed GitHub operations the backport workflow depends on.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Fetches a commit with its originating pull request and the bounded
    /// cross-reference timeline needed for reconciliation.
    async fn fetch_commit_payload(&self, reference: &str) -> Result<CommitPayload, GitHubError>;

    /// Resolves a pull request number to its merge commit sha.
    async fn fetch_pull_request_merge_commit(&self, number: u64) -> Result<String, GitHubError>;

    /// Checks whether a branch exists on the remote.
    async fn validate_branch_exists(&self, branch: &str) -> Result<bool, GitHubError>;

    /// Login of the authenticated actor.
    async fn authenticated_user(&self) -> Result<String, GitHubError>;

    /// Opens a pull request, reusing an existing open pull request for the
    /// same head/base instead of erroring.
    async fn create_pull_request(
        &self,
        base: &str,
        head: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestSummary, GitHubError>;

    /// Adds labels to a pull request.
    async fn add_labels(&self, pr_number: u64, labels: &[String]) -> Result<(), GitHubError>;

    /// Requests reviews on a pull request.
    async fn add_reviewers(&self, pr_number: u64, reviewers: &[String]) -> Result<(), GitHubError>;

    /// Users who reviewed the given pull request.
    async fn fetch_pr_reviewers(&self, pr_number: u64) -> Result<Vec<String>, GitHubError>;

    /// Enables platform auto-merge on a pull request.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::AutoMergeNotAllowed`] when the platform
    /// rejects auto-merge because branch protection or required status
    /// checks are missing; callers may fall back to an immediate merge.
    async fn enable_auto_merge(
        &self,
        pr_number: u64,
        method: MergeMethod,
    ) -> Result<(), GitHubError>;

    /// Merges a pull request immediately.
    async fn merge_now(&self, pr_number: u64, method: MergeMethod) -> Result<(), GitHubError>;

    /// Posts a comment on an issue or pull request.
    async fn post_comment(&self, issue_number: u64, body: &str) -> Result<(), GitHubError>;
}
