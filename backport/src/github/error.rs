//! GitHub API error types.

use thiserror::Error;

/// Errors that can occur at the GitHub API boundary.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// GitHub API error.
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// Commit lookup failed.
    #[error("Commit not found: {reference}")]
    CommitNotFound { reference: String },

    /// A response did not carry the fields we rely on.
    #[error("Unexpected response from GitHub: {message}")]
    MalformedResponse { message: String },

    /// Auto-merge was rejected because branch protection or required status
    /// checks are not configured for the target branch.
    #[error("Auto-merge is not available: {message}")]
    AutoMergeNotAllowed { message: String },
}
