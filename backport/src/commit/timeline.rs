//! Cross-reference timeline model.

use crate::reconcile::PullRequestState;

/// One item from the source pull request's cross-reference timeline.
///
/// GitHub's timeline payload is polymorphic (issues, commits and pull
/// requests share one envelope). The parsing boundary in `github::payload`
/// collapses it into this closed set of variants, so the raw tag never
/// travels further into the crate.
#[derive(Debug, Clone)]
pub enum TimelineItem {
    /// The referencing item is itself a pull request.
    PullRequest(CrossReferencedPullRequest),

    /// Any other referencing item (plain issue, commit, ...). Carries no
    /// backport signal and is skipped during reconciliation.
    Other,
}

/// A pull request that cross-references the source pull request and may be
/// a backport of the source commit.
#[derive(Debug, Clone)]
pub struct CrossReferencedPullRequest {
    /// Pull request number.
    pub number: u64,

    /// Pull request URL.
    pub url: String,

    /// Pull request title.
    pub title: String,

    /// Pull request state.
    pub state: PullRequestState,

    /// Branch the pull request targets.
    pub base_branch: String,

    /// Owner of the repository the pull request lives in.
    pub repo_owner: String,

    /// Name of the repository the pull request lives in.
    pub repo_name: String,

    /// Merge commit, when the pull request was merged.
    pub merge_commit_sha: Option<String>,

    /// First line of each commit message contained in the pull request.
    pub commit_message_lines: Vec<String>,
}
