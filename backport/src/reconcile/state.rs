//! Target branch state types.

use serde::Serialize;

/// Lifecycle state of a backport pull request on one target branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestState {
    /// A backport pull request exists and was merged.
    Merged,

    /// A backport pull request exists and is open.
    Open,

    /// A backport pull request existed but was closed unmerged.
    Closed,

    /// No backport pull request exists for this branch yet.
    NotCreated,
}

impl PullRequestState {
    /// Returns `true` when the branch is still missing a backport.
    #[must_use]
    pub fn is_missing_backport(self) -> bool {
        matches!(self, Self::NotCreated | Self::Closed)
    }
}

/// Reconciled view of one `(commit, target branch)` pairing.
///
/// There is at most one state per branch name for a given commit; merging
/// label-derived and pull-request-derived candidates never duplicates keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetBranchState {
    /// Target branch name. Unique per commit.
    pub branch: String,

    /// Authoritative state for this branch.
    pub state: PullRequestState,

    /// Label the branch was derived from, when label-derived.
    pub label: Option<String>,

    /// Pattern that matched the label, when label-derived.
    pub label_pattern: Option<String>,

    /// Pull request number, when a concrete pull request exists.
    pub number: Option<u64>,

    /// Pull request URL, when a concrete pull request exists.
    pub url: Option<String>,

    /// Merge commit of the pull request, when it was merged.
    pub merge_commit_sha: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_backport_states() {
        assert!(PullRequestState::NotCreated.is_missing_backport());
        assert!(PullRequestState::Closed.is_missing_backport());
        assert!(!PullRequestState::Open.is_missing_backport());
        assert!(!PullRequestState::Merged.is_missing_backport());
    }
}
