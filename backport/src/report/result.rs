//! Backport outcome types.

use crate::commit::Commit;
use crate::runner::BackportError;

/// Outcome of backporting the commit set onto one target branch.
#[derive(Debug)]
pub enum BackportResult {
    /// The branch received a backport pull request.
    Success {
        /// Target branch name.
        target_branch: String,
        /// Created (or reused) pull request number.
        pull_request_number: u64,
        /// Created (or reused) pull request URL.
        pull_request_url: String,
    },

    /// The branch could not be backported.
    Failure {
        /// Target branch name.
        target_branch: String,
        /// What went wrong on this branch.
        error: BackportError,
    },
}

impl BackportResult {
    /// Target branch this result belongs to.
    #[must_use]
    pub fn target_branch(&self) -> &str {
        match self {
            Self::Success { target_branch, .. } | Self::Failure { target_branch, .. } => {
                target_branch
            }
        }
    }

    /// Returns `true` for a successful branch.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Aggregated outcome of a whole backport run.
///
/// Built once per invocation and never mutated afterwards; the status
/// report and the process exit code both derive from it.
#[derive(Debug)]
pub enum BackportResponse {
    /// Branch processing ran; per-branch results carry the details.
    Success {
        commits: Vec<Commit>,
        results: Vec<BackportResult>,
    },

    /// The run failed before or during branch processing.
    Failure {
        commits: Vec<Commit>,
        error: BackportError,
    },

    /// No target branches could be determined.
    Aborted {
        commits: Vec<Commit>,
        error: BackportError,
    },
}

impl BackportResponse {
    /// The commits this run operated on.
    #[must_use]
    pub fn commits(&self) -> &[Commit] {
        match self {
            Self::Success { commits, .. }
            | Self::Failure { commits, .. }
            | Self::Aborted { commits, .. } => commits,
        }
    }

    /// Returns `true` only for a top-level failure. Aborted runs exit
    /// cleanly.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}
