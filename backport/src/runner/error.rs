//! Backport run error types.

use crate::github::GitHubError;
use crate::targets::MappingError;
use crate::templates::TemplateError;
use crate::vcs::VcsError;
use thiserror::Error;

/// Errors that can occur while running a backport.
///
/// The first four variants are the expected, user-facing conditions; they
/// print as plain messages. Everything else is unexpected and gets logged
/// in full before surfacing.
#[derive(Debug, Error)]
pub enum BackportError {
    /// No target branches resolved and none were supplied explicitly.
    #[error("There are no branches to backport to. Aborting.")]
    NoBranches,

    /// A cherry-pick conflicted and could not be resolved.
    #[error("Cherry-pick failed due to conflicts in: {}", conflicting_files.join(", "))]
    MergeConflict {
        /// Paths with unresolved conflicts, as reported by the VCS driver.
        conflicting_files: Vec<String>,

        /// Commits in this set whose backport to the branch is still
        /// missing; conflicts are often caused by these.
        unmerged_commits: Vec<String>,
    },

    /// The operator aborted during conflict resolution.
    #[error("Conflict resolution was aborted by the operator")]
    AbortConflictResolution,

    /// Free-form user-facing failure, e.g. missing configuration.
    #[error("{0}")]
    Message(String),

    /// GitHub API failure.
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    /// Local git failure.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// Template rendering failure.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Label mapping configuration failure.
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

impl BackportError {
    /// Whether this is an expected, user-facing condition.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::NoBranches
                | Self::MergeConflict { .. }
                | Self::AbortConflictResolution
                | Self::Message(_)
        )
    }
}
