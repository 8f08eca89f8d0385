//! Source commit model.
//!
//! A [`Commit`] is one merged commit selected for backporting, together
//! with the reconciled view of which target branches it has already been
//! backported to. The view is computed once, when the commit is built from
//! its fetched payload, and is immutable afterward.

mod timeline;

pub use timeline::{CrossReferencedPullRequest, TimelineItem};

use crate::reconcile::{self, ReconcileInput, TargetBranchState};
use crate::targets::{resolve_label_targets, BranchLabelMapping};
use chrono::{DateTime, Utc};

/// Author of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// The pull request a commit originally landed through.
#[derive(Debug, Clone)]
pub struct SourcePullRequest {
    /// Pull request number.
    pub number: u64,

    /// Pull request URL.
    pub url: String,

    /// Pull request title.
    pub title: String,

    /// Labels in declaration order, deduplicated. Order is significant:
    /// suggested target branches follow label order.
    pub labels: Vec<String>,

    /// The merge commit the pull request produced.
    pub merge_commit_sha: Option<String>,
}

/// Raw commit data as fetched from GitHub, before reconciliation.
#[derive(Debug, Clone)]
pub struct CommitPayload {
    /// Full commit sha.
    pub sha: String,

    /// Full commit message.
    pub message: String,

    /// When the commit was committed.
    pub committed_date: DateTime<Utc>,

    /// Commit author.
    pub author: CommitAuthor,

    /// Branch the commit originally landed on.
    pub source_branch: String,

    /// Originating pull request, absent when the commit was pushed
    /// directly.
    pub source_pull_request: Option<SourcePullRequest>,

    /// Bounded window of cross-referencing timeline items.
    pub timeline: Vec<TimelineItem>,
}

/// One source commit selected for backporting.
#[derive(Debug, Clone)]
pub struct Commit {
    /// Full commit sha.
    pub sha: String,

    /// Full commit message.
    pub message: String,

    /// When the commit was committed.
    pub committed_date: DateTime<Utc>,

    /// Commit author.
    pub author: CommitAuthor,

    /// Branch the commit originally landed on.
    pub source_branch: String,

    /// Originating pull request, absent when the commit was pushed
    /// directly.
    pub source_pull_request: Option<SourcePullRequest>,

    /// Label mapping the targets were resolved with, kept for diagnostics.
    pub branch_label_mapping: Option<BranchLabelMapping>,

    /// Reconciled per-branch states. At most one entry per branch.
    pub target_states: Vec<TargetBranchState>,

    /// Branches whose backport is still missing, in label order.
    pub suggested_target_branches: Vec<String>,
}

impl Commit {
    /// Builds the reconciled commit view from a fetched payload.
    #[must_use]
    pub fn from_payload(
        payload: CommitPayload,
        mapping: Option<BranchLabelMapping>,
        repo_owner: &str,
        repo_name: &str,
    ) -> Self {
        let message_line = payload.message.lines().next().unwrap_or("").to_string();

        let label_targets = match (&payload.source_pull_request, &mapping) {
            (Some(pr), Some(mapping)) => {
                resolve_label_targets(&pr.labels, mapping, &payload.source_branch)
            }
            _ => Vec::new(),
        };

        let target_states = reconcile::reconcile_target_states(&ReconcileInput {
            source_pull_request: payload.source_pull_request.as_ref(),
            timeline: &payload.timeline,
            label_targets,
            commit_message_line: &message_line,
            repo_owner,
            repo_name,
        });

        let suggested_target_branches = reconcile::suggested_target_branches(&target_states);

        Self {
            sha: payload.sha,
            message: payload.message,
            committed_date: payload.committed_date,
            author: payload.author,
            source_branch: payload.source_branch,
            source_pull_request: payload.source_pull_request,
            branch_label_mapping: mapping,
            target_states,
            suggested_target_branches,
        }
    }

    /// First line of the commit message.
    #[must_use]
    pub fn message_line(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Abbreviated sha for branch names and reports.
    #[must_use]
    pub fn short_sha(&self) -> &str {
        let end = self.sha.len().min(8);
        &self.sha[..end]
    }

    /// Reconciled state for one target branch, if known.
    #[must_use]
    pub fn state_for_branch(&self, branch: &str) -> Option<&TargetBranchState> {
        self.target_states.iter().find(|s| s.branch == branch)
    }
}
