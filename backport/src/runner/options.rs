//! Backport run options.

use crate::github::MergeMethod;
use crate::targets::BranchLabelMapping;
use crate::templates::{DEFAULT_PR_BODY, DEFAULT_PR_TITLE};
use regex::Regex;

/// Options controlling one backport run.
///
/// Everything is explicit here; there is no global configuration. The CLI
/// builds this from `.backport.toml` plus command-line flags.
#[derive(Debug, Clone)]
pub struct BackportOptions {
    /// Repository owner.
    pub repo_owner: String,

    /// Repository name.
    pub repo_name: String,

    /// Explicit target branches, in processing order. When empty, the
    /// commits' suggested branches are used instead.
    pub target_branches: Vec<String>,

    /// Label mapping used when parsing commits.
    pub branch_label_mapping: Option<BranchLabelMapping>,

    /// Push the head branch to this fork owner instead of origin.
    pub fork_owner: Option<String>,

    /// Whether an operator is available to resolve conflicts.
    pub interactive: bool,

    /// Cherry-pick locally but skip push, pull request and merge.
    pub dry_run: bool,

    /// Enable auto-merge on created pull requests.
    pub auto_merge: bool,

    /// Merge method for auto-merge and fallback merges.
    pub auto_merge_method: MergeMethod,

    /// Copy all labels from the source pull requests.
    pub copy_source_labels: bool,

    /// Copy only the source labels matching one of these patterns. Ignored
    /// when `copy_source_labels` is set.
    pub copy_label_patterns: Vec<Regex>,

    /// Copy reviewers from the source pull requests.
    pub copy_reviewers: bool,

    /// Extra reviewers requested on every backport pull request.
    pub reviewers: Vec<String>,

    /// Labels added to every backport pull request.
    pub target_pr_labels: Vec<String>,

    /// Pull request title template.
    pub pr_title_template: String,

    /// Pull request body template.
    pub pr_body_template: String,

    /// Post a status comment when every branch succeeded.
    pub publish_status_on_success: bool,

    /// Post a status comment when one or more branches failed.
    pub publish_status_on_failure: bool,

    /// Post a status comment when the run was aborted without branches.
    pub publish_status_on_abort: bool,
}

impl BackportOptions {
    /// Creates options with defaults for `owner/name`.
    #[must_use]
    pub fn new(repo_owner: impl Into<String>, repo_name: impl Into<String>) -> Self {
        Self {
            repo_owner: repo_owner.into(),
            repo_name: repo_name.into(),
            target_branches: Vec::new(),
            branch_label_mapping: None,
            fork_owner: None,
            interactive: false,
            dry_run: false,
            auto_merge: false,
            auto_merge_method: MergeMethod::Merge,
            copy_source_labels: false,
            copy_label_patterns: Vec::new(),
            copy_reviewers: false,
            reviewers: Vec::new(),
            target_pr_labels: Vec::new(),
            pr_title_template: DEFAULT_PR_TITLE.to_string(),
            pr_body_template: DEFAULT_PR_BODY.to_string(),
            publish_status_on_success: true,
            publish_status_on_failure: true,
            publish_status_on_abort: true,
        }
    }

    /// Repository in `owner/name` form.
    #[must_use]
    pub fn repo(&self) -> String {
        format!("{}/{}", self.repo_owner, self.repo_name)
    }

    /// Owner the head branch is pushed to.
    #[must_use]
    pub fn push_owner(&self) -> &str {
        self.fork_owner.as_deref().unwrap_or(&self.repo_owner)
    }
}
