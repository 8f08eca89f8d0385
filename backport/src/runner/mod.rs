//! Sequential backport orchestration.
//!
//! [`BackportRunner`] cherry-picks the selected commits onto every target
//! branch and publishes a pull request there, one branch at a time. All
//! attempts share a single local working copy, so branch processing is
//! strictly sequential; only the side-effect-free pre-flight reads run
//! concurrently.

mod error;
mod interaction;
mod options;

pub use error::BackportError;
pub use interaction::{ConflictAutoFixer, ConflictDecision, OperatorPrompt};
pub use options::BackportOptions;

use crate::commit::Commit;
use crate::github::{GitHubApi, GitHubError, PullRequestSummary};
use crate::reconcile::PullRequestState;
use crate::report::{self, BackportResponse, BackportResult, ReportOptions};
use crate::templates::{self, TemplateRenderer};
use crate::vcs::{CherryPickOutcome, Vcs};
use futures::future;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// Placeholder pull request number reported for dry runs.
const DRY_RUN_PR_NUMBER: u64 = 1337;

/// Placeholder pull request URL reported for dry runs.
const DRY_RUN_PR_URL: &str = "https://localhost/dry-run";

/// Orchestrates a backport run across the selected target branches.
pub struct BackportRunner {
    options: BackportOptions,
    github: Arc<dyn GitHubApi>,
    vcs: Arc<dyn Vcs>,
    renderer: TemplateRenderer,
    prompt: Option<Arc<dyn OperatorPrompt>>,
    auto_fixer: Option<Arc<dyn ConflictAutoFixer>>,
}

impl BackportRunner {
    /// Builds a runner from options and its collaborators.
    #[must_use]
    pub fn new(options: BackportOptions, github: Arc<dyn GitHubApi>, vcs: Arc<dyn Vcs>) -> Self {
        Self {
            options,
            github,
            vcs,
            renderer: TemplateRenderer::new(),
            prompt: None,
            auto_fixer: None,
        }
    }

    /// Attaches the operator prompt used for interactive conflict
    /// resolution.
    #[must_use]
    pub fn with_prompt(mut self, prompt: Arc<dyn OperatorPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Attaches an automatic conflict resolution hook.
    #[must_use]
    pub fn with_auto_fixer(mut self, auto_fixer: Arc<dyn ConflictAutoFixer>) -> Self {
        self.auto_fixer = Some(auto_fixer);
        self
    }

    /// The options this runner was built with.
    #[must_use]
    pub fn options(&self) -> &BackportOptions {
        &self.options
    }

    /// Executes the full backport workflow for the selected commits.
    ///
    /// Always produces a response; errors that prevent branch processing
    /// are folded into `Failure`/`Aborted`, and the status report comment
    /// is posted according to the publish flags.
    pub async fn run(&self, commits: Vec<Commit>) -> BackportResponse {
        let response = match self.run_branches(&commits).await {
            Ok(results) => report::aggregate(commits, results),
            Err(err) => {
                if err.is_expected() {
                    info!(error = %err, "Backport run ended early");
                } else {
                    error!(error = ?err, "Backport run failed unexpectedly");
                }
                report::aggregate_error(commits, err)
            }
        };

        self.publish_status(&response).await;
        response
    }

    /// Resolves target branches, validates them, and processes each one.
    async fn run_branches(&self, commits: &[Commit]) -> Result<Vec<BackportResult>, BackportError> {
        if commits.is_empty() {
            return Err(BackportError::Message(
                "No commits were selected for backporting".to_string(),
            ));
        }

        let target_branches = self.select_target_branches(commits);
        if target_branches.is_empty() {
            return Err(BackportError::NoBranches);
        }

        info!(branches = ?target_branches, "Backporting to target branches");

        // The pre-flight reads are independent and side-effect free, so
        // they run concurrently. Everything after is sequential.
        let (current_user, existence) = future::try_join(
            self.github.authenticated_user(),
            future::try_join_all(
                target_branches
                    .iter()
                    .map(|branch| self.github.validate_branch_exists(branch)),
            ),
        )
        .await?;

        for (branch, exists) in target_branches.iter().zip(existence) {
            if !exists {
                return Err(BackportError::Message(format!(
                    "The branch \"{branch}\" does not exist"
                )));
            }
        }

        let mut results = Vec::with_capacity(target_branches.len());

        for branch in &target_branches {
            let span = info_span!("backport_branch", target_branch = %branch);

            match self
                .backport_to_branch(commits, branch, &current_user)
                .instrument(span)
                .await
            {
                Ok(pr) => {
                    info!(branch = %branch, pr_number = pr.number, "Backport created");
                    results.push(BackportResult::Success {
                        target_branch: branch.clone(),
                        pull_request_number: pr.number,
                        pull_request_url: pr.url,
                    });
                }
                // An operator abort terminates the entire run, not just
                // the current branch.
                Err(BackportError::AbortConflictResolution) => {
                    return Err(BackportError::AbortConflictResolution);
                }
                Err(err) => {
                    if err.is_expected() {
                        warn!(branch = %branch, error = %err, "Backport failed");
                    } else {
                        error!(branch = %branch, error = ?err, "Backport failed unexpectedly");
                    }
                    results.push(BackportResult::Failure {
                        target_branch: branch.clone(),
                        error: err,
                    });
                }
            }
        }

        Ok(results)
    }

    /// Explicit branches when supplied, otherwise the ordered union of the
    /// commits' suggested branches.
    fn select_target_branches(&self, commits: &[Commit]) -> Vec<String> {
        if !self.options.target_branches.is_empty() {
            return self.options.target_branches.clone();
        }

        let mut branches = Vec::new();
        for commit in commits {
            for branch in &commit.suggested_target_branches {
                if !branches.contains(branch) {
                    branches.push(branch.clone());
                }
            }
        }
        branches
    }

    /// The per-branch state machine: branch, cherry-pick, push, pull
    /// request, labels/reviewers, auto-merge.
    async fn backport_to_branch(
        &self,
        commits: &[Commit],
        target_branch: &str,
        current_user: &str,
    ) -> Result<PullRequestSummary, BackportError> {
        let head_branch = templates::generate_head_branch_name(target_branch, commits);
        if !templates::is_valid_branch_name(&head_branch) {
            return Err(BackportError::Message(format!(
                "\"{head_branch}\" is not a valid branch name"
            )));
        }

        self.vcs.fetch(target_branch).await?;
        self.vcs
            .create_branch_from(&head_branch, &format!("origin/{target_branch}"))
            .await?;

        for commit in commits {
            self.apply_commit(commit, commits, target_branch).await?;
        }

        if self.options.dry_run {
            info!("Dry run: skipping push and pull request creation");
            return Ok(PullRequestSummary {
                number: DRY_RUN_PR_NUMBER,
                url: DRY_RUN_PR_URL.to_string(),
            });
        }

        let source_branch = commits
            .first()
            .map(|commit| commit.source_branch.as_str())
            .unwrap_or_default();
        let title = self.renderer.render_pr_title(
            &self.options.pr_title_template,
            commits,
            source_branch,
            target_branch,
        )?;
        let body = self.renderer.render_pr_body(
            &self.options.pr_body_template,
            commits,
            source_branch,
            target_branch,
        )?;

        self.vcs
            .push(&head_branch, self.options.push_owner())
            .await?;

        let head_ref = if self.options.push_owner() == self.options.repo_owner {
            head_branch.clone()
        } else {
            format!("{}:{head_branch}", self.options.push_owner())
        };

        let pr = self
            .github
            .create_pull_request(target_branch, &head_ref, &title, &body)
            .await?;

        self.copy_labels(pr.number, commits).await?;
        self.copy_reviewers(pr.number, commits, current_user).await;

        if self.options.auto_merge {
            self.enable_auto_merge(pr.number).await?;
        }

        Ok(pr)
    }

    /// Applies one commit, entering conflict resolution when needed.
    async fn apply_commit(
        &self,
        commit: &Commit,
        commits: &[Commit],
        target_branch: &str,
    ) -> Result<(), BackportError> {
        match self.vcs.cherry_pick(&commit.sha).await? {
            CherryPickOutcome::Clean => Ok(()),
            CherryPickOutcome::Conflict { files } => {
                self.resolve_conflict(commit, commits, target_branch, files)
                    .await
            }
        }
    }

    /// Conflict handling: auto-fix hook first, then the interactive
    /// confirmation loop, otherwise fail the branch with the file list.
    async fn resolve_conflict(
        &self,
        commit: &Commit,
        commits: &[Commit],
        target_branch: &str,
        files: Vec<String>,
    ) -> Result<(), BackportError> {
        warn!(sha = %commit.sha, files = ?files, "Cherry-pick conflict");

        if let Some(auto_fixer) = &self.auto_fixer {
            if auto_fixer.try_fix(self.vcs.workdir(), &files).await {
                info!("Conflicts auto-fixed, continuing cherry-pick");
                self.vcs.continue_cherry_pick().await?;
                return Ok(());
            }
        }

        match &self.prompt {
            Some(prompt) if self.options.interactive => {
                let mut outstanding = files;
                loop {
                    match prompt
                        .confirm_conflicts_resolved(self.vcs.workdir(), &outstanding)
                        .await
                    {
                        ConflictDecision::Abort => {
                            let _ = self.vcs.abort_cherry_pick().await;
                            return Err(BackportError::AbortConflictResolution);
                        }
                        ConflictDecision::Resolved => {
                            outstanding = self.vcs.unmerged_files().await?;
                            if outstanding.is_empty() {
                                self.vcs.continue_cherry_pick().await?;
                                return Ok(());
                            }
                            warn!(files = ?outstanding, "Conflicts are still unresolved");
                        }
                    }
                }
            }
            _ => {
                let _ = self.vcs.abort_cherry_pick().await;
                Err(BackportError::MergeConflict {
                    conflicting_files: files,
                    unmerged_commits: unmerged_backport_commits(commits, target_branch),
                })
            }
        }
    }

    /// Adds the configured labels plus the copied source labels.
    async fn copy_labels(&self, pr_number: u64, commits: &[Commit]) -> Result<(), BackportError> {
        let mut labels: Vec<String> = Vec::new();
        for label in &self.options.target_pr_labels {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }

        if self.options.copy_source_labels || !self.options.copy_label_patterns.is_empty() {
            for commit in commits {
                let Some(source_pr) = &commit.source_pull_request else {
                    continue;
                };
                for label in &source_pr.labels {
                    let copy = self.options.copy_source_labels
                        || self
                            .options
                            .copy_label_patterns
                            .iter()
                            .any(|pattern| pattern.is_match(label));
                    if copy && !labels.contains(label) {
                        labels.push(label.clone());
                    }
                }
            }
        }

        if labels.is_empty() {
            return Ok(());
        }

        self.github.add_labels(pr_number, &labels).await?;
        Ok(())
    }

    /// Requests reviews from the source pull requests' reviewers plus the
    /// configured extras, excluding the authenticated actor. Reviewer
    /// failures never fail the branch.
    async fn copy_reviewers(&self, pr_number: u64, commits: &[Commit], current_user: &str) {
        let mut reviewers: Vec<String> = Vec::new();

        if self.options.copy_reviewers {
            for commit in commits {
                let Some(source_pr) = &commit.source_pull_request else {
                    continue;
                };
                match self.github.fetch_pr_reviewers(source_pr.number).await {
                    Ok(found) => {
                        for reviewer in found {
                            if !reviewers.contains(&reviewer) {
                                reviewers.push(reviewer);
                            }
                        }
                    }
                    Err(err) => {
                        warn!(pr_number = source_pr.number, error = %err, "Failed to fetch reviewers");
                    }
                }
            }
        }

        for reviewer in &self.options.reviewers {
            if !reviewers.contains(reviewer) {
                reviewers.push(reviewer.clone());
            }
        }

        reviewers.retain(|reviewer| reviewer != current_user);

        if reviewers.is_empty() {
            return;
        }

        if let Err(err) = self.github.add_reviewers(pr_number, &reviewers).await {
            warn!(error = %err, "Failed to add reviewers");
        }
    }

    /// Enables auto-merge, falling back to an immediate merge when branch
    /// protection prerequisites are missing.
    async fn enable_auto_merge(&self, pr_number: u64) -> Result<(), BackportError> {
        let method = self.options.auto_merge_method;

        match self.github.enable_auto_merge(pr_number, method).await {
            Ok(()) => {
                info!(pr_number, "Auto-merge enabled");
                Ok(())
            }
            Err(GitHubError::AutoMergeNotAllowed { message }) => {
                info!(pr_number, reason = %message, "Auto-merge unavailable, merging immediately");
                if let Err(err) = self.github.merge_now(pr_number, method).await {
                    warn!(pr_number, error = %err, "Immediate merge failed; pull request left open");
                }
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Posts the status report on each source pull request.
    async fn publish_status(&self, response: &BackportResponse) {
        let report_options = ReportOptions {
            on_success: self.options.publish_status_on_success,
            on_failure: self.options.publish_status_on_failure,
            on_abort: self.options.publish_status_on_abort,
            dry_run: self.options.dry_run,
            repo: self.options.repo(),
        };

        let Some(body) = report::status_report_body(response, &report_options) else {
            return;
        };

        let mut posted = HashSet::new();
        for commit in response.commits() {
            let Some(source_pr) = &commit.source_pull_request else {
                continue;
            };
            if !posted.insert(source_pr.number) {
                continue;
            }
            if let Err(err) = self.github.post_comment(source_pr.number, &body).await {
                warn!(pr_number = source_pr.number, error = %err, "Failed to post status comment");
            }
        }
    }
}

/// Commits in the set whose backport to `target_branch` is not merged yet.
///
/// Included in conflict errors so the operator can tell which dependent
/// commits are also missing from the branch.
fn unmerged_backport_commits(commits: &[Commit], target_branch: &str) -> Vec<String> {
    commits
        .iter()
        .filter(|commit| {
            commit
                .state_for_branch(target_branch)
                .is_none_or(|state| state.state != PullRequestState::Merged)
        })
        .map(|commit| commit.sha.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{CommitAuthor, CommitPayload, SourcePullRequest};
    use crate::reconcile::TargetBranchState;
    use chrono::{TimeZone, Utc};

    fn commit(sha: &str, suggested: &[&str]) -> Commit {
        let mut commit = Commit::from_payload(
            CommitPayload {
                sha: sha.to_string(),
                message: "Fix parser overflow".to_string(),
                committed_date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                author: CommitAuthor {
                    name: "Jules".to_string(),
                    email: "jules@example.com".to_string(),
                },
                source_branch: "main".to_string(),
                source_pull_request: Some(SourcePullRequest {
                    number: 123,
                    url: "https://github.com/acme/widget/pull/123".to_string(),
                    title: "Fix parser overflow (#123)".to_string(),
                    labels: Vec::new(),
                    merge_commit_sha: None,
                }),
                timeline: Vec::new(),
            },
            None,
            "acme",
            "widget",
        );
        commit.suggested_target_branches = suggested.iter().map(|s| s.to_string()).collect();
        commit
    }

    #[test]
    fn suggested_branches_union_preserves_order() {
        let runner = test_runner(BackportOptions::new("acme", "widget"));
        let commits = [commit("a", &["7.x", "7.1"]), commit("b", &["7.1", "6.8"])];

        let branches = runner.select_target_branches(&commits);
        assert_eq!(branches, ["7.x", "7.1", "6.8"]);
    }

    #[test]
    fn explicit_branches_override_suggestions() {
        let mut options = BackportOptions::new("acme", "widget");
        options.target_branches = vec!["5.6".to_string()];
        let runner = test_runner(options);

        let branches = runner.select_target_branches(&[commit("a", &["7.x"])]);
        assert_eq!(branches, ["5.6"]);
    }

    #[test]
    fn unmerged_commits_reported_for_conflicts() {
        let mut merged = commit("a", &[]);
        merged.target_states = vec![TargetBranchState {
            branch: "7.x".to_string(),
            state: PullRequestState::Merged,
            label: None,
            label_pattern: None,
            number: Some(321),
            url: None,
            merge_commit_sha: None,
        }];
        let pending = commit("b", &[]);

        let unmerged = unmerged_backport_commits(&[merged, pending], "7.x");
        assert_eq!(unmerged, ["b"]);
    }

    fn test_runner(options: BackportOptions) -> BackportRunner {
        struct NoGitHub;

        #[async_trait::async_trait]
        impl GitHubApi for NoGitHub {
            async fn fetch_commit_payload(
                &self,
                _reference: &str,
            ) -> Result<CommitPayload, GitHubError> {
                unimplemented!("not used")
            }
            async fn fetch_pull_request_merge_commit(
                &self,
                _number: u64,
            ) -> Result<String, GitHubError> {
                unimplemented!("not used")
            }
            async fn validate_branch_exists(&self, _branch: &str) -> Result<bool, GitHubError> {
                Ok(true)
            }
            async fn authenticated_user(&self) -> Result<String, GitHubError> {
                Ok("octo-bot".to_string())
            }
            async fn create_pull_request(
                &self,
                _base: &str,
                _head: &str,
                _title: &str,
                _body: &str,
            ) -> Result<PullRequestSummary, GitHubError> {
                unimplemented!("not used")
            }
            async fn add_labels(
                &self,
                _pr_number: u64,
                _labels: &[String],
            ) -> Result<(), GitHubError> {
                Ok(())
            }
            async fn add_reviewers(
                &self,
                _pr_number: u64,
                _reviewers: &[String],
            ) -> Result<(), GitHubError> {
                Ok(())
            }
            async fn fetch_pr_reviewers(&self, _pr_number: u64) -> Result<Vec<String>, GitHubError> {
                Ok(Vec::new())
            }
            async fn enable_auto_merge(
                &self,
                _pr_number: u64,
                _method: crate::github::MergeMethod,
            ) -> Result<(), GitHubError> {
                Ok(())
            }
            async fn merge_now(
                &self,
                _pr_number: u64,
                _method: crate::github::MergeMethod,
            ) -> Result<(), GitHubError> {
                Ok(())
            }
            async fn post_comment(&self, _issue_number: u64, _body: &str) -> Result<(), GitHubError> {
                Ok(())
            }
        }

        struct NoVcs;

        #[async_trait::async_trait]
        impl Vcs for NoVcs {
            async fn fetch(&self, _branch: &str) -> Result<(), crate::vcs::VcsError> {
                Ok(())
            }
            async fn create_branch_from(
                &self,
                _branch: &str,
                _base_ref: &str,
            ) -> Result<(), crate::vcs::VcsError> {
                Ok(())
            }
            async fn cherry_pick(
                &self,
                _sha: &str,
            ) -> Result<CherryPickOutcome, crate::vcs::VcsError> {
                Ok(CherryPickOutcome::Clean)
            }
            async fn continue_cherry_pick(&self) -> Result<(), crate::vcs::VcsError> {
                Ok(())
            }
            async fn abort_cherry_pick(&self) -> Result<(), crate::vcs::VcsError> {
                Ok(())
            }
            async fn unmerged_files(&self) -> Result<Vec<String>, crate::vcs::VcsError> {
                Ok(Vec::new())
            }
            async fn push(
                &self,
                _branch: &str,
                _remote_owner: &str,
            ) -> Result<(), crate::vcs::VcsError> {
                Ok(())
            }
            async fn local_identity(&self) -> Result<crate::vcs::GitIdentity, crate::vcs::VcsError> {
                Ok(crate::vcs::GitIdentity {
                    name: "test".to_string(),
                    email: "test@example.com".to_string(),
                })
            }
            fn workdir(&self) -> &std::path::Path {
                std::path::Path::new("/tmp")
            }
        }

        BackportRunner::new(options, Arc::new(NoGitHub), Arc::new(NoVcs))
    }
}
