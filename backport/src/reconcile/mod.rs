//! Reconciliation of label-derived target branches with existing backports.
//!
//! This module cross-references the resolver's label-derived candidates with
//! the pull requests found on the source pull request's timeline, producing
//! one authoritative [`TargetBranchState`] per branch. Reconciliation is a
//! pure function of its input: reconciling the same commit twice yields the
//! same states.

mod created;
mod state;

pub use created::CreatedPullRequest;
pub use state::{PullRequestState, TargetBranchState};

use crate::commit::{SourcePullRequest, TimelineItem};
use crate::targets::LabelTarget;
use std::collections::HashSet;

/// Everything the reconciler needs about one source commit.
#[derive(Debug)]
pub struct ReconcileInput<'a> {
    /// The commit's originating pull request, if it went through one.
    pub source_pull_request: Option<&'a SourcePullRequest>,

    /// Cross-reference timeline of the originating pull request.
    pub timeline: &'a [TimelineItem],

    /// Label-derived target branch candidates, in label order.
    pub label_targets: Vec<LabelTarget>,

    /// First line of the source commit's message.
    pub commit_message_line: &'a str,

    /// Repository the source commit lives in.
    pub repo_owner: &'a str,

    /// Repository the source commit lives in.
    pub repo_name: &'a str,
}

/// Produces the unified per-branch states for one commit.
///
/// Label-derived candidates come first, in label order, followed by branches
/// only known from existing pull requests, in timeline order. When a branch
/// appears on both sides the existing pull request's state wins; otherwise a
/// source-branch target is `MERGED` (the originating pull request is the
/// backport) and anything else is `NOT_CREATED`.
///
/// Without an originating pull request there is nothing to reconcile against
/// and the state set is empty.
#[must_use]
pub fn reconcile_target_states(input: &ReconcileInput<'_>) -> Vec<TargetBranchState> {
    let Some(source_pr) = input.source_pull_request else {
        return Vec::new();
    };

    let existing = created::classify_created_pull_requests(
        input.timeline,
        input.commit_message_line,
        source_pr.number,
        input.repo_owner,
        input.repo_name,
    );

    let mut states: Vec<TargetBranchState> = Vec::new();

    for target in &input.label_targets {
        let matched = existing.iter().find(|pr| pr.branch == target.branch);

        let state = match matched {
            Some(pr) => pr.state,
            None if target.is_source_branch => PullRequestState::Merged,
            None => PullRequestState::NotCreated,
        };

        let (number, url, merge_commit_sha) = match matched {
            Some(pr) => (
                Some(pr.number),
                Some(pr.url.clone()),
                pr.merge_commit_sha.clone(),
            ),
            None if target.is_source_branch => (
                // The originating pull request is the backport here, so its
                // own number, url and merge commit are reused.
                Some(source_pr.number),
                Some(source_pr.url.clone()),
                source_pr.merge_commit_sha.clone(),
            ),
            None => (None, None, None),
        };

        states.push(TargetBranchState {
            branch: target.branch.clone(),
            state,
            label: Some(target.label.clone()),
            label_pattern: Some(target.label_pattern.clone()),
            number,
            url,
            merge_commit_sha,
        });
    }

    for pr in existing {
        if states.iter().any(|s| s.branch == pr.branch) {
            continue;
        }

        states.push(TargetBranchState {
            branch: pr.branch,
            state: pr.state,
            label: None,
            label_pattern: None,
            number: Some(pr.number),
            url: Some(pr.url),
            merge_commit_sha: pr.merge_commit_sha,
        });
    }

    states
}

/// Selects the branches that still need a backport.
///
/// A branch qualifies when its state is `NOT_CREATED` or `CLOSED`, unless
/// its label also produced a `MERGED` entry (a branch merged under a
/// now-superseded label should not be re-suggested).
#[must_use]
pub fn suggested_target_branches(states: &[TargetBranchState]) -> Vec<String> {
    let merged_labels: HashSet<&str> = states
        .iter()
        .filter(|s| s.state == PullRequestState::Merged)
        .filter_map(|s| s.label.as_deref())
        .collect();

    states
        .iter()
        .filter(|s| s.state.is_missing_backport())
        .filter(|s| {
            s.label
                .as_deref()
                .is_none_or(|label| !merged_labels.contains(label))
        })
        .map(|s| s.branch.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::CrossReferencedPullRequest;
    use crate::targets::{resolve_label_targets, BranchLabelMapping};

    fn source_pr(labels: &[&str]) -> SourcePullRequest {
        SourcePullRequest {
            number: 123,
            url: "https://github.com/acme/widget/pull/123".to_string(),
            title: "Fix parser overflow (#123)".to_string(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            merge_commit_sha: Some("abc123".to_string()),
        }
    }

    fn label_targets(
        labels: &[&str],
        pairs: &[(&str, &str)],
        source_branch: &str,
    ) -> Vec<LabelTarget> {
        let mapping = BranchLabelMapping::from_pairs(pairs.iter().copied()).unwrap();
        let labels: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
        resolve_label_targets(&labels, &mapping, source_branch)
    }

    fn backport_candidate(branch: &str, state: PullRequestState) -> TimelineItem {
        TimelineItem::PullRequest(CrossReferencedPullRequest {
            number: 200,
            url: "https://github.com/acme/widget/pull/200".to_string(),
            title: format!("[{branch}] Fix parser overflow (#123)"),
            state,
            base_branch: branch.to_string(),
            repo_owner: "acme".to_string(),
            repo_name: "widget".to_string(),
            merge_commit_sha: None,
            commit_message_lines: Vec::new(),
        })
    }

    fn input<'a>(
        source_pr: Option<&'a SourcePullRequest>,
        timeline: &'a [TimelineItem],
        targets: Vec<LabelTarget>,
    ) -> ReconcileInput<'a> {
        ReconcileInput {
            source_pull_request: source_pr,
            timeline,
            label_targets: targets,
            commit_message_line: "Fix parser overflow",
            repo_owner: "acme",
            repo_name: "widget",
        }
    }

    #[test]
    fn no_source_pull_request_short_circuits() {
        let targets = label_targets(&["v7.9.0"], &[(r"^v7\.9\.0$", "7.x")], "main");
        let states = reconcile_target_states(&input(None, &[], targets));
        assert!(states.is_empty());
    }

    #[test]
    fn label_only_branch_is_not_created() {
        let pr = source_pr(&["v7.9.0"]);
        let targets = label_targets(&["v7.9.0"], &[(r"^v7\.9\.0$", "7.x")], "main");
        let states = reconcile_target_states(&input(Some(&pr), &[], targets));

        assert_eq!(states.len(), 1);
        assert_eq!(states[0].branch, "7.x");
        assert_eq!(states[0].label.as_deref(), Some("v7.9.0"));
        assert_eq!(states[0].state, PullRequestState::NotCreated);

        let suggested = suggested_target_branches(&states);
        assert_eq!(suggested, ["7.x"]);
    }

    #[test]
    fn source_branch_target_is_merged_with_source_pr_details() {
        let pr = source_pr(&["v8.0.0"]);
        let targets = label_targets(&["v8.0.0"], &[(r"^v8\.0\.0$", "main")], "main");
        let states = reconcile_target_states(&input(Some(&pr), &[], targets));

        assert_eq!(states.len(), 1);
        assert_eq!(states[0].state, PullRequestState::Merged);
        assert_eq!(states[0].number, Some(123));
        assert_eq!(states[0].merge_commit_sha.as_deref(), Some("abc123"));
    }

    #[test]
    fn existing_pull_request_state_wins_over_label_state() {
        let pr = source_pr(&["v7.9.0"]);
        let timeline = [backport_candidate("7.x", PullRequestState::Open)];
        let targets = label_targets(&["v7.9.0"], &[(r"^v7\.9\.0$", "7.x")], "main");
        let states = reconcile_target_states(&input(Some(&pr), &timeline, targets));

        assert_eq!(states.len(), 1);
        assert_eq!(states[0].state, PullRequestState::Open);
        assert_eq!(states[0].number, Some(200));
        // Label annotations survive the merge.
        assert_eq!(states[0].label.as_deref(), Some("v7.9.0"));
    }

    #[test]
    fn pull_request_only_branches_are_appended() {
        let pr = source_pr(&[]);
        let timeline = [backport_candidate("6.8", PullRequestState::Merged)];
        let states = reconcile_target_states(&input(Some(&pr), &timeline, Vec::new()));

        assert_eq!(states.len(), 1);
        assert_eq!(states[0].branch, "6.8");
        assert_eq!(states[0].state, PullRequestState::Merged);
        assert!(states[0].label.is_none());
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let pr = source_pr(&["v7.9.0", "v7.1.0"]);
        let timeline = [backport_candidate("7.x", PullRequestState::Open)];
        let targets = || {
            label_targets(
                &["v7.9.0", "v7.1.0"],
                &[(r"^v7\.9\.0$", "7.x"), (r"^v(\d+)\.(\d+)\.\d+$", "$1.$2")],
                "main",
            )
        };

        let first = reconcile_target_states(&input(Some(&pr), &timeline, targets()));
        let second = reconcile_target_states(&input(Some(&pr), &timeline, targets()));

        assert_eq!(first, second);
    }

    #[test]
    fn no_duplicate_branch_keys() {
        let pr = source_pr(&["v7.9.0", "auto-backport-7x"]);
        let timeline = [
            backport_candidate("7.x", PullRequestState::Open),
            backport_candidate("7.x", PullRequestState::Merged),
        ];
        let targets = label_targets(
            &["v7.9.0", "auto-backport-7x"],
            &[(r"^v7\.9\.0$", "7.x"), (r"^auto-backport-7x$", "7.x")],
            "main",
        );

        let states = reconcile_target_states(&input(Some(&pr), &timeline, targets));

        let mut branches: Vec<&str> = states.iter().map(|s| s.branch.as_str()).collect();
        branches.sort_unstable();
        branches.dedup();
        assert_eq!(branches.len(), states.len());
    }

    #[test]
    fn suggested_branches_follow_label_order() {
        let pr = source_pr(&["v7.2.0", "v7.1.0"]);
        let targets = label_targets(
            &["v7.2.0", "v7.1.0"],
            &[(r"^v(\d+)\.(\d+)\.\d+$", "$1.$2")],
            "main",
        );
        let states = reconcile_target_states(&input(Some(&pr), &[], targets));

        assert_eq!(suggested_target_branches(&states), ["7.2", "7.1"]);
    }

    #[test]
    fn merged_label_is_not_resuggested() {
        // A backport already merged under the same label (e.g. via an earlier
        // mapping revision) suppresses the re-suggestion of that label's
        // current branch.
        let state = |branch: &str, state, label: Option<&str>| TargetBranchState {
            branch: branch.to_string(),
            state,
            label: label.map(str::to_string),
            label_pattern: None,
            number: None,
            url: None,
            merge_commit_sha: None,
        };

        let states = vec![
            state("7.9", PullRequestState::NotCreated, Some("v7.9.0")),
            state("7.x", PullRequestState::Merged, Some("v7.9.0")),
            state("6.8", PullRequestState::NotCreated, Some("v6.8.2")),
        ];

        assert_eq!(suggested_target_branches(&states), ["6.8"]);
    }
}
