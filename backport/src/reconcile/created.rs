//! Classification of cross-referenced pull requests as existing backports.

use super::state::PullRequestState;
use crate::commit::{CrossReferencedPullRequest, TimelineItem};
use std::collections::HashSet;

/// An existing pull request recognized as a backport of the source commit,
/// keyed by its base branch.
#[derive(Debug, Clone)]
pub struct CreatedPullRequest {
    /// Base branch the pull request targets.
    pub branch: String,

    /// Pull request state. Never [`PullRequestState::NotCreated`].
    pub state: PullRequestState,

    /// Pull request number.
    pub number: u64,

    /// Pull request URL.
    pub url: String,

    /// Merge commit, when merged.
    pub merge_commit_sha: Option<String>,
}

/// Decides whether a cross-referenced pull request is a backport of the
/// source commit.
///
/// Two independent heuristics; either one suffices:
/// - commit identity: one of the candidate's commits has the same first
///   message line as the source commit, and the candidate lives in the same
///   repository;
/// - title containment: the candidate's title contains both the source
///   commit's first message line and the source pull request number.
pub(crate) fn is_backport_of(
    candidate: &CrossReferencedPullRequest,
    message_line: &str,
    source_pr_number: u64,
    repo_owner: &str,
    repo_name: &str,
) -> bool {
    let commit_match = candidate.repo_owner == repo_owner
        && candidate.repo_name == repo_name
        && candidate
            .commit_message_lines
            .iter()
            .any(|line| line == message_line);

    let title_match = candidate.title.contains(message_line)
        && candidate.title.contains(&format!("#{source_pr_number}"));

    commit_match || title_match
}

/// Walks the timeline and collects pull requests recognized as backports of
/// the source commit, keeping the first match per base branch.
///
/// Closed candidates are excluded up front; a closed pull request is a weak
/// signal and the branch still counts as missing a backport.
pub(crate) fn classify_created_pull_requests(
    timeline: &[TimelineItem],
    message_line: &str,
    source_pr_number: u64,
    repo_owner: &str,
    repo_name: &str,
) -> Vec<CreatedPullRequest> {
    let mut seen = HashSet::new();
    let mut created = Vec::new();

    for item in timeline {
        let TimelineItem::PullRequest(candidate) = item else {
            continue;
        };

        if candidate.state == PullRequestState::Closed {
            continue;
        }

        if !is_backport_of(
            candidate,
            message_line,
            source_pr_number,
            repo_owner,
            repo_name,
        ) {
            continue;
        }

        if !seen.insert(candidate.base_branch.clone()) {
            continue;
        }

        created.push(CreatedPullRequest {
            branch: candidate.base_branch.clone(),
            state: candidate.state,
            number: candidate.number,
            url: candidate.url.clone(),
            merge_commit_sha: candidate.merge_commit_sha.clone(),
        });
    }

    created
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, lines: &[&str]) -> CrossReferencedPullRequest {
        CrossReferencedPullRequest {
            number: 200,
            url: "https://github.com/acme/widget/pull/200".to_string(),
            title: title.to_string(),
            state: PullRequestState::Open,
            base_branch: "7.x".to_string(),
            repo_owner: "acme".to_string(),
            repo_name: "widget".to_string(),
            merge_commit_sha: None,
            commit_message_lines: lines.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn commit_identity_match_suffices() {
        let pr = candidate("unrelated title", &["Fix parser overflow"]);
        assert!(is_backport_of(&pr, "Fix parser overflow", 123, "acme", "widget"));
    }

    #[test]
    fn commit_identity_requires_same_repository() {
        let pr = candidate("unrelated title", &["Fix parser overflow"]);
        assert!(!is_backport_of(&pr, "Fix parser overflow", 123, "acme", "gadget"));
    }

    #[test]
    fn title_containment_match_suffices() {
        let pr = candidate("[7.x] Fix parser overflow (#123)", &[]);
        assert!(is_backport_of(&pr, "Fix parser overflow", 123, "other", "repo"));
    }

    #[test]
    fn title_match_requires_source_pr_number() {
        let pr = candidate("[7.x] Fix parser overflow", &[]);
        assert!(!is_backport_of(&pr, "Fix parser overflow", 123, "other", "repo"));
    }

    #[test]
    fn closed_candidates_are_excluded() {
        let mut pr = candidate("[7.x] Fix parser overflow (#123)", &[]);
        pr.state = PullRequestState::Closed;

        let created = classify_created_pull_requests(
            &[TimelineItem::PullRequest(pr)],
            "Fix parser overflow",
            123,
            "acme",
            "widget",
        );

        assert!(created.is_empty());
    }

    #[test]
    fn first_candidate_per_branch_wins() {
        let first = candidate("[7.x] Fix parser overflow (#123)", &[]);
        let mut second = candidate("[7.x] Fix parser overflow (#123)", &[]);
        second.number = 999;

        let created = classify_created_pull_requests(
            &[
                TimelineItem::PullRequest(first),
                TimelineItem::PullRequest(second),
            ],
            "Fix parser overflow",
            123,
            "acme",
            "widget",
        );

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].number, 200);
    }
}
