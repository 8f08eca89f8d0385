//! Pull request templating.
//!
//! This module renders backport pull request titles and bodies with
//! Handlebars and derives the head branch name for a backport.

mod error;
mod renderer;

pub use error::TemplateError;
pub use renderer::{create_handlebars_registry, TemplateRenderer, DEFAULT_PR_BODY, DEFAULT_PR_TITLE};

use crate::commit::Commit;
use bstr::ByteSlice;

/// Generates the head branch name for a backport pull request.
///
/// Format: "backport/{target_branch}/pr-123" for commits that landed through
/// a pull request, "backport/{target_branch}/commit-abcdef12" otherwise.
/// Multiple commits are joined with `_`.
#[must_use]
pub fn generate_head_branch_name(target_branch: &str, commits: &[Commit]) -> String {
    let refs = commits
        .iter()
        .map(|commit| match &commit.source_pull_request {
            Some(pr) => format!("pr-{}", pr.number),
            None => format!("commit-{}", commit.short_sha()),
        })
        .collect::<Vec<_>>()
        .join("_");

    format!("backport/{target_branch}/{refs}")
}

/// Checks that a name is usable as a git branch name.
///
/// Branch names computed from label templates are user-controlled regex
/// replacements; this rejects names git itself would refuse.
#[must_use]
pub fn is_valid_branch_name(name: &str) -> bool {
    !name.is_empty() && gix_validate::reference::name_partial(name.as_bytes().as_bstr()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{CommitAuthor, CommitPayload, SourcePullRequest};
    use chrono::{TimeZone, Utc};

    fn commit(sha: &str, pr_number: Option<u64>) -> Commit {
        Commit::from_payload(
            CommitPayload {
                sha: sha.to_string(),
                message: "Fix parser overflow".to_string(),
                committed_date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                author: CommitAuthor {
                    name: "Jules".to_string(),
                    email: "jules@example.com".to_string(),
                },
                source_branch: "main".to_string(),
                source_pull_request: pr_number.map(|number| SourcePullRequest {
                    number,
                    url: format!("https://github.com/acme/widget/pull/{number}"),
                    title: "Fix parser overflow".to_string(),
                    labels: Vec::new(),
                    merge_commit_sha: None,
                }),
                timeline: Vec::new(),
            },
            None,
            "acme",
            "widget",
        )
    }

    #[test]
    fn head_branch_from_pull_request_number() {
        let branch = generate_head_branch_name("7.x", &[commit("abc123def456", Some(123))]);
        assert_eq!(branch, "backport/7.x/pr-123");
    }

    #[test]
    fn head_branch_from_sha_without_pull_request() {
        let branch = generate_head_branch_name("7.x", &[commit("abc123def456", None)]);
        assert_eq!(branch, "backport/7.x/commit-abc123de");
    }

    #[test]
    fn head_branch_joins_multiple_commits() {
        let commits = [commit("abc123def456", Some(123)), commit("fedcba987654", Some(124))];
        let branch = generate_head_branch_name("7.x", &commits);
        assert_eq!(branch, "backport/7.x/pr-123_pr-124");
    }

    #[test]
    fn validates_branch_names() {
        assert!(is_valid_branch_name("backport/7.x/pr-123"));
        assert!(is_valid_branch_name("7.9"));
        assert!(!is_valid_branch_name(""));
        assert!(!is_valid_branch_name("has space"));
        assert!(!is_valid_branch_name("double..dot"));
    }
}
