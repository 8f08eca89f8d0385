//! Wire payloads for the GitHub read paths.
//!
//! GitHub's timeline responses are polymorphic: issues, commits and pull
//! requests all arrive in one envelope distinguished by a tag. This module
//! is the only place that sees those tags; everything is collapsed into the
//! closed [`TimelineItem`] variants before leaving it.

use crate::commit::{CrossReferencedPullRequest, SourcePullRequest, TimelineItem};
use crate::reconcile::PullRequestState;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

/// `GET /repos/{owner}/{repo}`, reduced to the fields we read.
#[derive(Debug, Deserialize)]
pub(crate) struct RestRepoInfo {
    pub default_branch: String,
}

/// `GET /repos/{owner}/{repo}/commits/{ref}`.
#[derive(Debug, Deserialize)]
pub(crate) struct RestCommit {
    pub sha: String,
    pub commit: RestCommitDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestCommitDetail {
    pub message: String,
    pub author: Option<RestGitUser>,
    pub committer: Option<RestGitUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestGitUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub date: Option<DateTime<Utc>>,
}

impl RestCommit {
    /// Author name/email, preferring the author over the committer.
    pub(crate) fn author_identity(&self) -> (String, String) {
        let user = self.commit.author.as_ref().or(self.commit.committer.as_ref());
        match user {
            Some(user) => (user.name.clone(), user.email.clone()),
            None => (String::new(), String::new()),
        }
    }

    /// Commit date, preferring the committer date over the author date.
    pub(crate) fn committed_date(&self) -> DateTime<Utc> {
        self.commit
            .committer
            .as_ref()
            .and_then(|user| user.date)
            .or_else(|| self.commit.author.as_ref().and_then(|user| user.date))
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// `GET /repos/{owner}/{repo}/pulls/{number}` and friends.
#[derive(Debug, Deserialize)]
pub(crate) struct RestPullRequest {
    pub number: u64,
    pub node_id: Option<String>,
    pub title: String,
    pub state: String,
    pub merged_at: Option<DateTime<Utc>>,
    pub merge_commit_sha: Option<String>,
    pub html_url: Option<Url>,
    pub base: RestBaseRef,
    #[serde(default)]
    pub labels: Vec<RestLabel>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestBaseRef {
    #[serde(rename = "ref")]
    pub branch: String,
    pub repo: Option<RestRepoRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestRepoRef {
    pub name: String,
    pub owner: RestAccount,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestAccount {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestLabel {
    pub name: String,
}

/// `GET /repos/{owner}/{repo}/pulls/{number}/commits`.
#[derive(Debug, Deserialize)]
pub(crate) struct RestPullRequestCommit {
    pub commit: RestPullRequestCommitDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestPullRequestCommitDetail {
    pub message: String,
}

/// `GET /repos/{owner}/{repo}/pulls/{number}/reviews`.
#[derive(Debug, Deserialize)]
pub(crate) struct RestReview {
    pub user: Option<RestAccount>,
}

/// `GET /repos/{owner}/{repo}/issues/{number}/timeline`.
///
/// Only `cross-referenced` events carry a source; everything else is noise
/// as far as backport detection is concerned.
#[derive(Debug, Deserialize)]
pub(crate) struct RestTimelineEvent {
    #[serde(default)]
    pub event: String,
    pub source: Option<RestTimelineSource>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestTimelineSource {
    pub issue: Option<RestTimelineIssue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestTimelineIssue {
    pub number: u64,
    /// Present when the referencing issue is actually a pull request.
    pub pull_request: Option<serde_json::Value>,
}

impl RestTimelineEvent {
    /// Returns the referencing pull request number, when this event is a
    /// cross-reference from a pull request.
    pub(crate) fn cross_referenced_pull_request(&self) -> Option<u64> {
        if self.event != "cross-referenced" {
            return None;
        }
        let issue = self.source.as_ref()?.issue.as_ref()?;
        issue.pull_request.as_ref()?;
        Some(issue.number)
    }
}

/// Collapses the REST pull request state into the internal state enum.
pub(crate) fn pull_request_state(pr: &RestPullRequest) -> PullRequestState {
    if pr.merged_at.is_some() {
        PullRequestState::Merged
    } else if pr.state == "closed" {
        PullRequestState::Closed
    } else {
        PullRequestState::Open
    }
}

/// Builds the internal source pull request record.
pub(crate) fn to_source_pull_request(pr: &RestPullRequest) -> SourcePullRequest {
    let mut labels: Vec<String> = Vec::new();
    for label in &pr.labels {
        if !labels.contains(&label.name) {
            labels.push(label.name.clone());
        }
    }

    SourcePullRequest {
        number: pr.number,
        url: pr
            .html_url
            .as_ref()
            .map(Url::to_string)
            .unwrap_or_default(),
        title: pr.title.clone(),
        labels,
        merge_commit_sha: pr.merge_commit_sha.clone(),
    }
}

/// Builds a timeline item from a cross-referencing pull request and its
/// commit list. The repository falls back to the queried repository when
/// the payload omits it.
pub(crate) fn to_timeline_item(
    pr: &RestPullRequest,
    commits: &[RestPullRequestCommit],
    fallback_owner: &str,
    fallback_name: &str,
) -> TimelineItem {
    let (repo_owner, repo_name) = match &pr.base.repo {
        Some(repo) => (repo.owner.login.clone(), repo.name.clone()),
        None => (fallback_owner.to_string(), fallback_name.to_string()),
    };

    TimelineItem::PullRequest(CrossReferencedPullRequest {
        number: pr.number,
        url: pr
            .html_url
            .as_ref()
            .map(Url::to_string)
            .unwrap_or_default(),
        title: pr.title.clone(),
        state: pull_request_state(pr),
        base_branch: pr.base.branch.clone(),
        repo_owner,
        repo_name,
        merge_commit_sha: pr.merge_commit_sha.clone(),
        commit_message_lines: commits
            .iter()
            .map(|c| c.commit.message.lines().next().unwrap_or("").to_string())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pull_request_json(state: &str, merged_at: Option<&str>) -> RestPullRequest {
        let merged = merged_at
            .map(|at| format!("\"{at}\""))
            .unwrap_or_else(|| "null".to_string());
        serde_json::from_str(&format!(
            r#"{{
                "number": 200,
                "node_id": "PR_abc",
                "title": "[7.x] Fix parser overflow (#123)",
                "state": "{state}",
                "merged_at": {merged},
                "merge_commit_sha": null,
                "html_url": "https://github.com/acme/widget/pull/200",
                "base": {{
                    "ref": "7.x",
                    "repo": {{ "name": "widget", "owner": {{ "login": "acme" }} }}
                }},
                "labels": [{{ "name": "backport" }}, {{ "name": "backport" }}]
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn merged_state_takes_precedence_over_closed() {
        let pr = pull_request_json("closed", Some("2024-03-01T12:00:00Z"));
        assert_eq!(pull_request_state(&pr), PullRequestState::Merged);
    }

    #[test]
    fn closed_without_merge_is_closed() {
        let pr = pull_request_json("closed", None);
        assert_eq!(pull_request_state(&pr), PullRequestState::Closed);
    }

    #[test]
    fn source_pull_request_labels_are_deduplicated_in_order() {
        let pr = pull_request_json("open", None);
        let source = to_source_pull_request(&pr);
        assert_eq!(source.labels, ["backport"]);
    }

    #[test]
    fn only_cross_referenced_pull_requests_are_recognized() {
        let event: RestTimelineEvent = serde_json::from_str(
            r#"{
                "event": "cross-referenced",
                "source": { "issue": { "number": 200, "pull_request": {} } }
            }"#,
        )
        .unwrap();
        assert_eq!(event.cross_referenced_pull_request(), Some(200));

        let issue_event: RestTimelineEvent = serde_json::from_str(
            r#"{
                "event": "cross-referenced",
                "source": { "issue": { "number": 300 } }
            }"#,
        )
        .unwrap();
        assert_eq!(issue_event.cross_referenced_pull_request(), None);

        let labeled: RestTimelineEvent = serde_json::from_str(r#"{ "event": "labeled" }"#).unwrap();
        assert_eq!(labeled.cross_referenced_pull_request(), None);
    }
}
