//! Octocrab-backed implementation of [`GitHubApi`].

use super::payload::{
    self, RestCommit, RestPullRequest, RestPullRequestCommit, RestRepoInfo, RestReview,
    RestTimelineEvent,
};
use super::{GitHubApi, GitHubError, MergeMethod, PullRequestSummary};
use crate::commit::{CommitAuthor, CommitPayload, TimelineItem};
use crate::rate_limit::ensure_core_rate_limit;
use async_trait::async_trait;
use octocrab::Octocrab;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// Maximum cross-referencing timeline items considered per commit.
const MAX_TIMELINE_ITEMS: usize = 20;

/// GitHub client bound to one repository.
pub struct OctocrabClient {
    octocrab: Octocrab,
    owner: String,
    name: String,
}

impl OctocrabClient {
    /// Builds a client for `owner/name` authenticated with a personal token.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying client cannot be constructed.
    pub fn new(
        token: String,
        owner: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, GitHubError> {
        let octocrab = Octocrab::builder().personal_token(token).build()?;
        Ok(Self {
            octocrab,
            owner: owner.into(),
            name: name.into(),
        })
    }

    fn route(&self, tail: &str) -> String {
        format!("/repos/{}/{}/{tail}", self.owner, self.name)
    }

    fn pull_request_url(&self, number: u64, html_url: Option<&Url>) -> String {
        html_url.map(Url::to_string).unwrap_or_else(|| {
            format!(
                "https://github.com/{}/{}/pull/{number}",
                self.owner, self.name
            )
        })
    }

    /// Resolves a cross-referencing pull request to a timeline item.
    async fn fetch_referenced_pull_request(
        &self,
        number: u64,
    ) -> Result<TimelineItem, GitHubError> {
        let pr: RestPullRequest = self
            .octocrab
            .get(self.route(&format!("pulls/{number}")), None::<&()>)
            .await?;

        let commits: Vec<RestPullRequestCommit> = match self
            .octocrab
            .get(
                self.route(&format!("pulls/{number}/commits?per_page=100")),
                None::<&()>,
            )
            .await
        {
            Ok(commits) => commits,
            Err(err) => {
                warn!(number, error = %err, "Failed to list pull request commits");
                Vec::new()
            }
        };

        Ok(payload::to_timeline_item(
            &pr,
            &commits,
            &self.owner,
            &self.name,
        ))
    }

    /// Fetches the bounded cross-reference timeline of a pull request.
    async fn fetch_timeline(&self, pr_number: u64) -> Vec<TimelineItem> {
        let events: Vec<RestTimelineEvent> = match self
            .octocrab
            .get(
                self.route(&format!(
                    "issues/{pr_number}/timeline?per_page={MAX_TIMELINE_ITEMS}"
                )),
                None::<&()>,
            )
            .await
        {
            Ok(events) => events,
            Err(err) => {
                warn!(pr_number, error = %err, "Failed to fetch timeline");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for event in events.iter().take(MAX_TIMELINE_ITEMS) {
            let Some(number) = event.cross_referenced_pull_request() else {
                items.push(TimelineItem::Other);
                continue;
            };

            if !seen.insert(number) {
                continue;
            }

            match self.fetch_referenced_pull_request(number).await {
                Ok(item) => items.push(item),
                Err(err) => {
                    warn!(number, error = %err, "Failed to resolve cross-referenced pull request");
                    items.push(TimelineItem::Other);
                }
            }
        }

        items
    }
}

#[async_trait]
impl GitHubApi for OctocrabClient {
    async fn fetch_commit_payload(&self, reference: &str) -> Result<CommitPayload, GitHubError> {
        debug!(reference, "Fetching commit");

        let rest_commit: RestCommit = self
            .octocrab
            .get(self.route(&format!("commits/{reference}")), None::<&()>)
            .await
            .map_err(|err| {
                if is_not_found(&err) {
                    GitHubError::CommitNotFound {
                        reference: reference.to_string(),
                    }
                } else {
                    err.into()
                }
            })?;

        let associated: Vec<RestPullRequest> = match self
            .octocrab
            .get(
                self.route(&format!("commits/{}/pulls", rest_commit.sha)),
                None::<&()>,
            )
            .await
        {
            Ok(pulls) => pulls,
            Err(err) => {
                warn!(sha = %rest_commit.sha, error = %err, "Failed to list pull requests for commit");
                Vec::new()
            }
        };

        let source_pr = associated
            .iter()
            .find(|pr| pr.merge_commit_sha.as_deref() == Some(rest_commit.sha.as_str()))
            .or_else(|| associated.iter().find(|pr| pr.merged_at.is_some()))
            .or_else(|| associated.first());

        let source_branch = match source_pr {
            Some(pr) => pr.base.branch.clone(),
            None => {
                let repo: RestRepoInfo = self
                    .octocrab
                    .get(format!("/repos/{}/{}", self.owner, self.name), None::<&()>)
                    .await?;
                repo.default_branch
            }
        };

        let timeline = match source_pr {
            Some(pr) => self.fetch_timeline(pr.number).await,
            None => Vec::new(),
        };

        let (name, email) = rest_commit.author_identity();

        Ok(CommitPayload {
            sha: rest_commit.sha.clone(),
            message: rest_commit.commit.message.clone(),
            committed_date: rest_commit.committed_date(),
            author: CommitAuthor { name, email },
            source_branch,
            source_pull_request: source_pr.map(payload::to_source_pull_request),
            timeline,
        })
    }

    async fn fetch_pull_request_merge_commit(&self, number: u64) -> Result<String, GitHubError> {
        let pr: RestPullRequest = self
            .octocrab
            .get(self.route(&format!("pulls/{number}")), None::<&()>)
            .await?;

        pr.merge_commit_sha
            .ok_or_else(|| GitHubError::MalformedResponse {
                message: format!("pull request #{number} has no merge commit"),
            })
    }

    async fn validate_branch_exists(&self, branch: &str) -> Result<bool, GitHubError> {
        let result: Result<serde_json::Value, octocrab::Error> = self
            .octocrab
            .get(self.route(&format!("branches/{branch}")), None::<&()>)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn authenticated_user(&self) -> Result<String, GitHubError> {
        let user = self.octocrab.current().user().await?;
        Ok(user.login)
    }

    async fn create_pull_request(
        &self,
        base: &str,
        head: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestSummary, GitHubError> {
        ensure_core_rate_limit(&self.octocrab).await?;

        let created = self
            .octocrab
            .pulls(&self.owner, &self.name)
            .create(title, head, base)
            .body(body)
            .send()
            .await;

        match created {
            Ok(pr) => Ok(PullRequestSummary {
                number: pr.number,
                url: self.pull_request_url(pr.number, pr.html_url.as_ref()),
            }),
            Err(err) if is_already_exists(&err) => {
                debug!(head, base, "Pull request already exists, reusing it");

                // The list filter requires a fully qualified head.
                let head_filter = if head.contains(':') {
                    head.to_string()
                } else {
                    format!("{}:{head}", self.owner)
                };

                let existing = self
                    .octocrab
                    .pulls(&self.owner, &self.name)
                    .list()
                    .head(head_filter)
                    .base(base)
                    .per_page(1)
                    .send()
                    .await?;

                let pr = existing.items.into_iter().next().ok_or_else(|| {
                    GitHubError::MalformedResponse {
                        message: format!(
                            "pull request for {head} -> {base} reported as existing but not found"
                        ),
                    }
                })?;

                Ok(PullRequestSummary {
                    number: pr.number,
                    url: self.pull_request_url(pr.number, pr.html_url.as_ref()),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn add_labels(&self, pr_number: u64, labels: &[String]) -> Result<(), GitHubError> {
        ensure_core_rate_limit(&self.octocrab).await?;
        self.octocrab
            .issues(&self.owner, &self.name)
            .add_labels(pr_number, labels)
            .await?;
        Ok(())
    }

    async fn add_reviewers(&self, pr_number: u64, reviewers: &[String]) -> Result<(), GitHubError> {
        ensure_core_rate_limit(&self.octocrab).await?;
        self.octocrab
            .pulls(&self.owner, &self.name)
            .request_reviews(pr_number, reviewers.to_vec(), Vec::<String>::new())
            .await?;
        Ok(())
    }

    async fn fetch_pr_reviewers(&self, pr_number: u64) -> Result<Vec<String>, GitHubError> {
        let reviews: Vec<RestReview> = self
            .octocrab
            .get(
                self.route(&format!("pulls/{pr_number}/reviews")),
                None::<&()>,
            )
            .await?;

        let mut reviewers = Vec::new();
        for review in reviews {
            let Some(user) = review.user else { continue };
            if !reviewers.contains(&user.login) {
                reviewers.push(user.login);
            }
        }

        Ok(reviewers)
    }

    async fn enable_auto_merge(
        &self,
        pr_number: u64,
        method: MergeMethod,
    ) -> Result<(), GitHubError> {
        let pr: RestPullRequest = self
            .octocrab
            .get(self.route(&format!("pulls/{pr_number}")), None::<&()>)
            .await?;

        let node_id = pr.node_id.ok_or_else(|| GitHubError::MalformedResponse {
            message: format!("pull request #{pr_number} has no node id"),
        })?;

        let mutation = r"mutation($pullRequestId: ID!, $mergeMethod: PullRequestMergeMethod!) {
            enablePullRequestAutoMerge(input: {pullRequestId: $pullRequestId, mergeMethod: $mergeMethod}) {
                clientMutationId
            }
        }";

        let request = serde_json::json!({
            "query": mutation,
            "variables": {
                "pullRequestId": node_id,
                "mergeMethod": method.as_graphql(),
            },
        });

        let response: serde_json::Value = match self.octocrab.graphql(&request).await {
            Ok(response) => response,
            Err(err) => {
                let message = err.to_string();
                if is_auto_merge_unavailable(&message) {
                    return Err(GitHubError::AutoMergeNotAllowed { message });
                }
                return Err(err.into());
            }
        };

        if let Some(errors) = response.get("errors").and_then(|errors| errors.as_array()) {
            let message = errors
                .iter()
                .filter_map(|error| error.get("message").and_then(|m| m.as_str()))
                .collect::<Vec<_>>()
                .join("; ");

            if is_auto_merge_unavailable(&message) {
                return Err(GitHubError::AutoMergeNotAllowed { message });
            }

            return Err(GitHubError::MalformedResponse {
                message: format!("enablePullRequestAutoMerge failed: {message}"),
            });
        }

        Ok(())
    }

    async fn merge_now(&self, pr_number: u64, method: MergeMethod) -> Result<(), GitHubError> {
        ensure_core_rate_limit(&self.octocrab).await?;
        self.octocrab
            .pulls(&self.owner, &self.name)
            .merge(pr_number)
            .method(octocrab_merge_method(method))
            .send()
            .await?;
        Ok(())
    }

    async fn post_comment(&self, issue_number: u64, body: &str) -> Result<(), GitHubError> {
        ensure_core_rate_limit(&self.octocrab).await?;
        self.octocrab
            .issues(&self.owner, &self.name)
            .create_comment(issue_number, body)
            .await?;
        Ok(())
    }
}

fn octocrab_merge_method(method: MergeMethod) -> octocrab::params::pulls::MergeMethod {
    match method {
        MergeMethod::Merge => octocrab::params::pulls::MergeMethod::Merge,
        MergeMethod::Squash => octocrab::params::pulls::MergeMethod::Squash,
        MergeMethod::Rebase => octocrab::params::pulls::MergeMethod::Rebase,
    }
}

/// Checks if an error is a 404 from GitHub.
fn is_not_found(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 404
    )
}

/// Checks if an error indicates the pull request already exists.
fn is_already_exists(error: &octocrab::Error) -> bool {
    match error {
        octocrab::Error::GitHub { source, .. } => {
            let message = source.to_string().to_lowercase();
            message.contains("already exists")
        }
        _ => false,
    }
}

/// Checks if a GraphQL failure means auto-merge prerequisites are missing
/// on the target branch, as opposed to an arbitrary API failure.
fn is_auto_merge_unavailable(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("not in the correct state")
        || message.contains("status check")
        || message.contains("protected branch")
        || message.contains("auto merge is not allowed")
        || message.contains("auto-merge is not allowed")
}
