//! Pull request template renderer.

use crate::commit::Commit;
use handlebars::{no_escape, Handlebars};
use serde_json::{json, Value};

/// Default pull request title template.
pub const DEFAULT_PR_TITLE: &str = "[{{target_branch}}] {{commit_messages}}";

/// Default pull request body template.
pub const DEFAULT_PR_BODY: &str = "# Backport

This will backport the following commits from `{{source_branch}}` to `{{target_branch}}`:

{{commit_list}}
";

/// Creates a configured Handlebars registry.
///
/// The registry is configured with:
/// - No HTML escaping (for markdown output)
/// - Strict mode (catches missing variables)
#[must_use]
pub fn create_handlebars_registry() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();

    // Disable HTML escaping for markdown output
    hbs.register_escape_fn(no_escape);

    // Enable strict mode to catch missing variables
    hbs.set_strict_mode(true);

    hbs
}

/// Renderer for pull request titles and bodies.
pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Creates a new template renderer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlebars: create_handlebars_registry(),
        }
    }

    /// Renders a pull request title for one target branch.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render_pr_title(
        &self,
        template: &str,
        commits: &[Commit],
        source_branch: &str,
        target_branch: &str,
    ) -> Result<String, super::TemplateError> {
        let data = template_data(commits, source_branch, target_branch);
        Ok(self.handlebars.render_template(template, &data)?)
    }

    /// Renders a pull request body for one target branch.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render_pr_body(
        &self,
        template: &str,
        commits: &[Commit],
        source_branch: &str,
        target_branch: &str,
    ) -> Result<String, super::TemplateError> {
        let data = template_data(commits, source_branch, target_branch);
        Ok(self.handlebars.render_template(template, &data)?)
    }
}

/// Builds the variable set shared by title and body templates.
fn template_data(commits: &[Commit], source_branch: &str, target_branch: &str) -> Value {
    let commit_messages = commits
        .iter()
        .map(Commit::message_line)
        .collect::<Vec<_>>()
        .join(" | ");

    let commit_list = commits
        .iter()
        .map(|commit| match &commit.source_pull_request {
            Some(pr) => format!("- {} ([#{}]({}))", commit.message_line(), pr.number, pr.url),
            None => format!("- {} ({})", commit.message_line(), commit.short_sha()),
        })
        .collect::<Vec<_>>()
        .join("\n");

    json!({
        "source_branch": source_branch,
        "target_branch": target_branch,
        "commit_messages": commit_messages,
        "commit_list": commit_list,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{CommitAuthor, CommitPayload, SourcePullRequest};
    use chrono::{TimeZone, Utc};

    fn commit(message: &str, pr_number: Option<u64>) -> Commit {
        Commit::from_payload(
            CommitPayload {
                sha: "abc123def456".to_string(),
                message: message.to_string(),
                committed_date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                author: CommitAuthor {
                    name: "Jules".to_string(),
                    email: "jules@example.com".to_string(),
                },
                source_branch: "main".to_string(),
                source_pull_request: pr_number.map(|number| SourcePullRequest {
                    number,
                    url: format!("https://github.com/acme/widget/pull/{number}"),
                    title: message.to_string(),
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
    fn renders_default_title() {
        let renderer = TemplateRenderer::new();
        let commits = vec![commit("Fix parser overflow", Some(123))];

        let title = renderer
            .render_pr_title(DEFAULT_PR_TITLE, &commits, "main", "7.x")
            .unwrap();

        assert_eq!(title, "[7.x] Fix parser overflow");
    }

    #[test]
    fn joins_multiple_commit_messages() {
        let renderer = TemplateRenderer::new();
        let commits = vec![
            commit("Fix parser overflow", Some(123)),
            commit("Add parser fuzz tests", Some(124)),
        ];

        let title = renderer
            .render_pr_title(DEFAULT_PR_TITLE, &commits, "main", "7.x")
            .unwrap();

        assert_eq!(title, "[7.x] Fix parser overflow | Add parser fuzz tests");
    }

    #[test]
    fn body_lists_commits_with_pr_links() {
        let renderer = TemplateRenderer::new();
        let commits = vec![commit("Fix parser overflow", Some(123))];

        let body = renderer
            .render_pr_body(DEFAULT_PR_BODY, &commits, "main", "7.x")
            .unwrap();

        assert!(body.contains("from `main` to `7.x`"));
        assert!(body
            .contains("- Fix parser overflow ([#123](https://github.com/acme/widget/pull/123))"));
    }

    #[test]
    fn body_falls_back_to_short_sha_without_pr() {
        let renderer = TemplateRenderer::new();
        let commits = vec![commit("Fix parser overflow", None)];

        let body = renderer
            .render_pr_body(DEFAULT_PR_BODY, &commits, "main", "7.x")
            .unwrap();

        assert!(body.contains("- Fix parser overflow (abc123de)"));
    }
}
