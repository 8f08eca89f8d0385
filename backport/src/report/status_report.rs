//! Status report rendering.
//!
//! The report is a markdown comment posted on the source pull request: a
//! header classifying the run, one table row per target branch, and the
//! manual retry command when something is left to do.

use super::result::{BackportResult, BackportResponse};
use crate::commit::Commit;

/// Controls whether and how a status report is rendered.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Emit a report when every branch succeeded.
    pub on_success: bool,

    /// Emit a report when one or more branches failed.
    pub on_failure: bool,

    /// Emit a report when the run was aborted without target branches.
    pub on_abort: bool,

    /// Suppress all reports.
    pub dry_run: bool,

    /// Repository in `owner/name` form, for the retry command.
    pub repo: String,
}

/// Renders the status report body, or `None` when reporting is suppressed
/// for this outcome.
#[must_use]
pub fn status_report_body(response: &BackportResponse, options: &ReportOptions) -> Option<String> {
    if options.dry_run {
        return None;
    }

    match response {
        BackportResponse::Success { commits, results } => {
            let succeeded = results.iter().filter(|r| r.is_success()).count();
            let all_succeeded = succeeded == results.len() && !results.is_empty();

            let emit = if all_succeeded {
                options.on_success
            } else {
                options.on_failure
            };
            if !emit {
                return None;
            }

            let header = if all_succeeded {
                "## 💚 All backports created successfully"
            } else if succeeded > 0 {
                "## 💔 Some backports could not be created"
            } else {
                "## 💔 All backports failed"
            };

            let mut body = String::from(header);
            body.push_str("\n\n");
            body.push_str(&results_table(results));

            if !all_succeeded {
                let failed: Vec<&str> = results
                    .iter()
                    .filter(|r| !r.is_success())
                    .map(BackportResult::target_branch)
                    .collect();
                body.push('\n');
                body.push_str(&manual_backport_block(commits, &failed, &options.repo));
            }

            Some(body)
        }
        BackportResponse::Aborted { commits, error } => {
            if !options.on_abort {
                return None;
            }

            let mut body = String::from("## ⏭️ Backport skipped: no target branches\n\n");
            body.push_str(&first_line(&error.to_string()));
            body.push('\n');
            body.push('\n');
            body.push_str(&manual_backport_block(commits, &[], &options.repo));
            Some(body)
        }
        BackportResponse::Failure { commits, error } => {
            if !options.on_failure {
                return None;
            }

            let mut body = String::from("## 💔 Backport failed\n\n");
            body.push_str(&first_line(&error.to_string()));
            body.push('\n');
            body.push('\n');
            body.push_str(&manual_backport_block(commits, &[], &options.repo));
            Some(body)
        }
    }
}

/// One markdown table over all per-branch results.
fn results_table(results: &[BackportResult]) -> String {
    let mut table = String::from("| Status | Branch | Result |\n|:------:|:------:|:------|\n");

    for result in results {
        match result {
            BackportResult::Success {
                target_branch,
                pull_request_number,
                pull_request_url,
            } => {
                table.push_str(&format!(
                    "| ✅ | {target_branch} | [#{pull_request_number}]({pull_request_url}) |\n"
                ));
            }
            BackportResult::Failure {
                target_branch,
                error,
            } => {
                table.push_str(&format!(
                    "| ❌ | {target_branch} | {} |\n",
                    first_line(&error.to_string())
                ));
            }
        }
    }

    table
}

/// The copy-pastable retry command for the branches still missing.
fn manual_backport_block(commits: &[Commit], failed_branches: &[&str], repo: &str) -> String {
    let mut command = format!("backport --repo {repo}");

    let mut seen_pr = None;
    for commit in commits {
        match &commit.source_pull_request {
            Some(pr) if seen_pr != Some(pr.number) => {
                command.push_str(&format!(" --pr {}", pr.number));
                seen_pr = Some(pr.number);
            }
            Some(_) => {}
            None => command.push_str(&format!(" --sha {}", commit.sha)),
        }
    }

    for branch in failed_branches {
        command.push_str(&format!(" --branch {branch}"));
    }

    format!("To backport manually, run:\n\n```\n{command}\n```\n")
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or("").to_string()
}
