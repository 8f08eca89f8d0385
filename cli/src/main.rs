//! CLI for the backport tool.
//!
//! Cherry-picks merged commits onto release branches and opens a backport
//! pull request for each target branch.

use backport::{
    load_project_config, BackportError, BackportOptions, BackportResponse, BackportResult,
    BackportRunner, Commit, ConflictAutoFixer, ConflictDecision, GitHubApi, GitRepo,
    OctocrabClient, OperatorPrompt, Vcs,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Backport - cherry-pick merged commits onto release branches and open a
/// pull request for each.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Repository in owner/name form. Falls back to the config file.
    #[arg(long)]
    repo: Option<String>,

    /// GitHub Personal Access Token.
    #[arg(long, env = "GITHUB_TOKEN")]
    token: String,

    /// Commit shas to backport, in order.
    #[arg(long = "sha")]
    shas: Vec<String>,

    /// Source pull request whose merge commit is backported.
    #[arg(long)]
    pr: Option<u64>,

    /// Target branches, in processing order. Defaults to the label-derived
    /// suggestions.
    #[arg(long = "branch")]
    branches: Vec<String>,

    /// Path to the project config file.
    #[arg(long, default_value = ".backport.toml")]
    config: PathBuf,

    /// Local working copy directory. Defaults to a per-repository directory
    /// under the system temp dir.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Cherry-pick locally but do not push or open pull requests.
    #[arg(long)]
    dry_run: bool,

    /// Fail on conflicts instead of prompting.
    #[arg(long)]
    non_interactive: bool,

    /// Enable auto-merge on created pull requests.
    #[arg(long)]
    auto_merge: bool,

    /// Push the head branch to this fork owner instead of origin.
    #[arg(long)]
    fork_owner: Option<String>,

    /// Extra labels added to every backport pull request.
    #[arg(long = "label")]
    labels: Vec<String>,

    /// Copy all labels from the source pull request.
    #[arg(long)]
    copy_source_labels: bool,

    /// Copy reviewers from the source pull requests.
    #[arg(long)]
    copy_reviewers: bool,

    /// Extra reviewers requested on every backport pull request.
    #[arg(long = "reviewer")]
    reviewers: Vec<String>,

    /// Shell command invoked in the working copy to auto-fix cherry-pick
    /// conflicts.
    #[arg(long)]
    on_conflict_command: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    init_tracing();

    // Parse arguments
    let args = Args::parse();

    match run(args).await {
        Ok(response) => {
            print_response(&response);

            // Only a top-level failure is a non-zero exit; an aborted run
            // (no target branches) exits cleanly.
            if response.is_failure() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) if err.is_expected() => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
        Err(err) => {
            error!(error = ?err, "Unexpected failure");
            eprintln!("{err}");
            eprintln!("This looks like a bug; please report it with the log output above.");
            ExitCode::from(1)
        }
    }
}

/// Initializes tracing with environment filter support.
///
/// Sets up the global tracing subscriber with:
/// - Compact log formatting (single-line output)
/// - Log level filtering via `RUST_LOG` env var (defaults to "info")
fn init_tracing() {
    tracing_subscriber::registry()
        // Use compact formatting without module target paths for cleaner output
        .with(fmt::layer().compact().with_target(false))
        // Allow runtime log filtering via RUST_LOG env var (e.g., RUST_LOG=debug)
        // Falls back to "info" level if RUST_LOG is not set or invalid
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        // Register as the global default subscriber
        .init();
}

/// Main execution logic.
async fn run(args: Args) -> Result<BackportResponse, BackportError> {
    let config = load_project_config(&args.config)
        .map_err(|err| BackportError::Message(err.to_string()))?
        .unwrap_or_default();

    let repo = args.repo.clone().or_else(|| config.repo.clone()).ok_or_else(|| {
        BackportError::Message(
            "No repository specified; pass --repo or set repo in .backport.toml".to_string(),
        )
    })?;
    let (owner, name) = repo.split_once('/').ok_or_else(|| {
        BackportError::Message(format!("Repository must be owner/name, got '{repo}'"))
    })?;

    let mapping = config.branch_label_mapping()?;

    let mut options = BackportOptions::new(owner, name);
    options.target_branches = if args.branches.is_empty() {
        config.target_branches.clone()
    } else {
        args.branches.clone()
    };
    options.branch_label_mapping = mapping.clone();
    options.fork_owner = args.fork_owner.clone().or_else(|| config.fork_owner.clone());
    options.interactive = !args.non_interactive;
    options.dry_run = args.dry_run;
    options.auto_merge = args.auto_merge || config.auto_merge;
    if let Some(method) = config.auto_merge_method {
        options.auto_merge_method = method;
    }
    options.copy_source_labels = args.copy_source_labels || config.copy_source_labels;
    options.copy_label_patterns = backport::targets::compile_label_patterns(&config.copy_label_patterns)?;
    options.copy_reviewers = args.copy_reviewers || config.copy_reviewers;
    options.reviewers = merged(&config.reviewers, &args.reviewers);
    options.target_pr_labels = merged(&config.target_pr_labels, &args.labels);
    if let Some(template) = config.pr_title.clone() {
        options.pr_title_template = template;
    }
    if let Some(template) = config.pr_body.clone() {
        options.pr_body_template = template;
    }
    options.publish_status_on_success = config.publish_status_on_success;
    options.publish_status_on_failure = config.publish_status_on_failure;
    options.publish_status_on_abort = config.publish_status_on_abort;

    let github = Arc::new(OctocrabClient::new(args.token.clone(), owner, name)?);

    // Resolve the commit selection to concrete shas, in input order.
    let mut shas = args.shas.clone();
    if let Some(pr) = args.pr {
        shas.push(github.fetch_pull_request_merge_commit(pr).await?);
    }
    if shas.is_empty() {
        return Err(BackportError::Message(
            "Nothing to backport; pass --sha or --pr".to_string(),
        ));
    }

    let mut commits = Vec::with_capacity(shas.len());
    for sha in &shas {
        let payload = github.fetch_commit_payload(sha).await?;
        commits.push(Commit::from_payload(payload, mapping.clone(), owner, name));
    }

    let workdir = args
        .dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join(format!("backport-{owner}-{name}")));
    let vcs = GitRepo::new(workdir, owner, name, args.token.clone());
    vcs.ensure_cloned().await?;

    match vcs.local_identity().await {
        Ok(identity) if !identity.email.is_empty() => {}
        _ => tracing::warn!(
            "No git user identity configured in the working copy; global settings will be used"
        ),
    }

    let mut runner =
        BackportRunner::new(options, github, Arc::new(vcs)).with_prompt(Arc::new(StdinPrompt));
    if let Some(command) = args.on_conflict_command.clone() {
        runner = runner.with_auto_fixer(Arc::new(ShellConflictFixer { command }));
    }

    Ok(runner.run(commits).await)
}

/// Concatenates config and CLI lists, dropping duplicates.
fn merged(from_config: &[String], from_args: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for value in from_config.iter().chain(from_args) {
        if !merged.contains(value) {
            merged.push(value.clone());
        }
    }
    merged
}

/// Prints the per-branch outcome summary.
fn print_response(response: &BackportResponse) {
    match response {
        BackportResponse::Success { results, .. } => {
            println!();
            for result in results {
                match result {
                    BackportResult::Success {
                        target_branch,
                        pull_request_url,
                        ..
                    } => println!("✅ {target_branch}: {pull_request_url}"),
                    BackportResult::Failure {
                        target_branch,
                        error,
                    } => println!("❌ {target_branch}: {error}"),
                }
            }
        }
        BackportResponse::Aborted { error, .. } => println!("{error}"),
        BackportResponse::Failure { error, .. } => eprintln!("{error}"),
    }
}

/// Stdin-backed conflict prompt.
struct StdinPrompt;

#[async_trait::async_trait]
impl OperatorPrompt for StdinPrompt {
    async fn confirm_conflicts_resolved(
        &self,
        workdir: &Path,
        conflicting_files: &[String],
    ) -> ConflictDecision {
        use tokio::io::{AsyncBufReadExt, BufReader};

        println!("\nCherry-pick conflicts in {}:", workdir.display());
        for file in conflicting_files {
            println!("  {file}");
        }
        println!("Resolve them, then press ENTER to continue (or type 'abort' to stop):");

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        if reader.read_line(&mut line).await.is_err() {
            return ConflictDecision::Abort;
        }

        if line.trim().eq_ignore_ascii_case("abort") {
            ConflictDecision::Abort
        } else {
            ConflictDecision::Resolved
        }
    }
}

/// Runs a user-supplied shell command to resolve conflicts.
struct ShellConflictFixer {
    command: String,
}

#[async_trait::async_trait]
impl ConflictAutoFixer for ShellConflictFixer {
    async fn try_fix(&self, workdir: &Path, conflicting_files: &[String]) -> bool {
        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(workdir)
            .env("BACKPORT_CONFLICTING_FILES", conflicting_files.join(" "))
            .status()
            .await;

        matches!(status, Ok(status) if status.success())
    }
}
