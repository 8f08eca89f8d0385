#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod commit;
pub mod config;
pub mod github;
pub mod rate_limit;
pub mod reconcile;
pub mod report;
pub mod runner;
pub mod targets;
pub mod templates;
pub mod vcs;

pub use commit::{Commit, CommitAuthor, CommitPayload, SourcePullRequest, TimelineItem};
pub use config::{load_project_config, ConfigError, LabelMappingEntry, ProjectConfig};
pub use github::{GitHubApi, GitHubError, MergeMethod, OctocrabClient, PullRequestSummary};
pub use rate_limit::{check_core_rate_limit, ensure_core_rate_limit, wait_if_needed, RateLimitInfo};
pub use reconcile::{PullRequestState, TargetBranchState};
pub use report::{status_report_body, BackportResponse, BackportResult, ReportOptions};
pub use runner::{
    BackportError, BackportOptions, BackportRunner, ConflictAutoFixer, ConflictDecision,
    OperatorPrompt,
};
pub use targets::{
    resolve_label_targets, BranchLabelMapping, LabelMappingRule, LabelTarget, MappingError,
};
pub use templates::{
    generate_head_branch_name, is_valid_branch_name, TemplateError, TemplateRenderer,
};
pub use vcs::{CherryPickOutcome, GitIdentity, GitRepo, Vcs, VcsError};
