//! Project configuration loading.
//!
//! Backport targets are usually configured once per repository in a
//! `.backport.toml` file committed alongside the code. The label mapping is
//! a TOML array of tables, which preserves declaration order; that order is
//! what makes first-match-wins resolution reproducible.

mod error;

pub use error::ConfigError;

use crate::github::MergeMethod;
use crate::targets::{BranchLabelMapping, MappingError};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// One label mapping rule as written in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LabelMappingEntry {
    /// Regular expression matched against pull request labels.
    pub pattern: String,

    /// Branch template applied as a regex replacement.
    pub branch: String,
}

/// Per-repository backport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Repository in `owner/name` form.
    pub repo: Option<String>,

    /// Explicit target branches; suggestions are used when empty.
    #[serde(default)]
    pub target_branches: Vec<String>,

    /// Ordered label mapping rules.
    #[serde(default)]
    pub branch_label_mapping: Vec<LabelMappingEntry>,

    /// Push the head branch to this fork owner instead of origin.
    pub fork_owner: Option<String>,

    /// Labels added to every backport pull request.
    #[serde(default)]
    pub target_pr_labels: Vec<String>,

    /// Copy all labels from the source pull request.
    #[serde(default)]
    pub copy_source_labels: bool,

    /// Copy only the source labels matching one of these patterns.
    #[serde(default)]
    pub copy_label_patterns: Vec<String>,

    /// Copy reviewers from the source pull requests.
    #[serde(default)]
    pub copy_reviewers: bool,

    /// Extra reviewers requested on every backport pull request.
    #[serde(default)]
    pub reviewers: Vec<String>,

    /// Pull request title template.
    pub pr_title: Option<String>,

    /// Pull request body template.
    pub pr_body: Option<String>,

    /// Enable auto-merge on created pull requests.
    #[serde(default)]
    pub auto_merge: bool,

    /// Merge method for auto-merge and fallback merges.
    pub auto_merge_method: Option<MergeMethod>,

    /// Post a status comment when every branch succeeded.
    #[serde(default = "default_true")]
    pub publish_status_on_success: bool,

    /// Post a status comment when one or more branches failed.
    #[serde(default = "default_true")]
    pub publish_status_on_failure: bool,

    /// Post a status comment when the run was aborted without branches.
    #[serde(default = "default_true")]
    pub publish_status_on_abort: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            repo: None,
            target_branches: Vec::new(),
            branch_label_mapping: Vec::new(),
            fork_owner: None,
            target_pr_labels: Vec::new(),
            copy_source_labels: false,
            copy_label_patterns: Vec::new(),
            copy_reviewers: false,
            reviewers: Vec::new(),
            pr_title: None,
            pr_body: None,
            auto_merge: false,
            auto_merge_method: None,
            // Reports stay on without a config file, matching the
            // deserialization defaults.
            publish_status_on_success: true,
            publish_status_on_failure: true,
            publish_status_on_abort: true,
        }
    }
}

impl ProjectConfig {
    /// Compiles the configured label mapping, preserving rule order.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidPattern`] for the first invalid rule.
    pub fn branch_label_mapping(&self) -> Result<Option<BranchLabelMapping>, MappingError> {
        if self.branch_label_mapping.is_empty() {
            return Ok(None);
        }

        let mapping = BranchLabelMapping::from_pairs(
            self.branch_label_mapping
                .iter()
                .map(|entry| (entry.pattern.as_str(), entry.branch.as_str())),
        )?;

        Ok(Some(mapping))
    }
}

/// Loads the project configuration from a file.
///
/// A missing file is not an error: every setting has a CLI counterpart, so
/// `Ok(None)` simply means the defaults apply.
///
/// # Errors
///
/// Returns an error when the file exists but cannot be read or parsed.
pub fn load_project_config(path: &Path) -> Result<Option<ProjectConfig>, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "No project config file");
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.display().to_string(),
        source,
    })?;

    let config: ProjectConfig =
        toml::from_str(&content).map_err(|source| ConfigError::TomlError {
            path: path.display().to_string(),
            source,
        })?;

    if let Some(repo) = &config.repo {
        if !repo.contains('/') {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                message: format!("repo must be in owner/name form, got '{repo}'"),
            });
        }
    }

    info!(path = %path.display(), "Loaded project config");
    Ok(Some(config))
}
