//! Branch target resolution from pull request labels.
//!
//! This module maps a commit's pull request labels to candidate target
//! branches using an ordered list of `(pattern, branch template)` rules.

mod error;
mod mapping;

pub use error::MappingError;
pub use mapping::{BranchLabelMapping, LabelMappingRule};

use regex::Regex;
use std::collections::HashSet;

/// A target branch candidate derived from one pull request label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTarget {
    /// Resolved target branch name.
    pub branch: String,

    /// The label the branch was derived from.
    pub label: String,

    /// The raw pattern that matched the label.
    pub label_pattern: String,

    /// Whether the resolved branch is the commit's own source branch.
    /// Such targets are inherently already merged.
    pub is_source_branch: bool,
}

/// Resolves pull request labels to target branch candidates.
///
/// For each label the mapping is scanned in declaration order and the first
/// matching rule wins. Candidates resolving to the same branch are
/// de-duplicated, keeping the first occurrence, so the output order follows
/// label order.
#[must_use]
pub fn resolve_label_targets(
    labels: &[String],
    mapping: &BranchLabelMapping,
    source_branch: &str,
) -> Vec<LabelTarget> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for label in labels {
        let Some((branch, rule)) = mapping.resolve(label) else {
            continue;
        };

        if !seen.insert(branch.clone()) {
            continue;
        }

        targets.push(LabelTarget {
            is_source_branch: branch == source_branch,
            branch,
            label: label.clone(),
            label_pattern: rule.pattern().to_string(),
        });
    }

    targets
}

/// Compiles the label-copy allow-list patterns.
///
/// # Errors
///
/// Returns [`MappingError::InvalidPattern`] for the first pattern that
/// fails to compile.
pub fn compile_label_patterns(patterns: &[String]) -> Result<Vec<Regex>, MappingError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| MappingError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn earlier_pattern_wins_over_later_exact_match() {
        let mapping = BranchLabelMapping::from_pairs([
            (r"^v(\d+)\.(\d+)\.\d+$", "$1.$2"),
            (r"^v7\.9\.0$", "7.x"),
        ])
        .unwrap();

        let targets = resolve_label_targets(&labels(&["v7.9.0"]), &mapping, "main");

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].branch, "7.9");
        assert_eq!(targets[0].label, "v7.9.0");
        assert_eq!(targets[0].label_pattern, r"^v(\d+)\.(\d+)\.\d+$");
    }

    #[test]
    fn resolves_in_label_order() {
        let mapping = BranchLabelMapping::from_pairs([(r"^v(\d+)\.(\d+)\.\d+$", "$1.$2")]).unwrap();

        let targets = resolve_label_targets(&labels(&["v7.2.0", "v7.1.0"]), &mapping, "main");

        let branches: Vec<&str> = targets.iter().map(|t| t.branch.as_str()).collect();
        assert_eq!(branches, ["7.2", "7.1"]);
    }

    #[test]
    fn duplicate_branches_keep_first_occurrence() {
        let mapping = BranchLabelMapping::from_pairs([
            (r"^v7\.9\.\d+$", "7.x"),
            (r"^auto-backport-7x$", "7.x"),
        ])
        .unwrap();

        let targets =
            resolve_label_targets(&labels(&["v7.9.0", "auto-backport-7x"]), &mapping, "main");

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].label, "v7.9.0");
    }

    #[test]
    fn marks_source_branch_targets() {
        let mapping = BranchLabelMapping::from_pairs([(r"^v8\.0\.0$", "main")]).unwrap();

        let targets = resolve_label_targets(&labels(&["v8.0.0"]), &mapping, "main");

        assert_eq!(targets.len(), 1);
        assert!(targets[0].is_source_branch);
    }

    #[test]
    fn empty_mapping_yields_no_targets() {
        let mapping = BranchLabelMapping::default();
        let targets = resolve_label_targets(&labels(&["v7.9.0"]), &mapping, "main");
        assert!(targets.is_empty());
    }

    #[test]
    fn unmatched_labels_are_skipped() {
        let mapping = BranchLabelMapping::from_pairs([(r"^v(\d+)\.(\d+)\.\d+$", "$1.$2")]).unwrap();

        let targets =
            resolve_label_targets(&labels(&["needs-review", "v7.1.0"]), &mapping, "main");

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].branch, "7.1");
    }
}
