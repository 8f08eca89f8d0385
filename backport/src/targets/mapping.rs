//! Ordered label-to-branch mapping rules.

use super::error::MappingError;
use regex::Regex;

/// A single compiled mapping rule: a label pattern plus a branch template.
///
/// The template is applied as a regex replacement against the label, so
/// capture groups (`$1`, `$2`, ...) can lift version components out of the
/// label into the branch name.
#[derive(Debug, Clone)]
pub struct LabelMappingRule {
    pattern: Regex,
    raw_pattern: String,
    branch_template: String,
}

impl LabelMappingRule {
    /// Compiles a rule from a raw pattern and branch template.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidPattern`] when the pattern is not a
    /// valid regular expression.
    pub fn new(pattern: &str, branch_template: &str) -> Result<Self, MappingError> {
        let compiled = Regex::new(pattern).map_err(|source| MappingError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            pattern: compiled,
            raw_pattern: pattern.to_string(),
            branch_template: branch_template.to_string(),
        })
    }

    /// Returns the raw pattern this rule was compiled from.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.raw_pattern
    }

    /// Returns the branch template.
    #[must_use]
    pub fn branch_template(&self) -> &str {
        &self.branch_template
    }

    /// Applies the rule to a label, producing the target branch name.
    ///
    /// Returns `None` when the pattern does not match, or when the
    /// replacement collapses to an empty branch name.
    pub(crate) fn apply(&self, label: &str) -> Option<String> {
        if !self.pattern.is_match(label) {
            return None;
        }

        let branch = self
            .pattern
            .replace(label, self.branch_template.as_str())
            .to_string();

        if branch.is_empty() {
            None
        } else {
            Some(branch)
        }
    }
}

/// Ordered list of label mapping rules.
///
/// Declaration order is significant: for each label, the first matching rule
/// wins and later rules are never consulted. This is deliberately a list and
/// not a map so the ordering stays explicit and testable.
#[derive(Debug, Clone, Default)]
pub struct BranchLabelMapping {
    rules: Vec<LabelMappingRule>,
}

impl BranchLabelMapping {
    /// Creates a mapping from pre-compiled rules.
    #[must_use]
    pub fn new(rules: Vec<LabelMappingRule>) -> Self {
        Self { rules }
    }

    /// Compiles a mapping from `(pattern, branch template)` pairs,
    /// preserving their order.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidPattern`] for the first pattern that
    /// fails to compile.
    pub fn from_pairs<I, P, T>(pairs: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (P, T)>,
        P: AsRef<str>,
        T: AsRef<str>,
    {
        let rules = pairs
            .into_iter()
            .map(|(pattern, template)| LabelMappingRule::new(pattern.as_ref(), template.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(rules))
    }

    /// Returns `true` when no rules are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the number of configured rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Resolves a label to a branch name using the first matching rule.
    pub(crate) fn resolve(&self, label: &str) -> Option<(String, &LabelMappingRule)> {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(label).map(|branch| (branch, rule)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_capture_groups_in_template() {
        let rule = LabelMappingRule::new(r"^v(\d+)\.(\d+)\.\d+$", "$1.$2").unwrap();
        assert_eq!(rule.apply("v7.9.0"), Some("7.9".to_string()));
    }

    #[test]
    fn non_matching_label_yields_nothing() {
        let rule = LabelMappingRule::new(r"^v(\d+)\.(\d+)\.\d+$", "$1.$2").unwrap();
        assert_eq!(rule.apply("needs-review"), None);
    }

    #[test]
    fn empty_replacement_is_discarded() {
        let rule = LabelMappingRule::new("^backport$", "").unwrap();
        assert_eq!(rule.apply("backport"), None);
    }

    #[test]
    fn rejects_invalid_pattern() {
        let result = LabelMappingRule::new("(((", "7.x");
        assert!(matches!(result, Err(MappingError::InvalidPattern { .. })));
    }

    #[test]
    fn first_matching_rule_wins() {
        let mapping = BranchLabelMapping::from_pairs([
            (r"^v(\d+)\.(\d+)\.\d+$", "$1.$2"),
            (r"^v7\.9\.0$", "7.x"),
        ])
        .unwrap();

        let (branch, rule) = mapping.resolve("v7.9.0").unwrap();
        assert_eq!(branch, "7.9");
        assert_eq!(rule.pattern(), r"^v(\d+)\.(\d+)\.\d+$");
    }
}
