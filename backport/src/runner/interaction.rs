//! Operator interaction seams for conflict handling.
//!
//! The orchestrator never talks to a terminal directly; it depends on these
//! traits so the CLI can provide a stdin prompt while tests script the
//! decisions.

use async_trait::async_trait;
use std::path::Path;

/// Decision returned from the conflict prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    /// The operator resolved the conflicts; continue the cherry-pick.
    Resolved,

    /// The operator gave up; terminate the entire run.
    Abort,
}

/// A blocking "await operator confirmation or abort" capability.
#[async_trait]
pub trait OperatorPrompt: Send + Sync {
    /// Presents the conflicting files and suspends until the operator
    /// either confirms they were resolved in `workdir` or aborts.
    async fn confirm_conflicts_resolved(
        &self,
        workdir: &Path,
        conflicting_files: &[String],
    ) -> ConflictDecision;
}

/// An automatic conflict resolution hook.
#[async_trait]
pub trait ConflictAutoFixer: Send + Sync {
    /// Attempts to resolve the conflicts in `workdir`. Returns `true` when
    /// they were fixed and the cherry-pick can be continued.
    async fn try_fix(&self, workdir: &Path, conflicting_files: &[String]) -> bool;
}
