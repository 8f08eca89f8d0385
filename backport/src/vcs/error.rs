//! VCS driver error types.

use thiserror::Error;

/// Errors that can occur while driving the local git working copy.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The git binary could not be spawned.
    #[error("Failed to execute git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A git command exited unsuccessfully.
    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// The working directory could not be prepared.
    #[error("Failed to prepare working directory '{path}': {source}")]
    Workdir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
