//! Label mapping error types.

use thiserror::Error;

/// Errors that can occur while building a branch label mapping.
#[derive(Debug, Error)]
pub enum MappingError {
    /// A label pattern failed to compile as a regular expression.
    #[error("Invalid label pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
