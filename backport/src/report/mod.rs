//! Result aggregation and status reporting.

mod result;
mod status_report;

pub use result::{BackportResponse, BackportResult};
pub use status_report::{status_report_body, ReportOptions};

use crate::commit::Commit;
use crate::runner::BackportError;

/// Wraps per-branch results into the overall response.
#[must_use]
pub fn aggregate(commits: Vec<Commit>, results: Vec<BackportResult>) -> BackportResponse {
    BackportResponse::Success { commits, results }
}

/// Maps a run-level error to the overall response.
///
/// The no-branches condition is the only one treated as an abort; every
/// other error that prevents branch processing is a failure.
#[must_use]
pub fn aggregate_error(commits: Vec<Commit>, error: BackportError) -> BackportResponse {
    match error {
        BackportError::NoBranches => BackportResponse::Aborted { commits, error },
        _ => BackportResponse::Failure { commits, error },
    }
}
