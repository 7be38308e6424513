use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RunnerError>;

/// Errors raised while loading or executing a test suite.
///
/// Assertion mismatches and backend failures are not errors; they are
/// reported through `AssertionOutcome` values. Everything here either aborts
/// the run before execution (configuration, ingestion, prerequisite cycles)
/// or fails a single step.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse `{}`: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Test case `{0}` not found")]
    CaseNotFound(String),

    #[error("Test step `{0}` not found")]
    StepNotFound(String),

    #[error("Prerequisite cycle detected: {}", .0.join(" -> "))]
    PrerequisiteCycle(Vec<String>),

    #[error("Prerequisite `{prerequisite}` of `{case}` failed")]
    PrerequisiteFailed { case: String, prerequisite: String },

    #[error("Invalid HTTP method `{0}`")]
    InvalidMethod(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Status code mismatch. Expected: {expected}, Actual: {actual}")]
    StatusMismatch { expected: u16, actual: u16 },

    #[error("Assertions failed for group `{group}`: {failed} of {total}")]
    AssertionsFailed {
        group: String,
        failed: usize,
        total: usize,
    },
}
