//! Errors the orchestrator can surface to its caller

use std::path::PathBuf;

use thiserror::Error;

/// The few conditions that end a validation call without a report
///
/// Everything that goes wrong inside a requirement (missing files, parse
/// failures, model errors) is reported as a failed or skipped result instead.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Codebase root not accessible: {path}")]
    RootNotAccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Validation batch cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
