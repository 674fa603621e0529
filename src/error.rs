//! Error types for the build verifier harness.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for harness operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The named fixture does not exist under the resource root.
    #[error("fixture resource not found: {id} (under {root})")]
    ResourceNotFound { id: String, root: PathBuf },

    /// The tool process could not be started or reaped.
    #[error("failed to launch tool: {0}")]
    Launch(String),

    /// The tool exited with a non-zero status. Carries the captured log so
    /// callers asserting an expected failure can inspect it.
    #[error("{message}")]
    Verification { message: String, log: String },

    /// The tool exceeded its wall-clock budget and was killed.
    #[error("tool execution timed out after {0:?}")]
    Timeout(Duration),

    /// A post-run check over the working directory or log did not hold.
    #[error("{0}")]
    Assertion(String),

    /// Harness or scenario configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error during harness operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;
