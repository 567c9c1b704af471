//! Error types for the runner module.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that prevent a check from producing an outcome.
///
/// A game that crashes is not an error: it yields a failed
/// [`TestOutcome`](forge_core::TestOutcome).
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Interpreter not available: {0}")]
    InterpreterNotAvailable(String),

    #[error("Entry point not found: {}", .0.display())]
    EntryPointNotFound(PathBuf),

    #[error("Failed to launch game process: {0}")]
    SpawnFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
