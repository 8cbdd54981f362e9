//! Session-level error kinds
//!
//! Each variant maps to one recovery policy in the orchestrator: input errors
//! never start work, VCS errors are reported and the session continues,
//! module and engine errors end the session after the working tree has been
//! restored. "No impact found" is not an error; it is `Ok(false)` from
//! [`ChangeImpactEngine::track_changes_and_tests`](crate::ChangeImpactEngine).

use thiserror::Error;

/// Message shown when the depth input is missing or not a positive number.
pub const INVALID_DEPTH_MESSAGE: &str =
    "Depth level input is required and must be a valid number greater than 0.";

#[derive(Error, Debug)]
pub enum SessionError {
    /// Depth missing, non-numeric, or not greater than zero
    #[error("Depth level input is required and must be a valid number greater than 0. Got: {0:?}")]
    InvalidInput(String),
    /// The configured test module is not registered
    #[error("Module not found: {0}")]
    ModuleNotFound(String),
    /// Stash or unstash failed; working-tree state left as it was
    #[error("VCS operation failed: {0}")]
    VcsOperationFailed(String),
    /// The test run could not be configured or started
    #[error("Test execution engine unavailable: {0}")]
    ExecutionEngineUnavailable(String),
    /// The controller was interrupted while waiting for phase 1
    #[error("Await interrupted: {0}")]
    InterruptedWait(String),
    /// Change/impact computation failed
    #[error("Impact analysis failed: {0:#}")]
    Analysis(#[from] anyhow::Error),
}

impl SessionError {
    /// Dialog title used when the error is surfaced to the user.
    pub fn title(&self) -> &'static str {
        match self {
            SessionError::InvalidInput(_) => "Invalid Input",
            SessionError::ModuleNotFound(_) => "Module Not Found",
            SessionError::VcsOperationFailed(_) => "Popping Error",
            SessionError::ExecutionEngineUnavailable(_) => "Run Error",
            SessionError::InterruptedWait(_) | SessionError::Analysis(_) => "Error",
        }
    }
}
