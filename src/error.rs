use std::error::Error as StdError;

use thiserror::Error;
use validator::ValidationErrors;

use crate::state::{session::Command, state_machine::SessionPhase};

/// Errors reported synchronously by session commands.
///
/// Every variant is recoverable: the session is left exactly as it was before
/// the rejected command and no snapshot is emitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Command is not legal in the current phase.
    #[error("invalid state: {command:?} cannot be applied while {phase:?}")]
    InvalidState {
        /// Phase the session was in when the command was received.
        phase: SessionPhase,
        /// Rejected command.
        command: Command,
    },
    /// `start` was attempted with no time left on the clock.
    #[error("clock exhausted: no time remaining")]
    ClockExhausted,
    /// Points or a foul were recorded without selecting a contestant first.
    #[error("no scorer selected")]
    NoScorerSelected,
    /// Mutating command received after the session finished.
    #[error("session already finished")]
    SessionFinished,
    /// `configure`/`reset` received a non-positive duration.
    #[error("invalid duration: {0} seconds")]
    InvalidDuration(u32),
}

/// Errors raised when building a session from caller supplied input.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// Field level validation failed.
    #[error("validation failed: {0}")]
    Invalid(#[from] ValidationErrors),
    /// A contestant identifier or name is blank.
    #[error("contestant {0} must not be blank")]
    Blank(&'static str),
    /// Both sides use the same contestant identifier.
    #[error("home and away share the contestant id `{0}`")]
    DuplicateContestant(String),
}

/// Errors surfaced by the service layer (registry and live sessions).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A session command was rejected.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Construction input was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] DescriptorError),
    /// Requested session does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(DescriptorError::Invalid(err))
    }
}

/// Error raised by [`ResultSink`](crate::services::result_reporter::ResultSink)
/// implementations regardless of the collaborator behind them.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The collaborator could not accept the result.
    #[error("result sink unavailable: {message}")]
    Unavailable {
        /// Human readable context.
        message: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    /// The collaborator refused the result outright; retrying will not help.
    #[error("result rejected: {0}")]
    Rejected(String),
}

impl ReportError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl StdError + Send + Sync + 'static) -> Self {
        ReportError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReportError::Unavailable { .. })
    }
}
