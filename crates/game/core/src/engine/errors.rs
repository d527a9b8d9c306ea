//! Error types for the reducer pipeline.

use crate::action::{IntentError, InvariantError};
use crate::error::{ErrorSeverity, SessionError};

/// Identifies which stage of the transition pipeline produced an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransitionPhase {
    PreValidate,
    Apply,
    PostValidate,
}

impl TransitionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionPhase::PreValidate => "pre_validate",
            TransitionPhase::Apply => "apply",
            TransitionPhase::PostValidate => "post_validate",
        }
    }
}

/// Associates a transition phase with the underlying error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionPhaseError<E> {
    pub phase: TransitionPhase,
    pub error: E,
}

impl<E> TransitionPhaseError<E> {
    pub fn new(phase: TransitionPhase, error: E) -> Self {
        Self { phase, error }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for TransitionPhaseError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.phase.as_str(), self.error)
    }
}

impl<E: std::fmt::Display + std::fmt::Debug> std::error::Error for TransitionPhaseError<E> {}

/// Errors surfaced while reducing an action.
///
/// A failed reduction never leaves a partially mutated state behind when the
/// caller stages it (see [`crate::engine::reduce`]).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReduceError {
    #[error("local intent rejected: {0}")]
    Intent(TransitionPhaseError<IntentError>),

    #[error("remote event rejected: {0}")]
    Remote(TransitionPhaseError<InvariantError>),

    #[error("reconnect snapshot rejected: {0}")]
    Reconnect(TransitionPhaseError<InvariantError>),
}

impl ReduceError {
    pub fn phase(&self) -> TransitionPhase {
        match self {
            ReduceError::Intent(e) => e.phase,
            ReduceError::Remote(e) | ReduceError::Reconnect(e) => e.phase,
        }
    }

    /// The intent error, when a local intent was rejected.
    pub fn as_intent(&self) -> Option<&IntentError> {
        match self {
            ReduceError::Intent(e) => Some(&e.error),
            _ => None,
        }
    }
}

impl SessionError for ReduceError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            ReduceError::Intent(e) => e.error.severity(),
            ReduceError::Remote(e) | ReduceError::Reconnect(e) => e.error.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ReduceError::Intent(e) => e.error.error_code(),
            ReduceError::Remote(e) | ReduceError::Reconnect(e) => e.error.error_code(),
        }
    }
}
