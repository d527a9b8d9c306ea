//! Common error infrastructure for bingo-core.
//!
//! Domain-specific errors (`IntentError`, `LifecycleError`, ...) live next to
//! the code that raises them. This module holds the classification shared by
//! all of them so the runtime can pick a log level and recovery strategy
//! without matching on every variant.

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the same request may succeed later (e.g. session paused)
/// - **Validation**: the request is malformed or not permitted for this actor
/// - **Internal**: local state broke an invariant; indicates a bug
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Can retry once the session moves on (resumed, reconnected, ...).
    Recoverable,

    /// Invalid input; retrying unchanged will fail again.
    Validation,

    /// Unexpected state inconsistency. Should be investigated.
    Internal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Common trait for all bingo-core errors.
///
/// Use `#[derive(thiserror::Error)]` for the `Display`/`Error` impls and
/// classify severity by recoverability, not impact.
pub trait SessionError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    /// Static identifier for this error variant, used in logs and tests.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Error type for transitions that never fail.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("this error should never be constructed")]
pub enum NeverError {}

impl SessionError for NeverError {
    fn severity(&self) -> ErrorSeverity {
        match *self {}
    }

    fn error_code(&self) -> &'static str {
        match *self {}
    }
}
