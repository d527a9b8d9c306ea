use std::fmt;
use std::str::FromStr;

use strum::{AsRefStr, Display, EnumString};

use super::{GridSize, ParticipantId, Role, SessionId};
use crate::config::SessionConfig;
use crate::error::{ErrorSeverity, SessionError};

/// Human-shareable join code: exactly `CODE_LEN` characters from `A-Z0-9`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct SessionCode(String);

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionCodeError {
    #[error("session code must be {expected} characters, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("session code contains invalid character {0:?}")]
    InvalidCharacter(char),
}

impl SessionError for SessionCodeError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Length { .. } => "SESSION_CODE_LENGTH",
            Self::InvalidCharacter(_) => "SESSION_CODE_CHARACTER",
        }
    }
}

impl SessionCode {
    /// Parses user input. Lowercase letters are accepted and upper-cased.
    pub fn parse(input: &str) -> Result<Self, SessionCodeError> {
        let normalized = input.trim().to_ascii_uppercase();
        let actual = normalized.chars().count();
        if actual != SessionConfig::CODE_LEN {
            return Err(SessionCodeError::Length {
                expected: SessionConfig::CODE_LEN,
                actual,
            });
        }
        if let Some(bad) = normalized
            .chars()
            .find(|c| !c.is_ascii() || !SessionConfig::CODE_ALPHABET.contains(&(*c as u8)))
        {
            return Err(SessionCodeError::InvalidCharacter(bad));
        }
        Ok(Self(normalized))
    }

    /// Builds a code from alphabet indices, wrapping out-of-range values.
    ///
    /// Callers supply the randomness; this keeps the core free of RNG state.
    pub fn from_indices(indices: [usize; SessionConfig::CODE_LEN]) -> Self {
        let alphabet = SessionConfig::CODE_ALPHABET;
        Self(
            indices
                .iter()
                .map(|&i| alphabet[i % alphabet.len()] as char)
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionCode {
    type Err = SessionCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SessionCode {
    type Error = SessionCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionCode> for String {
    fn from(code: SessionCode) -> Self {
        code.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session lifecycle: `pending -> active <-> paused -> ended`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Lifecycle {
    Pending,
    Active,
    Paused,
    /// Terminal. No further mutations are accepted.
    Ended,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("only the host may change the session lifecycle (actor is {role})")]
    NotHost { role: Role },

    #[error("session has ended")]
    Ended,

    #[error("cannot move session from {from} to {to}")]
    IllegalTransition { from: Lifecycle, to: Lifecycle },
}

impl SessionError for LifecycleError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotHost { .. } => "LIFECYCLE_NOT_HOST",
            Self::Ended => "LIFECYCLE_ENDED",
            Self::IllegalTransition { .. } => "LIFECYCLE_ILLEGAL",
        }
    }
}

impl Lifecycle {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Lifecycle::Ended)
    }

    /// Marking is only possible while the game runs.
    pub const fn accepts_marks(self) -> bool {
        matches!(self, Lifecycle::Active)
    }

    /// Whether the state machine has an edge from `self` to `to`.
    pub const fn can_transition_to(self, to: Lifecycle) -> bool {
        matches!(
            (self, to),
            (Lifecycle::Pending, Lifecycle::Active)
                | (Lifecycle::Active, Lifecycle::Paused)
                | (Lifecycle::Paused, Lifecycle::Active)
                | (Lifecycle::Pending, Lifecycle::Ended)
                | (Lifecycle::Active, Lifecycle::Ended)
                | (Lifecycle::Paused, Lifecycle::Ended)
        )
    }

    /// Validates a transition requested by a participant with `role`.
    pub fn transition(self, to: Lifecycle, role: Role) -> Result<Lifecycle, LifecycleError> {
        if self.is_terminal() {
            return Err(LifecycleError::Ended);
        }
        if !role.is_host() {
            return Err(LifecycleError::NotHost { role });
        }
        if !self.can_transition_to(to) {
            return Err(LifecycleError::IllegalTransition { from: self, to });
        }
        Ok(to)
    }
}

/// Authoritative description of one session, as delivered by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionRecord {
    pub id: SessionId,
    pub code: SessionCode,
    pub size: GridSize,
    pub host: ParticipantId,
    pub lifecycle: Lifecycle,
}

impl SessionRecord {
    pub fn new(id: SessionId, code: SessionCode, size: GridSize, host: ParticipantId) -> Self {
        Self {
            id,
            code,
            size,
            host,
            lifecycle: Lifecycle::Pending,
        }
    }
}
