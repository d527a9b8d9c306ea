//! Local, optimistic intents of the participant this client acts as.

use crate::engine::{Outcome, Reconciliation};
use crate::error::{ErrorSeverity, NeverError, SessionError};
use crate::state::{
    GridPosition, GridSize, IntentKind, Lifecycle, ParticipantId, SessionId, SessionState,
};

use super::{InvariantError, Transition};

/// Request the caller must forward to the store after an intent was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarkRequest {
    pub session: SessionId,
    pub actor: ParticipantId,
    pub position: GridPosition,
    pub kind: IntentKind,
}

/// Why a local intent was rejected. The state is left unchanged.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IntentError {
    #[error("session is {lifecycle}, marking requires an active session")]
    SessionNotActive { lifecycle: Lifecycle },

    #[error("participant {participant} is not on the roster")]
    NotInRoster { participant: ParticipantId },

    #[error("spectators cannot mark cells")]
    Spectator,

    #[error("cell {position} is outside the {size} grid")]
    OutOfBounds {
        position: GridPosition,
        size: GridSize,
    },

    #[error("cell {position} is owned by {owner}")]
    OwnedByOther {
        position: GridPosition,
        owner: ParticipantId,
    },

    #[error("cell {position} is not marked by the local participant")]
    NotMarked { position: GridPosition },

    #[error(transparent)]
    Invariant(#[from] InvariantError),
}

impl SessionError for IntentError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::SessionNotActive { .. } => ErrorSeverity::Recoverable,
            Self::Invariant(_) => ErrorSeverity::Internal,
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::SessionNotActive { .. } => "INTENT_SESSION_NOT_ACTIVE",
            Self::NotInRoster { .. } => "INTENT_NOT_IN_ROSTER",
            Self::Spectator => "INTENT_SPECTATOR",
            Self::OutOfBounds { .. } => "INTENT_OUT_OF_BOUNDS",
            Self::OwnedByOther { .. } => "INTENT_OWNED_BY_OTHER",
            Self::NotMarked { .. } => "INTENT_NOT_MARKED",
            Self::Invariant(inner) => inner.error_code(),
        }
    }
}

/// `Mark` toggles (unmarked -> mark, self-owned -> unmark); `Unmark` only
/// removes a self-owned mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalIntent {
    pub position: GridPosition,
    pub explicit_unmark: bool,
}

impl LocalIntent {
    pub const fn toggle(position: GridPosition) -> Self {
        Self {
            position,
            explicit_unmark: false,
        }
    }

    pub const fn unmark(position: GridPosition) -> Self {
        Self {
            position,
            explicit_unmark: true,
        }
    }

    /// Resolves the request direction from the currently rendered owner.
    fn resolve(&self, state: &SessionState) -> Result<IntentKind, IntentError> {
        match state.effective_owner(self.position) {
            Some(owner) if owner != state.local => Err(IntentError::OwnedByOther {
                position: self.position,
                owner,
            }),
            Some(_) => Ok(IntentKind::Unmark),
            None if self.explicit_unmark => Err(IntentError::NotMarked {
                position: self.position,
            }),
            None => Ok(IntentKind::Mark),
        }
    }
}

impl Transition for LocalIntent {
    type Error = IntentError;

    fn pre_validate(&self, state: &SessionState) -> Result<(), Self::Error> {
        let lifecycle = state.lifecycle();
        if !lifecycle.accepts_marks() {
            return Err(IntentError::SessionNotActive { lifecycle });
        }

        let role = state
            .local_role()
            .ok_or(IntentError::NotInRoster {
                participant: state.local,
            })?;
        if !role.can_mark() {
            return Err(IntentError::Spectator);
        }

        if !state.board.contains(self.position) {
            return Err(IntentError::OutOfBounds {
                position: self.position,
                size: state.board.size(),
            });
        }

        self.resolve(state).map(|_| ())
    }

    fn apply(&self, state: &mut SessionState) -> Result<Outcome, Self::Error> {
        let kind = self.resolve(state)?;
        state.board.record_intent(self.position, kind);

        Ok(Outcome::Requested(MarkRequest {
            session: state.session.id,
            actor: state.local,
            position: self.position,
            kind,
        }))
    }

    fn post_validate(&self, state: &SessionState) -> Result<(), Self::Error> {
        InvariantError::check_overlay(state).map_err(IntentError::from)
    }
}

/// The store refused a forwarded request for `position`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rollback {
    pub position: GridPosition,
}

impl Transition for Rollback {
    type Error = NeverError;

    fn apply(&self, state: &mut SessionState) -> Result<Outcome, Self::Error> {
        if state.board.pending(self.position).is_none() {
            return Ok(Outcome::Ignored(crate::engine::IgnoreReason::NoPendingIntent));
        }

        let reconciliation = if state.board.retire_intent(self.position) {
            Reconciliation::RolledBack {
                position: self.position,
                winner: state.board.authoritative(self.position).map(|m| m.owner),
            }
        } else {
            Reconciliation::StillPending {
                position: self.position,
            }
        };
        Ok(Outcome::Merged(reconciliation))
    }
}
