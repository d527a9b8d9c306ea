//! Merging authoritative change events into the local projection.

use std::collections::BTreeSet;

use crate::engine::{IgnoreReason, Outcome, Reconciliation};
use crate::error::{ErrorSeverity, SessionError};
use crate::event::{EntitySnapshot, Event, Operation, Snapshot};
use crate::state::{CellMark, GridPosition, Lifecycle, Participant, SessionRecord, SessionState};

use super::Transition;

/// Local state or an authoritative payload broke a structural invariant.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvariantError {
    #[error("pending intent on {position} overlays a mark owned by another participant")]
    PendingOverForeignMark { position: GridPosition },

    #[error("authoritative mark at {position} is outside the grid")]
    MarkOutOfBounds { position: GridPosition },

    #[error("snapshot holds more than one mark for {position}")]
    DuplicateMark { position: GridPosition },

    #[error("snapshot assigns the same color to more than one participant")]
    DuplicateColor,

    #[error("session record for {found} delivered to the view of {expected}")]
    SessionMismatch {
        expected: crate::state::SessionId,
        found: crate::state::SessionId,
    },
}

impl SessionError for InvariantError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Internal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::PendingOverForeignMark { .. } => "INVARIANT_PENDING_OVER_FOREIGN",
            Self::MarkOutOfBounds { .. } => "INVARIANT_MARK_OUT_OF_BOUNDS",
            Self::DuplicateMark { .. } => "INVARIANT_DUPLICATE_MARK",
            Self::DuplicateColor => "INVARIANT_DUPLICATE_COLOR",
            Self::SessionMismatch { .. } => "INVARIANT_SESSION_MISMATCH",
        }
    }
}

impl InvariantError {
    /// Optimistic intents are a strict overlay: a pending cell is either
    /// unmarked or owned by the local participant in the authoritative layer.
    pub fn check_overlay(state: &SessionState) -> Result<(), InvariantError> {
        for (position, _) in state.board.pending_cells() {
            if let Some(mark) = state.board.authoritative(position)
                && mark.owner != state.local
            {
                return Err(InvariantError::PendingOverForeignMark { position });
            }
        }
        Ok(())
    }

    /// Structural checks on a full refetch before it replaces local state.
    pub fn check_snapshot(snapshot: &Snapshot) -> Result<(), InvariantError> {
        let size = snapshot.session.size;
        let mut cells = BTreeSet::new();
        for mark in &snapshot.marks {
            if !size.contains(mark.position) {
                return Err(InvariantError::MarkOutOfBounds {
                    position: mark.position,
                });
            }
            if !cells.insert(mark.position) {
                return Err(InvariantError::DuplicateMark {
                    position: mark.position,
                });
            }
        }

        let mut colors = BTreeSet::new();
        if !snapshot.participants.iter().all(|p| colors.insert(p.color)) {
            return Err(InvariantError::DuplicateColor);
        }
        Ok(())
    }
}

impl Transition for Event {
    type Error = InvariantError;

    fn pre_validate(&self, state: &SessionState) -> Result<(), Self::Error> {
        if self.session != state.session.id {
            return Ok(());
        }
        match &self.entity {
            EntitySnapshot::Mark(mark) if !state.board.contains(mark.position) => {
                Err(InvariantError::MarkOutOfBounds {
                    position: mark.position,
                })
            }
            EntitySnapshot::Session(record) if record.id != state.session.id => {
                Err(InvariantError::SessionMismatch {
                    expected: state.session.id,
                    found: record.id,
                })
            }
            _ => Ok(()),
        }
    }

    fn apply(&self, state: &mut SessionState) -> Result<Outcome, Self::Error> {
        if self.session != state.session.id {
            return Ok(Outcome::Ignored(IgnoreReason::ForeignSession));
        }
        if state.lifecycle().is_terminal() {
            return Ok(Outcome::Ignored(IgnoreReason::SessionEnded));
        }

        let outcome = match &self.entity {
            EntitySnapshot::Mark(mark) => merge_mark(state, self, *mark),
            EntitySnapshot::Session(record) => merge_session(state, self, record),
            EntitySnapshot::Participant(participant) => {
                merge_participant(state, self, participant)
            }
        };

        if !matches!(outcome, Outcome::Ignored(_)) {
            state.observe(self.revision);
        }
        Ok(outcome)
    }

    fn post_validate(&self, state: &SessionState) -> Result<(), Self::Error> {
        InvariantError::check_overlay(state)
    }
}

fn merge_mark(state: &mut SessionState, event: &Event, mark: CellMark) -> Outcome {
    let position = mark.position;
    if !state.board.is_newer(position, event.revision) {
        return Outcome::Ignored(IgnoreReason::Duplicate);
    }

    let authoritative = match event.operation {
        Operation::Insert | Operation::Update => Some(mark),
        Operation::Delete => None,
    };
    state
        .board
        .set_authoritative(position, authoritative, event.revision);

    if state.board.pending(position).is_none() {
        return Outcome::Merged(Reconciliation::Applied);
    }

    // The write came from this client: one of its requests resolved.
    if mark.owner == state.local {
        let reconciliation = if state.board.retire_intent(position) {
            Reconciliation::Confirmed { position }
        } else {
            Reconciliation::StillPending { position }
        };
        return Outcome::Merged(reconciliation);
    }

    // Another participant's write was accepted first: it wins.
    state.board.discard_intent(position);
    Outcome::Merged(Reconciliation::RolledBack {
        position,
        winner: authoritative.map(|m| m.owner),
    })
}

fn merge_session(state: &mut SessionState, event: &Event, record: &SessionRecord) -> Outcome {
    if event.revision <= state.session_revision {
        return Outcome::Ignored(IgnoreReason::Duplicate);
    }

    let mut record = record.clone();
    if matches!(event.operation, Operation::Delete) {
        // Archived sessions are treated as ended.
        record.lifecycle = Lifecycle::Ended;
    }
    let ended = record.lifecycle.is_terminal();
    state.session = record;
    state.session_revision = event.revision;

    if ended {
        state.board.clear_pending();
    }
    Outcome::Merged(Reconciliation::Applied)
}

fn merge_participant(state: &mut SessionState, event: &Event, participant: &Participant) -> Outcome {
    if !state.roster.is_newer(participant.id, event.revision) {
        return Outcome::Ignored(IgnoreReason::Duplicate);
    }

    match event.operation {
        Operation::Insert | Operation::Update => {
            state.roster.upsert(participant.clone(), event.revision);
        }
        Operation::Delete => {
            state.roster.remove(participant.id, event.revision);
        }
    }
    Outcome::Merged(Reconciliation::Applied)
}
