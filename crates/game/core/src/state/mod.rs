//! Local projection of one session.
//!
//! This module owns the data structures describing the session record, the
//! roster and the grid. Runtime layers clone or query this state but mutate it
//! exclusively through the engine.
pub mod board;
pub mod roster;
pub mod types;

pub use board::{Board, IntentKind, PendingIntent};
pub use roster::Roster;
pub use types::{
    CellMark, Color, GridPosition, GridSize, Lifecycle, LifecycleError, Line, Participant,
    ParticipantId, Revision, Role, SessionCode, SessionCodeError, SessionId, SessionRecord,
    Timestamp,
};

use crate::event::Snapshot;

/// Whether the realtime feed is currently delivering events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Connection {
    #[default]
    Live,
    /// Feed dropped; the last known state is still rendered.
    Stale,
}

/// Single source of UI truth for one open session view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    /// Participant this client acts as.
    pub local: ParticipantId,
    pub session: SessionRecord,
    /// Revision of the last merged change to `session`.
    pub session_revision: Revision,
    pub roster: Roster,
    pub board: Board,
    pub connection: Connection,
    /// Highest revision seen from any source.
    pub revision: Revision,
}

impl SessionState {
    /// Builds a fresh, live state from a full refetch.
    pub fn from_snapshot(snapshot: Snapshot, local: ParticipantId) -> Self {
        let Snapshot {
            session,
            participants,
            marks,
            revision,
        } = snapshot;
        Self {
            local,
            board: Board::from_marks(session.size, marks, revision),
            roster: Roster::from_participants(participants, revision),
            session,
            session_revision: revision,
            connection: Connection::Live,
            revision,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.session.lifecycle
    }

    pub fn is_stale(&self) -> bool {
        matches!(self.connection, Connection::Stale)
    }

    /// Role of the local participant, if it is still on the roster.
    pub fn local_role(&self) -> Option<Role> {
        self.roster.role_of(self.local)
    }

    pub fn effective_owner(&self, position: GridPosition) -> Option<ParticipantId> {
        self.board.effective_owner(position, self.local)
    }

    pub(crate) fn observe(&mut self, revision: Revision) {
        self.revision = self.revision.max(revision);
    }
}
