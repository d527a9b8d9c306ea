//! Shared fixtures for unit tests.

use crate::event::{Event, Operation, Snapshot};
use crate::state::{
    CellMark, Color, GridPosition, GridSize, Lifecycle, Participant, ParticipantId, Revision,
    Role, SessionCode, SessionId, SessionRecord, SessionState, Timestamp,
};

pub const SESSION: SessionId = SessionId(1);
pub const ALICE: ParticipantId = ParticipantId(1);
pub const BOB: ParticipantId = ParticipantId(2);
pub const CAROL: ParticipantId = ParticipantId(3);

/// 5x5 session hosted by Alice with Bob playing and Carol spectating.
pub fn snapshot(lifecycle: Lifecycle, revision: Revision) -> Snapshot {
    let mut session = SessionRecord::new(
        SESSION,
        SessionCode::from_indices([0, 1, 2, 3, 4, 5]),
        GridSize::square(5),
        ALICE,
    );
    session.lifecycle = lifecycle;
    Snapshot {
        session,
        participants: vec![
            Participant::new(ALICE, "alice", Role::Host, Color::PALETTE[0]),
            Participant::new(BOB, "bob", Role::Player, Color::PALETTE[1]),
            Participant::new(CAROL, "carol", Role::Spectator, Color::PALETTE[2]),
        ],
        marks: Vec::new(),
        revision,
    }
}

pub fn active_state(local: ParticipantId) -> SessionState {
    SessionState::from_snapshot(snapshot(Lifecycle::Active, Revision(5)), local)
}

pub fn mark_event(
    revision: Revision,
    operation: Operation,
    position: GridPosition,
    owner: ParticipantId,
) -> Event {
    Event::mark(
        SESSION,
        revision,
        operation,
        CellMark::new(position, owner, Timestamp(revision.0 * 1_000)),
    )
}
