//! Authoritative change notifications and full-state snapshots.
//!
//! The transport is opaque; these are the payloads the reducer understands.
//! Delivery is best-effort, so the same [`Event`] may arrive twice or after a
//! newer one. The store-assigned [`Revision`] is what makes merging idempotent.

use strum::{AsRefStr, Display};

use crate::state::{CellMark, Participant, ParticipantId, Revision, SessionId, SessionRecord};

/// Kind of change reported by the feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

/// Entity state carried by an event. For deletes this is the removed entity.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum EntitySnapshot {
    Session(SessionRecord),
    Mark(CellMark),
    Participant(Participant),
}

/// One remote change to a session.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    pub session: SessionId,
    pub revision: Revision,
    pub operation: Operation,
    pub entity: EntitySnapshot,
}

impl Event {
    pub fn new(
        session: SessionId,
        revision: Revision,
        operation: Operation,
        entity: EntitySnapshot,
    ) -> Self {
        Self {
            session,
            revision,
            operation,
            entity,
        }
    }

    pub fn mark(session: SessionId, revision: Revision, operation: Operation, mark: CellMark) -> Self {
        Self::new(session, revision, operation, EntitySnapshot::Mark(mark))
    }

    /// Participant whose write produced a mark event. Only owners can unmark,
    /// so for deletes this is the owner of the removed mark as well.
    pub fn mark_actor(&self) -> Option<ParticipantId> {
        match &self.entity {
            EntitySnapshot::Mark(mark) => Some(mark.owner),
            _ => None,
        }
    }
}

/// Full authoritative state of one session, as returned by a refetch.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    pub session: SessionRecord,
    pub participants: Vec<Participant>,
    pub marks: Vec<CellMark>,
    /// Latest revision reflected in this snapshot.
    pub revision: Revision,
}
