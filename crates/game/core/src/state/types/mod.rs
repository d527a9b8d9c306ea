mod common;
mod grid;
mod participant;
mod session;

pub use common::{ParticipantId, Revision, SessionId, Timestamp};
pub use grid::{GridPosition, GridSize, Line};
pub use participant::{Color, Participant, Role};
pub use session::{Lifecycle, LifecycleError, SessionCode, SessionCodeError, SessionRecord};

/// A participant's claim on one grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellMark {
    pub position: GridPosition,
    pub owner: ParticipantId,
    pub marked_at: Timestamp,
}

impl CellMark {
    pub const fn new(position: GridPosition, owner: ParticipantId, marked_at: Timestamp) -> Self {
        Self {
            position,
            owner,
            marked_at,
        }
    }
}
