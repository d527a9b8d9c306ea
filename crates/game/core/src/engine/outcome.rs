use crate::action::MarkRequest;
use crate::state::{GridPosition, ParticipantId, Revision};

/// What a successful reduction did.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome {
    /// Local intent applied optimistically; forward the request to the store.
    Requested(MarkRequest),
    /// An authoritative change was merged.
    Merged(Reconciliation),
    /// Nothing changed.
    Ignored(IgnoreReason),
    /// View flagged stale after a disconnect.
    MarkedStale,
    /// State replaced wholesale by a refetch.
    Replaced { revision: Revision },
}

impl Outcome {
    /// False only when the state is guaranteed to be unchanged.
    pub fn changed(&self) -> bool {
        !matches!(self, Outcome::Ignored(_))
    }
}

/// How an authoritative change related to pending local intents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Reconciliation {
    /// No pending intent was involved.
    Applied,
    /// The last in-flight local request for the cell was confirmed.
    Confirmed { position: GridPosition },
    /// A local request resolved, but others for the cell are still in flight.
    StillPending { position: GridPosition },
    /// The local intent lost and was discarded; `winner` is the authoritative owner.
    RolledBack {
        position: GridPosition,
        winner: Option<ParticipantId>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IgnoreReason {
    /// Event or snapshot for a different session than the one on screen.
    ForeignSession,
    /// Revision already merged (duplicate or older delivery).
    Duplicate,
    /// Session has ended; no further mutations are accepted.
    SessionEnded,
    AlreadyStale,
    NoPendingIntent,
}
