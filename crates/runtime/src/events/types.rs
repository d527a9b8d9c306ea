//! Event payloads published per topic.

use serde::{Deserialize, Serialize};

use bingo_core::{GridPosition, Reconciliation, Revision, SessionView, TransitionPhase};

/// Changes to what the session view shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// State changed; carries the fresh projection.
    ViewChanged {
        revision: Revision,
        view: Box<SessionView>,
    },

    /// An authoritative change resolved a pending local intent.
    Reconciled(Reconciliation),

    /// A local mark or unmark was refused before anything was sent.
    IntentRejected {
        position: GridPosition,
        phase: TransitionPhase,
        error: String,
    },
}

/// Feed connectivity as seen by the session worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionEvent {
    /// Feed dropped; the view keeps the last known state.
    Stale,
    /// Feed restored and state refetched at `revision`.
    Live { revision: Revision },
    /// Feed gave up reconnecting or the session is gone.
    Closed,
}
