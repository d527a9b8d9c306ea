//! Session state and optimistic reconciliation for live bingo games.
//!
//! `bingo-core` defines the canonical data model (sessions, marks, roster),
//! the authoritative change events, and a pure, synchronous reducer that
//! overlays local intents on the last confirmed state. All state mutation
//! flows through [`engine::SessionEngine`]; the runtime and front-ends depend
//! on the types re-exported here.
pub mod action;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod state;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use action::{
    Action, Disconnect, IntentError, InvariantError, LocalIntent, MarkRequest, Rollback,
    Transition,
};
pub use config::SessionConfig;
pub use engine::{
    IgnoreReason, Outcome, Reconciliation, ReduceError, SessionEngine, TransitionPhase,
    TransitionPhaseError, reduce,
};
pub use error::{ErrorSeverity, SessionError};
pub use event::{EntitySnapshot, Event, Operation, Snapshot};
pub use state::{
    Board, CellMark, Color, Connection, GridPosition, GridSize, IntentKind, Lifecycle,
    LifecycleError, Line, Participant, ParticipantId, PendingIntent, Revision, Role, Roster,
    SessionCode, SessionCodeError, SessionId, SessionRecord, SessionState, Timestamp,
};
pub use view::{CellView, Controls, ParticipantView, SessionView};

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn events_round_trip_through_json() {
        let event = testing::mark_event(
            Revision(3),
            Operation::Delete,
            GridPosition::new(1, 4),
            testing::BOB,
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"operation\":\"delete\""));
        assert_eq!(serde_json::from_str::<Event>(&json).unwrap(), event);
    }

    #[test]
    fn session_code_deserialization_validates() {
        assert!(serde_json::from_str::<SessionCode>("\"ab12cd\"").is_ok());
        assert!(serde_json::from_str::<SessionCode>("\"nope\"").is_err());
    }
}
