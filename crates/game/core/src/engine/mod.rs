//! Reducer pipeline.
//!
//! The [`SessionEngine`] is the only code that mutates [`SessionState`]. It
//! routes every [`Action`] through its transition hooks and surfaces rich
//! error information for the runtime. It is synchronous and never awaits.

mod errors;
mod outcome;

pub use errors::{ReduceError, TransitionPhase, TransitionPhaseError};
pub use outcome::{IgnoreReason, Outcome, Reconciliation};

use crate::action::{Action, Disconnect, LocalIntent, Rollback, Transition};
use crate::state::SessionState;

type TransitionResult<E> = Result<Outcome, TransitionPhaseError<E>>;

macro_rules! dispatch_transition {
    ($transition:expr, $state:expr => never) => {
        drive_transition($transition, $state).map_err(|e| match e.error {})
    };
    ($transition:expr, $state:expr => $err:ident) => {
        drive_transition($transition, $state).map_err(ReduceError::$err)
    };
}

/// Drives one session view's state machine.
pub struct SessionEngine<'a> {
    state: &'a mut SessionState,
}

impl<'a> SessionEngine<'a> {
    pub fn new(state: &'a mut SessionState) -> Self {
        Self { state }
    }

    /// Executes an action by routing it through the matching transition.
    ///
    /// On error the state may be partially mutated only if the failure
    /// happened after `pre_validate`; callers that need all-or-nothing
    /// semantics run the engine on a staged clone (see [`reduce`]).
    pub fn execute(&mut self, action: &Action) -> Result<Outcome, ReduceError> {
        match action {
            Action::Mark(position) => {
                dispatch_transition!(&LocalIntent::toggle(*position), self.state => Intent)
            }
            Action::Unmark(position) => {
                dispatch_transition!(&LocalIntent::unmark(*position), self.state => Intent)
            }
            Action::Remote(event) => dispatch_transition!(event, self.state => Remote),
            Action::Rollback(position) => {
                dispatch_transition!(&Rollback { position: *position }, self.state => never)
            }
            Action::Disconnect => dispatch_transition!(&Disconnect, self.state => never),
            Action::Reconnect(snapshot) => {
                dispatch_transition!(snapshot, self.state => Reconnect)
            }
        }
    }

    pub fn state(&self) -> &SessionState {
        self.state
    }
}

/// Functional form of the reducer: `(state, action) -> state`.
///
/// Runs the action on a clone and returns it only on success. On failure the
/// returned state is an unchanged copy of the input.
pub fn reduce(
    state: &SessionState,
    action: &Action,
) -> (SessionState, Result<Outcome, ReduceError>) {
    let mut staged = state.clone();
    let result = SessionEngine::new(&mut staged).execute(action);
    match result {
        Ok(outcome) => (staged, Ok(outcome)),
        Err(error) => (state.clone(), Err(error)),
    }
}

#[inline]
fn drive_transition<T>(transition: &T, state: &mut SessionState) -> TransitionResult<T::Error>
where
    T: Transition,
{
    transition
        .pre_validate(&*state)
        .map_err(|error| TransitionPhaseError::new(TransitionPhase::PreValidate, error))?;

    let outcome = transition
        .apply(state)
        .map_err(|error| TransitionPhaseError::new(TransitionPhase::Apply, error))?;

    transition
        .post_validate(&*state)
        .map_err(|error| TransitionPhaseError::new(TransitionPhase::PostValidate, error))?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{IntentError, MarkRequest};
    use crate::event::{EntitySnapshot, Event, Operation};
    use crate::state::{
        CellMark, Connection, GridPosition, IntentKind, Lifecycle, ParticipantId, Revision,
        SessionId, Timestamp,
    };
    use crate::testing::{ALICE, BOB, CAROL, SESSION, active_state, mark_event, snapshot};

    fn run(state: &mut SessionState, action: Action) -> Result<Outcome, ReduceError> {
        SessionEngine::new(state).execute(&action)
    }

    #[test]
    fn mark_then_confirm_leaves_single_owned_mark() {
        let pos = GridPosition::ORIGIN;
        let mut state = active_state(ALICE);

        let outcome = run(&mut state, Action::Mark(pos)).unwrap();
        assert_eq!(
            outcome,
            Outcome::Requested(MarkRequest {
                session: SESSION,
                actor: ALICE,
                position: pos,
                kind: IntentKind::Mark,
            })
        );
        assert_eq!(state.effective_owner(pos), Some(ALICE));
        assert!(state.board.pending(pos).is_some());

        let confirm = mark_event(Revision(10), Operation::Insert, pos, ALICE);
        let outcome = run(&mut state, Action::Remote(confirm.clone())).unwrap();
        assert_eq!(outcome, Outcome::Merged(Reconciliation::Confirmed { position: pos }));
        assert!(state.board.pending(pos).is_none());
        assert_eq!(state.board.marks().count(), 1);
        assert_eq!(state.board.authoritative(pos).map(|m| m.owner), Some(ALICE));

        // Duplicate delivery of the same confirmation is a no-op.
        let before = state.clone();
        let outcome = run(&mut state, Action::Remote(confirm)).unwrap();
        assert_eq!(outcome, Outcome::Ignored(IgnoreReason::Duplicate));
        assert_eq!(state, before);
    }

    #[test]
    fn concurrent_marks_converge_on_first_confirmed_writer() {
        let pos = GridPosition::ORIGIN;
        let mut alice = active_state(ALICE);
        let mut bob = active_state(BOB);

        run(&mut alice, Action::Mark(pos)).unwrap();
        run(&mut bob, Action::Mark(pos)).unwrap();
        assert_eq!(bob.effective_owner(pos), Some(BOB));

        // The store accepted Alice first and rejected Bob.
        let accepted = mark_event(Revision(10), Operation::Insert, pos, ALICE);
        run(&mut alice, Action::Remote(accepted.clone())).unwrap();
        let outcome = run(&mut bob, Action::Remote(accepted)).unwrap();

        assert_eq!(
            outcome,
            Outcome::Merged(Reconciliation::RolledBack {
                position: pos,
                winner: Some(ALICE),
            })
        );
        for state in [&alice, &bob] {
            assert_eq!(state.effective_owner(pos), Some(ALICE));
            assert!(!state.board.has_pending());
        }

        // Bob's rejected request resolves afterwards; nothing left to roll back.
        let outcome = run(&mut bob, Action::Rollback(pos)).unwrap();
        assert_eq!(outcome, Outcome::Ignored(IgnoreReason::NoPendingIntent));
    }

    #[test]
    fn convergence_does_not_depend_on_local_intent_order() {
        let pos = GridPosition::new(1, 2);
        let winner = mark_event(Revision(7), Operation::Insert, pos, BOB);

        for alice_first in [true, false] {
            let mut alice = active_state(ALICE);
            let mut bob = active_state(BOB);
            if alice_first {
                run(&mut alice, Action::Mark(pos)).unwrap();
                run(&mut bob, Action::Mark(pos)).unwrap();
            } else {
                run(&mut bob, Action::Mark(pos)).unwrap();
                run(&mut alice, Action::Mark(pos)).unwrap();
            }
            run(&mut alice, Action::Remote(winner.clone())).unwrap();
            run(&mut bob, Action::Remote(winner.clone())).unwrap();

            assert_eq!(alice.effective_owner(pos), Some(BOB));
            assert_eq!(bob.effective_owner(pos), Some(BOB));
            assert_eq!(alice.board, bob.board);
        }
    }

    #[test]
    fn remark_toggles_off_and_delete_confirms() {
        let pos = GridPosition::new(2, 2);
        let mut state = active_state(ALICE);
        run(&mut state, Action::Mark(pos)).unwrap();
        run(
            &mut state,
            Action::Remote(mark_event(Revision(10), Operation::Insert, pos, ALICE)),
        )
        .unwrap();

        let outcome = run(&mut state, Action::Mark(pos)).unwrap();
        assert!(matches!(
            outcome,
            Outcome::Requested(MarkRequest {
                kind: IntentKind::Unmark,
                ..
            })
        ));
        assert_eq!(state.effective_owner(pos), None);

        run(
            &mut state,
            Action::Remote(mark_event(Revision(11), Operation::Delete, pos, ALICE)),
        )
        .unwrap();
        assert_eq!(state.effective_owner(pos), None);
        assert!(state.board.authoritative(pos).is_none());
        assert!(!state.board.has_pending());
    }

    #[test]
    fn mark_then_unmark_before_confirmation_stays_unmarked() {
        let pos = GridPosition::new(0, 3);
        let mut state = active_state(ALICE);
        run(&mut state, Action::Mark(pos)).unwrap();
        run(&mut state, Action::Mark(pos)).unwrap();
        assert_eq!(state.effective_owner(pos), None);

        // Insert for the first request arrives; the unmark is still in flight.
        let outcome = run(
            &mut state,
            Action::Remote(mark_event(Revision(10), Operation::Insert, pos, ALICE)),
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Merged(Reconciliation::StillPending { position: pos }));
        assert_eq!(state.effective_owner(pos), None);

        run(
            &mut state,
            Action::Remote(mark_event(Revision(11), Operation::Delete, pos, ALICE)),
        )
        .unwrap();
        assert_eq!(state.effective_owner(pos), None);
        assert!(!state.board.has_pending());
    }

    #[test]
    fn foreign_session_events_are_noops() {
        let mut state = active_state(ALICE);
        run(&mut state, Action::Mark(GridPosition::ORIGIN)).unwrap();
        let before = state.clone();

        let mut stale = mark_event(Revision(99), Operation::Insert, GridPosition::ORIGIN, BOB);
        stale.session = SessionId(404);
        let outcome = run(&mut state, Action::Remote(stale)).unwrap();

        assert_eq!(outcome, Outcome::Ignored(IgnoreReason::ForeignSession));
        assert_eq!(state, before);
    }

    #[test]
    fn older_event_for_same_cell_is_ignored() {
        let pos = GridPosition::new(3, 3);
        let mut state = active_state(ALICE);
        run(
            &mut state,
            Action::Remote(mark_event(Revision(12), Operation::Delete, pos, BOB)),
        )
        .unwrap();
        let outcome = run(
            &mut state,
            Action::Remote(mark_event(Revision(11), Operation::Insert, pos, BOB)),
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Ignored(IgnoreReason::Duplicate));
        assert_eq!(state.effective_owner(pos), None);
    }

    #[test]
    fn marking_another_participants_cell_is_rejected() {
        let pos = GridPosition::new(1, 1);
        let mut state = active_state(ALICE);
        run(
            &mut state,
            Action::Remote(mark_event(Revision(10), Operation::Insert, pos, BOB)),
        )
        .unwrap();

        let (next, result) = reduce(&state, &Action::Mark(pos));
        let error = result.unwrap_err();
        assert_eq!(error.phase(), TransitionPhase::PreValidate);
        assert_eq!(
            error.as_intent(),
            Some(&IntentError::OwnedByOther {
                position: pos,
                owner: BOB
            })
        );
        assert_eq!(next, state);
    }

    #[test]
    fn paused_session_rejects_intents() {
        let mut state = active_state(ALICE);
        let mut record = state.session.clone();
        record.lifecycle = Lifecycle::Paused;
        run(
            &mut state,
            Action::Remote(Event::new(
                SESSION,
                Revision(10),
                Operation::Update,
                EntitySnapshot::Session(record),
            )),
        )
        .unwrap();

        let (next, result) = reduce(&state, &Action::Mark(GridPosition::ORIGIN));
        assert_eq!(
            result.unwrap_err().as_intent(),
            Some(&IntentError::SessionNotActive {
                lifecycle: Lifecycle::Paused
            })
        );
        assert_eq!(next, state);
    }

    #[test]
    fn spectators_and_out_of_bounds_are_rejected() {
        let mut state = active_state(CAROL);
        let err = run(&mut state, Action::Mark(GridPosition::ORIGIN)).unwrap_err();
        assert_eq!(err.as_intent(), Some(&IntentError::Spectator));

        let mut state = active_state(ALICE);
        let err = run(&mut state, Action::Mark(GridPosition::new(9, 0))).unwrap_err();
        assert!(matches!(err.as_intent(), Some(IntentError::OutOfBounds { .. })));

        let err = run(&mut state, Action::Unmark(GridPosition::ORIGIN)).unwrap_err();
        assert!(matches!(err.as_intent(), Some(IntentError::NotMarked { .. })));
    }

    #[test]
    fn ended_session_ignores_events_and_drops_pending() {
        let mut state = active_state(ALICE);
        run(&mut state, Action::Mark(GridPosition::ORIGIN)).unwrap();

        let mut record = state.session.clone();
        record.lifecycle = Lifecycle::Ended;
        run(
            &mut state,
            Action::Remote(Event::new(
                SESSION,
                Revision(10),
                Operation::Update,
                EntitySnapshot::Session(record),
            )),
        )
        .unwrap();
        assert!(!state.board.has_pending());

        let outcome = run(
            &mut state,
            Action::Remote(mark_event(Revision(11), Operation::Insert, GridPosition::ORIGIN, BOB)),
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Ignored(IgnoreReason::SessionEnded));
    }

    #[test]
    fn store_rejection_rolls_back_overlay() {
        let pos = GridPosition::new(4, 0);
        let mut state = active_state(ALICE);
        run(&mut state, Action::Mark(pos)).unwrap();

        let outcome = run(&mut state, Action::Rollback(pos)).unwrap();
        assert_eq!(
            outcome,
            Outcome::Merged(Reconciliation::RolledBack {
                position: pos,
                winner: None
            })
        );
        assert_eq!(state.effective_owner(pos), None);
    }

    #[test]
    fn disconnect_keeps_state_and_reconnect_replaces_it() {
        let pos = GridPosition::ORIGIN;
        let mut state = active_state(ALICE);
        run(
            &mut state,
            Action::Remote(mark_event(Revision(10), Operation::Insert, pos, ALICE)),
        )
        .unwrap();
        run(&mut state, Action::Mark(GridPosition::new(0, 1))).unwrap();

        let board_before = state.board.clone();
        assert_eq!(run(&mut state, Action::Disconnect).unwrap(), Outcome::MarkedStale);
        assert!(state.is_stale());
        assert_eq!(state.board, board_before);
        assert_eq!(
            run(&mut state, Action::Disconnect).unwrap(),
            Outcome::Ignored(IgnoreReason::AlreadyStale)
        );

        let mut refetch = snapshot(Lifecycle::Active, Revision(20));
        refetch.marks = vec![CellMark::new(GridPosition::new(2, 2), BOB, Timestamp(5))];
        let outcome = run(&mut state, Action::Reconnect(refetch.clone())).unwrap();

        assert_eq!(outcome, Outcome::Replaced { revision: Revision(20) });
        assert_eq!(state.connection, Connection::Live);
        assert_eq!(state, SessionState::from_snapshot(refetch, ALICE));
        assert_eq!(state.effective_owner(pos), None);
        assert!(!state.board.has_pending());
    }

    #[test]
    fn reconnect_rejects_inconsistent_snapshot() {
        let state = active_state(ALICE);
        let mut refetch = snapshot(Lifecycle::Active, Revision(20));
        let dup = CellMark::new(GridPosition::ORIGIN, BOB, Timestamp(1));
        refetch.marks = vec![dup, dup];

        let (next, result) = reduce(&state, &Action::Reconnect(refetch));
        assert!(matches!(result, Err(ReduceError::Reconnect(_))));
        assert_eq!(next, state);
        assert_eq!(state.revision, Revision(5));
    }

    #[test]
    fn participant_events_update_roster() {
        let mut state = active_state(ALICE);
        let dave = crate::state::Participant::new(
            ParticipantId(9),
            "dave",
            crate::state::Role::Player,
            crate::state::Color::PALETTE[5],
        );
        let join = Event::new(
            SESSION,
            Revision(10),
            Operation::Insert,
            EntitySnapshot::Participant(dave.clone()),
        );
        run(&mut state, Action::Remote(join.clone())).unwrap();
        assert_eq!(state.roster.len(), 4);

        let leave = Event::new(
            SESSION,
            Revision(11),
            Operation::Delete,
            EntitySnapshot::Participant(dave),
        );
        run(&mut state, Action::Remote(leave)).unwrap();
        assert_eq!(state.roster.len(), 3);

        // A late duplicate of the join must not resurrect the participant.
        let outcome = run(&mut state, Action::Remote(join)).unwrap();
        assert_eq!(outcome, Outcome::Ignored(IgnoreReason::Duplicate));
        assert_eq!(state.roster.len(), 3);
    }
}
