//! Feed connectivity transitions.

use crate::engine::{IgnoreReason, Outcome};
use crate::error::NeverError;
use crate::event::Snapshot;
use crate::state::{Connection, SessionState};

use super::{InvariantError, Transition};

/// The realtime feed dropped. Last known state stays on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Disconnect;

impl Transition for Disconnect {
    type Error = NeverError;

    fn apply(&self, state: &mut SessionState) -> Result<Outcome, Self::Error> {
        if state.is_stale() {
            return Ok(Outcome::Ignored(IgnoreReason::AlreadyStale));
        }
        state.connection = Connection::Stale;
        Ok(Outcome::MarkedStale)
    }
}

/// Reconnected and refetched. Missed events cannot be replayed, so the
/// snapshot replaces local state wholesale, pending intents included.
impl Transition for Snapshot {
    type Error = InvariantError;

    fn pre_validate(&self, state: &SessionState) -> Result<(), Self::Error> {
        if self.session.id != state.session.id {
            return Ok(());
        }
        InvariantError::check_snapshot(self)
    }

    fn apply(&self, state: &mut SessionState) -> Result<Outcome, Self::Error> {
        if self.session.id != state.session.id {
            return Ok(Outcome::Ignored(IgnoreReason::ForeignSession));
        }
        *state = SessionState::from_snapshot(self.clone(), state.local);
        Ok(Outcome::Replaced {
            revision: self.revision,
        })
    }
}
