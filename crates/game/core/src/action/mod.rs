//! Actions accepted by the session reducer.
//!
//! [`Action`] is the tagged union the engine consumes. Each variant wraps a
//! type implementing [`Transition`], which the engine drives through
//! pre-validate, apply and post-validate.
mod connection;
mod intent;
mod remote;
mod transition;

pub use connection::Disconnect;
pub use intent::{IntentError, LocalIntent, MarkRequest, Rollback};
pub use remote::InvariantError;
pub use transition::Transition;

use crate::event::{Event, Snapshot};
use crate::state::GridPosition;

/// Everything that can change a session view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Local "mark cell at": marks an unmarked cell, unmarks a self-owned one.
    Mark(GridPosition),
    /// Local explicit unmark of a self-owned cell.
    Unmark(GridPosition),
    /// Authoritative change delivered by the feed.
    Remote(Event),
    /// Store rejected a forwarded request for this cell.
    Rollback(GridPosition),
    /// Feed connection lost.
    Disconnect,
    /// Feed reconnected; carries the full refetch.
    Reconnect(Snapshot),
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Mark(_) => "mark",
            Action::Unmark(_) => "unmark",
            Action::Remote(_) => "remote",
            Action::Rollback(_) => "rollback",
            Action::Disconnect => "disconnect",
            Action::Reconnect(_) => "reconnect",
        }
    }
}

impl From<Event> for Action {
    fn from(event: Event) -> Self {
        Action::Remote(event)
    }
}
