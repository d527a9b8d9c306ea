//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, the external store, and the
//! reducer so clients can bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use bingo_core::{
    GridSize, Lifecycle, LifecycleError, ParticipantId, ReduceError, SessionCode, SessionId,
};

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("session worker command channel closed")]
    CommandChannelClosed,

    #[error("session worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("background task join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reduce(#[from] ReduceError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("local participant {0} is not on the roster")]
    NotInRoster(ParticipantId),

    #[error("runtime requires {0} to be configured before building")]
    Missing(&'static str),
}

/// Why the store refused a mark request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("session is {0}")]
    NotActive(Lifecycle),

    #[error("cell is owned by {owner}")]
    Taken { owner: ParticipantId },

    #[error("cell is already marked by the requester")]
    AlreadyMarked,

    #[error("cell is not marked")]
    NotMarked,

    #[error("cell is outside the grid")]
    OutOfBounds,

    #[error("spectators cannot mark")]
    Spectator,
}

/// Failures reported by [`crate::SessionStore`] and [`crate::RealtimeFeed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    SessionNotFound(SessionId),

    #[error("no session with code {0}")]
    UnknownCode(SessionCode),

    #[error("{0} has ended")]
    SessionEnded(SessionId),

    #[error("participant {participant} is not part of {session}")]
    UnknownParticipant {
        session: SessionId,
        participant: ParticipantId,
    },

    #[error("{0} is full")]
    SessionFull(SessionId),

    #[error("a session has exactly one host; join as player or spectator")]
    HostRoleTaken,

    #[error("invalid grid size {0}")]
    InvalidGridSize(GridSize),

    #[error("mark request rejected: {0}")]
    Rejected(#[from] RejectReason),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("store lock was poisoned")]
    LockPoisoned,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// The session can no longer be subscribed to or mutated.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StoreError::SessionNotFound(_) | StoreError::SessionEnded(_)
        )
    }
}
