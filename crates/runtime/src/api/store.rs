//! Seams to the authoritative backend.
//!
//! [`SessionStore`] accepts writes and serves snapshots; [`RealtimeFeed`]
//! pushes committed changes. Both are async traits so a hosted backend can be
//! swapped in for [`crate::MemoryStore`] without touching the workers.

use async_trait::async_trait;
use tokio::sync::mpsc;

use bingo_core::{
    Event, GridSize, Lifecycle, MarkRequest, ParticipantId, Revision, Role, SessionCode, SessionId,
    Snapshot,
};

use super::errors::StoreError;

/// Identity handed back by the store after creating or joining a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinTicket {
    pub session: SessionId,
    pub code: SessionCode,
    pub participant: ParticipantId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Message delivered on a feed subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedMessage {
    Event(Event),
    /// The backend dropped this subscription. No further messages follow.
    Disconnected,
}

/// Live subscription to one session's changes.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub session: SessionId,
    pub receiver: mpsc::Receiver<FeedMessage>,
}

/// Authoritative session storage.
///
/// Every accepted write is assigned a fresh, strictly increasing per-session
/// [`Revision`] and published to the session's feed subscribers.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a session in `Pending` with the caller as host.
    async fn create_session(
        &self,
        host_name: &str,
        size: GridSize,
    ) -> Result<JoinTicket, StoreError>;

    /// Joins an existing session by its shareable code.
    async fn join(
        &self,
        code: &SessionCode,
        display_name: &str,
        role: Role,
    ) -> Result<JoinTicket, StoreError>;

    async fn leave(
        &self,
        session: SessionId,
        participant: ParticipantId,
    ) -> Result<(), StoreError>;

    async fn fetch_snapshot(&self, session: SessionId) -> Result<Snapshot, StoreError>;

    /// Applies a mark or unmark request, first writer wins.
    async fn submit(&self, request: MarkRequest) -> Result<Revision, StoreError>;

    /// Moves the session lifecycle. Only the host may do this.
    async fn transition(
        &self,
        session: SessionId,
        actor: ParticipantId,
        to: Lifecycle,
    ) -> Result<Revision, StoreError>;
}

/// Push channel for committed changes.
#[async_trait]
pub trait RealtimeFeed: Send + Sync {
    async fn subscribe(&self, session: SessionId) -> Result<Subscription, StoreError>;

    fn unsubscribe(&self, id: SubscriptionId);
}
