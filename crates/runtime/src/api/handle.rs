//! Cloneable façade for issuing commands to a session worker.
//!
//! [`SessionHandle`] hides channel plumbing and offers async helpers for
//! marking cells, driving the lifecycle, and streaming events by topic.
use tokio::sync::{broadcast, mpsc, oneshot};

use bingo_core::{
    GridPosition, Lifecycle, Outcome, ParticipantId, SessionId, SessionState, SessionView,
};

use super::errors::{Result, RuntimeError};
use crate::events::{EventBus, RuntimeEvent, Topic};
use crate::workers::Command;

/// Client-facing handle to one open session.
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
    session: SessionId,
    local: ParticipantId,
}

impl SessionHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        event_bus: EventBus,
        session: SessionId,
        local: ParticipantId,
    ) -> Self {
        Self {
            command_tx,
            event_bus,
            session,
            local,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn local(&self) -> ParticipantId {
        self.local
    }

    /// Marks an unmarked cell, or unmarks it when the local participant owns it.
    ///
    /// Resolves as soon as the optimistic overlay is applied; confirmation or
    /// rollback arrives later on [`Topic::Session`].
    pub async fn mark(&self, position: GridPosition) -> Result<Outcome> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::Mark {
                position,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)?
    }

    /// Removes a mark the local participant owns.
    pub async fn unmark(&self, position: GridPosition) -> Result<Outcome> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::Unmark {
                position,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)?
    }

    /// Asks the store to move the session lifecycle. Host only.
    ///
    /// Resolves once the store accepted the change; the local view follows
    /// when the change comes back through the feed.
    pub async fn transition(&self, to: Lifecycle) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::Transition {
                to,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)?
    }

    pub async fn start(&self) -> Result<()> {
        self.transition(Lifecycle::Active).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.transition(Lifecycle::Paused).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.transition(Lifecycle::Active).await
    }

    pub async fn end(&self) -> Result<()> {
        self.transition(Lifecycle::Ended).await
    }

    /// Query the current session state (read-only snapshot)
    pub async fn state(&self) -> Result<SessionState> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::QueryState { reply: reply_tx })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Render-ready projection of the current state.
    pub async fn view(&self) -> Result<SessionView> {
        self.state().await.map(|state| SessionView::project(&state))
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Session` - view changes, reconciliations and rejected intents
    /// - `Topic::Connection` - feed going stale, coming back, or closing
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use bingo_runtime::Topic;
    ///
    /// let mut rx = handle.subscribe(Topic::Connection);
    /// while let Ok(event) = rx.recv().await {
    ///     // Show a reconnecting banner
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<RuntimeEvent> {
        self.event_bus.subscribe(topic)
    }

    pub(crate) async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)
    }
}
