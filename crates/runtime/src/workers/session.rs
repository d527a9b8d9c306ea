//! Session worker that owns the local [`bingo_core::SessionState`].
//!
//! Receives commands from [`crate::SessionHandle`] and inbound traffic from
//! the feed and the store, reduces everything through
//! [`bingo_core::SessionEngine`], and publishes runtime events. Store calls
//! run on tasks owned by the worker so a slow backend never blocks the view.
//! Mark requests go through a single forwarding task and reach the store in
//! the order the user issued them.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};

use bingo_core::{
    Action, Event, GridPosition, Lifecycle, MarkRequest, Outcome, Reconciliation, ReduceError,
    SessionEngine, SessionState, SessionView, Snapshot, TransitionPhase,
};

use crate::api::{Result, RuntimeError, SessionStore, StoreError};
use crate::events::{ConnectionEvent, EventBus, SessionEvent};
use crate::runtime::ReconnectPolicy;

/// Commands that can be sent to the session worker
pub enum Command {
    /// Toggle a cell for the local participant.
    Mark {
        position: GridPosition,
        reply: oneshot::Sender<Result<Outcome>>,
    },
    /// Remove the local participant's mark.
    Unmark {
        position: GridPosition,
        reply: oneshot::Sender<Result<Outcome>>,
    },
    /// Ask the store to move the lifecycle.
    Transition {
        to: Lifecycle,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Query the current session state (read-only).
    QueryState { reply: oneshot::Sender<SessionState> },
    Shutdown,
}

/// Traffic produced by the subscription client and by store tasks.
#[derive(Debug)]
pub enum Inbound {
    Feed(Event),
    Disconnected,
    Reconnected,
    Refetched(Snapshot),
    RefetchFailed(StoreError),
    /// The store refused a forwarded mark request.
    Rejected {
        position: GridPosition,
        error: StoreError,
    },
    FeedClosed,
}

/// Background task that reconciles one session view.
pub struct SessionWorker {
    state: SessionState,
    store: Arc<dyn SessionStore>,
    command_rx: mpsc::Receiver<Command>,
    inbound_rx: mpsc::Receiver<Inbound>,
    inbound_tx: mpsc::Sender<Inbound>,
    event_bus: EventBus,
    policy: ReconnectPolicy,
    /// Events merged while a refetch is in flight. They are replayed on top
    /// of the snapshot; the ones it already covers dedupe by revision.
    refetch_buffer: Option<Vec<Event>>,
    requests_tx: mpsc::UnboundedSender<MarkRequest>,
    requests_rx: Option<mpsc::UnboundedReceiver<MarkRequest>>,
    /// Store calls in flight. Aborted when the worker stops.
    tasks: JoinSet<()>,
}

impl SessionWorker {
    pub fn new(
        state: SessionState,
        store: Arc<dyn SessionStore>,
        command_rx: mpsc::Receiver<Command>,
        inbound: (mpsc::Sender<Inbound>, mpsc::Receiver<Inbound>),
        event_bus: EventBus,
        policy: ReconnectPolicy,
    ) -> Self {
        let (inbound_tx, inbound_rx) = inbound;
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        Self {
            state,
            store,
            command_rx,
            inbound_rx,
            inbound_tx,
            event_bus,
            policy,
            refetch_buffer: None,
            requests_tx,
            requests_rx: Some(requests_rx),
            tasks: JoinSet::new(),
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        if let Some(requests_rx) = self.requests_rx.take() {
            self.tasks.spawn(forward_requests(
                Arc::clone(&self.store),
                requests_rx,
                self.inbound_tx.clone(),
            ));
        }

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
                Some(inbound) = self.inbound_rx.recv() => {
                    self.handle_inbound(inbound);
                }
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(error) = joined {
                        error!(
                            target: "runtime::worker",
                            error = %error,
                            "Store task failed"
                        );
                    }
                }
            }
        }

        self.tasks.shutdown().await;
        debug!(
            target: "runtime::worker",
            session = %self.state.session.id,
            "Session worker stopped"
        );
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Mark { position, reply } => {
                let result = self.execute_intent(Action::Mark(position), position);
                let _ = reply.send(result);
            }
            Command::Unmark { position, reply } => {
                let result = self.execute_intent(Action::Unmark(position), position);
                let _ = reply.send(result);
            }
            Command::Transition { to, reply } => self.request_transition(to, reply),
            Command::QueryState { reply } => {
                let _ = reply.send(self.state.clone());
            }
            Command::Shutdown => {}
        }
    }

    fn handle_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Feed(event) => {
                if let Some(buffer) = self.refetch_buffer.as_mut() {
                    buffer.push(event.clone());
                }
                self.merge(Action::Remote(event));
            }
            Inbound::Disconnected => self.mark_stale(),
            Inbound::Reconnected => {
                self.refetch_buffer = Some(Vec::new());
                self.spawn_refetch();
            }
            Inbound::Refetched(snapshot) => {
                let buffered = self.refetch_buffer.take().unwrap_or_default();
                if self.merge(Action::Reconnect(snapshot)).is_none() {
                    warn!(
                        target: "runtime::worker",
                        session = %self.state.session.id,
                        "Refetched snapshot is inconsistent, view stays stale"
                    );
                    self.event_bus.publish(ConnectionEvent::Closed);
                    return;
                }
                for event in buffered {
                    self.merge(Action::Remote(event));
                }
                info!(
                    target: "runtime::worker",
                    session = %self.state.session.id,
                    revision = %self.state.revision,
                    "Session view live again"
                );
                self.event_bus.publish(ConnectionEvent::Live {
                    revision: self.state.revision,
                });
            }
            Inbound::RefetchFailed(error) => {
                warn!(
                    target: "runtime::worker",
                    session = %self.state.session.id,
                    error = %error,
                    "Refetch after reconnect failed"
                );
                self.refetch_buffer = None;
                self.event_bus.publish(ConnectionEvent::Closed);
            }
            Inbound::Rejected { position, error } => {
                debug!(
                    target: "runtime::worker",
                    position = %position,
                    error = %error,
                    "Store rejected request, rolling back"
                );
                self.merge(Action::Rollback(position));
            }
            Inbound::FeedClosed => {
                self.mark_stale();
                self.event_bus.publish(ConnectionEvent::Closed);
            }
        }
    }

    fn execute_intent(&mut self, action: Action, position: GridPosition) -> Result<Outcome> {
        match self.apply(&action) {
            Ok(outcome) => {
                if let Outcome::Requested(request) = &outcome {
                    self.forward(*request);
                }
                Ok(outcome)
            }
            Err(error) => {
                debug!(
                    target: "runtime::worker",
                    action = action.as_str(),
                    position = %position,
                    phase = error.phase().as_str(),
                    error = %error,
                    "Intent rejected"
                );
                self.event_bus.publish(SessionEvent::IntentRejected {
                    position,
                    phase: error.phase(),
                    error: error.to_string(),
                });
                Err(error.into())
            }
        }
    }

    /// Reduces a non-local action. Failures are logged and leave the state as is.
    fn merge(&mut self, action: Action) -> Option<Outcome> {
        match self.apply(&action) {
            Ok(outcome) => {
                if let Outcome::Ignored(reason) = &outcome {
                    trace!(
                        target: "runtime::worker",
                        action = action.as_str(),
                        reason = %reason,
                        "Action ignored"
                    );
                }
                Some(outcome)
            }
            Err(error) => {
                self.log_reduce_error(&action, &error);
                None
            }
        }
    }

    /// Executes against a staged clone and commits only on success.
    fn apply(&mut self, action: &Action) -> std::result::Result<Outcome, ReduceError> {
        let mut working_state = self.state.clone();
        let outcome = SessionEngine::new(&mut working_state).execute(action)?;

        if outcome.changed() {
            self.state = working_state;
            self.event_bus.publish(SessionEvent::ViewChanged {
                revision: self.state.revision,
                view: Box::new(SessionView::project(&self.state)),
            });
        }
        if let Outcome::Merged(reconciliation) = &outcome
            && !matches!(reconciliation, Reconciliation::Applied)
        {
            self.event_bus.publish(SessionEvent::Reconciled(*reconciliation));
        }
        Ok(outcome)
    }

    fn log_reduce_error(&self, action: &Action, error: &ReduceError) {
        if error.phase() == TransitionPhase::PreValidate {
            warn!(
                target: "runtime::worker",
                action = action.as_str(),
                phase = error.phase().as_str(),
                error = %error,
                "Action rejected during pre-validate"
            );
        } else {
            error!(
                target: "runtime::worker",
                action = action.as_str(),
                phase = error.phase().as_str(),
                error = %error,
                "Action reduction failed"
            );
        }
    }

    fn mark_stale(&mut self) {
        if matches!(self.merge(Action::Disconnect), Some(Outcome::MarkedStale)) {
            self.event_bus.publish(ConnectionEvent::Stale);
        }
    }

    fn forward(&self, request: MarkRequest) {
        if self.requests_tx.send(request).is_err() {
            warn!(
                target: "runtime::worker",
                position = %request.position,
                "Forwarding task is gone, request dropped"
            );
        }
    }

    fn request_transition(&mut self, to: Lifecycle, reply: oneshot::Sender<Result<()>>) {
        let Some(role) = self.state.local_role() else {
            let _ = reply.send(Err(RuntimeError::NotInRoster(self.state.local)));
            return;
        };
        if let Err(error) = self.state.lifecycle().transition(to, role) {
            debug!(
                target: "runtime::worker",
                to = %to,
                error = %error,
                "Lifecycle change refused locally"
            );
            let _ = reply.send(Err(error.into()));
            return;
        }

        let store = Arc::clone(&self.store);
        let session = self.state.session.id;
        let actor = self.state.local;
        self.tasks.spawn(async move {
            let result = store
                .transition(session, actor, to)
                .await
                .map(|_| ())
                .map_err(RuntimeError::from);
            let _ = reply.send(result);
        });
    }

    fn spawn_refetch(&mut self) {
        let store = Arc::clone(&self.store);
        let inbound_tx = self.inbound_tx.clone();
        let session = self.state.session.id;
        let policy = self.policy.clone();
        self.tasks.spawn(async move {
            let mut delay = policy.initial_delay;
            let mut attempt: u32 = 0;
            let message = loop {
                attempt += 1;
                match store.fetch_snapshot(session).await {
                    Ok(snapshot) => break Inbound::Refetched(snapshot),
                    Err(error) if error.is_terminal() || policy.exhausted(attempt) => {
                        break Inbound::RefetchFailed(error);
                    }
                    Err(error) => {
                        debug!(
                            target: "runtime::worker",
                            attempt,
                            error = %error,
                            "Refetch failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        delay = policy.next_delay(delay);
                    }
                }
            };
            let _ = inbound_tx.send(message).await;
        });
    }
}

/// Submits mark requests one at a time so the store sees them in issue order.
async fn forward_requests(
    store: Arc<dyn SessionStore>,
    mut requests: mpsc::UnboundedReceiver<MarkRequest>,
    inbound_tx: mpsc::Sender<Inbound>,
) {
    while let Some(request) = requests.recv().await {
        match store.submit(request).await {
            Ok(revision) => trace!(
                target: "runtime::worker",
                position = %request.position,
                kind = %request.kind,
                revision = %revision,
                "Request accepted"
            ),
            Err(error) => {
                let rejected = Inbound::Rejected {
                    position: request.position,
                    error,
                };
                if inbound_tx.send(rejected).await.is_err() {
                    break;
                }
            }
        }
    }
}
