//! High-level runtime orchestrator.
//!
//! The runtime owns the background tasks for one open session, wires up
//! command and inbound channels, and exposes a builder-based API for clients
//! to join a session and drive it through [`SessionHandle`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use bingo_core::SessionState;

use crate::api::{
    JoinTicket, RealtimeFeed, Result, RuntimeError, SessionHandle, SessionStore,
};
use crate::events::EventBus;
use crate::workers::{Command, Inbound, SessionWorker, SubscriptionClient};

/// Exponential backoff used when the feed or a refetch has to be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// `None` retries until shutdown.
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_delay)
    }

    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            max_attempts: None,
        }
    }
}

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub command_buffer_size: usize,
    pub inbound_buffer_size: usize,
    pub event_buffer_size: usize,
    pub reconnect: ReconnectPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_buffer_size: 32,
            inbound_buffer_size: 64,
            event_buffer_size: 100,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// One open session view.
///
/// [`SessionRuntime`] owns the worker tasks; [`SessionHandle`] is the
/// cloneable façade clients use.
pub struct SessionRuntime {
    handle: SessionHandle,
    ticket: JoinTicket,
    store: Arc<dyn SessionStore>,
    shutdown_tx: watch::Sender<bool>,
    worker_handle: JoinHandle<()>,
    subscription_handle: JoinHandle<()>,
}

impl SessionRuntime {
    /// Create a new runtime builder
    pub fn builder() -> SessionRuntimeBuilder {
        SessionRuntimeBuilder::new()
    }

    /// Get a cloneable handle to this session
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn ticket(&self) -> &JoinTicket {
        &self.ticket
    }

    /// Stops the feed subscription, leaves the session, then stops the
    /// worker and waits for both tasks.
    ///
    /// A failed leave is logged; the local tasks are stopped regardless.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        self.subscription_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        if let Err(error) = self
            .store
            .leave(self.ticket.session, self.ticket.participant)
            .await
        {
            warn!(
                target: "runtime",
                session = %self.ticket.session,
                participant = %self.ticket.participant,
                error = %error,
                "Leaving the session failed"
            );
        }

        // The worker may already be gone if every handle was dropped.
        let _ = self.handle.shutdown().await;
        self.worker_handle.await.map_err(RuntimeError::WorkerJoin)?;

        Ok(())
    }
}

/// Builder for [`SessionRuntime`].
pub struct SessionRuntimeBuilder {
    config: RuntimeConfig,
    store: Option<Arc<dyn SessionStore>>,
    feed: Option<Arc<dyn RealtimeFeed>>,
    ticket: Option<JoinTicket>,
}

impl SessionRuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            store: None,
            feed: None,
            ticket: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn feed(mut self, feed: Arc<dyn RealtimeFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Uses one backend as both store and feed.
    pub fn backend<B>(self, backend: Arc<B>) -> Self
    where
        B: SessionStore + RealtimeFeed + 'static,
    {
        let store: Arc<dyn SessionStore> = backend.clone();
        let feed: Arc<dyn RealtimeFeed> = backend;
        self.store(store).feed(feed)
    }

    /// Identity returned by create or join.
    pub fn ticket(mut self, ticket: JoinTicket) -> Self {
        self.ticket = Some(ticket);
        self
    }

    /// Subscribes, fetches the initial state, and starts the workers.
    pub async fn build(self) -> Result<SessionRuntime> {
        let store = self.store.ok_or(RuntimeError::Missing("store"))?;
        let feed = self.feed.ok_or(RuntimeError::Missing("feed"))?;
        let ticket = self.ticket.ok_or(RuntimeError::Missing("ticket"))?;

        // Subscribe before fetching so no change can fall between the two.
        let subscription = feed.subscribe(ticket.session).await?;
        let snapshot = match store.fetch_snapshot(ticket.session).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                feed.unsubscribe(subscription.id);
                return Err(error.into());
            }
        };

        let state = SessionState::from_snapshot(snapshot, ticket.participant);
        if state.roster.get(ticket.participant).is_none() {
            feed.unsubscribe(subscription.id);
            return Err(RuntimeError::NotInRoster(ticket.participant));
        }
        let revision = state.revision;

        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);
        let (inbound_tx, inbound_rx) = mpsc::channel::<Inbound>(self.config.inbound_buffer_size);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);

        let handle = SessionHandle::new(
            command_tx,
            event_bus.clone(),
            ticket.session,
            ticket.participant,
        );

        let worker = SessionWorker::new(
            state,
            Arc::clone(&store),
            command_rx,
            (inbound_tx.clone(), inbound_rx),
            event_bus,
            self.config.reconnect.clone(),
        );
        let worker_handle = tokio::spawn(async move {
            worker.run().await;
        });

        let client = SubscriptionClient::new(
            feed,
            ticket.session,
            self.config.reconnect,
            inbound_tx,
            shutdown_rx,
        );
        let subscription_handle = tokio::spawn(async move {
            client.run(subscription).await;
        });

        info!(
            target: "runtime",
            session = %ticket.session,
            code = %ticket.code,
            participant = %ticket.participant,
            revision = %revision,
            "Session runtime started"
        );

        Ok(SessionRuntime {
            handle,
            ticket,
            store,
            shutdown_tx,
            worker_handle,
            subscription_handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = ReconnectPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            max_attempts: Some(3),
        };
        let second = policy.next_delay(policy.initial_delay);
        assert_eq!(second, Duration::from_millis(200));
        assert_eq!(policy.next_delay(second), Duration::from_millis(350));
        assert!(!policy.exhausted(2));
        assert!(policy.exhausted(3));
        assert!(!ReconnectPolicy::default().exhausted(u32::MAX));
    }
}
