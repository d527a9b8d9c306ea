//! Feed subscription with automatic resubscribe.
//!
//! Forwards feed events to the session worker in delivery order. When the
//! backend drops the subscription it reports the disconnect, resubscribes
//! with exponential backoff, and reports the reconnect so the worker can
//! refetch the full state.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use bingo_core::SessionId;

use super::session::Inbound;
use crate::api::{FeedMessage, RealtimeFeed, Subscription};
use crate::runtime::ReconnectPolicy;

enum PumpEnd {
    Dropped,
    Shutdown,
}

pub struct SubscriptionClient {
    feed: Arc<dyn RealtimeFeed>,
    session: SessionId,
    policy: ReconnectPolicy,
    inbound_tx: mpsc::Sender<Inbound>,
    shutdown_rx: watch::Receiver<bool>,
}

impl SubscriptionClient {
    pub fn new(
        feed: Arc<dyn RealtimeFeed>,
        session: SessionId,
        policy: ReconnectPolicy,
        inbound_tx: mpsc::Sender<Inbound>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            feed,
            session,
            policy,
            inbound_tx,
            shutdown_rx,
        }
    }

    /// Main loop. Returns on shutdown, when the worker is gone, or when the
    /// feed cannot be restored.
    pub async fn run(mut self, initial: Subscription) {
        let mut subscription = initial;
        loop {
            let end = self.pump(&mut subscription).await;
            self.feed.unsubscribe(subscription.id);
            if matches!(end, PumpEnd::Shutdown) {
                break;
            }

            warn!(
                target: "runtime::subscription",
                session = %self.session,
                "Feed subscription dropped"
            );
            if self.inbound_tx.send(Inbound::Disconnected).await.is_err() {
                break;
            }

            subscription = match self.resubscribe().await {
                Some(subscription) => subscription,
                None => break,
            };
            if self.inbound_tx.send(Inbound::Reconnected).await.is_err() {
                self.feed.unsubscribe(subscription.id);
                break;
            }
        }
        debug!(
            target: "runtime::subscription",
            session = %self.session,
            "Subscription client stopped"
        );
    }

    async fn pump(&mut self, subscription: &mut Subscription) -> PumpEnd {
        loop {
            tokio::select! {
                _ = self.shutdown_rx.changed() => return PumpEnd::Shutdown,
                message = subscription.receiver.recv() => match message {
                    Some(FeedMessage::Event(event)) => {
                        trace!(
                            target: "runtime::subscription",
                            revision = %event.revision,
                            operation = %event.operation,
                            "Feed event"
                        );
                        if self.inbound_tx.send(Inbound::Feed(event)).await.is_err() {
                            return PumpEnd::Shutdown;
                        }
                    }
                    Some(FeedMessage::Disconnected) | None => return PumpEnd::Dropped,
                },
            }
        }
    }

    async fn resubscribe(&mut self) -> Option<Subscription> {
        let mut delay = self.policy.initial_delay;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.feed.subscribe(self.session).await {
                Ok(subscription) => {
                    info!(
                        target: "runtime::subscription",
                        session = %self.session,
                        attempt,
                        "Feed subscription restored"
                    );
                    return Some(subscription);
                }
                Err(error) if error.is_terminal() => {
                    warn!(
                        target: "runtime::subscription",
                        session = %self.session,
                        error = %error,
                        "Feed closed for good"
                    );
                    let _ = self.inbound_tx.send(Inbound::FeedClosed).await;
                    return None;
                }
                Err(error) => {
                    debug!(
                        target: "runtime::subscription",
                        session = %self.session,
                        attempt,
                        error = %error,
                        "Resubscribe failed"
                    );
                }
            }

            if self.policy.exhausted(attempt) {
                warn!(
                    target: "runtime::subscription",
                    session = %self.session,
                    attempt,
                    "Giving up on feed"
                );
                let _ = self.inbound_tx.send(Inbound::FeedClosed).await;
                return None;
            }

            tokio::select! {
                _ = self.shutdown_rx.changed() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = self.policy.next_delay(delay);
        }
    }
}
