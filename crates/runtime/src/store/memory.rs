//! In-process backend implementing both [`SessionStore`] and [`RealtimeFeed`].
//!
//! Used by tests and the local demo. Writes are serialized behind one lock,
//! each accepted write bumps the session revision, and the resulting event is
//! fanned out to subscribers with `try_send`. A subscriber whose buffer is
//! full is dropped, exactly like a realtime socket that falls behind.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use bingo_core::{
    CellMark, Color, EntitySnapshot, Event, GridPosition, GridSize, IntentKind, Lifecycle,
    MarkRequest, Operation, Participant, ParticipantId, Revision, Role, SessionCode,
    SessionConfig, SessionId, SessionRecord, Snapshot, Timestamp,
};

use crate::api::{
    FeedMessage, JoinTicket, RealtimeFeed, RejectReason, SessionStore, StoreError, Subscription,
    SubscriptionId,
};

type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Per-subscriber queue length before the subscriber is dropped.
    pub feed_buffer_size: usize,
    pub max_participants: usize,
    /// Deliver every event twice.
    pub duplicate_delivery: bool,
    /// Seed for session codes; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            feed_buffer_size: 64,
            max_participants: SessionConfig::MAX_PARTICIPANTS,
            duplicate_delivery: false,
            seed: None,
        }
    }
}

struct SessionEntry {
    record: SessionRecord,
    participants: BTreeMap<ParticipantId, Participant>,
    marks: BTreeMap<GridPosition, CellMark>,
    revision: Revision,
}

impl SessionEntry {
    fn commit(&mut self, operation: Operation, entity: EntitySnapshot) -> Event {
        self.revision = self.revision.next();
        Event::new(self.record.id, self.revision, operation, entity)
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            session: self.record.clone(),
            participants: self.participants.values().cloned().collect(),
            marks: self.marks.values().copied().collect(),
            revision: self.revision,
        }
    }

    fn participant(&self, id: ParticipantId) -> Result<&Participant> {
        self.participants
            .get(&id)
            .ok_or(StoreError::UnknownParticipant {
                session: self.record.id,
                participant: id,
            })
    }
}

struct Subscriber {
    session: SessionId,
    tx: mpsc::Sender<FeedMessage>,
}

struct Inner {
    sessions: HashMap<SessionId, SessionEntry>,
    codes: HashMap<SessionCode, SessionId>,
    subscribers: HashMap<SubscriptionId, Subscriber>,
    next_session: u64,
    next_participant: u32,
    next_subscription: u64,
    rng: StdRng,
}

impl Inner {
    fn entry(&self, session: SessionId) -> Result<&SessionEntry> {
        self.sessions
            .get(&session)
            .ok_or(StoreError::SessionNotFound(session))
    }

    fn entry_mut(&mut self, session: SessionId) -> Result<&mut SessionEntry> {
        self.sessions
            .get_mut(&session)
            .ok_or(StoreError::SessionNotFound(session))
    }

    fn generate_code(&mut self) -> SessionCode {
        let alphabet = SessionConfig::CODE_ALPHABET.len();
        loop {
            let indices = std::array::from_fn(|_| self.rng.gen_range(0..alphabet));
            let code = SessionCode::from_indices(indices);
            if !self.codes.contains_key(&code) {
                return code;
            }
        }
    }

    fn allocate_participant(&mut self) -> ParticipantId {
        self.next_participant += 1;
        ParticipantId(self.next_participant)
    }

    /// Fans `event` out to the session's subscribers, dropping any that lag.
    fn publish(&mut self, event: &Event, copies: usize) {
        let lagging: Vec<SubscriptionId> = self
            .subscribers
            .iter()
            .filter(|(_, subscriber)| subscriber.session == event.session)
            .filter(|(_, subscriber)| {
                (0..copies).any(|_| {
                    subscriber
                        .tx
                        .try_send(FeedMessage::Event(event.clone()))
                        .is_err()
                })
            })
            .map(|(id, _)| *id)
            .collect();

        for id in lagging {
            warn!(
                target: "runtime::store",
                subscription = id.0,
                session = %event.session,
                "Dropping subscriber that fell behind"
            );
            self.subscribers.remove(&id);
        }
    }
}

/// In-memory session backend.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    config: MemoryStoreConfig,
    duplicate_delivery: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    pub fn with_config(config: MemoryStoreConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            inner: Mutex::new(Inner {
                sessions: HashMap::new(),
                codes: HashMap::new(),
                subscribers: HashMap::new(),
                next_session: 0,
                next_participant: 0,
                next_subscription: 0,
                rng,
            }),
            duplicate_delivery: AtomicBool::new(config.duplicate_delivery),
            config,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn copies(&self) -> usize {
        if self.duplicate_delivery.load(Ordering::Relaxed) {
            2
        } else {
            1
        }
    }

    /// Toggles duplicate delivery of every subsequent event.
    pub fn set_duplicate_delivery(&self, enabled: bool) {
        self.duplicate_delivery.store(enabled, Ordering::Relaxed);
    }

    /// Simulates the backend dropping every feed connection to `session`.
    /// Returns how many subscriptions were dropped.
    pub fn drop_subscribers(&self, session: SessionId) -> usize {
        let Ok(mut inner) = self.lock() else {
            return 0;
        };
        let ids: Vec<SubscriptionId> = inner
            .subscribers
            .iter()
            .filter(|(_, subscriber)| subscriber.session == session)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            if let Some(subscriber) = inner.subscribers.remove(id) {
                let _ = subscriber.tx.try_send(FeedMessage::Disconnected);
            }
        }
        info!(
            target: "runtime::store",
            session = %session,
            dropped = ids.len(),
            "Dropped feed subscribers"
        );
        ids.len()
    }

    pub fn subscriber_count(&self, session: SessionId) -> usize {
        self.lock()
            .map(|inner| {
                inner
                    .subscribers
                    .values()
                    .filter(|subscriber| subscriber.session == session)
                    .count()
            })
            .unwrap_or(0)
    }

    fn create_blocking(&self, host_name: &str, size: GridSize) -> Result<JoinTicket> {
        if !size.is_valid() {
            return Err(StoreError::InvalidGridSize(size));
        }
        let mut inner = self.lock()?;

        inner.next_session += 1;
        let id = SessionId(inner.next_session);
        let code = inner.generate_code();
        let host = inner.allocate_participant();
        let participant = Participant::new(host, host_name, Role::Host, Color::assign([]));

        let record = SessionRecord::new(id, code.clone(), size, host);
        let mut entry = SessionEntry {
            record: record.clone(),
            participants: BTreeMap::new(),
            marks: BTreeMap::new(),
            revision: Revision::ZERO,
        };
        entry.commit(Operation::Insert, EntitySnapshot::Session(record));
        entry.participants.insert(host, participant.clone());
        entry.commit(Operation::Insert, EntitySnapshot::Participant(participant));

        inner.sessions.insert(id, entry);
        inner.codes.insert(code.clone(), id);
        info!(
            target: "runtime::store",
            session = %id,
            code = %code,
            size = %size,
            "Session created"
        );

        Ok(JoinTicket {
            session: id,
            code,
            participant: host,
        })
    }

    fn join_blocking(
        &self,
        code: &SessionCode,
        display_name: &str,
        role: Role,
    ) -> Result<JoinTicket> {
        if role.is_host() {
            return Err(StoreError::HostRoleTaken);
        }
        let copies = self.copies();
        let mut inner = self.lock()?;
        let session = *inner
            .codes
            .get(code)
            .ok_or_else(|| StoreError::UnknownCode(code.clone()))?;

        let participant = inner.allocate_participant();
        let event = {
            let entry = inner.entry_mut(session)?;
            if entry.record.lifecycle.is_terminal() {
                return Err(StoreError::SessionEnded(session));
            }
            if entry.participants.len() >= self.config.max_participants {
                return Err(StoreError::SessionFull(session));
            }
            let color = Color::assign(entry.participants.values().map(|p| p.color));
            let joined = Participant::new(participant, display_name, role, color);
            entry.participants.insert(participant, joined.clone());
            entry.commit(Operation::Insert, EntitySnapshot::Participant(joined))
        };
        inner.publish(&event, copies);
        debug!(
            target: "runtime::store",
            session = %session,
            participant = %participant,
            role = %role,
            "Participant joined"
        );

        Ok(JoinTicket {
            session,
            code: code.clone(),
            participant,
        })
    }

    fn leave_blocking(&self, session: SessionId, participant: ParticipantId) -> Result<()> {
        let copies = self.copies();
        let mut inner = self.lock()?;
        let event = {
            let entry = inner.entry_mut(session)?;
            let departed = entry
                .participants
                .remove(&participant)
                .ok_or(StoreError::UnknownParticipant {
                    session,
                    participant,
                })?;
            entry.commit(Operation::Delete, EntitySnapshot::Participant(departed))
        };
        inner.publish(&event, copies);
        Ok(())
    }

    fn submit_blocking(&self, request: MarkRequest) -> Result<Revision> {
        let copies = self.copies();
        let mut inner = self.lock()?;
        let event = {
            let entry = inner.entry_mut(request.session)?;
            let role = entry.participant(request.actor)?.role;
            let position = request.position;

            if !role.can_mark() {
                return Err(RejectReason::Spectator.into());
            }
            if !entry.record.size.contains(position) {
                return Err(RejectReason::OutOfBounds.into());
            }
            if !entry.record.lifecycle.accepts_marks() {
                return Err(RejectReason::NotActive(entry.record.lifecycle).into());
            }

            match (request.kind, entry.marks.get(&position).copied()) {
                (IntentKind::Mark, Some(mark)) if mark.owner == request.actor => {
                    return Err(RejectReason::AlreadyMarked.into());
                }
                (_, Some(mark)) if mark.owner != request.actor => {
                    return Err(RejectReason::Taken { owner: mark.owner }.into());
                }
                (IntentKind::Mark, _) => {
                    let mark = CellMark::new(position, request.actor, now());
                    entry.marks.insert(position, mark);
                    entry.commit(Operation::Insert, EntitySnapshot::Mark(mark))
                }
                (IntentKind::Unmark, Some(mark)) => {
                    entry.marks.remove(&position);
                    entry.commit(Operation::Delete, EntitySnapshot::Mark(mark))
                }
                (IntentKind::Unmark, None) => return Err(RejectReason::NotMarked.into()),
            }
        };
        let revision = event.revision;
        inner.publish(&event, copies);
        Ok(revision)
    }

    fn transition_blocking(
        &self,
        session: SessionId,
        actor: ParticipantId,
        to: Lifecycle,
    ) -> Result<Revision> {
        let copies = self.copies();
        let mut inner = self.lock()?;
        let event = {
            let entry = inner.entry_mut(session)?;
            let role = entry.participant(actor)?.role;
            entry.record.lifecycle = entry.record.lifecycle.transition(to, role)?;
            let record = entry.record.clone();
            entry.commit(Operation::Update, EntitySnapshot::Session(record))
        };
        let revision = event.revision;
        inner.publish(&event, copies);
        info!(
            target: "runtime::store",
            session = %session,
            lifecycle = %to,
            revision = %revision,
            "Lifecycle changed"
        );
        Ok(revision)
    }

    fn snapshot_blocking(&self, session: SessionId) -> Result<Snapshot> {
        let inner = self.lock()?;
        Ok(inner.entry(session)?.snapshot())
    }

    fn subscribe_blocking(&self, session: SessionId) -> Result<Subscription> {
        let mut inner = self.lock()?;
        if inner.entry(session)?.record.lifecycle.is_terminal() {
            return Err(StoreError::SessionEnded(session));
        }
        inner.next_subscription += 1;
        let id = SubscriptionId(inner.next_subscription);
        let (tx, receiver) = mpsc::channel(self.config.feed_buffer_size);
        inner.subscribers.insert(id, Subscriber { session, tx });
        debug!(
            target: "runtime::store",
            session = %session,
            subscription = id.0,
            "Feed subscribed"
        );
        Ok(Subscription {
            id,
            session,
            receiver,
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, host_name: &str, size: GridSize) -> Result<JoinTicket> {
        self.create_blocking(host_name, size)
    }

    async fn join(
        &self,
        code: &SessionCode,
        display_name: &str,
        role: Role,
    ) -> Result<JoinTicket> {
        self.join_blocking(code, display_name, role)
    }

    async fn leave(&self, session: SessionId, participant: ParticipantId) -> Result<()> {
        self.leave_blocking(session, participant)
    }

    async fn fetch_snapshot(&self, session: SessionId) -> Result<Snapshot> {
        self.snapshot_blocking(session)
    }

    async fn submit(&self, request: MarkRequest) -> Result<Revision> {
        self.submit_blocking(request)
    }

    async fn transition(
        &self,
        session: SessionId,
        actor: ParticipantId,
        to: Lifecycle,
    ) -> Result<Revision> {
        self.transition_blocking(session, actor, to)
    }
}

#[async_trait]
impl RealtimeFeed for MemoryStore {
    async fn subscribe(&self, session: SessionId) -> Result<Subscription> {
        self.subscribe_blocking(session)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut inner) = self.lock() {
            inner.subscribers.remove(&id);
        }
    }
}

fn now() -> Timestamp {
    let millis = chrono::Utc::now().timestamp_millis();
    Timestamp::from_millis(u64::try_from(millis).unwrap_or_default())
}
