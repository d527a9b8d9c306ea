use bingo_core::{
    EntitySnapshot, GridPosition, GridSize, IntentKind, Lifecycle, LifecycleError, MarkRequest,
    Operation, Revision, Role, SessionCode, SessionConfig,
};
use bingo_runtime::{
    FeedMessage, JoinTicket, MemoryStore, MemoryStoreConfig, RealtimeFeed, RejectReason,
    SessionStore, StoreError,
};

fn request(ticket: &JoinTicket, row: u8, col: u8, kind: IntentKind) -> MarkRequest {
    MarkRequest {
        session: ticket.session,
        actor: ticket.participant,
        position: GridPosition::new(row, col),
        kind,
    }
}

async fn started(store: &MemoryStore) -> (JoinTicket, JoinTicket) {
    let host = store
        .create_session("alice", GridSize::square(5))
        .await
        .expect("session should be created");
    let player = store
        .join(&host.code, "bob", Role::Player)
        .await
        .expect("join should succeed");
    store
        .transition(host.session, host.participant, Lifecycle::Active)
        .await
        .expect("host should start the session");
    (host, player)
}

#[tokio::test]
async fn create_session_starts_pending_with_host() {
    let store = MemoryStore::new();
    let ticket = store
        .create_session("alice", GridSize::square(4))
        .await
        .expect("session should be created");

    assert_eq!(ticket.code.as_str().len(), SessionConfig::CODE_LEN);
    assert!(
        ticket
            .code
            .as_str()
            .bytes()
            .all(|b| SessionConfig::CODE_ALPHABET.contains(&b))
    );

    let snapshot = store
        .fetch_snapshot(ticket.session)
        .await
        .expect("snapshot");
    assert_eq!(snapshot.session.lifecycle, Lifecycle::Pending);
    assert_eq!(snapshot.session.host, ticket.participant);
    assert_eq!(snapshot.participants.len(), 1);
    assert_eq!(snapshot.participants[0].role, Role::Host);
    assert!(snapshot.marks.is_empty());
    assert_eq!(snapshot.revision, Revision(2));
}

#[tokio::test]
async fn seeded_stores_generate_the_same_codes() {
    let config = MemoryStoreConfig {
        seed: Some(7),
        ..MemoryStoreConfig::default()
    };
    let a = MemoryStore::with_config(config.clone());
    let b = MemoryStore::with_config(config);

    let first = a.create_session("a", GridSize::square(3)).await.unwrap();
    let second = b.create_session("b", GridSize::square(3)).await.unwrap();
    assert_eq!(first.code, second.code);
}

#[tokio::test]
async fn invalid_grid_is_refused() {
    let store = MemoryStore::new();
    let result = store.create_session("alice", GridSize::new(0, 5)).await;
    assert!(matches!(result, Err(StoreError::InvalidGridSize(_))));
}

#[tokio::test]
async fn joins_get_distinct_colors() {
    let store = MemoryStore::new();
    let host = store
        .create_session("host", GridSize::square(5))
        .await
        .unwrap();
    for i in 0..20 {
        store
            .join(&host.code, &format!("player-{i}"), Role::Player)
            .await
            .expect("join should succeed");
    }

    let snapshot = store.fetch_snapshot(host.session).await.unwrap();
    let mut colors: Vec<_> = snapshot.participants.iter().map(|p| p.color).collect();
    colors.sort();
    colors.dedup();
    assert_eq!(colors.len(), 21);
}

#[tokio::test]
async fn join_validates_code_role_and_capacity() {
    let store = MemoryStore::with_config(MemoryStoreConfig {
        max_participants: 2,
        ..MemoryStoreConfig::default()
    });
    let host = store
        .create_session("host", GridSize::square(5))
        .await
        .unwrap();

    let unknown = SessionCode::parse("ZZZZZZ").unwrap();
    let result = store.join(&unknown, "bob", Role::Player).await;
    if unknown != host.code {
        assert!(matches!(result, Err(StoreError::UnknownCode(_))));
    }

    assert_eq!(
        store.join(&host.code, "bob", Role::Host).await,
        Err(StoreError::HostRoleTaken)
    );

    store
        .join(&host.code, "bob", Role::Spectator)
        .await
        .expect("second participant fits");
    assert_eq!(
        store.join(&host.code, "carol", Role::Player).await,
        Err(StoreError::SessionFull(host.session))
    );
}

#[tokio::test]
async fn first_writer_wins_a_cell() {
    let store = MemoryStore::new();
    let (host, bob) = started(&store).await;

    let revision = store
        .submit(request(&bob, 1, 1, IntentKind::Mark))
        .await
        .expect("free cell can be marked");
    assert_eq!(revision, Revision(5));

    assert_eq!(
        store.submit(request(&host, 1, 1, IntentKind::Mark)).await,
        Err(StoreError::Rejected(RejectReason::Taken {
            owner: bob.participant
        }))
    );
    assert_eq!(
        store.submit(request(&bob, 1, 1, IntentKind::Mark)).await,
        Err(StoreError::Rejected(RejectReason::AlreadyMarked))
    );
    assert_eq!(
        store.submit(request(&host, 1, 1, IntentKind::Unmark)).await,
        Err(StoreError::Rejected(RejectReason::Taken {
            owner: bob.participant
        }))
    );

    store
        .submit(request(&bob, 1, 1, IntentKind::Unmark))
        .await
        .expect("owner can unmark");
    assert_eq!(
        store.submit(request(&bob, 1, 1, IntentKind::Unmark)).await,
        Err(StoreError::Rejected(RejectReason::NotMarked))
    );
}

#[tokio::test]
async fn marks_require_an_active_session_and_a_player() {
    let store = MemoryStore::new();
    let host = store
        .create_session("host", GridSize::square(3))
        .await
        .unwrap();
    let watcher = store
        .join(&host.code, "watcher", Role::Spectator)
        .await
        .unwrap();

    assert_eq!(
        store.submit(request(&host, 0, 0, IntentKind::Mark)).await,
        Err(StoreError::Rejected(RejectReason::NotActive(
            Lifecycle::Pending
        )))
    );
    assert_eq!(
        store.submit(request(&watcher, 0, 0, IntentKind::Mark)).await,
        Err(StoreError::Rejected(RejectReason::Spectator))
    );

    store
        .transition(host.session, host.participant, Lifecycle::Active)
        .await
        .unwrap();
    assert_eq!(
        store.submit(request(&host, 3, 0, IntentKind::Mark)).await,
        Err(StoreError::Rejected(RejectReason::OutOfBounds))
    );
}

#[tokio::test]
async fn only_the_host_moves_the_lifecycle() {
    let store = MemoryStore::new();
    let (host, bob) = started(&store).await;

    let result = store
        .transition(bob.session, bob.participant, Lifecycle::Paused)
        .await;
    assert_eq!(
        result,
        Err(StoreError::Lifecycle(LifecycleError::NotHost {
            role: Role::Player
        }))
    );

    store
        .transition(host.session, host.participant, Lifecycle::Ended)
        .await
        .expect("host can end");
    let result = store
        .transition(host.session, host.participant, Lifecycle::Active)
        .await;
    assert_eq!(result, Err(StoreError::Lifecycle(LifecycleError::Ended)));

    assert!(matches!(
        store.subscribe(host.session).await,
        Err(StoreError::SessionEnded(_))
    ));
    assert!(matches!(
        store.join(&host.code, "late", Role::Player).await,
        Err(StoreError::SessionEnded(_))
    ));
}

#[tokio::test]
async fn subscribers_receive_committed_changes_in_order() {
    let store = MemoryStore::new();
    let (host, bob) = started(&store).await;
    let mut subscription = store.subscribe(host.session).await.unwrap();

    store
        .submit(request(&bob, 0, 0, IntentKind::Mark))
        .await
        .unwrap();
    store.leave(bob.session, bob.participant).await.unwrap();

    let Some(FeedMessage::Event(mark)) = subscription.receiver.recv().await else {
        panic!("expected a mark event");
    };
    assert_eq!(mark.operation, Operation::Insert);
    assert_eq!(mark.mark_actor(), Some(bob.participant));

    let Some(FeedMessage::Event(left)) = subscription.receiver.recv().await else {
        panic!("expected a participant event");
    };
    assert_eq!(left.operation, Operation::Delete);
    assert!(matches!(left.entity, EntitySnapshot::Participant(_)));
    assert!(left.revision > mark.revision);

    // Marks survive their owner leaving.
    let snapshot = store.fetch_snapshot(host.session).await.unwrap();
    assert_eq!(snapshot.marks.len(), 1);
}

#[tokio::test]
async fn duplicate_delivery_repeats_every_event() {
    let store = MemoryStore::new();
    let (host, bob) = started(&store).await;
    let mut subscription = store.subscribe(host.session).await.unwrap();
    store.set_duplicate_delivery(true);

    store
        .submit(request(&bob, 2, 2, IntentKind::Mark))
        .await
        .unwrap();

    let first = subscription.receiver.recv().await;
    let second = subscription.receiver.recv().await;
    assert!(matches!(first, Some(FeedMessage::Event(_))));
    assert_eq!(first, second);
}

#[tokio::test]
async fn dropped_and_lagging_subscribers_are_disconnected() {
    let store = MemoryStore::with_config(MemoryStoreConfig {
        feed_buffer_size: 1,
        ..MemoryStoreConfig::default()
    });
    let (host, bob) = started(&store).await;

    let mut dropped = store.subscribe(host.session).await.unwrap();
    assert_eq!(store.drop_subscribers(host.session), 1);
    assert_eq!(dropped.receiver.recv().await, Some(FeedMessage::Disconnected));
    assert_eq!(dropped.receiver.recv().await, None);

    let mut lagging = store.subscribe(host.session).await.unwrap();
    store
        .submit(request(&bob, 0, 0, IntentKind::Mark))
        .await
        .unwrap();
    store
        .submit(request(&bob, 0, 1, IntentKind::Mark))
        .await
        .unwrap();
    assert_eq!(store.subscriber_count(host.session), 0);
    assert!(matches!(
        lagging.receiver.recv().await,
        Some(FeedMessage::Event(_))
    ));
    assert_eq!(lagging.receiver.recv().await, None);

    let resubscribed = store.subscribe(host.session).await.unwrap();
    assert_eq!(store.subscriber_count(host.session), 1);
    store.unsubscribe(resubscribed.id);
    assert_eq!(store.subscriber_count(host.session), 0);
}
