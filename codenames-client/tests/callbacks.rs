//! Push notifications from the transport to application subscribers.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use codenames_client::services::lobby::{Lobby, LobbyNotification};
use codenames_client::services::matchmaking::{Matchmaking, MatchmakingNotification};
use codenames_client::services::session::{Session, SessionNotification};
use codenames_client::testing::MockDuplexFactory;
use codenames_client::{
    CallbackConcurrency, ConnectionState, KickReason, LobbyProxy, MatchId, MatchmakingProxy,
    SessionProxy,
};
use common::{assert_quiet, init_tracing, next_event, player, test_config};
use tokio::sync::mpsc;

fn session(factory: &MockDuplexFactory<Session>) -> SessionProxy {
    SessionProxy::new(factory.clone().into_dyn(), test_config())
}

fn online(id: &str) -> SessionNotification {
    SessionNotification::FriendOnline {
        friend_id: player(id),
    }
}

#[tokio::test]
async fn test_push_reaches_listeners_and_streams() {
    init_tracing();
    let factory = MockDuplexFactory::<Session>::new();
    let proxy = session(&factory);
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen);
        proxy
            .callbacks()
            .subscribe(move |event| seen.lock().expect("lock").push(event.clone()));
    }
    let mut stream = proxy.callbacks().stream();

    assert!(proxy.initialize(&player("p-1")).await.is_success());
    assert!(factory.push(online("p-2")));

    assert_eq!(next_event(&mut stream).await, Some(online("p-2")));
    assert_eq!(*seen.lock().expect("lock"), vec![online("p-2")]);
}

#[tokio::test]
async fn test_named_subscription_only_sees_its_event() {
    let factory = MockDuplexFactory::<Session>::new();
    let proxy = session(&factory);
    let kicks = Arc::new(AtomicUsize::new(0));
    {
        let kicks = Arc::clone(&kicks);
        proxy.callbacks().subscribe_named("kicked", move |_| {
            kicks.fetch_add(1, Ordering::SeqCst);
        });
    }
    let mut stream = proxy.callbacks().stream();

    assert!(proxy.initialize(&player("p-1")).await.is_success());
    factory.push(online("p-2"));
    factory.push(SessionNotification::Kicked {
        reason: KickReason::DuplicateLogin,
    });

    next_event(&mut stream).await;
    next_event(&mut stream).await;
    assert_eq!(kicks.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reentrant_service_preserves_arrival_order() {
    let factory = MockDuplexFactory::<Lobby>::new();
    let proxy = LobbyProxy::new(factory.clone().into_dyn(), test_config());
    assert_eq!(
        proxy.connection().callback_concurrency(),
        CallbackConcurrency::Reentrant
    );
    let mut stream = proxy.callbacks().stream();
    assert!(proxy.initialize(&player("p-1")).await.is_success());

    let sent: Vec<_> = (0..20)
        .map(|i| LobbyNotification::GuestLeft {
            player_id: player(&format!("p-{i}")),
        })
        .collect();
    for event in &sent {
        assert!(factory.push(event.clone()));
    }

    let mut received = Vec::new();
    for _ in 0..sent.len() {
        received.push(next_event(&mut stream).await.expect("event"));
    }
    assert_eq!(received, sent);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_service_delivers_every_notification() {
    let factory = MockDuplexFactory::<Matchmaking>::new();
    let proxy = MatchmakingProxy::new(factory.clone().into_dyn(), test_config());
    assert_eq!(
        proxy.connection().callback_concurrency(),
        CallbackConcurrency::Concurrent
    );
    let count = Arc::new(AtomicUsize::new(0));
    {
        let count = Arc::clone(&count);
        proxy.callbacks().subscribe(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });
    }
    let mut stream = proxy.callbacks().stream();
    assert!(proxy.initialize(&player("p-1")).await.is_success());

    for i in 0..10 {
        factory.push(MatchmakingNotification::MatchCanceled {
            match_id: MatchId::new(format!("m-{i}")),
            canceled_by: None,
        });
    }

    let mut ids = Vec::new();
    for _ in 0..10 {
        match next_event(&mut stream).await {
            Some(MatchmakingNotification::MatchCanceled { match_id, .. }) => ids.push(match_id),
            other => panic!("expected MatchCanceled, got {other:?}"),
        }
    }
    ids.sort();
    let mut expected: Vec<_> = (0..10).map(|i| MatchId::new(format!("m-{i}"))).collect();
    expected.sort();
    assert_eq!(ids, expected);
    assert_eq!(count.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn test_concurrency_can_be_overridden() {
    let factory = MockDuplexFactory::<Session>::new();
    let config = test_config().with_callback_concurrency(CallbackConcurrency::Concurrent);
    let proxy = SessionProxy::new(factory.into_dyn(), config);
    assert_eq!(
        proxy.connection().callback_concurrency(),
        CallbackConcurrency::Concurrent
    );
}

#[tokio::test]
async fn test_released_channel_callbacks_are_dropped() {
    let factory = MockDuplexFactory::<Session>::new();
    let proxy = session(&factory);
    let mut stream = proxy.callbacks().stream();

    assert!(proxy.initialize(&player("p-1")).await.is_success());
    let old_sink = factory.sink().expect("sink");
    proxy.disconnect().await;
    assert!(proxy.initialize(&player("p-1")).await.is_success());

    old_sink.notify(online("stale"));
    factory.push(online("fresh"));

    assert_eq!(next_event(&mut stream).await, Some(online("fresh")));
    assert_quiet(&mut stream).await;
}

#[tokio::test]
async fn test_fault_from_released_channel_is_ignored() {
    let factory = MockDuplexFactory::<Session>::new();
    let proxy = session(&factory);
    assert!(proxy.initialize(&player("p-1")).await.is_success());
    let old_sink = factory.sink().expect("sink");
    proxy.disconnect().await;

    old_sink.fault("late fault");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(proxy.state().await, ConnectionState::Closed);
    assert_eq!(factory.counters().closes(), 1);
}

#[tokio::test]
async fn test_subscribers_survive_reconnects() {
    let factory = MockDuplexFactory::<Session>::new();
    let proxy = session(&factory);
    let count = Arc::new(AtomicUsize::new(0));
    {
        let count = Arc::clone(&count);
        proxy.callbacks().subscribe(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });
    }
    let mut stream = proxy.callbacks().stream();

    for round in 0..3 {
        assert!(proxy.initialize(&player("p-1")).await.is_success());
        factory.push(online(&format!("p-{round}")));
        next_event(&mut stream).await.expect("event");
        proxy.disconnect().await;
    }
    assert_eq!(count.load(Ordering::SeqCst), 3);
    assert_eq!(proxy.callbacks().listener_count(), 1);
}

#[tokio::test]
async fn test_listener_can_call_back_into_its_proxy() {
    let factory = MockDuplexFactory::<Session>::new();
    factory.respond_with(|_| vec![player("p-2"), player("p-3")]);
    let proxy = session(&factory);
    let (tx, mut rx) = mpsc::unbounded_channel();
    {
        let handle = proxy.clone();
        proxy.callbacks().subscribe_named("friend_online", move |_| {
            let handle = handle.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let _ = tx.send(handle.online_friends().await);
            });
        });
    }

    assert!(proxy.initialize(&player("p-1")).await.is_success());
    factory.push(online("p-2"));

    let friends = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("listener ran")
        .expect("reply");
    assert_eq!(friends, vec![player("p-2"), player("p-3")]);
}

#[tokio::test]
async fn test_panicking_listener_does_not_break_dispatch() {
    let factory = MockDuplexFactory::<Session>::new();
    let proxy = session(&factory);
    proxy.callbacks().subscribe(|_| panic!("listener bug"));
    let mut stream = proxy.callbacks().stream();

    assert!(proxy.initialize(&player("p-1")).await.is_success());
    factory.push(online("p-2"));
    factory.push(online("p-3"));

    assert_eq!(next_event(&mut stream).await, Some(online("p-2")));
    assert_eq!(next_event(&mut stream).await, Some(online("p-3")));
    assert_eq!(proxy.state().await, ConnectionState::Opened);
}
