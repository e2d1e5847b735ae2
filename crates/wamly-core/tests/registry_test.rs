#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio::time::Instant;

use wamly_api::Transport;
use wamly_core::{CoreError, DeviceId, LinkState, LinkUpdate, Registry};

use common::{FakeTransport, descriptor, link_config};

fn registry(transport: &Arc<FakeTransport>) -> (Arc<Registry>, mpsc::UnboundedReceiver<LinkUpdate>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let transport: Arc<dyn Transport> = Arc::clone(transport) as Arc<dyn Transport>;
    (Arc::new(Registry::new(link_config(), transport, tx)), rx)
}

#[tokio::test(start_paused = true)]
async fn live_entry_blocks_second_registration() {
    let transport = FakeTransport::new();
    transport.speaker("10.0.0.2");
    let (registry, _updates) = registry(&transport);

    registry.connect(descriptor("10.0.0.2")).await.unwrap();
    match registry.register(descriptor("10.0.0.2")) {
        Err(CoreError::AlreadyConnected { identifier }) => assert_eq!(identifier, "10.0.0.2"),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(registry.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn disconnected_entry_is_replaced() {
    let transport = FakeTransport::new();
    let (registry, _updates) = registry(&transport);

    let first = registry.register(descriptor("10.0.0.2")).unwrap();
    let second = registry.register(descriptor("10.0.0.2")).unwrap();

    assert_ne!(first.instance(), second.instance());
    let current = registry.lookup(&DeviceId::from("10.0.0.2")).unwrap();
    assert_eq!(current.instance(), second.instance());
}

#[tokio::test(start_paused = true)]
async fn failed_connect_leaves_no_entry() {
    let transport = FakeTransport::new();
    let (registry, _updates) = registry(&transport);

    let err = registry.connect(descriptor("10.0.0.9")).await.unwrap_err();
    assert!(matches!(err, CoreError::Connect { .. }));
    assert!(registry.is_empty());
    assert!(matches!(
        registry.lookup(&DeviceId::from("10.0.0.9")),
        Err(CoreError::DeviceNotFound { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn concurrent_connects_yield_one_live_link() {
    let transport = FakeTransport::new();
    let speaker = transport.speaker("10.0.0.2");
    let (registry, _updates) = registry(&transport);

    let attempts = futures_util::future::join_all((0..5).map(|_| {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move { registry.connect(descriptor("10.0.0.2")).await })
    }))
    .await;

    let ok = attempts.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
    let already = attempts
        .iter()
        .filter(|r| matches!(r, Ok(Err(CoreError::AlreadyConnected { .. }))))
        .count();
    assert_eq!((ok, already), (1, 4));
    assert_eq!(speaker.opens(), 1);

    let live: Vec<_> = registry
        .snapshot()
        .into_iter()
        .filter(|l| l.state().is_live())
        .collect();
    assert_eq!(live.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn remove_is_idempotent() {
    let transport = FakeTransport::new();
    transport.speaker("10.0.0.2");
    let (registry, _updates) = registry(&transport);
    let link = registry.connect(descriptor("10.0.0.2")).await.unwrap();

    let id = DeviceId::from("10.0.0.2");
    assert!(registry.remove(&id).await);
    assert!(!registry.remove(&id).await);
    assert!(!registry.remove(&DeviceId::from("10.9.9.9")).await);
    assert_eq!(link.state(), LinkState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn removal_is_queued_after_the_final_state_change() {
    let transport = FakeTransport::new();
    transport.speaker("10.0.0.2");
    let (registry, mut updates) = registry(&transport);
    registry.connect(descriptor("10.0.0.2")).await.unwrap();
    while updates.try_recv().is_ok() {}

    registry.remove(&DeviceId::from("10.0.0.2")).await;
    registry.remove(&DeviceId::from("10.0.0.2")).await;

    let mut tail = Vec::new();
    while let Ok(update) = updates.try_recv() {
        // Snapshot data may still be in flight; only lifecycle updates matter.
        if matches!(update, LinkUpdate::StateChanged { .. } | LinkUpdate::Removed { .. }) {
            tail.push(update);
        }
    }
    assert_eq!(tail.len(), 2, "{tail:?}");
    assert!(matches!(
        tail[0],
        LinkUpdate::StateChanged {
            state: LinkState::Disconnected,
            ..
        }
    ));
    assert!(matches!(&tail[1], LinkUpdate::Removed { reason, .. } if reason == "disconnected"));
}

#[tokio::test(start_paused = true)]
async fn per_id_locks_are_released() {
    let transport = FakeTransport::new();
    transport.speaker("10.0.0.2");
    let (registry, _updates) = registry(&transport);

    registry.connect(descriptor("10.0.0.2")).await.unwrap();
    registry.connect(descriptor("10.0.0.3")).await.unwrap_err();
    registry.remove(&DeviceId::from("10.0.0.2")).await;
    registry.remove(&DeviceId::from("10.0.0.4")).await;

    assert_eq!(registry.busy_ids(), 0);
}

#[tokio::test(start_paused = true)]
async fn disconnect_all_reports_only_live_links() {
    let transport = FakeTransport::new();
    transport.speaker("10.0.0.2");
    transport.speaker("10.0.0.3");
    let (registry, _updates) = registry(&transport);

    registry.connect(descriptor("10.0.0.2")).await.unwrap();
    registry.connect(descriptor("10.0.0.3")).await.unwrap();
    registry.register(descriptor("10.0.0.4")).unwrap();

    let first = registry.disconnect_all().await;
    assert_eq!(first, vec![DeviceId::from("10.0.0.2"), DeviceId::from("10.0.0.3")]);
    assert!(registry.is_empty());

    assert!(registry.disconnect_all().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn stale_failure_does_not_remove_newer_link() {
    let transport = FakeTransport::new();
    transport.speaker("10.0.0.2");
    let (registry, _updates) = registry(&transport);
    let id = DeviceId::from("10.0.0.2");

    let link = registry.connect(descriptor("10.0.0.2")).await.unwrap();
    assert!(!registry.remove_failed(&id, link.instance() + 100, "gave up".into()).await);
    assert!(registry.contains(&id));

    assert!(registry.remove_failed(&id, link.instance(), "gave up".into()).await);
    assert!(!registry.contains(&id));
}

#[tokio::test(start_paused = true)]
async fn failure_cleanup_does_not_wait_for_a_pending_connect() {
    let transport = FakeTransport::new();
    transport
        .speaker("10.0.0.2")
        .update(|b| b.silent_handshake = true);
    let (registry, _updates) = registry(&transport);
    let id = DeviceId::from("10.0.0.2");
    let stale = registry.register(descriptor("10.0.0.2")).unwrap();

    let connecting = tokio::spawn({
        let registry = Arc::clone(&registry);
        async move { registry.connect(descriptor("10.0.0.2")).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(registry.busy_ids(), 1, "connect should be mid-handshake");

    let started = Instant::now();
    let removed = registry
        .remove_failed(&id, stale.instance(), "gave up".into())
        .await;
    assert!(!removed, "the pending connect already replaced the stale link");
    assert_eq!(started.elapsed(), Duration::ZERO);

    assert!(connecting.await.unwrap().is_err());
}

#[tokio::test(start_paused = true)]
async fn snapshot_keeps_insertion_order() {
    let transport = FakeTransport::new();
    let (registry, _updates) = registry(&transport);
    for addr in ["10.0.0.7", "10.0.0.3", "10.0.0.5"] {
        registry.register(descriptor(addr)).unwrap();
    }

    let order: Vec<String> = registry
        .snapshot()
        .iter()
        .map(|l| l.id().to_string())
        .collect();
    assert_eq!(order, vec!["10.0.0.7", "10.0.0.3", "10.0.0.5"]);
}
