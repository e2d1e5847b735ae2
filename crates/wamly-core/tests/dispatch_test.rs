#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio::time::Instant;

use wamly_api::Transport;
use wamly_api::frame::methods;
use wamly_core::{Command, CoreError, DeviceId, Dispatcher, GroupIndex, LinkUpdate, Registry};

use common::{FakeTransport, descriptor, link_config};

struct Fixture {
    transport: Arc<FakeTransport>,
    registry: Arc<Registry>,
    groups: GroupIndex,
    dispatcher: Dispatcher,
    _updates: mpsc::UnboundedReceiver<LinkUpdate>,
}

fn fixture() -> Fixture {
    let transport = FakeTransport::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let dyn_transport: Arc<dyn Transport> = Arc::clone(&transport) as Arc<dyn Transport>;
    let registry = Arc::new(Registry::new(link_config(), dyn_transport, tx));
    Fixture {
        groups: GroupIndex::new(Arc::clone(&registry)),
        dispatcher: Dispatcher::new(Arc::clone(&registry), Duration::from_millis(250)),
        transport,
        registry,
        _updates: rx,
    }
}

impl Fixture {
    async fn connect(&self, address: &str, token: Option<&str>) {
        self.transport
            .speaker(address)
            .update(|b| b.group = token.map(str::to_owned));
        self.registry.connect(descriptor(address)).await.unwrap();
    }
}

fn ids(raw: &[&str]) -> Vec<DeviceId> {
    raw.iter().map(|s| DeviceId::from(*s)).collect()
}

// ── Group index ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn shared_token_forms_a_group() {
    let fx = fixture();
    fx.connect("10.0.0.1", Some("G1")).await;
    fx.connect("10.0.0.2", Some("G1")).await;
    fx.connect("10.0.0.3", None).await;

    let groups = fx.groups.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].token, "G1");
    assert_eq!(groups[0].anchor, DeviceId::from("10.0.0.1"));
    assert_eq!(groups[0].members, ids(&["10.0.0.1", "10.0.0.2"]));
}

#[tokio::test(start_paused = true)]
async fn disconnecting_a_member_dissolves_a_pair() {
    let fx = fixture();
    fx.connect("10.0.0.1", Some("G1")).await;
    fx.connect("10.0.0.2", Some("G1")).await;

    fx.registry.remove(&DeviceId::from("10.0.0.1")).await;

    assert!(fx.groups.groups().is_empty());
    assert!(matches!(
        fx.groups.resolve(&DeviceId::from("10.0.0.2")),
        Err(CoreError::GroupNotFound { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn separate_tokens_form_separate_groups() {
    let fx = fixture();
    fx.connect("10.0.0.1", Some("A")).await;
    fx.connect("10.0.0.2", Some("B")).await;
    fx.connect("10.0.0.3", Some("A")).await;
    fx.connect("10.0.0.4", Some("B")).await;
    fx.connect("10.0.0.5", Some("C")).await;

    let groups = fx.groups.groups();
    let tokens: Vec<&str> = groups.iter().map(|g| g.token.as_str()).collect();
    assert_eq!(tokens, vec!["A", "B"]);

    let resolved = fx.groups.resolve(&DeviceId::from("10.0.0.4")).unwrap();
    assert_eq!(resolved.members, ids(&["10.0.0.2", "10.0.0.4"]));
}

#[tokio::test(start_paused = true)]
async fn links_that_are_not_connected_are_ignored() {
    let fx = fixture();
    fx.connect("10.0.0.1", Some("G1")).await;
    fx.connect("10.0.0.2", Some("G1")).await;

    let speaker = fx.transport.speaker("10.0.0.2");
    speaker.update(|b| b.refuse = true);
    speaker.drop_connection();
    common::eventually("link left connected state", || {
        !fx.registry
            .lookup(&DeviceId::from("10.0.0.2"))
            .unwrap()
            .state()
            .is_connected()
    })
    .await;

    assert!(fx.groups.groups().is_empty());
}

// ── Dispatch ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn device_dispatch_to_unknown_id_fails() {
    let fx = fixture();
    let err = fx
        .dispatcher
        .send_to_device(&DeviceId::from("10.0.0.99"), &Command::Play)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DeviceNotFound { .. }));
}

#[tokio::test(start_paused = true)]
async fn group_dispatch_without_group_fails() {
    let fx = fixture();
    fx.connect("10.0.0.1", None).await;

    let err = fx
        .dispatcher
        .send_to_group(&DeviceId::from("10.0.0.1"), &Command::Play)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::GroupNotFound { .. }));
}

#[tokio::test(start_paused = true)]
async fn group_dispatch_reports_each_member() {
    let fx = fixture();
    for addr in ["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"] {
        fx.connect(addr, Some("G1")).await;
    }
    fx.transport
        .speaker("10.0.0.2")
        .update(|b| { b.silent.insert(methods::SET_VOLUME.to_owned()); });
    fx.transport
        .speaker("10.0.0.4")
        .update(|b| { b.reject.insert(methods::SET_VOLUME.to_owned()); });

    let command = Command::parse("volume", Some("30")).unwrap();
    let result = fx
        .dispatcher
        .send_to_group(&DeviceId::from("10.0.0.3"), &command)
        .await
        .unwrap();

    assert_eq!(result.successes, ids(&["10.0.0.1", "10.0.0.3"]));
    let failed: Vec<DeviceId> = result.failures.iter().map(|(id, _)| id.clone()).collect();
    assert_eq!(failed, ids(&["10.0.0.2", "10.0.0.4"]));
    assert!(result.failures[0].1.contains("did not acknowledge"));
    assert!(result.failures[1].1.contains("rejected"));
}

#[tokio::test(start_paused = true)]
async fn group_dispatch_returns_when_every_member_times_out() {
    let fx = fixture();
    for addr in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
        fx.connect(addr, Some("G1")).await;
        fx.transport
            .speaker(addr)
            .update(|b| { b.silent.insert(methods::PAUSE.to_owned()); });
    }

    let started = Instant::now();
    let result = fx
        .dispatcher
        .send_to_group(&DeviceId::from("10.0.0.1"), &Command::Pause)
        .await
        .unwrap();

    assert!(result.successes.is_empty());
    assert_eq!(result.failures.len(), 3);
    // Members run concurrently: one timeout budget, not three.
    assert_eq!(started.elapsed(), Duration::from_millis(250));
}
