// In-memory speakers for exercising links without sockets.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::sink;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use wamly_api::frame::methods;
use wamly_api::{
    Connection, Error, Frame, FrameKind, PropertyMap, PropertyValue, ReconnectConfig, Transport,
};
use wamly_core::{DeviceDescriptor, LinkConfig, LinkState, LinkUpdate};

pub const PORT: u16 = 55001;

type Inbound = mpsc::UnboundedSender<Result<Frame, Error>>;

/// How a fake speaker answers.
#[derive(Debug, Clone, Default)]
pub struct Behaviour {
    /// `open` fails as if the port were closed.
    pub refuse: bool,
    pub reject_handshake: bool,
    pub silent_handshake: bool,
    /// Methods that are never acknowledged.
    pub silent: HashSet<String>,
    /// Methods answered with an error frame.
    pub reject: HashSet<String>,
    /// Group token attached to every reply.
    pub group: Option<String>,
    /// Answer to the snapshot request.
    pub properties: PropertyMap,
}

pub struct FakeSpeaker {
    behaviour: Mutex<Behaviour>,
    opens: AtomicUsize,
    received: Mutex<Vec<Frame>>,
    current: Mutex<Option<Arc<Mutex<Option<Inbound>>>>>,
}

impl FakeSpeaker {
    fn new() -> Self {
        Self {
            behaviour: Mutex::new(Behaviour::default()),
            opens: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
            current: Mutex::new(None),
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut Behaviour)) {
        f(&mut self.behaviour.lock().unwrap());
    }

    /// Successful opens so far.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn received_methods(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|f| f.method.clone())
            .collect()
    }

    pub fn received_count(&self, method: &str) -> usize {
        self.received_methods().iter().filter(|m| *m == method).count()
    }

    /// Deliver an unsolicited item on the live connection.
    pub fn push(&self, item: Result<Frame, Error>) -> bool {
        let current = self.current.lock().unwrap();
        let Some(conn) = current.as_ref() else {
            return false;
        };
        let tx = conn.lock().unwrap();
        tx.as_ref().is_some_and(|tx| tx.send(item).is_ok())
    }

    pub fn push_event(&self, frame: Frame) -> bool {
        self.push(Ok(frame))
    }

    /// Close the live connection from the speaker side.
    pub fn drop_connection(&self) {
        if let Some(conn) = self.current.lock().unwrap().take() {
            conn.lock().unwrap().take();
        }
    }

    fn answer(&self, frame: &Frame) -> Option<Frame> {
        self.received.lock().unwrap().push(frame.clone());
        let mut b = self.behaviour.lock().unwrap();
        let method = frame.method.as_str();

        let reply = if method == methods::HANDSHAKE {
            if b.silent_handshake {
                return None;
            }
            if b.reject_handshake {
                Frame::error(method, "speaker busy")
            } else {
                Frame::response(method, PropertyMap::new())
            }
        } else if method == methods::GET_STATE {
            Frame::response(method, b.properties.clone())
        } else if b.silent.contains(method) {
            return None;
        } else if b.reject.contains(method) {
            Frame::error(method, "unsupported")
        } else {
            if method == methods::SET_POWER {
                if let Some(value) = frame.payload.get("strValue") {
                    b.properties.insert("power".into(), value.clone());
                    let mut payload = PropertyMap::new();
                    payload.insert("power".into(), value.clone());
                    return Some(decorate(Frame::response(method, payload), &b));
                }
            }
            Frame::response(method, frame.payload.clone())
        };
        Some(decorate(reply, &b))
    }
}

fn decorate(frame: Frame, b: &Behaviour) -> Frame {
    match &b.group {
        Some(token) => frame.with_group(token.clone()),
        None => frame,
    }
}

#[derive(Default)]
pub struct FakeTransport {
    speakers: Mutex<HashMap<String, Arc<FakeSpeaker>>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The speaker at `address`, created on first use.
    pub fn speaker(&self, address: &str) -> Arc<FakeSpeaker> {
        Arc::clone(
            self.speakers
                .lock()
                .unwrap()
                .entry(address.to_owned())
                .or_insert_with(|| Arc::new(FakeSpeaker::new())),
        )
    }
}

impl Transport for FakeTransport {
    fn open<'a>(&'a self, address: &'a str, port: u16) -> BoxFuture<'a, Result<Connection, Error>> {
        Box::pin(async move {
            let speaker = self.speakers.lock().unwrap().get(address).cloned();
            let Some(speaker) = speaker.filter(|s| !s.behaviour.lock().unwrap().refuse) else {
                return Err(Error::Connect {
                    address: format!("{address}:{port}"),
                    reason: "connection refused".into(),
                });
            };
            speaker.opens.fetch_add(1, Ordering::SeqCst);

            let (tx, rx) = mpsc::unbounded_channel();
            let shared = Arc::new(Mutex::new(Some(tx)));
            *speaker.current.lock().unwrap() = Some(Arc::clone(&shared));

            let state = (speaker, shared);
            let sink = sink::unfold(state, |state, frame: Frame| async move {
                let (speaker, shared) = &state;
                {
                    let tx = shared.lock().unwrap();
                    let Some(tx) = tx.as_ref() else {
                        return Err(Error::Closed);
                    };
                    if let Some(reply) = speaker.answer(&frame) {
                        let _ = tx.send(Ok(reply));
                    }
                }
                Ok(state)
            });

            Ok(Connection::new(
                Box::pin(sink),
                Box::pin(UnboundedReceiverStream::new(rx)),
                format!("{address}:{port}"),
            ))
        })
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

pub fn link_config() -> LinkConfig {
    LinkConfig {
        reconnect: ReconnectConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(400),
            max_retries: Some(5),
        },
        handshake_timeout: Duration::from_millis(500),
        command_timeout: Duration::from_millis(250),
        timeout_threshold: 3,
        event_log_capacity: 50,
    }
}

pub fn descriptor(address: &str) -> DeviceDescriptor {
    DeviceDescriptor::new(address, PORT)
}

pub fn text(value: &str) -> PropertyValue {
    PropertyValue::Text(value.to_owned())
}

pub fn props(pairs: &[(&str, PropertyValue)]) -> PropertyMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

pub fn event(method: &str, payload: PropertyMap) -> Frame {
    let mut frame = Frame::response(method, payload);
    frame.kind = FrameKind::Event;
    frame
}

/// Poll `check` until it holds, letting paused time advance in between.
pub async fn eventually(what: &str, check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never held: {what}");
}

/// Drain updates until a state change for the link matches `want`.
pub async fn next_state(
    updates: &mut mpsc::UnboundedReceiver<LinkUpdate>,
    want: impl Fn(LinkState) -> bool,
) -> LinkState {
    loop {
        let update = tokio::time::timeout(Duration::from_secs(30), updates.recv())
            .await
            .expect("timed out waiting for a state change")
            .expect("update channel closed");
        if let LinkUpdate::StateChanged { state, .. } = update {
            if want(state) {
                return state;
            }
        }
    }
}
