// ── Device link ──
//
// One persistent connection to one speaker. A link owns a worker task
// that multiplexes outbound calls and inbound frames over the socket,
// records every inbound frame, and reconnects with capped exponential
// backoff when the socket drops. State changes and data leave the link
// only through the `LinkUpdate` channel.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wamly_api::frame::methods;
use wamly_api::{ApiCall, Backoff, Connection, Frame, FrameKind, PropertyMap, PropertyValue, Transport};

use crate::config::LinkConfig;
use crate::error::CoreError;
use crate::model::{DeviceDescriptor, DeviceEvent, DeviceId, DeviceInfo, DeviceSnapshot};

const REQUEST_CHANNEL_SIZE: usize = 64;

// ── LinkState ────────────────────────────────────────────────────────

/// Connection state of a single link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
}

impl LinkState {
    /// Anything but `Disconnected`: the link holds or is chasing a socket.
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
        }
    }
}

// ── CallOptions ──────────────────────────────────────────────────────

/// Per-call behaviour for [`DeviceLink::send_command`].
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Power the speaker on first if it does not report itself as on.
    pub requires_power_on: bool,
    /// Method of the frame that acknowledges the call. Defaults to the
    /// call's own method.
    pub expected_response: Option<String>,
    /// Acknowledgement budget.
    pub timeout: Duration,
}

impl CallOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            requires_power_on: false,
            expected_response: None,
            timeout,
        }
    }
}

// ── LinkUpdate ───────────────────────────────────────────────────────

/// Everything a link reports to the rest of the system.
#[derive(Debug, Clone)]
pub enum LinkUpdate {
    StateChanged {
        device: DeviceId,
        state: LinkState,
    },
    /// Only the properties whose value actually changed.
    Properties {
        device: DeviceId,
        changed: PropertyMap,
    },
    Event(Arc<DeviceEvent>),
    GroupTokenChanged {
        device: DeviceId,
        token: Option<String>,
    },
    /// Reconnection gave up. `instance` identifies the exact link so a
    /// newer link for the same id is never torn down by mistake.
    Failed {
        device: DeviceId,
        instance: u64,
        reason: String,
    },
    /// The registry dropped the entry. Sent by the registry, not the link.
    Removed {
        device: DeviceId,
        reason: String,
    },
}

// ── Worker plumbing ──────────────────────────────────────────────────

enum LinkRequest {
    Call {
        frame: Frame,
        pending: Pending,
    },
    /// Drop the socket and go through the reconnect path.
    Recycle,
}

struct Pending {
    method: String,
    expected: String,
    reply: oneshot::Sender<Result<Frame, CoreError>>,
}

impl Pending {
    fn matches(&self, frame: &Frame) -> bool {
        frame.is_ack_for(&self.expected)
            || (frame.kind == FrameKind::Error && frame.method == self.method)
    }
}

struct Session {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

enum Reconnect {
    Connected(Connection),
    Cancelled,
    GaveUp,
}

// ── DeviceLink ───────────────────────────────────────────────────────

/// Handle to one speaker connection.
///
/// Cheaply cloneable via `Arc<LinkInner>`. The registry owns the canonical
/// handle; clones handed to the dispatcher or group index are only views.
#[derive(Clone)]
pub struct DeviceLink {
    inner: Arc<LinkInner>,
}

struct LinkInner {
    descriptor: DeviceDescriptor,
    instance: u64,
    config: LinkConfig,
    transport: Arc<dyn Transport>,
    updates: mpsc::UnboundedSender<LinkUpdate>,

    state: watch::Sender<LinkState>,
    properties: ArcSwap<PropertyMap>,
    group_token: ArcSwapOption<String>,
    events: Mutex<VecDeque<Arc<DeviceEvent>>>,
    consecutive_timeouts: AtomicU32,

    requests: ArcSwapOption<mpsc::Sender<LinkRequest>>,
    session: tokio::sync::Mutex<Option<Session>>,
}

impl std::fmt::Debug for DeviceLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLink")
            .field("id", self.id())
            .field("instance", &self.inner.instance)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl DeviceLink {
    /// Create a link in `Disconnected`. Nothing touches the network until
    /// [`connect`](Self::connect).
    pub fn new(
        descriptor: DeviceDescriptor,
        instance: u64,
        config: LinkConfig,
        transport: Arc<dyn Transport>,
        updates: mpsc::UnboundedSender<LinkUpdate>,
    ) -> Self {
        let (state, _) = watch::channel(LinkState::Disconnected);
        Self {
            inner: Arc::new(LinkInner {
                descriptor,
                instance,
                config,
                transport,
                updates,
                state,
                properties: ArcSwap::from_pointee(PropertyMap::new()),
                group_token: ArcSwapOption::empty(),
                events: Mutex::new(VecDeque::new()),
                consecutive_timeouts: AtomicU32::new(0),
                requests: ArcSwapOption::empty(),
                session: tokio::sync::Mutex::new(None),
            }),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn id(&self) -> &DeviceId {
        &self.inner.descriptor.id
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.inner.descriptor
    }

    /// Registry-assigned number distinguishing successive links for one id.
    pub fn instance(&self) -> u64 {
        self.inner.instance
    }

    pub fn state(&self) -> LinkState {
        *self.inner.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<LinkState> {
        self.inner.state.subscribe()
    }

    /// Last-known property snapshot.
    pub fn properties(&self) -> Arc<PropertyMap> {
        self.inner.properties.load_full()
    }

    pub fn group_token(&self) -> Option<String> {
        self.inner.group_token.load_full().map(|t| (*t).clone())
    }

    /// Most recent events first, at most `limit` of them.
    pub fn events(&self, limit: usize) -> Vec<Arc<DeviceEvent>> {
        let log = self
            .inner
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        log.iter().take(limit).cloned().collect()
    }

    pub fn is_powered_on(&self) -> bool {
        match self.inner.properties.load().get("power") {
            Some(PropertyValue::Text(s)) => s.eq_ignore_ascii_case("on"),
            Some(PropertyValue::Integer(n)) => *n != 0,
            _ => false,
        }
    }

    pub fn info(&self) -> DeviceInfo {
        DeviceInfo::from_properties(&self.inner.descriptor, &self.properties())
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        let d = &self.inner.descriptor;
        DeviceSnapshot {
            id: d.id.clone(),
            address: d.address.clone(),
            port: d.port,
            name: d.name.clone(),
            state: self.state(),
            group_token: self.group_token(),
            properties: (*self.properties()).clone(),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open the socket, complete the handshake, request a property
    /// snapshot, and start the worker.
    ///
    /// A link that is already live is left alone.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let mut session = self.inner.session.lock().await;
        if session.is_some() && self.state().is_live() {
            return Ok(());
        }
        if let Some(stale) = session.take() {
            stale.stop().await;
        }

        self.inner.set_state(LinkState::Connecting);
        let mut conn = match self.inner.open_and_handshake().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(device = %self.id(), error = %e, "connect failed");
                self.inner.set_state(LinkState::Disconnected);
                return Err(e);
            }
        };
        if let Err(e) = conn.sink.send(snapshot_request()).await {
            self.inner.set_state(LinkState::Disconnected);
            return Err(self.inner.connect_error(&e.to_string()));
        }

        let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        self.inner.requests.store(Some(Arc::new(request_tx)));
        self.inner.consecutive_timeouts.store(0, Ordering::Relaxed);
        self.inner.set_state(LinkState::Connected);
        info!(device = %self.id(), peer = %conn.peer, "speaker connected");

        let handle = tokio::spawn(run_worker(
            Arc::clone(&self.inner),
            conn,
            request_rx,
            cancel.clone(),
        ));
        *session = Some(Session { cancel, handle });
        Ok(())
    }

    /// Stop the worker, release the socket, and settle in `Disconnected`.
    /// Safe to call in any state, any number of times.
    pub async fn disconnect(&self) {
        let mut session = self.inner.session.lock().await;
        self.inner.requests.store(None);
        if let Some(session) = session.take() {
            session.stop().await;
            debug!(device = %self.id(), "link stopped");
        }
        self.inner.set_state(LinkState::Disconnected);
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Issue a call and wait for its acknowledgement.
    pub async fn send_command(&self, call: &ApiCall, options: &CallOptions) -> Result<Frame, CoreError> {
        if !self.state().is_connected() {
            return Err(self.not_connected());
        }

        if options.requires_power_on && !self.is_powered_on() {
            debug!(device = %self.id(), "powering on before {}", call.method);
            let power_on = ApiCall::uic(methods::SET_POWER).with_arg("strValue", "on");
            self.round_trip(&power_on, methods::SET_POWER, options.timeout)
                .await?;
        }

        let expected = options
            .expected_response
            .as_deref()
            .unwrap_or(&call.method);
        self.round_trip(call, expected, options.timeout).await
    }

    async fn round_trip(&self, call: &ApiCall, expected: &str, timeout: Duration) -> Result<Frame, CoreError> {
        let Some(requests) = self.inner.requests.load_full() else {
            return Err(self.not_connected());
        };

        let (reply, reply_rx) = oneshot::channel();
        let request = LinkRequest::Call {
            frame: Frame::request(call),
            pending: Pending {
                method: call.method.clone(),
                expected: expected.to_owned(),
                reply,
            },
        };

        let exchange = async {
            requests
                .send(request)
                .await
                .map_err(|_| self.not_connected())?;
            reply_rx.await.map_err(|_| self.not_connected())?
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => {
                if result.is_ok() {
                    self.inner.consecutive_timeouts.store(0, Ordering::Relaxed);
                }
                result
            }
            Err(_) => {
                self.inner.note_timeout(&requests);
                Err(CoreError::Timeout {
                    device: self.id().to_string(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }

    fn not_connected(&self) -> CoreError {
        CoreError::NotConnected {
            device: self.id().to_string(),
        }
    }
}

impl Session {
    async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                warn!(error = %e, "link worker panicked");
            }
        }
    }
}

// ── LinkInner: state and frame bookkeeping ───────────────────────────

impl LinkInner {
    fn id(&self) -> &DeviceId {
        &self.descriptor.id
    }

    fn set_state(&self, next: LinkState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            debug!(device = %self.id(), state = %next, "link state");
            self.emit(LinkUpdate::StateChanged {
                device: self.id().clone(),
                state: next,
            });
        }
    }

    fn emit(&self, update: LinkUpdate) {
        // No receiver means the controller is gone; nothing left to inform.
        let _ = self.updates.send(update);
    }

    fn connect_error(&self, reason: &str) -> CoreError {
        CoreError::Connect {
            address: format!("{}:{}", self.descriptor.address, self.descriptor.port),
            reason: reason.to_owned(),
        }
    }

    async fn open_and_handshake(&self) -> Result<Connection, CoreError> {
        let d = &self.descriptor;
        let budget = self.config.handshake_timeout;

        let attempt = async {
            let mut conn = self.transport.open(&d.address, d.port).await?;
            conn.sink
                .send(Frame::request(&ApiCall::uic(methods::HANDSHAKE)))
                .await?;
            loop {
                match conn.stream.next().await {
                    Some(Ok(frame)) if frame.is_ack_for(methods::HANDSHAKE) => {
                        self.record(&frame);
                        if frame.kind == FrameKind::Error {
                            return Err(wamly_api::Error::HandshakeRejected {
                                address: conn.peer.clone(),
                                reason: frame.error.unwrap_or_else(|| "rejected".into()),
                            });
                        }
                        return Ok(conn);
                    }
                    Some(Ok(frame)) => self.record(&frame),
                    Some(Err(e)) if e.is_frame_local() => {
                        warn!(device = %d.id, error = %e, "skipping malformed frame");
                    }
                    Some(Err(e)) => return Err(e),
                    None => return Err(wamly_api::Error::Closed),
                }
            }
        };

        match tokio::time::timeout(budget, attempt).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(self.connect_error(&e.to_string())),
            Err(_) => Err(self.connect_error(&format!(
                "handshake not acknowledged within {}ms",
                budget.as_millis()
            ))),
        }
    }

    /// Log an inbound frame and fold its payload into the link's state.
    fn record(&self, frame: &Frame) {
        let event = Arc::new(DeviceEvent::from_frame(self.id().clone(), frame));
        {
            let mut log = self.events.lock().unwrap_or_else(PoisonError::into_inner);
            log.push_front(Arc::clone(&event));
            log.truncate(self.config.event_log_capacity);
        }
        self.emit(LinkUpdate::Event(event));

        if !frame.payload.is_empty() {
            let current = self.properties.load_full();
            let changed: PropertyMap = frame
                .payload
                .iter()
                .filter(|(k, v)| current.get(*k) != Some(*v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if !changed.is_empty() {
                let mut merged = (*current).clone();
                merged.extend(changed.clone());
                self.properties.store(Arc::new(merged));
                self.emit(LinkUpdate::Properties {
                    device: self.id().clone(),
                    changed,
                });
            }
        }

        if let Some(reported) = &frame.group {
            let next = Some(reported.as_str()).filter(|t| !t.is_empty());
            let current = self.group_token.load_full();
            if current.as_deref().map(String::as_str) != next {
                let next = next.map(str::to_owned);
                self.group_token.store(next.clone().map(Arc::new));
                debug!(device = %self.id(), token = ?next, "group token changed");
                self.emit(LinkUpdate::GroupTokenChanged {
                    device: self.id().clone(),
                    token: next,
                });
            }
        }
    }

    fn note_timeout(&self, requests: &mpsc::Sender<LinkRequest>) {
        let count = self.consecutive_timeouts.fetch_add(1, Ordering::Relaxed) + 1;
        let threshold = self.config.timeout_threshold;
        warn!(device = %self.id(), consecutive = count, "command timed out");
        if threshold > 0 && count >= threshold {
            self.consecutive_timeouts.store(0, Ordering::Relaxed);
            info!(device = %self.id(), threshold, "recycling connection after repeated timeouts");
            if requests.try_send(LinkRequest::Recycle).is_err() {
                debug!(device = %self.id(), "recycle request dropped, worker busy or gone");
            }
        }
    }

    async fn reconnect(
        &self,
        backoff: &mut Backoff,
        requests: &mut mpsc::Receiver<LinkRequest>,
        cancel: &CancellationToken,
    ) -> Reconnect {
        loop {
            let Some(delay) = backoff.next_delay() else {
                return Reconnect::GaveUp;
            };
            let attempt = backoff.attempt();
            self.set_state(LinkState::Reconnecting { attempt });
            info!(
                device = %self.id(),
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "reconnecting"
            );

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Reconnect::Cancelled,
                    () = &mut sleep => break,
                    Some(request) = requests.recv() => reject(request, self.id()),
                }
            }

            self.set_state(LinkState::Connecting);
            let opened = tokio::select! {
                biased;
                () = cancel.cancelled() => return Reconnect::Cancelled,
                result = self.open_and_handshake() => result,
            };
            match opened {
                Ok(mut conn) => match conn.sink.send(snapshot_request()).await {
                    Ok(()) => {
                        backoff.reset();
                        self.consecutive_timeouts.store(0, Ordering::Relaxed);
                        self.set_state(LinkState::Connected);
                        info!(device = %self.id(), attempt, "speaker reconnected");
                        return Reconnect::Connected(conn);
                    }
                    Err(e) => warn!(device = %self.id(), attempt, error = %e, "snapshot request failed"),
                },
                Err(e) => warn!(device = %self.id(), attempt, error = %e, "reconnect attempt failed"),
            }
        }
    }
}

fn snapshot_request() -> Frame {
    Frame::request(&ApiCall::uic(methods::GET_STATE))
}

fn reject(request: LinkRequest, device: &DeviceId) {
    if let LinkRequest::Call { pending, .. } = request {
        let _ = pending.reply.send(Err(CoreError::NotConnected {
            device: device.to_string(),
        }));
    }
}

/// Resolve the oldest pending call this frame acknowledges, if any.
fn settle(pending: &mut VecDeque<Pending>, frame: &Frame) {
    pending.retain(|p| !p.reply.is_closed());
    let Some(pos) = pending.iter().position(|p| p.matches(frame)) else {
        return;
    };
    if let Some(p) = pending.remove(pos) {
        let outcome = if frame.kind == FrameKind::Error {
            Err(CoreError::Rejected {
                method: p.method,
                message: frame
                    .error
                    .clone()
                    .unwrap_or_else(|| "rejected by speaker".into()),
            })
        } else {
            Ok(frame.clone())
        };
        let _ = p.reply.send(outcome);
    }
}

// ── Worker task ──────────────────────────────────────────────────────

async fn run_worker(
    inner: Arc<LinkInner>,
    mut conn: Connection,
    mut requests: mpsc::Receiver<LinkRequest>,
    cancel: CancellationToken,
) {
    let mut backoff = Backoff::new(inner.config.reconnect.clone());
    let mut pending: VecDeque<Pending> = VecDeque::new();

    loop {
        let lost = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                fail_all(&mut pending, &mut requests, inner.id());
                let _ = conn.sink.close().await;
                return;
            }
            request = requests.recv() => match request {
                Some(LinkRequest::Call { frame, pending: waiter }) => {
                    match conn.sink.send(frame).await {
                        Ok(()) => {
                            pending.push_back(waiter);
                            continue;
                        }
                        Err(e) if e.is_frame_local() => {
                            let _ = waiter.reply.send(Err(e.into()));
                            continue;
                        }
                        Err(e) => {
                            let _ = waiter.reply.send(Err(CoreError::NotConnected {
                                device: inner.id().to_string(),
                            }));
                            e.to_string()
                        }
                    }
                }
                Some(LinkRequest::Recycle) => "repeated command timeouts".to_owned(),
                None => return,
            },
            inbound = conn.stream.next() => match inbound {
                Some(Ok(frame)) => {
                    inner.record(&frame);
                    settle(&mut pending, &frame);
                    continue;
                }
                Some(Err(e)) if e.is_frame_local() => {
                    warn!(device = %inner.id(), error = %e, "skipping malformed frame");
                    continue;
                }
                Some(Err(e)) => e.to_string(),
                None => "connection closed by speaker".to_owned(),
            },
        };

        warn!(device = %inner.id(), reason = %lost, "connection lost");
        fail_all(&mut pending, &mut requests, inner.id());
        let _ = conn.sink.close().await;

        match inner.reconnect(&mut backoff, &mut requests, &cancel).await {
            Reconnect::Connected(fresh) => conn = fresh,
            Reconnect::Cancelled => return,
            Reconnect::GaveUp => {
                inner.requests.store(None);
                inner.set_state(LinkState::Disconnected);
                warn!(
                    device = %inner.id(),
                    attempts = backoff.attempt(),
                    "giving up on speaker"
                );
                inner.emit(LinkUpdate::Failed {
                    device: inner.id().clone(),
                    instance: inner.instance,
                    reason: format!("reconnect failed after {} attempts: {lost}", backoff.attempt()),
                });
                return;
            }
        }
    }
}

/// Fail every in-flight and queued call with `NotConnected`.
fn fail_all(pending: &mut VecDeque<Pending>, requests: &mut mpsc::Receiver<LinkRequest>, device: &DeviceId) {
    for p in pending.drain(..) {
        let _ = p.reply.send(Err(CoreError::NotConnected {
            device: device.to_string(),
        }));
    }
    while let Ok(request) = requests.try_recv() {
        reject(request, device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(method: &str, expected: &str) -> (Pending, oneshot::Receiver<Result<Frame, CoreError>>) {
        let (reply, rx) = oneshot::channel();
        (
            Pending {
                method: method.into(),
                expected: expected.into(),
                reply,
            },
            rx,
        )
    }

    #[test]
    fn settle_matches_expected_response() {
        let mut queue = VecDeque::new();
        let (p, mut rx) = pending(methods::SET_VOLUME, "VolumeLevel");
        queue.push_back(p);

        settle(&mut queue, &Frame::response(methods::SET_VOLUME, PropertyMap::new()));
        assert_eq!(queue.len(), 1, "ack for the call method is not the expected response");

        settle(&mut queue, &Frame::event("VolumeLevel", PropertyMap::new()));
        assert!(queue.is_empty());
        assert!(matches!(rx.try_recv(), Ok(Ok(_))));
    }

    #[test]
    fn settle_turns_error_frames_into_rejections() {
        let mut queue = VecDeque::new();
        let (p, mut rx) = pending(methods::SET_INPUT, methods::SET_INPUT);
        queue.push_back(p);

        settle(&mut queue, &Frame::error(methods::SET_INPUT, "unsupported source"));
        match rx.try_recv() {
            Ok(Err(CoreError::Rejected { method, message })) => {
                assert_eq!(method, methods::SET_INPUT);
                assert_eq!(message, "unsupported source");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn settle_skips_abandoned_callers() {
        let mut queue = VecDeque::new();
        let (stale, stale_rx) = pending(methods::PLAY, methods::PLAY);
        let (live, mut live_rx) = pending(methods::PLAY, methods::PLAY);
        queue.push_back(stale);
        queue.push_back(live);
        drop(stale_rx);

        settle(&mut queue, &Frame::response(methods::PLAY, PropertyMap::new()));
        assert!(queue.is_empty());
        assert!(matches!(live_rx.try_recv(), Ok(Ok(_))));
    }

    #[test]
    fn link_state_liveness() {
        assert!(!LinkState::Disconnected.is_live());
        assert!(LinkState::Reconnecting { attempt: 2 }.is_live());
        assert!(LinkState::Connected.is_connected());
        assert_eq!(
            LinkState::Reconnecting { attempt: 2 }.to_string(),
            "reconnecting (attempt 2)"
        );
    }
}
