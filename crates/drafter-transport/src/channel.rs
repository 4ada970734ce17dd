//! Transport channel: one duplex connection per conversation context.
//!
//! The channel owns the explicit connection machine
//! (`Disconnected → Connecting → Connected → Closing`) with timers as
//! first-class scheduled tasks that die on every state exit. Consumers see
//! a single ordered [`ChannelEvent`] queue; outbound frames go through the
//! [`FrameSink`] seam.
//!
//! Stale-socket hazard: callbacks from a superseded socket must never
//! mutate state after a newer attempt starts. Every task spawned for a
//! socket captures the connection epoch at spawn time and re-checks it
//! before acting; bumping the epoch invalidates the whole task generation
//! at once.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use drafter_core::{DrafterError, Result};
use drafter_protocol::{ClientFrame, ServerFrame, codec};

use crate::backoff::ReconnectBackoff;
use crate::config::TransportConfig;
use crate::endpoint::ChannelEndpoint;
use crate::event::ChannelEvent;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle of a channel instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No socket; either never opened, torn down, or waiting on a retry.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The socket is open and frames flow.
    Connected,
    /// Teardown in progress.
    Closing,
}

impl LinkState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
            Self::Closing => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Closing,
            _ => Self::Disconnected,
        }
    }
}

/// Anything that can push client frames toward the backend.
///
/// The review controller talks to the channel through this seam so tests
/// can substitute a recording sink.
pub trait FrameSink: Send + Sync {
    /// Sends one frame, fire-and-forget. Rejected with
    /// [`DrafterError::NotConnected`] unless the connection is open; nothing
    /// is queued across reconnects, since a replayed frame against a
    /// superseded change would be unsafe.
    fn send_frame(&self, frame: &ClientFrame) -> Result<()>;

    /// Whether the connection is currently open.
    fn is_open(&self) -> bool;
}

/// A duplex connection to the assistant backend for one conversation
/// context.
///
/// A closed channel stays closed; remounting callers construct a fresh
/// instance. At most one live socket exists per instance at any time.
pub struct TransportChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    config: TransportConfig,
    endpoint: ChannelEndpoint,
    state: AtomicU8,
    /// Monotonic connection generation; see module docs.
    epoch: AtomicU64,
    backoff: Mutex<ReconnectBackoff>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    events: mpsc::UnboundedSender<ChannelEvent>,
    shutdown: CancellationToken,
}

/// Locks a channel mutex, recovering from poisoning instead of propagating
/// a panic into the event loop.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TransportChannel {
    /// Creates a channel and the event queue its consumer drains.
    pub fn new(
        endpoint: ChannelEndpoint,
        config: TransportConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let inner = Arc::new(ChannelInner {
            backoff: Mutex::new(ReconnectBackoff::new(config.base_delay, config.max_attempts)),
            config,
            endpoint,
            state: AtomicU8::new(LinkState::Disconnected.as_u8()),
            epoch: AtomicU64::new(0),
            outbound: Mutex::new(None),
            events,
            shutdown: CancellationToken::new(),
        });
        (Self { inner }, receiver)
    }

    /// Establishes the connection.
    ///
    /// With no credential available the channel settles into
    /// `Disconnected` and emits [`ChannelEvent::AuthMissing`]; the caller
    /// keeps functioning read-only, so this is a status signal rather than
    /// an error return. Connect failures are not returned either: they turn
    /// into scheduled retries and the outcome arrives as channel events.
    ///
    /// Suspends until the first handshake completes or times out; retries
    /// run in the background.
    pub async fn open(&self) {
        if !self.inner.endpoint.has_credentials() {
            info!("no credential available, assistant channel stays offline");
            self.inner.set_state(LinkState::Disconnected);
            self.inner.emit(ChannelEvent::AuthMissing);
            return;
        }
        ChannelInner::attempt(self.inner.clone()).await;
    }

    /// Current connection state.
    pub fn state(&self) -> LinkState {
        self.inner.link_state()
    }

    /// Deterministic teardown.
    ///
    /// Cancels every pending timer and socket task and invalidates the
    /// connection epoch; no further events are delivered once this returns.
    pub fn close(&self) {
        self.inner.set_state(LinkState::Closing);
        self.inner.shutdown.cancel();
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        *lock(&self.inner.outbound) = None;
        self.inner.set_state(LinkState::Disconnected);
        debug!("assistant channel closed by caller");
    }
}

impl FrameSink for TransportChannel {
    fn send_frame(&self, frame: &ClientFrame) -> Result<()> {
        if self.inner.link_state() != LinkState::Connected {
            return Err(DrafterError::NotConnected);
        }
        let encoded = codec::encode_client(frame)?;
        let guard = lock(&self.inner.outbound);
        let sender = guard.as_ref().ok_or(DrafterError::NotConnected)?;
        sender
            .send(Message::Text(encoded.into()))
            .map_err(|_| DrafterError::NotConnected)
    }

    fn is_open(&self) -> bool {
        self.inner.link_state() == LinkState::Connected
    }
}

impl ChannelInner {
    fn emit(&self, event: ChannelEvent) {
        // A dropped receiver means the owning context is gone; nothing to do.
        let _ = self.events.send(event);
    }

    fn link_state(&self) -> LinkState {
        LinkState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: LinkState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Runs one connection attempt under a fresh epoch.
    async fn attempt(inner: Arc<Self>) {
        if inner.shutdown.is_cancelled() {
            return;
        }
        let epoch = inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        inner.set_state(LinkState::Connecting);

        let url = match inner.endpoint.connect_url() {
            Ok(url) => url,
            Err(err) => {
                warn!(error = %err, "cannot build assistant channel URL");
                inner.set_state(LinkState::Disconnected);
                if err.is_auth_missing() {
                    inner.emit(ChannelEvent::AuthMissing);
                }
                return;
            }
        };

        match timeout(inner.config.connect_timeout, connect_async(url.as_str())).await {
            Ok(Ok((stream, _response))) => {
                if epoch != inner.current_epoch() || inner.shutdown.is_cancelled() {
                    // Superseded while handshaking; drop the socket unused.
                    return;
                }
                lock(&inner.backoff).reset();
                Self::install(&inner, stream, epoch);
                inner.set_state(LinkState::Connected);
                info!("assistant channel connected");
                inner.emit(ChannelEvent::Connected);
            }
            Ok(Err(err)) => {
                warn!(error = %err, "assistant channel connect failed");
                Self::schedule_retry(&inner, epoch);
            }
            Err(_) => {
                warn!(
                    timeout_ms = inner.config.connect_timeout.as_millis() as u64,
                    "assistant channel handshake timed out"
                );
                Self::schedule_retry(&inner, epoch);
            }
        }
    }

    /// Tears down after an abnormal closure or failed attempt and schedules
    /// the next backoff retry, or emits `Exhausted` once the cap is hit.
    fn schedule_retry(inner: &Arc<Self>, epoch: u64) {
        if inner.shutdown.is_cancelled() || epoch != inner.current_epoch() {
            return;
        }
        inner.teardown_socket();

        let next = {
            let mut backoff = lock(&inner.backoff);
            backoff.next_delay().map(|delay| (backoff.attempt(), delay))
        };
        match next {
            Some((attempt, delay)) => {
                debug!(attempt, delay_ms = delay.as_millis() as u64, "scheduling reconnect");
                inner.emit(ChannelEvent::Reconnecting { attempt, delay });
                Self::spawn_attempt(inner.clone(), delay);
            }
            None => {
                let attempts = inner.config.max_attempts;
                warn!(attempts, "assistant channel retries exhausted");
                inner.emit(ChannelEvent::Exhausted { attempts });
            }
        }
    }

    fn spawn_attempt(inner: Arc<Self>, delay: Duration) {
        tokio::spawn(async move {
            tokio::select! {
                _ = inner.shutdown.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            Self::attempt(inner).await;
        });
    }

    /// Invalidates the current socket generation and drops the write path.
    fn teardown_socket(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *lock(&self.outbound) = None;
        self.set_state(LinkState::Disconnected);
    }

    /// Wires up the reader, writer, and keep-alive tasks for a fresh socket.
    fn install(inner: &Arc<Self>, stream: WsStream, epoch: u64) {
        let (mut sink, stream) = stream.split();
        let (sender, mut outbound) = mpsc::unbounded_channel::<Message>();
        *lock(&inner.outbound) = Some(sender.clone());

        // Writer: drains outbound messages into the socket. A rejected write
        // means the socket died; the reader observes the closure and owns
        // recovery.
        let writer_shutdown = inner.shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = writer_shutdown.cancelled() => break,
                    message = outbound.recv() => match message {
                        Some(message) => {
                            if sink.send(message).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        });

        Self::spawn_reader(inner, stream, epoch);
        Self::spawn_keepalive(inner, sender, epoch);
    }

    fn spawn_reader(inner: &Arc<Self>, mut stream: SplitStream<WsStream>, epoch: u64) {
        let inner = inner.clone();
        tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    _ = inner.shutdown.cancelled() => return,
                    message = stream.next() => message,
                };
                if epoch != inner.current_epoch() {
                    return;
                }
                match message {
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.as_ref().map(|f| f.code);
                        if matches!(code, Some(CloseCode::Normal) | Some(CloseCode::Away)) {
                            info!(?code, "assistant channel closed");
                            inner.teardown_socket();
                            inner.emit(ChannelEvent::Disconnected);
                        } else {
                            warn!(?code, "assistant channel closed abnormally");
                            Self::schedule_retry(&inner, epoch);
                        }
                        return;
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        // Protocol-level ping from the far end; echo and move on.
                        if let Some(sender) = lock(&inner.outbound).as_ref() {
                            let _ = sender.send(Message::Pong(payload));
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(message @ (Message::Text(_) | Message::Binary(_)))) => {
                        // The protocol is textual; binary transport framing
                        // is incidental and decoded as UTF-8 before parsing.
                        match message.into_text() {
                            Ok(text) => {
                                for frame in codec::decode_server(text.as_str()) {
                                    match frame {
                                        ServerFrame::Ping | ServerFrame::Pong => {
                                            // Keep-alive echo; consumed here.
                                        }
                                        frame => inner.emit(ChannelEvent::Frame(frame)),
                                    }
                                }
                            }
                            Err(err) => warn!(error = %err, "dropping non-UTF-8 frame"),
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "assistant channel read failed");
                        Self::schedule_retry(&inner, epoch);
                        return;
                    }
                    None => {
                        warn!("assistant channel stream ended without close");
                        Self::schedule_retry(&inner, epoch);
                        return;
                    }
                }
            }
        });
    }

    /// Keep-alive: after a settle delay, a `ping` envelope on a fixed
    /// interval. Pings carry no liveness semantics; failures surface only
    /// through abnormal closure.
    fn spawn_keepalive(inner: &Arc<Self>, sender: mpsc::UnboundedSender<Message>, epoch: u64) {
        let inner = inner.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = inner.shutdown.cancelled() => return,
                _ = tokio::time::sleep(inner.config.ping_settle_delay) => {}
            }
            let mut ticker = tokio::time::interval(inner.config.ping_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = inner.shutdown.cancelled() => return,
                    _ = ticker.tick() => {}
                }
                if epoch != inner.current_epoch() {
                    return;
                }
                let Ok(encoded) = codec::encode_client(&ClientFrame::Ping) else {
                    return;
                };
                if sender.send(Message::Text(encoded.into())).is_err() {
                    return;
                }
            }
        });
    }
}
