//! Persistent signaling channel
//!
//! One channel per session. Requests are correlated by id through a
//! pending table so every concurrent caller resolves with exactly the
//! acknowledgment matching its own request, regardless of the order in
//! which the server answers. Every request carries a bounded wait; the
//! channel never retries, which keeps side-effecting requests (like
//! producer creation) exactly-once.
//!
//! On abrupt disconnect all pending requests fail with
//! [`SignalingError::ConnectionLost`]. Already-resolved transports and
//! producers are not touched here; the session state machine decides
//! whether the loss ends the session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::BytesMut;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{SetupError, SignalingError};
use crate::signaling::wire::{AckFrame, RequestBody, RequestFrame};

/// Channel configuration options
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Bound on every request's wait for an acknowledgment
    pub request_timeout: Duration,

    /// Read buffer growth increment
    pub read_buffer_size: usize,

    /// Event queue depth
    pub event_queue_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            read_buffer_size: 16 * 1024,
            event_queue_size: 16,
        }
    }
}

/// Connection status of the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Channel is open and accepting requests
    Open,
    /// Channel was closed deliberately or the connection dropped
    Closed,
}

/// Events surfaced to the channel's owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel opened; dependent setup (capability negotiation) may
    /// start now, concurrently with room registration
    Open,
    /// The connection dropped; all pending requests have already failed
    Disconnected,
}

type PendingTable = HashMap<u64, oneshot::Sender<Result<Value, SignalingError>>>;

#[derive(Debug)]
struct Shared {
    pending: Mutex<PendingTable>,
    status: Mutex<ConnectionStatus>,
    room: Mutex<Option<String>>,
}

impl Shared {
    /// Flip to closed. Returns false if already closed.
    fn mark_closed(&self) -> bool {
        let mut status = self.status.lock().unwrap();
        if *status == ConnectionStatus::Closed {
            return false;
        }
        *status = ConnectionStatus::Closed;
        true
    }

    fn fail_pending(&self, err: SignalingError) {
        let waiters: Vec<_> = self.pending.lock().unwrap().drain().collect();
        for (id, tx) in waiters {
            tracing::debug!(id, error = %err, "Failing pending request");
            let _ = tx.send(Err(err.clone()));
        }
    }
}

/// Persistent request/acknowledge channel to the signaling server
#[derive(Debug, Clone)]
pub struct SignalingChannel {
    config: ChannelConfig,
    shared: Arc<Shared>,
    next_id: Arc<AtomicU64>,
    out_tx: mpsc::Sender<String>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl SignalingChannel {
    /// Open a channel over an established byte stream.
    ///
    /// Spawns the reader and writer tasks and immediately surfaces
    /// [`ChannelEvent::Open`] on the returned event receiver.
    pub fn connect<S>(io: S, config: ChannelConfig) -> (Self, mpsc::Receiver<ChannelEvent>)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (event_tx, event_rx) = mpsc::channel(config.event_queue_size.max(1));
        let (out_tx, out_rx) = mpsc::channel(64);
        let (read_half, write_half) = tokio::io::split(io);

        let shared = Arc::new(Shared {
            pending: Mutex::new(HashMap::new()),
            status: Mutex::new(ConnectionStatus::Open),
            room: Mutex::new(None),
        });

        let _ = event_tx.try_send(ChannelEvent::Open);

        let reader = tokio::spawn(read_loop(
            read_half,
            Arc::clone(&shared),
            event_tx.clone(),
            config.read_buffer_size,
        ));
        let writer = tokio::spawn(write_loop(write_half, out_rx, Arc::clone(&shared), event_tx));

        let channel = Self {
            config,
            shared,
            next_id: Arc::new(AtomicU64::new(1)),
            out_tx,
            tasks: Arc::new(Mutex::new(vec![reader, writer])),
        };

        (channel, event_rx)
    }

    /// Dial a TCP signaling endpoint and open a channel over it.
    pub async fn connect_tcp(
        addr: &str,
        config: ChannelConfig,
    ) -> Result<(Self, mpsc::Receiver<ChannelEvent>), SetupError> {
        let stream = tokio::net::TcpStream::connect(addr)
            .await
            .map_err(|e| SetupError::ConnectFailed(e.to_string()))?;
        let _ = stream.set_nodelay(true);
        tracing::info!(addr, "Signaling connected");
        Ok(Self::connect(stream, config))
    }

    /// Send one request and wait for its acknowledgment, bounded by the
    /// configured request timeout.
    pub async fn request(&self, body: RequestBody) -> Result<Value, SignalingError> {
        self.request_with_timeout(body, self.config.request_timeout)
            .await
    }

    /// Send one request with an explicit wait bound.
    ///
    /// No acknowledgment within the bound fails the call with
    /// [`SignalingError::Timeout`]; whether to retry is the caller's
    /// decision.
    pub async fn request_with_timeout(
        &self,
        body: RequestBody,
        wait: Duration,
    ) -> Result<Value, SignalingError> {
        if self.status() != ConnectionStatus::Open {
            return Err(SignalingError::Closed);
        }

        let event = body.event();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = serde_json::to_string(&RequestFrame { id, body })
            .map_err(|e| SignalingError::Rejected(format!("failed to encode request: {}", e)))?;

        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().unwrap().insert(id, tx);

        tracing::debug!(id, event, "Signaling request");
        if self.out_tx.send(frame).await.is_err() {
            self.shared.pending.lock().unwrap().remove(&id);
            return Err(SignalingError::ConnectionLost);
        }

        match tokio::time::timeout(wait, rx).await {
            Ok(Ok(result)) => result,
            // Waiter dropped without an answer: the connection went away
            Ok(Err(_)) => Err(SignalingError::ConnectionLost),
            Err(_) => {
                self.shared.pending.lock().unwrap().remove(&id);
                tracing::warn!(id, event, "No acknowledgment within timeout");
                Err(SignalingError::Timeout)
            }
        }
    }

    /// Attach the room identifier once it is known. The channel may
    /// exist before the room does.
    pub fn bind_room(&self, room_id: impl Into<String>) {
        *self.shared.room.lock().unwrap() = Some(room_id.into());
    }

    /// Room identifier bound to this channel, if known yet
    pub fn room(&self) -> Option<String> {
        self.shared.room.lock().unwrap().clone()
    }

    /// Current connection status
    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status.lock().unwrap()
    }

    /// Whether the channel is open
    pub fn is_open(&self) -> bool {
        self.status() == ConnectionStatus::Open
    }

    /// Close the channel. Pending requests fail with
    /// [`SignalingError::Closed`]. Idempotent.
    pub fn close(&self) {
        if !self.shared.mark_closed() {
            return;
        }
        self.shared.fail_pending(SignalingError::Closed);
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
        tracing::debug!("Signaling channel closed");
    }
}

/// Reader side: frame inbound bytes into newline-delimited JSON acks and
/// resolve the matching pending request for each.
async fn read_loop<R>(
    mut read_half: R,
    shared: Arc<Shared>,
    event_tx: mpsc::Sender<ChannelEvent>,
    buffer_size: usize,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(buffer_size);

    loop {
        while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            let line = buf.split_to(pos + 1);
            dispatch_ack(&shared, &line[..pos]);
        }

        match read_half.read_buf(&mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "Signaling read failed");
                break;
            }
        }
    }

    on_connection_lost(&shared, &event_tx);
}

/// Writer side: drain queued frames onto the wire.
async fn write_loop<W>(
    mut write_half: W,
    mut out_rx: mpsc::Receiver<String>,
    shared: Arc<Shared>,
    event_tx: mpsc::Sender<ChannelEvent>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(mut frame) = out_rx.recv().await {
        frame.push('\n');
        if let Err(e) = write_half.write_all(frame.as_bytes()).await {
            tracing::debug!(error = %e, "Signaling write failed");
            on_connection_lost(&shared, &event_tx);
            return;
        }
        if write_half.flush().await.is_err() {
            on_connection_lost(&shared, &event_tx);
            return;
        }
    }
}

fn dispatch_ack(shared: &Shared, line: &[u8]) {
    let line = if line.ends_with(b"\r") {
        &line[..line.len() - 1]
    } else {
        line
    };
    if line.is_empty() {
        return;
    }

    let ack: AckFrame = match serde_json::from_slice(line) {
        Ok(ack) => ack,
        Err(e) => {
            tracing::debug!(error = %e, "Dropping malformed signaling frame");
            return;
        }
    };

    match shared.pending.lock().unwrap().remove(&ack.id) {
        Some(tx) => {
            let _ = tx.send(ack.outcome.into_result());
        }
        None => {
            tracing::debug!(id = ack.id, "Dropping acknowledgment with no waiter");
        }
    }
}

fn on_connection_lost(shared: &Shared, event_tx: &mpsc::Sender<ChannelEvent>) {
    if !shared.mark_closed() {
        return;
    }
    tracing::warn!("Signaling connection lost");
    shared.fail_pending(SignalingError::ConnectionLost);
    let _ = event_tx.try_send(ChannelEvent::Disconnected);
}
