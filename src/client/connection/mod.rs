//! TCP transport with automatic reconnection.
//!
//! [`SocketTransport`] owns a background link task that connects to the
//! search server, pumps JSON lines in both directions, and reconnects with
//! exponential backoff when the connection drops or cannot be established.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::client::{ClientError, Transport, TransportEvent};
use crate::protocol::{ClientMessage, ServerMessage};

/// Backoff defaults for connection retries.
const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 5000;

/// When and how often the link retries a failed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for the doubled delay.
    pub max_delay: Duration,
    /// Consecutive failed attempts before giving up. `0` retries forever.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_attempts: 0,
        }
    }
}

impl ReconnectPolicy {
    /// Calculates the backoff delay for a given zero-indexed retry.
    ///
    /// The delay doubles with every retry and is capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// Whether another attempt follows after `failures` consecutive failures.
    pub fn allows_retry(&self, failures: u32) -> bool {
        self.max_attempts == 0 || failures < self.max_attempts
    }
}

/// Connection flags shared between the transport handle and its link task.
#[derive(Debug, Default)]
struct LinkStatus {
    connected: AtomicBool,
    reconnecting: AtomicBool,
}

/// How a live connection ended.
enum LinkClosed {
    /// The server side went away; the link will reconnect.
    Remote(String),
    /// The transport handle is gone; the link stops.
    Owner,
}

/// Transport over a TCP socket speaking JSON lines.
///
/// Events are delivered on the channel passed to [`SocketTransport::new`].
/// Searches sent before the connection is up are buffered and delivered
/// once it is.
#[derive(Debug)]
pub struct SocketTransport {
    address: String,
    policy: ReconnectPolicy,
    events: Option<mpsc::UnboundedSender<TransportEvent>>,
    outbound: mpsc::UnboundedSender<String>,
    pending_outbound: Option<mpsc::UnboundedReceiver<String>>,
    status: Arc<LinkStatus>,
    task: Option<JoinHandle<()>>,
    closed: bool,
}

impl SocketTransport {
    /// Creates a transport for `address` (`host:port`). Nothing happens
    /// until [`Transport::open`] is called.
    pub fn new(
        address: impl Into<String>,
        policy: ReconnectPolicy,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        let (outbound, pending_outbound) = mpsc::unbounded_channel();
        Self {
            address: address.into(),
            policy,
            events: Some(events),
            outbound,
            pending_outbound: Some(pending_outbound),
            status: Arc::new(LinkStatus::default()),
            task: None,
            closed: false,
        }
    }

    /// The server address this transport connects to.
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Transport for SocketTransport {
    fn open(&mut self) {
        if self.closed || self.task.is_some() {
            tracing::debug!("Transport to {} already opened", self.address);
            return;
        }
        let (Some(events), Some(outbound)) = (self.events.take(), self.pending_outbound.take())
        else {
            return;
        };
        self.status.reconnecting.store(true, Ordering::SeqCst);
        self.task = Some(tokio::spawn(run_link(
            self.address.clone(),
            self.policy,
            events,
            outbound,
            Arc::clone(&self.status),
        )));
    }

    fn send_search(&mut self, query: &str) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::Closed);
        }
        let line = ClientMessage::search(query).to_json_line()?;
        self.outbound.send(line).map_err(|_| ClientError::Closed)
    }

    fn is_connected(&self) -> bool {
        self.status.connected.load(Ordering::SeqCst)
    }

    fn is_reconnecting(&self) -> bool {
        self.status.reconnecting.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        self.closed = true;
        self.status.reconnecting.store(false, Ordering::SeqCst);
        self.status.connected.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Closed transport to {}", self.address);
        }
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Connects, pumps, and reconnects until the policy gives up or the
/// transport handle is dropped.
async fn run_link(
    address: String,
    policy: ReconnectPolicy,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    status: Arc<LinkStatus>,
) {
    let mut failures: u32 = 0;

    loop {
        match TcpStream::connect(address.as_str()).await {
            Ok(stream) => {
                failures = 0;
                status.connected.store(true, Ordering::SeqCst);
                tracing::debug!("Connected to search server at {}", address);
                if events.send(TransportEvent::Connected).is_err() {
                    return;
                }

                let closed = pump(stream, &events, &mut outbound).await;
                status.connected.store(false, Ordering::SeqCst);
                match closed {
                    LinkClosed::Remote(reason) => {
                        tracing::debug!("Connection to {} lost: {}", address, reason);
                        if events.send(TransportEvent::Disconnected(reason)).is_err() {
                            return;
                        }
                    }
                    LinkClosed::Owner => return,
                }
            }
            Err(e) => {
                failures += 1;
                // Flag first: a listener handling this failure must see
                // whether another attempt follows.
                let retrying = policy.allows_retry(failures);
                status.reconnecting.store(retrying, Ordering::SeqCst);
                tracing::debug!(
                    "Connection attempt {} to {} failed: {} (retrying: {})",
                    failures,
                    address,
                    e,
                    retrying
                );
                let event = TransportEvent::ConnectFailed {
                    detail: e.to_string(),
                    retrying,
                };
                if events.send(event).is_err() || !retrying {
                    return;
                }
            }
        }

        sleep(policy.backoff(failures.saturating_sub(1))).await;
    }
}

/// Moves lines between the socket and the channels until either side closes.
async fn pump(
    stream: TcpStream,
    events: &mpsc::UnboundedSender<TransportEvent>,
    outbound: &mut mpsc::UnboundedReceiver<String>,
) -> LinkClosed {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match ServerMessage::from_json_line(&line) {
                        Ok(ServerMessage::Search(reply)) => {
                            if events.send(TransportEvent::Search(reply)).is_err() {
                                return LinkClosed::Owner;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Ignoring malformed message from server: {}", e);
                        }
                    }
                }
                Ok(None) => {
                    return LinkClosed::Remote("server closed the connection".to_string())
                }
                Err(e) => return LinkClosed::Remote(e.to_string()),
            },
            message = outbound.recv() => match message {
                Some(line) => {
                    if let Err(e) = writer.write_all(line.as_bytes()).await {
                        return LinkClosed::Remote(e.to_string());
                    }
                    if let Err(e) = writer.flush().await {
                        return LinkClosed::Remote(e.to_string());
                    }
                }
                None => return LinkClosed::Owner,
            },
        }
    }
}
