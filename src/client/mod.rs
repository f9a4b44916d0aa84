//! Transport to the search server.
//!
//! The session controller only ever sees the [`Transport`] trait and the
//! [`TransportEvent`]s a transport emits. Reconnecting is the transport's
//! business: the controller reacts to connect, connect-error and disconnect
//! notifications. Each connect-error carries whether the transport had a
//! retry in flight at the moment it failed.
//!
//! # Usage
//!
//! ```ignore
//! use search_console::client::{ReconnectPolicy, SocketTransport, Transport};
//! use tokio::sync::mpsc;
//!
//! let (tx, mut events) = mpsc::unbounded_channel();
//! let mut transport = SocketTransport::new("127.0.0.1:3000", ReconnectPolicy::default(), tx);
//! transport.open();
//! while let Some(event) = events.recv().await {
//!     // feed the session controller
//! }
//! ```

pub mod connection;

pub use connection::{ReconnectPolicy, SocketTransport};

use crate::protocol::SearchReply;
use thiserror::Error;

/// Notifications emitted by a transport, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A connection to the server was established.
    Connected,
    /// An established connection was lost.
    Disconnected(String),
    /// A connection attempt failed.
    ConnectFailed {
        /// Failure reported by the socket.
        detail: String,
        /// Snapshot of [`Transport::is_reconnecting`] taken when the
        /// failure was emitted.
        retrying: bool,
    },
    /// A search reply arrived.
    Search(SearchReply),
}

/// Error types for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport has been closed or has given up reconnecting.
    #[error("transport is closed")]
    Closed,

    /// The outbound message could not be encoded.
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Bidirectional event channel to the search server.
pub trait Transport {
    /// Starts connecting. Progress is reported as [`TransportEvent`]s.
    fn open(&mut self);

    /// Queues a `search` message for the server.
    fn send_search(&mut self, query: &str) -> Result<(), ClientError>;

    /// Whether a connection is currently established.
    fn is_connected(&self) -> bool;

    /// Whether the transport is still trying to (re)connect on its own.
    fn is_reconnecting(&self) -> bool;

    /// Closes the connection and stops reconnecting. No further events follow.
    fn close(&mut self);
}
