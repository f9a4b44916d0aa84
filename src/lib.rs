//! Search console library.
//!
//! An interactive client for a remote search service. A user types a name,
//! the query goes to the server over a persistent socket connection, and
//! result pages stream back until the last page arrives, after which the
//! user is prompted again. The connection is re-established automatically
//! when it drops.
//!
//! - [`session`]: the controller state machine and its event loop
//! - [`client`]: the socket transport with reconnection
//! - [`prompt`]: cancellable line input
//! - [`supervisor`]: restarts sessions after fatal errors
//!
//! # Platform Support
//!
//! Runs anywhere tokio's TCP support does. The config directory follows
//! XDG conventions on Linux and Apple conventions on macOS.

/// Socket transport and its lifecycle events.
pub mod client;

/// TOML configuration loading.
pub mod config;

/// User-facing output.
pub mod console;

/// Logging setup.
pub mod logging;

/// Cancellable line prompt.
pub mod prompt;

/// Wire messages exchanged with the search server.
pub mod protocol;

/// Session controller.
pub mod session;

/// Session restarts.
pub mod supervisor;

pub use client::{ReconnectPolicy, SocketTransport, Transport, TransportEvent};
pub use config::error::ConfigError;
pub use config::schema::Config;
pub use console::{Console, Output};
pub use prompt::{LineInput, LinePrompt, TerminalPrompt};
pub use protocol::{ResultPage, SearchReply};
pub use session::{Controller, Session, SessionEvent, State};
pub use supervisor::SupervisorExit;
