//! Session controller.
//!
//! [`Controller`] is the single authority over the session [`State`]. It
//! reacts to three event sources (transport lifecycle, search replies, and
//! prompt replies), validating every event against the state it expects
//! before acting. Events that arrive in the wrong state are either ordering
//! bugs, escalated through the halt callback, or benign races with a
//! disconnect, which are logged and dropped.
//!
//! Handlers are synchronous and run to completion; [`Session`] feeds them
//! one event at a time.

mod runner;

pub use runner::Session;

use std::fmt;

use crate::client::{Transport, TransportEvent};
use crate::console::Output;
use crate::prompt::{LinePrompt, PromptHandle, PromptOutcome, PromptReply};
use crate::protocol::{ResultPage, SearchReply};

/// Callback invoked once when the session hits an unrecoverable error.
pub type HaltCallback = Box<dyn FnOnce(String)>;

/// Lifecycle state of a session. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Constructed, connection not yet requested.
    Starting,
    /// Waiting for the transport to (re)connect.
    Connecting,
    /// A prompt is outstanding.
    AwaitingInput,
    /// A query was sent; result pages are expected.
    Searching,
    /// Halted by a fatal error.
    Errored,
    /// Halted by [`Controller::stop`].
    Stopped,
}

impl State {
    /// Whether the state is terminal for the session's business logic.
    pub fn is_halted(self) -> bool {
        matches!(self, State::Errored | State::Stopped)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Starting => "starting",
            State::Connecting => "connecting",
            State::AwaitingInput => "awaiting-input",
            State::Searching => "searching",
            State::Errored => "errored",
            State::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

/// Anything the controller reacts to.
#[derive(Debug)]
pub enum SessionEvent {
    /// Lifecycle notification or search reply from the transport.
    Transport(TransportEvent),
    /// A prompt request resolved.
    Prompt(PromptReply),
}

/// The session state machine.
pub struct Controller {
    state: State,
    pending_input: Option<PromptHandle>,
    transport: Box<dyn Transport>,
    prompt: Box<dyn LinePrompt>,
    output: Box<dyn Output>,
    on_halt: Option<HaltCallback>,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.state)
            .field("pending_input", &self.pending_input)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Creates the controller, opens the transport, and starts waiting for
    /// the connection.
    ///
    /// `on_halt` fires at most once, with a human-readable reason, when the
    /// session reaches an unrecoverable error.
    pub fn new(
        transport: Box<dyn Transport>,
        prompt: Box<dyn LinePrompt>,
        output: Box<dyn Output>,
        on_halt: impl FnOnce(String) + 'static,
    ) -> Self {
        let mut controller = Self {
            state: State::Starting,
            pending_input: None,
            transport,
            prompt,
            output,
            on_halt: Some(Box::new(on_halt)),
        };
        controller.transport.open();
        controller.await_connect();
        controller
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Whether a prompt is outstanding.
    pub fn has_pending_input(&self) -> bool {
        self.pending_input.is_some()
    }

    /// Whether the session has errored or been stopped.
    pub fn is_halted(&self) -> bool {
        self.state.is_halted()
    }

    /// Stops the session from any state: cancels the pending prompt, closes
    /// the connection, and releases the line input. The halt callback will
    /// not fire afterwards.
    pub fn stop(&mut self) {
        tracing::debug!("Stopping session in state {}", self.state);
        self.state = State::Stopped;
        self.on_halt = None;
        self.abort_input();
        self.transport.close();
        self.prompt.close();
    }

    /// Dispatches one event to its handler.
    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Transport(TransportEvent::Connected) => self.on_connect(),
            SessionEvent::Transport(TransportEvent::Disconnected(reason)) => {
                self.on_disconnect(&reason)
            }
            SessionEvent::Transport(TransportEvent::ConnectFailed { detail, retrying }) => {
                self.on_connect_error(&detail, retrying)
            }
            SessionEvent::Transport(TransportEvent::Search(reply)) => self.on_search(&reply),
            SessionEvent::Prompt(reply) => self.on_prompt_reply(reply),
        }
    }

    /// The transport established a connection.
    pub fn on_connect(&mut self) {
        if self.is_halted() {
            tracing::debug!("Ignoring 'connect' in halted state {}", self.state);
            return;
        }
        self.output.info("Connected");
        if self.state == State::Connecting {
            self.request_input();
        } else {
            self.raise_error(format!(
                "Unexpected 'connect' event received in state {}",
                self.state
            ));
        }
    }

    /// The transport lost its connection.
    pub fn on_disconnect(&mut self, reason: &str) {
        if self.is_halted() {
            tracing::debug!("Ignoring 'disconnect' in halted state {}", self.state);
            return;
        }
        tracing::debug!("Disconnected in state {}: {}", self.state, reason);
        self.abort_input();
        self.output.info("Disconnected");
        self.await_connect();
    }

    /// A connection attempt failed. `retrying` is whether the transport had
    /// another attempt scheduled when the failure was reported.
    pub fn on_connect_error(&mut self, detail: &str, retrying: bool) {
        if self.state == State::Connecting {
            if retrying {
                tracing::debug!("Connection attempt failed, transport retrying: {}", detail);
            } else {
                self.raise_error(format!("Connection error: {}", detail));
            }
        } else {
            self.raise_error(format!(
                "Unexpected 'connect_error' event received in state {} ({})",
                self.state, detail
            ));
        }
    }

    /// A search result page arrived.
    pub fn on_search(&mut self, reply: &SearchReply) {
        if self.state != State::Searching {
            if !self.is_halted() {
                self.output.info(&format!(
                    "Unexpected 'search' event received in state {}",
                    self.state
                ));
            }
            tracing::debug!("Dropping search reply in state {}", self.state);
            return;
        }

        match &reply.error {
            Some(error) => self.output.error(error),
            None => self.output.result(&ResultPage::from(reply)),
        }
        if reply.is_last_page() {
            self.request_input();
        }
    }

    /// A prompt request resolved.
    pub fn on_prompt_reply(&mut self, reply: PromptReply) {
        let current = self
            .pending_input
            .as_ref()
            .is_some_and(|handle| handle.id() == reply.id);
        if !current {
            tracing::debug!(
                "Ignoring stale prompt reply {} in state {}",
                reply.id,
                self.state
            );
            return;
        }
        self.pending_input = None;

        match reply.outcome {
            PromptOutcome::Input(query) => self.run_search(query),
            PromptOutcome::Aborted => self.await_connect(),
            PromptOutcome::Failed(e) => self.raise_error(format!("Input error: {}", e)),
        }
    }

    /// Reports an error upward. Suppressed once halted.
    fn raise_error(&mut self, message: String) {
        if self.is_halted() {
            tracing::info!(
                "Suppressing error in halted state ({}): {}",
                self.state,
                message
            );
            return;
        }
        tracing::error!("{}", message);
        self.abort_input();
        self.state = State::Errored;
        if let Some(on_halt) = self.on_halt.take() {
            on_halt(message);
        }
    }

    /// Waits for the transport to connect. Only a state change.
    fn await_connect(&mut self) {
        if self.is_halted() {
            return;
        }
        self.state = State::Connecting;
        if !self.transport.is_connected() {
            self.output.info("Connecting...");
        }
    }

    /// Prompts the user for the next query.
    fn request_input(&mut self) {
        if self.is_halted() {
            return;
        }
        self.abort_input();
        self.state = State::AwaitingInput;
        self.pending_input = Some(self.prompt.request());
    }

    /// Cancels the outstanding prompt, if any.
    fn abort_input(&mut self) {
        if let Some(mut handle) = self.pending_input.take() {
            handle.cancel();
        }
    }

    /// Sends the query and waits for result pages.
    fn run_search(&mut self, query: String) {
        if self.is_halted() {
            return;
        }
        self.state = State::Searching;
        self.output.info(&format!("Starting search for {}", query));
        if let Err(e) = self.transport.send_search(&query) {
            self.raise_error(format!("Failed to send search: {}", e));
        }
    }
}
