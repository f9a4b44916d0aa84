//! Event loop feeding a [`Controller`].

use tokio::sync::mpsc;

use crate::client::{SocketTransport, TransportEvent};
use crate::config::error::ConfigError;
use crate::config::schema::Config;
use crate::console::Output;
use crate::prompt::{LineInput, PromptReply, TerminalPrompt};
use crate::session::{Controller, SessionEvent, State};

/// A running session: the controller plus the channels its collaborators
/// report on.
///
/// Events are handed to the controller one at a time, in arrival order per
/// source, each handler running to completion before the next event.
#[derive(Debug)]
pub struct Session {
    controller: Controller,
    transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    prompt_replies: mpsc::UnboundedReceiver<PromptReply>,
}

impl Session {
    /// Wraps an already constructed controller and its event sources.
    pub fn new(
        controller: Controller,
        transport_events: mpsc::UnboundedReceiver<TransportEvent>,
        prompt_replies: mpsc::UnboundedReceiver<PromptReply>,
    ) -> Self {
        Self {
            controller,
            transport_events,
            prompt_replies,
        }
    }

    /// Builds a session against the configured server, reading queries from
    /// `input`. Must be called within a tokio runtime.
    pub fn connect(
        config: &Config,
        input: LineInput,
        output: Box<dyn Output>,
        on_halt: impl FnOnce(String) + 'static,
    ) -> Result<Self, ConfigError> {
        let policy = config.reconnect.policy()?;
        let (transport_tx, transport_events) = mpsc::unbounded_channel();
        let (prompt_tx, prompt_replies) = mpsc::unbounded_channel();

        let transport = SocketTransport::new(config.server.address.clone(), policy, transport_tx);
        let prompt = TerminalPrompt::new(input, config.prompt.text.clone(), prompt_tx);
        tracing::info!("Starting session against {}", transport.address());

        let controller = Controller::new(Box::new(transport), Box::new(prompt), output, on_halt);
        Ok(Self::new(controller, transport_events, prompt_replies))
    }

    /// Processes events until the session halts or every source has closed.
    pub async fn run(&mut self) {
        while !self.controller.is_halted() {
            let event = tokio::select! {
                Some(event) = self.transport_events.recv() => SessionEvent::Transport(event),
                Some(reply) = self.prompt_replies.recv() => SessionEvent::Prompt(reply),
                else => {
                    tracing::debug!("All event sources closed in state {}", self.controller.state());
                    break;
                }
            };
            self.controller.handle(event);
        }
    }

    /// Stops the session. See [`Controller::stop`].
    pub fn stop(&mut self) {
        self.controller.stop();
    }

    /// Current controller state.
    pub fn state(&self) -> State {
        self.controller.state()
    }

    /// The underlying controller.
    pub fn controller(&self) -> &Controller {
        &self.controller
    }
}
