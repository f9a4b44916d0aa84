//! Cancellable line prompt.
//!
//! A prompt request produces exactly one [`PromptOutcome`]: the entered
//! text, an abort, or a failure. The caller keeps the [`PromptHandle`] to
//! cancel the pending read and receives the outcome later as a
//! [`PromptReply`] tagged with the request's [`PromptId`]. Cancelling does
//! not complete the request on the spot; the aborted reply still arrives
//! and the caller recognizes it by id.

pub mod terminal;

pub use terminal::{LineInput, TerminalPrompt};

use std::fmt;
use thiserror::Error;
use tokio::sync::oneshot;

/// Identifies one prompt request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PromptId(pub u64);

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Failure of the input device, distinct from a cancellation.
#[derive(Debug, Error)]
pub enum PromptError {
    /// The input stream reached end-of-file.
    #[error("input stream closed")]
    Closed,

    /// Reading from the input stream failed.
    #[error("failed to read input: {0}")]
    Read(#[from] std::io::Error),
}

/// Result of a single prompt request.
#[derive(Debug)]
pub enum PromptOutcome {
    /// The user entered a line (without the trailing newline).
    Input(String),
    /// The read was cancelled before a line arrived.
    Aborted,
    /// The input device failed.
    Failed(PromptError),
}

/// Outcome of a request, tagged with the request it belongs to.
#[derive(Debug)]
pub struct PromptReply {
    /// Request this reply answers.
    pub id: PromptId,
    /// What happened.
    pub outcome: PromptOutcome,
}

/// Caller's side of an outstanding prompt request.
///
/// Dropping the handle cancels the request.
#[derive(Debug)]
pub struct PromptHandle {
    id: PromptId,
    cancel: Option<oneshot::Sender<()>>,
}

impl PromptHandle {
    /// Creates a handle and the receiver the reading side watches for
    /// cancellation.
    pub fn new(id: PromptId) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                id,
                cancel: Some(tx),
            },
            rx,
        )
    }

    /// Request this handle belongs to.
    pub fn id(&self) -> PromptId {
        self.id
    }

    /// Signals the pending read to stop. No-op if already cancelled or if
    /// the read has already finished.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

/// Source of single lines of user input.
pub trait LinePrompt {
    /// Issues a prompt. The outcome is delivered later as a [`PromptReply`]
    /// carrying the returned handle's id. At most one request may be
    /// outstanding; callers enforce that.
    fn request(&mut self) -> PromptHandle;

    /// Releases the input resource. Outstanding requests are abandoned.
    fn close(&mut self);
}
