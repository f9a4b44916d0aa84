//! Terminal-backed prompt.
//!
//! Blocking reads on stdin cannot be interrupted, so a dedicated OS thread
//! reads lines and forwards them over a channel ([`LineInput`]). The
//! prompt task races that channel against the request's cancel signal,
//! which makes cancellation immediate without losing lines typed later.

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossterm::style::Stylize;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::prompt::{LinePrompt, PromptError, PromptHandle, PromptId, PromptOutcome, PromptReply};

type LineResult = std::io::Result<String>;

/// Shared line-input device.
///
/// Clones read from the same underlying stream, so a restarted session
/// picks up where the previous one left off.
#[derive(Debug, Clone)]
pub struct LineInput {
    lines: Arc<Mutex<mpsc::UnboundedReceiver<LineResult>>>,
    closed: Arc<AtomicBool>,
}

impl LineInput {
    /// Starts reading the process's stdin on a background thread.
    pub fn stdin() -> std::io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let failed = line.is_err();
                    if tx.send(line).is_err() || failed {
                        break;
                    }
                }
            })?;
        Ok(Self::from_channel(rx))
    }

    /// Wraps an existing stream of lines.
    pub fn from_channel(lines: mpsc::UnboundedReceiver<LineResult>) -> Self {
        Self {
            lines: Arc::new(Mutex::new(lines)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Waits for the next line. `None` once the stream has ended.
    ///
    /// Cancel safe: dropping the future never loses a line.
    pub async fn next_line(&self) -> Option<LineResult> {
        let mut lines = self.lines.lock().await;
        let line = lines.recv().await;
        if line.is_none() {
            self.closed.store(true, Ordering::SeqCst);
        }
        line
    }

    /// Whether the stream has been observed to end.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A read the prompt task has yet to serve.
#[derive(Debug)]
struct ReadRequest {
    id: PromptId,
    cancel: oneshot::Receiver<()>,
}

/// [`LinePrompt`] that shows a colored prompt and reads from a [`LineInput`].
///
/// Requests are served one at a time on a background task; replies are sent
/// on the channel given to [`TerminalPrompt::new`].
#[derive(Debug)]
pub struct TerminalPrompt {
    requests: mpsc::UnboundedSender<ReadRequest>,
    replies: mpsc::UnboundedSender<PromptReply>,
    next_id: u64,
    task: Option<JoinHandle<()>>,
}

impl TerminalPrompt {
    /// Creates the prompt and spawns its reader task.
    pub fn new(
        input: LineInput,
        text: impl Into<String>,
        replies: mpsc::UnboundedSender<PromptReply>,
    ) -> Self {
        let (requests, pending) = mpsc::unbounded_channel();
        let task = tokio::spawn(serve_requests(input, text.into(), pending, replies.clone()));
        Self {
            requests,
            replies,
            next_id: 0,
            task: Some(task),
        }
    }
}

impl LinePrompt for TerminalPrompt {
    fn request(&mut self) -> PromptHandle {
        self.next_id += 1;
        let id = PromptId(self.next_id);
        let (handle, cancel) = PromptHandle::new(id);
        if self.requests.send(ReadRequest { id, cancel }).is_err() {
            tracing::debug!("Prompt {} requested after input was released", id);
            let _ = self.replies.send(PromptReply {
                id,
                outcome: PromptOutcome::Failed(PromptError::Closed),
            });
        }
        handle
    }

    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TerminalPrompt {
    fn drop(&mut self) {
        self.close();
    }
}

async fn serve_requests(
    input: LineInput,
    text: String,
    mut requests: mpsc::UnboundedReceiver<ReadRequest>,
    replies: mpsc::UnboundedSender<PromptReply>,
) {
    while let Some(mut request) = requests.recv().await {
        let outcome = if !matches!(
            request.cancel.try_recv(),
            Err(oneshot::error::TryRecvError::Empty)
        ) {
            // Cancelled before it was served: nothing to show.
            PromptOutcome::Aborted
        } else {
            print!("{}", text.as_str().blue());
            let _ = std::io::stdout().flush();

            tokio::select! {
                line = input.next_line() => match line {
                    Some(Ok(line)) => PromptOutcome::Input(line),
                    Some(Err(e)) => PromptOutcome::Failed(PromptError::Read(e)),
                    None => PromptOutcome::Failed(PromptError::Closed),
                },
                _ = &mut request.cancel => {
                    println!();
                    PromptOutcome::Aborted
                }
            }
        };

        tracing::debug!("Prompt {} resolved: {:?}", request.id, outcome);
        if replies
            .send(PromptReply {
                id: request.id,
                outcome,
            })
            .is_err()
        {
            break;
        }
    }
}
