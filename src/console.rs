//! User-facing console output.
//!
//! The session reports everything the user should see through [`Output`].
//! [`Console`] prints colorized lines to stdout; diagnostics go through
//! `tracing` instead and never pass through here.

use crate::protocol::ResultPage;
use crossterm::style::Stylize;

/// Sink for messages shown to the user.
pub trait Output {
    /// Low-key status message (connection progress, ignored events).
    fn info(&mut self, message: &str);

    /// Something went wrong but the session carries on.
    fn error(&mut self, message: &str);

    /// One page of search results.
    fn result(&mut self, page: &ResultPage);
}

/// Colorized stdout output.
#[derive(Debug, Default, Clone, Copy)]
pub struct Console;

impl Console {
    /// Creates a new console.
    pub fn new() -> Self {
        Self
    }
}

impl Output for Console {
    fn info(&mut self, message: &str) {
        println!("{}", message.grey());
    }

    fn error(&mut self, message: &str) {
        println!("{}", message.red());
    }

    fn result(&mut self, page: &ResultPage) {
        println!("{}", result_line(page));
    }
}

/// A result page with the subject name in green.
fn result_line(page: &ResultPage) -> String {
    page.render_with(page.name.as_str().green())
}
