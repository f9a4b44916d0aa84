//! Wire types for the JSON Lines search protocol.
//!
//! Every message is a single JSON object on its own line, tagged with the
//! event name and carrying the event payload under `data`:
//!
//! ```text
//! {"event":"search","data":{"query":"luke"}}
//! {"event":"search","data":{"page":1,"resultCount":1,"name":"Luke Skywalker","films":["A New Hope"]}}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payload of the outbound `search` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text query as entered by the user.
    pub query: String,
}

/// Payload of the inbound `search` event.
///
/// One reply is sent per result page. Servers report a failed query with
/// `error` set, usually with `page` and `result_count` both `-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReply {
    /// Error reported by the server for this query, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// One-based index of this page.
    pub page: i64,
    /// Total number of pages for the query.
    pub result_count: i64,
    /// Subject name of the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Items associated with the subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub films: Option<Vec<String>>,
}

impl SearchReply {
    /// Whether this reply is the final page of its search.
    pub fn is_last_page(&self) -> bool {
        self.page == self.result_count
    }
}

/// Messages sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Start a search.
    Search(SearchQuery),
}

impl ClientMessage {
    /// Builds a `search` message for the given query.
    pub fn search(query: impl Into<String>) -> Self {
        ClientMessage::Search(SearchQuery {
            query: query.into(),
        })
    }

    /// Serializes to a JSON line (with trailing newline).
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Messages pushed from the server to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ServerMessage {
    /// One page of search results.
    Search(SearchReply),
}

impl ServerMessage {
    /// Parses a single received line (surrounding whitespace is ignored).
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }

    /// Serializes to a JSON line (with trailing newline).
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// A successful result page, ready for display.
///
/// Transient: built from a [`SearchReply`], shown once, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPage {
    /// One-based page index.
    pub page: i64,
    /// Total page count.
    pub total: i64,
    /// Subject name.
    pub name: String,
    /// Associated items, in server order.
    pub items: Vec<String>,
}

impl ResultPage {
    /// The items as a single comma-separated string.
    pub fn items_joined(&self) -> String {
        self.items.join(",")
    }

    /// Formats the page as `[page/total] name (items)` with `name` shown in
    /// place of the subject name, so callers can decorate it.
    pub fn render_with(&self, name: impl fmt::Display) -> String {
        format!(
            "[{}/{}] {} ({})",
            self.page,
            self.total,
            name,
            self.items_joined()
        )
    }
}

impl From<&SearchReply> for ResultPage {
    fn from(reply: &SearchReply) -> Self {
        Self {
            page: reply.page,
            total: reply.result_count,
            name: reply.name.clone().unwrap_or_default(),
            items: reply.films.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for ResultPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_with(&self.name))
    }
}
