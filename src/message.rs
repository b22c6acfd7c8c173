//! Chat message value
//!
//! A `Message` pairs an author identity with an immutable text payload.
//! Constructed once at the point a line is read or a server notice is
//! generated, then shared read-only across every queue that carries it.

use std::sync::Arc;

use crate::types::{ConnectionId, SERVER_ID};

/// Sent to every client right after its socket is accepted.
pub const CONNECTED_NOTICE: &str = "You've been connected\nPlease, write your nickname\n";

/// Re-sent when a client submits an empty nickname line.
pub const NICKNAME_PROMPT: &str = "Please, write your nickname\n";

/// Wire prefix distinguishing server-authored notices from chat lines.
pub const SERVER_PREFIX: &str = "[Server] ";

/// One chat message or server notice.
///
/// The payload is reference-counted, so cloning for broadcast fan-out
/// shares the text instead of copying it. An empty payload is the
/// "carries no information" sentinel and is filtered out by
/// [`Connection::post`](crate::connection::Connection::post).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    author: ConnectionId,
    payload: Arc<str>,
}

impl Message {
    /// Create a message authored by `author`.
    pub fn new(author: ConnectionId, payload: impl Into<Arc<str>>) -> Self {
        Self {
            author,
            payload: payload.into(),
        }
    }

    /// Create a server-authored message.
    pub fn server(payload: impl Into<Arc<str>>) -> Self {
        Self::new(SERVER_ID, payload)
    }

    pub fn author(&self) -> ConnectionId {
        self.author
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Whether the payload carries no text at all.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_author() {
        let msg = Message::server("maintenance in 5 minutes\n");
        assert!(msg.author().is_server());
        assert_eq!(msg.payload(), "maintenance in 5 minutes\n");
    }

    #[test]
    fn test_empty_payload_is_sentinel() {
        assert!(Message::server("").is_empty());
        assert!(!Message::new(ConnectionId(10_000), "hi\n").is_empty());
    }

    #[test]
    fn test_clone_shares_payload() {
        let msg = Message::new(ConnectionId(10_000), "alice: hello\n");
        let copy = msg.clone();
        assert_eq!(msg, copy);
        assert_eq!(copy.payload(), "alice: hello\n");
    }

    #[test]
    fn test_display_renders_payload() {
        let msg = Message::server("welcome\n");
        assert_eq!(msg.to_string(), "welcome\n");
    }
}
