//! Line-oriented TCP broadcast chat
//!
//! A chat service built with tokio: the server accepts plain TCP
//! connections, asks each one for a nickname, then relays every line a
//! client sends to all other connected clients, tagged with the sender's
//! nickname. Server-authored notices are prefixed with `[Server] `.
//!
//! # Features
//! - Newline-delimited UTF-8 wire protocol, no framing beyond `\n`
//! - One-time nickname handshake per connection
//! - Broadcast fan-out that never echoes a line back to its author
//! - Per-connection outgoing queue with at most one write in flight
//! - Leave notices broadcast exactly once per departing connection
//!
//! # Architecture
//! Each accepted socket becomes a [`Connection`] driven by two tasks: a
//! session task reading lines and a writer task draining the outgoing
//! [`SharedQueue`]. The [`Server`] keeps a [`Registry`] of weak
//! connection handles for fan-out; only a connection's own in-flight
//! tasks keep it alive.
//!
//! # Example
//! ```ignore
//! use chat_relay::{cli, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(("0.0.0.0", cli::DEFAULT_PORT)).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod connection;
pub mod error;
pub mod message;
pub mod queue;
pub mod registry;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use connection::Connection;
pub use error::{ChatError, CliError};
pub use message::Message;
pub use queue::SharedQueue;
pub use registry::Registry;
pub use server::Server;
pub use types::{ConnectionId, SERVER_ID};
