//! Per-connection protocol state machine
//!
//! A `Connection` owns one accepted socket and the queue of messages
//! waiting to go out on it. The socket is split into two halves, each
//! driven by its own task:
//! - the session task reads lines: first the nickname handshake, then
//!   the chat phase, handing every line to the inbound handler
//! - the writer task drains the outgoing queue one message at a time, so
//!   at most one write is ever in flight and writes never interleave
//!
//! The spawned tasks hold the only strong references to the connection;
//! owners keep `Weak` handles, so dropping a connection from the registry
//! never has to wait for in-flight IO.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, Notify};
use tracing::{debug, info, warn};

use crate::message::{Message, NICKNAME_PROMPT, SERVER_PREFIX};
use crate::queue::SharedQueue;
use crate::registry::Registry;
use crate::types::{ConnectionId, SERVER_ID};

/// Invoked once when the nickname handshake completes.
pub type ReadyHandler = Arc<dyn Fn(Arc<Connection>) + Send + Sync>;

/// Invoked for every chat line read from the peer.
pub type MessageHandler = Arc<dyn Fn(Message) + Send + Sync>;

/// Invoked exactly once when the connection reaches its terminal state.
pub type ErrorHandler = Arc<dyn Fn(ConnectionId) + Send + Sync>;

/// Handlers installed once via [`Connection::start`].
struct Handlers {
    on_message: MessageHandler,
    on_error: ErrorHandler,
}

/// One accepted socket and its per-client protocol state.
pub struct Connection {
    id: ConnectionId,
    /// Set exactly once, during the nickname handshake.
    nickname: OnceLock<String>,
    outgoing: SharedQueue<Message>,
    registry: Arc<Registry>,
    /// Wakes the writer on an empty-to-non-empty queue transition.
    write_wakeup: Notify,
    /// Flipped to true once; both socket tasks select on it.
    shutdown: watch::Sender<bool>,
    disconnected: AtomicBool,
    handlers: OnceLock<Handlers>,
    on_ready: ReadyHandler,
}

impl Connection {
    /// Take ownership of an accepted socket and spawn the connection's
    /// tasks. The tasks keep the returned handle alive; callers should
    /// hold only `Weak` references to it.
    pub fn spawn(
        stream: TcpStream,
        registry: Arc<Registry>,
        id: ConnectionId,
        on_ready: ReadyHandler,
    ) -> Arc<Self> {
        debug_assert!(
            id > SERVER_ID,
            "connection ids must not collide with the server identity"
        );
        let (read_half, write_half) = stream.into_split();
        let (shutdown, _) = watch::channel(false);
        let conn = Arc::new(Self {
            id,
            nickname: OnceLock::new(),
            outgoing: SharedQueue::new(),
            registry,
            write_wakeup: Notify::new(),
            shutdown,
            disconnected: AtomicBool::new(false),
            handlers: OnceLock::new(),
            on_ready,
        });
        debug!(id = %conn.id, "connection established");
        tokio::spawn(Arc::clone(&conn).write_loop(write_half));
        tokio::spawn(Arc::clone(&conn).session(read_half));
        conn
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Nickname chosen during the handshake, if it has completed.
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.get().map(String::as_str)
    }

    fn display_name(&self) -> &str {
        self.nickname().unwrap_or("Unknown")
    }

    /// Install the chat handlers and enter the relaying phase.
    ///
    /// Called by the owner from inside the ready callback. Every line read
    /// after this point flows to `on_message`; the terminal transition
    /// reports once to `on_error`.
    pub fn start(&self, on_message: MessageHandler, on_error: ErrorHandler) {
        if self
            .handlers
            .set(Handlers {
                on_message,
                on_error,
            })
            .is_err()
        {
            warn!(id = %self.id, "start called twice, handlers already installed");
        }
    }

    /// Queue `message` for delivery to this connection's peer.
    ///
    /// Safe to call from any task or thread without call-site locking.
    /// A connection never echoes its own lines back, and empty payloads
    /// carry no information, so both are dropped. Server-authored payloads
    /// are wrapped with the `[Server] ` prefix.
    pub fn post(&self, message: Message) {
        if message.author() == self.id || message.is_empty() {
            return;
        }
        let message = if message.author() == SERVER_ID {
            Message::server(format!("{SERVER_PREFIX}{}", message.payload()))
        } else {
            message
        };
        if self.outgoing.push(message) {
            self.write_wakeup.notify_one();
        }
    }

    /// Read side of the state machine: nickname handshake, then chat.
    async fn session(self: Arc<Self>, read_half: OwnedReadHalf) {
        let mut reader = BufReader::new(read_half);
        let Some(nickname) = self.read_nickname(&mut reader).await else {
            self.disconnect();
            return;
        };
        let _ = self.nickname.set(nickname);
        info!(id = %self.id, nickname = self.display_name(), "has joined");
        (*self.on_ready)(Arc::clone(&self));
        self.chat_loop(&mut reader).await;
    }

    /// AwaitingNickname: read lines until a non-empty nickname arrives.
    /// An empty submission re-sends the prompt. Returns `None` on EOF,
    /// read failure, or shutdown.
    async fn read_nickname(&self, reader: &mut BufReader<OwnedReadHalf>) -> Option<String> {
        let mut shutdown = self.shutdown.subscribe();
        let mut line = String::new();
        loop {
            line.clear();
            let read = tokio::select! {
                read = reader.read_line(&mut line) => read,
                _ = shutdown.wait_for(|stop| *stop) => return None,
            };
            match read {
                Ok(0) => {
                    debug!(id = %self.id, "peer closed before naming itself");
                    return None;
                }
                Ok(_) => {
                    let nickname = line.trim_end_matches(['\r', '\n']);
                    if nickname.is_empty() {
                        self.post(Message::server(NICKNAME_PROMPT));
                    } else {
                        return Some(nickname.to_owned());
                    }
                }
                Err(err) => {
                    warn!(id = %self.id, %err, "failed to read nickname");
                    return None;
                }
            }
        }
    }

    /// Chatting: relay every inbound line until the peer goes away or the
    /// connection is shut down.
    async fn chat_loop(&self, reader: &mut BufReader<OwnedReadHalf>) {
        let Some(handlers) = self.handlers.get() else {
            // the ready callback declined to start the chat phase
            self.disconnect();
            return;
        };
        let nickname = self.display_name().to_owned();
        let mut shutdown = self.shutdown.subscribe();
        let mut line = String::new();
        loop {
            line.clear();
            let read = tokio::select! {
                read = reader.read_line(&mut line) => read,
                _ = shutdown.wait_for(|stop| *stop) => return,
            };
            match read {
                Ok(0) => break,
                Ok(_) => {
                    let text = line.trim_end_matches(['\r', '\n']);
                    let message = Message::new(self.id, format!("{nickname}: {text}\n"));
                    (*handlers.on_message)(message);
                }
                Err(err) => {
                    warn!(id = %self.id, %err, "reading error");
                    break;
                }
            }
        }
        self.disconnect();
    }

    /// Write side: drain the outgoing queue one message at a time, then
    /// park until the next wakeup. Exits on write failure or shutdown,
    /// closing the socket gracefully either way.
    async fn write_loop(self: Arc<Self>, mut write_half: OwnedWriteHalf) {
        let mut shutdown = self.shutdown.subscribe();
        'drain: loop {
            while let Some(message) = self.outgoing.front() {
                if let Err(err) = write_half.write_all(message.payload().as_bytes()).await {
                    warn!(id = %self.id, %err, "writing error");
                    self.disconnect();
                    break 'drain;
                }
                self.outgoing.pop_front();
            }
            tokio::select! {
                _ = self.write_wakeup.notified() => {}
                _ = shutdown.wait_for(|stop| *stop) => break,
            }
        }
        // graceful shutdown; errors here carry no information
        let _ = write_half.shutdown().await;
    }

    /// Drive the state machine to its terminal state. Safe to trigger
    /// concurrently from a failed read and a failed write; only the first
    /// caller acts, and the error handler runs at most once.
    fn disconnect(&self) {
        if self.disconnected.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(id = %self.id, nickname = self.display_name(), "disconnected");
        // registry removal happens-before the socket release
        self.registry.remove_user(self.id);
        self.shutdown.send_replace(true);
        if let Some(handlers) = self.handlers.get() {
            (*handlers.on_error)(self.id);
        }
    }
}
