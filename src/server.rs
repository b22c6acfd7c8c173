//! Broadcast chat server
//!
//! Accepts sockets, wires each one up as a [`Connection`] and fans every
//! chat line out to all other connections. The server holds only weak
//! handles: a connection is kept alive by its own socket tasks, so
//! removing one from the directory never waits on in-flight IO.

use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, error, info};

use crate::connection::{Connection, ErrorHandler, MessageHandler, ReadyHandler};
use crate::message::{Message, CONNECTED_NOTICE};
use crate::queue::SharedQueue;
use crate::registry::Registry;
use crate::types::IdAllocator;

pub struct Server {
    listener: TcpListener,
    registry: Arc<Registry>,
    connections: SharedQueue<Weak<Connection>>,
    ids: IdAllocator,
}

impl Server {
    /// Bind the listening socket.
    pub async fn bind(addr: impl ToSocketAddrs) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "server started");
        Ok(Self {
            listener,
            registry: Arc::new(Registry::new()),
            connections: SharedQueue::new(),
            ids: IdAllocator::new(),
        })
    }

    /// Address the server is listening on (useful when bound to port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever.
    ///
    /// Accept errors are logged and the loop keeps going; acceptance never
    /// blocks on any individual connection's handshake.
    pub async fn run(self) {
        let this = Arc::new(self);
        loop {
            match this.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "inbound connection");
                    Arc::clone(&this).accept_connection(stream);
                }
                Err(err) => {
                    error!(%err, "failed to accept connection");
                }
            }
        }
    }

    /// Wire up one accepted socket: allocate an identifier, spawn the
    /// connection, seed its queue with the connected notice and register
    /// it for broadcasts.
    fn accept_connection(self: Arc<Self>, stream: TcpStream) {
        let id = self.ids.allocate();
        let on_ready: ReadyHandler = {
            let server = Arc::clone(&self);
            Arc::new(move |conn| Arc::clone(&server).on_connection_ready(conn))
        };
        let conn = Connection::spawn(stream, Arc::clone(&self.registry), id, on_ready);
        conn.post(Message::server(CONNECTED_NOTICE));
        self.connections.push(Arc::downgrade(&conn));
        self.registry.add_user(id, Arc::downgrade(&conn));
    }

    /// Greet a connection that finished its handshake and switch it into
    /// the chat phase.
    fn on_connection_ready(self: Arc<Self>, conn: Arc<Connection>) {
        let nickname = conn.nickname().unwrap_or_default();
        conn.post(Message::server(format!("Welcome to chat, {nickname}\n")));

        let on_message: MessageHandler = {
            let server = Arc::clone(&self);
            Arc::new(move |message| server.broadcast(message))
        };
        let on_error: ErrorHandler = {
            let server = Arc::clone(&self);
            let departing = Arc::downgrade(&conn);
            Arc::new(move |_id| server.cleanup(&departing))
        };
        conn.start(on_message, on_error);
    }

    /// Relay `message` to every registered connection. The author is
    /// filtered out by each connection's own `post` rule.
    pub fn broadcast(&self, message: Message) {
        self.registry.for_each(|conn| conn.post(message.clone()));
    }

    /// Handle a connection's disconnect notification.
    ///
    /// Gated on removal from the live-connections collection, so a second
    /// report of the same connection is a silent no-op rather than a
    /// duplicate leave broadcast. Dead weak handles are pruned on the way.
    fn cleanup(&self, departing: &Weak<Connection>) {
        let removed = self.connections.erase(|conn| Weak::ptr_eq(conn, departing));
        self.connections.retain(|conn| conn.strong_count() > 0);
        if !removed {
            return;
        }
        if let Some(conn) = departing.upgrade() {
            if let Some(nickname) = conn.nickname() {
                info!(id = %conn.id(), nickname, "left the chat");
                self.broadcast(Message::server(format!("{nickname} disconnected\n")));
            }
        }
    }
}
