//! End-to-end chat scenarios over loopback TCP.
//!
//! Each test starts a server on an ephemeral port and drives real client
//! sockets through the wire protocol. Assertions rely only on TCP's
//! per-connection ordering, so no test needs to sleep.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use chat_relay::Server;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server() -> SocketAddr {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

struct Peer {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Peer {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    /// Connect and consume the two-line connected notice.
    async fn connect_unnamed(addr: SocketAddr) -> Self {
        let mut peer = Self::connect(addr).await;
        assert_eq!(peer.recv_line().await, "[Server] You've been connected\n");
        assert_eq!(peer.recv_line().await, "Please, write your nickname\n");
        peer
    }

    /// Complete the nickname handshake, consuming the welcome line.
    async fn join(addr: SocketAddr, nickname: &str) -> Self {
        let mut peer = Self::connect_unnamed(addr).await;
        peer.send_line(nickname).await;
        assert_eq!(
            peer.recv_line().await,
            format!("[Server] Welcome to chat, {nickname}\n")
        );
        peer
    }

    async fn send_line(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
    }

    async fn recv_line(&mut self) -> String {
        let mut line = String::new();
        let read = timeout(RECV_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .unwrap();
        assert!(read > 0, "peer socket closed unexpectedly");
        line
    }
}

#[tokio::test]
async fn relays_lines_to_the_other_client() {
    let addr = start_server().await;
    let mut alice = Peer::join(addr, "alice").await;
    let mut bob = Peer::join(addr, "bob").await;

    alice.send_line("hello").await;
    assert_eq!(bob.recv_line().await, "alice: hello\n");
}

#[tokio::test]
async fn never_echoes_a_line_back_to_its_author() {
    let addr = start_server().await;
    let mut alice = Peer::join(addr, "alice").await;
    let mut bob = Peer::join(addr, "bob").await;

    alice.send_line("hello").await;
    assert_eq!(bob.recv_line().await, "alice: hello\n");

    // if alice had been echoed her own line, it would arrive before bob's
    bob.send_line("hi").await;
    assert_eq!(alice.recv_line().await, "bob: hi\n");
}

#[tokio::test]
async fn broadcasts_every_line_to_every_other_client() {
    let addr = start_server().await;
    let mut alice = Peer::join(addr, "alice").await;
    let mut bob = Peer::join(addr, "bob").await;
    let mut carol = Peer::join(addr, "carol").await;

    for text in ["one", "two", "three"] {
        alice.send_line(text).await;
    }
    for recipient in [&mut bob, &mut carol] {
        for text in ["one", "two", "three"] {
            assert_eq!(recipient.recv_line().await, format!("alice: {text}\n"));
        }
    }

    // alice got none of her own lines back
    bob.send_line("done").await;
    assert_eq!(alice.recv_line().await, "bob: done\n");
}

#[tokio::test]
async fn broadcasts_leave_notice_exactly_once() {
    let addr = start_server().await;
    let alice = Peer::join(addr, "alice").await;
    let mut bob = Peer::join(addr, "bob").await;
    let mut carol = Peer::join(addr, "carol").await;

    drop(alice);
    assert_eq!(bob.recv_line().await, "[Server] alice disconnected\n");
    assert_eq!(carol.recv_line().await, "[Server] alice disconnected\n");

    // a duplicate notice would have been queued ahead of carol's line
    carol.send_line("ping").await;
    assert_eq!(bob.recv_line().await, "carol: ping\n");
}

#[tokio::test]
async fn reprompts_on_empty_nickname_line() {
    let addr = start_server().await;
    let mut carol = Peer::connect_unnamed(addr).await;

    carol.send_line("").await;
    assert_eq!(carol.recv_line().await, "[Server] Please, write your nickname\n");

    carol.send_line("carol").await;
    assert_eq!(carol.recv_line().await, "[Server] Welcome to chat, carol\n");
}

#[tokio::test]
async fn unnamed_connection_already_receives_broadcasts() {
    let addr = start_server().await;
    let mut alice = Peer::join(addr, "alice").await;
    let mut dave = Peer::connect_unnamed(addr).await;

    alice.send_line("anyone here?").await;
    assert_eq!(dave.recv_line().await, "alice: anyone here?\n");

    // dave can still finish the handshake afterwards
    dave.send_line("dave").await;
    assert_eq!(dave.recv_line().await, "[Server] Welcome to chat, dave\n");

    dave.send_line("me").await;
    assert_eq!(alice.recv_line().await, "dave: me\n");
}

#[tokio::test]
async fn departing_client_just_sees_its_socket_close() {
    let addr = start_server().await;
    let mut alice = Peer::join(addr, "alice").await;
    let bob = Peer::join(addr, "bob").await;

    drop(bob);
    assert_eq!(alice.recv_line().await, "[Server] bob disconnected\n");
}
